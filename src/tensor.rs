//! Batch tensor assembly: FK over every frame, packed into one dense buffer.
//!
//! The buffer holds world coordinates with shape `(frames, joints, 3)`.
//! Joints are indexed by the skeleton's pre-order traversal, so the layout
//! is identical across frames and across runs for the same skeleton. Any
//! FK failure aborts the whole assembly; a partial tensor is never
//! returned.

use glam::DVec3;
use serde::Serialize;

use crate::amc::MotionFrame;
use crate::error::Result;
use crate::fk::SolveOptions;
use crate::skeleton::Skeleton;

/// Dense world-coordinate buffer of shape `(frames, joints, 3)`.
#[derive(Debug, Clone, PartialEq)]
pub struct MotionTensor {
    data: Vec<f64>,
    frame_count: usize,
    joint_count: usize,
    /// Joint names in tensor (pre-order) index order.
    joint_names: Vec<String>,
}

impl MotionTensor {
    /// `(frame_count, joint_count, 3)`
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.frame_count, self.joint_count, 3)
    }

    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    pub fn joint_count(&self) -> usize {
        self.joint_count
    }

    /// Joint names in tensor index order.
    pub fn joint_names(&self) -> &[String] {
        &self.joint_names
    }

    /// World coordinate at (frame, joint).
    ///
    /// # Panics
    ///
    /// Panics if `frame >= frame_count()` or `joint >= joint_count()`.
    pub fn position(&self, frame: usize, joint: usize) -> DVec3 {
        assert!(
            frame < self.frame_count && joint < self.joint_count,
            "index ({frame}, {joint}) outside tensor of shape ({}, {}, 3)",
            self.frame_count,
            self.joint_count
        );
        let at = (frame * self.joint_count + joint) * 3;
        DVec3::new(self.data[at], self.data[at + 1], self.data[at + 2])
    }

    /// One frame's coordinates, flattened to `joint_count * 3` scalars.
    ///
    /// # Panics
    ///
    /// Panics if `frame >= frame_count()`.
    pub fn frame(&self, frame: usize) -> &[f64] {
        let stride = self.joint_count * 3;
        &self.data[frame * stride..(frame + 1) * stride]
    }

    /// The whole buffer in row-major (frame, joint, axis) order.
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Zero-copy byte view of the buffer, for raw dumps or GPU upload.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.data)
    }

    /// Export shape, joint names and data as JSON.
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        #[derive(Serialize)]
        struct MotionTensorJson<'a> {
            frame_count: usize,
            joint_count: usize,
            joint_names: &'a [String],
            data: &'a [f64],
        }

        serde_json::to_string(&MotionTensorJson {
            frame_count: self.frame_count,
            joint_count: self.joint_count,
            joint_names: &self.joint_names,
            data: &self.data,
        })
    }
}

/// Run forward kinematics over every frame, in order, and collect all joint
/// coordinates. See [`assemble_with`].
pub fn assemble(skeleton: &Skeleton, frames: &[MotionFrame]) -> Result<MotionTensor> {
    assemble_with(skeleton, frames, SolveOptions::default())
}

/// [`assemble`] with explicit FK options.
///
/// No frame is skipped: the first FK error aborts assembly and is returned
/// as-is.
pub fn assemble_with(
    skeleton: &Skeleton,
    frames: &[MotionFrame],
    options: SolveOptions,
) -> Result<MotionTensor> {
    let joint_count = skeleton.len();
    let mut data = Vec::with_capacity(frames.len() * joint_count * 3);

    for (number, frame) in frames.iter().enumerate() {
        let pose = skeleton.solve_with(frame, options).map_err(|err| {
            log::error!("assembly aborted at frame {}: {err}", number + 1);
            err
        })?;
        for &id in skeleton.traversal() {
            let position = pose.position(id);
            data.extend_from_slice(&[position.x, position.y, position.z]);
        }
    }

    log::debug!(
        "assembled tensor of shape ({}, {joint_count}, 3)",
        frames.len()
    );
    Ok(MotionTensor {
        data,
        frame_count: frames.len(),
        joint_count,
        joint_names: skeleton
            .joints()
            .map(|(_, joint)| joint.name.clone())
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amc::parse_amc;
    use crate::asf::{parse_asf, tests::TWO_BONE_ASF};
    use crate::error::Error;
    use crate::skeleton::ROOT_NAME;

    const TOLERANCE: f64 = 1e-9;

    const THREE_FRAME_AMC: &str = r#"
:FULLY-SPECIFIED
:DEGREES
1
root 0 0 0 0 0 0
upperarm 0 0
lowerarm 0
2
root 0 0 0 0 0 0
upperarm 0 0
lowerarm 90
3
root 1 2 3 0 0 0
upperarm 0 0
lowerarm 0
"#;

    #[test]
    fn test_shape_and_ordering() {
        let skeleton = parse_asf(TWO_BONE_ASF).unwrap();
        let frames = parse_amc(THREE_FRAME_AMC).unwrap();
        let tensor = assemble(&skeleton, &frames).unwrap();

        assert_eq!(tensor.shape(), (3, 3, 3));
        assert_eq!(tensor.as_slice().len(), 27);
        assert_eq!(
            tensor.joint_names(),
            &[ROOT_NAME.to_string(), "upperarm".into(), "lowerarm".into()]
        );
        assert_eq!(tensor.frame(1).len(), 9);
    }

    #[test]
    fn test_each_frame_matches_standalone_fk() {
        let skeleton = parse_asf(TWO_BONE_ASF).unwrap();
        let frames = parse_amc(THREE_FRAME_AMC).unwrap();
        let tensor = assemble(&skeleton, &frames).unwrap();

        for (i, frame) in frames.iter().enumerate() {
            let pose = skeleton.solve(frame).unwrap();
            for (j, (id, _)) in skeleton.joints().enumerate() {
                assert!(
                    tensor.position(i, j).abs_diff_eq(pose.position(id), 0.0),
                    "tensor[{i}][{j}] diverges from standalone FK"
                );
            }
        }
    }

    #[test]
    fn test_known_coordinates() {
        let skeleton = parse_asf(TWO_BONE_ASF).unwrap();
        let frames = parse_amc(THREE_FRAME_AMC).unwrap();
        let tensor = assemble(&skeleton, &frames).unwrap();

        // Frame 0: rest pose
        assert!(tensor
            .position(0, 2)
            .abs_diff_eq(DVec3::new(10.0, 20.0, 0.0), TOLERANCE));
        // Frame 1: lowerarm Rz(90)
        assert!(tensor
            .position(1, 2)
            .abs_diff_eq(DVec3::new(0.0, 30.0, 0.0), TOLERANCE));
        // Frame 2: root translated by (1, 2, 3)
        assert!(tensor
            .position(2, 0)
            .abs_diff_eq(DVec3::new(1.0, 2.0, 3.0), TOLERANCE));
        assert!(tensor
            .position(2, 2)
            .abs_diff_eq(DVec3::new(11.0, 22.0, 3.0), TOLERANCE));
    }

    #[test]
    fn test_fk_error_aborts_assembly() {
        let skeleton = parse_asf(TWO_BONE_ASF).unwrap();
        // Second frame omits lowerarm
        let frames = parse_amc(
            ":DEGREES\n1\nroot 0 0 0 0 0 0\nupperarm 0 0\nlowerarm 0\n2\nroot 0 0 0 0 0 0\nupperarm 0 0\n",
        )
        .unwrap();

        match assemble(&skeleton, &frames) {
            Err(Error::MissingChannel(joint)) => assert_eq!(joint, "lowerarm"),
            other => panic!("expected MissingChannel, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_sequence() {
        let skeleton = parse_asf(TWO_BONE_ASF).unwrap();
        let tensor = assemble(&skeleton, &[]).unwrap();

        assert_eq!(tensor.shape(), (0, 3, 3));
        assert!(tensor.as_slice().is_empty());
    }

    #[test]
    #[should_panic(expected = "outside tensor")]
    fn test_out_of_range_joint_panics() {
        let skeleton = parse_asf(TWO_BONE_ASF).unwrap();
        let frames = parse_amc(THREE_FRAME_AMC).unwrap();
        let tensor = assemble(&skeleton, &frames).unwrap();

        // Would otherwise silently read frame 1's data
        let _ = tensor.position(0, tensor.joint_count());
    }

    #[test]
    fn test_byte_view_length() {
        let skeleton = parse_asf(TWO_BONE_ASF).unwrap();
        let frames = parse_amc(THREE_FRAME_AMC).unwrap();
        let tensor = assemble(&skeleton, &frames).unwrap();

        assert_eq!(
            tensor.as_bytes().len(),
            tensor.as_slice().len() * std::mem::size_of::<f64>()
        );
    }

    #[test]
    fn test_json_export() {
        let skeleton = parse_asf(TWO_BONE_ASF).unwrap();
        let frames = parse_amc(THREE_FRAME_AMC).unwrap();
        let tensor = assemble(&skeleton, &frames).unwrap();

        let json = tensor.to_json_string().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["frame_count"], 3);
        assert_eq!(value["joint_count"], 3);
        assert_eq!(value["joint_names"][2], "lowerarm");
        assert_eq!(value["data"].as_array().unwrap().len(), 27);
    }
}
