//! Forward kinematics: one motion frame in, one world-space pose out.
//!
//! Transforms propagate down the cached pre-order traversal, so every
//! joint's parent is finalized before the joint itself. The skeleton is
//! never mutated; each solve returns a fresh [`Pose`] value, which makes
//! repeated solves trivially idempotent and lets callers fan frames out
//! across threads with nothing but `&Skeleton`.

use glam::{DMat3, DVec3};

use crate::amc::MotionFrame;
use crate::error::{Error, Result};
use crate::math::{euler_deg_to_matrix, RotationOrder};
use crate::skeleton::{JointId, Skeleton, ROOT_NAME};

/// Channels consumed by the root: tx ty tz rx ry rz.
const ROOT_CHANNELS: usize = 6;

/// Options for a forward-kinematics pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct SolveOptions {
    /// Clamp each rotation value into its declared `[min, max]` limit
    /// before applying it. Off by default: motion data is treated as
    /// authoritative and applied as-is.
    pub clamp_to_limits: bool,
}

/// World transform of every joint for a single frame.
///
/// Valid only for the skeleton it was solved against; all entries are
/// consistent with each other (a solve either completes or fails whole).
#[derive(Debug, Clone)]
pub struct Pose {
    world_matrices: Vec<DMat3>,
    world_positions: Vec<DVec3>,
}

impl Pose {
    /// World rotation matrix of a joint.
    #[inline]
    pub fn matrix(&self, id: JointId) -> DMat3 {
        self.world_matrices[id.index()]
    }

    /// World coordinate of a joint.
    #[inline]
    pub fn position(&self, id: JointId) -> DVec3 {
        self.world_positions[id.index()]
    }

    /// Bone segments as (parent position, joint position) pairs, one per
    /// non-root joint. This is what a renderer draws.
    pub fn segments<'a>(
        &'a self,
        skeleton: &'a Skeleton,
    ) -> impl Iterator<Item = (DVec3, DVec3)> + 'a {
        skeleton.joints().filter_map(move |(id, joint)| {
            joint
                .parent
                .map(|parent| (self.position(parent), self.position(id)))
        })
    }
}

impl Skeleton {
    /// Solve world transforms for one frame with default options.
    pub fn solve(&self, frame: &MotionFrame) -> Result<Pose> {
        self.solve_with(frame, SolveOptions::default())
    }

    /// Solve world transforms for one frame.
    ///
    /// Fails with [`Error::MissingChannel`] when the frame lacks values for
    /// a joint with at least one active DOF, and with
    /// [`Error::ChannelCountMismatch`] when a channel group is shorter than
    /// the joint's active DOF count. On failure no pose is returned at all;
    /// a partially computed pose is unsafe to render or store.
    pub fn solve_with(&self, frame: &MotionFrame, options: SolveOptions) -> Result<Pose> {
        let mut matrices = vec![DMat3::IDENTITY; self.len()];
        let mut positions = vec![DVec3::ZERO; self.len()];

        for &id in self.traversal() {
            let joint = &self[id];

            let (matrix, position) = match joint.parent {
                None => {
                    let values = frame
                        .channels(ROOT_NAME)
                        .ok_or_else(|| Error::MissingChannel(ROOT_NAME.to_string()))?;
                    if values.len() < ROOT_CHANNELS {
                        return Err(Error::ChannelCountMismatch {
                            joint: ROOT_NAME.to_string(),
                            expected: ROOT_CHANNELS,
                            got: values.len(),
                        });
                    }
                    // Translation is applied directly, unscaled
                    let position = DVec3::new(values[0], values[1], values[2]);
                    let rotation = euler_deg_to_matrix(
                        DVec3::new(values[3], values[4], values[5]),
                        RotationOrder::Xyz,
                    );
                    let matrix = joint.local_frame * rotation * joint.local_frame_inv;
                    (matrix, position)
                }
                Some(parent) => {
                    let rotation_deg = self.joint_rotation(id, frame, options)?;
                    let rotation = euler_deg_to_matrix(rotation_deg, RotationOrder::Xyz);
                    let matrix = matrices[parent.index()]
                        * joint.local_frame
                        * rotation
                        * joint.local_frame_inv;
                    let position =
                        positions[parent.index()] + joint.length * (matrix * joint.direction);
                    (matrix, position)
                }
            };

            matrices[id.index()] = matrix;
            positions[id.index()] = position;
        }

        Ok(Pose {
            world_matrices: matrices,
            world_positions: positions,
        })
    }

    /// Build a non-root joint's rotation vector in degrees: fixed x/y/z
    /// slots take the next unconsumed channel value when the axis is
    /// active, inactive axes stay zero.
    fn joint_rotation(
        &self,
        id: JointId,
        frame: &MotionFrame,
        options: SolveOptions,
    ) -> Result<DVec3> {
        let joint = &self[id];
        let expected = joint.active_dof_count();
        if expected == 0 {
            return Ok(DVec3::ZERO);
        }

        let values = frame
            .channels(&joint.name)
            .ok_or_else(|| Error::MissingChannel(joint.name.clone()))?;
        if values.len() < expected {
            return Err(Error::ChannelCountMismatch {
                joint: joint.name.clone(),
                expected,
                got: values.len(),
            });
        }
        if values.len() > expected {
            log::warn!(
                "joint `{}`: {} channel values for {} active DOF, extras ignored",
                joint.name,
                values.len(),
                expected
            );
        }

        let mut rotation = DVec3::ZERO;
        let mut next = 0;
        for axis in 0..3 {
            if let Some(limits) = joint.limits[axis] {
                let mut value = values[next];
                next += 1;
                if options.clamp_to_limits {
                    value = value.clamp(limits.min, limits.max);
                }
                rotation[axis] = value;
            }
        }
        Ok(rotation)
    }
}
