//! Skeleton data model: an arena of joints with parent/child links.
//!
//! The skeleton is a tree. Joints live in a flat arena and refer to each
//! other through [`JointId`] indices, so the parent link is a plain
//! non-owning index while the arena itself owns every joint. A pre-order
//! traversal (parents before children) is computed once at build time and
//! reused by every forward-kinematics pass, which also fixes the joint
//! ordering of the assembled tensor.

use std::collections::HashMap;
use std::fmt;

use glam::{DMat3, DVec3};

use crate::error::{Error, Result};
use crate::math::{euler_to_matrix, RotationOrder};

/// Reserved name of the hierarchy's single entry point.
pub const ROOT_NAME: &str = "root";

/// Largest joint arena a [`JointId`] can address.
pub const MAX_JOINTS: usize = u16::MAX as usize + 1;

/// Index of a joint inside a [`Skeleton`] arena.
/// Stable for the lifetime of the skeleton.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JointId(u16);

impl JointId {
    /// Convert to array index
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    pub(crate) fn new(index: usize) -> Self {
        Self(index as u16)
    }
}

/// Rotation limit of one animated axis, in degrees.
///
/// Limits are carried through from the skeleton description but are not
/// enforced by the default FK pass; see [`crate::fk::SolveOptions`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DofLimits {
    pub min: f64,
    pub max: f64,
}

/// One joint of the skeleton, together with the bone connecting it to its
/// parent joint.
#[derive(Debug, Clone)]
pub struct Joint {
    /// Unique name from the skeleton description (`root` is reserved).
    pub name: String,
    /// Unit-length default direction of the bone in the parent frame.
    pub direction: DVec3,
    /// Bone length; scales `direction` during FK.
    pub length: f64,
    /// Static rotation-axis frame `C`, built from the `axis` declaration.
    pub local_frame: DMat3,
    /// Exact inverse of `local_frame` (transpose of a proper rotation).
    pub local_frame_inv: DMat3,
    /// Per-axis limits in fixed `[x, y, z]` slots. `Some` marks the axis as
    /// animated (it consumes one motion channel), `None` contributes a fixed
    /// zero rotation. The root ignores this and always carries 6 DOF.
    pub limits: [Option<DofLimits>; 3],
    /// Parent joint; `None` only for the root.
    pub parent: Option<JointId>,
    /// Child joints in hierarchy declaration order.
    pub children: Vec<JointId>,
}

impl Joint {
    /// Build a joint from its parsed fields. `axis_deg` is the static
    /// rotation-axis offset in degrees; `direction` is normalized here.
    pub fn new(
        name: impl Into<String>,
        direction: DVec3,
        length: f64,
        axis_deg: DVec3,
        order: RotationOrder,
        limits: [Option<DofLimits>; 3],
    ) -> Self {
        let local_frame = euler_to_matrix(
            DVec3::new(
                axis_deg.x.to_radians(),
                axis_deg.y.to_radians(),
                axis_deg.z.to_radians(),
            ),
            order,
        );

        Self {
            name: name.into(),
            direction: direction.normalize_or_zero(),
            length,
            local_frame,
            local_frame_inv: local_frame.transpose(),
            limits,
            parent: None,
            children: Vec::new(),
        }
    }

    /// The synthesized root joint: zero geometry, identity frame, no stored
    /// limits (its 6 translation + rotation channels are unconstrained).
    pub fn root() -> Self {
        Self::new(
            ROOT_NAME,
            DVec3::ZERO,
            0.0,
            DVec3::ZERO,
            RotationOrder::Xyz,
            [None; 3],
        )
    }

    /// Number of animated rotation axes.
    pub fn active_dof_count(&self) -> usize {
        self.limits.iter().filter(|l| l.is_some()).count()
    }
}

/// Immutable joint tree plus name lookup and cached pre-order traversal.
///
/// Built once by the skeleton parser; only [`crate::fk::Pose`] values derived
/// from it change per frame.
#[derive(Debug, Clone)]
pub struct Skeleton {
    joints: Vec<Joint>,
    by_name: HashMap<String, JointId>,
    /// Pre-order traversal, parents strictly before children.
    order: Vec<JointId>,
    root: JointId,
}

impl Skeleton {
    /// Validate linked joints and build the lookup structures.
    ///
    /// Expects `parent`/`children` indices to be fully wired. Fails with
    /// [`Error::InvalidHierarchy`] when the graph is not a single tree
    /// rooted at `root`, and with [`Error::MalformedSkeleton`] on duplicate
    /// joint names.
    pub fn new(joints: Vec<Joint>) -> Result<Self> {
        // JointId is a u16 index; a larger arena would silently alias ids
        if joints.len() > MAX_JOINTS {
            return Err(Error::MalformedSkeleton(format!(
                "{} joints exceed the supported maximum of {MAX_JOINTS}",
                joints.len()
            )));
        }

        let mut by_name = HashMap::with_capacity(joints.len());
        for (index, joint) in joints.iter().enumerate() {
            if by_name
                .insert(joint.name.clone(), JointId::new(index))
                .is_some()
            {
                return Err(Error::MalformedSkeleton(format!(
                    "duplicate joint name `{}`",
                    joint.name
                )));
            }
        }

        let mut roots = joints
            .iter()
            .enumerate()
            .filter(|(_, j)| j.parent.is_none())
            .map(|(i, _)| JointId::new(i));
        let root = match (roots.next(), roots.next()) {
            (Some(root), None) => root,
            (Some(a), Some(b)) => {
                return Err(Error::InvalidHierarchy(format!(
                    "multiple roots: `{}` and `{}`",
                    joints[a.index()].name,
                    joints[b.index()].name
                )))
            }
            _ => return Err(Error::InvalidHierarchy("no parentless joint".into())),
        };
        if joints[root.index()].name != ROOT_NAME {
            return Err(Error::InvalidHierarchy(format!(
                "tree is rooted at `{}`, expected `{ROOT_NAME}`",
                joints[root.index()].name
            )));
        }

        // Depth-first walk; a cycle or a disconnected joint leaves the
        // traversal shorter than the arena.
        let mut order = Vec::with_capacity(joints.len());
        let mut visited = vec![false; joints.len()];
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if visited[id.index()] {
                return Err(Error::InvalidHierarchy(format!(
                    "joint `{}` reachable through two paths",
                    joints[id.index()].name
                )));
            }
            visited[id.index()] = true;
            order.push(id);
            // Reversed so the first declared child is visited first
            for &child in joints[id.index()].children.iter().rev() {
                stack.push(child);
            }
        }
        if order.len() != joints.len() {
            return Err(Error::InvalidHierarchy(format!(
                "{} of {} joints unreachable from `{ROOT_NAME}` (cycle or broken link)",
                joints.len() - order.len(),
                joints.len()
            )));
        }

        Ok(Self {
            joints,
            by_name,
            order,
            root,
        })
    }

    /// Id of the root joint.
    pub fn root(&self) -> JointId {
        self.root
    }

    /// Total number of joints.
    pub fn len(&self) -> usize {
        self.joints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }

    /// Look up a joint by name.
    pub fn joint(&self, name: &str) -> Option<&Joint> {
        self.joint_id(name).map(|id| &self[id])
    }

    /// Look up a joint id by name.
    pub fn joint_id(&self, name: &str) -> Option<JointId> {
        self.by_name.get(name).copied()
    }

    /// Pre-order traversal (parents before children). This is the joint
    /// ordering used for tensor assembly, identical across runs.
    pub fn traversal(&self) -> &[JointId] {
        &self.order
    }

    /// Iterate joints in pre-order.
    pub fn joints(&self) -> impl Iterator<Item = (JointId, &Joint)> {
        self.order.iter().map(move |&id| (id, &self[id]))
    }
}

impl std::ops::Index<JointId> for Skeleton {
    type Output = Joint;

    #[inline]
    fn index(&self, id: JointId) -> &Joint {
        &self.joints[id.index()]
    }
}

/// Indented hierarchy dump with per-joint geometry and DOF summary.
impl fmt::Display for Skeleton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn walk(
            skeleton: &Skeleton,
            id: JointId,
            depth: usize,
            f: &mut fmt::Formatter<'_>,
        ) -> fmt::Result {
            let joint = &skeleton[id];
            let dof: String = ["rx", "ry", "rz"]
                .iter()
                .zip(joint.limits.iter())
                .filter(|(_, l)| l.is_some())
                .map(|(n, _)| *n)
                .collect::<Vec<_>>()
                .join(" ");
            writeln!(
                f,
                "{:indent$}{} dir=({:.3} {:.3} {:.3}) len={:.3} dof=[{}]",
                "",
                joint.name,
                joint.direction.x,
                joint.direction.y,
                joint.direction.z,
                joint.length,
                dof,
                indent = depth * 2
            )?;
            for &child in &joint.children {
                walk(skeleton, child, depth + 1, f)?;
            }
            Ok(())
        }
        walk(self, self.root, 0, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limb(name: &str, parent: Option<usize>) -> Joint {
        let mut joint = Joint::new(
            name,
            DVec3::X,
            1.0,
            DVec3::ZERO,
            RotationOrder::Xyz,
            [None, None, Some(DofLimits { min: -180.0, max: 180.0 })],
        );
        joint.parent = parent.map(JointId::new);
        joint
    }

    fn chain() -> Vec<Joint> {
        let mut root = Joint::root();
        root.children.push(JointId::new(1));
        let mut upper = limb("upper", Some(0));
        upper.children.push(JointId::new(2));
        let lower = limb("lower", Some(1));
        vec![root, upper, lower]
    }

    #[test]
    fn test_preorder_parents_first() {
        let skeleton = Skeleton::new(chain()).unwrap();

        assert_eq!(skeleton.len(), 3);
        for (position, &id) in skeleton.traversal().iter().enumerate() {
            if let Some(parent) = skeleton[id].parent {
                let parent_position = skeleton
                    .traversal()
                    .iter()
                    .position(|&other| other == parent)
                    .unwrap();
                assert!(
                    parent_position < position,
                    "parent of `{}` visited after it",
                    skeleton[id].name
                );
            }
        }
    }

    #[test]
    fn test_parent_chain_terminates_at_root() {
        let skeleton = Skeleton::new(chain()).unwrap();

        for (id, _) in skeleton.joints() {
            let mut current = id;
            let mut steps = 0;
            while let Some(parent) = skeleton[current].parent {
                current = parent;
                steps += 1;
                assert!(steps <= skeleton.len(), "parent chain does not terminate");
            }
            assert_eq!(current, skeleton.root());
        }
    }

    #[test]
    fn test_local_frame_inverse_is_exact() {
        let joint = Joint::new(
            "bone",
            DVec3::new(0.3, -0.2, 0.9),
            4.0,
            DVec3::new(12.0, -34.0, 56.0),
            RotationOrder::Xyz,
            [None; 3],
        );
        let product = joint.local_frame * joint.local_frame_inv;

        assert!(product.abs_diff_eq(DMat3::IDENTITY, 1e-9));
    }

    #[test]
    fn test_direction_normalized() {
        let joint = Joint::new(
            "bone",
            DVec3::new(3.0, 0.0, 4.0),
            2.0,
            DVec3::ZERO,
            RotationOrder::Xyz,
            [None; 3],
        );

        assert!((joint.direction.length() - 1.0).abs() < 1e-12);
        assert!((joint.length - 2.0).abs() < 1e-12, "length must stay separate");
    }

    #[test]
    fn test_cycle_rejected() {
        let mut joints = chain();
        // lower adopts root: every joint now has a parent
        joints[0].parent = Some(JointId::new(2));
        joints[2].children.push(JointId::new(0));

        match Skeleton::new(joints) {
            Err(Error::InvalidHierarchy(_)) => {}
            other => panic!("expected InvalidHierarchy, got {other:?}"),
        }
    }

    #[test]
    fn test_second_root_rejected() {
        let mut joints = chain();
        joints.push(limb("stray", None));

        match Skeleton::new(joints) {
            Err(Error::InvalidHierarchy(_)) => {}
            other => panic!("expected InvalidHierarchy, got {other:?}"),
        }
    }

    #[test]
    fn test_oversized_arena_rejected() {
        let mut joints = vec![Joint::root()];
        for i in 1..=MAX_JOINTS {
            joints[0].children.push(JointId::new(i));
            joints.push(limb(&format!("bone{i}"), Some(0)));
        }
        assert_eq!(joints.len(), MAX_JOINTS + 1);

        match Skeleton::new(joints) {
            Err(Error::MalformedSkeleton(msg)) => {
                assert!(msg.contains("maximum"), "unhelpful message: {msg}")
            }
            other => panic!("expected MalformedSkeleton, got {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut joints = chain();
        joints[2].name = "upper".into();

        match Skeleton::new(joints) {
            Err(Error::MalformedSkeleton(_)) => {}
            other => panic!("expected MalformedSkeleton, got {other:?}"),
        }
    }

    #[test]
    fn test_display_lists_every_joint() {
        let skeleton = Skeleton::new(chain()).unwrap();
        let dump = skeleton.to_string();

        assert!(dump.contains("root"));
        assert!(dump.contains("  upper"));
        assert!(dump.contains("    lower"));
        assert!(dump.contains("dof=[rz]"));
    }
}
