//! ASF/AMC motion-capture parsing and batch forward kinematics.
//!
//! The pipeline is a pure batch transform over two text inputs:
//!
//! - [`parse_asf`] reads a skeleton description into an immutable
//!   [`Skeleton`] (joint tree, bone geometry, rotation-axis frames, DOF
//!   limits).
//! - [`parse_amc`] reads a motion description into an ordered sequence of
//!   [`MotionFrame`]s (per-joint channel values in degrees).
//! - [`Skeleton::solve`] runs forward kinematics for one frame and yields a
//!   [`Pose`] with every joint's world matrix and coordinate.
//! - [`assemble`] solves every frame and packs all world coordinates into a
//!   [`MotionTensor`] of shape `(frames, joints, 3)`.
//!
//! There is no inverse kinematics, retargeting or physics here, and no
//! rendering: a renderer consumes [`Pose`] or [`MotionTensor`] read-only.

pub mod amc;
pub mod asf;
pub mod error;
pub mod fk;
pub mod math;
pub mod skeleton;
pub mod tensor;

pub use amc::{parse_amc, MotionFrame};
pub use asf::parse_asf;
pub use error::{Error, Result};
pub use fk::{Pose, SolveOptions};
pub use math::{euler_deg_to_matrix, euler_to_matrix, RotationOrder};
pub use skeleton::{DofLimits, Joint, JointId, Skeleton, MAX_JOINTS, ROOT_NAME};
pub use tensor::{assemble, assemble_with, MotionTensor};

pub use glam::{DMat3, DVec3};
