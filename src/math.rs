//! Rotation-frame utilities built on glam's double-precision types.
//!
//! Motion-capture skeleton descriptions state all angles in degrees and
//! compose Euler rotations about the fixed (extrinsic) coordinate axes.
//! This module turns an angle triple plus an axis-application order into a
//! 3x3 rotation matrix; the inverse of a proper rotation is its transpose.

pub use glam::{DMat3, DVec3};

use std::str::FromStr;

/// Axis-application order for Euler composition.
///
/// `Xyz` means "rotate about world X first, then world Y, then world Z",
/// which composes as `Rz * Ry * Rx`. ASF files name this order on the
/// `axis` line (almost always `XYZ`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RotationOrder {
    #[default]
    Xyz,
    Xzy,
    Yxz,
    Yzx,
    Zxy,
    Zyx,
}

impl RotationOrder {
    /// Axis indices (0 = x, 1 = y, 2 = z) in application order.
    const fn axes(self) -> [usize; 3] {
        match self {
            RotationOrder::Xyz => [0, 1, 2],
            RotationOrder::Xzy => [0, 2, 1],
            RotationOrder::Yxz => [1, 0, 2],
            RotationOrder::Yzx => [1, 2, 0],
            RotationOrder::Zxy => [2, 0, 1],
            RotationOrder::Zyx => [2, 1, 0],
        }
    }
}

impl FromStr for RotationOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "XYZ" => Ok(RotationOrder::Xyz),
            "XZY" => Ok(RotationOrder::Xzy),
            "YXZ" => Ok(RotationOrder::Yxz),
            "YZX" => Ok(RotationOrder::Yzx),
            "ZXY" => Ok(RotationOrder::Zxy),
            "ZYX" => Ok(RotationOrder::Zyx),
            other => Err(format!("unknown rotation order `{other}`")),
        }
    }
}

fn axis_rotation(axis: usize, angle: f64) -> DMat3 {
    match axis {
        0 => DMat3::from_rotation_x(angle),
        1 => DMat3::from_rotation_y(angle),
        _ => DMat3::from_rotation_z(angle),
    }
}

/// Build a rotation matrix from per-axis angles in radians.
///
/// The angle vector is always indexed by axis (`x`, `y`, `z`) regardless of
/// the application order; the order only decides composition. Angles are
/// not range-checked: any real input yields a valid rotation.
pub fn euler_to_matrix(radians: DVec3, order: RotationOrder) -> DMat3 {
    let [first, second, third] = order.axes();
    axis_rotation(third, radians[third])
        * axis_rotation(second, radians[second])
        * axis_rotation(first, radians[first])
}

/// Same as [`euler_to_matrix`], taking degrees.
pub fn euler_deg_to_matrix(degrees: DVec3, order: RotationOrder) -> DMat3 {
    euler_to_matrix(
        DVec3::new(
            degrees.x.to_radians(),
            degrees.y.to_radians(),
            degrees.z.to_radians(),
        ),
        order,
    )
}
