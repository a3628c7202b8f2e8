//! Conversion between 4×4 transform matrices and translation/rotation/scale triples.
//!
//! Matrices follow the row-vector convention used on the wire: a point `p` maps to world space
//! as `[p, 1] · M`, so the translation occupies the last row and the upper-left 3×3 block is
//! `diag(scale) · R`. Parent transforms therefore compose on the right: `global = local ·
//! parent_global`.

use nalgebra::{Matrix3, Matrix4, Point3, Rotation3, UnitQuaternion, Vector3};

use crate::{Error, Result};

/// Row norms at or below this are treated as zero scale.
pub const SCALE_EPSILON: f32 = 1e-6;

/// A transform split into translation, rotation, and per-axis scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trs {
    pub translation: Vector3<f32>,
    pub rotation: UnitQuaternion<f32>,
    pub scale: Vector3<f32>,
}

impl Default for Trs {
    fn default() -> Self {
        Self {
            translation: Vector3::zeros(),
            rotation: UnitQuaternion::identity(),
            scale: Vector3::repeat(1.0),
        }
    }
}

impl Trs {
    #[inline]
    pub fn new(
        translation: Vector3<f32>,
        rotation: UnitQuaternion<f32>,
        scale: Vector3<f32>,
    ) -> Self {
        Self {
            translation,
            rotation,
            scale,
        }
    }

    #[inline]
    pub fn to_matrix(&self) -> Matrix4<f32> {
        compose(&self.translation, &self.rotation, &self.scale)
    }

    #[inline]
    pub fn from_matrix(m: &Matrix4<f32>) -> Result<Self> {
        decompose(m)
    }
}

/// Build the matrix that scales, then rotates, then translates.
pub fn compose(
    translation: &Vector3<f32>,
    rotation: &UnitQuaternion<f32>,
    scale: &Vector3<f32>,
) -> Matrix4<f32> {
    // row-vector form of R is the transpose of nalgebra's column-vector rotation matrix
    let basis = Matrix3::from_diagonal(scale) * rotation.to_rotation_matrix().matrix().transpose();
    let mut m = Matrix4::identity();
    m.fixed_view_mut::<3, 3>(0, 0).copy_from(&basis);
    m.fixed_view_mut::<1, 3>(3, 0)
        .copy_from(&translation.transpose());
    m
}

/// Split a matrix back into its translation, rotation, and scale.
///
/// Shear is not representable and is lost. A reflection is folded into a negative X scale.
///
/// # Errors
///
/// * [`DegenerateScale`](Error::DegenerateScale) if any row of the upper-left 3×3 block has
///   (near) zero length, since no rotation can be recovered from it.
pub fn decompose(m: &Matrix4<f32>) -> Result<Trs> {
    let translation: Vector3<f32> = m.fixed_view::<1, 3>(3, 0).transpose();
    let mut basis: Matrix3<f32> = m.fixed_view::<3, 3>(0, 0).into_owned();
    let mut scale = Vector3::zeros();
    for (i, mut row) in basis.row_iter_mut().enumerate() {
        let norm = row.norm();
        if !(norm > SCALE_EPSILON) {
            return Err(Error::DegenerateScale(i));
        }
        row /= norm;
        scale[i] = norm;
    }
    if basis.determinant() < 0.0 {
        scale.x = -scale.x;
        basis.row_mut(0).neg_mut();
    }
    let rotation = UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(
        basis.transpose(),
    ));
    Ok(Trs {
        translation,
        rotation,
        scale,
    })
}

/// Reshape a protocol transform (16 floats, row by row) into a matrix.
#[inline]
pub fn from_protocol(flat: &[f32; 16]) -> Matrix4<f32> {
    Matrix4::from_row_slice(flat)
}

/// Flatten a matrix into protocol order; the inverse of [from_protocol].
pub fn to_protocol(m: &Matrix4<f32>) -> [f32; 16] {
    let mut flat = [0.0; 16];
    // column-major storage of the transpose is row-major storage of `m`
    flat.copy_from_slice(m.transpose().as_slice());
    flat
}

/// Map a point through a row-vector transform, dividing by the homogeneous coordinate.
pub fn transform_point(m: &Matrix4<f32>, p: &Point3<f32>) -> Point3<f32> {
    let h = p.to_homogeneous().transpose() * m;
    let w = h[3];
    if w.abs() > f32::EPSILON {
        Point3::new(h[0] / w, h[1] / w, h[2] / w)
    } else {
        Point3::new(h[0], h[1], h[2])
    }
}

/// Tracks which components of an interactively edited [Trs] have changed since the last
/// authoritative update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeTracker {
    pub translation: bool,
    pub rotation: bool,
    pub scale: bool,
}

impl ChangeTracker {
    #[inline]
    pub fn any(&self) -> bool {
        self.translation || self.rotation || self.scale
    }

    #[inline]
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn translation_in_last_row() {
        let m = compose(
            &Vector3::new(1.0, 2.0, 3.0),
            &UnitQuaternion::identity(),
            &Vector3::repeat(1.0),
        );
        assert_eq!(
            to_protocol(&m),
            [
                1.0, 0.0, 0.0, 0.0, //
                0.0, 1.0, 0.0, 0.0, //
                0.0, 0.0, 1.0, 0.0, //
                1.0, 2.0, 3.0, 1.0,
            ]
        );
        let trs = decompose(&m).unwrap();
        assert_relative_eq!(trs.translation, Vector3::new(1.0, 2.0, 3.0));
        assert_relative_eq!(trs.scale, Vector3::repeat(1.0));
        assert_relative_eq!(trs.rotation.angle(), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn rotation_matches_row_vector_points() {
        let q = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), std::f32::consts::FRAC_PI_2);
        let m = compose(&Vector3::zeros(), &q, &Vector3::new(2.0, 2.0, 2.0));
        let p = transform_point(&m, &Point3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(p, Point3::new(0.0, 2.0, 0.0), epsilon = 1e-5);
    }

    #[test]
    fn zero_scale_is_degenerate() {
        let mut m = Matrix4::identity();
        m[(1, 1)] = 0.0;
        assert!(matches!(decompose(&m), Err(Error::DegenerateScale(1))));
    }

    #[test]
    fn reflection_becomes_negative_scale() {
        let m = compose(
            &Vector3::zeros(),
            &UnitQuaternion::identity(),
            &Vector3::new(-1.0, 1.0, 1.0),
        );
        let trs = decompose(&m).unwrap();
        assert_relative_eq!(trs.to_matrix(), m, epsilon = 1e-6);
    }

    #[test]
    fn protocol_round_trip() {
        let flat: [f32; 16] = std::array::from_fn(|i| i as f32);
        assert_eq!(to_protocol(&from_protocol(&flat)), flat);
        assert_eq!(from_protocol(&flat)[(3, 0)], 12.0);
    }
}
