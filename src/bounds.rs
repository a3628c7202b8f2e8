//! World-space bounding spheres for assembled patches.

use nalgebra::{Matrix4, Point3, Vector4};

use hedron::Format;

use crate::{transform::transform_point, Error, Result};

/// A sphere enclosing every point of a patch (or of its instances).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    /// Center in world space.
    pub center: Point3<f32>,
    pub radius: f32,
    /// Center in the patch's own space, kept so the sphere can follow its entity.
    pub local_center: Point3<f32>,
}

/// The points a bounding sphere is computed over.
#[derive(Debug, Clone, Copy)]
pub enum PointSource<'data> {
    /// Packed vertex positions.
    Vertices { bytes: &'data [u8], format: Format },
    /// Per-instance translations; only `xyz` is used.
    Instances(&'data [Vector4<f32>]),
}

impl PointSource<'_> {
    /// Decode every point.
    ///
    /// # Errors
    ///
    /// * [`UnsupportedFormat`](Error::UnsupportedFormat) if vertex positions aren't
    ///   [`VEC3`](Format::Vec3).
    pub fn points(&self) -> Result<Vec<Point3<f32>>> {
        match *self {
            PointSource::Vertices { bytes, format } => {
                if format != Format::Vec3 {
                    return Err(Error::unsupported("position format", format));
                }
                Ok(bytes
                    .chunks_exact(Format::Vec3.byte_width())
                    .map(|v| {
                        let c = |i: usize| {
                            f32::from_le_bytes([v[i], v[i + 1], v[i + 2], v[i + 3]])
                        };
                        Point3::new(c(0), c(4), c(8))
                    })
                    .collect())
            }
            PointSource::Instances(positions) => Ok(positions
                .iter()
                .map(|p| Point3::new(p.x, p.y, p.z))
                .collect()),
        }
    }
}

impl BoundingSphere {
    /// Bound `points` with a sphere centered on their mean.
    ///
    /// The center is placed in world space through `world`; the radius is measured in local
    /// space.
    ///
    /// # Errors
    ///
    /// * [`EmptyPointSet`](Error::EmptyPointSet) if `points` is empty.
    pub fn from_points(points: &[Point3<f32>], world: &Matrix4<f32>) -> Result<Self> {
        if points.is_empty() {
            return Err(Error::EmptyPointSet);
        }
        let sum = points
            .iter()
            .fold(nalgebra::Vector3::<f64>::zeros(), |acc, p| {
                acc + p.coords.cast::<f64>()
            });
        let local_center = Point3::from((sum / points.len() as f64).cast::<f32>());
        let radius = points
            .iter()
            .map(|p| nalgebra::distance(p, &local_center))
            .fold(0.0f32, f32::max);
        Ok(Self {
            center: transform_point(world, &local_center),
            radius,
            local_center,
        })
    }

    pub fn from_source(source: PointSource<'_>, world: &Matrix4<f32>) -> Result<Self> {
        Self::from_points(&source.points()?, world)
    }

    /// Move the world-space center to follow a new world transform.
    #[inline]
    pub fn relocate(&mut self, world: &Matrix4<f32>) {
        self.center = transform_point(world, &self.local_center);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn two_points() {
        let sphere = BoundingSphere::from_points(
            &[Point3::origin(), Point3::new(2.0, 0.0, 0.0)],
            &Matrix4::identity(),
        )
        .unwrap();
        assert_relative_eq!(sphere.center, Point3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(sphere.radius, 1.0);
    }

    #[test]
    fn follows_world() {
        let mut world = Matrix4::identity();
        world[(3, 1)] = 5.0;
        let mut sphere =
            BoundingSphere::from_points(&[Point3::new(1.0, 1.0, 1.0)], &world).unwrap();
        assert_relative_eq!(sphere.center, Point3::new(1.0, 6.0, 1.0));
        assert_eq!(sphere.radius, 0.0);
        sphere.relocate(&Matrix4::identity());
        assert_relative_eq!(sphere.center, Point3::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn empty() {
        assert!(matches!(
            BoundingSphere::from_points(&[], &Matrix4::identity()),
            Err(Error::EmptyPointSet)
        ));
    }

    #[test]
    fn vec3_only() {
        let source = PointSource::Vertices {
            bytes: &[0; 8],
            format: Format::Vec2,
        };
        assert!(source.points().is_err());
    }
}
