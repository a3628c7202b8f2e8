//! Per-frame camera state and the draw list handed to the renderer.

use nalgebra::{Matrix4, Point3};

use hedron::ResourceId;

use crate::assemble::MeshBundle;

/// Attention of entities that aren't selected while something else is.
pub const DIMMED_ATTENTION: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderContext {
    pub projection: Matrix4<f32>,
    /// World-to-camera transform.
    pub camera: Matrix4<f32>,
    /// The camera's position in world space.
    pub camera_position: Point3<f32>,
    pub selection: Option<ResourceId>,
}

impl RenderContext {
    pub fn new(
        projection: Matrix4<f32>,
        camera: Matrix4<f32>,
        selection: Option<ResourceId>,
    ) -> Self {
        // the camera's own transform is the inverse of the view; its translation is the last row
        let camera_position = camera
            .try_inverse()
            .map(|world| Point3::new(world[(3, 0)], world[(3, 1)], world[(3, 2)]))
            .unwrap_or_else(|| {
                tracing::warn!("camera matrix isn't invertible; placing camera at origin");
                Point3::origin()
            });
        Self {
            projection,
            camera,
            camera_position,
            selection,
        }
    }

    /// 1 when nothing is selected or `entity` is, otherwise [DIMMED_ATTENTION].
    #[inline]
    pub fn attention(&self, entity: &ResourceId) -> f32 {
        match self.selection {
            Some(selected) if selected != *entity => DIMMED_ATTENTION,
            _ => 1.0,
        }
    }
}

/// One patch to draw this frame.
#[derive(Debug, Clone, Copy)]
pub struct DrawItem<'scene> {
    pub entity: ResourceId,
    pub bundle: &'scene MeshBundle,
    /// The entity's world transform.
    pub model: Matrix4<f32>,
    pub attention: f32,
}
