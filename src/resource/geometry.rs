use hedron::ResourceId;

use crate::{
    resource::{Resource, ResourceHandler, ResourceKind},
    state::SceneState,
    Result,
};

/// Stores patch lists. Assembly happens when an entity referencing the geometry is rendered.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeometryHandler;

impl ResourceHandler for GeometryHandler {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Geometry
    }

    fn on_create(&self, state: &mut SceneState, id: ResourceId, resource: Resource) -> Result<()> {
        let geometry = match resource {
            Resource::Geometry(geometry) => geometry,
            other => return Err(other.mismatch(ResourceKind::Geometry)),
        };
        tracing::debug!(
            %id,
            name = geometry.name.as_deref(),
            patches = geometry.patches.len(),
            "registered geometry"
        );
        state.geometries.insert(id, geometry);
        Ok(())
    }

    fn on_remove(&self, state: &mut SceneState, id: ResourceId) -> Result<()> {
        state.geometries.remove(&id);
        Ok(())
    }
}
