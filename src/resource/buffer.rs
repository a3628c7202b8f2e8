use hedron::ResourceId;

use crate::{
    resource::{Resource, ResourceHandler, ResourceKind},
    state::SceneState,
    Error, Result,
};

/// Where a buffer's bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BufferSource {
    Inline(Vec<u8>),
    Uri(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferRecord {
    pub name: Option<String>,
    /// Size in bytes, as declared by the server.
    pub size: usize,
    pub source: Option<BufferSource>,
}

impl BufferRecord {
    pub fn inline(bytes: Vec<u8>) -> Self {
        Self {
            name: None,
            size: bytes.len(),
            source: Some(BufferSource::Inline(bytes)),
        }
    }

    pub fn uri(uri: impl Into<String>, size: usize) -> Self {
        Self {
            name: None,
            size,
            source: Some(BufferSource::Uri(uri.into())),
        }
    }
}

fn register(state: &mut SceneState, id: ResourceId, bytes: Vec<u8>, size: usize) -> Result<()> {
    if bytes.len() != size {
        tracing::warn!(%id, declared = size, actual = bytes.len(), "buffer size mismatch");
    }
    state.store.insert_buffer(id, bytes)?;
    for entity in state.entities_using_buffer(&id) {
        tracing::debug!(buffer = %id, %entity, "buffer arrived; re-rendering entity");
        state
            .tasks
            .push(move |state| super::entity::render(state, entity));
    }
    super::images::buffer_ready(state, id);
    Ok(())
}

impl SceneState {
    /// Entities whose render representation reads from `buffer`.
    fn entities_using_buffer(&self, buffer: &ResourceId) -> Vec<ResourceId> {
        let reads = |view: &ResourceId| {
            self.store
                .view(view)
                .is_ok_and(|view| view.buffer == *buffer)
        };
        self.entities
            .iter()
            .filter(|(_, entity)| {
                let Some(render) = &entity.render else {
                    return false;
                };
                render.instances.is_some_and(|set| reads(&set.view))
                    || self.geometries.get(&render.mesh).is_some_and(|geometry| {
                        geometry.patches.iter().any(|patch| {
                            patch.attributes.iter().any(|a| reads(&a.view))
                                || patch.indices.is_some_and(|i| reads(&i.view))
                        })
                    })
            })
            .map(|(id, _)| *id)
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BufferHandler;

impl ResourceHandler for BufferHandler {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Buffer
    }

    fn on_create(&self, state: &mut SceneState, id: ResourceId, resource: Resource) -> Result<()> {
        let record = match resource {
            Resource::Buffer(record) => record,
            other => return Err(other.mismatch(ResourceKind::Buffer)),
        };
        let size = record.size;
        match record.source {
            Some(BufferSource::Inline(bytes)) => register(state, id, bytes, size),
            Some(BufferSource::Uri(uri)) => state.fetch(
                ResourceKind::Buffer,
                id,
                &uri,
                Ok,
                move |state, bytes| register(state, id, bytes, size),
            ),
            None => Err(Error::MissingBufferSource(id)),
        }
    }

    fn on_remove(&self, state: &mut SceneState, id: ResourceId) -> Result<()> {
        state.forget_fetch(ResourceKind::Buffer, id);
        state.store.remove_buffer(&id);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ViewHandler;

impl ResourceHandler for ViewHandler {
    fn kind(&self) -> ResourceKind {
        ResourceKind::BufferView
    }

    fn on_create(&self, state: &mut SceneState, id: ResourceId, resource: Resource) -> Result<()> {
        let view = match resource {
            Resource::BufferView(view) => view,
            other => return Err(other.mismatch(ResourceKind::BufferView)),
        };
        state.store.insert_view(id, view)?;
        Ok(())
    }

    fn on_remove(&self, state: &mut SceneState, id: ResourceId) -> Result<()> {
        state.store.remove_view(&id);
        Ok(())
    }
}
