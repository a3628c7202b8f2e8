use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use hedron::{BufferStore, Geometry, ResourceId};

use crate::{
    fetch::Fetcher,
    queue::TaskSender,
    resource::{
        EntityState, ImageState, LightRecord, MaterialState, ResourceKind, SamplerState,
        TextureState,
    },
    scene::Scene,
    DecodedImage, Error, Result,
};

/// Everything the handlers and queued tasks operate on.
pub struct SceneState {
    pub(crate) store: BufferStore,
    pub(crate) geometries: HashMap<ResourceId, Geometry>,
    pub(crate) entities: HashMap<ResourceId, EntityState>,
    pub(crate) lights: HashMap<ResourceId, LightRecord>,
    pub(crate) materials: HashMap<ResourceId, MaterialState>,
    pub(crate) textures: HashMap<ResourceId, TextureState>,
    pub(crate) samplers: HashMap<ResourceId, SamplerState>,
    pub(crate) images: HashMap<ResourceId, ImageState>,
    pub(crate) scene: Scene,
    /// Fetches started but not yet delivered.
    pub(crate) pending: HashSet<(ResourceKind, ResourceId)>,
    pub(crate) failed_fetches: HashMap<(ResourceKind, ResourceId), String>,
    pub(crate) tasks: TaskSender<SceneState>,
    pub(crate) fetcher: Arc<dyn Fetcher>,
}

impl std::fmt::Debug for SceneState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneState")
            .field("geometries", &self.geometries.len())
            .field("entities", &self.entities.len())
            .field("lights", &self.lights.len())
            .field("materials", &self.materials.len())
            .field("textures", &self.textures.len())
            .field("images", &self.images.len())
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}

impl SceneState {
    pub(crate) fn new(tasks: TaskSender<SceneState>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            store: BufferStore::new(),
            geometries: HashMap::new(),
            entities: HashMap::new(),
            lights: HashMap::new(),
            materials: HashMap::new(),
            textures: HashMap::new(),
            samplers: HashMap::new(),
            images: HashMap::new(),
            scene: Scene::new(),
            pending: HashSet::new(),
            failed_fetches: HashMap::new(),
            tasks,
            fetcher,
        }
    }

    #[inline]
    pub fn store(&self) -> &BufferStore {
        &self.store
    }

    #[inline]
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// A handle for queueing work to run at the next frame.
    #[inline]
    pub fn tasks(&self) -> &TaskSender<SceneState> {
        &self.tasks
    }

    pub fn geometry(&self, id: &ResourceId) -> Result<&Geometry> {
        self.geometries
            .get(id)
            .ok_or_else(|| Error::unknown(ResourceKind::Geometry, *id))
    }

    pub fn entity(&self, id: &ResourceId) -> Result<&EntityState> {
        self.entities
            .get(id)
            .ok_or_else(|| Error::unknown(ResourceKind::Entity, *id))
    }

    pub fn entity_mut(&mut self, id: &ResourceId) -> Result<&mut EntityState> {
        self.entities
            .get_mut(id)
            .ok_or_else(|| Error::unknown(ResourceKind::Entity, *id))
    }

    pub fn light(&self, id: &ResourceId) -> Result<&LightRecord> {
        self.lights
            .get(id)
            .ok_or_else(|| Error::unknown(ResourceKind::Light, *id))
    }

    pub fn material(&self, id: &ResourceId) -> Result<&MaterialState> {
        self.materials
            .get(id)
            .ok_or_else(|| Error::unknown(ResourceKind::Material, *id))
    }

    pub fn texture(&self, id: &ResourceId) -> Result<&TextureState> {
        self.textures
            .get(id)
            .ok_or_else(|| Error::unknown(ResourceKind::Texture, *id))
    }

    pub fn sampler(&self, id: &ResourceId) -> Result<&SamplerState> {
        self.samplers
            .get(id)
            .ok_or_else(|| Error::unknown(ResourceKind::Sampler, *id))
    }

    /// The decoded pixels of an image, once available.
    pub fn image(&self, id: &ResourceId) -> Result<Option<&Arc<DecodedImage>>> {
        self.images
            .get(id)
            .map(|image| image.decoded.as_ref())
            .ok_or_else(|| Error::unknown(ResourceKind::Image, *id))
    }

    /// Fetches that failed, with their error messages. Cleared when the resource is recreated
    /// or removed.
    pub fn failed_fetches(&self) -> impl Iterator<Item = (&(ResourceKind, ResourceId), &str)> {
        self.failed_fetches.iter().map(|(k, v)| (k, v.as_str()))
    }

    /// Whether a fetch for this resource is still in flight.
    #[inline]
    pub fn is_pending(&self, kind: ResourceKind, id: ResourceId) -> bool {
        self.pending.contains(&(kind, id))
    }

    /// Start fetching `uri` for the given resource. `process` runs on the fetch thread; its
    /// result is passed to `deliver` at the next drain, unless the resource was removed in the
    /// meantime.
    pub(crate) fn fetch<T, P, D>(
        &mut self,
        kind: ResourceKind,
        id: ResourceId,
        uri: &str,
        process: P,
        deliver: D,
    ) -> Result<()>
    where
        T: Send + 'static,
        P: FnOnce(Vec<u8>) -> Result<T> + Send + 'static,
        D: FnOnce(&mut SceneState, T) -> Result<()> + Send + 'static,
    {
        let uri = crate::fetch::parse_uri(uri)?;
        self.failed_fetches.remove(&(kind, id));
        self.pending.insert((kind, id));
        let spawned = crate::fetch::spawn_fetch(
            self.fetcher.clone(),
            uri,
            self.tasks.clone(),
            process,
            move |state: &mut SceneState, result| {
                if !state.pending.remove(&(kind, id)) {
                    tracing::debug!(%kind, %id, "discarding fetch for removed resource");
                    return Ok(());
                }
                match result {
                    Ok(value) => deliver(state, value),
                    Err(e) => {
                        state.failed_fetches.insert((kind, id), e.to_string());
                        Err(e)
                    }
                }
            },
        );
        if let Err(e) = spawned {
            self.pending.remove(&(kind, id));
            return Err(e.into());
        }
        Ok(())
    }

    /// Forget any fetch state for a removed resource.
    pub(crate) fn forget_fetch(&mut self, kind: ResourceKind, id: ResourceId) {
        self.pending.remove(&(kind, id));
        self.failed_fetches.remove(&(kind, id));
    }
}
