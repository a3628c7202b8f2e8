//! Resource records delivered by the server, and the handlers that react to their creation,
//! modification, and removal.
//!
//! Handlers run when a message arrives. Anything that touches render state beyond simple
//! bookkeeping is pushed onto the [task queue](crate::queue) to run at the next frame.

use std::{collections::HashMap, fmt};

use hedron::{BufferView, Geometry, ResourceId};

use crate::{state::SceneState, Error, Result};

mod buffer;
mod entity;
mod geometry;
mod images;
pub mod light;
mod material;

pub use buffer::{BufferHandler, BufferRecord, BufferSource, ViewHandler};
pub use entity::{EntityHandler, EntityRecord, EntityState, EntityUpdate, RenderRep};
pub use geometry::GeometryHandler;
pub use images::{DecodedImage, ImageHandler, ImageRecord, ImageSource, ImageState};
pub use light::{LightHandler, LightInfo, LightKind, LightRecord};
pub use material::{
    Filter, MaterialHandler, MaterialRecord, MaterialState, SamplerHandler, SamplerRecord,
    SamplerState, TextureBinding, TextureHandler, TextureRecord, TextureState, WrapMode,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    Buffer,
    BufferView,
    Geometry,
    Entity,
    Light,
    Material,
    Texture,
    Sampler,
    Image,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 9] = [
        ResourceKind::Buffer,
        ResourceKind::BufferView,
        ResourceKind::Geometry,
        ResourceKind::Entity,
        ResourceKind::Light,
        ResourceKind::Material,
        ResourceKind::Texture,
        ResourceKind::Sampler,
        ResourceKind::Image,
    ];
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ResourceKind::Buffer => "buffer",
            ResourceKind::BufferView => "buffer view",
            ResourceKind::Geometry => "geometry",
            ResourceKind::Entity => "entity",
            ResourceKind::Light => "light",
            ResourceKind::Material => "material",
            ResourceKind::Texture => "texture",
            ResourceKind::Sampler => "sampler",
            ResourceKind::Image => "image",
        })
    }
}

/// The full description of a newly created resource.
#[derive(Debug, Clone)]
pub enum Resource {
    Buffer(BufferRecord),
    BufferView(BufferView),
    Geometry(Geometry),
    Entity(EntityRecord),
    Light(LightRecord),
    Material(MaterialRecord),
    Texture(TextureRecord),
    Sampler(SamplerRecord),
    Image(ImageRecord),
}

impl Resource {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Resource::Buffer(_) => ResourceKind::Buffer,
            Resource::BufferView(_) => ResourceKind::BufferView,
            Resource::Geometry(_) => ResourceKind::Geometry,
            Resource::Entity(_) => ResourceKind::Entity,
            Resource::Light(_) => ResourceKind::Light,
            Resource::Material(_) => ResourceKind::Material,
            Resource::Texture(_) => ResourceKind::Texture,
            Resource::Sampler(_) => ResourceKind::Sampler,
            Resource::Image(_) => ResourceKind::Image,
        }
    }

    #[inline]
    pub(crate) fn mismatch(&self, expected: ResourceKind) -> Error {
        Error::KindMismatch {
            expected,
            actual: self.kind(),
        }
    }
}

/// Changes to a mutable resource. Buffers, views, and geometry are immutable once created.
#[derive(Debug, Clone)]
pub enum Update {
    Entity(EntityUpdate),
    Material(MaterialRecord),
    Light(LightRecord),
}

impl Update {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Update::Entity(_) => ResourceKind::Entity,
            Update::Material(_) => ResourceKind::Material,
            Update::Light(_) => ResourceKind::Light,
        }
    }

    #[inline]
    pub(crate) fn mismatch(&self, expected: ResourceKind) -> Error {
        Error::KindMismatch {
            expected,
            actual: self.kind(),
        }
    }
}

/// A lifecycle event for one resource, as parsed by the transport.
#[derive(Debug, Clone)]
pub enum Message {
    Create { id: ResourceId, resource: Resource },
    /// `kind` names the resource being changed; an `update` payload of another kind is
    /// rejected as a [KindMismatch](Error::KindMismatch).
    Update {
        kind: ResourceKind,
        id: ResourceId,
        update: Update,
    },
    Remove { kind: ResourceKind, id: ResourceId },
}

impl Message {
    /// An update addressed to the kind its payload describes.
    pub fn update(id: ResourceId, update: Update) -> Self {
        Message::Update {
            kind: update.kind(),
            id,
            update,
        }
    }

    pub fn kind(&self) -> ResourceKind {
        match self {
            Message::Create { resource, .. } => resource.kind(),
            Message::Update { kind, .. } | Message::Remove { kind, .. } => *kind,
        }
    }

    pub fn id(&self) -> ResourceId {
        match self {
            Message::Create { id, .. }
            | Message::Update { id, .. }
            | Message::Remove { id, .. } => *id,
        }
    }
}

/// Reacts to the lifecycle of one kind of resource.
pub trait ResourceHandler: Send + Sync {
    fn kind(&self) -> ResourceKind;

    fn on_create(&self, state: &mut SceneState, id: ResourceId, resource: Resource)
        -> Result<()>;

    /// Defaults to rejecting the update as [Immutable](Error::Immutable).
    fn on_update(&self, state: &mut SceneState, id: ResourceId, update: Update) -> Result<()> {
        let _ = (state, id, update);
        Err(Error::Immutable(self.kind()))
    }

    fn on_remove(&self, state: &mut SceneState, id: ResourceId) -> Result<()>;
}

/// Routes messages to the handler registered for their resource kind.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<ResourceKind, Box<dyn ResourceHandler>>,
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.handlers.keys()).finish()
    }
}

impl HandlerRegistry {
    /// A registry with no handlers.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the built-in handler for every kind.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(BufferHandler);
        registry.register(ViewHandler);
        registry.register(GeometryHandler);
        registry.register(EntityHandler);
        registry.register(LightHandler);
        registry.register(MaterialHandler);
        registry.register(TextureHandler);
        registry.register(SamplerHandler);
        registry.register(ImageHandler);
        registry
    }

    /// Install `handler` for its kind, returning the handler it replaces.
    pub fn register(
        &mut self,
        handler: impl ResourceHandler + 'static,
    ) -> Option<Box<dyn ResourceHandler>> {
        self.handlers.insert(handler.kind(), Box::new(handler))
    }

    #[tracing::instrument(
        level = "debug",
        skip(self, state, message),
        fields(kind = %message.kind(), id = %message.id())
    )]
    pub fn dispatch(&self, state: &mut SceneState, message: Message) -> Result<()> {
        let kind = message.kind();
        let handler = self.handlers.get(&kind).ok_or(Error::Unhandled(kind))?;
        match message {
            Message::Create { id, resource } => handler.on_create(state, id, resource),
            Message::Update { id, update, .. } => handler.on_update(state, id, update),
            Message::Remove { id, .. } => handler.on_remove(state, id),
        }
    }
}
