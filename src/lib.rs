//! Client-side assembly of remotely described 3D scenes.
//!
//! A server describes a scene as buffers, views into those buffers, geometry patches that read
//! vertex attributes out of views, and entities that place geometry in the world. This crate
//! turns those descriptions into renderer-ready [MeshBundles](MeshBundle): packed vertex and
//! index data, optional per-instance data, and a world-space bounding sphere.
//!
//! Rendering itself, and the transport that produces [Messages](Message), live elsewhere.
#![cfg_attr(not(debug_assertions), warn(missing_docs))]

pub mod assemble;
pub mod bounds;
mod client;
pub mod context;
mod error;
pub mod extract;
pub mod fetch;
pub mod queue;
pub mod resource;
pub mod scene;
mod state;
pub mod transform;

pub use assemble::{GeometryAssembler, IndexBuffer, InstanceData, MeshBundle};
pub use bounds::BoundingSphere;
pub use client::Client;
pub use context::{DrawItem, RenderContext};
pub use error::Error;
pub use extract::VertexBuffer;
pub use resource::{DecodedImage, Message, Resource, ResourceKind, Update};
pub use state::SceneState;
pub use transform::Trs;

pub use hedron;

pub type Result<T, E = Error> = std::result::Result<T, E>;
