pub mod primitive;

pub use primitive::{attribute::*, *};

use crate::ResourceId;

/// A geometry resource: an ordered list of independently drawable [Patches](Patch).
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    pub name: Option<String>,
    pub patches: Vec<Patch>,
}

impl Geometry {
    pub fn new(patches: Vec<Patch>) -> Self {
        Self {
            name: None,
            patches,
        }
    }
}

/// A view over a flat array of column-major 4×4 `f32` matrices, one per instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstanceSet {
    pub view: ResourceId,
}

impl InstanceSet {
    /// Bytes per instance: sixteen 4-byte floats.
    pub const STRIDE: usize = 16 * std::mem::size_of::<f32>();
}
