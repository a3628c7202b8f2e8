use std::{fmt, str::FromStr};

use crate::{FormatError, ResourceId};

pub mod attribute;

use attribute::{AttributeDescriptor, IndexDescriptor, Semantic};

/// The method by which vertices are interpreted as topological primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Topology {
    Points,
    Lines,
    LineLoop,
    LineStrip,
    #[default]
    Triangles,
    TriangleStrip,
}

impl Topology {
    pub const ALL: [Topology; 6] = [
        Topology::Points,
        Topology::Lines,
        Topology::LineLoop,
        Topology::LineStrip,
        Topology::Triangles,
        Topology::TriangleStrip,
    ];

    pub const fn tag(self) -> &'static str {
        match self {
            Topology::Points => "POINTS",
            Topology::Lines => "LINES",
            Topology::LineLoop => "LINE_LOOP",
            Topology::LineStrip => "LINE_STRIP",
            Topology::Triangles => "TRIANGLES",
            Topology::TriangleStrip => "TRIANGLE_STRIP",
        }
    }
}

impl FromStr for Topology {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Topology::ALL
            .into_iter()
            .find(|t| t.tag() == s)
            .ok_or_else(|| FormatError::UnknownFormat(s.to_owned()))
    }
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// One drawable group of vertices sharing a material and a topology.
#[derive(Debug, Clone, PartialEq)]
pub struct Patch {
    /// Vertex attributes, in declaration order.
    pub attributes: Vec<AttributeDescriptor>,
    /// Indices of each vertex within each attribute. If absent, equivalent to `[0, 1, 2, ...]`.
    pub indices: Option<IndexDescriptor>,
    pub vertex_count: usize,
    pub topology: Topology,
    pub material: ResourceId,
}

impl Patch {
    pub fn new(vertex_count: usize, topology: Topology, material: ResourceId) -> Self {
        Self {
            attributes: Vec::new(),
            indices: None,
            vertex_count,
            topology,
            material,
        }
    }

    pub fn with_attribute(mut self, attribute: AttributeDescriptor) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn with_indices(mut self, indices: IndexDescriptor) -> Self {
        self.indices = Some(indices);
        self
    }

    /// The first attribute declared for `semantic`, if any.
    pub fn attribute(&self, semantic: Semantic) -> Option<&AttributeDescriptor> {
        self.attributes.iter().find(|a| a.semantic == semantic)
    }

    #[inline]
    pub fn has(&self, semantic: Semantic) -> bool {
        self.attribute(semantic).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topology_tags() {
        for t in Topology::ALL {
            assert_eq!(t.tag().parse::<Topology>().unwrap(), t);
        }
        assert!("QUADS".parse::<Topology>().is_err());
    }
}
