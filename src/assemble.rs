//! Turning a geometry's patches into self-contained, renderer-ready bundles.

use std::collections::BTreeMap;

use nalgebra::{Matrix4, Vector4};

use hedron::{BufferStore, Format, Geometry, InstanceSet, Patch, ResourceId, Semantic, Topology};

use crate::{
    bounds::{BoundingSphere, PointSource},
    extract::{extract_elements, VertexBuffer, Window},
    Error, Result,
};

/// Semantics every bundle carries, synthesized when a patch omits them.
pub const REQUIRED_SEMANTICS: [Semantic; 3] =
    [Semantic::Color, Semantic::Normal, Semantic::Texture];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexBuffer {
    pub bytes: Vec<u8>,
    /// One of [`U8`](Format::U8), [`U16`](Format::U16), or [`U32`](Format::U32).
    pub format: Format,
    pub count: usize,
    /// Whether this is the implicit `0, 1, 2, ...` sequence of an unindexed patch.
    pub synthesized: bool,
}

impl IndexBuffer {
    /// `[0, vertex_count)` as `u32`s.
    ///
    /// # Errors
    ///
    /// * [`TooManyVertices`](Error::TooManyVertices) if `vertex_count` doesn't fit in a `u32`.
    pub fn sequential(vertex_count: usize) -> Result<Self> {
        let end = u32::try_from(vertex_count).map_err(|_| Error::TooManyVertices(vertex_count))?;
        Ok(Self {
            bytes: (0..end).flat_map(u32::to_le_bytes).collect(),
            format: Format::U32,
            count: vertex_count,
            synthesized: true,
        })
    }

    /// Bytes per index.
    #[inline]
    pub fn element_width(&self) -> usize {
        self.format.byte_width()
    }
}

/// Per-instance data for instanced drawing.
///
/// Each instance is a 64-byte block of sixteen floats: position, color, rotation, and scale, in
/// that order, four floats apiece.
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceData {
    pub bytes: Vec<u8>,
    pub count: usize,
    /// `xyz` of each instance's position block, with `w = 1`.
    pub positions: Vec<Vector4<f32>>,
}

impl InstanceData {
    /// # Errors
    ///
    /// * [`MalformedInstanceBuffer`](Error::MalformedInstanceBuffer) if `bytes` isn't a whole
    ///   number of blocks.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        if bytes.len() % InstanceSet::STRIDE != 0 {
            return Err(Error::MalformedInstanceBuffer(bytes.len()));
        }
        let positions = bytes
            .chunks_exact(InstanceSet::STRIDE)
            .map(|block| {
                let c = |i: usize| {
                    f32::from_le_bytes([block[i], block[i + 1], block[i + 2], block[i + 3]])
                };
                Vector4::new(c(0), c(4), c(8), 1.0)
            })
            .collect::<Vec<_>>();
        Ok(Self {
            count: positions.len(),
            bytes,
            positions,
        })
    }
}

/// Everything a renderer needs to draw one patch.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshBundle {
    pub geometry: ResourceId,
    /// Index of the patch within its geometry.
    pub patch: usize,
    pub topology: Topology,
    pub material: ResourceId,
    pub vertex_count: usize,
    pub attributes: BTreeMap<Semantic, VertexBuffer>,
    pub index: IndexBuffer,
    pub instances: Option<InstanceData>,
    pub bounding_sphere: BoundingSphere,
    /// Texture coordinate normalization factor, taken from the `TEXTURE` buffer.
    pub normalization_factor: f64,
}

impl MeshBundle {
    #[inline]
    pub fn attribute(&self, semantic: Semantic) -> Option<&VertexBuffer> {
        self.attributes.get(&semantic)
    }

    /// Number of instances to draw, or `0` if not instanced.
    #[inline]
    pub fn instance_count(&self) -> usize {
        self.instances.as_ref().map_or(0, |i| i.count)
    }
}

/// Assembles patches against the buffers registered in a [BufferStore].
#[derive(Debug, Clone, Copy)]
pub struct GeometryAssembler<'store> {
    store: &'store BufferStore,
}

impl<'store> GeometryAssembler<'store> {
    #[inline]
    pub fn new(store: &'store BufferStore) -> Self {
        Self { store }
    }

    /// Assemble every patch of `geometry` independently; a failed patch doesn't affect the
    /// others.
    pub fn assemble(
        &self,
        id: ResourceId,
        geometry: &Geometry,
        instances: Option<&InstanceSet>,
        world: &Matrix4<f32>,
    ) -> Vec<Result<MeshBundle>> {
        geometry
            .patches
            .iter()
            .enumerate()
            .map(|(i, patch)| self.assemble_patch(id, i, patch, instances, world))
            .collect()
    }

    #[tracing::instrument(
        level = "debug",
        skip(self, patch, instances, world),
        fields(vertex_count = patch.vertex_count, topology = %patch.topology)
    )]
    pub fn assemble_patch(
        &self,
        geometry: ResourceId,
        index: usize,
        patch: &Patch,
        instances: Option<&InstanceSet>,
        world: &Matrix4<f32>,
    ) -> Result<MeshBundle> {
        if !patch.has(Semantic::Position) {
            return Err(Error::MissingPosition);
        }

        let mut attributes = BTreeMap::new();
        for attribute in &patch.attributes {
            if attributes.contains_key(&attribute.semantic) {
                tracing::debug!(
                    semantic = %attribute.semantic,
                    channel = attribute.channel,
                    "skipping additional attribute channel"
                );
                continue;
            }
            let view = self.store.view(&attribute.view)?;
            let raw = self.store.source(view)?;
            attributes.insert(
                attribute.semantic,
                VertexBuffer::extract(raw, view, attribute, patch.vertex_count)?,
            );
        }

        // no channel, default, or index may outrun the shortest channel read
        let vertex_count = attributes
            .values()
            .map(VertexBuffer::len)
            .min()
            .unwrap_or(0)
            .min(patch.vertex_count);
        if vertex_count < patch.vertex_count {
            tracing::warn!(
                declared = patch.vertex_count,
                available = vertex_count,
                "patch declares more vertices than its views hold; truncating"
            );
            for buffer in attributes.values_mut() {
                buffer.bytes.truncate(vertex_count * buffer.format.byte_width());
            }
        }

        let index_buffer = self.indices(patch, vertex_count)?;

        for semantic in REQUIRED_SEMANTICS {
            if !attributes.contains_key(&semantic) {
                if let Some(default) = VertexBuffer::default_for(semantic, vertex_count) {
                    tracing::trace!(%semantic, "synthesized default attribute");
                    attributes.insert(semantic, default);
                }
            }
        }

        let instances = instances.map(|set| self.instances(set)).transpose()?;

        let bounding_sphere = match &instances {
            Some(data) => {
                BoundingSphere::from_source(PointSource::Instances(&data.positions), world)?
            }
            None => {
                let positions = attributes
                    .get(&Semantic::Position)
                    .ok_or(Error::MissingPosition)?;
                BoundingSphere::from_source(
                    PointSource::Vertices {
                        bytes: &positions.bytes,
                        format: positions.format,
                    },
                    world,
                )?
            }
        };

        let normalization_factor = attributes
            .get(&Semantic::Texture)
            .and_then(|t| t.normalization_factor)
            .unwrap_or(1.0);

        tracing::debug!(
            indices = index_buffer.count,
            instances = instances.as_ref().map_or(0, |i| i.count),
            radius = bounding_sphere.radius,
            "assembled patch"
        );
        Ok(MeshBundle {
            geometry,
            patch: index,
            topology: patch.topology,
            material: patch.material,
            vertex_count,
            attributes,
            index: index_buffer,
            instances,
            bounding_sphere,
            normalization_factor,
        })
    }

    /// The patch's explicit indices, or a synthesized sequence if it has none, for a patch
    /// with `vertex_count` usable vertices.
    ///
    /// # Errors
    ///
    /// * [`UnsupportedFormat`](Error::UnsupportedFormat) if the index format isn't an unsigned
    ///   integer scalar.
    /// * [`IndexOutOfBounds`](Error::IndexOutOfBounds) if an index names a vertex at or past
    ///   `vertex_count`.
    pub fn indices(&self, patch: &Patch, vertex_count: usize) -> Result<IndexBuffer> {
        let Some(desc) = patch.indices else {
            return IndexBuffer::sequential(vertex_count);
        };
        if !desc.format.is_index() {
            return Err(Error::unsupported("index format", desc.format));
        }
        let view = self.store.view(&desc.view)?;
        let raw = self.store.source(view)?;
        let bytes = extract_elements(
            raw,
            view,
            Window {
                format: desc.format,
                offset: desc.offset,
                stride: desc.stride,
            },
            (desc.count > 0).then_some(desc.count),
        )?;
        let kind = desc.format.kind();
        for element in bytes.chunks_exact(desc.format.byte_width()) {
            let index = kind.read(element)? as u64;
            if index >= vertex_count as u64 {
                return Err(Error::IndexOutOfBounds {
                    index,
                    vertex_count,
                });
            }
        }
        Ok(IndexBuffer {
            count: bytes.len() / desc.format.byte_width(),
            bytes,
            format: desc.format,
            synthesized: false,
        })
    }

    /// Read every instance block covered by the set's view.
    pub fn instances(&self, set: &InstanceSet) -> Result<InstanceData> {
        let view = self.store.view(&set.view)?;
        InstanceData::from_bytes(self.store.view_bytes(view)?.to_vec())
    }
}
