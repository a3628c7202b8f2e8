use crate::{Format, Topology};

impl Format {
    /// The vertex format a shader would read this encoding as, if one exists.
    ///
    /// Normalized integer encodings map onto `Unorm*` formats so that e.g. 8-bit colors arrive in
    /// the shader as `[0, 1]` floats.
    pub fn to_wgpu_vertex(self, normalized: bool) -> Option<wgpu::VertexFormat> {
        use wgpu::VertexFormat as V;
        Some(match (self, normalized) {
            (Format::U8Vec4, false) => V::Uint8x4,
            (Format::U8Vec4, true) => V::Unorm8x4,
            (Format::U16Vec2, false) => V::Uint16x2,
            (Format::U16Vec2, true) => V::Unorm16x2,
            (Format::U32, _) => V::Uint32,
            (Format::Vec2, _) => V::Float32x2,
            (Format::Vec3, _) => V::Float32x3,
            (Format::Vec4, _) => V::Float32x4,
            // no single-component 8/16-bit vertex formats; matrices span several locations
            (Format::U8 | Format::U16 | Format::Mat3 | Format::Mat4, _) => return None,
        })
    }

    /// The index format for this encoding. 8-bit indices have no GPU equivalent and must be
    /// widened before upload.
    pub fn to_wgpu_index(self) -> Option<wgpu::IndexFormat> {
        match self {
            Format::U16 => Some(wgpu::IndexFormat::Uint16),
            Format::U32 => Some(wgpu::IndexFormat::Uint32),
            _ => None,
        }
    }
}

impl Topology {
    /// `LINE_LOOP` has no native equivalent.
    pub fn to_wgpu(self) -> Option<wgpu::PrimitiveTopology> {
        use wgpu::PrimitiveTopology as P;
        match self {
            Topology::Points => Some(P::PointList),
            Topology::Lines => Some(P::LineList),
            Topology::LineStrip => Some(P::LineStrip),
            Topology::Triangles => Some(P::TriangleList),
            Topology::TriangleStrip => Some(P::TriangleStrip),
            Topology::LineLoop => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_indices_need_widening() {
        assert_eq!(Format::U8.to_wgpu_index(), None);
        assert_eq!(Format::U16.to_wgpu_index(), Some(wgpu::IndexFormat::Uint16));
        assert_eq!(Format::Vec3.to_wgpu_index(), None);
    }

    #[test]
    fn normalized_colors_are_unorm() {
        assert_eq!(
            Format::U8Vec4.to_wgpu_vertex(true),
            Some(wgpu::VertexFormat::Unorm8x4)
        );
        assert_eq!(
            Format::U8Vec4.to_wgpu_vertex(false),
            Some(wgpu::VertexFormat::Uint8x4)
        );
        assert_eq!(Format::Mat4.to_wgpu_vertex(false), None);
    }

    #[test]
    fn line_loops_have_no_primitive() {
        assert_eq!(Topology::LineLoop.to_wgpu(), None);
        assert_eq!(
            Topology::Triangles.to_wgpu(),
            Some(wgpu::PrimitiveTopology::TriangleList)
        );
    }
}
