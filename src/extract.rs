//! Pulling tightly packed element data out of strided buffer views.

use hedron::{AttributeDescriptor, Buffer, BufferView, Format, Semantic};

use crate::{Error, Result};

/// Where a run of elements lives within a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub format: Format,
    /// Byte offset of the first element, relative to the start of the view.
    pub offset: usize,
    /// Overrides the view's stride when nonzero.
    pub stride: usize,
}

impl Window {
    /// Distance between consecutive elements: this window's own stride, else the view's, else
    /// the element width.
    #[inline]
    pub fn stride_in(&self, view: &BufferView) -> usize {
        if self.stride != 0 {
            self.stride
        } else {
            view.stride_or(self.format.byte_width())
        }
    }
}

impl From<&AttributeDescriptor> for Window {
    fn from(attr: &AttributeDescriptor) -> Self {
        Self {
            format: attr.format,
            offset: attr.offset,
            stride: attr.stride,
        }
    }
}

/// Copy up to `limit` elements described by `window` out of `view`, dropping any interleaved
/// bytes between them.
///
/// Fewer than `limit` elements are returned if the view runs out first.
///
/// # Errors
///
/// * [`OutOfRange`](hedron::BufferError::OutOfRange) if the view reaches past the end of `raw`.
pub fn extract_elements(
    raw: &Buffer,
    view: &BufferView,
    window: Window,
    limit: Option<usize>,
) -> Result<Vec<u8>> {
    let span = raw.get(view.offset, view.length)?;
    let width = window.format.byte_width();
    let stride = window.stride_in(view);

    let available = span.len().saturating_sub(window.offset);
    let fit = if available >= width {
        (available - width) / stride + 1
    } else {
        0
    };
    let count = match limit {
        Some(limit) if limit > fit => {
            tracing::warn!(
                requested = limit,
                available = fit,
                format = %window.format,
                "view holds fewer elements than requested"
            );
            fit
        }
        Some(limit) => limit,
        None => fit,
    };

    let mut out = Vec::with_capacity(count * width);
    for i in 0..count {
        let start = window.offset + i * stride;
        out.extend_from_slice(&span[start..start + width]);
    }
    tracing::trace!(count, width, stride, "extracted elements");
    Ok(out)
}

/// Extract `vertex_count` elements of one vertex attribute.
pub fn extract(
    raw: &Buffer,
    view: &BufferView,
    attribute: &AttributeDescriptor,
    vertex_count: usize,
) -> Result<Vec<u8>> {
    extract_elements(raw, view, attribute.into(), Some(vertex_count))
}

/// The largest value representable by each component of `format`, as used to rescale
/// normalized texture coordinates.
#[inline]
pub fn normalization_factor(format: Format) -> f64 {
    2f64.powi(format.kind().bits() as i32) - 1.0
}

/// Convert packed color data of any 3- or 4-component format into RGBA bytes.
///
/// [`U8VEC4`](Format::U8Vec4) data is returned unchanged. Other formats are mapped onto
/// `[0, 255]` per component, and three-component colors gain an opaque alpha.
///
/// # Errors
///
/// * [`UnsupportedFormat`](Error::UnsupportedFormat) if `format` has neither 3 nor 4
///   components.
pub fn reformat_color(bytes: &[u8], format: Format) -> Result<Vec<u8>> {
    if format == Format::U8Vec4 {
        return Ok(bytes.to_vec());
    }
    let info = format.info();
    if !(3..=4).contains(&info.components) {
        return Err(Error::unsupported("color format", format));
    }

    let mut out = Vec::with_capacity(bytes.len() / info.byte_width() * 4);
    for element in bytes.chunks_exact(info.byte_width()) {
        for component in element.chunks_exact(info.component_size) {
            out.push((info.kind.read_unorm(component)? * 255.0).round() as u8);
        }
        if info.components == 3 {
            out.push(u8::MAX);
        }
    }
    Ok(out)
}

/// A packed vertex attribute ready for upload.
#[derive(Debug, Clone, PartialEq)]
pub struct VertexBuffer {
    pub semantic: Semantic,
    pub format: Format,
    pub normalized: bool,
    pub bytes: Vec<u8>,
    /// Set for texture coordinates: the value a normalized component is divided by.
    pub normalization_factor: Option<f64>,
    /// Whether this buffer was filled with defaults rather than read from the scene.
    pub synthesized: bool,
}

impl VertexBuffer {
    /// Extract and convert one attribute.
    ///
    /// Colors are converted to [`U8VEC4`](Format::U8Vec4); texture coordinates record their
    /// normalization factor.
    #[tracing::instrument(
        level = "trace",
        skip_all,
        fields(semantic = %attribute.semantic, format = %attribute.format)
    )]
    pub fn extract(
        raw: &Buffer,
        view: &BufferView,
        attribute: &AttributeDescriptor,
        vertex_count: usize,
    ) -> Result<Self> {
        let bytes = extract(raw, view, attribute, vertex_count)?;
        Ok(match attribute.semantic {
            Semantic::Color => Self {
                semantic: Semantic::Color,
                format: Format::U8Vec4,
                normalized: true,
                bytes: reformat_color(&bytes, attribute.format)?,
                normalization_factor: None,
                synthesized: false,
            },
            semantic => Self {
                semantic,
                format: attribute.format,
                normalized: attribute.normalized,
                bytes,
                normalization_factor: (semantic == Semantic::Texture)
                    .then(|| normalization_factor(attribute.format)),
                synthesized: false,
            },
        })
    }

    /// Filler data for a semantic the renderer requires but a patch omitted: opaque white
    /// colors, zero normals, or zero texture coordinates.
    ///
    /// Returns `None` for semantics that have no default.
    pub fn default_for(semantic: Semantic, vertex_count: usize) -> Option<Self> {
        let (format, normalized, element): (Format, bool, &[u8]) = match semantic {
            Semantic::Color => (Format::U8Vec4, true, &[u8::MAX; 4][..]),
            Semantic::Normal => (Format::Vec3, false, &[0; 12][..]),
            Semantic::Texture => (Format::Vec2, false, &[0; 8][..]),
            _ => return None,
        };
        Some(Self {
            semantic,
            format,
            normalized,
            bytes: element.repeat(vertex_count),
            normalization_factor: (semantic == Semantic::Texture)
                .then(|| normalization_factor(format)),
            synthesized: true,
        })
    }

    /// Number of elements held.
    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len() / self.format.byte_width()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
