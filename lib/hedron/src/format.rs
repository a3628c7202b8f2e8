//! The registry of element encodings a remote scene may reference.
//!
//! Every encoding is named by a protocol tag (`"VEC3"`, `"U8VEC4"`, ...) and resolves to a
//! [FormatInfo]: how many components an element has, what numeric kind each component is, and
//! how many bytes each component occupies. All values are little-endian.

use std::{fmt, str::FromStr};

use num_traits::{AsPrimitive, PrimInt};

#[cfg(feature = "wgpu")]
mod wgpu;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    #[error("unknown element format: {0:?}")]
    UnknownFormat(String),
    #[error("component data too short: expected {expected} bytes, found {actual}")]
    Truncated { expected: usize, actual: usize },
}

/// The numeric type of a single component of an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumericKind {
    U8,
    U16,
    U32,
    F32,
}

impl NumericKind {
    pub const fn size(self) -> usize {
        use std::mem::size_of;
        match self {
            NumericKind::U8 => size_of::<u8>(),
            NumericKind::U16 => size_of::<u16>(),
            NumericKind::U32 => size_of::<u32>(),
            NumericKind::F32 => size_of::<f32>(),
        }
    }

    #[inline]
    pub const fn bits(self) -> u32 {
        self.size() as u32 * 8
    }

    #[inline]
    pub const fn is_float(self) -> bool {
        matches!(self, NumericKind::F32)
    }

    /// Decode one little-endian component from the front of `bytes`.
    pub fn read(self, bytes: &[u8]) -> Result<f64, FormatError> {
        let size = self.size();
        let raw = bytes.get(..size).ok_or(FormatError::Truncated {
            expected: size,
            actual: bytes.len(),
        })?;
        Ok(match self {
            NumericKind::U8 => raw[0] as f64,
            NumericKind::U16 => u16::from_le_bytes([raw[0], raw[1]]) as f64,
            NumericKind::U32 => u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) as f64,
            NumericKind::F32 => f32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) as f64,
        })
    }

    /// Decode one component and map it onto `[0, 1]`.
    ///
    /// Integer components are divided by the largest value their width can hold; float
    /// components are clamped.
    pub fn read_unorm(self, bytes: &[u8]) -> Result<f64, FormatError> {
        let v = self.read(bytes)?;
        Ok(match self {
            NumericKind::U8 => v / max_as_f64::<u8>(),
            NumericKind::U16 => v / max_as_f64::<u16>(),
            NumericKind::U32 => v / max_as_f64::<u32>(),
            NumericKind::F32 => v.clamp(0.0, 1.0),
        })
    }
}

#[inline]
fn max_as_f64<T: PrimInt + AsPrimitive<f64>>() -> f64 {
    T::max_value().as_()
}

/// The shape and width of an element, as returned by [describe].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FormatInfo {
    pub components: usize,
    pub kind: NumericKind,
    pub component_size: usize,
}

impl FormatInfo {
    /// Width of a single element, in bytes.
    #[inline]
    pub const fn byte_width(&self) -> usize {
        self.components * self.component_size
    }
}

/// A registered element encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Format {
    U8,
    U16,
    U32,
    U8Vec4,
    U16Vec2,
    Vec2,
    Vec3,
    Vec4,
    Mat3,
    Mat4,
}

impl Format {
    pub const ALL: [Format; 10] = [
        Format::U8,
        Format::U16,
        Format::U32,
        Format::U8Vec4,
        Format::U16Vec2,
        Format::Vec2,
        Format::Vec3,
        Format::Vec4,
        Format::Mat3,
        Format::Mat4,
    ];

    pub const fn components(self) -> usize {
        match self {
            Format::U8 | Format::U16 | Format::U32 => 1,
            Format::U16Vec2 | Format::Vec2 => 2,
            Format::Vec3 => 3,
            Format::U8Vec4 | Format::Vec4 => 4,
            Format::Mat3 => 9,
            Format::Mat4 => 16,
        }
    }

    pub const fn kind(self) -> NumericKind {
        match self {
            Format::U8 | Format::U8Vec4 => NumericKind::U8,
            Format::U16 | Format::U16Vec2 => NumericKind::U16,
            Format::U32 => NumericKind::U32,
            Format::Vec2 | Format::Vec3 | Format::Vec4 | Format::Mat3 | Format::Mat4 => {
                NumericKind::F32
            }
        }
    }

    #[inline]
    pub const fn info(self) -> FormatInfo {
        FormatInfo {
            components: self.components(),
            kind: self.kind(),
            component_size: self.kind().size(),
        }
    }

    #[inline]
    pub const fn byte_width(self) -> usize {
        self.info().byte_width()
    }

    /// The name used for this format on the wire.
    pub const fn tag(self) -> &'static str {
        match self {
            Format::U8 => "U8",
            Format::U16 => "U16",
            Format::U32 => "U32",
            Format::U8Vec4 => "U8VEC4",
            Format::U16Vec2 => "U16VEC2",
            Format::Vec2 => "VEC2",
            Format::Vec3 => "VEC3",
            Format::Vec4 => "VEC4",
            Format::Mat3 => "MAT3",
            Format::Mat4 => "MAT4",
        }
    }

    /// Whether elements of this format may be used as primitive indices.
    #[inline]
    pub const fn is_index(self) -> bool {
        matches!(self, Format::U8 | Format::U16 | Format::U32)
    }
}

// widths as laid out by the equivalent rust types
mod _layout {
    use super::Format;
    use static_assertions::const_assert_eq;
    use std::mem::size_of;

    const_assert_eq!(Format::U8.byte_width(), size_of::<u8>());
    const_assert_eq!(Format::U16.byte_width(), size_of::<u16>());
    const_assert_eq!(Format::U32.byte_width(), size_of::<u32>());
    const_assert_eq!(Format::U8Vec4.byte_width(), size_of::<[u8; 4]>());
    const_assert_eq!(Format::U16Vec2.byte_width(), size_of::<[u16; 2]>());
    const_assert_eq!(Format::Vec2.byte_width(), size_of::<nalgebra::Vector2<f32>>());
    const_assert_eq!(Format::Vec3.byte_width(), size_of::<nalgebra::Vector3<f32>>());
    const_assert_eq!(Format::Vec4.byte_width(), size_of::<nalgebra::Vector4<f32>>());
    const_assert_eq!(Format::Mat3.byte_width(), size_of::<nalgebra::Matrix3<f32>>());
    const_assert_eq!(Format::Mat4.byte_width(), size_of::<nalgebra::Matrix4<f32>>());
}

impl FromStr for Format {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Format::ALL
            .into_iter()
            .find(|f| f.tag() == s)
            .ok_or_else(|| FormatError::UnknownFormat(s.to_owned()))
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Look up a protocol format tag.
///
/// # Errors
///
/// * [`UnknownFormat`](FormatError::UnknownFormat) if `tag` names no registered format.
pub fn describe(tag: &str) -> Result<FormatInfo, FormatError> {
    tag.parse::<Format>().map(Format::info)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registered_widths() {
        for format in Format::ALL {
            let info = describe(format.tag()).unwrap();
            assert_eq!(info.byte_width(), info.components * info.component_size);
            assert_eq!(info.component_size, info.kind.size());
            assert_eq!(info, format.info());
        }
        assert_eq!(describe("VEC3").unwrap().byte_width(), 12);
        assert_eq!(describe("U8VEC4").unwrap().byte_width(), 4);
        assert_eq!(describe("MAT4").unwrap().byte_width(), 64);
    }

    #[test]
    fn unknown_tag() {
        assert_eq!(
            describe("VEC5"),
            Err(FormatError::UnknownFormat("VEC5".to_owned()))
        );
        // tags are case-sensitive on the wire
        assert!(describe("vec3").is_err());
    }

    #[test]
    fn unorm_components() {
        assert_eq!(NumericKind::U8.read_unorm(&[255]).unwrap(), 1.0);
        assert_eq!(NumericKind::U16.read_unorm(&[0, 0]).unwrap(), 0.0);
        assert_eq!(
            NumericKind::U16.read_unorm(&u16::MAX.to_le_bytes()).unwrap(),
            1.0
        );
        assert_eq!(
            NumericKind::F32.read_unorm(&2.5f32.to_le_bytes()).unwrap(),
            1.0
        );
        assert_eq!(
            NumericKind::F32.read(&[0, 0]),
            Err(FormatError::Truncated {
                expected: 4,
                actual: 2
            })
        );
    }
}
