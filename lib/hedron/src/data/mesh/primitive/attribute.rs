use std::{fmt, str::FromStr};

use crate::{Format, FormatError, ResourceId};

/// The role of a vertex attribute.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Semantic {
    Position,
    Normal,
    Tangent,
    Texture,
    Color,
}

impl Semantic {
    pub const ALL: [Semantic; 5] = [
        Semantic::Position,
        Semantic::Normal,
        Semantic::Tangent,
        Semantic::Texture,
        Semantic::Color,
    ];

    pub const fn tag(self) -> &'static str {
        match self {
            Semantic::Position => "POSITION",
            Semantic::Normal => "NORMAL",
            Semantic::Tangent => "TANGENT",
            Semantic::Texture => "TEXTURE",
            Semantic::Color => "COLOR",
        }
    }

    /// The vertex shader input this attribute is bound to.
    pub const fn shader_input(self) -> &'static str {
        match self {
            Semantic::Position => "in_position",
            Semantic::Normal => "in_normal",
            Semantic::Tangent => "in_tangent",
            Semantic::Texture => "in_texture",
            Semantic::Color => "in_color",
        }
    }
}

impl FromStr for Semantic {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Semantic::ALL
            .into_iter()
            .find(|t| t.tag() == s)
            .ok_or_else(|| FormatError::UnknownFormat(s.to_owned()))
    }
}

impl fmt::Display for Semantic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Describes where one vertex attribute lives within a buffer view and how it's encoded.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeDescriptor {
    pub view: ResourceId,
    pub semantic: Semantic,
    /// Distinguishes multiple attributes of the same semantic (e.g. a second UV set).
    pub channel: u32,
    pub format: Format,
    /// Byte offset of the first element, relative to the start of the view.
    pub offset: usize,
    /// Overrides the view's stride when nonzero.
    pub stride: usize,
    pub normalized: bool,
    pub minimum: Option<Vec<f32>>,
    pub maximum: Option<Vec<f32>>,
}

impl AttributeDescriptor {
    pub fn new(view: ResourceId, semantic: Semantic, format: Format) -> Self {
        Self {
            view,
            semantic,
            channel: 0,
            format,
            offset: 0,
            stride: 0,
            normalized: false,
            minimum: None,
            maximum: None,
        }
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_stride(mut self, stride: usize) -> Self {
        self.stride = stride;
        self
    }

    pub fn normalized(mut self, normalized: bool) -> Self {
        self.normalized = normalized;
        self
    }
}

/// Describes a patch's index stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IndexDescriptor {
    pub view: ResourceId,
    /// Must satisfy [`Format::is_index`].
    pub format: Format,
    /// Number of indices; `0` means "as many as the view holds".
    pub count: usize,
    pub offset: usize,
    /// Overrides the view's stride when nonzero.
    pub stride: usize,
}

impl IndexDescriptor {
    pub fn new(view: ResourceId, format: Format, count: usize) -> Self {
        Self {
            view,
            format,
            count,
            offset: 0,
            stride: 0,
        }
    }
}
