use hedron::{BufferError, FormatError, ResourceId};

use crate::{fetch::FetchError, resource::ResourceKind};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error(transparent)]
    Buffer(#[from] BufferError),
    #[error("instance buffer of {0} bytes is not a whole number of 64-byte matrices")]
    MalformedInstanceBuffer(usize),
    #[error("cannot bound an empty set of points")]
    EmptyPointSet,
    #[error("row {0} of the transform has no scale; rotation is undefined")]
    DegenerateScale(usize),
    #[error("buffer {0} has neither inline bytes nor a source URI")]
    MissingBufferSource(ResourceId),
    #[error("unsupported {role}: {name}")]
    UnsupportedFormat { role: &'static str, name: String },
    #[error("patch declares no POSITION attribute")]
    MissingPosition,
    #[error("{0} vertices can't be addressed by 32-bit indices")]
    TooManyVertices(usize),
    #[error("index {index} refers past the last of {vertex_count} vertices")]
    IndexOutOfBounds { index: u64, vertex_count: usize },
    #[error("no {kind} registered as {id}")]
    UnknownResource { kind: ResourceKind, id: ResourceId },
    #[error("expected a {expected} resource, received a {actual}")]
    KindMismatch {
        expected: ResourceKind,
        actual: ResourceKind,
    },
    #[error("{0} resources cannot be updated")]
    Immutable(ResourceKind),
    #[error("no handler registered for {0} resources")]
    Unhandled(ResourceKind),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[cfg(feature = "images")]
    #[error(transparent)]
    Image(#[from] image::ImageError),
}

impl Error {
    #[inline]
    pub(crate) fn unknown(kind: ResourceKind, id: ResourceId) -> Self {
        Self::UnknownResource { kind, id }
    }

    #[inline]
    pub(crate) fn unsupported(role: &'static str, name: impl ToString) -> Self {
        Self::UnsupportedFormat {
            role,
            name: name.to_string(),
        }
    }

    /// Whether this error came from reading outside of a buffer or view.
    pub fn is_out_of_range(&self) -> bool {
        matches!(self, Error::Buffer(BufferError::OutOfRange { .. }))
    }
}
