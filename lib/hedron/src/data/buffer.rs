use std::{collections::HashMap, ops::Range, sync::Arc};

use crate::ResourceId;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BufferError {
    #[error("byte range {start}..{end} out of bounds of {len}-byte {container}")]
    OutOfRange {
        start: usize,
        end: usize,
        len: usize,
        container: &'static str,
    },
    #[error("no buffer registered as {0}")]
    UnknownBuffer(ResourceId),
    #[error("no buffer view registered as {0}")]
    UnknownView(ResourceId),
    #[error("{0} is already registered; buffers and views are write-once")]
    AlreadyRegistered(ResourceId),
}

/// An immutable blob of bytes delivered by the server, either inline or fetched from a URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Buffer {
    data: Box<[u8]>,
}

impl Buffer {
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Borrow `len` bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// * [`OutOfRange`](BufferError::OutOfRange) if the range isn't contained by `self`.
    pub fn get(&self, offset: usize, len: usize) -> Result<&[u8], BufferError> {
        let range = checked_range(offset, len, self.len(), "buffer")?;
        Ok(&self.data[range])
    }
}

impl From<Vec<u8>> for Buffer {
    fn from(data: Vec<u8>) -> Self {
        Self {
            data: data.into_boxed_slice(),
        }
    }
}

impl From<&[u8]> for Buffer {
    fn from(data: &[u8]) -> Self {
        Self { data: data.into() }
    }
}

fn checked_range(
    start: usize,
    len: usize,
    bound: usize,
    container: &'static str,
) -> Result<Range<usize>, BufferError> {
    match start.checked_add(len) {
        Some(end) if end <= bound => Ok(start..end),
        end => Err(BufferError::OutOfRange {
            start,
            end: end.unwrap_or(usize::MAX),
            len: bound,
            container,
        }),
    }
}

/// A byte window into a [Buffer]. Pure metadata; the bytes stay with the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferView {
    /// The buffer this view reads from.
    pub buffer: ResourceId,
    pub offset: usize,
    pub length: usize,
    /// Distance between the starts of consecutive elements; `0` means tightly packed.
    pub stride: usize,
}

impl BufferView {
    #[inline]
    pub fn new(buffer: ResourceId, offset: usize, length: usize, stride: usize) -> Self {
        Self {
            buffer,
            offset,
            length,
            stride,
        }
    }

    /// The stride between elements of `packed` bytes, taking `0` to mean tightly packed.
    #[inline]
    pub fn stride_or(&self, packed: usize) -> usize {
        if self.stride == 0 {
            packed
        } else {
            self.stride
        }
    }
}

/// Owns every registered [Buffer] and [BufferView].
///
/// Buffers are shared out as `Arc<Buffer>` and never change after insertion, so any number of
/// readers may hold them while the store keeps accepting new registrations.
#[derive(Debug, Default)]
pub struct BufferStore {
    buffers: HashMap<ResourceId, Arc<Buffer>>,
    views: HashMap<ResourceId, BufferView>,
}

impl BufferStore {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_buffer(
        &mut self,
        id: ResourceId,
        buffer: impl Into<Buffer>,
    ) -> Result<Arc<Buffer>, BufferError> {
        if self.buffers.contains_key(&id) {
            return Err(BufferError::AlreadyRegistered(id));
        }
        let buffer = Arc::new(buffer.into());
        tracing::trace!(%id, len = buffer.len(), "registered buffer");
        self.buffers.insert(id, buffer.clone());
        Ok(buffer)
    }

    pub fn insert_view(&mut self, id: ResourceId, view: BufferView) -> Result<(), BufferError> {
        if self.views.contains_key(&id) {
            return Err(BufferError::AlreadyRegistered(id));
        }
        tracing::trace!(
            %id,
            buffer = %view.buffer,
            offset = view.offset,
            length = view.length,
            stride = view.stride,
            "registered buffer view"
        );
        self.views.insert(id, view);
        Ok(())
    }

    #[inline]
    pub fn remove_buffer(&mut self, id: &ResourceId) -> Option<Arc<Buffer>> {
        self.buffers.remove(id)
    }

    #[inline]
    pub fn remove_view(&mut self, id: &ResourceId) -> Option<BufferView> {
        self.views.remove(id)
    }

    #[inline]
    pub fn contains_buffer(&self, id: &ResourceId) -> bool {
        self.buffers.contains_key(id)
    }

    pub fn buffer(&self, id: &ResourceId) -> Result<&Arc<Buffer>, BufferError> {
        self.buffers.get(id).ok_or(BufferError::UnknownBuffer(*id))
    }

    pub fn view(&self, id: &ResourceId) -> Result<&BufferView, BufferError> {
        self.views.get(id).ok_or(BufferError::UnknownView(*id))
    }

    /// The buffer a view reads from.
    pub fn source(&self, view: &BufferView) -> Result<&Arc<Buffer>, BufferError> {
        self.buffer(&view.buffer)
    }

    /// All bytes covered by `view`.
    pub fn view_bytes(&self, view: &BufferView) -> Result<&[u8], BufferError> {
        self.slice(view, 0, view.length)
    }

    /// Borrow `length` bytes starting `extra_offset` bytes into `view`.
    ///
    /// # Errors
    ///
    /// * [`UnknownBuffer`](BufferError::UnknownBuffer) if the view's buffer isn't registered.
    /// * [`OutOfRange`](BufferError::OutOfRange) if the window reaches past the end of the view
    ///   or of its buffer.
    pub fn slice(
        &self,
        view: &BufferView,
        extra_offset: usize,
        length: usize,
    ) -> Result<&[u8], BufferError> {
        checked_range(extra_offset, length, view.length, "buffer view")?;
        let start = view
            .offset
            .checked_add(extra_offset)
            .ok_or(BufferError::OutOfRange {
                start: view.offset,
                end: usize::MAX,
                len: view.length,
                container: "buffer view",
            })?;
        self.source(view)?.get(start, length)
    }
}
