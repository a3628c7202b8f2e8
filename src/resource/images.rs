use std::sync::Arc;

use hedron::ResourceId;

use crate::{
    resource::{material, Resource, ResourceHandler, ResourceKind},
    state::SceneState,
    Error, Result,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// The encoded image is the whole of a registered buffer.
    Buffer(ResourceId),
    Uri(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRecord {
    pub name: Option<String>,
    pub source: ImageSource,
}

/// Pixels with the bottom row first, as sampled with a bottom-left texture origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    /// 3 for RGB, 4 for RGBA.
    pub components: u8,
    pub bytes: Vec<u8>,
}

impl DecodedImage {
    /// Decode a PNG or JPEG image and flip it vertically. RGB images keep three components;
    /// anything else is converted to RGBA.
    #[cfg(feature = "images")]
    pub fn decode(encoded: &[u8]) -> Result<Self> {
        use ::image::{DynamicImage, GenericImageView};

        let image = ::image::load_from_memory(encoded)?.flipv();
        let (width, height) = image.dimensions();
        let (components, bytes) = match image {
            DynamicImage::ImageRgb8(rgb) => (3, rgb.into_raw()),
            other => (4, other.into_rgba8().into_raw()),
        };
        tracing::debug!(width, height, components, "decoded image");
        Ok(Self {
            width,
            height,
            components,
            bytes,
        })
    }

    #[cfg(not(feature = "images"))]
    pub fn decode(_encoded: &[u8]) -> Result<Self> {
        Err(Error::unsupported(
            "image source",
            "image decoding is disabled",
        ))
    }
}

#[derive(Debug, Clone)]
pub struct ImageState {
    pub record: ImageRecord,
    pub decoded: Option<Arc<DecodedImage>>,
}

fn store_decoded(state: &mut SceneState, id: ResourceId, image: DecodedImage) -> Result<()> {
    let slot = state
        .images
        .get_mut(&id)
        .ok_or_else(|| Error::unknown(ResourceKind::Image, id))?;
    slot.decoded = Some(Arc::new(image));
    material::image_ready(state, id);
    Ok(())
}

fn decode_from_buffer(state: &mut SceneState, id: ResourceId, buffer: ResourceId) -> Result<()> {
    let decoded = DecodedImage::decode(state.store.buffer(&buffer)?.as_slice())?;
    store_decoded(state, id, decoded)
}

/// Decode every image still waiting on `buffer`.
pub(crate) fn buffer_ready(state: &mut SceneState, buffer: ResourceId) {
    let source = ImageSource::Buffer(buffer);
    let waiting = state
        .images
        .iter()
        .filter(|(_, image)| image.decoded.is_none() && image.record.source == source)
        .map(|(id, _)| *id);
    for id in waiting.collect::<Vec<_>>() {
        tracing::debug!(%buffer, image = %id, "buffer arrived; decoding image");
        state
            .tasks
            .push(move |state| decode_from_buffer(state, id, buffer));
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ImageHandler;

impl ResourceHandler for ImageHandler {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Image
    }

    fn on_create(&self, state: &mut SceneState, id: ResourceId, resource: Resource) -> Result<()> {
        let record = match resource {
            Resource::Image(record) => record,
            other => return Err(other.mismatch(ResourceKind::Image)),
        };
        let source = record.source.clone();
        state.images.insert(
            id,
            ImageState {
                record,
                decoded: None,
            },
        );
        match source {
            ImageSource::Buffer(buffer) if !state.store.contains_buffer(&buffer) => {
                tracing::debug!(image = %id, %buffer, "image waiting on buffer");
                Ok(())
            }
            ImageSource::Buffer(buffer) => decode_from_buffer(state, id, buffer),
            ImageSource::Uri(uri) => state.fetch(
                ResourceKind::Image,
                id,
                &uri,
                |bytes| DecodedImage::decode(&bytes),
                move |state, decoded| store_decoded(state, id, decoded),
            ),
        }
    }

    fn on_remove(&self, state: &mut SceneState, id: ResourceId) -> Result<()> {
        state.forget_fetch(ResourceKind::Image, id);
        state.images.remove(&id);
        Ok(())
    }
}
