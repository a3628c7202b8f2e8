use std::{fmt, str::FromStr, sync::Arc};

use hedron::ResourceId;

use crate::{
    resource::{DecodedImage, Resource, ResourceHandler, ResourceKind, Update},
    state::SceneState,
    Error, Result,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Filter {
    Nearest,
    #[default]
    Linear,
    LinearMipmapLinear,
}

impl Filter {
    pub const fn tag(self) -> &'static str {
        match self {
            Filter::Nearest => "NEAREST",
            Filter::Linear => "LINEAR",
            Filter::LinearMipmapLinear => "LINEAR_MIPMAP_LINEAR",
        }
    }
}

impl FromStr for Filter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        [Filter::Nearest, Filter::Linear, Filter::LinearMipmapLinear]
            .into_iter()
            .find(|f| f.tag() == s)
            .ok_or_else(|| Error::unsupported("sampler filter", s))
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WrapMode {
    ClampToEdge,
    MirroredRepeat,
    #[default]
    Repeat,
}

impl WrapMode {
    pub const fn tag(self) -> &'static str {
        match self {
            WrapMode::ClampToEdge => "CLAMP_TO_EDGE",
            WrapMode::MirroredRepeat => "MIRRORED_REPEAT",
            WrapMode::Repeat => "REPEAT",
        }
    }

    /// Whether texture coordinates outside `[0, 1]` wrap around. Mirroring isn't distinguished.
    #[inline]
    pub const fn repeats(self) -> bool {
        !matches!(self, WrapMode::ClampToEdge)
    }
}

impl FromStr for WrapMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        [
            WrapMode::ClampToEdge,
            WrapMode::MirroredRepeat,
            WrapMode::Repeat,
        ]
        .into_iter()
        .find(|m| m.tag() == s)
        .ok_or_else(|| Error::unsupported("sampler wrap mode", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SamplerRecord {
    pub mag_filter: Filter,
    pub min_filter: Filter,
    pub wrap_s: WrapMode,
    pub wrap_t: WrapMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerState {
    pub mag_filter: Filter,
    pub min_filter: Filter,
    pub repeat_x: bool,
    pub repeat_y: bool,
}

impl From<SamplerRecord> for SamplerState {
    fn from(record: SamplerRecord) -> Self {
        Self {
            mag_filter: record.mag_filter,
            min_filter: record.min_filter,
            repeat_x: record.wrap_s.repeats(),
            repeat_y: record.wrap_t.repeats(),
        }
    }
}

impl Default for SamplerState {
    fn default() -> Self {
        SamplerRecord::default().into()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureRecord {
    pub image: ResourceId,
    pub sampler: Option<ResourceId>,
}

#[derive(Debug, Clone)]
pub struct TextureState {
    pub record: TextureRecord,
    /// Set once the image has been decoded.
    pub image: Option<Arc<DecodedImage>>,
    pub sampler: SamplerState,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MaterialRecord {
    pub name: Option<String>,
    /// RGBA, each in `[0, 1]`.
    pub base_color: [f32; 4],
    pub base_color_texture: Option<ResourceId>,
    pub double_sided: bool,
}

impl Default for MaterialRecord {
    fn default() -> Self {
        Self {
            name: None,
            base_color: [1.0; 4],
            base_color_texture: None,
            double_sided: false,
        }
    }
}

/// A texture ready to be sampled: decoded pixels plus wrapping and filtering.
#[derive(Debug, Clone)]
pub struct TextureBinding {
    pub texture: ResourceId,
    pub image: Arc<DecodedImage>,
    pub sampler: SamplerState,
}

#[derive(Debug, Clone)]
pub struct MaterialState {
    pub record: MaterialRecord,
    pub texture: Option<TextureBinding>,
}

/// Resolve a texture's image and sampler, then rebind any materials using it.
fn set_up_texture(state: &mut SceneState, id: ResourceId) -> Result<()> {
    let texture = state
        .textures
        .get(&id)
        .ok_or_else(|| Error::unknown(ResourceKind::Texture, id))?;
    let record = texture.record;
    let image = state.image(&record.image)?.cloned();
    let sampler = match record.sampler {
        Some(sampler) => *state.sampler(&sampler)?,
        None => SamplerState::default(),
    };
    if let Some(texture) = state.textures.get_mut(&id) {
        texture.image = image;
        texture.sampler = sampler;
    }

    let users: Vec<_> = state
        .materials
        .iter()
        .filter(|(_, m)| m.record.base_color_texture == Some(id))
        .map(|(mid, _)| *mid)
        .collect();
    for material in users {
        bind_texture(state, material)?;
    }
    Ok(())
}

fn bind_texture(state: &mut SceneState, id: ResourceId) -> Result<()> {
    let material = state.material(&id)?;
    let binding = material.record.base_color_texture.and_then(|texture| {
        let state = state.textures.get(&texture)?;
        Some(TextureBinding {
            texture,
            image: state.image.clone()?,
            sampler: state.sampler,
        })
    });
    if let Some(material) = state.materials.get_mut(&id) {
        material.texture = binding;
    }
    Ok(())
}

/// Called when an image's pixels arrive: set up every texture that samples it.
pub(crate) fn image_ready(state: &mut SceneState, image: ResourceId) {
    let textures: Vec<_> = state
        .textures
        .iter()
        .filter(|(_, t)| t.record.image == image)
        .map(|(id, _)| *id)
        .collect();
    for texture in textures {
        state
            .tasks
            .push(move |state| set_up_texture(state, texture));
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SamplerHandler;

impl ResourceHandler for SamplerHandler {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Sampler
    }

    fn on_create(&self, state: &mut SceneState, id: ResourceId, resource: Resource) -> Result<()> {
        let record = match resource {
            Resource::Sampler(record) => record,
            other => return Err(other.mismatch(ResourceKind::Sampler)),
        };
        state.samplers.insert(id, record.into());
        Ok(())
    }

    fn on_remove(&self, state: &mut SceneState, id: ResourceId) -> Result<()> {
        state.samplers.remove(&id);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TextureHandler;

impl ResourceHandler for TextureHandler {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Texture
    }

    fn on_create(&self, state: &mut SceneState, id: ResourceId, resource: Resource) -> Result<()> {
        let record = match resource {
            Resource::Texture(record) => record,
            other => return Err(other.mismatch(ResourceKind::Texture)),
        };
        state.textures.insert(
            id,
            TextureState {
                record,
                image: None,
                sampler: SamplerState::default(),
            },
        );
        state.tasks.push(move |state| set_up_texture(state, id));
        Ok(())
    }

    fn on_remove(&self, state: &mut SceneState, id: ResourceId) -> Result<()> {
        state.textures.remove(&id);
        for material in state.materials.values_mut() {
            if material.texture.as_ref().is_some_and(|t| t.texture == id) {
                material.texture = None;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MaterialHandler;

impl MaterialHandler {
    fn set(state: &mut SceneState, id: ResourceId, record: MaterialRecord) {
        let textured = record.base_color_texture.is_some();
        state.materials.insert(
            id,
            MaterialState {
                record,
                texture: None,
            },
        );
        if textured {
            state.tasks.push(move |state| bind_texture(state, id));
        }
    }
}

impl ResourceHandler for MaterialHandler {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Material
    }

    fn on_create(&self, state: &mut SceneState, id: ResourceId, resource: Resource) -> Result<()> {
        match resource {
            Resource::Material(record) => {
                Self::set(state, id, record);
                Ok(())
            }
            other => Err(other.mismatch(ResourceKind::Material)),
        }
    }

    fn on_update(&self, state: &mut SceneState, id: ResourceId, update: Update) -> Result<()> {
        match update {
            Update::Material(record) => {
                state.material(&id)?;
                Self::set(state, id, record);
                Ok(())
            }
            other => Err(other.mismatch(ResourceKind::Material)),
        }
    }

    fn on_remove(&self, state: &mut SceneState, id: ResourceId) -> Result<()> {
        state.materials.remove(&id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sampler_modes() {
        let record = SamplerRecord {
            mag_filter: "NEAREST".parse().unwrap(),
            min_filter: "LINEAR_MIPMAP_LINEAR".parse().unwrap(),
            wrap_s: "CLAMP_TO_EDGE".parse().unwrap(),
            wrap_t: "MIRRORED_REPEAT".parse().unwrap(),
        };
        let state = SamplerState::from(record);
        assert!(!state.repeat_x);
        assert!(state.repeat_y);
        assert_eq!(state.min_filter, Filter::LinearMipmapLinear);
        assert!(matches!(
            "CUBIC".parse::<Filter>(),
            Err(Error::UnsupportedFormat { .. })
        ));
    }
}
