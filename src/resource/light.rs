//! Light definitions and their placement in the world.

use nalgebra::{Matrix4, Point3, Vector3};

use hedron::ResourceId;

use crate::{
    resource::{Resource, ResourceHandler, ResourceKind, Update},
    state::SceneState,
    transform::transform_point,
    Result,
};

/// Ambient term shared by every server light.
pub const AMBIENT: [f32; 3] = [0.1, 0.1, 0.1];

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightKind {
    Point {
        range: f32,
    },
    Spot {
        range: f32,
        inner_cone_angle_rad: f32,
        outer_cone_angle_rad: f32,
    },
    Directional {
        range: f32,
    },
}

impl LightKind {
    /// The shader's light type code.
    pub const fn code(&self) -> u32 {
        match self {
            LightKind::Point { .. } => 0,
            LightKind::Spot { .. } => 1,
            LightKind::Directional { .. } => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LightRecord {
    pub name: Option<String>,
    /// RGBA, each in `[0, 1]`.
    pub color: [f32; 4],
    pub intensity: f32,
    pub kind: LightKind,
}

/// A light as the shader consumes it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightInfo {
    pub color: [f32; 4],
    pub ambient: [f32; 3],
    pub light_type: u32,
    /// Intensity, range, inner cone angle, outer cone angle.
    pub info: [f32; 4],
    pub world_position: Point3<f32>,
    /// Unit vector along the owning entity's -Z axis.
    pub direction: Vector3<f32>,
}

impl LightInfo {
    /// The light at the origin, facing -Z.
    pub fn new(record: &LightRecord) -> Self {
        let info = match record.kind {
            LightKind::Point { range } | LightKind::Directional { range } => {
                [record.intensity, range, 0.0, 0.0]
            }
            LightKind::Spot {
                range,
                inner_cone_angle_rad,
                outer_cone_angle_rad,
            } => [
                record.intensity,
                range,
                inner_cone_angle_rad,
                outer_cone_angle_rad,
            ],
        };
        Self {
            color: record.color,
            ambient: AMBIENT,
            light_type: record.kind.code(),
            info,
            world_position: Point3::origin(),
            direction: -Vector3::z(),
        }
    }

    /// The light carried by an entity with world transform `world`.
    pub fn placed(record: &LightRecord, world: &Matrix4<f32>) -> Self {
        let world_position = transform_point(world, &Point3::origin());
        let ahead = transform_point(world, &Point3::new(0.0, 0.0, -1.0));
        Self {
            world_position,
            direction: (ahead - world_position)
                .try_normalize(f32::EPSILON)
                .unwrap_or_else(|| -Vector3::z()),
            ..Self::new(record)
        }
    }
}

/// Place every light listed by an entity at its current world transform.
pub(crate) fn attach(state: &mut SceneState, entity: ResourceId) -> Result<()> {
    let world = state.scene.world_transform(&entity)?;
    let lights = state.entity(&entity)?.lights.clone();
    let mut attached = Vec::with_capacity(lights.len());
    for id in lights {
        match state.lights.get(&id) {
            Some(record) => {
                state.scene.insert_light(id, LightInfo::placed(record, &world));
                attached.push(id);
            }
            None => tracing::warn!(%entity, light = %id, "entity references unknown light"),
        }
    }
    state.entity_mut(&entity)?.attached_lights = attached;
    Ok(())
}

/// Take an entity's lights out of the world.
pub(crate) fn detach(state: &mut SceneState, lights: &[ResourceId]) {
    for id in lights {
        state.scene.remove_light(id);
    }
}

/// Re-place an entity's lights after its transform or light list changed.
pub(crate) fn refresh(state: &mut SceneState, entity: ResourceId) -> Result<()> {
    let attached = std::mem::take(&mut state.entity_mut(&entity)?.attached_lights);
    detach(state, &attached);
    attach(state, entity)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LightHandler;

impl ResourceHandler for LightHandler {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Light
    }

    fn on_create(&self, state: &mut SceneState, id: ResourceId, resource: Resource) -> Result<()> {
        let record = match resource {
            Resource::Light(record) => record,
            other => return Err(other.mismatch(ResourceKind::Light)),
        };
        state.lights.insert(id, record);
        Ok(())
    }

    fn on_update(&self, state: &mut SceneState, id: ResourceId, update: Update) -> Result<()> {
        let record = match update {
            Update::Light(record) => record,
            other => return Err(other.mismatch(ResourceKind::Light)),
        };
        state.lights.insert(id, record);
        let carriers: Vec<_> = state
            .entities
            .iter()
            .filter(|(_, e)| e.attached_lights.contains(&id))
            .map(|(eid, _)| *eid)
            .collect();
        for entity in carriers {
            state.tasks.push(move |state| refresh(state, entity));
        }
        Ok(())
    }

    fn on_remove(&self, state: &mut SceneState, id: ResourceId) -> Result<()> {
        state.lights.remove(&id);
        state.tasks.push(move |state| {
            state.scene.remove_light(&id);
            Ok(())
        });
        Ok(())
    }
}
