use nalgebra::{Matrix4, UnitQuaternion, Vector3, Vector4};

use hedron::{InstanceSet, ResourceId};

use crate::{
    assemble::GeometryAssembler,
    resource::{light, Resource, ResourceHandler, ResourceKind, Update},
    state::SceneState,
    transform::{from_protocol, ChangeTracker, Trs},
    Error, Result,
};

/// What an entity draws: a geometry, optionally instanced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderRep {
    pub mesh: ResourceId,
    pub instances: Option<InstanceSet>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityRecord {
    pub name: Option<String>,
    pub parent: Option<ResourceId>,
    /// Local transform, row by row.
    pub transform: Option<[f32; 16]>,
    pub render: Option<RenderRep>,
    pub lights: Vec<ResourceId>,
}

/// Changed fields of an entity; `None` leaves a field as it was.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityUpdate {
    pub name: Option<String>,
    pub parent: Option<Option<ResourceId>>,
    pub transform: Option<[f32; 16]>,
    pub render: Option<Option<RenderRep>>,
    pub lights: Option<Vec<ResourceId>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntityState {
    pub name: Option<String>,
    pub parent: Option<ResourceId>,
    /// Local transform.
    pub matrix: Matrix4<f32>,
    /// Decomposed local transform, for interactive editing.
    pub trs: Trs,
    pub changed: ChangeTracker,
    pub render: Option<RenderRep>,
    pub lights: Vec<ResourceId>,
    pub(crate) attached_lights: Vec<ResourceId>,
    pub instance_count: usize,
    pub instance_positions: Vec<Vector4<f32>>,
}

impl EntityState {
    fn new(id: ResourceId, record: EntityRecord) -> Self {
        let matrix = record
            .transform
            .as_ref()
            .map_or_else(Matrix4::identity, from_protocol);
        Self {
            name: record.name,
            parent: record.parent,
            matrix,
            trs: preview(id, &matrix, Trs::default()),
            changed: ChangeTracker::default(),
            render: record.render,
            lights: record.lights,
            attached_lights: Vec::new(),
            instance_count: 0,
            instance_positions: Vec::new(),
        }
    }

    pub fn set_translation(&mut self, translation: Vector3<f32>) {
        self.trs.translation = translation;
        self.changed.translation = true;
    }

    pub fn set_rotation(&mut self, rotation: UnitQuaternion<f32>) {
        self.trs.rotation = rotation;
        self.changed.rotation = true;
    }

    pub fn set_scale(&mut self, scale: Vector3<f32>) {
        self.trs.scale = scale;
        self.changed.scale = true;
    }

    /// The local transform including any unsent edits.
    pub fn preview_matrix(&self) -> Matrix4<f32> {
        if self.changed.any() {
            self.trs.to_matrix()
        } else {
            self.matrix
        }
    }

    /// The ids of lights currently placed in the world on this entity's behalf.
    #[inline]
    pub fn attached_lights(&self) -> &[ResourceId] {
        &self.attached_lights
    }
}

fn preview(id: ResourceId, matrix: &Matrix4<f32>, fallback: Trs) -> Trs {
    Trs::from_matrix(matrix).unwrap_or_else(|e| {
        tracing::warn!(entity = %id, error = %e, "transform can't be decomposed; keeping previous");
        fallback
    })
}

fn set_up_node(state: &mut SceneState, id: ResourceId) -> Result<()> {
    let entity = state.entity(&id)?;
    let (name, matrix, parent) = (entity.name.clone(), entity.matrix, entity.parent);
    state.scene.insert(id, name, matrix, parent);
    Ok(())
}

/// Assemble the entity's geometry at its current world transform and attach the resulting
/// bundles to its node. Patches that fail are logged and left out.
pub(crate) fn render(state: &mut SceneState, id: ResourceId) -> Result<()> {
    let Some(rep) = state.entity(&id)?.render else {
        return Ok(());
    };
    let world = state.scene.world_transform(&id)?;
    let geometry = state
        .geometries
        .get(&rep.mesh)
        .ok_or_else(|| Error::unknown(ResourceKind::Geometry, rep.mesh))?;
    let assembler = GeometryAssembler::new(&state.store);

    let mut patches = Vec::with_capacity(geometry.patches.len());
    for (i, result) in assembler
        .assemble(rep.mesh, geometry, rep.instances.as_ref(), &world)
        .into_iter()
        .enumerate()
    {
        match result {
            Ok(bundle) => patches.push(bundle),
            Err(e) => tracing::warn!(
                entity = %id,
                geometry = %rep.mesh,
                patch = i,
                error = %e,
                "failed to assemble patch"
            ),
        }
    }
    let instances = rep
        .instances
        .as_ref()
        .and_then(|set| assembler.instances(set).ok());
    tracing::debug!(entity = %id, patches = patches.len(), "rendered entity");

    state.scene.node_mut(&id)?.patches = patches;
    let entity = state.entity_mut(&id)?;
    match instances {
        Some(data) => {
            entity.instance_count = data.count;
            entity.instance_positions = data.positions;
        }
        None => {
            entity.instance_count = 0;
            entity.instance_positions.clear();
        }
    }
    Ok(())
}

fn remove_from_render(state: &mut SceneState, id: ResourceId) -> Result<()> {
    state.scene.node_mut(&id)?.patches.clear();
    Ok(())
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EntityHandler;

impl ResourceHandler for EntityHandler {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Entity
    }

    fn on_create(&self, state: &mut SceneState, id: ResourceId, resource: Resource) -> Result<()> {
        let record = match resource {
            Resource::Entity(record) => record,
            other => return Err(other.mismatch(ResourceKind::Entity)),
        };
        let entity = EntityState::new(id, record);
        let (renders, lit) = (entity.render.is_some(), !entity.lights.is_empty());
        state.entities.insert(id, entity);

        state.tasks.push(move |state| set_up_node(state, id));
        if renders {
            state.tasks.push(move |state| render(state, id));
        }
        if lit {
            state.tasks.push(move |state| light::attach(state, id));
        }
        Ok(())
    }

    fn on_update(&self, state: &mut SceneState, id: ResourceId, update: Update) -> Result<()> {
        let update = match update {
            Update::Entity(update) => update,
            other => return Err(other.mismatch(ResourceKind::Entity)),
        };
        let entity = state.entity_mut(&id)?;
        if let Some(name) = update.name {
            entity.name = Some(name);
        }

        let moved = update.transform.is_some() || update.parent.is_some();
        if let Some(transform) = &update.transform {
            entity.matrix = from_protocol(transform);
        }
        if let Some(parent) = update.parent {
            entity.parent = parent;
        }
        let lit = !entity.lights.is_empty() || !entity.attached_lights.is_empty();
        let rerender = update.render.map(|render| {
            entity.render = render;
            render.is_some()
        });
        let relight = match update.lights {
            Some(lights) => {
                entity.lights = lights;
                true
            }
            None => false,
        };

        if moved {
            entity.trs = preview(id, &entity.matrix, entity.trs);
            entity.changed.reset();
            let (matrix, parent) = (entity.matrix, entity.parent);
            state.tasks.push(move |state| {
                state.scene.node_mut(&id)?.local = matrix;
                state.scene.reparent(&id, parent)?;
                state.scene.update_matrices();
                Ok(())
            });
        }
        if let Some(renders) = rerender {
            state.tasks.push(move |state| remove_from_render(state, id));
            if renders {
                state.tasks.push(move |state| render(state, id));
            }
        }
        if relight || (moved && lit) {
            state.tasks.push(move |state| light::refresh(state, id));
        }
        Ok(())
    }

    fn on_remove(&self, state: &mut SceneState, id: ResourceId) -> Result<()> {
        let entity = state
            .entities
            .remove(&id)
            .ok_or_else(|| Error::unknown(ResourceKind::Entity, id))?;
        state.tasks.push(move |state| {
            light::detach(state, &entity.attached_lights);
            let removed = state.scene.remove(&id);
            for descendant in removed.iter().filter(|&&d| d != id) {
                if let Some(child) = state.entities.remove(descendant) {
                    light::detach(state, &child.attached_lights);
                }
            }
            tracing::debug!(entity = %id, nodes = removed.len(), "removed entity");
            Ok(())
        });
        Ok(())
    }
}
