//! The client-side scene graph: entity nodes with their world transforms and drawable
//! patches, plus the lights placed in the world.

use std::collections::{BTreeMap, HashMap};

use nalgebra::Matrix4;

use hedron::ResourceId;

use crate::{assemble::MeshBundle, resource::light::LightInfo, Error, ResourceKind, Result};

#[derive(Debug, Clone)]
pub struct Node {
    pub name: Option<String>,
    /// Transform relative to the parent.
    pub local: Matrix4<f32>,
    /// `local · parent.global`, as of the last [Scene::update_matrices].
    pub global: Matrix4<f32>,
    pub parent: Option<ResourceId>,
    pub children: Vec<ResourceId>,
    pub patches: Vec<MeshBundle>,
}

impl Node {
    fn new(name: Option<String>, local: Matrix4<f32>, parent: Option<ResourceId>) -> Self {
        Self {
            name,
            local,
            global: local,
            parent,
            children: Vec::new(),
            patches: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Scene {
    nodes: HashMap<ResourceId, Node>,
    lights: BTreeMap<ResourceId, LightInfo>,
}

impl Scene {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node under `parent`, or at the root if `parent` is `None` or not in the scene.
    ///
    /// An existing node with the same id is replaced, along with its subtree.
    pub fn insert(
        &mut self,
        id: ResourceId,
        name: Option<String>,
        local: Matrix4<f32>,
        parent: Option<ResourceId>,
    ) {
        if self.nodes.contains_key(&id) {
            self.remove(&id);
        }
        let parent = parent.filter(|p| {
            let present = self.nodes.contains_key(p);
            if !present {
                tracing::warn!(node = %id, parent = %p, "parent not in scene; attaching at root");
            }
            present
        });
        let mut node = Node::new(name, local, parent);
        if let Some(parent) = parent.and_then(|p| self.nodes.get_mut(&p)) {
            parent.children.push(id);
            node.global = local * parent.global;
        }
        self.nodes.insert(id, node);
    }

    /// Remove a node and every node beneath it, detaching it from its parent. Returns the ids
    /// removed, starting with `id`.
    pub fn remove(&mut self, id: &ResourceId) -> Vec<ResourceId> {
        let Some(parent) = self.nodes.get(id).map(|n| n.parent) else {
            return Vec::new();
        };
        if let Some(parent) = parent.and_then(|p| self.nodes.get_mut(&p)) {
            parent.children.retain(|c| c != id);
        }
        let mut removed = Vec::new();
        let mut stack = vec![*id];
        while let Some(next) = stack.pop() {
            if let Some(node) = self.nodes.remove(&next) {
                stack.extend(node.children);
                removed.push(next);
            }
        }
        removed
    }

    /// Move a node under a new parent (or to the root). The caller is expected to follow up
    /// with [update_matrices](Self::update_matrices).
    pub fn reparent(&mut self, id: &ResourceId, parent: Option<ResourceId>) -> Result<()> {
        let old = self.node(id)?.parent;
        if old == parent {
            return Ok(());
        }
        if let Some(p) = parent {
            if self.is_descendant(&p, id) {
                tracing::warn!(node = %id, parent = %p, "refusing to parent a node beneath itself");
                return Ok(());
            }
            self.node(&p)?;
        }
        if let Some(old) = old.and_then(|p| self.nodes.get_mut(&p)) {
            old.children.retain(|c| c != id);
        }
        if let Some(new) = parent.and_then(|p| self.nodes.get_mut(&p)) {
            new.children.push(*id);
        }
        self.node_mut(id)?.parent = parent;
        Ok(())
    }

    fn is_descendant(&self, candidate: &ResourceId, ancestor: &ResourceId) -> bool {
        let mut cursor = Some(*candidate);
        while let Some(c) = cursor {
            if c == *ancestor {
                return true;
            }
            cursor = self.nodes.get(&c).and_then(|n| n.parent);
        }
        false
    }

    pub fn node(&self, id: &ResourceId) -> Result<&Node> {
        self.nodes
            .get(id)
            .ok_or_else(|| Error::unknown(ResourceKind::Entity, *id))
    }

    pub fn node_mut(&mut self, id: &ResourceId) -> Result<&mut Node> {
        self.nodes
            .get_mut(id)
            .ok_or_else(|| Error::unknown(ResourceKind::Entity, *id))
    }

    #[inline]
    pub fn contains(&self, id: &ResourceId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (&ResourceId, &Node)> {
        self.nodes.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The node's world transform.
    #[inline]
    pub fn world_transform(&self, id: &ResourceId) -> Result<Matrix4<f32>> {
        self.node(id).map(|n| n.global)
    }

    /// Recompute every node's global transform from the roots down, and move patch bounding
    /// spheres along with their nodes.
    pub fn update_matrices(&mut self) {
        let mut stack: Vec<(ResourceId, Matrix4<f32>)> = self
            .nodes
            .iter()
            .filter(|(_, n)| n.parent.is_none())
            .map(|(id, _)| (*id, Matrix4::identity()))
            .collect();
        while let Some((id, parent_global)) = stack.pop() {
            let Some(node) = self.nodes.get_mut(&id) else {
                continue;
            };
            node.global = node.local * parent_global;
            for patch in &mut node.patches {
                patch.bounding_sphere.relocate(&node.global);
            }
            stack.extend(node.children.iter().map(|c| (*c, node.global)));
        }
    }

    pub fn lights(&self) -> impl Iterator<Item = (&ResourceId, &LightInfo)> {
        self.lights.iter()
    }

    #[inline]
    pub fn light(&self, id: &ResourceId) -> Option<&LightInfo> {
        self.lights.get(id)
    }

    #[inline]
    pub fn insert_light(&mut self, id: ResourceId, light: LightInfo) {
        self.lights.insert(id, light);
    }

    #[inline]
    pub fn remove_light(&mut self, id: &ResourceId) -> Option<LightInfo> {
        self.lights.remove(id)
    }
}
