//! Duplicate render state sharing.
//!
//! Meshes whose materials compare equal end up pointing at one shared
//! [`Material`], so a renderer can sort and bind by pointer.

use std::sync::Arc;

use crate::data_structures::{model::Material, scene_graph::Geode, scene_graph::Node};

/// The distinct materials seen so far.
#[derive(Default)]
pub struct StateRegistry {
    materials: Vec<Arc<Material>>,
}

impl StateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces `material` with a previously seen equal one. Returns `true` if a
    /// replacement happened.
    pub fn share(&mut self, material: &mut Arc<Material>) -> bool {
        match self.materials.iter().find(|known| **known == *material) {
            Some(known) if Arc::ptr_eq(known, material) => false,
            Some(known) => {
                *material = known.clone();
                true
            }
            None => {
                self.materials.push(material.clone());
                false
            }
        }
    }

    pub fn share_geode(&mut self, geode: &mut Geode) -> usize {
        let mut shared = 0;
        for mesh in geode.drawables_mut().iter_mut().filter_map(|d| d.as_mesh_mut()) {
            if let Some(material) = mesh.material.as_mut() {
                shared += usize::from(self.share(material));
            }
        }
        shared
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }
}

/// Shares duplicate materials within one geode.
pub fn share_duplicate_state(geode: &mut Geode) -> usize {
    StateRegistry::new().share_geode(geode)
}

/// Shares duplicate materials across every geode below `node`.
pub fn share_duplicate_state_in(node: &mut Node) -> usize {
    let mut registry = StateRegistry::new();
    let mut shared = 0;
    node.visit_geodes_mut(&mut |geode| shared += registry.share_geode(geode));
    shared
}
