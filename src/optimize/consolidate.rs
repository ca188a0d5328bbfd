//! Mesh consolidation: merges the compatible meshes of a geode into as few
//! indexed list meshes as possible.
//!
//! Two meshes are compatible when they share a material (by value), expand to the
//! same list topology and carry the same set of vertex attributes. Strips, fans
//! and loops are unrolled on the way, so every merged mesh is a plain points,
//! lines or triangles list and no primitive leaks across the boundary between
//! two source meshes. Vertices are concatenated, never welded.

use std::sync::Arc;

use crate::data_structures::{
    model::{Drawable, Material, Mesh, Topology, VertexArray},
    scene_graph::Geode,
};

#[derive(Debug, PartialEq)]
struct MergeKey {
    material: Option<Arc<Material>>,
    topology: Topology,
    has_normals: bool,
    has_tex_coords: bool,
}

impl MergeKey {
    fn of(mesh: &Mesh) -> Self {
        Self {
            material: mesh.material.clone(),
            topology: mesh.mode.topology(),
            has_normals: mesh.normals.is_some(),
            has_tex_coords: mesh.tex_coords.is_some(),
        }
    }
}

/// A merged mesh under construction.
struct Batch {
    key: MergeKey,
    name: String,
    positions: Vec<[f32; 3]>,
    normals: Vec<[f32; 3]>,
    tex_coords: Vec<[f32; 2]>,
    indices: Vec<u32>,
}

impl Batch {
    fn new(key: MergeKey, name: &str) -> Self {
        Self {
            key,
            name: name.to_string(),
            positions: Vec::new(),
            normals: Vec::new(),
            tex_coords: Vec::new(),
            indices: Vec::new(),
        }
    }

    fn fits(&self, vertex_count: usize) -> bool {
        self.positions.len() + vertex_count <= u32::MAX as usize
    }

    fn append(&mut self, mesh: Mesh) {
        let offset = self.positions.len() as u32;
        let indices = mesh.element_indices();
        let VertexArray::Vec3(positions) = mesh.positions else {
            return;
        };
        self.indices.extend(indices.into_iter().map(|i| i + offset));
        self.positions.extend(positions);
        if let Some(normals) = mesh.normals {
            self.normals.extend(normals);
        }
        if let Some(tex_coords) = mesh.tex_coords {
            self.tex_coords.extend(tex_coords);
        }
    }

    fn finish(self) -> Mesh {
        Mesh {
            name: self.name,
            positions: VertexArray::Vec3(self.positions),
            normals: self.key.has_normals.then_some(self.normals),
            tex_coords: self.key.has_tex_coords.then_some(self.tex_coords),
            indices: Some(self.indices),
            mode: self.key.topology.list_mode(),
            material: self.key.material,
        }
    }
}

/// Consolidates the meshes of `geode` in place and returns the number of
/// drawables left.
///
/// Meshes whose positions are not a `Vec3` array, whose attribute arrays do not
/// match their vertex count, and non-mesh drawables are kept as they are. Merged
/// meshes keep the order in which their first source mesh appeared.
pub fn consolidate_geode(geode: &mut Geode) -> usize {
    let drawables = geode.take_drawables();
    let before = drawables.len();

    let mut batches: Vec<Batch> = Vec::new();
    let mut untouched: Vec<Drawable> = Vec::new();

    for drawable in drawables {
        let mesh = match drawable {
            Drawable::Mesh(mesh) if is_consolidatable(&mesh) => mesh,
            other => {
                untouched.push(other);
                continue;
            }
        };
        let key = MergeKey::of(&mesh);
        let vertex_count = mesh.vertex_count();
        let slot = batches
            .iter()
            .rposition(|batch| batch.key == key && batch.fits(vertex_count));
        let slot = match slot {
            Some(slot) => slot,
            None => {
                batches.push(Batch::new(key, &mesh.name));
                batches.len() - 1
            }
        };
        batches[slot].append(mesh);
    }

    batches
        .into_iter()
        .for_each(|batch| geode.add_drawable(Drawable::Mesh(batch.finish())));
    untouched
        .into_iter()
        .for_each(|drawable| geode.add_drawable(drawable));

    let after = geode.num_drawables();
    log::debug!("Consolidated {} drawables into {}", before, after);
    after
}

fn is_consolidatable(mesh: &Mesh) -> bool {
    let Some(positions) = mesh.positions.as_vec3() else {
        return false;
    };
    let n = positions.len();
    mesh.normals.as_ref().is_none_or(|v| v.len() == n)
        && mesh.tex_coords.as_ref().is_none_or(|v| v.len() == n)
        && mesh
            .indices
            .as_ref()
            .is_none_or(|indices| indices.iter().all(|&i| (i as usize) < n))
}
