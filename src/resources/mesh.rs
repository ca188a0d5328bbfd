use std::sync::Arc;

use crate::data_structures::model::{Material, Mesh, PrimitiveMode};

/**
 * Converts the triangulated models of an .obj file into meshes.
 *
 * Texture coordinates are flipped vertically to match the glTF convention used
 * by every other loader.
 */
pub fn load_meshes(models: &[tobj::Model], materials: &[Arc<Material>]) -> Vec<Mesh> {
    models
        .iter()
        .filter(|m| !m.mesh.positions.is_empty())
        .map(|m| {
            let positions = m
                .mesh
                .positions
                .chunks_exact(3)
                .map(|p| [p[0], p[1], p[2]])
                .collect::<Vec<_>>();
            let mut mesh = Mesh::new(&m.name, positions, PrimitiveMode::Triangles)
                .with_indices(m.mesh.indices.clone());

            if m.mesh.normals.len() == m.mesh.positions.len() {
                mesh.normals = Some(
                    m.mesh
                        .normals
                        .chunks_exact(3)
                        .map(|n| [n[0], n[1], n[2]])
                        .collect(),
                );
            }
            if !m.mesh.texcoords.is_empty() {
                mesh.tex_coords = Some(
                    m.mesh
                        .texcoords
                        .chunks_exact(2)
                        .map(|t| [t[0], 1.0 - t[1]])
                        .collect(),
                );
            }
            mesh.material = m
                .mesh
                .material_id
                .and_then(|id| materials.get(id))
                .cloned();
            mesh
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_flat_obj_arrays() {
        let model = tobj::Model::new(
            tobj::Mesh {
                positions: vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
                texcoords: vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0],
                indices: vec![0, 1, 2],
                material_id: Some(0),
                ..Default::default()
            },
            "tri".to_string(),
        );
        let material = Arc::new(Material::new("red", [1.0, 0.0, 0.0, 1.0]));
        let meshes = load_meshes(&[model], &[material.clone()]);

        assert_eq!(meshes.len(), 1);
        let mesh = &meshes[0];
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.indices.as_deref(), Some(&[0, 1, 2][..]));
        assert_eq!(mesh.tex_coords.as_ref().unwrap()[0], [0.0, 1.0]);
        assert!(mesh.normals.is_none());
        assert!(Arc::ptr_eq(mesh.material.as_ref().unwrap(), &material));
    }
}
