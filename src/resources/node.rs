use std::sync::Arc;

use cgmath::{Matrix4, SquareMatrix};

use crate::data_structures::{
    model::{Material, Mesh, PrimitiveMode, VertexArray},
    scene_graph::{ContainerNode, DataVariance, Geode, Node, TransformNode},
};

fn to_primitive_mode(mode: gltf::mesh::Mode) -> PrimitiveMode {
    match mode {
        gltf::mesh::Mode::Points => PrimitiveMode::Points,
        gltf::mesh::Mode::Lines => PrimitiveMode::Lines,
        gltf::mesh::Mode::LineLoop => PrimitiveMode::LineLoop,
        gltf::mesh::Mode::LineStrip => PrimitiveMode::LineStrip,
        gltf::mesh::Mode::Triangles => PrimitiveMode::Triangles,
        gltf::mesh::Mode::TriangleStrip => PrimitiveMode::TriangleStrip,
        gltf::mesh::Mode::TriangleFan => PrimitiveMode::TriangleFan,
    }
}

fn to_matrix(columns: [[f32; 4]; 4]) -> Matrix4<f64> {
    Matrix4::from(columns.map(|column| column.map(f64::from)))
}

fn to_geode(mesh: gltf::Mesh, buf: &[Vec<u8>], mats: &[Arc<Material>]) -> Geode {
    let mut geode = Geode::new();
    geode.name = mesh.name().map(str::to_string);
    for primitive in mesh.primitives() {
        let reader = primitive.reader(|buffer| buf.get(buffer.index()).map(Vec::as_slice));

        let Some(positions) = reader.read_positions() else {
            log::warn!(
                "Primitive {} of mesh {:?} has no positions and is skipped.",
                primitive.index(),
                mesh.name()
            );
            continue;
        };
        let positions: Vec<[f32; 3]> = positions.collect();
        let vertex_count = positions.len();

        let normals = reader
            .read_normals()
            .map(|normals| normals.collect::<Vec<_>>())
            .filter(|normals| normals.len() == vertex_count);
        let tex_coords = reader
            .read_tex_coords(0)
            .map(|t| t.into_f32().collect::<Vec<_>>())
            .filter(|t| t.len() == vertex_count);
        let indices = reader
            .read_indices()
            .map(|indices| indices.into_u32().collect::<Vec<u32>>());

        geode.add_drawable(
            Mesh {
                name: mesh.name().unwrap_or("unknown_mesh").to_string(),
                positions: VertexArray::Vec3(positions),
                normals,
                tex_coords,
                indices,
                mode: to_primitive_mode(primitive.mode()),
                material: primitive
                    .material()
                    .index()
                    .and_then(|idx| mats.get(idx))
                    .cloned(),
            }
            .into(),
        );
    }
    geode
}

/// Converts a glTF node and its descendants into a scene graph.
pub fn to_scene_node(node: gltf::Node, buf: &[Vec<u8>], mats: &[Arc<Material>]) -> Node {
    let mut children = Vec::new();
    if let Some(mesh) = node.mesh() {
        children.push(Arc::new(Node::from(to_geode(mesh, buf, mats))));
    }
    for child in node.children() {
        children.push(Arc::new(to_scene_node(child, buf, mats)));
    }

    let matrix = to_matrix(node.transform().matrix());
    let name = node.name().map(str::to_string);
    if matrix == Matrix4::identity() {
        ContainerNode { name, children }.into()
    } else {
        TransformNode {
            name,
            matrix,
            data_variance: DataVariance::Static,
            children,
        }
        .into()
    }
}
