//! Upload of consolidated geodes into wgpu buffers.

use std::mem;

use wgpu::util::DeviceExt;

use crate::data_structures::{
    model::{Mesh, ModelVertex, Topology},
    scene_graph::Geode,
};

pub trait Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static>;
}

/**
 * Byte layout of a [`ModelVertex`]:
 *
 * position (location 0), tex_coords (1), normal (2), tangent (3), bitangent (4)
 */
impl Vertex for ModelVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<ModelVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 5]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 8]>() as wgpu::BufferAddress,
                    shader_location: 3,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 11]>() as wgpu::BufferAddress,
                    shader_location: 4,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

/// A mesh living in GPU memory. Always drawn as an indexed list.
pub struct GpuMesh {
    pub name: String,
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub num_elements: u32,
    pub topology: wgpu::PrimitiveTopology,
}

impl GpuMesh {
    /// Returns `None` for meshes without `Vec3` positions or without any
    /// complete primitive.
    pub fn from_mesh(device: &wgpu::Device, mesh: &Mesh) -> Option<Self> {
        let vertices = mesh.to_model_vertices()?;
        let indices = mesh.element_indices();
        if indices.is_empty() {
            return None;
        }

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{:?} Vertex Buffer", mesh.name)),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{:?} Index Buffer", mesh.name)),
            contents: bytemuck::cast_slice(&indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        Some(Self {
            name: mesh.name.clone(),
            vertex_buffer,
            index_buffer,
            num_elements: indices.len() as u32,
            topology: match mesh.mode.topology() {
                Topology::Points => wgpu::PrimitiveTopology::PointList,
                Topology::Lines => wgpu::PrimitiveTopology::LineList,
                Topology::Triangles => wgpu::PrimitiveTopology::TriangleList,
            },
        })
    }
}

/// Uploads every mesh of `geode`, skipping the ones [`GpuMesh::from_mesh`] rejects.
pub fn upload_geode(device: &wgpu::Device, geode: &Geode) -> Vec<GpuMesh> {
    geode
        .drawables()
        .iter()
        .filter_map(|drawable| drawable.as_mesh())
        .filter_map(|mesh| GpuMesh::from_mesh(device, mesh))
        .collect()
}
