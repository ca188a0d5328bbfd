//! Mesh, material and drawable definitions.
//!
//! Meshes live on the CPU side so that the instancer can copy and bake them into
//! object space. Cloning a [`Mesh`] deep-copies its vertex and primitive arrays
//! while the render state ([`Material`]) stays shared behind an [`Arc`].

use std::sync::Arc;

use cgmath::{InnerSpace, Matrix, Matrix3, Matrix4, Point3, SquareMatrix, Transform, Vector3};

/// How the index (or vertex) stream of a [`Mesh`] is assembled into primitives.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PrimitiveMode {
    Points,
    Lines,
    LineStrip,
    LineLoop,
    Triangles,
    TriangleStrip,
    TriangleFan,
}

/// The list topology a [`PrimitiveMode`] expands into.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Topology {
    Points,
    Lines,
    Triangles,
}

impl PrimitiveMode {
    pub fn topology(self) -> Topology {
        match self {
            PrimitiveMode::Points => Topology::Points,
            PrimitiveMode::Lines | PrimitiveMode::LineStrip | PrimitiveMode::LineLoop => {
                Topology::Lines
            }
            PrimitiveMode::Triangles
            | PrimitiveMode::TriangleStrip
            | PrimitiveMode::TriangleFan => Topology::Triangles,
        }
    }
}

impl Topology {
    /// The plain list mode for this topology.
    pub fn list_mode(self) -> PrimitiveMode {
        match self {
            Topology::Points => PrimitiveMode::Points,
            Topology::Lines => PrimitiveMode::Lines,
            Topology::Triangles => PrimitiveMode::Triangles,
        }
    }
}

/// Vertex position storage.
///
/// Only single precision `Vec3` arrays take part in instancing; the other
/// variants come from loaders or callers that keep high precision or planar
/// data around and are passed through untouched.
#[derive(Clone, Debug, PartialEq)]
pub enum VertexArray {
    Vec3(Vec<[f32; 3]>),
    Vec3d(Vec<[f64; 3]>),
    Vec2(Vec<[f32; 2]>),
}

impl VertexArray {
    pub fn len(&self) -> usize {
        match self {
            VertexArray::Vec3(v) => v.len(),
            VertexArray::Vec3d(v) => v.len(),
            VertexArray::Vec2(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_vec3(&self) -> Option<&Vec<[f32; 3]>> {
        match self {
            VertexArray::Vec3(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_vec3_mut(&mut self) -> Option<&mut Vec<[f32; 3]>> {
        match self {
            VertexArray::Vec3(v) => Some(v),
            _ => None,
        }
    }
}

/// Render state of a mesh. Two materials that compare equal are interchangeable
/// and may be collapsed into one shared instance.
#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    pub name: String,
    pub diffuse: [f32; 4],
    pub texture: Option<String>,
}

impl Material {
    pub fn new(name: &str, diffuse: [f32; 4]) -> Self {
        Self {
            name: name.to_string(),
            diffuse,
            texture: None,
        }
    }

    pub fn with_texture(mut self, texture: &str) -> Self {
        self.texture = Some(texture.to_string());
        self
    }
}

/// A drawable triangle/line/point mesh.
#[derive(Clone, Debug)]
pub struct Mesh {
    pub name: String,
    pub positions: VertexArray,
    pub normals: Option<Vec<[f32; 3]>>,
    pub tex_coords: Option<Vec<[f32; 2]>>,
    /// `None` draws the vertices in order.
    pub indices: Option<Vec<u32>>,
    pub mode: PrimitiveMode,
    pub material: Option<Arc<Material>>,
}

impl Mesh {
    pub fn new(name: &str, positions: Vec<[f32; 3]>, mode: PrimitiveMode) -> Self {
        Self {
            name: name.to_string(),
            positions: VertexArray::Vec3(positions),
            normals: None,
            tex_coords: None,
            indices: None,
            mode,
            material: None,
        }
    }

    pub fn with_indices(mut self, indices: Vec<u32>) -> Self {
        self.indices = Some(indices);
        self
    }

    pub fn with_normals(mut self, normals: Vec<[f32; 3]>) -> Self {
        self.normals = Some(normals);
        self
    }

    pub fn with_tex_coords(mut self, tex_coords: Vec<[f32; 2]>) -> Self {
        self.tex_coords = Some(tex_coords);
        self
    }

    pub fn with_material(mut self, material: Arc<Material>) -> Self {
        self.material = Some(material);
        self
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Transforms every vertex (and normal) in place.
    ///
    /// Returns `false` and leaves the mesh untouched when the positions are not
    /// stored as a single precision `Vec3` array.
    pub fn transform(&mut self, matrix: &Matrix4<f64>) -> bool {
        let Some(positions) = self.positions.as_vec3_mut() else {
            return false;
        };
        for p in positions.iter_mut() {
            let point = Point3::new(p[0] as f64, p[1] as f64, p[2] as f64);
            let moved = matrix.transform_point(point);
            *p = [moved.x as f32, moved.y as f32, moved.z as f32];
        }

        if let Some(normals) = self.normals.as_mut() {
            let linear = Matrix3::from_cols(
                matrix.x.truncate(),
                matrix.y.truncate(),
                matrix.z.truncate(),
            );
            // Normals follow the inverse transpose so non-uniform scales keep them perpendicular.
            let normal_matrix = linear
                .invert()
                .map(|inv| inv.transpose())
                .unwrap_or(linear);
            for n in normals.iter_mut() {
                let v = normal_matrix * Vector3::new(n[0] as f64, n[1] as f64, n[2] as f64);
                let v = if v.magnitude2() > 0.0 { v.normalize() } else { v };
                *n = [v.x as f32, v.y as f32, v.z as f32];
            }
        }
        true
    }

    /// Index list of this mesh expanded into the plain list topology of its mode.
    ///
    /// Strips, fans and loops are unrolled so that meshes of different modes can
    /// share one buffer. Incomplete trailing primitives are dropped.
    pub fn element_indices(&self) -> Vec<u32> {
        let base: Vec<u32> = match &self.indices {
            Some(indices) => indices.clone(),
            None => (0..self.vertex_count() as u32).collect(),
        };
        let n = base.len();
        match self.mode {
            PrimitiveMode::Points => base,
            PrimitiveMode::Lines => base[..n - n % 2].to_vec(),
            PrimitiveMode::Triangles => base[..n - n % 3].to_vec(),
            PrimitiveMode::LineStrip => base.windows(2).flatten().copied().collect(),
            PrimitiveMode::LineLoop => {
                let mut lines: Vec<u32> = base.windows(2).flatten().copied().collect();
                if n > 2 {
                    lines.extend([base[n - 1], base[0]]);
                }
                lines
            }
            PrimitiveMode::TriangleStrip => {
                let mut triangles = Vec::with_capacity(n.saturating_sub(2) * 3);
                for i in 0..n.saturating_sub(2) {
                    // every other triangle is flipped to keep the winding consistent
                    if i % 2 == 0 {
                        triangles.extend([base[i], base[i + 1], base[i + 2]]);
                    } else {
                        triangles.extend([base[i + 1], base[i], base[i + 2]]);
                    }
                }
                triangles
            }
            PrimitiveMode::TriangleFan => {
                let mut triangles = Vec::with_capacity(n.saturating_sub(2) * 3);
                for i in 1..n.saturating_sub(1) {
                    triangles.extend([base[0], base[i], base[i + 1]]);
                }
                triangles
            }
        }
    }

    pub fn bound(&self) -> Option<BoundingBox> {
        match &self.positions {
            VertexArray::Vec3(v) => BoundingBox::from_points(
                v.iter()
                    .map(|p| Point3::new(p[0] as f64, p[1] as f64, p[2] as f64)),
            ),
            VertexArray::Vec3d(v) => {
                BoundingBox::from_points(v.iter().map(|p| Point3::new(p[0], p[1], p[2])))
            }
            VertexArray::Vec2(v) => BoundingBox::from_points(
                v.iter().map(|p| Point3::new(p[0] as f64, p[1] as f64, 0.0)),
            ),
        }
    }

    /// Interleaves the mesh into [`ModelVertex`] records.
    ///
    /// Tangents and bitangents are derived from the triangles and texture
    /// coordinates when both are present. Returns `None` for non `Vec3` positions.
    pub fn to_model_vertices(&self) -> Option<Vec<ModelVertex>> {
        let positions = self.positions.as_vec3()?;
        let mut vertices = positions
            .iter()
            .enumerate()
            .map(|(i, position)| ModelVertex {
                position: *position,
                tex_coords: self
                    .tex_coords
                    .as_ref()
                    .and_then(|t| t.get(i).copied())
                    .unwrap_or_default(),
                normal: self
                    .normals
                    .as_ref()
                    .and_then(|n| n.get(i).copied())
                    .unwrap_or_default(),
                tangent: [0.0; 3],
                bitangent: [0.0; 3],
            })
            .collect::<Vec<_>>();

        if self.tex_coords.is_none() || self.mode.topology() != Topology::Triangles {
            return Some(vertices);
        }

        let mut triangles_included = vec![0u32; vertices.len()];
        for c in self.element_indices().chunks(3) {
            let [i0, i1, i2] = [c[0] as usize, c[1] as usize, c[2] as usize];
            if i0 >= vertices.len() || i1 >= vertices.len() || i2 >= vertices.len() {
                continue;
            }
            let pos0: Vector3<f32> = vertices[i0].position.into();
            let pos1: Vector3<f32> = vertices[i1].position.into();
            let pos2: Vector3<f32> = vertices[i2].position.into();
            let uv0: cgmath::Vector2<f32> = vertices[i0].tex_coords.into();
            let uv1: cgmath::Vector2<f32> = vertices[i1].tex_coords.into();
            let uv2: cgmath::Vector2<f32> = vertices[i2].tex_coords.into();

            let delta_pos1 = pos1 - pos0;
            let delta_pos2 = pos2 - pos0;
            let delta_uv1 = uv1 - uv0;
            let delta_uv2 = uv2 - uv0;

            let det = delta_uv1.x * delta_uv2.y - delta_uv1.y * delta_uv2.x;
            if det == 0.0 {
                continue;
            }
            let r = 1.0 / det;
            let tangent = (delta_pos1 * delta_uv2.y - delta_pos2 * delta_uv1.y) * r;
            // flipped for right-handed normal maps
            let bitangent = (delta_pos2 * delta_uv1.x - delta_pos1 * delta_uv2.x) * -r;

            for i in [i0, i1, i2] {
                vertices[i].tangent = (tangent + Vector3::from(vertices[i].tangent)).into();
                vertices[i].bitangent = (bitangent + Vector3::from(vertices[i].bitangent)).into();
                triangles_included[i] += 1;
            }
        }

        for (v, n) in vertices.iter_mut().zip(triangles_included) {
            if n == 0 {
                continue;
            }
            let denom = 1.0 / n as f32;
            v.tangent = (Vector3::from(v.tangent) * denom).into();
            v.bitangent = (Vector3::from(v.bitangent) * denom).into();
        }
        Some(vertices)
    }
}

/// Parametric shapes that are drawn without explicit vertex data.
#[derive(Clone, Debug, PartialEq)]
pub enum Shape {
    Sphere { center: [f32; 3], radius: f32 },
    Box { center: [f32; 3], half_extents: [f32; 3] },
}

impl Shape {
    pub fn bound(&self) -> BoundingBox {
        let (center, half) = match self {
            Shape::Sphere { center, radius } => (*center, [*radius; 3]),
            Shape::Box {
                center,
                half_extents,
            } => (*center, *half_extents),
        };
        BoundingBox {
            min: Point3::new(
                (center[0] - half[0]) as f64,
                (center[1] - half[1]) as f64,
                (center[2] - half[2]) as f64,
            ),
            max: Point3::new(
                (center[0] + half[0]) as f64,
                (center[1] + half[1]) as f64,
                (center[2] + half[2]) as f64,
            ),
        }
    }
}

/// Anything a geode can hold.
#[derive(Clone, Debug)]
pub enum Drawable {
    Mesh(Mesh),
    Shape(Shape),
}

impl Drawable {
    pub fn as_mesh(&self) -> Option<&Mesh> {
        match self {
            Drawable::Mesh(mesh) => Some(mesh),
            Drawable::Shape(_) => None,
        }
    }

    pub fn as_mesh_mut(&mut self) -> Option<&mut Mesh> {
        match self {
            Drawable::Mesh(mesh) => Some(mesh),
            Drawable::Shape(_) => None,
        }
    }

    pub fn bound(&self) -> Option<BoundingBox> {
        match self {
            Drawable::Mesh(mesh) => mesh.bound(),
            Drawable::Shape(shape) => Some(shape.bound()),
        }
    }
}

impl From<Mesh> for Drawable {
    fn from(mesh: Mesh) -> Self {
        Drawable::Mesh(mesh)
    }
}

/// Axis aligned bounding box in double precision.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BoundingBox {
    pub min: Point3<f64>,
    pub max: Point3<f64>,
}

impl BoundingBox {
    pub fn from_points(points: impl IntoIterator<Item = Point3<f64>>) -> Option<Self> {
        let mut points = points.into_iter();
        let first = points.next()?;
        let mut bb = BoundingBox {
            min: first,
            max: first,
        };
        points.for_each(|p| bb.expand(p));
        Some(bb)
    }

    pub fn expand(&mut self, p: Point3<f64>) {
        self.min = Point3::new(self.min.x.min(p.x), self.min.y.min(p.y), self.min.z.min(p.z));
        self.max = Point3::new(self.max.x.max(p.x), self.max.y.max(p.y), self.max.z.max(p.z));
    }

    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        let mut bb = *self;
        bb.expand(other.min);
        bb.expand(other.max);
        bb
    }

    /// Box enclosing all eight transformed corners.
    pub fn transformed(&self, matrix: &Matrix4<f64>) -> BoundingBox {
        let corners = (0..8).map(|i| {
            Point3::new(
                if i & 1 == 0 { self.min.x } else { self.max.x },
                if i & 2 == 0 { self.min.y } else { self.max.y },
                if i & 4 == 0 { self.min.z } else { self.max.z },
            )
        });
        BoundingBox::from_points(corners.map(|c| matrix.transform_point(c))).unwrap_or(*self)
    }
}

/// Interleaved vertex layout used when meshes are uploaded to the GPU.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelVertex {
    pub position: [f32; 3],
    pub tex_coords: [f32; 2],
    pub normal: [f32; 3],
    pub tangent: [f32; 3],
    pub bitangent: [f32; 3],
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{Deg, Matrix4, Vector3};

    fn quad_strip() -> Mesh {
        Mesh::new(
            "strip",
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 1.0, 0.0]],
            PrimitiveMode::TriangleStrip,
        )
    }

    #[test]
    fn strip_expands_into_triangles_with_consistent_winding() {
        assert_eq!(quad_strip().element_indices(), vec![0, 1, 2, 2, 1, 3]);
    }

    #[test]
    fn fan_and_loop_expand() {
        let mut fan = quad_strip();
        fan.mode = PrimitiveMode::TriangleFan;
        assert_eq!(fan.element_indices(), vec![0, 1, 2, 0, 2, 3]);

        let mut line_loop = quad_strip();
        line_loop.mode = PrimitiveMode::LineLoop;
        assert_eq!(line_loop.element_indices(), vec![0, 1, 1, 2, 2, 3, 3, 0]);
    }

    #[test]
    fn incomplete_triangles_are_dropped() {
        let mut mesh = quad_strip().with_indices(vec![0, 1, 2, 3]);
        mesh.mode = PrimitiveMode::Triangles;
        assert_eq!(mesh.element_indices(), vec![0, 1, 2]);
    }

    #[test]
    fn transform_moves_positions_and_rotates_normals() {
        let mut mesh = Mesh::new("tri", vec![[1.0, 0.0, 0.0]], PrimitiveMode::Points)
            .with_normals(vec![[1.0, 0.0, 0.0]]);
        let m = Matrix4::from_translation(Vector3::new(0.0, 0.0, 5.0))
            * Matrix4::from_angle_z(Deg(90.0));
        assert!(mesh.transform(&m));

        let p = mesh.positions.as_vec3().unwrap()[0];
        assert!((p[0] - 0.0).abs() < 1e-6);
        assert!((p[1] - 1.0).abs() < 1e-6);
        assert!((p[2] - 5.0).abs() < 1e-6);
        let n = mesh.normals.as_ref().unwrap()[0];
        assert!((n[1] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn transform_refuses_double_precision_arrays() {
        let mut mesh = quad_strip();
        mesh.positions = VertexArray::Vec3d(vec![[1.0, 2.0, 3.0]]);
        assert!(!mesh.transform(&Matrix4::from_scale(2.0)));
        assert_eq!(mesh.positions, VertexArray::Vec3d(vec![[1.0, 2.0, 3.0]]));
    }

    #[test]
    fn transformed_bound_encloses_rotated_box() {
        let bb = BoundingBox {
            min: Point3::new(-1.0, -1.0, -1.0),
            max: Point3::new(1.0, 1.0, 1.0),
        };
        let rotated = bb.transformed(&Matrix4::from_angle_z(Deg(45.0)));
        assert!((rotated.max.x - 2f64.sqrt()).abs() < 1e-9);
        assert!((rotated.max.z - 1.0).abs() < 1e-9);
    }

    #[test]
    fn model_vertices_carry_tangents_for_textured_triangles() {
        let mesh = Mesh::new(
            "tri",
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            PrimitiveMode::Triangles,
        )
        .with_tex_coords(vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]);
        let vertices = mesh.to_model_vertices().unwrap();
        assert_eq!(vertices.len(), 3);
        assert!((vertices[0].tangent[0] - 1.0).abs() < 1e-6);
        assert_eq!(bytemuck::cast_slice::<ModelVertex, u8>(&vertices).len(), 3 * 56);
    }
}
