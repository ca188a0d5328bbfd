use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use flow_scatter::{
    Matrix4, Point3, Transform,
    context::{FilterContext, GeoExtent, MapInfo, Profile, Session},
    data_structures::{
        feature::{Feature, Geometry},
        model::{Mesh, PrimitiveMode},
        scene_graph::{Geode, ModelRef, Node},
        style::{MarkerSymbol, Style, Symbol},
    },
    resolver::ModelResolver,
    srs::SpatialReference,
};

pub const EPSILON: f64 = 1e-6;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn triangle_mesh() -> Mesh {
    Mesh::new(
        "triangle",
        vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
        PrimitiveMode::Triangles,
    )
}

/// A single geode holding one three vertex triangle.
pub fn triangle_template() -> Node {
    Geode::new().with_drawable(triangle_mesh()).into()
}

/// Resolves the evaluated marker reference against a fixed table and counts how
/// often it was asked.
#[derive(Default)]
pub struct CountingResolver {
    models: HashMap<String, ModelRef>,
    calls: AtomicUsize,
}

impl CountingResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(mut self, reference: &str, node: Node) -> Self {
        self.models.insert(reference.to_string(), Arc::new(node));
        self
    }

    pub fn model(&self, reference: &str) -> &ModelRef {
        &self.models[reference]
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ModelResolver for CountingResolver {
    fn get_or_create_node(&self, feature: &Feature, symbol: &MarkerSymbol) -> Option<ModelRef> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.models.get(&feature.eval(&symbol.marker)).cloned()
    }
}

pub fn point_feature(id: u64, x: f64, y: f64, z: f64) -> Feature {
    Feature::new(id, Geometry::point(x, y, z))
}

pub fn marker_style(marker: &str) -> Style {
    Style::new("markers").with_symbol(Symbol::Marker(MarkerSymbol::new(marker)))
}

pub fn context(
    geocentric: bool,
    srs: Arc<dyn SpatialReference>,
    extent: Option<GeoExtent>,
    resolver: Arc<dyn ModelResolver>,
) -> FilterContext {
    let session = Session::new(MapInfo { geocentric }, resolver);
    let cx = FilterContext::new(Arc::new(session), Profile::new(srs));
    match extent {
        Some(extent) => cx.with_extent(extent),
        None => cx,
    }
}

/// Every mesh vertex below `node`, transformed by the matrices above it
/// (`node`'s own included).
pub fn world_vertices(node: &Node) -> Vec<Point3<f64>> {
    node.collect_geodes()
        .into_iter()
        .flat_map(|(matrix, geode)| {
            geode
                .drawables()
                .iter()
                .filter_map(|d| d.as_mesh())
                .filter_map(|mesh| mesh.positions.as_vec3())
                .flatten()
                .map(move |p| {
                    matrix.transform_point(Point3::new(p[0] as f64, p[1] as f64, p[2] as f64))
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

pub fn approx_eq(a: Point3<f64>, b: Point3<f64>, eps: f64) -> bool {
    (a.x - b.x).abs() < eps && (a.y - b.y).abs() < eps && (a.z - b.z).abs() < eps
}

pub fn matrix_approx_eq(a: &Matrix4<f64>, b: &Matrix4<f64>, eps: f64) -> bool {
    (0..4).all(|c| (0..4).all(|r| (a[c][r] - b[c][r]).abs() < eps))
}

/// Asserts both lists hold the same points (as multisets) within `eps`.
pub fn assert_same_points(actual: &[Point3<f64>], expected: &[Point3<f64>], eps: f64) {
    assert_eq!(actual.len(), expected.len(), "point counts differ");
    let mut unmatched: Vec<Point3<f64>> = expected.to_vec();
    for a in actual {
        let Some(i) = unmatched.iter().position(|e| approx_eq(*a, *e, eps)) else {
            panic!("{:?} has no counterpart in {:?}", a, unmatched);
        };
        unmatched.swap_remove(i);
    }
}
