use std::sync::Arc;

use flow_scatter::{
    EuclideanSpace, InnerSpace, Matrix4, Point3, Transform, Vector3,
    context::{GeoExtent, compute_localizers},
    data_structures::{
        feature::{Feature, Geometry, Polygon},
        scene_graph::{DataVariance, Node},
        style::{MarkerSymbol, Style, Symbol},
    },
    srs::{Ellipsoid, GeographicSrs, TangentPlaneSrs},
    substitute::{SubstituteConfig, SubstituteModelFilter},
};

use crate::common::test_utils::{
    CountingResolver, EPSILON, context, init_logger, marker_style, matrix_approx_eq,
    point_feature, triangle_template,
};

mod common;

fn transforms(group: &Node) -> Vec<Matrix4<f64>> {
    group
        .children()
        .iter()
        .map(|child| child.as_transform().expect("transform node").matrix)
        .collect()
}

#[test]
fn flat_transforms_have_no_rotation_term() {
    init_logger();
    let resolver = Arc::new(CountingResolver::new().with_model("tree", triangle_template()));
    let cx = context(
        false,
        Arc::new(TangentPlaneSrs::new(0.0, 0.0, 0.0)),
        Some(GeoExtent::new(0.0, 0.0, 100.0, 50.0)),
        resolver,
    );
    let model = Matrix4::from_scale(3.0);
    let filter = SubstituteModelFilter::new(marker_style("tree"))
        .with_config(SubstituteConfig::default().with_model_matrix(model));
    let features = [point_feature(1, 10.0, 20.0, 1.0), point_feature(2, 90.0, 5.0, 0.0)];

    let group = filter.run(&features, &cx).unwrap();

    let world2local = compute_localizers(&cx).world2local;
    for (feature, matrix) in features.iter().zip(transforms(&group)) {
        let point = *feature.points().next().unwrap();
        assert_eq!(
            matrix,
            world2local * Matrix4::from_translation(point.to_vec()) * model
        );
    }
}

#[test]
fn geocentric_transforms_stand_on_the_ellipsoid() {
    init_logger();
    let resolver = Arc::new(CountingResolver::new().with_model("tree", triangle_template()));
    let cx = context(true, Arc::new(GeographicSrs::wgs84()), None, resolver);
    let filter = SubstituteModelFilter::new(marker_style("tree"));
    let features = [point_feature(1, 0.0, 0.0, 0.0), point_feature(2, 30.0, 60.0, 0.0)];

    let group = filter.run(&features, &cx).unwrap();
    let matrices = transforms(&group);

    assert!(!matrix_approx_eq(&matrices[0], &matrices[1], EPSILON));
    let ellipsoid = Ellipsoid::wgs84();
    for (feature, matrix) in features.iter().zip(&matrices) {
        let p = feature.points().next().unwrap();
        let up = matrix.transform_vector(Vector3::unit_z());
        let normal = ellipsoid
            .enu_rotation(p.y, p.x)
            .transform_vector(Vector3::unit_z());
        assert!((up - normal).magnitude() < EPSILON);

        let origin = matrix.transform_point(Point3::origin());
        let expected = ellipsoid.geodetic_to_ecef(p.y, p.x, p.z);
        assert!((origin - expected).magnitude() < 1e-3);
    }
}

#[test]
fn heading_turns_north_to_east_about_local_up() {
    init_logger();
    let resolver = Arc::new(CountingResolver::new().with_model("tree", triangle_template()));
    let cx = context(true, Arc::new(GeographicSrs::wgs84()), None, resolver);
    let style = Style::new("trees")
        .with_symbol(Symbol::Marker(MarkerSymbol::new("tree").with_heading(90.0)));
    let features = [point_feature(1, 0.0, 0.0, 0.0), point_feature(2, 11.5, 48.1, 520.0)];

    let group = SubstituteModelFilter::new(style).run(&features, &cx).unwrap();

    let ellipsoid = Ellipsoid::wgs84();
    for (feature, matrix) in features.iter().zip(transforms(&group)) {
        let p = feature.points().next().unwrap();
        let enu = ellipsoid.enu_rotation(p.y, p.x);
        let up = matrix.transform_vector(Vector3::unit_z());
        let north = matrix.transform_vector(Vector3::unit_y());
        assert!((up - enu.transform_vector(Vector3::unit_z())).magnitude() < EPSILON);
        assert!((north - enu.transform_vector(Vector3::unit_x())).magnitude() < EPSILON);
    }
}

#[test]
fn one_transform_per_point_whether_or_not_resolved() {
    init_logger();
    let resolver = Arc::new(CountingResolver::new().with_model("tree", triangle_template()));
    let cx = context(
        false,
        Arc::new(TangentPlaneSrs::new(0.0, 0.0, 0.0)),
        None,
        resolver.clone(),
    );
    let square = vec![
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(10.0, 0.0, 0.0),
        Point3::new(10.0, 10.0, 0.0),
        Point3::new(0.0, 10.0, 0.0),
    ];
    let features = [
        Feature::new(1, Geometry::LineString(square[..2].to_vec())).with_attr("kind", "tree"),
        Feature::new(
            2,
            Geometry::Polygon(Polygon {
                outer: square.clone(),
                holes: vec![square[..3].to_vec()],
            }),
        )
        .with_attr("kind", "tree"),
        Feature::new(
            3,
            Geometry::Multi(vec![
                Geometry::point(1.0, 1.0, 0.0),
                Geometry::Multi(vec![Geometry::point(2.0, 2.0, 0.0)]),
            ]),
        )
        .with_attr("kind", "rock"),
        Feature::default(),
    ];
    let expected: usize = features.iter().map(|f| f.points().count()).sum();
    assert_eq!(expected, 8);

    let filter = SubstituteModelFilter::new(marker_style("[kind]"));
    let group = filter.run(&features, &cx).unwrap();

    assert_eq!(group.count_transforms(), expected);
    assert_eq!(resolver.calls(), expected);
    let populated = group
        .children()
        .iter()
        .filter(|child| !child.children().is_empty())
        .count();
    assert_eq!(populated, 6);
}

#[test]
fn transforms_are_static_and_share_the_template() {
    init_logger();
    let resolver = Arc::new(CountingResolver::new().with_model("tree", triangle_template()));
    let cx = context(
        false,
        Arc::new(TangentPlaneSrs::new(0.0, 0.0, 0.0)),
        None,
        resolver.clone(),
    );
    let features = [point_feature(1, 0.0, 0.0, 0.0), point_feature(2, 5.0, 0.0, 0.0)];

    let group = SubstituteModelFilter::new(marker_style("tree"))
        .run(&features, &cx)
        .unwrap();

    for child in group.children() {
        let xform = child.as_transform().unwrap();
        assert_eq!(xform.data_variance, DataVariance::Static);
        assert!(Arc::ptr_eq(&xform.children[0], resolver.model("tree")));
    }
}

#[test]
fn unresolved_models_leave_empty_transforms() {
    init_logger();
    let resolver = Arc::new(CountingResolver::new());
    let cx = context(
        false,
        Arc::new(TangentPlaneSrs::new(0.0, 0.0, 0.0)),
        None,
        resolver,
    );
    let features = [point_feature(1, 4.0, 2.0, 0.0)];

    let group = SubstituteModelFilter::new(marker_style("nowhere"))
        .run(&features, &cx)
        .unwrap();

    assert_eq!(group.children().len(), 1);
    let xform = group.children()[0].as_transform().unwrap();
    assert!(xform.children.is_empty());
    assert_eq!(
        xform.matrix,
        Matrix4::from_translation(Vector3::new(4.0, 2.0, 0.0))
    );
}

#[test]
fn transforms_are_named_by_expression() {
    init_logger();
    let resolver = Arc::new(CountingResolver::new().with_model("tree", triangle_template()));
    let cx = context(
        false,
        Arc::new(TangentPlaneSrs::new(0.0, 0.0, 0.0)),
        None,
        resolver,
    );
    let features = [
        point_feature(1, 0.0, 0.0, 0.0).with_attr("species", "oak").with_attr("id", 7i64),
        point_feature(2, 1.0, 0.0, 0.0),
    ];
    let config = SubstituteConfig::default().with_feature_name_expr("[species]");

    let group = SubstituteModelFilter::new(marker_style("tree"))
        .with_config(config)
        .run(&features, &cx)
        .unwrap();

    assert_eq!(group.children()[0].name(), Some("oak"));
    assert_eq!(group.children()[1].name(), None);
}
