//! One transform node per feature point.

use std::sync::Arc;

use crate::{
    data_structures::{
        expression::StringExpression,
        feature::Feature,
        scene_graph::{DataVariance, Node, TransformNode},
        style::MarkerSymbol,
    },
    placement::Placement,
    resolver::ModelResolver,
};

/// Appends a static transform node to `attach_point` for every point of every
/// feature. The resolved template becomes the node's only child and is shared,
/// not copied. A point whose model does not resolve still gets its (empty)
/// transform node, so nodes and points stay in one-to-one correspondence.
pub fn place(
    features: &[Feature],
    symbol: &MarkerSymbol,
    attach_point: &mut Node,
    placement: &Placement,
    resolver: &dyn ModelResolver,
    feature_name_expr: Option<&StringExpression>,
) -> bool {
    for feature in features {
        for &point in feature.points() {
            let mut xform = TransformNode::new(placement.transform_for(point));
            xform.data_variance = DataVariance::Static;

            if let Some(model) = resolver.get_or_create_node(feature, symbol) {
                xform.children.push(model);
            }

            let mut node: Node = xform.into();
            if let Some(expr) = feature_name_expr {
                let name = feature.eval(expr);
                if !name.is_empty() {
                    node.set_name(&name);
                }
            }

            attach_point.add_child(Arc::new(node));
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        data_structures::{
            feature::Geometry,
            scene_graph::{ContainerNode, Geode},
        },
        resolver::MarkerFactory,
        srs::GeographicSrs,
    };
    use cgmath::{Matrix4, Point3, SquareMatrix, Vector3};

    fn flat_placement() -> Placement {
        Placement {
            model_matrix: Matrix4::identity(),
            symbol_matrix: Matrix4::identity(),
            world2local: Matrix4::identity(),
            is_geocentric: false,
            srs: Arc::new(GeographicSrs::wgs84()),
        }
    }

    #[test]
    fn one_static_transform_per_point() {
        let factory = MarkerFactory::new();
        let model = factory.register("tree", Geode::new().into());
        let features = [
            Feature::new(
                1,
                Geometry::Points(vec![Point3::new(1.0, 2.0, 0.0), Point3::new(3.0, 4.0, 0.0)]),
            ),
            Feature::new(2, Geometry::point(5.0, 6.0, 7.0)),
        ];
        let mut group: Node = ContainerNode::new().into();

        assert!(place(
            &features,
            &MarkerSymbol::new("tree"),
            &mut group,
            &flat_placement(),
            &factory,
            None,
        ));

        assert_eq!(group.children().len(), 3);
        let last = group.children()[2].as_transform().unwrap();
        assert_eq!(last.data_variance, DataVariance::Static);
        assert_eq!(
            last.matrix,
            Matrix4::from_translation(Vector3::new(5.0, 6.0, 7.0))
        );
        assert!(Arc::ptr_eq(&last.children[0], &model));
    }

    #[test]
    fn empty_names_are_not_assigned() {
        let factory = MarkerFactory::new();
        let features = [
            Feature::new(1, Geometry::point(0.0, 0.0, 0.0)).with_attr("name", "Big Ben"),
            Feature::new(2, Geometry::point(1.0, 0.0, 0.0)),
        ];
        let mut group: Node = ContainerNode::new().into();
        let expr = StringExpression::new("[name]");

        place(
            &features,
            &MarkerSymbol::new("missing"),
            &mut group,
            &flat_placement(),
            &factory,
            Some(&expr),
        );

        assert_eq!(group.children()[0].name(), Some("Big Ben"));
        assert_eq!(group.children()[1].name(), None);
    }
}
