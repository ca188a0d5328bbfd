//! Clustering: one merged copy of each template per batch.
//!
//! Features are bucketed by the identity of the template they resolve to. Each
//! bucket deep-clones its template once and replaces every mesh in the clone with
//! one pre-transformed copy per feature point, then consolidates the result into
//! as few meshes as possible.

use std::sync::Arc;

use crate::{
    data_structures::{
        feature::Feature,
        model::Drawable,
        scene_graph::{Geode, ModelRef, Node},
        style::MarkerSymbol,
    },
    optimize::{consolidate_geode, share_duplicate_state},
    placement::Placement,
    resolver::ModelResolver,
};

/// Features sharing one template instance.
pub struct Bucket<'f> {
    pub model: ModelRef,
    pub features: Vec<&'f Feature>,
}

/// Groups `features` by resolved template, comparing templates by pointer.
///
/// Buckets come out in the order their template was first seen, and each bucket
/// keeps its features in input order. A feature whose template does not resolve
/// is left out of every bucket.
pub fn bucket_features<'f>(
    features: &'f [Feature],
    symbol: &MarkerSymbol,
    resolver: &dyn ModelResolver,
) -> Vec<Bucket<'f>> {
    let mut buckets: Vec<Bucket<'f>> = Vec::new();
    for feature in features {
        let Some(model) = resolver.get_or_create_node(feature, symbol) else {
            log::debug!("Feature {} has no model and is not clustered.", feature.id);
            continue;
        };
        match buckets.iter_mut().find(|b| Arc::ptr_eq(&b.model, &model)) {
            Some(bucket) => bucket.features.push(feature),
            None => buckets.push(Bucket {
                model,
                features: vec![feature],
            }),
        }
    }
    buckets
}

/// Appends one clustered clone per bucket to `attach_point`.
pub fn cluster(
    features: &[Feature],
    symbol: &MarkerSymbol,
    attach_point: &mut Node,
    placement: &Placement,
    resolver: &dyn ModelResolver,
) -> bool {
    let buckets = bucket_features(features, symbol, resolver);
    log::debug!("Sorted {} features into {} buckets", features.len(), buckets.len());

    for bucket in buckets {
        let mut clone = bucket.model.deep_clone();
        clone.visit_geodes_mut(&mut |geode| cluster_geode(geode, &bucket.features, placement));
        log::debug!(
            "Bucket of {} features clustered into {} vertices",
            bucket.features.len(),
            clone
                .collect_geodes()
                .iter()
                .map(|(_, geode)| geode.vertex_count())
                .sum::<usize>()
        );
        attach_point.add_child(Arc::new(clone));
    }
    true
}

/// Replaces the meshes of `geode` with one transformed copy per feature point.
/// Non-mesh drawables and meshes without `Vec3` positions are dropped.
fn cluster_geode(geode: &mut Geode, features: &[&Feature], placement: &Placement) {
    let originals = geode.take_drawables();

    for original in &originals {
        let Drawable::Mesh(mesh) = original else {
            continue;
        };
        if mesh.positions.as_vec3().is_none() {
            log::debug!("Mesh {} has no Vec3 vertex array; skipped.", mesh.name);
            continue;
        }
        for &point in features.iter().flat_map(|f| f.points()) {
            let mut instance = mesh.clone();
            if instance.transform(&placement.transform_for(point)) {
                geode.add_drawable(instance.into());
            }
        }
    }

    geode.dirty_bound();
    consolidate_geode(geode);
    share_duplicate_state(geode);
}
