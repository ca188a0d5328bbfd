//! Per-point placement matrices.
//!
//! Matrices follow cgmath's column-vector convention, so a composition reads from
//! right to left. A vertex first gets the symbol's scale and heading, then (for
//! geocentric frames) the surface rotation, then the configured model matrix, then
//! the translation to the point and finally the batch's world-to-local matrix.

use std::sync::Arc;

use cgmath::{EuclideanSpace, Matrix4, Point3};

use crate::srs::SpatialReference;

/// Computes the instance transform for `point`.
///
/// Flat frames yield `world2local * translate(point) * model_matrix * symbol_matrix`.
/// Geocentric frames convert `point` to ECEF and add the rotation that stands the
/// model upright on the surface at that exact point:
/// `world2local * translate(ecef) * model_matrix * rotation * symbol_matrix`.
/// The symbol matrix sits inside the rotation so its heading turns about local up.
pub fn compute_transform(
    point: Point3<f64>,
    model_matrix: &Matrix4<f64>,
    symbol_matrix: &Matrix4<f64>,
    world2local: &Matrix4<f64>,
    is_geocentric: bool,
    srs: &dyn SpatialReference,
) -> Matrix4<f64> {
    if is_geocentric {
        // A tile-wide local2world would be cheaper, but its up vector drifts
        // away from the surface normal on large tiles.
        let (local, rotation) = srs.to_ecef_with_rotation(point);
        world2local
            * Matrix4::from_translation(local.to_vec())
            * model_matrix
            * rotation
            * symbol_matrix
    } else {
        world2local * Matrix4::from_translation(point.to_vec()) * model_matrix * symbol_matrix
    }
}

/// The fixed inputs of [`compute_transform`] for one batch.
#[derive(Clone, Debug)]
pub struct Placement {
    pub model_matrix: Matrix4<f64>,
    /// Scale and heading of the marker symbol, in the instance's local frame.
    pub symbol_matrix: Matrix4<f64>,
    pub world2local: Matrix4<f64>,
    pub is_geocentric: bool,
    pub srs: Arc<dyn SpatialReference>,
}

impl Placement {
    pub fn transform_for(&self, point: Point3<f64>) -> Matrix4<f64> {
        compute_transform(
            point,
            &self.model_matrix,
            &self.symbol_matrix,
            &self.world2local,
            self.is_geocentric,
            self.srs.as_ref(),
        )
    }
}
