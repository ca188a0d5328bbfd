//! The substitute model filter: instances a marker model at every feature point.
//!
//! ```text
//! features ──► run ──► place    (one transform node per point)
//!                  └─► cluster  (one merged clone per template)
//! ```
//!
//! Either way the result hangs below a delocalize group that moves the batch's
//! local frame back to where it belongs.

pub mod cluster;
pub mod place;

use cgmath::{Matrix4, SquareMatrix};
use thiserror::Error;

use crate::{
    context::{FilterContext, compute_localizers},
    data_structures::{
        expression::StringExpression,
        feature::Feature,
        scene_graph::{ContainerNode, DataVariance, Node, TransformNode},
        style::{MarkerSymbol, Style},
    },
    placement::Placement,
};

pub use cluster::{Bucket, bucket_features, cluster};
pub use place::place;

/// Why a batch produced nothing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubstituteError {
    #[error("feature substitution support not enabled")]
    Unsupported,
    #[error("empty style; cannot process features")]
    EmptyStyle,
    #[error("no marker symbol found in style {0:?}; cannot process features")]
    MissingMarker(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct SubstituteConfig {
    /// Merge all instances of a template into one pre-transformed geometry.
    pub cluster: bool,
    /// Carried for callers that group the output; the filter itself ignores it.
    pub merge: bool,
    /// Names each placed transform node. Unused when clustering.
    pub feature_name_expr: Option<StringExpression>,
    /// Applied to the template after the symbol's own scale and heading and, in
    /// geocentric frames, after the surface rotation.
    pub model_matrix: Matrix4<f64>,
}

impl Default for SubstituteConfig {
    fn default() -> Self {
        Self {
            cluster: false,
            merge: true,
            feature_name_expr: None,
            model_matrix: Matrix4::identity(),
        }
    }
}

impl SubstituteConfig {
    pub fn with_cluster(mut self, cluster: bool) -> Self {
        self.cluster = cluster;
        self
    }

    pub fn with_merge(mut self, merge: bool) -> Self {
        self.merge = merge;
        self
    }

    pub fn with_feature_name_expr(mut self, expr: &str) -> Self {
        self.feature_name_expr = Some(StringExpression::new(expr));
        self
    }

    pub fn with_model_matrix(mut self, model_matrix: Matrix4<f64>) -> Self {
        self.model_matrix = model_matrix;
        self
    }
}

pub struct SubstituteModelFilter {
    style: Style,
    config: SubstituteConfig,
}

impl SubstituteModelFilter {
    pub fn new(style: Style) -> Self {
        Self {
            style,
            config: SubstituteConfig::default(),
        }
    }

    pub fn with_config(mut self, config: SubstituteConfig) -> Self {
        self.config = config;
        self
    }

    pub fn style(&self) -> &Style {
        &self.style
    }

    pub fn config(&self) -> &SubstituteConfig {
        &self.config
    }

    /// Instances the style's marker model at every point of `features`.
    ///
    /// Returns `None` (after logging a warning) if substitution is disabled, the
    /// style is empty or it carries no marker symbol.
    pub fn run(&self, features: &[Feature], cx: &FilterContext) -> Option<Node> {
        let symbol = match self.check(cx) {
            Ok(symbol) => symbol,
            Err(e) => {
                log::warn!("[SubstituteModelFilter] {e}");
                return None;
            }
        };

        let cx = cx.clone();
        let localizers = compute_localizers(&cx);
        let placement = Placement {
            model_matrix: self.config.model_matrix,
            symbol_matrix: symbol.model_matrix(),
            world2local: localizers.world2local,
            is_geocentric: cx.is_geocentric(),
            srs: cx.profile().srs.clone(),
        };

        let mut group = delocalize_group(localizers.local2world);
        let resolver = cx.session().resolver();
        if self.config.cluster {
            cluster(features, symbol, &mut group, &placement, resolver);
        } else {
            place(
                features,
                symbol,
                &mut group,
                &placement,
                resolver,
                self.config.feature_name_expr.as_ref(),
            );
        }
        Some(group)
    }

    fn check(&self, cx: &FilterContext) -> Result<&MarkerSymbol, SubstituteError> {
        if !cx.session().capabilities().feature_substitution {
            return Err(SubstituteError::Unsupported);
        }
        if self.style.is_empty() {
            return Err(SubstituteError::EmptyStyle);
        }
        self.style
            .marker()
            .ok_or_else(|| SubstituteError::MissingMarker(self.style.name.clone()))
    }
}

/// Group node whose children live in the batch's local frame.
fn delocalize_group(local2world: Matrix4<f64>) -> Node {
    if local2world == Matrix4::identity() {
        ContainerNode::new().into()
    } else {
        let mut xform = TransformNode::new(local2world);
        xform.data_variance = DataVariance::Static;
        xform.into()
    }
}
