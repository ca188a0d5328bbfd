//! Engine data structures: models, scene graphs, features and styles.
//!
//! - `model` contains mesh, material and drawable definitions
//! - `scene_graph` enables hierarchical scene organization with shared templates
//! - `feature` holds geographic features and geometry iteration
//! - `expression` evaluates attribute expressions against features
//! - `style` holds styles and the marker symbol that names a model

pub mod expression;
pub mod feature;
pub mod model;
pub mod scene_graph;
pub mod style;
