//! Geometry optimizations run over freshly instanced geodes.
//!
//! - `consolidate` merges compatible meshes into shared buffers
//! - `state` collapses duplicate materials into shared instances

pub mod consolidate;
pub mod state;

pub use consolidate::consolidate_geode;
pub use state::{StateRegistry, share_duplicate_state, share_duplicate_state_in};
