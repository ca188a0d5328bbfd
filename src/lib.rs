//! flow-scatter
//!
//! Places copies of a 3D model at geographic point features and assembles them
//! into a scene subtree, either as one transform node per point or, for large
//! batches, as a few merged meshes with the instance transforms baked into the
//! vertices. Flat (projected) and geocentric (round-earth) frames are both
//! supported; in the latter each instance is rotated to stand upright on the
//! ellipsoid at its own location.
//!
//! High-level modules
//! - `context`: session, profile and extent of a batch plus its localizers
//! - `data_structures`: meshes, scene graph, features, expressions and styles
//! - `optimize`: mesh consolidation and render state sharing
//! - `placement`: per-point instance matrices
//! - `resolver`: marker reference to template model resolution and caching
//! - `resources`: glTF and OBJ loaders producing template models
//! - `srs`: spatial references and ECEF conversions
//! - `substitute`: the filter itself (per-instance placement and clustering)
//! - `gpu` (feature `gpu`): upload of meshes into wgpu buffers
//!

pub mod context;
pub mod data_structures;
#[cfg(feature = "gpu")]
pub mod gpu;
pub mod optimize;
pub mod placement;
pub mod resolver;
pub mod resources;
pub mod srs;
pub mod substitute;

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath::*;
pub use substitute::{SubstituteConfig, SubstituteError, SubstituteModelFilter};
