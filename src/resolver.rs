//! Resolution of marker references into template models.
//!
//! A resolver hands out [`ModelRef`]s that may be shared with its own cache and
//! with any number of placements. Callers must treat them as immutable and
//! [`Node::deep_clone`] before mutating.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard},
};

use anyhow::bail;

use crate::{
    data_structures::{
        feature::Feature,
        scene_graph::{ModelRef, Node},
        style::MarkerSymbol,
    },
    resources::{load_model_gltf, load_model_obj},
};

/// Turns a (feature, marker symbol) pair into a template model.
pub trait ModelResolver: Send + Sync {
    /// Returns `None` if the marker does not name a usable model.
    fn get_or_create_node(&self, feature: &Feature, symbol: &MarkerSymbol) -> Option<ModelRef>;
}

/// Caching resolver.
///
/// The marker expression is evaluated per feature; each distinct reference is
/// resolved once and the result, including a failure, is cached. Identical
/// references therefore always yield the same [`ModelRef`], which is what lets
/// the clusterer batch their features together.
#[derive(Default)]
pub struct MarkerFactory {
    base_dir: Option<PathBuf>,
    cache: Mutex<HashMap<String, Option<ModelRef>>>,
}

impl MarkerFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory relative model paths are resolved against.
    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(base_dir.into());
        self
    }

    /// Makes an in-memory model available under `reference`.
    pub fn register(&self, reference: &str, node: Node) -> ModelRef {
        let model = Arc::new(node);
        self.cache()
            .insert(reference.to_string(), Some(model.clone()));
        model
    }

    /// Resolves `reference` without a feature, loading and caching it on first use.
    pub fn get_or_load(&self, reference: &str) -> Option<ModelRef> {
        if reference.is_empty() {
            return None;
        }
        if let Some(cached) = self.cache().get(reference) {
            return cached.clone();
        }

        // loading happens outside the lock; a concurrent load of the same reference
        // is resolved in favor of whichever finishes first
        let loaded = match self.load(reference) {
            Ok(node) => Some(Arc::new(node)),
            Err(e) => {
                log::warn!("Failed to load model \"{}\": {}", reference, e);
                None
            }
        };
        self.cache()
            .entry(reference.to_string())
            .or_insert(loaded)
            .clone()
    }

    pub fn is_cached(&self, reference: &str) -> bool {
        self.cache().contains_key(reference)
    }

    fn load(&self, reference: &str) -> anyhow::Result<Node> {
        let path = match &self.base_dir {
            Some(base) => base.join(reference),
            None => PathBuf::from(reference),
        };
        match extension(&path).as_deref() {
            Some("gltf") | Some("glb") => load_model_gltf(&path),
            Some("obj") => load_model_obj(&path),
            _ => bail!("unsupported model format: {}", path.display()),
        }
    }

    fn cache(&self) -> MutexGuard<'_, HashMap<String, Option<ModelRef>>> {
        // a panic while holding the lock cannot leave the map half-updated
        self.cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
}

impl ModelResolver for MarkerFactory {
    fn get_or_create_node(&self, feature: &Feature, symbol: &MarkerSymbol) -> Option<ModelRef> {
        let reference = feature.eval(&symbol.marker);
        self.get_or_load(&reference)
    }
}
