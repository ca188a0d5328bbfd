use std::{path::Path, sync::Arc};

use anyhow::{Context, bail};

use crate::data_structures::{
    model::Material,
    scene_graph::{ContainerNode, Geode, Node},
};

/**
 * This module contains all logic for loading template models from external files.
 *
 * Loaders produce plain CPU-side scene graphs; nothing here touches the GPU.
 */
pub mod mesh;
pub mod node;

pub fn load_binary(path: &Path) -> anyhow::Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("reading {}", path.display()))
}

pub fn load_model_obj(path: &Path) -> anyhow::Result<Node> {
    let (models, materials) = tobj::load_obj(path, &tobj::GPU_LOAD_OPTIONS)
        .with_context(|| format!("parsing {}", path.display()))?;
    let materials = match materials {
        Ok(materials) => materials,
        Err(e) => {
            log::warn!("No materials for {}: {}", path.display(), e);
            Vec::new()
        }
    };
    let materials: Vec<Arc<Material>> = materials
        .iter()
        .map(|m| {
            let [r, g, b] = m.diffuse.unwrap_or([1.0, 1.0, 1.0]);
            let mut material = Material::new(&m.name, [r, g, b, m.dissolve.unwrap_or(1.0)]);
            material.texture = m.diffuse_texture.clone();
            Arc::new(material)
        })
        .collect();

    let meshes = mesh::load_meshes(&models, &materials);
    if meshes.is_empty() {
        bail!("{} contains no meshes", path.display());
    }
    let mut geode = Geode::new();
    geode.name = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .map(str::to_string);
    meshes
        .into_iter()
        .for_each(|mesh| geode.add_drawable(mesh.into()));
    Ok(geode.into())
}

pub fn load_model_gltf(path: &Path) -> anyhow::Result<Node> {
    let gltf = gltf::Gltf::from_slice(&load_binary(path)?)?;
    let base = path.parent().unwrap_or(Path::new("."));

    // Load buffers
    let mut buffer_data = Vec::new();
    for buffer in gltf.buffers() {
        match buffer.source() {
            gltf::buffer::Source::Bin => match gltf.blob.as_deref() {
                Some(blob) => buffer_data.push(blob.to_vec()),
                None => bail!("{} references a missing binary chunk", path.display()),
            },
            gltf::buffer::Source::Uri(uri) => {
                if uri.starts_with("data:") {
                    bail!("embedded data URIs are not supported ({})", path.display());
                }
                buffer_data.push(load_binary(&base.join(uri))?);
            }
        }
    }

    // Load materials
    let materials: Vec<Arc<Material>> = gltf
        .materials()
        .map(|material| {
            let pbr = material.pbr_metallic_roughness();
            let mut mat = Material::new(
                material.name().unwrap_or("unnamed_material"),
                pbr.base_color_factor(),
            );
            if let Some(info) = pbr.base_color_texture() {
                if let gltf::image::Source::Uri { uri, .. } = info.texture().source().source() {
                    mat.texture = Some(uri.to_string());
                }
            }
            Arc::new(mat)
        })
        .collect();

    let Some(scene) = gltf.default_scene().or_else(|| gltf.scenes().next()) else {
        bail!("{} contains no scene", path.display());
    };
    let mut models: Vec<Node> = scene
        .nodes()
        .map(|node| node::to_scene_node(node, &buffer_data, &materials))
        .collect();

    let root_node = if models.len() == 1 {
        models.remove(0)
    } else {
        let mut root_node = ContainerNode::new();
        root_node.children = models.into_iter().map(Arc::new).collect();
        root_node.into()
    };

    Ok(root_node)
}
