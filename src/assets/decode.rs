//! Byte-level decoding of fetched assets. Runs on fetch workers.

use super::{AssetError, LoadKind, LoadRequest, LoadedAsset, Texture};
use crate::materials::{MapRef, Material};
use crate::scene::{MeshPart, ModelTree, NodeKind, PrimitiveRef, Transform, TreeNode};
use glam::{Quat, Vec3};
use gltf::json;
use gltf::json::validation::{Error as ValidationError, Validate};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

pub const DRACO_EXTENSION: &str = "KHR_draco_mesh_compression";

/// Deeper hierarchies are truncated.
const MAX_NODE_DEPTH: usize = 64;

pub fn decode(request: &LoadRequest, bytes: &[u8]) -> Result<LoadedAsset, AssetError> {
    match request.kind {
        LoadKind::Model | LoadKind::Handle => decode_model(&request.path, bytes).map(LoadedAsset::Model),
        LoadKind::Texture => decode_texture(&request.path, bytes).map(|texture| LoadedAsset::Texture(Arc::new(texture))),
    }
}

/// Parse a `.gltf` / `.glb` document into its node hierarchy and materials.
/// Buffers are left to the renderer, so draco-compressed documents parse
/// without the decoder.
pub fn decode_model(path: &str, bytes: &[u8]) -> Result<ModelTree, AssetError> {
    let parse_error = |source| AssetError::ParseGltf {
        path: path.to_string(),
        source,
    };
    let gltf = gltf::Gltf::from_slice_without_validation(bytes).map_err(parse_error)?;
    let root = gltf.document.into_json();
    let requires_draco = root.extensions_required.iter().any(|name| name == DRACO_EXTENSION);

    // The document accessors below unwrap indices, so nothing is walked
    // before the whole root has passed validation.
    let problems = validation_problems(path, &root, requires_draco)?;
    if !problems.is_empty() {
        return Err(parse_error(gltf::Error::Validation(problems)));
    }
    let document = gltf::Document::from_json_without_validation(root);

    let scene = document
        .default_scene()
        .or_else(|| document.scenes().next())
        .ok_or_else(|| AssetError::EmptyScene {
            path: path.to_string(),
        })?;

    let mut tree = ModelTree {
        source_path: path.to_string(),
        nodes: Vec::new(),
        roots: Vec::new(),
        requires_draco,
    };
    let mut visited = vec![false; document.nodes().len()];
    for node in scene.nodes() {
        if let Some(index) = push_node(&mut tree, &mut visited, node, 0) {
            tree.roots.push(index);
        }
    }

    log::debug!(
        "Decoded {}: {} nodes, {} mesh parts, draco={}",
        path,
        tree.nodes.len(),
        tree.mesh_count(),
        requires_draco
    );
    Ok(tree)
}

/// Validation errors that matter for this crate. Draco documents declare an
/// extension the parser does not implement and ship accessors without
/// buffer views; both are the renderer's business.
fn validation_problems(
    path: &str,
    root: &json::Root,
    requires_draco: bool,
) -> Result<Vec<(json::Path, ValidationError)>, AssetError> {
    let problems = std::panic::catch_unwind(AssertUnwindSafe(|| {
        let mut problems = Vec::new();
        root.validate(root, json::Path::new, &mut |at, error| problems.push((at(), error)));
        problems
    }))
    .map_err(|_| AssetError::Malformed {
        path: path.to_string(),
        reason: "glTF validation hit an out-of-range index".to_string(),
    })?;

    Ok(problems
        .into_iter()
        .filter(|(at, error)| !(requires_draco && tolerated_for_draco(at.as_str(), *error)))
        .collect())
}

fn tolerated_for_draco(at: &str, error: ValidationError) -> bool {
    match error {
        ValidationError::Unsupported => at.starts_with("extensionsRequired") && at.contains(DRACO_EXTENSION),
        ValidationError::Missing => at.starts_with("accessors[") && at.ends_with(".bufferView"),
        _ => false,
    }
}

fn push_node(tree: &mut ModelTree, visited: &mut [bool], node: gltf::Node<'_>, depth: usize) -> Option<usize> {
    if depth > MAX_NODE_DEPTH {
        log::warn!("Node hierarchy in {} exceeds depth {}, truncating", tree.source_path, MAX_NODE_DEPTH);
        return None;
    }
    // A node reachable from two parents would be copied once per path.
    match visited.get_mut(node.index()) {
        Some(seen) if !*seen => *seen = true,
        _ => {
            log::warn!("Node {} in {} has more than one parent, skipping", node.index(), tree.source_path);
            return None;
        }
    }

    let (translation, rotation, scale) = node.transform().decomposed();
    let name = node
        .name()
        .or_else(|| node.mesh().and_then(|mesh| mesh.name()))
        .map(str::to_string)
        .unwrap_or_else(|| format!("node_{}", node.index()));

    let index = tree.nodes.len();
    tree.nodes.push(TreeNode {
        name: name.clone(),
        transform: Transform {
            translation: Vec3::from(translation),
            rotation: Quat::from_array(rotation),
            scale: Vec3::from(scale),
        },
        kind: NodeKind::Group,
        children: Vec::new(),
    });

    let mut children = Vec::new();
    if let Some(mesh) = node.mesh() {
        let primitives: Vec<_> = mesh.primitives().collect();
        if let [primitive] = primitives.as_slice() {
            tree.nodes[index].kind = NodeKind::Mesh(mesh_part(mesh.index(), primitive));
        } else {
            // One part per primitive, under the node's group.
            for primitive in &primitives {
                children.push(tree.nodes.len());
                tree.nodes.push(TreeNode {
                    name: format!("{}_{}", name, primitive.index()),
                    transform: Transform::IDENTITY,
                    kind: NodeKind::Mesh(mesh_part(mesh.index(), primitive)),
                    children: Vec::new(),
                });
            }
        }
    }

    for child in node.children() {
        if let Some(child_index) = push_node(tree, visited, child, depth + 1) {
            children.push(child_index);
        }
    }
    tree.nodes[index].children = children;
    Some(index)
}

fn mesh_part(mesh: usize, primitive: &gltf::Primitive<'_>) -> MeshPart {
    let source = primitive.material();
    let pbr = source.pbr_metallic_roughness();
    let mut material = Material::new(source.name().unwrap_or("default"));
    material.base_color = pbr.base_color_factor();
    material.roughness = pbr.roughness_factor();
    material.metalness = pbr.metallic_factor();
    material.emissive = source.emissive_factor();
    material.map = pbr
        .base_color_texture()
        .map(|info| MapRef::Embedded(info.texture().index()));

    MeshPart {
        material,
        source: Some(PrimitiveRef {
            mesh,
            primitive: primitive.index(),
        }),
        cast_shadow: false,
        receive_shadow: false,
    }
}

pub fn decode_texture(path: &str, bytes: &[u8]) -> Result<Texture, AssetError> {
    let image = image::load_from_memory(bytes).map_err(|source| AssetError::DecodeImage {
        path: path.to_string(),
        source,
    })?;
    Ok(Texture {
        path: path.to_string(),
        pixels: image.to_rgba8(),
    })
}
