//! Surface materials on mesh parts and the registry of per-part baselines.
//!
//! Every recolor clones the baseline captured when the part was first seen,
//! never the part's current material. Without that, edits made by one swap
//! (roughness, metalness, maps) would carry into the next.

use crate::assets::Texture;
use crate::scene::NodeId;
use slotmap::SecondaryMap;
use std::sync::Arc;

pub const BASELINE_ROUGHNESS: f32 = 1.0;
pub const BASELINE_METALNESS: f32 = 0.0;

/// Source of a material's base-color map.
#[derive(Debug, Clone)]
pub enum MapRef {
    /// Texture index inside the source glTF document, resolved by the renderer.
    Embedded(usize),
    /// Swatch texture decoded at runtime.
    Loaded(Arc<Texture>),
}

impl PartialEq for MapRef {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (MapRef::Embedded(a), MapRef::Embedded(b)) => a == b,
            (MapRef::Loaded(a), MapRef::Loaded(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    pub base_color: [f32; 4],
    pub roughness: f32,
    pub metalness: f32,
    pub emissive: [f32; 3],
    pub map: Option<MapRef>,
    /// Bumped whenever the renderer must re-upload this material.
    pub version: u32,
}

impl Material {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_color: [1.0, 1.0, 1.0, 1.0],
            roughness: 1.0,
            metalness: 1.0,
            emissive: [0.0, 0.0, 0.0],
            map: None,
            version: 0,
        }
    }

    pub fn mark_dirty(&mut self) {
        self.version = self.version.wrapping_add(1);
    }
}

/// Original-material snapshots for the mesh parts of the installed sofa.
#[derive(Default)]
pub struct MaterialRegistry {
    originals: SecondaryMap<NodeId, Material>,
}

impl MaterialRegistry {
    pub fn new() -> Self {
        Self {
            originals: SecondaryMap::new(),
        }
    }

    /// Capture `current` as the baseline for `part` unless one already
    /// exists. Returns whether a new snapshot was taken.
    pub fn snapshot(&mut self, part: NodeId, current: &Material) -> bool {
        if self.originals.contains_key(part) {
            return false;
        }
        let mut original = current.clone();
        original.roughness = BASELINE_ROUGHNESS;
        original.metalness = BASELINE_METALNESS;
        self.originals.insert(part, original);
        true
    }

    pub fn baseline(&self, part: NodeId) -> Option<&Material> {
        self.originals.get(part)
    }

    pub fn clear(&mut self) {
        self.originals.clear();
    }

    pub fn len(&self) -> usize {
        self.originals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.originals.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{MapRef, Material, MaterialRegistry};
    use crate::scene::{Node, NodeKind, SceneGraph};

    fn part(graph: &mut SceneGraph, name: &str) -> crate::scene::NodeId {
        graph.insert(Node::mesh(name, Material::new("fabric"), None))
    }

    #[test]
    fn snapshot_normalizes_shading() {
        let mut graph = SceneGraph::new();
        let seat = part(&mut graph, "seat");
        let mut glossy = Material::new("glossy");
        glossy.roughness = 0.2;
        glossy.metalness = 0.9;
        glossy.map = Some(MapRef::Embedded(3));

        let mut registry = MaterialRegistry::new();
        assert!(registry.snapshot(seat, &glossy));
        let baseline = registry.baseline(seat).unwrap();
        assert_eq!(baseline.roughness, 1.0);
        assert_eq!(baseline.metalness, 0.0);
        assert_eq!(baseline.map, Some(MapRef::Embedded(3)));
        assert_eq!(baseline.name, "glossy");
    }

    #[test]
    fn snapshot_is_captured_once() {
        let mut graph = SceneGraph::new();
        let seat = part(&mut graph, "seat");
        let mut registry = MaterialRegistry::new();

        let first = Material::new("first");
        let second = Material::new("second");
        assert!(registry.snapshot(seat, &first));
        assert!(!registry.snapshot(seat, &second));
        assert_eq!(registry.baseline(seat).unwrap().name, "first");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn baseline_is_none_before_any_snapshot() {
        let mut graph = SceneGraph::new();
        let seat = part(&mut graph, "seat");
        let registry = MaterialRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.baseline(seat).is_none());
        assert!(matches!(graph.get(seat).unwrap().kind, NodeKind::Mesh(_)));
    }

    #[test]
    fn clear_forgets_every_part() {
        let mut graph = SceneGraph::new();
        let seat = part(&mut graph, "seat");
        let back = part(&mut graph, "back_accent");
        let mut registry = MaterialRegistry::new();
        registry.snapshot(seat, &Material::new("a"));
        registry.snapshot(back, &Material::new("b"));
        registry.clear();
        assert!(registry.baseline(seat).is_none());
        assert!(registry.baseline(back).is_none());
    }

    #[test]
    fn mark_dirty_bumps_version() {
        let mut material = Material::new("fabric");
        material.mark_dirty();
        material.mark_dirty();
        assert_eq!(material.version, 2);
    }
}
