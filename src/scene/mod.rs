pub mod stage;

use crate::catalog::ModelTransform;
use crate::materials::Material;
use glam::{EulerRot, Mat4, Quat, Vec3};
use slotmap::SlotMap;

slotmap::new_key_type! {
    pub struct NodeId;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    /// Build from editor-style position, XYZ euler degrees and scale.
    pub fn from_parts(position: [f32; 3], rotation_deg: [f32; 3], scale: [f32; 3]) -> Self {
        Self {
            translation: Vec3::from(position),
            rotation: Quat::from_euler(
                EulerRot::XYZ,
                rotation_deg[0].to_radians(),
                rotation_deg[1].to_radians(),
                rotation_deg[2].to_radians(),
            ),
            scale: Vec3::from(scale),
        }
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl From<&ModelTransform> for Transform {
    fn from(value: &ModelTransform) -> Self {
        Self::from_parts(value.position, value.rotation_deg, value.scale)
    }
}

/// Mesh/primitive pair in the source document, used by the renderer to
/// fetch geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrimitiveRef {
    pub mesh: usize,
    pub primitive: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeshPart {
    pub material: Material,
    pub source: Option<PrimitiveRef>,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Group,
    Mesh(MeshPart),
}

#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub transform: Transform,
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

impl Node {
    pub fn group(name: impl Into<String>, transform: Transform) -> Self {
        Self {
            name: name.into(),
            transform,
            kind: NodeKind::Group,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn mesh(name: impl Into<String>, material: Material, source: Option<PrimitiveRef>) -> Self {
        Self {
            name: name.into(),
            transform: Transform::IDENTITY,
            kind: NodeKind::Mesh(MeshPart {
                material,
                source,
                cast_shadow: false,
                receive_shadow: false,
            }),
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn mesh_part(&self) -> Option<&MeshPart> {
        match &self.kind {
            NodeKind::Mesh(part) => Some(part),
            NodeKind::Group => None,
        }
    }

    pub fn mesh_part_mut(&mut self) -> Option<&mut MeshPart> {
        match &mut self.kind {
            NodeKind::Mesh(part) => Some(part),
            NodeKind::Group => None,
        }
    }
}

/// Decoded model hierarchy that is not yet part of any scene.
#[derive(Debug, Clone, Default)]
pub struct ModelTree {
    pub source_path: String,
    pub nodes: Vec<TreeNode>,
    pub roots: Vec<usize>,
    /// Geometry is draco-compressed; the renderer needs the external decoder.
    pub requires_draco: bool,
}

#[derive(Debug, Clone)]
pub struct TreeNode {
    pub name: String,
    pub transform: Transform,
    pub kind: NodeKind,
    pub children: Vec<usize>,
}

impl ModelTree {
    pub fn mesh_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|node| matches!(node.kind, NodeKind::Mesh(_)))
            .count()
    }
}

/// The render graph: every node the renderer draws, grouped under roots.
#[derive(Default)]
pub struct SceneGraph {
    nodes: SlotMap<NodeId, Node>,
    roots: Vec<NodeId>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self {
            nodes: SlotMap::with_key(),
            roots: Vec::new(),
        }
    }

    /// Insert a detached node.
    pub fn insert(&mut self, node: Node) -> NodeId {
        self.nodes.insert(node)
    }

    pub fn add_root(&mut self, id: NodeId) {
        if self.nodes.contains_key(id) && !self.roots.contains(&id) {
            self.roots.push(id);
        }
    }

    pub fn add_child(&mut self, parent: NodeId, child: NodeId) {
        if !self.nodes.contains_key(parent) || !self.nodes.contains_key(child) {
            return;
        }
        self.nodes[child].parent = Some(parent);
        self.nodes[parent].children.push(child);
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// `root` and everything below it, depth first.
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get(id) else {
                continue;
            };
            out.push(id);
            stack.extend(node.children.iter().rev().copied());
        }
        out
    }

    pub fn mesh_parts(&self, root: NodeId) -> Vec<NodeId> {
        self.descendants(root)
            .into_iter()
            .filter(|id| matches!(self.nodes[*id].kind, NodeKind::Mesh(_)))
            .collect()
    }

    /// Detach and drop `root` with all of its descendants.
    pub fn remove_subtree(&mut self, root: NodeId) -> usize {
        let ids = self.descendants(root);
        if let Some(parent) = self.nodes.get(root).and_then(|node| node.parent) {
            if let Some(parent) = self.nodes.get_mut(parent) {
                parent.children.retain(|child| *child != root);
            }
        }
        self.roots.retain(|id| *id != root);
        for id in &ids {
            self.nodes.remove(*id);
        }
        ids.len()
    }

    /// Copy a decoded model under a new group node carrying `transform`.
    /// The group is returned detached; call [`SceneGraph::add_root`] to show it.
    pub fn graft(&mut self, tree: &ModelTree, name: &str, transform: Transform) -> NodeId {
        let root = self.insert(Node::group(name, transform));
        for index in &tree.roots {
            self.graft_node(tree, *index, root);
        }
        root
    }

    fn graft_node(&mut self, tree: &ModelTree, index: usize, parent: NodeId) {
        let Some(source) = tree.nodes.get(index) else {
            log::warn!("glTF node index {} out of range in {}", index, tree.source_path);
            return;
        };
        let id = self.insert(Node {
            name: source.name.clone(),
            transform: source.transform,
            kind: source.kind.clone(),
            parent: None,
            children: Vec::new(),
        });
        self.add_child(parent, id);
        for child in &source.children {
            self.graft_node(tree, *child, id);
        }
    }

    pub fn world_matrix(&self, id: NodeId) -> Option<Mat4> {
        let mut node = self.nodes.get(id)?;
        let mut matrix = node.transform.matrix();
        while let Some(parent) = node.parent.and_then(|parent| self.nodes.get(parent)) {
            matrix = parent.transform.matrix() * matrix;
            node = parent;
        }
        Some(matrix)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InstalledSofa {
    pub root: NodeId,
    pub index: usize,
    pub source_path: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InstalledHandle {
    pub root: NodeId,
    pub kind: String,
}

/// Owns the render graph and the single current sofa / handle.
#[derive(Default)]
pub struct SceneState {
    graph: SceneGraph,
    sofa: Option<InstalledSofa>,
    handle: Option<InstalledHandle>,
    generation: u64,
}

impl SceneState {
    pub fn new() -> Self {
        Self {
            graph: SceneGraph::new(),
            sofa: None,
            handle: None,
            generation: 0,
        }
    }

    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut SceneGraph {
        &mut self.graph
    }

    pub fn sofa(&self) -> Option<&InstalledSofa> {
        self.sofa.as_ref()
    }

    pub fn handle(&self) -> Option<&InstalledHandle> {
        self.handle.as_ref()
    }

    /// Incremented on every sofa install; loads aimed at an older value are stale.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Replace the current sofa. The previous sofa and any handle fitted to
    /// it leave the graph before the new one enters it.
    pub fn install_sofa(&mut self, index: usize, tree: &ModelTree, normalization: &ModelTransform) -> NodeId {
        self.clear_handle();
        if let Some(previous) = self.sofa.take() {
            let removed = self.graph.remove_subtree(previous.root);
            log::debug!("Retired sofa {} ({} nodes)", previous.index, removed);
        }

        let name = file_name(&tree.source_path);
        let root = self.graph.graft(tree, name, Transform::from(normalization));
        for id in self.graph.mesh_parts(root) {
            if let Some(part) = self.graph.nodes[id].mesh_part_mut() {
                part.cast_shadow = true;
                part.receive_shadow = true;
            }
        }
        self.graph.add_root(root);
        self.generation += 1;
        self.sofa = Some(InstalledSofa {
            root,
            index,
            source_path: tree.source_path.clone(),
        });
        root
    }

    /// Replace the current handle, placed with `placement`.
    pub fn install_handle(&mut self, kind: &str, tree: &ModelTree, placement: Transform) -> NodeId {
        self.clear_handle();
        let root = self.graph.graft(tree, file_name(&tree.source_path), placement);
        self.graph.add_root(root);
        self.handle = Some(InstalledHandle {
            root,
            kind: kind.to_string(),
        });
        root
    }

    pub fn clear_handle(&mut self) -> bool {
        match self.handle.take() {
            Some(handle) => {
                self.graph.remove_subtree(handle.root);
                true
            }
            None => false,
        }
    }

    /// Mesh parts of the installed sofa, empty when none is installed.
    pub fn sofa_parts(&self) -> Vec<NodeId> {
        self.sofa
            .as_ref()
            .map(|sofa| self.graph.mesh_parts(sofa.root))
            .unwrap_or_default()
    }
}

fn file_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::{ModelTree, NodeKind, SceneState, Transform, TreeNode};
    use crate::catalog::{Catalog, ModelTransform};
    use crate::materials::Material;
    use glam::Vec3;

    /// Two-level tree: a group holding one mesh part per name.
    pub(crate) fn tree(path: &str, part_names: &[&str]) -> ModelTree {
        let mut nodes = vec![TreeNode {
            name: "Scene".to_string(),
            transform: Transform::IDENTITY,
            kind: NodeKind::Group,
            children: (1..=part_names.len()).collect(),
        }];
        for name in part_names {
            let mut material = Material::new(format!("{name}_mat"));
            material.roughness = 0.35;
            material.metalness = 0.6;
            nodes.push(TreeNode {
                name: name.to_string(),
                transform: Transform::IDENTITY,
                kind: NodeKind::Mesh(super::MeshPart {
                    material,
                    source: None,
                    cast_shadow: false,
                    receive_shadow: false,
                }),
                children: Vec::new(),
            });
        }
        ModelTree {
            source_path: path.to_string(),
            nodes,
            roots: vec![0],
            requires_draco: false,
        }
    }

    fn normalization() -> ModelTransform {
        Catalog::builtin().sofa_transform
    }

    #[test]
    fn install_sofa_keeps_single_root() {
        let mut scene = SceneState::new();
        let first = scene.install_sofa(0, &tree("models/sofa1.gltf", &["seat", "back_accent"]), &normalization());
        let second = scene.install_sofa(1, &tree("models/sofa2.gltf", &["seat"]), &normalization());

        assert_eq!(scene.graph().roots(), &[second]);
        assert!(scene.graph().get(first).is_none());
        assert_eq!(scene.sofa().unwrap().index, 1);
        // group root + gltf scene group + one part
        assert_eq!(scene.graph().len(), 3);
        assert_eq!(scene.generation(), 2);
    }

    #[test]
    fn install_sofa_applies_normalization_and_shadows() {
        let mut scene = SceneState::new();
        let root = scene.install_sofa(0, &tree("models/sofa1.gltf", &["seat", "cushion"]), &normalization());
        let node = scene.graph().get(root).unwrap();
        assert_eq!(node.name, "sofa1.gltf");
        assert_eq!(node.transform.scale, Vec3::splat(100.0));
        assert_eq!(node.transform.translation, Vec3::new(0.0, -0.9, 0.0));

        let parts = scene.sofa_parts();
        assert_eq!(parts.len(), 2);
        for id in parts {
            let part = scene.graph().get(id).unwrap().mesh_part().unwrap();
            assert!(part.cast_shadow);
            assert!(part.receive_shadow);
        }
    }

    #[test]
    fn install_handle_replaces_previous() {
        let mut scene = SceneState::new();
        scene.install_sofa(0, &tree("models/sofa1.gltf", &["seat"]), &normalization());
        let golden = scene.install_handle("Golden", &tree("models/golden-handle.gltf", &["handle"]), Transform::IDENTITY);
        let silver = scene.install_handle("Silver", &tree("models/silver-handle.gltf", &["handle"]), Transform::IDENTITY);

        assert!(scene.graph().get(golden).is_none());
        assert!(scene.graph().get(silver).is_some());
        assert_eq!(scene.graph().roots().len(), 2);
        assert_eq!(scene.handle().unwrap().kind, "Silver");
    }

    #[test]
    fn new_sofa_drops_handle() {
        let mut scene = SceneState::new();
        scene.install_sofa(0, &tree("models/sofa1.gltf", &["seat"]), &normalization());
        let handle = scene.install_handle("Golden", &tree("models/golden-handle.gltf", &["handle"]), Transform::IDENTITY);
        scene.install_sofa(1, &tree("models/sofa2.gltf", &["seat"]), &normalization());

        assert!(scene.handle().is_none());
        assert!(scene.graph().get(handle).is_none());
        assert_eq!(scene.graph().roots().len(), 1);
    }

    #[test]
    fn empty_scene_has_no_parts() {
        let mut scene = SceneState::new();
        assert!(scene.graph().is_empty());
        assert!(scene.graph().roots().is_empty());
        assert!(scene.sofa_parts().is_empty());
        assert!(!scene.clear_handle());
    }

    #[test]
    fn world_matrix_composes_parents() {
        let mut scene = SceneState::new();
        scene.install_sofa(0, &tree("models/sofa1.gltf", &["seat"]), &normalization());
        let part = scene.sofa_parts()[0];
        let world = scene.graph().world_matrix(part).unwrap();
        let origin = world.transform_point3(Vec3::ZERO);
        assert!((origin - Vec3::new(0.0, -0.9, 0.0)).length() < 1e-5);
        let unit = world.transform_vector3(Vec3::X);
        assert!((unit.length() - 100.0).abs() < 1e-3);
    }

    #[test]
    fn from_parts_rotates_about_x() {
        let transform = Transform::from_parts([0.0, -0.17, 2.18], [-10.3, 0.0, 0.0], [1.0, 1.0, 1.0]);
        let (axis, angle) = transform.rotation.to_axis_angle();
        assert!((angle - 10.3f32.to_radians()).abs() < 1e-4);
        assert!((axis.x.abs() - 1.0).abs() < 1e-4);
    }
}
