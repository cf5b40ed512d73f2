//! Recoloring of sofa parts by name.
//!
//! Part targeting relies on naming conventions in the authored models.
//! The precedence below is load-bearing: fixed parts are excluded first,
//! then `accent1` is matched before the broader `accent`. Reordering these
//! checks silently moves existing parts to a different channel.

use crate::assets::Texture;
use crate::materials::{MapRef, MaterialRegistry};
use crate::scene::SceneState;
use std::sync::Arc;

/// Parts whose name contains one of these (any case) are never recolored.
pub const FIXED_PART_KEYWORDS: [&str; 3] = ["handle", "armrest", "wheel"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartTarget {
    Main,
    Accent,
    Accent1,
}

impl PartTarget {
    pub const ALL: [PartTarget; 3] = [PartTarget::Main, PartTarget::Accent, PartTarget::Accent1];

    pub fn as_str(self) -> &'static str {
        match self {
            PartTarget::Main => "main",
            PartTarget::Accent => "accent",
            PartTarget::Accent1 => "accent1",
        }
    }
}

impl std::fmt::Display for PartTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown color target '{0}' (expected main, accent or accent1)")]
pub struct ParseTargetError(pub String);

impl std::str::FromStr for PartTarget {
    type Err = ParseTargetError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "main" => Ok(PartTarget::Main),
            "accent" => Ok(PartTarget::Accent),
            "accent1" => Ok(PartTarget::Accent1),
            other => Err(ParseTargetError(other.to_string())),
        }
    }
}

pub fn is_fixed_part(name: &str) -> bool {
    let lower = name.to_lowercase();
    FIXED_PART_KEYWORDS
        .iter()
        .any(|keyword| lower.contains(keyword))
}

/// Channel a part belongs to, or `None` for fixed parts.
pub fn classify(name: &str) -> Option<PartTarget> {
    if is_fixed_part(name) {
        None
    } else if name.contains("accent1") {
        Some(PartTarget::Accent1)
    } else if name.contains("accent") {
        Some(PartTarget::Accent)
    } else {
        Some(PartTarget::Main)
    }
}

/// Put `texture` on every part of the current sofa that belongs to
/// `target`. Each part gets a fresh clone of its registry baseline with the
/// texture as base-color map. Returns the number of parts changed.
pub fn apply_texture(
    scene: &mut SceneState,
    registry: &MaterialRegistry,
    texture: &Arc<Texture>,
    target: PartTarget,
) -> usize {
    let parts = scene.sofa_parts();
    let graph = scene.graph_mut();
    let mut applied = 0;
    for id in parts {
        let Some(node) = graph.get_mut(id) else {
            continue;
        };
        if classify(&node.name) != Some(target) {
            continue;
        }
        let Some(baseline) = registry.baseline(id) else {
            log::debug!("Part '{}' has no baseline material, skipping", node.name);
            continue;
        };
        let Some(part) = node.mesh_part_mut() else {
            continue;
        };
        let mut material = baseline.clone();
        material.map = Some(MapRef::Loaded(Arc::clone(texture)));
        material.version = part.material.version;
        material.mark_dirty();
        part.material = material;
        applied += 1;
    }
    applied
}
