//! Static product catalog: sofa models, handle models and their placement
//! table, texture swatch groups, and per-kind load policies.
//!
//! The built-in catalog mirrors the shipped asset tree. A JSON file with the
//! same shape can replace it at startup (see [`serialization`]).

pub mod serialization;

use crate::scene::stage::Stage;
use std::collections::HashSet;

/// Inconsistencies that make a catalog unusable.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CatalogError {
    #[error("catalog lists no sofas")]
    NoSofas,
    #[error("handle type '{0}' is listed twice")]
    DuplicateHandle(String),
    #[error("swatch group '{0}' is listed twice")]
    DuplicateGroup(String),
    #[error("placement for handle '{handle}' on sofa {sofa_index} has no matching sofa or handle")]
    DanglingPlacement { sofa_index: usize, handle: String },
    #[error("handle scale must be positive, got {0}")]
    InvalidHandleScale(f32),
}

/// One selectable sofa model.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SofaModel {
    pub name: String,
    pub path: String,
}

/// One attachable handle model.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct HandleModel {
    pub kind: String,
    pub path: String,
}

/// Where a handle sits on a given sofa.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct HandlePlacement {
    pub sofa_index: usize,
    pub handle: String,
    pub position: [f32; 3],
    pub rotation_deg: [f32; 3],
}

/// Position / rotation / scale applied to an installed object root.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ModelTransform {
    pub position: [f32; 3],
    pub rotation_deg: [f32; 3],
    pub scale: [f32; 3],
}

/// Which coloring channel a swatch group feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwatchChannel {
    /// Always applied to main surfaces.
    Main,
    /// Applied to whichever accent target is currently selected.
    Accent,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SwatchGroup {
    pub id: String,
    pub channel: SwatchChannel,
    pub textures: Vec<String>,
}

/// How a single kind of load is presented while in flight.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LoadPolicy {
    /// Byte count assumed when the source does not report a total size.
    pub assumed_size: u64,
    /// Advance a simulated percentage until real progress arrives.
    pub simulated_ramp: bool,
    /// Give up on the indicator after this many milliseconds.
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LoadPolicies {
    pub model: LoadPolicy,
    pub handle: LoadPolicy,
    pub texture: LoadPolicy,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Catalog {
    pub sofas: Vec<SofaModel>,
    pub handles: Vec<HandleModel>,
    pub placements: Vec<HandlePlacement>,
    pub swatch_groups: Vec<SwatchGroup>,
    pub sofa_transform: ModelTransform,
    pub handle_scale: f32,
    pub loading: LoadPolicies,
    /// Location of the external mesh decoder for compressed geometry.
    pub decoder_path: String,
    #[serde(default = "Stage::studio")]
    pub stage: Stage,
}

impl Catalog {
    pub fn sofa(&self, index: usize) -> Option<&SofaModel> {
        self.sofas.get(index)
    }

    pub fn handle(&self, kind: &str) -> Option<&HandleModel> {
        self.handles.iter().find(|handle| handle.kind == kind)
    }

    pub fn placement(&self, sofa_index: usize, handle: &str) -> Option<&HandlePlacement> {
        self.placements
            .iter()
            .find(|entry| entry.sofa_index == sofa_index && entry.handle == handle)
    }

    /// Placement entries that point at a sofa or handle the catalog lacks.
    pub fn dangling_placements(&self) -> Vec<&HandlePlacement> {
        self.placements
            .iter()
            .filter(|entry| self.sofa(entry.sofa_index).is_none() || self.handle(&entry.handle).is_none())
            .collect()
    }

    /// Reject catalogs the configurator cannot drive: no sofas, repeated
    /// handle types or group ids, placements pointing nowhere, or a handle
    /// scale that would collapse or mirror the model.
    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.sofas.is_empty() {
            return Err(CatalogError::NoSofas);
        }
        let mut kinds = HashSet::new();
        if let Some(handle) = self.handles.iter().find(|handle| !kinds.insert(handle.kind.as_str())) {
            return Err(CatalogError::DuplicateHandle(handle.kind.clone()));
        }
        let mut ids = HashSet::new();
        if let Some(group) = self.swatch_groups.iter().find(|group| !ids.insert(group.id.as_str())) {
            return Err(CatalogError::DuplicateGroup(group.id.clone()));
        }
        if let Some(entry) = self.dangling_placements().first() {
            return Err(CatalogError::DanglingPlacement {
                sofa_index: entry.sofa_index,
                handle: entry.handle.clone(),
            });
        }
        if self.handle_scale.is_nan() || self.handle_scale <= 0.0 {
            return Err(CatalogError::InvalidHandleScale(self.handle_scale));
        }
        Ok(())
    }

    pub fn builtin() -> Self {
        let sofas = (1..=5)
            .map(|n| SofaModel {
                name: format!("Sofa {n}"),
                path: format!("models/sofa{n}.gltf"),
            })
            .collect();

        let handles = vec![
            HandleModel {
                kind: "Golden".to_string(),
                path: "models/golden-handle.gltf".to_string(),
            },
            HandleModel {
                kind: "Silver".to_string(),
                path: "models/silver-handle.gltf".to_string(),
            },
        ];

        // Per sofa: (y, z, pitch in degrees). Both handle finishes share a seat.
        let seats: [(f32, f32, f32); 5] = [
            (-0.17, 2.18, -10.3),
            (-0.5, 1.9, -8.0),
            (-1.68, 1.7, -8.0),
            (-0.5, 1.9, -8.0),
            (-0.17, 2.18, -10.3),
        ];
        let mut placements = Vec::new();
        for (sofa_index, (y, z, pitch)) in seats.iter().copied().enumerate() {
            for handle in ["Golden", "Silver"] {
                placements.push(HandlePlacement {
                    sofa_index,
                    handle: handle.to_string(),
                    position: [0.0, y, z],
                    rotation_deg: [pitch, 0.0, 0.0],
                });
            }
        }

        let swatch_groups = vec![
            group("main-colors-248", SwatchChannel::Main, numbered("248-", 1..=13)),
            group(
                "main-colors-s600",
                SwatchChannel::Main,
                ["01", "02", "03", "04", "05", "06", "07", "08", "16"]
                    .iter()
                    .map(|n| format!("S600-{n}"))
                    .collect(),
            ),
            group(
                "main-colors-w00",
                SwatchChannel::Main,
                ["001", "002", "003", "004", "007", "010", "011", "012", "013", "014"]
                    .iter()
                    .map(|n| format!("W{n}"))
                    .collect(),
            ),
            group("accent-colors-p248", SwatchChannel::Accent, {
                let mut stems = numbered("P248-", 1..=13);
                stems.push("547-79".to_string());
                stems.push("547-26".to_string());
                stems.extend(numbered("P248-", 23..=24));
                stems.extend(numbered("P248-", 26..=31));
                stems
            }),
            group(
                "accent-colors-ps600",
                SwatchChannel::Accent,
                [
                    "01", "02", "03", "04", "05", "06", "07", "08", "16", "19", "10", "11", "14", "17",
                    "18",
                ]
                .iter()
                .map(|n| format!("PS600-{n}"))
                .collect(),
            ),
            group(
                "accent-colors-pw00",
                SwatchChannel::Accent,
                ["001", "004", "010", "011", "012", "008", "009"]
                    .iter()
                    .map(|n| format!("PW{n}"))
                    .collect(),
            ),
            group(
                "accent-colors-napa",
                SwatchChannel::Accent,
                ["24", "41", "44", "45", "46", "47", "49", "50", "51", "52"]
                    .iter()
                    .map(|n| n.to_string())
                    .collect(),
            ),
        ];

        Self {
            sofas,
            handles,
            placements,
            swatch_groups,
            sofa_transform: ModelTransform {
                position: [0.0, -0.9, 0.0],
                rotation_deg: [0.0, 0.0, 0.0],
                scale: [100.0, 100.0, 100.0],
            },
            handle_scale: 103.5,
            loading: LoadPolicies {
                model: LoadPolicy {
                    assumed_size: 3_000_000,
                    simulated_ramp: true,
                    timeout_ms: Some(10_000),
                },
                handle: LoadPolicy {
                    assumed_size: 3_000_000,
                    simulated_ramp: false,
                    timeout_ms: None,
                },
                texture: LoadPolicy {
                    assumed_size: 500_000,
                    simulated_ramp: false,
                    timeout_ms: None,
                },
            },
            decoder_path: "https://cdn.jsdelivr.net/npm/three@0.132.2/examples/js/libs/draco/gltf/"
                .to_string(),
            stage: Stage::studio(),
        }
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

fn group(id: &str, channel: SwatchChannel, stems: Vec<String>) -> SwatchGroup {
    SwatchGroup {
        id: id.to_string(),
        channel,
        textures: stems
            .into_iter()
            .map(|stem| format!("textures/{stem}.webp"))
            .collect(),
    }
}

fn numbered(prefix: &str, range: std::ops::RangeInclusive<u32>) -> Vec<String> {
    range.map(|n| format!("{prefix}{n:02}")).collect()
}

#[cfg(test)]
mod tests {
    use super::{Catalog, CatalogError, HandlePlacement, SwatchChannel, SwatchGroup};

    fn find_group<'a>(catalog: &'a Catalog, id: &str) -> Option<&'a SwatchGroup> {
        catalog.swatch_groups.iter().find(|group| group.id == id)
    }

    #[test]
    fn builtin_has_placement_for_every_sofa_and_handle() {
        let catalog = Catalog::builtin();
        for index in 0..catalog.sofas.len() {
            for handle in &catalog.handles {
                assert!(
                    catalog.placement(index, &handle.kind).is_some(),
                    "missing placement for sofa {index} / {}",
                    handle.kind
                );
            }
        }
        assert!(catalog.dangling_placements().is_empty());
        assert_eq!(catalog.validate(), Ok(()));
    }

    #[test]
    fn validate_rejects_inconsistent_catalogs() {
        let mut catalog = Catalog::builtin();
        catalog.placements.push(HandlePlacement {
            sofa_index: 9,
            handle: "Golden".to_string(),
            position: [0.0; 3],
            rotation_deg: [0.0; 3],
        });
        assert_eq!(
            catalog.validate(),
            Err(CatalogError::DanglingPlacement {
                sofa_index: 9,
                handle: "Golden".to_string()
            })
        );

        let mut catalog = Catalog::builtin();
        let repeated = catalog.handles[1].clone();
        catalog.handles.push(repeated);
        assert_eq!(catalog.validate(), Err(CatalogError::DuplicateHandle("Silver".to_string())));

        let mut catalog = Catalog::builtin();
        let repeated = catalog.swatch_groups[0].clone();
        catalog.swatch_groups.push(repeated);
        assert_eq!(
            catalog.validate(),
            Err(CatalogError::DuplicateGroup("main-colors-248".to_string()))
        );

        let mut catalog = Catalog::builtin();
        catalog.handle_scale = 0.0;
        assert_eq!(catalog.validate(), Err(CatalogError::InvalidHandleScale(0.0)));

        let mut catalog = Catalog::builtin();
        catalog.sofas.clear();
        catalog.placements.clear();
        assert_eq!(catalog.validate(), Err(CatalogError::NoSofas));
    }

    #[test]
    fn builtin_third_sofa_golden_seat() {
        let catalog = Catalog::builtin();
        let placement = catalog.placement(2, "Golden").unwrap();
        assert_eq!(placement.position, [0.0, -1.68, 1.7]);
        assert_eq!(placement.rotation_deg, [-8.0, 0.0, 0.0]);
    }

    #[test]
    fn builtin_swatch_paths() {
        let catalog = Catalog::builtin();
        let main = find_group(&catalog, "main-colors-248").unwrap();
        assert_eq!(main.channel, SwatchChannel::Main);
        assert_eq!(main.textures.len(), 13);
        assert_eq!(main.textures[0], "textures/248-01.webp");
        assert_eq!(main.textures[12], "textures/248-13.webp");

        let accent = find_group(&catalog, "accent-colors-p248").unwrap();
        assert_eq!(accent.channel, SwatchChannel::Accent);
        assert_eq!(accent.textures.len(), 23);
        assert!(accent.textures.contains(&"textures/547-79.webp".to_string()));
        assert_eq!(accent.textures.last().unwrap(), "textures/P248-31.webp");

        let napa = find_group(&catalog, "accent-colors-napa").unwrap();
        assert_eq!(napa.textures[0], "textures/24.webp");
    }

    #[test]
    fn unknown_lookups_return_none() {
        let catalog = Catalog::builtin();
        assert!(catalog.sofa(5).is_none());
        assert!(catalog.handle("Bronze").is_none());
        assert!(catalog.placement(0, "Bronze").is_none());
        assert!(find_group(&catalog, "main-colors-999").is_none());
    }
}
