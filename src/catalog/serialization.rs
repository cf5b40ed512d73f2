//! Catalog files. A file replaces the built-in catalog wholesale, so it is
//! checked with [`Catalog::validate`] before anything sees it.

use super::{Catalog, CatalogError};
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum SerializationError {
    #[error("cannot access catalog file: {0}")]
    Io(#[from] std::io::Error),
    #[error("catalog is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("catalog is inconsistent: {0}")]
    Invalid(#[from] CatalogError),
}

pub type Result<T> = std::result::Result<T, SerializationError>;

/// Parse and validate catalog JSON. Omitted `stage` falls back to the studio
/// setup.
pub fn parse_catalog(json: &str) -> Result<Catalog> {
    let catalog: Catalog = serde_json::from_str(json)?;
    catalog.validate()?;
    Ok(catalog)
}

pub fn load_catalog_from_file(path: &Path) -> Result<Catalog> {
    let json = std::fs::read_to_string(path)?;
    let catalog = parse_catalog(&json)?;
    log::debug!(
        "Catalog {:?}: {} sofas, {} placements, {} swatch groups",
        path,
        catalog.sofas.len(),
        catalog.placements.len(),
        catalog.swatch_groups.len()
    );
    Ok(catalog)
}

/// Write `catalog` as pretty JSON, the same shape [`load_catalog_from_file`]
/// reads back.
pub fn save_catalog_to_file(catalog: &Catalog, path: &Path) -> Result<()> {
    std::fs::write(path, serde_json::to_string_pretty(catalog)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{load_catalog_from_file, parse_catalog, save_catalog_to_file, SerializationError};
    use crate::catalog::{Catalog, CatalogError, SwatchChannel};
    use crate::scene::stage::Stage;

    fn temp_path(tag: &str) -> std::path::PathBuf {
        let mut path = std::env::temp_dir();
        let nonce = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        path.push(format!("sofa_catalog_{tag}_{}_{}.json", std::process::id(), nonce));
        path
    }

    #[test]
    fn exported_catalog_loads_back() {
        let mut catalog = Catalog::builtin();
        catalog.sofas.truncate(2);
        catalog.placements.retain(|entry| entry.sofa_index < 2);
        let path = temp_path("export");

        save_catalog_to_file(&catalog, &path).unwrap();
        let loaded = load_catalog_from_file(&path).unwrap();
        assert_eq!(loaded, catalog);
        assert!(loaded.placement(1, "Silver").is_some());

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn missing_stage_uses_studio() {
        let mut value = serde_json::to_value(Catalog::builtin()).unwrap();
        value.as_object_mut().unwrap().remove("stage");
        let loaded = parse_catalog(&value.to_string()).unwrap();
        assert_eq!(loaded.stage, Stage::studio());
    }

    #[test]
    fn channel_names_are_lowercase() {
        let json = serde_json::to_string(&SwatchChannel::Accent).unwrap();
        assert_eq!(json, "\"accent\"");
    }

    #[test]
    fn placement_for_removed_sofa_is_rejected() {
        let mut catalog = Catalog::builtin();
        catalog.sofas.truncate(2);
        let json = serde_json::to_string(&catalog).unwrap();
        match parse_catalog(&json) {
            Err(SerializationError::Invalid(CatalogError::DanglingPlacement { sofa_index, .. })) => {
                assert_eq!(sofa_index, 2)
            }
            other => panic!("Expected dangling placement, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn unknown_handle_in_placement_is_rejected_from_file() {
        let mut catalog = Catalog::builtin();
        catalog.handles.retain(|handle| handle.kind != "Silver");
        let path = temp_path("dangling");
        save_catalog_to_file(&catalog, &path).unwrap();

        match load_catalog_from_file(&path) {
            Err(SerializationError::Invalid(CatalogError::DanglingPlacement { handle, .. })) => {
                assert_eq!(handle, "Silver")
            }
            other => panic!("Expected dangling placement, got {:?}", other.map(|_| ())),
        }
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn missing_file_is_io_error() {
        match load_catalog_from_file(&temp_path("missing")) {
            Err(SerializationError::Io(_)) => {}
            other => panic!("Expected Io error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn wrong_shape_is_json_error() {
        match parse_catalog("{ \"sofas\": 3 }") {
            Err(SerializationError::Json(_)) => {}
            other => panic!("Expected Json error, got {:?}", other.map(|_| ())),
        }
    }
}
