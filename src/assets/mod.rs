//! Asset loading: request/response types shared by the fetcher and the
//! configurator, plus progress arithmetic.
//!
//! A load is started with [`AssetFetcher::fetch`] and reports back through
//! [`LoadEvent`]s: zero or more `Progress` events followed by exactly one
//! `Finished`.

pub mod decode;
pub mod fetch;

use crate::scene::ModelTree;
use std::sync::Arc;

/// Upper bound for percentages derived from an assumed size.
pub const ESTIMATE_CAP_PERCENT: u8 = 95;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub u64);

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadKind {
    Model,
    Handle,
    Texture,
}

impl std::fmt::Display for LoadKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            LoadKind::Model => "model",
            LoadKind::Handle => "handle",
            LoadKind::Texture => "texture",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    pub path: String,
    pub kind: LoadKind,
}

/// Decoded swatch image, RGBA8 with sRGB-encoded color.
#[derive(Debug, Clone)]
pub struct Texture {
    pub path: String,
    pub pixels: image::RgbaImage,
}

impl Texture {
    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    /// Display label: file name without directory or extension.
    pub fn label(&self) -> &str {
        texture_label(&self.path)
    }
}

pub fn texture_label(path: &str) -> &str {
    let file = path.rsplit(['/', '\\']).next().unwrap_or(path);
    file.split('.').next().unwrap_or(file)
}

#[derive(Debug)]
pub enum LoadedAsset {
    Model(ModelTree),
    Texture(Arc<Texture>),
}

#[derive(Debug)]
pub enum LoadEvent {
    Progress {
        task: TaskId,
        loaded: u64,
        total: Option<u64>,
    },
    Finished {
        task: TaskId,
        result: Result<LoadedAsset, AssetError>,
    },
}

impl LoadEvent {
    pub fn task(&self) -> TaskId {
        match self {
            LoadEvent::Progress { task, .. } | LoadEvent::Finished { task, .. } => *task,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("failed to read asset at {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse glTF {path}: {source}")]
    ParseGltf {
        path: String,
        #[source]
        source: gltf::Error,
    },
    #[error("glTF has no scene to show: {path}")]
    EmptyScene { path: String },
    #[error("failed to decode image {path}: {source}")]
    DecodeImage {
        path: String,
        #[source]
        source: image::ImageError,
    },
    #[error("malformed asset {path}: {reason}")]
    Malformed { path: String, reason: String },
    #[error("expected a {expected} asset from {path}")]
    UnexpectedAsset { path: String, expected: LoadKind },
}

/// Starts asynchronous loads. Results come back as [`LoadEvent`]s on
/// whatever channel the implementation was built with.
pub trait AssetFetcher {
    fn fetch(&mut self, task: TaskId, request: LoadRequest);
}

/// Percent complete for `loaded` bytes. Without a reported total the
/// estimate uses `assumed_size` and stays below
/// [`ESTIMATE_CAP_PERCENT`], so only the terminal event can show 100%.
pub fn progress_percent(loaded: u64, total: Option<u64>, assumed_size: u64) -> u8 {
    match total {
        Some(total) if total > 0 => (loaded.saturating_mul(100) / total).min(100) as u8,
        _ => {
            let assumed = assumed_size.max(1);
            (loaded.saturating_mul(100) / assumed).min(ESTIMATE_CAP_PERCENT as u64) as u8
        }
    }
}
