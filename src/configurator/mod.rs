//! Application context. Owns the catalog, the scene, the material registry,
//! the loading indicator and the UI state, and is the only place where user
//! requests and load completions mutate them.
//!
//! Loads overlap freely. Each one remembers what it was for; when it
//! completes it is applied only if it is still the latest request for its
//! slot and, for handles and textures, if the sofa it was aimed at is still
//! installed (matched by scene generation).

use crate::assets::{progress_percent, AssetError, AssetFetcher, LoadEvent, LoadKind, LoadRequest, LoadedAsset, TaskId};
use crate::catalog::{Catalog, LoadPolicy, SwatchChannel};
use crate::materials::MaterialRegistry;
use crate::progress::{IndicatorView, LoadingIndicator, Outcome};
use crate::scene::{SceneState, Transform};
use crate::texture::{apply_texture, PartTarget};
use crate::ui::UiState;
use std::collections::HashMap;
use std::time::Instant;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("no sofa at index {index} (catalog has {count})")]
    InvalidSofaIndex { index: usize, count: usize },
    #[error("unknown handle type '{0}'")]
    UnknownHandle(String),
    #[error("no placement for handle '{handle}' on sofa {sofa_index}")]
    MissingPlacement { sofa_index: usize, handle: String },
    #[error("unknown swatch group '{0}'")]
    UnknownGroup(String),
    #[error("swatch group '{group}' has no swatch {index}")]
    InvalidSwatch { group: String, index: usize },
    #[error("no sofa is loaded yet")]
    NoSofaLoaded,
    #[error("'{0}' is not an accent target")]
    InvalidAccentTarget(PartTarget),
}

/// What the user currently has selected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionState {
    pub sofa_index: Option<usize>,
    pub handle: Option<String>,
    pub accent_target: PartTarget,
}

/// Result of feeding one load event to the configurator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Progress or an event nobody is waiting for.
    Pending,
    SofaInstalled { index: usize, parts: usize },
    HandleInstalled { kind: String },
    TextureApplied { target: PartTarget, path: String, parts: usize },
    /// Completed, but a newer request or a sofa switch made it irrelevant.
    Discarded { path: String },
    Failed { path: String, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Slot {
    Sofa,
    Handle,
    Texture(PartTarget),
}

#[derive(Debug, Clone)]
enum Purpose {
    Sofa { index: usize },
    Handle { kind: String, generation: u64 },
    Texture {
        target: PartTarget,
        generation: u64,
        /// Swatch the user clicked, as (group id, index).
        swatch: Option<(String, usize)>,
    },
}

impl Purpose {
    fn slot(&self) -> Slot {
        match self {
            Purpose::Sofa { .. } => Slot::Sofa,
            Purpose::Handle { .. } => Slot::Handle,
            Purpose::Texture { target, .. } => Slot::Texture(*target),
        }
    }
}

#[derive(Debug, Clone)]
struct PendingLoad {
    request: LoadRequest,
    purpose: Purpose,
    policy: LoadPolicy,
    timed_out: bool,
}

pub struct Configurator {
    catalog: Catalog,
    scene: SceneState,
    registry: MaterialRegistry,
    ui: UiState,
    indicator: LoadingIndicator,
    fetcher: Box<dyn AssetFetcher>,
    pending: HashMap<TaskId, PendingLoad>,
    latest: HashMap<Slot, TaskId>,
    next_task: u64,
}

impl Configurator {
    pub fn new(catalog: Catalog, fetcher: Box<dyn AssetFetcher>) -> Self {
        for entry in catalog.dangling_placements() {
            log::warn!(
                "Placement for handle '{}' on sofa {} has no matching catalog entry",
                entry.handle,
                entry.sofa_index
            );
        }
        let ui = UiState::new(&catalog);
        Self {
            catalog,
            scene: SceneState::new(),
            registry: MaterialRegistry::new(),
            ui,
            indicator: LoadingIndicator::new(),
            fetcher,
            pending: HashMap::new(),
            latest: HashMap::new(),
            next_task: 1,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn scene(&self) -> &SceneState {
        &self.scene
    }

    pub fn registry(&self) -> &MaterialRegistry {
        &self.registry
    }

    pub fn ui(&self) -> &UiState {
        &self.ui
    }

    pub fn indicator(&self) -> &IndicatorView {
        self.indicator.view()
    }

    /// No load owns the indicator and nothing is settling.
    pub fn is_idle(&self) -> bool {
        self.indicator.is_idle()
    }

    pub fn in_flight(&self) -> usize {
        self.pending.len()
    }

    pub fn selection(&self) -> SelectionState {
        SelectionState {
            sofa_index: self.scene.sofa().map(|sofa| sofa.index),
            handle: self.scene.handle().map(|handle| handle.kind.clone()),
            accent_target: self.ui.accent_target(),
        }
    }

    /// Start loading sofa `index`. The current sofa stays until the new one
    /// arrives.
    pub fn select_sofa(&mut self, index: usize, now: Instant) -> Result<TaskId, SelectionError> {
        let sofa = self.catalog.sofa(index).ok_or(SelectionError::InvalidSofaIndex {
            index,
            count: self.catalog.sofas.len(),
        })?;
        let request = LoadRequest {
            path: sofa.path.clone(),
            kind: LoadKind::Model,
        };
        let name = sofa.name.clone();
        self.ui.set_sofa_name(&name);
        log::info!("Loading {} from {}", name, request.path);
        let policy = self.catalog.loading.model;
        Ok(self.start_load(request, Purpose::Sofa { index }, policy, now))
    }

    /// Swap the handle on the installed sofa. The current handle goes away
    /// right away; the new one appears when its model arrives.
    pub fn select_handle(&mut self, kind: &str, now: Instant) -> Result<TaskId, SelectionError> {
        let sofa_index = self.scene.sofa().map(|sofa| sofa.index).ok_or(SelectionError::NoSofaLoaded)?;
        let handle = self
            .catalog
            .handle(kind)
            .ok_or_else(|| SelectionError::UnknownHandle(kind.to_string()))?;
        if self.catalog.placement(sofa_index, kind).is_none() {
            return Err(SelectionError::MissingPlacement {
                sofa_index,
                handle: kind.to_string(),
            });
        }
        let request = LoadRequest {
            path: handle.path.clone(),
            kind: LoadKind::Handle,
        };

        if self.scene.clear_handle() {
            log::debug!("Removed previous handle");
        }
        self.ui.set_selected_handle(None);
        log::info!("Loading {} handle from {}", kind, request.path);
        let purpose = Purpose::Handle {
            kind: kind.to_string(),
            generation: self.scene.generation(),
        };
        let policy = self.catalog.loading.handle;
        Ok(self.start_load(request, purpose, policy, now))
    }

    pub fn select_accent(&mut self, target: PartTarget) -> Result<(), SelectionError> {
        if target == PartTarget::Main {
            return Err(SelectionError::InvalidAccentTarget(target));
        }
        self.ui.set_accent_target(target);
        Ok(())
    }

    /// Apply swatch `index` of `group`. Main groups color main parts,
    /// accent groups color the selected accent target.
    pub fn select_swatch(&mut self, group: &str, index: usize, now: Instant) -> Result<TaskId, SelectionError> {
        let (view, swatch) = self.ui.swatch(group, index).ok_or_else(|| {
            if self.ui.group(group).is_some() {
                SelectionError::InvalidSwatch {
                    group: group.to_string(),
                    index,
                }
            } else {
                SelectionError::UnknownGroup(group.to_string())
            }
        })?;
        let target = match view.channel {
            SwatchChannel::Main => PartTarget::Main,
            SwatchChannel::Accent => self.ui.accent_target(),
        };
        let path = swatch.path.clone();
        self.load_texture(&path, target, Some((group.to_string(), index)), now)
    }

    pub fn apply_texture(&mut self, path: &str, target: PartTarget, now: Instant) -> Result<TaskId, SelectionError> {
        self.load_texture(path, target, None, now)
    }

    fn load_texture(
        &mut self,
        path: &str,
        target: PartTarget,
        swatch: Option<(String, usize)>,
        now: Instant,
    ) -> Result<TaskId, SelectionError> {
        if self.scene.sofa().is_none() {
            return Err(SelectionError::NoSofaLoaded);
        }
        let request = LoadRequest {
            path: path.to_string(),
            kind: LoadKind::Texture,
        };
        log::info!("Loading {} texture {}", target, path);
        let purpose = Purpose::Texture {
            target,
            generation: self.scene.generation(),
            swatch,
        };
        let policy = self.catalog.loading.texture;
        Ok(self.start_load(request, purpose, policy, now))
    }

    pub fn toggle_group(&mut self, group: &str) -> Result<bool, SelectionError> {
        self.ui
            .toggle_group(group)
            .ok_or_else(|| SelectionError::UnknownGroup(group.to_string()))
    }

    pub fn handle_load_event(&mut self, event: LoadEvent, now: Instant) -> LoadOutcome {
        match event {
            LoadEvent::Progress { task, loaded, total } => {
                if let Some(pending) = self.pending.get(&task) {
                    let percent = progress_percent(loaded, total, pending.policy.assumed_size);
                    self.indicator.on_progress(task, percent, now);
                }
                LoadOutcome::Pending
            }
            LoadEvent::Finished { task, result } => {
                let Some(pending) = self.pending.remove(&task) else {
                    log::debug!("Ignoring completion for unknown load {}", task);
                    return LoadOutcome::Pending;
                };
                let outcome = if result.is_ok() { Outcome::Success } else { Outcome::Failure };
                let owned = self.indicator.finish(task, outcome, now);
                if pending.timed_out {
                    log::info!("{} finished after its indicator timed out", pending.request.path);
                } else if !owned {
                    log::debug!("{} finished without owning the indicator", pending.request.path);
                }

                let stale = self.is_stale(task, &pending.purpose);
                self.forget(task, pending.purpose.slot());

                let asset = match result {
                    Ok(asset) => asset,
                    Err(err) => {
                        log::warn!("Failed to load {}: {}", pending.request.path, err);
                        return LoadOutcome::Failed {
                            path: pending.request.path,
                            reason: err.to_string(),
                        };
                    }
                };
                if stale {
                    log::warn!("Discarding stale {} load of {}", pending.request.kind, pending.request.path);
                    return LoadOutcome::Discarded {
                        path: pending.request.path,
                    };
                }
                self.install(pending, asset)
            }
        }
    }

    /// Advance indicator timers.
    pub fn tick(&mut self, now: Instant) {
        if let Some(task) = self.indicator.poll(now) {
            if let Some(pending) = self.pending.get_mut(&task) {
                pending.timed_out = true;
                log::warn!(
                    "Loading {} timed out; it keeps running in the background",
                    pending.request.path
                );
            }
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.indicator.next_deadline()
    }

    pub fn summary(&self) -> String {
        self.ui.summary(&self.scene)
    }

    fn start_load(&mut self, request: LoadRequest, purpose: Purpose, policy: LoadPolicy, now: Instant) -> TaskId {
        let task = TaskId(self.next_task);
        self.next_task += 1;
        self.latest.insert(purpose.slot(), task);
        self.pending.insert(
            task,
            PendingLoad {
                request: request.clone(),
                purpose,
                policy,
                timed_out: false,
            },
        );
        self.indicator.begin(task, &policy, now);
        self.fetcher.fetch(task, request);
        task
    }

    fn is_stale(&self, task: TaskId, purpose: &Purpose) -> bool {
        if self.latest.get(&purpose.slot()) != Some(&task) {
            return true;
        }
        match purpose {
            Purpose::Sofa { .. } => false,
            Purpose::Handle { generation, .. } | Purpose::Texture { generation, .. } => {
                *generation != self.scene.generation() || self.scene.sofa().is_none()
            }
        }
    }

    fn forget(&mut self, task: TaskId, slot: Slot) {
        if self.latest.get(&slot) == Some(&task) {
            self.latest.remove(&slot);
        }
    }

    fn install(&mut self, pending: PendingLoad, asset: LoadedAsset) -> LoadOutcome {
        let path = pending.request.path;
        match (pending.purpose, asset) {
            (Purpose::Sofa { index }, LoadedAsset::Model(tree)) => {
                if tree.requires_draco {
                    log::debug!("{} uses compressed geometry; decoder at {}", path, self.catalog.decoder_path);
                }
                self.registry.clear();
                self.scene.install_sofa(index, &tree, &self.catalog.sofa_transform);
                let parts = self.scene.sofa_parts();
                for id in &parts {
                    if let Some(part) = self.scene.graph().get(*id).and_then(|node| node.mesh_part()) {
                        self.registry.snapshot(*id, &part.material);
                    }
                }
                self.ui.reset_color_selection();
                self.ui.set_selected_handle(None);
                log::info!("Installed sofa {} ({} parts)", index, parts.len());
                LoadOutcome::SofaInstalled {
                    index,
                    parts: parts.len(),
                }
            }
            (Purpose::Handle { kind, .. }, LoadedAsset::Model(tree)) => {
                let Some(sofa_index) = self.scene.sofa().map(|sofa| sofa.index) else {
                    return LoadOutcome::Discarded { path };
                };
                let Some(placement) = self.catalog.placement(sofa_index, &kind) else {
                    log::warn!("No placement for handle '{}' on sofa {}", kind, sofa_index);
                    return LoadOutcome::Discarded { path };
                };
                let scale = self.catalog.handle_scale;
                let transform = Transform::from_parts(placement.position, placement.rotation_deg, [scale; 3]);
                self.scene.install_handle(&kind, &tree, transform);
                self.ui.set_selected_handle(Some(kind.as_str()));
                log::info!("Installed {} handle on sofa {}", kind, sofa_index);
                LoadOutcome::HandleInstalled { kind }
            }
            (Purpose::Texture { target, swatch, .. }, LoadedAsset::Texture(texture)) => {
                let parts = apply_texture(&mut self.scene, &self.registry, &texture, target);
                let clicked = swatch.as_ref().map(|(group, index)| (group.as_str(), *index));
                self.ui.show_color(target, &texture.path, clicked);
                let (width, height) = texture.dimensions();
                log::info!("Applied {} ({}x{}) to {} {} part(s)", texture.label(), width, height, parts, target);
                LoadOutcome::TextureApplied { target, path, parts }
            }
            _ => {
                let err = AssetError::UnexpectedAsset {
                    path: path.clone(),
                    expected: pending.request.kind,
                };
                log::warn!("{}", err);
                LoadOutcome::Failed {
                    path,
                    reason: err.to_string(),
                }
            }
        }
    }
}
