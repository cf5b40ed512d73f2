use crate::assets::texture_label;
use crate::catalog::{Catalog, SwatchChannel};
use crate::scene::SceneState;
use crate::texture::PartTarget;

pub const MAIN_PLACEHOLDER: &str = "Main";
pub const ACCENT_PLACEHOLDER: &str = "Accent";
pub const ACCENT1_PLACEHOLDER: &str = "Accent 1";

/// "Current color" box for one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorPreview {
    pub texture: Option<String>,
    pub label: String,
    pub highlighted: bool,
}

impl ColorPreview {
    fn placeholder(target: PartTarget) -> Self {
        let label = match target {
            PartTarget::Main => MAIN_PLACEHOLDER,
            PartTarget::Accent => ACCENT_PLACEHOLDER,
            PartTarget::Accent1 => ACCENT1_PLACEHOLDER,
        };
        Self {
            texture: None,
            label: label.to_string(),
            highlighted: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Swatch {
    pub path: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwatchGroupView {
    pub id: String,
    pub channel: SwatchChannel,
    pub swatches: Vec<Swatch>,
    pub expanded: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SwatchRef {
    group: usize,
    index: usize,
}

pub struct UiState {
    sofa_name: String,
    previews: [ColorPreview; 3],
    groups: Vec<SwatchGroupView>,
    selected: [Option<SwatchRef>; 3],
    accent_target: PartTarget,
    handle_options: Vec<String>,
    selected_handle: Option<String>,
}

impl UiState {
    pub fn new(catalog: &Catalog) -> Self {
        let groups = catalog
            .swatch_groups
            .iter()
            .map(|group| {
                let mut swatches: Vec<Swatch> = Vec::with_capacity(group.textures.len());
                for path in &group.textures {
                    if swatches.iter().any(|swatch| &swatch.path == path) {
                        log::debug!("Skipping duplicate swatch {} in {}", path, group.id);
                        continue;
                    }
                    swatches.push(Swatch {
                        path: path.clone(),
                        label: texture_label(path).to_string(),
                    });
                }
                SwatchGroupView {
                    id: group.id.clone(),
                    channel: group.channel,
                    swatches,
                    expanded: false,
                }
            })
            .collect();

        Self {
            sofa_name: String::new(),
            previews: PartTarget::ALL.map(ColorPreview::placeholder),
            groups,
            selected: [None; 3],
            accent_target: PartTarget::Accent,
            handle_options: catalog.handles.iter().map(|handle| handle.kind.clone()).collect(),
            selected_handle: None,
        }
    }

    pub fn sofa_name(&self) -> &str {
        &self.sofa_name
    }

    pub fn set_sofa_name(&mut self, name: &str) {
        self.sofa_name = name.to_string();
    }

    pub fn preview(&self, target: PartTarget) -> &ColorPreview {
        &self.previews[slot(target)]
    }

    pub fn groups(&self) -> &[SwatchGroupView] {
        &self.groups
    }

    pub fn group(&self, id: &str) -> Option<&SwatchGroupView> {
        self.groups.iter().find(|group| group.id == id)
    }

    pub fn swatch(&self, group_id: &str, index: usize) -> Option<(&SwatchGroupView, &Swatch)> {
        let group = self.group(group_id)?;
        group.swatches.get(index).map(|swatch| (group, swatch))
    }

    /// Expand or collapse a swatch series. Returns the new state.
    pub fn toggle_group(&mut self, id: &str) -> Option<bool> {
        let group = self.groups.iter_mut().find(|group| group.id == id)?;
        group.expanded = !group.expanded;
        Some(group.expanded)
    }

    pub fn accent_target(&self) -> PartTarget {
        self.accent_target
    }

    pub fn set_accent_target(&mut self, target: PartTarget) {
        self.accent_target = target;
    }

    /// Record that `path` now colors `target`: update its preview and move
    /// that target's swatch highlight. `clicked` names the swatch the user
    /// picked as (group id, index); without it, or when it does not show
    /// `path`, the first swatch of the matching channel with that path wins.
    pub fn show_color(&mut self, target: PartTarget, path: &str, clicked: Option<(&str, usize)>) {
        let preview = &mut self.previews[slot(target)];
        preview.texture = Some(path.to_string());
        preview.label = texture_label(path).to_string();
        preview.highlighted = true;

        let channel = match target {
            PartTarget::Main => SwatchChannel::Main,
            PartTarget::Accent | PartTarget::Accent1 => SwatchChannel::Accent,
        };
        let clicked = clicked.and_then(|(group_id, index)| {
            let group = self.groups.iter().position(|group| group.id == group_id)?;
            let view = &self.groups[group];
            (view.channel == channel && view.swatches.get(index)?.path == path).then_some(SwatchRef { group, index })
        });
        if clicked.is_some() {
            self.selected[slot(target)] = clicked;
            return;
        }
        self.selected[slot(target)] = self.groups.iter().enumerate().find_map(|(group, view)| {
            if view.channel != channel {
                return None;
            }
            view.swatches
                .iter()
                .position(|swatch| swatch.path == path)
                .map(|index| SwatchRef { group, index })
        });
    }

    pub fn selected_swatch(&self, target: PartTarget) -> Option<&Swatch> {
        let selected = self.selected[slot(target)]?;
        self.groups.get(selected.group)?.swatches.get(selected.index)
    }

    pub fn is_selected(&self, group_id: &str, index: usize) -> bool {
        let Some(group) = self.groups.iter().position(|group| group.id == group_id) else {
            return false;
        };
        self.selected
            .iter()
            .flatten()
            .any(|selected| selected.group == group && selected.index == index)
    }

    /// Back to placeholders, no highlighted swatches, accent target reset.
    pub fn reset_color_selection(&mut self) {
        self.previews = PartTarget::ALL.map(ColorPreview::placeholder);
        self.selected = [None; 3];
        self.accent_target = PartTarget::Accent;
    }

    pub fn handle_options(&self) -> &[String] {
        &self.handle_options
    }

    pub fn selected_handle(&self) -> Option<&str> {
        self.selected_handle.as_deref()
    }

    pub fn set_selected_handle(&mut self, handle: Option<&str>) {
        self.selected_handle = handle.map(str::to_string);
    }

    pub fn summary(&self, scene: &SceneState) -> String {
        let mut summary = String::new();
        match scene.sofa() {
            Some(sofa) => summary.push_str(&format!(
                "Sofa: {} ({}, {} parts)\n",
                self.sofa_name,
                sofa.source_path,
                scene.sofa_parts().len()
            )),
            None => summary.push_str("Sofa: none\n"),
        }
        summary.push_str(&format!(
            "Handle: {}\n",
            scene.handle().map(|handle| handle.kind.as_str()).unwrap_or("none")
        ));
        for target in PartTarget::ALL {
            let preview = self.preview(target);
            summary.push_str(&format!(
                "{:<8} {}{}\n",
                format!("{target}:"),
                preview.label,
                if preview.texture.is_some() { "" } else { " (unset)" }
            ));
        }
        summary.push_str(&format!("Accent target: {}", self.accent_target));
        summary
    }
}

fn slot(target: PartTarget) -> usize {
    match target {
        PartTarget::Main => 0,
        PartTarget::Accent => 1,
        PartTarget::Accent1 => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::{UiState, ACCENT1_PLACEHOLDER, MAIN_PLACEHOLDER};
    use crate::catalog::{Catalog, SwatchChannel, SwatchGroup};
    use crate::scene::SceneState;
    use crate::texture::PartTarget;

    #[test]
    fn swatch_grid_skips_duplicates() {
        let mut catalog = Catalog::builtin();
        catalog.swatch_groups = vec![SwatchGroup {
            id: "main-colors-248".to_string(),
            channel: SwatchChannel::Main,
            textures: vec![
                "textures/248-01.webp".to_string(),
                "textures/248-02.webp".to_string(),
                "textures/248-01.webp".to_string(),
            ],
        }];
        let ui = UiState::new(&catalog);
        let group = ui.group("main-colors-248").unwrap();
        assert_eq!(group.swatches.len(), 2);
        assert_eq!(group.swatches[1].label, "248-02");
        assert!(!group.expanded);
    }

    #[test]
    fn show_color_moves_highlight_per_target() {
        let mut ui = UiState::new(&Catalog::builtin());
        ui.show_color(PartTarget::Main, "textures/248-03.webp", None);
        assert!(ui.is_selected("main-colors-248", 2));
        assert_eq!(ui.preview(PartTarget::Main).label, "248-03");

        ui.show_color(PartTarget::Main, "textures/W001.webp", None);
        assert!(!ui.is_selected("main-colors-248", 2));
        assert!(ui.is_selected("main-colors-w00", 0));

        ui.show_color(PartTarget::Accent, "textures/PW004.webp", None);
        assert!(ui.is_selected("main-colors-w00", 0));
        assert!(ui.is_selected("accent-colors-pw00", 1));
        assert_eq!(ui.selected_swatch(PartTarget::Accent).unwrap().label, "PW004");
        assert!(ui.selected_swatch(PartTarget::Accent1).is_none());
    }

    #[test]
    fn show_color_prefers_clicked_swatch() {
        let mut catalog = Catalog::builtin();
        catalog.swatch_groups.push(SwatchGroup {
            id: "main-colors-favorites".to_string(),
            channel: SwatchChannel::Main,
            textures: vec!["textures/W001.webp".to_string(), "textures/248-03.webp".to_string()],
        });
        let mut ui = UiState::new(&catalog);

        ui.show_color(PartTarget::Main, "textures/248-03.webp", Some(("main-colors-favorites", 1)));
        assert!(ui.is_selected("main-colors-favorites", 1));
        assert!(!ui.is_selected("main-colors-248", 2));

        ui.show_color(PartTarget::Main, "textures/248-03.webp", Some(("main-colors-248", 2)));
        assert!(ui.is_selected("main-colors-248", 2));
        assert!(!ui.is_selected("main-colors-favorites", 1));

        // A click that does not show the applied path falls back to the first match.
        ui.show_color(PartTarget::Main, "textures/W001.webp", Some(("main-colors-248", 0)));
        assert!(ui.is_selected("main-colors-w00", 0));
        assert!(!ui.is_selected("main-colors-248", 0));
    }

    #[test]
    fn show_color_outside_catalog_only_updates_preview() {
        let mut ui = UiState::new(&Catalog::builtin());
        ui.show_color(PartTarget::Accent1, "custom/linen.png", None);
        assert_eq!(ui.preview(PartTarget::Accent1).label, "linen");
        assert!(ui.selected_swatch(PartTarget::Accent1).is_none());
    }

    #[test]
    fn reset_restores_defaults() {
        let mut ui = UiState::new(&Catalog::builtin());
        ui.set_accent_target(PartTarget::Accent1);
        ui.show_color(PartTarget::Main, "textures/248-01.webp", None);
        ui.show_color(PartTarget::Accent1, "textures/24.webp", None);

        ui.reset_color_selection();
        assert_eq!(ui.accent_target(), PartTarget::Accent);
        assert_eq!(ui.preview(PartTarget::Main).label, MAIN_PLACEHOLDER);
        assert_eq!(ui.preview(PartTarget::Accent1).label, ACCENT1_PLACEHOLDER);
        assert!(ui.preview(PartTarget::Main).texture.is_none());
        assert!(!ui.preview(PartTarget::Main).highlighted);
        assert!(!ui.is_selected("main-colors-248", 0));
        assert!(!ui.is_selected("accent-colors-napa", 0));
    }

    #[test]
    fn toggle_group_flips() {
        let mut ui = UiState::new(&Catalog::builtin());
        assert_eq!(ui.toggle_group("accent-colors-napa"), Some(true));
        assert_eq!(ui.toggle_group("accent-colors-napa"), Some(false));
        assert_eq!(ui.toggle_group("nope"), None);
    }

    #[test]
    fn summary_without_sofa() {
        let ui = UiState::new(&Catalog::builtin());
        let summary = ui.summary(&SceneState::new());
        assert!(summary.starts_with("Sofa: none"));
        assert!(summary.contains("Handle: none"));
        assert!(summary.contains("Accent target: accent"));
        assert_eq!(ui.handle_options(), &["Golden".to_string(), "Silver".to_string()]);
    }
}
