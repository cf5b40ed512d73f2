mod input;

use crate::assets::fetch::{FsSource, ThreadedFetcher};
use crate::assets::LoadEvent;
use crate::catalog::serialization::{load_catalog_from_file, save_catalog_to_file, SerializationError};
use crate::catalog::Catalog;
use crate::configurator::{Configurator, LoadOutcome};
use crate::progress::IndicatorView;
use crate::texture::PartTarget;
use input::{Command, HELP};

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::time::Instant;

const BAR_WIDTH: usize = 20;

enum AppEvent {
    Line(String),
    Load(LoadEvent),
    InputClosed,
}

enum CommandOutcome {
    None,
    Message(String),
    Quit,
}

#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error("{0}\nusage: sofa-configurator [--catalog <file>] [--assets <dir>] [--chunk-size <bytes>]")]
    Args(String),
    #[error("failed to load catalog {path:?}: {source}")]
    Catalog {
        path: PathBuf,
        #[source]
        source: SerializationError,
    },
}

#[derive(Debug, PartialEq)]
struct Options {
    catalog: Option<PathBuf>,
    assets: PathBuf,
    chunk_size: Option<usize>,
}

impl Options {
    fn parse(mut args: impl Iterator<Item = String>) -> Result<Self, StartupError> {
        let mut options = Options {
            catalog: None,
            assets: PathBuf::from("."),
            chunk_size: None,
        };
        while let Some(arg) = args.next() {
            let mut value = |flag: &str| {
                args.next()
                    .ok_or_else(|| StartupError::Args(format!("{flag} needs a value")))
            };
            match arg.as_str() {
                "--catalog" => options.catalog = Some(PathBuf::from(value("--catalog")?)),
                "--assets" => options.assets = PathBuf::from(value("--assets")?),
                "--chunk-size" => {
                    let raw = value("--chunk-size")?;
                    let size = raw
                        .parse()
                        .map_err(|_| StartupError::Args(format!("--chunk-size expects a byte count, got '{raw}'")))?;
                    options.chunk_size = Some(size);
                }
                other => return Err(StartupError::Args(format!("unexpected argument '{other}'"))),
            }
        }
        Ok(options)
    }

    fn load_catalog(&self) -> Result<Catalog, StartupError> {
        match &self.catalog {
            Some(path) => {
                let catalog = load_catalog_from_file(path).map_err(|source| StartupError::Catalog {
                    path: path.clone(),
                    source,
                })?;
                log::info!("Catalog loaded from {:?}", path);
                Ok(catalog)
            }
            None => Ok(Catalog::builtin()),
        }
    }
}

pub struct App {
    configurator: Configurator,
    last_view: IndicatorView,
    input_closed: bool,
}

impl App {
    fn new(configurator: Configurator) -> Self {
        Self {
            last_view: configurator.indicator().clone(),
            configurator,
            input_closed: false,
        }
    }

    fn execute(&mut self, command: Command, now: Instant) -> CommandOutcome {
        let result = match command {
            Command::Sofa { index } => self.configurator.select_sofa(index, now).map(|_| CommandOutcome::None),
            Command::Handle { kind } => self.configurator.select_handle(&kind, now).map(|_| CommandOutcome::None),
            Command::Accent { target } => self
                .configurator
                .select_accent(target)
                .map(|_| CommandOutcome::Message(format!("Accent swatches now color {target} parts"))),
            Command::Swatch { group, index } => self
                .configurator
                .select_swatch(&group, index, now)
                .map(|_| CommandOutcome::None),
            Command::Texture { target, path } => self
                .configurator
                .apply_texture(&path, target, now)
                .map(|_| CommandOutcome::None),
            Command::Toggle { group } => self.configurator.toggle_group(&group).map(|expanded| {
                CommandOutcome::Message(format!(
                    "{} {}",
                    group,
                    if expanded { "expanded" } else { "collapsed" }
                ))
            }),
            Command::Export { path } => {
                return match save_catalog_to_file(self.configurator.catalog(), &path) {
                    Ok(()) => CommandOutcome::Message(format!("Catalog written to {}", path.display())),
                    Err(err) => {
                        log::warn!("Failed to export catalog: {}", err);
                        CommandOutcome::Message(format!("Export failed: {err}"))
                    }
                };
            }
            Command::List => return CommandOutcome::Message(self.listing()),
            Command::Status => return CommandOutcome::Message(self.status()),
            Command::Help => return CommandOutcome::Message(HELP.to_string()),
            Command::Quit => return CommandOutcome::Quit,
        };
        result.unwrap_or_else(|err| {
            log::warn!("Selection rejected: {}", err);
            CommandOutcome::Message(format!("Error: {err}"))
        })
    }

    fn handle_load(&mut self, event: LoadEvent, now: Instant) {
        let task = event.task();
        let outcome = self.configurator.handle_load_event(event, now);
        if outcome != LoadOutcome::Pending {
            log::debug!("Load {} resolved: {:?}", task, outcome);
        }
        let message = match outcome {
            LoadOutcome::Pending => return,
            LoadOutcome::SofaInstalled { index, parts } => {
                format!("{} ready ({} parts, #{})", self.configurator.ui().sofa_name(), parts, index + 1)
            }
            LoadOutcome::HandleInstalled { kind } => format!("{kind} handle fitted"),
            LoadOutcome::TextureApplied { target, path, parts } => {
                format!("{path} applied to {parts} {target} part(s)")
            }
            LoadOutcome::Discarded { path } => format!("{path} arrived too late and was dropped"),
            LoadOutcome::Failed { path, reason } => format!("Could not load {path}: {reason}"),
        };
        println!("{message}");
    }

    fn listing(&self) -> String {
        let catalog = self.configurator.catalog();
        let ui = self.configurator.ui();
        let mut out = String::from("Sofas:\n");
        for (index, sofa) in catalog.sofas.iter().enumerate() {
            out.push_str(&format!("  {}. {} ({})\n", index + 1, sofa.name, sofa.path));
        }
        out.push_str("Handles:");
        for kind in ui.handle_options() {
            let marker = if ui.selected_handle() == Some(kind.as_str()) { "*" } else { "" };
            out.push_str(&format!(" {kind}{marker}"));
        }
        out.push_str("\nSwatch groups:\n");
        for group in ui.groups() {
            out.push_str(&format!(
                "  {} [{:?}] {} swatches{}\n",
                group.id,
                group.channel,
                group.swatches.len(),
                if group.expanded { ":" } else { "" }
            ));
            if group.expanded {
                for (index, swatch) in group.swatches.iter().enumerate() {
                    let marker = if ui.is_selected(&group.id, index) { " *" } else { "" };
                    out.push_str(&format!("    {}. {}{}\n", index + 1, swatch.label, marker));
                }
            }
        }
        out.trim_end().to_string()
    }

    fn status(&self) -> String {
        let configurator = &self.configurator;
        let selection = configurator.selection();
        let scene = configurator.scene();
        let registry = configurator.registry();
        let mut out = configurator.summary();

        out.push_str(&format!(
            "\nSelected: sofa {}, handle {}, accent swatches color {}",
            selection
                .sofa_index
                .map(|index| (index + 1).to_string())
                .unwrap_or_else(|| "-".to_string()),
            selection.handle.as_deref().unwrap_or("-"),
            selection.accent_target
        ));
        let highlighted: Vec<String> = PartTarget::ALL
            .iter()
            .filter_map(|target| {
                configurator
                    .ui()
                    .selected_swatch(*target)
                    .map(|swatch| format!("{target}={}", swatch.label))
            })
            .collect();
        if !highlighted.is_empty() {
            out.push_str(&format!("\nHighlighted swatches: {}", highlighted.join(", ")));
        }

        let graph = scene.graph();
        if graph.is_empty() {
            out.push_str("\nScene: empty");
        } else {
            out.push_str(&format!("\nScene: {} nodes under {} root(s)", graph.len(), graph.roots().len()));
        }
        if let Some(position) = scene
            .handle()
            .and_then(|handle| graph.world_matrix(handle.root))
            .map(|matrix| matrix.w_axis.truncate())
        {
            out.push_str(&format!(
                "\nHandle at ({:.2}, {:.2}, {:.2})",
                position.x, position.y, position.z
            ));
        }
        if !registry.is_empty() {
            out.push_str(&format!("\nBaseline materials: {}", registry.len()));
        }
        out
    }

    /// Print the indicator whenever it changes.
    fn report_indicator(&mut self) {
        let view = self.configurator.indicator();
        if *view == self.last_view {
            return;
        }
        if view.visible {
            log::debug!("Indicator at {}% with {} text", view.percent, view.tone.hex());
            println!("{}", render_bar(view));
        } else if self.last_view.visible {
            log::debug!("Loading indicator hidden");
        }
        self.last_view = view.clone();
    }

    fn finished(&self) -> bool {
        self.input_closed && self.configurator.in_flight() == 0 && self.configurator.is_idle()
    }

    fn run_loop(&mut self, receiver: Receiver<AppEvent>) {
        loop {
            let now = Instant::now();
            self.configurator.tick(now);
            self.report_indicator();
            if self.finished() {
                break;
            }

            let event = match self.configurator.next_deadline() {
                Some(deadline) => match receiver.recv_timeout(deadline.saturating_duration_since(now)) {
                    Ok(event) => Some(event),
                    Err(RecvTimeoutError::Timeout) => None,
                    Err(RecvTimeoutError::Disconnected) => break,
                },
                None => match receiver.recv() {
                    Ok(event) => Some(event),
                    Err(_) => break,
                },
            };
            let Some(event) = event else {
                continue;
            };

            let now = Instant::now();
            match event {
                AppEvent::Line(line) => match Command::parse(&line) {
                    Ok(Some(command)) => match self.execute(command, now) {
                        CommandOutcome::None => {}
                        CommandOutcome::Message(message) => println!("{message}"),
                        CommandOutcome::Quit => break,
                    },
                    Ok(None) => {}
                    Err(err) => println!("{err}"),
                },
                AppEvent::Load(event) => self.handle_load(event, now),
                AppEvent::InputClosed => {
                    log::debug!("Input closed; waiting for {} load(s)", self.configurator.in_flight());
                    self.input_closed = true;
                }
            }
        }
    }
}

fn render_bar(view: &IndicatorView) -> String {
    let filled = (view.percent as usize * BAR_WIDTH) / 100;
    format!(
        "[{}{}] {}",
        "#".repeat(filled),
        " ".repeat(BAR_WIDTH - filled),
        view.text
    )
}

pub fn run() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let options = match Options::parse(std::env::args().skip(1)) {
        Ok(options) => options,
        Err(err) => {
            eprintln!("{err}");
            return;
        }
    };
    let catalog = match options.load_catalog() {
        Ok(catalog) => catalog,
        Err(err) => {
            log::error!("{}", err);
            return;
        }
    };
    log::info!(
        "Sofa configurator: {} sofas, {} handles, {} swatch groups; assets from {:?}",
        catalog.sofas.len(),
        catalog.handles.len(),
        catalog.swatch_groups.len(),
        options.assets
    );
    let camera = &catalog.stage.camera;
    log::debug!(
        "Stage: {} spot lights, camera fov {} at {:?}, orbit distance {}..{}",
        catalog.stage.spot_lights.len(),
        camera.fov_deg,
        camera.position,
        camera.orbit.min_distance,
        camera.orbit.max_distance
    );

    let (sender, receiver) = mpsc::channel();
    let load_sender = sender.clone();
    let mut fetcher = ThreadedFetcher::new(
        Arc::new(FsSource::new(&options.assets)),
        Arc::new(move |event: LoadEvent| {
            let _ = load_sender.send(AppEvent::Load(event));
        }),
    );
    if let Some(chunk_size) = options.chunk_size {
        fetcher = fetcher.with_chunk_size(chunk_size);
    }

    let reader = std::thread::Builder::new().name("stdin".to_string()).spawn(move || {
        for line in std::io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if sender.send(AppEvent::Line(line)).is_err() {
                        return;
                    }
                }
                Err(err) => {
                    log::warn!("Failed to read input: {}", err);
                    break;
                }
            }
        }
        let _ = sender.send(AppEvent::InputClosed);
    });
    if let Err(err) = reader {
        log::error!("Failed to start input reader: {}", err);
        return;
    }

    println!("{HELP}");
    let mut app = App::new(Configurator::new(catalog, Box::new(fetcher)));
    app.run_loop(receiver);

    log::info!("Goodbye");
}
