//! Sofa configurator
//!
//! Scene and material state machine for a 3D sofa configurator:
//! - one current sofa and one current handle in the scene graph
//! - asset loads with a progress indicator (ramp, watchdog, settle)
//! - swatch textures applied to named parts from per-part baselines
//!
//! The binary drives it from the terminal; a renderer consumes the scene
//! graph, stage and UI state.

mod app;
mod assets;
mod catalog;
mod configurator;
mod materials;
mod progress;
mod scene;
mod texture;
mod ui;

fn main() {
    app::run();
}
