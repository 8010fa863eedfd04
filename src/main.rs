#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod app;
mod ui;

use roadmap_grid::config::{Config, Paths};
use roadmap_grid::logging;
use tracing::{info, warn};

fn main() -> eframe::Result<()> {
    let (paths, discovered) = match Paths::discover() {
        Ok(paths) => (paths, None),
        Err(e) => (Paths::local(), Some(e)),
    };
    let _guard = logging::init(&paths.log_dir);
    if let Some(e) = discovered {
        warn!(%e, "no platform config directory, using the working directory");
    }
    let config = Config::load_or_default(&paths.config_file);
    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %paths.config_file.display(),
        "starting roadmap grid"
    );

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 720.0])
            .with_min_inner_size([800.0, 400.0])
            .with_title("Roadmap Grid"),
        ..Default::default()
    };

    eframe::run_native(
        "Roadmap Grid",
        options,
        Box::new(move |cc| Ok(Box::new(app::RoadmapApp::new(cc, config, paths)))),
    )
}
