mod app;
mod color;
mod config;
mod data;
mod error;
mod state;
mod ui;

use app::TsfViewerApp;
use config::ViewerConfig;
use eframe::egui;

fn main() -> eframe::Result {
    env_logger::init();

    let config = ViewerConfig::load().unwrap_or_else(|e| {
        log::warn!("{e:#}; using default settings");
        ViewerConfig::default()
    });
    log::debug!("Viewer config: {config:?}");

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 900.0])
            .with_min_inner_size([720.0, 480.0]),
        ..Default::default()
    };

    eframe::run_native(
        "TSF Imaging Data Viewer",
        options,
        Box::new(|_cc| Ok(Box::new(TsfViewerApp::new(config)))),
    )
}
