mod annotate;
mod app;
mod color;
mod config;
mod data;
mod error;
mod ner;
mod state;
mod ui;

use app::NerSheetApp;
use config::Settings;
use eframe::egui;

fn main() -> eframe::Result {
    env_logger::init();

    let settings = Settings::load();
    log::info!(
        "Backend {:?}, default model {}",
        settings.backend,
        settings.default_model
    );

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([600.0, 400.0]),
        ..Default::default()
    };

    eframe::run_native(
        "NER Sheet – Named Entity Recognition for spreadsheets",
        options,
        Box::new(|_cc| Ok(Box::new(NerSheetApp::new(settings)))),
    )
}
