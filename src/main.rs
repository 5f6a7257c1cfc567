#![warn(clippy::all, rust_2018_idioms)]

use trace_annotator::{AnnotatorApp, AnnotatorConfig};

fn main() -> eframe::Result {
    env_logger::init(); // Log to stderr (if you run with `RUST_LOG=debug`).

    // Optional JSON config path as the only argument
    let config = match std::env::args().nth(1) {
        Some(path) => AnnotatorConfig::load(&path).unwrap_or_else(|err| {
            log::warn!("Using default config, {path} could not be read: {err}");
            AnnotatorConfig::default()
        }),
        None => AnnotatorConfig::default(),
    };

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([960.0, 640.0])
            .with_min_inner_size([300.0, 220.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Trace Annotator",
        native_options,
        Box::new(move |cc| Ok(Box::new(AnnotatorApp::new(cc, config)?))),
    )
}
