//! Chroma Keys - a chromatic on-screen keyboard
//!
//! Entry point for the application.

use chroma_keys::app::KeyboardApp;
use eframe::egui;

fn main() -> eframe::Result<()> {
    env_logger::init();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 320.0])
            .with_title("Chroma Keys"),
        ..Default::default()
    };

    eframe::run_native(
        "Chroma Keys",
        options,
        Box::new(|_cc| Ok(Box::new(KeyboardApp::new()))),
    )
}
