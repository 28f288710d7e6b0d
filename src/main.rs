// src/main.rs
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod config;
mod gui;
mod session;
mod smoothing;
mod store;
mod types;
mod wio;

use eframe::egui;

fn main() -> eframe::Result<()> {
    env_logger::init();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1000.0, 640.0])
            .with_title("Labeled Serial Data Recorder"),
        ..Default::default()
    };

    eframe::run_native(
        "WioLab",
        options,
        Box::new(|_cc| Box::new(gui::WioLabApp::default())),
    )
}
