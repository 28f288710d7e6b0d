// src/gui.rs
use crate::config::AppConfig;
use crate::session::SessionState;
use crate::smoothing::{self, PreviewSeries, SavitzkyGolay};
use crate::store::{LabelStore, LabelSummary, StoreError};
use crate::types::DeviceRef;
use crate::wio;
use eframe::egui;
use egui::Color32;
use egui_plot::{Legend, Line, Plot, PlotPoints};
use log::{error, info, warn};

pub struct WioLabApp {
    config: AppConfig,
    store: Option<LabelStore>,
    device: Option<DeviceRef>,
    filter: SavitzkyGolay,
    session: SessionState,
    labels: Vec<LabelSummary>,
    preview: Option<PreviewSeries>,
    preview_note: Option<String>,
    status: String,
    new_label_input: String,
    new_label_open: bool,
    capturing: bool,
}

impl Default for WioLabApp {
    fn default() -> Self {
        Self::with_config(AppConfig::load_or_default("wiolab.json"))
    }
}

impl WioLabApp {
    pub fn with_config(config: AppConfig) -> Self {
        let device = wio::locate_device();
        let mut status = match &device {
            Some(device) => {
                info!("Wio Terminal found on port {}", device.port_name);
                format!("Wio Terminal found on port: {}", device.port_name)
            }
            None => {
                warn!("Wio Terminal not found; recording disabled");
                "ERROR: Wio Terminal not found! Check connection.".to_owned()
            }
        };

        let store = match LabelStore::open(&config.base_folder) {
            Ok(store) => Some(store),
            Err(e) => {
                error!("cannot open sample folder: {e}");
                status = format!("ERROR: cannot open sample folder: {e}");
                None
            }
        };

        let filter = SavitzkyGolay::new(config.smoothing_window, config.smoothing_poly_order)
            .unwrap_or_else(|e| {
                warn!("smoothing config rejected ({e}); using defaults");
                SavitzkyGolay::default()
            });

        let mut app = Self {
            config,
            store,
            device,
            filter,
            session: SessionState::default(),
            labels: Vec::new(),
            preview: None,
            preview_note: None,
            status,
            new_label_input: String::new(),
            new_label_open: false,
            capturing: false,
        };
        app.refresh_labels();
        if app.session.current_label.is_none() {
            if let Some(first) = app.labels.first().map(|l| l.name.clone()) {
                app.set_label(first);
            }
        }
        if app.device.is_some() {
            if let Some(label) = &app.session.current_label {
                app.status = format!("Ready. Recording to '{label}/'");
            }
        }
        app
    }

    fn can_record(&self) -> bool {
        self.device.is_some()
            && self.store.is_some()
            && self.session.current_label.is_some()
            && !self.capturing
    }

    fn clear_preview(&mut self) {
        self.preview = None;
        self.preview_note = None;
    }

    fn refresh_labels(&mut self) {
        let listing = match &self.store {
            Some(store) => store.list_labels(),
            None => return,
        };
        match listing {
            Ok(labels) => {
                if let Some(current) = &self.session.current_label {
                    if !labels.iter().any(|l| &l.name == current) {
                        self.session.select_label(None);
                    }
                }
                self.labels = labels;
            }
            Err(e) => self.status = format!("Error loading labels: {e}"),
        }
    }

    fn refresh_samples(&mut self) {
        let listing = match (&self.store, &self.session.current_label) {
            (Some(store), Some(label)) => Some(store.list_samples(label)),
            _ => None,
        };
        match listing {
            Some(Ok(samples)) => self.session.set_samples(samples),
            Some(Err(e)) => {
                self.session.set_samples(Vec::new());
                self.status = format!("Error loading samples: {e}");
            }
            None => self.session.set_samples(Vec::new()),
        }
    }

    fn set_label(&mut self, name: String) {
        self.session.select_label(Some(name));
        self.refresh_samples();
        self.clear_preview();
    }

    fn create_label(&mut self) {
        let raw = self.new_label_input.trim().to_owned();
        if raw.is_empty() {
            return;
        }
        let created = match &self.store {
            Some(store) => store.create_label(&raw),
            None => return,
        };
        match created {
            Ok(name) => {
                info!("created label folder {name}");
                self.status = format!("Created new label folder: {name}");
                self.new_label_input.clear();
                self.new_label_open = false;
                self.refresh_labels();
                self.set_label(name);
            }
            Err(e) => self.status = format!("Error creating label folder: {e}"),
        }
    }

    /// The capture call blocks the shell for the capture duration. Accepted:
    /// it is a short, user-initiated, foreground-only operation.
    fn record_and_save(&mut self) {
        if self.capturing {
            return;
        }
        let Some(device) = self.device.clone() else {
            self.status = "ERROR: Cannot record. Wio Terminal port not detected.".to_owned();
            return;
        };
        let Some(label) = self.session.current_label.clone() else {
            self.status = "ERROR: Cannot record. Please create or select a data label.".to_owned();
            return;
        };

        self.capturing = true;
        self.status = format!(
            "Recording data for {:.1}s...",
            self.config.capture_duration_ms as f64 / 1000.0
        );
        let result = wio::read_capture(&device, &self.config);
        self.capturing = false;

        let capture = match result {
            Ok(capture) => capture,
            Err(e) => {
                error!("capture aborted: {e}");
                self.status = format!("Error: {e}");
                return;
            }
        };
        info!("capture finished with {} records", capture.len());

        let written = match &self.store {
            Some(store) => store.write_sample(&label, &capture),
            None => return,
        };
        match written {
            Ok(path) => {
                info!("saved sample {}", path.display());
                self.status = format!(
                    "Successfully saved {} samples to {}",
                    capture.len(),
                    path.display()
                );
                self.refresh_labels();
                self.refresh_samples();
                self.session.select_newest();
                self.preview_selected();
            }
            Err(e) => {
                error!("sample write failed: {e}");
                self.status = format!("Error saving CSV: {e}");
            }
        }
    }

    fn preview_selected(&mut self) {
        self.clear_preview();
        let target = match (&self.session.current_label, self.session.selected_sample()) {
            (Some(label), Some(filename)) => Some((label.clone(), filename.to_owned())),
            _ => None,
        };
        let Some((label, filename)) = target else {
            self.status = "Ready. Select a sample or record new data.".to_owned();
            return;
        };
        let loaded = match &self.store {
            Some(store) => store.read_sample(&label, &filename),
            None => return,
        };
        let rows = match loaded {
            Ok(rows) => rows,
            Err(e) => {
                self.status = format!("Error previewing file: {e}");
                return;
            }
        };
        match smoothing::preview(&rows, &self.filter) {
            Ok(series) => {
                if series.smoothed {
                    self.status = format!("Previewing: {} ({} samples)", filename, rows.len());
                } else {
                    warn!("sample too short for smoothing, plotting raw data");
                    self.status =
                        "Warning: Not enough samples for smoothing. Plotting raw data.".to_owned();
                }
                self.preview = Some(series);
            }
            Err(e) => {
                self.preview_note = Some(e.to_string());
                self.status = format!("Previewing: {} ({} samples)", filename, rows.len());
            }
        }
    }

    fn delete_selected(&mut self) {
        let Some(index) = self.session.selected else {
            self.status = "Error: Please select a sample to delete.".to_owned();
            return;
        };
        let target = match (&self.session.current_label, self.session.samples.get(index)) {
            (Some(label), Some(filename)) => Some((label.clone(), filename.clone())),
            _ => None,
        };
        let Some((label, filename)) = target else {
            self.status = "Error: Please select a sample to delete.".to_owned();
            return;
        };
        let outcome = match &self.store {
            Some(store) => store.delete_sample(&label, &filename),
            None => return,
        };
        match outcome {
            Ok(()) => {
                info!("deleted sample {filename}");
                self.refresh_labels();
                self.refresh_samples();
                self.session.selected =
                    SessionState::next_selection_after_delete(index, self.session.samples.len());
                if self.session.selected.is_some() {
                    self.preview_selected();
                } else {
                    self.clear_preview();
                }
                self.status = format!("Successfully deleted: {filename}");
            }
            Err(e @ StoreError::SampleNotFound(_)) => {
                // stale listing: the file was already gone, refresh and move on
                self.refresh_labels();
                self.refresh_samples();
                self.clear_preview();
                self.status = format!("Error deleting file: {e}");
            }
            Err(e) => self.status = format!("Error deleting file: {e}"),
        }
    }

    fn show_controls(&mut self, ui: &mut egui::Ui) {
        ui.add_space(6.0);
        ui.horizontal(|ui| {
            ui.label("Current Label:");
            let selected_text = self
                .session
                .current_label
                .clone()
                .unwrap_or_else(|| "No Labels".to_owned());
            let mut chosen: Option<String> = None;
            egui::ComboBox::from_id_source("label_selector")
                .selected_text(selected_text)
                .width(160.0)
                .show_ui(ui, |ui| {
                    for label in &self.labels {
                        let text = format!("{} ({} samples)", label.name, label.sample_count);
                        let is_current =
                            self.session.current_label.as_deref() == Some(label.name.as_str());
                        if ui.selectable_label(is_current, text).clicked() {
                            chosen = Some(label.name.clone());
                        }
                    }
                });
            if let Some(name) = chosen {
                self.set_label(name);
            }
            if ui.button("+").clicked() {
                self.new_label_open = true;
            }
        });

        ui.add_space(8.0);
        let record_text = if self.capturing {
            "Recording..."
        } else {
            "Record (Press X)"
        };
        if ui
            .add_enabled(
                self.can_record(),
                egui::Button::new(egui::RichText::new(record_text).strong())
                    .min_size(egui::Vec2::new(ui.available_width(), 32.0)),
            )
            .clicked()
        {
            self.record_and_save();
        }

        ui.add_space(8.0);
        ui.label("Samples in Folder:");
        let mut clicked: Option<usize> = None;
        egui::ScrollArea::vertical()
            .auto_shrink([false, true])
            .max_height((ui.available_height() - 40.0).max(80.0))
            .show(ui, |ui| {
                for (index, name) in self.session.samples.iter().enumerate() {
                    let selected = self.session.selected == Some(index);
                    if ui.selectable_label(selected, name).clicked() {
                        clicked = Some(index);
                    }
                }
            });
        if let Some(index) = clicked {
            self.session.select(index);
            self.preview_selected();
        }

        if ui
            .add_enabled(
                self.session.selected.is_some(),
                egui::Button::new("Delete Selected (Press C)"),
            )
            .clicked()
        {
            self.delete_selected();
        }
    }

    fn show_new_label_window(&mut self, ctx: &egui::Context) {
        if !self.new_label_open {
            return;
        }
        let mut open = true;
        let mut create = false;
        let mut cancel = false;
        egui::Window::new("Add New Label")
            .open(&mut open)
            .collapsible(false)
            .resizable(false)
            .show(ctx, |ui| {
                ui.label("Enter new label name:");
                let response = ui.text_edit_singleline(&mut self.new_label_input);
                if response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                    create = true;
                }
                ui.horizontal(|ui| {
                    if ui.button("Create").clicked() {
                        create = true;
                    }
                    if ui.button("Cancel").clicked() {
                        cancel = true;
                    }
                });
            });
        if create {
            self.create_label();
        }
        if cancel || !open {
            self.new_label_open = false;
            self.new_label_input.clear();
        }
    }

    fn show_plot(&mut self, ui: &mut egui::Ui) {
        match (&self.session.current_label, self.session.selected_sample()) {
            (Some(label), Some(sample)) => {
                ui.label(format!("Smoothed Data Preview ({label}) {sample}"));
            }
            _ => {
                ui.label("Data Preview");
            }
        }
        if let Some(note) = &self.preview_note {
            ui.colored_label(Color32::from_rgb(200, 50, 50), format!("Cannot plot: {note}"));
        }

        Plot::new("preview_plot")
            .legend(Legend::default())
            .allow_drag(true)
            .allow_zoom(true)
            .show(ui, |plot_ui| {
                let Some(series) = &self.preview else { return };
                let names = ["acc_x", "acc_y", "acc_z"];
                let colors = [
                    Color32::from_rgb(0, 120, 160),
                    Color32::from_rgb(200, 120, 0),
                    Color32::from_rgb(0, 140, 90),
                ];
                for (index, channel) in series.channels.iter().enumerate() {
                    let points: PlotPoints = channel
                        .iter()
                        .enumerate()
                        .map(|(x, y)| [x as f64, *y])
                        .collect();
                    plot_ui.line(
                        Line::new(points)
                            .name(names.get(index).copied().unwrap_or("ch"))
                            .color(colors.get(index).copied().unwrap_or(Color32::GRAY)),
                    );
                }
            });
    }
}

impl eframe::App for WioLabApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // keyboard shortcuts, ignored while a text field has focus
        if !ctx.wants_keyboard_input() {
            if ctx.input(|i| i.key_pressed(egui::Key::X)) {
                self.record_and_save();
            }
            if ctx.input(|i| i.key_pressed(egui::Key::C)) {
                self.delete_selected();
            }
        }

        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("Labeled Serial Data Recorder");
                ui.separator();
                match &self.device {
                    Some(device) => {
                        ui.colored_label(
                            Color32::from_rgb(0, 140, 90),
                            format!("Wio Terminal: {}", device.port_name),
                        );
                    }
                    None => {
                        ui.colored_label(Color32::from_rgb(200, 50, 50), "Wio Terminal not found");
                    }
                }
            });
        });

        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.monospace(&self.status);
        });

        egui::SidePanel::left("control_panel")
            .resizable(true)
            .min_width(260.0)
            .default_width(300.0)
            .show(ctx, |ui| self.show_controls(ui));

        egui::CentralPanel::default().show(ctx, |ui| self.show_plot(ui));

        self.show_new_label_window(ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn app() -> (TempDir, WioLabApp) {
        let dir = TempDir::new().unwrap();
        let config = AppConfig {
            base_folder: dir.path().join("samples"),
            ..AppConfig::default()
        };
        (dir, WioLabApp::with_config(config))
    }

    #[test]
    fn recording_without_a_device_is_a_no_op() {
        // no Wio Terminal is attached in the test environment
        let (_dir, mut app) = app();
        assert!(app.device.is_none());
        assert!(!app.can_record());
        app.record_and_save();
        assert!(app.status.starts_with("ERROR: Cannot record."));
        assert!(app.labels.iter().all(|l| l.sample_count == 0));
    }

    #[test]
    fn startup_selects_the_first_label_on_disk() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("samples");
        let seed = LabelStore::open(&base).unwrap();
        seed.create_label("walk").unwrap();
        seed.create_label("idle").unwrap();

        let config = AppConfig {
            base_folder: base,
            ..AppConfig::default()
        };
        let app = WioLabApp::with_config(config);
        assert_eq!(app.session.current_label.as_deref(), Some("idle"));
    }

    #[test]
    fn creating_a_label_selects_it() {
        let (_dir, mut app) = app();
        app.new_label_input = "Walk Fast!".to_owned();
        app.create_label();
        assert_eq!(app.session.current_label.as_deref(), Some("WalkFast"));
        assert_eq!(app.labels.len(), 1);
        assert!(!app.new_label_open);
    }

    #[test]
    fn duplicate_label_reports_a_status_error() {
        let (_dir, mut app) = app();
        app.new_label_input = "walk".to_owned();
        app.create_label();
        app.new_label_input = "walk".to_owned();
        app.create_label();
        assert!(app.status.starts_with("Error creating label folder:"));
    }

    #[test]
    fn deleting_a_stale_listing_entry_recovers() {
        let (_dir, mut app) = app();
        app.new_label_input = "walk".to_owned();
        app.create_label();
        app.session.set_samples(vec!["walk_20240101_120000.csv".to_owned()]);
        app.session.select(0);
        app.delete_selected();
        assert!(app.status.starts_with("Error deleting file:"));
        assert!(app.session.samples.is_empty());
    }
}
