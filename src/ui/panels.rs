use eframe::egui::{self, Color32, DragValue, RichText, Ui};
use egui_extras::{Column, TableBuilder};

use crate::data::average::AveragingScope;
use crate::data::filter::ToleranceUnit;
use crate::data::ion_image::IonImageQuery;
use crate::data::model::FrameSource;
use crate::state::{AppState, Command, SpectrumMode};

// ---------------------------------------------------------------------------
// Left side panel – navigation and ion image controls
// ---------------------------------------------------------------------------

/// Render the left control panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState, commands: &mut Vec<Command>) {
    let loaded = state.has_dataset();

    ui.heading("Spectrum");
    ui.separator();
    if ui
        .add_enabled(loaded, egui::Button::new("View Average Estimate Spectrum"))
        .clicked()
    {
        commands.push(Command::ShowAverage(AveragingScope::Estimate));
    }
    if ui
        .add_enabled(loaded, egui::Button::new("View Full Average Spectrum"))
        .clicked()
    {
        commands.push(Command::ShowAverage(AveragingScope::Full));
    }
    if ui
        .add_enabled(loaded, egui::Button::new("View Individual Spectrum"))
        .clicked()
    {
        commands.push(Command::ShowFrameSpectrum);
    }

    if let (Some(dataset), SpectrumMode::Frame(_)) = (&state.dataset, state.mode) {
        ui.add_space(6.0);
        frame_selectors(ui, dataset.as_ref(), state, commands);
    }

    ui.add_space(12.0);
    ui.heading("Ion image");
    ui.separator();
    ui.add_enabled_ui(loaded, |ui: &mut Ui| {
        ion_image_controls(ui, state, commands);
    });

    if let Some(dataset) = &state.dataset {
        ui.add_space(12.0);
        ui.heading("Dataset");
        ui.separator();
        dataset_table(ui, dataset.as_ref());
    }
}

fn frame_selectors(ui: &mut Ui, dataset: &dyn FrameSource, state: &AppState, commands: &mut Vec<Command>) {
    let meta = dataset.metadata();
    let (first, last) = dataset.frames().id_range().unwrap_or((1, 1));
    let controls = state.controls;

    egui::Grid::new("frame_selectors").num_columns(2).show(ui, |ui: &mut Ui| {
        let mut frame = controls.frame;
        ui.label("Frame");
        if ui.add(DragValue::new(&mut frame).range(first..=last)).changed() {
            commands.push(Command::SelectFrame(frame));
        }
        ui.end_row();

        let mut x = controls.x;
        ui.label("X");
        if ui.add(DragValue::new(&mut x).range(meta.x_min..=meta.x_max)).changed() {
            commands.push(Command::SelectCoordinate { x, y: controls.y });
        }
        ui.end_row();

        let mut y = controls.y;
        ui.label("Y");
        if ui.add(DragValue::new(&mut y).range(meta.y_min..=meta.y_max)).changed() {
            commands.push(Command::SelectCoordinate { x: controls.x, y });
        }
        ui.end_row();
    });
}

fn ion_image_controls(ui: &mut Ui, state: &mut AppState, commands: &mut Vec<Command>) {
    let (mz_lower, mz_upper) = state
        .dataset
        .as_ref()
        .map(|d| d.metadata().mz_range())
        .unwrap_or((0.0, f64::MAX));
    let controls = &mut state.controls;

    egui::Grid::new("ion_image_controls").num_columns(2).show(ui, |ui: &mut Ui| {
        ui.label("m/z");
        ui.add(
            DragValue::new(&mut controls.mz)
                .range(mz_lower..=mz_upper)
                .speed(0.01)
                .max_decimals(4),
        );
        ui.end_row();

        ui.label("Tolerance");
        ui.horizontal(|ui: &mut Ui| {
            ui.add(
                DragValue::new(&mut controls.tolerance)
                    .range(0.0..=f64::MAX)
                    .speed(0.01),
            );
            egui::ComboBox::from_id_salt("tolerance_unit")
                .selected_text(controls.unit.to_string())
                .show_ui(ui, |ui: &mut Ui| {
                    for unit in ToleranceUnit::SELECTABLE {
                        ui.selectable_value(&mut controls.unit, unit, unit.to_string());
                    }
                });
        });
        ui.end_row();
    });

    if ui.button("Update Ion Image").clicked() {
        commands.push(Command::UpdateIonImage(IonImageQuery {
            mz: controls.mz,
            tolerance: controls.tolerance,
            unit: controls.unit,
        }));
    }
}

/// Acquisition summary as a two-column table.
fn dataset_table(ui: &mut Ui, dataset: &dyn FrameSource) {
    let meta = dataset.metadata();
    let frames = dataset.frames();
    let (first, last) = frames.id_range().unwrap_or((0, 0));
    let rows = [
        ("Source", dataset.source_path().display().to_string()),
        ("Frames", frames.len().to_string()),
        ("Frame ids", format!("{first} – {last}")),
        ("m/z range", format!("{:.4} – {:.4}", meta.mz_lower, meta.mz_upper)),
        ("X", format!("{} – {}", meta.x_min, meta.x_max)),
        ("Y", format!("{} – {}", meta.y_min, meta.y_max)),
    ];

    TableBuilder::new(ui)
        .striped(true)
        .column(Column::auto())
        .column(Column::remainder())
        .body(|mut body| {
            for (key, value) in rows {
                body.row(18.0, |mut row| {
                    row.col(|ui: &mut Ui| {
                        ui.strong(key);
                    });
                    row.col(|ui: &mut Ui| {
                        ui.label(value);
                    });
                });
            }
        });
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &AppState, commands: &mut Vec<Command>) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open Bruker .d (TSF)…").clicked() {
                if let Some(command) = open_dataset_dialog() {
                    commands.push(command);
                }
                ui.close_menu();
            }
            if ui.button("Open demo dataset").clicked() {
                commands.push(Command::LoadDemo);
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some(ds) = &state.dataset {
            let shown = match state.mode {
                SpectrumMode::Frame(id) => format!("frame {id}"),
                SpectrumMode::Average(scope) => scope.to_string(),
            };
            ui.label(format!("{} frames loaded, showing {shown}", ds.frames().len()));
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

/// Modal shown after a failed load.
pub fn load_error_window(ctx: &egui::Context, state: &mut AppState) {
    let Some(message) = state.load_error.clone() else {
        return;
    };
    egui::Window::new("Could not open dataset")
        .collapsible(false)
        .resizable(false)
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .show(ctx, |ui: &mut Ui| {
            ui.label(message);
            ui.label("Select a Bruker .d directory containing TSF data.");
            if ui.button("OK").clicked() {
                state.load_error = None;
            }
        });
}

// ---------------------------------------------------------------------------
// Directory dialog
// ---------------------------------------------------------------------------

pub fn open_dataset_dialog() -> Option<Command> {
    rfd::FileDialog::new()
        .set_title("Open Bruker .d directory")
        .pick_folder()
        .map(Command::LoadDataset)
}
