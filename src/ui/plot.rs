use eframe::egui::{Color32, TextureHandle, Ui};
use egui_plot::{Line, Plot, PlotImage, PlotPoint, PlotPoints, VLine};

use crate::state::{AppState, Command};

// ---------------------------------------------------------------------------
// Spectrum plot
// ---------------------------------------------------------------------------

/// Render the current spectrum. Pan/zoom re-samples the visible range; a
/// click picks the target m/z. `reset_zoom` discards the plot's remembered
/// bounds so a freshly built view is shown fully zoomed out.
pub fn spectral_plot(ui: &mut Ui, state: &AppState, reset_zoom: bool, commands: &mut Vec<Command>) {
    let view = match &state.spectrum_view {
        Some(view) => view,
        None => {
            ui.centered_and_justified(|ui: &mut Ui| {
                ui.heading("Open a dataset to view spectra  (File → Open…)");
            });
            return;
        }
    };

    ui.label(format!(
        "{}: {} of {} points",
        view.title,
        view.points().len(),
        view.spectrum().len()
    ));

    let mut plot = Plot::new("spectral_plot")
        .legend(egui_plot::Legend::default())
        .x_axis_label("m/z")
        .y_axis_label("Intensity")
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true);
    if reset_zoom {
        plot = plot.reset();
    }

    let response = plot.show(ui, |plot_ui| {
        let points = PlotPoints::from(view.points().to_vec());
        plot_ui.line(
            Line::new(points)
                .name(&view.title)
                .color(Color32::LIGHT_BLUE)
                .width(1.5),
        );
        plot_ui.vline(VLine::new(state.controls.mz).color(Color32::from_rgb(230, 120, 40)));

        let bounds = plot_ui.plot_bounds();
        let clicked = if plot_ui.response().clicked() {
            plot_ui.pointer_coordinate()
        } else {
            None
        };
        ([bounds.min()[0], bounds.max()[0]], clicked)
    });

    let (visible, clicked) = response.inner;
    if visible != view.state().visible_range {
        commands.push(Command::ChangeVisibleRange(visible));
    }
    if let Some(point) = clicked {
        commands.push(Command::SelectMzFromClick(point.x));
    }
}

// ---------------------------------------------------------------------------
// Ion image
// ---------------------------------------------------------------------------

/// Render the ion image texture; a click selects the pixel's frame.
pub fn ion_image_plot(
    ui: &mut Ui,
    state: &AppState,
    texture: Option<&TextureHandle>,
    commands: &mut Vec<Command>,
) {
    let (image, texture) = match (&state.ion_image, texture) {
        (Some(image), Some(texture)) => (image, texture),
        _ => {
            ui.centered_and_justified(|ui: &mut Ui| {
                ui.label("No ion image");
            });
            return;
        }
    };

    let (w, h) = (image.width as f64, image.height as f64);
    let (_, upper) = image.display_range();
    ui.label(format!("Intensity scale 0 – {upper:.3e} (viridis)"));

    let response = Plot::new("ion_image")
        .data_aspect(1.0)
        .show_axes(false)
        .show_grid(false)
        .allow_boxed_zoom(true)
        .show(ui, |plot_ui| {
            plot_ui.image(PlotImage::new(
                texture.id(),
                PlotPoint::new(w / 2.0, h / 2.0),
                [w as f32, h as f32],
            ));

            // Row 0 is drawn at the top of the plot.
            let cell = plot_ui.pointer_coordinate().and_then(|p| {
                let column = p.x.floor();
                let row = (h - p.y).floor();
                (column >= 0.0 && row >= 0.0 && column < w && row < h)
                    .then_some((column as i32, row as i32))
            });
            (cell, plot_ui.response().clicked())
        });

    let (cell, clicked) = response.inner;
    if let Some((column, row)) = cell {
        let value = image.get(column as usize, row as usize).unwrap_or(0.0);
        response.response.on_hover_text(format!(
            "x {}  y {}  intensity {value:.1}",
            column + state.dataset.as_ref().map_or(0, |d| d.metadata().x_min),
            row + state.dataset.as_ref().map_or(0, |d| d.metadata().y_min),
        ));
        if clicked {
            commands.push(Command::SelectImagePixel { column, row });
        }
    }
}
