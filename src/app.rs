use eframe::egui::{self, TextureHandle, TextureOptions};

use crate::color::ion_image_to_color_image;
use crate::config::ViewerConfig;
use crate::state::{AppState, Command};
use crate::ui::{panels, plot};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct TsfViewerApp {
    pub state: AppState,
    /// Uploaded ion image and the `image_generation` it was built from.
    ion_texture: Option<(u64, TextureHandle)>,
    /// `view_generation` the spectrum plot's zoom belongs to.
    plotted_view_generation: u64,
}

impl TsfViewerApp {
    pub fn new(config: ViewerConfig) -> Self {
        Self {
            state: AppState::new(config),
            ion_texture: None,
            plotted_view_generation: 0,
        }
    }

    /// True once per freshly built spectrum view.
    fn take_zoom_reset(&mut self) -> bool {
        let stale = self.plotted_view_generation != self.state.view_generation;
        self.plotted_view_generation = self.state.view_generation;
        stale
    }

    fn sync_ion_texture(&mut self, ctx: &egui::Context) {
        let Some(image) = &self.state.ion_image else {
            self.ion_texture = None;
            return;
        };
        let generation = self.state.image_generation;
        if matches!(&self.ion_texture, Some((built, _)) if *built == generation) {
            return;
        }
        let texture = ctx.load_texture("ion_image", ion_image_to_color_image(image), TextureOptions::NEAREST);
        self.ion_texture = Some((generation, texture));
    }
}

impl eframe::App for TsfViewerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let mut commands: Vec<Command> = Vec::new();
        self.sync_ion_texture(ctx);
        let reset_zoom = self.take_zoom_reset();

        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &self.state, &mut commands);
        });

        // ---- Left side panel: controls ----
        egui::SidePanel::left("control_panel")
            .default_width(260.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state, &mut commands);
            });

        // ---- Bottom panel: spectrum ----
        egui::TopBottomPanel::bottom("spectrum_panel")
            .resizable(true)
            .default_height(320.0)
            .show(ctx, |ui| {
                plot::spectral_plot(ui, &self.state, reset_zoom, &mut commands);
            });

        // ---- Central panel: ion image ----
        egui::CentralPanel::default().show(ctx, |ui| {
            let texture = self.ion_texture.as_ref().map(|(_, t)| t);
            plot::ion_image_plot(ui, &self.state, texture, &mut commands);
        });

        panels::load_error_window(ctx, &mut self.state);

        // One event, one computation: commands run after the frame is laid out.
        for command in commands {
            self.state.dispatch(command);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::average::AveragingScope;

    #[test]
    fn plot_zoom_resets_once_per_fresh_view() {
        let mut app = TsfViewerApp::new(ViewerConfig::default());
        assert!(!app.take_zoom_reset());

        app.state.dispatch(Command::LoadDemo);
        assert!(app.take_zoom_reset());
        assert!(!app.take_zoom_reset());

        app.state.dispatch(Command::ChangeVisibleRange([300.0, 310.0]));
        app.state.dispatch(Command::SelectFrame(40));
        assert!(!app.take_zoom_reset());

        app.state.dispatch(Command::ShowAverage(AveragingScope::Full));
        assert!(app.take_zoom_reset());
    }
}
