use std::path::PathBuf;
use std::sync::Arc;

use crate::config::ViewerConfig;
use crate::data::average::{scoped_average, AverageCache, AveragingScope, ParquetAverageCache};
use crate::data::filter::ToleranceUnit;
use crate::data::ion_image::{build_ion_image, IonImage, IonImageQuery};
use crate::data::loader::open_dataset;
use crate::data::model::{FrameSource, Spectrum};
use crate::data::synthetic::demo_dataset;
use crate::error::{Result, ViewerError};
use crate::ui::resample::SpectrumView;

// ---------------------------------------------------------------------------
// User requests
// ---------------------------------------------------------------------------

/// One user action. Each variant is handled by exactly one method.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    LoadDataset(PathBuf),
    LoadDemo,
    ShowAverage(AveragingScope),
    /// Back to the per-frame view at the current frame selector value.
    ShowFrameSpectrum,
    SelectFrame(u32),
    /// Absolute pixel coordinate.
    SelectCoordinate { x: i32, y: i32 },
    /// Zero-based cell of the ion image, e.g. from a click.
    SelectImagePixel { column: i32, row: i32 },
    UpdateIonImage(IonImageQuery),
    SelectMzFromClick(f64),
    ChangeVisibleRange([f64; 2]),
}

/// What the spectrum panel currently shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpectrumMode {
    Frame(u32),
    Average(AveragingScope),
}

/// Values of the input widgets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Controls {
    pub mz: f64,
    pub tolerance: f64,
    pub unit: ToleranceUnit,
    pub frame: u32,
    pub x: i32,
    pub y: i32,
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full session state, independent of rendering.
pub struct AppState {
    pub config: ViewerConfig,

    /// Loaded dataset (None until the user opens one).
    pub dataset: Option<Box<dyn FrameSource>>,

    /// Memoised averages, keyed by dataset location and scope.
    cache: Box<dyn AverageCache>,

    pub controls: Controls,

    pub mode: SpectrumMode,

    /// Spectrum currently plotted, with its zoom state.
    pub spectrum_view: Option<SpectrumView>,

    pub ion_image: Option<IonImage>,

    /// Bumped whenever `ion_image` is replaced so the UI can re-upload it.
    pub image_generation: u64,

    /// Bumped whenever a spectrum view starts zoomed out, so the plot
    /// drops its own zoom.
    pub view_generation: u64,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,

    /// Failure of the last load attempt, shown as a modal.
    pub load_error: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(ViewerConfig::default())
    }
}

impl AppState {
    pub fn new(config: ViewerConfig) -> Self {
        let controls = Controls {
            mz: 0.0,
            tolerance: config.default_tolerance,
            unit: ToleranceUnit::from(config.default_tolerance_unit.as_str()),
            frame: 1,
            x: 0,
            y: 0,
        };
        Self {
            cache: Box::new(ParquetAverageCache::new(config.cache_averages)),
            config,
            dataset: None,
            controls,
            mode: SpectrumMode::Frame(1),
            spectrum_view: None,
            ion_image: None,
            image_generation: 0,
            view_generation: 0,
            status_message: None,
            load_error: None,
        }
    }

    pub fn has_dataset(&self) -> bool {
        self.dataset.is_some()
    }

    /// Run one command. Failures end up in `status_message` (or
    /// `load_error` for loads); the previous state is left untouched.
    pub fn dispatch(&mut self, command: Command) {
        log::debug!("Dispatching {command:?}");
        let result = match command {
            Command::LoadDataset(path) => {
                if let Err(e) = self.load_dataset(path.clone()) {
                    log::error!("Failed to load {}: {e}", path.display());
                    self.load_error = Some(e.to_string());
                }
                return;
            }
            Command::LoadDemo => self.set_dataset(Box::new(demo_dataset())),
            Command::ShowAverage(scope) => self.show_average(scope),
            Command::ShowFrameSpectrum => self.show_frame_spectrum(),
            Command::SelectFrame(id) => self.select_frame(id),
            Command::SelectCoordinate { x, y } => self.select_coordinate(x, y),
            Command::SelectImagePixel { column, row } => self.select_image_pixel(column, row),
            Command::UpdateIonImage(query) => self.update_ion_image(query),
            Command::SelectMzFromClick(mz) => {
                self.select_mz_from_click(mz);
                Ok(())
            }
            Command::ChangeVisibleRange(range) => {
                if let Some(view) = &mut self.spectrum_view {
                    view.set_visible_range(range);
                }
                Ok(())
            }
        };
        if let Err(e) = result {
            log::error!("{e}");
            self.status_message = Some(format!("Error: {e}"));
        }
    }

    pub fn load_dataset(&mut self, path: PathBuf) -> Result<()> {
        let dataset = open_dataset(&path, &self.config)?;
        self.set_dataset(dataset)
    }

    /// Ingest a newly opened dataset: show its first frame and reset the
    /// controls to the dataset's bounds.
    pub fn set_dataset(&mut self, dataset: Box<dyn FrameSource>) -> Result<()> {
        let (first, _) = dataset
            .frames()
            .id_range()
            .ok_or(ViewerError::FrameOutOfRange(1))?;
        let spectrum = dataset.read_profile_spectrum(first)?;
        let (x, y) = dataset
            .coordinate_of(first)
            .ok_or(ViewerError::FrameOutOfRange(first))?;
        let meta = *dataset.metadata();

        self.controls.mz = meta.mz_lower;
        self.controls.frame = first;
        self.controls.x = x;
        self.controls.y = y;
        self.show_view(frame_title(first, x, y), spectrum, false);
        self.mode = SpectrumMode::Frame(first);
        self.replace_ion_image(IonImage::blank(meta.width(), meta.height()));
        self.dataset = Some(dataset);
        self.status_message = None;
        self.load_error = None;
        Ok(())
    }

    pub fn show_average(&mut self, scope: AveragingScope) -> Result<()> {
        let Some(dataset) = &self.dataset else {
            return Ok(());
        };
        let spectrum = scoped_average(
            dataset.as_ref(),
            scope,
            self.config.estimate_fraction,
            self.cache.as_mut(),
        )?;
        self.show_view(capitalize(&scope.to_string()), spectrum, false);
        self.mode = SpectrumMode::Average(scope);
        self.status_message = None;
        Ok(())
    }

    pub fn show_frame_spectrum(&mut self) -> Result<()> {
        self.select_frame(self.controls.frame)
    }

    /// Show one frame; the id is clamped to the dataset's frame range.
    pub fn select_frame(&mut self, frame_id: u32) -> Result<()> {
        let Some(dataset) = &self.dataset else {
            return Ok(());
        };
        let Some((lo, hi)) = dataset.frames().id_range() else {
            return Ok(());
        };
        let frame_id = frame_id.clamp(lo, hi);
        let (x, y) = dataset
            .coordinate_of(frame_id)
            .ok_or(ViewerError::FrameOutOfRange(frame_id))?;
        let spectrum = dataset.read_profile_spectrum(frame_id)?;

        // Moving between frames keeps the current zoom.
        let keep_zoom = matches!(self.mode, SpectrumMode::Frame(_));
        self.show_view(frame_title(frame_id, x, y), spectrum, keep_zoom);
        self.controls.frame = frame_id;
        self.controls.x = x;
        self.controls.y = y;
        self.mode = SpectrumMode::Frame(frame_id);
        self.status_message = None;
        Ok(())
    }

    /// Show the frame at an absolute pixel, clamped to the imaging area.
    pub fn select_coordinate(&mut self, x: i32, y: i32) -> Result<()> {
        let Some(dataset) = &self.dataset else {
            return Ok(());
        };
        let meta = dataset.metadata();
        let x = x.clamp(meta.x_min, meta.x_max);
        let y = y.clamp(meta.y_min, meta.y_max);
        let frame_id = dataset
            .frame_at(x, y)
            .ok_or(ViewerError::NoFrameAtCoordinate { x, y })?;
        self.select_frame(frame_id)
    }

    /// Ion image cells are offsets from the imaging area's minimum corner.
    pub fn select_image_pixel(&mut self, column: i32, row: i32) -> Result<()> {
        let Some(dataset) = &self.dataset else {
            return Ok(());
        };
        let meta = dataset.metadata();
        let (x, y) = (meta.x_min + column, meta.y_min + row);
        self.select_coordinate(x, y)
    }

    pub fn update_ion_image(&mut self, query: IonImageQuery) -> Result<()> {
        let Some(dataset) = &self.dataset else {
            return Ok(());
        };
        let image = build_ion_image(dataset.as_ref(), &query)?;
        self.controls.mz = query.mz;
        self.controls.tolerance = query.tolerance;
        self.controls.unit = query.unit;
        self.replace_ion_image(image);
        self.status_message = None;
        Ok(())
    }

    /// Take the target m/z from a click on the spectrum.
    pub fn select_mz_from_click(&mut self, mz: f64) {
        let scale = 10f64.powi(self.config.mz_click_decimals as i32);
        let rounded = (mz * scale).round() / scale;
        self.controls.mz = match &self.dataset {
            Some(dataset) => dataset.metadata().clamp_mz(rounded),
            None => rounded,
        };
    }

    fn replace_ion_image(&mut self, image: IonImage) {
        self.ion_image = Some(image);
        self.image_generation += 1;
    }

    /// Replace the plotted spectrum, either resuming the current view state
    /// or starting fully zoomed out.
    fn show_view(&mut self, title: String, spectrum: Spectrum, keep_zoom: bool) {
        let spectrum = Arc::new(spectrum);
        let resumed = match &self.spectrum_view {
            Some(view) if keep_zoom => Some(view.state().clone()),
            _ => None,
        };
        let view = match resumed {
            Some(state) => SpectrumView::resume(title, spectrum, state),
            None => {
                self.view_generation += 1;
                SpectrumView::new(title, spectrum, self.config.max_plot_points)
            }
        };
        self.spectrum_view = Some(view);
    }
}

fn frame_title(frame_id: u32, x: i32, y: i32) -> String {
    format!("Frame {frame_id} ({x}, {y})")
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
