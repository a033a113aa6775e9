use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use crate::error::{Result, ViewerError};

// ---------------------------------------------------------------------------
// Spectrum – paired m/z and intensity arrays
// ---------------------------------------------------------------------------

/// One profile spectrum (a frame's signal, or an aggregate of several).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Spectrum {
    /// m/z axis, ascending.
    pub mz: Vec<f64>,
    /// Intensity axis – same length as `mz`.
    pub intensity: Vec<f64>,
}

impl Spectrum {
    pub fn new(mz: Vec<f64>, intensity: Vec<f64>) -> Result<Self> {
        if mz.len() != intensity.len() {
            return Err(ViewerError::LengthMismatch {
                mz: mz.len(),
                intensity: intensity.len(),
            });
        }
        Ok(Self { mz, intensity })
    }

    pub fn len(&self) -> usize {
        self.mz.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mz.is_empty()
    }

    pub fn total_intensity(&self) -> f64 {
        self.intensity.iter().sum()
    }
}

// ---------------------------------------------------------------------------
// Acquisition-wide metadata
// ---------------------------------------------------------------------------

pub const KEY_MZ_LOWER: &str = "MzAcqRangeLower";
pub const KEY_MZ_UPPER: &str = "MzAcqRangeUpper";
pub const KEY_X_MIN: &str = "ImagingAreaMinXIndexPos";
pub const KEY_X_MAX: &str = "ImagingAreaMaxXIndexPos";
pub const KEY_Y_MIN: &str = "ImagingAreaMinYIndexPos";
pub const KEY_Y_MAX: &str = "ImagingAreaMaxYIndexPos";

/// Global bounds of an imaging acquisition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AcquisitionMetadata {
    pub mz_lower: f64,
    pub mz_upper: f64,
    pub x_min: i32,
    pub x_max: i32,
    pub y_min: i32,
    pub y_max: i32,
}

impl AcquisitionMetadata {
    /// Coerce the string-valued `GlobalMetadata` table into typed bounds.
    pub fn from_key_values(values: &BTreeMap<String, String>) -> Result<Self> {
        Ok(Self {
            mz_lower: parse_key(values, KEY_MZ_LOWER)?,
            mz_upper: parse_key(values, KEY_MZ_UPPER)?,
            x_min: parse_key(values, KEY_X_MIN)?,
            x_max: parse_key(values, KEY_X_MAX)?,
            y_min: parse_key(values, KEY_Y_MIN)?,
            y_max: parse_key(values, KEY_Y_MAX)?,
        })
    }

    pub fn mz_range(&self) -> (f64, f64) {
        (self.mz_lower, self.mz_upper)
    }

    /// `(x_min, x_max, y_min, y_max)`.
    pub fn imaging_area(&self) -> (i32, i32, i32, i32) {
        (self.x_min, self.x_max, self.y_min, self.y_max)
    }

    /// Ion image width in pixels.
    pub fn width(&self) -> usize {
        (self.x_max - self.x_min + 1).max(0) as usize
    }

    /// Ion image height in pixels.
    pub fn height(&self) -> usize {
        (self.y_max - self.y_min + 1).max(0) as usize
    }

    pub fn contains_pixel(&self, x: i32, y: i32) -> bool {
        (self.x_min..=self.x_max).contains(&x) && (self.y_min..=self.y_max).contains(&y)
    }

    pub fn clamp_mz(&self, mz: f64) -> f64 {
        mz.clamp(self.mz_lower, self.mz_upper.max(self.mz_lower))
    }
}

fn parse_key<T: std::str::FromStr>(values: &BTreeMap<String, String>, key: &str) -> Result<T> {
    let raw = values
        .get(key)
        .ok_or_else(|| ViewerError::MissingMetadata(key.to_string()))?;
    // Pixel bounds are sometimes stored as "12.0".
    raw.trim()
        .parse::<T>()
        .or_else(|_| {
            raw.trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.fract() == 0.0)
                .and_then(|v| format!("{v:.0}").parse::<T>().ok())
                .ok_or(())
        })
        .map_err(|_| ViewerError::InvalidMetadata {
            key: key.to_string(),
            value: raw.clone(),
        })
}

// ---------------------------------------------------------------------------
// Frame table – frame id ↔ pixel coordinate
// ---------------------------------------------------------------------------

/// One acquired pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameInfo {
    pub id: u32,
    pub x: i32,
    pub y: i32,
}

/// Frame ids in acquisition order with lookups in both directions.
#[derive(Debug, Clone, Default)]
pub struct FrameTable {
    frames: Vec<FrameInfo>,
    by_id: HashMap<u32, usize>,
    by_coord: HashMap<(i32, i32), u32>,
}

impl FrameTable {
    pub fn new(mut frames: Vec<FrameInfo>) -> Self {
        frames.sort_by_key(|f| f.id);
        let by_id = frames.iter().enumerate().map(|(i, f)| (f.id, i)).collect();
        let mut by_coord = HashMap::with_capacity(frames.len());
        for f in &frames {
            if let Some(previous) = by_coord.insert((f.x, f.y), f.id) {
                log::warn!(
                    "Frames {previous} and {} share pixel ({}, {}); keeping {}",
                    f.id,
                    f.x,
                    f.y,
                    f.id
                );
            }
        }
        Self {
            frames,
            by_id,
            by_coord,
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FrameInfo> {
        self.frames.iter()
    }

    pub fn ids(&self) -> Vec<u32> {
        self.frames.iter().map(|f| f.id).collect()
    }

    /// Smallest and largest frame id.
    pub fn id_range(&self) -> Option<(u32, u32)> {
        Some((self.frames.first()?.id, self.frames.last()?.id))
    }

    pub fn coord_of(&self, frame_id: u32) -> Option<(i32, i32)> {
        self.by_id
            .get(&frame_id)
            .map(|&i| (self.frames[i].x, self.frames[i].y))
    }

    pub fn frame_at(&self, x: i32, y: i32) -> Option<u32> {
        self.by_coord.get(&(x, y)).copied()
    }
}

// ---------------------------------------------------------------------------
// FrameSource – the decoded dataset seen by every builder
// ---------------------------------------------------------------------------

/// A decoded imaging acquisition. Spectra are fetched per access, never
/// materialised up front.
pub trait FrameSource {
    /// Storage location; doubles as the dataset's identity.
    fn source_path(&self) -> &Path;

    fn metadata(&self) -> &AcquisitionMetadata;

    fn frames(&self) -> &FrameTable;

    fn read_profile_spectrum(&self, frame_id: u32) -> Result<Spectrum>;

    /// Pixel of `frame_id`, or `None` outside the dataset or imaging area.
    fn coordinate_of(&self, frame_id: u32) -> Option<(i32, i32)> {
        self.frames()
            .coord_of(frame_id)
            .filter(|&(x, y)| self.metadata().contains_pixel(x, y))
    }

    /// Frame acquired at absolute pixel `(x, y)`.
    fn frame_at(&self, x: i32, y: i32) -> Option<u32> {
        if !self.metadata().contains_pixel(x, y) {
            return None;
        }
        self.frames().frame_at(x, y)
    }
}

// ---------------------------------------------------------------------------
// MemoryDataset – a fully materialised FrameSource
// ---------------------------------------------------------------------------

/// Keeps every spectrum in memory; backs the demo dataset and tests.
#[derive(Debug, Clone)]
pub struct MemoryDataset {
    path: PathBuf,
    metadata: AcquisitionMetadata,
    table: FrameTable,
    spectra: HashMap<u32, Spectrum>,
}

impl MemoryDataset {
    pub fn new(
        path: impl Into<PathBuf>,
        metadata: AcquisitionMetadata,
        frames: Vec<(FrameInfo, Spectrum)>,
    ) -> Self {
        let table = FrameTable::new(frames.iter().map(|(info, _)| *info).collect());
        let spectra = frames
            .into_iter()
            .map(|(info, spectrum)| (info.id, spectrum))
            .collect();
        Self {
            path: path.into(),
            metadata,
            table,
            spectra,
        }
    }
}

impl FrameSource for MemoryDataset {
    fn source_path(&self) -> &Path {
        &self.path
    }

    fn metadata(&self) -> &AcquisitionMetadata {
        &self.metadata
    }

    fn frames(&self) -> &FrameTable {
        &self.table
    }

    fn read_profile_spectrum(&self, frame_id: u32) -> Result<Spectrum> {
        self.spectra
            .get(&frame_id)
            .cloned()
            .ok_or(ViewerError::FrameOutOfRange(frame_id))
    }
}
