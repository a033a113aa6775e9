use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use arrow::array::{Array, Float64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;

use super::model::{FrameSource, Spectrum};
use crate::error::{Result, ViewerError};

// ---------------------------------------------------------------------------
// Averaging scope
// ---------------------------------------------------------------------------

/// Which frames contribute to an average.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AveragingScope {
    /// Evenly strided subsample, for a quick preview.
    Estimate,
    /// Every frame in the dataset.
    Full,
}

impl AveragingScope {
    /// Name of the persisted cache entry.
    pub fn cache_name(self) -> &'static str {
        match self {
            AveragingScope::Estimate => "average_estimate",
            AveragingScope::Full => "average_full",
        }
    }

    /// Pick the contributing frame ids. The estimate keeps every
    /// `n / (n * fraction)`-th id (every 5th for the default 0.2).
    pub fn select_frames(self, frame_ids: &[u32], fraction: f64) -> Vec<u32> {
        match self {
            AveragingScope::Full => frame_ids.to_vec(),
            AveragingScope::Estimate => {
                let n = frame_ids.len() as f64;
                let stride = (n / (n * fraction)) as usize;
                frame_ids.iter().step_by(stride.max(1)).copied().collect()
            }
        }
    }
}

impl fmt::Display for AveragingScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AveragingScope::Estimate => write!(f, "average estimate"),
            AveragingScope::Full => write!(f, "full average"),
        }
    }
}

// ---------------------------------------------------------------------------
// Average spectrum
// ---------------------------------------------------------------------------

/// Mean profile spectrum over `frame_ids`.
///
/// The first frame's m/z axis is reused for the result; every other frame
/// must have the same number of points, otherwise the dataset is treated as
/// corrupt and [`ViewerError::AxisMismatch`] is returned. Repeated ids count
/// once per occurrence.
pub fn average_spectrum(source: &dyn FrameSource, frame_ids: &[u32]) -> Result<Spectrum> {
    let (&first, rest) = frame_ids.split_first().ok_or(ViewerError::EmptySelection)?;

    let Spectrum { mz, mut intensity } = source.read_profile_spectrum(first)?;
    for &frame_id in rest {
        let spectrum = source.read_profile_spectrum(frame_id)?;
        if spectrum.intensity.len() != intensity.len() {
            return Err(ViewerError::AxisMismatch {
                frame: frame_id,
                expected: intensity.len(),
                found: spectrum.intensity.len(),
            });
        }
        for (acc, v) in intensity.iter_mut().zip(&spectrum.intensity) {
            *acc += v;
        }
    }

    let count = frame_ids.len() as f64;
    intensity.iter_mut().for_each(|v| *v /= count);
    Spectrum::new(mz, intensity)
}

/// Average for a named scope, memoised through `cache`.
pub fn scoped_average(
    source: &dyn FrameSource,
    scope: AveragingScope,
    estimate_fraction: f64,
    cache: &mut dyn AverageCache,
) -> Result<Spectrum> {
    let key = CacheKey {
        dataset: source.source_path().to_path_buf(),
        scope,
    };
    get_or_compute(cache, &key, || {
        let started = Instant::now();
        let frame_ids = scope.select_frames(&source.frames().ids(), estimate_fraction);
        let spectrum = average_spectrum(source, &frame_ids)?;
        log::info!(
            "Computed {scope} over {} frames in {:.2?}",
            frame_ids.len(),
            started.elapsed()
        );
        Ok(spectrum)
    })
}

// ---------------------------------------------------------------------------
// Average cache
// ---------------------------------------------------------------------------

/// Identity of a cached average: dataset location plus scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub dataset: PathBuf,
    pub scope: AveragingScope,
}

/// Storage for averaged spectra. Entries never expire; a stored average is
/// reused until something deletes it.
pub trait AverageCache {
    fn load(&mut self, key: &CacheKey) -> Result<Option<Spectrum>>;
    fn store(&mut self, key: &CacheKey, spectrum: &Spectrum) -> Result<()>;
}

/// Return the cached entry for `key`, or compute and store it.
///
/// Cache failures never fail the request: an unreadable entry is recomputed
/// and a failed write only costs the memoisation.
pub fn get_or_compute<F>(cache: &mut dyn AverageCache, key: &CacheKey, compute: F) -> Result<Spectrum>
where
    F: FnOnce() -> Result<Spectrum>,
{
    match cache.load(key) {
        Ok(Some(spectrum)) => {
            log::info!("Using cached {} for {}", key.scope, key.dataset.display());
            return Ok(spectrum);
        }
        Ok(None) => {}
        Err(e) => log::warn!("Ignoring unreadable cached {}: {e}", key.scope),
    }

    let spectrum = compute()?;
    if let Err(e) = cache.store(key, &spectrum) {
        log::warn!("Could not cache {} for {}: {e}", key.scope, key.dataset.display());
    }
    Ok(spectrum)
}

/// Memoises in memory and, when enabled, in `<dataset>/<scope>.parquet`.
#[derive(Debug, Default)]
pub struct ParquetAverageCache {
    memory: HashMap<CacheKey, Spectrum>,
    persist: bool,
}

impl ParquetAverageCache {
    pub fn new(persist: bool) -> Self {
        Self {
            memory: HashMap::new(),
            persist,
        }
    }

    pub fn entry_path(key: &CacheKey) -> PathBuf {
        key.dataset.join(format!("{}.parquet", key.scope.cache_name()))
    }
}

impl AverageCache for ParquetAverageCache {
    fn load(&mut self, key: &CacheKey) -> Result<Option<Spectrum>> {
        if let Some(spectrum) = self.memory.get(key) {
            return Ok(Some(spectrum.clone()));
        }
        if !self.persist {
            return Ok(None);
        }
        let path = Self::entry_path(key);
        if !path.is_file() {
            return Ok(None);
        }
        let spectrum = read_spectrum(&path)?;
        self.memory.insert(key.clone(), spectrum.clone());
        Ok(Some(spectrum))
    }

    fn store(&mut self, key: &CacheKey, spectrum: &Spectrum) -> Result<()> {
        self.memory.insert(key.clone(), spectrum.clone());
        // In-memory datasets have no directory to write next to.
        if self.persist && key.dataset.is_dir() {
            write_spectrum(&Self::entry_path(key), spectrum)?;
        }
        Ok(())
    }
}

// -- Parquet helpers --

fn spectrum_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("mz", DataType::Float64, false),
        Field::new("intensity", DataType::Float64, false),
    ]))
}

fn write_spectrum(path: &Path, spectrum: &Spectrum) -> Result<()> {
    let schema = spectrum_schema();
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Float64Array::from(spectrum.mz.clone())),
            Arc::new(Float64Array::from(spectrum.intensity.clone())),
        ],
    )?;

    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, schema, None)?;
    writer.write(&batch)?;
    writer.close()?;
    log::debug!("Wrote {} points to {}", spectrum.len(), path.display());
    Ok(())
}

fn read_spectrum(path: &Path) -> Result<Spectrum> {
    let file = File::open(path)?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;

    let mut mz = Vec::new();
    let mut intensity = Vec::new();
    for batch_result in reader {
        let batch = batch_result?;
        mz.extend_from_slice(f64_column(&batch, "mz")?);
        intensity.extend_from_slice(f64_column(&batch, "intensity")?);
    }
    Spectrum::new(mz, intensity)
}

fn f64_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a [f64]> {
    let col = batch
        .column_by_name(name)
        .ok_or_else(|| ArrowError::SchemaError(format!("missing column '{name}'")))?;
    let values = col
        .as_any()
        .downcast_ref::<Float64Array>()
        .ok_or_else(|| ArrowError::CastError(format!("column '{name}' is {:?}, expected Float64", col.data_type())))?;
    Ok(&values.values()[..])
}
