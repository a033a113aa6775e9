use std::path::PathBuf;

use thiserror::Error;

// ---------------------------------------------------------------------------
// Domain errors
// ---------------------------------------------------------------------------

/// Everything that can go wrong between a user action and its result.
#[derive(Debug, Error)]
pub enum ViewerError {
    #[error("{0} is not a Bruker .d directory")]
    NotDotD(PathBuf),

    #[error("{path} contains {found} data; only TSF datasets can be opened")]
    UnsupportedSchema { path: PathBuf, found: String },

    #[error("could not determine the raw data schema of {0}")]
    UnknownSchema(PathBuf),

    #[error("global metadata is missing key '{0}'")]
    MissingMetadata(String),

    #[error("global metadata key '{key}' has non-numeric value '{value}'")]
    InvalidMetadata { key: String, value: String },

    #[error("frame {0} is outside the dataset")]
    FrameOutOfRange(u32),

    #[error("no frame was acquired at pixel ({x}, {y})")]
    NoFrameAtCoordinate { x: i32, y: i32 },

    #[error("m/z array has {mz} values but intensity array has {intensity}")]
    LengthMismatch { mz: usize, intensity: usize },

    /// A frame does not share the m/z axis of the first averaged frame.
    #[error("frame {frame} has {found} points but the shared m/z axis has {expected}")]
    AxisMismatch {
        frame: u32,
        expected: usize,
        found: usize,
    },

    #[error("cannot average an empty frame selection")]
    EmptySelection,

    #[error("timsdata: {0}")]
    Sdk(String),

    #[error("loading timsdata library: {0}")]
    Library(#[from] libloading::Error),

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error(transparent)]
    Arrow(#[from] arrow::error::ArrowError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ViewerError>;
