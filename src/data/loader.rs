use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

use super::model::FrameSource;
use super::tsf::TsfDataset;
use crate::config::ViewerConfig;
use crate::error::{Result, ViewerError};

// ---------------------------------------------------------------------------
// Schema detection
// ---------------------------------------------------------------------------

/// Bruker raw-data sub-format of a `.d` directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schema {
    Tdf,
    Tsf,
    Baf,
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Schema::Tdf => write!(f, "TDF"),
            Schema::Tsf => write!(f, "TSF"),
            Schema::Baf => write!(f, "BAF"),
        }
    }
}

/// Classify a `.d` directory by the raw-data extensions it contains.
/// Exactly one of `.tdf`, `.tsf`, `.baf` must be present; anything else
/// (none, or a mix) is `None`.
pub fn detect_schema(dir: &Path) -> Result<Option<Schema>> {
    let mut extensions = BTreeSet::new();
    collect_extensions(dir, &mut extensions)?;

    let has = |ext: &str| extensions.contains(ext);
    Ok(match (has("tdf"), has("tsf"), has("baf")) {
        (true, false, false) => Some(Schema::Tdf),
        (false, true, false) => Some(Schema::Tsf),
        (false, false, true) => Some(Schema::Baf),
        _ => None,
    })
}

fn collect_extensions(dir: &Path, out: &mut BTreeSet<String>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_extensions(&path, out)?;
        } else if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            out.insert(ext.to_string());
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Check that `path` is a `.d` directory holding TSF data.
pub fn validate_dataset_dir(path: &Path) -> Result<()> {
    let is_dot_d = path.extension().and_then(|e| e.to_str()) == Some("d");
    if !is_dot_d || !path.is_dir() {
        return Err(ViewerError::NotDotD(path.to_path_buf()));
    }

    match detect_schema(path)? {
        Some(Schema::Tsf) => Ok(()),
        Some(other) => Err(ViewerError::UnsupportedSchema {
            path: path.to_path_buf(),
            found: other.to_string(),
        }),
        None => Err(ViewerError::UnknownSchema(path.to_path_buf())),
    }
}

/// Open a Bruker `.d` TSF dataset.
pub fn open_dataset(path: &Path, config: &ViewerConfig) -> Result<Box<dyn FrameSource>> {
    validate_dataset_dir(path)?;
    let dataset = TsfDataset::open(path, config)?;
    Ok(Box::new(dataset))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn dot_d_with(files: &[&str]) -> tempfile::TempDir {
        let root = tempfile::Builder::new().suffix(".d").tempdir().unwrap();
        for f in files {
            let p = root.path().join(f);
            if let Some(parent) = p.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(p, b"").unwrap();
        }
        root
    }

    #[test]
    fn detects_each_schema() {
        let tsf = dot_d_with(&["analysis.tsf", "analysis.tsf_bin"]);
        assert_eq!(detect_schema(tsf.path()).unwrap(), Some(Schema::Tsf));

        let tdf = dot_d_with(&["analysis.tdf", "analysis.tdf_bin"]);
        assert_eq!(detect_schema(tdf.path()).unwrap(), Some(Schema::Tdf));

        let baf = dot_d_with(&["nested/analysis.baf"]);
        assert_eq!(detect_schema(baf.path()).unwrap(), Some(Schema::Baf));
    }

    #[test]
    fn mixed_or_empty_directories_are_unclassified() {
        let mixed = dot_d_with(&["analysis.tsf", "other/analysis.tdf"]);
        assert_eq!(detect_schema(mixed.path()).unwrap(), None);

        let empty = dot_d_with(&["readme.txt"]);
        assert_eq!(detect_schema(empty.path()).unwrap(), None);
    }

    #[test]
    fn only_tsf_dot_d_directories_validate() {
        let tsf = dot_d_with(&["analysis.tsf"]);
        assert!(validate_dataset_dir(tsf.path()).is_ok());

        let tdf = dot_d_with(&["analysis.tdf"]);
        let err = validate_dataset_dir(tdf.path()).unwrap_err();
        assert!(matches!(err, ViewerError::UnsupportedSchema { ref found, .. } if found == "TDF"));

        let plain = tempfile::tempdir().unwrap();
        fs::write(plain.path().join("analysis.tsf"), b"").unwrap();
        assert!(matches!(
            validate_dataset_dir(plain.path()),
            Err(ViewerError::NotDotD(_))
        ));
    }
}
