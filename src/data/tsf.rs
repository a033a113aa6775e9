use std::collections::BTreeMap;
use std::ffi::CString;
use std::os::raw::{c_char, c_double};
use std::path::{Path, PathBuf};

use libloading::{Library, Symbol};
use rusqlite::Connection;

use super::model::{AcquisitionMetadata, FrameInfo, FrameSource, FrameTable, Spectrum};
use crate::config::ViewerConfig;
use crate::error::{Result, ViewerError};

const ANALYSIS_DB: &str = "analysis.tsf";
const INITIAL_PROFILE_BUFFER: usize = 1 << 16;

// ---------------------------------------------------------------------------
// SQLite metadata (analysis.tsf)
// ---------------------------------------------------------------------------

/// `GlobalMetadata` as raw key/value strings.
pub fn read_global_metadata(conn: &Connection) -> Result<BTreeMap<String, String>> {
    let mut stmt = conn.prepare("SELECT Key, Value FROM GlobalMetadata")?;
    let rows = stmt.query_map([], |row| {
        let key: String = row.get(0)?;
        // Values are untyped in the schema; read whatever SQLite stored.
        let value: rusqlite::types::Value = row.get(1)?;
        Ok((key, value))
    })?;

    let mut values = BTreeMap::new();
    for row in rows {
        let (key, value) = row?;
        let text = match value {
            rusqlite::types::Value::Text(s) => s,
            rusqlite::types::Value::Integer(i) => i.to_string(),
            rusqlite::types::Value::Real(f) => f.to_string(),
            _ => continue,
        };
        values.insert(key, text);
    }
    Ok(values)
}

/// Frame ids joined with their `MaldiFrameInfo` pixel position.
pub fn read_frame_table(conn: &Connection) -> Result<FrameTable> {
    let mut stmt = conn.prepare(
        "SELECT f.Id, m.XIndexPos, m.YIndexPos \
         FROM Frames f JOIN MaldiFrameInfo m ON m.Frame = f.Id \
         ORDER BY f.Id",
    )?;
    let frames = stmt
        .query_map([], |row| {
            Ok(FrameInfo {
                id: row.get(0)?,
                x: row.get(1)?,
                y: row.get(2)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(FrameTable::new(frames))
}

// ---------------------------------------------------------------------------
// Vendor library (timsdata) – profile spectra
// ---------------------------------------------------------------------------

type TsfOpen = unsafe extern "C" fn(*const c_char, u32) -> u64;
type TsfClose = unsafe extern "C" fn(u64);
type TsfLastError = unsafe extern "C" fn(*mut c_char, u32) -> u32;
type TsfReadProfile = unsafe extern "C" fn(u64, i64, *mut u32, u32) -> i32;
type TsfIndexToMz = unsafe extern "C" fn(u64, i64, *const c_double, *mut c_double, u32) -> u32;

/// Open handle on a TSF dataset inside the Bruker timsdata library.
pub struct TsfLibrary {
    lib: Library,
    handle: u64,
}

impl TsfLibrary {
    pub fn open(library_path: &Path, data_path: &Path, use_recalibrated_state: bool) -> Result<Self> {
        let lib = unsafe { Library::new(library_path)? };
        let path = CString::new(data_path.to_string_lossy().as_bytes())
            .map_err(|_| ViewerError::Sdk(format!("invalid dataset path {}", data_path.display())))?;

        let handle = unsafe {
            let open: Symbol<TsfOpen> = lib.get(b"tsf_open")?;
            open(path.as_ptr(), u32::from(use_recalibrated_state))
        };
        if handle == 0 {
            return Err(ViewerError::Sdk(last_error(&lib)));
        }
        Ok(TsfLibrary { lib, handle })
    }

    fn last_error(&self) -> String {
        last_error(&self.lib)
    }

    /// Raw profile intensities of one frame, growing the buffer until the
    /// library reports it fits.
    pub fn read_profile(&self, frame_id: u32) -> Result<Vec<u32>> {
        let read: Symbol<TsfReadProfile> = unsafe { self.lib.get(b"tsf_read_profile_spectrum_v2")? };
        let mut buffer = vec![0u32; INITIAL_PROFILE_BUFFER];
        loop {
            let needed = unsafe {
                read(
                    self.handle,
                    i64::from(frame_id),
                    buffer.as_mut_ptr(),
                    buffer.len() as u32,
                )
            };
            if needed < 0 {
                return Err(ViewerError::Sdk(self.last_error()));
            }
            let needed = needed as usize;
            if needed <= buffer.len() {
                buffer.truncate(needed);
                return Ok(buffer);
            }
            buffer.resize(needed, 0);
        }
    }

    pub fn index_to_mz(&self, frame_id: u32, indices: &[c_double]) -> Result<Vec<f64>> {
        let convert: Symbol<TsfIndexToMz> = unsafe { self.lib.get(b"tsf_index_to_mz")? };
        let mut mz = vec![0.0; indices.len()];
        let ok = unsafe {
            convert(
                self.handle,
                i64::from(frame_id),
                indices.as_ptr(),
                mz.as_mut_ptr(),
                indices.len() as u32,
            )
        };
        if ok == 0 {
            return Err(ViewerError::Sdk(self.last_error()));
        }
        Ok(mz)
    }
}

/// Message of the library's most recent failure on this thread.
fn last_error(lib: &Library) -> String {
    let mut buf = vec![0 as c_char; 512];
    let result = unsafe {
        lib.get::<TsfLastError>(b"tsf_get_last_error_string")
            .map(|f| f(buf.as_mut_ptr(), buf.len() as u32))
    };
    match result {
        Ok(_) => {
            let bytes: Vec<u8> = buf.iter().take_while(|&&c| c != 0).map(|&c| c as u8).collect();
            String::from_utf8_lossy(&bytes).into_owned()
        }
        Err(e) => e.to_string(),
    }
}

impl Drop for TsfLibrary {
    fn drop(&mut self) {
        let closed = unsafe {
            self.lib
                .get::<TsfClose>(b"tsf_close")
                .map(|close| close(self.handle))
        };
        if let Err(e) = closed {
            log::error!("tsf_close failed: {e}");
        }
    }
}

// ---------------------------------------------------------------------------
// TsfDataset – FrameSource over a Bruker .d directory
// ---------------------------------------------------------------------------

pub struct TsfDataset {
    path: PathBuf,
    metadata: AcquisitionMetadata,
    frames: FrameTable,
    library: TsfLibrary,
}

impl TsfDataset {
    pub fn open(path: &Path, config: &ViewerConfig) -> Result<Self> {
        let conn = Connection::open(path.join(ANALYSIS_DB))?;
        let metadata = AcquisitionMetadata::from_key_values(&read_global_metadata(&conn)?)?;
        let frames = read_frame_table(&conn)?;
        if frames.is_empty() {
            log::warn!("{} has no frames with a MALDI pixel position", path.display());
        }
        let library = TsfLibrary::open(&config.sdk_library_path, path, config.use_recalibrated_state)?;

        log::info!(
            "Opened {} with {} frames, m/z {:?}, imaging area {:?}",
            path.display(),
            frames.len(),
            metadata.mz_range(),
            metadata.imaging_area()
        );
        Ok(Self {
            path: path.to_path_buf(),
            metadata,
            frames,
            library,
        })
    }
}

impl FrameSource for TsfDataset {
    fn source_path(&self) -> &Path {
        &self.path
    }

    fn metadata(&self) -> &AcquisitionMetadata {
        &self.metadata
    }

    fn frames(&self) -> &FrameTable {
        &self.frames
    }

    fn read_profile_spectrum(&self, frame_id: u32) -> Result<Spectrum> {
        if self.frames.coord_of(frame_id).is_none() {
            return Err(ViewerError::FrameOutOfRange(frame_id));
        }
        let profile = self.library.read_profile(frame_id)?;
        let indices: Vec<f64> = (0..profile.len()).map(|i| i as f64).collect();
        let mz = self.library.index_to_mz(frame_id, &indices)?;
        let intensity = profile.into_iter().map(f64::from).collect();
        Spectrum::new(mz, intensity)
    }
}
