use std::time::Instant;

use super::filter::{trim_spectrum, MassWindow, ToleranceUnit};
use super::model::{AcquisitionMetadata, FrameSource};
use crate::error::Result;

// ---------------------------------------------------------------------------
// Ion image – dense intensity grid over the imaging area
// ---------------------------------------------------------------------------

/// Summed intensity per pixel, stored row-major as `[y][x]` with both axes
/// offset so the imaging area's minimum coordinate is `(0, 0)`.
#[derive(Debug, Clone, PartialEq)]
pub struct IonImage {
    pub width: usize,
    pub height: usize,
    values: Vec<f64>,
    /// Forced upper bound of the colour scale; `None` means auto-scale.
    pub color_max: Option<f64>,
}

impl IonImage {
    /// All-zero grid shown before the first query.
    pub fn blank(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            values: vec![0.0; width * height],
            color_max: Some(1.0),
        }
    }

    /// Value at zero-based offset `(x, y)`.
    pub fn get(&self, x: usize, y: usize) -> Option<f64> {
        (x < self.width && y < self.height).then(|| self.values[y * self.width + x])
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.values.chunks(self.width.max(1))
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn total(&self) -> f64 {
        self.values().iter().sum()
    }

    /// `[0, upper]` colour range: the forced bound, else the grid maximum.
    pub fn display_range(&self) -> (f64, f64) {
        let upper = self
            .color_max
            .unwrap_or_else(|| self.values.iter().copied().fold(0.0, f64::max));
        (0.0, upper)
    }
}

/// Parameters of an "Update Ion Image" request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IonImageQuery {
    pub mz: f64,
    pub tolerance: f64,
    pub unit: ToleranceUnit,
}

impl IonImageQuery {
    pub fn window(&self, meta: &AcquisitionMetadata) -> MassWindow {
        MassWindow::around(self.mz, self.tolerance, self.unit, meta)
    }
}

/// Build the ion image for `query` from every frame of `source`.
///
/// Each frame's spectrum is trimmed to the clipped mass window and summed
/// into its pixel. Pixels no frame maps to stay 0. An image whose total is
/// exactly 0 gets a colour scale of `[0, 1]`.
pub fn build_ion_image(source: &dyn FrameSource, query: &IonImageQuery) -> Result<IonImage> {
    let started = Instant::now();
    let meta = source.metadata();
    let window = query.window(meta);
    let (width, height) = (meta.width(), meta.height());

    let mut values = vec![0.0; width * height];
    for frame in source.frames().iter() {
        let (dx, dy) = (frame.x - meta.x_min, frame.y - meta.y_min);
        if dx < 0 || dy < 0 || dx as usize >= width || dy as usize >= height {
            log::warn!(
                "Frame {} at ({}, {}) lies outside the imaging area",
                frame.id,
                frame.x,
                frame.y
            );
            continue;
        }
        let spectrum = source.read_profile_spectrum(frame.id)?;
        // Frames come in id order; on a shared pixel the later frame wins,
        // matching FrameTable::frame_at.
        values[dy as usize * width + dx as usize] = trim_spectrum(&spectrum, window).total_intensity();
    }

    let mut image = IonImage {
        width,
        height,
        values,
        color_max: None,
    };
    if image.total() == 0.0 {
        image.color_max = Some(1.0);
    }
    log::info!(
        "Ion image m/z {:.4} window {window}: {width}x{height} px from {} frames in {:.2?}",
        query.mz,
        source.frames().len(),
        started.elapsed()
    );

    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::tests::{bounds, uniform_grid};
    use crate::data::model::{FrameInfo, MemoryDataset, Spectrum};

    #[test]
    fn window_of_50_da_sums_the_middle_peak() {
        let ds = uniform_grid();
        let query = IonImageQuery {
            mz: 200.0,
            tolerance: 50.0,
            unit: ToleranceUnit::Da,
        };
        assert_eq!(query.window(ds.metadata()), MassWindow { lower: 150.0, upper: 250.0 });

        let image = build_ion_image(&ds, &query).unwrap();
        assert_eq!((image.width, image.height), (2, 2));
        assert!(image.values().iter().all(|&v| v == 20.0));
        assert_eq!(image.color_max, None);
        assert_eq!(image.display_range(), (0.0, 20.0));
    }

    #[test]
    fn zero_ppm_off_peak_is_all_zero_with_unit_scale() {
        let ds = uniform_grid();
        let query = IonImageQuery {
            mz: 200.0001,
            tolerance: 0.0,
            unit: ToleranceUnit::Ppm,
        };
        let image = build_ion_image(&ds, &query).unwrap();
        assert!(image.values().iter().all(|&v| v == 0.0));
        assert_eq!(image.color_max, Some(1.0));
        assert_eq!(image.display_range(), (0.0, 1.0));
    }

    #[test]
    fn zero_width_window_picks_an_exact_point() {
        let ds = uniform_grid();
        let query = IonImageQuery {
            mz: 200.0,
            tolerance: 0.0,
            unit: ToleranceUnit::Ppm,
        };
        let image = build_ion_image(&ds, &query).unwrap();
        assert!(image.values().iter().all(|&v| v == 20.0));
    }

    #[test]
    fn unrecognized_unit_degenerates_to_zero_width() {
        let ds = uniform_grid();
        let query = IonImageQuery {
            mz: 210.0,
            tolerance: 50.0,
            unit: ToleranceUnit::from("mDa"),
        };
        let image = build_ion_image(&ds, &query).unwrap();
        assert_eq!(image.total(), 0.0);
        assert_eq!(image.color_max, Some(1.0));
    }

    #[test]
    fn zero_tolerance_query_is_repeatable() {
        let ds = uniform_grid();
        let query = IonImageQuery {
            mz: 300.0,
            tolerance: 0.0,
            unit: ToleranceUnit::Da,
        };
        let first = build_ion_image(&ds, &query).unwrap();
        let second = build_ion_image(&ds, &query).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn sparse_frames_fill_a_full_offset_grid() {
        // Imaging area x 10..=12, y 5..=6 with only two acquired pixels.
        let meta = AcquisitionMetadata {
            x_min: 10,
            x_max: 12,
            y_min: 5,
            y_max: 6,
            ..bounds(0, 0)
        };
        let frames = vec![
            (
                FrameInfo { id: 1, x: 10, y: 5 },
                Spectrum::new(vec![100.0, 101.0], vec![1.0, 2.0]).unwrap(),
            ),
            (
                FrameInfo { id: 2, x: 12, y: 6 },
                Spectrum::new(vec![100.0, 101.0], vec![4.0, 8.0]).unwrap(),
            ),
        ];
        let ds = MemoryDataset::new("sparse.d", meta, frames);
        let query = IonImageQuery {
            mz: 100.5,
            tolerance: 1.0,
            unit: ToleranceUnit::Da,
        };
        let image = build_ion_image(&ds, &query).unwrap();

        assert_eq!((image.width, image.height), (3, 2));
        let rows: Vec<&[f64]> = image.rows().collect();
        assert_eq!(rows, vec![&[3.0, 0.0, 0.0][..], &[0.0, 0.0, 12.0][..]]);
        assert_eq!(image.get(2, 1), Some(12.0));
        assert_eq!(image.get(3, 0), None);
    }

    #[test]
    fn frames_outside_the_area_are_skipped() {
        let frames = vec![
            (
                FrameInfo { id: 1, x: 0, y: 0 },
                Spectrum::new(vec![100.0], vec![5.0]).unwrap(),
            ),
            (
                FrameInfo { id: 2, x: 9, y: 9 },
                Spectrum::new(vec![100.0], vec![7.0]).unwrap(),
            ),
        ];
        let ds = MemoryDataset::new("edge.d", bounds(1, 0), frames);
        let query = IonImageQuery {
            mz: 100.0,
            tolerance: 1.0,
            unit: ToleranceUnit::Da,
        };
        let image = build_ion_image(&ds, &query).unwrap();
        assert_eq!(image.values(), &[5.0, 0.0]);
    }

    #[test]
    fn shared_pixel_shows_the_later_frame() {
        let frames = vec![
            (
                FrameInfo { id: 2, x: 0, y: 0 },
                Spectrum::new(vec![100.0], vec![9.0]).unwrap(),
            ),
            (
                FrameInfo { id: 1, x: 0, y: 0 },
                Spectrum::new(vec![100.0], vec![4.0]).unwrap(),
            ),
        ];
        let ds = MemoryDataset::new("twice.d", bounds(0, 0), frames);
        let query = IonImageQuery {
            mz: 100.0,
            tolerance: 1.0,
            unit: ToleranceUnit::Da,
        };
        let image = build_ion_image(&ds, &query).unwrap();
        assert_eq!(image.values(), &[9.0]);
        assert_eq!(ds.frame_at(0, 0), Some(2));
    }

    #[test]
    fn blank_image_has_unit_scale() {
        let image = IonImage::blank(3, 2);
        assert_eq!(image.values().len(), 6);
        assert_eq!(image.display_range(), (0.0, 1.0));
    }
}
