use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::SeedableRng;

use super::model::{AcquisitionMetadata, FrameInfo, MemoryDataset, Spectrum};

/// Location reported by the demo dataset.
pub const DEMO_PATH: &str = "<demo dataset>";

const WIDTH: i32 = 32;
const HEIGHT: i32 = 24;
const ORIGIN: i32 = 1;
const MZ_START: f64 = 150.0;
const MZ_STEP: f64 = 0.25;
const MZ_POINTS: usize = 3000;

/// Unit-height peak shape.
fn peak(mz: f64, centre: f64, width: f64) -> f64 {
    let z = (mz - centre) / width;
    (-0.5 * z * z).exp()
}

/// Relative abundance of the three demo ions at pixel offset `(dx, dy)`.
fn abundances(dx: i32, dy: i32) -> [f64; 3] {
    let (fx, fy) = (dx as f64, dy as f64);
    let (cx, cy) = (WIDTH as f64 / 2.0, HEIGHT as f64 / 2.0);
    let r = ((fx - cx).powi(2) + (fy - cy).powi(2)).sqrt();

    let blob = (-r.powi(2) / 30.0).exp();
    let gradient = fx / (WIDTH - 1) as f64;
    let ring = (-(r - 9.0).powi(2) / 4.0).exp();
    [blob, gradient, ring]
}

/// A small MALDI-style imaging run: a blob at m/z 301.1, a left-to-right
/// gradient at m/z 455.3 and a ring at m/z 712.6 over a noisy baseline.
/// Two pixels in the top-right corner were never acquired.
pub fn demo_dataset() -> MemoryDataset {
    let mut rng = StdRng::seed_from_u64(42);
    let baseline = Uniform::new(0.0, 150.0);
    let mz: Vec<f64> = (0..MZ_POINTS).map(|i| MZ_START + i as f64 * MZ_STEP).collect();
    let ions = [(301.1, 0.3, 5.0e4), (455.3, 0.35, 2.0e4), (712.6, 0.4, 3.5e4)];

    let mut frames = Vec::new();
    let mut next_id = 1u32;
    for dy in 0..HEIGHT {
        for dx in 0..WIDTH {
            if dy == 0 && dx >= WIDTH - 2 {
                continue;
            }
            let weights = abundances(dx, dy);
            let intensity: Vec<f64> = mz
                .iter()
                .map(|&m| {
                    let signal: f64 = ions
                        .iter()
                        .zip(weights)
                        .map(|(&(centre, width, height), w)| height * w * peak(m, centre, width))
                        .sum();
                    signal + baseline.sample(&mut rng)
                })
                .collect();

            let info = FrameInfo {
                id: next_id,
                x: ORIGIN + dx,
                y: ORIGIN + dy,
            };
            frames.push((
                info,
                Spectrum {
                    mz: mz.clone(),
                    intensity,
                },
            ));
            next_id += 1;
        }
    }

    let metadata = AcquisitionMetadata {
        mz_lower: MZ_START,
        mz_upper: MZ_START + (MZ_POINTS - 1) as f64 * MZ_STEP,
        x_min: ORIGIN,
        x_max: ORIGIN + WIDTH - 1,
        y_min: ORIGIN,
        y_max: ORIGIN + HEIGHT - 1,
    };
    log::info!("Generated demo dataset with {} frames", frames.len());
    MemoryDataset::new(DEMO_PATH, metadata, frames)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::filter::ToleranceUnit;
    use crate::data::ion_image::{build_ion_image, IonImageQuery};
    use crate::data::model::FrameSource;

    #[test]
    fn demo_has_gaps_and_contiguous_ids() {
        let ds = demo_dataset();
        let n = (WIDTH * HEIGHT - 2) as u32;
        assert_eq!(ds.frames().len(), n as usize);
        assert_eq!(ds.frames().id_range(), Some((1, n)));
        assert_eq!(ds.frame_at(ORIGIN + WIDTH - 1, ORIGIN), None);
        assert_eq!(ds.frame_at(ORIGIN, ORIGIN), Some(1));
    }

    #[test]
    fn demo_is_reproducible_with_bounded_baseline() {
        let (a, b) = (demo_dataset(), demo_dataset());
        let (sa, sb) = (a.read_profile_spectrum(17).unwrap(), b.read_profile_spectrum(17).unwrap());
        assert_eq!(sa, sb);

        // first point sits far from every ion: baseline noise only
        assert_eq!(sa.mz[0], MZ_START);
        assert!((0.0..150.0).contains(&sa.intensity[0]));
        assert!(sa.intensity.iter().any(|&v| v > 150.0));
    }

    #[test]
    fn gradient_ion_increases_left_to_right() {
        let ds = demo_dataset();
        let query = IonImageQuery {
            mz: 455.3,
            tolerance: 0.5,
            unit: ToleranceUnit::Da,
        };
        let image = build_ion_image(&ds, &query).unwrap();
        assert_eq!((image.width, image.height), (WIDTH as usize, HEIGHT as usize));
        let row = image.rows().nth(10).unwrap();
        assert!(row[WIDTH as usize - 1] > row[0]);
        // never-acquired pixels read as 0
        assert_eq!(image.get(WIDTH as usize - 1, 0), Some(0.0));
    }
}
