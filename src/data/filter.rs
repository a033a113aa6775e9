use std::fmt;

use super::model::{AcquisitionMetadata, Spectrum};

// ---------------------------------------------------------------------------
// Mass window trimming
// ---------------------------------------------------------------------------

/// Keep the points with `low <= mz <= high`, preserving order and pairing.
///
/// An inverted or out-of-range window simply yields empty arrays.
pub fn trim(mz: &[f64], intensity: &[f64], low: f64, high: f64) -> (Vec<f64>, Vec<f64>) {
    mz.iter()
        .zip(intensity.iter())
        .filter(|&(&m, _)| low <= m && m <= high)
        .map(|(&m, &i)| (m, i))
        .unzip()
}

/// [`trim`] applied to a whole spectrum.
pub fn trim_spectrum(spectrum: &Spectrum, window: MassWindow) -> Spectrum {
    let (mz, intensity) = trim(&spectrum.mz, &spectrum.intensity, window.lower, window.upper);
    Spectrum { mz, intensity }
}

// ---------------------------------------------------------------------------
// Tolerance
// ---------------------------------------------------------------------------

/// Unit of the user-entered m/z tolerance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToleranceUnit {
    Da,
    Ppm,
    /// Anything else; resolves to a zero-width window.
    Unrecognized,
}

impl ToleranceUnit {
    pub const SELECTABLE: [ToleranceUnit; 2] = [ToleranceUnit::Da, ToleranceUnit::Ppm];
}

impl From<&str> for ToleranceUnit {
    fn from(s: &str) -> Self {
        match s {
            "Da" => ToleranceUnit::Da,
            "ppm" => ToleranceUnit::Ppm,
            _ => ToleranceUnit::Unrecognized,
        }
    }
}

impl fmt::Display for ToleranceUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToleranceUnit::Da => write!(f, "Da"),
            ToleranceUnit::Ppm => write!(f, "ppm"),
            ToleranceUnit::Unrecognized => write!(f, "?"),
        }
    }
}

/// Half-width of the mass window in Daltons. The sign of `tolerance` is not
/// checked: a negative value produces an inverted, empty window.
pub fn resolve_tolerance(mz: f64, tolerance: f64, unit: ToleranceUnit) -> f64 {
    match unit {
        ToleranceUnit::Da => tolerance,
        ToleranceUnit::Ppm => tolerance * mz / 1e6,
        ToleranceUnit::Unrecognized => 0.0,
    }
}

/// Inclusive `[lower, upper]` mass range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MassWindow {
    pub lower: f64,
    pub upper: f64,
}

impl MassWindow {
    /// `mz ± tolerance`, each side clipped to the acquisition range.
    pub fn around(mz: f64, tolerance: f64, unit: ToleranceUnit, meta: &AcquisitionMetadata) -> Self {
        let half_width = resolve_tolerance(mz, tolerance, unit);
        Self {
            lower: (mz - half_width).max(meta.mz_lower),
            upper: (mz + half_width).min(meta.mz_upper),
        }
    }
}

impl fmt::Display for MassWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:.4}, {:.4}]", self.lower, self.upper)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::tests::bounds;
    use proptest::prelude::*;

    #[test]
    fn trim_is_inclusive_on_both_ends() {
        let (mz, intensity) = trim(&[100.0, 150.0, 200.0, 250.0], &[1.0, 2.0, 3.0, 4.0], 150.0, 200.0);
        assert_eq!(mz, vec![150.0, 200.0]);
        assert_eq!(intensity, vec![2.0, 3.0]);
    }

    #[test]
    fn trim_outside_range_is_empty() {
        let (mz, intensity) = trim(&[100.0, 200.0], &[1.0, 2.0], 300.0, 400.0);
        assert!(mz.is_empty());
        assert!(intensity.is_empty());

        let (mz, _) = trim(&[100.0, 200.0], &[1.0, 2.0], 200.0, 100.0);
        assert!(mz.is_empty());
    }

    #[test]
    fn tolerance_units() {
        assert_eq!(resolve_tolerance(500.0, 0.25, ToleranceUnit::Da), 0.25);
        assert_eq!(resolve_tolerance(500.0, 10.0, ToleranceUnit::Ppm), 10.0 * 500.0 / 1e6);
        assert_eq!(resolve_tolerance(500.0, 10.0, ToleranceUnit::from("bogus")), 0.0);
        assert_eq!(resolve_tolerance(500.0, -1.0, ToleranceUnit::Da), -1.0);
    }

    #[test]
    fn unit_parsing_is_case_sensitive() {
        assert_eq!(ToleranceUnit::from("Da"), ToleranceUnit::Da);
        assert_eq!(ToleranceUnit::from("ppm"), ToleranceUnit::Ppm);
        assert_eq!(ToleranceUnit::from("PPM"), ToleranceUnit::Unrecognized);
    }

    #[test]
    fn window_is_clipped_to_acquisition_range() {
        let meta = bounds(1, 1);
        let w = MassWindow::around(60.0, 20.0, ToleranceUnit::Da, &meta);
        assert_eq!(w, MassWindow { lower: 50.0, upper: 80.0 });

        let w = MassWindow::around(495.0, 20.0, ToleranceUnit::Da, &meta);
        assert_eq!(w, MassWindow { lower: 475.0, upper: 500.0 });
    }

    #[test]
    fn negative_tolerance_gives_empty_trim() {
        let meta = bounds(1, 1);
        let w = MassWindow::around(200.0, -5.0, ToleranceUnit::Da, &meta);
        assert!(w.lower > w.upper);
        let s = Spectrum::new(vec![195.0, 200.0, 205.0], vec![1.0, 1.0, 1.0]).unwrap();
        assert!(trim_spectrum(&s, w).is_empty());
    }

    proptest! {
        #[test]
        fn trim_keeps_pairs_in_window_and_order(
            mz in prop::collection::vec(0.0f64..1000.0, 0..64),
            a in 0.0f64..1000.0,
            b in 0.0f64..1000.0,
        ) {
            let mut mz = mz;
            mz.sort_by(|x, y| x.total_cmp(y));
            let intensity: Vec<f64> = (0..mz.len()).map(|i| i as f64).collect();
            let (low, high) = if a <= b { (a, b) } else { (b, a) };

            let (t_mz, t_int) = trim(&mz, &intensity, low, high);

            prop_assert_eq!(t_mz.len(), t_int.len());
            prop_assert!(t_mz.len() <= mz.len());
            prop_assert!(t_mz.iter().all(|&v| low <= v && v <= high));
            // intensities encode the source index, so increasing means order kept
            prop_assert!(t_int.windows(2).all(|w| w[0] < w[1]));
            for (m, i) in t_mz.iter().zip(&t_int) {
                prop_assert_eq!(*m, mz[*i as usize]);
            }
        }
    }
}
