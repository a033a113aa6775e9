use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::data::model::Spectrum;

// ---------------------------------------------------------------------------
// Level-of-detail state for the spectrum plot
// ---------------------------------------------------------------------------

/// Everything needed to re-render a down-sampled spectrum: the visible m/z
/// range and the point budget. Independent of the data and of egui, so it
/// can be saved and resumed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewState {
    pub visible_range: [f64; 2],
    pub max_points: usize,
}

/// Points to draw for the current visible range.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewPatch {
    pub points: Vec<[f64; 2]>,
}

/// Min/max decimation of the part of `spectrum` inside `range`.
///
/// One point beyond each edge is kept so the line runs off the plot instead
/// of stopping short. Each bucket contributes its lowest and highest
/// intensity, so peaks survive at any zoom level.
pub fn downsample(spectrum: &Spectrum, range: [f64; 2], max_points: usize) -> Vec<[f64; 2]> {
    if spectrum.is_empty() {
        return Vec::new();
    }
    let mz = &spectrum.mz;
    let intensity = &spectrum.intensity;
    let start = mz.partition_point(|&m| m < range[0]).saturating_sub(1);
    let end = (mz.partition_point(|&m| m <= range[1]) + 1).min(mz.len());
    if start >= end {
        return Vec::new();
    }

    let count = end - start;
    if count <= max_points.max(2) {
        return (start..end).map(|i| [mz[i], intensity[i]]).collect();
    }

    let buckets = (max_points / 2).max(1);
    let bucket_len = count.div_ceil(buckets);
    let mut points = Vec::with_capacity(buckets * 2);
    for bucket_start in (start..end).step_by(bucket_len) {
        let bucket_end = (bucket_start + bucket_len).min(end);
        let (mut lo, mut hi) = (bucket_start, bucket_start);
        for i in bucket_start..bucket_end {
            if intensity[i] < intensity[lo] {
                lo = i;
            }
            if intensity[i] > intensity[hi] {
                hi = i;
            }
        }
        let (first, second) = if lo <= hi { (lo, hi) } else { (hi, lo) };
        points.push([mz[first], intensity[first]]);
        if second != first {
            points.push([mz[second], intensity[second]]);
        }
    }
    points
}

/// Re-sample for a new visible range. `None` when the range did not change,
/// so pan/zoom events that do not move the axes cost nothing.
pub fn apply_view_change(
    spectrum: &Spectrum,
    state: &ViewState,
    visible_range: [f64; 2],
) -> Option<(ViewState, ViewPatch)> {
    if same_range(state.visible_range, visible_range) {
        return None;
    }
    let next = ViewState {
        visible_range,
        ..state.clone()
    };
    let patch = ViewPatch {
        points: downsample(spectrum, visible_range, next.max_points),
    };
    Some((next, patch))
}

fn same_range(a: [f64; 2], b: [f64; 2]) -> bool {
    let tolerance = (a[1] - a[0]).abs().max(f64::EPSILON) * 1e-9;
    (a[0] - b[0]).abs() <= tolerance && (a[1] - b[1]).abs() <= tolerance
}

fn full_range(spectrum: &Spectrum) -> [f64; 2] {
    match (spectrum.mz.first(), spectrum.mz.last()) {
        (Some(&lo), Some(&hi)) => [lo, hi],
        _ => [0.0, 1.0],
    }
}

// ---------------------------------------------------------------------------
// SpectrumView – full-resolution data plus its current rendering
// ---------------------------------------------------------------------------

/// A spectrum prepared for interactive display.
#[derive(Debug, Clone)]
pub struct SpectrumView {
    pub title: String,
    spectrum: Arc<Spectrum>,
    state: ViewState,
    patch: ViewPatch,
}

impl SpectrumView {
    /// Start fully zoomed out.
    pub fn new(title: impl Into<String>, spectrum: Arc<Spectrum>, max_points: usize) -> Self {
        let state = ViewState {
            visible_range: full_range(&spectrum),
            max_points,
        };
        Self::resume(title, spectrum, state)
    }

    /// Rebuild from a previously saved [`ViewState`].
    pub fn resume(title: impl Into<String>, spectrum: Arc<Spectrum>, state: ViewState) -> Self {
        let patch = ViewPatch {
            points: downsample(&spectrum, state.visible_range, state.max_points),
        };
        Self {
            title: title.into(),
            spectrum,
            state,
            patch,
        }
    }

    pub fn spectrum(&self) -> &Spectrum {
        &self.spectrum
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn points(&self) -> &[[f64; 2]] {
        &self.patch.points
    }

    /// Apply a pan/zoom. Returns whether the points changed.
    pub fn set_visible_range(&mut self, visible_range: [f64; 2]) -> bool {
        match apply_view_change(&self.spectrum, &self.state, visible_range) {
            Some((state, patch)) => {
                log::trace!(
                    "Resampled {} to {} points for {:?}",
                    self.title,
                    patch.points.len(),
                    visible_range
                );
                self.state = state;
                self.patch = patch;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp_with_peak(n: usize, peak_at: usize) -> Spectrum {
        let mz = (0..n).map(|i| 100.0 + i as f64 * 0.01).collect();
        let intensity = (0..n)
            .map(|i| if i == peak_at { 1.0e6 } else { (i % 7) as f64 })
            .collect();
        Spectrum::new(mz, intensity).unwrap()
    }

    #[test]
    fn short_spectra_are_not_decimated() {
        let s = ramp_with_peak(50, 10);
        let points = downsample(&s, [0.0, 1000.0], 100);
        assert_eq!(points.len(), 50);
        assert_eq!(points[10], [s.mz[10], 1.0e6]);
    }

    #[test]
    fn long_spectra_respect_budget_and_keep_peaks() {
        let s = ramp_with_peak(100_000, 73_421);
        let points = downsample(&s, [0.0, 10_000.0], 1000);
        assert!(points.len() <= 1000);
        assert!(points.iter().any(|p| p[1] == 1.0e6));
        assert!(points.windows(2).all(|w| w[0][0] < w[1][0]));
    }

    #[test]
    fn zoom_only_samples_the_visible_range() {
        let s = ramp_with_peak(10_000, 0);
        let (lo, hi) = (150.0, 151.0);
        let points = downsample(&s, [lo, hi], 1000);
        // one padding point on each side
        let inside = points.iter().filter(|p| lo <= p[0] && p[0] <= hi).count();
        assert!(points.len() - inside <= 2);
        assert!(inside >= 99);
    }

    #[test]
    fn empty_spectrum_has_no_points() {
        let view = SpectrumView::new("empty", Arc::new(Spectrum::default()), 100);
        assert!(view.points().is_empty());
        assert_eq!(view.state().visible_range, [0.0, 1.0]);
    }

    #[test]
    fn unchanged_range_is_a_no_op() {
        let s = Arc::new(ramp_with_peak(5000, 1));
        let mut view = SpectrumView::new("frame 1", s, 500);
        let range = view.state().visible_range;
        assert!(!view.set_visible_range(range));
        assert!(view.set_visible_range([110.0, 120.0]));
        assert_eq!(view.state().visible_range, [110.0, 120.0]);
    }

    #[test]
    fn resumed_view_matches_the_saved_one() {
        let s = Arc::new(ramp_with_peak(20_000, 4321));
        let mut view = SpectrumView::new("average", s.clone(), 800);
        view.set_visible_range([120.0, 160.0]);

        let saved = serde_json::to_string(view.state()).unwrap();
        let resumed = SpectrumView::resume("average", s, serde_json::from_str(&saved).unwrap());
        assert_eq!(resumed.state(), view.state());
        assert_eq!(resumed.points(), view.points());
    }
}
