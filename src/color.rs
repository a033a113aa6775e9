use eframe::egui::{Color32, ColorImage};
use palette::{LinSrgb, Mix, Srgb};

use crate::data::ion_image::IonImage;

// ---------------------------------------------------------------------------
// Viridis colour scale
// ---------------------------------------------------------------------------

/// Viridis sampled at nine evenly spaced stops.
const VIRIDIS: [(u8, u8, u8); 9] = [
    (68, 1, 84),
    (71, 44, 122),
    (59, 81, 139),
    (44, 113, 142),
    (33, 144, 141),
    (39, 173, 129),
    (92, 200, 99),
    (170, 220, 50),
    (253, 231, 37),
];

/// Colour for `t` in `[0, 1]`; values outside are clamped.
pub fn viridis(t: f64) -> Color32 {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    let scaled = t * (VIRIDIS.len() - 1) as f64;
    let i = (scaled.floor() as usize).min(VIRIDIS.len() - 2);
    let frac = (scaled - i as f64) as f32;

    let stop = |(r, g, b): (u8, u8, u8)| -> LinSrgb {
        Srgb::new(r, g, b).into_format::<f32>().into_linear()
    };
    let mixed = stop(VIRIDIS[i]).mix(stop(VIRIDIS[i + 1]), frac);
    let rgb: Srgb = Srgb::from_linear(mixed);
    Color32::from_rgb(
        (rgb.red * 255.0).round() as u8,
        (rgb.green * 255.0).round() as u8,
        (rgb.blue * 255.0).round() as u8,
    )
}

/// Render an ion image, row 0 at the top, scaled to its display range.
pub fn ion_image_to_color_image(image: &IonImage) -> ColorImage {
    let (low, high) = image.display_range();
    let span = high - low;
    let rgba: Vec<u8> = image
        .rows()
        .flatten()
        .flat_map(|&v| {
            let t = if span > 0.0 { (v - low) / span } else { 0.0 };
            viridis(t).to_array()
        })
        .collect();
    ColorImage::from_rgba_unmultiplied([image.width, image.height], &rgba)
}
