use std::collections::BTreeMap;

use palette::{LinSrgb, Mix, Srgb};
use plotters::style::RGBColor;

use crate::error::ForestError;

// ---------------------------------------------------------------------------
// Named sequential colour scales
// ---------------------------------------------------------------------------

/// Stops of the sequential scales used by the charts, light to dark.
///
/// ColorBrewer scales carry their 9 published stops, cmocean scales the 12
/// stops plotly ships for them.
fn scale_stops(name: &str) -> Option<&'static [(u8, u8, u8)]> {
    let stops: &'static [(u8, u8, u8)] = match name {
        "algae" => &[
            (214, 249, 207),
            (186, 228, 174),
            (156, 209, 143),
            (124, 191, 115),
            (85, 174, 91),
            (37, 157, 81),
            (7, 138, 78),
            (13, 117, 71),
            (23, 95, 61),
            (25, 75, 49),
            (23, 55, 35),
            (17, 36, 20),
        ],
        "Purples" => &[
            (252, 251, 253),
            (239, 237, 245),
            (218, 218, 235),
            (188, 189, 220),
            (158, 154, 200),
            (128, 125, 186),
            (106, 81, 163),
            (84, 39, 143),
            (63, 0, 125),
        ],
        "speed" => &[
            (254, 252, 205),
            (239, 225, 156),
            (221, 201, 106),
            (194, 182, 59),
            (157, 167, 21),
            (116, 153, 5),
            (75, 138, 20),
            (35, 121, 36),
            (11, 100, 44),
            (18, 78, 43),
            (25, 56, 34),
            (23, 35, 18),
        ],
        "turbid" => &[
            (232, 245, 171),
            (220, 219, 137),
            (209, 193, 107),
            (199, 168, 83),
            (186, 143, 66),
            (170, 121, 60),
            (151, 103, 58),
            (129, 87, 56),
            (104, 72, 53),
            (80, 59, 46),
            (57, 45, 37),
            (34, 30, 21),
        ],
        "YlOrBr" => &[
            (255, 255, 229),
            (255, 247, 188),
            (254, 227, 145),
            (254, 196, 79),
            (254, 153, 41),
            (236, 112, 20),
            (204, 76, 2),
            (153, 52, 4),
            (102, 37, 6),
        ],
        "Greys" => &[
            (255, 255, 255),
            (240, 240, 240),
            (217, 217, 217),
            (189, 189, 189),
            (150, 150, 150),
            (115, 115, 115),
            (82, 82, 82),
            (37, 37, 37),
            (0, 0, 0),
        ],
        "amp" => &[
            (241, 236, 236),
            (230, 209, 203),
            (221, 182, 170),
            (213, 156, 137),
            (205, 129, 103),
            (196, 102, 73),
            (186, 74, 47),
            (172, 44, 36),
            (149, 19, 39),
            (120, 14, 40),
            (89, 13, 31),
            (60, 9, 17),
        ],
        "tempo" => &[
            (254, 245, 244),
            (222, 224, 210),
            (189, 206, 181),
            (153, 189, 156),
            (110, 173, 138),
            (65, 157, 129),
            (25, 137, 125),
            (18, 116, 117),
            (25, 94, 106),
            (28, 72, 93),
            (25, 51, 80),
            (20, 29, 67),
        ],
        "Darkmint" => &[
            (210, 251, 212),
            (165, 219, 194),
            (123, 188, 176),
            (85, 156, 158),
            (58, 124, 137),
            (35, 93, 114),
            (18, 63, 90),
        ],
        _ => return None,
    };
    Some(stops)
}

fn to_linear((r, g, b): (u8, u8, u8)) -> LinSrgb {
    Srgb::new(r, g, b).into_format::<f32>().into_linear()
}

fn to_rgb(color: LinSrgb) -> RGBColor {
    let srgb: Srgb = Srgb::from_linear(color);
    let srgb: Srgb<u8> = srgb.into_format();
    RGBColor(srgb.red, srgb.green, srgb.blue)
}

/// Colour at position `t` (0 = lightest, 1 = darkest) of a stop list.
fn sample(stops: &[(u8, u8, u8)], t: f32) -> RGBColor {
    let t = t.clamp(0.0, 1.0);
    let last = stops.len() - 1;
    if last == 0 {
        return to_rgb(to_linear(stops[0]));
    }
    let pos = t * last as f32;
    let lower = (pos.floor() as usize).min(last - 1);
    let factor = pos - lower as f32;
    to_rgb(to_linear(stops[lower]).mix(to_linear(stops[lower + 1]), factor))
}

/// `n` colours sampled evenly from a named scale, both ends included.
pub fn get_colours(n: usize, scale: &str) -> Result<Vec<RGBColor>, ForestError> {
    let stops = scale_stops(scale).ok_or_else(|| ForestError::UnknownColourScale(scale.into()))?;
    Ok(match n {
        0 => Vec::new(),
        1 => vec![sample(stops, 0.0)],
        _ => (0..n)
            .map(|i| sample(stops, i as f32 / (n - 1) as f32))
            .collect(),
    })
}

/// Parse `#rrggbb` (the `#` is optional).
pub fn parse_hex(hex: &str) -> Result<RGBColor, ForestError> {
    let rgb: Srgb<u8> = hex
        .trim()
        .parse()
        .map_err(|_| ForestError::InvalidColour(hex.to_string()))?;
    Ok(RGBColor(rgb.red, rgb.green, rgb.blue))
}

// ---------------------------------------------------------------------------
// Colour mapping: age group → colour
// ---------------------------------------------------------------------------

/// Maps age-group labels to successive colours of a scale.
#[derive(Debug, Clone)]
pub struct ColorMap {
    mapping: BTreeMap<String, RGBColor>,
    default_color: RGBColor,
}

impl ColorMap {
    /// Assign the scale's colours to `labels` in order (youngest lightest).
    pub fn new(labels: &[String], scale: &str) -> Result<Self, ForestError> {
        let colours = get_colours(labels.len(), scale)?;
        let mapping = labels.iter().cloned().zip(colours).collect();
        Ok(ColorMap {
            mapping,
            default_color: RGBColor(128, 128, 128),
        })
    }

    pub fn color_for(&self, label: &str) -> RGBColor {
        self.mapping
            .get(label)
            .copied()
            .unwrap_or(self.default_color)
    }
}
