use std::collections::BTreeMap;

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            Color32::from_rgb(
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            )
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Label colours: entity label → Color32
// ---------------------------------------------------------------------------

/// Stable colour per entity label, used for label chips in the run log.
#[derive(Debug, Clone)]
pub struct LabelColors {
    mapping: BTreeMap<String, Color32>,
    default_color: Color32,
}

impl LabelColors {
    /// Build a colour map over the given labels (duplicates ignored).
    pub fn new<'a>(labels: impl IntoIterator<Item = &'a str>) -> Self {
        let unique: Vec<&str> = labels
            .into_iter()
            .collect::<std::collections::BTreeSet<_>>()
            .into_iter()
            .collect();
        let palette = generate_palette(unique.len());
        let mapping = unique
            .into_iter()
            .zip(palette)
            .map(|(l, c)| (l.to_string(), c))
            .collect();

        LabelColors {
            mapping,
            default_color: Color32::GRAY,
        }
    }

    /// Look up the colour for a label.
    pub fn color_for(&self, label: &str) -> Color32 {
        self.mapping
            .get(label)
            .copied()
            .unwrap_or(self.default_color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_has_requested_size() {
        assert!(generate_palette(0).is_empty());
        let p = generate_palette(3);
        assert_eq!(p.len(), 3);
        assert_ne!(p[0], p[1]);
    }

    #[test]
    fn unknown_label_is_gray() {
        let colors = LabelColors::new(["person", "location", "person"]);
        assert_ne!(colors.color_for("person"), colors.color_for("location"));
        assert_eq!(colors.color_for("org"), Color32::GRAY);
    }
}
