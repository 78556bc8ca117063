use ratatui::style::Color;

/// Neutral fill for countries with no reconciled record in the selected year.
pub const NO_DATA: Color = Color::Rgb(204, 204, 204);

/// Nine-stop sequential red scheme, light to dark.
const REDS: [(u8, u8, u8); 9] = [
    (255, 245, 240),
    (254, 224, 210),
    (252, 187, 161),
    (252, 146, 114),
    (251, 106, 74),
    (239, 59, 44),
    (203, 24, 29),
    (165, 15, 21),
    (103, 0, 13),
];

/// Continuous color scale over a fixed `[0, max]` domain.
///
/// The upper bound is the global maximum rate of the whole dataset, set
/// once at load. Keeping it fixed makes color intensity comparable across
/// years; recomputing it per selected year would not.
pub struct ColorScale {
    max: f64,
}

impl ColorScale {
    pub fn fixed(max: f64) -> Self {
        Self {
            max: if max > 0.0 { max } else { 1.0 },
        }
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    /// Map a rate to a fill color, clamping outside the domain.
    pub fn color(&self, rate: f64) -> Color {
        let t = (rate / self.max).clamp(0.0, 1.0);
        let pos = t * (REDS.len() - 1) as f64;
        let lo = pos.floor() as usize;
        let hi = (lo + 1).min(REDS.len() - 1);
        let frac = pos - lo as f64;

        let lerp = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * frac).round() as u8;
        let (r0, g0, b0) = REDS[lo];
        let (r1, g1, b1) = REDS[hi];
        Color::Rgb(lerp(r0, r1), lerp(g0, g1), lerp(b0, b1))
    }
}
