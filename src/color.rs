//! Highlight colors.
//!
//! Filters are colored by hue. New hues come from a [`HueAllocator`] that
//! looks at the hues already handed out and keeps the next one well away from
//! the most recent, so neighbouring filters stay distinguishable.

const GOLDEN_ANGLE: u16 = 137;
const CANDIDATE_STEP: u16 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Convert an HSL color to RGB. `saturation` and `lightness` are in 0.0..=1.0.
pub fn hsl_to_rgb(hue: u16, saturation: f32, lightness: f32) -> Rgb {
    let h = f32::from(hue % 360) / 60.0;
    let s = saturation.clamp(0.0, 1.0);
    let l = lightness.clamp(0.0, 1.0);

    let chroma = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let x = chroma * (1.0 - (h % 2.0 - 1.0).abs());
    let (r, g, b) = match h as u8 {
        0 => (chroma, x, 0.0),
        1 => (x, chroma, 0.0),
        2 => (0.0, chroma, x),
        3 => (0.0, x, chroma),
        4 => (x, 0.0, chroma),
        _ => (chroma, 0.0, x),
    };
    let m = l - chroma / 2.0;
    let channel = |v: f32| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    Rgb::new(channel(r), channel(g), channel(b))
}

/// Background color used for a filter's highlight
pub fn highlight_color(hue: u16) -> Rgb {
    hsl_to_rgb(hue, 0.65, 0.35)
}

/// Shortest angular distance between two hues, in degrees
pub fn hue_distance(a: u16, b: u16) -> u16 {
    let diff = (i32::from(a % 360) - i32::from(b % 360)).unsigned_abs() as u16;
    diff.min(360 - diff)
}

/// Picks hues for new filters.
#[derive(Debug, Clone, Copy)]
pub struct HueAllocator {
    min_distance: u16,
    start: u16,
}

impl Default for HueAllocator {
    fn default() -> Self {
        Self::new(60)
    }
}

impl HueAllocator {
    pub fn new(min_distance: u16) -> Self {
        Self {
            min_distance: min_distance.min(180),
            start: 210,
        }
    }

    pub fn with_start(mut self, start: u16) -> Self {
        self.start = start % 360;
        self
    }

    /// Next hue given the hues already assigned, oldest first.
    ///
    /// The result is at least `min_distance` degrees from the last assigned
    /// hue. Among the admissible candidates the one farthest from every
    /// assigned hue wins; ties go to the candidate closest to a golden-angle
    /// step from the last hue.
    pub fn allocate(&self, assigned: &[u16]) -> u16 {
        let Some(&last) = assigned.last() else {
            return self.start;
        };

        let origin = (last % 360 + GOLDEN_ANGLE) % 360;
        let mut best = origin;
        let mut best_score = None;

        for step in 0..(360 / CANDIDATE_STEP) {
            let candidate = (origin + step * CANDIDATE_STEP) % 360;
            if hue_distance(candidate, last) < self.min_distance {
                continue;
            }
            let score = assigned
                .iter()
                .map(|&hue| hue_distance(candidate, hue))
                .min()
                .unwrap_or(180);
            if best_score.is_none_or(|s| score > s) {
                best = candidate;
                best_score = Some(score);
            }
        }

        best
    }
}
