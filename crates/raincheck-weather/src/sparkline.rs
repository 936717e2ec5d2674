//! One-line precipitation charts for chat replies.

use crate::types::Sample;

/// Glyphs from dry to heaviest; index 0 is only used for exactly zero
const PALETTE: [char; 9] = [' ', '▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Render a condensed series as `[glyphs] <total> mm of rain ...`, or the
/// no-rain line when every value is zero.
pub fn render(series: &[Sample], location: &str) -> String {
    let mut max = 0.0_f64;
    let mut total = 0.0;
    for sample in series {
        max = max.max(sample.precipitation_mm);
        total += sample.precipitation_mm;
    }

    if max == 0.0 {
        return format!("no rain expexted over the next hour in {}", location);
    }

    let glyphs: String = series
        .iter()
        .map(|s| glyph_for(s.precipitation_mm, max))
        .collect();

    format!(
        "[{}] {:.3} mm of rain over the next hour in {}",
        glyphs, total, location
    )
}

/// Fallback reply when only hourly data is available
pub fn render_hourly(rain_mm: f64, location: &str) -> String {
    format!(
        "{:.2} mms of rain expected over the next hour in {}",
        rain_mm, location
    )
}

/// Pick the glyph for `value / max` using eight bins of width 1/8.
/// Each bin is closed below, so a ratio of exactly 0.125 is the second step.
fn glyph_for(value: f64, max: f64) -> char {
    let ratio = value / max;
    if ratio == 0.0 {
        return PALETTE[0];
    }
    let bin = ((ratio * 8.0) as usize).min(7);
    PALETTE[bin + 1]
}
