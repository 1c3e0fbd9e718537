//! # Text Meter
//!
//! Renders a [`TunerOutput`] as a single terminal line: note, frequency,
//! cents and a needle drawn across a ±50 cent scale.
//!
//! ```text
//! A2      110.07 Hz    1.1 cts  [-------------------|-------------------]
//! ```

use tuner_core::tuning::NEEDLE_MAX_ANGLE;
use tuner_core::TunerOutput;

/// Character cells on each side of the centre mark.
const HALF_WIDTH: usize = 19;

/// Within this many cents the reading counts as in tune.
pub const IN_TUNE_CENTS: f32 = 5.0;

/// Formats one line of the meter.
pub fn render_line(output: &TunerOutput) -> String {
    let marker = match output.reading() {
        Some(r) if r.is_in_tune(IN_TUNE_CENTS) => '|',
        Some(r) if r.cents < 0.0 => '<',
        Some(_) => '>',
        None => ' ',
    };
    format!("{output}  [{}]", needle_bar(output.needle_angle(), marker))
}

/// Draws the scale with the needle placed by its angle. The centre tick is
/// always drawn; the needle overwrites it when centred.
fn needle_bar(angle: f32, marker: char) -> String {
    let width = HALF_WIDTH * 2 + 1;
    let offset = (angle / NEEDLE_MAX_ANGLE * HALF_WIDTH as f32).round() as isize;
    let position = (HALF_WIDTH as isize + offset).clamp(0, width as isize - 1) as usize;

    (0..width)
        .map(|i| {
            if i == position && marker != ' ' {
                marker
            } else if i == HALF_WIDTH {
                ':'
            } else {
                '-'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tuner_core::TuningReading;

    #[test]
    fn idle_meter_has_no_needle() {
        let line = render_line(&TunerOutput::Idle);
        assert!(line.starts_with("--"));
        assert!(!line.contains('|'));
        assert!(line.contains(':'));
    }

    #[test]
    fn in_tune_needle_sits_in_the_centre() {
        let bar = needle_bar(0.0, '|');
        assert_eq!(bar.len(), HALF_WIDTH * 2 + 1);
        assert_eq!(bar.find('|'), Some(HALF_WIDTH));
    }

    #[test]
    fn full_deflection_hits_the_edges() {
        let sharp = TunerOutput::Reading(TuningReading::new("A2", 116.54, 100.0));
        let line = render_line(&sharp);
        assert!(line.ends_with(">]"), "{line}");

        let flat = needle_bar(-NEEDLE_MAX_ANGLE, '<');
        assert!(flat.starts_with('<'));
    }
}
