use serde::{Deserialize, Serialize};

/// Lowest glucose value that still maps above the floor pitch (mg/dL).
pub const MIN_GLUCOSE: f64 = 20.0;
/// Glucose value at and above which the ceiling pitch is used (mg/dL).
pub const MAX_GLUCOSE: f64 = 400.0;
/// C2
pub const MIN_PITCH: i32 = 36;
/// C8
pub const MAX_PITCH: i32 = 108;

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Linear map from an input range onto a pitch range.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PitchMapping {
    pub min_input: f64,
    pub max_input: f64,
    pub min_pitch: i32,
    pub max_pitch: i32,
}

impl Default for PitchMapping {
    fn default() -> Self {
        Self {
            min_input: MIN_GLUCOSE,
            max_input: MAX_GLUCOSE,
            min_pitch: MIN_PITCH,
            max_pitch: MAX_PITCH,
        }
    }
}

impl PitchMapping {
    pub fn map(&self, value: f64) -> i32 {
        map_to_pitch(
            value,
            self.min_input,
            self.max_input,
            self.min_pitch,
            self.max_pitch,
        )
    }
}

/// Interpolates `value` from `[min_input, max_input]` onto
/// `[min_pitch, max_pitch]`, truncates toward zero and clamps.
///
/// Out-of-range and non-finite inputs are clamped rather than rejected, so
/// the result always lies in `[min_pitch, max_pitch]`. Callers must keep
/// `min_input < max_input` and `min_pitch <= max_pitch`.
pub fn map_to_pitch(
    value: f64,
    min_input: f64,
    max_input: f64,
    min_pitch: i32,
    max_pitch: i32,
) -> i32 {
    let scaled = f64::from(min_pitch)
        + (value - min_input) * f64::from(max_pitch - min_pitch) / (max_input - min_input);
    // `as` truncates toward zero and saturates; NaN becomes 0 and is clamped below.
    let truncated = scaled as i32;
    truncated.clamp(min_pitch, max_pitch)
}

/// Pitch class name, e.g. `C#` for 61.
pub fn note_name(pitch: i32) -> &'static str {
    NOTE_NAMES[pitch.rem_euclid(12) as usize]
}

/// Octave number where pitch 60 is C4.
pub fn octave(pitch: i32) -> i32 {
    pitch.div_euclid(12) - 1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference(value: f64) -> i32 {
        PitchMapping::default().map(value)
    }

    #[test]
    fn values_at_or_below_floor_map_to_min_pitch() {
        for value in [-1000.0, 0.0, 19.9, 20.0] {
            assert_eq!(reference(value), MIN_PITCH, "value {value}");
        }
    }

    #[test]
    fn values_at_or_above_ceiling_map_to_max_pitch() {
        for value in [400.0, 400.1, 600.0, 1e9] {
            assert_eq!(reference(value), MAX_PITCH, "value {value}");
        }
    }

    #[test]
    fn midpoint_maps_to_middle_of_pitch_range() {
        // 36 + 190 * 72 / 380 is exactly 72
        assert_eq!(reference(210.0), 72);
    }

    #[test]
    fn fractional_results_truncate() {
        // 36 + 100 * 72 / 380 = 54.947...
        assert_eq!(reference(120.0), 54);
    }

    #[test]
    fn mapping_is_monotonic() {
        let mut previous = reference(-50.0);
        let mut value = -50.0;
        while value <= 500.0 {
            let pitch = reference(value);
            assert!(pitch >= previous, "{value} mapped to {pitch} after {previous}");
            previous = pitch;
            value += 0.25;
        }
    }

    #[test]
    fn non_finite_inputs_stay_in_range() {
        assert_eq!(reference(f64::NAN), MIN_PITCH);
        assert_eq!(reference(f64::INFINITY), MAX_PITCH);
        assert_eq!(reference(f64::NEG_INFINITY), MIN_PITCH);
    }

    #[test]
    fn custom_ranges() {
        assert_eq!(map_to_pitch(5.0, 0.0, 10.0, 0, 100), 50);
        assert_eq!(map_to_pitch(2.0, 2.0, 22.0, 60, 60), 60);
    }

    #[test]
    fn names_and_octaves() {
        assert_eq!(note_name(36), "C");
        assert_eq!(octave(36), 2);
        assert_eq!(note_name(61), "C#");
        assert_eq!(octave(60), 4);
        assert_eq!(note_name(108), "C");
        assert_eq!(octave(108), 8);
        assert_eq!(note_name(-1), "B");
        assert_eq!(octave(-1), -2);
    }
}
