use std::fmt;

use chrono::Local;
use serde::Serialize;

use crate::models::Reading;

/// Everything one played cycle computed, for the console and the logs.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CycleReport {
    /// 1-based number of the cycle; the console header counts from 0.
    pub index: u64,
    pub reading: Reading,
    pub pitch: i32,
    pub note_name: &'static str,
    pub octave: i32,
    pub chord_suffix: &'static str,
    pub pitches: Vec<i32>,
}

impl CycleReport {
    pub fn chord_name(&self) -> String {
        format!("{}{}", self.note_name, self.chord_suffix)
    }
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let taken_at = self
            .reading
            .timestamp
            .with_timezone(&Local)
            .format("%d/%m/%Y, %H:%M:%S");

        writeln!(
            f,
            "======== GLUCOSE NOTE INFORMATION {} ========",
            self.index.saturating_sub(1)
        )?;
        writeln!(f, "Current blood glucose: {} mg/dL", self.reading.value)?;
        writeln!(f, "Date and time of current reading taken: {taken_at}")?;
        writeln!(
            f,
            "Glucose trending: {} {}",
            self.reading.trend.capitalized(),
            self.reading.trend.arrow()
        )?;
        writeln!(f, "MIDI Note: {}", self.pitch)?;
        writeln!(f, "Chord played: {}", self.chord_name())?;
        write!(f, "Octave: {}", self.octave)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Trend;
    use crate::test_support::reading;

    #[test]
    fn console_block_layout() {
        let report = CycleReport {
            index: 4,
            reading: reading(154.0, Trend::FallingSlightly),
            pitch: 61,
            note_name: "C#",
            octave: 4,
            chord_suffix: "m",
            pitches: vec![61, 64, 68],
        };

        let text = report.to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 7);
        assert_eq!(lines[0], "======== GLUCOSE NOTE INFORMATION 3 ========");
        assert_eq!(lines[1], "Current blood glucose: 154 mg/dL");
        assert!(lines[2].starts_with("Date and time of current reading taken: "));
        assert_eq!(lines[3], "Glucose trending: Falling slightly ↘");
        assert_eq!(lines[4], "MIDI Note: 61");
        assert_eq!(lines[5], "Chord played: C#m");
        assert_eq!(lines[6], "Octave: 4");
    }

    #[test]
    fn first_cycle_header_counts_from_zero() {
        let report = CycleReport {
            index: 1,
            reading: reading(20.0, Trend::Steady),
            pitch: 36,
            note_name: "C",
            octave: 2,
            chord_suffix: "5",
            pitches: vec![36, 43, 48],
        };

        let text = report.to_string();
        assert_eq!(
            text.lines().next(),
            Some("======== GLUCOSE NOTE INFORMATION 0 ========")
        );
    }
}
