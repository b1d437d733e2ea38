use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CycleError;

/// Direction the glucose level is heading, as reported alongside each reading.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum Trend {
    RisingQuickly,
    Rising,
    RisingSlightly,
    Steady,
    FallingSlightly,
    Falling,
    FallingQuickly,
    Unavailable,
}

impl Trend {
    pub const ALL: [Trend; 8] = [
        Trend::RisingQuickly,
        Trend::Rising,
        Trend::RisingSlightly,
        Trend::Steady,
        Trend::FallingSlightly,
        Trend::Falling,
        Trend::FallingQuickly,
        Trend::Unavailable,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Trend::RisingQuickly => "rising quickly",
            Trend::Rising => "rising",
            Trend::RisingSlightly => "rising slightly",
            Trend::Steady => "steady",
            Trend::FallingSlightly => "falling slightly",
            Trend::Falling => "falling",
            Trend::FallingQuickly => "falling quickly",
            Trend::Unavailable => "trend unavailable",
        }
    }

    pub fn arrow(&self) -> &'static str {
        match self {
            Trend::RisingQuickly => "↑↑",
            Trend::Rising => "↑",
            Trend::RisingSlightly => "↗",
            Trend::Steady => "→",
            Trend::FallingSlightly => "↘",
            Trend::Falling => "↓",
            Trend::FallingQuickly => "↓↓",
            Trend::Unavailable => "-",
        }
    }

    /// Label with the first letter upper-cased, for the console report.
    pub fn capitalized(&self) -> String {
        let label = self.label();
        let mut chars = label.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Trend {
    type Err = CycleError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "rising quickly" => Ok(Trend::RisingQuickly),
            "rising" => Ok(Trend::Rising),
            "rising slightly" => Ok(Trend::RisingSlightly),
            "steady" => Ok(Trend::Steady),
            "falling slightly" => Ok(Trend::FallingSlightly),
            "falling" => Ok(Trend::Falling),
            "falling quickly" => Ok(Trend::FallingQuickly),
            "trend unavailable" | "unavailable" => Ok(Trend::Unavailable),
            _ => Err(CycleError::UnrecognizedTrend(value.to_string())),
        }
    }
}

/// One glucose value as handed over by a provider. Values are mg/dL.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    pub value: f64,
    pub timestamp: DateTime<Utc>,
    pub trend: Trend,
}

impl Reading {
    pub fn new(value: f64, timestamp: DateTime<Utc>, trend: Trend) -> Self {
        Self {
            value,
            timestamp,
            trend,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_parse_back_to_the_same_trend() {
        for trend in Trend::ALL {
            assert_eq!(trend.label().parse::<Trend>().unwrap(), trend);
        }
    }

    #[test]
    fn short_unavailable_label_is_accepted() {
        assert_eq!("unavailable".parse::<Trend>().unwrap(), Trend::Unavailable);
        assert_eq!("  Steady ".parse::<Trend>().unwrap(), Trend::Steady);
    }

    #[test]
    fn unknown_label_is_rejected() {
        let err = "sideways".parse::<Trend>().unwrap_err();
        assert!(matches!(err, CycleError::UnrecognizedTrend(label) if label == "sideways"));
    }

    #[test]
    fn capitalized_label_for_report() {
        assert_eq!(Trend::FallingSlightly.capitalized(), "Falling slightly");
        assert_eq!(Trend::Unavailable.capitalized(), "Trend unavailable");
    }
}
