use crate::error::CycleError;
use crate::models::Trend;

/// A chord shape: pitch offsets from the root plus the chord-name suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Voicing {
    pub offsets: &'static [i32],
    pub suffix: &'static str,
}

impl Voicing {
    pub fn for_trend(trend: Trend) -> Voicing {
        match trend {
            // augmented triad
            Trend::RisingQuickly => Voicing {
                offsets: &[0, 4, 8],
                suffix: "aug",
            },
            // diminished triad
            Trend::Rising => Voicing {
                offsets: &[0, 3, 6],
                suffix: "dim",
            },
            // major triad
            Trend::RisingSlightly => Voicing {
                offsets: &[0, 4, 7],
                suffix: "",
            },
            // power chord with the octave
            Trend::Steady => Voicing {
                offsets: &[0, 7, 12],
                suffix: "5",
            },
            // minor triad
            Trend::FallingSlightly => Voicing {
                offsets: &[0, 3, 7],
                suffix: "m",
            },
            // maj7sus2 in second inversion
            Trend::Falling => Voicing {
                offsets: &[-5, 0, 6],
                suffix: "maj7sus2",
            },
            Trend::FallingQuickly => Voicing {
                offsets: &[-1, 0, 8],
                suffix: "6sus(b2)",
            },
            Trend::Unavailable => Voicing {
                offsets: &[0],
                suffix: " note",
            },
        }
    }

    /// Absolute pitches for this shape over `root`, in table order.
    ///
    /// Not reclamped: a high root plus a positive offset may leave the
    /// mapped pitch range.
    pub fn pitches(&self, root: i32) -> Vec<i32> {
        self.offsets.iter().map(|offset| root + offset).collect()
    }

    pub fn chord_name(&self, root_name: &str) -> String {
        format!("{root_name}{}", self.suffix)
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }
}

/// Looks up the voicing for a raw trend label.
pub fn voicing_for(label: &str) -> Result<Voicing, CycleError> {
    let trend: Trend = label.parse()?;
    Ok(Voicing::for_trend(trend))
}
