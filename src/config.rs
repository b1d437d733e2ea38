use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use clap::Parser;

use crate::mapping::PitchMapping;
use crate::provider::Region;

pub const DEFAULT_INTERVAL_SECS: u64 = 8;
pub const DEFAULT_RELEASE_MS: u64 = 10;
pub const DEFAULT_MAX_CONCURRENT: usize = 3;
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;

const BEATS_PER_BAR: f64 = 4.0;

/// Longest chord (and polling period) accepted.
pub const MAX_HOLD: Duration = Duration::from_secs(24 * 60 * 60);

/// Plays live Dexcom glucose readings as MIDI chords.
///
/// The reading sets the root note, the trend arrow picks the chord.
#[derive(Debug, Parser)]
#[command(name = "glucosedidgeridoo", version, about, long_about = None)]
pub struct Cli {
    /// Dexcom Share username
    #[arg(long, env = "DEXCOM_USERNAME", required_unless_present_any = ["list_ports", "simulate"])]
    pub username: Option<String>,

    /// Dexcom Share password
    #[arg(
        long,
        env = "DEXCOM_PASSWORD",
        hide_env_values = true,
        required_unless_present_any = ["list_ports", "simulate"]
    )]
    pub password: Option<String>,

    /// Share server the account belongs to
    #[arg(long, value_enum, env = "DEXCOM_REGION", default_value_t = Region::Ous)]
    pub region: Region,

    /// MIDI output port to play on (exact name or a unique part of it);
    /// defaults to the first port found
    #[arg(long, env = "PORT")]
    pub port: Option<String>,

    /// Seconds between readings; each chord lasts one interval
    #[arg(long, env = "INTERVAL", conflicts_with = "tempo")]
    pub interval: Option<u64>,

    /// Tempo in BPM; each chord lasts one 4/4 bar and readings follow the bar
    #[arg(long, env = "TEMPO")]
    pub tempo: Option<f64>,

    /// Release time of the synthesizer in milliseconds
    #[arg(long, env = "SYNTH_RELEASE", default_value_t = DEFAULT_RELEASE_MS)]
    pub release: u64,

    /// MIDI channel (0-15)
    #[arg(long, default_value_t = 0)]
    pub channel: u8,

    /// Most cycles allowed to overlap before ticks are dropped
    #[arg(long, default_value_t = DEFAULT_MAX_CONCURRENT)]
    pub max_concurrent: usize,

    /// Seconds to wait for Dexcom before giving up on a cycle
    #[arg(long, default_value_t = DEFAULT_FETCH_TIMEOUT_SECS)]
    pub fetch_timeout: u64,

    /// Also record everything played to this MIDI file, written on exit
    #[arg(long, env = "MIDI_FILE")]
    pub midi_file: Option<PathBuf>,

    /// List available MIDI output ports and exit
    #[arg(long)]
    pub list_ports: bool,

    /// Use a simulated sensor instead of Dexcom Share
    #[arg(long)]
    pub simulate: bool,

    /// Log notes instead of opening a MIDI port
    #[arg(long)]
    pub dry_run: bool,
}

/// How the chord length (and polling period) is derived.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HoldMode {
    Interval(Duration),
    Tempo { bpm: f64 },
}

impl HoldMode {
    pub fn hold(&self) -> Duration {
        match self {
            HoldMode::Interval(interval) => *interval,
            HoldMode::Tempo { bpm } => bar_length(*bpm).unwrap_or(Duration::MAX),
        }
    }
}

fn bar_length(bpm: f64) -> Option<Duration> {
    Duration::try_from_secs_f64(60.0 / bpm * BEATS_PER_BAR).ok()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReadingSource {
    Dexcom {
        credentials: Credentials,
        region: Region,
    },
    Simulated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    MidiPort(Option<String>),
    DryRun,
}

/// Validated settings for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub source: ReadingSource,
    pub output: Output,
    pub hold_mode: HoldMode,
    pub release: Duration,
    pub channel: u8,
    pub max_concurrent: usize,
    pub fetch_timeout: Duration,
    pub midi_file: Option<PathBuf>,
    pub mapping: PitchMapping,
}

impl Settings {
    pub fn hold(&self) -> Duration {
        self.hold_mode.hold()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    ListPorts,
    Run(Settings),
}

impl Cli {
    pub fn into_command(self) -> Result<Command> {
        if self.list_ports {
            return Ok(Command::ListPorts);
        }

        let hold_mode = match (self.interval, self.tempo) {
            (Some(_), Some(_)) => bail!("--interval and --tempo cannot be combined"),
            (_, Some(bpm)) => {
                if !bpm.is_finite() || bpm <= 0.0 {
                    bail!("tempo must be a positive number of beats per minute, got {bpm}");
                }
                match bar_length(bpm) {
                    Some(bar) if bar <= MAX_HOLD => HoldMode::Tempo { bpm },
                    _ => bail!("tempo {bpm} BPM is too slow: one bar may last at most {MAX_HOLD:?}"),
                }
            }
            (Some(0), None) => bail!("interval must be at least one second"),
            (Some(secs), None) if Duration::from_secs(secs) > MAX_HOLD => {
                bail!("interval may be at most {} seconds, got {secs}", MAX_HOLD.as_secs())
            }
            (Some(secs), None) => HoldMode::Interval(Duration::from_secs(secs)),
            (None, None) => HoldMode::Interval(Duration::from_secs(DEFAULT_INTERVAL_SECS)),
        };

        let release = Duration::from_millis(self.release);
        if release >= hold_mode.hold() {
            bail!(
                "release time ({:?}) must be shorter than the chord length ({:?})",
                release,
                hold_mode.hold()
            );
        }
        if self.channel > 15 {
            bail!("MIDI channel must be 0-15, got {}", self.channel);
        }
        if self.max_concurrent == 0 {
            bail!("--max-concurrent must be at least 1");
        }
        if self.fetch_timeout == 0 {
            bail!("--fetch-timeout must be at least one second");
        }

        let source = if self.simulate {
            ReadingSource::Simulated
        } else {
            let username = self
                .username
                .ok_or_else(|| anyhow!("a Dexcom username is required"))?;
            let password = self
                .password
                .ok_or_else(|| anyhow!("a Dexcom password is required"))?;
            ReadingSource::Dexcom {
                credentials: Credentials { username, password },
                region: self.region,
            }
        };

        let output = if self.dry_run {
            Output::DryRun
        } else {
            Output::MidiPort(self.port)
        };

        Ok(Command::Run(Settings {
            source,
            output,
            hold_mode,
            release,
            channel: self.channel,
            max_concurrent: self.max_concurrent,
            fetch_timeout: Duration::from_secs(self.fetch_timeout),
            midi_file: self.midi_file,
            mapping: PitchMapping::default(),
        }))
    }
}
