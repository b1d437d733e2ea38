pub mod config;
pub mod cycle;
pub mod emission;
pub mod error;
pub mod mapping;
pub mod models;
pub mod provider;
pub mod scheduler;
pub mod sink;
mod utils;

#[cfg(test)]
mod test_support;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};

use config::{Cli, Command, Output, ReadingSource, Settings};
use cycle::{CycleTiming, PollCycle};
use emission::{EmissionSequencer, EventLog};
use provider::{DexcomShareClient, ReadingProvider, SimulatedProvider};
use scheduler::{ScheduleSummary, Scheduler};
use sink::{list_output_ports, LogSink, MidiPortSink, NoteSink};

pub async fn run() -> Result<()> {
    // RUST_LOG overrides the default level
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = match Cli::parse().into_command()? {
        Command::ListPorts => return print_ports(),
        Command::Run(settings) => settings,
    };

    println!("Starting script...");
    play(settings).await
}

fn print_ports() -> Result<()> {
    let ports = list_output_ports()?;
    println!("======== Available MIDI ports ========");
    for port in ports {
        println!("'{port}'");
    }
    println!("======================================");
    Ok(())
}

async fn play(settings: Settings) -> Result<()> {
    let sink: Arc<dyn NoteSink> = match &settings.output {
        Output::MidiPort(name) => Arc::new(
            MidiPortSink::open(name.as_deref()).context("cannot start without a MIDI output")?,
        ),
        Output::DryRun => Arc::new(LogSink),
    };

    let provider: Arc<dyn ReadingProvider> = match &settings.source {
        ReadingSource::Dexcom {
            credentials,
            region,
        } => Arc::new(
            DexcomShareClient::connect(
                credentials.username.clone(),
                credentials.password.clone(),
                *region,
            )
            .await?,
        ),
        ReadingSource::Simulated => Arc::new(SimulatedProvider::new()),
    };

    info!(
        "Reading from {}, playing on {} (chord length {:?}, release {:?})",
        provider.describe(),
        sink.describe(),
        settings.hold(),
        settings.release
    );

    let event_log = settings
        .midi_file
        .as_ref()
        .map(|_| Arc::new(EventLog::new(settings.hold())));

    let mut sequencer = EmissionSequencer::new(Arc::clone(&sink), settings.channel);
    if let Some(event_log) = &event_log {
        sequencer = sequencer.with_event_log(Arc::clone(event_log));
    }

    let cycle = Arc::new(PollCycle::new(
        provider,
        sequencer,
        settings.mapping,
        CycleTiming {
            hold: settings.hold(),
            release: settings.release,
            fetch_timeout: settings.fetch_timeout,
        },
    ));

    let mut scheduler = Scheduler::new(cycle);
    scheduler.start(settings.hold(), settings.max_concurrent)?;

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for the interrupt signal")?;

    println!("================= END INFO =================");
    println!("Stopping script...");

    let stopped = scheduler.stop().await;
    let recording = settings.midi_file.as_deref().zip(event_log.as_deref());
    let summary = finish(stopped, recording)?;
    println!("{summary}");

    Ok(())
}

/// Flushes the event log whether or not the scheduler stopped cleanly, then
/// hands back the stop result.
fn finish(
    stopped: Result<ScheduleSummary>,
    recording: Option<(&Path, &EventLog)>,
) -> Result<ScheduleSummary> {
    if let Some((path, event_log)) = recording {
        match event_log.write_to(path) {
            Ok(()) => info!("Wrote {} note events to {}", event_log.len(), path.display()),
            Err(err) if stopped.is_err() => error!("{err:#}"),
            Err(err) => return Err(err),
        }
    }
    stopped
}
