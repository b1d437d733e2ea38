use std::sync::Mutex;

use anyhow::{anyhow, bail, Context, Result};
use log::info;
use midir::{MidiOutput, MidiOutputConnection, MidiOutputPort};

use super::{NoteEvent, NoteSink};

const CLIENT_NAME: &str = "glucosedidgeridoo";

/// Names of every MIDI output the system currently exposes.
pub fn list_output_ports() -> Result<Vec<String>> {
    let output = MidiOutput::new(CLIENT_NAME).context("failed to initialise MIDI output")?;
    Ok(output
        .ports()
        .iter()
        .filter_map(|port| output.port_name(port).ok())
        .collect())
}

/// Live MIDI output port.
pub struct MidiPortSink {
    port_name: String,
    // midir connections are Send but not Sync
    connection: Mutex<MidiOutputConnection>,
}

impl MidiPortSink {
    /// Opens the port named `wanted`, falling back to the first port whose
    /// name contains it. With no name the first available port is used.
    pub fn open(wanted: Option<&str>) -> Result<Self> {
        let output = MidiOutput::new(CLIENT_NAME).context("failed to initialise MIDI output")?;
        let ports = output.ports();
        if ports.is_empty() {
            bail!("no MIDI output ports available");
        }

        let named: Vec<(MidiOutputPort, String)> = ports
            .into_iter()
            .filter_map(|port| output.port_name(&port).ok().map(|name| (port, name)))
            .collect();

        let (port, port_name) = select_port(named, wanted)?;

        let connection = output
            .connect(&port, CLIENT_NAME)
            .map_err(|err| anyhow!("failed to connect to MIDI output '{port_name}': {err}"))?;

        info!("Opened MIDI output '{}'", port_name);

        Ok(Self {
            port_name,
            connection: Mutex::new(connection),
        })
    }
}

fn select_port<P>(candidates: Vec<(P, String)>, wanted: Option<&str>) -> Result<(P, String)> {
    let Some(wanted) = wanted else {
        return candidates
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("no MIDI output ports available"));
    };

    let exact = candidates.iter().position(|(_, name)| name == wanted);
    let index = exact
        .or_else(|| candidates.iter().position(|(_, name)| name.contains(wanted)))
        .ok_or_else(|| {
            let available: Vec<&str> = candidates.iter().map(|(_, name)| name.as_str()).collect();
            anyhow!(
                "MIDI output '{wanted}' not found (available: {})",
                available.join(", ")
            )
        })?;

    candidates
        .into_iter()
        .nth(index)
        .ok_or_else(|| anyhow!("port index out of range"))
}

impl NoteSink for MidiPortSink {
    fn send(&self, event: NoteEvent) -> Result<()> {
        let bytes = event
            .to_midi_bytes()
            .ok_or_else(|| anyhow!("pitch {} is outside the MIDI range 0-127", event.pitch))?;

        let mut connection = match self.connection.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        connection
            .send(&bytes)
            .with_context(|| format!("failed to write to MIDI output '{}'", self.port_name))
    }

    fn describe(&self) -> String {
        format!("MIDI output '{}'", self.port_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ports() -> Vec<(u32, String)> {
        vec![
            (0, "Midi Through Port-0".to_string()),
            (1, "FluidSynth virtual port".to_string()),
            (2, "FluidSynth".to_string()),
        ]
    }

    #[test]
    fn exact_name_wins_over_substring() {
        let (port, name) = select_port(ports(), Some("FluidSynth")).unwrap();
        assert_eq!(port, 2);
        assert_eq!(name, "FluidSynth");
    }

    #[test]
    fn substring_match_is_used_as_fallback() {
        let (port, _) = select_port(ports(), Some("Through")).unwrap();
        assert_eq!(port, 0);
    }

    #[test]
    fn no_name_takes_first_port() {
        let (port, _) = select_port(ports(), None).unwrap();
        assert_eq!(port, 0);
    }

    #[test]
    fn missing_port_lists_alternatives() {
        let err = select_port(ports(), Some("Wavetable")).unwrap_err();
        assert!(err.to_string().contains("FluidSynth virtual port"));
    }
}
