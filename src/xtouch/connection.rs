//! Hardware connection through midir
//!
//! Opens the input and output port of every unit. Incoming messages are
//! forwarded with the unit's `PortId` over a tokio channel; outgoing frames
//! collected by the session are written to the matching output.

use anyhow::{anyhow, Context as _, Result};
use colored::Colorize;
use midir::{MidiInput, MidiInputConnection, MidiInputPort, MidiOutput, MidiOutputConnection, MidiOutputPort};
use std::collections::HashMap;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::ports::PortPair;
use crate::context::{OutgoingFrame, PortId};
use crate::midi::format_hex;

/// Raw MIDI received from one unit
#[derive(Debug, Clone)]
pub struct SurfaceEvent {
    pub port: PortId,
    pub timestamp: Instant,
    pub data: Vec<u8>,
}

struct UnitConnection {
    _input: MidiInputConnection<()>,
    output: MidiOutputConnection,
    output_name: String,
}

/// Open connections to every unit of the surface
pub struct SurfaceConnection {
    units: HashMap<PortId, UnitConnection>,
}

/// Find an input port by case-insensitive substring match
fn find_input_port(midi_in: &MidiInput, pattern: &str) -> Option<(MidiInputPort, String)> {
    let pattern = pattern.to_lowercase();
    midi_in.ports().into_iter().find_map(|port| {
        let name = midi_in.port_name(&port).ok()?;
        name.to_lowercase().contains(&pattern).then(|| {
            debug!("Found input '{}' matching '{}'", name, pattern);
            (port, name)
        })
    })
}

/// Find an output port by case-insensitive substring match
fn find_output_port(midi_out: &MidiOutput, pattern: &str) -> Option<(MidiOutputPort, String)> {
    let pattern = pattern.to_lowercase();
    midi_out.ports().into_iter().find_map(|port| {
        let name = midi_out.port_name(&port).ok()?;
        name.to_lowercase().contains(&pattern).then(|| {
            debug!("Found output '{}' matching '{}'", name, pattern);
            (port, name)
        })
    })
}

impl SurfaceConnection {
    /// Connect every unit; fails if any port cannot be found or opened
    pub fn connect(ports: &[PortPair], event_tx: mpsc::Sender<SurfaceEvent>) -> Result<Self> {
        let mut units = HashMap::new();

        for pair in ports {
            let input_pattern = pair.detection_pattern().unwrap_or(pair.input_name());
            let output_pattern = pair.detection_pattern().unwrap_or(pair.output_name());
            info!(
                "Connecting {} unit - Input: '{}', Output: '{}'",
                pair.kind(),
                input_pattern,
                output_pattern
            );

            let midi_in = MidiInput::new("xtouch-session-input")
                .context("Failed to create MIDI input")?;
            let (in_port, in_name) = find_input_port(&midi_in, input_pattern)
                .ok_or_else(|| anyhow!("Input port '{}' not found", input_pattern))?;

            let port_id = pair.id();
            let tx = event_tx.clone();
            let input = midi_in
                .connect(
                    &in_port,
                    "xtouch-session",
                    move |_timestamp, data, _| {
                        let event = SurfaceEvent {
                            port: port_id,
                            timestamp: Instant::now(),
                            data: data.to_vec(),
                        };
                        // Never block the midir thread
                        if tx.try_send(event).is_err() {
                            warn!("Dropped MIDI from {}: {}", port_id, format_hex(data));
                        }
                    },
                    (),
                )
                .map_err(|e| anyhow!("Failed to connect to input port '{}': {}", in_name, e))?;

            let midi_out = MidiOutput::new("xtouch-session-output")
                .context("Failed to create MIDI output")?;
            let (out_port, out_name) = find_output_port(&midi_out, output_pattern)
                .ok_or_else(|| anyhow!("Output port '{}' not found", output_pattern))?;
            let output = midi_out
                .connect(&out_port, "xtouch-session")
                .map_err(|e| anyhow!("Failed to connect to output port '{}': {}", out_name, e))?;

            info!("Connected {} ↔ {}", in_name, out_name);
            units.insert(
                port_id,
                UnitConnection {
                    _input: input,
                    output,
                    output_name: out_name,
                },
            );
        }

        Ok(Self { units })
    }

    /// Write one frame to its unit
    pub fn send(&mut self, frame: &OutgoingFrame) -> Result<()> {
        let unit = self
            .units
            .get_mut(&frame.port)
            .ok_or_else(|| anyhow!("No connection for {}", frame.port))?;

        unit.output
            .send(&frame.bytes)
            .with_context(|| format!("Failed to send MIDI to '{}'", unit.output_name))?;
        debug!("Sent: {} → {}", format_hex(&frame.bytes), unit.output_name);
        Ok(())
    }

    /// Write all frames in order, logging failures instead of stopping
    pub fn flush(&mut self, frames: &[OutgoingFrame]) {
        for frame in frames {
            if let Err(e) = self.send(frame) {
                warn!("{:#}", e);
            }
        }
    }
}

/// Port discovery utilities
pub mod discovery {
    use super::*;

    /// Information about a MIDI port
    #[derive(Debug, Clone)]
    pub struct PortInfo {
        pub index: usize,
        pub name: String,
        pub is_virtual: bool,
    }

    fn is_virtual(name: &str) -> bool {
        name.contains("Virtual") || name.contains("loopMIDI") || name.contains("IAC")
    }

    pub fn discover_input_ports() -> Result<Vec<PortInfo>> {
        let midi_in = MidiInput::new("xtouch-session-discovery")?;
        Ok(midi_in
            .ports()
            .iter()
            .enumerate()
            .filter_map(|(index, port)| {
                let name = midi_in.port_name(port).ok()?;
                Some(PortInfo {
                    index,
                    is_virtual: is_virtual(&name),
                    name,
                })
            })
            .collect())
    }

    pub fn discover_output_ports() -> Result<Vec<PortInfo>> {
        let midi_out = MidiOutput::new("xtouch-session-discovery")?;
        Ok(midi_out
            .ports()
            .iter()
            .enumerate()
            .filter_map(|(index, port)| {
                let name = midi_out.port_name(port).ok()?;
                Some(PortInfo {
                    index,
                    is_virtual: is_virtual(&name),
                    name,
                })
            })
            .collect())
    }

    fn print_list(title: &str, ports: Result<Vec<PortInfo>>, pattern: &str) {
        println!("\n{}", format!("=== MIDI {} Ports ===", title).bold());
        match ports {
            Ok(ports) if ports.is_empty() => println!("  {}", "(none)".dimmed()),
            Ok(ports) => {
                for port in ports {
                    let tag = if port.is_virtual { " [VIRTUAL]" } else { "" };
                    let line = format!("  {}: {}{}", port.index, port.name, tag);
                    if port.name.to_lowercase().contains(&pattern.to_lowercase()) {
                        println!("{}", line.green());
                    } else {
                        println!("{}", line);
                    }
                }
            }
            Err(e) => println!("  {}", format!("unavailable: {}", e).red()),
        }
    }

    /// Print all ports, highlighting those matching `pattern`
    pub fn print_ports(pattern: &str) {
        print_list("Input", discover_input_ports(), pattern);
        print_list("Output", discover_output_ports(), pattern);
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discovered_ports_are_found_by_name() {
        // Without a MIDI backend there is nothing to match
        let (Ok(inputs), Ok(midi_in)) = (
            discovery::discover_input_ports(),
            MidiInput::new("xtouch-session-test"),
        ) else {
            return;
        };
        for port in inputs {
            let (_, name) = find_input_port(&midi_in, &port.name.to_uppercase()).unwrap();
            assert!(name.to_lowercase().contains(&port.name.to_lowercase()));
        }

        let (Ok(outputs), Ok(midi_out)) = (
            discovery::discover_output_ports(),
            MidiOutput::new("xtouch-session-test"),
        ) else {
            return;
        };
        for port in outputs {
            let (_, name) = find_output_port(&midi_out, &port.name).unwrap();
            assert!(name.to_lowercase().contains(&port.name.to_lowercase()));
        }
    }

    #[test]
    fn test_missing_port_is_not_found() {
        let Ok(midi_in) = MidiInput::new("xtouch-session-test") else {
            return;
        };
        assert!(find_input_port(&midi_in, "no such port 7f3a9c").is_none());
    }
}
