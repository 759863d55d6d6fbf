//! MIDI transport
//!
//! Thin layer over `midir`: outbound sends go through [`MidiSink`], inbound
//! callbacks copy the bytes into a tokio channel tagged with the [`Side`]
//! they came from, so one loop handles both ports.

use midir::{MidiInput, MidiInputConnection, MidiOutput, MidiOutputConnection};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::{BridgeError, PortDirection, Result};
use crate::midi::format_hex;
use crate::surface::Side;

/// Client name prefix announced to the MIDI system
pub const CLIENT_NAME: &str = "MidiMix-Bridge";

/// Capacity of the inbound event channel
pub const INBOUND_CAPACITY: usize = 1024;

/// Raw message received on one side
#[derive(Debug, Clone)]
pub struct InboundEvent {
    pub source: Side,
    /// Timestamp from the MIDI driver, in microseconds
    pub driver_timestamp_us: u64,
    pub data: Vec<u8>,
}

/// Anything raw MIDI bytes can be sent to
pub trait MidiSink: Send {
    fn send(&mut self, data: &[u8]) -> Result<()>;
}

/// Output connection bound to one side
pub struct OutputPort {
    side: Side,
    conn: MidiOutputConnection,
}

impl MidiSink for OutputPort {
    fn send(&mut self, data: &[u8]) -> Result<()> {
        self.conn
            .send(data)
            .map_err(|e| BridgeError::SendFailure {
                destination: self.side,
                reason: e.to_string(),
            })
    }
}

/// Input connection; dropping or closing it stops the callback thread
pub struct InputPort {
    conn: MidiInputConnection<()>,
}

impl InputPort {
    pub fn close(self) {
        let _ = self.conn.close();
    }
}

/// Open the output port whose name contains `pattern`
pub fn open_output(side: Side, pattern: &str) -> Result<OutputPort> {
    let midi_out = MidiOutput::new(&format!("{}-{}-Out", CLIENT_NAME, side))?;

    let (port, name) = discovery::find_output_port(&midi_out, pattern).ok_or_else(|| {
        BridgeError::PortNotFound {
            side,
            direction: PortDirection::Output,
            pattern: pattern.to_string(),
        }
    })?;

    info!("Connecting {} output: {}", side, name);
    let conn = midi_out.connect(&port, &format!("{}-{}", CLIENT_NAME, side))?;

    Ok(OutputPort { side, conn })
}

/// Open the input port whose name contains `pattern`, forwarding into `tx`
pub fn open_input(
    side: Side,
    pattern: &str,
    tx: mpsc::Sender<InboundEvent>,
) -> Result<InputPort> {
    let mut midi_in = MidiInput::new(&format!("{}-{}-In", CLIENT_NAME, side))?;
    midi_in.ignore(midir::Ignore::None);

    let (port, name) = discovery::find_input_port(&midi_in, pattern).ok_or_else(|| {
        BridgeError::PortNotFound {
            side,
            direction: PortDirection::Input,
            pattern: pattern.to_string(),
        }
    })?;

    info!("Connecting {} input: {}", side, name);
    let conn = midi_in.connect(
        &port,
        &format!("{}-{}", CLIENT_NAME, side),
        forwarder(side, tx),
        (),
    )?;

    Ok(InputPort { conn })
}

/// Create a virtual output port other applications can read from
#[cfg(unix)]
pub fn create_virtual_output(name: &str) -> Result<OutputPort> {
    use midir::os::unix::VirtualOutput;

    let midi_out = MidiOutput::new(&format!("{}-Virtual-Out", CLIENT_NAME))?;
    let conn = midi_out
        .create_virtual(name)
        .map_err(|e| BridgeError::Midi(e.to_string()))?;

    info!("Created virtual output port: {}", name);
    Ok(OutputPort {
        side: Side::Virtual,
        conn,
    })
}

/// Create a virtual input port other applications can write to
#[cfg(unix)]
pub fn create_virtual_input(name: &str, tx: mpsc::Sender<InboundEvent>) -> Result<InputPort> {
    use midir::os::unix::VirtualInput;

    let mut midi_in = MidiInput::new(&format!("{}-Virtual-In", CLIENT_NAME))?;
    midi_in.ignore(midir::Ignore::None);
    let conn = midi_in
        .create_virtual(name, forwarder(Side::Virtual, tx), ())
        .map_err(|e| BridgeError::Midi(e.to_string()))?;

    info!("Created virtual input port: {}", name);
    Ok(InputPort { conn })
}

/// Callback that copies each message into the channel without blocking
fn forwarder(
    side: Side,
    tx: mpsc::Sender<InboundEvent>,
) -> impl FnMut(u64, &[u8], &mut ()) + Send + 'static {
    move |driver_timestamp_us: u64, data: &[u8], _: &mut ()| {
        let event = InboundEvent {
            source: side,
            driver_timestamp_us,
            data: data.to_vec(),
        };

        if let Err(e) = tx.try_send(event) {
            match e {
                mpsc::error::TrySendError::Full(event) => {
                    warn!("{} inbound queue full; dropped {}", side, format_hex(&event.data));
                }
                mpsc::error::TrySendError::Closed(_) => {
                    debug!("{} inbound queue closed", side);
                }
            }
        }
    }
}

/// Port discovery utilities
pub mod discovery {
    use super::*;
    use colored::*;

    /// Information about a MIDI port
    #[derive(Debug, Clone)]
    pub struct PortInfo {
        pub index: usize,
        pub name: String,
        pub is_virtual: bool,
    }

    /// Case-insensitive substring match, the way port names are matched everywhere
    pub fn name_matches(name: &str, pattern: &str) -> bool {
        name.to_lowercase().contains(&pattern.to_lowercase())
    }

    fn looks_virtual(name: &str) -> bool {
        ["Virtual", "loopMIDI", "IAC", CLIENT_NAME]
            .iter()
            .any(|marker| name.contains(marker))
    }

    /// Find an input port by substring match
    pub fn find_input_port(
        midi_in: &MidiInput,
        pattern: &str,
    ) -> Option<(midir::MidiInputPort, String)> {
        for port in midi_in.ports() {
            if let Ok(name) = midi_in.port_name(&port) {
                if name_matches(&name, pattern) {
                    debug!("Found port '{}' matching pattern '{}'", name, pattern);
                    return Some((port, name));
                }
            }
        }
        None
    }

    /// Find an output port by substring match
    pub fn find_output_port(
        midi_out: &MidiOutput,
        pattern: &str,
    ) -> Option<(midir::MidiOutputPort, String)> {
        for port in midi_out.ports() {
            if let Ok(name) = midi_out.port_name(&port) {
                if name_matches(&name, pattern) {
                    debug!("Found port '{}' matching pattern '{}'", name, pattern);
                    return Some((port, name));
                }
            }
        }
        None
    }

    /// Discover input ports
    pub fn discover_input_ports() -> Result<Vec<PortInfo>> {
        let midi_in = MidiInput::new(&format!("{}-Discovery", CLIENT_NAME))?;

        Ok(midi_in
            .ports()
            .iter()
            .enumerate()
            .filter_map(|(index, port)| {
                midi_in.port_name(port).ok().map(|name| PortInfo {
                    index,
                    is_virtual: looks_virtual(&name),
                    name,
                })
            })
            .collect())
    }

    /// Discover output ports
    pub fn discover_output_ports() -> Result<Vec<PortInfo>> {
        let midi_out = MidiOutput::new(&format!("{}-Discovery", CLIENT_NAME))?;

        Ok(midi_out
            .ports()
            .iter()
            .enumerate()
            .filter_map(|(index, port)| {
                midi_out.port_name(port).ok().map(|name| PortInfo {
                    index,
                    is_virtual: looks_virtual(&name),
                    name,
                })
            })
            .collect())
    }

    /// Print ports for `--list-ports`, marking the ones matching the config
    pub fn print_ports(physical_pattern: &str, virtual_pattern: &str) -> Result<()> {
        let print = |title: &str, ports: Vec<PortInfo>| {
            println!("\n{}", title.bold().cyan());
            if ports.is_empty() {
                println!("  {}", "(none)".dimmed());
            }
            for port in ports {
                let tag = if name_matches(&port.name, physical_pattern) {
                    " [physical]".green().to_string()
                } else if name_matches(&port.name, virtual_pattern) {
                    " [virtual]".yellow().to_string()
                } else if port.is_virtual {
                    " [VIRTUAL]".dimmed().to_string()
                } else {
                    String::new()
                };
                println!("  {}: {}{}", port.index, port.name, tag);
            }
        };

        print("=== MIDI Input Ports ===", discover_input_ports()?);
        print("=== MIDI Output Ports ===", discover_output_ports()?);
        println!();
        Ok(())
    }
}
