//! APC40 MIDI port connection
//!
//! Opens the device's input and output ports with midir. Incoming channel
//! messages are packed into event words and queued for the surface. Outgoing
//! messages are queued by a `PortSink` and written to the device on `flush`,
//! so the surface never touches the midir connection.

use midir::{MidiInput, MidiInputConnection, MidiOutput, MidiOutputConnection};
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use crate::config::MidiConfig;
use crate::midi::{format_hex, EventWord, MidiMessage};
use crate::sink::MidiSink;

/// Port connection failures
#[derive(Debug, Error)]
pub enum PortError {
    #[error("MIDI {direction} port '{pattern}' not found")]
    PortNotFound {
        direction: &'static str,
        pattern: String,
    },

    #[error("not connected to output port")]
    NotConnected,

    #[error("failed to initialise MIDI backend: {0}")]
    Init(#[from] midir::InitError),

    #[error("failed to connect to port '{port}': {reason}")]
    Connect { port: String, reason: String },

    #[error("failed to send MIDI message: {0}")]
    Send(#[from] midir::SendError),
}

/// Event queue depth between the MIDI thread and the surface
const EVENT_QUEUE: usize = 1000;

/// Connection to one APC40
pub struct Apc40Port {
    /// MIDI input connection
    input_conn: Option<MidiInputConnection<()>>,

    /// MIDI output connection
    output_conn: Option<Mutex<MidiOutputConnection>>,

    /// Event sender for incoming MIDI
    event_tx: mpsc::Sender<EventWord>,

    /// Event receiver
    event_rx: Option<mpsc::Receiver<EventWord>>,

    /// Sender handed out to sinks
    out_tx: mpsc::UnboundedSender<MidiMessage>,

    /// Messages waiting for `flush`
    out_rx: mpsc::UnboundedReceiver<MidiMessage>,

    /// Device index stamped into event words
    device: u8,

    input_port_name: String,
    output_port_name: String,
}

impl Apc40Port {
    pub fn new(config: &MidiConfig) -> Self {
        let (event_tx, event_rx) = mpsc::channel(EVENT_QUEUE);
        let (out_tx, out_rx) = mpsc::unbounded_channel();

        Self {
            input_conn: None,
            output_conn: None,
            event_tx,
            event_rx: Some(event_rx),
            out_tx,
            out_rx,
            device: config.device_index,
            input_port_name: config.input_port.clone(),
            output_port_name: config.output_port.clone(),
        }
    }

    /// Find an input port by substring match
    fn find_input_port(
        midi_in: &MidiInput,
        pattern: &str,
    ) -> Option<(midir::MidiInputPort, String)> {
        let pattern = pattern.to_lowercase();
        midi_in.ports().into_iter().find_map(|port| {
            let name = midi_in.port_name(&port).ok()?;
            name.to_lowercase().contains(&pattern).then(|| {
                debug!("Found input port '{}'", name);
                (port, name)
            })
        })
    }

    /// Find an output port by substring match
    fn find_output_port(
        midi_out: &MidiOutput,
        pattern: &str,
    ) -> Option<(midir::MidiOutputPort, String)> {
        let pattern = pattern.to_lowercase();
        midi_out.ports().into_iter().find_map(|port| {
            let name = midi_out.port_name(&port).ok()?;
            name.to_lowercase().contains(&pattern).then(|| {
                debug!("Found output port '{}'", name);
                (port, name)
            })
        })
    }

    /// Connect to the APC40 MIDI ports
    pub fn connect(&mut self) -> Result<(), PortError> {
        self.disconnect();

        info!(
            "Connecting to APC40 - Input: '{}', Output: '{}'",
            self.input_port_name, self.output_port_name
        );

        let midi_in = MidiInput::new("APC40-Mixer-Input")?;
        let (in_port, in_name) = Self::find_input_port(&midi_in, &self.input_port_name)
            .ok_or_else(|| PortError::PortNotFound {
                direction: "input",
                pattern: self.input_port_name.clone(),
            })?;

        let event_tx = self.event_tx.clone();
        let device = self.device;

        let input_conn = midi_in
            .connect(
                &in_port,
                "APC40-Mixer",
                move |_timestamp, data, _| match EventWord::from_bytes(device, data) {
                    Some(word) => {
                        if event_tx.try_send(word).is_err() {
                            warn!("Event queue full, dropping {}", format_hex(data));
                        }
                    }
                    None => trace!("Ignoring non-channel message: {}", format_hex(data)),
                },
                (),
            )
            .map_err(|e| PortError::Connect {
                port: in_name.clone(),
                reason: e.to_string(),
            })?;
        info!("Connected to input port: {}", in_name);

        let midi_out = MidiOutput::new("APC40-Mixer-Output")?;
        let (out_port, out_name) = Self::find_output_port(&midi_out, &self.output_port_name)
            .ok_or_else(|| PortError::PortNotFound {
                direction: "output",
                pattern: self.output_port_name.clone(),
            })?;

        let output_conn = midi_out
            .connect(&out_port, "APC40-Mixer")
            .map_err(|e| PortError::Connect {
                port: out_name.clone(),
                reason: e.to_string(),
            })?;
        info!("Connected to output port: {}", out_name);

        self.input_conn = Some(input_conn);
        self.output_conn = Some(Mutex::new(output_conn));
        Ok(())
    }

    /// Disconnect from MIDI ports
    pub fn disconnect(&mut self) {
        if self.is_connected() {
            info!("APC40 disconnected");
        }
        self.input_conn = None;
        self.output_conn = None;
    }

    pub fn is_connected(&self) -> bool {
        self.input_conn.is_some() && self.output_conn.is_some()
    }

    /// Take the event receiver (for the surface loop to consume)
    pub fn take_event_receiver(&mut self) -> Option<mpsc::Receiver<EventWord>> {
        self.event_rx.take()
    }

    /// Sink queuing messages for this port
    pub fn sink(&self) -> PortSink {
        PortSink {
            tx: self.out_tx.clone(),
        }
    }

    /// Send raw MIDI bytes to the APC40
    pub fn send_raw(&self, data: &[u8]) -> Result<(), PortError> {
        let output = self.output_conn.as_ref().ok_or(PortError::NotConnected)?;
        output.lock().send(data)?;
        Ok(())
    }

    /// Write every queued message to the device.
    ///
    /// Failed sends are logged and dropped. Returns the number of messages
    /// taken from the queue.
    pub fn flush(&mut self) -> usize {
        let mut count = 0;
        while let Ok(message) = self.out_rx.try_recv() {
            count += 1;
            let data = message.encode();
            match self.send_raw(&data) {
                Ok(()) => trace!("Sent: {} | {}", format_hex(&data), message),
                Err(e) => warn!("Dropped {}: {}", message, e),
            }
        }
        count
    }
}

/// Cloneable sink feeding an `Apc40Port` output queue
#[derive(Clone)]
pub struct PortSink {
    tx: mpsc::UnboundedSender<MidiMessage>,
}

impl MidiSink for PortSink {
    fn send(&self, _device: u8, message: &MidiMessage) {
        if self.tx.send(message.clone()).is_err() {
            warn!("Port closed, dropping {}", message);
        }
    }
}

/// Port discovery utilities
pub mod discovery {
    use super::*;
    use crate::surface::DEVICE_IDS;

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

    /// Discover input ports
    pub fn discover_input_ports() -> Result<Vec<PortInfo>, PortError> {
        let midi_in = MidiInput::new("APC40-Mixer-Discovery")?;
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

    /// Discover output ports
    pub fn discover_output_ports() -> Result<Vec<PortInfo>, PortError> {
        let midi_out = MidiOutput::new("APC40-Mixer-Discovery")?;
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

    /// Whether a port name looks like an APC40
    pub fn is_apc40(name: &str) -> bool {
        let name = name.to_lowercase();
        DEVICE_IDS.iter().any(|id| name.contains(&id.to_lowercase()))
    }

    /// Find the APC40 input/output pair automatically
    pub fn find_apc40_ports() -> Option<(String, String)> {
        let inputs = discover_input_ports().ok()?;
        let outputs = discover_output_ports().ok()?;

        let input = inputs.iter().find(|p| is_apc40(&p.name) && !p.is_virtual)?;
        let output = outputs.iter().find(|p| is_apc40(&p.name) && !p.is_virtual)?;
        Some((input.name.clone(), output.name.clone()))
    }

    /// List all ports in a formatted way
    pub fn list_ports_formatted() {
        use colored::*;

        println!("\n{}", "=== Available MIDI Ports ===".bold().cyan());

        let sections = [
            ("Input Ports:", discover_input_ports()),
            ("Output Ports:", discover_output_ports()),
        ];
        for (title, ports) in sections {
            println!("\n{}", title.bold());
            match ports {
                Ok(ports) if ports.is_empty() => {
                    println!("  {}", "No ports found".dimmed());
                }
                Ok(ports) => {
                    for port in ports {
                        let marker = if port.is_virtual {
                            "[VIRTUAL]".yellow()
                        } else {
                            "[PHYSICAL]".green()
                        };
                        println!("  {} {}", marker, port.name);
                    }
                }
                Err(e) => println!("  {}", e.to_string().red()),
            }
        }

        if let Some((input, output)) = find_apc40_ports() {
            println!("\n{}", "Auto-detected APC40:".bold().bright_green());
            println!("  Input:  {}", input.bright_white());
            println!("  Output: {}", output.bright_white());
        }

        println!();
    }
}
