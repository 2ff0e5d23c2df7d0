//! MIDI utilities and message types
//!
//! Provides the packed event word used at the transport boundary, its decoded
//! form, outbound message encoding and value conversions.

use std::fmt;

/// Status nibble of a Note On message
pub const NOTE_ON: u8 = 0x9;

/// Status nibble of a Control Change message
pub const CONTROL_CHANGE: u8 = 0xB;

/// Payload of the APC40 mode request (framing bytes excluded).
///
/// Switches the device into "Alternate Ableton Live" mode so that every LED is
/// host controlled.
pub const MODE_REQUEST: [u8; 10] = [0x47, 0x00, 0x73, 0x60, 0x00, 0x04, 0x42, 0x00, 0x00, 0x00];

/// Outbound MIDI message types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MidiMessage {
    /// Note On: channel (0-15), note (0-127), velocity (0-127)
    NoteOn { channel: u8, note: u8, velocity: u8 },

    /// Control Change: channel (0-15), cc (0-127), value (0-127)
    ControlChange { channel: u8, cc: u8, value: u8 },

    /// System Exclusive: payload between F0 and F7
    SysEx { data: Vec<u8> },
}

impl MidiMessage {
    /// The APC40 mode request, `F0 47 00 73 60 00 04 42 00 00 00 F7` on the wire
    pub fn mode_request() -> Self {
        MidiMessage::SysEx {
            data: MODE_REQUEST.to_vec(),
        }
    }

    /// Encode the message to MIDI bytes
    pub fn encode(&self) -> Vec<u8> {
        match *self {
            MidiMessage::NoteOn { channel, note, velocity } => {
                vec![0x90 | (channel & 0x0F), note & 0x7F, velocity & 0x7F]
            }
            MidiMessage::ControlChange { channel, cc, value } => {
                vec![0xB0 | (channel & 0x0F), cc & 0x7F, value & 0x7F]
            }
            MidiMessage::SysEx { ref data } => {
                let mut result = Vec::with_capacity(data.len() + 2);
                result.push(0xF0);
                result.extend_from_slice(data);
                result.push(0xF7);
                result
            }
        }
    }
}

impl fmt::Display for MidiMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            MidiMessage::NoteOn { channel, note, velocity } => {
                write!(f, "NoteOn ch:{} n:{} v:{}", channel + 1, note, velocity)
            }
            MidiMessage::ControlChange { channel, cc, value } => {
                write!(f, "CC ch:{} cc:{} v:{}", channel + 1, cc, value)
            }
            MidiMessage::SysEx { ref data } => {
                write!(f, "SysEx {} bytes", data.len())
            }
        }
    }
}

/// Kind of a decoded channel event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    NoteOn,
    ControlChange,
    /// Any other status nibble, carried for logging only
    Unhandled(u8),
}

impl EventKind {
    fn from_nibble(nibble: u8) -> Self {
        match nibble {
            NOTE_ON => EventKind::NoteOn,
            CONTROL_CHANGE => EventKind::ControlChange,
            other => EventKind::Unhandled(other),
        }
    }
}

/// Event word after decoding. Nothing downstream looks at raw bits again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedEvent {
    pub device: u8,
    pub kind: EventKind,
    pub channel: u8,
    /// Note number or CC number
    pub number: u8,
    /// Velocity or CC value
    pub value: u8,
}

/// Raw 32-bit event word as delivered by the transport.
///
/// Layout, most significant byte first: device index, status byte
/// (type nibble, channel nibble), data byte 1, data byte 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventWord(pub u32);

impl EventWord {
    /// Pack a device index and a status/data triple
    pub fn pack(device: u8, status: u8, data1: u8, data2: u8) -> Self {
        EventWord(
            (u32::from(device) << 24)
                | (u32::from(status) << 16)
                | (u32::from(data1) << 8)
                | u32::from(data2),
        )
    }

    /// Pack a channel message received from a port.
    ///
    /// Returns `None` for running status, SysEx and system messages, which never
    /// reach the surface. Missing data bytes are packed as zero.
    pub fn from_bytes(device: u8, data: &[u8]) -> Option<Self> {
        let status = *data.first()?;
        if !(0x80..0xF0).contains(&status) {
            return None;
        }
        let data1 = data.get(1).copied().unwrap_or(0);
        let data2 = data.get(2).copied().unwrap_or(0);
        Some(Self::pack(device, status, data1, data2))
    }

    /// Decode into structured fields. Total: unknown types become `Unhandled`.
    pub fn decode(self) -> DecodedEvent {
        let word = self.0;
        DecodedEvent {
            device: ((word >> 24) & 0xFF) as u8,
            kind: EventKind::from_nibble(((word >> 20) & 0x0F) as u8),
            channel: ((word >> 16) & 0x0F) as u8,
            number: ((word >> 8) & 0x7F) as u8,
            value: (word & 0x7F) as u8,
        }
    }
}

impl fmt::Display for EventWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08X}", self.0)
    }
}

/// MIDI value conversion utilities
pub mod convert {
    /// Rescale `value` from `[old_min, old_max]` to `[new_min, new_max]`.
    ///
    /// The result is truncated toward zero, not rounded. `old_max` must differ
    /// from `old_min`.
    pub fn range(value: f64, old_min: f64, old_max: f64, new_min: f64, new_max: f64) -> i32 {
        let old_range = old_max - old_min;
        let new_range = new_max - new_min;
        (((value - old_min) * new_range) / old_range + new_min) as i32
    }

    /// Convert 7-bit value (0-127) to a unit level (0.0-1.0)
    pub fn to_unit(value_7bit: u8) -> f32 {
        f32::from(value_7bit) / 127.0
    }

    /// Convert 7-bit value (0-127) to a balance (-1.0 hard left, 1.0 hard right)
    pub fn to_balance(value_7bit: u8) -> f32 {
        2.0 * f32::from(value_7bit) / 127.0 - 1.0
    }

    /// Convert a balance (-1.0-1.0) to a 7-bit LED ring position
    pub fn from_balance(balance: f32) -> u8 {
        range(f64::from(balance), -1.0, 1.0, 0.0, 127.0).clamp(0, 127) as u8
    }
}

/// Format MIDI bytes as hex string for debugging
pub fn format_hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}
