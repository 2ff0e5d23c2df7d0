//! Bank selection and strip index translation
//!
//! The APC40 has 8 physical channel strips. The bank buttons switch them
//! between logical strips 0-7 and 8-15.

use std::fmt;

/// Number of physical channel strips on the device
pub const PHYSICAL_CHANNELS: u8 = 8;

/// Pad grid width (one column per physical channel)
pub const PAD_COLUMNS: u8 = 8;

/// Pad grid height (one row per launch note)
pub const PAD_ROWS: u8 = 5;

/// Which group of 8 logical strips the physical strips address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Bank {
    /// Strips 0-7
    #[default]
    Left,
    /// Strips 8-15
    Right,
}

impl Bank {
    /// Index of the first logical strip in this bank
    pub fn offset(self) -> usize {
        match self {
            Bank::Left => 0,
            Bank::Right => PHYSICAL_CHANNELS as usize,
        }
    }
}

impl fmt::Display for Bank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bank::Left => write!(f, "left"),
            Bank::Right => write!(f, "right"),
        }
    }
}

/// Logical strip index addressed by a physical channel in the given bank
pub fn to_logical(physical: u8, bank: Bank) -> usize {
    usize::from(physical) + bank.offset()
}

/// Physical channel and bank that address a logical strip index
pub fn to_physical(logical: usize) -> (u8, Bank) {
    let physical = (logical % PHYSICAL_CHANNELS as usize) as u8;
    let bank = if logical >= PHYSICAL_CHANNELS as usize {
        Bank::Right
    } else {
        Bank::Left
    };
    (physical, bank)
}

/// Position of a pad on the launch grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PadCoordinate {
    pub x: u8,
    pub y: u8,
}

impl PadCoordinate {
    /// Resolve a launch note pressed on `channel`.
    ///
    /// The grid columns are split across MIDI channels 0-7, rows are the notes
    /// `pad_note_min..pad_note_min + 5`. Anything outside the grid is `None`.
    pub fn from_note(channel: u8, note: u8, pad_note_min: u8) -> Option<Self> {
        if channel >= PAD_COLUMNS {
            return None;
        }
        let y = note.checked_sub(pad_note_min)?;
        if y >= PAD_ROWS {
            return None;
        }
        Some(Self { x: channel, y })
    }

    /// Grid position reported by the sequencer, if it fits on the device
    pub fn from_grid(col: u32, row: u32) -> Option<Self> {
        if col >= u32::from(PAD_COLUMNS) || row >= u32::from(PAD_ROWS) {
            return None;
        }
        Some(Self {
            x: col as u8,
            y: row as u8,
        })
    }

    /// MIDI channel and note that light this pad, `None` if the note
    /// would leave the 7-bit range
    pub fn to_note(self, pad_note_min: u8) -> Option<(u8, u8)> {
        let note = pad_note_min.checked_add(self.y).filter(|n| *n <= 0x7F)?;
        Some((self.x, note))
    }
}
