//! Configuration management for the APC40 mixer bridge
//!
//! Handles loading, parsing, and hot-reloading of YAML configuration files.

pub mod watcher;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tokio::fs;

pub use watcher::ConfigWatcher;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub midi: MidiConfig,
    #[serde(default)]
    pub surface: SurfaceConfig,
    #[serde(default)]
    pub host: HostConfig,
}

/// MIDI port configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MidiConfig {
    pub input_port: String,
    pub output_port: String,
    /// Device index stamped into every event word from this device
    #[serde(default)]
    pub device_index: u8,
}

/// Surface behaviour
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SurfaceConfig {
    /// Light the pan button: the knob row shows strip balance
    #[serde(default = "default_true")]
    pub pan_selected: bool,
    /// Echo unrecognised control changes back to the device
    #[serde(default = "default_true")]
    pub cc_passthrough: bool,
    #[serde(default)]
    pub layout: Layout,
}

/// Note and CC numbers of the APC40 controls
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Layout {
    #[serde(default = "default_bank_left_note")]
    pub bank_left_note: u8,
    #[serde(default = "default_bank_right_note")]
    pub bank_right_note: u8,
    #[serde(default = "default_mute_note")]
    pub mute_note: u8,
    #[serde(default = "default_solo_note")]
    pub solo_note: u8,
    #[serde(default = "default_rec_note")]
    pub rec_note: u8,
    #[serde(default = "default_pan_button_note")]
    pub pan_button_note: u8,
    #[serde(default = "default_pan_knob_ccs")]
    pub pan_knob_ccs: Vec<u8>,
    #[serde(default = "default_aux_knob_ccs")]
    pub aux_knob_ccs: Vec<u8>,
    #[serde(default = "default_fader_cc")]
    pub fader_cc: u8,
    #[serde(default)]
    pub master_channel: u8,
    #[serde(default = "default_master_cc")]
    pub master_cc: u8,
    /// Lowest clip launch note; the grid uses 5 consecutive notes
    #[serde(default = "default_pad_note_min")]
    pub pad_note_min: u8,
}

/// In-memory host used by the standalone bridge
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HostConfig {
    /// Mixer strips, the last one being the main bus
    #[serde(default = "default_strips")]
    pub strips: usize,
    /// Rows per pad grid column
    #[serde(default = "default_pad_rows")]
    pub pad_rows: u32,
    /// Start with rec buttons in arm mode
    #[serde(default)]
    pub arm_mode: bool,
    /// Bar length of the sequencer clock; pending pads start or stop on bars
    #[serde(default = "default_bar_ms")]
    pub bar_ms: u64,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            pan_selected: true,
            cc_passthrough: true,
            layout: Layout::default(),
        }
    }
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            bank_left_note: default_bank_left_note(),
            bank_right_note: default_bank_right_note(),
            mute_note: default_mute_note(),
            solo_note: default_solo_note(),
            rec_note: default_rec_note(),
            pan_button_note: default_pan_button_note(),
            pan_knob_ccs: default_pan_knob_ccs(),
            aux_knob_ccs: default_aux_knob_ccs(),
            fader_cc: default_fader_cc(),
            master_channel: 0,
            master_cc: default_master_cc(),
            pad_note_min: default_pad_note_min(),
        }
    }
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            strips: default_strips(),
            pad_rows: default_pad_rows(),
            arm_mode: false,
            bar_ms: default_bar_ms(),
        }
    }
}

impl Layout {
    /// Highest clip launch note
    pub fn pad_note_max(&self) -> u8 {
        self.pad_note_min + crate::bank::PAD_ROWS - 1
    }

    /// Logical offset of a pan knob CC within its row
    pub fn pan_knob_position(&self, cc: u8) -> Option<usize> {
        self.pan_knob_ccs.iter().position(|&c| c == cc)
    }

    /// Validate note/CC ranges and collisions
    pub fn validate(&self) -> Result<()> {
        let notes = [
            ("bank_left_note", self.bank_left_note),
            ("bank_right_note", self.bank_right_note),
            ("mute_note", self.mute_note),
            ("solo_note", self.solo_note),
            ("rec_note", self.rec_note),
            ("pan_button_note", self.pan_button_note),
        ];

        let mut seen = HashSet::new();
        for (name, note) in notes {
            if note > 127 {
                anyhow::bail!("{} {} is invalid (must be 0-127)", name, note);
            }
            if !seen.insert(note) {
                anyhow::bail!("{} {} is already used by another button", name, note);
            }
        }

        if self.pad_note_min > 127 - (crate::bank::PAD_ROWS - 1) {
            anyhow::bail!(
                "pad_note_min {} leaves no room for {} launch rows",
                self.pad_note_min,
                crate::bank::PAD_ROWS
            );
        }
        let pad_notes = self.pad_note_min..=self.pad_note_max();
        for (name, note) in notes {
            if pad_notes.contains(&note) {
                anyhow::bail!("{} {} collides with the clip launch notes", name, note);
            }
        }

        if self.pan_knob_ccs.len() != crate::bank::PHYSICAL_CHANNELS as usize {
            anyhow::bail!(
                "pan_knob_ccs must list {} CCs, got {}",
                crate::bank::PHYSICAL_CHANNELS,
                self.pan_knob_ccs.len()
            );
        }
        if self.aux_knob_ccs.len() != crate::bank::PHYSICAL_CHANNELS as usize {
            anyhow::bail!(
                "aux_knob_ccs must list {} CCs, got {}",
                crate::bank::PHYSICAL_CHANNELS,
                self.aux_knob_ccs.len()
            );
        }

        // Ring mode CCs sit 8 above each knob
        for cc in self.pan_knob_ccs.iter().chain(self.aux_knob_ccs.iter()) {
            if *cc > 119 {
                anyhow::bail!("knob CC {} is invalid (must be 0-119)", cc);
            }
        }
        for (name, cc) in [("fader_cc", self.fader_cc), ("master_cc", self.master_cc)] {
            if cc > 127 {
                anyhow::bail!("{} {} is invalid (must be 0-127)", name, cc);
            }
        }
        if self.master_channel > 15 {
            anyhow::bail!(
                "master_channel {} is invalid (must be 0-15)",
                self.master_channel
            );
        }

        Ok(())
    }
}

impl AppConfig {
    /// Load configuration from file with validation
    pub async fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path))?;

        Self::from_yaml(&contents).with_context(|| format!("Invalid config file: {}", path))
    }

    /// Parse and validate configuration from YAML text
    pub fn from_yaml(contents: &str) -> Result<Self> {
        let config: AppConfig =
            serde_yaml::from_str(contents).context("Failed to parse YAML config")?;

        config.validate()?;

        Ok(config)
    }

    /// Settings that differ from `running` but only take effect on restart
    pub fn restart_required_changes(&self, running: &AppConfig) -> Vec<&'static str> {
        let mut changed = Vec::new();
        if self.midi.input_port != running.midi.input_port {
            changed.push("midi.input_port");
        }
        if self.midi.output_port != running.midi.output_port {
            changed.push("midi.output_port");
        }
        if self.midi.device_index != running.midi.device_index {
            changed.push("midi.device_index");
        }
        if self.host.pad_rows != running.host.pad_rows {
            changed.push("host.pad_rows");
        }
        if self.host.bar_ms != running.host.bar_ms {
            changed.push("host.bar_ms");
        }
        changed
    }

    /// Validate configuration for correctness and consistency
    pub fn validate(&self) -> Result<()> {
        if self.midi.input_port.is_empty() {
            anyhow::bail!("MIDI input_port cannot be empty");
        }
        if self.midi.output_port.is_empty() {
            anyhow::bail!("MIDI output_port cannot be empty");
        }

        self.surface
            .layout
            .validate()
            .context("Invalid surface layout")?;

        if self.host.strips == 0 {
            anyhow::bail!("host.strips must include at least the main bus");
        }
        if self.host.pad_rows == 0 {
            anyhow::bail!("host.pad_rows cannot be zero");
        }
        if self.host.bar_ms == 0 {
            anyhow::bail!("host.bar_ms cannot be zero");
        }

        Ok(())
    }
}

// Default value functions
fn default_true() -> bool { true }
fn default_bank_left_note() -> u8 { 89 }
fn default_bank_right_note() -> u8 { 90 }
fn default_mute_note() -> u8 { 50 }
fn default_solo_note() -> u8 { 49 }
fn default_rec_note() -> u8 { 51 }
fn default_pan_button_note() -> u8 { 87 }
fn default_pan_knob_ccs() -> Vec<u8> { (48..56).collect() }
fn default_aux_knob_ccs() -> Vec<u8> { (16..24).collect() }
fn default_fader_cc() -> u8 { 7 }
fn default_master_cc() -> u8 { 14 }
fn default_pad_note_min() -> u8 { 0x35 }
fn default_strips() -> usize { 17 }
fn default_pad_rows() -> u32 { 5 }
fn default_bar_ms() -> u64 { 2000 }
