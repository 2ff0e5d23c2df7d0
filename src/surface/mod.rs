//! APC40 mixer surface - translation between device events and host state
//!
//! The surface owns exactly one piece of state, the bank selector. Everything
//! else is read from and written to the host collaborators on each call:
//! - `dispatch`: incoming event words to mixer/sequencer actions
//! - `render`: host state to LED messages (refresh, pads, activation)

mod dispatch;
mod render;

pub use render::{LedColor, LED_RING_DOT, LED_RING_PAN};

#[cfg(test)]
mod tests;

use crate::bank::Bank;
use crate::collab::{Collaborators, PlayState};
use crate::config::SurfaceConfig;
use crate::midi::{EventWord, MidiMessage};
use crate::registry::ControlSurface;
use crate::sink::MidiSink;
use std::sync::Arc;
use tracing::{info, warn};

/// Port names the APC40 announces itself with
pub const DEVICE_IDS: &[&str] = &["Akai_APC40_MIDI_1", "APC40"];

/// Akai APC40 driving the host mixer and clip launcher
pub struct MixerSurface {
    /// Device index used on every outbound message
    device: u8,
    /// Active bank (0-7 or 8-15)
    bank: Bank,
    /// Layout and behaviour flags
    settings: SurfaceConfig,
    /// Host state
    collab: Collaborators,
    /// Where LED messages go
    sink: Arc<dyn MidiSink>,
}

impl MixerSurface {
    /// Create a surface for `device`. The bank starts on the left.
    pub fn new(
        device: u8,
        settings: SurfaceConfig,
        collab: Collaborators,
        sink: Arc<dyn MidiSink>,
    ) -> Self {
        warn_invalid_layout(&settings);
        Self {
            device,
            bank: Bank::Left,
            settings,
            collab,
            sink,
        }
    }

    pub fn bank(&self) -> Bank {
        self.bank
    }

    pub fn settings(&self) -> &SurfaceConfig {
        &self.settings
    }

    /// Swap in a reloaded configuration. Call `refresh` afterwards.
    pub fn apply_settings(&mut self, settings: SurfaceConfig) {
        if settings != self.settings {
            info!("APC40 surface settings updated");
            warn_invalid_layout(&settings);
        }
        self.settings = settings;
    }

    /// Whether a logical strip exists in the mixer right now
    fn strip_present(&self, index: usize) -> bool {
        index < self.collab.mixer.strip_count()
    }

    fn note_on(&self, channel: u8, note: u8, velocity: u8) {
        self.sink.send(
            self.device,
            &MidiMessage::NoteOn {
                channel,
                note,
                velocity,
            },
        );
    }

    fn control_change(&self, channel: u8, cc: u8, value: u8) {
        self.sink
            .send(self.device, &MidiMessage::ControlChange { channel, cc, value });
    }
}

/// Controls a bad layout addresses are skipped, the rest keep working
fn warn_invalid_layout(settings: &SurfaceConfig) {
    if let Err(e) = settings.layout.validate() {
        warn!("APC40 layout is invalid, affected controls stay dark: {:#}", e);
    }
}

impl ControlSurface for MixerSurface {
    fn name(&self) -> &str {
        "akai-apc40-mixer"
    }

    fn device_ids(&self) -> &[&str] {
        DEVICE_IDS
    }

    fn activate(&mut self) {
        self.init();
        self.refresh(true);
    }

    fn deactivate(&mut self) {
        self.end();
    }

    fn handle_event(&mut self, word: EventWord) -> bool {
        self.midi_event(word.0)
    }

    fn render_state(&mut self, force: bool) {
        self.refresh(force);
    }

    fn update_pad(&mut self, pad: u32, state: PlayState, mode: u8) -> bool {
        MixerSurface::update_pad(self, pad, state, mode)
    }

    fn reconfigure(&mut self, settings: &SurfaceConfig) {
        self.apply_settings(settings.clone());
    }
}
