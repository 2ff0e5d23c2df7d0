//! Host collaborators (mixer, sequencer, chain selection, recorder)
//!
//! The surface never owns mixer or sequencer truth. The host hands it these
//! handles at construction and the surface reads and mutates state through them.
//!
//! Note: All methods take &self to support `Arc<dyn ...>`. Implementations use
//! interior mutability for their state.

use std::sync::Arc;

/// Audio mixer state store
pub trait MixerStore: Send + Sync {
    /// Number of live strips. Indices at or above this are not present.
    fn strip_count(&self) -> usize;

    fn mute(&self, index: usize) -> bool;
    fn set_mute(&self, index: usize, mute: bool);

    fn solo(&self, index: usize) -> bool;
    fn set_solo(&self, index: usize, solo: bool);

    /// Fader level, 0.0-1.0
    fn set_level(&self, index: usize, level: f32);

    /// Balance, -1.0 (left) to 1.0 (right)
    fn balance(&self, index: usize) -> f32;
    fn set_balance(&self, index: usize, balance: f32);

    /// Level of the main mix bus, 0.0-1.0
    fn set_master_level(&self, level: f32);
}

/// Play state of a sequence behind a pad
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayState {
    Stopped,
    Playing,
    Stopping,
    Starting,
    /// Any state code the surface has no color for
    Unknown(u8),
}

impl PlayState {
    /// Decode a sequencer state code
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => PlayState::Stopped,
            1 => PlayState::Playing,
            2 => PlayState::Stopping,
            3 => PlayState::Starting,
            other => PlayState::Unknown(other),
        }
    }

    pub fn code(self) -> u8 {
        match self {
            PlayState::Stopped => 0,
            PlayState::Playing => 1,
            PlayState::Stopping => 2,
            PlayState::Starting => 3,
            PlayState::Unknown(code) => code,
        }
    }
}

/// Clip sequencer behind the pad grid
pub trait Sequencer: Send + Sync {
    /// Currently displayed sequence bank
    fn bank(&self) -> u8;

    /// Pad at grid position, or `None` if no pad is mapped there
    fn pad_from_xy(&self, x: u8, y: u8) -> Option<u32>;

    /// Grid position of a pad (may exceed the device grid)
    fn xy_from_pad(&self, pad: u32) -> (u32, u32);

    fn play_state(&self, bank: u8, pad: u32) -> PlayState;
    fn toggle_play_state(&self, bank: u8, pad: u32);

    /// Mutually exclusive play group of a pad
    fn group(&self, bank: u8, pad: u32) -> u8;
}

/// Current chain selection
pub trait ChainSelector: Send + Sync {
    /// Number of chains, including the main bus chain at the end
    fn chain_count(&self) -> usize;

    /// Index of the selected chain
    fn current_chain(&self) -> Option<usize>;

    fn select_chain(&self, index: usize);

    /// MIDI channel of the chain at `index`
    fn chain_midi_channel(&self, index: usize) -> Option<u8>;
}

/// Audio recorder arming
pub trait Recorder: Send + Sync {
    /// Whether rec buttons toggle arming (true) or select chains (false)
    fn arm_mode(&self) -> bool;

    fn is_armed(&self, midi_channel: u8) -> bool;
    fn toggle_arm(&self, midi_channel: u8);
}

/// Strip whose on-screen control needs re-rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StripRef {
    /// The main mix bus strip
    Main,
}

/// Control on a strip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StripControl {
    /// Solo indicator; on the main bus it shows whether any strip is soloed
    Solo,
}

/// Sink for cross-component re-render requests
pub trait RefreshSink: Send + Sync {
    fn request_refresh(&self, strip: StripRef, control: StripControl);
}

/// Every collaborator a surface needs, injected at construction
#[derive(Clone)]
pub struct Collaborators {
    pub mixer: Arc<dyn MixerStore>,
    pub sequencer: Arc<dyn Sequencer>,
    pub selector: Arc<dyn ChainSelector>,
    pub recorder: Arc<dyn Recorder>,
    pub refresh: Arc<dyn RefreshSink>,
}
