//! APC40 mixer bridge
//!
//! Translates Akai APC40 control surface events into mixer and clip sequencer
//! actions, and renders host state back onto the device LEDs.

pub mod bank;
pub mod collab;
pub mod config;
pub mod host;
pub mod midi;
pub mod port;
pub mod registry;
pub mod sink;
pub mod surface;

pub use collab::{Collaborators, PlayState};
pub use config::AppConfig;
pub use midi::{DecodedEvent, EventKind, EventWord, MidiMessage};
pub use registry::{ControlSurface, DeviceRegistry};
pub use sink::MidiSink;
pub use surface::MixerSurface;
