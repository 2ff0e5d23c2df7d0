//! Outbound MIDI sink

use crate::midi::MidiMessage;
use parking_lot::Mutex;

/// Destination for messages going to the device.
///
/// Sends are fire-and-forget: an implementation that fails to deliver logs the
/// failure and drops the message. The next full refresh heals the LEDs.
pub trait MidiSink: Send + Sync {
    fn send(&self, device: u8, message: &MidiMessage);
}

/// Sink that keeps every message in memory
#[derive(Default)]
pub struct RecordingSink {
    sent: Mutex<Vec<(u8, MidiMessage)>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take recorded messages (consumes them, leaving empty Vec)
    pub fn take(&self) -> Vec<(u8, MidiMessage)> {
        std::mem::take(&mut *self.sent.lock())
    }

    /// Recorded messages without their device index
    pub fn take_messages(&self) -> Vec<MidiMessage> {
        self.take().into_iter().map(|(_, message)| message).collect()
    }

    pub fn len(&self) -> usize {
        self.sent.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sent.lock().is_empty()
    }
}

impl MidiSink for RecordingSink {
    fn send(&self, device: u8, message: &MidiMessage) {
        self.sent.lock().push((device, message.clone()));
    }
}
