//! LED rendering: full refresh, pad colors, activation and light-off

use super::MixerSurface;
use crate::bank::{self, Bank, PadCoordinate, PHYSICAL_CHANNELS};
use crate::collab::PlayState;
use crate::midi::{convert, MidiMessage};
use tracing::{debug, info, trace};

/// LED ring mode value: pan position (lit from the centre)
pub const LED_RING_PAN: u8 = 3;

/// LED ring mode value: single dot
pub const LED_RING_DOT: u8 = 2;

/// Offset from a knob CC to the CC selecting its LED ring mode
const RING_MODE_CC_OFFSET: u8 = 8;

/// Clip launch button colors. The value is the Note On velocity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LedColor {
    Off = 0,
    Green = 1,
    GreenBlink = 2,
    Red = 3,
    RedBlink = 4,
    Orange = 5,
    OrangeBlink = 6,
}

impl LedColor {
    /// Color of a pad in `state`. Mode 0 shows every pad red.
    pub fn for_pad(state: PlayState, mode: u8) -> Self {
        if mode == 0 {
            return LedColor::Red;
        }
        match state {
            PlayState::Playing => LedColor::Green,
            PlayState::Stopping => LedColor::Orange,
            PlayState::Starting => LedColor::GreenBlink,
            PlayState::Stopped | PlayState::Unknown(_) => LedColor::Red,
        }
    }

    pub fn velocity(self) -> u8 {
        self as u8
    }
}

impl MixerSurface {
    /// Activation sequence: clear, switch device mode, configure LED rings.
    pub fn init(&mut self) {
        info!("Initialising APC40 (device {})", self.device);
        self.bank = Bank::Left;
        self.light_off();

        self.sink.send(self.device, &MidiMessage::mode_request());

        let layout = &self.settings.layout;
        for &cc in &layout.pan_knob_ccs {
            self.ring_mode(cc, LED_RING_PAN);
        }
        for &cc in &layout.aux_knob_ccs {
            self.ring_mode(cc, LED_RING_DOT);
        }
    }

    /// Select the LED ring mode of the knob sending `knob_cc`
    fn ring_mode(&self, knob_cc: u8, mode: u8) {
        match knob_cc.checked_add(RING_MODE_CC_OFFSET).filter(|cc| *cc <= 0x7F) {
            Some(cc) => self.control_change(0, cc, mode),
            None => debug!("Knob CC {} has no ring mode CC", knob_cc),
        }
    }

    /// Deactivation: clear every LED
    pub fn end(&mut self) {
        info!("Releasing APC40 (device {})", self.device);
        self.light_off();
        self.bank = Bank::Left;
    }

    /// Turn off every LED: velocity 0 for all notes on the 8 strip channels
    pub fn light_off(&self) {
        for note in 0..=127u8 {
            for channel in 0..PHYSICAL_CHANNELS {
                self.note_on(channel, note, 0);
            }
        }
    }

    /// Resync every mixer LED with host state.
    ///
    /// Idempotent: with unchanged host state two calls emit the same messages.
    /// Every refresh is a full one, `force` is accepted for host compatibility.
    pub fn refresh(&self, force: bool) {
        trace!("Refreshing APC40 LEDs (bank={}, force={})", self.bank, force);
        let layout = &self.settings.layout;

        if self.settings.pan_selected {
            self.note_on(0, layout.pan_button_note, 1);
        }

        let (left, right) = match self.bank {
            Bank::Left => (1, 0),
            Bank::Right => (0, 1),
        };
        self.note_on(0, layout.bank_left_note, left);
        self.note_on(0, layout.bank_right_note, right);

        let mixer = &self.collab.mixer;
        let strip_count = mixer.strip_count();
        let arm_mode = self.collab.recorder.arm_mode();

        for channel in 0..PHYSICAL_CHANNELS {
            let index = bank::to_logical(channel, self.bank);
            if index >= strip_count {
                self.note_on(channel, layout.mute_note, 0);
                self.note_on(channel, layout.solo_note, 0);
                continue;
            }

            let pan = convert::from_balance(mixer.balance(index));
            let rec = self.rec_indicator(index, arm_mode);

            self.note_on(channel, layout.mute_note, u8::from(mixer.mute(index)));
            self.note_on(channel, layout.solo_note, u8::from(mixer.solo(index)));
            self.note_on(channel, layout.rec_note, u8::from(rec));
            if let Some(&knob_cc) = layout.pan_knob_ccs.get(usize::from(channel)) {
                self.control_change(0, knob_cc, pan);
            }
        }
    }

    /// Rec LED: the selected chain, or armed chains in arm mode
    fn rec_indicator(&self, index: usize, arm_mode: bool) -> bool {
        let selector = &self.collab.selector;
        let chain_count = selector.chain_count();

        if !arm_mode {
            return index < chain_count && selector.current_chain() == Some(index);
        }

        if index + 1 >= chain_count {
            return false;
        }
        selector
            .chain_midi_channel(index)
            .is_some_and(|midi_channel| self.collab.recorder.is_armed(midi_channel))
    }

    /// Light a clip launch pad for its sequencer state.
    ///
    /// Returns false without sending anything if the pad lies outside the
    /// 8x5 launch grid or the layout gives it no valid note.
    pub fn update_pad(&self, pad: u32, state: PlayState, mode: u8) -> bool {
        debug!("Updating APC40 pad {}", pad);
        let sequencer = &self.collab.sequencer;
        let (col, row) = sequencer.xy_from_pad(pad);

        let Some(coord) = PadCoordinate::from_grid(col, row) else {
            debug!("Pad position {},{} out of bounds for APC40", col, row);
            return false;
        };

        let Some((channel, note)) = coord.to_note(self.settings.layout.pad_note_min) else {
            debug!("Pad {} has no launch note", pad);
            return false;
        };
        let group = sequencer.group(sequencer.bank(), pad);
        let color = LedColor::for_pad(state, mode);

        debug!(
            "Lighting pad {}, group {} => ch {}, note {}, {:?}",
            pad, group, channel, note, color
        );
        self.note_on(channel, note, color.velocity());
        true
    }
}
