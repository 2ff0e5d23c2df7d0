//! Incoming event dispatch

use super::MixerSurface;
use crate::bank::{self, Bank, PadCoordinate, PHYSICAL_CHANNELS};
use crate::collab::{StripControl, StripRef};
use crate::midi::{convert, DecodedEvent, EventKind, EventWord};
use tracing::{debug, trace};

impl MixerSurface {
    /// Handle a raw event word from the device.
    ///
    /// Returns whether the event was consumed. Unknown event types, unmapped
    /// notes and unmapped CCs are not consumed.
    pub fn midi_event(&mut self, raw: u32) -> bool {
        let event = EventWord(raw).decode();
        match event.kind {
            EventKind::NoteOn => self.on_note_on(event),
            EventKind::ControlChange => self.on_control_change(event),
            EventKind::Unhandled(kind) => {
                trace!("Ignoring event type {:X} ({})", kind, EventWord(raw));
                false
            }
        }
    }

    fn on_note_on(&mut self, event: DecodedEvent) -> bool {
        let DecodedEvent { channel, number: note, .. } = event;

        if note == self.settings.layout.bank_left_note {
            self.switch_bank(Bank::Left);
            return true;
        }
        if note == self.settings.layout.bank_right_note {
            self.switch_bank(Bank::Right);
            return true;
        }

        let layout = &self.settings.layout;

        if channel >= PHYSICAL_CHANNELS {
            trace!("Note {} on channel {} has no strip", note, channel);
            return false;
        }

        if note == layout.mute_note {
            self.toggle_mute(channel);
            true
        } else if note == layout.solo_note {
            self.toggle_solo(channel);
            true
        } else if note == layout.rec_note {
            self.press_rec(channel);
            true
        } else if let Some(coord) = PadCoordinate::from_note(channel, note, layout.pad_note_min) {
            self.launch_pad(coord);
            true
        } else {
            false
        }
    }

    fn switch_bank(&mut self, bank: Bank) {
        debug!("APC40 bank -> {}", bank);
        self.bank = bank;
        self.refresh(false);
    }

    fn toggle_mute(&self, channel: u8) {
        let index = bank::to_logical(channel, self.bank);
        if !self.strip_present(index) {
            debug!("Mute on channel {}: no strip {}", channel, index);
            return;
        }

        let mixer = &self.collab.mixer;
        let mute = !mixer.mute(index);
        mixer.set_mute(index, mute);
        debug!("Strip {} mute -> {}", index, mute);

        self.note_on(channel, self.settings.layout.mute_note, u8::from(mute));
    }

    fn toggle_solo(&self, channel: u8) {
        let index = bank::to_logical(channel, self.bank);
        if !self.strip_present(index) {
            debug!("Solo on channel {}: no strip {}", channel, index);
            return;
        }

        let mixer = &self.collab.mixer;
        let solo = !mixer.solo(index);
        mixer.set_solo(index, solo);
        debug!("Strip {} solo -> {}", index, solo);

        // The main bus solo indicator reflects whether any strip is soloed
        self.collab
            .refresh
            .request_refresh(StripRef::Main, StripControl::Solo);

        self.note_on(channel, self.settings.layout.solo_note, u8::from(solo));
    }

    fn press_rec(&self, channel: u8) {
        let index = bank::to_logical(channel, self.bank);
        // The last strip is the main bus, which can be neither selected nor armed
        if index + 1 >= self.collab.mixer.strip_count() {
            debug!("Rec on channel {}: no chain {}", channel, index);
            return;
        }

        if !self.collab.recorder.arm_mode() {
            debug!("Selecting chain {}", index);
            self.collab.selector.select_chain(index);
            return;
        }

        let Some(midi_channel) = self.collab.selector.chain_midi_channel(index) else {
            debug!("Chain {} has no MIDI channel to arm", index);
            return;
        };

        let recorder = &self.collab.recorder;
        recorder.toggle_arm(midi_channel);
        let armed = recorder.is_armed(midi_channel);
        debug!("Chain {} (MIDI ch {}) armed -> {}", index, midi_channel, armed);

        self.note_on(channel, self.settings.layout.rec_note, u8::from(armed));
    }

    fn launch_pad(&self, coord: PadCoordinate) {
        let sequencer = &self.collab.sequencer;
        match sequencer.pad_from_xy(coord.x, coord.y) {
            Some(pad) => {
                let seq_bank = sequencer.bank();
                debug!("Toggling pad {} ({},{}) in bank {}", pad, coord.x, coord.y, seq_bank);
                sequencer.toggle_play_state(seq_bank, pad);
            }
            None => {
                debug!("No pad at ({},{})", coord.x, coord.y);
            }
        }
    }

    fn on_control_change(&self, event: DecodedEvent) -> bool {
        let layout = &self.settings.layout;
        let DecodedEvent {
            channel,
            number: cc,
            value,
            ..
        } = event;

        if channel == layout.master_channel && cc == layout.master_cc {
            trace!("Master level -> {}", value);
            self.collab.mixer.set_master_level(convert::to_unit(value));
            return true;
        }

        if cc == layout.fader_cc {
            let index = bank::to_logical(channel, self.bank);
            if self.strip_present(index) {
                trace!("Strip {} level -> {}", index, value);
                self.collab.mixer.set_level(index, convert::to_unit(value));
            } else {
                debug!("Fader on channel {}: no strip {}", channel, index);
            }
            return true;
        }

        if let Some(position) = layout.pan_knob_position(cc) {
            let index = position + self.bank.offset();
            if self.strip_present(index) {
                trace!("Strip {} balance -> {}", index, value);
                self.collab
                    .mixer
                    .set_balance(index, convert::to_balance(value));
            } else {
                debug!("Pan knob {}: no strip {}", position, index);
            }
            return true;
        }

        if self.settings.cc_passthrough {
            self.control_change(channel, cc, value);
        }
        false
    }
}
