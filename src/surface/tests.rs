//! Tests for the APC40 mixer surface

use super::*;
use crate::collab::{ChainSelector, MixerStore, Recorder, Sequencer, StripControl, StripRef};
use crate::config::{HostConfig, Layout};
use crate::host::MemoryHost;
use crate::registry::DeviceRegistry;
use crate::midi::MidiMessage::{ControlChange, NoteOn};
use crate::sink::RecordingSink;

const MUTE: u8 = 50;
const SOLO: u8 = 49;
const REC: u8 = 51;
const BANK_LEFT: u8 = 89;
const BANK_RIGHT: u8 = 90;
const PAN_BUTTON: u8 = 87;
const PAD_NOTE_MIN: u8 = 0x35;

struct Fixture {
    surface: MixerSurface,
    host: MemoryHost,
    sink: Arc<RecordingSink>,
}

fn fixture_with_strips(strips: usize) -> Fixture {
    let host = MemoryHost::new(&HostConfig {
        strips,
        ..HostConfig::default()
    });
    let sink = Arc::new(RecordingSink::new());
    let surface = MixerSurface::new(
        2,
        SurfaceConfig::default(),
        host.collaborators(),
        sink.clone(),
    );
    Fixture {
        surface,
        host,
        sink,
    }
}

fn fixture() -> Fixture {
    fixture_with_strips(17)
}

fn fixture_with_layout(edit: impl FnOnce(&mut Layout)) -> Fixture {
    let mut f = fixture();
    let mut settings = f.surface.settings().clone();
    edit(&mut settings.layout);
    f.surface.apply_settings(settings);
    f
}

fn note_on(channel: u8, note: u8, velocity: u8) -> u32 {
    EventWord::pack(2, 0x90 | channel, note, velocity).0
}

fn cc(channel: u8, cc: u8, value: u8) -> u32 {
    EventWord::pack(2, 0xB0 | channel, cc, value).0
}

fn select_right_bank(f: &mut Fixture) {
    assert!(f.surface.midi_event(note_on(0, BANK_RIGHT, 127)));
    f.sink.take();
}

#[test]
fn test_mute_toggles_banked_strip_and_echoes() {
    let mut f = fixture();
    select_right_bank(&mut f);

    assert!(f.surface.midi_event(note_on(3, MUTE, 127)));

    assert!(f.host.mixer.mute(11));
    assert!(!f.host.mixer.mute(3));
    assert_eq!(
        f.sink.take_messages(),
        vec![NoteOn {
            channel: 3,
            note: MUTE,
            velocity: 1
        }]
    );

    assert!(f.surface.midi_event(note_on(3, MUTE, 127)));
    assert!(!f.host.mixer.mute(11));
    assert_eq!(
        f.sink.take_messages(),
        vec![NoteOn {
            channel: 3,
            note: MUTE,
            velocity: 0
        }]
    );
}

#[test]
fn test_echo_carries_device_index() {
    let mut f = fixture();
    f.surface.midi_event(note_on(0, MUTE, 127));

    let sent = f.sink.take();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, 2);
}

#[test]
fn test_solo_marks_main_bus_for_refresh() {
    let mut f = fixture();

    assert!(f.surface.midi_event(note_on(5, SOLO, 127)));

    assert!(f.host.mixer.solo(5));
    assert_eq!(
        f.host.refresh.take(),
        vec![(StripRef::Main, StripControl::Solo)]
    );
    assert_eq!(
        f.sink.take_messages(),
        vec![NoteOn {
            channel: 5,
            note: SOLO,
            velocity: 1
        }]
    );
}

#[test]
fn test_missing_strip_is_ignored() {
    let mut f = fixture_with_strips(10);
    select_right_bank(&mut f);

    // Channel 3 in the right bank is strip 11, which does not exist
    assert!(f.surface.midi_event(note_on(3, MUTE, 127)));
    assert!(f.surface.midi_event(note_on(3, SOLO, 127)));
    assert!(f.surface.midi_event(cc(3, 7, 100)));
    assert!(f.surface.midi_event(cc(0, 51, 100)));

    assert!(f.sink.is_empty());
    assert!(f.host.refresh.take().is_empty());
    assert_eq!(f.host.mixer.strip_count(), 10);
}

#[test]
fn test_bank_buttons_switch_and_refresh() {
    let mut f = fixture();
    assert_eq!(f.surface.bank(), Bank::Left);

    assert!(f.surface.midi_event(note_on(0, BANK_RIGHT, 127)));
    assert_eq!(f.surface.bank(), Bank::Right);

    let sent = f.sink.take_messages();
    assert!(sent.contains(&NoteOn {
        channel: 0,
        note: BANK_LEFT,
        velocity: 0
    }));
    assert!(sent.contains(&NoteOn {
        channel: 0,
        note: BANK_RIGHT,
        velocity: 1
    }));

    assert!(f.surface.midi_event(note_on(0, BANK_LEFT, 127)));
    assert_eq!(f.surface.bank(), Bank::Left);
}

#[test]
fn test_rec_selects_chain() {
    let mut f = fixture();
    select_right_bank(&mut f);

    assert!(f.surface.midi_event(note_on(2, REC, 127)));

    assert_eq!(f.host.selector.current_chain(), Some(10));
    assert!(f.sink.is_empty());
}

#[test]
fn test_rec_toggles_arm_in_arm_mode() {
    let mut f = fixture();
    f.host.recorder.set_arm_mode(true);

    assert!(f.surface.midi_event(note_on(4, REC, 127)));

    assert!(f.host.recorder.is_armed(4));
    assert_eq!(f.host.selector.current_chain(), None);
    assert_eq!(
        f.sink.take_messages(),
        vec![NoteOn {
            channel: 4,
            note: REC,
            velocity: 1
        }]
    );
}

#[test]
fn test_rec_on_main_bus_does_nothing() {
    // 9 strips: strip 8 is the main bus
    let mut f = fixture_with_strips(9);
    f.host.recorder.set_arm_mode(true);
    select_right_bank(&mut f);

    assert!(f.surface.midi_event(note_on(0, REC, 127)));

    assert!(!f.host.recorder.is_armed(8));
    assert!(f.sink.is_empty());
}

#[test]
fn test_pad_press_toggles_play_state() {
    let mut f = fixture();
    let bank = f.host.sequencer.bank();

    assert!(f.surface.midi_event(note_on(2, PAD_NOTE_MIN + 3, 127)));

    let pad = f.host.sequencer.pad_from_xy(2, 3).unwrap();
    assert_eq!(f.host.sequencer.play_state(bank, pad), PlayState::Starting);
    assert!(f.sink.is_empty());
}

#[test]
fn test_pad_outside_grid_is_not_consumed() {
    let mut f = fixture();

    assert!(!f.surface.midi_event(note_on(2, PAD_NOTE_MIN + 5, 127)));
    assert!(!f.surface.midi_event(note_on(2, PAD_NOTE_MIN - 1, 127)));
    assert!(!f.surface.midi_event(note_on(9, PAD_NOTE_MIN, 127)));
    assert!(f.host.sequencer.take_changes().is_empty());
}

#[test]
fn test_master_fader_sets_main_level() {
    let mut f = fixture();

    assert!(f.surface.midi_event(cc(0, 14, 127)));
    assert_eq!(f.host.mixer.master_level(), 1.0);
    assert!(f.sink.is_empty());
}

#[test]
fn test_channel_fader_sets_banked_level() {
    let mut f = fixture();
    select_right_bank(&mut f);

    assert!(f.surface.midi_event(cc(1, 7, 0)));

    assert_eq!(f.host.mixer.strip(9).unwrap().level, 0.0);
    assert_eq!(f.host.mixer.strip(1).unwrap().level, 0.8);
}

#[test]
fn test_pan_knob_sets_balance_by_knob_position() {
    let mut f = fixture();

    // Knob 3 sends on channel 0; the strip comes from the CC, not the channel
    assert!(f.surface.midi_event(cc(0, 51, 127)));
    assert!(f.surface.midi_event(cc(0, 48, 0)));

    assert_eq!(f.host.mixer.balance(3), 1.0);
    assert_eq!(f.host.mixer.balance(0), -1.0);
    assert!(f.sink.is_empty());
}

#[test]
fn test_unknown_cc_is_echoed_but_not_consumed() {
    let mut f = fixture();

    assert!(!f.surface.midi_event(cc(4, 16, 42)));
    assert_eq!(
        f.sink.take_messages(),
        vec![ControlChange {
            channel: 4,
            cc: 16,
            value: 42
        }]
    );
}

#[test]
fn test_cc_passthrough_can_be_disabled() {
    let mut f = fixture();
    let mut settings = f.surface.settings().clone();
    settings.cc_passthrough = false;
    f.surface.apply_settings(settings);

    assert!(!f.surface.midi_event(cc(4, 16, 42)));
    assert!(f.sink.is_empty());
}

#[test]
fn test_unhandled_event_types() {
    let mut f = fixture();

    // Note Off, pitch bend, unmapped note
    assert!(!f.surface.midi_event(EventWord::pack(2, 0x80, MUTE, 0).0));
    assert!(!f.surface.midi_event(EventWord::pack(2, 0xE0, 0, 64).0));
    assert!(!f.surface.midi_event(note_on(0, 100, 127)));

    assert!(f.sink.is_empty());
    assert!(!f.host.mixer.mute(0));
}

#[test]
fn test_refresh_default_state() {
    let f = fixture();
    f.surface.refresh(false);

    let sent = f.sink.take_messages();
    assert_eq!(sent.len(), 3 + 8 * 4);
    assert_eq!(
        &sent[..3],
        &[
            NoteOn {
                channel: 0,
                note: PAN_BUTTON,
                velocity: 1
            },
            NoteOn {
                channel: 0,
                note: BANK_LEFT,
                velocity: 1
            },
            NoteOn {
                channel: 0,
                note: BANK_RIGHT,
                velocity: 0
            },
        ]
    );
    assert_eq!(
        &sent[3..7],
        &[
            NoteOn {
                channel: 0,
                note: MUTE,
                velocity: 0
            },
            NoteOn {
                channel: 0,
                note: SOLO,
                velocity: 0
            },
            NoteOn {
                channel: 0,
                note: REC,
                velocity: 0
            },
            ControlChange {
                channel: 0,
                cc: 48,
                value: 63
            },
        ]
    );
}

#[test]
fn test_refresh_reflects_mixer_state() {
    let f = fixture();
    f.host.mixer.set_mute(1, true);
    f.host.mixer.set_solo(2, true);
    f.host.mixer.set_balance(3, 1.0);
    f.host.selector.select_chain(4);

    f.surface.refresh(true);
    let sent = f.sink.take_messages();

    assert!(sent.contains(&NoteOn {
        channel: 1,
        note: MUTE,
        velocity: 1
    }));
    assert!(sent.contains(&NoteOn {
        channel: 2,
        note: SOLO,
        velocity: 1
    }));
    assert!(sent.contains(&ControlChange {
        channel: 0,
        cc: 51,
        value: 127
    }));
    assert!(sent.contains(&NoteOn {
        channel: 4,
        note: REC,
        velocity: 1
    }));
}

#[test]
fn test_refresh_rec_shows_arming_in_arm_mode() {
    let f = fixture();
    f.host.recorder.set_arm_mode(true);
    f.host.recorder.toggle_arm(6);
    f.host.selector.select_chain(1);

    f.surface.refresh(false);
    let sent = f.sink.take_messages();

    assert!(sent.contains(&NoteOn {
        channel: 6,
        note: REC,
        velocity: 1
    }));
    assert!(sent.contains(&NoteOn {
        channel: 1,
        note: REC,
        velocity: 0
    }));
}

#[test]
fn test_refresh_skips_missing_strips() {
    let mut f = fixture_with_strips(10);
    select_right_bank(&mut f);

    f.surface.refresh(false);
    let sent = f.sink.take_messages();

    // 3 indicators, 2 present strips with 4 messages, 6 absent with 2
    assert_eq!(sent.len(), 3 + 2 * 4 + 6 * 2);
    assert!(!sent.iter().any(|m| matches!(
        m,
        NoteOn { channel: 5, note: REC, .. } | ControlChange { cc: 53, .. }
    )));
}

#[test]
fn test_refresh_is_idempotent() {
    let f = fixture();
    f.host.mixer.set_mute(0, true);
    f.host.mixer.set_balance(7, -0.5);

    f.surface.refresh(false);
    let first = f.sink.take();
    f.surface.refresh(false);
    let second = f.sink.take();

    assert!(!first.is_empty());
    assert_eq!(first, second);
}

#[test]
fn test_pan_indicator_follows_settings() {
    let mut f = fixture();
    let mut settings = f.surface.settings().clone();
    settings.pan_selected = false;
    f.surface.apply_settings(settings);

    f.surface.refresh(false);
    let sent = f.sink.take_messages();
    assert!(!sent.iter().any(|m| matches!(m, NoteOn { note: PAN_BUTTON, .. })));
}

#[test]
fn test_light_off_clears_every_note() {
    let f = fixture();
    f.surface.light_off();

    let sent = f.sink.take_messages();
    assert_eq!(sent.len(), 128 * 8);
    assert!(sent
        .iter()
        .all(|m| matches!(m, NoteOn { velocity: 0, channel, .. } if *channel < 8)));
}

#[test]
fn test_update_pad_colors() {
    let f = fixture();
    // Pad 13 sits at column 2, row 3
    assert!(f.surface.update_pad(13, PlayState::Playing, 1));
    assert!(f.surface.update_pad(13, PlayState::Playing, 0));
    assert!(f.surface.update_pad(13, PlayState::Unknown(12), 1));

    assert_eq!(
        f.sink.take_messages(),
        vec![
            NoteOn {
                channel: 2,
                note: PAD_NOTE_MIN + 3,
                velocity: LedColor::Green.velocity()
            },
            NoteOn {
                channel: 2,
                note: PAD_NOTE_MIN + 3,
                velocity: LedColor::Red.velocity()
            },
            NoteOn {
                channel: 2,
                note: PAD_NOTE_MIN + 3,
                velocity: LedColor::Red.velocity()
            },
        ]
    );
}

#[test]
fn test_update_pad_outside_grid_fails() {
    let f = fixture();
    // Pad 40 sits at column 8, row 0
    assert_eq!(f.host.sequencer.xy_from_pad(40), (8, 0));

    assert!(!f.surface.update_pad(40, PlayState::Playing, 1));
    assert!(f.sink.is_empty());
}

#[test]
fn test_init_sequence() {
    let mut f = fixture();
    select_right_bank(&mut f);

    f.surface.init();
    assert_eq!(f.surface.bank(), Bank::Left);

    let sent = f.sink.take_messages();
    assert_eq!(sent.len(), 1024 + 1 + 8 + 8);
    assert!(sent[..1024]
        .iter()
        .all(|m| matches!(m, NoteOn { velocity: 0, .. })));
    assert_eq!(sent[1024], MidiMessage::mode_request());
    assert_eq!(
        sent[1025],
        ControlChange {
            channel: 0,
            cc: 56,
            value: LED_RING_PAN
        }
    );
    assert_eq!(
        sent[1033],
        ControlChange {
            channel: 0,
            cc: 24,
            value: LED_RING_DOT
        }
    );
}

#[test]
fn test_end_clears_leds_and_resets_bank() {
    let mut f = fixture();
    select_right_bank(&mut f);

    f.surface.end();

    assert_eq!(f.surface.bank(), Bank::Left);
    assert_eq!(f.sink.len(), 1024);
}

#[test]
fn test_activate_initialises_then_refreshes() {
    let mut f = fixture();

    ControlSurface::activate(&mut f.surface);

    let sent = f.sink.take_messages();
    assert_eq!(sent.len(), 1041 + 35);
    assert_eq!(
        sent[1041],
        NoteOn {
            channel: 0,
            note: PAN_BUTTON,
            velocity: 1
        }
    );
}

#[test]
fn test_reloaded_layout_takes_effect() {
    let mut f = fixture();
    let mut settings = f.surface.settings().clone();
    settings.layout.fader_cc = 9;
    f.surface.apply_settings(settings);

    assert!(f.surface.midi_event(cc(0, 9, 0)));
    assert_eq!(f.host.mixer.strip(0).unwrap().level, 0.0);

    // The old fader CC is now unmapped
    assert!(!f.surface.midi_event(cc(0, 7, 0)));
}

#[test]
fn test_refresh_with_short_pan_row_skips_missing_knobs() {
    let f = fixture_with_layout(|layout| layout.pan_knob_ccs.truncate(4));

    f.surface.refresh(false);
    let sent = f.sink.take_messages();

    // 4 channels lose their pan CC
    assert_eq!(sent.len(), 3 + 8 * 4 - 4);
    let pan_ccs = sent
        .iter()
        .filter(|m| matches!(m, ControlChange { .. }))
        .count();
    assert_eq!(pan_ccs, 4);
}

#[test]
fn test_init_skips_knobs_without_ring_mode_cc() {
    let mut f = fixture_with_layout(|layout| {
        layout.aux_knob_ccs[0] = 250;
        layout.pan_knob_ccs[7] = 125;
    });

    f.surface.init();
    let sent = f.sink.take_messages();

    assert_eq!(sent.len(), 1024 + 1 + 7 + 7);
    assert!(sent.iter().all(|m| match m {
        ControlChange { cc, .. } => *cc <= 0x7F,
        _ => true,
    }));
}

#[test]
fn test_update_pad_with_high_launch_notes_fails() {
    let f = fixture_with_layout(|layout| layout.pad_note_min = 126);

    // Row 0 still fits, row 3 would be note 129
    assert!(f.surface.update_pad(10, PlayState::Playing, 1));
    assert!(!f.surface.update_pad(13, PlayState::Playing, 1));

    assert_eq!(
        f.sink.take_messages(),
        vec![NoteOn {
            channel: 2,
            note: 126,
            velocity: LedColor::Green.velocity()
        }]
    );

    let f = fixture_with_layout(|layout| layout.pad_note_min = 255);
    assert!(!f.surface.update_pad(0, PlayState::Playing, 1));
    assert!(f.sink.is_empty());
}

#[test]
fn test_activation_then_grid_render_lights_every_pad() {
    let f = fixture();
    f.host
        .sequencer
        .set_play_state(f.host.sequencer.bank(), 7, PlayState::Playing);

    let mut registry = DeviceRegistry::new();
    registry.register(2, Box::new(f.surface)).unwrap();
    registry.activate(2);
    f.sink.take();

    assert_eq!(registry.update_pads(&f.host.sequencer.pad_states(), 1), 40);

    let sent = f.sink.take_messages();
    assert_eq!(sent.len(), 40);
    let green = sent
        .iter()
        .filter(|m| matches!(m, NoteOn { velocity, .. } if *velocity == LedColor::Green.velocity()))
        .count();
    assert_eq!(green, 1);
    // Pad 7 sits at column 1, row 2
    assert!(sent.contains(&NoteOn {
        channel: 1,
        note: PAD_NOTE_MIN + 2,
        velocity: LedColor::Green.velocity()
    }));
    assert!(sent.contains(&NoteOn {
        channel: 7,
        note: PAD_NOTE_MIN + 4,
        velocity: LedColor::Red.velocity()
    }));
}
