//! In-memory host state
//!
//! Implementations of the collaborator traits that keep mixer, sequencer,
//! selection and recorder state in process. The standalone bridge runs on
//! these; tests use them to observe what the surface did.

use crate::bank::PAD_COLUMNS;
use crate::collab::{
    ChainSelector, Collaborators, MixerStore, PlayState, Recorder, RefreshSink, Sequencer,
    StripControl, StripRef,
};
use crate::config::HostConfig;
use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// State of one mixer strip
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StripState {
    pub mute: bool,
    pub solo: bool,
    pub level: f32,
    pub balance: f32,
}

impl Default for StripState {
    fn default() -> Self {
        Self {
            mute: false,
            solo: false,
            level: 0.8,
            balance: 0.0,
        }
    }
}

/// Mixer with a fixed number of strips plus the main bus level
pub struct MemoryMixer {
    strips: RwLock<Vec<StripState>>,
    master_level: RwLock<f32>,
}

impl MemoryMixer {
    pub fn new(strip_count: usize) -> Self {
        Self {
            strips: RwLock::new(vec![StripState::default(); strip_count]),
            master_level: RwLock::new(0.8),
        }
    }

    pub fn strip(&self, index: usize) -> Option<StripState> {
        self.strips.read().get(index).copied()
    }

    pub fn master_level(&self) -> f32 {
        *self.master_level.read()
    }

    /// Change the number of strips (chains added or removed by the host)
    pub fn resize(&self, strip_count: usize) {
        self.strips
            .write()
            .resize(strip_count, StripState::default());
    }

    fn update(&self, index: usize, apply: impl FnOnce(&mut StripState)) {
        if let Some(strip) = self.strips.write().get_mut(index) {
            apply(strip);
        }
    }
}

impl MixerStore for MemoryMixer {
    fn strip_count(&self) -> usize {
        self.strips.read().len()
    }

    fn mute(&self, index: usize) -> bool {
        self.strip(index).is_some_and(|s| s.mute)
    }

    fn set_mute(&self, index: usize, mute: bool) {
        self.update(index, |s| s.mute = mute);
    }

    fn solo(&self, index: usize) -> bool {
        self.strip(index).is_some_and(|s| s.solo)
    }

    fn set_solo(&self, index: usize, solo: bool) {
        self.update(index, |s| s.solo = solo);
    }

    fn set_level(&self, index: usize, level: f32) {
        self.update(index, |s| s.level = level);
    }

    fn balance(&self, index: usize) -> f32 {
        self.strip(index).map(|s| s.balance).unwrap_or(0.0)
    }

    fn set_balance(&self, index: usize, balance: f32) {
        self.update(index, |s| s.balance = balance);
    }

    fn set_master_level(&self, level: f32) {
        *self.master_level.write() = level;
    }
}

/// Clip sequencer with pads laid out column-major on a fixed-height grid
pub struct MemorySequencer {
    bank: RwLock<u8>,
    rows: u32,
    pad_count: u32,
    states: RwLock<HashMap<(u8, u32), PlayState>>,
    /// Pads whose state changed since the last `take_changes`
    changed: RwLock<BTreeSet<(u8, u32)>>,
}

impl MemorySequencer {
    pub fn new(rows: u32, pad_count: u32) -> Self {
        Self {
            bank: RwLock::new(1),
            rows: rows.max(1),
            pad_count,
            states: RwLock::new(HashMap::new()),
            changed: RwLock::new(BTreeSet::new()),
        }
    }

    pub fn set_bank(&self, bank: u8) {
        *self.bank.write() = bank;
    }

    pub fn set_play_state(&self, bank: u8, pad: u32, state: PlayState) {
        self.states.write().insert((bank, pad), state);
        self.changed.write().insert((bank, pad));
    }

    /// Move pending transitions on at a bar boundary: starting pads play,
    /// stopping pads stop.
    pub fn advance(&self) {
        let mut states = self.states.write();
        let mut changed = self.changed.write();
        for (key, state) in states.iter_mut() {
            let next = match *state {
                PlayState::Starting => PlayState::Playing,
                PlayState::Stopping => PlayState::Stopped,
                _ => continue,
            };
            *state = next;
            changed.insert(*key);
        }
    }

    /// Every pad of the current bank with its state, for a full grid render.
    /// Pending changes are dropped since the snapshot covers them.
    pub fn pad_states(&self) -> Vec<(u32, PlayState)> {
        let bank = self.bank();
        self.changed.write().retain(|(b, _)| *b != bank);
        (0..self.pad_count)
            .map(|pad| (pad, self.play_state(bank, pad)))
            .collect()
    }

    /// Pads of the current bank that changed state, with their new state
    pub fn take_changes(&self) -> Vec<(u32, PlayState)> {
        let bank = self.bank();
        let changed = std::mem::take(&mut *self.changed.write());
        changed
            .into_iter()
            .filter(|(b, _)| *b == bank)
            .map(|(b, pad)| (pad, self.play_state(b, pad)))
            .collect()
    }
}

impl Sequencer for MemorySequencer {
    fn bank(&self) -> u8 {
        *self.bank.read()
    }

    fn pad_from_xy(&self, x: u8, y: u8) -> Option<u32> {
        let (x, y) = (u32::from(x), u32::from(y));
        if y >= self.rows {
            return None;
        }
        let pad = x * self.rows + y;
        (pad < self.pad_count).then_some(pad)
    }

    fn xy_from_pad(&self, pad: u32) -> (u32, u32) {
        (pad / self.rows, pad % self.rows)
    }

    fn play_state(&self, bank: u8, pad: u32) -> PlayState {
        self.states
            .read()
            .get(&(bank, pad))
            .copied()
            .unwrap_or(PlayState::Stopped)
    }

    fn toggle_play_state(&self, bank: u8, pad: u32) {
        let next = match self.play_state(bank, pad) {
            PlayState::Stopped | PlayState::Unknown(_) => PlayState::Starting,
            PlayState::Starting => PlayState::Stopped,
            PlayState::Playing => PlayState::Stopping,
            PlayState::Stopping => PlayState::Playing,
        };
        debug!("Sequencer pad {}:{} -> {:?}", bank, pad, next);
        self.set_play_state(bank, pad, next);
    }

    fn group(&self, _bank: u8, pad: u32) -> u8 {
        (pad / self.rows % u32::from(PAD_COLUMNS)) as u8
    }
}

/// Chain list and current selection. Chain `i` listens on MIDI channel `i`.
pub struct MemorySelector {
    chain_count: RwLock<usize>,
    current: RwLock<Option<usize>>,
}

impl MemorySelector {
    pub fn new(chain_count: usize) -> Self {
        Self {
            chain_count: RwLock::new(chain_count),
            current: RwLock::new(None),
        }
    }

    pub fn set_chain_count(&self, chain_count: usize) {
        *self.chain_count.write() = chain_count;
    }
}

impl ChainSelector for MemorySelector {
    fn chain_count(&self) -> usize {
        *self.chain_count.read()
    }

    fn current_chain(&self) -> Option<usize> {
        *self.current.read()
    }

    fn select_chain(&self, index: usize) {
        *self.current.write() = Some(index);
    }

    fn chain_midi_channel(&self, index: usize) -> Option<u8> {
        if index < self.chain_count() && index < 16 {
            Some(index as u8)
        } else {
            None
        }
    }
}

/// Recorder arming per MIDI channel
#[derive(Default)]
pub struct MemoryRecorder {
    arm_mode: RwLock<bool>,
    armed: RwLock<HashSet<u8>>,
}

impl MemoryRecorder {
    pub fn new(arm_mode: bool) -> Self {
        Self {
            arm_mode: RwLock::new(arm_mode),
            armed: RwLock::new(HashSet::new()),
        }
    }

    pub fn set_arm_mode(&self, arm_mode: bool) {
        *self.arm_mode.write() = arm_mode;
    }
}

impl Recorder for MemoryRecorder {
    fn arm_mode(&self) -> bool {
        *self.arm_mode.read()
    }

    fn is_armed(&self, midi_channel: u8) -> bool {
        self.armed.read().contains(&midi_channel)
    }

    fn toggle_arm(&self, midi_channel: u8) {
        let mut armed = self.armed.write();
        if !armed.remove(&midi_channel) {
            armed.insert(midi_channel);
        }
    }
}

/// Deduplicated queue of strip controls waiting to be re-rendered
#[derive(Default)]
pub struct PendingRefreshQueue {
    pending: RwLock<HashSet<(StripRef, StripControl)>>,
}

impl PendingRefreshQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&self) -> Vec<(StripRef, StripControl)> {
        std::mem::take(&mut *self.pending.write())
            .into_iter()
            .collect()
    }
}

impl RefreshSink for PendingRefreshQueue {
    fn request_refresh(&self, strip: StripRef, control: StripControl) {
        self.pending.write().insert((strip, control));
    }
}

/// All in-memory collaborators, keeping typed handles next to the trait objects
#[derive(Clone)]
pub struct MemoryHost {
    pub mixer: Arc<MemoryMixer>,
    pub sequencer: Arc<MemorySequencer>,
    pub selector: Arc<MemorySelector>,
    pub recorder: Arc<MemoryRecorder>,
    pub refresh: Arc<PendingRefreshQueue>,
}

impl MemoryHost {
    pub fn new(config: &HostConfig) -> Self {
        let pad_count = u32::from(PAD_COLUMNS) * config.pad_rows;
        Self {
            mixer: Arc::new(MemoryMixer::new(config.strips)),
            sequencer: Arc::new(MemorySequencer::new(config.pad_rows, pad_count)),
            selector: Arc::new(MemorySelector::new(config.strips)),
            recorder: Arc::new(MemoryRecorder::new(config.arm_mode)),
            refresh: Arc::new(PendingRefreshQueue::new()),
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            mixer: self.mixer.clone(),
            sequencer: self.sequencer.clone(),
            selector: self.selector.clone(),
            recorder: self.recorder.clone(),
            refresh: self.refresh.clone(),
        }
    }
}
