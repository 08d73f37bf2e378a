//! A single polyphonic rendering slot.

use super::queue::EventQueue;
use crate::limits::VOICE_EVENTS_MAX;
use std::any::Any;

/// Rendering priority of a voice.
///
/// Foreground voices hold notes a channel still controls; background
/// voices are releasing. The ordering is the steal order: inactive first,
/// then background, then foreground.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum VoicePrio {
    Inactive = 0,
    Bg,
    Fg,
}

/// Per-voice playback state read and written by the bound processor.
#[derive(Default)]
pub struct VoiceState {
    /// Whether there is anything left to process.
    pub active: bool,
    /// Set by the processor when it renders this voice; voices that no
    /// processor touched in a chunk are reclaimed.
    pub updated: bool,
    /// Whether the note is still held (no note off seen yet).
    pub note_on: bool,
    /// Playback frequency of the note in Hz.
    pub freq: f64,
    /// Pitch in cents after retuning, before per-frame adjustments.
    pub pitch: f64,
    /// Force in dB applied at note on.
    pub force: f64,
    /// Playback position in whole frames since note on.
    pub pos: u64,
    /// Fractional part of the playback position.
    pub pos_part: f64,
    /// Frames since note off.
    pub rel_pos: u64,
    /// Fractional part of the release position.
    pub rel_pos_part: f64,
    /// Attack anticlick ramp, 0 to 1.
    pub ramp_attack: f64,
    /// Release anticlick ramp, 1 to 0.
    pub ramp_release: f64,
    /// Peak amplitude produced in the last rendered segment.
    pub last_peak: f32,
    /// Processor-specific state, created through `init_vstate`.
    pub impl_state: Option<Box<dyn Any + Send + Sync>>,
}

impl std::fmt::Debug for VoiceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoiceState")
            .field("active", &self.active)
            .field("note_on", &self.note_on)
            .field("freq", &self.freq)
            .field("pos", &self.pos)
            .finish_non_exhaustive()
    }
}

impl VoiceState {
    /// Reset to the just-allocated state for a new note.
    pub fn init(&mut self) {
        self.active = true;
        self.updated = false;
        self.note_on = true;
        self.freq = 0.0;
        self.pitch = 0.0;
        self.force = 0.0;
        self.pos = 0;
        self.pos_part = 0.0;
        self.rel_pos = 0;
        self.rel_pos_part = 0.0;
        self.ramp_attack = 0.0;
        self.ramp_release = 1.0;
        self.last_peak = 0.0;
        self.impl_state = None;
    }

    pub fn impl_state<T: 'static>(&self) -> Option<&T> {
        self.impl_state.as_ref().and_then(|s| s.downcast_ref())
    }

    pub fn impl_state_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.impl_state.as_mut().and_then(|s| s.downcast_mut())
    }
}

/// One slot of the voice pool.
#[derive(Debug)]
pub struct Voice {
    /// Stable storage position in the pool.
    pub(crate) pool_index: usize,
    /// Generation counter; bumps on every allocation so stale references
    /// can be detected.
    pub(crate) id: u64,
    /// Note-on grouping; all voices of a group are stolen together.
    pub(crate) group_id: u64,
    pub(crate) prio: VoicePrio,
    pub(crate) events: EventQueue,
    /// The audio unit whose processor renders this voice.
    pub(crate) au_index: Option<usize>,
    /// The bound processor's device id.
    pub(crate) device_id: Option<usize>,
    /// The channel that triggered this voice.
    pub(crate) ch_index: usize,
    pub state: VoiceState,
}

impl Voice {
    pub(crate) fn new(pool_index: usize) -> Self {
        Self {
            pool_index,
            id: 0,
            group_id: 0,
            prio: VoicePrio::Inactive,
            events: EventQueue::new(VOICE_EVENTS_MAX),
            au_index: None,
            device_id: None,
            ch_index: 0,
            state: VoiceState::default(),
        }
    }

    pub fn pool_index(&self) -> usize {
        self.pool_index
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn group_id(&self) -> u64 {
        self.group_id
    }

    pub fn prio(&self) -> VoicePrio {
        self.prio
    }

    pub fn au_index(&self) -> Option<usize> {
        self.au_index
    }

    pub fn device_id(&self) -> Option<usize> {
        self.device_id
    }

    pub fn ch_index(&self) -> usize {
        self.ch_index
    }

    pub fn events(&mut self) -> &mut EventQueue {
        &mut self.events
    }

    /// Whether this voice is currently below the audibility threshold.
    pub(crate) fn is_near_silent(&self) -> bool {
        // -60 dB on the last rendered peak.
        self.state.last_peak < 1e-3
    }

    /// Move a released voice to the background.
    pub fn to_background(&mut self) {
        if self.prio == VoicePrio::Fg {
            self.prio = VoicePrio::Bg;
        }
    }

    /// Return the slot to the free state.
    pub(crate) fn reset(&mut self) {
        self.prio = VoicePrio::Inactive;
        self.group_id = 0;
        self.au_index = None;
        self.device_id = None;
        self.ch_index = 0;
        self.events.clear();
        self.state.init();
        self.state.active = false;
        self.state.note_on = false;
    }
}
