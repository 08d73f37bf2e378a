//! Master playback parameters and the chunk render loop.
//!
//! [`Player::render`] advances the musical timeline in beat space,
//! stopping at every boundary that can change behavior: the next trigger
//! on any channel, the next tempo-slide slice, the pattern end, a pending
//! pattern delay, and the end of the requested chunk. Between boundaries
//! it renders audio: channel expression curves, then every active voice
//! through its bound processor, then the device graph in topological
//! order, then the final mix with master volume and statistics.
//!
//! All trigger dispatch happens at boundaries; no event takes effect in
//! the middle of a rendered span.

use super::channel::{db_to_scale, Channel};
use super::general_state::GeneralState;
use super::mix_state::MixState;
use super::slider::Slider;
use super::workers::{fork_join, Job};
use crate::devices::{
    AuState, DeviceGraph, DeviceState, WorkBufferRole, WorkBuffers,
};
use crate::environment::EnvState;
use crate::error::KunquatError;
use crate::events::buffer::EventBuffer;
use crate::limits::{
    AUDIO_BUFFER_SIZE_MAX, AUDIO_UNITS_MAX, CHANNELS_MAX, TEMPO_DEFAULT, TUNING_TABLES_MAX,
};
use crate::memory::Memory;
use crate::module::{Module, PatInstRef};
use crate::tstamp::{Tstamp, BEAT};
use crate::tuning::{cents_to_hz, TuningState};
use crate::random::Random;
use crate::voices::{Voice, VoicePool, VoicePrio};
use std::sync::Arc;

/// Musical length of one tempo-slide slice: tempo slides update 24 times
/// per beat, never per frame.
pub fn tempo_slide_slice() -> Tstamp {
    Tstamp::new(0, BEAT / 24)
}

/// What the player is currently playing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackState {
    Stopped,
    Pattern,
    Song,
    Module,
}

/// Where playback starts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayStart {
    /// All tracks in order.
    Module,
    /// One track.
    Song(usize),
    /// One pattern instance.
    Pattern(PatInstRef),
}

/// The playback cursor.
#[derive(Clone, Copy, Debug)]
pub struct Position {
    pub track: usize,
    pub section: usize,
    /// The pattern instance being played; `None` forces re-resolution
    /// from `(track, section)`.
    pub piref: Option<PatInstRef>,
    pub row: Tstamp,
}

impl Position {
    fn start() -> Self {
        Self {
            track: 0,
            section: 0,
            piref: None,
            row: Tstamp::zero(),
        }
    }
}

/// Tempo slide bookkeeping.
#[derive(Clone, Copy, Debug)]
pub struct TempoSlide {
    /// -1, 0 or +1; zero means no slide.
    pub direction: i8,
    pub target: f64,
    /// Total musical length of a full slide, kept for `/=t`.
    pub length: Tstamp,
    /// Remaining musical length of the current slide.
    pub left: Tstamp,
    /// Musical time until the next slice boundary.
    pub slice_left: Tstamp,
    /// Tempo change applied at each slice boundary.
    pub update: f64,
}

impl Default for TempoSlide {
    fn default() -> Self {
        Self {
            direction: 0,
            target: 0.0,
            length: Tstamp::zero(),
            left: Tstamp::zero(),
            slice_left: Tstamp::zero(),
            update: 0.0,
        }
    }
}

/// Pattern jump bookkeeping.
#[derive(Clone, Copy, Debug, Default)]
pub struct JumpState {
    /// Set by the jump event, consumed at the end of the trigger row.
    pub request: bool,
    /// Remaining jumps; a jump event with zero counter is a no-op.
    pub counter: i64,
    pub target_piref: Option<PatInstRef>,
    pub target_row: Tstamp,
}

/// Everything the master loop owns about playback.
#[derive(Debug)]
pub struct MasterParams {
    /// Bumped on every playback reset; stale references to the previous
    /// run can compare against it.
    pub playback_id: u64,
    pub state: PlaybackState,
    pub is_infinite: bool,
    pub pause: bool,
    pub pos: Position,
    pub start_pos: Position,
    /// Remaining pattern delay; the cursor is frozen while nonzero.
    pub delay_left: Tstamp,
    pub tempo: f64,
    pub tempo_slide: TempoSlide,
    /// Master volume in dB, with its slider.
    pub volume_slider: Slider,
    pub volume_slide_length: Tstamp,
    pub jump: JumpState,
    pub goto_request: bool,
    pub goto_subsong: i64,
    pub goto_row: Tstamp,
    /// Active tuning table index.
    pub scale_index: usize,
    /// Peak simultaneous voice count since the last stats reset.
    pub active_voices: usize,
    pub frames_total: u64,
}

impl MasterParams {
    fn new() -> Self {
        Self {
            playback_id: 0,
            state: PlaybackState::Stopped,
            is_infinite: false,
            pause: false,
            pos: Position::start(),
            start_pos: Position::start(),
            delay_left: Tstamp::zero(),
            tempo: TEMPO_DEFAULT,
            tempo_slide: TempoSlide::default(),
            volume_slider: Slider::new(0.0),
            volume_slide_length: Tstamp::zero(),
            jump: JumpState::default(),
            goto_request: false,
            goto_subsong: 0,
            goto_row: Tstamp::zero(),
            scale_index: 0,
            active_voices: 0,
            frames_total: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PositionStatus {
    /// The cursor points at a playable position it already occupied.
    Ready,
    /// The cursor moved; triggers at the new position are still due.
    Moved,
    /// Playback has ended.
    Ended,
}

#[derive(Debug)]
struct AmpStats {
    min: [f64; 2],
    max: [f64; 2],
    clipped: [u64; 2],
}

impl AmpStats {
    fn new() -> Self {
        Self {
            min: [f64::INFINITY; 2],
            max: [f64::NEG_INFINITY; 2],
            clipped: [0; 2],
        }
    }
}

/// Active environment variable names set by `e.*n` events.
#[derive(Debug, Default, Clone)]
pub struct EnvActiveNames {
    pub bool_name: String,
    pub int_name: String,
    pub float_name: String,
    pub tstamp_name: String,
}

/// One playback engine bound to a sealed module.
pub struct Player {
    pub(crate) module: Arc<Module>,
    pub(crate) memory: Memory,
    pub(crate) audio_rate: u32,
    audio_buffer_size: usize,
    thread_count: usize,

    pub(crate) master: MasterParams,
    pub(crate) general: GeneralState,
    pub(crate) env_state: EnvState,
    pub(crate) env_names: EnvActiveNames,
    pub(crate) au_cv_name: String,
    pub(crate) call_name: String,
    pub(crate) channels: Vec<Channel>,
    pub(crate) pool: VoicePool,
    pub(crate) device_states: Vec<DeviceState>,
    pub(crate) au_states: Vec<AuState>,
    pub(crate) tuning_states: Vec<Option<TuningState>>,
    pub(crate) event_buffer: EventBuffer,
    pub(crate) rand: Random,

    /// One work buffer set per worker thread.
    wbs_list: Vec<WorkBuffers>,
    /// Per-thread, per-device voice output accumulators.
    voice_accs: Vec<Vec<(Vec<f32>, Vec<f32>)>>,
    /// Next unprocessed trigger per channel in the current pattern.
    trigger_index: Vec<usize>,
    /// Fractional frames already rendered past `pos.row`.
    pos_frac: f64,
    amp_stats: AmpStats,
    // Graph topology cached at setup; the graph is immutable afterwards.
    graph_sinks: Vec<usize>,
    graph_preds: Vec<Vec<usize>>,
    finished_scratch: Vec<usize>,
}

impl Player {
    pub fn new(
        module: Arc<Module>,
        audio_rate: u32,
        voice_count: usize,
        audio_buffer_size: usize,
        memory: Memory,
    ) -> Result<Self, KunquatError> {
        if !module.is_sealed() {
            return Err(KunquatError::Format("module is not sealed".to_string()));
        }
        if audio_rate == 0 {
            return Err(KunquatError::Argument("audio rate must be positive".to_string()));
        }
        if audio_buffer_size == 0 || audio_buffer_size > AUDIO_BUFFER_SIZE_MAX {
            return Err(KunquatError::Argument(format!(
                "audio buffer size {} out of range",
                audio_buffer_size
            )));
        }

        let pool = VoicePool::new(voice_count, &memory)?;

        let graph = module.graph();
        let mut device_states = Vec::with_capacity(graph.node_count());
        for id in 0..graph.node_count() {
            if !memory.claim() {
                return Err(KunquatError::Resource("device state allocation"));
            }
            let mut state = DeviceState::new(id, audio_rate, audio_buffer_size);
            state.set_impl_state(
                graph
                    .node(id)
                    .device_impl
                    .create_impl_state(audio_rate, audio_buffer_size),
            );
            device_states.push(state);
        }

        let channels = (0..CHANNELS_MAX)
            .map(|num| Channel::new(num, audio_rate, audio_buffer_size))
            .collect();

        let mut rand = Random::with_context("player");
        rand.set_seed(module.random_seed());

        let env_state = EnvState::from_environment(module.environment());

        let node_count = graph.node_count();
        let graph_sinks: Vec<usize> = graph.sinks().collect();
        let graph_preds: Vec<Vec<usize>> = (0..node_count)
            .map(|id| graph.predecessors(id).collect())
            .collect();
        let mut player = Self {
            module,
            memory,
            audio_rate,
            audio_buffer_size,
            thread_count: 1,
            master: MasterParams::new(),
            general: GeneralState::new(),
            env_state,
            env_names: EnvActiveNames::default(),
            au_cv_name: String::new(),
            call_name: String::new(),
            channels,
            pool,
            device_states,
            au_states: (0..AUDIO_UNITS_MAX).map(|_| AuState::new()).collect(),
            tuning_states: (0..TUNING_TABLES_MAX).map(|_| None).collect(),
            event_buffer: EventBuffer::default(),
            rand,
            wbs_list: vec![WorkBuffers::new(audio_buffer_size)],
            voice_accs: Vec::new(),
            trigger_index: vec![0; CHANNELS_MAX],
            pos_frac: 0.0,
            amp_stats: AmpStats::new(),
            graph_sinks,
            graph_preds,
            finished_scratch: Vec::with_capacity(voice_count),
        };
        player.voice_accs = vec![Self::make_accs(node_count, audio_buffer_size)];
        Ok(player)
    }

    fn make_accs(node_count: usize, buffer_size: usize) -> Vec<(Vec<f32>, Vec<f32>)> {
        (0..node_count)
            .map(|_| (vec![0.0; buffer_size], vec![0.0; buffer_size]))
            .collect()
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn audio_rate(&self) -> u32 {
        self.audio_rate
    }

    pub fn module(&self) -> &Module {
        &self.module
    }

    /// Change the audio rate; device states are rebuilt.
    pub fn set_audio_rate(&mut self, audio_rate: u32) -> Result<(), KunquatError> {
        if audio_rate == 0 {
            return Err(KunquatError::Argument("audio rate must be positive".to_string()));
        }
        self.audio_rate = audio_rate;
        let module = Arc::clone(&self.module);
        let graph = module.graph();
        for state in &mut self.device_states {
            if !self.memory.claim() {
                return Err(KunquatError::Resource("device state reallocation"));
            }
            state.set_audio_rate(audio_rate);
            state.set_impl_state(
                graph
                    .node(state.device_id())
                    .device_impl
                    .create_impl_state(audio_rate, self.audio_buffer_size),
            );
        }
        for channel in &mut self.channels {
            channel.set_audio_rate(audio_rate);
        }
        Ok(())
    }

    pub fn set_voice_count(&mut self, voices: usize) -> Result<(), KunquatError> {
        self.pool.set_size(voices, &self.memory)
    }

    pub fn set_infinite(&mut self, infinite: bool) {
        self.master.is_infinite = infinite;
    }

    /// Mute or unmute one channel. Muted channels keep playing silently.
    pub fn set_channel_mute(&mut self, ch: usize, mute: bool) -> Result<(), KunquatError> {
        if ch >= CHANNELS_MAX {
            return Err(KunquatError::Argument(format!(
                "channel {} out of range",
                ch
            )));
        }
        self.channels[ch].mute = mute;
        Ok(())
    }

    /// Configure the number of worker threads used for voice rendering.
    pub fn set_thread_count(&mut self, threads: usize) -> Result<(), KunquatError> {
        let threads = threads.max(1);
        if threads > self.wbs_list.len()
            && !self
                .memory
                .claim_many(threads - self.wbs_list.len())
        {
            return Err(KunquatError::Resource("worker buffer allocation"));
        }
        let node_count = self.device_states.len();
        while self.wbs_list.len() < threads {
            self.wbs_list.push(WorkBuffers::new(self.audio_buffer_size));
            self.voice_accs
                .push(Self::make_accs(node_count, self.audio_buffer_size));
        }
        self.thread_count = threads;
        Ok(())
    }

    /// Reset all playback state for a fresh run.
    fn reset(&mut self) {
        self.master.playback_id += 1;
        self.master.pause = false;
        self.master.delay_left = Tstamp::zero();
        self.master.tempo = TEMPO_DEFAULT;
        self.master.tempo_slide = TempoSlide::default();
        self.master.volume_slider = Slider::new(0.0);
        self.master.volume_slide_length = Tstamp::zero();
        self.master.jump = JumpState::default();
        self.master.goto_request = false;
        self.master.scale_index = 0;
        self.master.active_voices = 0;
        self.master.frames_total = 0;
        self.amp_stats = AmpStats::new();
        self.pos_frac = 0.0;

        self.general.reset();
        self.env_state.reset(self.module.environment());
        self.env_names = EnvActiveNames::default();
        self.au_cv_name.clear();
        self.call_name.clear();
        self.pool.reset_all();
        self.rand.set_seed(self.module.random_seed());

        let module = Arc::clone(&self.module);
        for (num, channel) in self.channels.iter_mut().enumerate() {
            channel.reset(module.channel_au_input(num), module.random_seed());
        }
        for (index, au_state) in self.au_states.iter_mut().enumerate() {
            match module.audio_units().get(index) {
                Some(au) => au_state.reset(
                    au.control_vars()
                        .map(|decl| (decl.name().to_string(), decl.initial().clone())),
                ),
                None => au_state.reset(std::iter::empty()),
            }
        }
        for index in 0..TUNING_TABLES_MAX {
            self.tuning_states[index] = module
                .tuning_table(index)
                .map(|table| TuningState::new(index, table));
        }
    }

    /// Start playback from the given position.
    pub fn play(&mut self, start: PlayStart) {
        self.reset();
        match start {
            PlayStart::Module => {
                self.master.state = PlaybackState::Module;
                self.master.pos = Position::start();
            }
            PlayStart::Song(track) => {
                self.master.state = PlaybackState::Song;
                self.master.pos = Position {
                    track,
                    ..Position::start()
                };
            }
            PlayStart::Pattern(piref) => {
                self.master.state = PlaybackState::Pattern;
                self.master.pos = Position {
                    piref: Some(piref),
                    ..Position::start()
                };
            }
        }
        self.master.start_pos = self.master.pos;
        if let Some(song_index) = self.module.track_list().song_index(self.master.pos.track) {
            if let Some(song) = self.module.song_table().get(song_index as usize) {
                self.master.tempo = song.tempo();
            }
        }
        self.recompute_trigger_indices();
        log::debug!("playback started: {:?}", self.master.state);
    }

    pub fn stop(&mut self) {
        self.master.state = PlaybackState::Stopped;
        log::debug!("playback stopped");
    }

    pub fn is_playing(&self) -> bool {
        self.master.state != PlaybackState::Stopped
    }

    pub(crate) fn recompute_trigger_indices(&mut self) {
        let row = self.master.pos.row;
        match self
            .master
            .pos
            .piref
            .and_then(|piref| self.module.pattern_by_ref(piref))
        {
            Some(pattern) => {
                for ch in 0..CHANNELS_MAX {
                    self.trigger_index[ch] = pattern.column(ch).first_at_or_after(row);
                }
            }
            None => self.trigger_index.fill(0),
        }
    }

    /// Resolve the playback cursor to a playable pattern position.
    ///
    /// Advances over finished patterns, sections, songs and tracks. A
    /// `Moved` result means triggers at the new position still need
    /// dispatching before any audio renders.
    fn ensure_position(&mut self) -> PositionStatus {
        let mut moved = false;
        loop {
            match self.master.state {
                PlaybackState::Stopped => return PositionStatus::Ended,

                PlaybackState::Pattern => {
                    let Some(piref) = self.master.pos.piref else {
                        self.master.state = PlaybackState::Stopped;
                        return PositionStatus::Ended;
                    };
                    let Some(pattern) = self.module.pattern_by_ref(piref) else {
                        self.master.state = PlaybackState::Stopped;
                        return PositionStatus::Ended;
                    };
                    if self.master.pos.row >= pattern.length()
                        && self.master.delay_left.is_zero()
                    {
                        if self.master.is_infinite && !pattern.length().is_zero() {
                            self.master.pos.row = Tstamp::zero();
                            self.recompute_trigger_indices();
                            moved = true;
                            continue;
                        }
                        self.master.state = PlaybackState::Stopped;
                        return PositionStatus::Ended;
                    }
                    return if moved {
                        PositionStatus::Moved
                    } else {
                        PositionStatus::Ready
                    };
                }

                PlaybackState::Song | PlaybackState::Module => {
                    // A directly set pattern (jump target) stays authoritative
                    // until it runs out.
                    if let Some(piref) = self.master.pos.piref {
                        if let Some(pattern) = self.module.pattern_by_ref(piref) {
                            if self.master.pos.row < pattern.length()
                                || !self.master.delay_left.is_zero()
                            {
                                return if moved {
                                    PositionStatus::Moved
                                } else {
                                    PositionStatus::Ready
                                };
                            }
                        }
                        // Pattern finished: move to the next section.
                        self.master.pos.section += 1;
                        self.master.pos.row = Tstamp::zero();
                        self.master.pos.piref = None;
                        moved = true;
                        continue;
                    }

                    match self.resolve_piref() {
                        Some(piref) => {
                            self.master.pos.piref = Some(piref);
                            self.recompute_trigger_indices();
                            moved = true;
                            continue;
                        }
                        None => {
                            // Section list exhausted.
                            if self.master.state == PlaybackState::Module {
                                self.master.pos.track += 1;
                                self.master.pos.section = 0;
                                self.master.pos.row = Tstamp::zero();
                                moved = true;
                                if self.master.pos.track < self.module.track_list().len() {
                                    continue;
                                }
                            }
                            if self.master.is_infinite {
                                let restart = self.master.start_pos;
                                if self.wraps_to_content(restart) {
                                    self.master.pos = restart;
                                    self.recompute_trigger_indices();
                                    moved = true;
                                    continue;
                                }
                            }
                            self.master.state = PlaybackState::Stopped;
                            return PositionStatus::Ended;
                        }
                    }
                }
            }
        }
    }

    fn wraps_to_content(&self, restart: Position) -> bool {
        let Some(song_index) = self.module.track_list().song_index(restart.track) else {
            return false;
        };
        let Some(song) = self.module.song_table().get(song_index as usize) else {
            return false;
        };
        song.section(restart.section).is_some()
    }

    fn resolve_piref(&self) -> Option<PatInstRef> {
        let song_index = self.module.track_list().song_index(self.master.pos.track)?;
        let song = self.module.song_table().get(song_index as usize)?;
        song.section(self.master.pos.section)
    }

    /// Dispatch every trigger due at the current row, then apply any jump
    /// or goto the row requested. Returns `true` when the cursor moved.
    fn process_due_triggers(&mut self, frame_offset: u32) -> bool {
        if !self.master.delay_left.is_zero() {
            return false;
        }
        let module = Arc::clone(&self.module);
        let Some(pattern) = self
            .master
            .pos
            .piref
            .and_then(|piref| module.pattern_by_ref(piref))
        else {
            return false;
        };

        let row = self.master.pos.row;
        for ch in 0..CHANNELS_MAX {
            loop {
                let column = pattern.column(ch);
                let Some(trigger) = column.triggers().get(self.trigger_index[ch]) else {
                    break;
                };
                if trigger.pos > row {
                    break;
                }
                self.trigger_index[ch] += 1;
                let event = trigger.event;
                let argument = trigger.argument.clone();
                self.dispatch_trigger(ch, event, &argument, frame_offset);
            }
        }

        if self.master.jump.request {
            self.master.jump.request = false;
            if self.master.jump.counter > 0 {
                self.master.jump.counter -= 1;
                if let Some(target) = self.master.jump.target_piref {
                    self.master.pos.piref = Some(target);
                }
                self.master.pos.row = self.master.jump.target_row;
                self.recompute_trigger_indices();
                return true;
            }
        }

        if self.master.goto_request {
            self.master.goto_request = false;
            if self.master.state != PlaybackState::Pattern {
                let song_index = self.master.goto_subsong;
                if song_index >= 0 {
                    if let Some(track) = self
                        .module
                        .track_list()
                        .track_by_song(song_index as u16)
                    {
                        self.master.pos.track = track;
                        self.master.pos.section = 0;
                        self.master.pos.row = self.master.goto_row;
                        self.master.pos.piref = None;
                        return true;
                    }
                }
                log::warn!("goto target song {} not found", self.master.goto_subsong);
            }
        }

        false
    }

    /// The musical distance to the nearest upcoming boundary.
    fn next_boundary_delta(&self) -> Option<Tstamp> {
        let mut delta: Option<Tstamp> = None;
        let mut consider = |candidate: Tstamp| {
            if candidate > Tstamp::zero() {
                delta = Some(match delta {
                    Some(current) => current.min(candidate),
                    None => candidate,
                });
            }
        };

        if !self.master.delay_left.is_zero() {
            consider(self.master.delay_left);
        } else if let Some(pattern) = self
            .master
            .pos
            .piref
            .and_then(|piref| self.module.pattern_by_ref(piref))
        {
            let row = self.master.pos.row;
            for ch in 0..CHANNELS_MAX {
                if let Some(trigger) =
                    pattern.column(ch).triggers().get(self.trigger_index[ch])
                {
                    consider(trigger.pos - row);
                }
            }
            consider(pattern.length() - row);
        }

        if self.master.tempo_slide.direction != 0 {
            consider(self.master.tempo_slide.slice_left);
        }

        delta
    }

    /// Move musical time forward by `advance`: the cursor (or pending
    /// delay) and the tempo slide both consume it.
    fn advance_music(&mut self, advance: Tstamp) {
        if advance.is_zero() {
            return;
        }

        let slide = &mut self.master.tempo_slide;
        if slide.direction != 0 {
            if advance >= slide.slice_left {
                // Boundary selection caps the advance at one slice.
                self.master.tempo += slide.update;
                slide.left = if slide.left > advance {
                    slide.left - advance
                } else {
                    Tstamp::zero()
                };
                let done = slide.left.is_zero()
                    || (slide.direction > 0 && self.master.tempo >= slide.target)
                    || (slide.direction < 0 && self.master.tempo <= slide.target);
                if done {
                    self.master.tempo = slide.target;
                    slide.direction = 0;
                } else {
                    slide.slice_left = tempo_slide_slice().min(slide.left);
                }
            } else {
                slide.slice_left -= advance;
                slide.left = if slide.left > advance {
                    slide.left - advance
                } else {
                    Tstamp::zero()
                };
            }
        }

        if !self.master.delay_left.is_zero() {
            self.master.delay_left = if self.master.delay_left > advance {
                self.master.delay_left - advance
            } else {
                Tstamp::zero()
            };
        } else {
            self.master.pos.row += advance;
        }
    }

    /// Render up to `nframes` frames into the output channels.
    ///
    /// Returns the number of frames actually mixed; the rest of the
    /// buffers is zeroed.
    pub fn render(&mut self, nframes: usize, out_l: &mut [f32], out_r: &mut [f32]) -> usize {
        let nframes = nframes.min(out_l.len()).min(out_r.len());
        out_l[..nframes].fill(0.0);
        out_r[..nframes].fill(0.0);
        if self.master.state == PlaybackState::Stopped {
            return 0;
        }

        self.pool.refresh_steal_order();
        let mut frames_done = 0usize;

        while frames_done < nframes && self.master.state != PlaybackState::Stopped {
            if self.master.pause {
                // Paused playback emits silence with a frozen timeline.
                frames_done = nframes;
                break;
            }
            // Triggers at the current row fire before the cursor can move
            // past it, so an end-row jump still takes effect.
            if self.process_due_triggers(frames_done as u32) {
                continue;
            }
            if self.master.state == PlaybackState::Stopped || self.master.pause {
                continue;
            }
            match self.ensure_position() {
                PositionStatus::Ended => break,
                PositionStatus::Moved => continue,
                PositionStatus::Ready => {}
            }

            self.master.active_voices =
                self.master.active_voices.max(self.pool.active_count());

            let delta = self.next_boundary_delta();
            let limit = (nframes - frames_done).min(self.audio_buffer_size);
            let (segment, reached) = match delta {
                Some(delta) => {
                    let exact =
                        delta.to_frames(self.master.tempo, self.audio_rate) - self.pos_frac;
                    if exact <= 0.0 {
                        (0, true)
                    } else {
                        let needed = exact.ceil() as usize;
                        if needed <= limit {
                            (needed, true)
                        } else {
                            (limit, false)
                        }
                    }
                }
                None => (limit, false),
            };

            if segment > 0 {
                let stop = frames_done + segment;
                self.render_segment(
                    frames_done,
                    segment,
                    &mut out_l[frames_done..stop],
                    &mut out_r[frames_done..stop],
                );
                frames_done = stop;
            }

            match delta {
                Some(delta_ts) if reached => {
                    let exact = delta_ts.to_frames(self.master.tempo, self.audio_rate);
                    self.pos_frac = (self.pos_frac + segment as f64 - exact).max(0.0);
                    self.advance_music(delta_ts);
                }
                _ => {
                    if segment > 0 {
                        let total = self.pos_frac + segment as f64;
                        let advance =
                            Tstamp::from_frames(total, self.master.tempo, self.audio_rate);
                        self.pos_frac = (total
                            - advance.to_frames(self.master.tempo, self.audio_rate))
                        .max(0.0);
                        self.advance_music(advance);
                    }
                }
            }
        }

        self.master.frames_total += frames_done as u64;
        frames_done
    }

    /// Render one boundary-free span of audio.
    ///
    /// `abs_start` is the span's frame offset within the render call; it
    /// anchors queued voice-event positions. All buffer indexing inside
    /// the span is relative, `0..len`.
    fn render_segment(
        &mut self,
        abs_start: usize,
        len: usize,
        out_l: &mut [f32],
        out_r: &mut [f32],
    ) {
        debug_assert!(len <= self.audio_buffer_size);
        let tempo = self.master.tempo;
        let module = Arc::clone(&self.module);
        let graph = module.graph();

        // Sliding control variables advance once per span.
        self.update_cv_slides(len);

        // Expression curves for every channel that owns an active voice.
        let mut ch_active = [false; CHANNELS_MAX];
        for voice in self.pool.iter_active() {
            ch_active[voice.ch_index()] = true;
        }
        for (num, channel) in self.channels.iter_mut().enumerate() {
            if ch_active[num] {
                channel.fill_scratch(0, len, tempo);
            }
        }

        // Clear the audio plane for this span.
        for state in &mut self.device_states {
            let (in_l, in_r) = state.in_bufs_mut();
            in_l[..len].fill(0.0);
            in_r[..len].fill(0.0);
            let (dev_l, dev_r) = state.out_bufs_mut();
            dev_l[..len].fill(0.0);
            dev_r[..len].fill(0.0);
        }
        for accs in &mut self.voice_accs {
            for (acc_l, acc_r) in accs.iter_mut() {
                acc_l[..len].fill(0.0);
                acc_r[..len].fill(0.0);
            }
        }

        // Voice pass, parallel over disjoint slices of the pool.
        {
            let threads = self.thread_count.min(self.wbs_list.len()).max(1);
            let channels = &self.channels;
            let device_states = &self.device_states;
            let voices = self.pool.voices_mut();
            let chunk_size = voices.len().div_ceil(threads).max(1);
            let jobs: Vec<Job<'_>> = voices
                .chunks_mut(chunk_size)
                .zip(self.wbs_list.iter_mut())
                .zip(self.voice_accs.iter_mut())
                .map(|((chunk, wbs), accs)| {
                    Box::new(move || {
                        for voice in chunk.iter_mut() {
                            render_one_voice(
                                voice,
                                channels,
                                device_states,
                                graph,
                                wbs,
                                accs,
                                abs_start,
                                len,
                                tempo,
                            );
                        }
                    }) as Job<'_>
                })
                .collect();
            fork_join(threads, jobs);
        }

        // Merge voice output into the owning devices.
        for accs in &self.voice_accs {
            for (id, (acc_l, acc_r)) in accs.iter().enumerate() {
                let (dev_l, dev_r) = self.device_states[id].out_bufs_mut();
                for i in 0..len {
                    dev_l[i] += acc_l[i];
                    dev_r[i] += acc_r[i];
                }
            }
        }

        // Reachability: reclaim voices no processor touched, plus the ones
        // that finished.
        self.finished_scratch.clear();
        for voice in self.pool.iter_active() {
            if !voice.state.updated || !voice.state.active {
                self.finished_scratch.push(voice.pool_index());
            }
        }
        let finished = std::mem::take(&mut self.finished_scratch);
        for &index in &finished {
            self.pool.reset_voice(index);
        }
        self.finished_scratch = finished;

        // Mixed pass in topological order.
        for &id in graph.order() {
            let node = graph.node(id);
            if node.device_impl.is_voice_processor() {
                continue;
            }
            for p in 0..self.graph_preds[id].len() {
                let pred = self.graph_preds[id][p];
                let (src, dst) = two_states(&mut self.device_states, pred, id);
                let (src_l, src_r) = src.out_bufs();
                let (dst_l, dst_r) = dst.in_bufs_mut();
                for i in 0..len {
                    dst_l[i] += src_l[i];
                    dst_r[i] += src_r[i];
                }
            }
            node.device_impl.render_mixed(
                &mut self.device_states[id],
                &mut self.wbs_list[0],
                0,
                len,
                tempo,
            );
        }

        // Final mix with master volume, plus amplitude statistics.
        let mix_vol = module.mix_volume();
        for i in 0..len {
            let vol_db = self.master.volume_slider.step();
            let scale = db_to_scale(vol_db + mix_vol) as f32;
            let mut frame = [0.0f32; 2];
            for &id in &self.graph_sinks {
                let (sink_l, sink_r) = self.device_states[id].out_bufs();
                frame[0] += sink_l[i];
                frame[1] += sink_r[i];
            }
            frame[0] *= scale;
            frame[1] *= scale;
            out_l[i] = frame[0];
            out_r[i] = frame[1];
            for (ch, &sample) in frame.iter().enumerate() {
                let sample = f64::from(sample);
                self.amp_stats.min[ch] = self.amp_stats.min[ch].min(sample);
                self.amp_stats.max[ch] = self.amp_stats.max[ch].max(sample);
                if sample.abs() > 1.0 {
                    self.amp_stats.clipped[ch] += 1;
                }
            }
        }
    }

    /// Snapshot the playback state; amplitude and voice statistics reset.
    pub fn mix_state(&mut self) -> MixState {
        let subsong = self
            .module
            .track_list()
            .song_index(self.master.pos.track)
            .map(i32::from)
            .unwrap_or(-1);
        let state = MixState {
            playing: self.is_playing(),
            frames: self.master.frames_total,
            nanoseconds: self.master.frames_total * 1_000_000_000 / u64::from(self.audio_rate),
            subsong,
            section: self.master.pos.section as i32,
            pattern: self
                .master
                .pos
                .piref
                .map(|piref| i32::from(piref.pattern as u16))
                .unwrap_or(-1),
            pos: self.master.pos.row,
            tempo: self.master.tempo,
            voices: self.master.active_voices,
            min_amps: self.amp_stats.min,
            max_amps: self.amp_stats.max,
            clipped: self.amp_stats.clipped,
        };
        self.amp_stats = AmpStats::new();
        self.master.active_voices = self.pool.active_count();
        state
    }

    pub fn events_json(&self) -> String {
        self.event_buffer.as_json()
    }

    pub fn reset_events(&mut self) {
        self.event_buffer.clear();
    }
}

fn two_states(states: &mut [DeviceState], src: usize, dst: usize) -> (&DeviceState, &mut DeviceState) {
    assert!(src != dst);
    if src < dst {
        let (left, right) = states.split_at_mut(dst);
        (&left[src], &mut right[0])
    } else {
        let (left, right) = states.split_at_mut(src);
        (&right[0], &mut left[dst])
    }
}

/// Render one voice through its bound processor and accumulate its audio.
///
/// All buffer indices are span-relative; `abs_start` anchors the queued
/// voice-event positions, which are absolute within the render call.
#[allow(clippy::too_many_arguments)]
fn render_one_voice(
    voice: &mut Voice,
    channels: &[Channel],
    device_states: &[DeviceState],
    graph: &DeviceGraph,
    wbs: &mut WorkBuffers,
    accs: &mut [(Vec<f32>, Vec<f32>)],
    abs_start: usize,
    len: usize,
    tempo: f64,
) {
    if voice.prio() == VoicePrio::Inactive {
        return;
    }
    voice.state.updated = false;
    let Some(device_id) = voice.device_id() else {
        return;
    };
    let node = graph.node(device_id);
    if !node.device_impl.is_voice_processor() {
        return;
    }

    let channel = &channels[voice.ch_index()];
    let base_force = db_to_scale(voice.state.force) as f32;
    {
        let pitch_curve = channel.pitch_curve();
        let force_curve = channel.force_curve();
        for i in 0..len {
            let cents = voice.state.pitch + f64::from(pitch_curve[i]);
            wbs.get_mut(WorkBufferRole::PitchParams)
                .set(i as isize, cents as f32);
            wbs.get_mut(WorkBufferRole::ActualPitches)
                .set(i as isize, cents_to_hz(cents) as f32);
            wbs.get_mut(WorkBufferRole::ActualForces)
                .set(i as isize, base_force * force_curve[i]);
        }
    }

    let pstate = &device_states[device_id];
    let pan_curve = channel.pan_curve();
    let mut cursor = 0usize;

    while cursor < len && voice.state.active {
        // Apply voice events due at the cursor.
        while let Some(pos) = voice.events.peek(0).map(|e| e.pos as usize) {
            if pos <= abs_start + cursor {
                let event = voice.events.get().expect("peeked event exists");
                apply_voice_event(voice, &event);
            } else {
                break;
            }
        }

        let stop = voice
            .events
            .peek(0)
            .map(|e| (e.pos as usize - abs_start).clamp(cursor + 1, len))
            .unwrap_or(len);

        let rendered_to = node
            .device_impl
            .render_voice(&mut voice.state, pstate, wbs, cursor, stop, tempo)
            .clamp(cursor, stop);

        // Pan gains track the channel curve per frame. Muted channels keep
        // rendering so voice state stays consistent, but contribute no
        // audio.
        if !channel.mute {
            let (acc_l, acc_r) = &mut accs[device_id];
            let audio_l = wbs.get(WorkBufferRole::AudioL);
            for i in cursor..rendered_to {
                let gain_l = (1.0 - pan_curve[i]).min(1.0);
                acc_l[i] += audio_l.get(i as isize) * gain_l;
            }
            let audio_r = wbs.get(WorkBufferRole::AudioR);
            for i in cursor..rendered_to {
                let gain_r = (1.0 + pan_curve[i]).min(1.0);
                acc_r[i] += audio_r.get(i as isize) * gain_r;
            }
        }

        if rendered_to < stop {
            // The processor stopped early: the voice is done.
            break;
        }
        cursor = stop;
    }
}

fn apply_voice_event(voice: &mut Voice, event: &crate::voices::VoiceEvent) {
    use crate::events::EventType;
    match event.event {
        EventType::NoteOff => {
            voice.state.note_on = false;
            voice.to_background();
        }
        _ => {}
    }
}
