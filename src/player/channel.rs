//! Per-channel playback state.
//!
//! A channel is one control lane: it selects an audio unit, owns the
//! expression state every note on the lane shares (force, panning, pitch
//! bend, filter, modulation LFOs, arpeggio), and tracks its foreground
//! voices by generation-checked handles. The per-frame expression curves
//! are rendered once per chunk segment into scratch buffers that all of
//! the channel's voices read.

use super::lfo::Lfo;
use super::slider::Slider;
use crate::events::Value;
use crate::limits::ARPEGGIO_TONES_MAX;
use crate::random::Random;
use crate::tstamp::Tstamp;
use arrayvec::ArrayVec;
use indexmap::IndexMap;

/// Convert decibels to a linear scale factor.
#[inline]
pub fn db_to_scale(db: f64) -> f64 {
    (db * std::f64::consts::LN_10 / 20.0).exp()
}

/// Channel-side state of one control variable.
#[derive(Debug, Clone)]
pub struct CvEntry {
    pub value: Value,
    pub carry: bool,
    pub slider: Slider,
}

/// Arpeggio playback state.
#[derive(Debug, Clone)]
pub struct ArpState {
    pub on: bool,
    /// Tone offsets in cents relative to the base note.
    pub tones: ArrayVec<f64, ARPEGGIO_TONES_MAX>,
    pub write_index: usize,
    /// Tones per beat.
    pub speed: f64,
    phase: f64,
    cur_tone: usize,
}

impl ArpState {
    fn new() -> Self {
        Self {
            on: false,
            tones: ArrayVec::new(),
            write_index: 0,
            speed: 24.0,
            phase: 0.0,
            cur_tone: 0,
        }
    }

    /// Advance one frame; returns the current tone offset in cents.
    fn step(&mut self, tempo: f64, audio_rate: u32) -> f64 {
        if !self.on || self.tones.is_empty() {
            return 0.0;
        }
        let offset = if self.cur_tone == 0 {
            0.0
        } else {
            self.tones[self.cur_tone - 1]
        };
        self.phase += self.speed * tempo / 60.0 / f64::from(audio_rate);
        while self.phase >= 1.0 {
            self.phase -= 1.0;
            self.cur_tone = (self.cur_tone + 1) % (self.tones.len() + 1);
        }
        offset
    }

    /// Rewind the tone cycle to the base note; the tone table and speed
    /// are untouched.
    pub fn rewind(&mut self) {
        self.phase = 0.0;
        self.cur_tone = 0;
    }

    fn reset(&mut self) {
        *self = Self::new();
    }
}

/// One of up to 64 control lanes.
pub struct Channel {
    num: usize,
    pub mute: bool,
    /// Channel volume as a linear factor.
    pub volume: f64,
    pub au_input: usize,
    /// Foreground voices as `(pool_index, id)` pairs, one per voice
    /// processor of the bound audio unit.
    pub(crate) fg_voices: Vec<(usize, u64)>,
    pub(crate) fg_group_id: u64,
    /// Base pitch of the latest note on, in cents.
    pub(crate) last_note_cents: f64,

    audio_rate: u32,

    pub force_slider: Slider,
    pub panning_slider: Slider,
    pub pitch_slider: Slider,
    pub lowpass_slider: Slider,
    pub resonance: f64,

    pub tremolo: Lfo,
    pub vibrato: Lfo,
    pub autowah: Lfo,
    pub arp: ArpState,

    pub cv_state: IndexMap<String, CvEntry>,
    pub active_cv_name: String,
    pub active_stream_name: String,
    pub cv_slide_length: Tstamp,

    pub rand: Random,

    force_buf: Vec<f32>,
    pitch_buf: Vec<f32>,
    pan_buf: Vec<f32>,
}

impl Channel {
    pub fn new(num: usize, audio_rate: u32, buffer_size: usize) -> Self {
        let mut rand = Random::with_context("ch");
        rand.set_seed(1 + num as u64);
        Self {
            num,
            mute: false,
            volume: 1.0,
            au_input: 0,
            fg_voices: Vec::with_capacity(crate::limits::PROCESSORS_MAX),
            fg_group_id: 0,
            last_note_cents: 0.0,
            audio_rate,
            force_slider: Slider::new(0.0),
            panning_slider: Slider::new(0.0),
            pitch_slider: Slider::new(0.0),
            lowpass_slider: Slider::new(100.0),
            resonance: 0.0,
            tremolo: Lfo::new(audio_rate),
            vibrato: Lfo::new(audio_rate),
            autowah: Lfo::new(audio_rate),
            arp: ArpState::new(),
            cv_state: IndexMap::new(),
            active_cv_name: String::new(),
            active_stream_name: String::new(),
            cv_slide_length: Tstamp::zero(),
            rand,
            force_buf: vec![0.0; buffer_size],
            pitch_buf: vec![0.0; buffer_size],
            pan_buf: vec![0.0; buffer_size],
        }
    }

    pub fn num(&self) -> usize {
        self.num
    }

    /// Channel force in dB.
    pub fn force(&self) -> f64 {
        self.force_slider.value()
    }

    pub fn set_audio_rate(&mut self, audio_rate: u32) {
        self.audio_rate = audio_rate;
        self.tremolo.set_audio_rate(audio_rate);
        self.vibrato.set_audio_rate(audio_rate);
        self.autowah.set_audio_rate(audio_rate);
    }

    pub fn audio_rate(&self) -> u32 {
        self.audio_rate
    }

    pub fn set_buffer_size(&mut self, buffer_size: usize) {
        for buf in [&mut self.force_buf, &mut self.pitch_buf, &mut self.pan_buf] {
            buf.clear();
            buf.resize(buffer_size, 0.0);
        }
    }

    /// Restore playback defaults; `au_input` comes from the module.
    pub fn reset(&mut self, au_input: usize, seed: u64) {
        self.mute = false;
        self.volume = 1.0;
        self.au_input = au_input;
        self.fg_voices.clear();
        self.fg_group_id = 0;
        self.last_note_cents = 0.0;
        self.force_slider = Slider::new(0.0);
        self.panning_slider = Slider::new(0.0);
        self.pitch_slider = Slider::new(0.0);
        self.lowpass_slider = Slider::new(100.0);
        self.resonance = 0.0;
        self.tremolo.reset();
        self.vibrato.reset();
        self.autowah.reset();
        self.arp.reset();
        self.cv_state.clear();
        self.active_cv_name.clear();
        self.active_stream_name.clear();
        self.cv_slide_length = Tstamp::zero();
        self.rand.set_seed(seed.wrapping_add(self.num as u64));
    }

    /// Render the per-frame expression curves for `[buf_start, buf_stop)`.
    pub fn fill_scratch(&mut self, buf_start: usize, buf_stop: usize, tempo: f64) {
        for i in buf_start..buf_stop {
            let force_db = self.force_slider.step() + self.tremolo.step();
            self.force_buf[i] = (db_to_scale(force_db) * self.volume) as f32;

            let bend = self.pitch_slider.step();
            let vib = self.vibrato.step();
            let arp = self.arp.step(tempo, self.audio_rate);
            self.pitch_buf[i] = (bend + vib + arp) as f32;

            self.pan_buf[i] = self.panning_slider.step() as f32;
        }
        // The autowah curve feeds the filter path of the bound processors;
        // stepping it here keeps its phase in sync with the others.
        for _ in buf_start..buf_stop {
            self.autowah.step();
        }
    }

    /// Linear force factors for the latest `fill_scratch` range.
    pub fn force_curve(&self) -> &[f32] {
        &self.force_buf
    }

    /// Pitch offsets in cents for the latest `fill_scratch` range.
    pub fn pitch_curve(&self) -> &[f32] {
        &self.pitch_buf
    }

    /// Panning positions for the latest `fill_scratch` range.
    pub fn pan_curve(&self) -> &[f32] {
        &self.pan_buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_db_to_scale_anchors() {
        assert_abs_diff_eq!(db_to_scale(0.0), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(db_to_scale(-20.0), 0.1, epsilon = 1e-12);
        assert_abs_diff_eq!(db_to_scale(6.0), 1.995_262_3, epsilon = 1e-6);
    }

    #[test]
    fn test_scratch_neutral_state() {
        let mut ch = Channel::new(0, 48000, 64);
        ch.fill_scratch(0, 64, 120.0);
        assert_abs_diff_eq!(ch.force_curve()[0], 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(ch.pitch_curve()[0], 0.0);
        assert_abs_diff_eq!(ch.pan_curve()[0], 0.0);
    }

    #[test]
    fn test_force_slide_shows_in_curve() {
        let mut ch = Channel::new(0, 48000, 256);
        ch.force_slider
            .set_length(Tstamp::from_beats(1), 120.0, 48000);
        ch.force_slider.start(-20.0, 120.0, 48000);
        ch.fill_scratch(0, 256, 120.0);
        // Monotonically decreasing force.
        assert!(ch.force_curve()[255] < ch.force_curve()[0]);
    }

    #[test]
    fn test_arpeggio_cycles_through_tones() {
        let mut arp = ArpState::new();
        arp.on = true;
        arp.tones.push(400.0);
        arp.tones.push(700.0);
        arp.speed = 1.0;
        let mut seen = Vec::new();
        // One beat per tone at 60 BPM and an 8 Hz rate: the phase step of
        // exactly 1/8 keeps tone boundaries on exact frames.
        for _ in 0..24 {
            seen.push(arp.step(60.0, 8));
        }
        assert_eq!(seen[0], 0.0);
        assert_eq!(seen[8], 400.0);
        assert_eq!(seen[16], 700.0);
    }

    #[test]
    fn test_arpeggio_rewind_keeps_tones() {
        let mut arp = ArpState::new();
        arp.on = true;
        arp.tones.push(400.0);
        arp.tones.push(700.0);
        arp.speed = 1.0;
        // Step into the second tone of the cycle.
        for _ in 0..12 {
            arp.step(60.0, 8);
        }
        assert_eq!(arp.step(60.0, 8), 400.0);

        arp.rewind();
        assert_eq!(arp.step(60.0, 8), 0.0);
        // Rewinding does not clear the tone table.
        assert_eq!(arp.tones.len(), 2);
        assert_eq!(arp.speed, 1.0);
    }

    #[test]
    fn test_reset_restores_defaults() {
        let mut ch = Channel::new(3, 48000, 64);
        ch.force_slider.set_value(-6.0);
        ch.mute = true;
        ch.au_input = 7;
        ch.reset(2, 99);
        assert!(!ch.mute);
        assert_eq!(ch.au_input, 2);
        assert_eq!(ch.force(), 0.0);
    }
}
