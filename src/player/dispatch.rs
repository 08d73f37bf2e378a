//! The event dispatcher.
//!
//! One process function per event type, grouped by band. Dispatch runs
//! only at timeline boundaries, so every mutation here is visible to the
//! next rendered span and never to the current one.
//!
//! Error policy: an argument of the wrong type rejects the event (the
//! dispatcher returns `false` and nothing changes); unknown names are
//! silent no-ops; the hot path never reports errors upward.

use super::channel::CvEntry;
use super::master::Player;
use super::slider::Slider;
use crate::limits::{
    ARPEGGIO_TONES_MAX, AUDIO_UNITS_MAX, NAME_LEN_MAX, TEMPO_MAX, TEMPO_MIN, TUNING_TABLES_MAX,
};
use crate::module::PatInstRef;
use crate::events::{EventCategory, EventType, Value};
use crate::tstamp::{Tstamp, BEAT};
use crate::tuning::cents_to_hz;
use crate::voices::VoiceEvent;
use std::sync::Arc;

impl Player {
    /// Process one trigger. Returns `false` when the event was rejected.
    ///
    /// Structural conditional events always maintain the nesting; all
    /// other events are ignored while gated off. Successfully processed
    /// events are appended to the event buffer.
    pub(crate) fn dispatch_trigger(
        &mut self,
        ch: usize,
        ty: EventType,
        arg: &Value,
        frame_offset: u32,
    ) -> bool {
        match ty {
            EventType::IfBegin => {
                let ok = self.general.begin_if();
                if ok {
                    self.event_buffer.add(ch, ty.name(), arg);
                }
                return ok;
            }
            EventType::Else => {
                let ok = self.general.begin_else();
                if ok {
                    self.event_buffer.add(ch, ty.name(), arg);
                }
                return ok;
            }
            EventType::IfEnd => {
                let ok = self.general.end_if();
                if ok {
                    self.event_buffer.add(ch, ty.name(), arg);
                }
                return ok;
            }
            _ => {}
        }

        if !self.general.events_enabled() {
            return true;
        }

        if !ty.arg_type().accepts(arg) {
            log::warn!(
                "event {} rejected: expected {:?} argument, got {:?}",
                ty.name(),
                ty.arg_type(),
                arg.type_of()
            );
            return false;
        }

        let handled = match ty.category() {
            EventCategory::General => self.process_general(ty, arg),
            EventCategory::Control => self.process_control(ty, arg),
            EventCategory::Master => self.process_master(ty, arg),
            EventCategory::Channel => self.process_channel(ch, ty, arg, frame_offset),
            EventCategory::Au => self.process_au(ch, ty, arg),
        };

        if handled {
            self.event_buffer.add(ch, ty.name(), arg);
        }
        handled
    }

    fn process_general(&mut self, ty: EventType, arg: &Value) -> bool {
        match ty {
            EventType::Comment => true,
            EventType::Cond => {
                self.general.set_cond(arg.as_bool().expect("checked type"));
                true
            }
            EventType::SetCallName => {
                let name = arg.as_str().expect("checked type");
                if name.len() > NAME_LEN_MAX {
                    return false;
                }
                self.call_name.clear();
                self.call_name.push_str(name);
                true
            }
            // Calls have no engine-side effect; their point is the event
            // buffer entry the caller observes.
            EventType::CallBool | EventType::CallInt | EventType::CallFloat => {
                if !self.call_name.is_empty() {
                    log::debug!("call fired for {}", self.call_name);
                }
                true
            }
            _ => unreachable!("non-general event routed to general band"),
        }
    }

    fn process_control(&mut self, ty: EventType, arg: &Value) -> bool {
        match ty {
            EventType::Pause => {
                self.master.pause = true;
                true
            }
            EventType::Resume => {
                self.master.pause = false;
                true
            }
            EventType::SetGotoSubsong => {
                self.master.goto_subsong = arg.as_int().expect("checked type");
                true
            }
            EventType::SetGotoRow => {
                let row = arg.as_tstamp().expect("checked type");
                if row < Tstamp::zero() {
                    return false;
                }
                self.master.goto_row = row;
                true
            }
            EventType::Goto => {
                self.master.goto_request = true;
                true
            }
            EventType::Infinite => {
                self.master.is_infinite = arg.as_bool().expect("checked type");
                true
            }
            EventType::SetEnvBoolName => {
                set_name(&mut self.env_names.bool_name, arg)
            }
            EventType::SetEnvIntName => set_name(&mut self.env_names.int_name, arg),
            EventType::SetEnvFloatName => set_name(&mut self.env_names.float_name, arg),
            EventType::SetEnvTstampName => set_name(&mut self.env_names.tstamp_name, arg),
            EventType::SetEnvBool => {
                let name = self.env_names.bool_name.clone();
                self.env_state.set(&name, arg.clone());
                true
            }
            EventType::SetEnvInt => {
                let name = self.env_names.int_name.clone();
                self.env_state.set(&name, arg.clone());
                true
            }
            EventType::SetEnvFloat => {
                let name = self.env_names.float_name.clone();
                self.env_state.set(&name, arg.clone());
                true
            }
            EventType::SetEnvTstamp => {
                let name = self.env_names.tstamp_name.clone();
                self.env_state.set(&name, arg.clone());
                true
            }
            _ => unreachable!("non-control event routed to control band"),
        }
    }

    fn process_master(&mut self, ty: EventType, arg: &Value) -> bool {
        let tempo = self.master.tempo;
        let rate = self.audio_rate;
        match ty {
            EventType::SetTempo => {
                let target = arg.as_float().expect("checked type");
                if !(TEMPO_MIN..=TEMPO_MAX).contains(&target) {
                    return false;
                }
                self.master.tempo = target;
                self.master.tempo_slide.direction = 0;
                true
            }
            EventType::SlideTempo => {
                let target = arg.as_float().expect("checked type");
                if !(TEMPO_MIN..=TEMPO_MAX).contains(&target) {
                    return false;
                }
                self.start_tempo_slide(target);
                true
            }
            EventType::SlideTempoLength => {
                let length = arg.as_tstamp().expect("checked type");
                if length < Tstamp::zero() {
                    return false;
                }
                self.master.tempo_slide.length = length;
                if self.master.tempo_slide.direction != 0 {
                    let target = self.master.tempo_slide.target;
                    self.start_tempo_slide(target);
                }
                true
            }
            EventType::SetVolume => {
                self.master
                    .volume_slider
                    .set_value(arg.as_float().expect("checked type"));
                true
            }
            EventType::SlideVolume => {
                self.master
                    .volume_slider
                    .start(arg.as_float().expect("checked type"), tempo, rate);
                true
            }
            EventType::SlideVolumeLength => {
                let length = arg.as_tstamp().expect("checked type");
                if length < Tstamp::zero() {
                    return false;
                }
                self.master.volume_slide_length = length;
                self.master.volume_slider.set_length(length, tempo, rate);
                true
            }
            EventType::PatternDelay => {
                let delay = arg.as_tstamp().expect("checked type");
                if delay < Tstamp::zero() {
                    return false;
                }
                self.master.delay_left = delay;
                true
            }
            EventType::Jump => {
                self.master.jump.request = true;
                true
            }
            EventType::SetJumpCounter => {
                let counter = arg.as_int().expect("checked type");
                if !(0..=0xffff).contains(&counter) {
                    return false;
                }
                self.master.jump.counter = counter;
                true
            }
            EventType::SetJumpPattern => {
                let pattern = arg.as_int().expect("checked type");
                if pattern < 0 {
                    self.master.jump.target_piref = None;
                    return true;
                }
                match PatInstRef::new(pattern as u16, 0) {
                    Ok(piref) => {
                        self.master.jump.target_piref = Some(piref);
                        true
                    }
                    Err(_) => false,
                }
            }
            EventType::SetJumpRow => {
                let row = arg.as_tstamp().expect("checked type");
                if row < Tstamp::zero() {
                    return false;
                }
                self.master.jump.target_row = row;
                true
            }
            EventType::SetScale => {
                let index = arg.as_int().expect("checked type");
                if !(0..TUNING_TABLES_MAX as i64).contains(&index) {
                    return false;
                }
                self.master.scale_index = index as usize;
                true
            }
            EventType::SetScaleOffset => {
                let offset = arg.as_float().expect("checked type");
                if let Some(state) = &mut self.tuning_states[self.master.scale_index] {
                    state.set_global_offset(offset);
                }
                true
            }
            EventType::SetScaleFixedPoint => {
                let note = arg.as_int().expect("checked type");
                if note < 0 {
                    return false;
                }
                if let Some(state) = &mut self.tuning_states[self.master.scale_index] {
                    state.set_fixed_point(note as usize);
                }
                true
            }
            EventType::RetuneScale => {
                let new_ref = arg.as_int().expect("checked type");
                if new_ref < 0 {
                    return false;
                }
                let index = self.master.scale_index;
                let module = Arc::clone(&self.module);
                if let (Some(state), Some(table)) =
                    (&mut self.tuning_states[index], module.tuning_table(index))
                {
                    state.retune(new_ref as usize, table);
                }
                true
            }
            _ => unreachable!("non-master event routed to master band"),
        }
    }

    fn start_tempo_slide(&mut self, target: f64) {
        let slide = &mut self.master.tempo_slide;
        slide.target = target;
        let length = slide.length;
        let total_rems =
            length.beats() as f64 * f64::from(BEAT) + f64::from(length.rem());
        let slices = total_rems / f64::from(BEAT / 24);
        if slices < 1.0 {
            self.master.tempo = target;
            slide.direction = 0;
            return;
        }
        slide.update = (target - self.master.tempo) / slices;
        slide.left = length;
        slide.slice_left = super::master::tempo_slide_slice().min(length);
        slide.direction = if slide.update > 0.0 {
            1
        } else if slide.update < 0.0 {
            -1
        } else {
            self.master.tempo = target;
            0
        };
    }

    fn process_channel(
        &mut self,
        ch: usize,
        ty: EventType,
        arg: &Value,
        frame_offset: u32,
    ) -> bool {
        let tempo = self.master.tempo;
        let rate = self.audio_rate;
        match ty {
            EventType::NoteOn => {
                let cents = arg.as_float().expect("checked type");
                self.note_on(ch, cents, true, frame_offset);
                true
            }
            EventType::Hit => {
                let index = arg.as_int().expect("checked type");
                let au_input = self.channels[ch].au_input;
                let pitch = self
                    .module
                    .audio_units()
                    .get(au_input)
                    .and_then(|au| au.hit_pitch(index));
                match pitch {
                    Some(cents) => {
                        // Hits bypass the tuning state.
                        self.note_on(ch, cents, false, frame_offset);
                        true
                    }
                    None => true,
                }
            }
            EventType::NoteOff => {
                self.release_fg_voices(ch, frame_offset);
                true
            }
            EventType::SetAuInput => {
                let input = arg.as_int().expect("checked type");
                if !(0..AUDIO_UNITS_MAX as i64).contains(&input) {
                    return false;
                }
                self.channels[ch].au_input = input as usize;
                true
            }
            EventType::SetForce => {
                let db = arg.as_float().expect("checked type");
                self.channels[ch].force_slider.set_value(db);
                true
            }
            EventType::SlideForce => {
                let db = arg.as_float().expect("checked type");
                self.channels[ch].force_slider.start(db, tempo, rate);
                true
            }
            EventType::SlideForceLength => {
                let length = arg.as_tstamp().expect("checked type");
                if length < Tstamp::zero() {
                    return false;
                }
                self.channels[ch].force_slider.set_length(length, tempo, rate);
                true
            }
            EventType::TremoloSpeed => {
                let speed = arg.as_float().expect("checked type");
                if speed < 0.0 {
                    return false;
                }
                self.channels[ch].tremolo.set_speed(speed, tempo);
                true
            }
            EventType::TremoloDepth => {
                let depth = arg.as_float().expect("checked type");
                if depth < 0.0 {
                    return false;
                }
                self.channels[ch].tremolo.set_depth(depth, tempo);
                true
            }
            EventType::TremoloSpeedSlideLength => {
                let length = arg.as_tstamp().expect("checked type");
                if length < Tstamp::zero() {
                    return false;
                }
                self.channels[ch].tremolo.set_speed_delay(length, tempo);
                true
            }
            EventType::TremoloDepthSlideLength => {
                let length = arg.as_tstamp().expect("checked type");
                if length < Tstamp::zero() {
                    return false;
                }
                self.channels[ch].tremolo.set_depth_delay(length, tempo);
                true
            }
            EventType::SlidePitch => {
                let target_cents = arg.as_float().expect("checked type");
                let channel = &mut self.channels[ch];
                let offset = target_cents - channel.last_note_cents;
                channel.pitch_slider.start(offset, tempo, rate);
                true
            }
            EventType::SlidePitchLength => {
                let length = arg.as_tstamp().expect("checked type");
                if length < Tstamp::zero() {
                    return false;
                }
                self.channels[ch].pitch_slider.set_length(length, tempo, rate);
                true
            }
            EventType::VibratoSpeed => {
                let speed = arg.as_float().expect("checked type");
                if speed < 0.0 {
                    return false;
                }
                self.channels[ch].vibrato.set_speed(speed, tempo);
                true
            }
            EventType::VibratoDepth => {
                let depth = arg.as_float().expect("checked type");
                if depth < 0.0 {
                    return false;
                }
                self.channels[ch].vibrato.set_depth(depth, tempo);
                true
            }
            EventType::VibratoSpeedSlideLength => {
                let length = arg.as_tstamp().expect("checked type");
                if length < Tstamp::zero() {
                    return false;
                }
                self.channels[ch].vibrato.set_speed_delay(length, tempo);
                true
            }
            EventType::VibratoDepthSlideLength => {
                let length = arg.as_tstamp().expect("checked type");
                if length < Tstamp::zero() {
                    return false;
                }
                self.channels[ch].vibrato.set_depth_delay(length, tempo);
                true
            }
            EventType::SetLowpass => {
                self.channels[ch]
                    .lowpass_slider
                    .set_value(arg.as_float().expect("checked type"));
                true
            }
            EventType::SlideLowpass => {
                self.channels[ch]
                    .lowpass_slider
                    .start(arg.as_float().expect("checked type"), tempo, rate);
                true
            }
            EventType::SlideLowpassLength => {
                let length = arg.as_tstamp().expect("checked type");
                if length < Tstamp::zero() {
                    return false;
                }
                self.channels[ch]
                    .lowpass_slider
                    .set_length(length, tempo, rate);
                true
            }
            EventType::SetResonance => {
                let res = arg.as_float().expect("checked type");
                if !(0.0..=100.0).contains(&res) {
                    return false;
                }
                self.channels[ch].resonance = res;
                true
            }
            EventType::AutowahSpeed => {
                let speed = arg.as_float().expect("checked type");
                if speed < 0.0 {
                    return false;
                }
                self.channels[ch].autowah.set_speed(speed, tempo);
                true
            }
            EventType::AutowahDepth => {
                let depth = arg.as_float().expect("checked type");
                if depth < 0.0 {
                    return false;
                }
                self.channels[ch].autowah.set_depth(depth, tempo);
                true
            }
            EventType::AutowahSpeedSlideLength => {
                let length = arg.as_tstamp().expect("checked type");
                if length < Tstamp::zero() {
                    return false;
                }
                self.channels[ch].autowah.set_speed_delay(length, tempo);
                true
            }
            EventType::AutowahDepthSlideLength => {
                let length = arg.as_tstamp().expect("checked type");
                if length < Tstamp::zero() {
                    return false;
                }
                self.channels[ch].autowah.set_depth_delay(length, tempo);
                true
            }
            EventType::SetPanning => {
                let pan = arg.as_float().expect("checked type");
                if !(-1.0..=1.0).contains(&pan) {
                    return false;
                }
                self.channels[ch].panning_slider.set_value(pan);
                true
            }
            EventType::SlidePanning => {
                let pan = arg.as_float().expect("checked type");
                if !(-1.0..=1.0).contains(&pan) {
                    return false;
                }
                self.channels[ch].panning_slider.start(pan, tempo, rate);
                true
            }
            EventType::SlidePanningLength => {
                let length = arg.as_tstamp().expect("checked type");
                if length < Tstamp::zero() {
                    return false;
                }
                self.channels[ch]
                    .panning_slider
                    .set_length(length, tempo, rate);
                true
            }
            EventType::ArpOn => {
                self.channels[ch].arp.on = true;
                true
            }
            EventType::ArpOff => {
                self.channels[ch].arp.on = false;
                true
            }
            EventType::ResetArpeggio => {
                self.channels[ch].arp.rewind();
                true
            }
            EventType::SetArpNote => {
                let cents = arg.as_float().expect("checked type");
                let arp = &mut self.channels[ch].arp;
                if arp.write_index < arp.tones.len() {
                    arp.tones[arp.write_index] = cents;
                } else if arp.tones.try_push(cents).is_err() {
                    return false;
                }
                arp.write_index += 1;
                true
            }
            EventType::SetArpIndex => {
                let index = arg.as_int().expect("checked type");
                if !(0..ARPEGGIO_TONES_MAX as i64).contains(&index) {
                    return false;
                }
                self.channels[ch].arp.write_index = index as usize;
                true
            }
            EventType::SetArpSpeed => {
                let speed = arg.as_float().expect("checked type");
                if speed <= 0.0 {
                    return false;
                }
                self.channels[ch].arp.speed = speed;
                true
            }
            EventType::SetCvName => {
                let name = arg.as_str().expect("checked type");
                if name.len() > NAME_LEN_MAX {
                    return false;
                }
                let channel = &mut self.channels[ch];
                channel.active_cv_name.clear();
                channel.active_cv_name.push_str(name);
                true
            }
            EventType::SetCvValue => {
                self.set_channel_cv(ch, arg.clone());
                true
            }
            EventType::CvCarryOn => {
                self.set_cv_carry(ch, true);
                true
            }
            EventType::CvCarryOff => {
                self.set_cv_carry(ch, false);
                true
            }
            EventType::SlideCv => {
                let target = arg.as_float().expect("checked type");
                let channel = &mut self.channels[ch];
                let name = channel.active_cv_name.clone();
                if name.is_empty() {
                    return true;
                }
                let slide_length = channel.cv_slide_length;
                let entry = channel.cv_state.entry(name).or_insert_with(|| CvEntry {
                    value: Value::Float(0.0),
                    carry: false,
                    slider: Slider::new(0.0),
                });
                if let Some(current) = entry.value.as_float() {
                    entry.slider.set_value(current);
                }
                entry.slider.set_length(slide_length, tempo, rate);
                entry.slider.start(target, tempo, rate);
                true
            }
            EventType::SlideCvLength => {
                let length = arg.as_tstamp().expect("checked type");
                if length < Tstamp::zero() {
                    return false;
                }
                self.channels[ch].cv_slide_length = length;
                true
            }
            EventType::SetStreamName => {
                let name = arg.as_str().expect("checked type");
                if name.len() > NAME_LEN_MAX {
                    return false;
                }
                let channel = &mut self.channels[ch];
                channel.active_stream_name.clear();
                channel.active_stream_name.push_str(name);
                true
            }
            _ => unreachable!("non-channel event routed to channel band"),
        }
    }

    fn process_au(&mut self, ch: usize, ty: EventType, arg: &Value) -> bool {
        let au_index = self.channels[ch].au_input;
        match ty {
            EventType::AuSetCvName => {
                let name = arg.as_str().expect("checked type");
                if name.len() > NAME_LEN_MAX {
                    return false;
                }
                self.au_cv_name.clear();
                self.au_cv_name.push_str(name);
                true
            }
            EventType::AuSetCvValue => {
                let name = self.au_cv_name.clone();
                if name.is_empty() {
                    return true;
                }
                self.fan_out_control_var(ch, au_index, &name, arg.clone());
                true
            }
            EventType::AuSetExpression => {
                let expr = arg.as_str().expect("checked type");
                self.au_states[au_index].set_expression(expr);
                true
            }
            EventType::AuSetPedal => {
                let value = arg.as_float().expect("checked type");
                if !(0.0..=1.0).contains(&value) {
                    return false;
                }
                self.au_states[au_index].set_pedal(value);
                true
            }
            _ => unreachable!("non-au event routed to au band"),
        }
    }

    /// Start a note on a channel: release its previous foreground voices
    /// and allocate one voice per voice processor of the bound audio unit.
    fn note_on(&mut self, ch: usize, cents: f64, use_tuning: bool, frame_offset: u32) {
        self.release_fg_voices(ch, frame_offset);

        let module = Arc::clone(&self.module);
        let au_index = self.channels[ch].au_input;
        let Some(au) = module.audio_units().get(au_index) else {
            return;
        };

        let pitch = if use_tuning {
            match &self.tuning_states[self.master.scale_index] {
                Some(state) => {
                    let table = module
                        .tuning_table(state.table_index())
                        .expect("tuning state exists only with its table");
                    state.get_retuned_pitch(cents, table)
                }
                None => cents,
            }
        } else {
            cents
        };

        let group = self.pool.new_group_id();
        let mut allocated = false;
        for &device_id in au.procs() {
            let node = module.graph().node(device_id);
            if !node.device_impl.is_voice_processor() {
                continue;
            }
            if !self.memory.claim() {
                // Out of memory: the note is dropped, playback goes on.
                log::warn!("note on channel {} dropped: out of memory", ch);
                for index in 0..self.pool.size() {
                    if self.pool.voices()[index].group_id() == group {
                        self.pool.reset_voice(index);
                    }
                }
                self.channels[ch].fg_voices.clear();
                return;
            }
            let (pool_index, id) = self.pool.new_voice(group);
            let voice = self
                .pool
                .get_mut(pool_index, id)
                .expect("freshly allocated voice is live");
            voice.au_index = Some(au_index);
            voice.device_id = Some(device_id);
            voice.ch_index = ch;
            voice.state.pitch = pitch;
            voice.state.freq = cents_to_hz(pitch);
            // Channel force reaches the voice through the per-frame force
            // curve; the per-voice base stays neutral.
            voice.state.force = 0.0;
            node.device_impl
                .init_vstate(&mut voice.state, &self.device_states[device_id]);
            self.channels[ch].fg_voices.push((pool_index, id));
            allocated = true;
        }

        let channel = &mut self.channels[ch];
        channel.fg_group_id = if allocated { group } else { 0 };
        channel.last_note_cents = pitch;

        // Carry: control variables without carry return to their declared
        // defaults on every note on.
        for decl in au.control_vars() {
            if let Some(entry) = channel.cv_state.get_mut(decl.name()) {
                if !entry.carry {
                    entry.value = decl.initial().clone();
                    entry.slider = Slider::new(decl.initial().as_float().unwrap_or(0.0));
                }
            }
        }
    }

    /// Queue a note off onto all foreground voices of a channel.
    fn release_fg_voices(&mut self, ch: usize, frame_offset: u32) {
        for i in 0..self.channels[ch].fg_voices.len() {
            let (pool_index, id) = self.channels[ch].fg_voices[i];
            if let Some(voice) = self.pool.get_mut(pool_index, id) {
                let queued = voice.events().ins(VoiceEvent {
                    pos: frame_offset,
                    event: EventType::NoteOff,
                    argument: Value::None,
                });
                if !queued {
                    // Queue full: release immediately instead of dropping.
                    voice.state.note_on = false;
                    voice.to_background();
                }
            }
        }
        self.channels[ch].fg_voices.clear();
        self.channels[ch].fg_group_id = 0;
    }

    /// Write a control variable through the channel's active name and fan
    /// it out to the bound audio unit and its processors.
    fn set_channel_cv(&mut self, ch: usize, value: Value) {
        let name = self.channels[ch].active_cv_name.clone();
        if name.is_empty() {
            return;
        }
        let au_index = self.channels[ch].au_input;
        {
            let channel = &mut self.channels[ch];
            let entry = channel
                .cv_state
                .entry(name.clone())
                .or_insert_with(|| CvEntry {
                    value: value.clone(),
                    carry: false,
                    slider: Slider::new(value.as_float().unwrap_or(0.0)),
                });
            entry.value = value.clone();
            entry.slider.set_value(value.as_float().unwrap_or(0.0));
        }
        self.fan_out_control_var(ch, au_index, &name, value);
    }

    fn set_cv_carry(&mut self, ch: usize, carry: bool) {
        let module = Arc::clone(&self.module);
        let channel = &mut self.channels[ch];
        let name = channel.active_cv_name.clone();
        if name.is_empty() {
            return;
        }
        let initial = module
            .audio_units()
            .get(channel.au_input)
            .and_then(|au| au.control_var(&name))
            .map(|decl| decl.initial().clone());
        let Some(initial) = initial else {
            return;
        };
        let entry = channel
            .cv_state
            .entry(name)
            .or_insert_with(|| CvEntry {
                value: initial.clone(),
                carry: false,
                slider: Slider::new(initial.as_float().unwrap_or(0.0)),
            });
        entry.carry = carry;
    }

    /// Route a control variable to an audio unit and its processors.
    ///
    /// Unknown names are ignored by every receiver.
    fn fan_out_control_var(&mut self, ch: usize, au_index: usize, name: &str, value: Value) {
        let module = Arc::clone(&self.module);
        let Some(au) = module.audio_units().get(au_index) else {
            return;
        };
        if au.control_var(name).is_none() {
            return;
        }
        self.au_states[au_index].set_control_var(name, value.clone());
        let channel = &mut self.channels[ch];
        for &device_id in au.procs() {
            module.graph().node(device_id).device_impl.set_control_var(
                &mut self.device_states[device_id],
                &mut channel.rand,
                name,
                &value,
            );
        }
    }

    /// Advance sliding control variables by one rendered span and fan the
    /// updated values out.
    pub(crate) fn update_cv_slides(&mut self, frames: usize) {
        if frames == 0 {
            return;
        }
        let mut updates: Vec<(usize, usize, String, Value)> = Vec::new();
        for channel in self.channels.iter_mut() {
            let num = channel.num();
            let au_index = channel.au_input;
            for (name, entry) in channel.cv_state.iter_mut() {
                if entry.slider.is_active() {
                    let value = entry.slider.advance(frames);
                    entry.value = Value::Float(value);
                    updates.push((num, au_index, name.clone(), Value::Float(value)));
                }
            }
        }
        for (ch, au_index, name, value) in updates {
            self.fan_out_control_var(ch, au_index, &name, value);
        }
    }
}

fn set_name(slot: &mut String, arg: &Value) -> bool {
    let name = arg.as_str().expect("checked type");
    if name.len() > NAME_LEN_MAX {
        return false;
    }
    slot.clear();
    slot.push_str(name);
    true
}
