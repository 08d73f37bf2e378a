//! The debug processor.
//!
//! Generates a narrow pulse train: the first sample of each phase cycle is
//! 1.0, the rest are 0.5, scaled by the per-frame force. A note lasts at
//! most ten cycles; after note off it lasts at most two further cycles
//! with every sample negated. The output is exactly predictable, which is
//! what the playback tests need.

use crate::devices::state::DeviceState;
use crate::devices::work_buffers::{WorkBufferRole, WorkBuffers};
use crate::devices::DeviceImpl;
use crate::voices::voice::VoiceState;

const ON_CYCLES_MAX: u64 = 10;
const OFF_CYCLES_MAX: u64 = 2;

/// Deterministic pulse-train voice processor.
pub struct DebugProcessor {
    single_pulse: bool,
}

impl DebugProcessor {
    pub fn new() -> Self {
        Self {
            single_pulse: false,
        }
    }

    /// Emit only one pulse sample per note instead of the pulse train.
    pub fn with_single_pulse() -> Self {
        Self { single_pulse: true }
    }
}

impl Default for DebugProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceImpl for DebugProcessor {
    fn name(&self) -> &'static str {
        "debug"
    }

    fn is_voice_processor(&self) -> bool {
        true
    }

    fn render_voice(
        &self,
        vstate: &mut VoiceState,
        pstate: &DeviceState,
        wbs: &mut WorkBuffers,
        buf_start: usize,
        buf_stop: usize,
        _tempo: f64,
    ) -> usize {
        vstate.updated = true;
        if !vstate.active {
            return buf_start;
        }

        let rate = f64::from(pstate.audio_rate());
        let mut peak = vstate.last_peak;
        let mut stop = buf_stop;

        for i in buf_start..buf_stop {
            if self.single_pulse {
                if vstate.pos > 0 || !vstate.note_on {
                    vstate.active = false;
                    stop = i;
                    break;
                }
                let out = wbs.get_mut(WorkBufferRole::AudioL);
                out.set(i as isize, 1.0);
                vstate.pos = 1;
                peak = peak.max(1.0);
                continue;
            }

            let pitch = wbs.get(WorkBufferRole::ActualPitches).get(i as isize);
            let force = wbs.get(WorkBufferRole::ActualForces).get(i as isize);

            let mut val = if vstate.pos_part < f64::from(pitch) / rate {
                // First sample of the cycle.
                1.0
            } else {
                0.5
            };
            if !vstate.note_on {
                val = -val;
            }
            let sample = (val * f64::from(force)) as f32;

            let (l, r) = wbs.get_pair_mut(WorkBufferRole::AudioL, WorkBufferRole::AudioR);
            l.set(i as isize, sample);
            r.set(i as isize, sample);
            peak = peak.max(sample.abs());

            vstate.pos_part += f64::from(pitch) / rate;
            if vstate.pos_part >= 1.0 {
                vstate.pos_part -= 1.0;
                vstate.pos += 1;
                if !vstate.note_on {
                    vstate.rel_pos += 1;
                }
            }

            let cycle_limit_hit = vstate.pos >= ON_CYCLES_MAX
                || (!vstate.note_on && vstate.rel_pos >= OFF_CYCLES_MAX);
            if cycle_limit_hit {
                vstate.active = false;
                stop = i + 1;
                break;
            }
        }

        vstate.last_peak = peak;
        stop
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 6000 Hz at 48000 Hz gives an exact phase step of 1/8, so cycle
    // boundaries land on exact frames.
    fn render_setup(frames: usize) -> (DeviceState, WorkBuffers, VoiceState) {
        let pstate = DeviceState::new(0, 48000, frames);
        let mut wbs = WorkBuffers::new(frames);
        for i in 0..frames {
            wbs.get_mut(WorkBufferRole::ActualPitches).set(i as isize, 6000.0);
            wbs.get_mut(WorkBufferRole::ActualForces).set(i as isize, 1.0);
        }
        let mut vstate = VoiceState::default();
        vstate.init();
        (pstate, wbs, vstate)
    }

    #[test]
    fn test_pulse_shape() {
        let proc = DebugProcessor::new();
        let (pstate, mut wbs, mut vstate) = render_setup(32);
        let stop = proc.render_voice(&mut vstate, &pstate, &mut wbs, 0, 32, 120.0);
        assert_eq!(stop, 32);
        assert!(vstate.updated);
        // Eight frames per cycle, pulse at the start of each.
        let audio = wbs.get(WorkBufferRole::AudioL);
        assert_eq!(audio.get(0), 1.0);
        for i in 1..8 {
            assert_eq!(audio.get(i), 0.5, "frame {}", i);
        }
        assert_eq!(audio.get(8), 1.0);
    }

    #[test]
    fn test_note_ends_after_ten_cycles() {
        let proc = DebugProcessor::new();
        let (pstate, mut wbs, mut vstate) = render_setup(256);
        let stop = proc.render_voice(&mut vstate, &pstate, &mut wbs, 0, 256, 120.0);
        // Ten cycles of eight frames each.
        assert_eq!(stop, 80);
        assert!(!vstate.active);
    }

    #[test]
    fn test_release_is_negated_and_short() {
        let proc = DebugProcessor::new();
        let (pstate, mut wbs, mut vstate) = render_setup(256);
        vstate.note_on = false;
        let stop = proc.render_voice(&mut vstate, &pstate, &mut wbs, 0, 256, 120.0);
        // Two cycles of eight frames each.
        assert_eq!(stop, 16);
        assert!(!vstate.active);
        let audio = wbs.get(WorkBufferRole::AudioL);
        assert_eq!(audio.get(0), -1.0);
        assert_eq!(audio.get(1), -0.5);
    }

    #[test]
    fn test_force_scales_output() {
        let proc = DebugProcessor::new();
        let (pstate, mut wbs, mut vstate) = render_setup(16);
        for i in 0..16 {
            wbs.get_mut(WorkBufferRole::ActualForces).set(i as isize, 0.5);
        }
        proc.render_voice(&mut vstate, &pstate, &mut wbs, 0, 16, 120.0);
        assert_eq!(wbs.get(WorkBufferRole::AudioL).get(0), 0.5);
        assert_eq!(wbs.get(WorkBufferRole::AudioL).get(1), 0.25);
    }

    #[test]
    fn test_inactive_voice_renders_nothing() {
        let proc = DebugProcessor::new();
        let (pstate, mut wbs, mut vstate) = render_setup(16);
        vstate.active = false;
        let stop = proc.render_voice(&mut vstate, &pstate, &mut wbs, 4, 16, 120.0);
        assert_eq!(stop, 4);
        assert!(vstate.updated);
    }
}
