//! The processor capability interface.
//!
//! A device implementation is the DSP code behind one node of the device
//! graph. The engine drives it through a small set of optional hooks; a
//! device only overrides what it needs. The hooks are the entire surface:
//! the engine knows nothing about a processor's internals.
//!
//! Hook contracts:
//! - `create_impl_state` runs at setup or reconfiguration only; it is the
//!   one place a device may allocate.
//! - `render_voice` is called once per active voice per chunk segment with
//!   a shared processor state. Per-voice mutable data lives in the voice
//!   state, which is why distinct voice groups can render in parallel.
//! - `render_mixed` is called once per chunk segment with exclusive access
//!   to the processor state.
//! - Neither render hook may allocate or block.

use super::state::DeviceState;
use super::work_buffers::WorkBuffers;
use crate::events::Value;
use crate::random::Random;
use crate::voices::voice::VoiceState;
use std::any::Any;

/// DSP code for one device graph node.
pub trait DeviceImpl: Send + Sync {
    /// Short type name, for diagnostics.
    fn name(&self) -> &'static str;

    /// Whether this device renders per-voice audio (as opposed to mixing).
    fn is_voice_processor(&self) -> bool {
        false
    }

    /// Allocate processor state for the given configuration.
    fn create_impl_state(
        &self,
        _audio_rate: u32,
        _audio_buffer_size: usize,
    ) -> Option<Box<dyn Any + Send + Sync>> {
        None
    }

    /// Prepare a freshly allocated voice for this processor.
    fn init_vstate(&self, _vstate: &mut VoiceState, _pstate: &DeviceState) {}

    /// Render one voice into the work buffers over `[buf_start, buf_stop)`.
    ///
    /// Returns the frame index after which the voice produces nothing; a
    /// value below `buf_stop` tells the engine the voice has finished. The
    /// hook must set `vstate.updated`, and may clear `vstate.active` to
    /// enter release.
    fn render_voice(
        &self,
        _vstate: &mut VoiceState,
        _pstate: &DeviceState,
        _wbs: &mut WorkBuffers,
        _buf_start: usize,
        buf_stop: usize,
        _tempo: f64,
    ) -> usize {
        buf_stop
    }

    /// Render mixed audio over `[buf_start, buf_stop)` from the device's
    /// input buffers into its output buffers.
    fn render_mixed(
        &self,
        _pstate: &mut DeviceState,
        _wbs: &mut WorkBuffers,
        _buf_start: usize,
        _buf_stop: usize,
        _tempo: f64,
    ) {
    }

    /// Receive a control variable routed from a channel or audio unit
    /// event. Unknown names must be ignored.
    fn set_control_var(
        &self,
        _pstate: &mut DeviceState,
        _random: &mut Random,
        _name: &str,
        _value: &Value,
    ) {
    }
}
