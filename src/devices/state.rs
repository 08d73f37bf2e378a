//! Runtime state owned per device and per audio unit.

use crate::events::Value;
use crate::limits::AUDIO_BUFFER_SIZE_MAX;
use indexmap::IndexMap;
use std::any::Any;

/// Runtime data for one device graph node.
///
/// Every device gets stereo input and output accumulation buffers for the
/// mixed pass, plus an optional implementation-defined state blob created
/// by its [`DeviceImpl`](super::DeviceImpl).
pub struct DeviceState {
    device_id: usize,
    audio_rate: u32,
    in_l: Vec<f32>,
    in_r: Vec<f32>,
    out_l: Vec<f32>,
    out_r: Vec<f32>,
    impl_state: Option<Box<dyn Any + Send + Sync>>,
}

impl std::fmt::Debug for DeviceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceState")
            .field("device_id", &self.device_id)
            .field("audio_rate", &self.audio_rate)
            .finish_non_exhaustive()
    }
}

impl DeviceState {
    pub fn new(device_id: usize, audio_rate: u32, buffer_size: usize) -> Self {
        assert!(buffer_size > 0 && buffer_size <= AUDIO_BUFFER_SIZE_MAX);
        assert!(audio_rate > 0);
        Self {
            device_id,
            audio_rate,
            in_l: vec![0.0; buffer_size],
            in_r: vec![0.0; buffer_size],
            out_l: vec![0.0; buffer_size],
            out_r: vec![0.0; buffer_size],
            impl_state: None,
        }
    }

    pub fn device_id(&self) -> usize {
        self.device_id
    }

    pub fn audio_rate(&self) -> u32 {
        self.audio_rate
    }

    pub fn set_audio_rate(&mut self, audio_rate: u32) {
        assert!(audio_rate > 0);
        self.audio_rate = audio_rate;
    }

    pub fn set_impl_state(&mut self, state: Option<Box<dyn Any + Send + Sync>>) {
        self.impl_state = state;
    }

    /// Downcast the implementation state blob.
    pub fn impl_state<T: 'static>(&self) -> Option<&T> {
        self.impl_state.as_ref().and_then(|s| s.downcast_ref())
    }

    pub fn impl_state_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.impl_state.as_mut().and_then(|s| s.downcast_mut())
    }

    pub fn in_bufs(&self) -> (&[f32], &[f32]) {
        (&self.in_l, &self.in_r)
    }

    pub fn in_bufs_mut(&mut self) -> (&mut [f32], &mut [f32]) {
        (&mut self.in_l, &mut self.in_r)
    }

    pub fn out_bufs(&self) -> (&[f32], &[f32]) {
        (&self.out_l, &self.out_r)
    }

    pub fn out_bufs_mut(&mut self) -> (&mut [f32], &mut [f32]) {
        (&mut self.out_l, &mut self.out_r)
    }

    /// All four audio buffers at once, for mixed rendering.
    pub fn io_bufs_mut(&mut self) -> (&[f32], &[f32], &mut [f32], &mut [f32]) {
        (&self.in_l, &self.in_r, &mut self.out_l, &mut self.out_r)
    }

    pub fn clear_audio(&mut self) {
        self.in_l.fill(0.0);
        self.in_r.fill(0.0);
        self.out_l.fill(0.0);
        self.out_r.fill(0.0);
    }

    pub fn resize(&mut self, buffer_size: usize) {
        assert!(buffer_size > 0 && buffer_size <= AUDIO_BUFFER_SIZE_MAX);
        for buf in [
            &mut self.in_l,
            &mut self.in_r,
            &mut self.out_l,
            &mut self.out_r,
        ] {
            buf.clear();
            buf.resize(buffer_size, 0.0);
        }
    }
}

/// Runtime state for one audio unit: live control variable values and the
/// active expression.
#[derive(Debug, Clone, Default)]
pub struct AuState {
    control_vars: IndexMap<String, Value>,
    expression: String,
    pedal: f64,
}

impl AuState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self, decls: impl Iterator<Item = (String, Value)>) {
        self.control_vars.clear();
        for (name, value) in decls {
            self.control_vars.insert(name, value);
        }
        self.expression.clear();
        self.pedal = 0.0;
    }

    pub fn control_var(&self, name: &str) -> Option<&Value> {
        self.control_vars.get(name)
    }

    /// Write a declared control variable; unknown names no-op.
    pub fn set_control_var(&mut self, name: &str, value: Value) {
        if let Some(slot) = self.control_vars.get_mut(name) {
            *slot = value;
        }
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn set_expression(&mut self, expression: &str) {
        self.expression.clear();
        self.expression.push_str(expression);
    }

    pub fn pedal(&self) -> f64 {
        self.pedal
    }

    pub fn set_pedal(&mut self, value: f64) {
        self.pedal = value.clamp(0.0, 1.0);
    }
}
