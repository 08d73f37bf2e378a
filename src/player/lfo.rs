//! Low frequency oscillator for vibrato, tremolo and auto-wah.
//!
//! Speed and depth each move through their own slider, so turning an LFO
//! on eases the modulation in over the configured delay instead of
//! snapping.

use super::slider::Slider;
use crate::tstamp::Tstamp;

/// A sine LFO with slewed speed and depth.
#[derive(Debug, Clone)]
pub struct Lfo {
    audio_rate: u32,
    on: bool,
    phase: f64,
    speed_slider: Slider,
    depth_slider: Slider,
}

impl Lfo {
    pub fn new(audio_rate: u32) -> Self {
        assert!(audio_rate > 0);
        Self {
            audio_rate,
            on: false,
            phase: 0.0,
            speed_slider: Slider::new(0.0),
            depth_slider: Slider::new(0.0),
        }
    }

    pub fn set_audio_rate(&mut self, audio_rate: u32) {
        assert!(audio_rate > 0);
        self.audio_rate = audio_rate;
    }

    pub fn is_on(&self) -> bool {
        self.on
    }

    pub fn speed(&self) -> f64 {
        self.speed_slider.value()
    }

    pub fn depth(&self) -> f64 {
        self.depth_slider.value()
    }

    /// Slide the oscillation speed (Hz) over the stored delay.
    pub fn set_speed(&mut self, speed: f64, tempo: f64) {
        self.speed_slider.start(speed.max(0.0), tempo, self.audio_rate);
        if speed > 0.0 {
            self.on = true;
        }
    }

    /// Slide the modulation depth over the stored delay.
    pub fn set_depth(&mut self, depth: f64, tempo: f64) {
        self.depth_slider.start(depth, tempo, self.audio_rate);
        if depth != 0.0 {
            self.on = true;
        }
    }

    /// Set the delay applied to subsequent speed changes.
    pub fn set_speed_delay(&mut self, delay: Tstamp, tempo: f64) {
        self.speed_slider.set_length(delay, tempo, self.audio_rate);
    }

    /// Set the delay applied to subsequent depth changes.
    pub fn set_depth_delay(&mut self, delay: Tstamp, tempo: f64) {
        self.depth_slider.set_length(delay, tempo, self.audio_rate);
    }

    pub fn turn_off(&mut self) {
        self.on = false;
        self.speed_slider.set_value(0.0);
        self.depth_slider.set_value(0.0);
        self.phase = 0.0;
    }

    /// Advance one frame and return the modulation value.
    pub fn step(&mut self) -> f64 {
        if !self.on {
            return 0.0;
        }
        let speed = self.speed_slider.step();
        let depth = self.depth_slider.step();
        let value = (self.phase * std::f64::consts::TAU).sin() * depth;
        self.phase += speed / f64::from(self.audio_rate);
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }
        value
    }

    pub fn reset(&mut self) {
        self.turn_off();
    }
}
