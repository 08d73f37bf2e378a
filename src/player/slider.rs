//! Linear parameter slider.
//!
//! A slider moves a value toward a target over a musical length. The
//! length is stored as beat time and converted to frames when the slide
//! starts, so the per-frame step stays constant for the whole slide.

use crate::tstamp::Tstamp;

/// A linear slide toward a target value.
#[derive(Debug, Clone)]
pub struct Slider {
    current: f64,
    target: f64,
    /// -1, 0 or +1; zero means no slide in progress.
    direction: i8,
    step: f64,
    frames_left: u64,
    length: Tstamp,
}

impl Slider {
    pub fn new(initial: f64) -> Self {
        Self {
            current: initial,
            target: initial,
            direction: 0,
            step: 0.0,
            frames_left: 0,
            length: Tstamp::zero(),
        }
    }

    pub fn value(&self) -> f64 {
        self.current
    }

    pub fn target(&self) -> f64 {
        self.target
    }

    pub fn is_active(&self) -> bool {
        self.direction != 0
    }

    pub fn length(&self) -> Tstamp {
        self.length
    }

    /// Set the value immediately and stop any slide.
    pub fn set_value(&mut self, value: f64) {
        self.current = value;
        self.target = value;
        self.direction = 0;
        self.frames_left = 0;
    }

    /// Start or retarget a slide using the stored length.
    pub fn start(&mut self, target: f64, tempo: f64, rate: u32) {
        let frames = self.length.to_frames(tempo, rate);
        self.target = target;
        if frames < 1.0 {
            self.set_value(target);
            return;
        }
        self.frames_left = frames as u64;
        self.step = (target - self.current) / frames;
        self.direction = if self.step > 0.0 {
            1
        } else if self.step < 0.0 {
            -1
        } else {
            0
        };
        if self.direction == 0 {
            self.set_value(target);
        }
    }

    /// Change the slide length; an active slide is re-planned from its
    /// current position.
    pub fn set_length(&mut self, length: Tstamp, tempo: f64, rate: u32) {
        self.length = length;
        if self.is_active() {
            let target = self.target;
            self.start(target, tempo, rate);
        }
    }

    /// Advance one frame and return the new value.
    pub fn step(&mut self) -> f64 {
        if self.direction == 0 {
            return self.current;
        }
        self.current += self.step;
        self.frames_left -= 1;
        let crossed = (self.direction > 0 && self.current >= self.target)
            || (self.direction < 0 && self.current <= self.target);
        if crossed || self.frames_left == 0 {
            self.set_value(self.target);
        }
        self.current
    }

    /// Advance `frames` frames at once.
    pub fn advance(&mut self, frames: usize) -> f64 {
        if self.direction == 0 || frames == 0 {
            return self.current;
        }
        let n = (frames as u64).min(self.frames_left);
        self.current += self.step * n as f64;
        self.frames_left -= n;
        let crossed = (self.direction > 0 && self.current >= self.target)
            || (self.direction < 0 && self.current <= self.target);
        if crossed || self.frames_left == 0 {
            self.set_value(self.target);
        }
        self.current
    }
}
