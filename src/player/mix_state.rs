//! Snapshot of the playback state for introspection.

use crate::tstamp::Tstamp;
use serde::Serialize;

/// A copyable view of where playback is and what it has produced.
///
/// Amplitude and clip statistics accumulate between snapshots; taking a
/// snapshot resets them.
#[derive(Debug, Clone, Serialize)]
pub struct MixState {
    pub playing: bool,
    /// Frames rendered since the last playback reset.
    pub frames: u64,
    /// The same, in nanoseconds at the current audio rate.
    pub nanoseconds: u64,
    /// Current song index, or -1 outside song playback.
    pub subsong: i32,
    pub section: i32,
    /// Current pattern number, or -1 when none is playing.
    pub pattern: i32,
    pub pos: Tstamp,
    pub tempo: f64,
    /// Peak simultaneous voice count since the last snapshot.
    pub voices: usize,
    pub min_amps: [f64; 2],
    pub max_amps: [f64; 2],
    pub clipped: [u64; 2],
}

impl MixState {
    pub fn new() -> Self {
        Self {
            playing: false,
            frames: 0,
            nanoseconds: 0,
            subsong: -1,
            section: -1,
            pattern: -1,
            pos: Tstamp::zero(),
            tempo: 0.0,
            voices: 0,
            min_amps: [f64::INFINITY; 2],
            max_amps: [f64::NEG_INFINITY; 2],
            clipped: [0; 2],
        }
    }
}

impl Default for MixState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let state = MixState::new();
        assert!(!state.playing);
        assert_eq!(state.subsong, -1);
        assert!(state.min_amps[0].is_infinite());
        assert!(state.max_amps[1] < 0.0);
    }

    #[test]
    fn test_serializes_to_json() {
        let state = MixState::new();
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["playing"], false);
        assert_eq!(json["pos"], serde_json::json!([0, 0]));
    }
}
