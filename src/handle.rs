//! The public playback handle.
//!
//! A handle binds one sealed [`Module`] to one [`Player`]. Handles are
//! fully independent of each other; nothing is shared between them.
//!
//! The external loader surface (file parsing, archive handling) and the
//! audio drivers live outside this crate: a caller assembles a `Module`,
//! wraps it in a handle, and pulls rendered frames.

use crate::error::KunquatError;
use crate::limits::AUDIO_BUFFER_SIZE_MAX;
use crate::memory::Memory;
use crate::module::Module;
use crate::player::{MixState, PlayStart, Player};
use std::sync::Arc;

/// Default audio rate in frames per second.
pub const AUDIO_RATE_DEFAULT: u32 = 48000;

/// Default voice pool size.
pub const VOICE_COUNT_DEFAULT: usize = 256;

/// One independent playback context.
pub struct Handle {
    player: Player,
}

impl Handle {
    /// Create a handle for a module with default settings.
    pub fn new(mut module: Module) -> Result<Self, KunquatError> {
        module.seal()?;
        Self::with_settings(module, AUDIO_RATE_DEFAULT, VOICE_COUNT_DEFAULT)
    }

    /// Create a handle with an explicit audio rate and voice count.
    pub fn with_settings(
        mut module: Module,
        audio_rate: u32,
        voice_count: usize,
    ) -> Result<Self, KunquatError> {
        module.seal()?;
        let player = Player::new(
            Arc::new(module),
            audio_rate,
            voice_count,
            AUDIO_BUFFER_SIZE_MAX,
            Memory::new(),
        )?;
        Ok(Self { player })
    }

    /// Start playback from the given position.
    pub fn play(&mut self, start: PlayStart) {
        self.player.play(start);
    }

    /// Stop playback; the next render call produces silence.
    pub fn stop(&mut self) {
        self.player.stop();
    }

    pub fn is_playing(&self) -> bool {
        self.player.is_playing()
    }

    pub fn set_audio_rate(&mut self, rate: u32) -> Result<(), KunquatError> {
        self.player.set_audio_rate(rate)
    }

    pub fn audio_rate(&self) -> u32 {
        self.player.audio_rate()
    }

    /// Set the voice pool size, `2..=1024`.
    pub fn set_voice_count(&mut self, voices: usize) -> Result<(), KunquatError> {
        self.player.set_voice_count(voices)
    }

    pub fn set_infinite(&mut self, infinite: bool) {
        self.player.set_infinite(infinite);
    }

    /// Mute or unmute one channel.
    pub fn set_channel_mute(&mut self, ch: usize, mute: bool) -> Result<(), KunquatError> {
        self.player.set_channel_mute(ch, mute)
    }

    /// Set the number of worker threads used for voice rendering.
    pub fn set_thread_count(&mut self, threads: usize) -> Result<(), KunquatError> {
        self.player.set_thread_count(threads)
    }

    /// Render up to `nframes` frames of audio into the two output
    /// channels. Returns the number of frames actually mixed.
    pub fn render(
        &mut self,
        nframes: usize,
        out_left: &mut [f32],
        out_right: &mut [f32],
    ) -> usize {
        self.player.render(nframes, out_left, out_right)
    }

    /// The fired events of the rendered chunks so far, as a JSON array.
    pub fn events(&self) -> String {
        self.player.events_json()
    }

    /// Reset the event buffer; ends skipping mode.
    pub fn reset_events(&mut self) {
        self.player.reset_events();
    }

    /// Whether the event buffer has reached its capacity.
    pub fn events_full(&self) -> bool {
        self.player.event_buffer.is_full()
    }

    /// Events offered to the buffer since the last reset.
    pub fn events_added(&self) -> u64 {
        self.player.event_buffer.events_added()
    }

    /// Events dropped by the buffer since the last reset.
    pub fn events_skipped(&self) -> u64 {
        self.player.event_buffer.events_skipped()
    }

    /// Snapshot playback state and statistics; amplitude and voice
    /// statistics reset on read.
    pub fn mix_state(&mut self) -> MixState {
        self.player.mix_state()
    }

    pub fn module(&self) -> &Module {
        self.player.module()
    }

    // Testing hooks.

    /// Simulate an allocation failure after `steps` successful claims.
    pub fn fake_out_of_memory(&self, steps: i64) {
        self.player.memory().fake_out_of_memory(steps);
    }

    /// Number of successful allocation claims made by this handle.
    pub fn memory_alloc_count(&self) -> i64 {
        self.player.memory().alloc_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_module_handle() {
        let mut handle = Handle::new(Module::new()).unwrap();
        assert!(!handle.is_playing());
        assert_eq!(handle.events(), "[]");
        let mut left = vec![1.0f32; 64];
        let mut right = vec![1.0f32; 64];
        let mixed = handle.render(64, &mut left, &mut right);
        assert_eq!(mixed, 0);
        assert!(left.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_voice_count_limits() {
        let mut handle = Handle::new(Module::new()).unwrap();
        assert!(handle.set_voice_count(1).is_err());
        assert!(handle.set_voice_count(1025).is_err());
        assert!(handle.set_voice_count(1024).is_ok());
    }

    #[test]
    fn test_alloc_count_grows_with_setup() {
        let handle = Handle::new(Module::new()).unwrap();
        assert!(handle.memory_alloc_count() > 0);
    }

    #[test]
    fn test_fake_out_of_memory_blocks_growth() {
        let mut handle = Handle::with_settings(Module::new(), 48000, 16).unwrap();
        handle.fake_out_of_memory(0);
        assert!(handle.set_voice_count(1024).is_err());
        // The simulation disables itself after firing.
        assert!(handle.set_voice_count(64).is_ok());
    }
}
