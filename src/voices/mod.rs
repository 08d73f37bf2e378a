//! Voices and the voice pool.

pub mod pool;
pub mod queue;
pub mod voice;

pub use pool::VoicePool;
pub use queue::{EventQueue, VoiceEvent};
pub use voice::{Voice, VoicePrio, VoiceState};
