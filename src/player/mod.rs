//! The playback engine: master loop, channels, dispatch and statistics.

pub mod channel;
pub mod dispatch;
pub mod general_state;
pub mod lfo;
pub mod master;
pub mod mix_state;
pub mod slider;
pub mod workers;

pub use channel::Channel;
pub use general_state::GeneralState;
pub use lfo::Lfo;
pub use master::{MasterParams, PlayStart, PlaybackState, Player, Position};
pub use mix_state::MixState;
pub use slider::Slider;
