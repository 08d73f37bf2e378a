//! Kunquat music engine.
//!
//! Renders a declarative composition ([`Module`]) into PCM frames at a
//! caller-specified audio rate. The engine advances a rational-beat
//! timeline, dispatches timed triggers through an event state machine,
//! drives a bounded pool of polyphonic voices through a processor graph,
//! and mixes the result into output buffers under real-time constraints:
//! no allocation, locking or blocking on the render path.
//!
//! File loading, the on-disk format, audio drivers and concrete
//! instrument DSP are external collaborators; they arrive through
//! [`Module`] assembly and the [`DeviceImpl`] hook interface.

pub mod devices;
pub mod environment;
pub mod error;
pub mod events;
pub mod handle;
pub mod limits;
pub mod memory;
pub mod module;
pub mod player;
pub mod random;
pub mod tstamp;
pub mod tuning;
pub mod voices;

pub use devices::DeviceImpl;
pub use error::KunquatError;
pub use handle::Handle;
pub use memory::suppress_assert_messages;
pub use module::Module;
pub use player::{MixState, PlayStart};
pub use tstamp::Tstamp;
