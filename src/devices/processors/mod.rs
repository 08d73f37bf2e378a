//! Built-in processors.
//!
//! Real instrument DSP arrives through external [`DeviceImpl`] instances;
//! only the deterministic debug processor lives in-tree.
//!
//! [`DeviceImpl`]: super::DeviceImpl

pub mod debug;

pub use debug::DebugProcessor;
