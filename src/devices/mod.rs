//! The device layer: processor interface, runtime states, graph and work
//! buffers.

pub mod device_impl;
pub mod graph;
pub mod processors;
pub mod state;
pub mod work_buffers;

pub use device_impl::DeviceImpl;
pub use graph::{DeviceGraph, DeviceNode};
pub use state::{AuState, DeviceState};
pub use work_buffers::{WorkBuffer, WorkBufferRole, WorkBuffers};
