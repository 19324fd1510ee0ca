//! GPU resource wrappers.
//!
//! Every wrapper owns exactly one driver object (three for a render target)
//! and shares a [`GpuContext`] that tracks what is currently bound. Handles
//! are released exactly once: explicitly through `delete`, or on drop.

pub mod buffer;
pub mod context;
pub mod device;
pub mod error;
pub mod framebuffer;
pub mod shader;
pub mod vertex_array;

#[cfg(test)]
pub(crate) mod testing;

pub use buffer::*;
pub use context::*;
pub use device::*;
pub use error::*;
pub use framebuffer::*;
pub use shader::*;
pub use vertex_array::*;
