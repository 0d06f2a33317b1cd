//! OpenCL runtime bindings for Rust
//!
//! Wraps the OpenCL C API with owned handles that are released exactly
//! once, translated status codes, and fixed-size query marshalling. The
//! system library is loaded at run time; nothing links against OpenCL.

#[macro_use]
mod macros;

mod bitmap;
pub mod config;
mod context;
mod device;
pub mod driver;
pub mod error;
mod event;
mod handle;
mod info;
mod kernel;
mod memory;
mod platform;
mod program;
mod queue;
mod runtime;
mod scalar;
pub mod sys;

#[cfg(test)]
mod fake;

pub use bitmap::{Bitmap, GrayImage, PixelLayout, RgbaImage};
pub use config::LoaderConfig;
pub use context::{Context, MAX_IMAGE_FORMATS};
pub use device::{
    Device, DeviceType, ExecCapabilities, FpConfig, LocalMemType, MAX_DEVICES, MemCacheType,
};
pub use driver::{Driver, Library};
pub use error::{ClError, Result};
pub use event::{Event, ExecutionStatus, ProfilingInfo, wait_for_events};
pub use kernel::{Kernel, padded_global_size};
pub use memory::{
    ChannelDataType, ChannelOrder, ImageDescriptor, ImageFormat, MemFlags, MemObject,
    MemObjectType,
};
pub use platform::{MAX_PLATFORMS, Platform};
pub use program::{BUILD_LOG_SIZE, BuildStatus, Program};
pub use queue::{CommandQueue, CommandQueueProperties, ImageRegion};
pub use runtime::Runtime;
pub use scalar::Scalar;

/// Platforms of the process-wide runtime.
pub fn platforms() -> Result<Vec<Platform>> {
    Runtime::global()?.platforms()
}

/// Devices of the process-wide runtime; `None` selects the default platform.
pub fn devices(platform: Option<&Platform>, device_type: DeviceType) -> Result<Vec<Device>> {
    Runtime::global()?.devices(platform, device_type)
}
