use crate::config::LoaderConfig;
use crate::device::{Device, DeviceType};
use crate::driver::{Driver, Library};
use crate::error::Result;
use crate::platform::Platform;
use log::info;
use once_cell::sync::Lazy;
use std::fmt;
use std::sync::Arc;

static GLOBAL: Lazy<Result<Runtime>> = Lazy::new(Runtime::load);

/// Entry point to an OpenCL implementation.
///
/// Cloning is cheap; every object obtained through a runtime shares its
/// driver.
#[derive(Clone)]
pub struct Runtime {
    driver: Arc<dyn Driver>,
}

impl Runtime {
    /// Loads the system library chosen by [`LoaderConfig::from_env`].
    pub fn load() -> Result<Self> {
        Self::load_with(&LoaderConfig::from_env())
    }

    pub fn load_with(config: &LoaderConfig) -> Result<Self> {
        let library = Library::load(config)?;
        info!("Using OpenCL library {}", library.path().display());
        Ok(Self::with_driver(Arc::new(library)))
    }

    /// Wraps any [`Driver`], e.g. an instrumented one.
    pub fn with_driver(driver: Arc<dyn Driver>) -> Self {
        Runtime { driver }
    }

    /// The process-wide runtime, loaded on first use. A failed load is
    /// remembered and returned to every caller.
    pub fn global() -> Result<&'static Runtime> {
        GLOBAL.as_ref().map_err(Clone::clone)
    }

    pub fn driver(&self) -> &Arc<dyn Driver> {
        &self.driver
    }

    pub fn platforms(&self) -> Result<Vec<Platform>> {
        Platform::enumerate(&self.driver)
    }

    /// Devices of `device_type` on `platform`, or on the default platform
    /// when `None`.
    pub fn devices(
        &self,
        platform: Option<&Platform>,
        device_type: DeviceType,
    ) -> Result<Vec<Device>> {
        Device::enumerate(&self.driver, platform, device_type)
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime").finish_non_exhaustive()
    }
}
