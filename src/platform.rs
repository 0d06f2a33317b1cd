use crate::device::{Device, DeviceType};
use crate::driver::Driver;
use crate::error::{Result, check};
use crate::info::{self, STRING_SIZE};
use crate::sys::{self, cl_platform_id, cl_platform_info, cl_uint};
use log::warn;
use std::fmt;
use std::ptr;
use std::sync::Arc;

/// Enumeration never reports more platforms than this.
pub const MAX_PLATFORMS: usize = 32;

/// An OpenCL platform. Platforms belong to the runtime and are never released.
#[derive(Clone)]
pub struct Platform {
    pub(crate) id: cl_platform_id,
    pub(crate) driver: Arc<dyn Driver>,
}

impl Platform {
    /// Lists the platforms the runtime reports, truncated to
    /// [`MAX_PLATFORMS`].
    pub(crate) fn enumerate(driver: &Arc<dyn Driver>) -> Result<Vec<Platform>> {
        let mut ids = [ptr::null_mut(); MAX_PLATFORMS];
        let mut count: cl_uint = 0;
        check(unsafe {
            driver.get_platform_ids(MAX_PLATFORMS as cl_uint, ids.as_mut_ptr(), &mut count)
        })?;

        let count = count as usize;
        if count > MAX_PLATFORMS {
            warn!(
                "Runtime reports {} platforms; only the first {} are visible",
                count, MAX_PLATFORMS
            );
        }

        Ok(ids[..count.min(MAX_PLATFORMS)]
            .iter()
            .map(|&id| Platform {
                id,
                driver: driver.clone(),
            })
            .collect())
    }

    pub fn id(&self) -> cl_platform_id {
        self.id
    }

    /// Devices of this platform matching `device_type`.
    pub fn devices(&self, device_type: DeviceType) -> Result<Vec<Device>> {
        Device::enumerate(&self.driver, Some(self), device_type)
    }

    pub fn name(&self) -> Result<String> {
        self.string(sys::CL_PLATFORM_NAME)
    }

    pub fn vendor(&self) -> Result<String> {
        self.string(sys::CL_PLATFORM_VENDOR)
    }

    /// `FULL_PROFILE` or `EMBEDDED_PROFILE`.
    pub fn profile(&self) -> Result<String> {
        self.string(sys::CL_PLATFORM_PROFILE)
    }

    pub fn version(&self) -> Result<String> {
        self.string(sys::CL_PLATFORM_VERSION)
    }

    pub fn extensions(&self) -> Result<String> {
        self.string(sys::CL_PLATFORM_EXTENSIONS)
    }

    fn string(&self, param: cl_platform_info) -> Result<String> {
        info::string::<STRING_SIZE>(|size, value, size_ret| unsafe {
            self.driver
                .get_platform_info(self.id, param, size, value, size_ret)
        })
    }
}

impl PartialEq for Platform {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Platform {}

impl fmt::Debug for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Platform({:p})", self.id)
    }
}

unsafe impl Send for Platform {}
unsafe impl Sync for Platform {}
