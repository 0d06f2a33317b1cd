use crate::device::Device;
use crate::driver::Driver;
use crate::error::{ClError, Result, check_handle};
use crate::handle::{Handle, ProgramKind};
use crate::info;
use crate::kernel::Kernel;
use crate::sys::{self, cl_build_status, cl_program, cl_program_build_info, cl_uint};
use log::{debug, warn};
use std::ffi::CString;
use std::os::raw::c_void;
use std::ptr;
use std::sync::Arc;

/// Initial buffer size for build logs.
pub const BUILD_LOG_SIZE: usize = 2048;

native_enum! {
    pub enum BuildStatus: cl_build_status {
        Success = sys::CL_BUILD_SUCCESS => "Success",
        None = sys::CL_BUILD_NONE => "None",
        Error = sys::CL_BUILD_ERROR => "Error",
        InProgress = sys::CL_BUILD_IN_PROGRESS => "InProgress",
    }
}

/// Program source compiled (or to be compiled) for a context's devices.
#[derive(Debug)]
pub struct Program {
    handle: Handle<ProgramKind>,
    devices: Vec<Device>,
}

impl Program {
    pub(crate) fn new(driver: Arc<dyn Driver>, raw: cl_program, devices: Vec<Device>) -> Self {
        Program {
            handle: Handle::new(driver, raw),
            devices,
        }
    }

    pub fn raw(&self) -> cl_program {
        self.handle.raw()
    }

    /// Devices the program was created for.
    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    /// Compiles the program for `devices`, or for every device of the
    /// program when `None`.
    ///
    /// A compiler failure comes back as [`ClError::Build`] carrying the
    /// build log of the program's first device.
    pub fn build(&self, devices: Option<&[Device]>, options: &str) -> Result<()> {
        let options = if options.is_empty() {
            None
        } else {
            Some(CString::new(options).map_err(|_| ClError::InvalidString)?)
        };
        let ids: Vec<_> = devices
            .unwrap_or_default()
            .iter()
            .map(|d| d.id)
            .collect();
        let device_list = if ids.is_empty() {
            ptr::null()
        } else {
            ids.as_ptr()
        };

        debug!("Building program {:p} for {} devices", self.raw(), ids.len());
        let status = unsafe {
            self.handle.driver().build_program(
                self.raw(),
                ids.len() as cl_uint,
                device_list,
                options.as_ref().map_or(ptr::null(), |o| o.as_ptr()),
                ptr::null(),
                ptr::null_mut(),
            )
        };

        match ClError::from_status(status) {
            None => Ok(()),
            Some(ClError::BuildProgramFailure) => Err(self.build_failure()),
            Some(error) => Err(error),
        }
    }

    fn build_failure(&self) -> ClError {
        let Some(device) = self.devices.first() else {
            return ClError::BuildProgramFailure;
        };
        match self.build_log(device) {
            Ok(log) if !log.trim().is_empty() => {
                warn!(
                    "Program build failed: {}",
                    log.lines().find(|l| !l.trim().is_empty()).unwrap_or_default()
                );
                ClError::Build { log }
            }
            Ok(_) => {
                warn!("Program build failed with an empty build log");
                ClError::BuildProgramFailure
            }
            Err(e) => {
                warn!("Program build failed and the build log is unavailable: {}", e);
                ClError::BuildProgramFailure
            }
        }
    }

    /// The compiler output of the last build for `device`.
    pub fn build_log(&self, device: &Device) -> Result<String> {
        info::long_string::<BUILD_LOG_SIZE>(|size, value, size_ret| unsafe {
            self.build_info(device, sys::CL_PROGRAM_BUILD_LOG, size, value, size_ret)
        })
    }

    pub fn build_status(&self, device: &Device) -> Result<BuildStatus> {
        info::value(|size, value, size_ret| unsafe {
            self.build_info(device, sys::CL_PROGRAM_BUILD_STATUS, size, value, size_ret)
        })
        .map(BuildStatus::from_raw)
    }

    pub fn create_kernel(&self, name: &str) -> Result<Kernel> {
        let c_name = CString::new(name).map_err(|_| ClError::InvalidString)?;
        let mut status = sys::CL_SUCCESS;
        let raw = unsafe {
            self.handle
                .driver()
                .create_kernel(self.raw(), c_name.as_ptr(), &mut status)
        };
        let raw = check_handle(status, raw)?;
        Ok(Kernel::new(self.handle.driver().clone(), raw, name.to_string()))
    }

    /// Releases the program now instead of on drop. Consuming the
    /// wrapper guarantees no other borrow can still be using the handle.
    pub fn release(self) -> Result<()> {
        self.handle.release()
    }

    unsafe fn build_info(
        &self,
        device: &Device,
        param: cl_program_build_info,
        size: usize,
        value: *mut c_void,
        size_ret: *mut usize,
    ) -> sys::cl_int {
        unsafe {
            self.handle.driver().get_program_build_info(
                self.raw(),
                device.id,
                param,
                size,
                value,
                size_ret,
            )
        }
    }
}

unsafe impl Send for Program {}
unsafe impl Sync for Program {}
