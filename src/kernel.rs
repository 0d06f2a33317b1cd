use crate::device::Device;
use crate::driver::Driver;
use crate::error::{Result, check};
use crate::handle::{Handle, KernelKind};
use crate::info::{self, NAME_SIZE};
use crate::memory::MemObject;
use crate::scalar::Scalar;
use crate::sys::{self, cl_kernel, cl_kernel_work_group_info, cl_mem, cl_uint};
use std::mem;
use std::os::raw::c_void;
use std::ptr;
use std::sync::Arc;

/// An entry point of a built program together with its argument bindings.
///
/// Argument indices and sizes are checked by the runtime, which reports
/// `InvalidArgIndex`, `InvalidArgSize` or `InvalidArgValue`.
#[derive(Debug)]
pub struct Kernel {
    handle: Handle<KernelKind>,
    name: String,
}

impl Kernel {
    pub(crate) fn new(driver: Arc<dyn Driver>, raw: cl_kernel, name: String) -> Self {
        Kernel {
            handle: Handle::new(driver, raw),
            name,
        }
    }

    pub fn raw(&self) -> cl_kernel {
        self.handle.raw()
    }

    /// The name the kernel was created with.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The function name as reported by the runtime.
    pub fn function_name(&self) -> Result<String> {
        info::string::<NAME_SIZE>(|size, value, size_ret| unsafe {
            self.handle.driver().get_kernel_info(
                self.raw(),
                sys::CL_KERNEL_FUNCTION_NAME,
                size,
                value,
                size_ret,
            )
        })
    }

    pub fn num_args(&self) -> Result<u32> {
        info::value(|size, value, size_ret| unsafe {
            self.handle.driver().get_kernel_info(
                self.raw(),
                sys::CL_KERNEL_NUM_ARGS,
                size,
                value,
                size_ret,
            )
        })
    }

    /// Binds `arg_size` bytes at `arg_value` to argument `index`.
    ///
    /// # Safety
    ///
    /// `arg_value` must be null or valid for `arg_size` bytes, and hold
    /// what the kernel expects at that position.
    pub unsafe fn set_arg_raw(
        &self,
        index: u32,
        arg_size: usize,
        arg_value: *const c_void,
    ) -> Result<()> {
        check(unsafe {
            self.handle
                .driver()
                .set_kernel_arg(self.raw(), index as cl_uint, arg_size, arg_value)
        })
    }

    /// Binds a scalar passed by value.
    pub fn set_arg<T: Scalar>(&self, index: u32, value: T) -> Result<()> {
        unsafe {
            self.set_arg_raw(
                index,
                mem::size_of::<T>(),
                (&value as *const T).cast(),
            )
        }
    }

    pub fn set_arg_i32(&self, index: u32, value: i32) -> Result<()> {
        self.set_arg(index, value)
    }

    pub fn set_arg_u32(&self, index: u32, value: u32) -> Result<()> {
        self.set_arg(index, value)
    }

    pub fn set_arg_f32(&self, index: u32, value: f32) -> Result<()> {
        self.set_arg(index, value)
    }

    /// Binds a buffer or image. The memory object must outlive any
    /// dispatch that uses this binding.
    pub fn set_arg_buffer(&self, index: u32, buffer: &MemObject) -> Result<()> {
        let raw: cl_mem = buffer.raw();
        unsafe {
            self.set_arg_raw(
                index,
                mem::size_of::<cl_mem>(),
                (&raw as *const cl_mem).cast(),
            )
        }
    }

    /// Reserves `size` bytes of local memory for a `__local` argument.
    pub fn set_arg_local(&self, index: u32, size: usize) -> Result<()> {
        unsafe { self.set_arg_raw(index, size, ptr::null()) }
    }

    /// Largest work-group size usable with this kernel on `device`. `None`
    /// is only valid when the program targets a single device.
    pub fn work_group_size(&self, device: Option<&Device>) -> Result<usize> {
        self.work_group_info(device, sys::CL_KERNEL_WORK_GROUP_SIZE)
    }

    pub fn preferred_work_group_size_multiple(&self, device: Option<&Device>) -> Result<usize> {
        self.work_group_info(device, sys::CL_KERNEL_PREFERRED_WORK_GROUP_SIZE_MULTIPLE)
    }

    /// Releases the kernel now instead of on drop. Consuming the
    /// wrapper guarantees no other borrow can still be using the handle.
    pub fn release(self) -> Result<()> {
        self.handle.release()
    }

    fn work_group_info(
        &self,
        device: Option<&Device>,
        param: cl_kernel_work_group_info,
    ) -> Result<usize> {
        let device = device.map_or(ptr::null_mut(), |d| d.id);
        info::value(|size, value, size_ret| unsafe {
            self.handle.driver().get_kernel_work_group_info(
                self.raw(),
                device,
                param,
                size,
                value,
                size_ret,
            )
        })
    }
}

unsafe impl Send for Kernel {}
unsafe impl Sync for Kernel {}

/// Rounds `count` work items up to a whole number of `local`-sized groups.
pub fn padded_global_size(count: usize, local: usize) -> usize {
    if local == 0 {
        return count;
    }
    count.div_ceil(local) * local
}
