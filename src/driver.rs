//! The seam between this crate and the native OpenCL entry points.
//!
//! [`Driver`] mirrors the C signatures one-to-one, so every wrapper type
//! talks to the runtime through a trait object. [`Library`] resolves the
//! real symbols from the system ICD loader at run time.

use crate::config::LoaderConfig;
use crate::sys::*;
use crate::{ClError, Result};
use log::debug;
use std::fmt;
use std::os::raw::{c_char, c_void};
use std::path::{Path, PathBuf};

macro_rules! driver_api {
    ($(
        fn $method:ident = $symbol:ident($($arg:ident: $ty:ty),* $(,)?) -> $ret:ty;
    )*) => {
        /// Raw OpenCL entry points.
        ///
        /// Methods take and return exactly what the C functions do. Callers
        /// are responsible for passing valid handles and pointers.
        pub trait Driver: Send + Sync {
            $(
                #[allow(clippy::too_many_arguments)]
                unsafe fn $method(&self, $($arg: $ty),*) -> $ret;
            )*
        }

        #[allow(non_snake_case)]
        struct Symbols {
            $($symbol: unsafe extern "system" fn($($ty),*) -> $ret,)*
        }

        impl Symbols {
            unsafe fn resolve(
                library: &libloading::Library,
            ) -> std::result::Result<Self, libloading::Error> {
                unsafe {
                    Ok(Self {
                        $($symbol: *library.get(concat!(stringify!($symbol), "\0").as_bytes())?,)*
                    })
                }
            }
        }

        impl Driver for Library {
            $(
                unsafe fn $method(&self, $($arg: $ty),*) -> $ret {
                    unsafe { (self.symbols.$symbol)($($arg),*) }
                }
            )*
        }
    };
}

driver_api! {
    fn get_platform_ids = clGetPlatformIDs(
        num_entries: cl_uint,
        platforms: *mut cl_platform_id,
        num_platforms: *mut cl_uint,
    ) -> cl_int;
    fn get_platform_info = clGetPlatformInfo(
        platform: cl_platform_id,
        param_name: cl_platform_info,
        param_value_size: usize,
        param_value: *mut c_void,
        param_value_size_ret: *mut usize,
    ) -> cl_int;
    fn get_device_ids = clGetDeviceIDs(
        platform: cl_platform_id,
        device_type: cl_device_type,
        num_entries: cl_uint,
        devices: *mut cl_device_id,
        num_devices: *mut cl_uint,
    ) -> cl_int;
    fn get_device_info = clGetDeviceInfo(
        device: cl_device_id,
        param_name: cl_device_info,
        param_value_size: usize,
        param_value: *mut c_void,
        param_value_size_ret: *mut usize,
    ) -> cl_int;
    fn create_context = clCreateContext(
        properties: *const cl_context_properties,
        num_devices: cl_uint,
        devices: *const cl_device_id,
        pfn_notify: *const c_void,
        user_data: *mut c_void,
        errcode_ret: *mut cl_int,
    ) -> cl_context;
    fn release_context = clReleaseContext(context: cl_context) -> cl_int;
    fn get_supported_image_formats = clGetSupportedImageFormats(
        context: cl_context,
        flags: cl_mem_flags,
        image_type: cl_mem_object_type,
        num_entries: cl_uint,
        image_formats: *mut cl_image_format,
        num_image_formats: *mut cl_uint,
    ) -> cl_int;
    fn create_command_queue = clCreateCommandQueue(
        context: cl_context,
        device: cl_device_id,
        properties: cl_command_queue_properties,
        errcode_ret: *mut cl_int,
    ) -> cl_command_queue;
    fn release_command_queue = clReleaseCommandQueue(queue: cl_command_queue) -> cl_int;
    fn create_buffer = clCreateBuffer(
        context: cl_context,
        flags: cl_mem_flags,
        size: usize,
        host_ptr: *mut c_void,
        errcode_ret: *mut cl_int,
    ) -> cl_mem;
    fn create_image = clCreateImage(
        context: cl_context,
        flags: cl_mem_flags,
        image_format: *const cl_image_format,
        image_desc: *const cl_image_desc,
        host_ptr: *mut c_void,
        errcode_ret: *mut cl_int,
    ) -> cl_mem;
    fn release_mem_object = clReleaseMemObject(memobj: cl_mem) -> cl_int;
    fn create_program_with_source = clCreateProgramWithSource(
        context: cl_context,
        count: cl_uint,
        strings: *const *const c_char,
        lengths: *const usize,
        errcode_ret: *mut cl_int,
    ) -> cl_program;
    fn build_program = clBuildProgram(
        program: cl_program,
        num_devices: cl_uint,
        device_list: *const cl_device_id,
        options: *const c_char,
        pfn_notify: *const c_void,
        user_data: *mut c_void,
    ) -> cl_int;
    fn get_program_build_info = clGetProgramBuildInfo(
        program: cl_program,
        device: cl_device_id,
        param_name: cl_program_build_info,
        param_value_size: usize,
        param_value: *mut c_void,
        param_value_size_ret: *mut usize,
    ) -> cl_int;
    fn release_program = clReleaseProgram(program: cl_program) -> cl_int;
    fn create_kernel = clCreateKernel(
        program: cl_program,
        kernel_name: *const c_char,
        errcode_ret: *mut cl_int,
    ) -> cl_kernel;
    fn release_kernel = clReleaseKernel(kernel: cl_kernel) -> cl_int;
    fn set_kernel_arg = clSetKernelArg(
        kernel: cl_kernel,
        arg_index: cl_uint,
        arg_size: usize,
        arg_value: *const c_void,
    ) -> cl_int;
    fn get_kernel_info = clGetKernelInfo(
        kernel: cl_kernel,
        param_name: cl_kernel_info,
        param_value_size: usize,
        param_value: *mut c_void,
        param_value_size_ret: *mut usize,
    ) -> cl_int;
    fn get_kernel_work_group_info = clGetKernelWorkGroupInfo(
        kernel: cl_kernel,
        device: cl_device_id,
        param_name: cl_kernel_work_group_info,
        param_value_size: usize,
        param_value: *mut c_void,
        param_value_size_ret: *mut usize,
    ) -> cl_int;
    fn flush = clFlush(queue: cl_command_queue) -> cl_int;
    fn finish = clFinish(queue: cl_command_queue) -> cl_int;
    fn enqueue_read_buffer = clEnqueueReadBuffer(
        queue: cl_command_queue,
        buffer: cl_mem,
        blocking_read: cl_bool,
        offset: usize,
        size: usize,
        ptr: *mut c_void,
        num_events_in_wait_list: cl_uint,
        event_wait_list: *const cl_event,
        event: *mut cl_event,
    ) -> cl_int;
    fn enqueue_write_buffer = clEnqueueWriteBuffer(
        queue: cl_command_queue,
        buffer: cl_mem,
        blocking_write: cl_bool,
        offset: usize,
        size: usize,
        ptr: *const c_void,
        num_events_in_wait_list: cl_uint,
        event_wait_list: *const cl_event,
        event: *mut cl_event,
    ) -> cl_int;
    fn enqueue_copy_buffer = clEnqueueCopyBuffer(
        queue: cl_command_queue,
        src_buffer: cl_mem,
        dst_buffer: cl_mem,
        src_offset: usize,
        dst_offset: usize,
        size: usize,
        num_events_in_wait_list: cl_uint,
        event_wait_list: *const cl_event,
        event: *mut cl_event,
    ) -> cl_int;
    fn enqueue_fill_buffer = clEnqueueFillBuffer(
        queue: cl_command_queue,
        buffer: cl_mem,
        pattern: *const c_void,
        pattern_size: usize,
        offset: usize,
        size: usize,
        num_events_in_wait_list: cl_uint,
        event_wait_list: *const cl_event,
        event: *mut cl_event,
    ) -> cl_int;
    fn enqueue_read_image = clEnqueueReadImage(
        queue: cl_command_queue,
        image: cl_mem,
        blocking_read: cl_bool,
        origin: *const usize,
        region: *const usize,
        row_pitch: usize,
        slice_pitch: usize,
        ptr: *mut c_void,
        num_events_in_wait_list: cl_uint,
        event_wait_list: *const cl_event,
        event: *mut cl_event,
    ) -> cl_int;
    fn enqueue_write_image = clEnqueueWriteImage(
        queue: cl_command_queue,
        image: cl_mem,
        blocking_write: cl_bool,
        origin: *const usize,
        region: *const usize,
        input_row_pitch: usize,
        input_slice_pitch: usize,
        ptr: *const c_void,
        num_events_in_wait_list: cl_uint,
        event_wait_list: *const cl_event,
        event: *mut cl_event,
    ) -> cl_int;
    fn enqueue_nd_range_kernel = clEnqueueNDRangeKernel(
        queue: cl_command_queue,
        kernel: cl_kernel,
        work_dim: cl_uint,
        global_work_offset: *const usize,
        global_work_size: *const usize,
        local_work_size: *const usize,
        num_events_in_wait_list: cl_uint,
        event_wait_list: *const cl_event,
        event: *mut cl_event,
    ) -> cl_int;
    fn enqueue_barrier_with_wait_list = clEnqueueBarrierWithWaitList(
        queue: cl_command_queue,
        num_events_in_wait_list: cl_uint,
        event_wait_list: *const cl_event,
        event: *mut cl_event,
    ) -> cl_int;
    fn enqueue_marker_with_wait_list = clEnqueueMarkerWithWaitList(
        queue: cl_command_queue,
        num_events_in_wait_list: cl_uint,
        event_wait_list: *const cl_event,
        event: *mut cl_event,
    ) -> cl_int;
    fn create_user_event = clCreateUserEvent(
        context: cl_context,
        errcode_ret: *mut cl_int,
    ) -> cl_event;
    fn set_user_event_status = clSetUserEventStatus(
        event: cl_event,
        execution_status: cl_int,
    ) -> cl_int;
    fn wait_for_events = clWaitForEvents(
        num_events: cl_uint,
        event_list: *const cl_event,
    ) -> cl_int;
    fn get_event_info = clGetEventInfo(
        event: cl_event,
        param_name: cl_event_info,
        param_value_size: usize,
        param_value: *mut c_void,
        param_value_size_ret: *mut usize,
    ) -> cl_int;
    fn get_event_profiling_info = clGetEventProfilingInfo(
        event: cl_event,
        param_name: cl_profiling_info,
        param_value_size: usize,
        param_value: *mut c_void,
        param_value_size_ret: *mut usize,
    ) -> cl_int;
    fn release_event = clReleaseEvent(event: cl_event) -> cl_int;
}

/// The system OpenCL library, opened with `libloading`.
pub struct Library {
    symbols: Symbols,
    path: PathBuf,
    _library: libloading::Library,
}

impl Library {
    /// Opens one specific library file and resolves every entry point.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let map_err = |error: libloading::Error| {
            ClError::LibraryNotFound(format!("{}: {}", path.display(), error))
        };

        let library = unsafe { libloading::Library::new(path) }.map_err(map_err)?;
        let symbols = unsafe { Symbols::resolve(&library) }.map_err(map_err)?;

        Ok(Library {
            symbols,
            path: path.to_path_buf(),
            _library: library,
        })
    }

    /// Tries every candidate of `config` in order; the first that opens wins.
    pub fn load(config: &LoaderConfig) -> Result<Self> {
        let mut failures = Vec::new();

        for candidate in config.candidates() {
            debug!("Trying OpenCL library {}", candidate.display());
            match Library::open(&candidate) {
                Ok(library) => {
                    debug!("Loaded OpenCL library {}", candidate.display());
                    return Ok(library);
                }
                Err(ClError::LibraryNotFound(reason)) => failures.push(reason),
                Err(error) => return Err(error),
            }
        }

        if failures.is_empty() {
            return Err(ClError::LibraryNotFound(
                "no candidate libraries configured".to_string(),
            ));
        }
        Err(ClError::LibraryNotFound(failures.join("; ")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Debug for Library {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Library").field("path", &self.path).finish()
    }
}
