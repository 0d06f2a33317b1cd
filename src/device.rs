use crate::driver::Driver;
use crate::error::{Result, check};
use crate::info::{self, STRING_SIZE};
use crate::platform::Platform;
use crate::queue::CommandQueueProperties;
use crate::sys::{self, cl_bool, cl_device_id, cl_device_info, cl_uint, cl_ulong};
use bitflags::bitflags;
use log::warn;
use std::fmt;
use std::ptr;
use std::sync::Arc;

/// Enumeration never reports more devices than this.
pub const MAX_DEVICES: usize = 64;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DeviceType: sys::cl_device_type {
        const DEFAULT = sys::CL_DEVICE_TYPE_DEFAULT;
        const CPU = sys::CL_DEVICE_TYPE_CPU;
        const GPU = sys::CL_DEVICE_TYPE_GPU;
        const ACCELERATOR = sys::CL_DEVICE_TYPE_ACCELERATOR;
        const CUSTOM = sys::CL_DEVICE_TYPE_CUSTOM;
        const ALL = sys::CL_DEVICE_TYPE_ALL;
    }
}

flags_display!(DeviceType, "None", [
    DEFAULT => "Default",
    CPU => "CPU",
    GPU => "GPU",
    ACCELERATOR => "Accelerator",
    CUSTOM => "Custom",
]);

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FpConfig: sys::cl_device_fp_config {
        const DENORM = sys::CL_FP_DENORM;
        const INF_NAN = sys::CL_FP_INF_NAN;
        const ROUND_TO_NEAREST = sys::CL_FP_ROUND_TO_NEAREST;
        const ROUND_TO_ZERO = sys::CL_FP_ROUND_TO_ZERO;
        const ROUND_TO_INF = sys::CL_FP_ROUND_TO_INF;
        const FMA = sys::CL_FP_FMA;
        const SOFT_FLOAT = sys::CL_FP_SOFT_FLOAT;
        const CORRECTLY_ROUNDED_DIVIDE_SQRT = sys::CL_FP_CORRECTLY_ROUNDED_DIVIDE_SQRT;
    }
}

flags_display!(FpConfig, "", [
    DENORM => "Denorm",
    INF_NAN => "InfNaN",
    ROUND_TO_NEAREST => "RoundToNearest",
    ROUND_TO_ZERO => "RoundToZero",
    ROUND_TO_INF => "RoundToInf",
    FMA => "FMA",
    SOFT_FLOAT => "SoftFloat",
    CORRECTLY_ROUNDED_DIVIDE_SQRT => "CorrectlyRoundedDivideSqrt",
]);

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ExecCapabilities: sys::cl_device_exec_capabilities {
        const KERNEL = sys::CL_EXEC_KERNEL;
        const NATIVE_KERNEL = sys::CL_EXEC_NATIVE_KERNEL;
    }
}

flags_display!(ExecCapabilities, "", [
    KERNEL => "Kernel",
    NATIVE_KERNEL => "NativeKernel",
]);

native_enum! {
    pub enum LocalMemType: sys::cl_device_local_mem_type {
        None = sys::CL_NONE => "None",
        Local = sys::CL_LOCAL => "Local",
        Global = sys::CL_GLOBAL => "Global",
    }
}

native_enum! {
    pub enum MemCacheType: sys::cl_device_mem_cache_type {
        None = sys::CL_NONE => "None",
        ReadOnlyCache = sys::CL_READ_ONLY_CACHE => "ReadOnlyCache",
        ReadWriteCache = sys::CL_READ_WRITE_CACHE => "ReadWriteCache",
    }
}

/// An OpenCL device. Devices belong to the runtime and are never released.
#[derive(Clone)]
pub struct Device {
    pub(crate) id: cl_device_id,
    pub(crate) driver: Arc<dyn Driver>,
}

macro_rules! device_values {
    ($($(#[$meta:meta])* $name:ident: $ty:ty = $param:ident;)*) => {
        $(
            $(#[$meta])*
            pub fn $name(&self) -> Result<$ty> {
                self.value(sys::$param)
            }
        )*
    };
}

macro_rules! device_bools {
    ($($name:ident = $param:ident;)*) => {
        $(
            pub fn $name(&self) -> Result<bool> {
                self.value::<cl_bool>(sys::$param).map(|v| v != sys::CL_FALSE)
            }
        )*
    };
}

macro_rules! device_strings {
    ($($name:ident = $param:ident;)*) => {
        $(
            pub fn $name(&self) -> Result<String> {
                self.string(sys::$param)
            }
        )*
    };
}

impl Device {
    /// Lists devices of `device_type`, truncated to [`MAX_DEVICES`].
    /// Without a platform the runtime's default platform is queried.
    pub(crate) fn enumerate(
        driver: &Arc<dyn Driver>,
        platform: Option<&Platform>,
        device_type: DeviceType,
    ) -> Result<Vec<Device>> {
        let platform_id = platform.map_or(ptr::null_mut(), |p| p.id);
        let mut ids = [ptr::null_mut(); MAX_DEVICES];
        let mut count: cl_uint = 0;
        check(unsafe {
            driver.get_device_ids(
                platform_id,
                device_type.bits(),
                MAX_DEVICES as cl_uint,
                ids.as_mut_ptr(),
                &mut count,
            )
        })?;

        let count = count as usize;
        if count > MAX_DEVICES {
            warn!(
                "Runtime reports {} devices; only the first {} are visible",
                count, MAX_DEVICES
            );
        }

        Ok(ids[..count.min(MAX_DEVICES)]
            .iter()
            .map(|&id| Device {
                id,
                driver: driver.clone(),
            })
            .collect())
    }

    pub fn id(&self) -> cl_device_id {
        self.id
    }

    pub fn platform(&self) -> Result<Platform> {
        let id = self.value::<usize>(sys::CL_DEVICE_PLATFORM)?;
        Ok(Platform {
            id: id as sys::cl_platform_id,
            driver: self.driver.clone(),
        })
    }

    pub fn device_type(&self) -> Result<DeviceType> {
        self.value(sys::CL_DEVICE_TYPE)
            .map(DeviceType::from_bits_retain)
    }

    device_strings! {
        name = CL_DEVICE_NAME;
        vendor = CL_DEVICE_VENDOR;
        built_in_kernels = CL_DEVICE_BUILT_IN_KERNELS;
        extensions = CL_DEVICE_EXTENSIONS;
        opencl_c_version = CL_DEVICE_OPENCL_C_VERSION;
        profile = CL_DEVICE_PROFILE;
        version = CL_DEVICE_VERSION;
        driver_version = CL_DRIVER_VERSION;
    }

    device_values! {
        address_bits: u32 = CL_DEVICE_ADDRESS_BITS;
        global_mem_cacheline_size: u32 = CL_DEVICE_GLOBAL_MEM_CACHELINE_SIZE;
        /// In MHz.
        max_clock_frequency: u32 = CL_DEVICE_MAX_CLOCK_FREQUENCY;
        max_compute_units: u32 = CL_DEVICE_MAX_COMPUTE_UNITS;
        max_constant_args: u32 = CL_DEVICE_MAX_CONSTANT_ARGS;
        max_read_image_args: u32 = CL_DEVICE_MAX_READ_IMAGE_ARGS;
        max_samplers: u32 = CL_DEVICE_MAX_SAMPLERS;
        max_work_item_dimensions: u32 = CL_DEVICE_MAX_WORK_ITEM_DIMENSIONS;
        max_write_image_args: u32 = CL_DEVICE_MAX_WRITE_IMAGE_ARGS;
        /// In bits.
        mem_base_addr_align: u32 = CL_DEVICE_MEM_BASE_ADDR_ALIGN;
        vendor_id: u32 = CL_DEVICE_VENDOR_ID;

        image2d_max_width: usize = CL_DEVICE_IMAGE2D_MAX_WIDTH;
        image2d_max_height: usize = CL_DEVICE_IMAGE2D_MAX_HEIGHT;
        image3d_max_width: usize = CL_DEVICE_IMAGE3D_MAX_WIDTH;
        image3d_max_height: usize = CL_DEVICE_IMAGE3D_MAX_HEIGHT;
        image3d_max_depth: usize = CL_DEVICE_IMAGE3D_MAX_DEPTH;
        max_parameter_size: usize = CL_DEVICE_MAX_PARAMETER_SIZE;
        max_work_group_size: usize = CL_DEVICE_MAX_WORK_GROUP_SIZE;

        global_mem_size: cl_ulong = CL_DEVICE_GLOBAL_MEM_SIZE;
        local_mem_size: cl_ulong = CL_DEVICE_LOCAL_MEM_SIZE;
        max_mem_alloc_size: cl_ulong = CL_DEVICE_MAX_MEM_ALLOC_SIZE;
        global_mem_cache_size: cl_ulong = CL_DEVICE_GLOBAL_MEM_CACHE_SIZE;
        max_constant_buffer_size: cl_ulong = CL_DEVICE_MAX_CONSTANT_BUFFER_SIZE;
    }

    device_bools! {
        available = CL_DEVICE_AVAILABLE;
        compiler_available = CL_DEVICE_COMPILER_AVAILABLE;
        endian_little = CL_DEVICE_ENDIAN_LITTLE;
        error_correction_support = CL_DEVICE_ERROR_CORRECTION_SUPPORT;
        host_unified_memory = CL_DEVICE_HOST_UNIFIED_MEMORY;
        image_support = CL_DEVICE_IMAGE_SUPPORT;
    }

    /// Per-dimension work-item limits, one entry per
    /// [`max_work_item_dimensions`](Self::max_work_item_dimensions).
    pub fn max_work_item_sizes(&self) -> Result<Vec<usize>> {
        let dims = self.max_work_item_dimensions()? as usize;
        info::array(dims, |size, value, size_ret| unsafe {
            self.driver.get_device_info(
                self.id,
                sys::CL_DEVICE_MAX_WORK_ITEM_SIZES,
                size,
                value,
                size_ret,
            )
        })
    }

    pub fn single_fp_config(&self) -> Result<FpConfig> {
        self.value(sys::CL_DEVICE_SINGLE_FP_CONFIG)
            .map(FpConfig::from_bits_retain)
    }

    pub fn double_fp_config(&self) -> Result<FpConfig> {
        self.value(sys::CL_DEVICE_DOUBLE_FP_CONFIG)
            .map(FpConfig::from_bits_retain)
    }

    /// Half precision is optional; devices without it report an empty set.
    pub fn half_fp_config(&self) -> FpConfig {
        self.value(sys::CL_DEVICE_HALF_FP_CONFIG)
            .map(FpConfig::from_bits_retain)
            .unwrap_or_else(|_| FpConfig::empty())
    }

    pub fn local_mem_type(&self) -> Result<LocalMemType> {
        self.value(sys::CL_DEVICE_LOCAL_MEM_TYPE)
            .map(LocalMemType::from_raw)
    }

    pub fn global_mem_cache_type(&self) -> Result<MemCacheType> {
        self.value(sys::CL_DEVICE_GLOBAL_MEM_CACHE_TYPE)
            .map(MemCacheType::from_raw)
    }

    pub fn execution_capabilities(&self) -> Result<ExecCapabilities> {
        self.value(sys::CL_DEVICE_EXECUTION_CAPABILITIES)
            .map(ExecCapabilities::from_bits_retain)
    }

    pub fn queue_properties(&self) -> Result<CommandQueueProperties> {
        self.value(sys::CL_DEVICE_QUEUE_PROPERTIES)
            .map(CommandQueueProperties::from_bits_retain)
    }

    fn value<T: Copy + Default>(&self, param: cl_device_info) -> Result<T> {
        info::value(|size, value, size_ret| unsafe {
            self.driver
                .get_device_info(self.id, param, size, value, size_ret)
        })
    }

    fn string(&self, param: cl_device_info) -> Result<String> {
        info::string::<STRING_SIZE>(|size, value, size_ret| unsafe {
            self.driver
                .get_device_info(self.id, param, size, value, size_ret)
        })
    }
}

impl PartialEq for Device {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Device {}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Device({:p})", self.id)
    }
}

unsafe impl Send for Device {}
unsafe impl Sync for Device {}
