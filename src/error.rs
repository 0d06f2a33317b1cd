use crate::sys::{self, cl_int};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClError>;

macro_rules! status_errors {
    ($($variant:ident = $code:ident => $message:tt,)*) => {
        /// Errors reported by the OpenCL runtime or by this wrapper.
        ///
        /// Every native status code with a name in `cl.h` has its own variant;
        /// anything else arrives as [`ClError::Other`] carrying the raw code.
        #[derive(Debug, Clone, PartialEq, Eq, Error)]
        pub enum ClError {
            $(
                #[error($message)]
                $variant,
            )*

            #[error("OpenCL error {0}")]
            Other(cl_int),

            /// The runtime reported success but handed back a null handle.
            #[error("Unknown OpenCL error: success status with a null handle")]
            Unknown,

            /// Program compilation failed; carries the compiler log.
            #[error("Build error: {log}")]
            Build { log: String },

            #[error("OpenCL library not found: {0}")]
            LibraryNotFound(String),

            #[error("String contains an interior NUL byte")]
            InvalidString,

            #[error("A context needs at least one device")]
            EmptyDeviceList,
        }

        impl ClError {
            /// Translates a native status. `None` means success.
            pub fn from_status(status: cl_int) -> Option<Self> {
                match status {
                    sys::CL_SUCCESS => None,
                    $(sys::$code => Some(Self::$variant),)*
                    other => Some(Self::Other(other)),
                }
            }

            /// The native status this error stands for, if it has one.
            pub fn status(&self) -> Option<cl_int> {
                match self {
                    $(Self::$variant => Some(sys::$code),)*
                    Self::Other(status) => Some(*status),
                    Self::Build { .. } => Some(sys::CL_BUILD_PROGRAM_FAILURE),
                    _ => None,
                }
            }
        }

        #[cfg(test)]
        const KNOWN_STATUSES: &[cl_int] = &[$(sys::$code,)*];
    };
}

status_errors! {
    DeviceNotFound = CL_DEVICE_NOT_FOUND => "Device not found",
    DeviceNotAvailable = CL_DEVICE_NOT_AVAILABLE => "Device not available",
    CompilerNotAvailable = CL_COMPILER_NOT_AVAILABLE => "Compiler not available",
    MemObjectAllocationFailure = CL_MEM_OBJECT_ALLOCATION_FAILURE => "Mem object allocation failure",
    OutOfResources = CL_OUT_OF_RESOURCES => "Out of resources",
    OutOfHostMemory = CL_OUT_OF_HOST_MEMORY => "Out of host memory",
    ProfilingInfoNotAvailable = CL_PROFILING_INFO_NOT_AVAILABLE => "Profiling info not available",
    MemCopyOverlap = CL_MEM_COPY_OVERLAP => "Mem copy overlap",
    ImageFormatMismatch = CL_IMAGE_FORMAT_MISMATCH => "Image format mismatch",
    ImageFormatNotSupported = CL_IMAGE_FORMAT_NOT_SUPPORTED => "Image format not supported",
    BuildProgramFailure = CL_BUILD_PROGRAM_FAILURE => "Build program failure",
    MapFailure = CL_MAP_FAILURE => "Map failure",
    MisalignedSubBufferOffset = CL_MISALIGNED_SUB_BUFFER_OFFSET => "Misaligned sub buffer offset",
    ExecStatusErrorForEventsInWaitList = CL_EXEC_STATUS_ERROR_FOR_EVENTS_IN_WAIT_LIST => "Exec status error for events in wait list",
    CompileProgramFailure = CL_COMPILE_PROGRAM_FAILURE => "Compile program failure",
    LinkerNotAvailable = CL_LINKER_NOT_AVAILABLE => "Linker not available",
    LinkProgramFailure = CL_LINK_PROGRAM_FAILURE => "Link program failure",
    DevicePartitionFailed = CL_DEVICE_PARTITION_FAILED => "Device partition failed",
    KernelArgInfoNotAvailable = CL_KERNEL_ARG_INFO_NOT_AVAILABLE => "Kernel arg info not available",
    InvalidValue = CL_INVALID_VALUE => "Invalid value",
    InvalidDeviceType = CL_INVALID_DEVICE_TYPE => "Invalid device type",
    InvalidPlatform = CL_INVALID_PLATFORM => "Invalid platform",
    InvalidDevice = CL_INVALID_DEVICE => "Invalid device",
    InvalidContext = CL_INVALID_CONTEXT => "Invalid context",
    InvalidQueueProperties = CL_INVALID_QUEUE_PROPERTIES => "Invalid queue properties",
    InvalidCommandQueue = CL_INVALID_COMMAND_QUEUE => "Invalid command queue",
    InvalidHostPtr = CL_INVALID_HOST_PTR => "Invalid host ptr",
    InvalidMemObject = CL_INVALID_MEM_OBJECT => "Invalid mem object",
    InvalidImageFormatDescriptor = CL_INVALID_IMAGE_FORMAT_DESCRIPTOR => "Invalid image format descriptor",
    InvalidImageSize = CL_INVALID_IMAGE_SIZE => "Invalid image size",
    InvalidSampler = CL_INVALID_SAMPLER => "Invalid sampler",
    InvalidBinary = CL_INVALID_BINARY => "Invalid binary",
    InvalidBuildOptions = CL_INVALID_BUILD_OPTIONS => "Invalid build options",
    InvalidProgram = CL_INVALID_PROGRAM => "Invalid program",
    InvalidProgramExecutable = CL_INVALID_PROGRAM_EXECUTABLE => "Invalid program executable",
    InvalidKernelName = CL_INVALID_KERNEL_NAME => "Invalid kernel name",
    InvalidKernelDefinition = CL_INVALID_KERNEL_DEFINITION => "Invalid kernel definition",
    InvalidKernel = CL_INVALID_KERNEL => "Invalid kernel",
    InvalidArgIndex = CL_INVALID_ARG_INDEX => "Invalid arg index",
    InvalidArgValue = CL_INVALID_ARG_VALUE => "Invalid arg value",
    InvalidArgSize = CL_INVALID_ARG_SIZE => "Invalid arg size",
    InvalidKernelArgs = CL_INVALID_KERNEL_ARGS => "Invalid kernel args",
    InvalidWorkDimension = CL_INVALID_WORK_DIMENSION => "Invalid work dimension",
    InvalidWorkGroupSize = CL_INVALID_WORK_GROUP_SIZE => "Invalid work group size",
    InvalidWorkItemSize = CL_INVALID_WORK_ITEM_SIZE => "Invalid work item size",
    InvalidGlobalOffset = CL_INVALID_GLOBAL_OFFSET => "Invalid global offset",
    InvalidEventWaitList = CL_INVALID_EVENT_WAIT_LIST => "Invalid event wait list",
    InvalidEvent = CL_INVALID_EVENT => "Invalid event",
    InvalidOperation = CL_INVALID_OPERATION => "Invalid operation",
    InvalidGlObject = CL_INVALID_GL_OBJECT => "Invalid GL object",
    InvalidBufferSize = CL_INVALID_BUFFER_SIZE => "Invalid buffer size",
    InvalidMipLevel = CL_INVALID_MIP_LEVEL => "Invalid mip level",
    InvalidGlobalWorkSize = CL_INVALID_GLOBAL_WORK_SIZE => "Invalid global work size",
    InvalidProperty = CL_INVALID_PROPERTY => "Invalid property",
    InvalidImageDescriptor = CL_INVALID_IMAGE_DESCRIPTOR => "Invalid image descriptor",
    InvalidCompilerOptions = CL_INVALID_COMPILER_OPTIONS => "Invalid compiler options",
    InvalidLinkerOptions = CL_INVALID_LINKER_OPTIONS => "Invalid linker options",
    InvalidDevicePartitionCount = CL_INVALID_DEVICE_PARTITION_COUNT => "Invalid device partition count",
}

/// Funnels a raw native status into a `Result`.
pub fn check(status: cl_int) -> Result<()> {
    match ClError::from_status(status) {
        None => Ok(()),
        Some(error) => Err(error),
    }
}

/// Checks a status returned alongside a freshly created handle.
pub(crate) fn check_handle<T>(status: cl_int, handle: *mut T) -> Result<*mut T> {
    check(status)?;
    if handle.is_null() {
        return Err(ClError::Unknown);
    }
    Ok(handle)
}
