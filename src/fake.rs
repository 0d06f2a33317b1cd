//! An in-memory OpenCL runtime for unit tests.
//!
//! Handles are plain integers, buffers live in host vectors and the only
//! kernel that does anything is `square`. Every entry point counts its
//! calls and can be told to fail or to hand back a null handle.

use crate::context::Context;
use crate::device::Device;
use crate::driver::Driver;
use crate::memory::ImageFormat;
use crate::runtime::Runtime;
use crate::sys::*;
use std::collections::{HashMap, HashSet};
use std::ffi::CStr;
use std::mem;
use std::os::raw::{c_char, c_void};
use std::ptr;
use std::slice;
use std::sync::{Arc, Mutex, MutexGuard};

pub(crate) const SQUARE_SOURCE: &str = r#"
__kernel void square(
   __global float* input,
   __global float* output,
   const unsigned int count)
{
   int i = get_global_id(0);
   if(i < count)
       output[i] = input[i] * input[i];
}
"#;

const PLATFORM_NOT_FOUND_KHR: cl_int = -1001;

const PLATFORM_BASE: usize = 0x1000;
const DEVICE_BASE: usize = 0x10_0000;
const DEVICE_STRIDE: usize = 0x1000;
const OBJECT_BASE: usize = 0x1000_0000;

const MAX_WORK_GROUP_SIZE: usize = 256;
const PREFERRED_MULTIPLE: usize = 32;
const SUPPORTED_IMAGE_FORMATS: usize = 300;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Param {
    Global,
    Local,
    Scalar(usize),
}

#[derive(Clone)]
struct Signature {
    name: String,
    params: Vec<Param>,
}

struct ImageShape {
    width: usize,
    height: usize,
    pixel: usize,
}

struct Mem {
    data: Vec<u8>,
    image: Option<ImageShape>,
}

struct Program {
    source: String,
    status: cl_build_status,
    log: String,
    kernels: Vec<Signature>,
}

struct Kernel {
    signature: Signature,
    args: Vec<Option<Vec<u8>>>,
}

struct Event {
    status: cl_int,
    user: bool,
    deps: Vec<usize>,
    profile: Option<[u64; 4]>,
}

enum Object {
    Context(Vec<usize>),
    Queue(cl_command_queue_properties),
    Mem(Mem),
    Program(Program),
    Kernel(Kernel),
    Event(Event),
}

#[derive(Default)]
struct State {
    platforms: usize,
    devices_per_platform: usize,
    next_object: usize,
    objects: HashMap<usize, Object>,
    calls: HashMap<&'static str, usize>,
    failures: HashMap<&'static str, cl_int>,
    nulls: HashSet<&'static str>,
    last_wait_list: Vec<usize>,
    last_build_devices: Option<cl_uint>,
    clock: u64,
}

macro_rules! lookup {
    ($($get:ident, $get_mut:ident => $variant:ident($ty:ty), $error:ident;)*) => {
        impl State {
            $(
                #[allow(dead_code)]
                fn $get(&self, raw: *mut c_void) -> Result<&$ty, cl_int> {
                    match self.objects.get(&(raw as usize)) {
                        Some(Object::$variant(object)) => Ok(object),
                        _ => Err($error),
                    }
                }

                #[allow(dead_code)]
                fn $get_mut(&mut self, raw: *mut c_void) -> Result<&mut $ty, cl_int> {
                    match self.objects.get_mut(&(raw as usize)) {
                        Some(Object::$variant(object)) => Ok(object),
                        _ => Err($error),
                    }
                }
            )*
        }
    };
}

lookup! {
    context, context_mut => Context(Vec<usize>), CL_INVALID_CONTEXT;
    queue, queue_mut => Queue(cl_command_queue_properties), CL_INVALID_COMMAND_QUEUE;
    mem, mem_mut => Mem(Mem), CL_INVALID_MEM_OBJECT;
    program, program_mut => Program(Program), CL_INVALID_PROGRAM;
    kernel, kernel_mut => Kernel(Kernel), CL_INVALID_KERNEL;
    event, event_mut => Event(Event), CL_INVALID_EVENT;
}

impl State {
    fn insert(&mut self, object: Object) -> *mut c_void {
        self.next_object += 1;
        let id = OBJECT_BASE + self.next_object * 16;
        self.objects.insert(id, object);
        id as *mut c_void
    }

    fn remove(&mut self, raw: *mut c_void, is_kind: fn(&Object) -> bool, error: cl_int) -> Result<(), cl_int> {
        match self.objects.get(&(raw as usize)) {
            Some(object) if is_kind(object) => {
                self.objects.remove(&(raw as usize));
                Ok(())
            }
            _ => Err(error),
        }
    }

    fn platform_index(&self, platform: cl_platform_id) -> Result<usize, cl_int> {
        if platform.is_null() {
            return if self.platforms > 0 {
                Ok(0)
            } else {
                Err(CL_INVALID_PLATFORM)
            };
        }
        let index = (platform as usize).wrapping_sub(PLATFORM_BASE);
        if index < self.platforms {
            Ok(index)
        } else {
            Err(CL_INVALID_PLATFORM)
        }
    }

    /// (platform, index within platform)
    fn device_index(&self, device: cl_device_id) -> Result<(usize, usize), cl_int> {
        let offset = (device as usize).wrapping_sub(DEVICE_BASE);
        let (platform, index) = (offset / DEVICE_STRIDE, offset % DEVICE_STRIDE);
        if platform < self.platforms && index < self.devices_per_platform {
            Ok((platform, index))
        } else {
            Err(CL_INVALID_DEVICE)
        }
    }

    fn device_info(&self, device: cl_device_id, param: cl_device_info) -> Result<Vec<u8>, cl_int> {
        let (platform, index) = self.device_index(device)?;
        let answer = match param {
            CL_DEVICE_NAME => text(&format!("Fake Device {index}")),
            CL_DEVICE_VENDOR => text("Fake Vendor"),
            CL_DEVICE_VERSION => text("OpenCL 1.2 Fake"),
            CL_DRIVER_VERSION => text("1.0"),
            CL_DEVICE_PROFILE => text("FULL_PROFILE"),
            CL_DEVICE_EXTENSIONS => text("cl_khr_fp64 cl_khr_byte_addressable_store"),
            CL_DEVICE_OPENCL_C_VERSION => text("OpenCL C 1.2"),
            CL_DEVICE_BUILT_IN_KERNELS => text(""),
            CL_DEVICE_TYPE => u64s(CL_DEVICE_TYPE_GPU),
            CL_DEVICE_PLATFORM => usizes(&[PLATFORM_BASE + platform]),
            CL_DEVICE_VENDOR_ID => u32s(0x1234),
            CL_DEVICE_MAX_COMPUTE_UNITS => u32s(8),
            CL_DEVICE_MAX_WORK_ITEM_DIMENSIONS => u32s(3),
            CL_DEVICE_MAX_CLOCK_FREQUENCY => u32s(1000),
            CL_DEVICE_ADDRESS_BITS => u32s(64),
            CL_DEVICE_MAX_READ_IMAGE_ARGS => u32s(128),
            CL_DEVICE_MAX_WRITE_IMAGE_ARGS => u32s(8),
            CL_DEVICE_MAX_SAMPLERS => u32s(16),
            CL_DEVICE_MEM_BASE_ADDR_ALIGN => u32s(1024),
            CL_DEVICE_GLOBAL_MEM_CACHELINE_SIZE => u32s(64),
            CL_DEVICE_MAX_CONSTANT_ARGS => u32s(8),
            CL_DEVICE_LOCAL_MEM_TYPE => u32s(CL_LOCAL),
            CL_DEVICE_GLOBAL_MEM_CACHE_TYPE => u32s(CL_READ_WRITE_CACHE),
            CL_DEVICE_IMAGE_SUPPORT
            | CL_DEVICE_ENDIAN_LITTLE
            | CL_DEVICE_AVAILABLE
            | CL_DEVICE_COMPILER_AVAILABLE => u32s(CL_TRUE),
            CL_DEVICE_ERROR_CORRECTION_SUPPORT | CL_DEVICE_HOST_UNIFIED_MEMORY => {
                u32s(CL_FALSE)
            }
            CL_DEVICE_MAX_WORK_GROUP_SIZE => usizes(&[MAX_WORK_GROUP_SIZE]),
            CL_DEVICE_MAX_WORK_ITEM_SIZES => usizes(&[256, 256, 64]),
            CL_DEVICE_IMAGE2D_MAX_WIDTH | CL_DEVICE_IMAGE2D_MAX_HEIGHT => usizes(&[16384]),
            CL_DEVICE_IMAGE3D_MAX_WIDTH
            | CL_DEVICE_IMAGE3D_MAX_HEIGHT
            | CL_DEVICE_IMAGE3D_MAX_DEPTH => usizes(&[2048]),
            CL_DEVICE_MAX_PARAMETER_SIZE => usizes(&[1024]),
            CL_DEVICE_GLOBAL_MEM_SIZE => u64s(1 << 30),
            CL_DEVICE_LOCAL_MEM_SIZE => u64s(64 << 10),
            CL_DEVICE_MAX_MEM_ALLOC_SIZE => u64s(1 << 28),
            CL_DEVICE_GLOBAL_MEM_CACHE_SIZE => u64s(1 << 20),
            CL_DEVICE_MAX_CONSTANT_BUFFER_SIZE => u64s(64 << 10),
            CL_DEVICE_SINGLE_FP_CONFIG | CL_DEVICE_DOUBLE_FP_CONFIG => {
                u64s(CL_FP_DENORM | CL_FP_INF_NAN | CL_FP_ROUND_TO_NEAREST | CL_FP_FMA)
            }
            CL_DEVICE_EXECUTION_CAPABILITIES => u64s(CL_EXEC_KERNEL),
            CL_DEVICE_QUEUE_PROPERTIES => u64s(
                CL_QUEUE_OUT_OF_ORDER_EXEC_MODE_ENABLE | CL_QUEUE_PROFILING_ENABLE,
            ),
            // no half precision on this device
            _ => return Err(CL_INVALID_VALUE),
        };
        Ok(answer)
    }

    /// Status of an event, following its dependencies.
    fn resolve(&self, id: usize) -> cl_int {
        let Some(Object::Event(event)) = self.objects.get(&id) else {
            return CL_COMPLETE;
        };
        if event.user {
            return event.status;
        }
        for &dep in &event.deps {
            match self.resolve(dep) {
                CL_COMPLETE => {}
                status if status < 0 => return CL_EXEC_STATUS_ERROR_FOR_EVENTS_IN_WAIT_LIST,
                _ => return CL_SUBMITTED,
            }
        }
        event.status
    }

    fn check_buffer_range(&self, raw: cl_mem, offset: usize, size: usize) -> Result<(), cl_int> {
        let mem = self.mem(raw)?;
        if mem.image.is_some() {
            return Err(CL_INVALID_MEM_OBJECT);
        }
        if offset.checked_add(size).is_none_or(|end| end > mem.data.len()) {
            return Err(CL_INVALID_VALUE);
        }
        Ok(())
    }

    fn run_square(&mut self, kernel: &Kernel, global: &[usize]) -> Result<(), cl_int> {
        let arg = |i: usize| kernel.args[i].clone().unwrap_or_default();
        let input = usize::from_ne_bytes(arg(0).try_into().map_err(|_| CL_INVALID_KERNEL_ARGS)?);
        let output = usize::from_ne_bytes(arg(1).try_into().map_err(|_| CL_INVALID_KERNEL_ARGS)?);
        let count = u32::from_ne_bytes(arg(2).try_into().map_err(|_| CL_INVALID_KERNEL_ARGS)?);
        let n = global[0].min(count as usize);

        let squares: Vec<u8> = self
            .mem(input as *mut c_void)?
            .data
            .get(..n * 4)
            .ok_or(CL_OUT_OF_RESOURCES)?
            .chunks_exact(4)
            .flat_map(|b| {
                let x = f32::from_ne_bytes([b[0], b[1], b[2], b[3]]);
                (x * x).to_ne_bytes()
            })
            .collect();
        let output = self.mem_mut(output as *mut c_void)?;
        if output.data.len() < squares.len() {
            return Err(CL_OUT_OF_RESOURCES);
        }
        output.data[..squares.len()].copy_from_slice(&squares);
        Ok(())
    }
}

fn text(s: &str) -> Vec<u8> {
    let mut bytes = s.as_bytes().to_vec();
    bytes.push(0);
    bytes
}

fn u32s(v: u32) -> Vec<u8> {
    v.to_ne_bytes().to_vec()
}

fn u64s(v: u64) -> Vec<u8> {
    v.to_ne_bytes().to_vec()
}

fn usizes(values: &[usize]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_ne_bytes()).collect()
}

/// Writes an info answer the way the runtime does.
fn answer(bytes: &[u8], size: usize, value: *mut c_void, size_ret: *mut usize) -> Result<(), cl_int> {
    if !value.is_null() {
        if size < bytes.len() {
            return Err(CL_INVALID_VALUE);
        }
        unsafe { ptr::copy_nonoverlapping(bytes.as_ptr(), value.cast::<u8>(), bytes.len()) };
    }
    if !size_ret.is_null() {
        unsafe { *size_ret = bytes.len() };
    }
    Ok(())
}

fn unbalanced(source: &str, open: char, close: char) -> bool {
    let mut depth = 0i64;
    for c in source.chars() {
        if c == open {
            depth += 1;
        } else if c == close {
            depth -= 1;
            if depth < 0 {
                return true;
            }
        }
    }
    depth != 0
}

fn param_kind(param: &str) -> Param {
    if param.contains("__local") || param.starts_with("local ") {
        Param::Local
    } else if param.contains('*') {
        Param::Global
    } else if ["double", "long", "size_t"].iter().any(|t| param.contains(t)) {
        Param::Scalar(8)
    } else if param.contains("short") || param.contains("half") {
        Param::Scalar(2)
    } else if param.contains("char") {
        Param::Scalar(1)
    } else {
        Param::Scalar(4)
    }
}

fn parse_kernels(source: &str) -> Vec<Signature> {
    let mut kernels = Vec::new();
    let mut rest = source;
    while let Some(at) = rest.find("__kernel") {
        rest = &rest[at + "__kernel".len()..];
        let Some(open) = rest.find('(') else { break };
        let Some(len) = rest[open..].find(')') else { break };
        let name = rest[..open].split_whitespace().last().unwrap_or_default();
        let params = rest[open + 1..open + len]
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty() && *p != "void")
            .map(param_kind)
            .collect();
        kernels.push(Signature {
            name: name.to_string(),
            params,
        });
        rest = &rest[open + len..];
    }
    kernels
}

pub(crate) struct FakeDriver {
    state: Mutex<State>,
}

impl FakeDriver {
    /// One platform with one GPU.
    pub(crate) fn new() -> Arc<Self> {
        Self::with_topology(1, 1)
    }

    pub(crate) fn with_topology(platforms: usize, devices_per_platform: usize) -> Arc<Self> {
        Arc::new(FakeDriver {
            state: Mutex::new(State {
                platforms,
                devices_per_platform,
                ..State::default()
            }),
        })
    }

    pub(crate) fn runtime(self: &Arc<Self>) -> Runtime {
        Runtime::with_driver(self.clone())
    }

    /// The first device of the first platform.
    pub(crate) fn device(self: &Arc<Self>) -> Device {
        let driver: Arc<dyn Driver> = self.clone();
        Device {
            id: DEVICE_BASE as cl_device_id,
            driver,
        }
    }

    pub(crate) fn context(self: &Arc<Self>) -> Context {
        Context::create(&[self.device()]).unwrap()
    }

    /// A context handle created behind the wrappers' back.
    pub(crate) fn alloc_context(&self) -> *mut c_void {
        self.lock().insert(Object::Context(vec![DEVICE_BASE]))
    }

    pub(crate) fn calls(&self, name: &str) -> usize {
        self.lock().calls.get(name).copied().unwrap_or(0)
    }

    pub(crate) fn live_objects(&self) -> usize {
        self.lock().objects.len()
    }

    /// Makes every later call to `name` return `status`.
    pub(crate) fn fail(&self, name: &'static str, status: cl_int) {
        self.lock().failures.insert(name, status);
    }

    /// Makes `name` report success with a null handle.
    pub(crate) fn return_null(&self, name: &'static str) {
        self.lock().nulls.insert(name);
    }

    pub(crate) fn buffer_contents(&self, raw: cl_mem) -> Vec<u8> {
        self.lock().mem(raw).map(|m| m.data.clone()).unwrap_or_default()
    }

    pub(crate) fn build_log(&self, raw: cl_program) -> String {
        self.lock().program(raw).map(|p| p.log.clone()).unwrap_or_default()
    }

    pub(crate) fn kernel_arg(&self, raw: cl_kernel, index: usize) -> Option<Vec<u8>> {
        self.lock().kernel(raw).ok()?.args.get(index)?.clone()
    }

    pub(crate) fn last_build_device_count(&self) -> Option<cl_uint> {
        self.lock().last_build_devices
    }

    pub(crate) fn last_wait_list(&self) -> Vec<cl_event> {
        self.lock()
            .last_wait_list
            .iter()
            .map(|&id| id as cl_event)
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    fn enter(&self, name: &'static str) -> (MutexGuard<'_, State>, Option<cl_int>) {
        let mut state = self.lock();
        *state.calls.entry(name).or_default() += 1;
        let failure = state.failures.get(name).copied();
        (state, failure)
    }

    fn status(&self, name: &'static str, f: impl FnOnce(&mut State) -> Result<(), cl_int>) -> cl_int {
        let (mut state, failure) = self.enter(name);
        if let Some(status) = failure {
            return status;
        }
        match f(&mut *state) {
            Ok(()) => CL_SUCCESS,
            Err(status) => status,
        }
    }

    fn create(
        &self,
        name: &'static str,
        errcode_ret: *mut cl_int,
        f: impl FnOnce(&mut State) -> Result<Object, cl_int>,
    ) -> *mut c_void {
        let (mut state, failure) = self.enter(name);
        let result = match failure {
            Some(status) => Err(status),
            None => f(&mut *state),
        };
        let (handle, status) = match result {
            Ok(_) if state.nulls.contains(name) => (ptr::null_mut(), CL_SUCCESS),
            Ok(object) => (state.insert(object), CL_SUCCESS),
            Err(status) => (ptr::null_mut(), status),
        };
        if !errcode_ret.is_null() {
            unsafe { *errcode_ret = status };
        }
        handle
    }

    /// Common part of every enqueue: queue and wait-list checks, then the
    /// command itself, then the event.
    fn enqueue(
        &self,
        name: &'static str,
        queue: cl_command_queue,
        num_events: cl_uint,
        wait_list: *const cl_event,
        event: *mut cl_event,
        command: impl FnOnce(&mut State) -> Result<(), cl_int>,
    ) -> cl_int {
        self.status(name, |s| {
            let properties = *s.queue(queue)?;
            if (num_events > 0) == wait_list.is_null() {
                return Err(CL_INVALID_EVENT_WAIT_LIST);
            }
            let deps: Vec<usize> = if num_events == 0 {
                Vec::new()
            } else {
                unsafe { slice::from_raw_parts(wait_list, num_events as usize) }
                    .iter()
                    .map(|&e| e as usize)
                    .collect()
            };
            for &dep in &deps {
                s.event(dep as cl_event).map_err(|_| CL_INVALID_EVENT_WAIT_LIST)?;
            }
            s.last_wait_list = deps.clone();

            command(s)?;

            let profile = (properties & CL_QUEUE_PROFILING_ENABLE != 0).then(|| {
                let t = s.clock;
                s.clock += 4;
                [t, t + 1, t + 2, t + 3]
            });
            let raw = s.insert(Object::Event(Event {
                status: CL_COMPLETE,
                user: false,
                deps,
                profile,
            }));
            if !event.is_null() {
                unsafe { *event = raw };
            }
            Ok(())
        })
    }
}

impl Driver for FakeDriver {
    unsafe fn get_platform_ids(
        &self,
        num_entries: cl_uint,
        platforms: *mut cl_platform_id,
        num_platforms: *mut cl_uint,
    ) -> cl_int {
        self.status("get_platform_ids", |s| {
            if (num_entries == 0 && !platforms.is_null())
                || (platforms.is_null() && num_platforms.is_null())
            {
                return Err(CL_INVALID_VALUE);
            }
            if s.platforms == 0 {
                return Err(PLATFORM_NOT_FOUND_KHR);
            }
            if !platforms.is_null() {
                for i in 0..s.platforms.min(num_entries as usize) {
                    unsafe { *platforms.add(i) = (PLATFORM_BASE + i) as cl_platform_id };
                }
            }
            if !num_platforms.is_null() {
                unsafe { *num_platforms = s.platforms as cl_uint };
            }
            Ok(())
        })
    }

    unsafe fn get_platform_info(
        &self,
        platform: cl_platform_id,
        param_name: cl_platform_info,
        param_value_size: usize,
        param_value: *mut c_void,
        param_value_size_ret: *mut usize,
    ) -> cl_int {
        self.status("get_platform_info", |s| {
            let index = s.platform_index(platform)?;
            let bytes = match param_name {
                CL_PLATFORM_NAME => text(&format!("Fake Platform {index}")),
                CL_PLATFORM_VENDOR => text("Fake Vendor"),
                CL_PLATFORM_PROFILE => text("FULL_PROFILE"),
                CL_PLATFORM_VERSION => text("OpenCL 1.2 Fake"),
                CL_PLATFORM_EXTENSIONS => text("cl_khr_icd"),
                _ => return Err(CL_INVALID_VALUE),
            };
            answer(&bytes, param_value_size, param_value, param_value_size_ret)
        })
    }

    unsafe fn get_device_ids(
        &self,
        platform: cl_platform_id,
        device_type: cl_device_type,
        num_entries: cl_uint,
        devices: *mut cl_device_id,
        num_devices: *mut cl_uint,
    ) -> cl_int {
        self.status("get_device_ids", |s| {
            let platform = s.platform_index(platform)?;
            if (num_entries == 0 && !devices.is_null())
                || (devices.is_null() && num_devices.is_null())
            {
                return Err(CL_INVALID_VALUE);
            }
            let matches = device_type & (CL_DEVICE_TYPE_GPU | CL_DEVICE_TYPE_DEFAULT) != 0;
            if !matches || s.devices_per_platform == 0 {
                return Err(CL_DEVICE_NOT_FOUND);
            }
            if !devices.is_null() {
                for i in 0..s.devices_per_platform.min(num_entries as usize) {
                    let id = DEVICE_BASE + platform * DEVICE_STRIDE + i;
                    unsafe { *devices.add(i) = id as cl_device_id };
                }
            }
            if !num_devices.is_null() {
                unsafe { *num_devices = s.devices_per_platform as cl_uint };
            }
            Ok(())
        })
    }

    unsafe fn get_device_info(
        &self,
        device: cl_device_id,
        param_name: cl_device_info,
        param_value_size: usize,
        param_value: *mut c_void,
        param_value_size_ret: *mut usize,
    ) -> cl_int {
        self.status("get_device_info", |s| {
            let bytes = s.device_info(device, param_name)?;
            answer(&bytes, param_value_size, param_value, param_value_size_ret)
        })
    }

    unsafe fn create_context(
        &self,
        _properties: *const cl_context_properties,
        num_devices: cl_uint,
        devices: *const cl_device_id,
        _pfn_notify: *const c_void,
        _user_data: *mut c_void,
        errcode_ret: *mut cl_int,
    ) -> cl_context {
        self.create("create_context", errcode_ret, |s| {
            if num_devices == 0 || devices.is_null() {
                return Err(CL_INVALID_VALUE);
            }
            let devices = unsafe { slice::from_raw_parts(devices, num_devices as usize) };
            for &device in devices {
                s.device_index(device)?;
            }
            Ok(Object::Context(devices.iter().map(|&d| d as usize).collect()))
        })
    }

    unsafe fn release_context(&self, context: cl_context) -> cl_int {
        self.status("release_context", |s| {
            s.remove(context, |o| matches!(o, Object::Context(_)), CL_INVALID_CONTEXT)
        })
    }

    unsafe fn get_supported_image_formats(
        &self,
        context: cl_context,
        _flags: cl_mem_flags,
        _image_type: cl_mem_object_type,
        num_entries: cl_uint,
        image_formats: *mut cl_image_format,
        num_image_formats: *mut cl_uint,
    ) -> cl_int {
        self.status("get_supported_image_formats", |s| {
            s.context(context)?;
            if num_entries == 0 && !image_formats.is_null() {
                return Err(CL_INVALID_VALUE);
            }
            if !image_formats.is_null() {
                for i in 0..SUPPORTED_IMAGE_FORMATS.min(num_entries as usize) {
                    let format = cl_image_format {
                        image_channel_order: CL_R + (i % 15) as cl_uint,
                        image_channel_data_type: CL_SNORM_INT8 + (i / 15 % 16) as cl_uint,
                    };
                    unsafe { *image_formats.add(i) = format };
                }
            }
            if !num_image_formats.is_null() {
                unsafe { *num_image_formats = SUPPORTED_IMAGE_FORMATS as cl_uint };
            }
            Ok(())
        })
    }

    unsafe fn create_command_queue(
        &self,
        context: cl_context,
        device: cl_device_id,
        properties: cl_command_queue_properties,
        errcode_ret: *mut cl_int,
    ) -> cl_command_queue {
        self.create("create_command_queue", errcode_ret, |s| {
            if !s.context(context)?.contains(&(device as usize)) {
                return Err(CL_INVALID_DEVICE);
            }
            let known = CL_QUEUE_OUT_OF_ORDER_EXEC_MODE_ENABLE | CL_QUEUE_PROFILING_ENABLE;
            if properties & !known != 0 {
                return Err(CL_INVALID_VALUE);
            }
            Ok(Object::Queue(properties))
        })
    }

    unsafe fn release_command_queue(&self, queue: cl_command_queue) -> cl_int {
        self.status("release_command_queue", |s| {
            s.remove(queue, |o| matches!(o, Object::Queue(_)), CL_INVALID_COMMAND_QUEUE)
        })
    }

    unsafe fn create_buffer(
        &self,
        context: cl_context,
        flags: cl_mem_flags,
        size: usize,
        host_ptr: *mut c_void,
        errcode_ret: *mut cl_int,
    ) -> cl_mem {
        self.create("create_buffer", errcode_ret, |s| {
            s.context(context)?;
            check_mem_flags(flags, host_ptr)?;
            if size == 0 {
                return Err(CL_INVALID_BUFFER_SIZE);
            }
            let data = if host_ptr.is_null() {
                vec![0; size]
            } else {
                unsafe { slice::from_raw_parts(host_ptr.cast::<u8>(), size) }.to_vec()
            };
            Ok(Object::Mem(Mem { data, image: None }))
        })
    }

    unsafe fn create_image(
        &self,
        context: cl_context,
        flags: cl_mem_flags,
        image_format: *const cl_image_format,
        image_desc: *const cl_image_desc,
        host_ptr: *mut c_void,
        errcode_ret: *mut cl_int,
    ) -> cl_mem {
        self.create("create_image", errcode_ret, |s| {
            s.context(context)?;
            check_mem_flags(flags, host_ptr)?;
            if image_format.is_null() {
                return Err(CL_INVALID_IMAGE_FORMAT_DESCRIPTOR);
            }
            if image_desc.is_null() {
                return Err(CL_INVALID_IMAGE_DESCRIPTOR);
            }
            let (format, desc) = unsafe { (*image_format, *image_desc) };
            let pixel = ImageFormat::from_raw(format)
                .pixel_size()
                .ok_or(CL_IMAGE_FORMAT_NOT_SUPPORTED)?;
            if desc.image_type != CL_MEM_OBJECT_IMAGE2D {
                return Err(CL_INVALID_IMAGE_DESCRIPTOR);
            }
            if desc.image_width == 0 || desc.image_height == 0 {
                return Err(CL_INVALID_IMAGE_SIZE);
            }

            let tight = desc.image_width * pixel;
            let pitch = match desc.image_row_pitch {
                0 => tight,
                p if host_ptr.is_null() || p < tight => return Err(CL_INVALID_IMAGE_DESCRIPTOR),
                p => p,
            };
            let mut data = vec![0u8; tight * desc.image_height];
            if !host_ptr.is_null() {
                let host = unsafe {
                    slice::from_raw_parts(host_ptr.cast::<u8>(), pitch * desc.image_height)
                };
                for (row, dst) in data.chunks_exact_mut(tight).enumerate() {
                    dst.copy_from_slice(&host[row * pitch..row * pitch + tight]);
                }
            }
            Ok(Object::Mem(Mem {
                data,
                image: Some(ImageShape {
                    width: desc.image_width,
                    height: desc.image_height,
                    pixel,
                }),
            }))
        })
    }

    unsafe fn release_mem_object(&self, memobj: cl_mem) -> cl_int {
        self.status("release_mem_object", |s| {
            s.remove(memobj, |o| matches!(o, Object::Mem(_)), CL_INVALID_MEM_OBJECT)
        })
    }

    unsafe fn create_program_with_source(
        &self,
        context: cl_context,
        count: cl_uint,
        strings: *const *const c_char,
        lengths: *const usize,
        errcode_ret: *mut cl_int,
    ) -> cl_program {
        self.create("create_program_with_source", errcode_ret, |s| {
            s.context(context)?;
            if count == 0 || strings.is_null() || !lengths.is_null() {
                return Err(CL_INVALID_VALUE);
            }
            let mut source = String::new();
            for &string in unsafe { slice::from_raw_parts(strings, count as usize) } {
                if string.is_null() {
                    return Err(CL_INVALID_VALUE);
                }
                source.push_str(&unsafe { CStr::from_ptr(string) }.to_string_lossy());
            }
            Ok(Object::Program(Program {
                source,
                status: CL_BUILD_NONE,
                log: String::new(),
                kernels: Vec::new(),
            }))
        })
    }

    unsafe fn build_program(
        &self,
        program: cl_program,
        num_devices: cl_uint,
        device_list: *const cl_device_id,
        _options: *const c_char,
        _pfn_notify: *const c_void,
        _user_data: *mut c_void,
    ) -> cl_int {
        self.status("build_program", |s| {
            s.program(program)?;
            if (num_devices > 0) == device_list.is_null() {
                return Err(CL_INVALID_VALUE);
            }
            s.last_build_devices = Some(num_devices);

            let program = s.program_mut(program)?;
            if unbalanced(&program.source, '{', '}') || unbalanced(&program.source, '(', ')') {
                let lines = program.source.lines().count().max(1);
                program.status = CL_BUILD_ERROR;
                program.log = format!(
                    "<source>:{lines}:1: error: expected '}}' at end of input\n1 error generated.\n"
                );
                return Err(CL_BUILD_PROGRAM_FAILURE);
            }
            program.status = CL_BUILD_SUCCESS;
            program.log.clear();
            program.kernels = parse_kernels(&program.source);
            Ok(())
        })
    }

    unsafe fn get_program_build_info(
        &self,
        program: cl_program,
        device: cl_device_id,
        param_name: cl_program_build_info,
        param_value_size: usize,
        param_value: *mut c_void,
        param_value_size_ret: *mut usize,
    ) -> cl_int {
        self.status("get_program_build_info", |s| {
            s.device_index(device)?;
            let program = s.program(program)?;
            let bytes = match param_name {
                CL_PROGRAM_BUILD_STATUS => program.status.to_ne_bytes().to_vec(),
                CL_PROGRAM_BUILD_LOG => text(&program.log),
                CL_PROGRAM_BUILD_OPTIONS => text(""),
                _ => return Err(CL_INVALID_VALUE),
            };
            answer(&bytes, param_value_size, param_value, param_value_size_ret)
        })
    }

    unsafe fn release_program(&self, program: cl_program) -> cl_int {
        self.status("release_program", |s| {
            s.remove(program, |o| matches!(o, Object::Program(_)), CL_INVALID_PROGRAM)
        })
    }

    unsafe fn create_kernel(
        &self,
        program: cl_program,
        kernel_name: *const c_char,
        errcode_ret: *mut cl_int,
    ) -> cl_kernel {
        self.create("create_kernel", errcode_ret, |s| {
            let program = s.program(program)?;
            if program.status != CL_BUILD_SUCCESS {
                return Err(CL_INVALID_PROGRAM_EXECUTABLE);
            }
            if kernel_name.is_null() {
                return Err(CL_INVALID_VALUE);
            }
            let name = unsafe { CStr::from_ptr(kernel_name) }.to_string_lossy();
            let signature = program
                .kernels
                .iter()
                .find(|k| k.name == name)
                .cloned()
                .ok_or(CL_INVALID_KERNEL_NAME)?;
            Ok(Object::Kernel(Kernel {
                args: vec![None; signature.params.len()],
                signature,
            }))
        })
    }

    unsafe fn release_kernel(&self, kernel: cl_kernel) -> cl_int {
        self.status("release_kernel", |s| {
            s.remove(kernel, |o| matches!(o, Object::Kernel(_)), CL_INVALID_KERNEL)
        })
    }

    unsafe fn set_kernel_arg(
        &self,
        kernel: cl_kernel,
        arg_index: cl_uint,
        arg_size: usize,
        arg_value: *const c_void,
    ) -> cl_int {
        self.status("set_kernel_arg", |s| {
            let index = arg_index as usize;
            let param = *s
                .kernel(kernel)?
                .signature
                .params
                .get(index)
                .ok_or(CL_INVALID_ARG_INDEX)?;
            let bytes = match param {
                Param::Local => {
                    if !arg_value.is_null() {
                        return Err(CL_INVALID_ARG_VALUE);
                    }
                    if arg_size == 0 {
                        return Err(CL_INVALID_ARG_SIZE);
                    }
                    Vec::new()
                }
                Param::Global | Param::Scalar(_) if arg_value.is_null() => {
                    return Err(CL_INVALID_ARG_VALUE);
                }
                Param::Global => {
                    if arg_size != mem::size_of::<cl_mem>() {
                        return Err(CL_INVALID_ARG_SIZE);
                    }
                    let buffer = unsafe { *arg_value.cast::<cl_mem>() };
                    s.mem(buffer).map_err(|_| CL_INVALID_MEM_OBJECT)?;
                    (buffer as usize).to_ne_bytes().to_vec()
                }
                Param::Scalar(size) => {
                    if arg_size != size {
                        return Err(CL_INVALID_ARG_SIZE);
                    }
                    unsafe { slice::from_raw_parts(arg_value.cast::<u8>(), size) }.to_vec()
                }
            };
            s.kernel_mut(kernel)?.args[index] = Some(bytes);
            Ok(())
        })
    }

    unsafe fn get_kernel_info(
        &self,
        kernel: cl_kernel,
        param_name: cl_kernel_info,
        param_value_size: usize,
        param_value: *mut c_void,
        param_value_size_ret: *mut usize,
    ) -> cl_int {
        self.status("get_kernel_info", |s| {
            let signature = &s.kernel(kernel)?.signature;
            let bytes = match param_name {
                CL_KERNEL_FUNCTION_NAME => text(&signature.name),
                CL_KERNEL_NUM_ARGS => u32s(signature.params.len() as cl_uint),
                _ => return Err(CL_INVALID_VALUE),
            };
            answer(&bytes, param_value_size, param_value, param_value_size_ret)
        })
    }

    unsafe fn get_kernel_work_group_info(
        &self,
        kernel: cl_kernel,
        device: cl_device_id,
        param_name: cl_kernel_work_group_info,
        param_value_size: usize,
        param_value: *mut c_void,
        param_value_size_ret: *mut usize,
    ) -> cl_int {
        self.status("get_kernel_work_group_info", |s| {
            s.kernel(kernel)?;
            if !device.is_null() {
                s.device_index(device)?;
            }
            let bytes = match param_name {
                CL_KERNEL_WORK_GROUP_SIZE => usizes(&[MAX_WORK_GROUP_SIZE]),
                CL_KERNEL_PREFERRED_WORK_GROUP_SIZE_MULTIPLE => usizes(&[PREFERRED_MULTIPLE]),
                _ => return Err(CL_INVALID_VALUE),
            };
            answer(&bytes, param_value_size, param_value, param_value_size_ret)
        })
    }

    unsafe fn flush(&self, queue: cl_command_queue) -> cl_int {
        self.status("flush", |s| s.queue(queue).map(|_| ()))
    }

    unsafe fn finish(&self, queue: cl_command_queue) -> cl_int {
        self.status("finish", |s| s.queue(queue).map(|_| ()))
    }

    unsafe fn enqueue_read_buffer(
        &self,
        queue: cl_command_queue,
        buffer: cl_mem,
        _blocking_read: cl_bool,
        offset: usize,
        size: usize,
        ptr: *mut c_void,
        num_events_in_wait_list: cl_uint,
        event_wait_list: *const cl_event,
        event: *mut cl_event,
    ) -> cl_int {
        self.enqueue(
            "enqueue_read_buffer",
            queue,
            num_events_in_wait_list,
            event_wait_list,
            event,
            |s| {
                s.check_buffer_range(buffer, offset, size)?;
                if ptr.is_null() {
                    return Err(CL_INVALID_VALUE);
                }
                let data = &s.mem(buffer)?.data[offset..offset + size];
                unsafe { ptr::copy_nonoverlapping(data.as_ptr(), ptr.cast::<u8>(), size) };
                Ok(())
            },
        )
    }

    unsafe fn enqueue_write_buffer(
        &self,
        queue: cl_command_queue,
        buffer: cl_mem,
        _blocking_write: cl_bool,
        offset: usize,
        size: usize,
        ptr: *const c_void,
        num_events_in_wait_list: cl_uint,
        event_wait_list: *const cl_event,
        event: *mut cl_event,
    ) -> cl_int {
        self.enqueue(
            "enqueue_write_buffer",
            queue,
            num_events_in_wait_list,
            event_wait_list,
            event,
            |s| {
                s.check_buffer_range(buffer, offset, size)?;
                if ptr.is_null() {
                    return Err(CL_INVALID_VALUE);
                }
                let src = unsafe { slice::from_raw_parts(ptr.cast::<u8>(), size) };
                s.mem_mut(buffer)?.data[offset..offset + size].copy_from_slice(src);
                Ok(())
            },
        )
    }

    unsafe fn enqueue_copy_buffer(
        &self,
        queue: cl_command_queue,
        src_buffer: cl_mem,
        dst_buffer: cl_mem,
        src_offset: usize,
        dst_offset: usize,
        size: usize,
        num_events_in_wait_list: cl_uint,
        event_wait_list: *const cl_event,
        event: *mut cl_event,
    ) -> cl_int {
        self.enqueue(
            "enqueue_copy_buffer",
            queue,
            num_events_in_wait_list,
            event_wait_list,
            event,
            |s| {
                s.check_buffer_range(src_buffer, src_offset, size)?;
                s.check_buffer_range(dst_buffer, dst_offset, size)?;
                if src_buffer == dst_buffer
                    && src_offset < dst_offset + size
                    && dst_offset < src_offset + size
                {
                    return Err(CL_MEM_COPY_OVERLAP);
                }
                let bytes = s.mem(src_buffer)?.data[src_offset..src_offset + size].to_vec();
                s.mem_mut(dst_buffer)?.data[dst_offset..dst_offset + size]
                    .copy_from_slice(&bytes);
                Ok(())
            },
        )
    }

    unsafe fn enqueue_fill_buffer(
        &self,
        queue: cl_command_queue,
        buffer: cl_mem,
        pattern: *const c_void,
        pattern_size: usize,
        offset: usize,
        size: usize,
        num_events_in_wait_list: cl_uint,
        event_wait_list: *const cl_event,
        event: *mut cl_event,
    ) -> cl_int {
        self.enqueue(
            "enqueue_fill_buffer",
            queue,
            num_events_in_wait_list,
            event_wait_list,
            event,
            |s| {
                s.check_buffer_range(buffer, offset, size)?;
                if pattern.is_null()
                    || !pattern_size.is_power_of_two()
                    || pattern_size > 128
                    || offset % pattern_size != 0
                    || size % pattern_size != 0
                {
                    return Err(CL_INVALID_VALUE);
                }
                let pattern = unsafe { slice::from_raw_parts(pattern.cast::<u8>(), pattern_size) };
                for chunk in s.mem_mut(buffer)?.data[offset..offset + size].chunks_exact_mut(pattern_size) {
                    chunk.copy_from_slice(pattern);
                }
                Ok(())
            },
        )
    }

    unsafe fn enqueue_read_image(
        &self,
        queue: cl_command_queue,
        image: cl_mem,
        _blocking_read: cl_bool,
        origin: *const usize,
        region: *const usize,
        row_pitch: usize,
        _slice_pitch: usize,
        ptr: *mut c_void,
        num_events_in_wait_list: cl_uint,
        event_wait_list: *const cl_event,
        event: *mut cl_event,
    ) -> cl_int {
        self.enqueue(
            "enqueue_read_image",
            queue,
            num_events_in_wait_list,
            event_wait_list,
            event,
            |s| {
                let (origin, region) = image_window(origin, region)?;
                let mem = s.mem(image)?;
                let (tight, host_pitch, src_pitch) = image_rows(mem, origin, region, row_pitch)?;
                if ptr.is_null() {
                    return Err(CL_INVALID_VALUE);
                }
                let pixel = mem.image.as_ref().map_or(0, |i| i.pixel);
                for row in 0..region[1] {
                    let src = (origin[1] + row) * src_pitch + origin[0] * pixel;
                    unsafe {
                        ptr::copy_nonoverlapping(
                            mem.data[src..src + tight].as_ptr(),
                            ptr.cast::<u8>().add(row * host_pitch),
                            tight,
                        )
                    };
                }
                Ok(())
            },
        )
    }

    unsafe fn enqueue_write_image(
        &self,
        queue: cl_command_queue,
        image: cl_mem,
        _blocking_write: cl_bool,
        origin: *const usize,
        region: *const usize,
        input_row_pitch: usize,
        _input_slice_pitch: usize,
        ptr: *const c_void,
        num_events_in_wait_list: cl_uint,
        event_wait_list: *const cl_event,
        event: *mut cl_event,
    ) -> cl_int {
        self.enqueue(
            "enqueue_write_image",
            queue,
            num_events_in_wait_list,
            event_wait_list,
            event,
            |s| {
                let (origin, region) = image_window(origin, region)?;
                let mem = s.mem_mut(image)?;
                let (tight, host_pitch, dst_pitch) =
                    image_rows(mem, origin, region, input_row_pitch)?;
                if ptr.is_null() {
                    return Err(CL_INVALID_VALUE);
                }
                let pixel = mem.image.as_ref().map_or(0, |i| i.pixel);
                for row in 0..region[1] {
                    let dst = (origin[1] + row) * dst_pitch + origin[0] * pixel;
                    let src = unsafe {
                        slice::from_raw_parts(ptr.cast::<u8>().add(row * host_pitch), tight)
                    };
                    mem.data[dst..dst + tight].copy_from_slice(src);
                }
                Ok(())
            },
        )
    }

    unsafe fn enqueue_nd_range_kernel(
        &self,
        queue: cl_command_queue,
        kernel: cl_kernel,
        work_dim: cl_uint,
        _global_work_offset: *const usize,
        global_work_size: *const usize,
        local_work_size: *const usize,
        num_events_in_wait_list: cl_uint,
        event_wait_list: *const cl_event,
        event: *mut cl_event,
    ) -> cl_int {
        self.enqueue(
            "enqueue_nd_range_kernel",
            queue,
            num_events_in_wait_list,
            event_wait_list,
            event,
            |s| {
                let kernel = s.kernel(kernel)?;
                if !(1..=3).contains(&work_dim) {
                    return Err(CL_INVALID_WORK_DIMENSION);
                }
                if global_work_size.is_null() {
                    return Err(CL_INVALID_GLOBAL_WORK_SIZE);
                }
                let dims = work_dim as usize;
                let global = unsafe { slice::from_raw_parts(global_work_size, dims) }.to_vec();
                if global.contains(&0) {
                    return Err(CL_INVALID_GLOBAL_WORK_SIZE);
                }
                if !local_work_size.is_null() {
                    let local = unsafe { slice::from_raw_parts(local_work_size, dims) };
                    if local.contains(&0)
                        || local.iter().product::<usize>() > MAX_WORK_GROUP_SIZE
                        || global.iter().zip(local).any(|(g, l)| g % l != 0)
                    {
                        return Err(CL_INVALID_WORK_GROUP_SIZE);
                    }
                }
                if kernel.args.iter().any(Option::is_none) {
                    return Err(CL_INVALID_KERNEL_ARGS);
                }
                if kernel.signature.name == "square" {
                    let snapshot = Kernel {
                        signature: kernel.signature.clone(),
                        args: kernel.args.clone(),
                    };
                    s.run_square(&snapshot, &global)?;
                }
                Ok(())
            },
        )
    }

    unsafe fn enqueue_barrier_with_wait_list(
        &self,
        queue: cl_command_queue,
        num_events_in_wait_list: cl_uint,
        event_wait_list: *const cl_event,
        event: *mut cl_event,
    ) -> cl_int {
        self.enqueue(
            "enqueue_barrier_with_wait_list",
            queue,
            num_events_in_wait_list,
            event_wait_list,
            event,
            |_| Ok(()),
        )
    }

    unsafe fn enqueue_marker_with_wait_list(
        &self,
        queue: cl_command_queue,
        num_events_in_wait_list: cl_uint,
        event_wait_list: *const cl_event,
        event: *mut cl_event,
    ) -> cl_int {
        self.enqueue(
            "enqueue_marker_with_wait_list",
            queue,
            num_events_in_wait_list,
            event_wait_list,
            event,
            |_| Ok(()),
        )
    }

    unsafe fn create_user_event(&self, context: cl_context, errcode_ret: *mut cl_int) -> cl_event {
        self.create("create_user_event", errcode_ret, |s| {
            s.context(context)?;
            Ok(Object::Event(Event {
                status: CL_SUBMITTED,
                user: true,
                deps: Vec::new(),
                profile: None,
            }))
        })
    }

    unsafe fn set_user_event_status(&self, event: cl_event, execution_status: cl_int) -> cl_int {
        self.status("set_user_event_status", |s| {
            let event = s.event_mut(event)?;
            if !event.user {
                return Err(CL_INVALID_EVENT);
            }
            if execution_status != CL_COMPLETE && execution_status >= 0 {
                return Err(CL_INVALID_VALUE);
            }
            if event.status != CL_SUBMITTED {
                return Err(CL_INVALID_OPERATION);
            }
            event.status = execution_status;
            Ok(())
        })
    }

    unsafe fn wait_for_events(&self, num_events: cl_uint, event_list: *const cl_event) -> cl_int {
        self.status("wait_for_events", |s| {
            if num_events == 0 || event_list.is_null() {
                return Err(CL_INVALID_VALUE);
            }
            let events = unsafe { slice::from_raw_parts(event_list, num_events as usize) };
            for &event in events {
                s.event(event)?;
            }
            s.last_wait_list = events.iter().map(|&e| e as usize).collect();

            let statuses: Vec<cl_int> = events.iter().map(|&e| s.resolve(e as usize)).collect();
            if statuses.iter().any(|&st| st < 0) {
                return Err(CL_EXEC_STATUS_ERROR_FOR_EVENTS_IN_WAIT_LIST);
            }
            // an unfinished event would block forever here
            if statuses.iter().any(|&st| st != CL_COMPLETE) {
                return Err(CL_INVALID_OPERATION);
            }
            Ok(())
        })
    }

    unsafe fn get_event_info(
        &self,
        event: cl_event,
        param_name: cl_event_info,
        param_value_size: usize,
        param_value: *mut c_void,
        param_value_size_ret: *mut usize,
    ) -> cl_int {
        self.status("get_event_info", |s| {
            s.event(event)?;
            let bytes = match param_name {
                CL_EVENT_COMMAND_EXECUTION_STATUS => s.resolve(event as usize).to_ne_bytes().to_vec(),
                _ => return Err(CL_INVALID_VALUE),
            };
            answer(&bytes, param_value_size, param_value, param_value_size_ret)
        })
    }

    unsafe fn get_event_profiling_info(
        &self,
        event: cl_event,
        param_name: cl_profiling_info,
        param_value_size: usize,
        param_value: *mut c_void,
        param_value_size_ret: *mut usize,
    ) -> cl_int {
        self.status("get_event_profiling_info", |s| {
            let profile = s.event(event)?.profile.ok_or(CL_PROFILING_INFO_NOT_AVAILABLE)?;
            let stamp = match param_name {
                CL_PROFILING_COMMAND_QUEUED => profile[0],
                CL_PROFILING_COMMAND_SUBMIT => profile[1],
                CL_PROFILING_COMMAND_START => profile[2],
                CL_PROFILING_COMMAND_END => profile[3],
                _ => return Err(CL_INVALID_VALUE),
            };
            answer(&u64s(stamp), param_value_size, param_value, param_value_size_ret)
        })
    }

    unsafe fn release_event(&self, event: cl_event) -> cl_int {
        self.status("release_event", |s| {
            s.remove(event, |o| matches!(o, Object::Event(_)), CL_INVALID_EVENT)
        })
    }
}

fn check_mem_flags(flags: cl_mem_flags, host_ptr: *mut c_void) -> Result<(), cl_int> {
    let access = [CL_MEM_READ_WRITE, CL_MEM_WRITE_ONLY, CL_MEM_READ_ONLY]
        .iter()
        .filter(|&&f| flags & f != 0)
        .count();
    let host = [CL_MEM_HOST_WRITE_ONLY, CL_MEM_HOST_READ_ONLY, CL_MEM_HOST_NO_ACCESS]
        .iter()
        .filter(|&&f| flags & f != 0)
        .count();
    let use_or_copy = flags & (CL_MEM_USE_HOST_PTR | CL_MEM_COPY_HOST_PTR);
    if access > 1 || host > 1 || use_or_copy == CL_MEM_USE_HOST_PTR | CL_MEM_COPY_HOST_PTR {
        return Err(CL_INVALID_VALUE);
    }
    if (use_or_copy != 0) == host_ptr.is_null() {
        return Err(CL_INVALID_HOST_PTR);
    }
    Ok(())
}

fn image_window(
    origin: *const usize,
    region: *const usize,
) -> Result<([usize; 3], [usize; 3]), cl_int> {
    if origin.is_null() || region.is_null() {
        return Err(CL_INVALID_VALUE);
    }
    let (origin, region) = unsafe { (*origin.cast::<[usize; 3]>(), *region.cast::<[usize; 3]>()) };
    if origin[2] != 0 || region[2] != 1 {
        return Err(CL_INVALID_VALUE);
    }
    Ok((origin, region))
}

/// (bytes per transferred row, host row pitch, image row pitch)
fn image_rows(
    mem: &Mem,
    origin: [usize; 3],
    region: [usize; 3],
    row_pitch: usize,
) -> Result<(usize, usize, usize), cl_int> {
    let shape = mem.image.as_ref().ok_or(CL_INVALID_MEM_OBJECT)?;
    if origin[0] + region[0] > shape.width || origin[1] + region[1] > shape.height {
        return Err(CL_INVALID_VALUE);
    }
    let tight = region[0] * shape.pixel;
    let host_pitch = match row_pitch {
        0 => tight,
        p if p < tight => return Err(CL_INVALID_VALUE),
        p => p,
    };
    Ok((tight, host_pitch, shape.width * shape.pixel))
}
