use crate::device::Device;
use crate::driver::Driver;
use crate::error::{ClError, Result, check, check_handle};
use crate::event::{Event, raw_events};
use crate::handle::{Handle, QueueKind};
use crate::kernel::Kernel;
use crate::memory::MemObject;
use crate::scalar::Scalar;
use crate::sys::{self, cl_bool, cl_command_queue, cl_event, cl_int, cl_uint};
use bitflags::bitflags;
use log::debug;
use std::mem;
use std::os::raw::c_void;
use std::ptr;
use std::sync::Arc;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CommandQueueProperties: sys::cl_command_queue_properties {
        const OUT_OF_ORDER_EXEC_MODE_ENABLE = sys::CL_QUEUE_OUT_OF_ORDER_EXEC_MODE_ENABLE;
        const PROFILING_ENABLE = sys::CL_QUEUE_PROFILING_ENABLE;
    }
}

flags_display!(CommandQueueProperties, "", [
    OUT_OF_ORDER_EXEC_MODE_ENABLE => "OutOfOrderExecModeEnable",
    PROFILING_ENABLE => "ProfilingEnable",
]);

/// A command queue bound to one context and one device.
///
/// Every enqueue takes a wait-list that is forwarded to the runtime in the
/// given order and returns the event of the new command.
#[derive(Debug)]
pub struct CommandQueue {
    handle: Handle<QueueKind>,
    device: Device,
    properties: CommandQueueProperties,
}

/// Origin and region of an image transfer, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageRegion {
    pub origin: [usize; 3],
    pub region: [usize; 3],
    pub row_pitch: usize,
    pub slice_pitch: usize,
}

impl ImageRegion {
    /// The whole of a `width` x `height` 2D image, tightly packed.
    pub fn full_2d(width: usize, height: usize) -> Self {
        Self {
            origin: [0; 3],
            region: [width, height, 1],
            row_pitch: 0,
            slice_pitch: 0,
        }
    }

    fn host_len(&self, pixel_size: usize) -> usize {
        let row = if self.row_pitch != 0 {
            self.row_pitch
        } else {
            self.region[0] * pixel_size
        };
        let slice = if self.slice_pitch != 0 {
            self.slice_pitch
        } else {
            row * self.region[1]
        };
        slice * self.region[2]
    }
}

impl CommandQueue {
    pub(crate) fn new(
        driver: Arc<dyn Driver>,
        raw: cl_command_queue,
        device: Device,
        properties: CommandQueueProperties,
    ) -> Self {
        CommandQueue {
            handle: Handle::new(driver, raw),
            device,
            properties,
        }
    }

    pub fn raw(&self) -> cl_command_queue {
        self.handle.raw()
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn properties(&self) -> CommandQueueProperties {
        self.properties
    }

    /// Blocks until every command enqueued so far has completed.
    pub fn finish(&self) -> Result<()> {
        check(unsafe { self.handle.driver().finish(self.raw()) })
    }

    /// Submits every command enqueued so far without waiting for them.
    pub fn flush(&self) -> Result<()> {
        check(unsafe { self.handle.driver().flush(self.raw()) })
    }

    /// Copies `size` bytes from host memory into `buffer` at `offset`.
    ///
    /// # Safety
    ///
    /// `ptr` must be valid for `size` bytes. Without `blocking` it must
    /// stay valid and unmodified until the returned event completes.
    pub unsafe fn enqueue_write_buffer(
        &self,
        buffer: &MemObject,
        blocking: bool,
        offset: usize,
        size: usize,
        ptr: *const c_void,
        wait_list: &[&Event],
    ) -> Result<Event> {
        self.enqueue(wait_list, |queue, count, events, event| unsafe {
            self.handle.driver().enqueue_write_buffer(
                queue,
                buffer.raw(),
                cl_bool_of(blocking),
                offset,
                size,
                ptr,
                count,
                events,
                event,
            )
        })
    }

    /// Copies `size` bytes of `buffer` at `offset` into host memory.
    ///
    /// # Safety
    ///
    /// `ptr` must be valid for writes of `size` bytes. Without `blocking`
    /// it must stay valid and untouched until the returned event completes.
    pub unsafe fn enqueue_read_buffer(
        &self,
        buffer: &MemObject,
        blocking: bool,
        offset: usize,
        size: usize,
        ptr: *mut c_void,
        wait_list: &[&Event],
    ) -> Result<Event> {
        self.enqueue(wait_list, |queue, count, events, event| unsafe {
            self.handle.driver().enqueue_read_buffer(
                queue,
                buffer.raw(),
                cl_bool_of(blocking),
                offset,
                size,
                ptr,
                count,
                events,
                event,
            )
        })
    }

    /// Blocking write of `data` into `buffer` starting at byte `offset`.
    pub fn write_buffer<T: Scalar>(
        &self,
        buffer: &MemObject,
        offset: usize,
        data: &[T],
        wait_list: &[&Event],
    ) -> Result<Event> {
        unsafe {
            self.enqueue_write_buffer(
                buffer,
                true,
                offset,
                mem::size_of_val(data),
                data.as_ptr().cast(),
                wait_list,
            )
        }
    }

    /// Blocking read from `buffer` at byte `offset`, filling all of `data`.
    pub fn read_buffer<T: Scalar>(
        &self,
        buffer: &MemObject,
        offset: usize,
        data: &mut [T],
        wait_list: &[&Event],
    ) -> Result<Event> {
        unsafe {
            self.enqueue_read_buffer(
                buffer,
                true,
                offset,
                mem::size_of_val(data),
                data.as_mut_ptr().cast(),
                wait_list,
            )
        }
    }

    pub fn write_buffer_f32(
        &self,
        buffer: &MemObject,
        offset: usize,
        data: &[f32],
        wait_list: &[&Event],
    ) -> Result<Event> {
        self.write_buffer(buffer, offset, data, wait_list)
    }

    pub fn read_buffer_f32(
        &self,
        buffer: &MemObject,
        offset: usize,
        data: &mut [f32],
        wait_list: &[&Event],
    ) -> Result<Event> {
        self.read_buffer(buffer, offset, data, wait_list)
    }

    /// Device-side copy of `size` bytes between two buffers.
    pub fn enqueue_copy_buffer(
        &self,
        src: &MemObject,
        dst: &MemObject,
        src_offset: usize,
        dst_offset: usize,
        size: usize,
        wait_list: &[&Event],
    ) -> Result<Event> {
        self.enqueue(wait_list, |queue, count, events, event| unsafe {
            self.handle.driver().enqueue_copy_buffer(
                queue,
                src.raw(),
                dst.raw(),
                src_offset,
                dst_offset,
                size,
                count,
                events,
                event,
            )
        })
    }

    /// Fills `size` bytes at `offset` by repeating `pattern`. The runtime
    /// copies the pattern before this returns.
    pub fn enqueue_fill_buffer(
        &self,
        buffer: &MemObject,
        pattern: &[u8],
        offset: usize,
        size: usize,
        wait_list: &[&Event],
    ) -> Result<Event> {
        self.enqueue(wait_list, |queue, count, events, event| unsafe {
            self.handle.driver().enqueue_fill_buffer(
                queue,
                buffer.raw(),
                pattern.as_ptr().cast(),
                pattern.len(),
                offset,
                size,
                count,
                events,
                event,
            )
        })
    }

    /// # Safety
    ///
    /// `ptr` must be valid for the bytes `region` covers with the given
    /// pitches. Without `blocking` it must stay valid until the returned
    /// event completes.
    pub unsafe fn enqueue_read_image(
        &self,
        image: &MemObject,
        blocking: bool,
        region: &ImageRegion,
        ptr: *mut c_void,
        wait_list: &[&Event],
    ) -> Result<Event> {
        self.enqueue(wait_list, |queue, count, events, event| unsafe {
            self.handle.driver().enqueue_read_image(
                queue,
                image.raw(),
                cl_bool_of(blocking),
                region.origin.as_ptr(),
                region.region.as_ptr(),
                region.row_pitch,
                region.slice_pitch,
                ptr,
                count,
                events,
                event,
            )
        })
    }

    /// # Safety
    ///
    /// Same contract as [`enqueue_read_image`](Self::enqueue_read_image),
    /// for reads from `ptr`.
    pub unsafe fn enqueue_write_image(
        &self,
        image: &MemObject,
        blocking: bool,
        region: &ImageRegion,
        ptr: *const c_void,
        wait_list: &[&Event],
    ) -> Result<Event> {
        self.enqueue(wait_list, |queue, count, events, event| unsafe {
            self.handle.driver().enqueue_write_image(
                queue,
                image.raw(),
                cl_bool_of(blocking),
                region.origin.as_ptr(),
                region.region.as_ptr(),
                region.row_pitch,
                region.slice_pitch,
                ptr,
                count,
                events,
                event,
            )
        })
    }

    /// Blocking image read into `data`, which must cover `region`.
    pub fn read_image(
        &self,
        image: &MemObject,
        region: &ImageRegion,
        data: &mut [u8],
        wait_list: &[&Event],
    ) -> Result<Event> {
        check_image_data(image, region, data.len())?;
        unsafe {
            self.enqueue_read_image(image, true, region, data.as_mut_ptr().cast(), wait_list)
        }
    }

    /// Blocking image write from `data`, which must cover `region`.
    pub fn write_image(
        &self,
        image: &MemObject,
        region: &ImageRegion,
        data: &[u8],
        wait_list: &[&Event],
    ) -> Result<Event> {
        check_image_data(image, region, data.len())?;
        unsafe { self.enqueue_write_image(image, true, region, data.as_ptr().cast(), wait_list) }
    }

    /// Dispatches `kernel` over `global_size.len()` dimensions.
    ///
    /// Without `global_offset` indices start at zero; without `local_size`
    /// the runtime picks the work-group shape. Both must have as many
    /// dimensions as `global_size` when given.
    pub fn enqueue_nd_range_kernel(
        &self,
        kernel: &Kernel,
        global_offset: Option<&[usize]>,
        global_size: &[usize],
        local_size: Option<&[usize]>,
        wait_list: &[&Event],
    ) -> Result<Event> {
        let dims = global_size.len();
        if dims == 0 {
            return Err(ClError::InvalidWorkDimension);
        }
        if global_offset.is_some_and(|o| o.len() != dims) {
            return Err(ClError::InvalidGlobalOffset);
        }
        if local_size.is_some_and(|l| l.len() != dims) {
            return Err(ClError::InvalidWorkGroupSize);
        }

        debug!(
            "Dispatching {} over {:?} (local {:?})",
            kernel.name(),
            global_size,
            local_size
        );
        self.enqueue(wait_list, |queue, count, events, event| unsafe {
            self.handle.driver().enqueue_nd_range_kernel(
                queue,
                kernel.raw(),
                dims as cl_uint,
                global_offset.map_or(ptr::null(), |o| o.as_ptr()),
                global_size.as_ptr(),
                local_size.map_or(ptr::null(), |l| l.as_ptr()),
                count,
                events,
                event,
            )
        })
    }

    /// A command that completes once `wait_list` (or, if empty, every
    /// earlier command) has, and blocks later commands until then.
    pub fn enqueue_barrier_with_wait_list(&self, wait_list: &[&Event]) -> Result<Event> {
        self.enqueue(wait_list, |queue, count, events, event| unsafe {
            self.handle
                .driver()
                .enqueue_barrier_with_wait_list(queue, count, events, event)
        })
    }

    /// Like a barrier, but later commands are not held back.
    pub fn enqueue_marker_with_wait_list(&self, wait_list: &[&Event]) -> Result<Event> {
        self.enqueue(wait_list, |queue, count, events, event| unsafe {
            self.handle
                .driver()
                .enqueue_marker_with_wait_list(queue, count, events, event)
        })
    }

    /// Releases the queue now instead of on drop. Consuming the
    /// wrapper guarantees no other borrow can still be using the handle.
    pub fn release(self) -> Result<()> {
        self.handle.release()
    }

    /// Marshals the wait-list for the duration of one enqueue call and
    /// wraps the event it produces.
    fn enqueue(
        &self,
        wait_list: &[&Event],
        call: impl FnOnce(cl_command_queue, cl_uint, *const cl_event, *mut cl_event) -> cl_int,
    ) -> Result<Event> {
        let events = raw_events(wait_list);
        let events_ptr = if events.is_empty() {
            ptr::null()
        } else {
            events.as_ptr()
        };

        let mut event: cl_event = ptr::null_mut();
        let status = call(self.raw(), events.len() as cl_uint, events_ptr, &mut event);
        let event = check_handle(status, event)?;
        Ok(Event::new(self.handle.driver().clone(), event))
    }
}

unsafe impl Send for CommandQueue {}
unsafe impl Sync for CommandQueue {}

fn cl_bool_of(value: bool) -> cl_bool {
    if value { sys::CL_TRUE } else { sys::CL_FALSE }
}

fn check_image_data(image: &MemObject, region: &ImageRegion, len: usize) -> Result<()> {
    let pixel = image
        .image_format()
        .and_then(|f| f.pixel_size())
        .ok_or(ClError::InvalidMemObject)?;
    if len < region.host_len(pixel) {
        return Err(ClError::InvalidValue);
    }
    Ok(())
}
