use crate::bitmap::{self, Bitmap, PixelLayout};
use crate::device::Device;
use crate::error::{ClError, Result, check, check_handle};
use crate::event::Event;
use crate::handle::{ContextKind, Handle};
use crate::memory::{
    ChannelDataType, ChannelOrder, ImageDescriptor, ImageFormat, MemFlags, MemObject,
    MemObjectType,
};
use crate::program::Program;
use crate::queue::{CommandQueue, CommandQueueProperties};
use crate::scalar::Scalar;
use crate::sys::{self, cl_context, cl_image_format, cl_uint};
use log::debug;
use std::ffi::CString;
use std::mem;
use std::os::raw::c_void;
use std::ptr;

/// Supported image formats are reported up to this many entries.
pub const MAX_IMAGE_FORMATS: usize = 256;

/// An OpenCL context over a fixed set of devices.
///
/// Every object created from a context keeps its own reference to the
/// runtime, so dropping the context does not invalidate them.
#[derive(Debug)]
pub struct Context {
    handle: Handle<ContextKind>,
    devices: Vec<Device>,
}

impl Context {
    pub fn create(devices: &[Device]) -> Result<Self> {
        let first = devices.first().ok_or(ClError::EmptyDeviceList)?;
        let driver = first.driver.clone();
        let ids: Vec<_> = devices.iter().map(|d| d.id).collect();

        let mut status = sys::CL_SUCCESS;
        let raw = unsafe {
            driver.create_context(
                ptr::null(),
                ids.len() as cl_uint,
                ids.as_ptr(),
                ptr::null(),
                ptr::null_mut(),
                &mut status,
            )
        };
        let raw = check_handle(status, raw)?;

        Ok(Context {
            handle: Handle::new(driver, raw),
            devices: devices.to_vec(),
        })
    }

    pub fn raw(&self) -> cl_context {
        self.handle.raw()
    }

    /// The devices the context was created with.
    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn create_command_queue(
        &self,
        device: &Device,
        properties: CommandQueueProperties,
    ) -> Result<CommandQueue> {
        let mut status = sys::CL_SUCCESS;
        let raw = unsafe {
            self.handle.driver().create_command_queue(
                self.raw(),
                device.id,
                properties.bits(),
                &mut status,
            )
        };
        let raw = check_handle(status, raw)?;
        Ok(CommandQueue::new(
            self.handle.driver().clone(),
            raw,
            device.clone(),
            properties,
        ))
    }

    /// Creates a program from one or more source strings. The program
    /// targets every device of this context.
    pub fn create_program_with_source(&self, sources: &[&str]) -> Result<Program> {
        let sources = sources
            .iter()
            .map(|s| CString::new(*s).map_err(|_| ClError::InvalidString))
            .collect::<Result<Vec<_>>>()?;
        let pointers: Vec<_> = sources.iter().map(|s| s.as_ptr()).collect();

        let mut status = sys::CL_SUCCESS;
        let raw = unsafe {
            self.handle.driver().create_program_with_source(
                self.raw(),
                pointers.len() as cl_uint,
                pointers.as_ptr(),
                ptr::null(),
                &mut status,
            )
        };
        let raw = check_handle(status, raw)?;
        Ok(Program::new(
            self.handle.driver().clone(),
            raw,
            self.devices.clone(),
        ))
    }

    /// Creates a buffer with a raw host pointer, exactly as `clCreateBuffer`.
    ///
    /// # Safety
    ///
    /// `host_ptr` must be null or valid for `size` bytes. With
    /// [`MemFlags::USE_HOST_PTR`] it must stay valid for the lifetime of
    /// the buffer.
    pub unsafe fn create_buffer(
        &self,
        flags: MemFlags,
        size: usize,
        host_ptr: *mut c_void,
    ) -> Result<MemObject> {
        let mut status = sys::CL_SUCCESS;
        let raw = unsafe {
            self.handle
                .driver()
                .create_buffer(self.raw(), flags.bits(), size, host_ptr, &mut status)
        };
        let raw = check_handle(status, raw)?;
        debug!("Buffer of {} bytes with flags {:?}", size, flags);
        Ok(MemObject::buffer(self.handle.driver().clone(), raw, size))
    }

    /// Allocates an uninitialised buffer of `size` bytes.
    pub fn create_empty_buffer(&self, flags: MemFlags, size: usize) -> Result<MemObject> {
        unsafe { self.create_buffer(flags, size, ptr::null_mut()) }
    }

    /// Allocates a buffer initialised with a copy of `data`.
    ///
    /// [`MemFlags::COPY_HOST_PTR`] is always added to `flags`;
    /// [`MemFlags::USE_HOST_PTR`] is rejected with `InvalidHostPtr` since the
    /// slice is only borrowed for this call.
    pub fn create_buffer_from_slice<T: Scalar>(
        &self,
        flags: MemFlags,
        data: &[T],
    ) -> Result<MemObject> {
        if flags.contains(MemFlags::USE_HOST_PTR) {
            return Err(ClError::InvalidHostPtr);
        }
        unsafe {
            self.create_buffer(
                flags | MemFlags::COPY_HOST_PTR,
                mem::size_of_val(data),
                data.as_ptr() as *mut c_void,
            )
        }
    }

    /// Creates an image with a raw host pointer, exactly as `clCreateImage`.
    ///
    /// # Safety
    ///
    /// `host_ptr` must be null or point at data laid out as `desc`
    /// describes. With [`MemFlags::USE_HOST_PTR`] it must outlive the image.
    pub unsafe fn create_image_raw(
        &self,
        flags: MemFlags,
        format: ImageFormat,
        desc: &ImageDescriptor<'_>,
        host_ptr: *mut c_void,
    ) -> Result<MemObject> {
        let raw_format = format.to_raw();
        let raw_desc = desc.to_raw();
        let mut status = sys::CL_SUCCESS;
        let raw = unsafe {
            self.handle.driver().create_image(
                self.raw(),
                flags.bits(),
                &raw_format,
                &raw_desc,
                host_ptr,
                &mut status,
            )
        };
        let raw = check_handle(status, raw)?;
        debug!(
            "{} image {}x{}x{} ({})",
            desc.image_type, desc.width, desc.height, desc.depth, format
        );
        Ok(MemObject::image(self.handle.driver().clone(), raw, format))
    }

    /// Creates an image, optionally initialised with a copy of `data`.
    ///
    /// With `data`, [`MemFlags::COPY_HOST_PTR`] is added to `flags` and
    /// [`MemFlags::USE_HOST_PTR`] is rejected with `InvalidHostPtr`. `data`
    /// must cover the whole image or `InvalidHostPtr` is returned before any
    /// native call. Formats whose pixel size this crate cannot compute are
    /// refused with `ImageFormatNotSupported` when `data` is given; use
    /// [`create_image_raw`](Self::create_image_raw) for those.
    pub fn create_image(
        &self,
        flags: MemFlags,
        format: ImageFormat,
        desc: &ImageDescriptor<'_>,
        data: Option<&[u8]>,
    ) -> Result<MemObject> {
        let Some(data) = data else {
            return unsafe { self.create_image_raw(flags, format, desc, ptr::null_mut()) };
        };
        if flags.contains(MemFlags::USE_HOST_PTR) {
            return Err(ClError::InvalidHostPtr);
        }
        let pixel = format
            .pixel_size()
            .ok_or(ClError::ImageFormatNotSupported)?;
        if data.len() < desc.host_len(pixel) {
            return Err(ClError::InvalidHostPtr);
        }
        unsafe {
            self.create_image_raw(
                flags | MemFlags::COPY_HOST_PTR,
                format,
                desc,
                data.as_ptr() as *mut c_void,
            )
        }
    }

    /// A 2D image with runtime-chosen pitch.
    pub fn create_image_2d(
        &self,
        flags: MemFlags,
        format: ImageFormat,
        width: usize,
        height: usize,
        data: Option<&[u8]>,
    ) -> Result<MemObject> {
        self.create_image(flags, format, &ImageDescriptor::image_2d(width, height), data)
    }

    /// Uploads a host bitmap as a 2D image.
    ///
    /// Gray bitmaps become `Intensity/UNormInt8` and RGBA bitmaps
    /// `RGBA/UNormInt8`, both keeping their row stride. Anything else is
    /// converted to tightly packed 8-bit RGBA first.
    pub fn create_image_from_bitmap(
        &self,
        flags: MemFlags,
        bitmap: &(impl Bitmap + ?Sized),
    ) -> Result<MemObject> {
        let (width, height) = (bitmap.width(), bitmap.height());
        let (order, pixels, stride) = match bitmap.layout() {
            PixelLayout::Gray8 { pixels, stride } => (ChannelOrder::Intensity, pixels, stride),
            PixelLayout::Rgba8 { pixels, stride } => (ChannelOrder::RGBA, pixels, stride),
            PixelLayout::Other => {
                let data = bitmap::to_rgba8(bitmap);
                let format = ImageFormat::new(ChannelOrder::RGBA, ChannelDataType::UNormInt8);
                return self.create_image_2d(flags, format, width, height, Some(&data));
            }
        };

        let desc = ImageDescriptor {
            row_pitch: stride,
            ..ImageDescriptor::image_2d(width, height)
        };
        let format = ImageFormat::new(order, ChannelDataType::UNormInt8);
        self.create_image(flags, format, &desc, Some(pixels))
    }

    /// Image formats usable with `flags` for `image_type`, at most
    /// [`MAX_IMAGE_FORMATS`].
    pub fn supported_image_formats(
        &self,
        flags: MemFlags,
        image_type: MemObjectType,
    ) -> Result<Vec<ImageFormat>> {
        let mut formats = [cl_image_format::default(); MAX_IMAGE_FORMATS];
        let mut count: cl_uint = 0;
        check(unsafe {
            self.handle.driver().get_supported_image_formats(
                self.raw(),
                flags.bits(),
                image_type.raw(),
                MAX_IMAGE_FORMATS as cl_uint,
                formats.as_mut_ptr(),
                &mut count,
            )
        })?;

        let count = (count as usize).min(MAX_IMAGE_FORMATS);
        Ok(formats[..count]
            .iter()
            .map(|&f| ImageFormat::from_raw(f))
            .collect())
    }

    pub fn create_user_event(&self) -> Result<Event> {
        let mut status = sys::CL_SUCCESS;
        let raw = unsafe {
            self.handle
                .driver()
                .create_user_event(self.raw(), &mut status)
        };
        let raw = check_handle(status, raw)?;
        Ok(Event::new(self.handle.driver().clone(), raw))
    }

    /// Releases the context now instead of on drop. Consuming the
    /// wrapper guarantees no other borrow can still be using the handle.
    pub fn release(self) -> Result<()> {
        self.handle.release()
    }
}

unsafe impl Send for Context {}
unsafe impl Sync for Context {}
