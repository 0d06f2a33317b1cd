use crate::driver::Driver;
use crate::error::Result;
use crate::handle::{Handle, MemKind};
use crate::sys::{self, cl_image_desc, cl_image_format, cl_mem};
use bitflags::bitflags;
use std::fmt;
use std::ptr;
use std::sync::Arc;

bitflags! {
    /// Access mode and host-pointer behaviour of a memory object. Flag
    /// combinations are validated by the runtime, not here.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MemFlags: sys::cl_mem_flags {
        const READ_WRITE = sys::CL_MEM_READ_WRITE;
        const WRITE_ONLY = sys::CL_MEM_WRITE_ONLY;
        const READ_ONLY = sys::CL_MEM_READ_ONLY;
        const USE_HOST_PTR = sys::CL_MEM_USE_HOST_PTR;
        const ALLOC_HOST_PTR = sys::CL_MEM_ALLOC_HOST_PTR;
        const COPY_HOST_PTR = sys::CL_MEM_COPY_HOST_PTR;
        const HOST_WRITE_ONLY = sys::CL_MEM_HOST_WRITE_ONLY;
        const HOST_READ_ONLY = sys::CL_MEM_HOST_READ_ONLY;
        const HOST_NO_ACCESS = sys::CL_MEM_HOST_NO_ACCESS;
    }
}

native_enum! {
    pub enum MemObjectType: sys::cl_mem_object_type {
        Buffer = sys::CL_MEM_OBJECT_BUFFER => "Buffer",
        Image2D = sys::CL_MEM_OBJECT_IMAGE2D => "Image2D",
        Image3D = sys::CL_MEM_OBJECT_IMAGE3D => "Image3D",
        Image2DArray = sys::CL_MEM_OBJECT_IMAGE2D_ARRAY => "Image2DArray",
        Image1D = sys::CL_MEM_OBJECT_IMAGE1D => "Image1D",
        Image1DArray = sys::CL_MEM_OBJECT_IMAGE1D_ARRAY => "Image1DArray",
        Image1DBuffer = sys::CL_MEM_OBJECT_IMAGE1D_BUFFER => "Image1DBuffer",
    }
}

native_enum! {
    pub enum ChannelOrder: sys::cl_channel_order {
        R = sys::CL_R => "R",
        A = sys::CL_A => "A",
        RG = sys::CL_RG => "RG",
        RA = sys::CL_RA => "RA",
        RGB = sys::CL_RGB => "RGB",
        RGBA = sys::CL_RGBA => "RGBA",
        BGRA = sys::CL_BGRA => "BGRA",
        ARGB = sys::CL_ARGB => "ARGB",
        Intensity = sys::CL_INTENSITY => "Intensity",
        Luminance = sys::CL_LUMINANCE => "Luminance",
        Rx = sys::CL_Rx => "Rx",
        RGx = sys::CL_RGx => "RGx",
        RGBx = sys::CL_RGBx => "RGBx",
        Depth = sys::CL_DEPTH => "Depth",
        DepthStencil = sys::CL_DEPTH_STENCIL => "DepthStencil",
        OneRGBApple = sys::CL_1RGB_APPLE => "1RGBApple",
        BGR1Apple = sys::CL_BGR1_APPLE => "BGR1Apple",
    }
}

native_enum! {
    pub enum ChannelDataType: sys::cl_channel_type {
        SNormInt8 = sys::CL_SNORM_INT8 => "SNormInt8",
        SNormInt16 = sys::CL_SNORM_INT16 => "SNormInt16",
        UNormInt8 = sys::CL_UNORM_INT8 => "UNormInt8",
        UNormInt16 = sys::CL_UNORM_INT16 => "UNormInt16",
        UNormShort565 = sys::CL_UNORM_SHORT_565 => "UNormShort565",
        UNormShort555 = sys::CL_UNORM_SHORT_555 => "UNormShort555",
        UNormInt101010 = sys::CL_UNORM_INT_101010 => "UNormInt101010",
        SignedInt8 = sys::CL_SIGNED_INT8 => "SignedInt8",
        SignedInt16 = sys::CL_SIGNED_INT16 => "SignedInt16",
        SignedInt32 = sys::CL_SIGNED_INT32 => "SignedInt32",
        UnsignedInt8 = sys::CL_UNSIGNED_INT8 => "UnsignedInt8",
        UnsignedInt16 = sys::CL_UNSIGNED_INT16 => "UnsignedInt16",
        UnsignedInt32 = sys::CL_UNSIGNED_INT32 => "UnsignedInt32",
        HalfFloat = sys::CL_HALF_FLOAT => "HalfFloat",
        Float = sys::CL_FLOAT => "Float",
        UNormInt24 = sys::CL_UNORM_INT24 => "UNormInt24",
        SFixed14Apple = sys::CL_SFIXED14_APPLE => "SFixed14Apple",
    }
}

impl ChannelOrder {
    fn channels(self) -> Option<usize> {
        use ChannelOrder::*;
        match self {
            R | A | Intensity | Luminance | Rx | Depth => Some(1),
            RG | RA | RGx => Some(2),
            RGB | RGBx => Some(3),
            RGBA | BGRA | ARGB | OneRGBApple | BGR1Apple => Some(4),
            DepthStencil | Unknown(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageFormat {
    pub channel_order: ChannelOrder,
    pub channel_data_type: ChannelDataType,
}

impl ImageFormat {
    pub fn new(channel_order: ChannelOrder, channel_data_type: ChannelDataType) -> Self {
        Self {
            channel_order,
            channel_data_type,
        }
    }

    /// Bytes per pixel, or `None` for combinations this crate cannot size.
    pub fn pixel_size(&self) -> Option<usize> {
        use ChannelDataType::*;
        let per_channel = match self.channel_data_type {
            UNormShort565 | UNormShort555 => return Some(2),
            UNormInt101010 => return Some(4),
            UNormInt24 => {
                return matches!(
                    self.channel_order,
                    ChannelOrder::Depth | ChannelOrder::DepthStencil
                )
                .then_some(4);
            }
            SNormInt8 | UNormInt8 | SignedInt8 | UnsignedInt8 => 1,
            SNormInt16 | UNormInt16 | SignedInt16 | UnsignedInt16 | HalfFloat | SFixed14Apple => 2,
            SignedInt32 | UnsignedInt32 | Float => 4,
            Unknown(_) => return None,
        };
        self.channel_order.channels().map(|n| n * per_channel)
    }

    pub(crate) fn to_raw(self) -> cl_image_format {
        cl_image_format {
            image_channel_order: self.channel_order.raw(),
            image_channel_data_type: self.channel_data_type.raw(),
        }
    }

    pub(crate) fn from_raw(raw: cl_image_format) -> Self {
        Self {
            channel_order: ChannelOrder::from_raw(raw.image_channel_order),
            channel_data_type: ChannelDataType::from_raw(raw.image_channel_data_type),
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.channel_order, self.channel_data_type)
    }
}

/// Shape and layout of an image to create. Zero pitches let the runtime
/// compute them from the width and pixel size.
#[derive(Debug, Clone, Copy)]
pub struct ImageDescriptor<'a> {
    pub image_type: MemObjectType,
    pub width: usize,
    pub height: usize,
    pub depth: usize,
    pub array_size: usize,
    pub row_pitch: usize,
    pub slice_pitch: usize,
    pub num_mip_levels: u32,
    pub num_samples: u32,
    /// Backing buffer of a 1D image buffer.
    pub buffer: Option<&'a MemObject>,
}

impl<'a> ImageDescriptor<'a> {
    pub fn new(image_type: MemObjectType) -> Self {
        Self {
            image_type,
            width: 0,
            height: 0,
            depth: 0,
            array_size: 0,
            row_pitch: 0,
            slice_pitch: 0,
            num_mip_levels: 0,
            num_samples: 0,
            buffer: None,
        }
    }

    pub fn image_2d(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            ..Self::new(MemObjectType::Image2D)
        }
    }

    pub(crate) fn to_raw(&self) -> cl_image_desc {
        cl_image_desc {
            image_type: self.image_type.raw(),
            image_width: self.width,
            image_height: self.height,
            image_depth: self.depth,
            image_array_size: self.array_size,
            image_row_pitch: self.row_pitch,
            image_slice_pitch: self.slice_pitch,
            num_mip_levels: self.num_mip_levels,
            num_samples: self.num_samples,
            buffer: self.buffer.map_or(ptr::null_mut(), MemObject::raw),
        }
    }

    /// Minimum length of host data describing the whole image.
    pub(crate) fn host_len(&self, pixel_size: usize) -> usize {
        let row = if self.row_pitch != 0 {
            self.row_pitch
        } else {
            self.width * pixel_size
        };
        let slice = if self.slice_pitch != 0 {
            self.slice_pitch
        } else {
            row * self.height.max(1)
        };
        slice * self.depth.max(1) * self.array_size.max(1)
    }
}

/// A buffer or image in device memory.
#[derive(Debug)]
pub struct MemObject {
    handle: Handle<MemKind>,
    size: Option<usize>,
    format: Option<ImageFormat>,
}

impl MemObject {
    pub(crate) fn buffer(driver: Arc<dyn Driver>, raw: cl_mem, size: usize) -> Self {
        Self {
            handle: Handle::new(driver, raw),
            size: Some(size),
            format: None,
        }
    }

    pub(crate) fn image(driver: Arc<dyn Driver>, raw: cl_mem, format: ImageFormat) -> Self {
        Self {
            handle: Handle::new(driver, raw),
            size: None,
            format: Some(format),
        }
    }

    pub fn raw(&self) -> cl_mem {
        self.handle.raw()
    }

    /// Byte size for buffers. Images report `None`; their layout is up to
    /// the runtime.
    pub fn size(&self) -> Option<usize> {
        self.size
    }

    pub fn is_image(&self) -> bool {
        self.format.is_some()
    }

    pub fn image_format(&self) -> Option<ImageFormat> {
        self.format
    }

    /// Releases the memory object now instead of on drop. Consuming the
    /// wrapper guarantees no other borrow can still be using the handle.
    pub fn release(self) -> Result<()> {
        self.handle.release()
    }
}

unsafe impl Send for MemObject {}
unsafe impl Sync for MemObject {}
