//! Host bitmaps that can be uploaded as 2D images.

/// Pixel storage a bitmap can expose for direct upload.
#[derive(Debug, Clone, Copy)]
pub enum PixelLayout<'a> {
    /// One 8-bit intensity sample per pixel, rows `stride` bytes apart.
    Gray8 { pixels: &'a [u8], stride: usize },
    /// Four 8-bit samples per pixel in R, G, B, A order.
    Rgba8 { pixels: &'a [u8], stride: usize },
    /// Anything else; read pixel by pixel through [`Bitmap::rgba8`].
    Other,
}

/// A decoded host image.
pub trait Bitmap {
    fn width(&self) -> usize;

    fn height(&self) -> usize;

    fn layout(&self) -> PixelLayout<'_> {
        PixelLayout::Other
    }

    /// Colour of the pixel at (`x`, `y`) relative to the top-left corner.
    fn rgba8(&self, x: usize, y: usize) -> [u8; 4];
}

/// Converts any bitmap to tightly packed 8-bit RGBA, row-major.
pub(crate) fn to_rgba8(bitmap: &(impl Bitmap + ?Sized)) -> Vec<u8> {
    let (width, height) = (bitmap.width(), bitmap.height());
    let mut data = Vec::with_capacity(width * height * 4);
    for y in 0..height {
        for x in 0..width {
            data.extend_from_slice(&bitmap.rgba8(x, y));
        }
    }
    data
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrayImage {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
}

impl GrayImage {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width * height],
        }
    }

    /// Returns `None` if `pixels` is not exactly `width * height` bytes.
    pub fn from_raw(width: usize, height: usize, pixels: Vec<u8>) -> Option<Self> {
        (pixels.len() == width * height).then_some(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn put(&mut self, x: usize, y: usize, value: u8) {
        self.pixels[y * self.width + x] = value;
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}

impl Bitmap for GrayImage {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn layout(&self) -> PixelLayout<'_> {
        PixelLayout::Gray8 {
            pixels: &self.pixels,
            stride: self.width,
        }
    }

    fn rgba8(&self, x: usize, y: usize) -> [u8; 4] {
        let v = self.pixels[y * self.width + x];
        [v, v, v, 0xff]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbaImage {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
}

impl RgbaImage {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width * height * 4],
        }
    }

    /// Returns `None` if `pixels` is not exactly `width * height * 4` bytes.
    pub fn from_raw(width: usize, height: usize, pixels: Vec<u8>) -> Option<Self> {
        (pixels.len() == width * height * 4).then_some(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn put(&mut self, x: usize, y: usize, rgba: [u8; 4]) {
        let at = (y * self.width + x) * 4;
        self.pixels[at..at + 4].copy_from_slice(&rgba);
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}

impl Bitmap for RgbaImage {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn layout(&self) -> PixelLayout<'_> {
        PixelLayout::Rgba8 {
            pixels: &self.pixels,
            stride: self.width * 4,
        }
    }

    fn rgba8(&self, x: usize, y: usize) -> [u8; 4] {
        let at = (y * self.width + x) * 4;
        [
            self.pixels[at],
            self.pixels[at + 1],
            self.pixels[at + 2],
            self.pixels[at + 3],
        ]
    }
}
