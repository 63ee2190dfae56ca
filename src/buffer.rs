// ============================================================================
// PIXEL BUFFER: row-major packed ARGB bitmap
// ============================================================================

use image::RgbaImage;

use crate::color;
use crate::error::{FilterError, FilterResult};

/// A `width × height` bitmap of packed `0xAARRGGBB` samples, row-major.
///
/// Both dimensions are always positive; every constructor rejects zero.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    pixels: Vec<u32>,
}

impl PixelBuffer {
    /// A fully transparent buffer.
    pub fn new(width: u32, height: u32) -> FilterResult<Self> {
        Self::filled(width, height, 0)
    }

    pub fn filled(width: u32, height: u32, argb: u32) -> FilterResult<Self> {
        check_dimensions(width, height)?;
        Ok(Self {
            width,
            height,
            pixels: vec![argb; width as usize * height as usize],
        })
    }

    /// Wrap existing samples. `pixels.len()` must equal `width * height`.
    pub fn from_argb(width: u32, height: u32, pixels: Vec<u32>) -> FilterResult<Self> {
        check_dimensions(width, height)?;
        if pixels.len() != width as usize * height as usize {
            return Err(FilterError::InvalidDimensions { width, height });
        }
        Ok(Self { width, height, pixels })
    }

    /// Build a buffer by evaluating `f(x, y)` for every pixel.
    pub fn from_fn<F>(width: u32, height: u32, mut f: F) -> FilterResult<Self>
    where
        F: FnMut(u32, u32) -> u32,
    {
        check_dimensions(width, height)?;
        let mut pixels = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                pixels.push(f(x, y));
            }
        }
        Ok(Self { width, height, pixels })
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn get(&self, x: i64, y: i64) -> FilterResult<u32> {
        let idx = self.index(x, y)?;
        Ok(self.pixels[idx])
    }

    pub fn set(&mut self, x: i64, y: i64, argb: u32) -> FilterResult<()> {
        let idx = self.index(x, y)?;
        self.pixels[idx] = argb;
        Ok(())
    }

    /// Clamp-to-edge read: coordinates outside the buffer snap to the nearest edge.
    #[inline]
    pub fn pixel_clamped(&self, x: i32, y: i32) -> u32 {
        let cx = x.clamp(0, self.width as i32 - 1) as usize;
        let cy = y.clamp(0, self.height as i32 - 1) as usize;
        self.pixels[cy * self.width as usize + cx]
    }

    /// Zero-fill read: coordinates outside the buffer are transparent black.
    #[inline]
    pub fn pixel_or_zero(&self, x: i32, y: i32) -> u32 {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            0
        } else {
            self.pixels[y as usize * self.width as usize + x as usize]
        }
    }

    #[inline]
    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    #[inline]
    pub fn pixels_mut(&mut self) -> &mut [u32] {
        &mut self.pixels
    }

    pub fn row(&self, y: u32) -> &[u32] {
        let w = self.width as usize;
        let start = y as usize * w;
        &self.pixels[start..start + w]
    }

    pub fn into_argb(self) -> Vec<u32> {
        self.pixels
    }

    /// Resize to `width × height`, reusing the allocation, and clear to transparent.
    pub fn reset(&mut self, width: u32, height: u32) -> FilterResult<()> {
        check_dimensions(width, height)?;
        self.width = width;
        self.height = height;
        self.pixels.clear();
        self.pixels.resize(width as usize * height as usize, 0);
        Ok(())
    }

    /// Convert to an `image` crate RGBA8 image.
    pub fn to_rgba_image(&self) -> RgbaImage {
        let mut raw = Vec::with_capacity(self.pixels.len() * 4);
        for &p in &self.pixels {
            raw.extend_from_slice(&color::to_rgba(p));
        }
        // Length is exactly width * height * 4.
        RgbaImage::from_raw(self.width, self.height, raw)
            .unwrap_or_else(|| RgbaImage::new(self.width, self.height))
    }

    pub fn from_rgba_image(img: &RgbaImage) -> FilterResult<Self> {
        let (w, h) = img.dimensions();
        check_dimensions(w, h)?;
        let pixels = img
            .as_raw()
            .chunks_exact(4)
            .map(|p| color::from_rgba([p[0], p[1], p[2], p[3]]))
            .collect();
        Ok(Self { width: w, height: h, pixels })
    }

    fn index(&self, x: i64, y: i64) -> FilterResult<usize> {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return Err(FilterError::OutOfBounds {
                x,
                y,
                width: self.width,
                height: self.height,
            });
        }
        Ok(y as usize * self.width as usize + x as usize)
    }
}

impl TryFrom<&RgbaImage> for PixelBuffer {
    type Error = FilterError;

    fn try_from(img: &RgbaImage) -> Result<Self, Self::Error> {
        PixelBuffer::from_rgba_image(img)
    }
}

impl From<&PixelBuffer> for RgbaImage {
    fn from(buf: &PixelBuffer) -> Self {
        buf.to_rgba_image()
    }
}

fn check_dimensions(width: u32, height: u32) -> FilterResult<()> {
    if width == 0 || height == 0 {
        return Err(FilterError::InvalidDimensions { width, height });
    }
    Ok(())
}

/// Take a caller-supplied destination if any, sized to `width × height`.
///
/// A destination that already has the right size is returned untouched;
/// otherwise it is reset (cleared) to the new size. Without one, a fresh
/// transparent buffer is allocated.
pub(crate) fn prepare_destination(
    dst: Option<PixelBuffer>,
    width: u32,
    height: u32,
) -> FilterResult<PixelBuffer> {
    match dst {
        Some(d) if d.dimensions() == (width, height) => Ok(d),
        Some(mut d) => {
            d.reset(width, height)?;
            Ok(d)
        }
        None => PixelBuffer::new(width, height),
    }
}
