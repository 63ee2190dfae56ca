// ============================================================================
// IMAGE I/O: decode files into pixel buffers and encode them back out
// ============================================================================

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use image::codecs::bmp::BmpEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::tga::TgaEncoder;
use image::codecs::webp::WebPEncoder;
use image::{DynamicImage, ImageError, ImageOutputFormat};

use crate::buffer::PixelBuffer;
use crate::error::FilterError;

/// Raster formats the batch tool can write.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SaveFormat {
    #[default]
    Png,
    Jpeg,
    Webp,
    Bmp,
    Tga,
    Tiff,
}

impl SaveFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            SaveFormat::Png => "png",
            SaveFormat::Jpeg => "jpg",
            SaveFormat::Webp => "webp",
            SaveFormat::Bmp => "bmp",
            SaveFormat::Tga => "tga",
            SaveFormat::Tiff => "tiff",
        }
    }

    /// Parse a format name or file extension (`"jpg"`, `"TIFF"`, ...).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "png" => Some(SaveFormat::Png),
            "jpg" | "jpeg" => Some(SaveFormat::Jpeg),
            "webp" => Some(SaveFormat::Webp),
            "bmp" => Some(SaveFormat::Bmp),
            "tga" => Some(SaveFormat::Tga),
            "tif" | "tiff" => Some(SaveFormat::Tiff),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension().and_then(|e| e.to_str()).and_then(Self::from_name)
    }
}

#[derive(Debug)]
pub enum IoError {
    Io(std::io::Error),
    Image(ImageError),
    Buffer(FilterError),
}

impl std::fmt::Display for IoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IoError::Io(e) => write!(f, "I/O error: {}", e),
            IoError::Image(e) => write!(f, "Image error: {}", e),
            IoError::Buffer(e) => write!(f, "Invalid image: {}", e),
        }
    }
}

impl std::error::Error for IoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            IoError::Io(e) => Some(e),
            IoError::Image(e) => Some(e),
            IoError::Buffer(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for IoError {
    fn from(e: std::io::Error) -> Self {
        IoError::Io(e)
    }
}

impl From<ImageError> for IoError {
    fn from(e: ImageError) -> Self {
        IoError::Image(e)
    }
}

impl From<FilterError> for IoError {
    fn from(e: FilterError) -> Self {
        IoError::Buffer(e)
    }
}

/// Decode any supported image file into an ARGB buffer.
pub fn load_buffer(path: &Path) -> Result<PixelBuffer, IoError> {
    let img = image::open(path)?.to_rgba8();
    Ok(PixelBuffer::from_rgba_image(&img)?)
}

/// Encode `buffer` to `path`. JPEG drops alpha; `quality` only affects JPEG.
/// WebP is written lossless.
pub fn save_buffer(
    buffer: &PixelBuffer,
    path: &Path,
    format: SaveFormat,
    quality: u8,
) -> Result<(), IoError> {
    let image = buffer.to_rgba_image();
    let (w, h) = image.dimensions();
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    // The codec always follows `format`, whatever the path's extension says.
    match format {
        SaveFormat::Png => {
            let encoder = PngEncoder::new(&mut writer);
            #[allow(deprecated)]
            encoder.encode(image.as_raw(), w, h, image::ColorType::Rgba8)?;
        }
        SaveFormat::Jpeg => {
            let rgb = DynamicImage::ImageRgba8(image).to_rgb8();
            let mut encoder = JpegEncoder::new_with_quality(&mut writer, quality.clamp(1, 100));
            encoder.encode(rgb.as_raw(), w, h, image::ColorType::Rgb8)?;
        }
        SaveFormat::Webp => {
            let encoder = WebPEncoder::new_lossless(&mut writer);
            encoder.encode(image.as_raw(), w, h, image::ColorType::Rgba8)?;
        }
        SaveFormat::Bmp => {
            let mut encoder = BmpEncoder::new(&mut writer);
            encoder.encode(image.as_raw(), w, h, image::ColorType::Rgba8)?;
        }
        SaveFormat::Tga => {
            let encoder = TgaEncoder::new(&mut writer);
            encoder.encode(image.as_raw(), w, h, image::ColorType::Rgba8)?;
        }
        SaveFormat::Tiff => {
            DynamicImage::ImageRgba8(image).write_to(&mut writer, ImageOutputFormat::Tiff)?;
        }
    }
    writer.flush()?;
    Ok(())
}
