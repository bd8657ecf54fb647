// ============================================================================
// IMAGE I/O — encoded bytes at the boundary, RGBA pixels inside
// ============================================================================

use std::fs::File;
use std::io::{BufWriter, Cursor, Write};
use std::path::Path;

use image::codecs::bmp::BmpEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ColorType, DynamicImage, ImageEncoder, RgbaImage};

use crate::error::{CanvasError, CanvasResult};

/// Output formats for headless saves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SaveFormat {
    #[default]
    Png,
    Jpeg,
    Bmp,
}

impl SaveFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            SaveFormat::Png => "png",
            SaveFormat::Jpeg => "jpg",
            SaveFormat::Bmp => "bmp",
        }
    }

    /// Infer from a file extension or format name.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "png" => Some(SaveFormat::Png),
            "jpg" | "jpeg" => Some(SaveFormat::Jpeg),
            "bmp" => Some(SaveFormat::Bmp),
            _ => None,
        }
    }
}

/// Encode an RGBA buffer as PNG.
pub fn encode_png(image: &RgbaImage) -> CanvasResult<Vec<u8>> {
    let mut bytes = Vec::new();
    PngEncoder::new(&mut bytes).write_image(
        image.as_raw(),
        image.width(),
        image.height(),
        ColorType::Rgba8,
    )?;
    Ok(bytes)
}

/// Decode any supported encoding into RGBA. Failure is `InvalidImageData`.
pub fn decode_image(bytes: &[u8]) -> CanvasResult<RgbaImage> {
    if bytes.is_empty() {
        return Err(CanvasError::invalid_image("empty image payload"));
    }
    let image = image::load_from_memory(bytes)
        .map_err(|e| match sniff_format(bytes) {
            Some(format) => CanvasError::invalid_image(format!("bad {format:?} data: {e}")),
            None => CanvasError::invalid_image(format!("unrecognized image format: {e}")),
        })?
        .to_rgba8();
    if image.width() == 0 || image.height() == 0 {
        return Err(CanvasError::invalid_image("image has no pixels"));
    }
    Ok(image)
}

/// Read a user-selected file from disk, ready for decoding.
pub fn read_image_file(path: &Path) -> CanvasResult<Vec<u8>> {
    Ok(std::fs::read(path)?)
}

/// Encode and write an image to a file.
pub fn encode_and_write(image: &RgbaImage, path: &Path, format: SaveFormat, quality: u8) -> CanvasResult<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    match format {
        SaveFormat::Png => {
            writer.write_all(&encode_png(image)?)?;
        }
        SaveFormat::Jpeg => {
            let rgb_image = DynamicImage::ImageRgba8(image.clone()).to_rgb8();
            let mut encoder = JpegEncoder::new_with_quality(&mut writer, quality.clamp(1, 100));
            encoder.encode(
                rgb_image.as_raw(),
                rgb_image.width(),
                rgb_image.height(),
                ColorType::Rgb8,
            )?;
        }
        SaveFormat::Bmp => {
            let mut encoder = BmpEncoder::new(&mut writer);
            encoder.encode(image.as_raw(), image.width(), image.height(), ColorType::Rgba8)?;
        }
    }

    writer.flush()?;
    Ok(())
}

/// Sniff the encoding of a payload without decoding it.
pub fn sniff_format(bytes: &[u8]) -> Option<image::ImageFormat> {
    image::guess_format(bytes).ok()
}

/// Read the dimensions of an encoded image without a full decode.
pub fn encoded_dimensions(bytes: &[u8]) -> CanvasResult<(u32, u32)> {
    let reader = image::io::Reader::new(Cursor::new(bytes)).with_guessed_format()?;
    Ok(reader.into_dimensions()?)
}
