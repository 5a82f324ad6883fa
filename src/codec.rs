//! Image load and PNG save for [`RasterImage`].
//!
//! Loading accepts PNG, JPEG, GIF (first frame), BMP and WebP and normalizes
//! every color type and bit depth to 8-bit RGBA. Saving always writes 8-bit
//! RGBA PNG, optionally recompressed with oxipng.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use retro_raster::RasterImage;

use crate::error::CodecError;

/// Default cap on source file size, 50 MiB.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

/// A decoded source image and the name it was loaded under.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub image: RasterImage,
    pub file_name: Option<String>,
}

/// Read and decode an image file no larger than `max_file_size` bytes.
pub fn load_image(path: &Path, max_file_size: u64) -> Result<LoadedImage, CodecError> {
    let size = std::fs::metadata(path)?.len();
    if size > max_file_size {
        return Err(CodecError::FileTooLarge {
            size,
            max: max_file_size,
        });
    }

    let bytes = std::fs::read(path)?;
    let image = decode_image(&bytes)?;

    tracing::info!(
        path = %path.display(),
        width = image.width(),
        height = image.height(),
        "Loaded image"
    );

    Ok(LoadedImage {
        image,
        file_name: path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned()),
    })
}

/// Decode any supported format into RGBA. The format is sniffed from the
/// content, not the file name.
pub fn decode_image(bytes: &[u8]) -> Result<RasterImage, CodecError> {
    let decoded = image::load_from_memory(bytes).map_err(|e| match e {
        image::ImageError::Unsupported(e) => CodecError::UnsupportedFormat(e.to_string()),
        e => CodecError::Decode(e.to_string()),
    })?;
    let rgba = decoded.to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok(RasterImage::new(width, height, rgba.into_raw())?)
}

/// Encode as 8-bit RGBA PNG.
pub fn encode_png(image: &RasterImage, optimize: bool) -> Result<Vec<u8>, CodecError> {
    let mut buf = Cursor::new(Vec::new());
    {
        let mut encoder = png::Encoder::new(&mut buf, image.width(), image.height());
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder
            .write_header()
            .map_err(|e| CodecError::Encode(e.to_string()))?;
        writer
            .write_image_data(image.pixels())
            .map_err(|e| CodecError::Encode(e.to_string()))?;
    }
    let png_bytes = buf.into_inner();

    if !optimize {
        return Ok(png_bytes);
    }

    // Reduced palettes compress well as indexed PNG; oxipng picks that up.
    Ok(oxipng::optimize_from_memory(
        &png_bytes,
        &oxipng::Options {
            strip: oxipng::StripChunks::Safe,
            optimize_alpha: false,
            ..Default::default()
        },
    )
    .unwrap_or(png_bytes))
}

/// Encode and write `image`, returning the path actually written.
///
/// `.png` is appended unless the path already ends in it.
pub fn save_image(image: &RasterImage, path: &Path, optimize: bool) -> Result<PathBuf, CodecError> {
    let path = with_png_extension(path);
    let bytes = encode_png(image, optimize)?;
    std::fs::write(&path, &bytes)?;

    tracing::info!(path = %path.display(), bytes = bytes.len(), "Saved image");
    Ok(path)
}

/// `ps1-texture-<unix millis>.png`
pub fn default_export_name() -> String {
    format!("ps1-texture-{}.png", chrono::Utc::now().timestamp_millis())
}

fn with_png_extension(path: &Path) -> PathBuf {
    let is_png = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("png"));
    if is_png {
        return path.to_path_buf();
    }
    let mut name = path.as_os_str().to_owned();
    name.push(".png");
    PathBuf::from(name)
}
