use std::path::{Path, PathBuf};

use image::imageops::FilterType;
use image::DynamicImage;
use tempfile::NamedTempFile;

use crate::error::OcrError;

/// Width of the image at `path`, read from the header only.
pub fn image_width(path: &Path) -> Result<u32, OcrError> {
    image::image_dimensions(path)
        .map(|(w, _)| w)
        .map_err(|source| image_error(path, source))
}

/// Resizes by `scale` with Lanczos resampling, keeping the aspect ratio.
///
/// Each dimension is at least one pixel.
pub fn resize(img: &DynamicImage, scale: f32) -> DynamicImage {
    let width = ((img.width() as f32 * scale).round() as u32).max(1);
    let height = ((img.height() as f32 * scale).round() as u32).max(1);
    img.resize_exact(width, height, FilterType::Lanczos3)
}

/// Writes a copy of the image at `path` scaled by `scale` to a temporary PNG.
///
/// The file is deleted when the returned handle is dropped.
pub fn scaled_copy(path: &Path, scale: f32) -> Result<NamedTempFile, OcrError> {
    let img = image::open(path).map_err(|source| image_error(path, source))?;
    let scaled = resize(&img, scale);

    let out = tempfile::Builder::new()
        .prefix("scaled")
        .suffix(".png")
        .tempfile()?;
    scaled
        .save(out.path())
        .map_err(|source| image_error(out.path(), source))?;
    Ok(out)
}

fn image_error(path: &Path, source: image::ImageError) -> OcrError {
    OcrError::Image {
        path: PathBuf::from(path),
        source,
    }
}
