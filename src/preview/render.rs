use image::{DynamicImage, ImageFormat};

use super::PreviewResult;
use crate::photo::Rotation;

/// Downscales `data` so its longest edge is at most `max_edge` and
/// re-encodes it as JPEG.
pub fn render_preview(data: &[u8], max_edge: u32) -> PreviewResult<Vec<u8>> {
    let img = image::load_from_memory(data)?;
    encode_jpeg(img.thumbnail(max_edge, max_edge))
}

/// Applies `rotation` (clockwise) to the pixels of `data`, returning JPEG bytes.
pub fn rotate_encoded(data: &[u8], rotation: Rotation) -> PreviewResult<Vec<u8>> {
    let img = image::load_from_memory(data)?;
    let rotated = match rotation.degrees() {
        90 => img.rotate90(),
        180 => img.rotate180(),
        270 => img.rotate270(),
        _ => img,
    };
    encode_jpeg(rotated)
}

fn encode_jpeg(img: DynamicImage) -> PreviewResult<Vec<u8>> {
    // JPEG has no alpha channel
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
    let mut buffer = std::io::Cursor::new(Vec::new());
    rgb.write_to(&mut buffer, ImageFormat::Jpeg)?;
    Ok(buffer.into_inner())
}
