// Decoding, raster access and PNG output.
//
// The scanner only needs three things from an image: its width, its height, and the
// RGB value at a coordinate. `Raster` is that seam; everything `image` can decode is
// turned into an `RgbImage` here, so the scanner never sees formats or alpha.

use std::io::Cursor;
use std::path::Path;

use image::codecs::png::PngEncoder;
use image::{DynamicImage, GenericImageView, ImageBuffer, ImageEncoder, Rgb, RgbImage, RgbaImage};

use crate::core_modules::hold_grouper::DetectionResult;
use crate::error::DetectionError;

/// A decoded image the scanner can sample.
pub trait Raster {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    /// RGB channels at `(x, y)`. Callers stay inside `width` x `height`.
    fn rgb_at(&self, x: u32, y: u32) -> [u8; 3];
}

impl Raster for RgbImage {
    fn width(&self) -> u32 {
        ImageBuffer::width(self)
    }

    fn height(&self) -> u32 {
        ImageBuffer::height(self)
    }

    fn rgb_at(&self, x: u32, y: u32) -> [u8; 3] {
        self.get_pixel(x, y).0
    }
}

impl Raster for RgbaImage {
    fn width(&self) -> u32 {
        ImageBuffer::width(self)
    }

    fn height(&self) -> u32 {
        ImageBuffer::height(self)
    }

    fn rgb_at(&self, x: u32, y: u32) -> [u8; 3] {
        let [red, green, blue, _alpha] = self.get_pixel(x, y).0;
        [red, green, blue]
    }
}

impl Raster for DynamicImage {
    fn width(&self) -> u32 {
        GenericImageView::dimensions(self).0
    }

    fn height(&self) -> u32 {
        GenericImageView::dimensions(self).1
    }

    fn rgb_at(&self, x: u32, y: u32) -> [u8; 3] {
        let [red, green, blue, _alpha] = GenericImageView::get_pixel(self, x, y).0;
        [red, green, blue]
    }
}

/// Decodes an uploaded buffer (any format `image` recognises) into 8-bit RGB.
pub fn decode(bytes: &[u8]) -> Result<RgbImage, DetectionError> {
    if bytes.is_empty() {
        return Err(DetectionError::EmptyInput);
    }
    Ok(image::load_from_memory(bytes)?.to_rgb8())
}

/// Opens and decodes an image file into 8-bit RGB.
pub fn open(path: &Path) -> Result<RgbImage, DetectionError> {
    Ok(image::open(path)?.to_rgb8())
}

/// Encodes an RGB image as PNG bytes.
pub fn encode_png(image: &RgbImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buffer = Cursor::new(Vec::new());
    let encoder = PngEncoder::new(&mut buffer);
    encoder.write_image(
        image.as_raw(),
        ImageBuffer::width(image),
        ImageBuffer::height(image),
        image::ExtendedColorType::Rgb8,
    )?;
    Ok(buffer.into_inner())
}

pub fn save_png(path: &Path, image: &RgbImage) -> Result<(), image::ImageError> {
    let bytes = encode_png(image)?;
    std::fs::write(path, bytes)?;
    Ok(())
}

/// Outline colour used when drawing holds of a given colour tag.
pub fn marker_color(tag: &str) -> Rgb<u8> {
    match tag {
        "red" => Rgb([255, 0, 0]),
        "blue" => Rgb([0, 64, 255]),
        "green" => Rgb([0, 200, 0]),
        "yellow" => Rgb([255, 220, 0]),
        _ => Rgb([255, 255, 255]),
    }
}

/// Returns a copy of `image` with a square outline of side `2 * half_size + 1`
/// around every detected hold. Outlines are clipped at the image border.
pub fn annotate_holds(image: &RgbImage, result: &DetectionResult, half_size: u32) -> RgbImage {
    let mut annotated = image.clone();
    let (width, height) = annotated.dimensions();
    if width == 0 || height == 0 {
        return annotated;
    }

    for group in result.groups() {
        let color = marker_color(&group.color);
        for hold in &group.holds {
            let left = hold.x.saturating_sub(half_size);
            let top = hold.y.saturating_sub(half_size);
            let right = hold.x.saturating_add(half_size).min(width - 1);
            let bottom = hold.y.saturating_add(half_size).min(height - 1);

            for x in left..=right {
                annotated.put_pixel(x, top, color);
                annotated.put_pixel(x, bottom, color);
            }
            for y in top..=bottom {
                annotated.put_pixel(left, y, color);
                annotated.put_pixel(right, y, color);
            }
        }
    }
    annotated
}
