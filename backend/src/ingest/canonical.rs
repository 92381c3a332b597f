use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbImage};

/// Decoded RGB8 image whose longer edge never exceeds the bound it was normalized with.
///
/// The only way to build one is [`CanonicalImage::normalize`], so every checker sees
/// three channels without alpha and bounded dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalImage {
    pixels: RgbImage,
}

impl CanonicalImage {
    /// Converts to RGB8 (alpha is dropped, grayscale is expanded) and downscales with
    /// Lanczos3 so that the longer edge equals `max_edge`. Images already within the
    /// bound keep their dimensions.
    pub fn normalize(image: DynamicImage, max_edge: u32) -> Self {
        let rgb = match image {
            DynamicImage::ImageRgb8(rgb) => rgb,
            other => other.into_rgb8(),
        };

        let pixels = match target_dimensions(rgb.width(), rgb.height(), max_edge) {
            Some((width, height)) => {
                log::debug!(
                    "Resizing {}x{} -> {}x{}",
                    rgb.width(),
                    rgb.height(),
                    width,
                    height
                );
                imageops::resize(&rgb, width, height, FilterType::Lanczos3)
            }
            None => rgb,
        };

        Self { pixels }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    pub fn as_rgb(&self) -> &RgbImage {
        &self.pixels
    }
}

/// `None` when no resize is needed.
fn target_dimensions(width: u32, height: u32, max_edge: u32) -> Option<(u32, u32)> {
    let long = width.max(height);
    if max_edge == 0 || long <= max_edge {
        return None;
    }

    let short = width.min(height);
    let scaled_short = ((u64::from(short) * u64::from(max_edge)) / u64::from(long)).max(1) as u32;

    if width >= height {
        Some((max_edge, scaled_short))
    } else {
        Some((scaled_short, max_edge))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgba, RgbaImage};

    #[test]
    fn landscape_downscale_is_exact() {
        assert_eq!(target_dimensions(2048, 1536, 1024), Some((1024, 768)));
        assert_eq!(target_dimensions(2000, 1000, 1024), Some((1024, 512)));
    }

    #[test]
    fn portrait_keeps_orientation() {
        assert_eq!(target_dimensions(1536, 2048, 1024), Some((768, 1024)));
    }

    #[test]
    fn within_bound_is_untouched() {
        assert_eq!(target_dimensions(1024, 1024, 1024), None);
        assert_eq!(target_dimensions(100, 80, 1024), None);
    }

    #[test]
    fn extreme_aspect_never_collapses_to_zero() {
        assert_eq!(target_dimensions(10_000, 3, 100), Some((100, 1)));
    }

    #[test]
    fn grayscale_becomes_rgb() {
        let gray = GrayImage::from_pixel(40, 30, Luma([200]));
        let canonical = CanonicalImage::normalize(DynamicImage::ImageLuma8(gray), 1024);
        assert_eq!(canonical.dimensions(), (40, 30));
        assert_eq!(canonical.as_rgb().get_pixel(0, 0).0, [200, 200, 200]);
    }

    #[test]
    fn alpha_is_dropped() {
        let rgba = RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 128]));
        let canonical = CanonicalImage::normalize(DynamicImage::ImageRgba8(rgba), 1024);
        assert_eq!(canonical.as_rgb().get_pixel(5, 5).0, [255, 0, 0]);
    }

    #[test]
    fn large_image_is_resized() {
        let rgb = RgbImage::new(300, 150);
        let canonical = CanonicalImage::normalize(DynamicImage::ImageRgb8(rgb), 100);
        assert_eq!(canonical.dimensions(), (100, 50));
    }
}
