use image::GrayImage;
use image::imageops;
use shared::QualityResult;

use super::{CheckerError, QualityChecker, round_to};
use crate::ingest::CanonicalImage;

pub const DEFAULT_BLUR_THRESHOLD: f64 = 100.0;

/// Sharpness gate based on the variance of the 3x3 Laplacian `[0,1,0; 1,-4,1; 0,1,0]`.
///
/// Below `blur_threshold` the image is rejected with score `variance / threshold`;
/// otherwise the score is `variance / (10 * threshold)`, capped at 1.
pub struct LaplacianBlurChecker {
    blur_threshold: f64,
}

impl LaplacianBlurChecker {
    pub fn new(blur_threshold: f64) -> Self {
        Self { blur_threshold }
    }
}

impl Default for LaplacianBlurChecker {
    fn default() -> Self {
        Self::new(DEFAULT_BLUR_THRESHOLD)
    }
}

impl QualityChecker for LaplacianBlurChecker {
    fn version(&self) -> &str {
        "laplacian-blur-1.0"
    }

    fn check(&self, image: &CanonicalImage) -> Result<QualityResult, CheckerError> {
        let gray = imageops::grayscale(image.as_rgb());
        let variance = laplacian_variance(&gray);

        if variance < self.blur_threshold {
            let score = (variance / self.blur_threshold) as f32;
            return Ok(QualityResult::rejected(
                round_to(score, 3),
                format!(
                    "Image too blurry (sharpness={:.0}, min={:.0})",
                    variance, self.blur_threshold
                ),
            ));
        }

        let score = (variance / (self.blur_threshold * 10.0)).min(1.0) as f32;
        Ok(QualityResult::accepted(round_to(score, 3)))
    }
}

/// Variance of the Laplacian over interior pixels. Images smaller than 3x3 yield 0.
pub fn laplacian_variance(gray: &GrayImage) -> f64 {
    let (w, h) = gray.dimensions();
    if w < 3 || h < 3 {
        return 0.0;
    }

    let px = |x: u32, y: u32| f64::from(gray.get_pixel(x, y).0[0]);
    let mut sum = 0.0f64;
    let mut sum_sq = 0.0f64;
    let mut count = 0u64;

    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let laplacian =
                px(x, y - 1) + px(x, y + 1) + px(x - 1, y) + px(x + 1, y) - 4.0 * px(x, y);
            sum += laplacian;
            sum_sq += laplacian * laplacian;
            count += 1;
        }
    }

    let mean = sum / count as f64;
    ((sum_sq / count as f64) - mean * mean).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Luma, Rgb, RgbImage};

    fn canonical(rgb: RgbImage) -> CanonicalImage {
        CanonicalImage::normalize(DynamicImage::ImageRgb8(rgb), 1024)
    }

    fn grid(size: u32, step: u32) -> RgbImage {
        RgbImage::from_fn(size, size, |x, y| {
            if x % step == 0 || y % step == 0 {
                Rgb([0, 0, 0])
            } else {
                Rgb([180, 130, 100])
            }
        })
    }

    #[test]
    fn flat_image_is_rejected() {
        let flat = canonical(RgbImage::from_pixel(224, 224, Rgb([180, 130, 100])));
        let result = LaplacianBlurChecker::default().check(&flat).unwrap();

        assert!(!result.is_acceptable());
        assert_eq!(result.score, 0.0);
        assert_eq!(
            result.reason(),
            Some("Image too blurry (sharpness=0, min=100)")
        );
    }

    #[test]
    fn structured_image_is_accepted() {
        let result = LaplacianBlurChecker::default()
            .check(&canonical(grid(224, 8)))
            .unwrap();

        assert!(result.is_acceptable());
        assert!(result.score > 0.0 && result.score <= 1.0);
        assert_eq!(result.reason(), None);
    }

    #[test]
    fn threshold_drives_the_verdict() {
        let image = canonical(grid(64, 8));
        let variance = laplacian_variance(&imageops::grayscale(image.as_rgb()));

        assert!(LaplacianBlurChecker::new(variance * 0.5).check(&image).unwrap().is_acceptable());
        assert!(!LaplacianBlurChecker::new(variance * 2.0).check(&image).unwrap().is_acceptable());
    }

    #[test]
    fn checkerboard_has_high_variance() {
        let board = GrayImage::from_fn(50, 50, |x, y| {
            if (x + y) % 2 == 0 { Luma([0]) } else { Luma([255]) }
        });
        assert!(laplacian_variance(&board) > 1000.0);
    }

    #[test]
    fn tiny_image_has_zero_variance() {
        assert_eq!(laplacian_variance(&GrayImage::new(2, 2)), 0.0);
    }

    #[test]
    fn check_is_deterministic() {
        let image = canonical(grid(100, 5));
        let checker = LaplacianBlurChecker::default();
        assert_eq!(checker.check(&image).unwrap(), checker.check(&image).unwrap());
    }
}
