//! Structural similarity between two screenshots.
//!
//! Post-click captures are compared against the pre-click baseline; two
//! buttons sharing an identical score hint that their handlers behave the
//! same. Identical inputs score exactly 1.0.

use image::{GrayImage, RgbImage};

const WINDOW: u32 = 8;
const C1: f64 = (0.01 * 255.0) * (0.01 * 255.0);
const C2: f64 = (0.03 * 255.0) * (0.03 * 255.0);

/// SSIM score of two same-shaped screenshots after truncating to the
/// narrower width (a scroll bar can shave a few columns off one capture).
/// `None` when the shapes still differ after truncation.
pub fn calculate_ssim_score(image1: &RgbImage, image2: &RgbImage) -> Option<f64> {
    let gray1 = image::imageops::grayscale(image1);
    let gray2 = image::imageops::grayscale(image2);
    let (gray1, gray2) = truncate_width(gray1, gray2);
    if gray1.dimensions() != gray2.dimensions() {
        return None;
    }
    Some(ssim(&gray1, &gray2))
}

/// Crop both images to the smaller width; heights are left alone.
fn truncate_width(image1: GrayImage, image2: GrayImage) -> (GrayImage, GrayImage) {
    let width = image1.width().min(image2.width());
    let crop = |img: GrayImage| -> GrayImage {
        if img.width() == width {
            img
        } else {
            image::imageops::crop_imm(&img, 0, 0, width, img.height()).to_image()
        }
    };
    (crop(image1), crop(image2))
}

/// Mean SSIM over non-overlapping 8x8 windows with the standard
/// stabilisation constants.
pub fn ssim(image1: &GrayImage, image2: &GrayImage) -> f64 {
    debug_assert_eq!(image1.dimensions(), image2.dimensions());
    let (width, height) = image1.dimensions();
    if width == 0 || height == 0 {
        return 0.0;
    }

    let mut total = 0.0;
    let mut windows = 0u64;
    let mut wy = 0;
    while wy < height {
        let mut wx = 0;
        while wx < width {
            let w = WINDOW.min(width - wx);
            let h = WINDOW.min(height - wy);
            total += window_ssim(image1, image2, wx, wy, w, h);
            windows += 1;
            wx += WINDOW;
        }
        wy += WINDOW;
    }
    total / windows as f64
}

fn window_ssim(image1: &GrayImage, image2: &GrayImage, x0: u32, y0: u32, w: u32, h: u32) -> f64 {
    let n = f64::from(w * h);
    let mut sum_x = 0.0;
    let mut sum_y = 0.0;
    let mut sum_xx = 0.0;
    let mut sum_yy = 0.0;
    let mut sum_xy = 0.0;
    for y in y0..y0 + h {
        for x in x0..x0 + w {
            let a = f64::from(image1.get_pixel(x, y).0[0]);
            let b = f64::from(image2.get_pixel(x, y).0[0]);
            sum_x += a;
            sum_y += b;
            sum_xx += a * a;
            sum_yy += b * b;
            sum_xy += a * b;
        }
    }
    let mean_x = sum_x / n;
    let mean_y = sum_y / n;
    let var_x = sum_xx / n - mean_x * mean_x;
    let var_y = sum_yy / n - mean_y * mean_y;
    let covar = sum_xy / n - mean_x * mean_y;

    let numerator = (2.0 * mean_x * mean_y + C1) * (2.0 * covar + C2);
    let denominator = (mean_x * mean_x + mean_y * mean_y + C1) * (var_x + var_y + C2);
    numerator / denominator
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn identical_images_score_exactly_one() {
        let mut image = RgbImage::from_pixel(32, 24, Rgb([120, 80, 40]));
        image.put_pixel(3, 3, Rgb([0, 0, 0]));
        image.put_pixel(20, 10, Rgb([255, 255, 255]));
        let score = calculate_ssim_score(&image, &image.clone());
        assert_eq!(score, Some(1.0));
    }

    #[test]
    fn different_images_score_below_one() {
        let black = RgbImage::from_pixel(32, 32, Rgb([0, 0, 0]));
        let white = RgbImage::from_pixel(32, 32, Rgb([255, 255, 255]));
        let score = calculate_ssim_score(&black, &white).unwrap();
        assert!(score < 0.1, "got {score}");
    }

    #[test]
    fn width_mismatch_is_truncated() {
        let wide = RgbImage::from_pixel(40, 32, Rgb([9, 9, 9]));
        let narrow = RgbImage::from_pixel(32, 32, Rgb([9, 9, 9]));
        assert_eq!(calculate_ssim_score(&wide, &narrow), Some(1.0));
    }

    #[test]
    fn height_mismatch_yields_none() {
        let tall = RgbImage::from_pixel(32, 48, Rgb([9, 9, 9]));
        let short = RgbImage::from_pixel(32, 32, Rgb([9, 9, 9]));
        assert_eq!(calculate_ssim_score(&tall, &short), None);
    }
}
