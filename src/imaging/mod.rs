//! Screenshot post-processing for the perceptive detector and the
//! clickable colour sampling.
//!
//! Screenshots arrive as PNG bytes from the capture path and are analysed
//! as RGB buffers: XOR-masked against the seed colour, collapsed to a
//! binary mask, and segmented into contours whose bounding boxes anchor
//! the DOM walk.

pub mod ssim;

use image::{GrayImage, Rgb, RgbImage};
use imageproc::contours::{BorderType, find_contours};

/// Decode PNG screenshot bytes into an RGB buffer.
pub fn decode_screenshot(bytes: &[u8]) -> Option<RgbImage> {
    image::load_from_memory(bytes).ok().map(|img| img.to_rgb8())
}

/// Pad an image with a constant border. The perceptive detector uses a
/// 1-pixel black border so banners touching the viewport edge still close
/// into a contour.
pub fn add_border(image: &RgbImage, border: u32, color: Rgb<u8>) -> RgbImage {
    let (width, height) = image.dimensions();
    let mut padded = RgbImage::from_pixel(width + 2 * border, height + 2 * border, color);
    image::imageops::replace(&mut padded, image, i64::from(border), i64::from(border));
    padded
}

/// XOR every pixel with a colour. Pixels equal to the colour go to zero.
pub fn xor_with_color(image: &RgbImage, color: Rgb<u8>) -> RgbImage {
    let mut masked = image.clone();
    for pixel in masked.pixels_mut() {
        pixel.0[0] ^= color.0[0];
        pixel.0[1] ^= color.0[1];
        pixel.0[2] ^= color.0[2];
    }
    masked
}

/// Grayscale then binary threshold at zero: any remaining difference after
/// the XOR mask becomes foreground.
pub fn to_binary_mask(image: &RgbImage) -> GrayImage {
    let gray = image::imageops::grayscale(image);
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        if gray.get_pixel(x, y).0[0] > 0 {
            image::Luma([255u8])
        } else {
            image::Luma([0u8])
        }
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl BoundingRect {
    /// Strict containment, matching the seed filter of the detector.
    pub fn contains_strict(&self, x: i32, y: i32) -> bool {
        self.x < x && x < self.x + self.width && self.y < y && y < self.y + self.height
    }

    pub fn area(&self) -> f64 {
        f64::from(self.width) * f64::from(self.height)
    }
}

/// A contour candidate for the banner region.
#[derive(Debug, Clone)]
pub struct ContourCandidate {
    /// First boundary point, mapped back to a DOM node via hit-testing.
    pub first_point: (i32, i32),
    pub bounding_rect: BoundingRect,
    pub area: f64,
}

/// External contours of a binary mask whose bounding rectangles contain the
/// seed point, smallest polygon area first.
pub fn banner_contour_candidates(mask: &GrayImage, seed: (i32, i32)) -> Vec<ContourCandidate> {
    let contours = find_contours::<i32>(mask);
    let mut candidates: Vec<ContourCandidate> = contours
        .iter()
        .filter(|contour| contour.border_type == BorderType::Outer)
        .filter(|contour| !contour.points.is_empty())
        .filter_map(|contour| {
            let rect = bounding_rect(&contour.points)?;
            if !rect.contains_strict(seed.0, seed.1) {
                return None;
            }
            let first = contour.points[0];
            Some(ContourCandidate {
                first_point: (first.x, first.y),
                bounding_rect: rect,
                area: polygon_area(&contour.points),
            })
        })
        .collect();
    candidates.sort_by(|a, b| a.area.total_cmp(&b.area));
    candidates
}

fn bounding_rect(points: &[imageproc::point::Point<i32>]) -> Option<BoundingRect> {
    let min_x = points.iter().map(|p| p.x).min()?;
    let max_x = points.iter().map(|p| p.x).max()?;
    let min_y = points.iter().map(|p| p.y).min()?;
    let max_y = points.iter().map(|p| p.y).max()?;
    Some(BoundingRect {
        x: min_x,
        y: min_y,
        width: max_x - min_x,
        height: max_y - min_y,
    })
}

/// Shoelace area of a closed contour.
fn polygon_area(points: &[imageproc::point::Point<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut doubled = 0i64;
    for i in 0..points.len() {
        let p = points[i];
        let q = points[(i + 1) % points.len()];
        doubled += i64::from(p.x) * i64::from(q.y) - i64::from(q.x) * i64::from(p.y);
    }
    (doubled.abs() as f64) / 2.0
}

/// Pixel colour at a coordinate, bounds-checked.
pub fn pixel_at(image: &RgbImage, x: i64, y: i64) -> Option<Rgb<u8>> {
    if x < 0 || y < 0 || x >= i64::from(image.width()) || y >= i64::from(image.height()) {
        return None;
    }
    Some(*image.get_pixel(x as u32, y as u32))
}

/// Most frequent colour on a 5-pixel grid inside a rectangle, formatted as
/// `rgb(r,g,b)`. White when nothing can be sampled.
pub fn most_frequent_color(image: &RgbImage, x: i64, y: i64, width: i64, height: i64) -> String {
    let mut counts: std::collections::HashMap<[u8; 3], usize> = std::collections::HashMap::new();
    let mut i = x + 1;
    while i < x + width - 2 {
        let mut j = y + 1;
        while j < y + height - 2 {
            if let Some(pixel) = pixel_at(image, i, j) {
                *counts.entry(pixel.0).or_insert(0) += 1;
            }
            j += 5;
        }
        i += 5;
    }
    counts
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(&a.0)))
        .map(|(rgb, _)| format!("rgb({},{},{})", rgb[0], rgb[1], rgb[2]))
        .unwrap_or_else(|| "rgb(255,255,255)".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xor_zeroes_matching_pixels() {
        let image = RgbImage::from_pixel(4, 4, Rgb([10, 20, 30]));
        let masked = xor_with_color(&image, Rgb([10, 20, 30]));
        assert!(masked.pixels().all(|p| p.0 == [0, 0, 0]));
    }

    #[test]
    fn border_grows_dimensions() {
        let image = RgbImage::from_pixel(4, 4, Rgb([255, 255, 255]));
        let padded = add_border(&image, 1, Rgb([0, 0, 0]));
        assert_eq!(padded.dimensions(), (6, 6));
        assert_eq!(padded.get_pixel(0, 0).0, [0, 0, 0]);
        assert_eq!(padded.get_pixel(1, 1).0, [255, 255, 255]);
    }

    #[test]
    fn contour_candidates_filtered_by_seed() {
        // A white 6x6 block at (2,2) on black background.
        let mut mask = GrayImage::from_pixel(16, 16, image::Luma([0]));
        for x in 2..8 {
            for y in 2..8 {
                mask.put_pixel(x, y, image::Luma([255]));
            }
        }
        let inside = banner_contour_candidates(&mask, (4, 4));
        assert_eq!(inside.len(), 1);
        let outside = banner_contour_candidates(&mask, (12, 12));
        assert!(outside.is_empty());
    }

    #[test]
    fn sampling_reports_dominant_color() {
        let mut image = RgbImage::from_pixel(40, 40, Rgb([200, 10, 10]));
        image.put_pixel(5, 5, Rgb([0, 0, 0]));
        let color = most_frequent_color(&image, 0, 0, 40, 40);
        assert_eq!(color, "rgb(200,10,10)");
    }

    #[test]
    fn sampling_outside_image_falls_back_to_white() {
        let image = RgbImage::from_pixel(4, 4, Rgb([1, 2, 3]));
        let color = most_frequent_color(&image, 100, 100, 3, 3);
        assert_eq!(color, "rgb(255,255,255)");
    }
}
