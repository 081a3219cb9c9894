//! Pastes a sprite over every detected nose.

use crate::nose::NoseEstimate;
use image::imageops::{self, FilterType};
use image::{RgbImage, RgbaImage};
use tracing::trace;

/// Entries with a non-positive width are skipped.
pub fn overlay_noses(frame: &mut RgbImage, sprite: &RgbaImage, noses: &[NoseEstimate]) {
    for nose in noses {
        if nose.width <= 0 {
            trace!("Skipping nose with width {}", nose.width);
            continue;
        }

        let size = nose.width as u32;
        let resized = imageops::resize(sprite, size, size, FilterType::Triangle);
        blend_centered(frame, &resized, nose.x, nose.y);
    }
}

/// Alpha blends `overlay` centered on (cx, cy), clipping at the frame edge.
pub fn blend_centered(frame: &mut RgbImage, overlay: &RgbaImage, cx: i32, cy: i32) {
    let x0 = cx as i64 - (overlay.width() / 2) as i64;
    let y0 = cy as i64 - (overlay.height() / 2) as i64;

    for (ox, oy, px) in overlay.enumerate_pixels() {
        let alpha = px[3];
        if alpha == 0 {
            continue;
        }

        let fx = x0 + ox as i64;
        let fy = y0 + oy as i64;
        if fx < 0 || fy < 0 || fx >= frame.width() as i64 || fy >= frame.height() as i64 {
            continue;
        }

        let a = alpha as f32 / 255.;
        let bg = frame.get_pixel_mut(fx as u32, fy as u32);
        for c in 0..3 {
            bg[c] = (px[c] as f32 * a + bg[c] as f32 * (1. - a)) as u8;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, Rgba};

    #[test]
    fn opaque_overlay_replaces_pixels() {
        let mut frame = RgbImage::from_pixel(10, 10, Rgb([0, 0, 0]));
        let overlay = RgbaImage::from_pixel(4, 4, Rgba([255, 0, 0, 255]));
        blend_centered(&mut frame, &overlay, 5, 5);

        assert_eq!(*frame.get_pixel(3, 3), Rgb([255, 0, 0]));
        assert_eq!(*frame.get_pixel(6, 6), Rgb([255, 0, 0]));
        assert_eq!(*frame.get_pixel(7, 7), Rgb([0, 0, 0]));
        assert_eq!(*frame.get_pixel(2, 2), Rgb([0, 0, 0]));
    }

    #[test]
    fn transparent_pixels_are_skipped() {
        let mut frame = RgbImage::from_pixel(4, 4, Rgb([9, 9, 9]));
        let overlay = RgbaImage::from_pixel(4, 4, Rgba([255, 255, 255, 0]));
        blend_centered(&mut frame, &overlay, 2, 2);
        assert!(frame.pixels().all(|p| *p == Rgb([9, 9, 9])));
    }

    #[test]
    fn partial_alpha_blends_and_truncates() {
        let mut frame = RgbImage::from_pixel(1, 1, Rgb([100, 0, 254]));
        let overlay = RgbaImage::from_pixel(1, 1, Rgba([200, 100, 0, 128]));
        blend_centered(&mut frame, &overlay, 0, 0);
        // a = 128 / 255
        assert_eq!(*frame.get_pixel(0, 0), Rgb([150, 50, 126]));
    }

    #[test]
    fn clips_at_frame_edges() {
        let mut frame = RgbImage::from_pixel(4, 4, Rgb([0, 0, 0]));
        let overlay = RgbaImage::from_pixel(4, 4, Rgba([0, 255, 0, 255]));
        blend_centered(&mut frame, &overlay, 0, 0);

        assert_eq!(*frame.get_pixel(0, 0), Rgb([0, 255, 0]));
        assert_eq!(*frame.get_pixel(1, 1), Rgb([0, 255, 0]));
        assert_eq!(*frame.get_pixel(2, 2), Rgb([0, 0, 0]));
    }

    #[test]
    fn non_positive_widths_are_ignored() {
        let mut frame = RgbImage::from_pixel(8, 8, Rgb([1, 2, 3]));
        let sprite = RgbaImage::from_pixel(2, 2, Rgba([255, 255, 255, 255]));
        let noses = [
            NoseEstimate {
                x: 4,
                y: 4,
                width: 0,
            },
            NoseEstimate {
                x: 4,
                y: 4,
                width: -6,
            },
        ];
        overlay_noses(&mut frame, &sprite, &noses);
        assert!(frame.pixels().all(|p| *p == Rgb([1, 2, 3])));
    }

    #[test]
    fn sprite_is_resized_to_nose_width() {
        let mut frame = RgbImage::from_pixel(20, 20, Rgb([0, 0, 0]));
        let sprite = RgbaImage::from_pixel(2, 2, Rgba([255, 255, 255, 255]));
        let noses = [NoseEstimate {
            x: 10,
            y: 10,
            width: 6,
        }];
        overlay_noses(&mut frame, &sprite, &noses);

        let painted = frame.pixels().filter(|p| p[0] > 0).count();
        assert_eq!(painted, 36);
    }
}
