//! Image masking and annotation with detected boxes.

use image::{Rgb, RgbImage};
use imageproc::{drawing::draw_hollow_rect_mut, rect::Rect as PixelRect};

use crate::BoundingBox;

/// Color of the outlines drawn by [`draw_boxes`].
pub const OUTLINE_COLOR: Rgb<u8> = Rgb([0, 255, 0]);

/// Pixel bounds `(x0, y0, x1, y1)` (exclusive end) covered by `bb`, rounded outwards and clipped
/// to a `width`x`height` image.
fn pixel_bounds(bb: &BoundingBox, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
    let clamp = |v: f32, max: u32| v.clamp(0.0, max as f32) as u32;
    let x0 = clamp(bb.x.floor(), width);
    let y0 = clamp(bb.y.floor(), height);
    let x1 = clamp((bb.x + bb.width).ceil(), width);
    let y1 = clamp((bb.y + bb.height).ceil(), height);

    (x0 < x1 && y0 < y1).then_some((x0, y0, x1, y1))
}

/// Returns a copy of `image` where every pixel outside the union of `boxes` is black.
pub fn mask_outside(image: &RgbImage, boxes: &[BoundingBox]) -> RgbImage {
    let mut masked = RgbImage::new(image.width(), image.height());
    for bb in boxes {
        let Some((x0, y0, x1, y1)) = pixel_bounds(bb, image.width(), image.height()) else {
            continue;
        };
        for y in y0..y1 {
            for x in x0..x1 {
                masked.put_pixel(x, y, *image.get_pixel(x, y));
            }
        }
    }
    masked
}

/// Returns an outline width that stays visible on `image`, 1 pixel per 300 pixels of its longer
/// side.
pub fn default_stroke(image: &RgbImage) -> u32 {
    (image.width().max(image.height()) / 300).max(1)
}

/// Returns a copy of `image` with a [`OUTLINE_COLOR`] outline of `stroke` pixels drawn along
/// the inside of each box.
pub fn draw_boxes(image: &RgbImage, boxes: &[BoundingBox], stroke: u32) -> RgbImage {
    let mut annotated = image.clone();
    for bb in boxes {
        let Some((x0, y0, x1, y1)) = pixel_bounds(bb, image.width(), image.height()) else {
            continue;
        };
        let (w, h) = (x1 - x0, y1 - y0);
        for i in 0..stroke.max(1) {
            if 2 * i >= w || 2 * i >= h {
                break;
            }
            let rect = PixelRect::at((x0 + i) as i32, (y0 + i) as i32).of_size(w - 2 * i, h - 2 * i);
            draw_hollow_rect_mut(&mut annotated, rect, OUTLINE_COLOR);
        }
    }
    annotated
}
