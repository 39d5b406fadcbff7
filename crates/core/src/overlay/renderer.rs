use std::sync::Arc;

use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;

use crate::overlay::annotations::Overlay;
use crate::shared::frame::Frame;
use crate::shared::geometry::BoundingBox;

pub const BOX_COLOR: [u8; 3] = [0, 0, 255];
pub const BOX_THICKNESS: u32 = 2;
pub const POINT_COLOR: [u8; 3] = [0, 255, 0];
pub const POINT_RADIUS: i32 = 5;

/// Renders an overlay onto a copy of `frame`.
///
/// A replacement frame wins outright. Otherwise boxes are drawn first,
/// then points on top, so landmarks stay visible inside face boxes.
pub fn render(frame: &Frame, overlay: &Overlay) -> Frame {
    if let Some(replacement) = &overlay.replacement {
        return (**replacement).clone();
    }
    if overlay.points.is_empty() && overlay.boxes.is_empty() {
        return frame.clone();
    }

    let mut img = frame.to_rgb_image();
    for bbox in &overlay.boxes {
        draw_box(&mut img, bbox);
    }
    for point in &overlay.points {
        draw_filled_circle_mut(
            &mut img,
            (point.x.round() as i32, point.y.round() as i32),
            POINT_RADIUS,
            Rgb(POINT_COLOR),
        );
    }
    Frame::from_rgb_image(img, frame.index())
}

/// Like [`render`], but shares the input when nothing needs drawing.
pub fn render_shared(frame: &Arc<Frame>, overlay: &Overlay) -> Arc<Frame> {
    if let Some(replacement) = &overlay.replacement {
        return replacement.clone();
    }
    if overlay.points.is_empty() && overlay.boxes.is_empty() {
        return frame.clone();
    }
    Arc::new(render(frame, overlay))
}

fn draw_box(img: &mut RgbImage, bbox: &BoundingBox) {
    let x = bbox.x.round() as i32;
    let y = bbox.y.round() as i32;
    let w = bbox.width.round().max(0.0) as u32;
    let h = bbox.height.round().max(0.0) as u32;

    for t in 0..BOX_THICKNESS {
        let inset_w = w.saturating_sub(2 * t);
        let inset_h = h.saturating_sub(2 * t);
        if inset_w == 0 || inset_h == 0 {
            break;
        }
        let rect = Rect::at(x + t as i32, y + t as i32).of_size(inset_w, inset_h);
        draw_hollow_rect_mut(img, rect, Rgb(BOX_COLOR));
    }
}
