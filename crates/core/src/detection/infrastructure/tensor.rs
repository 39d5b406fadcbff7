//! Frame to input-tensor conversion shared by the ONNX adapters.
//!
//! Sampling is nearest-neighbour on pixel centers, which is plenty for
//! detector inputs and keeps preprocessing off the hot path.

use ndarray::Array4;

use crate::shared::frame::Frame;

use super::session::TensorLayout;

/// Value range a model expects for its pixel input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelRange {
    /// `[0, 1]`
    Unit,
    /// `[-1, 1]`
    Signed,
}

impl PixelRange {
    fn convert(self, value: u8) -> f32 {
        match self {
            PixelRange::Unit => value as f32 / 255.0,
            PixelRange::Signed => value as f32 / 127.5 - 1.0,
        }
    }
}

/// Square crop of a frame, in pixels. May extend past the frame edges.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SquareRoi {
    pub center_x: f64,
    pub center_y: f64,
    pub size: f64,
}

impl SquareRoi {
    pub fn left(&self) -> f64 {
        self.center_x - self.size / 2.0
    }

    pub fn top(&self) -> f64 {
        self.center_y - self.size / 2.0
    }
}

/// Geometry of a letterboxed input: `input = frame * scale + pad`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Letterbox {
    pub scale: f64,
    pub pad_x: u32,
    pub pad_y: u32,
}

impl Letterbox {
    /// Maps a point from input-tensor space back to frame pixels.
    pub fn to_frame(&self, x: f64, y: f64) -> (f64, f64) {
        (
            (x - self.pad_x as f64) / self.scale,
            (y - self.pad_y as f64) / self.scale,
        )
    }
}

fn zeros(layout: TensorLayout, width: usize, height: usize, fill: f32) -> Array4<f32> {
    match layout {
        TensorLayout::Nchw => Array4::from_elem((1, 3, height, width), fill),
        TensorLayout::Nhwc => Array4::from_elem((1, height, width, 3), fill),
    }
}

fn put(tensor: &mut Array4<f32>, layout: TensorLayout, y: usize, x: usize, c: usize, value: f32) {
    match layout {
        TensorLayout::Nchw => tensor[[0, c, y, x]] = value,
        TensorLayout::Nhwc => tensor[[0, y, x, c]] = value,
    }
}

/// Stretches the whole frame to `width × height`.
pub fn resize_to_tensor(
    frame: &Frame,
    width: u32,
    height: u32,
    layout: TensorLayout,
    range: PixelRange,
) -> Array4<f32> {
    let src = frame.as_ndarray();
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;
    let (w, h) = (width as usize, height as usize);
    let mut tensor = zeros(layout, w, h, 0.0);

    for y in 0..h {
        let src_y = (((y as f64 + 0.5) * src_h as f64 / h as f64) as usize).min(src_h - 1);
        for x in 0..w {
            let src_x = (((x as f64 + 0.5) * src_w as f64 / w as f64) as usize).min(src_w - 1);
            for c in 0..3 {
                put(&mut tensor, layout, y, x, c, range.convert(src[[src_y, src_x, c]]));
            }
        }
    }

    tensor
}

/// Letterbox-resizes a frame into a `size × size` tensor, padding with
/// 114 gray (YOLO convention).
pub fn letterbox_to_tensor(
    frame: &Frame,
    size: u32,
    layout: TensorLayout) -> (Array4<f32>, Letterbox,
) {
    let fw = frame.width() as f64;
    let fh = frame.height() as f64;
    let target = size as f64;

    let scale = (target / fw).min(target / fh);
    let new_w = ((fw * scale).round() as u32).min(size);
    let new_h = ((fh * scale).round() as u32).min(size);
    let pad_x = (size - new_w) / 2;
    let pad_y = (size - new_h) / 2;

    let s = size as usize;
    let mut tensor = zeros(layout, s, s, 114.0 / 255.0);

    let src = frame.as_ndarray();
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;

    for y in 0..new_h as usize {
        let src_y = ((y as f64 / scale) as usize).min(src_h - 1);
        for x in 0..new_w as usize {
            let src_x = ((x as f64 / scale) as usize).min(src_w - 1);
            let ty = pad_y as usize + y;
            let tx = pad_x as usize + x;
            for c in 0..3 {
                put(&mut tensor, layout, ty, tx, c, src[[src_y, src_x, c]] as f32 / 255.0);
            }
        }
    }

    (tensor, Letterbox { scale, pad_x, pad_y })
}

/// Samples a square region of the frame into a `size × size` tensor.
/// Parts of the region outside the frame are black.
pub fn crop_to_tensor(
    frame: &Frame,
    roi: &SquareRoi,
    size: u32,
    layout: TensorLayout,
    range: PixelRange,
) -> Array4<f32> {
    let src = frame.as_ndarray();
    let src_h = frame.height() as f64;
    let src_w = frame.width() as f64;
    let s = size as usize;
    let step = roi.size / size as f64;
    let mut tensor = zeros(layout, s, s, range.convert(0));

    for y in 0..s {
        let sy = roi.top() + (y as f64 + 0.5) * step;
        if sy < 0.0 || sy >= src_h {
            continue;
        }
        for x in 0..s {
            let sx = roi.left() + (x as f64 + 0.5) * step;
            if sx < 0.0 || sx >= src_w {
                continue;
            }
            for c in 0..3 {
                let value = src[[sy as usize, sx as usize, c]];
                put(&mut tensor, layout, y, x, c, range.convert(value));
            }
        }
    }

    tensor
}
