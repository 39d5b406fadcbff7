//! SSD anchor generation for MediaPipe-style single-shot detectors.

/// Anchor centers, in `[0, 1]` relative coordinates, for a square
/// `input_size` model with the given `(stride, anchors_per_cell)` layers.
///
/// Anchors are emitted layer by layer, row-major, with every anchor of a
/// cell sharing its center (fixed anchor size).
pub fn generate_anchors(input_size: u32, layers: &[(usize, usize)]) -> Vec<[f32; 2]> {
    let total = layers
        .iter()
        .map(|&(stride, num)| {
            let grid = input_size as usize / stride;
            grid * grid * num
        })
        .sum();
    let mut anchors = Vec::with_capacity(total);

    for &(stride, num) in layers {
        let grid_size = input_size as usize / stride;
        for y in 0..grid_size {
            for x in 0..grid_size {
                let cx = (x as f32 + 0.5) / grid_size as f32;
                let cy = (y as f32 + 0.5) / grid_size as f32;
                for _ in 0..num {
                    anchors.push([cx, cy]);
                }
            }
        }
    }

    anchors
}
