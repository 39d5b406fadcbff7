/// Per-pixel foreground confidence in `[0, 1]`, at model resolution.
#[derive(Clone, Debug, PartialEq)]
pub struct SegmentationMask {
    values: Vec<f32>,
    width: u32,
    height: u32,
}

impl SegmentationMask {
    pub fn new(
        values: Vec<f32>,
        width: u32,
        height: u32,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        if width == 0 || height == 0 {
            return Err(format!("Segmentation mask must not be empty, got {width}x{height}").into());
        }
        let expected = width as usize * height as usize;
        if values.len() != expected {
            return Err(format!(
                "Segmentation mask has {} values, expected {expected} for {width}x{height}",
                values.len()
            )
            .into());
        }
        Ok(Self {
            values,
            width,
            height,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn at(&self, x: u32, y: u32) -> f32 {
        self.values[y as usize * self.width as usize + x as usize]
    }

    /// Bilinear confidence at pixel `(x, y)` of a `frame_width × frame_height`
    /// frame, with pixel centers aligned between the two grids.
    pub fn sample(&self, x: u32, y: u32, frame_width: u32, frame_height: u32) -> f32 {
        let mx = ((x as f32 + 0.5) * self.width as f32 / frame_width as f32 - 0.5)
            .clamp(0.0, (self.width - 1) as f32);
        let my = ((y as f32 + 0.5) * self.height as f32 / frame_height as f32 - 0.5)
            .clamp(0.0, (self.height - 1) as f32);

        let x0 = mx.floor() as u32;
        let y0 = my.floor() as u32;
        let x1 = (x0 + 1).min(self.width - 1);
        let y1 = (y0 + 1).min(self.height - 1);
        let fx = mx - x0 as f32;
        let fy = my - y0 as f32;

        let top = self.at(x0, y0) * (1.0 - fx) + self.at(x1, y0) * fx;
        let bottom = self.at(x0, y1) * (1.0 - fx) + self.at(x1, y1) * fx;
        top * (1.0 - fy) + bottom * fy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_rejects_mismatched_length() {
        assert!(SegmentationMask::new(vec![0.0; 5], 2, 2).is_err());
        assert!(SegmentationMask::new(vec![], 0, 0).is_err());
    }

    #[test]
    fn test_sample_same_resolution_is_exact() {
        let mask = SegmentationMask::new(vec![0.0, 1.0, 0.25, 0.75], 2, 2).unwrap();
        assert_relative_eq!(mask.sample(1, 0, 2, 2), 1.0);
        assert_relative_eq!(mask.sample(0, 1, 2, 2), 0.25);
    }

    #[test]
    fn test_sample_interpolates_between_cells() {
        let mask = SegmentationMask::new(vec![0.0, 1.0], 2, 1).unwrap();
        // 4-wide frame: centers of pixels 1 and 2 fall between the mask cells
        assert_relative_eq!(mask.sample(1, 0, 4, 1), 0.25);
        assert_relative_eq!(mask.sample(2, 0, 4, 1), 0.75);
        // Edges clamp to the nearest cell
        assert_relative_eq!(mask.sample(0, 0, 4, 1), 0.0);
        assert_relative_eq!(mask.sample(3, 0, 4, 1), 1.0);
    }

    #[test]
    fn test_single_cell_mask() {
        let mask = SegmentationMask::new(vec![0.6], 1, 1).unwrap();
        assert_relative_eq!(mask.sample(7, 3, 10, 10), 0.6);
    }
}
