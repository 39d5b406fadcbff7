/// A landmark position in source-pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Row form `[x, y]`, matching the two-column shape of point results.
    pub fn to_row(self) -> [f64; 2] {
        [self.x, self.y]
    }
}

/// An axis-aligned box in source-pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Row form `[x, y, w, h]`, matching the four-column shape of box results.
    pub fn to_row(self) -> [f64; 4] {
        [self.x, self.y, self.width, self.height]
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }
}

/// Model-space landmark in `[0, 1]` relative coordinates.
///
/// Models may report values slightly outside the unit range for landmarks
/// near the frame edge; scaling clamps them.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NormalizedPoint {
    pub x: f64,
    pub y: f64,
}

impl NormalizedPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn to_pixels(self, width: u32, height: u32) -> Point {
        Point::new(
            self.x.clamp(0.0, 1.0) * width as f64,
            self.y.clamp(0.0, 1.0) * height as f64,
        )
    }
}

/// Model-space box: top-left corner and size, all relative to frame size.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NormalizedBox {
    pub xmin: f64,
    pub ymin: f64,
    pub width: f64,
    pub height: f64,
}

impl NormalizedBox {
    pub fn new(xmin: f64, ymin: f64, width: f64, height: f64) -> Self {
        Self {
            xmin,
            ymin,
            width,
            height,
        }
    }

    /// Scales to pixels, clipping the box to the frame.
    pub fn to_pixels(self, width: u32, height: u32) -> BoundingBox {
        let x1 = self.xmin.clamp(0.0, 1.0);
        let y1 = self.ymin.clamp(0.0, 1.0);
        let x2 = (self.xmin + self.width.max(0.0)).clamp(0.0, 1.0);
        let y2 = (self.ymin + self.height.max(0.0)).clamp(0.0, 1.0);
        let (fw, fh) = (width as f64, height as f64);
        BoundingBox::new(x1 * fw, y1 * fh, (x2 - x1) * fw, (y2 - y1) * fh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[test]
    fn test_point_scaling() {
        let p = NormalizedPoint::new(0.25, 0.5).to_pixels(640, 480);
        assert_relative_eq!(p.x, 160.0);
        assert_relative_eq!(p.y, 240.0);
    }

    #[rstest]
    #[case::negative(-0.2, -1.0, 0.0, 0.0)]
    #[case::beyond_one(1.3, 2.0, 100.0, 50.0)]
    #[case::edge(1.0, 1.0, 100.0, 50.0)]
    fn test_point_scaling_clamps(
        #[case] x: f64,
        #[case] y: f64,
        #[case] ex: f64,
        #[case] ey: f64,
    ) {
        let p = NormalizedPoint::new(x, y).to_pixels(100, 50);
        assert_relative_eq!(p.x, ex);
        assert_relative_eq!(p.y, ey);
    }

    #[test]
    fn test_box_scaling() {
        let b = NormalizedBox::new(0.1, 0.2, 0.5, 0.25).to_pixels(200, 100);
        assert_relative_eq!(b.x, 20.0);
        assert_relative_eq!(b.y, 20.0);
        assert_relative_eq!(b.width, 100.0);
        assert_relative_eq!(b.height, 25.0);
    }

    #[test]
    fn test_box_scaling_clips_to_frame() {
        // Box hangs off the top-left and bottom-right corners.
        let b = NormalizedBox::new(-0.1, 0.8, 0.5, 0.5).to_pixels(100, 100);
        assert_relative_eq!(b.x, 0.0);
        assert_relative_eq!(b.y, 80.0);
        assert_relative_eq!(b.width, 40.0);
        assert_relative_eq!(b.height, 20.0);
        assert!(b.right() <= 100.0);
        assert!(b.bottom() <= 100.0);
    }

    #[test]
    fn test_box_negative_size_collapses() {
        let b = NormalizedBox::new(0.5, 0.5, -0.2, -0.2).to_pixels(10, 10);
        assert_relative_eq!(b.width, 0.0);
        assert_relative_eq!(b.height, 0.0);
    }

    #[test]
    fn test_rows() {
        assert_eq!(Point::new(1.0, 2.0).to_row(), [1.0, 2.0]);
        assert_eq!(
            BoundingBox::new(1.0, 2.0, 3.0, 4.0).to_row(),
            [1.0, 2.0, 3.0, 4.0]
        );
    }
}
