// THEORY:
// A `Region` is one spatially connected patch of foreground in a color mask for
// a single frame. It is a "dumb" data container: a bounding box plus the pixel
// count of the component it was grown from. Regions are produced fresh every
// frame and carry no identity across frames.

/// A simple struct to represent a 2D point in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: u32,
    pub y: u32,
}

/// One connected foreground component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Region {
    /// Left edge of the bounding box.
    pub x: u32,
    /// Top edge of the bounding box.
    pub y: u32,
    /// Bounding box width in pixels.
    pub width: u32,
    /// Bounding box height in pixels.
    pub height: u32,
    /// Number of foreground pixels in the component.
    pub area: usize,
}

impl Region {
    /// Horizontal center in whole pixels, `x + width / 2`.
    pub fn center_x(&self) -> u32 {
        self.x + self.width / 2
    }

    pub fn center_y(&self) -> u32 {
        self.y + self.height / 2
    }

    /// Top-left and bottom-right (inclusive) corners.
    pub fn corners(&self) -> (Point, Point) {
        (
            Point {
                x: self.x,
                y: self.y,
            },
            Point {
                x: self.x + self.width.saturating_sub(1),
                y: self.y + self.height.saturating_sub(1),
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn center_uses_integer_half_width() {
        let region = Region {
            x: 525,
            y: 100,
            width: 51,
            height: 50,
            area: 2550,
        };
        assert_eq!(region.center_x(), 550);
        assert_eq!(region.center_y(), 125);
        assert_eq!(region.corners().1, Point { x: 575, y: 149 });
    }
}
