// THEORY:
// The `color_mask` module turns an `HsvFrame` into a per-color binary mask and
// cleans it up. It is the first spatial stage of the pipeline.
//
// Algorithm steps:
// 1.  **Range Test**: A pixel is foreground iff all three channels sit inside the
//     profile's inclusive `[lower, upper]` range.
// 2.  **Opening** (erode, then dilate) removes isolated speckles smaller than the
//     structuring element.
// 3.  **Closing** (dilate, then erode) fills pinholes and thin gaps inside
//     solid regions.
//
// Both stages use a fixed 5x5 square element, which is the `LInf` ball of
// radius 2 in `imageproc::morphology`. Pixels outside the frame never influence
// the result: erosion only reacts to in-frame background and dilation only to
// in-frame foreground. A frame that is foreground everywhere therefore stays
// foreground everywhere.

use crate::core_modules::color_profile::ColorProfile;
use crate::core_modules::frame::HsvFrame;
use image::{GrayImage, Luma};
use imageproc::distance_transform::Norm;
use imageproc::morphology;

/// Side length of the square structuring element.
pub const KERNEL_SIZE: u8 = 5;
const KERNEL_RADIUS: u8 = KERNEL_SIZE / 2;

/// A row-major foreground/background grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryMask {
    pub width: u32,
    pub height: u32,
    data: Vec<bool>,
}

impl BinaryMask {
    /// An all-background mask.
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![false; width as usize * height as usize],
        }
    }

    /// An all-foreground mask.
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![true; width as usize * height as usize],
        }
    }

    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> bool) -> Self {
        let mut data = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            data,
        }
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// Reads a pixel; out-of-bounds reads are background.
    #[inline]
    pub fn get(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height && self.data[self.index(x, y)]
    }

    pub fn set(&mut self, x: u32, y: u32, value: bool) {
        if x < self.width && y < self.height {
            let i = self.index(x, y);
            self.data[i] = value;
        }
    }

    /// Number of foreground pixels.
    pub fn count(&self) -> usize {
        self.data.iter().filter(|&&on| on).count()
    }

    pub fn is_all_foreground(&self) -> bool {
        self.data.iter().all(|&on| on)
    }

    pub fn is_all_background(&self) -> bool {
        !self.data.iter().any(|&on| on)
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.data
    }

    /// Renders foreground as white, background as black.
    pub fn to_luma_image(&self) -> GrayImage {
        GrayImage::from_fn(self.width, self.height, |x, y| {
            Luma([if self.get(x, y) { 255 } else { 0 }])
        })
    }

    /// Foreground wherever the image is non-zero.
    pub fn from_luma_image(image: &GrayImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
            data: image.pixels().map(|p| p.0[0] > 0).collect(),
        }
    }

    pub fn erode(&self) -> Self {
        self.morph(morphology::erode)
    }

    pub fn dilate(&self) -> Self {
        self.morph(morphology::dilate)
    }

    /// Erosion followed by dilation.
    pub fn open(&self) -> Self {
        self.morph(morphology::open)
    }

    /// Dilation followed by erosion.
    pub fn close(&self) -> Self {
        self.morph(morphology::close)
    }

    fn morph(&self, op: fn(&GrayImage, Norm, u8) -> GrayImage) -> Self {
        if self.width == 0 || self.height == 0 {
            return self.clone();
        }
        Self::from_luma_image(&op(&self.to_luma_image(), Norm::LInf, KERNEL_RADIUS))
    }
}

/// Raw range test with no noise filtering.
pub fn threshold(hsv: &HsvFrame, profile: &ColorProfile) -> BinaryMask {
    BinaryMask {
        width: hsv.width,
        height: hsv.height,
        data: hsv.pixels().iter().map(|p| profile.contains(p)).collect(),
    }
}

/// Range test followed by one opening and one closing.
pub fn compute_mask(hsv: &HsvFrame, profile: &ColorProfile) -> BinaryMask {
    threshold(hsv, profile).open().close()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::color_profile::{CalibrationSet, DisplayTag};
    use crate::core_modules::frame::Frame;
    use crate::core_modules::pixel::HsvPixel;
    use image::{Rgb, RgbImage};

    fn red_profile() -> ColorProfile {
        ColorProfile::new("Red", [0, 120, 70], [10, 255, 255], DisplayTag([255, 0, 0])).unwrap()
    }

    fn hsv_of(image: RgbImage) -> HsvFrame {
        HsvFrame::from_frame(&Frame::new(image))
    }

    #[test]
    fn uniform_inside_color_is_all_foreground() {
        let hsv = hsv_of(RgbImage::from_pixel(40, 30, Rgb([220, 10, 10])));
        let mask = compute_mask(&hsv, &red_profile());
        assert!(mask.is_all_foreground());
    }

    #[test]
    fn uniform_outside_color_is_all_background() {
        let hsv = hsv_of(RgbImage::from_pixel(40, 30, Rgb([10, 220, 10])));
        let mask = compute_mask(&hsv, &red_profile());
        assert!(mask.is_all_background());
    }

    #[test]
    fn every_default_profile_accepts_its_range_edges() {
        for profile in CalibrationSet::defaults().iter() {
            for edge in [profile.lower(), profile.upper()] {
                let pixel = HsvPixel::new(edge[0], edge[1], edge[2]);
                let hsv = HsvFrame::from_pixels(12, 9, vec![pixel; 108]).unwrap();
                assert!(compute_mask(&hsv, profile).is_all_foreground(), "{}", profile.name());
            }

            let above = profile.upper()[0] + 1;
            let pixel = HsvPixel::new(above, profile.upper()[1], profile.upper()[2]);
            let hsv = HsvFrame::from_pixels(12, 9, vec![pixel; 108]).unwrap();
            assert!(compute_mask(&hsv, profile).is_all_background(), "{}", profile.name());
        }
    }

    #[test]
    fn opening_removes_speckles_smaller_than_the_kernel() {
        let mut mask = BinaryMask::empty(30, 30);
        for (x, y) in [(3, 3), (4, 3), (20, 10), (10, 25)] {
            mask.set(x, y, true);
        }
        assert!(mask.open().is_all_background());
    }

    #[test]
    fn opening_keeps_blocks_at_least_kernel_sized() {
        let mask =
            BinaryMask::from_fn(30, 30, |x, y| (10..20).contains(&x) && (5..15).contains(&y));
        assert_eq!(mask.open(), mask);
    }

    #[test]
    fn closing_fills_pinholes() {
        let mut mask =
            BinaryMask::from_fn(30, 30, |x, y| (5..25).contains(&x) && (5..25).contains(&y));
        mask.set(12, 12, false);
        mask.set(13, 12, false);
        let closed = mask.close();
        assert!(closed.get(12, 12));
        assert!(closed.get(13, 12));
        assert_eq!(closed.count(), 400);
    }

    #[test]
    fn morphology_ignores_pixels_outside_the_frame() {
        let full = BinaryMask::full(12, 9);
        assert!(full.erode().is_all_foreground());
        assert!(full.close().is_all_foreground());

        // A corner pixel grows into the in-frame part of its 5x5 window only.
        let mut corner = BinaryMask::empty(12, 9);
        corner.set(0, 0, true);
        assert_eq!(corner.dilate().count(), 9);
    }

    #[test]
    fn luma_rendering_matches_foreground() {
        let mut mask = BinaryMask::empty(4, 4);
        mask.set(1, 2, true);
        let image = mask.to_luma_image();
        assert_eq!(image.get_pixel(1, 2).0, [255]);
        assert_eq!(image.get_pixel(0, 0).0, [0]);
        assert_eq!(BinaryMask::from_luma_image(&image), mask);
    }
}
