// THEORY:
// The `overlay` module turns a snapshot back into a picture a person can check
// calibration against. In full detection mode it draws each region's bounding
// box over the source frame in its profile's display color. In preview mode it
// shows the raw threshold mask instead, which is what an operator tunes the
// sliders against. Zone edges can be drawn as vertical markers in either mode.

use crate::core_modules::color_profile::CalibrationSet;
use crate::core_modules::snapshot::DetectionSnapshot;
use crate::core_modules::zone_classifier::{BoundaryRule, ZoneLayout};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;

const MARKER_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

/// What to draw on top of the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayOptions {
    pub boxes: bool,
    pub zone_markers: bool,
}

impl Default for OverlayOptions {
    fn default() -> Self {
        Self {
            boxes: true,
            zone_markers: true,
        }
    }
}

/// Renders `snapshot`; `None` before the first frame has been processed.
pub fn render(
    snapshot: &DetectionSnapshot,
    calibration: &CalibrationSet,
    options: &OverlayOptions,
) -> Option<RgbImage> {
    let frame = snapshot.frame.as_ref()?;

    let mut canvas = match &snapshot.preview_mask {
        Some(mask) => image::DynamicImage::ImageLuma8(mask.to_luma_image()).to_rgb8(),
        None => frame.image().clone(),
    };

    if options.boxes {
        for (color, detection) in &snapshot.detections {
            let Some(profile) = calibration.get(color) else {
                continue;
            };
            let tag = Rgb(profile.display().0);
            for region in &detection.regions {
                if region.width == 0 || region.height == 0 {
                    continue;
                }
                let rect = Rect::at(region.x as i32, region.y as i32)
                    .of_size(region.width, region.height);
                draw_hollow_rect_mut(&mut canvas, rect, tag);
            }
        }
    }

    if options.zone_markers {
        let layout =
            ZoneLayout::new(snapshot.frame_width, snapshot.zone_count, BoundaryRule::Floor);
        let bottom = snapshot.frame_height.saturating_sub(1) as f32;
        for x in layout.boundaries() {
            draw_line_segment_mut(&mut canvas, (x as f32, 0.0), (x as f32, bottom), MARKER_COLOR);
        }
    }

    Some(canvas)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::color_mask::BinaryMask;
    use crate::core_modules::frame::Frame;
    use crate::core_modules::region::Region;
    use crate::core_modules::snapshot::{ColorDetection, DetectionMode};
    use std::sync::Arc;

    fn snapshot_with_red_box() -> DetectionSnapshot {
        let frame = Frame::new(RgbImage::from_pixel(90, 30, Rgb([0, 0, 0])));
        let mut snapshot = DetectionSnapshot::empty(3);
        snapshot.frame_width = 90;
        snapshot.frame_height = 30;
        snapshot.frame = Some(Arc::new(frame));
        snapshot.detections.insert(
            "Red".into(),
            ColorDetection {
                zones: vec![0],
                regions: vec![Region {
                    x: 5,
                    y: 5,
                    width: 10,
                    height: 10,
                    area: 100,
                }],
            },
        );
        snapshot
    }

    #[test]
    fn nothing_to_render_before_the_first_frame() {
        let snapshot = DetectionSnapshot::empty(3);
        let calibration = CalibrationSet::defaults();
        assert!(render(&snapshot, &calibration, &OverlayOptions::default()).is_none());
    }

    #[test]
    fn boxes_use_the_display_tag_and_markers_sit_on_zone_edges() {
        let image = render(
            &snapshot_with_red_box(),
            &CalibrationSet::defaults(),
            &OverlayOptions::default(),
        )
        .unwrap();

        assert_eq!(image.get_pixel(5, 5).0, [255, 0, 0]);
        assert_eq!(image.get_pixel(14, 14).0, [255, 0, 0]);
        assert_eq!(image.get_pixel(10, 10).0, [0, 0, 0]);
        assert_eq!(image.get_pixel(30, 20).0, [255, 255, 255]);
        assert_eq!(image.get_pixel(60, 20).0, [255, 255, 255]);
        assert_eq!(image.get_pixel(45, 20).0, [0, 0, 0]);
    }

    #[test]
    fn preview_shows_the_raw_mask() {
        let mut snapshot = snapshot_with_red_box();
        let mut mask = BinaryMask::empty(90, 30);
        mask.set(50, 2, true);
        snapshot.mode = DetectionMode::Preview("Red".into());
        snapshot.preview_mask = Some(mask);

        let options = OverlayOptions {
            boxes: false,
            zone_markers: false,
        };
        let image = render(&snapshot, &CalibrationSet::defaults(), &options).unwrap();
        assert_eq!(image.get_pixel(50, 2).0, [255, 255, 255]);
        assert_eq!(image.get_pixel(51, 2).0, [0, 0, 0]);
    }
}
