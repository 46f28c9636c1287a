use image::{Rgb, RgbImage};
use std::sync::Arc;
use zone_vision::core_modules::color_mask::{BinaryMask, compute_mask};
use zone_vision::core_modules::frame::HsvFrame;
use zone_vision::core_modules::region_extractor::extract_regions;
use zone_vision::core_modules::zone_classifier::classify;
use zone_vision::pipeline::detect;
use zone_vision::{
    BoundaryRule, CalibrationSet, CalibrationStore, ColorProfile, DetectionPipeline, DisplayTag,
    Frame, PipelineConfig, encode,
};

fn red_only() -> CalibrationSet {
    let mut set = CalibrationSet::new();
    let red = ColorProfile::new("Red", [0, 120, 70], [10, 255, 255], DisplayTag([255, 0, 0]));
    set.insert(red.unwrap());
    set
}

/// A black 640x480 frame with a red block of `size` centered at (`cx`, `cy`).
fn red_block_frame(cx: u32, cy: u32, size: u32) -> Frame {
    let mut image = RgbImage::from_pixel(640, 480, Rgb([0, 0, 0]));
    let (x0, y0) = (cx - size / 2, cy - size / 2);
    for y in y0..y0 + size {
        for x in x0..x0 + size {
            image.put_pixel(x, y, Rgb([230, 15, 15]));
        }
    }
    Frame::new(image)
}

#[test]
fn red_block_right_of_center_lands_in_the_last_of_three_zones() {
    let pipeline =
        DetectionPipeline::with_calibration(PipelineConfig::default(), red_only()).unwrap();
    pipeline.process_frame(red_block_frame(550, 240, 50));

    let zones = pipeline.query("Red").unwrap();
    assert_eq!(zones, [2]);
    assert_eq!(encode(&zones), b"2");

    let snapshot = pipeline.snapshot();
    let regions = &snapshot.detections["Red"].regions;
    assert_eq!(regions.len(), 1);
    assert_eq!((regions[0].x, regions[0].width, regions[0].area), (525, 50, 2500));
}

#[test]
fn empty_mask_encodes_to_an_empty_message() {
    let mask = BinaryMask::empty(640, 480);
    let zones = classify(&extract_regions(&mask, 300), 640, 3);
    assert!(zones.is_empty());
    assert_eq!(encode(&zones), b"");
}

#[test]
fn frame_without_the_color_reports_no_zones() {
    let frame = Frame::new(RgbImage::from_pixel(640, 480, Rgb([30, 30, 200])));
    let hsv = HsvFrame::from_frame(&frame);
    let profile = red_only().get("Red").cloned().unwrap();
    assert!(compute_mask(&hsv, &profile).is_all_background());

    let snapshot = detect(Arc::new(frame), &red_only(), None, &PipelineConfig::default());
    assert!(snapshot.zones("Red").is_empty());
}

#[test]
fn four_zone_configuration_splits_the_frame_in_quarters() {
    let config = PipelineConfig {
        zone_count: 4,
        ..PipelineConfig::default()
    };
    let pipeline = DetectionPipeline::with_calibration(config, red_only()).unwrap();

    pipeline.process_frame(red_block_frame(80, 240, 40));
    assert_eq!(pipeline.query("Red").unwrap(), [0]);
    pipeline.process_frame(red_block_frame(400, 240, 40));
    assert_eq!(pipeline.query("Red").unwrap(), [2]);
    pipeline.process_frame(red_block_frame(600, 240, 40));
    assert_eq!(pipeline.query("Red").unwrap(), [3]);
}

#[test]
fn boundary_rule_decides_centers_on_a_zone_edge() {
    // 640 / 4 = 160: a block centered there sits on the 0|1 edge.
    let frame = Arc::new(red_block_frame(160, 240, 40));
    let floor = PipelineConfig {
        zone_count: 4,
        ..PipelineConfig::default()
    };
    let ceil = PipelineConfig {
        boundary_rule: BoundaryRule::Ceil,
        ..floor.clone()
    };

    assert_eq!(detect(Arc::clone(&frame), &red_only(), None, &floor).zones("Red"), [1]);
    assert_eq!(detect(frame, &red_only(), None, &ceil).zones("Red"), [0]);
}

#[test]
fn saved_calibration_drives_a_fresh_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let store = CalibrationStore::new(dir.path().join("calibration.json"));

    // Narrow Red so the test block (saturation 238) falls outside.
    let mut set = CalibrationSet::defaults();
    let narrowed = set
        .get("Red")
        .unwrap()
        .with_bounds([0, 245, 70], [10, 255, 255])
        .unwrap();
    set.insert(narrowed);
    store.save(&set).unwrap();

    let report = store.load();
    assert!(report.is_clean());
    let pipeline =
        DetectionPipeline::with_calibration(PipelineConfig::default(), report.set).unwrap();
    pipeline.process_frame(red_block_frame(550, 240, 50));
    assert!(pipeline.query("Red").unwrap().is_empty());
}
