//! End to end runs over a result directory: two captures, rotation, the
//! five json files the inventory service consumes and the packed archive.

use std::path::Path;

use fridge_diff::{
    ADD_FILE, AddRecord, BBox, DELETE_FILE, DeleteRecord, DetectionSet, DifferConfig,
    JsonFileDetector, MATCH_FILE, MatchRecord, MatchStrategy, NEW_FILE, OLD_CROP_DIR, OLD_FILE,
    Pipeline, read_json,
};
use image::{Rgb, RgbImage};
use serde_json::json;

fn write_frame(dir: &Path, name: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    RgbImage::from_pixel(320, 240, Rgb([240, 240, 240]))
        .save(&path)
        .unwrap();
    path
}

fn write_detections(dir: &Path, name: &str, detections: serde_json::Value) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, detections.to_string()).unwrap();
    path
}

fn pipeline(result_dir: &Path, strategy: MatchStrategy) -> Pipeline {
    Pipeline::new(DifferConfig {
        result_dir: result_dir.to_path_buf(),
        strategy,
        ..DifferConfig::default()
    })
    .unwrap()
}

#[test]
fn test_two_captures_produce_match_add_and_delete() {
    let work = tempfile::tempdir().unwrap();
    let result_dir = work.path().join("result");
    let pipeline = pipeline(&result_dir, MatchStrategy::FirstMatch);
    let json_dir = result_dir.join("json");

    // first capture: milk (A), apple (B) and a low confidence box
    let frame = write_frame(work.path(), "capture_1.png");
    let first = write_detections(
        work.path(),
        "detections_1.json",
        json!([
            {"bounding_box": [10.4, 10.0, 60.0, 110.9], "confidence": 0.81, "label": "drinks"},
            {"bounding_box": [150.0, 100.0, 200.0, 150.0], "confidence": 0.77, "label": "fruit"},
            {"bounding_box": [250.0, 20.0, 300.0, 60.0], "confidence": 0.12, "label": "food"}
        ]),
    );

    let summary = pipeline
        .process(&frame, &mut JsonFileDetector::new(&first))
        .unwrap();

    assert!(summary.first_run);
    assert_eq!((summary.detected, summary.kept, summary.added), (3, 2, 2));
    let added: Vec<AddRecord> = read_json(&json_dir.join(ADD_FILE)).unwrap();
    assert_eq!(added.len(), 2);
    assert_eq!(added[0].bounding_box, BBox::new(10.0, 10.0, 60.0, 110.0));
    let matches: Vec<MatchRecord> = read_json(&json_dir.join(MATCH_FILE)).unwrap();
    assert!(matches.is_empty());
    assert!(result_dir.join("object_1.png").exists());

    // second capture: milk is gone, the apple moved slightly, cheese (C) appeared
    // and the detector reported the apple twice
    let frame = write_frame(work.path(), "capture_2.png");
    let second = write_detections(
        work.path(),
        "detections_2.json",
        json!([
            {"bounding_box": [154.0, 102.0, 204.0, 152.0], "confidence": 0.9, "label": "fruit"},
            {"bounding_box": [155.0, 101.0, 203.0, 151.0], "confidence": 0.6, "label": "food"},
            {"bounding_box": [20.0, 160.0, 90.0, 230.0], "confidence": 0.7, "label": "grocery"}
        ]),
    );

    let summary = pipeline
        .process(&frame, &mut JsonFileDetector::new(&second))
        .unwrap();

    assert!(!summary.first_run);
    assert_eq!(summary.kept, 2);
    assert_eq!((summary.matched, summary.added, summary.deleted), (1, 1, 1));

    let previous: DetectionSet = read_json(&json_dir.join(OLD_FILE)).unwrap();
    let current: DetectionSet = read_json(&json_dir.join(NEW_FILE)).unwrap();
    assert_eq!(previous.len(), 2);
    assert_eq!(current.len(), 2);

    let matches: Vec<MatchRecord> = read_json(&json_dir.join(MATCH_FILE)).unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!((matches[0].old_object_id, matches[0].new_object_id), (1, 0));
    assert!(matches[0].iou > 0.5);

    let deleted: Vec<DeleteRecord> = read_json(&json_dir.join(DELETE_FILE)).unwrap();
    assert_eq!(
        deleted,
        vec![DeleteRecord {
            old_object_id: 0,
            bounding_box: BBox::new(10.0, 10.0, 60.0, 110.0),
        }]
    );

    let added: Vec<AddRecord> = read_json(&json_dir.join(ADD_FILE)).unwrap();
    assert_eq!(
        added,
        vec![AddRecord {
            new_object_id: 1,
            bounding_box: BBox::new(20.0, 160.0, 90.0, 230.0),
        }]
    );
}

#[test]
fn test_unchanged_fridge_matches_everything() {
    let work = tempfile::tempdir().unwrap();
    let result_dir = work.path().join("result");
    let pipeline = pipeline(&result_dir, MatchStrategy::Optimal);
    let frame = write_frame(work.path(), "capture.png");
    let detections = write_detections(
        work.path(),
        "detections.json",
        json!([
            {"bounding_box": [10.0, 10.0, 60.0, 110.0], "confidence": 0.8, "label": "drinks"},
            {"bounding_box": [150.0, 100.0, 200.0, 150.0], "confidence": 0.8, "label": "fruit"}
        ]),
    );

    for _ in 0..2 {
        pipeline
            .process(&frame, &mut JsonFileDetector::new(&detections))
            .unwrap();
    }

    let matches: Vec<MatchRecord> =
        read_json(&result_dir.join("json").join(MATCH_FILE)).unwrap();
    assert_eq!(matches.len(), 2);
    assert!(matches.iter().all(|m| m.iou == 1.0));
    let added: Vec<AddRecord> = read_json(&result_dir.join("json").join(ADD_FILE)).unwrap();
    let deleted: Vec<DeleteRecord> =
        read_json(&result_dir.join("json").join(DELETE_FILE)).unwrap();
    assert!(added.is_empty() && deleted.is_empty());
}

#[test]
fn test_unreadable_image_keeps_previous_generation() {
    let work = tempfile::tempdir().unwrap();
    let result_dir = work.path().join("result");
    let pipeline = pipeline(&result_dir, MatchStrategy::FirstMatch);
    let frame = write_frame(work.path(), "capture.png");
    let detections = write_detections(
        work.path(),
        "detections.json",
        json!([{"bounding_box": [1.0, 1.0, 50.0, 50.0], "confidence": 0.9, "label": "meat"}]),
    );
    pipeline
        .process(&frame, &mut JsonFileDetector::new(&detections))
        .unwrap();

    let broken = work.path().join("broken.png");
    std::fs::write(&broken, b"not a png").unwrap();

    assert!(
        pipeline
            .process(&broken, &mut JsonFileDetector::new(&detections))
            .is_err()
    );
    assert!(result_dir.join("json").join(NEW_FILE).exists());
    assert!(!result_dir.join("json").join(OLD_FILE).exists());
}

#[test]
fn test_previous_crops_follow_their_records() {
    let work = tempfile::tempdir().unwrap();
    let result_dir = work.path().join("result");
    let pipeline = pipeline(&result_dir, MatchStrategy::FirstMatch);
    let frame = write_frame(work.path(), "capture.png");

    // butter and a jar of jam, then only a yogurt cup in a new spot
    let first = write_detections(
        work.path(),
        "detections_1.json",
        json!([
            {"bounding_box": [0.0, 0.0, 10.0, 10.0], "confidence": 0.9, "label": "dairy"},
            {"bounding_box": [50.0, 50.0, 90.0, 90.0], "confidence": 0.9, "label": "jar"}
        ]),
    );
    let second = write_detections(
        work.path(),
        "detections_2.json",
        json!([{"bounding_box": [20.0, 20.0, 30.0, 40.0], "confidence": 0.9, "label": "dairy"}]),
    );
    pipeline
        .process(&frame, &mut JsonFileDetector::new(&first))
        .unwrap();
    let summary = pipeline
        .process(&frame, &mut JsonFileDetector::new(&second))
        .unwrap();
    assert_eq!((summary.added, summary.deleted), (1, 2));

    let previous: DetectionSet = read_json(&result_dir.join("json").join(OLD_FILE)).unwrap();
    assert_eq!(previous.len(), 2);
    for detection in &previous {
        let image_path = detection.image_path.as_ref().unwrap();
        assert!(image_path.starts_with(OLD_CROP_DIR));

        let crop = image::open(result_dir.join(image_path)).unwrap();
        assert_eq!(
            (crop.width() as f64, crop.height() as f64),
            (detection.bbox.width(), detection.bbox.height())
        );
    }

    let current: DetectionSet = read_json(&result_dir.join("json").join(NEW_FILE)).unwrap();
    let crop = image::open(result_dir.join(current.as_slice()[0].image_path.as_ref().unwrap()))
        .unwrap();
    assert_eq!((crop.width(), crop.height()), (10, 20));
    assert!(!result_dir.join("object_1.png").exists());
}

#[test]
fn test_result_dir_is_packed_next_to_it() {
    let work = tempfile::tempdir().unwrap();
    let result_dir = work.path().join("result");
    let pipeline = pipeline(&result_dir, MatchStrategy::FirstMatch);
    let frame = write_frame(work.path(), "capture.png");
    let detections = write_detections(
        work.path(),
        "detections.json",
        json!([{"bounding_box": [5.0, 5.0, 45.0, 85.0], "confidence": 0.8, "label": "drinks"}]),
    );

    for _ in 0..2 {
        pipeline
            .process(&frame, &mut JsonFileDetector::new(&detections))
            .unwrap();
    }

    let file = std::fs::File::open(work.path().join("data.zip")).unwrap();
    let archive = zip::ZipArchive::new(file).unwrap();
    let mut names: Vec<&str> = archive.file_names().collect();
    names.sort();
    assert_eq!(
        names,
        vec![
            "json/add.json",
            "json/delete.json",
            "json/match.json",
            "json/new.json",
            "json/old.json",
            "object_0.png",
            "old/object_0.png",
        ]
    );
}
