use mono_visual_odometry::camera_model::CameraIntrinsics;
use mono_visual_odometry::data_loader::{FrameSource, ImageSequence, path_to_timestamp};
use mono_visual_odometry::io::{
    TrajectoryEntry, object_from_json, object_to_json, trajectory_entries, write_report,
};
use mono_visual_odometry::odometry::{MatchSummary, TimingStats};
use mono_visual_odometry::{FrameReport, FrameState, OdometryConfig};

fn report(frame_index: usize, translation: Option<[f64; 3]>) -> FrameReport {
    FrameReport {
        frame_index,
        state: if translation.is_some() {
            FrameState::Tracking
        } else {
            FrameState::AwaitingSecondFrame
        },
        num_keypoints: 100,
        matches: MatchSummary {
            matched: frame_index > 0,
            ..MatchSummary::default()
        },
        pose_updated: translation.is_some(),
        translation,
        timing: TimingStats {
            total_ms: 2.0,
            ..TimingStats::default()
        },
    }
}

#[test]
fn config_round_trips_through_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    let mut config = OdometryConfig::default().with_reorthonormalization(50);
    config.matcher.ratio = 0.7;
    config.trajectory.scale = 8.0;
    object_to_json(&path, &config).unwrap();
    let loaded: OdometryConfig = object_from_json(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn partial_config_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("partial.json");
    std::fs::write(&path, r#"{ "matcher": { "min_matches": 25 }, "seed": 3 }"#).unwrap();
    let loaded: OdometryConfig = object_from_json(&path).unwrap();
    assert_eq!(loaded.matcher.min_matches, 25);
    assert_eq!(loaded.matcher.ratio, 0.8);
    assert_eq!(loaded.seed, 3);
    assert_eq!(loaded.camera, CameraIntrinsics::default());
    assert_eq!(loaded.reorthonormalize_every, None);
}

#[test]
fn missing_or_broken_files_are_errors() {
    let dir = tempfile::tempdir().unwrap();
    assert!(object_from_json::<OdometryConfig, _>(dir.path().join("nope.json")).is_err());
    let path = dir.path().join("broken.json");
    std::fs::write(&path, "{ not json").unwrap();
    assert!(object_from_json::<OdometryConfig, _>(&path).is_err());
}

#[test]
fn timestamps_come_from_file_stems() {
    assert_eq!(
        path_to_timestamp(std::path::Path::new("/data/1403636579763555584.png")),
        Some(1403636579763555584)
    );
    assert_eq!(path_to_timestamp(std::path::Path::new("frame_a.png")), None);
}

#[test]
fn image_sequence_is_sorted_and_strided() {
    let dir = tempfile::tempdir().unwrap();
    let cam = dir.path().join("cam0");
    std::fs::create_dir_all(&cam).unwrap();
    for stem in [300, 100, 500, 200, 400] {
        image::GrayImage::new(4, 3)
            .save(cam.join(format!("{}.png", stem)))
            .unwrap();
    }
    std::fs::write(cam.join("notes.txt"), "ignored").unwrap();

    let all = ImageSequence::new(dir.path(), 0, 1).unwrap();
    assert_eq!(all.len(), 5);
    let strided = ImageSequence::new(dir.path(), 1, 2).unwrap();
    let stems: Vec<i64> = (0..strided.len()).map(|i| strided.timestamp(i)).collect();
    assert_eq!(stems, vec![200, 400]);

    let mut source = strided;
    let first = source.next_frame().unwrap().unwrap();
    assert_eq!(first.index, 0);
    assert_eq!(first.time_ns, 200);
    assert_eq!((first.image.width(), first.image.height()), (4, 3));
    assert!(source.next_frame().unwrap().is_ok());
    assert!(source.next_frame().is_none());
}

#[test]
fn unnamed_frames_get_synthetic_timestamps() {
    let dir = tempfile::tempdir().unwrap();
    for name in ["a.jpg", "b.jpg"] {
        image::RgbImage::new(2, 2).save(dir.path().join(name)).unwrap();
    }
    let sequence = ImageSequence::new(dir.path(), 0, 1).unwrap();
    assert_eq!(sequence.timestamp(0), 0);
    assert_eq!(sequence.timestamp(1), 100_000_000);
}

#[test]
fn unreadable_frame_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("0.png");
    std::fs::write(&path, b"not a png").unwrap();
    let mut source = ImageSequence::from_paths(vec![path]);
    assert!(source.next_frame().unwrap().is_err());
    assert!(source.next_frame().is_none());
}

#[test]
fn only_tracked_frames_enter_the_trajectory() {
    let reports = vec![
        report(0, None),
        report(1, Some([-1.0, 0.0, 0.0])),
        report(2, Some([-2.0, 0.1, 0.0])),
    ];
    let entries = trajectory_entries(reports.iter().zip([10, 20, 30]));
    assert_eq!(
        entries,
        vec![
            TrajectoryEntry {
                frame_index: 1,
                time_ns: 20,
                translation: [-1.0, 0.0, 0.0],
            },
            TrajectoryEntry {
                frame_index: 2,
                time_ns: 30,
                translation: [-2.0, 0.1, 0.0],
            },
        ]
    );

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("trajectory.json");
    object_to_json(&path, &entries).unwrap();
    let loaded: Vec<TrajectoryEntry> = object_from_json(&path).unwrap();
    assert_eq!(loaded, entries);
}

#[test]
fn report_summarizes_the_run() {
    let reports = vec![report(0, None), report(1, Some([-1.0, 0.0, 0.0]))];
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.txt");
    write_report(&path, &reports).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("frames: 2"));
    assert!(text.contains("matched frames: 1"));
    assert!(text.contains("pose updates: 1"));
    assert!(text.contains("final translation: [-1.00000, 0.00000, 0.00000]"));
}
