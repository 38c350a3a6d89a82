mod common;

use common::noise_image;
use image::GrayImage;
use mono_visual_odometry::OdometryError;
use mono_visual_odometry::camera_model::{CameraIntrinsics, CameraModel, CropRect, Pinhole, to_gray};

#[test]
fn rectified_frame_has_crop_size() {
    let camera = CameraModel::new(CameraIntrinsics::default()).unwrap();
    let raw = noise_image(640, 360, 1);
    let rectified = camera.rectify(&raw);
    assert_eq!(rectified.dimensions(), (590, 310));
    assert_eq!(camera.output_size(), (590, 310));
    assert!(camera.expects(640, 360));
    assert!(!camera.expects(360, 640));
}

#[test]
fn default_pose_intrinsics_follow_the_crop() {
    let intrinsics = CameraIntrinsics::default();
    let pose = intrinsics.pose_intrinsics();
    assert!((pose.focal - 482.05945726).abs() < 1e-9);
    assert!((pose.principal_point.0 - (305.34544298 - 20.0)).abs() < 1e-9);
    assert!((pose.principal_point.1 - (176.55010834 - 25.0)).abs() < 1e-9);
    let centre = pose.normalize(&glam::Vec2::new(
        pose.principal_point.0 as f32,
        pose.principal_point.1 as f32,
    ));
    assert!(centre.x.abs() < 1e-6 && centre.y.abs() < 1e-6);
}

#[test]
fn zero_distortion_is_identity() {
    let k = Pinhole::new(300.0, 300.0, 80.0, 60.0);
    let intrinsics = CameraIntrinsics {
        width: 160,
        height: 120,
        camera: k,
        distortion: [0.0; 5],
        rectified: k,
        crop: CropRect {
            x: 0,
            y: 0,
            width: 160,
            height: 120,
        },
    };
    let camera = CameraModel::new(intrinsics).unwrap();
    let raw = noise_image(160, 120, 7);
    let rectified = camera.rectify(&raw);
    for y in 1..119 {
        for x in 1..159 {
            let a = raw.get_pixel(x, y)[0] as i32;
            let b = rectified.get_pixel(x, y)[0] as i32;
            assert!((a - b).abs() <= 1, "({}, {}): {} vs {}", x, y, a, b);
        }
    }
}

#[test]
fn ramp_stays_monotone_after_rectification() {
    let camera = CameraModel::new(CameraIntrinsics::default()).unwrap();
    let mut raw = GrayImage::new(640, 360);
    for y in 0..360 {
        for x in 0..640 {
            raw.put_pixel(x, y, image::Luma([(x / 4) as u8]));
        }
    }
    let rectified = camera.rectify(&raw);
    // horizontal ramp stays monotone along the central row
    let row = 155;
    let mut last = 0u8;
    for x in 0..590 {
        let v = rectified.get_pixel(x, row)[0];
        assert!(v + 1 >= last, "x = {}", x);
        last = v;
    }
}

#[test]
fn crop_outside_the_frame_is_rejected() {
    let intrinsics = CameraIntrinsics {
        crop: CropRect {
            x: 100,
            y: 0,
            width: 600,
            height: 100,
        },
        ..CameraIntrinsics::default()
    };
    assert!(matches!(
        CameraModel::new(intrinsics),
        Err(OdometryError::MalformedInput { .. })
    ));
}

#[test]
fn overflowing_crop_is_rejected() {
    for crop in [
        CropRect {
            x: u32::MAX,
            y: 0,
            width: 10,
            height: 10,
        },
        CropRect {
            x: 0,
            y: u32::MAX - 5,
            width: 10,
            height: 10,
        },
    ] {
        let intrinsics = CameraIntrinsics {
            crop,
            ..CameraIntrinsics::default()
        };
        assert!(matches!(
            CameraModel::new(intrinsics),
            Err(OdometryError::MalformedInput { .. })
        ));
    }
}

#[test]
fn color_frames_become_gray() {
    let color = image::DynamicImage::new_rgb8(8, 4);
    let gray = to_gray(&color);
    assert_eq!(gray.dimensions(), (8, 4));
}
