use nalgebra as na;
use serde::{Deserialize, Serialize};

/// Pinhole camera matrix entries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pinhole {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
}

impl Pinhole {
    pub fn new(fx: f64, fy: f64, cx: f64, cy: f64) -> Pinhole {
        Pinhole { fx, fy, cx, cy }
    }

    pub fn matrix(&self) -> na::Matrix3<f64> {
        na::Matrix3::new(
            self.fx, 0.0, self.cx, //
            0.0, self.fy, self.cy, //
            0.0, 0.0, 1.0,
        )
    }
}

/// Interior region kept after rectification, in rectified pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Calibration of the monocular camera.
///
/// `camera` and `distortion` describe the raw lens (OpenCV radial-tangential
/// `[k1, k2, p1, p2, k3]`). `rectified` is the camera matrix of the
/// undistorted image, and `crop` the border-free window cut out of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    pub width: u32,
    pub height: u32,
    pub camera: Pinhole,
    pub distortion: [f64; 5],
    pub rectified: Pinhole,
    pub crop: CropRect,
}

impl Default for CameraIntrinsics {
    fn default() -> Self {
        Self {
            width: 640,
            height: 360,
            camera: Pinhole::new(394.83410645, 394.50994873, 304.59488242, 178.66114884),
            distortion: [
                -0.40538686,
                0.18274696,
                0.00449549,
                -0.00054929,
                0.06070349,
            ],
            rectified: Pinhole::new(482.05945726, 479.77705725, 305.34544298, 176.55010834),
            crop: CropRect {
                x: 20,
                y: 25,
                width: 590,
                height: 310,
            },
        }
    }
}

/// Focal length and principal point handed to relative pose recovery.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseIntrinsics {
    pub focal: f64,
    pub principal_point: (f64, f64),
}

impl PoseIntrinsics {
    pub fn new(focal: f64, principal_point: (f64, f64)) -> PoseIntrinsics {
        PoseIntrinsics {
            focal,
            principal_point,
        }
    }

    /// Pixel to normalized image plane.
    pub fn normalize(&self, p: &glam::Vec2) -> na::Point2<f64> {
        na::Point2::new(
            (p.x as f64 - self.principal_point.0) / self.focal,
            (p.y as f64 - self.principal_point.1) / self.focal,
        )
    }
}

impl CameraIntrinsics {
    /// Intrinsics of the cropped, rectified image.
    ///
    /// The principal point is shifted by the crop offset so that pose
    /// recovery sees the same camera that produced the pixels it matches.
    pub fn pose_intrinsics(&self) -> PoseIntrinsics {
        PoseIntrinsics::new(
            self.rectified.fx,
            (
                self.rectified.cx - self.crop.x as f64,
                self.rectified.cy - self.crop.y as f64,
            ),
        )
    }

    pub fn distortion_params(&self) -> na::DVector<f64> {
        let c = &self.camera;
        let d = &self.distortion;
        na::dvector![c.fx, c.fy, c.cx, c.cy, d[0], d[1], d[2], d[3], d[4]]
    }
}
