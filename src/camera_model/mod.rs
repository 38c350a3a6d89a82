pub mod generic;
pub mod intrinsics;

pub use intrinsics::{CameraIntrinsics, CropRect, Pinhole, PoseIntrinsics};

use camera_intrinsic_model::{GenericModel, OpenCVModel5};
use image::{DynamicImage, GrayImage};
use nalgebra as na;

use crate::error::{OdometryError, Result};

/// Fixed calibration plus the precomputed rectification maps.
///
/// The maps are built once, so every call to [`CameraModel::rectify`] is a
/// pure lookup followed by a crop.
pub struct CameraModel {
    intrinsics: CameraIntrinsics,
    xmap: na::DMatrix<f32>,
    ymap: na::DMatrix<f32>,
}

impl CameraModel {
    pub fn new(intrinsics: CameraIntrinsics) -> Result<CameraModel> {
        let crop = &intrinsics.crop;
        if intrinsics.width == 0 || intrinsics.height == 0 {
            return Err(OdometryError::EmptyFrame);
        }
        let right = crop.x.checked_add(crop.width);
        let bottom = crop.y.checked_add(crop.height);
        let fits = matches!(
            (right, bottom),
            (Some(r), Some(b)) if r <= intrinsics.width && b <= intrinsics.height
        );
        if crop.width == 0 || crop.height == 0 || !fits {
            return Err(OdometryError::MalformedInput {
                expected: (intrinsics.width, intrinsics.height),
                got: (right.unwrap_or(u32::MAX), bottom.unwrap_or(u32::MAX)),
            });
        }
        let lens = GenericModel::OpenCVModel5(OpenCVModel5::new(
            &intrinsics.distortion_params(),
            intrinsics.width,
            intrinsics.height,
        ));
        let (xmap, ymap) = generic::init_undistort_map(
            &lens,
            &intrinsics.rectified.matrix(),
            (intrinsics.width, intrinsics.height),
        );
        log::debug!(
            "rectification maps ready for {}x{}, crop {:?}",
            intrinsics.width,
            intrinsics.height,
            intrinsics.crop
        );
        Ok(CameraModel {
            intrinsics,
            xmap,
            ymap,
        })
    }

    pub fn intrinsics(&self) -> &CameraIntrinsics {
        &self.intrinsics
    }

    pub fn pose_intrinsics(&self) -> PoseIntrinsics {
        self.intrinsics.pose_intrinsics()
    }

    /// True when a frame of this size can be rectified.
    pub fn expects(&self, width: u32, height: u32) -> bool {
        width == self.intrinsics.width && height == self.intrinsics.height
    }

    pub fn output_size(&self) -> (u32, u32) {
        (self.intrinsics.crop.width, self.intrinsics.crop.height)
    }

    /// Undistorts `raw` and cuts out the crop window.
    ///
    /// `raw` must have the calibration resolution; callers check with
    /// [`CameraModel::expects`] first.
    pub fn rectify(&self, raw: &GrayImage) -> GrayImage {
        debug_assert!(self.expects(raw.width(), raw.height()));
        let undistorted = generic::remap(raw, &self.xmap, &self.ymap);
        let c = &self.intrinsics.crop;
        image::imageops::crop_imm(&undistorted, c.x, c.y, c.width, c.height).to_image()
    }
}

pub fn to_gray(frame: &DynamicImage) -> GrayImage {
    frame.to_luma8()
}
