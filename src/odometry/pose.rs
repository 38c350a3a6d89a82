use nalgebra as na;

use crate::pose_estimator::RelativePose;

/// Running rotation and translation integrated from relative poses.
#[derive(Debug, Clone, PartialEq)]
pub struct AccumulatedPose {
    pub rotation: na::Matrix3<f64>,
    pub translation: na::Vector3<f64>,
}

impl Default for AccumulatedPose {
    fn default() -> Self {
        AccumulatedPose::identity()
    }
}

impl AccumulatedPose {
    pub fn identity() -> AccumulatedPose {
        AccumulatedPose {
            rotation: na::Matrix3::identity(),
            translation: na::Vector3::zeros(),
        }
    }

    /// Initial pose: the first relative motion taken as is.
    pub fn from_relative(relative: &RelativePose) -> AccumulatedPose {
        AccumulatedPose {
            rotation: *relative.rotation.matrix(),
            translation: relative.translation_vector(),
        }
    }

    /// `t += R_acc * t_rel`, then `R_acc = R_rel * R_acc`.
    ///
    /// The translation is rotated by the rotation held before this update.
    pub fn compose(&mut self, relative: &RelativePose) {
        self.translation += self.rotation * relative.translation_vector();
        self.rotation = relative.rotation.matrix() * self.rotation;
    }

    /// Projects the rotation back onto SO(3) via SVD.
    pub fn reorthonormalize(&mut self) {
        let svd = self.rotation.svd(true, true);
        let (Some(u), Some(v_t)) = (svd.u, svd.v_t) else {
            log::warn!("rotation svd failed, keeping accumulated rotation");
            return;
        };
        let mut r = u * v_t;
        if r.determinant() < 0.0 {
            let mut u = u;
            u.column_mut(2).neg_mut();
            r = u * v_t;
        }
        self.rotation = r;
    }

    /// Frobenius norm of `R^T R - I`.
    pub fn orthonormality_error(&self) -> f64 {
        (self.rotation.transpose() * self.rotation - na::Matrix3::identity()).norm()
    }

    /// The two coordinates drawn on the trajectory canvas.
    pub fn planar(&self) -> (f64, f64) {
        (self.translation.x, self.translation.y)
    }
}
