//! Relative pose from an essential matrix.
//!
//! Poses follow `x_cur = R * x_prev + t`: `R` and `t` map points from the
//! previous camera frame into the current one.

use nalgebra as na;

use super::PointPair;

/// The four `(R, t)` candidates of an essential matrix. `t` is unit length.
pub fn decompose_essential(e: &na::Matrix3<f64>) -> Option<[(na::Rotation3<f64>, na::Vector3<f64>); 4]> {
    let svd = e.svd(true, true);
    let mut u = svd.u?;
    let mut v_t = svd.v_t?;
    if u.determinant() < 0.0 {
        u.column_mut(2).neg_mut();
    }
    if v_t.determinant() < 0.0 {
        v_t.row_mut(2).neg_mut();
    }

    let w = na::Matrix3::new(0.0, -1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0);
    let r1 = na::Rotation3::from_matrix_unchecked(u * w * v_t);
    let r2 = na::Rotation3::from_matrix_unchecked(u * w.transpose() * v_t);
    let t: na::Vector3<f64> = u.column(2).into_owned();
    let norm = t.norm();
    if norm <= 1e-12 {
        return None;
    }
    let t = t / norm;
    Some([(r1, t), (r1, -t), (r2, t), (r2, -t)])
}

/// Linear two-view triangulation with the first camera at the origin.
///
/// Returns the point in the first camera frame.
pub fn triangulate(
    rotation: &na::Rotation3<f64>,
    translation: &na::Vector3<f64>,
    pair: &PointPair,
) -> Option<na::Point3<f64>> {
    let p1 = na::Matrix3x4::<f64>::identity();
    let mut p2 = na::Matrix3x4::<f64>::zeros();
    p2.fixed_view_mut::<3, 3>(0, 0).copy_from(rotation.matrix());
    p2.fixed_view_mut::<3, 1>(0, 3).copy_from(translation);

    let mut a = na::Matrix4::<f64>::zeros();
    let (x1, x2) = pair;
    a.row_mut(0).copy_from(&(x1.x * p1.row(2) - p1.row(0)));
    a.row_mut(1).copy_from(&(x1.y * p1.row(2) - p1.row(1)));
    a.row_mut(2).copy_from(&(x2.x * p2.row(2) - p2.row(0)));
    a.row_mut(3).copy_from(&(x2.y * p2.row(2) - p2.row(1)));

    let svd = a.svd(false, true);
    let v_t = svd.v_t?;
    let (min_idx, _) = svd.singular_values.argmin();
    let x_h = v_t.row(min_idx);
    let w = x_h[3];
    if w.abs() <= f64::EPSILON {
        return None;
    }
    Some(na::Point3::new(x_h[0] / w, x_h[1] / w, x_h[2] / w))
}

/// Points that land in front of both cameras and closer than `max_depth`.
pub fn cheirality_mask(
    rotation: &na::Rotation3<f64>,
    translation: &na::Vector3<f64>,
    pairs: &[PointPair],
    mask: &[bool],
    max_depth: f64,
) -> Vec<bool> {
    pairs
        .iter()
        .zip(mask)
        .map(|(pair, &use_it)| {
            if !use_it {
                return false;
            }
            match triangulate(rotation, translation, pair) {
                Some(x) => {
                    let x_cur = rotation * x.coords + translation;
                    x.z > 0.0 && x.z < max_depth && x_cur.z > 0.0 && x_cur.z < max_depth
                }
                None => false,
            }
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct RecoveredPose {
    pub rotation: na::Rotation3<f64>,
    pub translation: na::Unit<na::Vector3<f64>>,
    /// Pairs that passed the cheirality test for the chosen candidate.
    pub in_front: Vec<bool>,
    pub num_in_front: usize,
}

/// Picks the decomposition of `e` with the most points in front of both
/// cameras. `pairs` are normalized coordinates, `mask` restricts the test to
/// RANSAC inliers.
pub fn recover_pose(
    e: &na::Matrix3<f64>,
    pairs: &[PointPair],
    mask: &[bool],
    max_depth: f64,
) -> Option<RecoveredPose> {
    let candidates = decompose_essential(e)?;
    let mut best: Option<RecoveredPose> = None;
    for (rotation, translation) in candidates {
        let in_front = cheirality_mask(&rotation, &translation, pairs, mask, max_depth);
        let num_in_front = in_front.iter().filter(|&&b| b).count();
        log::trace!("candidate: {} points in front", num_in_front);
        if best.as_ref().is_none_or(|b| num_in_front > b.num_in_front) {
            best = Some(RecoveredPose {
                rotation,
                translation: na::Unit::new_normalize(translation),
                in_front,
                num_in_front,
            });
        }
    }
    best.filter(|b| b.num_in_front > 0)
}
