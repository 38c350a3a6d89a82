//! Projective geometry primitives: RANSAC, homography, epipolar matrices and
//! pose decomposition.

pub mod epipolar;
pub mod homography;
pub mod pose;
pub mod ransac;

use nalgebra as na;

pub type PointPair = (na::Point2<f64>, na::Point2<f64>);

/// Hartley normalization: centroid to the origin, mean distance sqrt(2).
///
/// Returns `None` when all points coincide.
pub fn normalize_points(pts: &[na::Point2<f64>]) -> Option<(Vec<na::Point2<f64>>, na::Matrix3<f64>)> {
    if pts.is_empty() {
        return None;
    }
    let n = pts.len() as f64;
    let mx = pts.iter().map(|p| p.x).sum::<f64>() / n;
    let my = pts.iter().map(|p| p.y).sum::<f64>() / n;
    let mean_dist = pts
        .iter()
        .map(|p| ((p.x - mx).powi(2) + (p.y - my).powi(2)).sqrt())
        .sum::<f64>()
        / n;
    if mean_dist <= 1e-12 {
        return None;
    }
    let s = std::f64::consts::SQRT_2 / mean_dist;
    let t = na::Matrix3::new(s, 0.0, -s * mx, 0.0, s, -s * my, 0.0, 0.0, 1.0);
    let out = pts
        .iter()
        .map(|p| na::Point2::new(s * (p.x - mx), s * (p.y - my)))
        .collect();
    Some((out, t))
}

/// Right singular vector of the smallest singular value, as a 3x3 matrix
/// (row-major). Rows are zero-padded up to 9 so the nullspace is complete.
pub(crate) fn nullspace_mat3(a: &na::DMatrix<f64>) -> Option<na::Matrix3<f64>> {
    let a = if a.nrows() < 9 {
        let mut padded = na::DMatrix::zeros(9, 9);
        padded.view_mut((0, 0), (a.nrows(), 9)).copy_from(a);
        padded
    } else {
        a.clone()
    };
    let svd = a.svd(false, true);
    let v_t = svd.v_t?;
    let (min_idx, _) = svd
        .singular_values
        .iter()
        .enumerate()
        .min_by(|x, y| x.1.partial_cmp(y.1).unwrap_or(std::cmp::Ordering::Equal))?;
    let h = v_t.row(min_idx);
    Some(na::Matrix3::new(
        h[0], h[1], h[2], //
        h[3], h[4], h[5], //
        h[6], h[7], h[8],
    ))
}

pub fn skew(v: &na::Vector3<f64>) -> na::Matrix3<f64> {
    na::Matrix3::new(0.0, -v.z, v.y, v.z, 0.0, -v.x, -v.y, v.x, 0.0)
}
