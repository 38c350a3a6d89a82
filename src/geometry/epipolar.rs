//! Fundamental and essential matrices.
//!
//! `F` works on pixel coordinates, `E` on normalized image coordinates
//! (pixels with the focal length and principal point removed). Both use the
//! convention `x2^T * M * x1 = 0`.

use nalgebra as na;

use super::ransac::{Ransac, RansacConfig, RansacResult, RobustModel};
use super::{PointPair, normalize_points, nullspace_mat3};

fn epipolar_system(p1: &[na::Point2<f64>], p2: &[na::Point2<f64>]) -> na::DMatrix<f64> {
    let mut a = na::DMatrix::<f64>::zeros(p1.len(), 9);
    for (i, (a1, a2)) in p1.iter().zip(p2).enumerate() {
        let (x1, y1, x2, y2) = (a1.x, a1.y, a2.x, a2.y);
        a[(i, 0)] = x2 * x1;
        a[(i, 1)] = x2 * y1;
        a[(i, 2)] = x2;
        a[(i, 3)] = y2 * x1;
        a[(i, 4)] = y2 * y1;
        a[(i, 5)] = y2;
        a[(i, 6)] = x1;
        a[(i, 7)] = y1;
        a[(i, 8)] = 1.0;
    }
    a
}

fn enforce_rank2(m: &na::Matrix3<f64>) -> Option<na::Matrix3<f64>> {
    let svd = m.svd(true, true);
    let u = svd.u?;
    let v_t = svd.v_t?;
    let mut s = svd.singular_values;
    let (min_idx, _) = s.argmin();
    s[min_idx] = 0.0;
    Some(u * na::Matrix3::from_diagonal(&s) * v_t)
}

/// Projects onto the essential manifold: two equal singular values, one zero.
pub fn enforce_essential_constraints(e: &na::Matrix3<f64>) -> Option<na::Matrix3<f64>> {
    let svd = e.svd(true, true);
    let u = svd.u?;
    let v_t = svd.v_t?;
    let s = svd.singular_values;
    let (min_idx, min) = s.argmin();
    if s.sum() - min <= 1e-12 {
        return None;
    }
    let sigma = na::Vector3::from_fn(|i, _| if i == min_idx { 0.0 } else { 1.0 });
    Some(u * na::Matrix3::from_diagonal(&sigma) * v_t)
}

/// Normalized 8-point fundamental matrix from pixel correspondences.
pub fn fundamental_8point(p1: &[na::Point2<f64>], p2: &[na::Point2<f64>]) -> Option<na::Matrix3<f64>> {
    if p1.len() != p2.len() || p1.len() < 8 {
        return None;
    }
    let (n1, t1) = normalize_points(p1)?;
    let (n2, t2) = normalize_points(p2)?;
    let f0 = nullspace_mat3(&epipolar_system(&n1, &n2))?;
    let f = t2.transpose() * enforce_rank2(&f0)? * t1;
    let norm = f.norm();
    if norm <= 1e-15 || !norm.is_finite() {
        return None;
    }
    Some(f / norm)
}

/// 8-point essential matrix from normalized image coordinates.
pub fn essential_8point(p1: &[na::Point2<f64>], p2: &[na::Point2<f64>]) -> Option<na::Matrix3<f64>> {
    if p1.len() != p2.len() || p1.len() < 8 {
        return None;
    }
    // Hartley scaling still helps when the baseline between rays is tiny.
    let (n1, t1) = normalize_points(p1)?;
    let (n2, t2) = normalize_points(p2)?;
    let e0 = nullspace_mat3(&epipolar_system(&n1, &n2))?;
    enforce_essential_constraints(&(t2.transpose() * e0 * t1))
}

/// First-order geometric (Sampson) distance of a pair to `x2^T M x1 = 0`.
pub fn sampson_distance(m: &na::Matrix3<f64>, p1: &na::Point2<f64>, p2: &na::Point2<f64>) -> f64 {
    let x1 = na::Vector3::new(p1.x, p1.y, 1.0);
    let x2 = na::Vector3::new(p2.x, p2.y, 1.0);
    let mx1 = m * x1;
    let mtx2 = m.transpose() * x2;
    let num = x2.dot(&mx1);
    let denom = mx1.x * mx1.x + mx1.y * mx1.y + mtx2.x * mtx2.x + mtx2.y * mtx2.y;
    if denom <= 1e-24 {
        f64::INFINITY
    } else {
        num.abs() / denom.sqrt()
    }
}

pub fn mean_sampson_distance(m: &na::Matrix3<f64>, pairs: &[PointPair]) -> f64 {
    if pairs.is_empty() {
        return 0.0;
    }
    pairs
        .iter()
        .map(|(a, b)| sampson_distance(m, a, b))
        .sum::<f64>()
        / pairs.len() as f64
}

/// Essential matrix fitted on normalized coordinates.
pub struct EssentialEstimator;

impl RobustModel<PointPair> for EssentialEstimator {
    type Model = na::Matrix3<f64>;

    fn min_sample_size(&self) -> usize {
        8
    }

    fn estimate(&self, data: &[&PointPair]) -> Option<Self::Model> {
        let (p1, p2): (Vec<_>, Vec<_>) = data.iter().map(|p| (p.0, p.1)).unzip();
        essential_8point(&p1, &p2)
    }

    fn residual(&self, model: &Self::Model, datum: &PointPair) -> f64 {
        sampson_distance(model, &datum.0, &datum.1)
    }
}

/// RANSAC essential matrix. `pairs` are in normalized coordinates and the
/// threshold in `config` must already be divided by the focal length.
pub fn find_essential(pairs: &[PointPair], config: &RansacConfig) -> RansacResult<na::Matrix3<f64>> {
    Ransac::new(config.clone()).run(&EssentialEstimator, pairs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::skew;

    fn scene() -> (Vec<na::Point2<f64>>, Vec<na::Point2<f64>>, na::Matrix3<f64>) {
        let r = na::Rotation3::from_euler_angles(0.02, -0.05, 0.03);
        let t = na::Vector3::new(0.3, -0.1, 0.05);
        let mut p1 = Vec::new();
        let mut p2 = Vec::new();
        for i in 0..30 {
            let x = ((i * 37) % 11) as f64 * 0.4 - 2.0;
            let y = ((i * 53) % 7) as f64 * 0.5 - 1.5;
            let z = 5.0 + ((i * 29) % 13) as f64 * 0.3;
            let x1 = na::Vector3::new(x, y, z);
            let x2 = r * x1 + t;
            p1.push(na::Point2::new(x1.x / x1.z, x1.y / x1.z));
            p2.push(na::Point2::new(x2.x / x2.z, x2.y / x2.z));
        }
        let e = skew(&t) * r.matrix();
        (p1, p2, e)
    }

    #[test]
    fn essential_satisfies_epipolar_constraint() {
        let (p1, p2, e_true) = scene();
        let e = essential_8point(&p1, &p2).unwrap();
        for (a, b) in p1.iter().zip(&p2) {
            assert!(sampson_distance(&e, a, b) < 1e-8);
        }
        let e_true = e_true / e_true.norm();
        let e = e / e.norm();
        assert!((e - e_true).norm() < 1e-6 || (e + e_true).norm() < 1e-6);
        let s = e.svd(false, false).singular_values;
        let mut s: Vec<f64> = s.iter().cloned().collect();
        s.sort_by(|a, b| b.partial_cmp(a).unwrap());
        assert!((s[0] - s[1]).abs() < 1e-9);
        assert!(s[2].abs() < 1e-9);
    }

    #[test]
    fn fundamental_is_rank_two() {
        let (p1, p2, _) = scene();
        let k = na::Matrix3::new(400.0, 0.0, 320.0, 0.0, 400.0, 180.0, 0.0, 0.0, 1.0);
        let to_px = |p: &na::Point2<f64>| {
            let v = k * na::Vector3::new(p.x, p.y, 1.0);
            na::Point2::new(v.x, v.y)
        };
        let q1: Vec<_> = p1.iter().map(to_px).collect();
        let q2: Vec<_> = p2.iter().map(to_px).collect();
        let f = fundamental_8point(&q1, &q2).unwrap();
        assert!(f.determinant().abs() < 1e-9);
        let pairs: Vec<PointPair> = q1.into_iter().zip(q2).collect();
        assert!(mean_sampson_distance(&f, &pairs) < 1e-6);
    }

    #[test]
    fn too_few_points() {
        let (p1, p2, _) = scene();
        assert!(essential_8point(&p1[..7], &p2[..7]).is_none());
        assert!(fundamental_8point(&p1[..7], &p2[..7]).is_none());
    }
}
