use faer::linalg::solvers::SolveLstsqCore;
use log::debug;
use nalgebra as na;

use super::ransac::{Ransac, RansacConfig, RansacResult, RobustModel};
use super::{PointPair, normalize_points, nullspace_mat3};

/// Planar homography `dst ~ H * src` scored by forward transfer error in
/// pixels.
pub struct HomographyEstimator;

fn transfer(h: &na::Matrix3<f64>, p: &na::Point2<f64>) -> Option<na::Point2<f64>> {
    let q = h * na::Vector3::new(p.x, p.y, 1.0);
    if q.z.abs() < 1e-12 {
        None
    } else {
        Some(na::Point2::new(q.x / q.z, q.y / q.z))
    }
}

fn collinear(a: &na::Point2<f64>, b: &na::Point2<f64>, c: &na::Point2<f64>) -> bool {
    let area = (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x);
    area.abs() < 1e-6
}

fn degenerate_sample(pts: &[na::Point2<f64>]) -> bool {
    let n = pts.len();
    for i in 0..n {
        for j in i + 1..n {
            for k in j + 1..n {
                if collinear(&pts[i], &pts[j], &pts[k]) {
                    return true;
                }
            }
        }
    }
    false
}

/// Normalized DLT. Exact for four pairs, total least squares beyond that.
pub fn homography_dlt(src: &[na::Point2<f64>], dst: &[na::Point2<f64>]) -> Option<na::Matrix3<f64>> {
    if src.len() != dst.len() || src.len() < 4 {
        return None;
    }
    let (ns, ts) = normalize_points(src)?;
    let (nd, td) = normalize_points(dst)?;
    let mut a = na::DMatrix::<f64>::zeros(2 * ns.len(), 9);
    for (i, (p, q)) in ns.iter().zip(&nd).enumerate() {
        let (x1, y1, x2, y2) = (p.x, p.y, q.x, q.y);
        let r = 2 * i;
        a[(r, 0)] = -x1;
        a[(r, 1)] = -y1;
        a[(r, 2)] = -1.0;
        a[(r, 6)] = x2 * x1;
        a[(r, 7)] = x2 * y1;
        a[(r, 8)] = x2;
        a[(r + 1, 3)] = -x1;
        a[(r + 1, 4)] = -y1;
        a[(r + 1, 5)] = -1.0;
        a[(r + 1, 6)] = y2 * x1;
        a[(r + 1, 7)] = y2 * y1;
        a[(r + 1, 8)] = y2;
    }
    let h_norm = nullspace_mat3(&a)?;
    let h = td.try_inverse()? * h_norm * ts;
    scale_h33(h)
}

fn scale_h33(h: na::Matrix3<f64>) -> Option<na::Matrix3<f64>> {
    let s = h[(2, 2)];
    if s.abs() < 1e-12 || !h.iter().all(|v| v.is_finite()) {
        return None;
    }
    Some(h / s)
}

/// Least-squares refinement with `h33 = 1` in normalized coordinates.
pub fn homography_lstsq(src: &[na::Point2<f64>], dst: &[na::Point2<f64>]) -> Option<na::Matrix3<f64>> {
    if src.len() != dst.len() || src.len() < 4 {
        return None;
    }
    let (ns, ts) = normalize_points(src)?;
    let (nd, td) = normalize_points(dst)?;
    let rows = 2 * ns.len();
    let coeff = |r: usize, c: usize| -> f64 {
        let p = &ns[r / 2];
        let q = &nd[r / 2];
        if r % 2 == 0 {
            [p.x, p.y, 1.0, 0.0, 0.0, 0.0, -q.x * p.x, -q.x * p.y][c]
        } else {
            [0.0, 0.0, 0.0, p.x, p.y, 1.0, -q.y * p.x, -q.y * p.y][c]
        }
    };
    let a: faer::Mat<f64> = faer::Mat::from_fn(rows, 8, coeff);
    let mut x: faer::Mat<f64> = faer::Mat::from_fn(rows, 1, |r, _| {
        let q = &nd[r / 2];
        if r % 2 == 0 { q.x } else { q.y }
    });
    a.qr()
        .solve_lstsq_in_place_with_conj(faer::Conj::No, x.as_mut());
    let v = |i: usize| *x.get(i, 0);
    let h_norm = na::Matrix3::new(v(0), v(1), v(2), v(3), v(4), v(5), v(6), v(7), 1.0);
    let h = td.try_inverse()? * h_norm * ts;
    scale_h33(h)
}

impl RobustModel<PointPair> for HomographyEstimator {
    type Model = na::Matrix3<f64>;

    fn min_sample_size(&self) -> usize {
        4
    }

    fn estimate(&self, data: &[&PointPair]) -> Option<Self::Model> {
        let (src, dst): (Vec<_>, Vec<_>) = data.iter().map(|p| (p.0, p.1)).unzip();
        if data.len() == 4 {
            if degenerate_sample(&src) || degenerate_sample(&dst) {
                return None;
            }
            homography_dlt(&src, &dst)
        } else {
            homography_lstsq(&src, &dst).or_else(|| homography_dlt(&src, &dst))
        }
    }

    fn residual(&self, model: &Self::Model, datum: &PointPair) -> f64 {
        match transfer(model, &datum.0) {
            Some(q) => (q - datum.1).norm(),
            None => f64::INFINITY,
        }
    }
}

/// RANSAC homography with an inlier mask, reprojection threshold in pixels.
pub fn find_homography(pairs: &[PointPair], config: &RansacConfig) -> RansacResult<na::Matrix3<f64>> {
    let result = Ransac::new(config.clone()).run(&HomographyEstimator, pairs);
    if result.model.is_none() {
        debug!("no homography from {} pairs", pairs.len());
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> Vec<na::Point2<f64>> {
        (0..6)
            .flat_map(|r| (0..7).map(move |c| na::Point2::new(40.0 + c as f64 * 70.0, 30.0 + r as f64 * 45.0)))
            .collect()
    }

    #[test]
    fn recovers_known_homography() {
        let h = na::Matrix3::new(1.05, 0.02, 12.0, -0.03, 0.97, -7.0, 1e-4, -5e-5, 1.0);
        let src = grid();
        let dst: Vec<_> = src.iter().map(|p| transfer(&h, p).unwrap()).collect();
        let dlt = homography_dlt(&src, &dst).unwrap();
        let lsq = homography_lstsq(&src, &dst).unwrap();
        assert!((dlt - h).norm() < 1e-6);
        assert!((lsq - h).norm() < 1e-6);
    }

    #[test]
    fn rejects_injected_outliers() {
        let h = na::Matrix3::new(0.98, 0.01, 5.0, 0.0, 1.01, 3.0, 0.0, 0.0, 1.0);
        let mut pairs: Vec<PointPair> = grid()
            .into_iter()
            .map(|p| (p, transfer(&h, &p).unwrap()))
            .collect();
        for (i, pair) in pairs.iter_mut().enumerate().filter(|(i, _)| i % 7 == 3) {
            pair.1 += na::Vector2::new(30.0 + i as f64, -25.0);
        }
        let config = RansacConfig {
            threshold: 5.0,
            max_iterations: 2000,
            confidence: 0.995,
            seed: 1,
        };
        let result = find_homography(&pairs, &config);
        assert!(result.model.is_some());
        for (i, inlier) in result.inliers.iter().enumerate() {
            assert_eq!(*inlier, i % 7 != 3, "pair {}", i);
        }
    }

    #[test]
    fn collinear_sample_is_rejected() {
        let pts: Vec<PointPair> = (0..4)
            .map(|i| {
                let p = na::Point2::new(i as f64, 2.0 * i as f64);
                (p, p)
            })
            .collect();
        let refs: Vec<&PointPair> = pts.iter().collect();
        assert!(HomographyEstimator.estimate(&refs).is_none());
    }
}
