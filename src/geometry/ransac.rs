//! Generic RANSAC engine shared by the homography and essential matrix fits.

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

#[derive(Debug, Clone, PartialEq)]
pub struct RansacConfig {
    /// Residuals strictly below this count as inliers.
    pub threshold: f64,
    pub max_iterations: usize,
    /// Desired probability of drawing at least one all-inlier sample.
    pub confidence: f64,
    pub seed: u64,
}

impl Default for RansacConfig {
    fn default() -> Self {
        Self {
            threshold: 1.0,
            max_iterations: 1000,
            confidence: 0.99,
            seed: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RansacResult<M> {
    pub model: Option<M>,
    pub inliers: Vec<bool>,
    pub num_inliers: usize,
}

impl<M> RansacResult<M> {
    fn empty(n: usize) -> Self {
        RansacResult {
            model: None,
            inliers: vec![false; n],
            num_inliers: 0,
        }
    }
}

/// A model that can be fitted from a minimal sample and scored per datum.
pub trait RobustModel<D> {
    type Model: Clone;

    fn min_sample_size(&self) -> usize;

    /// Fit from `data`; may be called with more than the minimal count for
    /// the final refit on all inliers.
    fn estimate(&self, data: &[&D]) -> Option<Self::Model>;

    fn residual(&self, model: &Self::Model, datum: &D) -> f64;
}

/// Upper bound on consensus refits after sampling.
const MAX_REFITS: usize = 10;

pub struct Ransac {
    config: RansacConfig,
}

/// Iterations needed so that, with inlier ratio `w`, a clean sample of size
/// `k` is drawn with probability `confidence`.
pub fn required_iterations(confidence: f64, inlier_ratio: f64, k: usize) -> usize {
    let good = inlier_ratio.powi(k as i32);
    if good >= 1.0 - f64::EPSILON {
        return 1;
    }
    if good <= f64::EPSILON {
        return usize::MAX;
    }
    let n = (1.0 - confidence).ln() / (1.0 - good).ln();
    if n.is_finite() { n.ceil().max(1.0) as usize } else { usize::MAX }
}

impl Ransac {
    pub fn new(config: RansacConfig) -> Ransac {
        Ransac { config }
    }

    pub fn run<D, E: RobustModel<D>>(&self, estimator: &E, data: &[D]) -> RansacResult<E::Model> {
        let n = data.len();
        let k = estimator.min_sample_size();
        if n < k || k == 0 {
            return RansacResult::empty(n);
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        let mut indices: Vec<usize> = (0..n).collect();
        let mut best = RansacResult::empty(n);
        let mut best_cost = f64::INFINITY;
        let mut iterations = self.config.max_iterations;
        let mut i = 0;
        while i < iterations {
            i += 1;
            indices.shuffle(&mut rng);
            let sample: Vec<&D> = indices[..k].iter().map(|&j| &data[j]).collect();
            let Some(model) = estimator.estimate(&sample) else {
                continue;
            };
            let (inliers, num_inliers, cost) = self.score(estimator, &model, data);
            if num_inliers > 0 && cost < best_cost {
                best = RansacResult {
                    model: Some(model),
                    inliers,
                    num_inliers,
                };
                best_cost = cost;
                let needed =
                    required_iterations(self.config.confidence, num_inliers as f64 / n as f64, k);
                iterations = iterations.min(needed);
            }
        }
        log::trace!(
            "ransac: {} / {} inliers after {} iterations",
            best.num_inliers,
            n,
            i
        );

        // Refit on the consensus set until the inlier mask settles.
        for _ in 0..MAX_REFITS {
            if best.num_inliers <= k {
                break;
            }
            let consensus: Vec<&D> = data
                .iter()
                .zip(&best.inliers)
                .filter_map(|(d, &inlier)| inlier.then_some(d))
                .collect();
            let Some(refined) = estimator.estimate(&consensus) else {
                break;
            };
            let (inliers, num_inliers, cost) = self.score(estimator, &refined, data);
            if num_inliers < k || (cost > best_cost && num_inliers < best.num_inliers) {
                break;
            }
            let settled = inliers == best.inliers;
            best = RansacResult {
                model: Some(refined),
                inliers,
                num_inliers,
            };
            best_cost = cost;
            if settled {
                break;
            }
        }
        best
    }

    /// Inlier mask, inlier count and the truncated quadratic (MSAC) cost
    /// `sum(min(r^2, threshold^2))`.
    fn score<D, E: RobustModel<D>>(
        &self,
        estimator: &E,
        model: &E::Model,
        data: &[D],
    ) -> (Vec<bool>, usize, f64) {
        let cap = self.config.threshold * self.config.threshold;
        let mut cost = 0.0;
        let mut num_inliers = 0;
        let inliers = data
            .iter()
            .map(|d| {
                let err = estimator.residual(model, d);
                let inlier = err < self.config.threshold;
                if inlier {
                    num_inliers += 1;
                    cost += err * err;
                } else {
                    cost += cap;
                }
                inlier
            })
            .collect();
        (inliers, num_inliers, cost)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// y = a * x + b
    struct LineFit;

    impl RobustModel<(f64, f64)> for LineFit {
        type Model = (f64, f64);

        fn min_sample_size(&self) -> usize {
            2
        }

        fn estimate(&self, data: &[&(f64, f64)]) -> Option<Self::Model> {
            let n = data.len() as f64;
            let mx = data.iter().map(|p| p.0).sum::<f64>() / n;
            let my = data.iter().map(|p| p.1).sum::<f64>() / n;
            let sxx: f64 = data.iter().map(|p| (p.0 - mx) * (p.0 - mx)).sum();
            if sxx < 1e-12 {
                return None;
            }
            let sxy: f64 = data.iter().map(|p| (p.0 - mx) * (p.1 - my)).sum();
            let a = sxy / sxx;
            Some((a, my - a * mx))
        }

        fn residual(&self, model: &Self::Model, datum: &(f64, f64)) -> f64 {
            (model.0 * datum.0 + model.1 - datum.1).abs()
        }
    }

    #[test]
    fn line_with_outliers() {
        let mut data: Vec<(f64, f64)> = (0..40).map(|i| (i as f64, 2.0 * i as f64 + 1.0)).collect();
        for i in 0..10 {
            data.push((i as f64 * 3.0, 100.0 - i as f64 * 7.0));
        }
        let ransac = Ransac::new(RansacConfig {
            threshold: 0.1,
            max_iterations: 500,
            confidence: 0.999,
            seed: 7,
        });
        let result = ransac.run(&LineFit, &data);
        let (a, b) = result.model.unwrap();
        assert!((a - 2.0).abs() < 1e-9);
        assert!((b - 1.0).abs() < 1e-9);
        assert!(result.num_inliers >= 40);
        assert!(result.inliers[..40].iter().all(|&i| i));
    }

    #[test]
    fn too_little_data() {
        let ransac = Ransac::new(RansacConfig::default());
        let result = ransac.run(&LineFit, &[(0.0, 0.0)]);
        assert!(result.model.is_none());
        assert_eq!(result.inliers, vec![false]);
    }

    #[test]
    fn iteration_bound() {
        assert_eq!(required_iterations(0.99, 1.0, 4), 1);
        assert!(required_iterations(0.99, 0.5, 4) > required_iterations(0.99, 0.9, 4));
        assert_eq!(required_iterations(0.99, 0.0, 4), usize::MAX);
    }
}
