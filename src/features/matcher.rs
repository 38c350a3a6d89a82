use rayon::prelude::*;

use super::{DescriptorMatcher, FeatureSet, Neighbour};

/// Exhaustive Euclidean-distance search.
#[derive(Debug, Clone, Copy, Default)]
pub struct BruteForceMatcher;

impl BruteForceMatcher {
    pub fn new() -> BruteForceMatcher {
        BruteForceMatcher
    }
}

pub fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

impl DescriptorMatcher for BruteForceMatcher {
    fn knn2(&self, query: &FeatureSet, train: &FeatureSet) -> Vec<Option<[Neighbour; 2]>> {
        query
            .descriptors()
            .par_iter()
            .map(|q| {
                let mut best: Option<Neighbour> = None;
                let mut second: Option<Neighbour> = None;
                for (train_idx, t) in train.descriptors().iter().enumerate() {
                    let candidate = Neighbour {
                        train_idx,
                        distance: l2_distance(q, t),
                    };
                    match best {
                        Some(b) if candidate.distance >= b.distance => {
                            if second.is_none_or(|s| candidate.distance < s.distance) {
                                second = Some(candidate);
                            }
                        }
                        _ => {
                            second = best;
                            best = Some(candidate);
                        }
                    }
                }
                match (best, second) {
                    (Some(b), Some(s)) => Some([b, s]),
                    _ => None,
                }
            })
            .collect()
    }
}
