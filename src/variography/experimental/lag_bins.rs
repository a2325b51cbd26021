use itertools::Itertools;
use nalgebra::Point2;
use tracing::trace;

use super::{LagBounds, VariogramParams};
use crate::error::Result;

/// An unordered pair of samples separated by `distance`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LagPair {
    pub i: usize,
    pub j: usize,
    pub distance: f64,
    pub weight: f64,
}

/// Every pair within `max_range`, grouped by lag bin. Bins may be empty.
#[derive(Debug, Clone)]
pub struct PairBins {
    pub bounds: Vec<LagBounds>,
    pub pairs: Vec<Vec<LagPair>>,
}

impl PairBins {
    pub fn n_pairs(&self) -> usize {
        self.pairs.iter().map(Vec::len).sum()
    }

    /// Bins with at least one pair, in ascending lag order.
    pub fn populated(&self) -> impl Iterator<Item = (&LagBounds, &[LagPair])> {
        self.bounds
            .iter()
            .zip(self.pairs.iter())
            .filter(|(_, p)| !p.is_empty())
            .map(|(b, p)| (b, p.as_slice()))
    }
}

/// Poisson pair weight `n_i * n_j / (n_i + n_j)`. Pairs with no population weigh nothing.
#[inline(always)]
pub fn pair_weight(n_i: f64, n_j: f64) -> f64 {
    let total = n_i + n_j;
    if total > 0.0 {
        n_i * n_j / total
    } else {
        0.0
    }
}

fn bin_with<F>(points: &[Point2<f64>], params: &VariogramParams, weight: F) -> Result<PairBins>
where
    F: Fn(usize, usize) -> f64,
{
    params.validate()?;

    let bounds = params.lag_bounds();
    let mut pairs = vec![Vec::new(); bounds.len()];

    for (i, j) in (0..points.len()).tuple_combinations() {
        let distance = nalgebra::distance(&points[i], &points[j]);
        let Some(bin) = params.bin_of(distance) else {
            continue;
        };
        pairs[bin].push(LagPair {
            i,
            j,
            distance,
            weight: weight(i, j),
        });
    }

    let bins = PairBins { bounds, pairs };
    trace!(
        n_points = points.len(),
        n_pairs = bins.n_pairs(),
        n_bins = bins.bounds.len(),
        "pairs binned"
    );
    Ok(bins)
}

/// Bins every pair of `points` by separation distance, each pair weighing 1.
pub fn bin_pairs(points: &[Point2<f64>], params: &VariogramParams) -> Result<PairBins> {
    bin_with(points, params, |_, _| 1.0)
}

/// Bins every pair of `points`, each pair carrying [`pair_weight`] of the two populations.
pub fn bin_weighted_pairs(
    points: &[Point2<f64>],
    populations: &[f64],
    params: &VariogramParams,
) -> Result<PairBins> {
    debug_assert_eq!(points.len(), populations.len());
    bin_with(points, params, |i, j| {
        pair_weight(populations[i], populations[j])
    })
}
