//! Regularization of a point-support semivariogram over areal support.
//!
//! The semivariance between two areas is the point model averaged over every pair of
//! their support points, each pair weighted by the product of the point values:
//!
//! ```text
//! γ(v_a, v_b) = Σ_s Σ_t w_s w_t γ(|u_s - u_t|) / Σ_s Σ_t w_s w_t
//! ```
//!
//! The regularized semivariogram at lag `h` averages, over the area pairs binned at `h`,
//! `γ(v_a, v_b) - (γ(v_a, v_a) + γ(v_b, v_b)) / 2`.

use tracing::debug;

use super::experimental::lag_bins::bin_pairs;
use super::experimental::{ExperimentalVariogram, VariogramParams};
use super::model_variograms::theoretical::TheoreticalVariogram;
use crate::error::{KrigingError, Result};
use crate::spatial_database::{ArealDataSet, SupportPoint};

/// Population-weighted average of the point model between two sets of support points.
pub fn block_to_block_semivariance(
    model: &TheoreticalVariogram,
    a: &[SupportPoint],
    b: &[SupportPoint],
) -> Result<f64> {
    let mut weighted = 0f64;
    let mut weight_sum = 0f64;
    for p in a {
        for q in b {
            let w = p.value * q.value;
            let h = ((p.x - q.x).powi(2) + (p.y - q.y).powi(2)).sqrt();
            weighted += w * model.semivariance(h);
            weight_sum += w;
        }
    }

    if weight_sum <= 0.0 {
        return Err(KrigingError::InvalidInput(format!(
            "block semivariance needs populated support, got {} and {} points",
            a.len(),
            b.len()
        )));
    }
    Ok(weighted / weight_sum)
}

/// Average semivariance inside one area.
pub fn inblock_semivariance(model: &TheoreticalVariogram, block: &[SupportPoint]) -> Result<f64> {
    block_to_block_semivariance(model, block, block)
}

/// Regularizes `model` over the areas of `data`, binned with `params`. Areas without
/// population are left out, so the populated bins match those of the weighted estimator.
pub fn regularize(
    model: &TheoreticalVariogram,
    data: &ArealDataSet,
    params: &VariogramParams,
) -> Result<ExperimentalVariogram> {
    let inblock = (0..data.len())
        .map(|i| {
            if data.population(i) > 0.0 {
                inblock_semivariance(model, data.support(i)).map(Some)
            } else {
                Ok(None)
            }
        })
        .collect::<Result<Vec<_>>>()?;

    let bins = bin_pairs(&data.centroids(), params)?;

    let mut lags = Vec::new();
    let mut semivariance = Vec::new();
    let mut counts = Vec::new();

    for (bounds, pairs) in bins.populated() {
        let mut total = 0f64;
        let mut count = 0u32;
        for pair in pairs {
            let (Some(in_i), Some(in_j)) = (inblock[pair.i], inblock[pair.j]) else {
                continue;
            };
            let between =
                block_to_block_semivariance(model, data.support(pair.i), data.support(pair.j))?;
            total += between - 0.5 * (in_i + in_j);
            count += 1;
        }

        if count == 0 {
            continue;
        }
        lags.push(*bounds);
        semivariance.push(total / count as f64);
        counts.push(count);
    }

    debug!(kind = %model.kind(), n_bins = lags.len(), "point model regularized");

    Ok(ExperimentalVariogram::new(lags, semivariance, counts))
}

#[cfg(test)]
mod test {
    use approx::assert_relative_eq;

    use super::*;
    use crate::spatial_database::ArealUnit;
    use crate::variography::model_variograms::theoretical::VariogramKind;

    fn linear() -> TheoreticalVariogram {
        // γ(h) = h up to h = 10
        TheoreticalVariogram::new(VariogramKind::Linear, 0.0, 10.0, 10.0)
    }

    #[test]
    fn single_points_reduce_to_the_point_model() {
        let model = TheoreticalVariogram::new(VariogramKind::Spherical, 0.2, 3.0, 8.0);
        let a = [SupportPoint::new(0, 0.0, 0.0, 4.0)];
        let b = [SupportPoint::new(1, 3.0, 4.0, 9.0)];

        assert_relative_eq!(
            block_to_block_semivariance(&model, &a, &b).unwrap(),
            model.semivariance(5.0)
        );
        assert_eq!(inblock_semivariance(&model, &a).unwrap(), 0.0);
    }

    #[test]
    fn weighted_block_average() {
        let a = [
            SupportPoint::new(0, 0.0, 0.0, 1.0),
            SupportPoint::new(0, 2.0, 0.0, 3.0),
        ];
        let b = [SupportPoint::new(1, 5.0, 0.0, 1.0)];

        // (1 * 5 + 3 * 3) / 4
        assert_relative_eq!(block_to_block_semivariance(&linear(), &a, &b).unwrap(), 3.5);
        assert_relative_eq!(block_to_block_semivariance(&linear(), &b, &a).unwrap(), 3.5);
        // pairs (0, 2) and (2, 0) at h = 2 with weight 3 each, out of 16
        assert_relative_eq!(inblock_semivariance(&linear(), &a).unwrap(), 0.75);
    }

    #[test]
    fn unpopulated_block_is_rejected() {
        let a = [SupportPoint::new(0, 0.0, 0.0, 0.0)];
        assert!(matches!(
            inblock_semivariance(&linear(), &a),
            Err(KrigingError::InvalidInput(_))
        ));
    }

    #[test]
    fn point_areas_regularize_to_the_model() {
        let model = TheoreticalVariogram::new(VariogramKind::Spherical, 0.0, 2.0, 4.0);
        let areas = (0..3)
            .map(|i| ArealUnit::new(i, i as f64, 0.0, 1.0))
            .collect::<Vec<_>>();
        let points = (0..3)
            .map(|i| SupportPoint::new(i, i as f64, 0.0, 10.0))
            .collect::<Vec<_>>();
        let data = ArealDataSet::new(areas, &points).unwrap();

        let reg = regularize(&model, &data, &VariogramParams::new(1.5, 3.0)).unwrap();
        assert_eq!(reg.counts, vec![2, 1]);
        assert_relative_eq!(reg.semivariance[0], model.semivariance(1.0));
        assert_relative_eq!(reg.semivariance[1], model.semivariance(2.0));
    }

    #[test]
    fn distant_areas_lose_their_inblock_variance() {
        let model = TheoreticalVariogram::new(VariogramKind::Exponential, 0.5, 6.0, 5.0);
        let block = |id: i64, cx: f64| {
            [(-1.0, -1.0), (1.0, -1.0), (0.0, 1.5)]
                .iter()
                .map(|(dx, dy)| SupportPoint::new(id, cx + dx, *dy, 2.0))
                .collect::<Vec<_>>()
        };
        let areas = vec![ArealUnit::new(0, 0.0, 0.0, 1.0), ArealUnit::new(1, 100.0, 0.0, 1.0)];
        let points = [block(0, 0.0), block(1, 100.0)].concat();
        let data = ArealDataSet::new(areas, &points).unwrap();

        let reg = regularize(&model, &data, &VariogramParams::new(50.0, 150.0)).unwrap();
        let inblock = inblock_semivariance(&model, &block(0, 0.0)).unwrap();

        assert!(inblock > 0.0);
        assert_eq!(reg.len(), 1);
        assert_relative_eq!(reg.semivariance[0], 6.0 - inblock, epsilon = 1e-12);
    }

    #[test]
    fn areas_without_population_are_skipped() {
        let model = linear();
        let areas = vec![
            ArealUnit::new(0, 0.0, 0.0, 1.0),
            ArealUnit::new(1, 1.0, 0.0, 1.0),
            ArealUnit::new(2, 2.0, 0.0, 1.0),
        ];
        let points = vec![
            SupportPoint::new(0, 0.0, 0.0, 1.0),
            SupportPoint::new(2, 2.0, 0.0, 1.0),
        ];
        let data = ArealDataSet::new(areas, &points).unwrap();

        let reg = regularize(&model, &data, &VariogramParams::new(1.5, 3.0)).unwrap();
        assert_eq!(reg.len(), 1);
        assert_relative_eq!(reg.semivariance[0], 2.0);
    }
}
