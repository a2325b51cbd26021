use argmin::core::{CostFunction, Error, Executor, State, TerminationReason, TerminationStatus};
use argmin::solver::neldermead::NelderMead;
use itertools::izip;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::theoretical::{TheoreticalVariogram, VariogramKind};
use crate::error::{KrigingError, Result};
use crate::variography::experimental::ExperimentalVariogram;

/// Minimum number of populated lag bins a curve needs before it can be fitted.
pub const MIN_LAG_BINS: usize = 2;

/// Cost assigned to parameters outside the box, before adding the size of the violation.
const OUT_OF_BOX_COST: f64 = 1e12;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitterOptions {
    /// Iteration cap of each Nelder-Mead run.
    pub max_iters: u64,
    /// Convergence threshold on the standard deviation of the simplex costs.
    pub sd_tolerance: f64,
    /// Additional runs restarted from the previous optimum.
    pub restarts: usize,
}

impl Default for FitterOptions {
    fn default() -> Self {
        Self {
            max_iters: 5000,
            sd_tolerance: 1e-14,
            restarts: 2,
        }
    }
}

/// A fitted model together with its sum of squared errors against the experimental curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitCandidate {
    pub model: TheoreticalVariogram,
    pub error: f64,
}

/// Least-squares problem for one model kind. Semivariances are scaled by the curve's
/// maximum so tolerances do not depend on the data units.
#[derive(Clone)]
struct CandidateProblem {
    kind: VariogramKind,
    lags: Vec<f64>,
    semivariance: Vec<f64>,
    scale: f64,
}

impl CandidateProblem {
    fn box_violation(params: &[f64]) -> f64 {
        let (nugget, sill, range) = (params[0], params[1], params[2]);
        (-nugget).max(0.0) + (nugget - sill).max(0.0) + (-range).max(0.0)
    }
}

impl CostFunction for CandidateProblem {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, params: &Self::Param) -> std::result::Result<Self::Output, Error> {
        let model = TheoreticalVariogram::new(self.kind, params[0], params[1], params[2]);
        if !model.in_parameter_box() {
            let violation = Self::box_violation(params);
            return Ok(OUT_OF_BOX_COST * (1.0 + violation.min(1e12)));
        }

        let sse = izip!(self.lags.iter(), self.semivariance.iter())
            .map(|(&h, &gamma)| ((gamma - model.semivariance(h)) / self.scale).powi(2))
            .sum::<f64>();
        Ok(sse)
    }
}

/// Fits nugget, sill and range of the candidate model kinds to an experimental curve
/// and selects the closest one.
pub struct VariogramFitter<'a> {
    pub experimental: &'a ExperimentalVariogram,
    pub options: FitterOptions,
    lags: Vec<f64>,
    semivariance: Vec<f64>,
}

impl<'a> VariogramFitter<'a> {
    pub fn new(experimental: &'a ExperimentalVariogram) -> Result<Self> {
        Self::with_options(experimental, FitterOptions::default())
    }

    pub fn with_options(
        experimental: &'a ExperimentalVariogram,
        options: FitterOptions,
    ) -> Result<Self> {
        let (lags, semivariance): (Vec<_>, Vec<_>) = experimental
            .iter()
            .filter(|(h, g, _)| h.is_finite() && g.is_finite())
            .map(|(h, g, _)| (h, g))
            .unzip();

        if lags.len() < MIN_LAG_BINS {
            return Err(KrigingError::InsufficientData {
                bins: lags.len(),
                required: MIN_LAG_BINS,
            });
        }

        Ok(Self {
            experimental,
            options,
            lags,
            semivariance,
        })
    }

    /// Starting point of the search: nugget from the first lag, sill from the curve
    /// maximum, range at the first lag reaching 95% of that maximum.
    pub fn initial_guess(&self) -> Result<[f64; 3]> {
        let sill = self
            .semivariance
            .iter()
            .copied()
            .max_by(|a, b| a.total_cmp(b))
            .filter(|s| *s > 0.0)
            .ok_or_else(|| KrigingError::NoValidModel {
                reason: "experimental semivariance is never positive".to_string(),
            })?;

        let first = self.semivariance[0];
        let nugget = if first >= 0.0 && first < sill {
            first
        } else {
            0.0
        };

        let range = izip!(self.lags.iter(), self.semivariance.iter())
            .find(|(_, &g)| g >= 0.95 * sill)
            .map(|(&h, _)| h)
            .unwrap_or(self.lags[self.lags.len() - 1]);

        Ok([nugget, sill, range])
    }

    fn simplex(x0: &[f64; 3], sill: f64) -> Vec<Vec<f64>> {
        let steps = [0.05 * sill, 0.1 * sill.max(x0[1].abs()), 0.1 * x0[2]];
        let mut vertices = vec![x0.to_vec()];
        for (i, step) in steps.iter().enumerate() {
            let mut v = x0.to_vec();
            v[i] += step;
            vertices.push(v);
        }
        vertices
    }

    /// One Nelder-Mead run from `x0`. `None` when the solver errors, stops on the
    /// iteration cap or ends on a non-finite cost.
    fn run_nelder_mead(&self, problem: &CandidateProblem, x0: &[f64; 3]) -> Option<[f64; 3]> {
        let solver = NelderMead::new(Self::simplex(x0, problem.scale))
            .with_sd_tolerance(self.options.sd_tolerance)
            .ok()?;

        let res = Executor::new(problem.clone(), solver)
            .configure(|state| state.max_iters(self.options.max_iters))
            .run()
            .map_err(|err| debug!(kind = %problem.kind, %err, "nelder-mead failed"))
            .ok()?;

        let state = res.state();
        if let TerminationStatus::Terminated(TerminationReason::MaxItersReached) =
            state.get_termination_status()
        {
            debug!(
                kind = %problem.kind,
                max_iters = self.options.max_iters,
                "nelder-mead hit the iteration cap"
            );
            return None;
        }

        let best = state.get_best_param()?;
        if !state.get_best_cost().is_finite() || best.len() != 3 {
            return None;
        }
        Some([best[0], best[1], best[2]])
    }

    /// Fits a single model kind. Fails with [`KrigingError::NoValidModel`] when the
    /// search does not converge or ends outside the parameter box.
    pub fn fit_kind(&self, kind: VariogramKind) -> Result<FitCandidate> {
        let x0 = self.initial_guess()?;
        self.fit_kind_from(kind, &x0)
    }

    fn fit_kind_from(&self, kind: VariogramKind, x0: &[f64; 3]) -> Result<FitCandidate> {
        let problem = CandidateProblem {
            kind,
            lags: self.lags.clone(),
            semivariance: self.semivariance.clone(),
            scale: x0[1],
        };

        let not_converged = || KrigingError::NoValidModel {
            reason: format!("{kind} fit did not converge"),
        };
        let mut params = self.run_nelder_mead(&problem, x0).ok_or_else(not_converged)?;
        for _ in 0..self.options.restarts {
            params = self
                .run_nelder_mead(&problem, &params)
                .ok_or_else(not_converged)?;
        }

        let model = TheoreticalVariogram::new(kind, params[0], params[1], params[2]);
        if !model.in_parameter_box() {
            debug!(%kind, ?params, "fit outside parameter box, discarded");
            return Err(KrigingError::NoValidModel {
                reason: format!("{kind} fit left the parameter box: {params:?}"),
            });
        }

        let error = model.fit_error(self.experimental);
        debug!(
            %kind,
            nugget = params[0],
            sill = params[1],
            range = params[2],
            error,
            "candidate fitted"
        );
        Ok(FitCandidate { model, error })
    }

    fn candidates_from(&self, x0: &[f64; 3]) -> Vec<FitCandidate> {
        VariogramKind::ALL
            .iter()
            .filter_map(|&kind| {
                self.fit_kind_from(kind, x0)
                    .map_err(|err| debug!(%kind, %err, "candidate discarded"))
                    .ok()
            })
            .collect()
    }

    /// Every candidate that fitted inside the parameter box, in preference order.
    pub fn candidates(&self) -> Vec<FitCandidate> {
        match self.initial_guess() {
            Ok(x0) => self.candidates_from(&x0),
            Err(_) => Vec::new(),
        }
    }

    /// The candidate with the smallest squared error.
    pub fn fit(&self) -> Result<TheoreticalVariogram> {
        let x0 = self.initial_guess()?;
        let best = select_best(self.candidates_from(&x0)).ok_or_else(|| {
            KrigingError::NoValidModel {
                reason: "every candidate fit failed or left the parameter box".to_string(),
            }
        })?;

        info!(
            kind = %best.model.kind(),
            nugget = best.model.nugget(),
            sill = best.model.sill(),
            range = best.model.range(),
            error = best.error,
            "variogram model selected"
        );
        Ok(best.model)
    }
}

/// Lowest-error candidate. Candidates are expected in preference order; a later one only
/// replaces the current best when it is better by more than a relative `1e-12`.
pub(crate) fn select_best(candidates: Vec<FitCandidate>) -> Option<FitCandidate> {
    candidates
        .into_iter()
        .filter(|c| c.error.is_finite())
        .fold(None, |best: Option<FitCandidate>, c| match best {
            Some(b) if c.error >= b.error - 1e-12 * b.error.max(1.0) => Some(b),
            _ => Some(c),
        })
}

#[cfg(test)]
mod test {
    use approx::assert_relative_eq;

    use super::*;
    use crate::variography::experimental::LagBounds;

    fn curve_from(model: &TheoreticalVariogram, n_lags: usize, step: f64) -> ExperimentalVariogram {
        let lags = (0..n_lags)
            .map(|k| LagBounds::new(k as f64 * step, (k + 1) as f64 * step))
            .collect::<Vec<_>>();
        let semivariance = lags.iter().map(|l| model.semivariance(l.mid_point())).collect();
        ExperimentalVariogram::new(lags, semivariance, vec![10; n_lags])
    }

    #[test]
    fn recovers_spherical() {
        let truth = TheoreticalVariogram::new(VariogramKind::Spherical, 0.5, 4.0, 6.0);
        let curve = curve_from(&truth, 10, 1.0);

        let fitted = VariogramFitter::new(&curve).unwrap().fit().unwrap();

        assert_eq!(fitted.kind(), VariogramKind::Spherical);
        for (h, gamma, _) in curve.iter() {
            assert_relative_eq!(fitted.semivariance(h), gamma, epsilon = 1e-3);
        }
    }

    #[test]
    fn fit_kind_recovers_linear() {
        let truth = TheoreticalVariogram::new(VariogramKind::Linear, 0.2, 2.7, 5.0);
        let curve = curve_from(&truth, 8, 1.0);

        let candidate = VariogramFitter::new(&curve)
            .unwrap()
            .fit_kind(VariogramKind::Linear)
            .unwrap();

        assert!(candidate.error < 1e-6);
        assert_relative_eq!(candidate.model.nugget(), 0.2, epsilon = 1e-3);
        if let TheoreticalVariogram::Linear(l) = candidate.model {
            assert_relative_eq!(l.slope(), 0.5, epsilon = 1e-3);
        } else {
            panic!("expected a linear model");
        }
    }

    #[test]
    fn selection_is_deterministic() {
        let truth = TheoreticalVariogram::new(VariogramKind::Exponential, 1.0, 9.0, 30.0);
        let mut curve = curve_from(&truth, 12, 4.0);
        curve.semivariance[3] += 0.4;
        curve.semivariance[7] -= 0.3;

        let first = VariogramFitter::new(&curve).unwrap().fit().unwrap();
        let second = VariogramFitter::new(&curve).unwrap().fit().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn fitted_models_respect_box() {
        let truth = TheoreticalVariogram::new(VariogramKind::Gaussian, 0.0, 3.0, 5.0);
        let curve = curve_from(&truth, 9, 1.0);

        let fitter = VariogramFitter::new(&curve).unwrap();
        let candidates = fitter.candidates();
        assert!(!candidates.is_empty());
        for c in candidates {
            assert!(c.model.in_parameter_box());
            let near = c.model.semivariance(1e-9);
            assert!(near >= 0.0 && near <= c.model.sill());
        }
    }

    #[test]
    fn flat_curve_ties_prefer_spherical() {
        let lags = (5..10)
            .map(|k| LagBounds::new(k as f64, k as f64 + 1.0))
            .collect::<Vec<_>>();
        let curve = ExperimentalVariogram::new(lags, vec![2.0; 5], vec![3; 5]);

        let model = VariogramFitter::new(&curve).unwrap().fit().unwrap();
        assert_eq!(model.kind(), VariogramKind::Spherical);
        assert_relative_eq!(model.sill(), 2.0, epsilon = 1e-9);
    }

    #[test]
    fn select_best_tie_break() {
        let c = |kind, error| FitCandidate {
            model: TheoreticalVariogram::new(kind, 0.0, 1.0, 1.0),
            error,
        };

        let best = select_best(vec![
            c(VariogramKind::Spherical, 0.5),
            c(VariogramKind::Exponential, 0.5),
            c(VariogramKind::Gaussian, 0.5),
        ])
        .unwrap();
        assert_eq!(best.model.kind(), VariogramKind::Spherical);

        let best = select_best(vec![
            c(VariogramKind::Exponential, 0.5),
            c(VariogramKind::Linear, 0.1),
        ])
        .unwrap();
        assert_eq!(best.model.kind(), VariogramKind::Linear);

        assert!(select_best(vec![c(VariogramKind::Gaussian, f64::NAN)]).is_none());
    }

    #[test]
    fn too_few_bins() {
        let curve = ExperimentalVariogram::new(vec![LagBounds::new(0.0, 1.0)], vec![1.0], vec![4]);
        assert!(matches!(
            VariogramFitter::new(&curve),
            Err(KrigingError::InsufficientData {
                bins: 1,
                required: 2
            })
        ));
    }

    #[test]
    fn zero_curve_has_no_model() {
        let lags = (0..4)
            .map(|k| LagBounds::new(k as f64, k as f64 + 1.0))
            .collect::<Vec<_>>();
        let curve = ExperimentalVariogram::new(lags, vec![0.0; 4], vec![1; 4]);
        assert!(matches!(
            VariogramFitter::new(&curve).unwrap().fit(),
            Err(KrigingError::NoValidModel { .. })
        ));
    }

    #[test]
    fn noisy_curve_fits_stay_continuous() {
        let lags = (0..6)
            .map(|k| LagBounds::new(k as f64 * 10.0, (k + 1) as f64 * 10.0))
            .collect::<Vec<_>>();
        let curve = ExperimentalVariogram::new(
            lags,
            vec![120.0, 310.0, 280.0, 420.0, 390.0, 400.0],
            vec![12; 6],
        );
        let fitter = VariogramFitter::new(&curve).unwrap();
        let [nugget, sill, range] = fitter.initial_guess().unwrap();
        assert_eq!([nugget, sill, range], [120.0, 420.0, 35.0]);

        assert!(fitter.fit().is_ok());
        for c in fitter.candidates() {
            let start = TheoreticalVariogram::new(c.model.kind(), nugget, sill, range);
            assert!(c.error <= start.fit_error(&curve));

            let r = c.model.range();
            assert_relative_eq!(
                c.model.semivariance(r * (1.0 - 1e-12)),
                c.model.semivariance(r),
                epsilon = 1e-6 * c.model.sill()
            );
        }
    }

    #[test]
    fn iteration_cap_discards_candidate() {
        let truth = TheoreticalVariogram::new(VariogramKind::Spherical, 0.5, 4.0, 6.0);
        let mut curve = curve_from(&truth, 10, 1.0);
        curve.semivariance[4] += 0.3;

        let options = FitterOptions {
            max_iters: 3,
            ..FitterOptions::default()
        };
        let fitter = VariogramFitter::with_options(&curve, options).unwrap();
        assert!(matches!(
            fitter.fit_kind(VariogramKind::Spherical),
            Err(KrigingError::NoValidModel { .. })
        ));
        assert!(matches!(fitter.fit(), Err(KrigingError::NoValidModel { .. })));
    }
}
