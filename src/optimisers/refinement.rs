use levenberg_marquardt::{LeastSquaresProblem, LevenbergMarquardt};
use log::{debug, warn};
use nalgebra::{storage::Owned, DMatrix, DVector, Dyn};
use thiserror::Error;

use crate::core::Estimator;
use crate::settings::CoordinatesType;

/// Relative finite-difference step of the numerical Jacobians.
const DIFFERENCE_STEP: f64 = 1e-6;
const GRADIENT_TOLERANCE: f64 = 1e-15;
/// Singular values of `JᵀJ` below this fraction of its norm are dropped by
/// the pseudo-inverse.
const PSEUDO_INVERSE_TOLERANCE: f64 = 1e-10;

/// Why a refinement was abandoned.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RefinementError {
    #[error("no samples to refine over")]
    NoSamples,
    #[error("parameters do not describe a model or give non-finite residuals")]
    InvalidParameters,
    #[error("covariance: {0}")]
    Covariance(&'static str),
}

/// Least-squares problem over the inliers of a consensus model.
///
/// Parameters are the vector of [`Estimator::to_params`]; the residual vector
/// stacks the [`Estimator::signed_residuals`] of every sample. The Jacobian is
/// taken by central differences.
pub struct RefinementProblem<'a, E: Estimator> {
    estimator: &'a E,
    samples: &'a [E::Sample],
    params: DVector<f64>,
}

impl<'a, E: Estimator> RefinementProblem<'a, E> {
    pub fn new(estimator: &'a E, samples: &'a [E::Sample], params: DVector<f64>) -> Self {
        Self {
            estimator,
            samples,
            params,
        }
    }

    /// Residuals at `params`, `None` when they are not all finite.
    pub fn residuals_at(&self, params: &DVector<f64>) -> Option<DVector<f64>> {
        let model = self.estimator.from_params(params)?;
        let mut out = Vec::with_capacity(self.samples.len());
        for sample in self.samples {
            self.estimator.signed_residuals(&model, sample, &mut out);
        }
        out.iter()
            .all(|r| r.is_finite())
            .then(|| DVector::from_vec(out))
    }

    /// Squared norm of the residuals at `params`.
    pub fn cost_at(&self, params: &DVector<f64>) -> Option<f64> {
        self.residuals_at(params).map(|r| r.norm_squared())
    }

    /// Central differences.
    pub fn jacobian_at(&self, params: &DVector<f64>) -> Option<DMatrix<f64>> {
        let rows = self.residuals_at(params)?.len();
        let mut jacobian = DMatrix::<f64>::zeros(rows, params.len());
        for k in 0..params.len() {
            let h = DIFFERENCE_STEP * params[k].abs().max(1.0);
            let mut plus = params.clone();
            plus[k] += h;
            let mut minus = params.clone();
            minus[k] -= h;
            let r_plus = self.residuals_at(&plus)?;
            let r_minus = self.residuals_at(&minus)?;
            if r_plus.len() != rows || r_minus.len() != rows {
                return None;
            }
            jacobian.set_column(k, &((r_plus - r_minus) / (2.0 * h)));
        }
        Some(jacobian)
    }
}

impl<E: Estimator> LeastSquaresProblem<f64, Dyn, Dyn> for RefinementProblem<'_, E> {
    type ResidualStorage = Owned<f64, Dyn>;
    type JacobianStorage = Owned<f64, Dyn, Dyn>;
    type ParameterStorage = Owned<f64, Dyn>;

    fn set_params(&mut self, x: &DVector<f64>) {
        self.params.clone_from(x);
    }

    fn params(&self) -> DVector<f64> {
        self.params.clone()
    }

    fn residuals(&self) -> Option<DVector<f64>> {
        self.residuals_at(&self.params)
    }

    fn jacobian(&self) -> Option<DMatrix<f64>> {
        self.jacobian_at(&self.params)
    }
}

/// Outcome of a successful refinement.
#[derive(Debug, Clone)]
pub struct Refinement<M> {
    pub model: M,
    /// `(JᵀJ)⁺ σ²` in the requested representation, when asked for.
    pub covariance: Option<DMatrix<f64>>,
    pub initial_cost: f64,
    pub final_cost: f64,
    /// Residual evaluations spent by the solver.
    pub evaluations: usize,
}

/// Levenberg-Marquardt refiner over the inliers of a consensus model.
#[derive(Debug, Clone, Copy)]
pub struct Refiner {
    pub max_iterations: usize,
    /// Relative reduction of the cost, and of the parameter step, below which
    /// the solver stops.
    pub tolerance: f64,
}

impl Default for Refiner {
    fn default() -> Self {
        Self::new(crate::settings::DEFAULT_REFINE_MAX_ITERATIONS)
    }
}

impl Refiner {
    pub fn new(max_iterations: usize) -> Self {
        Self {
            max_iterations,
            tolerance: 1e-12,
        }
    }

    /// Refine `model` over `samples`.
    ///
    /// Returns `None` when the problem cannot be evaluated (no samples,
    /// invalid parameters, non-finite residuals); the caller keeps its model.
    /// The returned cost never exceeds the cost of `model`.
    pub fn refine<E: Estimator>(
        &self,
        estimator: &E,
        model: &E::Model,
        samples: &[E::Sample],
        keep_covariance: bool,
        coordinates: CoordinatesType,
    ) -> Option<Refinement<E::Model>> {
        match self.minimise(estimator, model, samples, keep_covariance, coordinates) {
            Ok(refinement) => {
                debug!(
                    "refinement over {} samples: cost {:.6e} -> {:.6e} in {} evaluations",
                    samples.len(),
                    refinement.initial_cost,
                    refinement.final_cost,
                    refinement.evaluations
                );
                Some(refinement)
            }
            Err(err) => {
                warn!("refinement failed, keeping the consensus model: {err}");
                None
            }
        }
    }

    fn minimise<E: Estimator>(
        &self,
        estimator: &E,
        model: &E::Model,
        samples: &[E::Sample],
        keep_covariance: bool,
        coordinates: CoordinatesType,
    ) -> Result<Refinement<E::Model>, RefinementError> {
        if samples.is_empty() {
            return Err(RefinementError::NoSamples);
        }
        let mut initial = estimator.to_params(model);
        estimator.normalize_params(&mut initial);
        let problem = RefinementProblem::new(estimator, samples, initial.clone());
        let initial_cost = problem
            .cost_at(&initial)
            .ok_or(RefinementError::InvalidParameters)?;

        let (problem, report) = if initial_cost > 0.0 {
            let lm = LevenbergMarquardt::new()
                .with_ftol(self.tolerance)
                .with_xtol(self.tolerance)
                .with_gtol(GRADIENT_TOLERANCE)
                .with_patience(self.max_iterations.max(1));
            let (problem, report) = lm.minimize(problem);
            if !report.termination.was_successful() {
                debug!("solver stopped early: {:?}", report.termination);
            }
            (problem, Some(report))
        } else {
            (problem, None)
        };

        let mut params = problem.params();
        estimator.normalize_params(&mut params);
        let mut cost = problem.cost_at(&params).unwrap_or(f64::INFINITY);
        if !(cost <= initial_cost) {
            params = initial;
            cost = initial_cost;
        }

        let refined = estimator
            .from_params(&params)
            .ok_or(RefinementError::InvalidParameters)?;
        let covariance = if keep_covariance {
            Some(covariance(estimator, &problem, &params, cost, coordinates)?)
        } else {
            None
        };

        Ok(Refinement {
            model: refined,
            covariance,
            initial_cost,
            final_cost: cost,
            evaluations: report.map_or(0, |r| r.number_of_evaluations),
        })
    }
}

/// `(JᵀJ)⁺ · SSR / (n - p)`, propagated through the representation change.
fn covariance<E: Estimator>(
    estimator: &E,
    problem: &RefinementProblem<'_, E>,
    params: &DVector<f64>,
    cost: f64,
    coordinates: CoordinatesType,
) -> Result<DMatrix<f64>, RefinementError> {
    let jacobian = problem
        .jacobian_at(params)
        .ok_or(RefinementError::InvalidParameters)?;
    let jtj = jacobian.tr_mul(&jacobian);
    let tolerance = PSEUDO_INVERSE_TOLERANCE * jtj.norm();
    let inverse = jtj
        .pseudo_inverse(tolerance)
        .map_err(RefinementError::Covariance)?;
    let dof = jacobian.nrows().saturating_sub(jacobian.ncols()).max(1);
    let native = inverse * (cost / dof as f64);

    let represented = estimator.represent(params, coordinates);
    if represented == *params {
        return Ok(native);
    }
    if represented.iter().any(|v| !v.is_finite()) {
        return Err(RefinementError::Covariance(
            "model has no finite coordinates in the requested representation",
        ));
    }
    let transform = representation_jacobian(estimator, params, coordinates);
    Ok(&transform * native * transform.transpose())
}

fn representation_jacobian<E: Estimator>(
    estimator: &E,
    params: &DVector<f64>,
    coordinates: CoordinatesType,
) -> DMatrix<f64> {
    let rows = estimator.represent(params, coordinates).len();
    let mut jacobian = DMatrix::<f64>::zeros(rows, params.len());
    for k in 0..params.len() {
        let h = DIFFERENCE_STEP * params[k].abs().max(1.0);
        let mut plus = params.clone();
        plus[k] += h;
        let mut minus = params.clone();
        minus[k] -= h;
        let diff = estimator.represent(&plus, coordinates) - estimator.represent(&minus, coordinates);
        jacobian.set_column(k, &(diff / (2.0 * h)));
    }
    jacobian
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimators::{AffineTransformation2DEstimator, Line2DEstimator, Point2DEstimator};
    use crate::models::{AffineTransformation2D, Line2D, Point2D};
    use approx::assert_relative_eq;
    use nalgebra::{Matrix2, Vector2};

    fn noisy_line_points() -> Vec<Point2D> {
        (0..20)
            .map(|i| {
                let x = i as f64;
                let noise = if i % 2 == 0 { 0.05 } else { -0.05 };
                Point2D::new(x, 0.5 * x + 1.0 + noise)
            })
            .collect()
    }

    #[test]
    fn refinement_lowers_the_cost() {
        let points = noisy_line_points();
        // Line through two of the points, tilted by the noise.
        let rough = Line2D::through(&points[0], &points[3]).unwrap();
        let refinement = Refiner::default()
            .refine(&Line2DEstimator, &rough, &points, false, CoordinatesType::Homogeneous)
            .unwrap();
        assert!(refinement.final_cost < refinement.initial_cost);
        assert!(refinement.evaluations > 0);
        assert!(refinement.covariance.is_none());

        // The least-squares line has slope 0.5.
        let l = refinement.model.coords;
        assert_relative_eq!(-l.x / l.y, 0.5, epsilon = 1e-3);
    }

    #[test]
    fn exact_model_is_returned_unchanged() {
        let points: Vec<Point2D> = (0..6).map(|i| Point2D::new(i as f64, 0.0)).collect();
        let line = Line2D::new(0.0, 2.0, 0.0);
        let refinement = Refiner::default()
            .refine(&Line2DEstimator, &line, &points, false, CoordinatesType::Homogeneous)
            .unwrap();
        assert_eq!(refinement.final_cost, 0.0);
        assert_eq!(refinement.evaluations, 0);
        assert!(refinement.model.distance(&Point2D::new(-7.0, 0.0)) < 1e-12);
    }

    #[test]
    fn numerical_jacobian_matches_affine_derivatives() {
        let samples = vec![(Point2D::new(2.0, 3.0), Point2D::new(0.0, 0.0))];
        let params = DVector::from_vec(vec![1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);
        let problem = RefinementProblem::new(&AffineTransformation2DEstimator, &samples, params.clone());
        let j = problem.jacobian().unwrap();
        assert_eq!(j, problem.jacobian_at(&params).unwrap());
        // d(a x + b y + tx)/d(a, b, c, d, tx, ty) for the first residual.
        let expected = [2.0, 3.0, 0.0, 0.0, 1.0, 0.0];
        for (k, e) in expected.iter().enumerate() {
            assert_relative_eq!(j[(0, k)], *e, epsilon = 1e-8);
        }
    }

    #[test]
    fn covariance_follows_the_requested_representation() {
        let point = Point2D::new(1.0, 2.0);
        let lines: Vec<Line2D> = (0..8)
            .map(|i| {
                let angle = 0.4 * i as f64;
                let offset = if i % 2 == 0 { 1e-3 } else { -1e-3 };
                let far = Point2D::new(1.0 + angle.cos(), 2.0 + angle.sin() + offset);
                Line2D::through(&point, &far).unwrap()
            })
            .collect();
        let lm = Refiner::default();

        let homogeneous = lm
            .refine(&Point2DEstimator, &point, &lines, true, CoordinatesType::Homogeneous)
            .unwrap();
        let cov = homogeneous.covariance.unwrap();
        assert_eq!(cov.shape(), (3, 3));

        let inhomogeneous = lm
            .refine(&Point2DEstimator, &point, &lines, true, CoordinatesType::Inhomogeneous)
            .unwrap();
        let cov = inhomogeneous.covariance.unwrap();
        assert_eq!(cov.shape(), (2, 2));
        assert_relative_eq!(cov, cov.transpose(), epsilon = 1e-12);
        assert!(cov[(0, 0)] >= 0.0 && cov[(1, 1)] >= 0.0);
    }

    #[test]
    fn affine_covariance_has_six_parameters() {
        let t = AffineTransformation2D::new(Matrix2::new(1.0, 0.2, -0.1, 0.9), Vector2::new(3.0, 1.0));
        let samples: Vec<_> = (0..12)
            .map(|i| {
                let p = Point2D::new((i % 4) as f64, (i / 4) as f64 * 1.5);
                let q = t.transform_point(&p);
                let jitter = if i % 3 == 0 { 1e-3 } else { -5e-4 };
                (p, Point2D::new(q.coords.x / q.coords.z + jitter, q.coords.y / q.coords.z))
            })
            .collect();
        let refinement = Refiner::default()
            .refine(&AffineTransformation2DEstimator, &t, &samples, true, CoordinatesType::Inhomogeneous)
            .unwrap();
        assert!(refinement.final_cost <= refinement.initial_cost);
        assert_eq!(refinement.covariance.unwrap().shape(), (6, 6));
    }

    #[test]
    fn empty_inlier_set_falls_back() {
        let line = Line2D::new(1.0, 1.0, 0.0);
        let result = Refiner::default().refine(
            &Line2DEstimator,
            &line,
            &[],
            true,
            CoordinatesType::Homogeneous,
        );
        assert!(result.is_none());
    }
}
