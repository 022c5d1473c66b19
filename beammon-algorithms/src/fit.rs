//! Levenberg-Marquardt fit of a single Gaussian to binned data.
//!
//! The model is `A * exp(-(x - mean)^2 / (2 sigma^2))`. Bins are weighted
//! by the inverse of their count (Neyman chi-square) and empty bins are
//! skipped, so at least three populated bins are needed.
//!
//! Steps are confined to the region the data can constrain: the mean stays
//! inside the populated range and the width between half the finest bin
//! spacing and the full range. A seed outside that region is pulled onto
//! its edge before the first step.

use thiserror::Error;

/// Minimum populated bins for three free parameters.
pub const MIN_POPULATED_BINS: usize = 3;

const LAMBDA_START: f64 = 1e-3;
const LAMBDA_MAX: f64 = 1e12;

/// Gaussian parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaussianParams {
    pub amplitude: f64,
    pub mean: f64,
    pub sigma: f64,
}

impl GaussianParams {
    #[must_use]
    pub fn new(amplitude: f64, mean: f64, sigma: f64) -> Self {
        Self {
            amplitude,
            mean,
            sigma,
        }
    }

    /// Evaluates the model at `x`.
    #[inline]
    #[must_use]
    pub fn eval(&self, x: f64) -> f64 {
        let d = (x - self.mean) / self.sigma;
        self.amplitude * (-0.5 * d * d).exp()
    }

    fn as_array(self) -> [f64; 3] {
        [self.amplitude, self.mean, self.sigma]
    }

    fn from_array(p: [f64; 3]) -> Self {
        // The model depends on sigma^2 only.
        Self::new(p[0], p[1], p[2].abs())
    }
}

/// Result of a converged fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaussianFit {
    pub params: GaussianParams,
    pub chi_square: f64,
    pub iterations: usize,
    pub populated_bins: usize,
}

/// Reasons a fit can fail.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitError {
    /// Fewer populated bins than free parameters.
    #[error("{populated} populated bins, need {MIN_POPULATED_BINS}")]
    TooFewPoints { populated: usize },

    /// The normal equations are degenerate at the seed.
    #[error("degenerate normal equations at the seed parameters")]
    Singular,

    /// No step from the seed lowered chi-square.
    #[error("no step from the seed lowered chi-square ({iterations} iterations)")]
    Stalled { iterations: usize },

    /// The iteration cap was reached.
    #[error("no convergence after {iterations} iterations")]
    NotConverged { iterations: usize },
}

/// Fit settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitOptions {
    pub max_iterations: usize,
    /// Stop once the relative chi-square decrease falls below this.
    pub tolerance: f64,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            tolerance: 1e-9,
        }
    }
}

/// Fits a Gaussian to `(x, count)` points starting from `seed`.
///
/// # Errors
/// See [`FitError`].
pub fn fit_gaussian(
    points: &[(f64, f64)],
    seed: GaussianParams,
    options: FitOptions,
) -> Result<GaussianFit, FitError> {
    let data: Vec<(f64, f64)> = points
        .iter()
        .copied()
        .filter(|&(x, y)| y > 0.0 && x.is_finite() && y.is_finite())
        .collect();
    if data.len() < MIN_POPULATED_BINS {
        return Err(FitError::TooFewPoints {
            populated: data.len(),
        });
    }

    let bounds = Bounds::of(&data);
    let mut params = bounds.clamp(seed.as_array());
    let mut chi2 = chi_square(&data, params);
    if !chi2.is_finite() {
        return Err(FitError::Singular);
    }
    let mut lambda = LAMBDA_START;
    let mut moved = false;

    for iteration in 1..=options.max_iterations {
        let (jtj, jtr) = normal_equations(&data, params);
        if iteration == 1 && (0..3).any(|i| !(jtj[i][i].is_finite() && jtj[i][i] > 0.0)) {
            return Err(FitError::Singular);
        }

        // Raise damping until a step lowers chi-square or damping saturates.
        loop {
            let mut damped = jtj;
            for (i, row) in damped.iter_mut().enumerate() {
                row[i] *= 1.0 + lambda;
            }
            let trial = solve3(damped, jtr)
                .map(|delta| {
                    [
                        params[0] + delta[0],
                        params[1] + delta[1],
                        params[2] + delta[2],
                    ]
                })
                .filter(|candidate| bounds.admits(*candidate))
                .map(|candidate| (candidate, chi_square(&data, candidate)));

            match trial {
                Some((candidate, trial_chi2)) if trial_chi2.is_finite() && trial_chi2 < chi2 => {
                    let decrease = chi2 - trial_chi2;
                    params = candidate;
                    chi2 = trial_chi2;
                    moved = true;
                    lambda = (lambda / 10.0).max(f64::EPSILON);
                    if decrease <= options.tolerance * chi2.max(f64::MIN_POSITIVE) {
                        return Ok(finish(params, chi2, iteration, data.len()));
                    }
                    break;
                }
                _ => {
                    lambda *= 10.0;
                    if lambda > LAMBDA_MAX {
                        // No downhill step left: at the minimum, unless the
                        // parameters never left the seed.
                        if !moved {
                            return Err(FitError::Stalled {
                                iterations: iteration,
                            });
                        }
                        return Ok(finish(params, chi2, iteration, data.len()));
                    }
                }
            }
        }
    }

    Err(FitError::NotConverged {
        iterations: options.max_iterations,
    })
}

/// Parameter region reachable by a step.
struct Bounds {
    mean_low: f64,
    mean_high: f64,
    sigma_low: f64,
    sigma_high: f64,
}

impl Bounds {
    fn of(data: &[(f64, f64)]) -> Self {
        let mut xs: Vec<f64> = data.iter().map(|&(x, _)| x).collect();
        xs.sort_by(f64::total_cmp);
        let low = xs[0];
        let high = xs[xs.len() - 1];
        let spacing = xs
            .windows(2)
            .map(|pair| pair[1] - pair[0])
            .fold(f64::INFINITY, f64::min);
        Self {
            mean_low: low,
            mean_high: high,
            sigma_low: spacing / 2.0,
            sigma_high: high - low,
        }
    }

    fn clamp(&self, [amplitude, mean, sigma]: [f64; 3]) -> [f64; 3] {
        [
            amplitude,
            mean.clamp(self.mean_low, self.mean_high),
            sigma.abs().clamp(self.sigma_low, self.sigma_high),
        ]
    }

    fn admits(&self, [amplitude, mean, sigma]: [f64; 3]) -> bool {
        let width = sigma.abs();
        amplitude > 0.0
            && (self.mean_low..=self.mean_high).contains(&mean)
            && width > 0.0
            && (self.sigma_low..=self.sigma_high).contains(&width)
    }
}

fn finish(params: [f64; 3], chi_square: f64, iterations: usize, populated_bins: usize) -> GaussianFit {
    GaussianFit {
        params: GaussianParams::from_array(params),
        chi_square,
        iterations,
        populated_bins,
    }
}

fn chi_square(data: &[(f64, f64)], params: [f64; 3]) -> f64 {
    let model = GaussianParams::from_array(params);
    data.iter()
        .map(|&(x, y)| {
            let r = y - model.eval(x);
            r * r / y
        })
        .sum()
}

/// Weighted `J^T J` and `J^T r` at `params`.
fn normal_equations(data: &[(f64, f64)], params: [f64; 3]) -> ([[f64; 3]; 3], [f64; 3]) {
    let [amplitude, mean, sigma] = params;
    let s2 = sigma * sigma;
    let mut jtj = [[0.0; 3]; 3];
    let mut jtr = [0.0; 3];

    for &(x, y) in data {
        let d = x - mean;
        let e = (-0.5 * d * d / s2).exp();
        let f = amplitude * e;
        let grad = [e, f * d / s2, f * d * d / (s2 * sigma)];
        let w = 1.0 / y;
        let r = y - f;
        for i in 0..3 {
            jtr[i] += w * grad[i] * r;
            for j in 0..3 {
                jtj[i][j] += w * grad[i] * grad[j];
            }
        }
    }
    (jtj, jtr)
}

/// Solves a 3x3 system by Gaussian elimination with partial pivoting.
fn solve3(mut a: [[f64; 3]; 3], mut b: [f64; 3]) -> Option<[f64; 3]> {
    for col in 0..3 {
        let pivot = (col..3).max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
        let magnitude = a[pivot][col].abs();
        if magnitude.is_nan() || magnitude <= f64::MIN_POSITIVE {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);
        for row in col + 1..3 {
            let factor = a[row][col] / a[col][col];
            for k in col..3 {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = [0.0; 3];
    for row in (0..3).rev() {
        let tail: f64 = (row + 1..3).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    x.iter().all(|v| v.is_finite()).then_some(x)
}
