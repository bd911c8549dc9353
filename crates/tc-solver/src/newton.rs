//! Damped Newton iteration on the assembled system.

use nalgebra::{DMatrix, DVector};
use tracing::{debug, info, warn};

use crate::error::{SolveError, SolveResult};

/// Iteration controls. The defaults solve well-posed process networks
/// without tuning.
#[derive(Debug, Clone)]
pub struct SolverConfig {
    /// Hard iteration cap.
    pub max_iterations: usize,
    /// Converged when the residual norm drops below this.
    pub abs_tol: f64,
    /// ... or below this fraction of the starting norm.
    pub rel_tol: f64,
    /// Cap on each |Δx| as a multiple of max(|x|, 1).
    pub max_rel_step: f64,
    /// Pressure floor applied after every step (Pa).
    pub min_pressure: f64,
    /// Mass-flow floor applied after every step (kg/s).
    pub min_mass_flow: f64,
    /// Step halvings allowed when an update lands outside the property
    /// region (non-finite residuals).
    pub max_backtracks: usize,
    /// Relative margin outside a characteristic's breakpoints before the
    /// solve reports extrapolation.
    pub extrapolation_margin: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            abs_tol: 1e-6,
            rel_tol: 1e-6,
            max_rel_step: 2.0,
            min_pressure: 100.0,
            min_mass_flow: 1e-6,
            max_backtracks: 8,
            extrapolation_margin: 0.1,
        }
    }
}

/// Per-slot bounds enforced after every Newton update.
#[derive(Debug, Clone, Default)]
pub(crate) struct StepBounds {
    /// Floor per slot, where the variable has one.
    pub lower: Vec<Option<f64>>,
    /// Ceiling per slot (mass fractions cap at one).
    pub upper: Vec<Option<f64>>,
}

impl StepBounds {
    /// Bounds that leave every slot unconstrained.
    pub fn unconstrained(n: usize) -> Self {
        Self {
            lower: vec![None; n],
            upper: vec![None; n],
        }
    }

    fn apply(&self, x: &mut DVector<f64>) {
        for j in 0..x.len() {
            if let Some(lo) = self.lower[j]
                && x[j] < lo
            {
                x[j] = lo;
            }
            if let Some(hi) = self.upper[j]
                && x[j] > hi
            {
                x[j] = hi;
            }
        }
    }
}

#[derive(Debug)]
pub(crate) struct NewtonOutcome {
    pub x: DVector<f64>,
    pub residual_norm: f64,
    pub iterations: usize,
}

/// Damped Newton with bounded steps.
///
/// Residual entries may come back non-finite when an iterate leaves the
/// property backend's validity region; the step is then halved up to
/// `max_backtracks` times. A non-finite residual at the starting point is
/// an error, reported with the offending equation tags.
pub(crate) fn damped_newton<F, J>(
    x0: DVector<f64>,
    residual_fn: F,
    jacobian_fn: J,
    bounds: &StepBounds,
    config: &SolverConfig,
    eq_tags: &[String],
) -> SolveResult<NewtonOutcome>
where
    F: Fn(&DVector<f64>) -> SolveResult<DVector<f64>>,
    J: Fn(&DVector<f64>, &DVector<f64>) -> SolveResult<DMatrix<f64>>,
{
    let mut x = x0;
    bounds.apply(&mut x);
    let mut r = residual_fn(&x)?;
    if let Some(bad) = nonfinite_tags(&r, eq_tags) {
        return Err(SolveError::InitialPoint {
            what: format!("residuals are non-finite at the starting point: {bad}"),
        });
    }
    let r0_norm = r.norm();
    let mut r_norm = r0_norm;

    for iter in 0..config.max_iterations {
        if r_norm < config.abs_tol || r_norm < config.rel_tol * r0_norm {
            info!(iterations = iter, residual_norm = r_norm, "converged");
            return Ok(NewtonOutcome {
                x,
                residual_norm: r_norm,
                iterations: iter,
            });
        }

        let jac = jacobian_fn(&x, &r)?;
        let dx = jac
            .lu()
            .solve(&(-r.clone()))
            .ok_or_else(|| SolveError::Singular {
                what: format!("LU factorization failed at iteration {iter}"),
            })?;

        let step = limit_step(&x, dx, config.max_rel_step);

        // Take the step; halve it while it lands outside the property
        // region.
        let mut alpha = 1.0;
        let mut accepted = false;
        for backtrack in 0..=config.max_backtracks {
            let mut x_new = &x + alpha * &step;
            bounds.apply(&mut x_new);
            let r_new = residual_fn(&x_new)?;
            if r_new.iter().all(|v| v.is_finite()) {
                x = x_new;
                r = r_new;
                r_norm = r.norm();
                accepted = true;
                break;
            }
            warn!(
                iteration = iter,
                halvings = backtrack + 1,
                "step left the property region; halving"
            );
            alpha *= 0.5;
        }
        if !accepted {
            return Err(SolveError::Convergence {
                iterations: iter,
                residual_norm: r_norm,
                worst: "every damped step produced non-finite residuals".to_string(),
            });
        }

        debug!(
            iteration = iter + 1,
            residual_norm = r_norm,
            step_scale = alpha,
            "newton step"
        );
    }

    if r_norm < config.abs_tol || r_norm < config.rel_tol * r0_norm {
        info!(
            iterations = config.max_iterations,
            residual_norm = r_norm,
            "converged"
        );
        return Ok(NewtonOutcome {
            x,
            residual_norm: r_norm,
            iterations: config.max_iterations,
        });
    }
    Err(SolveError::Convergence {
        iterations: config.max_iterations,
        residual_norm: r_norm,
        worst: worst_residuals(&r, eq_tags, 3),
    })
}

/// Clip each component of the raw Newton step to a multiple of the
/// variable's current magnitude. Keeps one bad Jacobian row from throwing
/// the whole iterate out of the property region.
fn limit_step(x: &DVector<f64>, mut dx: DVector<f64>, max_rel_step: f64) -> DVector<f64> {
    for j in 0..dx.len() {
        let cap = max_rel_step * x[j].abs().max(1.0);
        if dx[j].abs() > cap {
            dx[j] = cap * dx[j].signum();
        }
    }
    dx
}

fn nonfinite_tags(r: &DVector<f64>, eq_tags: &[String]) -> Option<String> {
    let bad: Vec<&str> = r
        .iter()
        .enumerate()
        .filter(|(_, v)| !v.is_finite())
        .take(3)
        .map(|(i, _)| eq_tags.get(i).map_or("?", String::as_str))
        .collect();
    if bad.is_empty() {
        None
    } else {
        Some(bad.join(", "))
    }
}

/// The `count` largest residuals by magnitude, formatted for diagnostics.
fn worst_residuals(r: &DVector<f64>, eq_tags: &[String], count: usize) -> String {
    let mut indexed: Vec<(usize, f64)> = r.iter().copied().enumerate().collect();
    indexed.sort_by(|a, b| b.1.abs().total_cmp(&a.1.abs()));
    indexed
        .iter()
        .take(count)
        .map(|(i, v)| {
            let tag = eq_tags.get(*i).map_or("?", String::as_str);
            format!("'{tag}' = {v:.3e}")
        })
        .collect::<Vec<_>>()
        .join(", ")
}
