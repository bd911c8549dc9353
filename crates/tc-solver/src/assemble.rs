//! Residual and Jacobian evaluation over the lowered system.
//!
//! Analytic partial derivatives are used wherever an equation form has
//! them; the remaining rows are finite-differenced column by column,
//! restricted to the rows the dependency map says can move.

use std::collections::HashMap;

use nalgebra::{DMatrix, DVector};
use tc_components::{ComponentError, ParamKey, StreamState, SystemView, VarRef};
use tc_core::CompId;
use tc_fluids::PropertyProvider;

use crate::error::SolveResult;
use crate::newton::{SolverConfig, StepBounds};
use crate::registry::System;

/// Relative finite-difference step.
const FD_REL: f64 = 1e-7;

pub(crate) struct Evaluator<'a> {
    pub layout: &'a System,
    pub provider: &'a dyn PropertyProvider,
}

impl<'a> Evaluator<'a> {
    pub fn new(layout: &'a System, provider: &'a dyn PropertyProvider) -> Self {
        Self { layout, provider }
    }

    /// Materialize stream states and parameter values at an iterate.
    pub fn state(
        &self,
        x: &DVector<f64>,
    ) -> (Vec<StreamState>, HashMap<(CompId, ParamKey), f64>) {
        let mut streams = self.layout.base_streams.clone();
        let mut params = HashMap::new();
        for (slot, u) in self.layout.unknowns.iter().enumerate() {
            let v = x[slot];
            match u.var {
                VarRef::MassFlow(c) => streams[c.index() as usize].m = v,
                VarRef::Pressure(c) => streams[c.index() as usize].p = v,
                VarRef::Enthalpy(c) => streams[c.index() as usize].h = v,
                VarRef::Fraction(c, idx) => {
                    let species = self.layout.species[idx as usize];
                    streams[c.index() as usize]
                        .composition
                        .set_mass_fraction(species, v);
                }
                VarRef::Param(comp, key) => {
                    params.insert((comp, key), v);
                }
            }
        }
        (streams, params)
    }

    /// Scaled residual vector.
    ///
    /// Property failures and non-physical intermediate states become NaN
    /// entries so the line search can back off; anything else aborts the
    /// solve.
    pub fn residuals(&self, x: &DVector<f64>) -> SolveResult<DVector<f64>> {
        let (streams, params) = self.state(x);
        let sys = SystemView {
            streams: &streams,
            params: &params,
            species: &self.layout.species,
            props: self.provider,
        };
        let mut r = DVector::zeros(self.layout.equations.len());
        for (i, eq) in self.layout.equations.iter().enumerate() {
            r[i] = match eq.residual(&sys) {
                Ok(v) => v,
                Err(ComponentError::Property(_)) | Err(ComponentError::NonPhysical { .. }) => {
                    f64::NAN
                }
                Err(e) => return Err(e.into()),
            };
        }
        Ok(r)
    }

    /// Scaled Jacobian at `x`, given the residuals `r0` already computed
    /// there.
    pub fn jacobian(&self, x: &DVector<f64>, r0: &DVector<f64>) -> SolveResult<DMatrix<f64>> {
        let n = x.len();
        let mut jac = DMatrix::zeros(n, n);
        let mut fd_rows = vec![false; n];
        {
            let (streams, params) = self.state(x);
            let sys = SystemView {
                streams: &streams,
                params: &params,
                species: &self.layout.species,
                props: self.provider,
            };
            for (i, eq) in self.layout.equations.iter().enumerate() {
                match eq.partials(&sys) {
                    Some(row) => {
                        for (var, d) in row {
                            if let Some(&j) = self.layout.slot_of.get(&var) {
                                jac[(i, j)] += d;
                            }
                        }
                    }
                    None => fd_rows[i] = true,
                }
            }
        }

        for j in 0..n {
            let rows: Vec<usize> = self.layout.rows_of_slot[j]
                .iter()
                .copied()
                .filter(|&i| fd_rows[i])
                .collect();
            if rows.is_empty() {
                continue;
            }
            let dx = FD_REL * x[j].abs().max(1.0);
            let mut xp = x.clone();
            xp[j] += dx;
            let rp = self.residuals(&xp)?;
            let mut backward: Option<DVector<f64>> = None;
            for &i in &rows {
                let mut d = (rp[i] - r0[i]) / dx;
                if !d.is_finite() {
                    // The forward step left the property region.
                    if backward.is_none() {
                        let mut xm = x.clone();
                        xm[j] -= dx;
                        backward = Some(self.residuals(&xm)?);
                    }
                    if let Some(rm) = &backward {
                        d = (r0[i] - rm[i]) / dx;
                    }
                }
                jac[(i, j)] = d;
            }
        }
        Ok(jac)
    }
}

/// Slot bounds the damped steps must respect.
pub(crate) fn step_bounds(layout: &System, config: &SolverConfig) -> StepBounds {
    let mut bounds = StepBounds::unconstrained(layout.unknowns.len());
    for (j, u) in layout.unknowns.iter().enumerate() {
        match u.var {
            VarRef::Pressure(_) => bounds.lower[j] = Some(config.min_pressure),
            VarRef::MassFlow(_) => bounds.lower[j] = Some(config.min_mass_flow),
            VarRef::Fraction(..) => {
                bounds.lower[j] = Some(0.0);
                bounds.upper[j] = Some(1.0);
            }
            _ => {}
        }
    }
    bounds
}
