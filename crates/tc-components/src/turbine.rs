//! Turbine model.
//!
//! ## Model
//!
//! Expansion form of the isentropic-efficiency relation:
//!
//! ```text
//! h_out - h_in = eta_s * (h(p_out, s_in) - h_in)     (eta_s set)
//! m * (h_out - h_in) = power                         (power set)
//! p_out = pr * p_in                                  (pr set)
//! eta_s = eta_s_design * f(m / m_design)             (eta_s_char set)
//! ```
//!
//! ## Sign conventions
//!
//! Expansion lowers enthalpy, so `power` is negative for a producing
//! turbine: `m * (h_out - h_in) < 0`.

use crate::equation::{Equation, TurboKind};
use crate::error::ComponentResult;
use crate::model::EquationContext;
use crate::param::{CharParam, Param, ParamKey};
use crate::pump::{machine_derived, machine_equations, validate_machine};
use crate::state::SystemView;

#[derive(Debug, Clone, Default)]
pub struct Turbine {
    /// Isentropic efficiency (0..1].
    pub eta_s: Param,
    /// Shaft power (W), negative when producing.
    pub power: Param,
    /// Outlet/inlet pressure ratio (< 1 across an expander).
    pub pr: Param,
    /// Efficiency derate vs normalized mass flow; needs a design point.
    pub eta_s_char: CharParam,
}

impl Turbine {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn validate(&self, label: &str) -> ComponentResult<()> {
        validate_machine(label, &self.eta_s, &self.eta_s_char)
    }

    pub(crate) fn equations(&self, ctx: &EquationContext<'_>) -> ComponentResult<Vec<Equation>> {
        machine_equations(
            ctx,
            TurboKind::Expansion,
            &self.eta_s,
            &self.power,
            &self.pr,
            &self.eta_s_char,
        )
    }

    pub(crate) fn derived(
        &self,
        ctx: &EquationContext<'_>,
        sys: &SystemView<'_>,
    ) -> ComponentResult<Vec<(ParamKey, f64)>> {
        machine_derived(ctx, sys, TurboKind::Expansion)
    }
}
