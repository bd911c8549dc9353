//! Compressor model.
//!
//! ## Model
//!
//! Same relation set as the pump, compression form:
//!
//! ```text
//! (h_out - h_in) * eta_s = h(p_out, s_in) - h_in     (eta_s set)
//! m * (h_out - h_in) = power                         (power set)
//! p_out = pr * p_in                                  (pr set)
//! eta_s = eta_s_design * f(m / m_design)             (eta_s_char set)
//! ```

use crate::equation::{Equation, TurboKind};
use crate::error::ComponentResult;
use crate::model::EquationContext;
use crate::param::{CharParam, Param, ParamKey};
use crate::pump::{machine_derived, machine_equations, validate_machine};
use crate::state::SystemView;

#[derive(Debug, Clone, Default)]
pub struct Compressor {
    /// Isentropic efficiency (0..1].
    pub eta_s: Param,
    /// Shaft power (W), positive.
    pub power: Param,
    /// Outlet/inlet pressure ratio.
    pub pr: Param,
    /// Efficiency derate vs normalized mass flow; needs a design point.
    pub eta_s_char: CharParam,
}

impl Compressor {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn validate(&self, label: &str) -> ComponentResult<()> {
        validate_machine(label, &self.eta_s, &self.eta_s_char)
    }

    pub(crate) fn equations(&self, ctx: &EquationContext<'_>) -> ComponentResult<Vec<Equation>> {
        machine_equations(
            ctx,
            TurboKind::Compression,
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
        machine_derived(ctx, sys, TurboKind::Compression)
    }
}
