//! Throttling valve.
//!
//! ## Model
//!
//! ```text
//! h_out = h_in                                  (always)
//! p_out = pr * p_in                             (pr set)
//! p_in - p_out = dp                             (dp set)
//! p_in - p_out = zeta * 8 m|m| v_avg / pi^2     (zeta set)
//! p_in - p_out = f(m / m_design)                (dp_char set)
//! ```
//!
//! The usual part-load setup fixes `pr` at the design point and carries
//! `zeta` from the design snapshot off-design.

use crate::equation::{Equation, EquationKind, VarRef};
use crate::error::{ComponentError, ComponentResult};
use crate::model::{EquationContext, push_fraction_propagation, push_mass_balance};
use crate::param::{CharParam, Mode, Param, ParamKey};
use crate::state::SystemView;

#[derive(Debug, Clone, Default)]
pub struct Valve {
    /// Outlet/inlet pressure ratio.
    pub pr: Param,
    /// Pressure drop (Pa).
    pub dp: Param,
    /// Friction coefficient (1/m^4).
    pub zeta: Param,
    /// Pressure drop vs normalized mass flow.
    pub dp_char: CharParam,
}

impl Valve {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn validate(&self, label: &str) -> ComponentResult<()> {
        if self.dp_char.enabled && self.dp_char.curve.is_none() {
            return Err(ComponentError::Configuration {
                what: format!("'{label}' enables dp_char without a curve"),
            });
        }
        Ok(())
    }

    pub(crate) fn equations(&self, ctx: &EquationContext<'_>) -> ComponentResult<Vec<Equation>> {
        let (inlet, outlet) = (ctx.in1(), ctx.out1());
        let mut eqs = Vec::new();
        push_mass_balance(&mut eqs, ctx);
        push_fraction_propagation(&mut eqs, ctx, inlet, outlet);

        // Throttling is isenthalpic in every mode.
        eqs.push(ctx.eq(
            EquationKind::Ref {
                a: VarRef::Enthalpy(outlet),
                b: VarRef::Enthalpy(inlet),
                factor: 1.0,
                offset: 0.0,
            },
            "isenthalpic",
        ));

        if let Some(pr) = self.pr.resolve(ParamKey::Pr, ctx)? {
            eqs.push(ctx.eq(EquationKind::PressureRatio { inlet, outlet, pr }, "pr"));
        }
        if let Some(dp) = self.dp.resolve(ParamKey::Dp, ctx)? {
            eqs.push(ctx.eq(EquationKind::PressureDrop { inlet, outlet, dp }, "dp"));
        }
        if let Some(zeta) = self.zeta.resolve(ParamKey::Zeta, ctx)? {
            eqs.push(ctx.eq(EquationKind::Zeta { inlet, outlet, zeta }, "zeta"));
        }
        if self.dp_char.active(ctx.mode) {
            let curve = self.dp_char.require_curve(ParamKey::DpChar)?.clone();
            let m_design = match ctx.mode {
                Mode::Offdesign => Some(ctx.design_m(inlet)?),
                Mode::Design => None,
            };
            eqs.push(ctx.eq(
                EquationKind::DpChar {
                    inlet,
                    outlet,
                    curve,
                    m_design,
                },
                "dp_char",
            ));
        }
        Ok(eqs)
    }

    pub(crate) fn derived(
        &self,
        ctx: &EquationContext<'_>,
        sys: &SystemView<'_>,
    ) -> ComponentResult<Vec<(ParamKey, f64)>> {
        let (inlet, outlet) = (ctx.in1(), ctx.out1());
        let mut out = vec![
            (ParamKey::Pr, sys.p(outlet) / sys.p(inlet)),
            (ParamKey::Dp, sys.p(inlet) - sys.p(outlet)),
        ];
        let m = sys.m(inlet);
        if m.abs() > 1e-12 {
            let v_avg = (sys.spec_volume(inlet)? + sys.spec_volume(outlet)?) / 2.0;
            let zeta = (sys.p(inlet) - sys.p(outlet)) * std::f64::consts::PI.powi(2)
                / (8.0 * m * m.abs() * v_avg);
            if zeta.is_finite() {
                out.push((ParamKey::Zeta, zeta));
            }
        }
        Ok(out)
    }
}
