//! Single-stream heat exchanger.
//!
//! One process stream exchanging heat with an unmodeled environment.
//! Pipes share this model: heat loss to ambient plus friction.
//!
//! ## Model
//!
//! ```text
//! m * (h_out - h_in) = q                        (q set)
//! p_out = pr * p_in                             (pr set)
//! p_in - p_out = dp                             (dp set)
//! p_in - p_out = zeta * 8 m|m| v_avg / pi^2     (zeta set)
//! m * (h_out - h_in) + ka * td_log = 0          (ka set)
//! ka = ka_design * f(m / m_design)              (ka_char set)
//! ```
//!
//! `td_log` is the log-mean of `T_in - t_amb` and `T_out - t_amb`; the kA
//! group therefore works for both heat loss and ambient pickup.

use crate::equation::{Equation, EquationKind, lmtd};
use crate::error::{ComponentError, ComponentResult};
use crate::model::{EquationContext, push_fraction_propagation, push_mass_balance};
use crate::param::{CharParam, Mode, Param, ParamKey, Spec, SpecValue};
use crate::state::SystemView;

#[derive(Debug, Clone, Default)]
pub struct SimpleHeatExchanger {
    /// Heat duty (W); negative when the stream loses heat.
    pub q: Param,
    /// Outlet/inlet pressure ratio.
    pub pr: Param,
    /// Pressure drop (Pa).
    pub dp: Param,
    /// Friction coefficient (1/m^4).
    pub zeta: Param,
    /// Heat-transfer capacity kA (W/K).
    pub ka: Param,
    /// Ambient temperature (K) for the kA group. Must be a fixed value.
    pub t_amb: Param,
    /// kA derate vs normalized mass flow; needs a design point.
    pub ka_char: CharParam,
}

impl SimpleHeatExchanger {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn validate(&self, label: &str) -> ComponentResult<()> {
        if self.ka_char.enabled && self.ka_char.curve.is_none() {
            return Err(ComponentError::Configuration {
                what: format!("'{label}' enables ka_char without a curve"),
            });
        }
        let overlap = [Mode::Design, Mode::Offdesign]
            .into_iter()
            .any(|m| self.ka.role.active(m) && self.ka_char.role.active(m));
        if self.ka_char.enabled && self.ka.is_set() && overlap {
            return Err(ComponentError::Configuration {
                what: format!("'{label}' sets both ka and ka_char for the same mode"),
            });
        }
        Ok(())
    }

    /// The fixed ambient temperature behind the kA group.
    fn ambient_temperature(&self, ctx: &EquationContext<'_>) -> ComponentResult<f64> {
        match self.t_amb.resolve(ParamKey::TAmb, ctx)? {
            Some(SpecValue::Const(t)) => Ok(t),
            Some(SpecValue::Var(..)) => Err(ComponentError::Configuration {
                what: format!("'{}' cannot solve t_amb as an unknown", ctx.label),
            }),
            None => Err(ComponentError::Configuration {
                what: format!("'{}' needs t_amb for its kA group", ctx.label),
            }),
        }
    }

    pub(crate) fn equations(&self, ctx: &EquationContext<'_>) -> ComponentResult<Vec<Equation>> {
        let (inlet, outlet) = (ctx.in1(), ctx.out1());
        let mut eqs = Vec::new();
        push_mass_balance(&mut eqs, ctx);
        push_fraction_propagation(&mut eqs, ctx, inlet, outlet);

        if let Some(e) = self.q.resolve(ParamKey::Q, ctx)? {
            eqs.push(ctx.eq(EquationKind::EnergySpec { inlet, outlet, e }, "q"));
        }
        if let Some(pr) = self.pr.resolve(ParamKey::Pr, ctx)? {
            eqs.push(ctx.eq(EquationKind::PressureRatio { inlet, outlet, pr }, "pr"));
        }
        if let Some(dp) = self.dp.resolve(ParamKey::Dp, ctx)? {
            eqs.push(ctx.eq(EquationKind::PressureDrop { inlet, outlet, dp }, "dp"));
        }
        if let Some(zeta) = self.zeta.resolve(ParamKey::Zeta, ctx)? {
            eqs.push(ctx.eq(EquationKind::Zeta { inlet, outlet, zeta }, "zeta"));
        }
        if let Some(ka) = self.ka.resolve(ParamKey::Ka, ctx)? {
            let t_amb = self.ambient_temperature(ctx)?;
            eqs.push(ctx.eq(
                EquationKind::KaAmbient {
                    inlet,
                    outlet,
                    ka,
                    t_amb,
                },
                "ka",
            ));
        }
        if self.ka_char.active(ctx.mode) {
            let curve = self.ka_char.require_curve(ParamKey::KaChar)?.clone();
            let t_amb = self.ambient_temperature(ctx)?;
            let ka_design = ctx.design_param(ParamKey::Ka)?;
            let m_design = ctx.design_m(inlet)?;
            eqs.push(ctx.eq(
                EquationKind::KaCharAmbient {
                    inlet,
                    outlet,
                    ka_design,
                    m_design,
                    t_amb,
                    curve,
                },
                "ka_char",
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
        let m = sys.m(inlet);
        let duty = m * (sys.h(outlet) - sys.h(inlet));
        let mut out = vec![
            (ParamKey::Q, duty),
            (ParamKey::Pr, sys.p(outlet) / sys.p(inlet)),
            (ParamKey::Dp, sys.p(inlet) - sys.p(outlet)),
        ];
        if m.abs() > 1e-12 {
            let v_avg = (sys.spec_volume(inlet)? + sys.spec_volume(outlet)?) / 2.0;
            let zeta = (sys.p(inlet) - sys.p(outlet)) * std::f64::consts::PI.powi(2)
                / (8.0 * m * m.abs() * v_avg);
            if zeta.is_finite() {
                out.push((ParamKey::Zeta, zeta));
            }
        }
        if let Spec::Fixed(t_amb) = self.t_amb.spec {
            out.push((ParamKey::TAmb, t_amb));
            let td_log = lmtd(
                sys.temperature(inlet)? - t_amb,
                sys.temperature(outlet)? - t_amb,
            );
            let ka = -duty / td_log;
            if ka.is_finite() && td_log.abs() > 1e-9 {
                out.push((ParamKey::Ka, ka));
            }
        }
        Ok(out)
    }
}
