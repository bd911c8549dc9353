//! Two-stream counterflow heat exchanger.
//!
//! Stream 1 (ports `in1`/`out1`) is the hot side by convention; the
//! terminal temperature differences are defined against it.
//!
//! ## Model
//!
//! ```text
//! m1 * (h_out1 - h_in1) + m2 * (h_out2 - h_in2) = 0     (always)
//! m1 * (h_out1 - h_in1) = q                             (q set)
//! m1 * (h_out1 - h_in1) + ka * td_log = 0               (ka set)
//! T_in1 - T_out2 = ttd_u                                (ttd_u set)
//! T_out1 - T_in2 = ttd_l                                (ttd_l set)
//! ```
//!
//! plus the per-stream pressure closures (`pr1`, `dp1`, `zeta1` and the
//! stream-2 counterparts). `td_log` is the log-mean of the two terminal
//! differences. With `ka_char1`/`ka_char2` the capacity follows
//!
//! ```text
//! ka = ka_design * 2 / (1/f1(m1/m1_design) + 1/f2(m2/m2_design))
//! ```

use crate::equation::{Equation, EquationKind, lmtd};
use crate::error::{ComponentError, ComponentResult};
use crate::model::{EquationContext, push_fraction_propagation, push_stream_mass_balance};
use crate::param::{CharParam, Mode, Param, ParamKey};
use crate::state::SystemView;

#[derive(Debug, Clone, Default)]
pub struct HeatExchanger {
    /// Heat duty of stream 1 (W); negative when stream 1 is hot.
    pub q: Param,
    /// Heat-transfer capacity kA (W/K).
    pub ka: Param,
    /// Upper terminal temperature difference `T_in1 - T_out2` (K).
    pub ttd_u: Param,
    /// Lower terminal temperature difference `T_out1 - T_in2` (K).
    pub ttd_l: Param,
    /// Stream-1 pressure closures.
    pub pr1: Param,
    pub dp1: Param,
    pub zeta1: Param,
    /// Stream-2 pressure closures.
    pub pr2: Param,
    pub dp2: Param,
    pub zeta2: Param,
    /// Per-stream kA derates; enable both or neither.
    pub ka_char1: CharParam,
    pub ka_char2: CharParam,
}

impl HeatExchanger {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn validate(&self, label: &str) -> ComponentResult<()> {
        if self.ka_char1.enabled != self.ka_char2.enabled {
            return Err(ComponentError::Configuration {
                what: format!("'{label}' must enable ka_char on both streams or neither"),
            });
        }
        if self.ka_char1.enabled {
            if self.ka_char1.curve.is_none() || self.ka_char2.curve.is_none() {
                return Err(ComponentError::Configuration {
                    what: format!("'{label}' enables ka_char without curves on both streams"),
                });
            }
            if self.ka_char1.role != self.ka_char2.role {
                return Err(ComponentError::Configuration {
                    what: format!("'{label}' ka_char roles differ between streams"),
                });
            }
            let overlap = [Mode::Design, Mode::Offdesign]
                .into_iter()
                .any(|m| self.ka.role.active(m) && self.ka_char1.role.active(m));
            if self.ka.is_set() && overlap {
                return Err(ComponentError::Configuration {
                    what: format!("'{label}' sets both ka and ka_char for the same mode"),
                });
            }
        }
        Ok(())
    }

    pub(crate) fn equations(&self, ctx: &EquationContext<'_>) -> ComponentResult<Vec<Equation>> {
        let (in1, in2) = (ctx.in1(), ctx.in2());
        let (out1, out2) = (ctx.out1(), ctx.out2());
        let mut eqs = Vec::new();
        push_stream_mass_balance(&mut eqs, ctx, 1, in1, out1);
        push_stream_mass_balance(&mut eqs, ctx, 2, in2, out2);
        push_fraction_propagation(&mut eqs, ctx, in1, out1);
        push_fraction_propagation(&mut eqs, ctx, in2, out2);

        // The two streams always exchange exactly their enthalpy flows.
        eqs.push(ctx.eq(
            EquationKind::EnergyBalanceTwo {
                in1,
                out1,
                in2,
                out2,
            },
            "energy balance",
        ));

        if let Some(e) = self.q.resolve(ParamKey::Q, ctx)? {
            eqs.push(ctx.eq(
                EquationKind::EnergySpec {
                    inlet: in1,
                    outlet: out1,
                    e,
                },
                "q",
            ));
        }
        if let Some(ka) = self.ka.resolve(ParamKey::Ka, ctx)? {
            eqs.push(ctx.eq(
                EquationKind::KaCounterflow {
                    in1,
                    out1,
                    in2,
                    out2,
                    ka,
                },
                "ka",
            ));
        }
        if self.ka_char1.active(ctx.mode) {
            let curve1 = self.ka_char1.require_curve(ParamKey::KaChar)?.clone();
            let curve2 = self.ka_char2.require_curve(ParamKey::KaChar)?.clone();
            let ka_design = ctx.design_param(ParamKey::Ka)?;
            let m1_design = ctx.design_m(in1)?;
            let m2_design = ctx.design_m(in2)?;
            eqs.push(ctx.eq(
                EquationKind::KaCharCounterflow {
                    in1,
                    out1,
                    in2,
                    out2,
                    ka_design,
                    m1_design,
                    m2_design,
                    curve1,
                    curve2,
                },
                "ka_char",
            ));
        }
        if let Some(ttd) = self.ttd_u.resolve(ParamKey::TtdU, ctx)? {
            eqs.push(ctx.eq(
                EquationKind::TempDiffUpper {
                    hot_in: in1,
                    cold_out: out2,
                    ttd,
                },
                "ttd_u",
            ));
        }
        if let Some(ttd) = self.ttd_l.resolve(ParamKey::TtdL, ctx)? {
            eqs.push(ctx.eq(
                EquationKind::TempDiffLower {
                    hot_out: out1,
                    cold_in: in2,
                    ttd,
                },
                "ttd_l",
            ));
        }

        for (pr, dp, zeta, inlet, outlet, pr_key, dp_key, zeta_key, suffix) in [
            (
                &self.pr1,
                &self.dp1,
                &self.zeta1,
                in1,
                out1,
                ParamKey::Pr1,
                ParamKey::Dp1,
                ParamKey::Zeta1,
                "1",
            ),
            (
                &self.pr2,
                &self.dp2,
                &self.zeta2,
                in2,
                out2,
                ParamKey::Pr2,
                ParamKey::Dp2,
                ParamKey::Zeta2,
                "2",
            ),
        ] {
            if let Some(pr) = pr.resolve(pr_key, ctx)? {
                eqs.push(ctx.eq(
                    EquationKind::PressureRatio { inlet, outlet, pr },
                    &format!("pr{suffix}"),
                ));
            }
            if let Some(dp) = dp.resolve(dp_key, ctx)? {
                eqs.push(ctx.eq(
                    EquationKind::PressureDrop { inlet, outlet, dp },
                    &format!("dp{suffix}"),
                ));
            }
            if let Some(zeta) = zeta.resolve(zeta_key, ctx)? {
                eqs.push(ctx.eq(
                    EquationKind::Zeta {
                        inlet,
                        outlet,
                        zeta,
                    },
                    &format!("zeta{suffix}"),
                ));
            }
        }
        Ok(eqs)
    }

    pub(crate) fn derived(
        &self,
        ctx: &EquationContext<'_>,
        sys: &SystemView<'_>,
    ) -> ComponentResult<Vec<(ParamKey, f64)>> {
        let (in1, in2) = (ctx.in1(), ctx.in2());
        let (out1, out2) = (ctx.out1(), ctx.out2());
        let duty = sys.m(in1) * (sys.h(out1) - sys.h(in1));
        let ttd_u = sys.temperature(in1)? - sys.temperature(out2)?;
        let ttd_l = sys.temperature(out1)? - sys.temperature(in2)?;

        let mut out = vec![
            (ParamKey::Q, duty),
            (ParamKey::TtdU, ttd_u),
            (ParamKey::TtdL, ttd_l),
            (ParamKey::Pr1, sys.p(out1) / sys.p(in1)),
            (ParamKey::Pr2, sys.p(out2) / sys.p(in2)),
            (ParamKey::Dp1, sys.p(in1) - sys.p(out1)),
            (ParamKey::Dp2, sys.p(in2) - sys.p(out2)),
        ];
        let td_log = lmtd(ttd_u, ttd_l);
        if td_log.is_finite() && td_log.abs() > 1e-9 {
            out.push((ParamKey::Ka, -duty / td_log));
        }
        for (inlet, outlet, key) in [(in1, out1, ParamKey::Zeta1), (in2, out2, ParamKey::Zeta2)] {
            let m = sys.m(inlet);
            if m.abs() > 1e-12 {
                let v_avg = (sys.spec_volume(inlet)? + sys.spec_volume(outlet)?) / 2.0;
                let zeta = (sys.p(inlet) - sys.p(outlet)) * std::f64::consts::PI.powi(2)
                    / (8.0 * m * m.abs() * v_avg);
                if zeta.is_finite() {
                    out.push((key, zeta));
                }
            }
        }
        Ok(out)
    }
}
