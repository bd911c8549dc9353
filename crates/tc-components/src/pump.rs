//! Pump model.
//!
//! ## Model
//!
//! ```text
//! (h_out - h_in) * eta_s = h(p_out, s_in) - h_in     (eta_s set)
//! m * (h_out - h_in) = power                         (power set)
//! p_out = pr * p_in                                  (pr set)
//! eta_s = eta_s_design * f(m / m_design)             (eta_s_char set)
//! p_out - p_in = f(m * v_in)                         (flow_char set)
//! ```
//!
//! ## Sign conventions
//!
//! Shaft power is positive: the fluid gains enthalpy. The efficiency
//! relation therefore keeps `h_out > h(p_out, s_in)` for `eta_s < 1`.

use crate::equation::{Equation, EquationKind, TurboKind};
use crate::error::{ComponentError, ComponentResult};
use crate::model::{EquationContext, push_fraction_propagation, push_mass_balance};
use crate::param::{CharParam, Mode, Param, ParamKey};
use crate::state::SystemView;
use tc_core::units::pa;
use tc_fluids::isentropic_enthalpy;

#[derive(Debug, Clone, Default)]
pub struct Pump {
    /// Isentropic efficiency (0..1].
    pub eta_s: Param,
    /// Shaft power (W), positive.
    pub power: Param,
    /// Outlet/inlet pressure ratio.
    pub pr: Param,
    /// Efficiency derate vs normalized mass flow; needs a design point.
    pub eta_s_char: CharParam,
    /// Head curve vs absolute volumetric flow.
    pub flow_char: CharParam,
}

impl Pump {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn validate(&self, label: &str) -> ComponentResult<()> {
        validate_machine(label, &self.eta_s, &self.eta_s_char)?;
        if self.flow_char.enabled && self.flow_char.curve.is_none() {
            return Err(ComponentError::Configuration {
                what: format!("'{label}' enables flow_char without a curve"),
            });
        }
        Ok(())
    }

    pub(crate) fn equations(&self, ctx: &EquationContext<'_>) -> ComponentResult<Vec<Equation>> {
        let mut eqs = machine_equations(
            ctx,
            TurboKind::Compression,
            &self.eta_s,
            &self.power,
            &self.pr,
            &self.eta_s_char,
        )?;
        if self.flow_char.active(ctx.mode) {
            let curve = self.flow_char.require_curve(ParamKey::FlowChar)?.clone();
            eqs.push(ctx.eq(
                EquationKind::FlowChar {
                    inlet: ctx.in1(),
                    outlet: ctx.out1(),
                    curve,
                },
                "flow_char",
            ));
        }
        Ok(eqs)
    }

    pub(crate) fn derived(
        &self,
        ctx: &EquationContext<'_>,
        sys: &SystemView<'_>,
    ) -> ComponentResult<Vec<(ParamKey, f64)>> {
        machine_derived(ctx, sys, TurboKind::Compression)
    }
}

/// eta_s and eta_s_char are alternatives over the same physics; both at
/// once over-determines the machine.
pub(crate) fn validate_machine(
    label: &str,
    eta_s: &Param,
    eta_s_char: &CharParam,
) -> ComponentResult<()> {
    if eta_s_char.enabled && eta_s_char.curve.is_none() {
        return Err(ComponentError::Configuration {
            what: format!("'{label}' enables eta_s_char without a curve"),
        });
    }
    let overlap = [Mode::Design, Mode::Offdesign]
        .into_iter()
        .any(|m| eta_s.role.active(m) && eta_s_char.role.active(m));
    if eta_s_char.enabled && eta_s.is_set() && overlap {
        return Err(ComponentError::Configuration {
            what: format!("'{label}' sets both eta_s and eta_s_char for the same mode"),
        });
    }
    Ok(())
}

/// Shared emission for pumps, compressors and turbines.
pub(crate) fn machine_equations(
    ctx: &EquationContext<'_>,
    machine: TurboKind,
    eta_s: &Param,
    power: &Param,
    pr: &Param,
    eta_s_char: &CharParam,
) -> ComponentResult<Vec<Equation>> {
    let (inlet, outlet) = (ctx.in1(), ctx.out1());
    let mut eqs = Vec::new();
    push_mass_balance(&mut eqs, ctx);
    push_fraction_propagation(&mut eqs, ctx, inlet, outlet);

    if let Some(eta) = eta_s.resolve(ParamKey::EtaS, ctx)? {
        eqs.push(ctx.eq(
            EquationKind::EtaS {
                machine,
                inlet,
                outlet,
                eta_s: eta,
            },
            "eta_s",
        ));
    }
    if let Some(e) = power.resolve(ParamKey::Power, ctx)? {
        eqs.push(ctx.eq(EquationKind::EnergySpec { inlet, outlet, e }, "power"));
    }
    if let Some(pr) = pr.resolve(ParamKey::Pr, ctx)? {
        eqs.push(ctx.eq(EquationKind::PressureRatio { inlet, outlet, pr }, "pr"));
    }
    if eta_s_char.active(ctx.mode) {
        let curve = eta_s_char.require_curve(ParamKey::EtaSChar)?.clone();
        // The curve modulates the design-point efficiency, so it only makes
        // sense once a design solution exists.
        let eta_design = ctx.design_param(ParamKey::EtaS)?;
        let m_design = ctx.design_m(inlet)?;
        eqs.push(ctx.eq(
            EquationKind::EtaSChar {
                machine,
                inlet,
                outlet,
                eta_design,
                m_design,
                curve,
            },
            "eta_s_char",
        ));
    }
    Ok(eqs)
}

/// Post-solve performance values common to the turbomachines.
pub(crate) fn machine_derived(
    ctx: &EquationContext<'_>,
    sys: &SystemView<'_>,
    machine: TurboKind,
) -> ComponentResult<Vec<(ParamKey, f64)>> {
    let (inlet, outlet) = (ctx.in1(), ctx.out1());
    let s_in = sys.stream(inlet);
    let h_s = isentropic_enthalpy(
        sys.props,
        pa(s_in.p),
        s_in.h,
        pa(sys.p(outlet)),
        &s_in.composition,
    )?;
    let dh = sys.h(outlet) - sys.h(inlet);
    let dh_s = h_s - sys.h(inlet);

    let mut out = vec![
        (ParamKey::Power, sys.m(inlet) * dh),
        (ParamKey::Pr, sys.p(outlet) / sys.p(inlet)),
    ];
    let eta = match machine {
        TurboKind::Compression => dh_s / dh,
        TurboKind::Expansion => dh / dh_s,
    };
    if eta.is_finite() {
        out.push((ParamKey::EtaS, eta));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::testkit::{Rig, residuals};
    use crate::state::StreamState;
    use tc_core::ConnId;
    use tc_core::units::k;
    use tc_fluids::{Composition, PerfectGas, PropertyProvider, Species};

    fn pump_rig(eta: f64) -> (Rig, f64, f64) {
        let gas = PerfectGas::new();
        let comp = Composition::pure(Species::Air);
        let (p_in, p_out) = (1.0e5, 4.0e5);
        let h_in = gas.h_pt(pa(p_in), k(300.0), &comp).unwrap();
        let h_s = isentropic_enthalpy(&gas, pa(p_in), h_in, pa(p_out), &comp).unwrap();
        let h_out = h_in + (h_s - h_in) / eta;
        let streams = vec![
            StreamState {
                m: 2.0,
                p: p_in,
                h: h_in,
                composition: comp.clone(),
            },
            StreamState {
                m: 2.0,
                p: p_out,
                h: h_out,
                composition: comp,
            },
        ];
        let power = 2.0 * (h_out - h_in);
        (Rig::air(streams), power, h_out - h_in)
    }

    #[test]
    fn consistent_pump_state_zeroes_all_residuals() {
        let (rig, power, _) = pump_rig(0.8);
        let inlets = [ConnId::from_index(0)];
        let outlets = [ConnId::from_index(1)];
        let ctx = rig.ctx("pu1", &inlets, &outlets, Mode::Design, None);

        let mut pump = Pump::new();
        pump.eta_s = Param::fixed(0.8);
        pump.power = Param::fixed(power);
        pump.pr = Param::fixed(4.0);

        let eqs = pump.equations(&ctx).unwrap();
        assert_eq!(eqs.len(), 4, "mass balance + eta_s + power + pr");
        for r in residuals(&eqs, &rig.sys()) {
            assert!(r.abs() < 1e-6);
        }
    }

    #[test]
    fn derived_recovers_efficiency() {
        let (rig, _, _) = pump_rig(0.8);
        let inlets = [ConnId::from_index(0)];
        let outlets = [ConnId::from_index(1)];
        let ctx = rig.ctx("pu1", &inlets, &outlets, Mode::Design, None);

        let derived = Pump::new().derived(&ctx, &rig.sys()).unwrap();
        let eta = derived
            .iter()
            .find(|(key, _)| *key == ParamKey::EtaS)
            .unwrap()
            .1;
        assert!((eta - 0.8).abs() < 1e-9);
    }

    #[test]
    fn eta_s_and_char_together_rejected() {
        let mut pump = Pump::new();
        pump.eta_s = Param::fixed(0.8);
        pump.eta_s_char = CharParam::with_curve(
            tc_core::CharLine::from_points(&[(0.5, 0.9), (1.0, 1.0)]).unwrap(),
        );
        assert!(pump.validate("pu1").is_err());

        // Different roles coexist: design eta_s, offdesign curve.
        pump.eta_s = Param::fixed_design(0.8);
        pump.eta_s_char.role = crate::param::Role::OffdesignOnly;
        assert!(pump.validate("pu1").is_ok());
    }
}
