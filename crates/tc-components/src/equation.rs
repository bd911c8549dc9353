//! Residual equations as data.
//!
//! Components and the spec layer emit [`Equation`] values; the solver
//! evaluates them against a [`SystemView`] and assembles the Jacobian from
//! analytic rows where the form is linear or bilinear in the unknowns,
//! finite differences over the dependency set otherwise.
//!
//! Residuals are divided by a per-equation scale so pressures (1e5 Pa),
//! energies (1e5 W or J/kg) and temperatures (1e2 K) all enter the norm at
//! O(1). The solver applies no scaling of its own.

use tc_core::units::pa;
use tc_core::{CharLine, CompId, ConnId};
use tc_fluids::isentropic_enthalpy;

use crate::error::ComponentResult;
use crate::param::{ParamKey, SpecValue};
use crate::state::{FractionSpecs, SystemView};

/// A solvable scalar in the global system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VarRef {
    /// Mass flow of a connection (kg/s).
    MassFlow(ConnId),
    /// Pressure of a connection (Pa).
    Pressure(ConnId),
    /// Specific enthalpy of a connection (J/kg).
    Enthalpy(ConnId),
    /// Mass fraction of the species at this canonical index.
    Fraction(ConnId, u8),
    /// A component parameter solved as an unknown.
    Param(CompId, ParamKey),
}

pub const SCALE_PRESSURE: f64 = 1.0e5;
pub const SCALE_ENERGY: f64 = 1.0e5;
pub const SCALE_TEMPERATURE: f64 = 1.0e2;
pub const SCALE_MASS: f64 = 1.0;

/// Which way a turbomachine efficiency definition runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurboKind {
    /// Pumps and compressors: `(h_out - h_in) * eta_s = h_s - h_in`.
    Compression,
    /// Turbines: `h_out - h_in = eta_s * (h_s - h_in)`.
    Expansion,
}

/// One member of a power bus.
#[derive(Debug, Clone)]
pub struct BusTerm {
    pub inlet: ConnId,
    pub outlet: ConnId,
    /// Reference side of the efficiency.
    pub base: BusBase,
    pub eff: BusEff,
}

/// Whether the efficiency converts component power to bus power or the
/// other way around.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusBase {
    /// Bus share is `P * eta` (generator view).
    Component,
    /// Bus share is `P / eta` (motor view).
    Bus,
}

#[derive(Debug, Clone)]
pub enum BusEff {
    Const(f64),
    /// Efficiency from a curve over `|P| / p_design`.
    Char { curve: CharLine, p_design: f64 },
}

impl BusTerm {
    /// Component power `m * (h_out - h_in)` at the current iterate.
    pub fn power(&self, sys: &SystemView<'_>) -> f64 {
        sys.m(self.inlet) * (sys.h(self.outlet) - sys.h(self.inlet))
    }

    fn efficiency(&self, power: f64) -> f64 {
        match &self.eff {
            BusEff::Const(eta) => *eta,
            BusEff::Char { curve, p_design } => curve.evaluate(power.abs() / p_design),
        }
    }

    /// Contribution of this member to the bus total.
    pub fn contribution(&self, sys: &SystemView<'_>) -> f64 {
        let power = self.power(sys);
        let eta = self.efficiency(power);
        match self.base {
            BusBase::Component => power * eta,
            BusBase::Bus => power / eta,
        }
    }
}

/// The closed set of residual forms the solver understands.
#[derive(Debug, Clone)]
pub enum EquationKind {
    /// `a - factor * b - offset = 0`; covers equalities, reference
    /// specifications and propagation of fractions.
    Ref {
        a: VarRef,
        b: VarRef,
        factor: f64,
        offset: f64,
    },
    /// `sum(m_in) - sum(m_out) = 0`
    MassBalance {
        inlets: Vec<ConnId>,
        outlets: Vec<ConnId>,
    },
    /// `sum(x_s) - 1 = 0` over the canonical species on one connection.
    FractionSum { conn: ConnId },
    /// `sum(m_in * x_in) - sum(m_out * x_out) = 0` for one species.
    SpeciesBalance {
        inlets: Vec<ConnId>,
        outlets: Vec<ConnId>,
        idx: u8,
    },
    /// `sum(m_in * h_in) - m_out * h_out = 0` (adiabatic mixing).
    EnergyMix {
        inlets: Vec<ConnId>,
        outlet: ConnId,
    },
    /// `p_out - pr * p_in = 0`
    PressureRatio {
        inlet: ConnId,
        outlet: ConnId,
        pr: SpecValue,
    },
    /// `p_in - p_out - dp = 0`
    PressureDrop {
        inlet: ConnId,
        outlet: ConnId,
        dp: SpecValue,
    },
    /// Friction form `p_in - p_out - zeta * 8 m|m| v_avg / pi^2 = 0`.
    Zeta {
        inlet: ConnId,
        outlet: ConnId,
        zeta: SpecValue,
    },
    /// Pressure drop from a curve, `p_in - p_out - f(x) = 0` with
    /// `x = m / m_design` when a design flow is given, absolute `m`
    /// otherwise.
    DpChar {
        inlet: ConnId,
        outlet: ConnId,
        curve: CharLine,
        m_design: Option<f64>,
    },
    /// `m * (h_out - h_in) - e = 0`; heat duty or shaft power.
    EnergySpec {
        inlet: ConnId,
        outlet: ConnId,
        e: SpecValue,
    },
    /// `m1 * (h_out1 - h_in1) + m2 * (h_out2 - h_in2) = 0`
    EnergyBalanceTwo {
        in1: ConnId,
        out1: ConnId,
        in2: ConnId,
        out2: ConnId,
    },
    /// Isentropic efficiency of a turbomachine.
    EtaS {
        machine: TurboKind,
        inlet: ConnId,
        outlet: ConnId,
        eta_s: SpecValue,
    },
    /// Efficiency modulated by a curve over `m / m_design`.
    EtaSChar {
        machine: TurboKind,
        inlet: ConnId,
        outlet: ConnId,
        eta_design: f64,
        m_design: f64,
        curve: CharLine,
    },
    /// Head curve over absolute volumetric flow,
    /// `(p_out - p_in) - f(m * v_in) = 0`.
    FlowChar {
        inlet: ConnId,
        outlet: ConnId,
        curve: CharLine,
    },
    /// Single-stream kA group against an ambient temperature:
    /// `m * (h_out - h_in) + ka * td_log = 0`.
    KaAmbient {
        inlet: ConnId,
        outlet: ConnId,
        ka: SpecValue,
        t_amb: f64,
    },
    /// Ambient kA group with `ka = ka_design * f(m / m_design)`.
    KaCharAmbient {
        inlet: ConnId,
        outlet: ConnId,
        ka_design: f64,
        m_design: f64,
        t_amb: f64,
        curve: CharLine,
    },
    /// Counterflow kA group of a two-stream exchanger (stream 1 hot):
    /// `m1 * (h_out1 - h_in1) + ka * td_log = 0`.
    KaCounterflow {
        in1: ConnId,
        out1: ConnId,
        in2: ConnId,
        out2: ConnId,
        ka: SpecValue,
    },
    /// Counterflow kA with per-stream derate curves combined as
    /// `2 / (1/f1 + 1/f2)`.
    KaCharCounterflow {
        in1: ConnId,
        out1: ConnId,
        in2: ConnId,
        out2: ConnId,
        ka_design: f64,
        m1_design: f64,
        m2_design: f64,
        curve1: CharLine,
        curve2: CharLine,
    },
    /// `(T_hot_in - T_cold_out) - ttd = 0`
    TempDiffUpper {
        hot_in: ConnId,
        cold_out: ConnId,
        ttd: SpecValue,
    },
    /// `(T_hot_out - T_cold_in) - ttd = 0`
    TempDiffLower {
        hot_out: ConnId,
        cold_in: ConnId,
        ttd: SpecValue,
    },
    /// `T - t_set = 0`
    TempSpec { conn: ConnId, t_set: f64 },
    /// `T_a - T_b = 0`
    TempEquality { a: ConnId, b: ConnId },
    /// `m * v - vdot = 0`
    VolFlowSpec { conn: ConnId, vdot: f64 },
    /// `sum(contributions) - total = 0` over bus members.
    BusTotal { terms: Vec<BusTerm>, total: f64 },
}

/// Log-mean of two terminal temperature differences.
///
/// Collapses to the arithmetic value when the differences coincide. A sign
/// change across the exchanger yields NaN, which the solver treats as a
/// failed step.
pub(crate) fn lmtd(ttd_a: f64, ttd_b: f64) -> f64 {
    if (ttd_a - ttd_b).abs() < 1e-9 {
        return ttd_a;
    }
    (ttd_a - ttd_b) / (ttd_a / ttd_b).ln()
}

fn value_of(sys: &SystemView<'_>, var: VarRef) -> f64 {
    match var {
        VarRef::MassFlow(c) => sys.m(c),
        VarRef::Pressure(c) => sys.p(c),
        VarRef::Enthalpy(c) => sys.h(c),
        VarRef::Fraction(c, idx) => sys.fraction(c, idx),
        VarRef::Param(comp, key) => sys.param(comp, key).unwrap_or(f64::NAN),
    }
}

fn spec_value(sys: &SystemView<'_>, spec: SpecValue) -> f64 {
    match spec {
        SpecValue::Const(v) => v,
        SpecValue::Var(comp, key) => sys.param(comp, key).unwrap_or(f64::NAN),
    }
}

/// Average specific volume between inlet and outlet states.
fn v_avg(sys: &SystemView<'_>, inlet: ConnId, outlet: ConnId) -> ComponentResult<f64> {
    Ok((sys.spec_volume(inlet)? + sys.spec_volume(outlet)?) / 2.0)
}

fn isentropic_outlet(
    sys: &SystemView<'_>,
    inlet: ConnId,
    outlet: ConnId,
) -> ComponentResult<f64> {
    let s_in = sys.stream(inlet);
    let h_s = isentropic_enthalpy(
        sys.props,
        pa(s_in.p),
        s_in.h,
        pa(sys.p(outlet)),
        &s_in.composition,
    )?;
    Ok(h_s)
}

fn eta_s_residual(
    sys: &SystemView<'_>,
    machine: TurboKind,
    inlet: ConnId,
    outlet: ConnId,
    eta: f64,
) -> ComponentResult<f64> {
    let h_s = isentropic_outlet(sys, inlet, outlet)?;
    let dh = sys.h(outlet) - sys.h(inlet);
    let dh_s = h_s - sys.h(inlet);
    Ok(match machine {
        TurboKind::Compression => dh * eta - dh_s,
        TurboKind::Expansion => dh - eta * dh_s,
    })
}

impl EquationKind {
    /// Evaluate the unscaled residual at the current iterate.
    pub fn residual(&self, sys: &SystemView<'_>) -> ComponentResult<f64> {
        match self {
            EquationKind::Ref {
                a,
                b,
                factor,
                offset,
            } => Ok(value_of(sys, *a) - factor * value_of(sys, *b) - offset),
            EquationKind::MassBalance { inlets, outlets } => {
                let m_in: f64 = inlets.iter().map(|&c| sys.m(c)).sum();
                let m_out: f64 = outlets.iter().map(|&c| sys.m(c)).sum();
                Ok(m_in - m_out)
            }
            EquationKind::FractionSum { conn } => {
                let sum: f64 = (0..sys.species.len() as u8)
                    .map(|idx| sys.fraction(*conn, idx))
                    .sum();
                Ok(sum - 1.0)
            }
            EquationKind::SpeciesBalance {
                inlets,
                outlets,
                idx,
            } => {
                let flow_in: f64 = inlets.iter().map(|&c| sys.m(c) * sys.fraction(c, *idx)).sum();
                let flow_out: f64 = outlets
                    .iter()
                    .map(|&c| sys.m(c) * sys.fraction(c, *idx))
                    .sum();
                Ok(flow_in - flow_out)
            }
            EquationKind::EnergyMix { inlets, outlet } => {
                let e_in: f64 = inlets.iter().map(|&c| sys.m(c) * sys.h(c)).sum();
                Ok(e_in - sys.m(*outlet) * sys.h(*outlet))
            }
            EquationKind::PressureRatio { inlet, outlet, pr } => {
                Ok(sys.p(*outlet) - spec_value(sys, *pr) * sys.p(*inlet))
            }
            EquationKind::PressureDrop { inlet, outlet, dp } => {
                Ok(sys.p(*inlet) - sys.p(*outlet) - spec_value(sys, *dp))
            }
            EquationKind::Zeta {
                inlet,
                outlet,
                zeta,
            } => {
                let m = sys.m(*inlet);
                let v = v_avg(sys, *inlet, *outlet)?;
                let friction =
                    spec_value(sys, *zeta) * 8.0 * m * m.abs() * v / std::f64::consts::PI.powi(2);
                Ok(sys.p(*inlet) - sys.p(*outlet) - friction)
            }
            EquationKind::DpChar {
                inlet,
                outlet,
                curve,
                m_design,
            } => {
                let x = match m_design {
                    Some(md) => sys.m(*inlet) / md,
                    None => sys.m(*inlet),
                };
                Ok(sys.p(*inlet) - sys.p(*outlet) - curve.evaluate(x))
            }
            EquationKind::EnergySpec { inlet, outlet, e } => {
                Ok(sys.m(*inlet) * (sys.h(*outlet) - sys.h(*inlet)) - spec_value(sys, *e))
            }
            EquationKind::EnergyBalanceTwo {
                in1,
                out1,
                in2,
                out2,
            } => Ok(sys.m(*in1) * (sys.h(*out1) - sys.h(*in1))
                + sys.m(*in2) * (sys.h(*out2) - sys.h(*in2))),
            EquationKind::EtaS {
                machine,
                inlet,
                outlet,
                eta_s,
            } => eta_s_residual(sys, *machine, *inlet, *outlet, spec_value(sys, *eta_s)),
            EquationKind::EtaSChar {
                machine,
                inlet,
                outlet,
                eta_design,
                m_design,
                curve,
            } => {
                let eta = eta_design * curve.evaluate(sys.m(*inlet) / m_design);
                eta_s_residual(sys, *machine, *inlet, *outlet, eta)
            }
            EquationKind::FlowChar {
                inlet,
                outlet,
                curve,
            } => {
                let vdot = sys.m(*inlet) * sys.spec_volume(*inlet)?;
                Ok(sys.p(*outlet) - sys.p(*inlet) - curve.evaluate(vdot))
            }
            EquationKind::KaAmbient {
                inlet,
                outlet,
                ka,
                t_amb,
            } => {
                let td_log = lmtd(
                    sys.temperature(*inlet)? - t_amb,
                    sys.temperature(*outlet)? - t_amb,
                );
                Ok(sys.m(*inlet) * (sys.h(*outlet) - sys.h(*inlet))
                    + spec_value(sys, *ka) * td_log)
            }
            EquationKind::KaCharAmbient {
                inlet,
                outlet,
                ka_design,
                m_design,
                t_amb,
                curve,
            } => {
                let td_log = lmtd(
                    sys.temperature(*inlet)? - t_amb,
                    sys.temperature(*outlet)? - t_amb,
                );
                let ka = ka_design * curve.evaluate(sys.m(*inlet) / m_design);
                Ok(sys.m(*inlet) * (sys.h(*outlet) - sys.h(*inlet)) + ka * td_log)
            }
            EquationKind::KaCounterflow {
                in1,
                out1,
                in2,
                out2,
                ka,
            } => {
                let td_log = lmtd(
                    sys.temperature(*in1)? - sys.temperature(*out2)?,
                    sys.temperature(*out1)? - sys.temperature(*in2)?,
                );
                Ok(sys.m(*in1) * (sys.h(*out1) - sys.h(*in1)) + spec_value(sys, *ka) * td_log)
            }
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
            } => {
                let td_log = lmtd(
                    sys.temperature(*in1)? - sys.temperature(*out2)?,
                    sys.temperature(*out1)? - sys.temperature(*in2)?,
                );
                let f1 = curve1.evaluate(sys.m(*in1) / m1_design);
                let f2 = curve2.evaluate(sys.m(*in2) / m2_design);
                let ka = ka_design * 2.0 / (1.0 / f1 + 1.0 / f2);
                Ok(sys.m(*in1) * (sys.h(*out1) - sys.h(*in1)) + ka * td_log)
            }
            EquationKind::TempDiffUpper {
                hot_in,
                cold_out,
                ttd,
            } => Ok(sys.temperature(*hot_in)? - sys.temperature(*cold_out)?
                - spec_value(sys, *ttd)),
            EquationKind::TempDiffLower {
                hot_out,
                cold_in,
                ttd,
            } => Ok(sys.temperature(*hot_out)? - sys.temperature(*cold_in)?
                - spec_value(sys, *ttd)),
            EquationKind::TempSpec { conn, t_set } => Ok(sys.temperature(*conn)? - t_set),
            EquationKind::TempEquality { a, b } => {
                Ok(sys.temperature(*a)? - sys.temperature(*b)?)
            }
            EquationKind::VolFlowSpec { conn, vdot } => {
                Ok(sys.m(*conn) * sys.spec_volume(*conn)? - vdot)
            }
            EquationKind::BusTotal { terms, total } => {
                let sum: f64 = terms.iter().map(|t| t.contribution(sys)).sum();
                Ok(sum - total)
            }
        }
    }

    /// Analytic Jacobian row, when the form is linear or bilinear in the
    /// unknowns. Property-backed forms return `None` and are differenced.
    pub fn partials(&self, sys: &SystemView<'_>) -> Option<Vec<(VarRef, f64)>> {
        match self {
            EquationKind::Ref { a, b, factor, .. } => {
                Some(vec![(*a, 1.0), (*b, -factor)])
            }
            EquationKind::MassBalance { inlets, outlets } => {
                let mut row = Vec::with_capacity(inlets.len() + outlets.len());
                row.extend(inlets.iter().map(|&c| (VarRef::MassFlow(c), 1.0)));
                row.extend(outlets.iter().map(|&c| (VarRef::MassFlow(c), -1.0)));
                Some(row)
            }
            EquationKind::FractionSum { conn } => Some(
                (0..sys.species.len() as u8)
                    .map(|idx| (VarRef::Fraction(*conn, idx), 1.0))
                    .collect(),
            ),
            EquationKind::SpeciesBalance {
                inlets,
                outlets,
                idx,
            } => {
                let mut row = Vec::with_capacity(2 * (inlets.len() + outlets.len()));
                for &c in inlets {
                    row.push((VarRef::MassFlow(c), sys.fraction(c, *idx)));
                    row.push((VarRef::Fraction(c, *idx), sys.m(c)));
                }
                for &c in outlets {
                    row.push((VarRef::MassFlow(c), -sys.fraction(c, *idx)));
                    row.push((VarRef::Fraction(c, *idx), -sys.m(c)));
                }
                Some(row)
            }
            EquationKind::EnergyMix { inlets, outlet } => {
                let mut row = Vec::with_capacity(2 * (inlets.len() + 1));
                for &c in inlets {
                    row.push((VarRef::MassFlow(c), sys.h(c)));
                    row.push((VarRef::Enthalpy(c), sys.m(c)));
                }
                row.push((VarRef::MassFlow(*outlet), -sys.h(*outlet)));
                row.push((VarRef::Enthalpy(*outlet), -sys.m(*outlet)));
                Some(row)
            }
            EquationKind::PressureRatio { inlet, outlet, pr } => {
                let mut row = vec![
                    (VarRef::Pressure(*outlet), 1.0),
                    (VarRef::Pressure(*inlet), -spec_value(sys, *pr)),
                ];
                if let SpecValue::Var(comp, key) = pr {
                    row.push((VarRef::Param(*comp, *key), -sys.p(*inlet)));
                }
                Some(row)
            }
            EquationKind::PressureDrop { inlet, outlet, dp } => {
                let mut row = vec![
                    (VarRef::Pressure(*inlet), 1.0),
                    (VarRef::Pressure(*outlet), -1.0),
                ];
                if let SpecValue::Var(comp, key) = dp {
                    row.push((VarRef::Param(*comp, *key), -1.0));
                }
                Some(row)
            }
            EquationKind::EnergySpec { inlet, outlet, e } => {
                let m = sys.m(*inlet);
                let mut row = vec![
                    (VarRef::MassFlow(*inlet), sys.h(*outlet) - sys.h(*inlet)),
                    (VarRef::Enthalpy(*outlet), m),
                    (VarRef::Enthalpy(*inlet), -m),
                ];
                if let SpecValue::Var(comp, key) = e {
                    row.push((VarRef::Param(*comp, *key), -1.0));
                }
                Some(row)
            }
            EquationKind::EnergyBalanceTwo {
                in1,
                out1,
                in2,
                out2,
            } => Some(vec![
                (VarRef::MassFlow(*in1), sys.h(*out1) - sys.h(*in1)),
                (VarRef::Enthalpy(*out1), sys.m(*in1)),
                (VarRef::Enthalpy(*in1), -sys.m(*in1)),
                (VarRef::MassFlow(*in2), sys.h(*out2) - sys.h(*in2)),
                (VarRef::Enthalpy(*out2), sys.m(*in2)),
                (VarRef::Enthalpy(*in2), -sys.m(*in2)),
            ]),
            EquationKind::BusTotal { terms, .. } => {
                if terms
                    .iter()
                    .any(|t| matches!(t.eff, BusEff::Char { .. }))
                {
                    return None;
                }
                let mut row = Vec::with_capacity(3 * terms.len());
                for term in terms {
                    let eta = match term.eff {
                        BusEff::Const(eta) => eta,
                        BusEff::Char { .. } => unreachable!(),
                    };
                    let gain = match term.base {
                        BusBase::Component => eta,
                        BusBase::Bus => 1.0 / eta,
                    };
                    let dh = sys.h(term.outlet) - sys.h(term.inlet);
                    let m = sys.m(term.inlet);
                    row.push((VarRef::MassFlow(term.inlet), gain * dh));
                    row.push((VarRef::Enthalpy(term.outlet), gain * m));
                    row.push((VarRef::Enthalpy(term.inlet), -gain * m));
                }
                Some(row)
            }
            _ => None,
        }
    }

    /// Variables this residual can depend on. Finite differencing perturbs
    /// only these; fixed entries are filtered by the caller.
    pub fn deps(&self, fractions: &FractionSpecs) -> Vec<VarRef> {
        let mut out = Vec::new();
        let push_state = |out: &mut Vec<VarRef>, c: ConnId| {
            out.push(VarRef::Pressure(c));
            out.push(VarRef::Enthalpy(c));
            for idx in fractions.free_indices(c) {
                out.push(VarRef::Fraction(c, idx));
            }
        };
        let push_spec = |out: &mut Vec<VarRef>, spec: &SpecValue| {
            if let SpecValue::Var(comp, key) = spec {
                out.push(VarRef::Param(*comp, *key));
            }
        };
        match self {
            EquationKind::Ref { a, b, .. } => {
                out.push(*a);
                out.push(*b);
            }
            EquationKind::MassBalance { inlets, outlets } => {
                out.extend(inlets.iter().chain(outlets).map(|&c| VarRef::MassFlow(c)));
            }
            EquationKind::FractionSum { conn } => {
                for idx in 0..fractions.n_species() as u8 {
                    out.push(VarRef::Fraction(*conn, idx));
                }
            }
            EquationKind::SpeciesBalance {
                inlets,
                outlets,
                idx,
            } => {
                for &c in inlets.iter().chain(outlets) {
                    out.push(VarRef::MassFlow(c));
                    out.push(VarRef::Fraction(c, *idx));
                }
            }
            EquationKind::EnergyMix { inlets, outlet } => {
                for &c in inlets {
                    out.push(VarRef::MassFlow(c));
                    out.push(VarRef::Enthalpy(c));
                }
                out.push(VarRef::MassFlow(*outlet));
                out.push(VarRef::Enthalpy(*outlet));
            }
            EquationKind::PressureRatio { inlet, outlet, pr } => {
                out.push(VarRef::Pressure(*inlet));
                out.push(VarRef::Pressure(*outlet));
                push_spec(&mut out, pr);
            }
            EquationKind::PressureDrop { inlet, outlet, dp } => {
                out.push(VarRef::Pressure(*inlet));
                out.push(VarRef::Pressure(*outlet));
                push_spec(&mut out, dp);
            }
            EquationKind::Zeta {
                inlet,
                outlet,
                zeta,
            } => {
                out.push(VarRef::MassFlow(*inlet));
                push_state(&mut out, *inlet);
                push_state(&mut out, *outlet);
                push_spec(&mut out, zeta);
            }
            EquationKind::DpChar { inlet, outlet, .. } => {
                out.push(VarRef::MassFlow(*inlet));
                out.push(VarRef::Pressure(*inlet));
                out.push(VarRef::Pressure(*outlet));
            }
            EquationKind::EnergySpec { inlet, outlet, e } => {
                out.push(VarRef::MassFlow(*inlet));
                out.push(VarRef::Enthalpy(*inlet));
                out.push(VarRef::Enthalpy(*outlet));
                push_spec(&mut out, e);
            }
            EquationKind::EnergyBalanceTwo {
                in1,
                out1,
                in2,
                out2,
            } => {
                for &c in [in1, out1, in2, out2].iter() {
                    out.push(VarRef::Enthalpy(*c));
                }
                out.push(VarRef::MassFlow(*in1));
                out.push(VarRef::MassFlow(*in2));
            }
            EquationKind::EtaS {
                inlet,
                outlet,
                eta_s,
                ..
            } => {
                push_state(&mut out, *inlet);
                push_state(&mut out, *outlet);
                push_spec(&mut out, eta_s);
            }
            EquationKind::EtaSChar { inlet, outlet, .. } => {
                out.push(VarRef::MassFlow(*inlet));
                push_state(&mut out, *inlet);
                push_state(&mut out, *outlet);
            }
            EquationKind::FlowChar { inlet, outlet, .. } => {
                out.push(VarRef::MassFlow(*inlet));
                push_state(&mut out, *inlet);
                out.push(VarRef::Pressure(*outlet));
            }
            EquationKind::KaAmbient {
                inlet, outlet, ka, ..
            } => {
                out.push(VarRef::MassFlow(*inlet));
                push_state(&mut out, *inlet);
                push_state(&mut out, *outlet);
                push_spec(&mut out, ka);
            }
            EquationKind::KaCharAmbient { inlet, outlet, .. } => {
                out.push(VarRef::MassFlow(*inlet));
                push_state(&mut out, *inlet);
                push_state(&mut out, *outlet);
            }
            EquationKind::KaCounterflow {
                in1,
                out1,
                in2,
                out2,
                ka,
            } => {
                out.push(VarRef::MassFlow(*in1));
                for &c in [in1, out1, in2, out2].iter() {
                    push_state(&mut out, *c);
                }
                push_spec(&mut out, ka);
            }
            EquationKind::KaCharCounterflow {
                in1,
                out1,
                in2,
                out2,
                ..
            } => {
                out.push(VarRef::MassFlow(*in1));
                out.push(VarRef::MassFlow(*in2));
                for &c in [in1, out1, in2, out2].iter() {
                    push_state(&mut out, *c);
                }
            }
            EquationKind::TempDiffUpper {
                hot_in,
                cold_out,
                ttd,
            } => {
                push_state(&mut out, *hot_in);
                push_state(&mut out, *cold_out);
                push_spec(&mut out, ttd);
            }
            EquationKind::TempDiffLower {
                hot_out,
                cold_in,
                ttd,
            } => {
                push_state(&mut out, *hot_out);
                push_state(&mut out, *cold_in);
                push_spec(&mut out, ttd);
            }
            EquationKind::TempSpec { conn, .. } => push_state(&mut out, *conn),
            EquationKind::TempEquality { a, b } => {
                push_state(&mut out, *a);
                push_state(&mut out, *b);
            }
            EquationKind::VolFlowSpec { conn, .. } => {
                out.push(VarRef::MassFlow(*conn));
                push_state(&mut out, *conn);
            }
            EquationKind::BusTotal { terms, .. } => {
                for term in terms {
                    out.push(VarRef::MassFlow(term.inlet));
                    out.push(VarRef::Enthalpy(term.inlet));
                    out.push(VarRef::Enthalpy(term.outlet));
                }
            }
        }
        out
    }

    /// Characteristic evaluation points at the current iterate, for
    /// post-convergence extrapolation checks.
    pub fn curve_points(&self, sys: &SystemView<'_>) -> ComponentResult<Vec<(f64, CharLine)>> {
        Ok(match self {
            EquationKind::DpChar {
                inlet,
                curve,
                m_design,
                ..
            } => {
                let x = match m_design {
                    Some(md) => sys.m(*inlet) / md,
                    None => sys.m(*inlet),
                };
                vec![(x, curve.clone())]
            }
            EquationKind::EtaSChar {
                inlet,
                m_design,
                curve,
                ..
            } => vec![(sys.m(*inlet) / m_design, curve.clone())],
            EquationKind::FlowChar { inlet, curve, .. } => {
                vec![(sys.m(*inlet) * sys.spec_volume(*inlet)?, curve.clone())]
            }
            EquationKind::KaCharAmbient {
                inlet,
                m_design,
                curve,
                ..
            } => vec![(sys.m(*inlet) / m_design, curve.clone())],
            EquationKind::KaCharCounterflow {
                in1,
                in2,
                m1_design,
                m2_design,
                curve1,
                curve2,
                ..
            } => vec![
                (sys.m(*in1) / m1_design, curve1.clone()),
                (sys.m(*in2) / m2_design, curve2.clone()),
            ],
            EquationKind::BusTotal { terms, .. } => terms
                .iter()
                .filter_map(|t| match &t.eff {
                    BusEff::Char { curve, p_design } => {
                        Some((t.power(sys).abs() / p_design, curve.clone()))
                    }
                    BusEff::Const(_) => None,
                })
                .collect(),
            _ => Vec::new(),
        })
    }

    fn default_scale(&self) -> f64 {
        match self {
            EquationKind::Ref { a, .. } => var_scale(*a),
            EquationKind::MassBalance { .. }
            | EquationKind::FractionSum { .. }
            | EquationKind::SpeciesBalance { .. }
            | EquationKind::VolFlowSpec { .. } => SCALE_MASS,
            EquationKind::PressureRatio { .. }
            | EquationKind::PressureDrop { .. }
            | EquationKind::Zeta { .. }
            | EquationKind::DpChar { .. }
            | EquationKind::FlowChar { .. } => SCALE_PRESSURE,
            EquationKind::EnergyMix { .. }
            | EquationKind::EnergySpec { .. }
            | EquationKind::EnergyBalanceTwo { .. }
            | EquationKind::EtaS { .. }
            | EquationKind::EtaSChar { .. }
            | EquationKind::KaAmbient { .. }
            | EquationKind::KaCharAmbient { .. }
            | EquationKind::KaCounterflow { .. }
            | EquationKind::KaCharCounterflow { .. }
            | EquationKind::BusTotal { .. } => SCALE_ENERGY,
            EquationKind::TempDiffUpper { .. }
            | EquationKind::TempDiffLower { .. }
            | EquationKind::TempSpec { .. }
            | EquationKind::TempEquality { .. } => SCALE_TEMPERATURE,
        }
    }
}

fn var_scale(var: VarRef) -> f64 {
    match var {
        VarRef::Pressure(_) => SCALE_PRESSURE,
        VarRef::Enthalpy(_) => SCALE_ENERGY,
        VarRef::MassFlow(_) | VarRef::Fraction(..) | VarRef::Param(..) => SCALE_MASS,
    }
}

/// One scaled residual equation in the global system.
#[derive(Debug, Clone)]
pub struct Equation {
    pub kind: EquationKind,
    /// Human-readable origin, e.g. `"v1: isenthalpic"`. Shows up in
    /// singularity and convergence diagnostics.
    pub tag: String,
    pub scale: f64,
    /// Variables the residual can depend on, precomputed at build time.
    pub deps: Vec<VarRef>,
}

impl Equation {
    pub fn new(kind: EquationKind, tag: String, fractions: &FractionSpecs) -> Self {
        let scale = kind.default_scale();
        let deps = kind.deps(fractions);
        Self {
            kind,
            tag,
            scale,
            deps,
        }
    }

    /// Scaled residual at the current iterate.
    pub fn residual(&self, sys: &SystemView<'_>) -> ComponentResult<f64> {
        Ok(self.kind.residual(sys)? / self.scale)
    }

    /// Scaled analytic Jacobian row, if the form has one.
    pub fn partials(&self, sys: &SystemView<'_>) -> Option<Vec<(VarRef, f64)>> {
        self.kind.partials(sys).map(|row| {
            row.into_iter()
                .map(|(var, coeff)| (var, coeff / self.scale))
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::StreamState;
    use std::collections::HashMap;
    use tc_core::units::k;
    use tc_fluids::{Composition, PerfectGas, PropertyProvider, Species};

    fn air_stream(m: f64, p: f64, t: f64, gas: &PerfectGas) -> StreamState {
        let comp = Composition::pure(Species::Air);
        let h = gas.h_pt(pa(p), k(t), &comp).unwrap();
        StreamState {
            m,
            p,
            h,
            composition: comp,
        }
    }

    fn single_species() -> [Species; 1] {
        [Species::Air]
    }

    #[test]
    fn ref_equation_residual_and_partials() {
        let gas = PerfectGas::new();
        let species = single_species();
        let streams = vec![
            air_stream(1.0, 2.0e5, 300.0, &gas),
            air_stream(1.0, 1.0e5, 300.0, &gas),
        ];
        let params = HashMap::new();
        let sys = SystemView {
            streams: &streams,
            params: &params,
            species: &species,
            props: &gas,
        };

        let c0 = ConnId::from_index(0);
        let c1 = ConnId::from_index(1);
        // p1 = 0.5 * p0 holds exactly.
        let kind = EquationKind::Ref {
            a: VarRef::Pressure(c1),
            b: VarRef::Pressure(c0),
            factor: 0.5,
            offset: 0.0,
        };
        assert!(kind.residual(&sys).unwrap().abs() < 1e-12);

        let row = kind.partials(&sys).unwrap();
        assert_eq!(row[0], (VarRef::Pressure(c1), 1.0));
        assert_eq!(row[1], (VarRef::Pressure(c0), -0.5));
    }

    #[test]
    fn mass_balance_closes() {
        let gas = PerfectGas::new();
        let species = single_species();
        let streams = vec![
            air_stream(0.4, 1.0e5, 300.0, &gas),
            air_stream(0.6, 1.0e5, 300.0, &gas),
            air_stream(1.0, 1.0e5, 300.0, &gas),
        ];
        let params = HashMap::new();
        let sys = SystemView {
            streams: &streams,
            params: &params,
            species: &species,
            props: &gas,
        };

        let kind = EquationKind::MassBalance {
            inlets: vec![ConnId::from_index(0), ConnId::from_index(1)],
            outlets: vec![ConnId::from_index(2)],
        };
        assert!(kind.residual(&sys).unwrap().abs() < 1e-12);
    }

    #[test]
    fn pressure_ratio_reads_var_param() {
        let gas = PerfectGas::new();
        let species = single_species();
        let streams = vec![
            air_stream(1.0, 1.0e5, 300.0, &gas),
            air_stream(1.0, 3.0e5, 400.0, &gas),
        ];
        let comp_id = CompId::from_index(0);
        let mut params = HashMap::new();
        params.insert((comp_id, ParamKey::Pr), 3.0);
        let sys = SystemView {
            streams: &streams,
            params: &params,
            species: &species,
            props: &gas,
        };

        let kind = EquationKind::PressureRatio {
            inlet: ConnId::from_index(0),
            outlet: ConnId::from_index(1),
            pr: SpecValue::Var(comp_id, ParamKey::Pr),
        };
        assert!(kind.residual(&sys).unwrap().abs() < 1e-9);

        let row = kind.partials(&sys).unwrap();
        assert!(row.contains(&(VarRef::Param(comp_id, ParamKey::Pr), -1.0e5)));
    }

    #[test]
    fn eta_s_compression_consistent_state_is_zero() {
        let gas = PerfectGas::new();
        let species = single_species();
        let comp = Composition::pure(Species::Air);

        let p_in = 1.0e5;
        let p_out = 4.0e5;
        let h_in = gas.h_pt(pa(p_in), k(300.0), &comp).unwrap();
        let h_s = isentropic_enthalpy(&gas, pa(p_in), h_in, pa(p_out), &comp).unwrap();
        let eta = 0.85;
        let h_out = h_in + (h_s - h_in) / eta;

        let streams = vec![
            StreamState {
                m: 1.0,
                p: p_in,
                h: h_in,
                composition: comp.clone(),
            },
            StreamState {
                m: 1.0,
                p: p_out,
                h: h_out,
                composition: comp,
            },
        ];
        let params = HashMap::new();
        let sys = SystemView {
            streams: &streams,
            params: &params,
            species: &species,
            props: &gas,
        };

        let kind = EquationKind::EtaS {
            machine: TurboKind::Compression,
            inlet: ConnId::from_index(0),
            outlet: ConnId::from_index(1),
            eta_s: SpecValue::Const(eta),
        };
        assert!(kind.residual(&sys).unwrap().abs() < 1e-6);
    }

    #[test]
    fn temp_spec_hits_set_point() {
        let gas = PerfectGas::new();
        let species = single_species();
        let streams = vec![air_stream(1.0, 1.0e5, 350.0, &gas)];
        let params = HashMap::new();
        let sys = SystemView {
            streams: &streams,
            params: &params,
            species: &species,
            props: &gas,
        };

        let kind = EquationKind::TempSpec {
            conn: ConnId::from_index(0),
            t_set: 350.0,
        };
        assert!(kind.residual(&sys).unwrap().abs() < 1e-9);
    }

    #[test]
    fn lmtd_limits() {
        assert_eq!(lmtd(10.0, 10.0), 10.0);
        let v = lmtd(20.0, 10.0);
        assert!((v - 10.0 / (2.0_f64).ln()).abs() < 1e-12);
        // Sign change across the exchanger is non-physical.
        assert!(lmtd(10.0, -5.0).is_nan());
    }

    #[test]
    fn fraction_sum_detects_open_closure() {
        let gas = PerfectGas::new();
        let species = [Species::N2, Species::O2];
        let comp = Composition::from_pairs(vec![(Species::N2, 0.7), (Species::O2, 0.2)]).unwrap();
        let streams = vec![StreamState {
            m: 1.0,
            p: 1.0e5,
            h: 3.0e5,
            composition: comp,
        }];
        let params = HashMap::new();
        let sys = SystemView {
            streams: &streams,
            params: &params,
            species: &species,
            props: &gas,
        };

        let kind = EquationKind::FractionSum {
            conn: ConnId::from_index(0),
        };
        assert!((kind.residual(&sys).unwrap() - (-0.1)).abs() < 1e-12);
    }

    #[test]
    fn species_balance_row_carries_bilinear_terms() {
        let gas = PerfectGas::new();
        let species = [Species::N2, Species::O2];
        let mk = |m: f64, x_n2: f64| StreamState {
            m,
            p: 1.0e5,
            h: 3.0e5,
            composition: Composition::from_pairs(vec![
                (Species::N2, x_n2),
                (Species::O2, 1.0 - x_n2),
            ])
            .unwrap(),
        };
        let streams = vec![mk(1.0, 0.8), mk(2.0, 0.5), mk(3.0, 0.6)];
        let params = HashMap::new();
        let sys = SystemView {
            streams: &streams,
            params: &params,
            species: &species,
            props: &gas,
        };

        let kind = EquationKind::SpeciesBalance {
            inlets: vec![ConnId::from_index(0), ConnId::from_index(1)],
            outlets: vec![ConnId::from_index(2)],
            idx: 0,
        };
        // 1*0.8 + 2*0.5 - 3*0.6 = 0
        assert!(kind.residual(&sys).unwrap().abs() < 1e-12);

        let row = kind.partials(&sys).unwrap();
        assert!(row.contains(&(VarRef::Fraction(ConnId::from_index(1), 0), 2.0)));
        assert!(row.contains(&(VarRef::MassFlow(ConnId::from_index(2)), -0.6)));
    }

    #[test]
    fn bus_total_with_const_efficiency() {
        let gas = PerfectGas::new();
        let species = single_species();
        let streams = vec![
            air_stream(1.0, 1.0e5, 300.0, &gas),
            air_stream(1.0, 1.0e5, 400.0, &gas),
        ];
        let params = HashMap::new();
        let sys = SystemView {
            streams: &streams,
            params: &params,
            species: &species,
            props: &gas,
        };

        let c0 = ConnId::from_index(0);
        let c1 = ConnId::from_index(1);
        let power = sys.m(c0) * (sys.h(c1) - sys.h(c0));
        let term = BusTerm {
            inlet: c0,
            outlet: c1,
            base: BusBase::Component,
            eff: BusEff::Const(0.95),
        };
        let kind = EquationKind::BusTotal {
            terms: vec![term],
            total: power * 0.95,
        };
        assert!(kind.residual(&sys).unwrap().abs() < 1e-6);
        assert!(kind.partials(&sys).is_some());
    }

    #[test]
    fn scaled_equation_divides_residual() {
        let gas = PerfectGas::new();
        let species = single_species();
        let streams = vec![
            air_stream(1.0, 8.0e6, 300.0, &gas),
            air_stream(1.0, 1.5e6, 300.0, &gas),
        ];
        let params = HashMap::new();
        let sys = SystemView {
            streams: &streams,
            params: &params,
            species: &species,
            props: &gas,
        };

        let fractions = FractionSpecs::new(vec![vec![Some(1.0)], vec![Some(1.0)]], 1);
        let eq = Equation::new(
            EquationKind::PressureDrop {
                inlet: ConnId::from_index(0),
                outlet: ConnId::from_index(1),
                dp: SpecValue::Const(6.0e6),
            },
            "valve v1: dp".into(),
            &fractions,
        );
        // Raw residual is 5e5 Pa; scaled by 1e5 it is 5.0.
        assert!((eq.residual(&sys).unwrap() - 5.0).abs() < 1e-9);
        assert_eq!(eq.deps.len(), 2);
    }
}
