//! The closed set of component models and the context they build
//! equations in.

use tc_core::{CompId, ConnId};
use tc_fluids::Species;

use crate::compressor::Compressor;
use crate::equation::{Equation, EquationKind, VarRef};
use crate::error::{ComponentError, ComponentResult};
use crate::heat_exchanger::HeatExchanger;
use crate::merge::Merge;
use crate::param::{Mode, ParamKey};
use crate::pump::Pump;
use crate::separator::Separator;
use crate::simple_heat_exchanger::SimpleHeatExchanger;
use crate::source::{CycleCloser, Sink, Source};
use crate::splitter::Splitter;
use crate::state::{DesignValues, FractionSpecs, SystemView};
use crate::turbine::Turbine;
use crate::valve::Valve;

/// Everything a component needs to know to emit its equations.
///
/// Built by the spec layer per component; `inlets`/`outlets` are in port
/// order and match the component's arity.
pub struct EquationContext<'a> {
    pub comp: CompId,
    pub label: &'a str,
    pub inlets: &'a [ConnId],
    pub outlets: &'a [ConnId],
    pub mode: Mode,
    pub species: &'a [Species],
    pub fractions: &'a FractionSpecs,
    /// Design snapshot; `None` while solving the design point.
    pub design: Option<&'a DesignValues>,
}

impl EquationContext<'_> {
    pub fn in1(&self) -> ConnId {
        self.inlets[0]
    }

    pub fn out1(&self) -> ConnId {
        self.outlets[0]
    }

    pub fn in2(&self) -> ConnId {
        self.inlets[1]
    }

    pub fn out2(&self) -> ConnId {
        self.outlets[1]
    }

    /// Design-snapshot value of one of this component's parameters.
    pub fn design_param(&self, key: ParamKey) -> ComponentResult<f64> {
        self.design
            .and_then(|d| d.param(self.comp, key))
            .ok_or_else(|| ComponentError::MissingDesign {
                what: format!("'{}' has no design value for '{}'", self.label, key),
            })
    }

    /// Design-snapshot mass flow of one of this component's connections.
    pub fn design_m(&self, conn: ConnId) -> ComponentResult<f64> {
        self.design
            .and_then(|d| d.m(conn))
            .ok_or_else(|| ComponentError::MissingDesign {
                what: format!(
                    "'{}' has no design mass flow on an attached connection",
                    self.label
                ),
            })
    }

    /// Wrap a kind into a tagged, scaled equation.
    pub fn eq(&self, kind: EquationKind, what: &str) -> Equation {
        Equation::new(kind, format!("{}: {}", self.label, what), self.fractions)
    }
}

/// Mass continuity over the whole component.
pub(crate) fn push_mass_balance(eqs: &mut Vec<Equation>, ctx: &EquationContext<'_>) {
    eqs.push(ctx.eq(
        EquationKind::MassBalance {
            inlets: ctx.inlets.to_vec(),
            outlets: ctx.outlets.to_vec(),
        },
        "mass balance",
    ));
}

/// Mass continuity of one stream through a two-stream component.
pub(crate) fn push_stream_mass_balance(
    eqs: &mut Vec<Equation>,
    ctx: &EquationContext<'_>,
    stream: usize,
    inlet: ConnId,
    outlet: ConnId,
) {
    eqs.push(ctx.eq(
        EquationKind::MassBalance {
            inlets: vec![inlet],
            outlets: vec![outlet],
        },
        &format!("mass balance {stream}"),
    ));
}

/// Equality propagation of composition from `from` to `to`.
///
/// One equation per species except the closing one (its fraction follows
/// from the sum-to-one closure). Pairs where both fractions are fixed are
/// skipped; the spec layer validates their consistency.
pub(crate) fn push_fraction_propagation(
    eqs: &mut Vec<Equation>,
    ctx: &EquationContext<'_>,
    from: ConnId,
    to: ConnId,
) {
    let n = ctx.fractions.n_species();
    if n <= 1 {
        return;
    }
    for idx in 0..(n - 1) as u8 {
        if ctx.fractions.is_free(from, idx) || ctx.fractions.is_free(to, idx) {
            let species = ctx.species[idx as usize];
            eqs.push(ctx.eq(
                EquationKind::Ref {
                    a: VarRef::Fraction(to, idx),
                    b: VarRef::Fraction(from, idx),
                    factor: 1.0,
                    offset: 0.0,
                },
                &format!("{} propagation", species.key()),
            ));
        }
    }
}

/// Species balances for a mixing or separating component.
///
/// The closing species is skipped, as are species whose fractions are fixed
/// on every attached connection.
pub(crate) fn push_species_balances(
    eqs: &mut Vec<Equation>,
    ctx: &EquationContext<'_>,
    inlets: &[ConnId],
    outlets: &[ConnId],
) {
    let n = ctx.fractions.n_species();
    if n <= 1 {
        return;
    }
    for idx in 0..(n - 1) as u8 {
        let any_free = inlets
            .iter()
            .chain(outlets)
            .any(|&c| ctx.fractions.is_free(c, idx));
        if any_free {
            let species = ctx.species[idx as usize];
            eqs.push(ctx.eq(
                EquationKind::SpeciesBalance {
                    inlets: inlets.to_vec(),
                    outlets: outlets.to_vec(),
                    idx,
                },
                &format!("{} balance", species.key()),
            ));
        }
    }
}

/// Closed set of component kinds known to the solver.
///
/// Arity is a property of the kind (merge, splitter and separator carry
/// theirs); the spec layer uses it to wire ports.
#[derive(Debug, Clone)]
pub enum ComponentModel {
    Source(Source),
    Sink(Sink),
    CycleCloser(CycleCloser),
    Valve(Valve),
    Pump(Pump),
    Compressor(Compressor),
    Turbine(Turbine),
    SimpleHeatExchanger(SimpleHeatExchanger),
    /// A pipe is a single-stream heat exchanger with pipe semantics in
    /// reports; the equation set is identical.
    Pipe(SimpleHeatExchanger),
    HeatExchanger(HeatExchanger),
    Merge(Merge),
    Splitter(Splitter),
    Separator(Separator),
}

impl ComponentModel {
    /// Stable kind name, used in reports and topology fingerprints.
    pub fn kind(&self) -> &'static str {
        match self {
            ComponentModel::Source(_) => "source",
            ComponentModel::Sink(_) => "sink",
            ComponentModel::CycleCloser(_) => "cycle_closer",
            ComponentModel::Valve(_) => "valve",
            ComponentModel::Pump(_) => "pump",
            ComponentModel::Compressor(_) => "compressor",
            ComponentModel::Turbine(_) => "turbine",
            ComponentModel::SimpleHeatExchanger(_) => "simple_heat_exchanger",
            ComponentModel::Pipe(_) => "pipe",
            ComponentModel::HeatExchanger(_) => "heat_exchanger",
            ComponentModel::Merge(_) => "merge",
            ComponentModel::Splitter(_) => "splitter",
            ComponentModel::Separator(_) => "separator",
        }
    }

    pub fn num_in(&self) -> u8 {
        match self {
            ComponentModel::Source(_) => 0,
            ComponentModel::HeatExchanger(_) => 2,
            ComponentModel::Merge(m) => m.num_in(),
            _ => 1,
        }
    }

    pub fn num_out(&self) -> u8 {
        match self {
            ComponentModel::Sink(_) => 0,
            ComponentModel::HeatExchanger(_) => 2,
            ComponentModel::Splitter(s) => s.num_out(),
            ComponentModel::Separator(s) => s.num_out(),
            _ => 1,
        }
    }

    /// Static configuration checks, run before any equation is formed.
    pub fn validate(&self, label: &str) -> ComponentResult<()> {
        match self {
            ComponentModel::Valve(v) => v.validate(label),
            ComponentModel::Pump(p) => p.validate(label),
            ComponentModel::Compressor(c) => c.validate(label),
            ComponentModel::Turbine(t) => t.validate(label),
            ComponentModel::SimpleHeatExchanger(hx) | ComponentModel::Pipe(hx) => {
                hx.validate(label)
            }
            ComponentModel::HeatExchanger(hx) => hx.validate(label),
            _ => Ok(()),
        }
    }

    /// Emit this component's equations for the context's mode.
    pub fn equations(&self, ctx: &EquationContext<'_>) -> ComponentResult<Vec<Equation>> {
        match self {
            ComponentModel::Source(_) | ComponentModel::Sink(_) => Ok(Vec::new()),
            ComponentModel::CycleCloser(c) => c.equations(ctx),
            ComponentModel::Valve(v) => v.equations(ctx),
            ComponentModel::Pump(p) => p.equations(ctx),
            ComponentModel::Compressor(c) => c.equations(ctx),
            ComponentModel::Turbine(t) => t.equations(ctx),
            ComponentModel::SimpleHeatExchanger(hx) | ComponentModel::Pipe(hx) => {
                hx.equations(ctx)
            }
            ComponentModel::HeatExchanger(hx) => hx.equations(ctx),
            ComponentModel::Merge(m) => m.equations(ctx),
            ComponentModel::Splitter(s) => s.equations(ctx),
            ComponentModel::Separator(s) => s.equations(ctx),
        }
    }

    /// Capacity and performance values derived from a converged design
    /// solution, destined for the design snapshot.
    pub fn derived(
        &self,
        ctx: &EquationContext<'_>,
        sys: &SystemView<'_>,
    ) -> ComponentResult<Vec<(ParamKey, f64)>> {
        match self {
            ComponentModel::Valve(v) => v.derived(ctx, sys),
            ComponentModel::Pump(p) => p.derived(ctx, sys),
            ComponentModel::Compressor(c) => c.derived(ctx, sys),
            ComponentModel::Turbine(t) => t.derived(ctx, sys),
            ComponentModel::SimpleHeatExchanger(hx) | ComponentModel::Pipe(hx) => {
                hx.derived(ctx, sys)
            }
            ComponentModel::HeatExchanger(hx) => hx.derived(ctx, sys),
            _ => Ok(Vec::new()),
        }
    }
}
