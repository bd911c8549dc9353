//! System assembly: lowers a specified network into a square system of
//! unknowns and residual equations for one solve mode.
//!
//! Specified state variables are eliminated before the solve; everything
//! else becomes a slot in the iteration vector. The assembly fails fast
//! on inconsistent specifications and on a non-square system, before any
//! property call is made.

use std::collections::{BTreeSet, HashMap};

use tc_components::{
    ComponentModel, DesignValues, Equation, EquationContext, EquationKind, FractionSpecs, Mode,
    ParamKey, Role, StreamState, VarRef,
};
use tc_core::ConnId;
use tc_design::DesignRecord;
use tc_fluids::{Composition, Species};
use tc_net::Topology;
use tracing::debug;

use crate::bus;
use crate::error::{SolveError, SolveResult};
use crate::network::{CompositionSpec, ConnValue, ConnVar, Network};

const FRACTION_TOL: f64 = 1e-8;

/// One slot of the iteration vector.
#[derive(Debug)]
pub(crate) struct Unknown {
    pub var: VarRef,
    /// Shows up in singularity and initial-point diagnostics.
    pub tag: String,
    /// Explicit starting value, if the user gave one.
    pub init: Option<f64>,
}

/// The lowered, square system.
#[derive(Debug)]
pub(crate) struct System {
    pub unknowns: Vec<Unknown>,
    pub slot_of: HashMap<VarRef, usize>,
    /// For each slot, the equation rows whose residual can depend on it.
    pub rows_of_slot: Vec<Vec<usize>>,
    pub equations: Vec<Equation>,
    /// Canonical species, sorted; fraction indices refer into this.
    pub species: Vec<Species>,
    pub fractions: FractionSpecs,
    /// Per-connection states carrying the eliminated (fixed) values;
    /// unknown slots are overwritten at every evaluation.
    pub base_streams: Vec<StreamState>,
}

enum Lowered {
    Fixed(f64),
    Free,
    FreeWithRef {
        other: ConnId,
        factor: f64,
        offset: f64,
    },
}

pub(crate) fn build(
    net: &Network<'_>,
    mode: Mode,
    record: Option<&DesignRecord>,
) -> SolveResult<System> {
    let topo = &net.topo;

    for node in topo.components() {
        net.models[node.id.index() as usize].validate(&node.label)?;
    }

    let species = canonical_species(net)?;
    let fractions = fraction_rows(net, &species)?;
    check_propagation_pairs(net, &species, &fractions)?;

    let n_conns = topo.connections().len();
    let mut unknowns: Vec<Unknown> = Vec::new();
    let mut equations: Vec<Equation> = Vec::new();
    let mut base_streams: Vec<StreamState> = Vec::with_capacity(n_conns);

    // Lower m/p/h per connection and emit the specification equations
    // for temperature, volumetric flow and references.
    for conn in topo.connections() {
        let spec = &net.specs[conn.id.index() as usize];
        let label = conn.label.as_str();
        let mut base = [0.0f64; 3];

        let vars = [
            (&spec.m, "m", "mass flow", spec.m0),
            (&spec.p, "p", "pressure", spec.p0),
            (&spec.h, "h", "enthalpy", spec.h0),
        ];
        for (pos, (var, name, what, init)) in vars.into_iter().enumerate() {
            let make_ref = |c: ConnId| match pos {
                0 => VarRef::MassFlow(c),
                1 => VarRef::Pressure(c),
                _ => VarRef::Enthalpy(c),
            };
            match lower_state_var(var, mode, label, name, record, n_conns)? {
                Lowered::Fixed(v) => {
                    if name == "p" && v <= 0.0 {
                        return Err(SolveError::Configuration {
                            what: format!("pressure on '{label}' must be positive, got {v}"),
                        });
                    }
                    base[pos] = v;
                }
                Lowered::Free => {
                    unknowns.push(Unknown {
                        var: make_ref(conn.id),
                        tag: format!("{label}: {what}"),
                        init,
                    });
                }
                Lowered::FreeWithRef {
                    other,
                    factor,
                    offset,
                } => {
                    unknowns.push(Unknown {
                        var: make_ref(conn.id),
                        tag: format!("{label}: {what}"),
                        init,
                    });
                    equations.push(Equation::new(
                        EquationKind::Ref {
                            a: make_ref(conn.id),
                            b: make_ref(other),
                            factor,
                            offset,
                        },
                        format!("{label}: {what} reference"),
                        &fractions,
                    ));
                }
            }
        }

        for idx in fractions.free_indices(conn.id) {
            unknowns.push(Unknown {
                var: VarRef::Fraction(conn.id, idx),
                tag: format!("{label}: x({})", species[idx as usize].key()),
                init: None,
            });
        }

        lower_derived_var(
            &spec.t,
            mode,
            label,
            "t",
            record,
            |t_set| EquationKind::TempSpec {
                conn: conn.id,
                t_set,
            },
            "temperature",
            &fractions,
            &mut equations,
        )?;
        lower_derived_var(
            &spec.v,
            mode,
            label,
            "v",
            record,
            |vdot| EquationKind::VolFlowSpec {
                conn: conn.id,
                vdot,
            },
            "volumetric flow",
            &fractions,
            &mut equations,
        )?;

        let pairs: Vec<(Species, f64)> = species
            .iter()
            .enumerate()
            .map(|(idx, s)| (*s, fractions.fixed(conn.id, idx as u8).unwrap_or(0.0)))
            .collect();
        base_streams.push(StreamState {
            m: base[0],
            p: base[1],
            h: base[2],
            composition: Composition::from_pairs(pairs)?,
        });
    }

    // Component equations.
    let design_values = match (mode, record) {
        (Mode::Offdesign, Some(r)) => Some(design_values_from(r, topo)),
        _ => None,
    };
    for node in topo.components() {
        let model = &net.models[node.id.index() as usize];
        let ctx = EquationContext {
            comp: node.id,
            label: &node.label,
            inlets: topo.inlet_conns(node.id),
            outlets: topo.outlet_conns(node.id),
            mode,
            species: &species,
            fractions: &fractions,
            design: design_values.as_ref(),
        };
        equations.extend(model.equations(&ctx)?);
    }

    // Sum-to-one closure wherever any fraction is free.
    for conn in topo.connections() {
        if fractions.any_free(conn.id) {
            equations.push(Equation::new(
                EquationKind::FractionSum { conn: conn.id },
                format!("{}: fraction closure", conn.label),
                &fractions,
            ));
        }
    }

    // Bus totals. Lowering also validates members of report-only busses.
    for b in &net.busses {
        let terms = bus::lower_terms(b, topo, mode, record)?;
        if let Some(total) = b.total {
            equations.push(Equation::new(
                EquationKind::BusTotal { terms, total },
                format!("{}: total power", b.label),
                &fractions,
            ));
        }
    }

    // Parameters marked Var show up in equation dependencies; each one
    // becomes a slot.
    let mut param_vars: BTreeSet<(tc_core::CompId, ParamKey)> = BTreeSet::new();
    for eq in &equations {
        for dep in &eq.deps {
            if let VarRef::Param(comp, key) = dep {
                param_vars.insert((*comp, *key));
            }
        }
    }
    for (comp, key) in param_vars {
        let label = topo
            .component(comp)
            .map(|n| n.label.as_str())
            .unwrap_or("?");
        unknowns.push(Unknown {
            var: VarRef::Param(comp, key),
            tag: format!("{label}: {key}"),
            init: None,
        });
    }

    if unknowns.len() != equations.len() {
        let (u, e) = (unknowns.len(), equations.len());
        let hint = if u > e {
            format!("add {} specification(s)", u - e)
        } else {
            format!("remove {} specification(s)", e - u)
        };
        return Err(SolveError::DegreesOfFreedom {
            unknowns: u,
            equations: e,
            hint,
        });
    }
    debug!(
        unknowns = unknowns.len(),
        equations = equations.len(),
        species = species.len(),
        "system assembled"
    );

    let slot_of: HashMap<VarRef, usize> = unknowns
        .iter()
        .enumerate()
        .map(|(i, u)| (u.var, i))
        .collect();
    let mut rows_of_slot = vec![Vec::new(); unknowns.len()];
    for (row, eq) in equations.iter().enumerate() {
        for dep in &eq.deps {
            if let Some(&slot) = slot_of.get(dep) {
                rows_of_slot[slot].push(row);
            }
        }
    }
    for rows in &mut rows_of_slot {
        rows.sort_unstable();
        rows.dedup();
    }

    // A constant residual row or an untouched column makes the Jacobian
    // singular no matter the iterate; report it by name instead.
    for eq in &equations {
        if !eq.deps.iter().any(|d| slot_of.contains_key(d)) {
            return Err(SolveError::Singular {
                what: format!("equation '{}' does not involve any unknown", eq.tag),
            });
        }
    }
    for (slot, rows) in rows_of_slot.iter().enumerate() {
        if rows.is_empty() {
            return Err(SolveError::Singular {
                what: format!("unknown '{}' appears in no equation", unknowns[slot].tag),
            });
        }
    }

    Ok(System {
        unknowns,
        slot_of,
        rows_of_slot,
        equations,
        species,
        fractions,
        base_streams,
    })
}

fn lower_state_var(
    var: &ConnVar,
    mode: Mode,
    conn_label: &str,
    name: &str,
    record: Option<&DesignRecord>,
    n_conns: usize,
) -> SolveResult<Lowered> {
    match (var.spec, var.active(mode)) {
        (Some(ConnValue::Value(v)), true) => {
            if !v.is_finite() {
                return Err(SolveError::Configuration {
                    what: format!("'{name}' on '{conn_label}' is not finite"),
                });
            }
            Ok(Lowered::Fixed(v))
        }
        (
            Some(ConnValue::Ref {
                other,
                factor,
                offset,
            }),
            true,
        ) => {
            if (other.index() as usize) >= n_conns {
                return Err(SolveError::Configuration {
                    what: format!("'{name}' on '{conn_label}' references an unknown connection"),
                });
            }
            if !factor.is_finite() || !offset.is_finite() {
                return Err(SolveError::Configuration {
                    what: format!("'{name}' reference on '{conn_label}' has non-finite terms"),
                });
            }
            Ok(Lowered::FreeWithRef {
                other,
                factor,
                offset,
            })
        }
        (None, true) if var.role == Role::OffdesignOnly => {
            let v = record
                .and_then(|r| r.conn(conn_label, name))
                .ok_or_else(|| SolveError::DesignMismatch {
                    what: format!("connection '{conn_label}' has no design value for '{name}'"),
                })?;
            Ok(Lowered::Fixed(v))
        }
        _ => Ok(Lowered::Free),
    }
}

/// Temperature and volumetric flow do not join the unknowns; pinning one
/// adds an equation over the state variables instead.
#[allow(clippy::too_many_arguments)]
fn lower_derived_var(
    var: &ConnVar,
    mode: Mode,
    conn_label: &str,
    name: &str,
    record: Option<&DesignRecord>,
    make_kind: impl FnOnce(f64) -> EquationKind,
    what: &str,
    fractions: &FractionSpecs,
    equations: &mut Vec<Equation>,
) -> SolveResult<()> {
    let set_point = match (var.spec, var.active(mode)) {
        (Some(ConnValue::Value(v)), true) => {
            if !v.is_finite() {
                return Err(SolveError::Configuration {
                    what: format!("'{name}' on '{conn_label}' is not finite"),
                });
            }
            Some(v)
        }
        (Some(ConnValue::Ref { .. }), true) => {
            return Err(SolveError::Configuration {
                what: format!(
                    "'{name}' on '{conn_label}' cannot be a reference; only mass flow, \
                     pressure and enthalpy support references"
                ),
            });
        }
        (None, true) if var.role == Role::OffdesignOnly => {
            let v = record
                .and_then(|r| r.conn(conn_label, name))
                .ok_or_else(|| SolveError::DesignMismatch {
                    what: format!("connection '{conn_label}' has no design value for '{name}'"),
                })?;
            Some(v)
        }
        _ => None,
    };
    if let Some(v) = set_point {
        equations.push(Equation::new(
            make_kind(v),
            format!("{conn_label}: {what}"),
            fractions,
        ));
    }
    Ok(())
}

/// Sorted union of every species named in a composition specification.
fn canonical_species(net: &Network<'_>) -> SolveResult<Vec<Species>> {
    let mut set: BTreeSet<Species> = BTreeSet::new();
    for spec in &net.specs {
        match &spec.composition {
            Some(CompositionSpec::Pure(s)) => {
                set.insert(*s);
            }
            Some(CompositionSpec::Fractions(list)) => {
                for (s, _) in list {
                    set.insert(*s);
                }
            }
            None => {}
        }
    }
    if set.is_empty() {
        return Err(SolveError::Configuration {
            what: "no composition specified on any connection; \
                   use set_pure or set_fractions on at least one"
                .to_string(),
        });
    }
    Ok(set.into_iter().collect())
}

fn fraction_rows(net: &Network<'_>, species: &[Species]) -> SolveResult<FractionSpecs> {
    let n = species.len();
    let mut rows = Vec::with_capacity(net.specs.len());
    for (i, spec) in net.specs.iter().enumerate() {
        let label = net.topo.connections()[i].label.as_str();
        let row: Vec<Option<f64>> = match &spec.composition {
            Some(CompositionSpec::Pure(s)) => species
                .iter()
                .map(|sp| Some(if sp == s { 1.0 } else { 0.0 }))
                .collect(),
            Some(CompositionSpec::Fractions(list)) => {
                let mut row = vec![None; n];
                for (s, v) in list {
                    if !v.is_finite() || !(0.0..=1.0).contains(v) {
                        return Err(SolveError::Configuration {
                            what: format!(
                                "mass fraction {v} of {} on '{label}' is outside [0, 1]",
                                s.key()
                            ),
                        });
                    }
                    // The canonical set is a union, so the index exists.
                    let idx = species.iter().position(|sp| sp == s).unwrap_or(0);
                    if row[idx].is_some() {
                        return Err(SolveError::Configuration {
                            what: format!("species {} listed twice on '{label}'", s.key()),
                        });
                    }
                    row[idx] = Some(*v);
                }
                let sum: f64 = row.iter().flatten().sum();
                if row.iter().all(|f| f.is_some()) {
                    if (sum - 1.0).abs() > FRACTION_TOL {
                        return Err(SolveError::Configuration {
                            what: format!(
                                "mass fractions on '{label}' sum to {sum}, expected 1"
                            ),
                        });
                    }
                } else if sum > 1.0 + FRACTION_TOL {
                    return Err(SolveError::Configuration {
                        what: format!("fixed mass fractions on '{label}' sum to {sum} > 1"),
                    });
                }
                row
            }
            // With a single species every stream carries it entirely.
            None if n == 1 => vec![Some(1.0)],
            None => vec![None; n],
        };
        rows.push(row);
    }
    Ok(FractionSpecs::new(rows, n))
}

/// Components that equate compositions across a stream skip species whose
/// fractions are fixed on both ends; those pairs must then agree up front.
fn check_propagation_pairs(
    net: &Network<'_>,
    species: &[Species],
    fractions: &FractionSpecs,
) -> SolveResult<()> {
    let topo = &net.topo;
    let conn_label = |c: ConnId| {
        topo.connection(c)
            .map(|conn| conn.label.as_str())
            .unwrap_or("?")
    };
    for node in topo.components() {
        let model = &net.models[node.id.index() as usize];
        let inlets = topo.inlet_conns(node.id);
        let outlets = topo.outlet_conns(node.id);
        let pairs: Vec<(ConnId, ConnId)> = match model {
            ComponentModel::Valve(_)
            | ComponentModel::Pump(_)
            | ComponentModel::Compressor(_)
            | ComponentModel::Turbine(_)
            | ComponentModel::SimpleHeatExchanger(_)
            | ComponentModel::Pipe(_) => vec![(inlets[0], outlets[0])],
            ComponentModel::HeatExchanger(_) => {
                vec![(inlets[0], outlets[0]), (inlets[1], outlets[1])]
            }
            ComponentModel::Splitter(_) => outlets.iter().map(|&o| (inlets[0], o)).collect(),
            _ => Vec::new(),
        };
        for (a, b) in pairs {
            for idx in 0..species.len() as u8 {
                if let (Some(fa), Some(fb)) = (fractions.fixed(a, idx), fractions.fixed(b, idx))
                    && (fa - fb).abs() > FRACTION_TOL
                {
                    return Err(SolveError::Configuration {
                        what: format!(
                            "'{}' carries composition from '{}' to '{}', but {} is fixed \
                             to {fa} upstream and {fb} downstream",
                            node.label,
                            conn_label(a),
                            conn_label(b),
                            species[idx as usize].key()
                        ),
                    });
                }
            }
        }
    }
    Ok(())
}

/// Design snapshot in the form component equations consume.
pub(crate) fn design_values_from(record: &DesignRecord, topo: &Topology) -> DesignValues {
    let mut dv = DesignValues::new();
    for conn in topo.connections() {
        if let Some(m) = record.conn(&conn.label, "m") {
            dv.insert_m(conn.id, m);
        }
    }
    for node in topo.components() {
        if let Some(params) = record.components.get(&node.label) {
            for (name, value) in params {
                if let Some(key) = ParamKey::parse(name) {
                    dv.insert_param(node.id, key, *value);
                }
            }
        }
    }
    dv
}
