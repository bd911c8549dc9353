//! Solve orchestration: assemble, seed, iterate, report.

use tc_components::{ComponentModel, EquationContext, Mode, SystemView};
use tc_core::units::pa;
use tc_design::DesignRecord;
use tc_net::Topology;
use tracing::{info, warn};

use crate::assemble::{self, Evaluator};
use crate::error::{SolveError, SolveResult};
use crate::network::Network;
use crate::newton;
use crate::registry;
use crate::report::{
    BusMemberResult, BusResult, CompResult, ConnState, ExtrapolationWarning, Solution, SolveReport,
};
use crate::{bus, initialization};

/// Run one solve in the given mode. Design solves also return the
/// captured design record.
pub(crate) fn run(
    net: &Network<'_>,
    mode: Mode,
) -> SolveResult<(SolveReport, Solution, Option<DesignRecord>)> {
    let record = match mode {
        Mode::Offdesign => net.design.as_ref(),
        Mode::Design => None,
    };
    if let Some(r) = record
        && r.topology != fingerprint(&net.topo, &net.models)
    {
        return Err(SolveError::DesignMismatch {
            what: "design record does not match the current topology".to_string(),
        });
    }

    let layout = registry::build(net, mode, record)?;
    info!(
        mode = mode.as_str(),
        unknowns = layout.unknowns.len(),
        equations = layout.equations.len(),
        "starting solve"
    );
    let x0 = initialization::initial_point(net, &layout, mode, record)?;
    let ev = Evaluator::new(&layout, net.provider);
    let eq_tags: Vec<String> = layout.equations.iter().map(|e| e.tag.clone()).collect();
    let bounds = assemble::step_bounds(&layout, &net.config);

    let outcome = newton::damped_newton(
        x0,
        |x| ev.residuals(x),
        |x, r| ev.jacobian(x, r),
        &bounds,
        &net.config,
        &eq_tags,
    )?;

    let (streams, params) = ev.state(&outcome.x);
    let sys = SystemView {
        streams: &streams,
        params: &params,
        species: &layout.species,
        props: net.provider,
    };

    // Flag characteristics that ended up outside their tabulated domain.
    let mut warnings = Vec::new();
    for eq in &layout.equations {
        for (x, curve) in eq.kind.curve_points(&sys)? {
            if curve.outside_margin(x, net.config.extrapolation_margin) {
                warn!(
                    equation = %eq.tag,
                    x,
                    "characteristic evaluated outside its domain"
                );
                warnings.push(ExtrapolationWarning {
                    equation: eq.tag.clone(),
                    x,
                    domain: curve.domain(),
                });
            }
        }
    }

    // Connection states with derived temperature and volumetric flow.
    let mut conns = Vec::with_capacity(streams.len());
    for conn in net.topo.connections() {
        let s = &streams[conn.id.index() as usize];
        let t = net.provider.t_ph(pa(s.p), s.h, &s.composition)?.value;
        let rho = net.provider.rho_ph(pa(s.p), s.h, &s.composition)?.value;
        conns.push(ConnState {
            label: conn.label.clone(),
            m: s.m,
            p: s.p,
            h: s.h,
            t,
            v: s.m / rho,
            composition: s.composition.clone(),
        });
    }

    // Component results: derived parameters plus solved Var parameters.
    let design_values = record.map(|r| registry::design_values_from(r, &net.topo));
    let mut comps = Vec::new();
    for node in net.topo.components() {
        let model = &net.models[node.id.index() as usize];
        let ctx = EquationContext {
            comp: node.id,
            label: &node.label,
            inlets: net.topo.inlet_conns(node.id),
            outlets: net.topo.outlet_conns(node.id),
            mode,
            species: &layout.species,
            fractions: &layout.fractions,
            design: design_values.as_ref(),
        };
        let mut values = model.derived(&ctx, &sys)?;
        for ((comp, key), v) in &params {
            if *comp == node.id && !values.iter().any(|(k, _)| k == key) {
                values.push((*key, *v));
            }
        }
        values.sort_by_key(|(k, _)| *k);
        comps.push(CompResult {
            label: node.label.clone(),
            kind: model.kind(),
            params: values,
        });
    }

    // Bus evaluation, whether or not a total was imposed.
    let mut busses = Vec::new();
    for b in &net.busses {
        let terms = bus::lower_terms(b, &net.topo, mode, record)?;
        let mut members = Vec::with_capacity(terms.len());
        let mut total = 0.0;
        for (term, member) in terms.iter().zip(&b.members) {
            let power = term.power(&sys);
            let contribution = term.contribution(&sys);
            total += contribution;
            members.push(BusMemberResult {
                comp: net
                    .topo
                    .component(member.comp)
                    .map(|n| n.label.clone())
                    .unwrap_or_default(),
                power,
                contribution,
            });
        }
        busses.push(BusResult {
            label: b.label.clone(),
            members,
            total,
        });
    }

    let solution = Solution {
        mode,
        conns,
        comps,
        busses,
    };
    let record_out = match mode {
        Mode::Design => Some(capture_record(net, &layout.species, &solution)),
        Mode::Offdesign => None,
    };
    let report = SolveReport {
        mode,
        iterations: outcome.iterations,
        residual_norm: outcome.residual_norm,
        unknowns: layout.unknowns.len(),
        warnings,
    };
    Ok((report, solution, record_out))
}

/// Snapshot everything offdesign solves may anchor on.
fn capture_record(
    net: &Network<'_>,
    species: &[tc_fluids::Species],
    solution: &Solution,
) -> DesignRecord {
    let mut rec = DesignRecord::new(fingerprint(&net.topo, &net.models));
    for conn in &solution.conns {
        rec.insert_conn(&conn.label, "m", conn.m);
        rec.insert_conn(&conn.label, "p", conn.p);
        rec.insert_conn(&conn.label, "h", conn.h);
        rec.insert_conn(&conn.label, "t", conn.t);
        rec.insert_conn(&conn.label, "v", conn.v);
        for s in species {
            rec.insert_conn(
                &conn.label,
                &format!("x:{}", s.key()),
                conn.composition.mass_fraction(*s),
            );
        }
    }
    for comp in &solution.comps {
        for (key, v) in &comp.params {
            rec.insert_param(&comp.label, key.as_str(), *v);
        }
    }
    for bus in &solution.busses {
        for member in &bus.members {
            // Signed component power; curve lowering takes the magnitude.
            rec.insert_bus_flow(&bus.label, &member.comp, member.power);
        }
    }
    rec
}

/// Structural identity of a network: component labels and kinds plus the
/// wiring, values excluded.
pub(crate) fn fingerprint(topo: &Topology, models: &[ComponentModel]) -> String {
    let comps: Vec<(&str, &str)> = topo
        .components()
        .iter()
        .map(|n| (n.label.as_str(), models[n.id.index() as usize].kind()))
        .collect();
    let conns: Vec<(&str, &str, &str)> = topo
        .connections()
        .iter()
        .map(|c| {
            let src = topo
                .component(c.source.comp)
                .map(|n| n.label.as_str())
                .unwrap_or("?");
            let dst = topo
                .component(c.target.comp)
                .map(|n| n.label.as_str())
                .unwrap_or("?");
            (c.label.as_str(), src, dst)
        })
        .collect();
    tc_design::topology_fingerprint(&comps, &conns)
}
