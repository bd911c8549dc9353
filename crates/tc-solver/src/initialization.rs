//! Starting-point construction.
//!
//! Seeds are filled in priority order and earlier writes win: fixed
//! values, explicit starting values, design-record values, propagation
//! along the topology, enthalpies derived from temperature set points,
//! then generic defaults. A good starting point decides whether the
//! damped iteration reaches the property region at all.

use nalgebra::DVector;
use tc_components::{ComponentModel, EquationKind, Mode, ParamKey, VarRef};
use tc_core::units::{k, pa};
use tc_core::{CompId, ConnId};
use tc_design::DesignRecord;
use tc_fluids::Composition;
use tc_net::Topology;

use crate::error::SolveResult;
use crate::network::Network;
use crate::registry::System;

const DEFAULT_M: f64 = 1.0;
const DEFAULT_P: f64 = 1.0e5;
const DEFAULT_H: f64 = 1.0e5;

pub(crate) fn initial_point(
    net: &Network<'_>,
    layout: &System,
    mode: Mode,
    record: Option<&DesignRecord>,
) -> SolveResult<DVector<f64>> {
    let topo = &net.topo;
    let n_conns = topo.connections().len();
    let n_species = layout.species.len();

    let mut m: Vec<Option<f64>> = vec![None; n_conns];
    let mut p: Vec<Option<f64>> = vec![None; n_conns];
    let mut h: Vec<Option<f64>> = vec![None; n_conns];
    let mut frac: Vec<Vec<Option<f64>>> = vec![vec![None; n_species]; n_conns];

    // Fixed values anchor the propagation.
    for (i, stream) in layout.base_streams.iter().enumerate() {
        let conn = topo.connections()[i].id;
        if !layout.slot_of.contains_key(&VarRef::MassFlow(conn)) {
            m[i] = Some(stream.m);
        }
        if !layout.slot_of.contains_key(&VarRef::Pressure(conn)) {
            p[i] = Some(stream.p);
        }
        if !layout.slot_of.contains_key(&VarRef::Enthalpy(conn)) {
            h[i] = Some(stream.h);
        }
        for idx in 0..n_species as u8 {
            if let Some(v) = layout.fractions.fixed(conn, idx) {
                frac[i][idx as usize] = Some(v);
            }
        }
    }

    // Explicit starting values on free variables.
    for u in &layout.unknowns {
        if let Some(init) = u.init {
            match u.var {
                VarRef::MassFlow(c) => fill(&mut m, c, init),
                VarRef::Pressure(c) => fill(&mut p, c, init),
                VarRef::Enthalpy(c) => fill(&mut h, c, init),
                _ => {}
            }
        }
    }

    // Offdesign restarts from the design solution.
    if mode == Mode::Offdesign
        && let Some(r) = record
    {
        for (i, conn) in topo.connections().iter().enumerate() {
            if m[i].is_none() {
                m[i] = r.conn(&conn.label, "m");
            }
            if p[i].is_none() {
                p[i] = r.conn(&conn.label, "p");
            }
            if h[i].is_none() {
                h[i] = r.conn(&conn.label, "h");
            }
            for (idx, s) in layout.species.iter().enumerate() {
                if frac[i][idx].is_none() {
                    frac[i][idx] = r.conn(&conn.label, &format!("x:{}", s.key()));
                }
            }
        }
    }

    propagate(topo, &net.models, &mut m, &mut p, &mut h);

    // Temperature set points give enthalpy seeds once a pressure guess
    // exists nearby.
    for eq in &layout.equations {
        if let EquationKind::TempSpec { conn, t_set } = eq.kind {
            let i = conn.index() as usize;
            if h[i].is_none() {
                let pairs: Vec<_> = layout
                    .species
                    .iter()
                    .enumerate()
                    .map(|(idx, s)| (*s, frac[i][idx].unwrap_or(1.0 / n_species as f64)))
                    .collect();
                if let Ok(composition) = Composition::from_pairs(pairs)
                    && let Ok(h_seed) = net.provider.h_pt(
                        pa(p[i].unwrap_or(DEFAULT_P)),
                        k(t_set),
                        &composition,
                    )
                {
                    h[i] = Some(h_seed);
                }
            }
        }
    }

    propagate(topo, &net.models, &mut m, &mut p, &mut h);

    for i in 0..n_conns {
        m[i].get_or_insert(DEFAULT_M);
        p[i].get_or_insert(DEFAULT_P);
        h[i].get_or_insert(DEFAULT_H);
        for f in &mut frac[i] {
            f.get_or_insert(1.0 / n_species as f64);
        }
    }

    let mut x0 = DVector::zeros(layout.unknowns.len());
    for (slot, u) in layout.unknowns.iter().enumerate() {
        x0[slot] = match u.var {
            VarRef::MassFlow(c) => m[c.index() as usize].unwrap_or(DEFAULT_M),
            VarRef::Pressure(c) => p[c.index() as usize].unwrap_or(DEFAULT_P),
            VarRef::Enthalpy(c) => h[c.index() as usize].unwrap_or(DEFAULT_H),
            VarRef::Fraction(c, idx) => {
                frac[c.index() as usize][idx as usize].unwrap_or(1.0 / n_species as f64)
            }
            VarRef::Param(comp, key) => param_seed(key, comp, topo, &m, &p, &h),
        };
    }
    Ok(x0)
}

fn fill(arr: &mut [Option<f64>], conn: ConnId, value: f64) {
    let slot = &mut arr[conn.index() as usize];
    if slot.is_none() {
        *slot = Some(value);
    }
}

/// Spread seeds across components that carry a variable through
/// unchanged (or nearly so), until nothing moves anymore.
fn propagate(
    topo: &Topology,
    models: &[ComponentModel],
    m: &mut [Option<f64>],
    p: &mut [Option<f64>],
    h: &mut [Option<f64>],
) {
    let mut m_pairs: Vec<(ConnId, ConnId)> = Vec::new();
    let mut p_pairs: Vec<(ConnId, ConnId)> = Vec::new();
    let mut h_pairs: Vec<(ConnId, ConnId)> = Vec::new();

    for node in topo.components() {
        let inlets = topo.inlet_conns(node.id);
        let outlets = topo.outlet_conns(node.id);
        match &models[node.id.index() as usize] {
            ComponentModel::Valve(_)
            | ComponentModel::Pump(_)
            | ComponentModel::Compressor(_)
            | ComponentModel::Turbine(_)
            | ComponentModel::SimpleHeatExchanger(_)
            | ComponentModel::Pipe(_)
            | ComponentModel::CycleCloser(_) => {
                let pair = (inlets[0], outlets[0]);
                m_pairs.push(pair);
                p_pairs.push(pair);
                h_pairs.push(pair);
            }
            ComponentModel::HeatExchanger(_) => {
                for pair in [(inlets[0], outlets[0]), (inlets[1], outlets[1])] {
                    m_pairs.push(pair);
                    p_pairs.push(pair);
                }
            }
            ComponentModel::Merge(_) | ComponentModel::Separator(_) => {
                let all: Vec<ConnId> = inlets.iter().chain(outlets).copied().collect();
                for &c in &all[1..] {
                    p_pairs.push((all[0], c));
                }
            }
            ComponentModel::Splitter(_) => {
                for &out in outlets {
                    p_pairs.push((inlets[0], out));
                    h_pairs.push((inlets[0], out));
                }
            }
            ComponentModel::Source(_) | ComponentModel::Sink(_) => {}
        }
    }

    loop {
        let mut changed = false;
        changed |= sync(m, &m_pairs);
        changed |= sync(p, &p_pairs);
        changed |= sync(h, &h_pairs);
        if !changed {
            break;
        }
    }
}

fn sync(arr: &mut [Option<f64>], pairs: &[(ConnId, ConnId)]) -> bool {
    let mut changed = false;
    for &(a, b) in pairs {
        let (ia, ib) = (a.index() as usize, b.index() as usize);
        match (arr[ia], arr[ib]) {
            (Some(v), None) => {
                arr[ib] = Some(v);
                changed = true;
            }
            (None, Some(v)) => {
                arr[ia] = Some(v);
                changed = true;
            }
            _ => {}
        }
    }
    changed
}

/// Rough seed for a parameter solved as an unknown, derived from the
/// connection seeds where the form allows it.
fn param_seed(
    key: ParamKey,
    comp: CompId,
    topo: &Topology,
    m: &[Option<f64>],
    p: &[Option<f64>],
    h: &[Option<f64>],
) -> f64 {
    let inlets = topo.inlet_conns(comp);
    let outlets = topo.outlet_conns(comp);
    let at = |arr: &[Option<f64>], conns: &[ConnId], i: usize| {
        conns.get(i).and_then(|c| arr[c.index() as usize])
    };
    match key {
        ParamKey::Pr | ParamKey::Pr1 => match (at(p, inlets, 0), at(p, outlets, 0)) {
            (Some(pi), Some(po)) if pi > 0.0 => po / pi,
            _ => 1.0,
        },
        ParamKey::Pr2 => match (at(p, inlets, 1), at(p, outlets, 1)) {
            (Some(pi), Some(po)) if pi > 0.0 => po / pi,
            _ => 1.0,
        },
        ParamKey::Dp | ParamKey::Dp1 => match (at(p, inlets, 0), at(p, outlets, 0)) {
            (Some(pi), Some(po)) => pi - po,
            _ => 0.0,
        },
        ParamKey::Dp2 => match (at(p, inlets, 1), at(p, outlets, 1)) {
            (Some(pi), Some(po)) => pi - po,
            _ => 0.0,
        },
        ParamKey::Q | ParamKey::Power => {
            match (at(m, inlets, 0), at(h, inlets, 0), at(h, outlets, 0)) {
                (Some(mi), Some(hi), Some(ho)) => mi * (ho - hi),
                _ => 0.0,
            }
        }
        ParamKey::EtaS => 0.8,
        ParamKey::Zeta | ParamKey::Zeta1 | ParamKey::Zeta2 => 1.0e6,
        ParamKey::Ka => 1.0e4,
        ParamKey::TAmb => 288.15,
        ParamKey::TtdU | ParamKey::TtdL => 10.0,
        ParamKey::EtaSChar | ParamKey::DpChar | ParamKey::FlowChar | ParamKey::KaChar => 1.0,
    }
}
