//! Integration tests for tc-components with the perfect-gas property backend.

use std::collections::HashMap;

use tc_components::{
    CharParam, ComponentModel, Compressor, DesignValues, EquationContext, FractionSpecs,
    HeatExchanger, Merge, Mode, Param, ParamKey, Splitter, StreamState, SystemView, Turbine,
    Valve, chars,
};
use tc_core::units::{k, pa};
use tc_core::{CompId, ConnId};
use tc_fluids::{Composition, PerfectGas, PropertyProvider, Species, isentropic_enthalpy};

fn air(m: f64, p: f64, t: f64, gas: &PerfectGas) -> StreamState {
    let composition = Composition::pure(Species::Air);
    let h = gas.h_pt(pa(p), k(t), &composition).unwrap();
    StreamState {
        m,
        p,
        h,
        composition,
    }
}

fn conn(i: u32) -> ConnId {
    ConnId::from_index(i)
}

/// Validate, emit and evaluate a component's equations at the given state.
fn residuals(
    model: &ComponentModel,
    ctx: &EquationContext<'_>,
    sys: &SystemView<'_>,
) -> Vec<(String, f64)> {
    model.validate(ctx.label).unwrap();
    model
        .equations(ctx)
        .unwrap()
        .iter()
        .map(|e| (e.tag.clone(), e.residual(sys).unwrap()))
        .collect()
}

#[test]
fn valve_throttling_is_isenthalpic() {
    let gas = PerfectGas::new();
    let inlet = air(1.5, 3.0e5, 400.0, &gas);
    let mut outlet = inlet.clone();
    outlet.p = 1.0e5;

    let mut streams = vec![inlet, outlet];
    let species = vec![Species::Air];
    let fractions = FractionSpecs::new(vec![vec![Some(1.0)]; 2], 1);
    let params = HashMap::new();

    let mut valve = Valve::new();
    valve.dp = Param::fixed(2.0e5);
    let model = ComponentModel::Valve(valve);

    let inlets = [conn(0)];
    let outlets = [conn(1)];
    let ctx = EquationContext {
        comp: CompId::from_index(0),
        label: "v1",
        inlets: &inlets,
        outlets: &outlets,
        mode: Mode::Design,
        species: &species,
        fractions: &fractions,
        design: None,
    };

    {
        let sys = SystemView {
            streams: &streams,
            params: &params,
            species: &species,
            props: &gas,
        };
        for (tag, r) in residuals(&model, &ctx, &sys) {
            assert!(r.abs() < 1e-12, "{tag} should close, got {r}");
        }
    }

    // Heating across the valve violates the throttling relation.
    streams[1].h += 5.0e3;
    let sys = SystemView {
        streams: &streams,
        params: &params,
        species: &species,
        props: &gas,
    };
    let r = residuals(&model, &ctx, &sys)
        .into_iter()
        .find(|(tag, _)| tag.contains("isenthalpic"))
        .map(|(_, r)| r)
        .unwrap();
    assert!(r.abs() > 1e-3, "enthalpy gain must show up as a residual");
}

#[test]
fn compressor_design_point_matches_hand_calculation() {
    let gas = PerfectGas::new();
    let comp = Composition::pure(Species::Air);
    let (p_in, p_out, m) = (1.0e5, 3.0e5, 2.0);
    let h_in = gas.h_pt(pa(p_in), k(290.0), &comp).unwrap();
    let h_s = isentropic_enthalpy(&gas, pa(p_in), h_in, pa(p_out), &comp).unwrap();
    let h_out = h_in + (h_s - h_in) / 0.8;

    let streams = vec![
        StreamState {
            m,
            p: p_in,
            h: h_in,
            composition: comp.clone(),
        },
        StreamState {
            m,
            p: p_out,
            h: h_out,
            composition: comp,
        },
    ];
    let species = vec![Species::Air];
    let fractions = FractionSpecs::new(vec![vec![Some(1.0)]; 2], 1);
    let params = HashMap::new();
    let sys = SystemView {
        streams: &streams,
        params: &params,
        species: &species,
        props: &gas,
    };

    let mut cp = Compressor::new();
    cp.eta_s = Param::fixed_design(0.8);
    cp.pr = Param::fixed(3.0);
    let model = ComponentModel::Compressor(cp);

    let inlets = [conn(0)];
    let outlets = [conn(1)];
    let ctx = EquationContext {
        comp: CompId::from_index(0),
        label: "cp1",
        inlets: &inlets,
        outlets: &outlets,
        mode: Mode::Design,
        species: &species,
        fractions: &fractions,
        design: None,
    };

    let rs = residuals(&model, &ctx, &sys);
    assert_eq!(rs.len(), 3, "mass, efficiency and pressure ratio");
    for (tag, r) in rs {
        assert!(r.abs() < 1e-9, "{tag} should close, got {r}");
    }

    let derived = model.derived(&ctx, &sys).unwrap();
    let get = |key: ParamKey| {
        derived
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| *v)
            .unwrap()
    };
    let w = m * (h_out - h_in);
    assert!((get(ParamKey::Power) - w).abs() < 1e-6 * w);
    assert!((get(ParamKey::EtaS) - 0.8).abs() < 1e-9);
    assert!((get(ParamKey::Pr) - 3.0).abs() < 1e-12);
}

#[test]
fn turbine_offdesign_efficiency_follows_the_curve() {
    let gas = PerfectGas::new();
    let comp = Composition::pure(Species::Air);
    let (p_in, p_out) = (10.0e5, 2.5e5);
    let h_in = gas.h_pt(pa(p_in), k(600.0), &comp).unwrap();
    let h_s = isentropic_enthalpy(&gas, pa(p_in), h_in, pa(p_out), &comp).unwrap();

    // Design point was 0.9 at 10 kg/s; at half flow the generic curve
    // derates to 0.85 of that.
    let eta_eff = 0.9 * chars::generic_eta_s_char().evaluate(0.5);
    let h_out = h_in + eta_eff * (h_s - h_in);

    let streams = vec![
        StreamState {
            m: 5.0,
            p: p_in,
            h: h_in,
            composition: comp.clone(),
        },
        StreamState {
            m: 5.0,
            p: p_out,
            h: h_out,
            composition: comp,
        },
    ];
    let species = vec![Species::Air];
    let fractions = FractionSpecs::new(vec![vec![Some(1.0)]; 2], 1);
    let params = HashMap::new();
    let sys = SystemView {
        streams: &streams,
        params: &params,
        species: &species,
        props: &gas,
    };

    let mut design = DesignValues::new();
    design.insert_param(CompId::from_index(0), ParamKey::EtaS, 0.9);
    design.insert_m(conn(0), 10.0);

    let mut tu = Turbine::new();
    tu.eta_s = Param::fixed_design(0.9);
    tu.pr = Param::fixed(0.25);
    tu.eta_s_char = CharParam::offdesign(chars::generic_eta_s_char());
    let model = ComponentModel::Turbine(tu);

    let inlets = [conn(0)];
    let outlets = [conn(1)];
    let ctx = EquationContext {
        comp: CompId::from_index(0),
        label: "tu1",
        inlets: &inlets,
        outlets: &outlets,
        mode: Mode::Offdesign,
        species: &species,
        fractions: &fractions,
        design: Some(&design),
    };

    let rs = residuals(&model, &ctx, &sys);
    // The fixed design efficiency is released; the curve takes over.
    assert_eq!(rs.len(), 3, "mass, pressure ratio and efficiency curve");
    for (tag, r) in rs {
        assert!(r.abs() < 1e-9, "{tag} should close, got {r}");
    }

    assert!(h_out < h_in, "an expanding turbine must drop enthalpy");
}

#[test]
fn counterflow_exchanger_with_fixed_ka_balances() {
    let gas = PerfectGas::new();
    // Hot stream 400 -> 320 K at 2 kg/s against cold 300 -> 340 K at
    // 4 kg/s; for a fixed-cp gas both sides move 160 kW.
    let streams = vec![
        air(2.0, 2.0e5, 400.0, &gas),
        air(2.0, 2.0e5, 320.0, &gas),
        air(4.0, 1.0e5, 300.0, &gas),
        air(4.0, 1.0e5, 340.0, &gas),
    ];
    let species = vec![Species::Air];
    let fractions = FractionSpecs::new(vec![vec![Some(1.0)]; 4], 1);
    let params = HashMap::new();
    let sys = SystemView {
        streams: &streams,
        params: &params,
        species: &species,
        props: &gas,
    };

    let duty = 2.0 * (streams[1].h - streams[0].h);
    let (ttd_u, ttd_l): (f64, f64) = (60.0, 20.0);
    let td_log = (ttd_u - ttd_l) / (ttd_u / ttd_l).ln();

    let mut hx = HeatExchanger::new();
    hx.ka = Param::fixed(-duty / td_log);
    let model = ComponentModel::HeatExchanger(hx);

    let inlets = [conn(0), conn(2)];
    let outlets = [conn(1), conn(3)];
    let ctx = EquationContext {
        comp: CompId::from_index(0),
        label: "hx1",
        inlets: &inlets,
        outlets: &outlets,
        mode: Mode::Design,
        species: &species,
        fractions: &fractions,
        design: None,
    };

    let rs = residuals(&model, &ctx, &sys);
    assert_eq!(rs.len(), 4, "two mass balances, energy balance, kA group");
    for (tag, r) in rs {
        assert!(r.abs() < 1e-6, "{tag} should close, got {r}");
    }
}

#[test]
fn merge_and_splitter_conserve_mass_enthalpy_and_species() {
    let gas = PerfectGas::new();
    let species = vec![Species::N2, Species::O2];
    let mk = |m: f64, x_n2: f64, h: f64| StreamState {
        m,
        p: 1.0e5,
        h,
        composition: Composition::from_pairs(vec![
            (Species::N2, x_n2),
            (Species::O2, 1.0 - x_n2),
        ])
        .unwrap(),
    };
    // Two 2 kg/s branches, 70% and 30% N2, mix to 50%; the mix then
    // splits 1.5 / 2.5 without changing state.
    let streams = vec![
        mk(2.0, 0.7, 2.0e5),
        mk(2.0, 0.3, 3.0e5),
        mk(4.0, 0.5, 2.5e5),
        mk(1.5, 0.5, 2.5e5),
        mk(2.5, 0.5, 2.5e5),
    ];
    let fractions = FractionSpecs::new(
        vec![
            vec![Some(0.7), Some(0.3)],
            vec![Some(0.3), Some(0.7)],
            vec![None, None],
            vec![None, None],
            vec![None, None],
        ],
        2,
    );
    let params = HashMap::new();
    let sys = SystemView {
        streams: &streams,
        params: &params,
        species: &species,
        props: &gas,
    };

    let merge = ComponentModel::Merge(Merge::new(2).unwrap());
    let merge_in = [conn(0), conn(1)];
    let merge_out = [conn(2)];
    let ctx = EquationContext {
        comp: CompId::from_index(0),
        label: "mix",
        inlets: &merge_in,
        outlets: &merge_out,
        mode: Mode::Design,
        species: &species,
        fractions: &fractions,
        design: None,
    };
    for (tag, r) in residuals(&merge, &ctx, &sys) {
        assert!(r.abs() < 1e-9, "{tag} should close, got {r}");
    }

    let split = ComponentModel::Splitter(Splitter::new(2).unwrap());
    let split_in = [conn(2)];
    let split_out = [conn(3), conn(4)];
    let ctx = EquationContext {
        comp: CompId::from_index(1),
        label: "tee",
        inlets: &split_in,
        outlets: &split_out,
        mode: Mode::Design,
        species: &species,
        fractions: &fractions,
        design: None,
    };
    let rs = residuals(&split, &ctx, &sys);
    // mass + (p, h, N2 propagation) per outlet.
    assert_eq!(rs.len(), 7);
    for (tag, r) in rs {
        assert!(r.abs() < 1e-9, "{tag} should close, got {r}");
    }
}

#[test]
fn cycle_closer_reconciles_loop_ends() {
    let gas = PerfectGas::new();
    let mut streams = vec![air(1.0, 2.0e5, 350.0, &gas), air(1.0, 2.0e5, 350.0, &gas)];
    streams[1].p += 500.0;
    streams[1].h += 1.0e3;

    let species = vec![Species::Air];
    let fractions = FractionSpecs::new(vec![vec![Some(1.0)]; 2], 1);
    let params = HashMap::new();

    let model = ComponentModel::CycleCloser(tc_components::CycleCloser);
    let inlets = [conn(0)];
    let outlets = [conn(1)];
    let ctx = EquationContext {
        comp: CompId::from_index(0),
        label: "cc",
        inlets: &inlets,
        outlets: &outlets,
        mode: Mode::Design,
        species: &species,
        fractions: &fractions,
        design: None,
    };

    {
        let sys = SystemView {
            streams: &streams,
            params: &params,
            species: &species,
            props: &gas,
        };
        for (tag, r) in residuals(&model, &ctx, &sys) {
            assert!(r.abs() > 0.0, "{tag} must flag the loop mismatch");
        }
    }

    streams[1] = streams[0].clone();
    let sys = SystemView {
        streams: &streams,
        params: &params,
        species: &species,
        props: &gas,
    };
    for (tag, r) in residuals(&model, &ctx, &sys) {
        assert!(r.abs() < 1e-12, "{tag} should close on a matched loop");
    }
}
