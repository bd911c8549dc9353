//! Integration test: power busses as equations and as bookkeeping.
//!
//! A bus with an imposed total closes the system (motor drive sized by
//! available electrical power); a bus without one is evaluated after the
//! solve (generator terminals on a turbine).

use tc_components::{
    BusBase, ComponentModel, Compressor, Param, ParamKey, Sink, Source, Turbine,
};
use tc_core::units::{bar, k, kgps, kw, pa};
use tc_fluids::{Composition, PerfectGas, Species, isentropic_enthalpy};
use tc_solver::{Bus, MemberEff, NetworkBuilder};

#[test]
fn imposed_bus_total_sizes_the_compressor() {
    // feed --1--> [cp1] --2--> drain, driven by a 120 kW motor at 95%.
    let gas = PerfectGas::new();
    let mut b = NetworkBuilder::new();
    let feed = b.add("feed", ComponentModel::Source(Source));
    let mut cp = Compressor::new();
    cp.eta_s = Param::fixed(0.85);
    let cp1 = b.add("cp1", ComponentModel::Compressor(cp));
    let drain = b.add("drain", ComponentModel::Sink(Sink));
    let c1 = b.connect(feed, 0, cp1, 0, "1").unwrap();
    b.connect(cp1, 0, drain, 0, "2").unwrap();

    let mut net = b.build(&gas).unwrap();
    net.set_pure(c1, Species::Air);
    net.set_m(c1, kgps(1.0));
    net.set_p(c1, bar(1.0));
    net.set_t(c1, k(290.0));
    net.add_bus(
        Bus::new("drive")
            .with_total(kw(120.0))
            .with_member(cp1, BusBase::Bus, MemberEff::Const(0.95)),
    );

    let report = net.solve_design().unwrap();
    assert_eq!(report.unknowns, 4);

    let sol = net.solution().unwrap();
    let (inlet, outlet) = (sol.conn("1").unwrap(), sol.conn("2").unwrap());

    // Shaft power is what survives the motor losses.
    let power = sol.comp("cp1").unwrap().param(ParamKey::Power).unwrap();
    assert!((power - 114_000.0).abs() < 0.5);
    assert!((outlet.m * (outlet.h - inlet.h) - 114_000.0).abs() < 0.5);

    let drive = sol.bus("drive").unwrap();
    let member = &drive.members[0];
    assert_eq!(member.comp, "cp1");
    assert!((member.power - 114_000.0).abs() < 0.5);
    assert!((member.contribution - 120_000.0).abs() < 0.5);
    assert!((drive.total - 120_000.0).abs() < 0.5);

    // The discharge state follows from the efficiency relation.
    let h2s = inlet.h + 0.85 * 114_000.0;
    let h2s_check =
        isentropic_enthalpy(&gas, pa(1.0e5), inlet.h, pa(outlet.p), &Composition::pure(Species::Air))
            .unwrap();
    assert!((h2s - h2s_check).abs() < 0.5);
    assert!(outlet.p > 2.6e5 && outlet.p < 2.8e5, "p2 was {}", outlet.p);
}

#[test]
fn reporting_bus_tracks_generator_terminals() {
    // feed --1--> [t1] --2--> drain, with a 97% generator on the shaft.
    let gas = PerfectGas::new();
    let mut b = NetworkBuilder::new();
    let feed = b.add("feed", ComponentModel::Source(Source));
    let mut tb = Turbine::new();
    tb.eta_s = Param::fixed(0.9);
    let t1 = b.add("t1", ComponentModel::Turbine(tb));
    let drain = b.add("drain", ComponentModel::Sink(Sink));
    let c1 = b.connect(feed, 0, t1, 0, "1").unwrap();
    let c2 = b.connect(t1, 0, drain, 0, "2").unwrap();

    let mut net = b.build(&gas).unwrap();
    net.set_pure(c1, Species::Air);
    net.set_m(c1, kgps(2.0));
    net.set_p(c1, bar(10.0));
    net.set_t(c1, k(600.0));
    net.set_p(c2, bar(2.0));
    net.add_bus(
        Bus::new("grid").with_member(t1, BusBase::Component, MemberEff::Const(0.97)),
    );

    let report = net.solve_design().unwrap();
    assert_eq!(report.unknowns, 3);

    let sol = net.solution().unwrap();
    let (inlet, outlet) = (sol.conn("1").unwrap(), sol.conn("2").unwrap());

    let air = Composition::pure(Species::Air);
    let h2s = isentropic_enthalpy(&gas, pa(10.0e5), inlet.h, pa(2.0e5), &air).unwrap();
    let h2_expected = inlet.h + 0.9 * (h2s - inlet.h);
    assert!((outlet.h - h2_expected).abs() < 0.5);

    let power = sol.comp("t1").unwrap().param(ParamKey::Power).unwrap();
    assert!(power < 0.0, "expansion extracts work");
    assert!((power - 2.0 * (h2_expected - inlet.h)).abs() < 1.0);

    // No imposed total: the bus is pure accounting, scaled at the
    // generator terminals.
    let grid = sol.bus("grid").unwrap();
    let member = &grid.members[0];
    assert!((member.contribution - power * 0.97).abs() < 1.0);
    assert!(member.contribution.abs() < power.abs());
    assert!((grid.total - member.contribution).abs() < 1e-6);
}
