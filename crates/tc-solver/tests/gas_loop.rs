//! Integration test: closed gas loop with a sized valve and a derated
//! compressor.
//!
//!   [cc] --1--> [cp1] --2--> [cooler] --3--> [v1] --4--> [recool] --5--> [cc]
//!
//! Design fixes the compressor pressure ratio and sizes the valve; the
//! offdesign solves replay the sized loop at other flows with the
//! compressor efficiency read off a characteristic. A shaft bus tracks
//! the drive power through a load-dependent motor efficiency.

use tc_components::{
    BusBase, ComponentModel, Compressor, CycleCloser, Mode, Param, ParamKey,
    SimpleHeatExchanger, Valve, chars,
};
use tc_core::units::{bar, k, kgps, pa};
use tc_fluids::{Composition, PerfectGas, Species, isentropic_enthalpy};
use tc_solver::{Bus, MemberEff, Network, NetworkBuilder};

const CP_AIR: f64 = 1005.0;

fn loop_net(gas: &PerfectGas) -> Network<'_> {
    let mut b = NetworkBuilder::new();
    let cc = b.add("cc", ComponentModel::CycleCloser(CycleCloser));
    let mut cp = Compressor::new();
    cp.pr = Param::fixed_design(3.0);
    cp.eta_s = Param::fixed_design(0.85);
    cp.eta_s_char = tc_components::CharParam::offdesign(chars::generic_eta_s_char());
    let cp1 = b.add("cp1", ComponentModel::Compressor(cp));
    let mut cooler = SimpleHeatExchanger::new();
    cooler.pr = Param::fixed(1.0);
    let cooler = b.add("cooler", ComponentModel::SimpleHeatExchanger(cooler));
    let mut valve = Valve::new();
    valve.zeta = Param::from_design();
    let v1 = b.add("v1", ComponentModel::Valve(valve));
    let mut recool = SimpleHeatExchanger::new();
    recool.pr = Param::fixed(1.0);
    let recool = b.add("recool", ComponentModel::SimpleHeatExchanger(recool));

    let c1 = b.connect(cc, 0, cp1, 0, "1").unwrap();
    let c2 = b.connect(cp1, 0, cooler, 0, "2").unwrap();
    let c3 = b.connect(cooler, 0, v1, 0, "3").unwrap();
    b.connect(v1, 0, recool, 0, "4").unwrap();
    b.connect(recool, 0, cc, 0, "5").unwrap();

    let mut net = b.build(gas).unwrap();
    net.set_pure(c1, Species::Air);
    net.set_m(c1, kgps(1.0));
    net.set_p(c1, bar(1.0));
    net.set_t(c1, k(290.0));
    net.set_t(c3, k(320.0));
    // Seed the high-pressure leg so the first Newton step starts near
    // the compressed state.
    net.set_p0(c2, bar(3.0));
    net.set_p0(c3, bar(3.0));
    net.set_h0(c2, 1.2e5);

    net.add_bus(
        Bus::new("shaft").with_member(
            cp1,
            BusBase::Bus,
            MemberEff::Char(chars::generic_eta_s_char()),
        ),
    );
    net
}

#[test]
fn design_closes_the_loop_and_sizes_the_valve() {
    let gas = PerfectGas::new();
    let mut net = loop_net(&gas);

    let report = net.solve_design().unwrap();
    assert_eq!(report.mode, Mode::Design);
    assert_eq!(report.unknowns, 13);

    let sol = net.solution().unwrap();
    let (c1, c2, c3) = (
        sol.conn("1").unwrap(),
        sol.conn("2").unwrap(),
        sol.conn("3").unwrap(),
    );
    let (c4, c5) = (sol.conn("4").unwrap(), sol.conn("5").unwrap());

    // Cycle closer stitches the loop shut.
    assert!((c5.p - c1.p).abs() < 1e-3);
    assert!((c5.h - c1.h).abs() < 1e-3);
    assert!((c1.m - 1.0).abs() < 1e-9);

    // Compression: imposed ratio, efficiency against the isentropic path.
    assert!((c2.p - 3.0e5).abs() < 1.0);
    let air = Composition::pure(Species::Air);
    let h2s = isentropic_enthalpy(&gas, pa(1.0e5), c1.h, pa(3.0e5), &air).unwrap();
    let h2_expected = c1.h + (h2s - c1.h) / 0.85;
    assert!((c2.h - h2_expected).abs() < 0.5, "h2 was {}", c2.h);
    assert!((c3.t - 320.0).abs() < 1e-3);
    assert!((c4.h - c3.h).abs() < 1e-3, "throttling is isenthalpic");

    // First law over the loop: shaft power in equals heat rejected.
    let power = sol.comp("cp1").unwrap().param(ParamKey::Power).unwrap();
    let q_cooler = c2.m * (c3.h - c2.h);
    let q_recool = c4.m * (c5.h - c4.h);
    assert!(power > 0.0);
    assert!((power + q_cooler + q_recool).abs() < 5.0);

    // At the design point the drive characteristic reads one.
    let shaft = sol.bus("shaft").unwrap();
    assert_eq!(shaft.members.len(), 1);
    let member = &shaft.members[0];
    assert!((member.power - power).abs() < 1.0);
    assert!((member.contribution - power).abs() < 1.0);
    assert!((shaft.total - power).abs() < 1.0);
}

#[test]
fn offdesign_at_the_design_point_reproduces_it() {
    let gas = PerfectGas::new();
    let mut net = loop_net(&gas);

    net.solve_design().unwrap();
    let h2_design = net.solution().unwrap().conn("2").unwrap().h;

    let report = net.solve_offdesign().unwrap();
    assert_eq!(report.mode, Mode::Offdesign);
    assert_eq!(report.unknowns, 13);

    let sol = net.solution().unwrap();
    assert!((sol.conn("2").unwrap().p - 3.0e5).abs() < 1.0);
    assert!((sol.conn("2").unwrap().h - h2_design).abs() < 0.5);
    let eta = sol.comp("cp1").unwrap().param(ParamKey::EtaS).unwrap();
    assert!((eta - 0.85).abs() < 1e-4);
}

#[test]
fn part_load_follows_the_characteristics() {
    let gas = PerfectGas::new();
    let mut net = loop_net(&gas);

    net.solve_design().unwrap();
    let power_design = net
        .design_record()
        .unwrap()
        .bus_flow("shaft", "cp1")
        .unwrap();
    let c1 = net.topology().conn_by_label("1").unwrap();

    // 20% over design flow: the sized valve pushes the discharge
    // pressure up and the efficiency curve derates the compressor.
    net.set_m(c1, kgps(1.2));
    let report = net.solve_offdesign().unwrap();
    assert!(report.warnings.is_empty());

    let sol = net.solution().unwrap();
    let eta = sol.comp("cp1").unwrap().param(ParamKey::EtaS).unwrap();
    assert!((eta - 0.85 * 0.976).abs() < 1e-3, "eta was {eta}");

    let p2 = sol.conn("2").unwrap().p;
    assert!(p2 > 3.2e5 && p2 < 4.2e5, "p2 was {p2}");

    let power = sol.comp("cp1").unwrap().param(ParamKey::Power).unwrap();
    assert!(power > power_design);

    // The motor curve is anchored on the recorded design power.
    let member = &sol.bus("shaft").unwrap().members[0];
    let eff = chars::generic_eta_s_char().evaluate(power / power_design);
    assert!((member.contribution - power / eff).abs() < 1.0);
    assert!(member.contribution > power);
}
