//! Size a closed gas loop at its design point, then sweep the mass flow
//! and watch the sized valve and the compressor characteristic move the
//! operating point.

use tc_components::{
    BusBase, ComponentModel, Compressor, CycleCloser, Param, ParamKey, SimpleHeatExchanger,
    Valve, chars,
};
use tc_core::units::{bar, k, kgps};
use tc_fluids::{PerfectGas, Species};
use tc_solver::{Bus, MemberEff, NetworkBuilder};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let gas = PerfectGas::new();
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

    let c1 = b.connect(cc, 0, cp1, 0, "1")?;
    let c2 = b.connect(cp1, 0, cooler, 0, "2")?;
    let c3 = b.connect(cooler, 0, v1, 0, "3")?;
    b.connect(v1, 0, recool, 0, "4")?;
    b.connect(recool, 0, cc, 0, "5")?;

    let mut net = b.build(&gas)?;
    net.set_pure(c1, Species::Air);
    net.set_m(c1, kgps(1.0));
    net.set_p(c1, bar(1.0));
    net.set_t(c1, k(290.0));
    net.set_t(c3, k(320.0));
    net.set_p0(c2, bar(3.0));
    net.set_p0(c3, bar(3.0));
    net.set_h0(c2, 1.2e5);
    net.add_bus(Bus::new("shaft").with_member(
        cp1,
        BusBase::Bus,
        MemberEff::Char(chars::generic_eta_s_char()),
    ));

    let report = net.solve_design()?;
    println!(
        "design point ({} iterations, residual {:.3e})",
        report.iterations, report.residual_norm
    );
    println!(
        "  {:<6} {:>10} {:>10} {:>9} {:>11}",
        "conn", "m [kg/s]", "p [bar]", "T [K]", "h [kJ/kg]"
    );
    {
        let sol = net.solution().ok_or("no solution")?;
        for label in ["1", "2", "3", "4", "5"] {
            let c = sol.conn(label).ok_or("missing connection")?;
            println!(
                "  {:<6} {:>10.3} {:>10.3} {:>9.2} {:>11.2}",
                c.label,
                c.m,
                c.p / 1.0e5,
                c.t,
                c.h / 1.0e3
            );
        }
    }

    println!();
    println!("part load sweep");
    println!(
        "  {:>8} {:>9} {:>8} {:>9} {:>11}",
        "m [kg/s]", "p2 [bar]", "T2 [K]", "eta_s", "shaft [kW]"
    );
    for flow in [0.8, 1.0, 1.2] {
        net.set_m(c1, kgps(flow));
        let report = net.solve_offdesign()?;
        let sol = net.solution().ok_or("no solution")?;
        let discharge = sol.conn("2").ok_or("missing connection")?;
        let cp1 = sol.comp("cp1").ok_or("missing component")?;
        let eta = cp1.param(ParamKey::EtaS).ok_or("missing eta_s")?;
        let shaft = sol.bus("shaft").ok_or("missing bus")?;
        println!(
            "  {:>8.2} {:>9.3} {:>8.2} {:>9.4} {:>11.2}",
            flow,
            discharge.p / 1.0e5,
            discharge.t,
            eta,
            shaft.total / 1.0e3
        );
        for w in &report.warnings {
            println!(
                "    warning: {} evaluated at {:.3}, outside [{}, {}]",
                w.equation, w.x, w.domain.0, w.domain.1
            );
        }
    }

    Ok(())
}
