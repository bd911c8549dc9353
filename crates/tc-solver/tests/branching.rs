//! Integration test: mixing and splitting conserve mass and composition.

use tc_components::{ComponentModel, Merge, Sink, Source, Splitter};
use tc_core::units::{bar, k, kgps};
use tc_fluids::{PerfectGas, Species};
use tc_solver::NetworkBuilder;

#[test]
fn merge_balances_mass_species_and_energy() {
    // a (80/20 N2-O2 at 300 K) + b (pure O2 at 400 K) --> mix
    let gas = PerfectGas::new();
    let mut b = NetworkBuilder::new();
    let src_a = b.add("src_a", ComponentModel::Source(Source));
    let src_b = b.add("src_b", ComponentModel::Source(Source));
    let mix = b.add("mix", ComponentModel::Merge(Merge::new(2).unwrap()));
    let drain = b.add("drain", ComponentModel::Sink(Sink));
    let ca = b.connect(src_a, 0, mix, 0, "a").unwrap();
    let cb = b.connect(src_b, 0, mix, 1, "b").unwrap();
    b.connect(mix, 0, drain, 0, "out").unwrap();

    let mut net = b.build(&gas).unwrap();
    net.set_fractions(ca, &[(Species::N2, 0.8), (Species::O2, 0.2)]);
    net.set_pure(cb, Species::O2);
    net.set_m(ca, kgps(1.0));
    net.set_p(ca, bar(2.0));
    net.set_t(ca, k(300.0));
    net.set_m(cb, kgps(3.0));
    net.set_t(cb, k(400.0));

    net.solve_design().unwrap();
    let sol = net.solution().unwrap();
    let a = sol.conn("a").unwrap();
    let b = sol.conn("b").unwrap();
    let out = sol.conn("out").unwrap();

    // Mass and species balances.
    assert!((out.m - 4.0).abs() < 1e-6);
    for species in [Species::N2, Species::O2] {
        let inflow = a.m * a.composition.mass_fraction(species)
            + b.m * b.composition.mass_fraction(species);
        let outflow = out.m * out.composition.mass_fraction(species);
        assert!(
            (inflow - outflow).abs() < 1e-6,
            "{} imbalance: {inflow} vs {outflow}",
            species.key()
        );
    }
    assert!((out.composition.mass_fraction(Species::N2) - 0.2).abs() < 1e-6);

    // One pressure across the mixer, even where it was never specified.
    assert!((b.p - 2.0e5).abs() < 1.0);
    assert!((out.p - 2.0e5).abs() < 1.0);

    // Adiabatic mixing: outlet enthalpy is the flow-weighted mean, and
    // the temperature lands between the feeds.
    let h_mix = (a.m * a.h + b.m * b.h) / out.m;
    assert!((out.h - h_mix).abs() < 1e-3);
    assert!(out.t > 300.0 && out.t < 400.0, "t was {}", out.t);
}

#[test]
fn splitter_divides_mass_and_keeps_the_state() {
    // in --> (branch_a at 0.5 kg/s, branch_b takes the rest)
    let gas = PerfectGas::new();
    let mut b = NetworkBuilder::new();
    let feed = b.add("feed", ComponentModel::Source(Source));
    let split = b.add("split", ComponentModel::Splitter(Splitter::new(2).unwrap()));
    let sink_a = b.add("sink_a", ComponentModel::Sink(Sink));
    let sink_b = b.add("sink_b", ComponentModel::Sink(Sink));
    let c_in = b.connect(feed, 0, split, 0, "in").unwrap();
    let c_a = b.connect(split, 0, sink_a, 0, "a").unwrap();
    b.connect(split, 1, sink_b, 0, "b").unwrap();

    let mut net = b.build(&gas).unwrap();
    net.set_fractions(c_in, &[(Species::N2, 0.7), (Species::O2, 0.3)]);
    net.set_m(c_in, kgps(2.0));
    net.set_p(c_in, bar(3.0));
    net.set_t(c_in, k(350.0));
    net.set_m(c_a, kgps(0.5));

    net.solve_design().unwrap();
    let sol = net.solution().unwrap();
    let inlet = sol.conn("in").unwrap();
    let a = sol.conn("a").unwrap();
    let b = sol.conn("b").unwrap();

    assert!((a.m + b.m - inlet.m).abs() < 1e-9);
    assert!((b.m - 1.5).abs() < 1e-6);

    for branch in [a, b] {
        assert!((branch.p - inlet.p).abs() < 1e-3);
        assert!((branch.h - inlet.h).abs() < 1e-3);
        assert!((branch.t - 350.0).abs() < 1e-3);
        for species in [Species::N2, Species::O2] {
            assert!(
                (branch.composition.mass_fraction(species)
                    - inlet.composition.mass_fraction(species))
                .abs()
                    < 1e-6
            );
        }
    }
}
