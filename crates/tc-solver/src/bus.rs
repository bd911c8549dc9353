//! Power busses: weighted sums of component shaft powers.
//!
//! A bus collects `m * dh` terms from its member components, each passed
//! through a conversion efficiency. With a total imposed the bus adds one
//! equation to the system; without one it is evaluated after the solve
//! for reporting.

use tc_components::{BusBase, BusEff, BusTerm, Mode};
use tc_core::units::Power;
use tc_core::{CharLine, CompId};
use tc_design::DesignRecord;
use tc_net::Topology;

use crate::error::{SolveError, SolveResult};

/// Member conversion efficiency.
///
/// A curve is read at `|P| / P_design`: at the design point it is
/// evaluated at ratio one, in offdesign the recorded design power of the
/// member anchors the normalization.
#[derive(Debug, Clone)]
pub enum MemberEff {
    Const(f64),
    Char(CharLine),
}

#[derive(Debug, Clone)]
pub struct BusMember {
    pub comp: CompId,
    pub base: BusBase,
    pub eff: MemberEff,
}

/// A labelled power balance over several components.
#[derive(Debug, Clone)]
pub struct Bus {
    pub(crate) label: String,
    pub(crate) total: Option<f64>,
    pub(crate) members: Vec<BusMember>,
}

impl Bus {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            total: None,
            members: Vec::new(),
        }
    }

    /// Impose the bus total (W); turns the bus into an equation.
    pub fn with_total(mut self, total: Power) -> Self {
        self.total = Some(total.value);
        self
    }

    pub fn with_member(mut self, comp: CompId, base: BusBase, eff: MemberEff) -> Self {
        self.members.push(BusMember { comp, base, eff });
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn total(&self) -> Option<f64> {
        self.total
    }
}

/// Resolve bus members against the topology and the solve mode.
///
/// Curves collapse to their ratio-one value at the design point; in
/// offdesign they need the member's recorded design power to normalize
/// the load ratio.
pub(crate) fn lower_terms(
    bus: &Bus,
    topo: &Topology,
    mode: Mode,
    record: Option<&DesignRecord>,
) -> SolveResult<Vec<BusTerm>> {
    let mut terms = Vec::with_capacity(bus.members.len());
    for member in &bus.members {
        let node = topo
            .component(member.comp)
            .ok_or_else(|| SolveError::Configuration {
                what: format!("bus '{}' references an unknown component", bus.label),
            })?;
        if node.n_in != 1 || node.n_out != 1 {
            return Err(SolveError::Configuration {
                what: format!(
                    "bus '{}' member '{}' must have exactly one inlet and one outlet",
                    bus.label, node.label
                ),
            });
        }
        let inlet = topo.inlet_conns(member.comp)[0];
        let outlet = topo.outlet_conns(member.comp)[0];

        let eff = match (&member.eff, mode) {
            (MemberEff::Const(eta), _) => {
                if !eta.is_finite() || *eta <= 0.0 {
                    return Err(SolveError::Configuration {
                        what: format!(
                            "bus '{}' member '{}' has efficiency {eta}, expected a \
                             positive value",
                            bus.label, node.label
                        ),
                    });
                }
                BusEff::Const(*eta)
            }
            (MemberEff::Char(curve), Mode::Design) => BusEff::Const(curve.evaluate(1.0)),
            (MemberEff::Char(curve), Mode::Offdesign) => {
                let flow = record
                    .and_then(|r| r.bus_flow(&bus.label, &node.label))
                    .ok_or_else(|| SolveError::DesignMismatch {
                        what: format!(
                            "bus '{}' member '{}' has no recorded design power",
                            bus.label, node.label
                        ),
                    })?;
                if flow.abs() <= 0.0 {
                    return Err(SolveError::DesignMismatch {
                        what: format!(
                            "bus '{}' member '{}' recorded zero design power, cannot \
                             normalize its efficiency curve",
                            bus.label, node.label
                        ),
                    });
                }
                BusEff::Char {
                    curve: curve.clone(),
                    p_design: flow.abs(),
                }
            }
        };

        terms.push(BusTerm {
            inlet,
            outlet,
            base: member.base,
            eff,
        });
    }
    Ok(terms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tc_core::units::kw;
    use tc_net::TopologyBuilder;

    fn compressor_line() -> (Topology, CompId) {
        let mut b = TopologyBuilder::new();
        let src = b.add_component("feed", 0, 1);
        let cp = b.add_component("cp", 1, 1);
        let snk = b.add_component("drain", 1, 0);
        b.connect(src, 0, cp, 0, "c1").unwrap();
        b.connect(cp, 0, snk, 0, "c2").unwrap();
        (b.build().unwrap(), cp)
    }

    #[test]
    fn constant_efficiency_lowers_directly() {
        let (topo, cp) = compressor_line();
        let bus = Bus::new("power")
            .with_total(kw(100.0))
            .with_member(cp, BusBase::Bus, MemberEff::Const(0.95));

        let terms = lower_terms(&bus, &topo, Mode::Design, None).unwrap();
        assert_eq!(terms.len(), 1);
        assert!(matches!(terms[0].eff, BusEff::Const(e) if e == 0.95));
        assert_eq!(bus.total(), Some(100e3));
    }

    #[test]
    fn curve_collapses_at_design_and_anchors_at_offdesign() {
        let (topo, cp) = compressor_line();
        let curve = CharLine::from_points(&[(0.5, 0.9), (1.0, 0.96), (1.5, 0.94)]).unwrap();
        let bus = Bus::new("power").with_member(cp, BusBase::Bus, MemberEff::Char(curve));

        let terms = lower_terms(&bus, &topo, Mode::Design, None).unwrap();
        assert!(matches!(terms[0].eff, BusEff::Const(e) if (e - 0.96).abs() < 1e-12));

        // Offdesign needs the recorded design power.
        let err = lower_terms(&bus, &topo, Mode::Offdesign, None).unwrap_err();
        assert!(matches!(err, SolveError::DesignMismatch { .. }));

        let mut record = DesignRecord::new("fp".to_string());
        record.insert_bus_flow("power", "cp", 120e3);
        let terms = lower_terms(&bus, &topo, Mode::Offdesign, Some(&record)).unwrap();
        assert!(matches!(
            terms[0].eff,
            BusEff::Char { p_design, .. } if p_design == 120e3
        ));
    }

    #[test]
    fn multi_port_members_are_rejected() {
        let mut b = TopologyBuilder::new();
        let s1 = b.add_component("feed1", 0, 1);
        let s2 = b.add_component("feed2", 0, 1);
        let mg = b.add_component("mix", 2, 1);
        let snk = b.add_component("drain", 1, 0);
        b.connect(s1, 0, mg, 0, "c1").unwrap();
        b.connect(s2, 0, mg, 1, "c2").unwrap();
        b.connect(mg, 0, snk, 0, "c3").unwrap();
        let topo = b.build().unwrap();

        let bus = Bus::new("power").with_member(mg, BusBase::Component, MemberEff::Const(1.0));
        let err = lower_terms(&bus, &topo, Mode::Design, None).unwrap_err();
        assert!(matches!(err, SolveError::Configuration { .. }));
    }
}
