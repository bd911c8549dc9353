//! Problem definition: a topology plus everything pinned on it.
//!
//! [`NetworkBuilder`] wires components; the built [`Network`] carries the
//! connection specifications, busses and solver configuration, and owns
//! the solve entry points. Specified values are raw SI scalars inside;
//! the setters take dimensioned quantities.

use std::path::Path;

use tc_components::{ComponentModel, Mode, Role};
use tc_core::units::{MassRate, Pressure, Temperature, VolumeRate};
use tc_core::{CompId, ConnId};
use tc_design::DesignRecord;
use tc_fluids::{PropertyProvider, SpecEnthalpy, Species};
use tc_net::{Topology, TopologyBuilder};

use crate::bus::Bus;
use crate::error::{SolveError, SolveResult};
use crate::newton::SolverConfig;
use crate::report::{Solution, SolveReport};
use crate::solve;

/// How a connection variable is pinned.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConnValue {
    /// An explicit SI value.
    Value(f64),
    /// `value = factor * value(other) + offset`, tying the variable to the
    /// same variable on another connection.
    Ref {
        other: ConnId,
        factor: f64,
        offset: f64,
    },
}

/// Specification state of one connection variable: what it is pinned to,
/// and in which solve mode the pin applies.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConnVar {
    pub spec: Option<ConnValue>,
    pub role: Role,
}

impl ConnVar {
    /// Pin to a value in both modes.
    pub fn value(v: f64) -> Self {
        Self {
            spec: Some(ConnValue::Value(v)),
            role: Role::Always,
        }
    }

    /// Pin at the design point only.
    pub fn design_value(v: f64) -> Self {
        Self {
            spec: Some(ConnValue::Value(v)),
            role: Role::DesignOnly,
        }
    }

    /// Hold at the design solution during offdesign solves.
    pub fn from_design() -> Self {
        Self {
            spec: None,
            role: Role::OffdesignOnly,
        }
    }

    /// Tie to the same variable on another connection.
    pub fn reference(other: ConnId, factor: f64, offset: f64) -> Self {
        Self {
            spec: Some(ConnValue::Ref {
                other,
                factor,
                offset,
            }),
            role: Role::Always,
        }
    }

    pub(crate) fn active(&self, mode: Mode) -> bool {
        self.role.active(mode)
    }
}

/// Composition specification for one connection.
#[derive(Debug, Clone)]
pub enum CompositionSpec {
    /// A single species at mass fraction one.
    Pure(Species),
    /// Explicit mass fractions. Species of the network not listed here
    /// stay free on this connection.
    Fractions(Vec<(Species, f64)>),
}

/// Everything a user can pin on one connection.
///
/// `m`, `p` and `h` are state variables: pinning one removes it from the
/// unknowns. `t` and `v` are derived quantities: pinning one adds an
/// equation instead. The starting values `m0`/`p0`/`h0` only seed the
/// iteration.
#[derive(Debug, Clone, Default)]
pub struct ConnSpec {
    pub m: ConnVar,
    pub p: ConnVar,
    pub h: ConnVar,
    pub t: ConnVar,
    pub v: ConnVar,
    pub m0: Option<f64>,
    pub p0: Option<f64>,
    pub h0: Option<f64>,
    pub composition: Option<CompositionSpec>,
}

/// Builds the wiring and collects the component models.
pub struct NetworkBuilder {
    topo: TopologyBuilder,
    models: Vec<ComponentModel>,
}

impl NetworkBuilder {
    pub fn new() -> Self {
        Self {
            topo: TopologyBuilder::new(),
            models: Vec::new(),
        }
    }

    /// Add a component; port arities come from the model.
    pub fn add(&mut self, label: impl Into<String>, model: ComponentModel) -> CompId {
        let id = self
            .topo
            .add_component(label, model.num_in(), model.num_out());
        self.models.push(model);
        id
    }

    /// Wire outlet port `out_port` of `src` to inlet port `in_port` of
    /// `dst`. Ports are zero-based.
    pub fn connect(
        &mut self,
        src: CompId,
        out_port: u8,
        dst: CompId,
        in_port: u8,
        label: impl Into<String>,
    ) -> SolveResult<ConnId> {
        Ok(self.topo.connect(src, out_port, dst, in_port, label)?)
    }

    /// Validate the wiring and attach the property backend.
    pub fn build(self, provider: &dyn PropertyProvider) -> SolveResult<Network<'_>> {
        let topo = self.topo.build()?;
        let n_conns = topo.connections().len();
        Ok(Network {
            topo,
            models: self.models,
            specs: vec![ConnSpec::default(); n_conns],
            busses: Vec::new(),
            provider,
            config: SolverConfig::default(),
            design: None,
            solution: None,
        })
    }
}

impl Default for NetworkBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A solvable flowsheet.
pub struct Network<'a> {
    pub(crate) topo: Topology,
    pub(crate) models: Vec<ComponentModel>,
    pub(crate) specs: Vec<ConnSpec>,
    pub(crate) busses: Vec<Bus>,
    pub(crate) provider: &'a dyn PropertyProvider,
    pub config: SolverConfig,
    pub(crate) design: Option<DesignRecord>,
    pub(crate) solution: Option<Solution>,
}

impl<'a> Network<'a> {
    pub fn topology(&self) -> &Topology {
        &self.topo
    }

    pub fn model(&self, comp: CompId) -> Option<&ComponentModel> {
        self.models.get(comp.index() as usize)
    }

    /// Mutable access to a component model, e.g. to change parameter
    /// specifications between solves. Ids come from this network's
    /// builder.
    pub fn model_mut(&mut self, comp: CompId) -> &mut ComponentModel {
        &mut self.models[comp.index() as usize]
    }

    /// Mutable access to a connection's full specification.
    pub fn spec_mut(&mut self, conn: ConnId) -> &mut ConnSpec {
        &mut self.specs[conn.index() as usize]
    }

    /// Pin mass flow in both modes.
    pub fn set_m(&mut self, conn: ConnId, m: MassRate) {
        self.spec_mut(conn).m = ConnVar::value(m.value);
    }

    /// Pin pressure in both modes.
    pub fn set_p(&mut self, conn: ConnId, p: Pressure) {
        self.spec_mut(conn).p = ConnVar::value(p.value);
    }

    /// Pin specific enthalpy (J/kg) in both modes.
    pub fn set_h(&mut self, conn: ConnId, h: SpecEnthalpy) {
        self.spec_mut(conn).h = ConnVar::value(h);
    }

    /// Pin temperature in both modes.
    pub fn set_t(&mut self, conn: ConnId, t: Temperature) {
        self.spec_mut(conn).t = ConnVar::value(t.value);
    }

    /// Pin volumetric flow in both modes.
    pub fn set_vdot(&mut self, conn: ConnId, v: VolumeRate) {
        self.spec_mut(conn).v = ConnVar::value(v.value);
    }

    /// Seed the mass-flow iteration without constraining it.
    pub fn set_m0(&mut self, conn: ConnId, m: MassRate) {
        self.spec_mut(conn).m0 = Some(m.value);
    }

    pub fn set_p0(&mut self, conn: ConnId, p: Pressure) {
        self.spec_mut(conn).p0 = Some(p.value);
    }

    pub fn set_h0(&mut self, conn: ConnId, h: SpecEnthalpy) {
        self.spec_mut(conn).h0 = Some(h);
    }

    /// Fix the connection to a single species.
    pub fn set_pure(&mut self, conn: ConnId, species: Species) {
        self.spec_mut(conn).composition = Some(CompositionSpec::Pure(species));
    }

    /// Fix mass fractions of the listed species on this connection.
    pub fn set_fractions(&mut self, conn: ConnId, fractions: &[(Species, f64)]) {
        self.spec_mut(conn).composition = Some(CompositionSpec::Fractions(fractions.to_vec()));
    }

    pub fn add_bus(&mut self, bus: Bus) {
        self.busses.push(bus);
    }

    /// Size the plant: solve with design-role specifications active and
    /// capture the design record.
    pub fn solve_design(&mut self) -> SolveResult<SolveReport> {
        let (report, solution, record) = solve::run(self, Mode::Design)?;
        self.solution = Some(solution);
        self.design = record;
        Ok(report)
    }

    /// Re-solve the sized plant: released design constraints are replaced
    /// by capacities and characteristics anchored in the design record.
    pub fn solve_offdesign(&mut self) -> SolveResult<SolveReport> {
        if self.design.is_none() {
            return Err(SolveError::Configuration {
                what: "offdesign solve needs a design record; \
                       run solve_design or load_design first"
                    .to_string(),
            });
        }
        let (report, solution, _) = solve::run(self, Mode::Offdesign)?;
        self.solution = Some(solution);
        Ok(report)
    }

    /// The most recent converged solution.
    pub fn solution(&self) -> Option<&Solution> {
        self.solution.as_ref()
    }

    pub fn design_record(&self) -> Option<&DesignRecord> {
        self.design.as_ref()
    }

    /// Write the captured design record to a JSON file.
    pub fn save_design(&self, path: &Path) -> SolveResult<()> {
        let record = self.design.as_ref().ok_or_else(|| SolveError::Configuration {
            what: "no design record to save; run solve_design first".to_string(),
        })?;
        tc_design::save_record(path, record)?;
        Ok(())
    }

    /// Load a design record, verifying it was produced on this topology.
    pub fn load_design(&mut self, path: &Path) -> SolveResult<()> {
        let record = tc_design::load_record(path)?;
        let fingerprint = solve::fingerprint(&self.topo, &self.models);
        if record.topology != fingerprint {
            return Err(SolveError::DesignMismatch {
                what: format!(
                    "record was solved on a different topology ({})",
                    path.display()
                ),
            });
        }
        self.design = Some(record);
        Ok(())
    }
}
