//! Core topology data structures.

use std::collections::HashMap;

use tc_core::{CompId, ConnId};

/// Direction/kind of a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortKind {
    /// Inlet port (flow enters the component).
    Inlet,
    /// Outlet port (flow leaves the component).
    Outlet,
}

impl PortKind {
    /// Label prefix: ports print as `in1`, `in2`, ... / `out1`, `out2`, ...
    pub fn prefix(self) -> &'static str {
        match self {
            PortKind::Inlet => "in",
            PortKind::Outlet => "out",
        }
    }
}

/// A specific port on a specific component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PortRef {
    pub comp: CompId,
    pub kind: PortKind,
    /// Zero-based port index within its kind.
    pub index: u8,
}

/// A component in the network: a labelled node with fixed port arities.
///
/// Components are physics-agnostic at this layer. Kinds, parameters and
/// equations attach upstream, keyed by `CompId`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentNode {
    pub id: CompId,
    pub label: String,
    pub n_in: u8,
    pub n_out: u8,
}

/// A directed connection from an outlet port to an inlet port.
///
/// Connections carry the flow state (mass flow, pressure, enthalpy,
/// composition) in the layers above; here they are pure wiring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub id: ConnId,
    pub label: String,
    /// Outlet port of the upstream component.
    pub source: PortRef,
    /// Inlet port of the downstream component.
    pub target: PortRef,
}

/// The topology: a validated, immutable network of components and connections.
///
/// Adjacency is stored per component and ordered by port index, so
/// `inlet_conns(comp)[i]` is the connection on port `in{i+1}`. Every port is
/// guaranteed connected by construction.
#[derive(Debug, Clone)]
pub struct Topology {
    pub(crate) comps: Vec<ComponentNode>,
    pub(crate) conns: Vec<Connection>,

    /// Per component: connection on each inlet port, ordered by port index.
    pub(crate) inlets: Vec<Vec<ConnId>>,
    /// Per component: connection on each outlet port, ordered by port index.
    pub(crate) outlets: Vec<Vec<ConnId>>,

    pub(crate) comp_labels: HashMap<String, CompId>,
    pub(crate) conn_labels: HashMap<String, ConnId>,
}

impl Topology {
    /// Return all components.
    pub fn components(&self) -> &[ComponentNode] {
        &self.comps
    }

    /// Return all connections.
    pub fn connections(&self) -> &[Connection] {
        &self.conns
    }

    /// Get a component by ID (returns None if ID out of bounds).
    pub fn component(&self, id: CompId) -> Option<&ComponentNode> {
        self.comps.get(id.index() as usize)
    }

    /// Get a connection by ID (returns None if ID out of bounds).
    pub fn connection(&self, id: ConnId) -> Option<&Connection> {
        self.conns.get(id.index() as usize)
    }

    /// Look up a component by label.
    pub fn comp_by_label(&self, label: &str) -> Option<CompId> {
        self.comp_labels.get(label).copied()
    }

    /// Look up a connection by label.
    pub fn conn_by_label(&self, label: &str) -> Option<ConnId> {
        self.conn_labels.get(label).copied()
    }

    /// Connections entering a component, ordered by inlet port index.
    pub fn inlet_conns(&self, comp: CompId) -> &[ConnId] {
        self.inlets
            .get(comp.index() as usize)
            .map_or(&[], Vec::as_slice)
    }

    /// Connections leaving a component, ordered by outlet port index.
    pub fn outlet_conns(&self, comp: CompId) -> &[ConnId] {
        self.outlets
            .get(comp.index() as usize)
            .map_or(&[], Vec::as_slice)
    }

    /// Component a connection leaves from.
    pub fn upstream(&self, conn: ConnId) -> Option<CompId> {
        self.connection(conn).map(|c| c.source.comp)
    }

    /// Component a connection arrives at.
    pub fn downstream(&self, conn: ConnId) -> Option<CompId> {
        self.connection(conn).map(|c| c.target.comp)
    }
}
