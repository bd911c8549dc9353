//! Incremental topology builder.

use std::collections::HashMap;

use tc_core::{CompId, ConnId};

use crate::error::{TopologyError, TopologyResult};
use crate::topology::{ComponentNode, Connection, PortKind, PortRef, Topology};
use crate::validate;

/// Builder for constructing a topology incrementally.
///
/// Use `add_component` to declare components with their port arities, then
/// `connect` to wire outlet ports to inlet ports. `build()` validates the
/// wiring and freezes it into an immutable [`Topology`].
#[derive(Debug, Default)]
pub struct TopologyBuilder {
    comps: Vec<ComponentNode>,
    conns: Vec<Connection>,
    /// Connection occupying each inlet port, once wired.
    inlets: Vec<Vec<Option<ConnId>>>,
    /// Connection occupying each outlet port, once wired.
    outlets: Vec<Vec<Option<ConnId>>>,
}

impl TopologyBuilder {
    /// Create a new empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a component with the given port arities and return its ID.
    pub fn add_component(&mut self, label: impl Into<String>, n_in: u8, n_out: u8) -> CompId {
        let id = CompId::from_index(self.comps.len() as u32);
        self.comps.push(ComponentNode {
            id,
            label: label.into(),
            n_in,
            n_out,
        });
        self.inlets.push(vec![None; n_in as usize]);
        self.outlets.push(vec![None; n_out as usize]);
        id
    }

    /// Wire outlet port `out_port` of `src` to inlet port `in_port` of `dst`.
    ///
    /// Port indices are zero-based and each port carries at most one
    /// connection. Errors immediately on unknown components, out-of-range
    /// ports, or already-occupied ports.
    pub fn connect(
        &mut self,
        src: CompId,
        out_port: u8,
        dst: CompId,
        in_port: u8,
        label: impl Into<String>,
    ) -> TopologyResult<ConnId> {
        let src_idx = src.index() as usize;
        let dst_idx = dst.index() as usize;

        let src_node = self
            .comps
            .get(src_idx)
            .ok_or(TopologyError::UnknownComponent { what: "source" })?;
        if out_port >= src_node.n_out {
            return Err(TopologyError::PortOutOfRange {
                comp: src_node.label.clone(),
                kind: PortKind::Outlet,
                index: out_port,
                arity: src_node.n_out,
            });
        }

        let dst_node = self
            .comps
            .get(dst_idx)
            .ok_or(TopologyError::UnknownComponent { what: "target" })?;
        if in_port >= dst_node.n_in {
            return Err(TopologyError::PortOutOfRange {
                comp: dst_node.label.clone(),
                kind: PortKind::Inlet,
                index: in_port,
                arity: dst_node.n_in,
            });
        }

        if let Some(existing) = self.outlets[src_idx][out_port as usize] {
            return Err(TopologyError::PortOccupied {
                comp: self.comps[src_idx].label.clone(),
                kind: PortKind::Outlet,
                index: out_port,
                occupied_by: self.conns[existing.index() as usize].label.clone(),
            });
        }
        if let Some(existing) = self.inlets[dst_idx][in_port as usize] {
            return Err(TopologyError::PortOccupied {
                comp: self.comps[dst_idx].label.clone(),
                kind: PortKind::Inlet,
                index: in_port,
                occupied_by: self.conns[existing.index() as usize].label.clone(),
            });
        }

        let id = ConnId::from_index(self.conns.len() as u32);
        self.conns.push(Connection {
            id,
            label: label.into(),
            source: PortRef {
                comp: src,
                kind: PortKind::Outlet,
                index: out_port,
            },
            target: PortRef {
                comp: dst,
                kind: PortKind::Inlet,
                index: in_port,
            },
        });
        self.outlets[src_idx][out_port as usize] = Some(id);
        self.inlets[dst_idx][in_port as usize] = Some(id);
        Ok(id)
    }

    /// Build and validate the topology, returning an immutable [`Topology`].
    ///
    /// Fails if any declared port is left unconnected, if labels collide, or
    /// if the network has no connections at all.
    pub fn build(self) -> TopologyResult<Topology> {
        validate::validate_wiring(&self.comps, &self.conns, &self.inlets, &self.outlets)?;

        // Freeze the Option slots into dense port-ordered lists; wiring
        // validation has already ruled out dangling ports.
        let inlets: Vec<Vec<ConnId>> = self
            .inlets
            .into_iter()
            .map(|ports| ports.into_iter().flatten().collect())
            .collect();
        let outlets: Vec<Vec<ConnId>> = self
            .outlets
            .into_iter()
            .map(|ports| ports.into_iter().flatten().collect())
            .collect();

        let mut comp_labels = HashMap::with_capacity(self.comps.len());
        for comp in &self.comps {
            comp_labels.insert(comp.label.clone(), comp.id);
        }
        let mut conn_labels = HashMap::with_capacity(self.conns.len());
        for conn in &self.conns {
            conn_labels.insert(conn.label.clone(), conn.id);
        }

        let topo = Topology {
            comps: self.comps,
            conns: self.conns,
            inlets,
            outlets,
            comp_labels,
            conn_labels,
        };
        validate::validate_adjacency(&topo)?;
        Ok(topo)
    }
}
