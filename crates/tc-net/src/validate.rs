//! Topology validation logic.

use std::collections::{HashMap, HashSet, hash_map::Entry};

use tc_core::ConnId;

use crate::error::{TopologyError, TopologyResult};
use crate::topology::{ComponentNode, Connection, PortKind, Topology};

/// Validate wiring before freezing: network non-empty, labels unique,
/// every declared port connected.
pub(crate) fn validate_wiring(
    comps: &[ComponentNode],
    conns: &[Connection],
    inlets: &[Vec<Option<ConnId>>],
    outlets: &[Vec<Option<ConnId>>],
) -> TopologyResult<()> {
    if conns.is_empty() {
        return Err(TopologyError::Empty);
    }

    let mut comp_labels = HashMap::with_capacity(comps.len());
    for comp in comps {
        match comp_labels.entry(comp.label.as_str()) {
            Entry::Vacant(slot) => {
                slot.insert(comp.id);
            }
            Entry::Occupied(_) => {
                return Err(TopologyError::DuplicateComponentLabel {
                    label: comp.label.clone(),
                });
            }
        }
    }
    let mut conn_labels = HashMap::with_capacity(conns.len());
    for conn in conns {
        match conn_labels.entry(conn.label.as_str()) {
            Entry::Vacant(slot) => {
                slot.insert(conn.id);
            }
            Entry::Occupied(_) => {
                return Err(TopologyError::DuplicateConnectionLabel {
                    label: conn.label.clone(),
                });
            }
        }
    }

    for comp in comps {
        let idx = comp.id.index() as usize;
        for (port, slot) in inlets[idx].iter().enumerate() {
            if slot.is_none() {
                return Err(TopologyError::DanglingPort {
                    comp: comp.label.clone(),
                    kind: PortKind::Inlet,
                    index: port as u8,
                });
            }
        }
        for (port, slot) in outlets[idx].iter().enumerate() {
            if slot.is_none() {
                return Err(TopologyError::DanglingPort {
                    comp: comp.label.clone(),
                    kind: PortKind::Outlet,
                    index: port as u8,
                });
            }
        }
    }

    Ok(())
}

/// Validate the frozen adjacency lists against the connection table.
///
/// Every connection must appear exactly once on its source component's
/// outlet list and once on its target component's inlet list, at the port
/// positions its endpoint refs claim.
pub(crate) fn validate_adjacency(topo: &Topology) -> TopologyResult<()> {
    let mut seen: HashSet<ConnId> = HashSet::with_capacity(topo.conns.len());

    for comp in &topo.comps {
        let idx = comp.id.index() as usize;

        for (port, &conn_id) in topo.inlets[idx].iter().enumerate() {
            let conn = topo
                .connection(conn_id)
                .ok_or(TopologyError::InconsistentAdjacency { conn: conn_id })?;
            if conn.target.comp != comp.id || conn.target.index as usize != port {
                return Err(TopologyError::InconsistentAdjacency { conn: conn_id });
            }
        }

        for (port, &conn_id) in topo.outlets[idx].iter().enumerate() {
            let conn = topo
                .connection(conn_id)
                .ok_or(TopologyError::InconsistentAdjacency { conn: conn_id })?;
            if conn.source.comp != comp.id || conn.source.index as usize != port {
                return Err(TopologyError::InconsistentAdjacency { conn: conn_id });
            }
            // Each connection has one source port; duplicates mean corruption.
            if !seen.insert(conn_id) {
                return Err(TopologyError::InconsistentAdjacency { conn: conn_id });
            }
        }
    }

    for conn in &topo.conns {
        if !seen.contains(&conn.id) {
            return Err(TopologyError::InconsistentAdjacency { conn: conn.id });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tc_core::Id;

    fn comp(idx: u32, label: &str, n_in: u8, n_out: u8) -> ComponentNode {
        ComponentNode {
            id: Id::from_index(idx),
            label: label.into(),
            n_in,
            n_out,
        }
    }

    #[test]
    fn wiring_rejects_empty() {
        let result = validate_wiring(&[], &[], &[], &[]);
        assert!(matches!(result, Err(TopologyError::Empty)));
    }

    #[test]
    fn wiring_rejects_dangling_inlet() {
        use crate::topology::PortRef;

        let comps = vec![comp(0, "a", 0, 1), comp(1, "b", 2, 0)];
        let conn_id = Id::from_index(0);
        let conns = vec![Connection {
            id: conn_id,
            label: "1".into(),
            source: PortRef {
                comp: comps[0].id,
                kind: PortKind::Outlet,
                index: 0,
            },
            target: PortRef {
                comp: comps[1].id,
                kind: PortKind::Inlet,
                index: 0,
            },
        }];
        let inlets = vec![vec![], vec![Some(conn_id), None]];
        let outlets = vec![vec![Some(conn_id)], vec![]];

        let result = validate_wiring(&comps, &conns, &inlets, &outlets);
        assert!(matches!(
            result,
            Err(TopologyError::DanglingPort {
                kind: PortKind::Inlet,
                index: 1,
                ..
            })
        ));
    }
}
