//! Design record data types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Bumped whenever the record layout changes incompatibly.
pub const FORMAT_VERSION: u32 = 1;

/// Snapshot of a converged design solve.
///
/// Keys are user-facing labels rather than numeric ids, so a record
/// survives rebuilding the network as long as labels and wiring stay the
/// same. Values are raw SI scalars. `BTreeMap` keeps the serialized form
/// stable, so records diff cleanly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignRecord {
    pub format_version: u32,
    /// RFC 3339 creation time, UTC.
    pub created_at: String,
    /// Fingerprint of the topology the record was solved on.
    pub topology: String,
    /// Connection label -> variable name (`m`, `p`, `h`, `t`, `v`,
    /// `x:<species>`) -> value.
    pub connections: BTreeMap<String, BTreeMap<String, f64>>,
    /// Component label -> parameter name -> value.
    pub components: BTreeMap<String, BTreeMap<String, f64>>,
    /// Bus label -> member component label -> design energy flow (W).
    pub busses: BTreeMap<String, BTreeMap<String, f64>>,
}

impl DesignRecord {
    pub fn new(topology: String) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            created_at: chrono::Utc::now().to_rfc3339(),
            topology,
            connections: BTreeMap::new(),
            components: BTreeMap::new(),
            busses: BTreeMap::new(),
        }
    }

    pub fn insert_conn(&mut self, conn: &str, var: &str, value: f64) {
        self.connections
            .entry(conn.to_string())
            .or_default()
            .insert(var.to_string(), value);
    }

    /// A recorded connection variable.
    pub fn conn(&self, conn: &str, var: &str) -> Option<f64> {
        self.connections.get(conn).and_then(|row| row.get(var)).copied()
    }

    pub fn insert_param(&mut self, comp: &str, param: &str, value: f64) {
        self.components
            .entry(comp.to_string())
            .or_default()
            .insert(param.to_string(), value);
    }

    /// A recorded component parameter.
    pub fn param(&self, comp: &str, param: &str) -> Option<f64> {
        self.components.get(comp).and_then(|row| row.get(param)).copied()
    }

    pub fn insert_bus_flow(&mut self, bus: &str, comp: &str, value: f64) {
        self.busses
            .entry(bus.to_string())
            .or_default()
            .insert(comp.to_string(), value);
    }

    /// The design-point energy flow a bus member was converted at.
    pub fn bus_flow(&self, bus: &str, comp: &str) -> Option<f64> {
        self.busses.get(bus).and_then(|row| row.get(comp)).copied()
    }
}
