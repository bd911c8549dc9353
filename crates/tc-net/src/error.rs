//! Topology-specific error types.
//!
//! Wiring mistakes are structural: they are reported before any solve is
//! attempted and must be fixed by the caller.

use tc_core::ConnId;

use crate::topology::PortKind;

pub type TopologyResult<T> = Result<T, TopologyError>;

/// Topology construction and validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopologyError {
    /// A connection refers to a component that doesn't exist.
    UnknownComponent { what: &'static str },

    /// A connection targets a port index beyond the component's arity.
    PortOutOfRange {
        comp: String,
        kind: PortKind,
        index: u8,
        arity: u8,
    },

    /// A port already carries a connection.
    PortOccupied {
        comp: String,
        kind: PortKind,
        index: u8,
        occupied_by: String,
    },

    /// A port was left unconnected at build time.
    DanglingPort {
        comp: String,
        kind: PortKind,
        index: u8,
    },

    /// Two components share a label.
    DuplicateComponentLabel { label: String },

    /// Two connections share a label.
    DuplicateConnectionLabel { label: String },

    /// Adjacency list is inconsistent with the connection table.
    InconsistentAdjacency { conn: ConnId },

    /// The topology has no connections.
    Empty,
}

impl std::fmt::Display for TopologyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TopologyError::UnknownComponent { what } => {
                write!(f, "Connection references unknown component ({what})")
            }
            TopologyError::PortOutOfRange {
                comp,
                kind,
                index,
                arity,
            } => {
                write!(
                    f,
                    "Component '{comp}' has no port {}{} (arity {arity})",
                    kind.prefix(),
                    index + 1
                )
            }
            TopologyError::PortOccupied {
                comp,
                kind,
                index,
                occupied_by,
            } => {
                write!(
                    f,
                    "Port {}{} of component '{comp}' is already connected by '{occupied_by}'",
                    kind.prefix(),
                    index + 1
                )
            }
            TopologyError::DanglingPort { comp, kind, index } => {
                write!(
                    f,
                    "Port {}{} of component '{comp}' is not connected",
                    kind.prefix(),
                    index + 1
                )
            }
            TopologyError::DuplicateComponentLabel { label } => {
                write!(f, "Duplicate component label '{label}'")
            }
            TopologyError::DuplicateConnectionLabel { label } => {
                write!(f, "Duplicate connection label '{label}'")
            }
            TopologyError::InconsistentAdjacency { conn } => {
                write!(f, "Adjacency list inconsistent for connection {conn}")
            }
            TopologyError::Empty => write!(f, "Topology has no connections"),
        }
    }
}

impl std::error::Error for TopologyError {}
