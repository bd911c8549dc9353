//! tc-net: topology layer for thermocycle.
//!
//! Provides:
//! - Core topology data structures (ComponentNode, Connection, PortRef)
//! - Incremental builder with wiring validation
//! - Port-ordered adjacency queries for equation assembly
//!
//! The topology is physics-agnostic: components carry only a label and port
//! arities here. Component kinds, parameters and equations live upstream.
//!
//! # Example
//!
//! ```
//! use tc_net::TopologyBuilder;
//!
//! let mut builder = TopologyBuilder::new();
//! let source = builder.add_component("source", 0, 1);
//! let valve = builder.add_component("valve", 1, 1);
//! let sink = builder.add_component("sink", 1, 0);
//! builder.connect(source, 0, valve, 0, "1").unwrap();
//! builder.connect(valve, 0, sink, 0, "2").unwrap();
//! let topo = builder.build().unwrap();
//!
//! assert_eq!(topo.components().len(), 3);
//! assert_eq!(topo.connections().len(), 2);
//! ```

pub mod builder;
pub mod error;
pub mod topology;
pub(crate) mod validate;

// Re-exports for ergonomics
pub use builder::TopologyBuilder;
pub use error::{TopologyError, TopologyResult};
pub use topology::{ComponentNode, Connection, PortKind, PortRef, Topology};
