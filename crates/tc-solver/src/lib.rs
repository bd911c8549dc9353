//! Steady-state solver for process networks.
//!
//! This crate ties the other layers together: a [`tc_net`] topology, the
//! [`tc_components`] equation library and a [`tc_fluids`] property
//! backend become one square nonlinear system over mass flows, pressures,
//! enthalpies, mass fractions and requested component parameters, solved
//! with a damped Newton iteration.
//!
//! A design solve sizes the plant and captures a design record; an
//! offdesign solve re-solves the sized plant with released constraints
//! anchored on that record, including part-load characteristic curves.

mod assemble;
mod initialization;
mod registry;
mod solve;

pub mod bus;
pub mod error;
pub mod network;
pub mod newton;
pub mod report;

pub use bus::{Bus, BusMember, MemberEff};
pub use error::{SolveError, SolveResult};
pub use network::{CompositionSpec, ConnSpec, ConnValue, ConnVar, Network, NetworkBuilder};
pub use newton::SolverConfig;
pub use report::{
    BusMemberResult, BusResult, CompResult, ConnState, ExtrapolationWarning, Solution, SolveReport,
};

// How a bus member's efficiency is oriented comes from the component
// layer, as does the design/offdesign mode tag on reports.
pub use tc_components::{BusBase, Mode};
