//! tc-components: component equation library for process networks.
//!
//! Each component model turns its parameter set into residual equations
//! over the attached connections:
//! - Turbomachines (pump, compressor, turbine) with isentropic efficiency
//!   and part-load characteristics
//! - Valves and pipes with pressure-loss models
//! - Heat exchangers (single- and two-stream) with kA, terminal temperature
//!   differences and part-load derating
//! - Topology nodes (merge, splitter, separator, cycle closer)
//!
//! Components never solve anything themselves; the solver crate assembles
//! their [`Equation`]s into one system. Parameters carry a [`Role`] so a
//! model can swap its equation set between design and offdesign mode.
//!
//! # Example
//!
//! ```
//! use tc_components::{chars, CharParam, ComponentModel, Compressor, Param};
//!
//! let mut cp = Compressor::new();
//! cp.pr = Param::fixed(3.0);
//! cp.eta_s = Param::fixed_design(0.85);
//! cp.eta_s_char = CharParam::offdesign(chars::generic_eta_s_char());
//!
//! let model = ComponentModel::Compressor(cp);
//! assert_eq!((model.num_in(), model.num_out()), (1, 1));
//! ```

pub mod chars;
pub mod compressor;
pub mod equation;
pub mod error;
pub mod heat_exchanger;
pub mod merge;
pub mod model;
pub mod param;
pub mod pump;
pub mod separator;
pub mod simple_heat_exchanger;
pub mod source;
pub mod splitter;
pub mod state;
pub mod turbine;
pub mod valve;

// Re-exports
pub use compressor::Compressor;
pub use equation::{BusBase, BusEff, BusTerm, Equation, EquationKind, TurboKind, VarRef};
pub use error::{ComponentError, ComponentResult};
pub use heat_exchanger::HeatExchanger;
pub use merge::Merge;
pub use model::{ComponentModel, EquationContext};
pub use param::{CharParam, Mode, Param, ParamKey, Role, Spec, SpecValue};
pub use pump::Pump;
pub use separator::Separator;
pub use simple_heat_exchanger::SimpleHeatExchanger;
pub use source::{CycleCloser, Sink, Source};
pub use splitter::Splitter;
pub use state::{DesignValues, FractionSpecs, StreamState, SystemView};
pub use turbine::Turbine;
pub use valve::Valve;
