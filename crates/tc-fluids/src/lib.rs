//! tc-fluids: fluid property access for thermocycle.
//!
//! Provides:
//! - Chemical species definitions (H2O, N2, NH3, R134a, etc.)
//! - Composition handling (pure fluids and mass-fraction mixtures)
//! - PropertyProvider trait for thermodynamic property queries
//! - Analytic backends: calorically perfect gas and incompressible liquid
//!
//! # Architecture
//!
//! This crate defines a stable API (`PropertyProvider` trait) that isolates the
//! solver from property-backend dependencies. Component equations only ever ask
//! for `T(p, h)`, `h(p, T)`, `s(p, h)`, `h(p, s)` and `rho(p, h)` at a given
//! composition, so a real-fluid backend (CoolProp-class) can be slotted in
//! without touching the solver. The bundled backends are closed-form models
//! good enough to exercise every equation path:
//! - `PerfectGas`: ideal gas EOS with constant per-species heat capacities,
//!   mass-fraction mixing rules
//! - `IncompressibleLiquid`: constant density/heat-capacity liquid
//! - `PropertyLibrary`: routes each composition to a registered backend
//!
//! # Example
//!
//! ```
//! use tc_fluids::{Composition, PerfectGas, PropertyProvider, Species};
//! use tc_core::units::{k, pa};
//!
//! let gas = PerfectGas::new();
//! let air = Composition::pure(Species::Air);
//! let h = gas.h_pt(pa(101_325.0), k(320.0), &air).unwrap();
//! let t = gas.t_ph(pa(101_325.0), h, &air).unwrap();
//! assert!((t.value - 320.0).abs() < 1e-9);
//! ```

pub mod composition;
pub mod error;
pub mod incompressible;
pub mod library;
pub mod perfect_gas;
pub mod provider;
pub mod species;

// Re-exports for ergonomics
pub use composition::Composition;
pub use error::{FluidError, FluidResult};
pub use incompressible::IncompressibleLiquid;
pub use library::PropertyLibrary;
pub use perfect_gas::PerfectGas;
pub use provider::{PropertyProvider, SpecEnthalpy, SpecEntropy, isentropic_enthalpy};
pub use species::Species;
