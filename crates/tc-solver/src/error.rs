//! Error types for network solving.

use tc_components::ComponentError;
use tc_fluids::FluidError;
use tc_net::TopologyError;
use thiserror::Error;

/// Errors raised while building or solving a network.
#[derive(Error, Debug)]
pub enum SolveError {
    #[error("topology error: {0}")]
    Topology(#[from] TopologyError),

    #[error("invalid configuration: {what}")]
    Configuration { what: String },

    #[error("{unknowns} unknowns vs {equations} equations; {hint}")]
    DegreesOfFreedom {
        unknowns: usize,
        equations: usize,
        hint: String,
    },

    #[error("invalid starting point: {what}")]
    InitialPoint { what: String },

    #[error("singular system: {what}")]
    Singular { what: String },

    #[error(
        "no convergence after {iterations} iterations \
         (residual norm {residual_norm:.3e}); worst residuals: {worst}"
    )]
    Convergence {
        iterations: usize,
        residual_norm: f64,
        worst: String,
    },

    #[error("design record mismatch: {what}")]
    DesignMismatch { what: String },

    #[error("fluid error: {0}")]
    Fluid(#[from] FluidError),

    #[error("design store error: {0}")]
    Store(#[from] tc_design::DesignError),
}

pub type SolveResult<T> = Result<T, SolveError>;

impl From<ComponentError> for SolveError {
    fn from(e: ComponentError) -> Self {
        match e {
            ComponentError::Configuration { what } => SolveError::Configuration { what },
            ComponentError::MissingDesign { what } => SolveError::DesignMismatch { what },
            ComponentError::Property(e) => SolveError::Fluid(e),
            ComponentError::NonPhysical { what } => SolveError::Configuration {
                what: what.to_string(),
            },
        }
    }
}
