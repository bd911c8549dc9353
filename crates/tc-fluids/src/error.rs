//! Fluid property errors.

use thiserror::Error;

/// Result type for fluid operations.
pub type FluidResult<T> = Result<T, FluidError>;

/// Errors that can occur during fluid property evaluation.
///
/// The solver treats these as localized failures: a property error during a
/// residual evaluation surfaces as a non-finite residual and triggers step
/// backtracking rather than aborting the solve outright.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FluidError {
    /// Non-physical values (negative pressure, temperature, etc.).
    #[error("Non-physical value for {what}")]
    NonPhysical { what: &'static str },

    /// Value out of the backend's valid range.
    #[error("Value out of range for {what}")]
    OutOfRange { what: &'static str },

    /// Invalid argument.
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    /// Operation not supported (e.g., saturation queries on single-phase
    /// backends, compositions outside a backend's coverage).
    #[error("Not supported: {what}")]
    NotSupported { what: &'static str },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = FluidError::NonPhysical { what: "pressure" };
        assert!(err.to_string().contains("pressure"));

        let err = FluidError::NotSupported {
            what: "saturation temperature",
        };
        assert!(err.to_string().contains("saturation"));
    }
}
