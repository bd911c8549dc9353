//! Error types for component configuration and equation evaluation.

use tc_fluids::FluidError;
use thiserror::Error;

/// Errors raised while validating a component or building its equations.
#[derive(Error, Debug, Clone)]
pub enum ComponentError {
    /// The parameter set cannot form a consistent equation group.
    #[error("invalid configuration: {what}")]
    Configuration { what: String },

    /// An offdesign equation needs a value the design snapshot lacks.
    #[error("missing design value: {what}")]
    MissingDesign { what: String },

    /// Property backend failure during residual evaluation.
    #[error("property evaluation failed: {0}")]
    Property(#[from] FluidError),

    #[error("non-physical value: {what}")]
    NonPhysical { what: &'static str },
}

pub type ComponentResult<T> = Result<T, ComponentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ComponentError::Configuration {
            what: "'hx1' enables ka_char on one stream only".into(),
        };
        assert!(err.to_string().contains("hx1"));

        let err = ComponentError::MissingDesign {
            what: "'hx1' has no design value for 'ka'".into(),
        };
        assert!(err.to_string().contains("design"));
    }
}
