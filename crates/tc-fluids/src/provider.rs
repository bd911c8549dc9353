//! Property provider trait and validation helpers.

use crate::composition::Composition;
use crate::error::{FluidError, FluidResult};
use tc_core::units::{Density, Pressure, Temperature};

/// Specific enthalpy [J/kg].
///
/// Kept as a plain f64: enthalpy differences drive every energy balance and
/// the reference-state offset is backend-defined, so a dimensioned wrapper
/// buys little here.
pub type SpecEnthalpy = f64;

/// Specific entropy [J/(kg·K)].
pub type SpecEntropy = f64;

/// Trait for thermodynamic property backends.
///
/// The solver asks only for the inversions component equations need; every
/// call is a pure function of (pressure, enthalpy-or-temperature,
/// composition). Implementations must be thread-safe (`Send + Sync`) so
/// independent networks can be solved on separate threads against one shared
/// backend.
pub trait PropertyProvider: Send + Sync {
    /// Get the backend name (for debugging/logging).
    fn name(&self) -> &str;

    /// Check if this backend covers the given composition.
    fn supports_composition(&self, comp: &Composition) -> bool;

    /// Temperature from pressure and specific enthalpy.
    fn t_ph(&self, p: Pressure, h: SpecEnthalpy, comp: &Composition) -> FluidResult<Temperature>;

    /// Specific enthalpy from pressure and temperature.
    fn h_pt(&self, p: Pressure, t: Temperature, comp: &Composition) -> FluidResult<SpecEnthalpy>;

    /// Specific entropy from pressure and specific enthalpy.
    fn s_ph(&self, p: Pressure, h: SpecEnthalpy, comp: &Composition) -> FluidResult<SpecEntropy>;

    /// Specific enthalpy from pressure and specific entropy.
    ///
    /// This is the isentropic-target query behind efficiency equations.
    fn h_ps(&self, p: Pressure, s: SpecEntropy, comp: &Composition) -> FluidResult<SpecEnthalpy>;

    /// Density from pressure and specific enthalpy.
    fn rho_ph(&self, p: Pressure, h: SpecEnthalpy, comp: &Composition) -> FluidResult<Density>;

    /// Saturation temperature at the given pressure.
    ///
    /// Single-phase backends do not implement this.
    fn t_sat(&self, _p: Pressure, _comp: &Composition) -> FluidResult<Temperature> {
        Err(FluidError::NotSupported {
            what: "saturation temperature",
        })
    }
}

/// Enthalpy after an isentropic change of state to `p_out`.
///
/// Chains `s(p_in, h_in)` with `h(p_out, s)`; used by turbomachine
/// efficiency equations.
pub fn isentropic_enthalpy(
    provider: &dyn PropertyProvider,
    p_in: Pressure,
    h_in: SpecEnthalpy,
    p_out: Pressure,
    comp: &Composition,
) -> FluidResult<SpecEnthalpy> {
    let s_in = provider.s_ph(p_in, h_in, comp)?;
    provider.h_ps(p_out, s_in, comp)
}

/// Validation helpers shared by the analytic backends.
pub(crate) mod validation {
    use super::*;

    /// Ensure pressure is positive and finite.
    pub fn validate_pressure(p: Pressure) -> FluidResult<()> {
        if !p.value.is_finite() || p.value <= 0.0 {
            return Err(FluidError::NonPhysical {
                what: "pressure must be positive and finite",
            });
        }
        Ok(())
    }

    /// Ensure temperature is positive and finite.
    pub fn validate_temperature(t: Temperature) -> FluidResult<()> {
        if !t.value.is_finite() || t.value <= 0.0 {
            return Err(FluidError::NonPhysical {
                what: "temperature must be positive and finite",
            });
        }
        Ok(())
    }

    /// Ensure enthalpy is finite (can be negative).
    pub fn validate_enthalpy(h: SpecEnthalpy) -> FluidResult<()> {
        if !h.is_finite() {
            return Err(FluidError::NonPhysical {
                what: "enthalpy must be finite",
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::validation::*;
    use tc_core::units::{k, pa};

    #[test]
    fn validate_positive_pressure() {
        assert!(validate_pressure(pa(101_325.0)).is_ok());
        assert!(validate_pressure(pa(-100.0)).is_err());
        assert!(validate_pressure(pa(0.0)).is_err());
        assert!(validate_pressure(pa(f64::NAN)).is_err());
    }

    #[test]
    fn validate_positive_temperature() {
        assert!(validate_temperature(k(300.0)).is_ok());
        assert!(validate_temperature(k(-10.0)).is_err());
        assert!(validate_temperature(k(0.0)).is_err());
    }

    #[test]
    fn validate_enthalpy_allows_negative() {
        assert!(validate_enthalpy(-5.0e4).is_ok());
        assert!(validate_enthalpy(f64::INFINITY).is_err());
    }
}
