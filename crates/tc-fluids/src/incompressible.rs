//! Incompressible liquid backend.
//!
//! Constant density and heat capacity:
//!
//! - `h = cp·(T − T_ref) + (p − p_ref)/rho`
//! - `s = cp·ln(T/T_ref)`
//!
//! The pressure term in `h` makes isentropic pumping come out right:
//! constant entropy means constant temperature, so the enthalpy rise across
//! an ideal pump is exactly `Δp/rho`.

use crate::composition::Composition;
use crate::error::{FluidError, FluidResult};
use crate::provider::validation::{validate_enthalpy, validate_pressure, validate_temperature};
use crate::provider::{PropertyProvider, SpecEnthalpy, SpecEntropy};
use tc_core::units::{Density, Pressure, Temperature, k, kgpm3};

use crate::species::Species;

#[derive(Debug, Clone, Copy)]
pub struct IncompressibleLiquid {
    species: Species,
    rho_kgpm3: f64,
    cp_jpkgk: f64,
    t_ref_k: f64,
    p_ref_pa: f64,
}

impl IncompressibleLiquid {
    /// Liquid model for one species with the given constant properties.
    pub fn new(species: Species, rho: Density, cp_jpkgk: f64) -> FluidResult<Self> {
        if !rho.value.is_finite() || rho.value <= 0.0 {
            return Err(FluidError::NonPhysical {
                what: "liquid density must be positive and finite",
            });
        }
        if !cp_jpkgk.is_finite() || cp_jpkgk <= 0.0 {
            return Err(FluidError::NonPhysical {
                what: "liquid cp must be positive and finite",
            });
        }
        Ok(Self {
            species,
            rho_kgpm3: rho.value,
            cp_jpkgk,
            t_ref_k: 298.15,
            p_ref_pa: 1.0e5,
        })
    }

    /// Liquid water near ambient conditions.
    pub fn water() -> Self {
        Self {
            species: Species::Water,
            rho_kgpm3: 998.2,
            cp_jpkgk: 4182.0,
            t_ref_k: 298.15,
            p_ref_pa: 1.0e5,
        }
    }

    pub fn species(&self) -> Species {
        self.species
    }

    fn temperature_from_ph(&self, p: Pressure, h: SpecEnthalpy) -> FluidResult<f64> {
        let sensible = h - (p.value - self.p_ref_pa) / self.rho_kgpm3;
        let t = self.t_ref_k + sensible / self.cp_jpkgk;
        if !t.is_finite() || t <= 0.0 {
            return Err(FluidError::OutOfRange {
                what: "temperature implied by enthalpy",
            });
        }
        Ok(t)
    }
}

impl PropertyProvider for IncompressibleLiquid {
    fn name(&self) -> &str {
        "incompressible-liquid"
    }

    fn supports_composition(&self, comp: &Composition) -> bool {
        comp.is_pure() == Some(self.species)
    }

    fn t_ph(&self, p: Pressure, h: SpecEnthalpy, _comp: &Composition) -> FluidResult<Temperature> {
        validate_pressure(p)?;
        validate_enthalpy(h)?;
        Ok(k(self.temperature_from_ph(p, h)?))
    }

    fn h_pt(&self, p: Pressure, t: Temperature, _comp: &Composition) -> FluidResult<SpecEnthalpy> {
        validate_pressure(p)?;
        validate_temperature(t)?;
        Ok(self.cp_jpkgk * (t.value - self.t_ref_k) + (p.value - self.p_ref_pa) / self.rho_kgpm3)
    }

    fn s_ph(&self, p: Pressure, h: SpecEnthalpy, _comp: &Composition) -> FluidResult<SpecEntropy> {
        validate_pressure(p)?;
        validate_enthalpy(h)?;
        let t = self.temperature_from_ph(p, h)?;
        Ok(self.cp_jpkgk * (t / self.t_ref_k).ln())
    }

    fn h_ps(&self, p: Pressure, s: SpecEntropy, _comp: &Composition) -> FluidResult<SpecEnthalpy> {
        validate_pressure(p)?;
        if !s.is_finite() {
            return Err(FluidError::NonPhysical {
                what: "entropy must be finite",
            });
        }
        let t = self.t_ref_k * (s / self.cp_jpkgk).exp();
        Ok(self.cp_jpkgk * (t - self.t_ref_k) + (p.value - self.p_ref_pa) / self.rho_kgpm3)
    }

    fn rho_ph(&self, p: Pressure, h: SpecEnthalpy, _comp: &Composition) -> FluidResult<Density> {
        validate_pressure(p)?;
        validate_enthalpy(h)?;
        Ok(kgpm3(self.rho_kgpm3))
    }
}
