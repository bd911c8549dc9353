//! Calorically perfect gas backend.
//!
//! Ideal gas equation of state with constant per-species heat capacities and
//! mass-fraction mixing rules:
//!
//! - `h = cp·(T − T_ref)`
//! - `s = cp·ln(T/T_ref) − R·ln(p/p_ref)`
//! - `rho = p / (R·T)`
//!
//! with `cp = Σ w_i·cp_i` and `R = Σ w_i·R_i`. Every inversion the solver
//! asks for is closed-form, which keeps residual evaluations cheap and exact.
//! Enthalpy and entropy are reported relative to (`T_ref`, `p_ref`).

use crate::composition::Composition;
use crate::error::{FluidError, FluidResult};
use crate::provider::validation::{validate_enthalpy, validate_pressure, validate_temperature};
use crate::provider::{PropertyProvider, SpecEnthalpy, SpecEntropy};
use tc_core::units::{Density, Pressure, Temperature, k, kgpm3};

#[derive(Debug, Clone, Copy)]
pub struct PerfectGas {
    t_ref_k: f64,
    p_ref_pa: f64,
}

impl Default for PerfectGas {
    fn default() -> Self {
        Self::new()
    }
}

impl PerfectGas {
    /// Backend with the standard reference state 298.15 K, 1e5 Pa.
    pub fn new() -> Self {
        Self {
            t_ref_k: 298.15,
            p_ref_pa: 1.0e5,
        }
    }

    pub fn with_reference(t_ref: Temperature, p_ref: Pressure) -> Self {
        Self {
            t_ref_k: t_ref.value,
            p_ref_pa: p_ref.value,
        }
    }

    /// Mass-weighted mixture heat capacity [J/(kg·K)].
    fn mixture_cp(comp: &Composition) -> f64 {
        comp.iter().map(|(s, w)| w * s.cp_gas()).sum()
    }

    /// Mass-weighted mixture gas constant [J/(kg·K)].
    fn mixture_r(comp: &Composition) -> f64 {
        comp.iter().map(|(s, w)| w * s.gas_constant()).sum()
    }

    fn temperature_from_h(&self, h: SpecEnthalpy, comp: &Composition) -> FluidResult<f64> {
        let t = self.t_ref_k + h / Self::mixture_cp(comp);
        if !t.is_finite() || t <= 0.0 {
            return Err(FluidError::OutOfRange {
                what: "temperature implied by enthalpy",
            });
        }
        Ok(t)
    }
}

impl PropertyProvider for PerfectGas {
    fn name(&self) -> &str {
        "perfect-gas"
    }

    fn supports_composition(&self, comp: &Composition) -> bool {
        !comp.is_empty()
    }

    fn t_ph(&self, p: Pressure, h: SpecEnthalpy, comp: &Composition) -> FluidResult<Temperature> {
        validate_pressure(p)?;
        validate_enthalpy(h)?;
        Ok(k(self.temperature_from_h(h, comp)?))
    }

    fn h_pt(&self, p: Pressure, t: Temperature, comp: &Composition) -> FluidResult<SpecEnthalpy> {
        validate_pressure(p)?;
        validate_temperature(t)?;
        Ok(Self::mixture_cp(comp) * (t.value - self.t_ref_k))
    }

    fn s_ph(&self, p: Pressure, h: SpecEnthalpy, comp: &Composition) -> FluidResult<SpecEntropy> {
        validate_pressure(p)?;
        validate_enthalpy(h)?;
        let t = self.temperature_from_h(h, comp)?;
        let cp = Self::mixture_cp(comp);
        let r = Self::mixture_r(comp);
        Ok(cp * (t / self.t_ref_k).ln() - r * (p.value / self.p_ref_pa).ln())
    }

    fn h_ps(&self, p: Pressure, s: SpecEntropy, comp: &Composition) -> FluidResult<SpecEnthalpy> {
        validate_pressure(p)?;
        if !s.is_finite() {
            return Err(FluidError::NonPhysical {
                what: "entropy must be finite",
            });
        }
        let cp = Self::mixture_cp(comp);
        let r = Self::mixture_r(comp);
        let t = self.t_ref_k * ((s + r * (p.value / self.p_ref_pa).ln()) / cp).exp();
        Ok(cp * (t - self.t_ref_k))
    }

    fn rho_ph(&self, p: Pressure, h: SpecEnthalpy, comp: &Composition) -> FluidResult<Density> {
        validate_pressure(p)?;
        validate_enthalpy(h)?;
        let t = self.temperature_from_h(h, comp)?;
        Ok(kgpm3(p.value / (Self::mixture_r(comp) * t)))
    }
}
