//! Composition-routing property library.
//!
//! Networks often carry several working fluids at once (a refrigerant loop
//! plus water-side loops, say). `PropertyLibrary` holds one backend per
//! liquid species plus a gas fallback and routes each query by composition,
//! so a single provider handle serves the whole network.

use crate::composition::Composition;
use crate::error::{FluidError, FluidResult};
use crate::incompressible::IncompressibleLiquid;
use crate::perfect_gas::PerfectGas;
use crate::provider::{PropertyProvider, SpecEnthalpy, SpecEntropy};
use tc_core::units::{Density, Pressure, Temperature};

#[derive(Debug, Clone, Default)]
pub struct PropertyLibrary {
    liquids: Vec<IncompressibleLiquid>,
    gas: PerfectGas,
}

impl PropertyLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a liquid backend; pure compositions of its species route to
    /// it instead of the gas model.
    pub fn with_liquid(mut self, liquid: IncompressibleLiquid) -> Self {
        self.liquids.push(liquid);
        self
    }

    pub fn with_water(self) -> Self {
        self.with_liquid(IncompressibleLiquid::water())
    }

    fn route(&self, comp: &Composition) -> FluidResult<&dyn PropertyProvider> {
        if comp.is_empty() {
            return Err(FluidError::InvalidArg {
                what: "empty composition",
            });
        }
        for liquid in &self.liquids {
            if liquid.supports_composition(comp) {
                return Ok(liquid);
            }
        }
        Ok(&self.gas)
    }
}

impl PropertyProvider for PropertyLibrary {
    fn name(&self) -> &str {
        "property-library"
    }

    fn supports_composition(&self, comp: &Composition) -> bool {
        !comp.is_empty()
    }

    fn t_ph(&self, p: Pressure, h: SpecEnthalpy, comp: &Composition) -> FluidResult<Temperature> {
        self.route(comp)?.t_ph(p, h, comp)
    }

    fn h_pt(&self, p: Pressure, t: Temperature, comp: &Composition) -> FluidResult<SpecEnthalpy> {
        self.route(comp)?.h_pt(p, t, comp)
    }

    fn s_ph(&self, p: Pressure, h: SpecEnthalpy, comp: &Composition) -> FluidResult<SpecEntropy> {
        self.route(comp)?.s_ph(p, h, comp)
    }

    fn h_ps(&self, p: Pressure, s: SpecEntropy, comp: &Composition) -> FluidResult<SpecEnthalpy> {
        self.route(comp)?.h_ps(p, s, comp)
    }

    fn rho_ph(&self, p: Pressure, h: SpecEnthalpy, comp: &Composition) -> FluidResult<Density> {
        self.route(comp)?.rho_ph(p, h, comp)
    }

    fn t_sat(&self, p: Pressure, comp: &Composition) -> FluidResult<Temperature> {
        self.route(comp)?.t_sat(p, comp)
    }
}
