//! Fluid composition (pure or mixtures).

use crate::error::{FluidError, FluidResult};
use crate::species::Species;
use tc_core::numeric::{Tolerances, nearly_equal};

/// Fluid composition defined by normalized mass fractions.
///
/// The composition is always normalized (mass fractions sum to 1.0).
/// Network state variables carry compositions on a mass basis, so this is
/// the currency the solver and the property backends exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct Composition {
    /// Species and their mass fractions (always normalized to sum=1).
    items: Vec<(Species, f64)>,
}

impl Composition {
    /// Create a pure-species composition.
    pub fn pure(species: Species) -> Self {
        Self {
            items: vec![(species, 1.0)],
        }
    }

    /// Create a composition from mass fractions.
    ///
    /// Validates that all fractions are finite, non-negative, and have a
    /// positive sum, then normalizes to sum=1.
    pub fn new_mass_fractions(fractions: Vec<(Species, f64)>) -> FluidResult<Self> {
        if fractions.is_empty() {
            return Err(FluidError::InvalidArg {
                what: "empty composition",
            });
        }

        // Validate and compute sum
        let mut sum = 0.0;
        for (_, frac) in &fractions {
            if !frac.is_finite() {
                return Err(FluidError::NonPhysical {
                    what: "non-finite mass fraction",
                });
            }
            if *frac < 0.0 {
                return Err(FluidError::NonPhysical {
                    what: "negative mass fraction",
                });
            }
            sum += frac;
        }

        if sum <= 0.0 || !sum.is_finite() {
            return Err(FluidError::NonPhysical {
                what: "mass fractions sum to zero or non-finite",
            });
        }

        // Normalize
        let normalized: Vec<(Species, f64)> = fractions
            .into_iter()
            .map(|(s, f)| (s, f / sum))
            .filter(|(_, f)| *f > 1e-12) // Drop negligible species
            .collect();

        if normalized.is_empty() {
            return Err(FluidError::NonPhysical {
                what: "all mass fractions negligible",
            });
        }

        Ok(Self { items: normalized })
    }

    /// Create a composition from raw mass fractions without normalizing.
    ///
    /// Iterative solvers update fractions one at a time, so intermediate
    /// states may not sum to 1; closure is enforced by a separate equation.
    /// Only finiteness is validated here.
    pub fn from_pairs(fractions: Vec<(Species, f64)>) -> FluidResult<Self> {
        if fractions.is_empty() {
            return Err(FluidError::InvalidArg {
                what: "empty composition",
            });
        }
        for (_, frac) in &fractions {
            if !frac.is_finite() {
                return Err(FluidError::NonPhysical {
                    what: "non-finite mass fraction",
                });
            }
        }
        Ok(Self { items: fractions })
    }

    /// Set the mass fraction of a species, adding it if absent.
    ///
    /// Does not renormalize; pairs with [`Composition::from_pairs`].
    pub fn set_mass_fraction(&mut self, species: Species, value: f64) {
        match self.items.iter_mut().find(|(s, _)| *s == species) {
            Some((_, f)) => *f = value,
            None => self.items.push((species, value)),
        }
    }

    /// Get mass fraction of a species (0.0 if not present).
    pub fn mass_fraction(&self, species: Species) -> f64 {
        self.items
            .iter()
            .find(|(s, _)| *s == species)
            .map(|(_, f)| *f)
            .unwrap_or(0.0)
    }

    /// Check if this is a pure-species composition.
    ///
    /// Returns `Some(species)` if exactly one species has fraction ≈1.0.
    pub fn is_pure(&self) -> Option<Species> {
        if self.items.len() == 1 {
            let (species, frac) = self.items[0];
            let tol = Tolerances {
                abs: 1e-10,
                rel: 1e-10,
            };
            if nearly_equal(frac, 1.0, tol) {
                return Some(species);
            }
        }
        None
    }

    /// Iterate over all species with non-negligible mass fractions.
    pub fn iter(&self) -> impl Iterator<Item = (Species, f64)> + '_ {
        self.items.iter().copied()
    }

    /// Number of species present.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Compute mixture molar mass [kg/kmol] from species mass fractions.
    ///
    /// On a mass basis: 1 / M_mix = Σ (w_i / M_i).
    pub fn molar_mass(&self) -> f64 {
        let inv: f64 = self
            .items
            .iter()
            .map(|(species, w)| w / species.molar_mass())
            .sum();
        1.0 / inv
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn normalized_sum_is_one(fracs in prop::collection::vec(0.0_f64..1.0_f64, 1..5)) {
            let species = [Species::O2, Species::N2, Species::H2, Species::He, Species::Ar];
            let composition_input: Vec<(Species, f64)> = fracs
                .iter()
                .enumerate()
                .map(|(i, &f)| (species[i % species.len()], f))
                .collect();

            if let Ok(comp) = Composition::new_mass_fractions(composition_input) {
                let sum: f64 = comp.iter().map(|(_, f)| f).sum();
                let tol = Tolerances { abs: 1e-9, rel: 1e-9 };
                prop_assert!(nearly_equal(sum, 1.0, tol));
            }
        }
    }
}
