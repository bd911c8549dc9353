//! Live system state as seen by equation evaluation.
//!
//! The solver owns the iterate; equations read it through [`SystemView`],
//! which also carries the property backend and the canonical species
//! ordering. Nothing here mutates state.

use std::collections::HashMap;

use tc_core::units::pa;
use tc_core::{CompId, ConnId};
use tc_fluids::{Composition, FluidResult, PropertyProvider, Species};

use crate::param::ParamKey;

/// Flow state carried by one connection at the current iterate.
///
/// Values are raw SI scalars; compositions may be unnormalized between
/// iterations (closure is one of the equations).
#[derive(Debug, Clone)]
pub struct StreamState {
    /// Mass flow (kg/s).
    pub m: f64,
    /// Pressure (Pa).
    pub p: f64,
    /// Specific enthalpy (J/kg).
    pub h: f64,
    pub composition: Composition,
}

/// Read view of the full system at the current iterate.
pub struct SystemView<'a> {
    /// Stream states indexed by connection id.
    pub streams: &'a [StreamState],
    /// Current values of component parameters solved as unknowns.
    pub params: &'a HashMap<(CompId, ParamKey), f64>,
    /// Canonical species ordering behind fraction indices.
    pub species: &'a [Species],
    pub props: &'a dyn PropertyProvider,
}

impl SystemView<'_> {
    pub fn stream(&self, conn: ConnId) -> &StreamState {
        &self.streams[conn.index() as usize]
    }

    pub fn m(&self, conn: ConnId) -> f64 {
        self.stream(conn).m
    }

    pub fn p(&self, conn: ConnId) -> f64 {
        self.stream(conn).p
    }

    pub fn h(&self, conn: ConnId) -> f64 {
        self.stream(conn).h
    }

    /// Mass fraction of the species at canonical index `idx`.
    pub fn fraction(&self, conn: ConnId, idx: u8) -> f64 {
        let species = self.species[idx as usize];
        self.stream(conn).composition.mass_fraction(species)
    }

    pub fn param(&self, comp: CompId, key: ParamKey) -> Option<f64> {
        self.params.get(&(comp, key)).copied()
    }

    /// Temperature (K) at the connection's current state.
    pub fn temperature(&self, conn: ConnId) -> FluidResult<f64> {
        let s = self.stream(conn);
        Ok(self.props.t_ph(pa(s.p), s.h, &s.composition)?.value)
    }

    /// Specific volume (m^3/kg) at the connection's current state.
    pub fn spec_volume(&self, conn: ConnId) -> FluidResult<f64> {
        let s = self.stream(conn);
        let rho = self.props.rho_ph(pa(s.p), s.h, &s.composition)?.value;
        Ok(1.0 / rho)
    }
}

/// Fixed/free state of every mass fraction, per connection and canonical
/// species index.
#[derive(Debug, Clone)]
pub struct FractionSpecs {
    /// `fixed[conn][idx]` is `Some(value)` when the user pinned it.
    fixed: Vec<Vec<Option<f64>>>,
    n_species: usize,
}

impl FractionSpecs {
    pub fn new(fixed: Vec<Vec<Option<f64>>>, n_species: usize) -> Self {
        Self { fixed, n_species }
    }

    pub fn n_species(&self) -> usize {
        self.n_species
    }

    pub fn fixed(&self, conn: ConnId, idx: u8) -> Option<f64> {
        self.fixed
            .get(conn.index() as usize)
            .and_then(|row| row.get(idx as usize).copied().flatten())
    }

    pub fn is_free(&self, conn: ConnId, idx: u8) -> bool {
        self.fixed(conn, idx).is_none()
    }

    /// True when any fraction on this connection is free.
    pub fn any_free(&self, conn: ConnId) -> bool {
        (0..self.n_species).any(|idx| self.is_free(conn, idx as u8))
    }

    /// Canonical indices of the free fractions on this connection.
    pub fn free_indices(&self, conn: ConnId) -> impl Iterator<Item = u8> + '_ {
        (0..self.n_species as u8).filter(move |&idx| self.is_free(conn, idx))
    }
}

/// Design-solution values referenced while building offdesign equations.
#[derive(Debug, Clone, Default)]
pub struct DesignValues {
    conn_m: HashMap<ConnId, f64>,
    params: HashMap<(CompId, ParamKey), f64>,
}

impl DesignValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_m(&mut self, conn: ConnId, value: f64) {
        self.conn_m.insert(conn, value);
    }

    /// Design-point mass flow of a connection.
    pub fn m(&self, conn: ConnId) -> Option<f64> {
        self.conn_m.get(&conn).copied()
    }

    pub fn insert_param(&mut self, comp: CompId, key: ParamKey, value: f64) {
        self.params.insert((comp, key), value);
    }

    pub fn param(&self, comp: CompId, key: ParamKey) -> Option<f64> {
        self.params.get(&(comp, key)).copied()
    }
}
