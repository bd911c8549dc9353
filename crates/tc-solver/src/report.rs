//! Converged results in user-facing form.

use tc_components::{Mode, ParamKey};
use tc_fluids::Composition;

/// How a solve went: iteration count, final norm and any characteristic
/// extrapolations encountered at the solution.
#[derive(Debug, Clone)]
pub struct SolveReport {
    pub mode: Mode,
    pub iterations: usize,
    pub residual_norm: f64,
    pub unknowns: usize,
    pub warnings: Vec<ExtrapolationWarning>,
}

/// A characteristic curve was evaluated outside its tabulated domain at
/// the converged solution. The result stands, but the curve's flat
/// extension may hide real behavior there.
#[derive(Debug, Clone)]
pub struct ExtrapolationWarning {
    pub equation: String,
    /// Normalized abscissa at the solution.
    pub x: f64,
    pub domain: (f64, f64),
}

/// Full converged state of a network.
#[derive(Debug, Clone)]
pub struct Solution {
    pub mode: Mode,
    pub conns: Vec<ConnState>,
    pub comps: Vec<CompResult>,
    pub busses: Vec<BusResult>,
}

impl Solution {
    pub fn conn(&self, label: &str) -> Option<&ConnState> {
        self.conns.iter().find(|c| c.label == label)
    }

    pub fn comp(&self, label: &str) -> Option<&CompResult> {
        self.comps.iter().find(|c| c.label == label)
    }

    pub fn bus(&self, label: &str) -> Option<&BusResult> {
        self.busses.iter().find(|b| b.label == label)
    }
}

/// Converged state of one connection, SI units throughout.
#[derive(Debug, Clone)]
pub struct ConnState {
    pub label: String,
    /// Mass flow (kg/s).
    pub m: f64,
    /// Pressure (Pa).
    pub p: f64,
    /// Specific enthalpy (J/kg).
    pub h: f64,
    /// Temperature (K).
    pub t: f64,
    /// Volumetric flow (m³/s).
    pub v: f64,
    pub composition: Composition,
}

/// Parameter values of one component at the solution, both specified and
/// derived ones.
#[derive(Debug, Clone)]
pub struct CompResult {
    pub label: String,
    pub kind: &'static str,
    pub params: Vec<(ParamKey, f64)>,
}

impl CompResult {
    pub fn param(&self, key: ParamKey) -> Option<f64> {
        self.params
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| *v)
    }
}

#[derive(Debug, Clone)]
pub struct BusResult {
    pub label: String,
    pub members: Vec<BusMemberResult>,
    /// Sum of member contributions (W).
    pub total: f64,
}

impl BusResult {
    pub fn member(&self, comp: &str) -> Option<&BusMemberResult> {
        self.members.iter().find(|m| m.comp == comp)
    }
}

#[derive(Debug, Clone)]
pub struct BusMemberResult {
    pub comp: String,
    /// Component-side power `m * dh` (W).
    pub power: f64,
    /// Share on the bus after the conversion efficiency (W).
    pub contribution: f64,
}
