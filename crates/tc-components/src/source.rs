//! Boundary components and the cycle closer.

use crate::equation::{Equation, EquationKind, VarRef};
use crate::error::ComponentResult;
use crate::model::EquationContext;

/// Boundary source: one outlet, no equations of its own. State enters the
/// system through specifications on the attached connection.
#[derive(Debug, Clone, Copy, Default)]
pub struct Source;

/// Boundary sink: one inlet, no equations.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sink;

/// Loop breaker for closed cycles.
///
/// Enforces pressure and enthalpy continuity between its inlet and outlet
/// but deliberately propagates neither mass flow nor composition; the rest
/// of the loop already carries those, and repeating them here would make
/// the system singular.
#[derive(Debug, Clone, Copy, Default)]
pub struct CycleCloser;

impl CycleCloser {
    pub(crate) fn equations(&self, ctx: &EquationContext<'_>) -> ComponentResult<Vec<Equation>> {
        let (inlet, outlet) = (ctx.in1(), ctx.out1());
        Ok(vec![
            ctx.eq(
                EquationKind::Ref {
                    a: VarRef::Pressure(outlet),
                    b: VarRef::Pressure(inlet),
                    factor: 1.0,
                    offset: 0.0,
                },
                "pressure continuity",
            ),
            ctx.eq(
                EquationKind::Ref {
                    a: VarRef::Enthalpy(outlet),
                    b: VarRef::Enthalpy(inlet),
                    factor: 1.0,
                    offset: 0.0,
                },
                "enthalpy continuity",
            ),
        ])
    }
}
