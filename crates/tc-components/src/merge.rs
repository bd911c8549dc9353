//! Adiabatic mixing of several streams.
//!
//! ## Model
//!
//! ```text
//! sum(m_in) = m_out                       (mass)
//! p = p_in1 on every other port           (pressure equality)
//! sum(m_in * x_in) = m_out * x_out        (per species, closing one skipped)
//! sum(m_in * h_in) = m_out * h_out        (adiabatic mixing)
//! ```

use crate::equation::{Equation, EquationKind, VarRef};
use crate::error::{ComponentError, ComponentResult};
use crate::model::{EquationContext, push_mass_balance, push_species_balances};

/// Mixing node with 2 to 4 inlets and one outlet.
#[derive(Debug, Clone, Copy)]
pub struct Merge {
    num_in: u8,
}

impl Merge {
    pub fn new(num_in: u8) -> ComponentResult<Self> {
        if !(2..=4).contains(&num_in) {
            return Err(ComponentError::Configuration {
                what: format!("merge supports 2 to 4 inlets, got {num_in}"),
            });
        }
        Ok(Self { num_in })
    }

    pub fn num_in(&self) -> u8 {
        self.num_in
    }

    pub(crate) fn equations(&self, ctx: &EquationContext<'_>) -> ComponentResult<Vec<Equation>> {
        let mut eqs = Vec::new();
        push_mass_balance(&mut eqs, ctx);

        // All ports share one pressure; the first inlet is the reference.
        let p_ref = ctx.in1();
        for (i, &conn) in ctx.inlets.iter().enumerate().skip(1) {
            eqs.push(ctx.eq(
                EquationKind::Ref {
                    a: VarRef::Pressure(conn),
                    b: VarRef::Pressure(p_ref),
                    factor: 1.0,
                    offset: 0.0,
                },
                &format!("pressure equality in{}", i + 1),
            ));
        }
        eqs.push(ctx.eq(
            EquationKind::Ref {
                a: VarRef::Pressure(ctx.out1()),
                b: VarRef::Pressure(p_ref),
                factor: 1.0,
                offset: 0.0,
            },
            "pressure equality out",
        ));

        push_species_balances(&mut eqs, ctx, ctx.inlets, ctx.outlets);

        eqs.push(ctx.eq(
            EquationKind::EnergyMix {
                inlets: ctx.inlets.to_vec(),
                outlet: ctx.out1(),
            },
            "enthalpy mix",
        ));
        Ok(eqs)
    }
}
