//! Flow splitter.
//!
//! ## Model
//!
//! ```text
//! m_in = sum(m_out)          (mass)
//! p_out_i = p_in             (per outlet)
//! h_out_i = h_in             (per outlet)
//! x_out_i = x_in             (per outlet, closing species skipped)
//! ```
//!
//! The split ratio itself is not a component parameter; it follows from
//! downstream specifications.

use crate::equation::{Equation, EquationKind, VarRef};
use crate::error::{ComponentError, ComponentResult};
use crate::model::{EquationContext, push_fraction_propagation, push_mass_balance};

/// Splitting node with one inlet and 2 to 4 outlets.
#[derive(Debug, Clone, Copy)]
pub struct Splitter {
    num_out: u8,
}

impl Splitter {
    pub fn new(num_out: u8) -> ComponentResult<Self> {
        if !(2..=4).contains(&num_out) {
            return Err(ComponentError::Configuration {
                what: format!("splitter supports 2 to 4 outlets, got {num_out}"),
            });
        }
        Ok(Self { num_out })
    }

    pub fn num_out(&self) -> u8 {
        self.num_out
    }

    pub(crate) fn equations(&self, ctx: &EquationContext<'_>) -> ComponentResult<Vec<Equation>> {
        let inlet = ctx.in1();
        let mut eqs = Vec::new();
        push_mass_balance(&mut eqs, ctx);

        for (i, &outlet) in ctx.outlets.iter().enumerate() {
            eqs.push(ctx.eq(
                EquationKind::Ref {
                    a: VarRef::Pressure(outlet),
                    b: VarRef::Pressure(inlet),
                    factor: 1.0,
                    offset: 0.0,
                },
                &format!("pressure equality out{}", i + 1),
            ));
            eqs.push(ctx.eq(
                EquationKind::Ref {
                    a: VarRef::Enthalpy(outlet),
                    b: VarRef::Enthalpy(inlet),
                    factor: 1.0,
                    offset: 0.0,
                },
                &format!("enthalpy equality out{}", i + 1),
            ));
            push_fraction_propagation(&mut eqs, ctx, inlet, outlet);
        }
        Ok(eqs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::testkit::{Rig, air_stream, residuals};
    use crate::param::Mode;
    use tc_core::ConnId;
    use tc_fluids::PerfectGas;

    #[test]
    fn arity_bounds() {
        assert!(Splitter::new(1).is_err());
        assert!(Splitter::new(2).is_ok());
        assert!(Splitter::new(5).is_err());
    }

    #[test]
    fn split_keeps_state_and_divides_mass() {
        let gas = PerfectGas::new();
        let rig = Rig::air(vec![
            air_stream(3.0, 2.0e5, 330.0, &gas),
            air_stream(1.0, 2.0e5, 330.0, &gas),
            air_stream(2.0, 2.0e5, 330.0, &gas),
        ]);
        let inlets = [ConnId::from_index(0)];
        let outlets = [ConnId::from_index(1), ConnId::from_index(2)];
        let ctx = rig.ctx("sp1", &inlets, &outlets, Mode::Design, None);

        let eqs = Splitter::new(2).unwrap().equations(&ctx).unwrap();
        // mass + (p, h) per outlet.
        assert_eq!(eqs.len(), 5);
        for r in residuals(&eqs, &rig.sys()) {
            assert!(r.abs() < 1e-12);
        }
    }
}
