//! Mixture separator.
//!
//! ## Model
//!
//! ```text
//! m_in = sum(m_out)          (mass)
//! p_out_i = p_in             (per outlet)
//! T_out_i = T_in             (per outlet)
//! species balances over the node
//! ```
//!
//! Outlet compositions may differ from the inlet, so enthalpies are not
//! propagated; each outlet instead leaves at the inlet temperature. The
//! split itself is pinned down by downstream specifications, typically a
//! fixed outlet fraction or flow.

use crate::equation::{Equation, EquationKind, VarRef};
use crate::error::{ComponentError, ComponentResult};
use crate::model::{EquationContext, push_mass_balance, push_species_balances};

/// Separating node with one inlet and 2 to 4 outlets.
#[derive(Debug, Clone, Copy)]
pub struct Separator {
    num_out: u8,
}

impl Separator {
    pub fn new(num_out: u8) -> ComponentResult<Self> {
        if !(2..=4).contains(&num_out) {
            return Err(ComponentError::Configuration {
                what: format!("separator supports 2 to 4 outlets, got {num_out}"),
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
                EquationKind::TempEquality {
                    a: outlet,
                    b: inlet,
                },
                &format!("temperature equality out{}", i + 1),
            ));
        }

        push_species_balances(&mut eqs, ctx, ctx.inlets, ctx.outlets);
        Ok(eqs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EquationContext;
    use crate::model::testkit::{Rig, air_stream, residuals};
    use crate::param::Mode;
    use crate::state::{FractionSpecs, StreamState, SystemView};
    use std::collections::HashMap;
    use tc_core::units::{k, pa};
    use tc_core::{CompId, ConnId};
    use tc_fluids::{Composition, PerfectGas, PropertyProvider, Species};

    #[test]
    fn arity_bounds() {
        assert!(Separator::new(1).is_err());
        assert!(Separator::new(3).is_ok());
        assert!(Separator::new(5).is_err());
    }

    #[test]
    fn isothermal_binary_separation_closes_all_balances() {
        let gas = PerfectGas::new();
        let species = vec![Species::N2, Species::O2];
        let mk = |m: f64, x_n2: f64| {
            let composition = Composition::from_pairs(vec![
                (Species::N2, x_n2),
                (Species::O2, 1.0 - x_n2),
            ])
            .unwrap();
            let h = gas.h_pt(pa(1.0e5), k(300.0), &composition).unwrap();
            StreamState {
                m,
                p: 1.0e5,
                h,
                composition,
            }
        };
        // 3 kg/s of 50% N2 splits into 1 kg/s of 90% N2 and 2 kg/s of
        // 30% N2, all at the inlet temperature.
        let streams = vec![mk(3.0, 0.5), mk(1.0, 0.9), mk(2.0, 0.3)];
        let fractions = FractionSpecs::new(
            vec![
                vec![Some(0.5), Some(0.5)],
                vec![None, None],
                vec![None, None],
            ],
            2,
        );
        let params = HashMap::new();
        let sys = SystemView {
            streams: &streams,
            params: &params,
            species: &species,
            props: &gas,
        };
        let inlets = [ConnId::from_index(0)];
        let outlets = [ConnId::from_index(1), ConnId::from_index(2)];
        let ctx = EquationContext {
            comp: CompId::from_index(0),
            label: "sep1",
            inlets: &inlets,
            outlets: &outlets,
            mode: Mode::Design,
            species: &species,
            fractions: &fractions,
            design: None,
        };

        let eqs = Separator::new(2).unwrap().equations(&ctx).unwrap();
        // mass + (p, T) per outlet + 1 species balance.
        assert_eq!(eqs.len(), 6);
        for (eq, r) in eqs.iter().zip(residuals(&eqs, &sys)) {
            assert!(r.abs() < 1e-9, "{} residual {r}", eq.tag);
        }
    }

    #[test]
    fn single_species_emits_no_balance() {
        let gas = PerfectGas::new();
        let rig = Rig::air(vec![
            air_stream(2.0, 1.0e5, 320.0, &gas),
            air_stream(1.0, 1.0e5, 320.0, &gas),
            air_stream(1.0, 1.0e5, 320.0, &gas),
        ]);
        let inlets = [ConnId::from_index(0)];
        let outlets = [ConnId::from_index(1), ConnId::from_index(2)];
        let ctx = rig.ctx("sep1", &inlets, &outlets, Mode::Design, None);

        let eqs = Separator::new(2).unwrap().equations(&ctx).unwrap();
        assert_eq!(eqs.len(), 5);
        assert!(!eqs.iter().any(|e| e.tag.contains("Air balance")));
    }
}
