//! AIR over a compiled constraint system
//!
//! Row 0 of the trace holds the assignment and the remaining rows are random
//! masking. Column `i` holds variable `i`. On the first row, column 0 is
//! pinned to one, public variables are pinned to the public values and
//! every `a * b = c` constraint becomes `a * b - c = 0`.

use std::ops::Deref;
use std::sync::Arc;

use p3_air::{Air, AirBuilder, AirBuilderWithPublicValues, BaseAir};
use p3_field::{Field, FieldAlgebra, PrimeField32};
use p3_matrix::Matrix;

use crate::circuit::{CompiledCircuit, LinearCombination, Variable};
use crate::F;

#[derive(Clone, Debug)]
pub struct CircuitAir {
    circuit: Arc<CompiledCircuit>,
}

impl CircuitAir {
    pub fn new(circuit: Arc<CompiledCircuit>) -> Self {
        Self { circuit }
    }

    pub fn circuit(&self) -> &CompiledCircuit {
        &self.circuit
    }

    pub fn num_public(&self) -> usize {
        self.circuit.num_public()
    }
}

impl<T: Field> BaseAir<T> for CircuitAir {
    fn width(&self) -> usize {
        self.circuit.num_variables()
    }
}

impl<AB: AirBuilderWithPublicValues> Air<AB> for CircuitAir {
    fn eval(&self, builder: &mut AB) {
        let main = builder.main();
        let local_slice = main.row_slice(0);
        let local: &[AB::Var] = local_slice.deref();

        let public: Vec<AB::Expr> = builder
            .public_values()
            .iter()
            .map(|v| (*v).into())
            .collect();

        let mut first = builder.when_first_row();
        first.assert_one(local[Variable::ONE.index()]);

        for (var, value) in self.circuit.public_variables().iter().zip(public) {
            first.assert_eq(local[var.index()], value);
        }

        for constraint in self.circuit.constraints() {
            let a = lc_expr::<AB>(&constraint.a, local);
            let b = lc_expr::<AB>(&constraint.b, local);
            let c = lc_expr::<AB>(&constraint.c, local);
            first.assert_zero(a * b - c);
        }
    }
}

/// Linear combination over the current row; the constant-one variable is
/// folded into a constant term
fn lc_expr<AB: AirBuilder>(lc: &LinearCombination, row: &[AB::Var]) -> AB::Expr {
    let mut expr = AB::Expr::ZERO;
    for (var, coeff) in lc.terms() {
        let coeff_expr = AB::Expr::from_canonical_u32(coeff.as_canonical_u32());
        if *var == Variable::ONE {
            expr += coeff_expr;
            continue;
        }
        let column: AB::Expr = row[var.index()].into();
        if *coeff == F::ONE {
            expr += column;
        } else {
            expr += column * coeff_expr;
        }
    }
    expr
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::{compile, Circuit, ConstraintSystem};
    use crate::error::CircuitError;

    struct Product;

    impl Circuit for Product {
        fn synthesize(&self, cs: &mut ConstraintSystem) -> Result<(), CircuitError> {
            let x = cs.alloc(F::from_canonical_u32(3));
            let y = cs.alloc(F::from_canonical_u32(4));
            let z = cs.alloc_public(F::from_canonical_u32(12));
            cs.enforce("product", x, y, z);
            Ok(())
        }
    }

    #[test]
    fn test_width_matches_variables() {
        let air = CircuitAir::new(Arc::new(compile(&Product).unwrap()));
        assert_eq!(BaseAir::<F>::width(&air), 4);
        assert_eq!(air.num_public(), 1);
    }
}
