//! Rank-1 constraint system with witness values tracked alongside allocation
//!
//! Every allocation carries its value. A blank synthesis (all witness inputs
//! zero) produces exactly the same constraints as a populated one, so the
//! shape of a circuit never depends on the data it is proving.

use std::ops::{Add, Mul, Neg, Sub};

use p3_field::{Field, FieldAlgebra, PrimeField32};
use serde::{Deserialize, Serialize};

use crate::F;

/// Index of a circuit variable. Index 0 is the constant one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Variable(usize);

impl Variable {
    /// The constant-one variable
    pub const ONE: Variable = Variable(0);

    pub fn index(self) -> usize {
        self.0
    }
}

/// Sparse linear combination of variables, kept sorted by variable index
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LinearCombination {
    terms: Vec<(Variable, F)>,
}

impl LinearCombination {
    pub fn zero() -> Self {
        Self { terms: Vec::new() }
    }

    pub fn constant(value: F) -> Self {
        Self::term(Variable::ONE, value)
    }

    pub fn from_u32(value: u32) -> Self {
        Self::constant(F::from_canonical_u32(value))
    }

    pub fn from_usize(value: usize) -> Self {
        Self::constant(F::from_canonical_usize(value))
    }

    pub fn term(var: Variable, coeff: F) -> Self {
        if coeff.is_zero() {
            return Self::zero();
        }
        Self { terms: vec![(var, coeff)] }
    }

    pub fn terms(&self) -> &[(Variable, F)] {
        &self.terms
    }

    /// Returns the value when the combination only touches the constant one
    pub fn as_constant(&self) -> Option<F> {
        match self.terms.as_slice() {
            [] => Some(F::ZERO),
            [(var, coeff)] if *var == Variable::ONE => Some(*coeff),
            _ => None,
        }
    }

    pub fn evaluate(&self, values: &[F]) -> F {
        self.terms
            .iter()
            .map(|(var, coeff)| values[var.0] * *coeff)
            .sum()
    }

    /// Add a constant offset
    pub fn offset(self, k: usize) -> Self {
        self + Self::from_usize(k)
    }

    pub fn scale(self, k: F) -> Self {
        if k.is_zero() {
            return Self::zero();
        }
        Self {
            terms: self.terms.into_iter().map(|(v, c)| (v, c * k)).collect(),
        }
    }

    fn merge(self, other: Self, negate: bool) -> Self {
        let sign = if negate { F::NEG_ONE } else { F::ONE };
        let (lhs, rhs) = (&self.terms, &other.terms);
        let mut terms = Vec::with_capacity(lhs.len() + rhs.len());
        let (mut i, mut j) = (0, 0);

        while i < lhs.len() || j < rhs.len() {
            let (var, coeff) = if j == rhs.len() || (i < lhs.len() && lhs[i].0 < rhs[j].0) {
                i += 1;
                lhs[i - 1]
            } else if i == lhs.len() || rhs[j].0 < lhs[i].0 {
                j += 1;
                (rhs[j - 1].0, rhs[j - 1].1 * sign)
            } else {
                i += 1;
                j += 1;
                (lhs[i - 1].0, lhs[i - 1].1 + rhs[j - 1].1 * sign)
            };
            if !coeff.is_zero() {
                terms.push((var, coeff));
            }
        }

        Self { terms }
    }
}

impl From<Variable> for LinearCombination {
    fn from(var: Variable) -> Self {
        Self::term(var, F::ONE)
    }
}

impl From<&Variable> for LinearCombination {
    fn from(var: &Variable) -> Self {
        Self::from(*var)
    }
}

impl From<&LinearCombination> for LinearCombination {
    fn from(lc: &LinearCombination) -> Self {
        lc.clone()
    }
}

impl Add for LinearCombination {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        self.merge(rhs, false)
    }
}

impl Sub for LinearCombination {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        self.merge(rhs, true)
    }
}

impl Add<Variable> for LinearCombination {
    type Output = Self;

    fn add(self, rhs: Variable) -> Self {
        self + Self::from(rhs)
    }
}

impl Sub<Variable> for LinearCombination {
    type Output = Self;

    fn sub(self, rhs: Variable) -> Self {
        self - Self::from(rhs)
    }
}

impl Add<&LinearCombination> for LinearCombination {
    type Output = Self;

    fn add(self, rhs: &LinearCombination) -> Self {
        self + rhs.clone()
    }
}

impl Sub<&LinearCombination> for LinearCombination {
    type Output = Self;

    fn sub(self, rhs: &LinearCombination) -> Self {
        self - rhs.clone()
    }
}

impl Mul<F> for LinearCombination {
    type Output = Self;

    fn mul(self, rhs: F) -> Self {
        self.scale(rhs)
    }
}

impl Neg for LinearCombination {
    type Output = Self;

    fn neg(self) -> Self {
        self.scale(F::NEG_ONE)
    }
}

/// A single `a * b = c` constraint
#[derive(Clone, Debug)]
pub struct Constraint {
    pub a: LinearCombination,
    pub b: LinearCombination,
    pub c: LinearCombination,
    /// Human-readable origin, used in diagnostics only
    pub label: &'static str,
}

impl Constraint {
    pub fn is_satisfied(&self, values: &[F]) -> bool {
        self.a.evaluate(values) * self.b.evaluate(values) == self.c.evaluate(values)
    }
}

/// Constraint system under construction
#[derive(Clone, Debug)]
pub struct ConstraintSystem {
    values: Vec<F>,
    public: Vec<Variable>,
    constraints: Vec<Constraint>,
}

impl Default for ConstraintSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl ConstraintSystem {
    pub fn new() -> Self {
        Self {
            values: vec![F::ONE],
            public: Vec::new(),
            constraints: Vec::new(),
        }
    }

    /// Allocate a private variable
    pub fn alloc(&mut self, value: F) -> Variable {
        self.values.push(value);
        Variable(self.values.len() - 1)
    }

    /// Allocate a public variable. Public inputs are ordered by allocation.
    pub fn alloc_public(&mut self, value: F) -> Variable {
        let var = self.alloc(value);
        self.public.push(var);
        var
    }

    pub fn enforce(
        &mut self,
        label: &'static str,
        a: impl Into<LinearCombination>,
        b: impl Into<LinearCombination>,
        c: impl Into<LinearCombination>,
    ) {
        self.constraints.push(Constraint {
            a: a.into(),
            b: b.into(),
            c: c.into(),
            label,
        });
    }

    /// Enforce `lhs == rhs` as `(lhs - rhs) * 1 = 0`
    pub fn enforce_equal(
        &mut self,
        label: &'static str,
        lhs: impl Into<LinearCombination>,
        rhs: impl Into<LinearCombination>,
    ) {
        let diff = lhs.into() - rhs.into();
        self.enforce(label, diff, Variable::ONE, LinearCombination::zero());
    }

    pub fn value(&self, var: Variable) -> F {
        self.values[var.0]
    }

    pub fn eval(&self, lc: &LinearCombination) -> F {
        lc.evaluate(&self.values)
    }

    /// Evaluate and read the result as a small integer
    pub fn eval_usize(&self, lc: &LinearCombination) -> usize {
        self.eval(lc).as_canonical_u32() as usize
    }

    pub fn num_variables(&self) -> usize {
        self.values.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    pub fn public_variables(&self) -> &[Variable] {
        &self.public
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn values(&self) -> &[F] {
        &self.values
    }

    pub(crate) fn into_parts(self) -> (Vec<F>, Vec<Variable>, Vec<Constraint>) {
        (self.values, self.public, self.constraints)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_combination_merges_terms() {
        let mut cs = ConstraintSystem::new();
        let x = cs.alloc(F::from_canonical_u32(3));
        let y = cs.alloc(F::from_canonical_u32(5));

        let lc = LinearCombination::from(x) + y + x - y;
        assert_eq!(lc.terms().len(), 1);
        assert_eq!(cs.eval(&lc), F::from_canonical_u32(6));

        let cancelled = LinearCombination::from(x) - x;
        assert_eq!(cancelled.as_constant(), Some(F::ZERO));
    }

    #[test]
    fn test_constant_offsets() {
        let cs = ConstraintSystem::new();
        let lc = LinearCombination::from_usize(7).offset(3);
        assert_eq!(lc.as_constant(), Some(F::from_canonical_u32(10)));
        assert_eq!(cs.eval_usize(&lc), 10);
    }

    #[test]
    fn test_enforce_equal_tracks_satisfaction() {
        let mut cs = ConstraintSystem::new();
        let x = cs.alloc(F::from_canonical_u32(4));
        let y = cs.alloc_public(F::from_canonical_u32(4));
        cs.enforce_equal("x == y", x, y);

        assert_eq!(cs.public_variables(), &[y]);
        assert!(cs.constraints()[0].is_satisfied(cs.values()));

        cs.enforce_equal("x == 5", x, LinearCombination::from_u32(5));
        assert!(!cs.constraints()[1].is_satisfied(cs.values()));
    }
}
