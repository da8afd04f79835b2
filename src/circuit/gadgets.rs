//! Generic arithmetic gadgets: booleans, bit decomposition, zero tests,
//! selection and range-checked comparisons

use p3_field::{Field, FieldAlgebra, PrimeField32};

use super::system::{ConstraintSystem, LinearCombination, Variable};
use crate::error::CircuitError;
use crate::F;

/// Widest decomposition whose recomposition cannot wrap the Baby Bear modulus
pub const MAX_DECOMPOSITION_BITS: usize = 30;

/// Assert that a value is boolean (0 or 1)
pub fn assert_bool(cs: &mut ConstraintSystem, bit: Variable) {
    // bit * (1 - bit) = 0
    cs.enforce(
        "boolean",
        bit,
        LinearCombination::from(Variable::ONE) - bit,
        LinearCombination::zero(),
    );
}

/// Allocate `a * b` as a new variable
pub fn mul(cs: &mut ConstraintSystem, a: &LinearCombination, b: &LinearCombination) -> Variable {
    let out = cs.alloc(cs.eval(a) * cs.eval(b));
    cs.enforce("product", a, b, out);
    out
}

/// Little-endian bit decomposition. Also a range check: a value that does not
/// fit in `bits` bits leaves the recomposition constraint unsatisfied.
pub fn to_bits(
    cs: &mut ConstraintSystem,
    x: &LinearCombination,
    bits: usize,
) -> Result<Vec<Variable>, CircuitError> {
    if bits == 0 || bits > MAX_DECOMPOSITION_BITS {
        return Err(CircuitError::BitWidth { bits });
    }

    let value = cs.eval(x).as_canonical_u32();
    let decomposed: Vec<Variable> = (0..bits)
        .map(|i| {
            let bit = cs.alloc(F::from_bool((value >> i) & 1 == 1));
            assert_bool(cs, bit);
            bit
        })
        .collect();

    cs.enforce_equal("bit recomposition", from_bits(&decomposed), x);
    Ok(decomposed)
}

/// Recompose little-endian bits
pub fn from_bits(bits: &[Variable]) -> LinearCombination {
    bits.iter()
        .enumerate()
        .fold(LinearCombination::zero(), |acc, (i, bit)| {
            acc + LinearCombination::term(*bit, F::from_canonical_u32(1 << i))
        })
}

/// Allocate a private byte, range checked to [0, 255]
pub fn alloc_byte(cs: &mut ConstraintSystem, value: u8) -> Result<Variable, CircuitError> {
    let byte = cs.alloc(F::from_canonical_u8(value));
    to_bits(cs, &byte.into(), 8)?;
    Ok(byte)
}

/// Returns 1 when `x == 0`, otherwise 0
pub fn is_zero(cs: &mut ConstraintSystem, x: &LinearCombination) -> Variable {
    let value = cs.eval(x);
    let inv = cs.alloc(value.try_inverse().unwrap_or(F::ZERO));
    let out = cs.alloc(F::from_bool(value.is_zero()));

    // x * inv = 1 - out, x * out = 0
    cs.enforce(
        "is_zero inverse",
        x,
        inv,
        LinearCombination::from(Variable::ONE) - out,
    );
    cs.enforce("is_zero output", x, out, LinearCombination::zero());
    out
}

pub fn is_equal(
    cs: &mut ConstraintSystem,
    a: &LinearCombination,
    b: &LinearCombination,
) -> Variable {
    is_zero(cs, &(a.clone() - b))
}

/// `bit ? when_true : when_false`. `bit` must already be boolean.
pub fn select(
    cs: &mut ConstraintSystem,
    bit: &LinearCombination,
    when_true: &LinearCombination,
    when_false: &LinearCombination,
) -> Variable {
    let out = if cs.eval(bit).is_zero() {
        cs.eval(when_false)
    } else {
        cs.eval(when_true)
    };
    let out = cs.alloc(out);

    // bit * (when_true - when_false) = out - when_false
    cs.enforce(
        "select",
        bit,
        when_true.clone() - when_false,
        LinearCombination::from(out) - when_false,
    );
    out
}

/// Enforce `a <= b` for values below `2^bits`
pub fn assert_le(
    cs: &mut ConstraintSystem,
    a: &LinearCombination,
    b: &LinearCombination,
    bits: usize,
) -> Result<(), CircuitError> {
    to_bits(cs, &(b.clone() - a), bits)?;
    Ok(())
}

/// Returns 1 when `a < b`, for values below `2^bits`
pub fn is_less_than(
    cs: &mut ConstraintSystem,
    a: &LinearCombination,
    b: &LinearCombination,
    bits: usize,
) -> Result<Variable, CircuitError> {
    // a - b + 2^bits lies in [0, 2^(bits + 1)); its top bit is set iff a >= b
    let shifted = (a.clone() - b).offset(1 << bits);
    let decomposed = to_bits(cs, &shifted, bits + 1)?;
    let top = decomposed[bits];

    let lt = cs.alloc(F::ONE - cs.value(top));
    cs.enforce_equal("less-than", LinearCombination::from(lt) + top, Variable::ONE);
    Ok(lt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::mock::MockProver;

    fn lc(cs: &mut ConstraintSystem, value: u32) -> LinearCombination {
        cs.alloc(F::from_canonical_u32(value)).into()
    }

    #[test]
    fn test_to_bits_range_check() {
        let mut cs = ConstraintSystem::new();
        let x = lc(&mut cs, 0b1011);
        let bits = to_bits(&mut cs, &x, 4).unwrap();
        assert_eq!(bits.len(), 4);
        assert!(MockProver::from_system(&cs).verify().is_ok());

        let mut cs = ConstraintSystem::new();
        let x = lc(&mut cs, 16);
        to_bits(&mut cs, &x, 4).unwrap();
        let failures = MockProver::from_system(&cs).verify().unwrap_err();
        assert!(failures.iter().any(|f| f.label == "bit recomposition"));
    }

    #[test]
    fn test_to_bits_rejects_wide_decomposition() {
        let mut cs = ConstraintSystem::new();
        let x = lc(&mut cs, 1);
        assert_eq!(
            to_bits(&mut cs, &x, 31),
            Err(CircuitError::BitWidth { bits: 31 })
        );
    }

    #[test]
    fn test_is_zero() {
        let mut cs = ConstraintSystem::new();
        let zero = lc(&mut cs, 0);
        let seven = lc(&mut cs, 7);
        let a = is_zero(&mut cs, &zero);
        let b = is_zero(&mut cs, &seven);
        assert_eq!(cs.value(a), F::ONE);
        assert_eq!(cs.value(b), F::ZERO);
        assert!(MockProver::from_system(&cs).verify().is_ok());
    }

    #[test]
    fn test_select() {
        let mut cs = ConstraintSystem::new();
        let bit = lc(&mut cs, 1);
        let x = lc(&mut cs, 11);
        let y = lc(&mut cs, 22);
        let picked = select(&mut cs, &bit, &x, &y);
        assert_eq!(cs.value(picked), F::from_canonical_u32(11));

        let bit = lc(&mut cs, 0);
        let picked = select(&mut cs, &bit, &x, &y);
        assert_eq!(cs.value(picked), F::from_canonical_u32(22));
        assert!(MockProver::from_system(&cs).verify().is_ok());
    }

    #[test]
    fn test_comparisons() {
        let mut cs = ConstraintSystem::new();
        let a = lc(&mut cs, 5);
        let b = lc(&mut cs, 9);
        let lt = is_less_than(&mut cs, &a, &b, 8).unwrap();
        let ge = is_less_than(&mut cs, &b, &a, 8).unwrap();
        let eq = is_less_than(&mut cs, &a, &a, 8).unwrap();
        assert_eq!(cs.value(lt), F::ONE);
        assert_eq!(cs.value(ge), F::ZERO);
        assert_eq!(cs.value(eq), F::ZERO);
        assert_le(&mut cs, &a, &b, 8).unwrap();
        assert!(MockProver::from_system(&cs).verify().is_ok());

        assert_le(&mut cs, &b, &a, 8).unwrap();
        assert!(MockProver::from_system(&cs).verify().is_err());
    }
}
