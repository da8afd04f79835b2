//! Record walker: assert a tag at a cursor, decode the length that follows
//! and compute where the record data starts and ends

use crate::circuit::gadgets::assert_le;
use crate::circuit::{ConstraintSystem, LinearCombination, Variable};
use crate::error::CircuitError;

use super::access::ByteAccessor;
use super::varint::{DecodedVarint, VarintDecoder};

/// Tag the byte at the cursor must carry
#[derive(Clone, Copy, Debug)]
pub enum ExpectedTag {
    Const(u8),
    Var(Variable),
}

impl From<ExpectedTag> for LinearCombination {
    fn from(tag: ExpectedTag) -> Self {
        match tag {
            ExpectedTag::Const(byte) => LinearCombination::from_u32(byte as u32),
            ExpectedTag::Var(var) => var.into(),
        }
    }
}

/// A walked `tag | varint(len) | data` record
#[derive(Clone, Debug)]
pub struct WireRecord {
    pub tag: Variable,
    pub length: LinearCombination,
    pub data_start: LinearCombination,
    pub data_end: LinearCombination,
}

pub struct WireStructureWalker<'a, A> {
    accessor: &'a A,
    decoder: VarintDecoder,
}

impl<'a, A: ByteAccessor> WireStructureWalker<'a, A> {
    pub fn new(accessor: &'a A, decoder: VarintDecoder) -> Self {
        Self { accessor, decoder }
    }

    pub fn accessor(&self) -> &A {
        self.accessor
    }

    /// Width used for cursor range checks and comparisons
    pub fn index_bits(&self) -> usize {
        self.accessor.index_bits()
    }

    pub fn read(
        &self,
        cs: &mut ConstraintSystem,
        at: &LinearCombination,
    ) -> Result<Variable, CircuitError> {
        self.accessor.read(cs, at)
    }

    /// Decode the varint starting at `at`
    pub fn read_varint(
        &self,
        cs: &mut ConstraintSystem,
        at: &LinearCombination,
        enabled: Option<&LinearCombination>,
    ) -> Result<DecodedVarint, CircuitError> {
        let window = (0..self.decoder.width())
            .map(|i| self.accessor.read(cs, &at.clone().offset(i)))
            .collect::<Result<Vec<_>, _>>()?;
        self.decoder.decode(cs, &window, enabled)
    }

    /// Assert `buf[cursor] == expected` and decode the record length
    pub fn walk(
        &self,
        cs: &mut ConstraintSystem,
        cursor: &LinearCombination,
        expected: ExpectedTag,
    ) -> Result<WireRecord, CircuitError> {
        let tag = self.accessor.read(cs, cursor)?;
        cs.enforce_equal("record tag", tag, expected);

        let length = self.read_varint(cs, &cursor.clone().offset(1), None)?;
        let data_start = cursor.clone().offset(1) + length.consumed;
        let data_end = data_start.clone() + &length.value;

        Ok(WireRecord {
            tag,
            length: length.value,
            data_start,
            data_end,
        })
    }

    /// Enforce that `record` ends no later than `end`
    pub fn assert_within(
        &self,
        cs: &mut ConstraintSystem,
        record: &WireRecord,
        end: &LinearCombination,
    ) -> Result<(), CircuitError> {
        assert_le(cs, &record.data_end, end, self.index_bits())
    }
}

#[cfg(test)]
mod tests {
    use p3_field::FieldAlgebra;

    use super::*;
    use crate::circuit::gadgets::alloc_byte;
    use crate::circuit::MockProver;
    use crate::gadgets::access::{AccessStrategy, Accessor};
    use crate::wire::WireWriter;
    use crate::F;

    fn accessor(cs: &mut ConstraintSystem, buf: &[u8]) -> Accessor {
        let bytes = buf.iter().map(|b| alloc_byte(cs, *b).unwrap()).collect();
        Accessor::over_bytes(AccessStrategy::BinaryTree, bytes, 9).unwrap()
    }

    #[test]
    fn test_walks_consecutive_records() {
        let buf = WireWriter::new()
            .bytes(0x0a, b"abc")
            .bytes(0x12, &[7u8; 130])
            .finish();
        let mut cs = ConstraintSystem::new();
        let accessor = accessor(&mut cs, &buf);
        let walker = WireStructureWalker::new(&accessor, VarintDecoder::default());

        let first = walker
            .walk(&mut cs, &LinearCombination::zero(), ExpectedTag::Const(0x0a))
            .unwrap();
        let second = walker
            .walk(&mut cs, &first.data_end, ExpectedTag::Const(0x12))
            .unwrap();
        walker
            .assert_within(&mut cs, &second, &LinearCombination::from_usize(buf.len()))
            .unwrap();

        assert_eq!(cs.eval_usize(&first.data_start), 2);
        assert_eq!(cs.eval_usize(&first.data_end), 5);
        assert_eq!(cs.eval_usize(&second.length), 130);
        assert_eq!(cs.eval_usize(&second.data_start), 8);
        assert_eq!(cs.eval_usize(&second.data_end), buf.len());
        MockProver::from_system(&cs).assert_satisfied();
    }

    #[test]
    fn test_wrong_tag_unsatisfiable() {
        let buf = WireWriter::new().bytes(0x0a, b"abc").finish();
        let mut cs = ConstraintSystem::new();
        let accessor = accessor(&mut cs, &buf);
        let walker = WireStructureWalker::new(&accessor, VarintDecoder::default());
        let key = cs.alloc(F::from_canonical_u32(0x12));

        walker
            .walk(&mut cs, &LinearCombination::zero(), ExpectedTag::Var(key))
            .unwrap();
        let failures = MockProver::from_system(&cs).verify().unwrap_err();
        assert!(failures.iter().any(|f| f.label == "record tag"));
    }

    #[test]
    fn test_overrun_unsatisfiable() {
        let buf = WireWriter::new().bytes(0x0a, b"abcdef").finish();
        let mut cs = ConstraintSystem::new();
        let accessor = accessor(&mut cs, &buf);
        let walker = WireStructureWalker::new(&accessor, VarintDecoder::default());

        let record = walker
            .walk(&mut cs, &LinearCombination::zero(), ExpectedTag::Const(0x0a))
            .unwrap();
        walker
            .assert_within(&mut cs, &record, &LinearCombination::from_usize(5))
            .unwrap();
        assert!(MockProver::from_system(&cs).verify().is_err());
    }
}
