//! Canonical varint decoding over a window of circuit bytes
//!
//! Each window byte is split into a continuation bit and seven value bits.
//! With `c_0 = 1` and `c_{i+1} = c_i * msb_i` (byte `i` is part of the
//! varint iff `c_i = 1`):
//!
//! - the last window byte must not continue: `c_{w-1} * msb_{w-1} = 0`
//! - the final byte of a multi-byte encoding is non-zero:
//!   `(c_i - c_{i+1}) * is_zero(val_i) = 0` for `i >= 1`
//! - `value = sum(c_i * val_i * 128^i)`, `consumed = sum(c_i)`

use p3_field::FieldAlgebra;

use crate::circuit::gadgets::{from_bits, is_zero, mul, to_bits};
use crate::circuit::{ConstraintSystem, LinearCombination, Variable};
use crate::error::CircuitError;
use crate::wire::MAX_VARINT_BYTES;
use crate::F;

/// Decoded varint as circuit values
#[derive(Clone, Debug)]
pub struct DecodedVarint {
    pub value: LinearCombination,
    /// Number of bytes the encoding occupies
    pub consumed: LinearCombination,
}

/// Varint decoder over a fixed-width byte window
#[derive(Clone, Copy, Debug)]
pub struct VarintDecoder {
    width: usize,
}

impl Default for VarintDecoder {
    fn default() -> Self {
        Self {
            width: MAX_VARINT_BYTES,
        }
    }
}

impl VarintDecoder {
    /// A decoder reading `width` bytes. Five or more bytes could encode
    /// values past the field modulus, so the width is capped.
    pub fn new(width: usize) -> Result<Self, CircuitError> {
        if width == 0 || width > MAX_VARINT_BYTES {
            return Err(CircuitError::InvalidVarintWidth {
                width,
                max: MAX_VARINT_BYTES,
            });
        }
        Ok(Self { width })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Decode the varint starting at `window[0]`.
    ///
    /// When `enabled` is given, the termination and canonical-form
    /// constraints only bind while it is 1; the outputs are computed either
    /// way.
    pub fn decode(
        &self,
        cs: &mut ConstraintSystem,
        window: &[Variable],
        enabled: Option<&LinearCombination>,
    ) -> Result<DecodedVarint, CircuitError> {
        if window.len() != self.width {
            return Err(CircuitError::WitnessShape(format!(
                "varint window of {} bytes, decoder expects {}",
                window.len(),
                self.width
            )));
        }

        let mut value = LinearCombination::zero();
        let mut consumed = LinearCombination::zero();
        let mut reached = LinearCombination::from(Variable::ONE);

        for (i, byte) in window.iter().enumerate() {
            let bits = to_bits(cs, &(*byte).into(), 8)?;
            let low: LinearCombination = from_bits(&bits[..7]);
            let msb = LinearCombination::from(bits[7]);

            consumed = consumed + &reached;
            let weighted = if i == 0 {
                low.clone()
            } else {
                mul(cs, &reached, &low).into()
            };
            value = value + weighted.scale(F::from_canonical_u32(1 << (7 * i)));

            let continues: LinearCombination = if i == 0 {
                msb.clone()
            } else {
                mul(cs, &reached, &msb).into()
            };

            if i > 0 {
                // Byte i ends the encoding: its value bits must be non-zero
                let is_last = reached.clone() - &continues;
                let empty = is_zero(cs, &low);
                gated(cs, "varint canonical", &is_last, empty, enabled);
            }
            if i + 1 == self.width {
                gated(cs, "varint termination", &continues, Variable::ONE, enabled);
            }

            reached = continues;
        }

        Ok(DecodedVarint { value, consumed })
    }
}

/// Enforce `a * b * enabled = 0`
fn gated(
    cs: &mut ConstraintSystem,
    label: &'static str,
    a: &LinearCombination,
    b: impl Into<LinearCombination>,
    enabled: Option<&LinearCombination>,
) {
    let b = b.into();
    match enabled {
        None => cs.enforce(label, a, b, LinearCombination::zero()),
        Some(flag) => {
            let product = mul(cs, a, &b);
            cs.enforce(label, product, flag, LinearCombination::zero());
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::circuit::MockProver;
    use crate::wire::encode_varint;

    fn decode(window: &[u8], enabled: Option<bool>) -> (MockProver, u32, u32) {
        let mut cs = ConstraintSystem::new();
        let vars: Vec<Variable> = window
            .iter()
            .map(|b| cs.alloc(F::from_canonical_u8(*b)))
            .collect();
        let flag = enabled.map(|e| LinearCombination::from(cs.alloc(F::from_bool(e))));
        let decoded = VarintDecoder::new(window.len())
            .unwrap()
            .decode(&mut cs, &vars, flag.as_ref())
            .unwrap();
        let value = cs.eval_usize(&decoded.value) as u32;
        let consumed = cs.eval_usize(&decoded.consumed) as u32;
        (MockProver::from_system(&cs), value, consumed)
    }

    #[test]
    fn test_decodes_canonical_encodings() {
        let (mock, value, consumed) = decode(&[0x05, 0xaa, 0xbb, 0xcc], None);
        assert!(mock.verify().is_ok());
        assert_eq!((value, consumed), (5, 1));

        let (mock, value, consumed) = decode(&[0x96, 0x01, 0xff, 0xff], None);
        assert!(mock.verify().is_ok());
        assert_eq!((value, consumed), (150, 2));

        let (mock, value, consumed) = decode(&[0xff, 0xff, 0xff, 0x7f], None);
        assert!(mock.verify().is_ok());
        assert_eq!((value, consumed), ((1 << 28) - 1, 4));
    }

    #[test]
    fn test_rejects_zero_padded_length() {
        // 5 encoded as 0x85 0x00
        let (mock, value, consumed) = decode(&[0x85, 0x00, 0x00, 0x00], None);
        assert_eq!((value, consumed), (5, 2));
        let failures = mock.verify().unwrap_err();
        assert!(failures.iter().any(|f| f.label == "varint canonical"));
    }

    #[test]
    fn test_rejects_unterminated_window() {
        let (mock, _, _) = decode(&[0x80, 0x80, 0x80, 0x81], None);
        let failures = mock.verify().unwrap_err();
        assert!(failures.iter().any(|f| f.label == "varint termination"));
    }

    #[test]
    fn test_disabled_decoder_accepts_any_window() {
        let (mock, _, _) = decode(&[0x80, 0x80, 0x80, 0x80], Some(false));
        assert!(mock.verify().is_ok());
        let (mock, _, _) = decode(&[0x80, 0x80, 0x80, 0x80], Some(true));
        assert!(mock.verify().is_err());
    }

    #[test]
    fn test_narrow_windows() {
        let (mock, value, _) = decode(&[0x7f], None);
        assert!(mock.verify().is_ok());
        assert_eq!(value, 127);

        let (mock, _, _) = decode(&[0x81], None);
        assert!(mock.verify().is_err());

        assert!(VarintDecoder::new(0).is_err());
        assert!(VarintDecoder::new(5).is_err());
    }

    proptest! {
        #[test]
        fn prop_matches_host_decoder(value in 0u32..(1 << 28), tail in any::<[u8; 3]>()) {
            let mut window = Vec::new();
            encode_varint(value, &mut window);
            let len = window.len();
            window.extend_from_slice(&tail);
            window.truncate(4);

            let (mock, decoded, consumed) = decode(&window, None);
            prop_assert!(mock.verify().is_ok());
            prop_assert_eq!(decoded, value);
            prop_assert_eq!(consumed as usize, len);
        }
    }
}
