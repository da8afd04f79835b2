//! Ordered multi-message field locator
//!
//! Message `i` must start exactly where message `i - 1` ended (the first at
//! the container data start), and after the last asserted message the
//! container must either end or continue with something that is not a
//! message. Skipping, reordering or omitting messages is unsatisfiable.

use p3_field::FieldAlgebra;
use serde::{Deserialize, Serialize};

use super::{
    check_buffer, load_buffer, verify_message, walk_container, AssertionVars, FieldAssertion,
    LocatorConfig,
};
use crate::circuit::gadgets::{is_equal, to_bits};
use crate::circuit::{Circuit, ConstraintSystem, LinearCombination, Variable};
use crate::error::CircuitError;
use crate::gadgets::varint::VarintDecoder;
use crate::gadgets::walker::WireStructureWalker;
use crate::F;

/// One entry of the ordered message list
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageAssertion {
    /// Offset of the message key within the buffer
    pub body_offset: usize,
    pub field: FieldAssertion,
}

/// Private inputs of a [`MessagesCircuit`]
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MessagesWitness {
    pub buffer: Vec<u8>,
    pub assertions: Vec<MessageAssertion>,
}

#[derive(Clone, Debug)]
pub struct MessagesCircuit {
    config: LocatorConfig,
    witness: Option<MessagesWitness>,
}

impl MessagesCircuit {
    pub fn new(config: LocatorConfig) -> Result<Self, CircuitError> {
        config.validate()?;
        Ok(Self {
            config,
            witness: None,
        })
    }

    pub fn with_witness(
        config: LocatorConfig,
        witness: MessagesWitness,
    ) -> Result<Self, CircuitError> {
        let mut circuit = Self::new(config)?;
        check_buffer(&circuit.config, &witness.buffer)?;
        if witness.assertions.len() != circuit.config.messages.len() {
            return Err(CircuitError::WitnessShape(format!(
                "{} assertions for {} configured messages",
                witness.assertions.len(),
                circuit.config.messages.len()
            )));
        }
        for (assertion, message) in witness.assertions.iter().zip(&circuit.config.messages) {
            assertion.field.check_shape(message)?;
        }
        circuit.witness = Some(witness);
        Ok(circuit)
    }

    pub fn config(&self) -> &LocatorConfig {
        &self.config
    }

    pub fn witness(&self) -> Option<&MessagesWitness> {
        self.witness.as_ref()
    }
}

impl Circuit for MessagesCircuit {
    fn synthesize(&self, cs: &mut ConstraintSystem) -> Result<(), CircuitError> {
        let buffer = self.witness.as_ref().map(|w| w.buffer.as_slice());
        let accessor = load_buffer(cs, &self.config, buffer)?;
        let walker = WireStructureWalker::new(&accessor, VarintDecoder::default());
        let bits = walker.index_bits();

        let assertions: Vec<(AssertionVars, Variable)> = self
            .config
            .messages
            .iter()
            .enumerate()
            .map(|(i, message)| {
                let assertion = self.witness.as_ref().and_then(|w| w.assertions.get(i));
                let vars = AssertionVars::alloc(cs, message, assertion.map(|a| &a.field));
                let offset = assertion.map_or(0, |a| a.body_offset);
                (vars, cs.alloc(F::from_canonical_usize(offset)))
            })
            .collect();

        let container = walk_container(cs, &walker, &self.config)?;

        let mut cursor = container.data_start.clone();
        for ((vars, body_offset), message) in assertions.iter().zip(&self.config.messages) {
            to_bits(cs, &(*body_offset).into(), bits)?;
            cs.enforce_equal("message order", *body_offset, cursor.clone());
            cursor = verify_message(
                cs,
                &walker,
                &self.config.grammar,
                message,
                vars,
                &(*body_offset).into(),
                &container.data_end,
            )?;
        }

        // Nothing after the last asserted message may be another message
        let at_end = is_equal(cs, &cursor, &container.data_end);
        let next = walker.read(cs, &cursor)?;
        let another = is_equal(
            cs,
            &next.into(),
            &LinearCombination::from_u32(self.config.grammar.message_tag as u32),
        );
        cs.enforce(
            "no trailing message",
            LinearCombination::from(Variable::ONE) - at_end,
            another,
            LinearCombination::zero(),
        );
        Ok(())
    }
}
