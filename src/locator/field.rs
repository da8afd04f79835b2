//! Single-message field locator

use serde::{Deserialize, Serialize};

use super::{
    check_buffer, load_buffer, verify_message, walk_container, AssertionVars, FieldAssertion,
    LocatorConfig,
};
use crate::circuit::{Circuit, ConstraintSystem};
use crate::error::CircuitError;
use crate::gadgets::varint::VarintDecoder;
use crate::gadgets::walker::WireStructureWalker;

/// Private inputs of a [`FieldCircuit`]
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FieldWitness {
    pub buffer: Vec<u8>,
    pub field: FieldAssertion,
}

/// Proves that the first message of the container carries a field with the
/// public key and value
#[derive(Clone, Debug)]
pub struct FieldCircuit {
    config: LocatorConfig,
    witness: Option<FieldWitness>,
}

impl FieldCircuit {
    /// Shape-only circuit, used for compilation and verification
    pub fn new(config: LocatorConfig) -> Result<Self, CircuitError> {
        config.validate()?;
        if config.messages.len() != 1 {
            return Err(CircuitError::InvalidMessage(format!(
                "single-field circuit takes one message configuration, got {}",
                config.messages.len()
            )));
        }
        Ok(Self {
            config,
            witness: None,
        })
    }

    pub fn with_witness(config: LocatorConfig, witness: FieldWitness) -> Result<Self, CircuitError> {
        let mut circuit = Self::new(config)?;
        check_buffer(&circuit.config, &witness.buffer)?;
        witness.field.check_shape(&circuit.config.messages[0])?;
        circuit.witness = Some(witness);
        Ok(circuit)
    }

    pub fn config(&self) -> &LocatorConfig {
        &self.config
    }

    pub fn witness(&self) -> Option<&FieldWitness> {
        self.witness.as_ref()
    }
}

impl Circuit for FieldCircuit {
    fn synthesize(&self, cs: &mut ConstraintSystem) -> Result<(), CircuitError> {
        let buffer = self.witness.as_ref().map(|w| w.buffer.as_slice());
        let accessor = load_buffer(cs, &self.config, buffer)?;
        let walker = WireStructureWalker::new(&accessor, VarintDecoder::default());

        let message = &self.config.messages[0];
        let vars = AssertionVars::alloc(cs, message, self.witness.as_ref().map(|w| &w.field));

        let container = walk_container(cs, &walker, &self.config)?;
        verify_message(
            cs,
            &walker,
            &self.config.grammar,
            message,
            &vars,
            &container.data_start,
            &container.data_end,
        )?;
        Ok(())
    }
}
