//! Host-side witness preparation
//!
//! Parses a buffer with the canonical decoder in [`crate::wire`], locates the
//! messages of the container and the fields of their payloads, and builds
//! populated locator circuits together with the public data a verifier needs.

use std::ops::Range;

use tracing::{debug, instrument};

use crate::error::{WireError, WitnessError};
use crate::gadgets::access::AccessStrategy;
use crate::locator::{
    BufferBinding, BufferPublic, FieldAssertion, FieldCircuit, FieldClaim, FieldWitness,
    LocatorConfig, MessageAssertion, MessageConfig, MessagesCircuit, MessagesWitness,
    WireGrammar, DEFAULT_MAX_FIELDS,
};
use crate::wire::{self, Record, RecordReader};

/// A message record located in the container
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageView {
    /// Offset of the message key
    pub body_offset: usize,
    /// Offset just past the message
    pub end: usize,
    pub type_url: Vec<u8>,
    /// Absolute span of the payload data
    pub payload: Range<usize>,
}

/// A populated circuit with the public data that accompanies it
#[derive(Clone, Debug)]
pub struct Prepared<C> {
    pub circuit: C,
    pub config: LocatorConfig,
    pub buffer_public: BufferPublic,
    pub claims: Vec<FieldClaim>,
}

pub struct WitnessBuilder<'a> {
    buffer: &'a [u8],
    grammar: WireGrammar,
    body: Range<usize>,
    messages: Vec<MessageView>,
    pad_to: Option<usize>,
    strategy: Option<AccessStrategy>,
    binding: BufferBinding,
    max_fields: Option<usize>,
}

impl<'a> WitnessBuilder<'a> {
    pub fn new(buffer: &'a [u8]) -> Result<Self, WireError> {
        Self::with_grammar(buffer, WireGrammar::default())
    }

    #[instrument(skip_all, fields(len = buffer.len()))]
    pub fn with_grammar(buffer: &'a [u8], grammar: WireGrammar) -> Result<Self, WireError> {
        let container = expect_record(buffer, 0, buffer.len(), grammar.container_tag)?;
        let body = container.data.clone();

        let mut messages = Vec::new();
        let mut pos = body.start;
        // Messages come first in the container; anything after them is left unparsed
        while pos < body.end && buffer[pos] == grammar.message_tag {
            let message = wire::read_record(buffer, pos, body.end)?;
            let type_record =
                expect_record(buffer, message.data.start, message.end(), grammar.type_tag)?;
            let payload =
                expect_record(buffer, type_record.end(), message.end(), grammar.payload_tag)?;
            if payload.end() != message.end() {
                return Err(WireError::TrailingData {
                    offset: payload.end(),
                });
            }

            messages.push(MessageView {
                body_offset: pos,
                end: message.end(),
                type_url: buffer[type_record.data].to_vec(),
                payload: payload.data,
            });
            pos = message.end();
        }
        debug!(messages = messages.len(), body_len = body.len(), "parsed container");

        Ok(Self {
            buffer,
            grammar,
            body,
            messages,
            pad_to: None,
            strategy: None,
            binding: BufferBinding::Private,
            max_fields: None,
        })
    }

    /// Size the circuit for `len` bytes instead of the exact buffer length
    pub fn pad_to(mut self, len: usize) -> Self {
        self.pad_to = Some(len);
        self
    }

    pub fn strategy(mut self, strategy: AccessStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn binding(mut self, binding: BufferBinding) -> Self {
        self.binding = binding;
        self
    }

    /// Fix the per-payload field bound instead of deriving it from the data
    pub fn max_fields(mut self, max_fields: usize) -> Self {
        self.max_fields = Some(max_fields);
        self
    }

    pub fn buffer(&self) -> &[u8] {
        self.buffer
    }

    /// Span of the container data
    pub fn body(&self) -> Range<usize> {
        self.body.clone()
    }

    pub fn messages(&self) -> &[MessageView] {
        &self.messages
    }

    pub fn message(&self, index: usize) -> Result<&MessageView, WireError> {
        self.messages.get(index).ok_or(WireError::MessageNotFound {
            index,
            count: self.messages.len(),
        })
    }

    /// Records of a message payload
    pub fn fields(&self, index: usize) -> Result<Vec<Record>, WireError> {
        let message = self.message(index)?;
        RecordReader::new(self.buffer, message.payload.clone()).collect()
    }

    /// Locate `field_key` in message `index`. When the key repeats, the last
    /// occurrence is the one a reference decoder keeps; the circuit rejects
    /// such payloads regardless of the occurrence chosen.
    pub fn field_assertion(&self, index: usize, field_key: u8) -> Result<FieldAssertion, WireError> {
        let message = self.message(index)?;
        let field = self
            .fields(index)?
            .into_iter()
            .filter(|f| f.key == field_key)
            .last()
            .ok_or(WireError::FieldNotFound {
                message: index,
                key: field_key,
            })?;
        // Only length-delimited fields carry a byte value to assert
        if !field.is_len() {
            return Err(WireError::UnsupportedWireType {
                offset: field.offset,
                wire_type: wire::wire_type(field_key),
            });
        }

        Ok(FieldAssertion {
            type_url: message.type_url.clone(),
            field_offset: field.offset - message.payload.start,
            field_key,
            value: self.buffer[field.data].to_vec(),
        })
    }

    pub fn message_assertion(
        &self,
        index: usize,
        field_key: u8,
    ) -> Result<MessageAssertion, WireError> {
        Ok(MessageAssertion {
            body_offset: self.message(index)?.body_offset,
            field: self.field_assertion(index, field_key)?,
        })
    }

    /// Circuit shape for `(message index, assertion)` pairs. Unless fixed
    /// with [`Self::max_fields`], each field walk is sized by the fields of
    /// the message it targets.
    pub fn locator_config(
        &self,
        targets: &[(usize, &FieldAssertion)],
    ) -> Result<LocatorConfig, WireError> {
        let messages = targets
            .iter()
            .map(|(index, assertion)| -> Result<MessageConfig, WireError> {
                let max_fields = match self.max_fields {
                    Some(n) => n,
                    None => self.fields(*index)?.len().max(DEFAULT_MAX_FIELDS),
                };
                Ok(MessageConfig::new(assertion.type_url.len(), assertion.value.len())
                    .with_max_fields(max_fields))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let buffer_len = self.pad_to.unwrap_or(self.buffer.len()).max(self.buffer.len());
        Ok(LocatorConfig::new(buffer_len, messages)
            .with_grammar(self.grammar)
            .with_strategy(self.strategy.unwrap_or_else(|| AccessStrategy::auto(buffer_len)))
            .with_binding(self.binding))
    }

    /// Index of the message whose key sits at `body_offset`
    fn message_at(&self, body_offset: usize) -> Option<usize> {
        self.messages
            .iter()
            .position(|m| m.body_offset == body_offset)
    }

    /// Single-field circuit over the first message
    pub fn field_circuit(&self, field_key: u8) -> Result<Prepared<FieldCircuit>, WitnessError> {
        let field = self.field_assertion(0, field_key)?;
        let config = self.locator_config(&[(0, &field)])?;
        let buffer_public = config.buffer_public(self.buffer)?;
        let claims = vec![field.claim()];

        let circuit = FieldCircuit::with_witness(
            config.clone(),
            FieldWitness {
                buffer: self.buffer.to_vec(),
                field,
            },
        )?;
        Ok(Prepared {
            circuit,
            config,
            buffer_public,
            claims,
        })
    }

    /// Ordered circuit asserting `field_keys[i]` in message `i`
    #[instrument(skip(self))]
    pub fn messages_circuit(
        &self,
        field_keys: &[u8],
    ) -> Result<Prepared<MessagesCircuit>, WitnessError> {
        let assertions = field_keys
            .iter()
            .enumerate()
            .map(|(i, key)| self.message_assertion(i, *key))
            .collect::<Result<Vec<_>, _>>()?;
        self.prepare_messages(assertions)
    }

    /// Build a circuit from explicit assertions, without checking them
    /// against the parsed structure
    pub fn prepare_messages(
        &self,
        assertions: Vec<MessageAssertion>,
    ) -> Result<Prepared<MessagesCircuit>, WitnessError> {
        // An offset that starts no parsed message keeps its position's index
        let targets: Vec<(usize, &FieldAssertion)> = assertions
            .iter()
            .enumerate()
            .map(|(i, a)| (self.message_at(a.body_offset).unwrap_or(i), &a.field))
            .collect();
        let config = self.locator_config(&targets)?;
        let buffer_public = config.buffer_public(self.buffer)?;
        let claims = assertions.iter().map(|a| a.field.claim()).collect();

        let circuit = MessagesCircuit::with_witness(
            config.clone(),
            MessagesWitness {
                buffer: self.buffer.to_vec(),
                assertions,
            },
        )?;
        debug!(
            buffer_len = config.buffer_len,
            messages = config.messages.len(),
            "prepared messages circuit"
        );
        Ok(Prepared {
            circuit,
            config,
            buffer_public,
            claims,
        })
    }
}

fn expect_record(buf: &[u8], offset: usize, limit: usize, tag: u8) -> Result<Record, WireError> {
    let record = wire::read_record(buf, offset, limit)?;
    if record.key != tag {
        return Err(WireError::UnexpectedTag {
            offset,
            expected: tag,
            found: record.key,
        });
    }
    Ok(record)
}
