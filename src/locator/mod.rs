//! Field locator circuits
//!
//! A buffer shaped like a Cosmos `TxRaw` is walked as
//!
//! ```text
//! container (0x0a) -> message (0x0a) -> type (0x0a) + payload (0x12) -> fields
//! ```
//!
//! [`FieldCircuit`] proves one field of the first message; [`MessagesCircuit`]
//! proves one field per message for an ordered list of messages that must be
//! exactly the messages of the container.

mod field;
mod messages;

pub use field::{FieldCircuit, FieldWitness};
pub use messages::{MessageAssertion, MessagesCircuit, MessagesWitness};

use p3_field::FieldAlgebra;
use p3_util::log2_ceil_usize;
use serde::{Deserialize, Serialize};

use crate::circuit::gadgets::{
    alloc_byte, from_bits, is_equal, is_less_than, mul, select, to_bits,
};
use crate::circuit::{ConstraintSystem, LinearCombination, Variable};
use crate::error::CircuitError;
use crate::gadgets::access::{AccessStrategy, Accessor, ByteAccessor, MerkleAccessor};
use crate::gadgets::hash as hash_gadget;
use crate::gadgets::walker::{ExpectedTag, WireRecord, WireStructureWalker};
use crate::hash::{self, ByteMerkleTree, Digest};
use crate::trace::PublicAssignment;
use crate::wire::{MAX_VARINT_BYTES, WIRE_TYPE_LEN};
use crate::F;

/// Fields walked per payload unless configured otherwise
pub const DEFAULT_MAX_FIELDS: usize = 4;

/// Largest index width; comparisons use one extra bit and must stay
/// within the decomposition limit
pub const MAX_INDEX_BITS: usize = 29;

/// Tags of the record grammar being walked
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireGrammar {
    /// Outer container record at offset 0 (`TxRaw.body_bytes`)
    pub container_tag: u8,
    /// Sub-message records inside the container (`TxBody.messages`)
    pub message_tag: u8,
    /// Type string, first field of a message (`Any.type_url`)
    pub type_tag: u8,
    /// Payload, last field of a message (`Any.value`)
    pub payload_tag: u8,
}

impl Default for WireGrammar {
    fn default() -> Self {
        Self {
            container_tag: 0x0a,
            message_tag: 0x0a,
            type_tag: 0x0a,
            payload_tag: 0x12,
        }
    }
}

/// How the secret buffer is tied to the public inputs
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BufferBinding {
    /// No public binding
    #[default]
    Private,
    /// Every buffer byte is also a public input
    PublicMirror,
    /// A sponge digest of the buffer is public
    Commitment,
}

/// Compile-time shape of one message assertion
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageConfig {
    /// Length of the message type string
    pub type_len: usize,
    /// Length of the asserted field value
    pub value_len: usize,
    /// Exact payload length, when known
    #[serde(default)]
    pub payload_len: Option<usize>,
    /// Upper bound on the number of payload fields
    #[serde(default = "default_max_fields")]
    pub max_fields: usize,
}

fn default_max_fields() -> usize {
    DEFAULT_MAX_FIELDS
}

impl MessageConfig {
    pub fn new(type_len: usize, value_len: usize) -> Self {
        Self {
            type_len,
            value_len,
            payload_len: None,
            max_fields: DEFAULT_MAX_FIELDS,
        }
    }

    pub fn with_payload_len(mut self, payload_len: usize) -> Self {
        self.payload_len = Some(payload_len);
        self
    }

    pub fn with_max_fields(mut self, max_fields: usize) -> Self {
        self.max_fields = max_fields;
        self
    }

    /// Smallest encoding that can satisfy this shape
    fn min_encoded_len(&self) -> usize {
        let field = 2 + self.value_len;
        let payload = self.payload_len.unwrap_or(field).max(field);
        2 + (2 + self.type_len) + (2 + payload)
    }

    fn validate(&self) -> Result<(), CircuitError> {
        if self.max_fields == 0 {
            return Err(CircuitError::InvalidMessage(
                "max_fields must be at least 1".into(),
            ));
        }
        if let Some(payload_len) = self.payload_len {
            if payload_len < self.value_len + 2 {
                return Err(CircuitError::InvalidMessage(format!(
                    "payload of {payload_len} bytes cannot hold a {} byte value",
                    self.value_len
                )));
            }
        }
        Ok(())
    }
}

/// Full circuit shape: buffer size, grammar, access and binding strategy and
/// one [`MessageConfig`] per asserted message
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocatorConfig {
    pub buffer_len: usize,
    #[serde(default)]
    pub grammar: WireGrammar,
    pub strategy: AccessStrategy,
    #[serde(default)]
    pub binding: BufferBinding,
    pub messages: Vec<MessageConfig>,
}

impl LocatorConfig {
    /// Default grammar, private binding and a size-based access strategy
    pub fn new(buffer_len: usize, messages: Vec<MessageConfig>) -> Self {
        Self {
            buffer_len,
            grammar: WireGrammar::default(),
            strategy: AccessStrategy::auto(buffer_len),
            binding: BufferBinding::Private,
            messages,
        }
    }

    pub fn with_strategy(mut self, strategy: AccessStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_binding(mut self, binding: BufferBinding) -> Self {
        self.binding = binding;
        self
    }

    pub fn with_grammar(mut self, grammar: WireGrammar) -> Self {
        self.grammar = grammar;
        self
    }

    /// Index width covering the buffer plus varint look-ahead past its end
    pub fn index_bits(&self) -> usize {
        log2_ceil_usize(self.buffer_len + MAX_VARINT_BYTES + 1)
    }

    pub fn validate(&self) -> Result<(), CircuitError> {
        if self.messages.is_empty() {
            return Err(CircuitError::EmptyMessageList);
        }
        for message in &self.messages {
            message.validate()?;
        }

        let required = 2 + self
            .messages
            .iter()
            .map(MessageConfig::min_encoded_len)
            .sum::<usize>();
        if self.buffer_len < required {
            return Err(CircuitError::BufferTooShort {
                required,
                actual: self.buffer_len,
            });
        }
        if self.index_bits() > MAX_INDEX_BITS {
            return Err(CircuitError::BufferTooLarge {
                len: self.buffer_len,
            });
        }

        self.strategy.validate(self.index_bits())?;
        if self.strategy == AccessStrategy::MerkleCommitted && self.binding != BufferBinding::Private
        {
            return Err(CircuitError::IncompatibleBinding);
        }
        Ok(())
    }

    /// Public data a verifier needs about the buffer itself
    pub fn buffer_public(&self, buffer: &[u8]) -> Result<BufferPublic, CircuitError> {
        check_buffer(self, buffer)?;
        let mut padded = buffer.to_vec();
        padded.resize(self.buffer_len, 0);

        Ok(match (self.strategy, self.binding) {
            (AccessStrategy::MerkleCommitted, _) => {
                BufferPublic::Digest(ByteMerkleTree::new(buffer, self.index_bits())?.root())
            }
            (_, BufferBinding::Private) => BufferPublic::None,
            (_, BufferBinding::PublicMirror) => BufferPublic::Mirror(padded),
            (_, BufferBinding::Commitment) => BufferPublic::Digest(hash::hash_bytes(&padded)),
        })
    }

    /// Rebuild the public input vector from public data alone, in the order
    /// the circuits allocate it: buffer binding first, then per message the
    /// field key followed by the value bytes
    pub fn public_inputs(
        &self,
        buffer: &BufferPublic,
        claims: &[FieldClaim],
    ) -> Result<PublicAssignment, CircuitError> {
        let mut values = Vec::new();
        let merkle = self.strategy == AccessStrategy::MerkleCommitted;
        match (buffer, self.binding) {
            (BufferPublic::None, BufferBinding::Private) if !merkle => {}
            (BufferPublic::Mirror(bytes), BufferBinding::PublicMirror)
                if !merkle && bytes.len() == self.buffer_len =>
            {
                values.extend(bytes.iter().map(|b| F::from_canonical_u8(*b)));
            }
            (BufferPublic::Digest(digest), BufferBinding::Commitment) if !merkle => {
                values.extend_from_slice(digest);
            }
            (BufferPublic::Digest(digest), BufferBinding::Private) if merkle => {
                values.extend_from_slice(digest);
            }
            _ => {
                return Err(CircuitError::WitnessShape(
                    "buffer public data does not match the configured binding".into(),
                ))
            }
        }

        if claims.len() != self.messages.len() {
            return Err(CircuitError::WitnessShape(format!(
                "{} claims for {} configured messages",
                claims.len(),
                self.messages.len()
            )));
        }
        for (claim, config) in claims.iter().zip(&self.messages) {
            if claim.value.len() != config.value_len {
                return Err(CircuitError::WitnessShape(format!(
                    "claimed value of {} bytes, configured {}",
                    claim.value.len(),
                    config.value_len
                )));
            }
            values.push(F::from_canonical_u8(claim.field_key));
            values.extend(claim.value.iter().map(|b| F::from_canonical_u8(*b)));
        }

        Ok(PublicAssignment::new(values))
    }
}

/// Public side of the buffer binding
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BufferPublic {
    None,
    /// Zero-padded buffer bytes
    Mirror(Vec<u8>),
    /// Sponge commitment or Merkle root
    Digest(Digest),
}

/// Public claim: the field with this key holds this value
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldClaim {
    pub field_key: u8,
    pub value: Vec<u8>,
}

/// Private location of a claimed field inside one message
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldAssertion {
    /// Message type string
    pub type_url: Vec<u8>,
    /// Offset of the field key from the start of the payload data
    pub field_offset: usize,
    pub field_key: u8,
    pub value: Vec<u8>,
}

impl FieldAssertion {
    pub fn claim(&self) -> FieldClaim {
        FieldClaim {
            field_key: self.field_key,
            value: self.value.clone(),
        }
    }

    fn check_shape(&self, config: &MessageConfig) -> Result<(), CircuitError> {
        if self.type_url.len() != config.type_len || self.value.len() != config.value_len {
            return Err(CircuitError::WitnessShape(format!(
                "type/value of {}/{} bytes, configured {}/{}",
                self.type_url.len(),
                self.value.len(),
                config.type_len,
                config.value_len
            )));
        }
        Ok(())
    }
}

fn check_buffer(config: &LocatorConfig, buffer: &[u8]) -> Result<(), CircuitError> {
    if buffer.len() > config.buffer_len {
        return Err(CircuitError::WitnessShape(format!(
            "buffer of {} bytes exceeds the configured {}",
            buffer.len(),
            config.buffer_len
        )));
    }
    Ok(())
}

/// Load the buffer according to the access strategy and bind it publicly
fn load_buffer(
    cs: &mut ConstraintSystem,
    config: &LocatorConfig,
    buffer: Option<&[u8]>,
) -> Result<Accessor, CircuitError> {
    let bits = config.index_bits();

    if config.strategy == AccessStrategy::MerkleCommitted {
        let tree = buffer.map(|b| ByteMerkleTree::new(b, bits)).transpose()?;
        return Ok(Accessor::Merkle(MerkleAccessor::new(cs, tree, bits)?));
    }

    let bytes = (0..config.buffer_len)
        .map(|i| alloc_byte(cs, buffer.and_then(|b| b.get(i)).copied().unwrap_or(0)))
        .collect::<Result<Vec<_>, _>>()?;

    match config.binding {
        BufferBinding::Private => {}
        BufferBinding::PublicMirror => {
            for byte in &bytes {
                let public = cs.alloc_public(cs.value(*byte));
                cs.enforce_equal("buffer mirror", public, *byte);
            }
        }
        BufferBinding::Commitment => {
            for lane in hash_gadget::hash_bytes(cs, &bytes) {
                let public = cs.alloc_public(cs.eval(&lane));
                cs.enforce_equal("buffer commitment", public, lane);
            }
        }
    }

    Accessor::over_bytes(config.strategy, bytes, bits)
}

/// Circuit values of one field assertion
struct AssertionVars {
    key: Variable,
    value: Vec<Variable>,
    field_offset: Variable,
    type_bytes: Vec<Variable>,
}

impl AssertionVars {
    /// Public key and value first, then the private location
    fn alloc(
        cs: &mut ConstraintSystem,
        config: &MessageConfig,
        assertion: Option<&FieldAssertion>,
    ) -> Self {
        let byte_at = |bytes: Option<&Vec<u8>>, j: usize| {
            F::from_canonical_u8(bytes.and_then(|b| b.get(j)).copied().unwrap_or(0))
        };

        let key = cs.alloc_public(F::from_canonical_u8(assertion.map_or(0, |a| a.field_key)));
        let value = (0..config.value_len)
            .map(|j| cs.alloc_public(byte_at(assertion.map(|a| &a.value), j)))
            .collect();
        let field_offset =
            cs.alloc(F::from_canonical_usize(assertion.map_or(0, |a| a.field_offset)));
        let type_bytes = (0..config.type_len)
            .map(|j| cs.alloc(byte_at(assertion.map(|a| &a.type_url), j)))
            .collect();

        Self {
            key,
            value,
            field_offset,
            type_bytes,
        }
    }
}

/// Walk the container record at offset 0
fn walk_container<A: ByteAccessor>(
    cs: &mut ConstraintSystem,
    walker: &WireStructureWalker<'_, A>,
    config: &LocatorConfig,
) -> Result<WireRecord, CircuitError> {
    let container = walker.walk(
        cs,
        &LinearCombination::zero(),
        ExpectedTag::Const(config.grammar.container_tag),
    )?;
    walker.assert_within(cs, &container, &LinearCombination::from_usize(config.buffer_len))?;
    Ok(container)
}

/// Verify one message starting at `start` and carrying the asserted field.
/// Returns the offset just past the message.
fn verify_message<A: ByteAccessor>(
    cs: &mut ConstraintSystem,
    walker: &WireStructureWalker<'_, A>,
    grammar: &WireGrammar,
    config: &MessageConfig,
    vars: &AssertionVars,
    start: &LinearCombination,
    container_end: &LinearCombination,
) -> Result<LinearCombination, CircuitError> {
    let message = walker.walk(cs, start, ExpectedTag::Const(grammar.message_tag))?;
    walker.assert_within(cs, &message, container_end)?;

    let type_record = walker.walk(cs, &message.data_start, ExpectedTag::Const(grammar.type_tag))?;
    cs.enforce_equal(
        "type length",
        type_record.length.clone(),
        LinearCombination::from_usize(config.type_len),
    );
    for (j, expected) in vars.type_bytes.iter().enumerate() {
        let byte = walker.read(cs, &type_record.data_start.clone().offset(j))?;
        cs.enforce_equal("type byte", byte, *expected);
    }

    let payload = walker.walk(
        cs,
        &type_record.data_end,
        ExpectedTag::Const(grammar.payload_tag),
    )?;
    cs.enforce_equal(
        "payload closes message",
        payload.data_end.clone(),
        message.data_end.clone(),
    );
    if let Some(len) = config.payload_len {
        cs.enforce_equal(
            "payload length",
            payload.length.clone(),
            LinearCombination::from_usize(len),
        );
    }

    // Single-byte key (bit 7 clear), length-delimited wire type
    let key_bits = to_bits(cs, &vars.key.into(), 8)?;
    cs.enforce_equal(
        "key wire type",
        from_bits(&key_bits[..3]),
        LinearCombination::from_u32(WIRE_TYPE_LEN as u32),
    );
    cs.enforce_equal("key width", key_bits[7], LinearCombination::zero());

    to_bits(cs, &vars.field_offset.into(), walker.index_bits())?;
    let field_start = payload.data_start.clone() + vars.field_offset;
    let field = walker.walk(cs, &field_start, ExpectedTag::Var(vars.key))?;
    cs.enforce_equal(
        "field length",
        field.length.clone(),
        LinearCombination::from_usize(vars.value.len()),
    );
    walker.assert_within(cs, &field, &payload.data_end)?;
    for (j, expected) in vars.value.iter().enumerate() {
        let byte = walker.read(cs, &field.data_start.clone().offset(j))?;
        cs.enforce_equal("field value byte", byte, *expected);
    }

    walk_payload_fields(cs, walker, config.max_fields, &payload, &field_start, vars.key)?;

    Ok(message.data_end)
}

/// Walk every field of the payload. Each field must have a single-byte key of
/// wire type 0 or 2, the fields must tile the payload exactly, and the claimed
/// key may appear only at the claimed offset.
fn walk_payload_fields<A: ByteAccessor>(
    cs: &mut ConstraintSystem,
    walker: &WireStructureWalker<'_, A>,
    max_fields: usize,
    payload: &WireRecord,
    field_start: &LinearCombination,
    key: Variable,
) -> Result<(), CircuitError> {
    let bits = walker.index_bits();
    let mut cursor = payload.data_start.clone();
    let mut hits = LinearCombination::zero();

    for _ in 0..max_fields {
        let active: LinearCombination =
            is_less_than(cs, &cursor, &payload.data_end, bits)?.into();

        let tag = walker.read(cs, &cursor)?;
        // Wire type 0 (varint) or 2 (length-delimited): bits 0 and 2 clear
        let tag_bits = to_bits(cs, &tag.into(), 8)?;
        cs.enforce("field wire type", &active, tag_bits[0], LinearCombination::zero());
        cs.enforce("field wire type", &active, tag_bits[2], LinearCombination::zero());
        cs.enforce("field key width", &active, tag_bits[7], LinearCombination::zero());

        // A varint field is its own value; a length-delimited one skips `length` bytes
        let length = walker.read_varint(cs, &cursor.clone().offset(1), Some(&active))?;
        let skipped = mul(cs, &tag_bits[1].into(), &length.value);
        let next = cursor.clone().offset(1) + length.consumed + skipped;

        let same_key: LinearCombination = is_equal(cs, &tag.into(), &key.into()).into();
        let at_target: LinearCombination = is_equal(cs, &cursor, field_start).into();
        let keyed = mul(cs, &active, &same_key);
        let hit = mul(cs, &active, &at_target);
        cs.enforce_equal("unique field key", keyed, hit);
        hits = hits + hit;

        cursor = select(cs, &active, &next, &cursor).into();
    }

    cs.enforce_equal("payload fully walked", cursor, payload.data_end.clone());
    cs.enforce_equal("target field walked", hits, Variable::ONE);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_validation() {
        let message = MessageConfig::new(10, 4);
        assert_eq!(
            LocatorConfig::new(64, vec![]).validate(),
            Err(CircuitError::EmptyMessageList)
        );
        assert_eq!(
            LocatorConfig::new(10, vec![message.clone()]).validate(),
            Err(CircuitError::BufferTooShort {
                required: 2 + 2 + 12 + 8,
                actual: 10
            })
        );
        assert!(matches!(
            LocatorConfig::new(64, vec![message.clone().with_max_fields(0)]).validate(),
            Err(CircuitError::InvalidMessage(_))
        ));
        assert_eq!(
            LocatorConfig::new(64, vec![message.clone()])
                .with_strategy(AccessStrategy::MerkleCommitted)
                .with_binding(BufferBinding::Commitment)
                .validate(),
            Err(CircuitError::IncompatibleBinding)
        );
        assert!(LocatorConfig::new(64, vec![message]).validate().is_ok());
    }

    #[test]
    fn test_index_bits_cover_lookahead() {
        let config = LocatorConfig::new(27, vec![MessageConfig::new(1, 1)]);
        assert_eq!(config.index_bits(), 5);
        let config = LocatorConfig::new(28, vec![MessageConfig::new(1, 1)]);
        assert_eq!(config.index_bits(), 6);
    }

    #[test]
    fn test_config_from_json() {
        let json = r#"{
            "buffer_len": 128,
            "strategy": { "kind": "chunked", "chunk_bits": 3 },
            "binding": "commitment",
            "messages": [{ "type_len": 13, "value_len": 8 }]
        }"#;
        let config: LocatorConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.grammar, WireGrammar::default());
        assert_eq!(config.strategy, AccessStrategy::Chunked { chunk_bits: 3 });
        assert_eq!(config.messages[0].max_fields, DEFAULT_MAX_FIELDS);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_public_inputs_layout() {
        let config = LocatorConfig::new(32, vec![MessageConfig::new(3, 2)])
            .with_binding(BufferBinding::PublicMirror);
        let claims = [FieldClaim {
            field_key: 0x1a,
            value: vec![7, 8],
        }];
        let public = config
            .public_inputs(&BufferPublic::Mirror(vec![1; 32]), &claims)
            .unwrap();
        assert_eq!(public.len(), 32 + 3);
        assert_eq!(public.values()[32], F::from_canonical_u8(0x1a));

        assert!(config.public_inputs(&BufferPublic::None, &claims).is_err());
        assert!(config
            .public_inputs(&BufferPublic::Mirror(vec![1; 32]), &[])
            .is_err());
    }
}
