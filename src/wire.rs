//! Host-side TLV codec: canonical varints, a reader for varint and
//! length-delimited records, and a small writer used to build buffers

use std::ops::Range;

use crate::error::WireError;

/// Longest varint accepted anywhere in the crate (values up to 2^28 - 1)
pub const MAX_VARINT_BYTES: usize = 4;

/// Wire type of varint fields
pub const WIRE_TYPE_VARINT: u8 = 0;

/// Wire type of length-delimited records
pub const WIRE_TYPE_LEN: u8 = 2;

/// Wire type encoded in the low three bits of a key
pub fn wire_type(key: u8) -> u8 {
    key & 0x07
}

pub fn field_number(key: u8) -> u8 {
    key >> 3
}

/// Single-byte key for a length-delimited field
pub fn len_key(field_number: u8) -> u8 {
    (field_number << 3) | WIRE_TYPE_LEN
}

/// Decode a canonical varint from the start of `data`.
///
/// Returns the value and the number of bytes consumed. Encodings longer than
/// [`MAX_VARINT_BYTES`] or with a redundant trailing zero group are rejected.
pub fn decode_varint(data: &[u8]) -> Result<(u32, usize), WireError> {
    decode_varint_at(data, 0)
}

fn decode_varint_at(data: &[u8], offset: usize) -> Result<(u32, usize), WireError> {
    let mut value = 0u32;
    for i in 0..MAX_VARINT_BYTES {
        let byte = *data
            .get(offset + i)
            .ok_or(WireError::Truncated { offset: offset + i })?;
        value |= ((byte & 0x7f) as u32) << (7 * i);
        if byte & 0x80 == 0 {
            if i > 0 && byte == 0 {
                return Err(WireError::NonCanonicalVarint { offset });
            }
            return Ok((value, i + 1));
        }
    }
    Err(WireError::VarintTooLong {
        offset,
        max: MAX_VARINT_BYTES,
    })
}

/// Append the canonical encoding of `value`
pub fn encode_varint(mut value: u32, out: &mut Vec<u8>) {
    while value >= 0x80 {
        out.push((value as u8) | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
}

pub fn varint_len(value: u32) -> usize {
    let mut len = 1;
    let mut value = value >> 7;
    while value > 0 {
        len += 1;
        value >>= 7;
    }
    len
}

/// A record: `key | varint(len) | data` for wire type 2, `key | varint` for
/// wire type 0
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    /// Offset of the key byte
    pub offset: usize,
    pub key: u8,
    /// Absolute span of the record data. For a varint record this is the
    /// encoded varint itself.
    pub data: Range<usize>,
}

impl Record {
    pub fn end(&self) -> usize {
        self.data.end
    }

    pub fn is_len(&self) -> bool {
        wire_type(self.key) == WIRE_TYPE_LEN
    }
}

/// Read the record at `offset`, bounded by `limit`
pub fn read_record(buf: &[u8], offset: usize, limit: usize) -> Result<Record, WireError> {
    let key = *buf.get(offset).ok_or(WireError::Truncated { offset })?;
    if key & 0x80 != 0 {
        return Err(WireError::UnsupportedKey { offset });
    }

    let (value, consumed) = match wire_type(key) {
        WIRE_TYPE_VARINT | WIRE_TYPE_LEN => decode_varint_at(buf, offset + 1)?,
        other => {
            return Err(WireError::UnsupportedWireType {
                offset,
                wire_type: other,
            })
        }
    };
    let start = offset + 1 + consumed;
    let data = if wire_type(key) == WIRE_TYPE_LEN {
        start..start + value as usize
    } else {
        offset + 1..start
    };
    if data.end > limit {
        return Err(WireError::Overrun {
            offset,
            end: data.end,
            limit,
        });
    }

    Ok(Record { offset, key, data })
}

/// Iterator over consecutive records in `buf[range]`
pub struct RecordReader<'a> {
    buf: &'a [u8],
    pos: usize,
    end: usize,
    failed: bool,
}

impl<'a> RecordReader<'a> {
    pub fn new(buf: &'a [u8], range: Range<usize>) -> Self {
        Self {
            buf,
            pos: range.start,
            end: range.end,
            failed: false,
        }
    }
}

impl Iterator for RecordReader<'_> {
    type Item = Result<Record, WireError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.pos >= self.end {
            return None;
        }
        match read_record(self.buf, self.pos, self.end) {
            Ok(record) => {
                self.pos = record.end();
                Some(Ok(record))
            }
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}

/// Builder for length-delimited record sequences
#[derive(Clone, Debug, Default)]
pub struct WireWriter {
    buf: Vec<u8>,
}

impl WireWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bytes(mut self, key: u8, data: &[u8]) -> Self {
        self.buf.push(key);
        encode_varint(data.len() as u32, &mut self.buf);
        self.buf.extend_from_slice(data);
        self
    }

    /// Varint field; `key` should carry wire type 0
    pub fn varint(mut self, key: u8, value: u32) -> Self {
        self.buf.push(key);
        encode_varint(value, &mut self.buf);
        self
    }

    pub fn nested(self, key: u8, inner: WireWriter) -> Self {
        let data = inner.finish();
        self.bytes(key, &data)
    }

    /// Append raw bytes without framing
    pub fn raw(mut self, data: &[u8]) -> Self {
        self.buf.extend_from_slice(data);
        self
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_decode_varint() {
        assert_eq!(decode_varint(&[0x00]), Ok((0, 1)));
        assert_eq!(decode_varint(&[0x7f]), Ok((127, 1)));
        assert_eq!(decode_varint(&[0x96, 0x01]), Ok((150, 2)));
        assert_eq!(decode_varint(&[0xff, 0xff, 0xff, 0x7f]), Ok(((1 << 28) - 1, 4)));
    }

    #[test]
    fn test_decode_varint_rejects_bad_encodings() {
        assert_eq!(
            decode_varint(&[0x80, 0x00]),
            Err(WireError::NonCanonicalVarint { offset: 0 })
        );
        assert_eq!(
            decode_varint(&[0x80, 0x80, 0x80, 0x80, 0x01]),
            Err(WireError::VarintTooLong { offset: 0, max: 4 })
        );
        assert_eq!(decode_varint(&[0x80]), Err(WireError::Truncated { offset: 1 }));
    }

    #[test]
    fn test_keys() {
        assert_eq!(len_key(1), 0x0a);
        assert_eq!(len_key(2), 0x12);
        assert_eq!(len_key(3), 0x1a);
        assert_eq!(wire_type(0x1a), WIRE_TYPE_LEN);
        assert_eq!(field_number(0x1a), 3);
    }

    #[test]
    fn test_reader_walks_records() {
        let buf = WireWriter::new()
            .bytes(0x0a, b"alice")
            .bytes(0x12, &[0u8; 200])
            .finish();
        let records: Vec<_> = RecordReader::new(&buf, 0..buf.len())
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].data, 2..7);
        assert_eq!(records[1].offset, 7);
        assert_eq!(records[1].data, 10..210);
    }

    #[test]
    fn test_reader_rejects_overrun_and_other_wire_types() {
        let buf = [0x0a, 0x05, b'a'];
        let err = RecordReader::new(&buf, 0..3).next().unwrap().unwrap_err();
        assert_eq!(err, WireError::Overrun { offset: 0, end: 7, limit: 3 });

        let buf = [0x0d, 0x01, 0x00, 0x00, 0x00];
        let err = RecordReader::new(&buf, 0..5).next().unwrap().unwrap_err();
        assert_eq!(err, WireError::UnsupportedWireType { offset: 0, wire_type: 5 });

        let buf = [0x08, 0x96];
        let err = RecordReader::new(&buf, 0..2).next().unwrap().unwrap_err();
        assert_eq!(err, WireError::Truncated { offset: 2 });
    }

    #[test]
    fn test_reader_spans_varint_fields() {
        let buf = WireWriter::new()
            .varint(0x08, 150)
            .bytes(0x12, b"voter")
            .varint(0x18, 1)
            .finish();
        let records: Vec<_> = RecordReader::new(&buf, 0..buf.len())
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].data, 1..3);
        assert!(!records[0].is_len());
        assert_eq!(records[1].offset, 3);
        assert!(records[1].is_len());
        assert_eq!(records[2].offset, 10);
        assert_eq!(records[2].end(), buf.len());
    }

    proptest! {
        #[test]
        fn prop_varint_roundtrip_is_canonical(value in 0u32..(1 << 28)) {
            let mut buf = Vec::new();
            encode_varint(value, &mut buf);
            prop_assert_eq!(buf.len(), varint_len(value));
            prop_assert_eq!(decode_varint(&buf), Ok((value, buf.len())));
        }

        #[test]
        fn prop_zero_padded_varints_rejected(value in 0u32..(1 << 14)) {
            let mut buf = Vec::new();
            encode_varint(value, &mut buf);
            let last = buf.len() - 1;
            buf[last] |= 0x80;
            buf.push(0x00);
            prop_assert!(decode_varint(&buf).is_err());
        }
    }
}
