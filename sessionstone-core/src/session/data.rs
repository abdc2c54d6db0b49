//! Session payload and store coders
//!
//! A [`SessionData`] is what actually reaches the store: application values,
//! the flash namespace and the renewal stamp. Maps are ordered so the same
//! data always encodes to the same bytes, which is what change detection
//! compares.

use super::error::{Result, SessionError};
use super::value::Value;
use bincode::config::standard;
use bincode::serde::{decode_from_slice, encode_to_vec};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Renewal stamp that freezes a session identity (set on retiring records)
pub const NEVER_RENEW: i64 = -1;

/// Encoded form of a session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    #[serde(default)]
    pub values: BTreeMap<String, Value>,

    #[serde(default)]
    pub flash: BTreeMap<String, Value>,

    /// Unix seconds of the last identifier renewal, or [`NEVER_RENEW`]
    #[serde(default)]
    pub renewed_at: Option<i64>,
}

impl SessionData {
    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.flash.is_empty() && self.renewed_at.is_none()
    }
}

/// Encode/decode capability used between sessions and stores
pub trait StoreCoder: Send + Sync {
    fn encode(&self, data: &SessionData) -> Result<Vec<u8>>;

    fn decode(&self, bytes: &[u8]) -> Result<SessionData>;
}

/// Compact binary coder (default)
#[derive(Debug, Clone, Copy, Default)]
pub struct BincodeCoder;

impl StoreCoder for BincodeCoder {
    fn encode(&self, data: &SessionData) -> Result<Vec<u8>> {
        encode_to_vec(data, standard()).map_err(|e| SessionError::Codec(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<SessionData> {
        decode_from_slice(bytes, standard())
            .map(|(data, _)| data)
            .map_err(|e| SessionError::Codec(e.to_string()))
    }
}

/// Human-readable JSON coder, handy when inspecting a store by hand
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCoder;

impl StoreCoder for JsonCoder {
    fn encode(&self, data: &SessionData) -> Result<Vec<u8>> {
        serde_json::to_vec(data).map_err(|e| SessionError::Codec(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<SessionData> {
        serde_json::from_slice(bytes).map_err(|e| SessionError::Codec(e.to_string()))
    }
}

/// Encode `data`; an empty session is always the empty payload
pub(crate) fn encode_payload(coder: &dyn StoreCoder, data: &SessionData) -> Result<Vec<u8>> {
    if data.is_empty() {
        return Ok(Vec::new());
    }
    coder.encode(data)
}

pub(crate) fn decode_payload(coder: &dyn StoreCoder, bytes: &[u8]) -> Result<SessionData> {
    if bytes.is_empty() {
        return Ok(SessionData::default());
    }
    coder.decode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_kinds() -> SessionData {
        let mut data = SessionData::default();
        let values = &mut data.values;
        values.insert("string".into(), Value::from("text"));
        values.insert("true".into(), Value::from(true));
        values.insert("false".into(), Value::from(false));
        values.insert("i8".into(), Value::from(-8i8));
        values.insert("i16".into(), Value::from(-16i16));
        values.insert("i32".into(), Value::from(-32i32));
        values.insert("i64".into(), Value::from(i64::MIN));
        values.insert("u8".into(), Value::from(8u8));
        values.insert("u16".into(), Value::from(16u16));
        values.insert("u32".into(), Value::from(32u32));
        values.insert("u64".into(), Value::from(u64::MAX));
        values.insert("f32".into(), Value::from(1.3f32));
        values.insert("f64".into(), Value::from(1.5f64));
        values.insert("bytes".into(), Value::from(vec![0u8, 255]));
        data.flash.insert("notice".into(), Value::from("saved"));
        data.renewed_at = Some(1_700_000_000);
        data
    }

    #[test]
    fn test_bincode_preserves_every_value_kind() {
        let data = all_kinds();
        let bytes = BincodeCoder.encode(&data).unwrap();
        let decoded = BincodeCoder.decode(&bytes).unwrap();
        assert_eq!(decoded, data);
        // Widths survive, not just numeric values
        assert_eq!(decoded.values["f32"], Value::F32(1.3));
        assert_eq!(decoded.values["u16"], Value::U16(16));
    }

    #[test]
    fn test_json_preserves_every_value_kind() {
        let data = all_kinds();
        let bytes = JsonCoder.encode(&data).unwrap();
        assert_eq!(JsonCoder.decode(&bytes).unwrap(), data);
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let mut a = SessionData::default();
        a.values.insert("b".into(), Value::from(2i64));
        a.values.insert("a".into(), Value::from(1i64));
        let mut b = SessionData::default();
        b.values.insert("a".into(), Value::from(1i64));
        b.values.insert("b".into(), Value::from(2i64));
        assert_eq!(BincodeCoder.encode(&a).unwrap(), BincodeCoder.encode(&b).unwrap());
    }

    #[test]
    fn test_empty_session_is_empty_payload() {
        let coder = BincodeCoder;
        assert!(encode_payload(&coder, &SessionData::default()).unwrap().is_empty());
        assert_eq!(decode_payload(&coder, &[]).unwrap(), SessionData::default());
    }

    #[test]
    fn test_garbage_fails_to_decode() {
        assert!(BincodeCoder.decode(&[0xff, 0xff, 0xff]).is_err());
        assert!(JsonCoder.decode(b"not json").is_err());
    }
}
