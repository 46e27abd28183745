//! The encrypted message envelope and its JSON wire format.
//!
//! ```json
//! { "encryptedContent": "<b64>", "encryptedKey": "<b64>", "iv": "<b64>", "signature": "<b64>" }
//! ```
//!
//! All four fields are mandatory. A missing or undecodable field is a
//! [`CryptoError::Format`], which callers can tell apart from a failed
//! decryption.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use safehall_core::Signature;

use crate::aead::Nonce;
use crate::{CryptoError, Result};

/// An encrypted, signed message.
///
/// Immutable once created: fields are only readable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "WireEnvelope", into = "WireEnvelope")]
pub struct EncryptedEnvelope {
    cipher_text: Vec<u8>,
    wrapped_key: Vec<u8>,
    nonce: Nonce,
    signature: Signature,
}

impl EncryptedEnvelope {
    pub(crate) fn new(cipher_text: Vec<u8>, wrapped_key: Vec<u8>, nonce: Nonce, signature: Signature) -> Self {
        Self {
            cipher_text,
            wrapped_key,
            nonce,
            signature,
        }
    }

    /// The AEAD ciphertext (includes the authentication tag).
    pub fn cipher_text(&self) -> &[u8] {
        &self.cipher_text
    }

    /// The content key, RSA-OAEP encrypted to the recipient.
    pub fn wrapped_key(&self) -> &[u8] {
        &self.wrapped_key
    }

    /// The AEAD nonce.
    pub fn nonce(&self) -> &Nonce {
        &self.nonce
    }

    /// The sender's signature over [`cipher_text`](Self::cipher_text).
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Encode to the JSON wire format.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| CryptoError::Format(e.to_string()))
    }

    /// Decode from the JSON wire format.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| CryptoError::Format(e.to_string()))
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireEnvelope {
    encrypted_content: String,
    encrypted_key: String,
    iv: String,
    signature: String,
}

fn decode_field(name: &str, value: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(value)
        .map_err(|e| CryptoError::Format(format!("{name}: {e}")))
}

impl TryFrom<WireEnvelope> for EncryptedEnvelope {
    type Error = CryptoError;

    fn try_from(wire: WireEnvelope) -> Result<Self> {
        Ok(Self {
            cipher_text: decode_field("encryptedContent", &wire.encrypted_content)?,
            wrapped_key: decode_field("encryptedKey", &wire.encrypted_key)?,
            nonce: Nonce::from_slice(&decode_field("iv", &wire.iv)?)?,
            signature: Signature::from_bytes(decode_field("signature", &wire.signature)?),
        })
    }
}

impl From<EncryptedEnvelope> for WireEnvelope {
    fn from(envelope: EncryptedEnvelope) -> Self {
        Self {
            encrypted_content: STANDARD.encode(&envelope.cipher_text),
            encrypted_key: STANDARD.encode(&envelope.wrapped_key),
            iv: STANDARD.encode(envelope.nonce.as_bytes()),
            signature: STANDARD.encode(envelope.signature.as_bytes()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> EncryptedEnvelope {
        EncryptedEnvelope::new(
            vec![1, 2, 3, 4],
            vec![9; 256],
            Nonce::from_bytes([5; 12]),
            Signature::from_bytes(vec![7; 256]),
        )
    }

    #[test]
    fn test_wire_field_names() {
        let value: serde_json::Value = serde_json::from_str(&sample().to_json().unwrap()).unwrap();
        let obj = value.as_object().unwrap();

        let mut keys: Vec<&str> = obj.keys().map(String::as_str).collect();
        keys.sort();
        assert_eq!(keys, ["encryptedContent", "encryptedKey", "iv", "signature"]);
        assert_eq!(obj["encryptedContent"], "AQIDBA==");
    }

    #[test]
    fn test_json_roundtrip() {
        let envelope = sample();
        let recovered = EncryptedEnvelope::from_json(&envelope.to_json().unwrap()).unwrap();
        assert_eq!(recovered, envelope);
    }

    #[test]
    fn test_missing_field_is_format_error() {
        let mut value: serde_json::Value = serde_json::from_str(&sample().to_json().unwrap()).unwrap();
        for field in ["encryptedContent", "encryptedKey", "iv", "signature"] {
            let mut partial = value.clone();
            partial.as_object_mut().unwrap().remove(field);
            let result = EncryptedEnvelope::from_json(&partial.to_string());
            assert!(matches!(result, Err(CryptoError::Format(_))), "missing {field}");
        }

        value["iv"] = serde_json::Value::String("!!not base64!!".into());
        assert!(matches!(
            EncryptedEnvelope::from_json(&value.to_string()),
            Err(CryptoError::Format(_))
        ));
    }

    #[test]
    fn test_wrong_nonce_length_is_format_error() {
        let mut value: serde_json::Value = serde_json::from_str(&sample().to_json().unwrap()).unwrap();
        value["iv"] = serde_json::Value::String(STANDARD.encode([0u8; 8]));
        assert!(matches!(
            EncryptedEnvelope::from_json(&value.to_string()),
            Err(CryptoError::Format(_))
        ));
    }

    #[test]
    fn test_not_json_is_format_error() {
        assert!(matches!(EncryptedEnvelope::from_json("{"), Err(CryptoError::Format(_))));
        assert!(matches!(EncryptedEnvelope::from_json("[]"), Err(CryptoError::Format(_))));
    }
}
