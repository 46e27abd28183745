//! Hybrid encrypt/decrypt.

use safehall_core::{PrivateKey, PublicKey};

use crate::aead::{ContentKey, Nonce};
use crate::envelope::EncryptedEnvelope;
use crate::{CryptoError, Result};

/// Composes RSA and ChaCha20-Poly1305 into authenticated message encryption.
///
/// Stateless; every call draws fresh randomness.
#[derive(Debug, Clone, Copy, Default)]
pub struct HybridCipher;

impl HybridCipher {
    /// Encrypt `plaintext` for `recipient`, signed by `sender`.
    pub fn encrypt(plaintext: &[u8], recipient: &PublicKey, sender: &PrivateKey) -> Result<EncryptedEnvelope> {
        let key = ContentKey::generate();
        let nonce = Nonce::generate();

        let cipher_text = key.encrypt(plaintext, &nonce)?;
        let wrapped_key = recipient.encrypt(key.as_bytes())?;
        let signature = sender.sign(&cipher_text)?;

        Ok(EncryptedEnvelope::new(cipher_text, wrapped_key, nonce, signature))
    }

    /// Verify and decrypt an envelope.
    ///
    /// The signature is checked before any key material is touched.
    pub fn decrypt(envelope: &EncryptedEnvelope, recipient: &PrivateKey, sender: &PublicKey) -> Result<Vec<u8>> {
        if !sender.verify(envelope.cipher_text(), envelope.signature()) {
            return Err(CryptoError::SignatureInvalid);
        }

        let key = ContentKey::from_slice(&recipient.decrypt(envelope.wrapped_key())?)?;
        key.decrypt(envelope.cipher_text(), envelope.nonce())
    }

    /// [`decrypt`](Self::decrypt), then require UTF-8.
    pub fn decrypt_text(envelope: &EncryptedEnvelope, recipient: &PrivateKey, sender: &PublicKey) -> Result<String> {
        let bytes = Self::decrypt(envelope, recipient, sender)?;
        String::from_utf8(bytes).map_err(|_| CryptoError::Format("plaintext is not valid UTF-8".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use safehall_core::{KeyPair, Signature};
    use std::sync::OnceLock;

    fn keys() -> &'static [KeyPair; 3] {
        static KEYS: OnceLock<[KeyPair; 3]> = OnceLock::new();
        KEYS.get_or_init(|| {
            [
                KeyPair::generate().unwrap(),
                KeyPair::generate().unwrap(),
                KeyPair::generate().unwrap(),
            ]
        })
    }

    fn alice() -> &'static KeyPair {
        &keys()[0]
    }

    fn bob() -> &'static KeyPair {
        &keys()[1]
    }

    fn mallory() -> &'static KeyPair {
        &keys()[2]
    }

    #[test]
    fn test_roundtrip() {
        let envelope = HybridCipher::encrypt(b"meet at the library", bob().public_key(), alice().private_key()).unwrap();
        let plaintext = HybridCipher::decrypt(&envelope, bob().private_key(), alice().public_key()).unwrap();
        assert_eq!(plaintext, b"meet at the library");
    }

    #[test]
    fn test_large_plaintext_roundtrip() {
        let big = vec![0xabu8; 64 * 1024];
        let envelope = HybridCipher::encrypt(&big, bob().public_key(), alice().private_key()).unwrap();
        assert_eq!(
            HybridCipher::decrypt(&envelope, bob().private_key(), alice().public_key()).unwrap(),
            big
        );
    }

    #[test]
    fn test_wrong_sender_key_is_signature_invalid() {
        let envelope = HybridCipher::encrypt(b"hi", bob().public_key(), alice().private_key()).unwrap();
        assert_eq!(
            HybridCipher::decrypt(&envelope, bob().private_key(), mallory().public_key()),
            Err(CryptoError::SignatureInvalid)
        );
    }

    #[test]
    fn test_wrong_recipient_key_is_key_mismatch() {
        let envelope = HybridCipher::encrypt(b"hi", bob().public_key(), alice().private_key()).unwrap();
        assert_eq!(
            HybridCipher::decrypt(&envelope, mallory().private_key(), alice().public_key()),
            Err(CryptoError::KeyMismatch)
        );
    }

    #[test]
    fn test_signature_checked_before_key_unwrap() {
        // Both keys wrong: the signature failure must win.
        let envelope = HybridCipher::encrypt(b"hi", bob().public_key(), alice().private_key()).unwrap();
        assert_eq!(
            HybridCipher::decrypt(&envelope, mallory().private_key(), mallory().public_key()),
            Err(CryptoError::SignatureInvalid)
        );
    }

    #[test]
    fn test_tampered_ciphertext_fails_signature() {
        let envelope = HybridCipher::encrypt(b"hi", bob().public_key(), alice().private_key()).unwrap();
        let mut cipher_text = envelope.cipher_text().to_vec();
        cipher_text[0] ^= 0xff;
        let tampered = EncryptedEnvelope::new(
            cipher_text,
            envelope.wrapped_key().to_vec(),
            *envelope.nonce(),
            envelope.signature().clone(),
        );

        assert_eq!(
            HybridCipher::decrypt(&tampered, bob().private_key(), alice().public_key()),
            Err(CryptoError::SignatureInvalid)
        );
    }

    #[test]
    fn test_resigned_tampered_ciphertext_is_tamper_detected() {
        // An attacker holding the sender key re-signs a corrupted body.
        let envelope = HybridCipher::encrypt(b"hi", bob().public_key(), alice().private_key()).unwrap();
        let mut cipher_text = envelope.cipher_text().to_vec();
        cipher_text[0] ^= 0xff;
        let signature = alice().private_key().sign(&cipher_text).unwrap();
        let tampered = EncryptedEnvelope::new(cipher_text, envelope.wrapped_key().to_vec(), *envelope.nonce(), signature);

        assert_eq!(
            HybridCipher::decrypt(&tampered, bob().private_key(), alice().public_key()),
            Err(CryptoError::TamperDetected)
        );
    }

    #[test]
    fn test_swapped_nonce_is_tamper_detected() {
        let envelope = HybridCipher::encrypt(b"hi", bob().public_key(), alice().private_key()).unwrap();
        let swapped = EncryptedEnvelope::new(
            envelope.cipher_text().to_vec(),
            envelope.wrapped_key().to_vec(),
            Nonce::from_bytes([0u8; 12]),
            envelope.signature().clone(),
        );

        assert_eq!(
            HybridCipher::decrypt(&swapped, bob().private_key(), alice().public_key()),
            Err(CryptoError::TamperDetected)
        );
    }

    #[test]
    fn test_garbage_signature_is_signature_invalid() {
        let envelope = HybridCipher::encrypt(b"hi", bob().public_key(), alice().private_key()).unwrap();
        let forged = EncryptedEnvelope::new(
            envelope.cipher_text().to_vec(),
            envelope.wrapped_key().to_vec(),
            *envelope.nonce(),
            Signature::from_bytes(vec![0u8; 3]),
        );
        assert_eq!(
            HybridCipher::decrypt(&forged, bob().private_key(), alice().public_key()),
            Err(CryptoError::SignatureInvalid)
        );
    }

    #[test]
    fn test_envelopes_are_unique_per_call() {
        let e1 = HybridCipher::encrypt(b"same", bob().public_key(), alice().private_key()).unwrap();
        let e2 = HybridCipher::encrypt(b"same", bob().public_key(), alice().private_key()).unwrap();
        assert_ne!(e1.cipher_text(), e2.cipher_text());
        assert_ne!(e1.nonce(), e2.nonce());
    }

    #[test]
    fn test_decrypt_text_rejects_non_utf8() {
        let envelope = HybridCipher::encrypt(&[0xff, 0xfe], bob().public_key(), alice().private_key()).unwrap();
        assert!(matches!(
            HybridCipher::decrypt_text(&envelope, bob().private_key(), alice().public_key()),
            Err(CryptoError::Format(_))
        ));
    }

    #[test]
    fn test_roundtrip_through_json() {
        let envelope = HybridCipher::encrypt("héllo ✓".as_bytes(), bob().public_key(), alice().private_key()).unwrap();
        let received = EncryptedEnvelope::from_json(&envelope.to_json().unwrap()).unwrap();
        assert_eq!(
            HybridCipher::decrypt_text(&received, bob().private_key(), alice().public_key()).unwrap(),
            "héllo ✓"
        );
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn prop_roundtrip(plaintext in proptest::collection::vec(any::<u8>(), 0..2048)) {
            let envelope = HybridCipher::encrypt(&plaintext, bob().public_key(), alice().private_key()).unwrap();
            let decrypted = HybridCipher::decrypt(&envelope, bob().private_key(), alice().public_key()).unwrap();
            prop_assert_eq!(decrypted, plaintext);
        }

        #[test]
        fn prop_wrong_sender_always_fails(plaintext in proptest::collection::vec(any::<u8>(), 0..256)) {
            let envelope = HybridCipher::encrypt(&plaintext, bob().public_key(), alice().private_key()).unwrap();
            prop_assert_eq!(
                HybridCipher::decrypt(&envelope, bob().private_key(), mallory().public_key()),
                Err(CryptoError::SignatureInvalid)
            );
        }
    }
}
