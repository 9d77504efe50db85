//! Push notification decryption pipeline.
//!
//! Push payloads arrive through the proxy as an RSA-encrypted subject plus a
//! signature made by the origin server over the encrypted bytes. The pipeline
//! base64-decodes both fields, verifies the signature against the stored
//! server public key and only then decrypts the subject with the device
//! private key. Unverified content never reaches the caller.

mod keystore;
mod message;

pub use keystore::{FileKeyStore, KeyStore, StaticKeyStore};
pub use message::{DecryptedNotification, EncryptedNotification};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use log::{debug, warn};
use rsa::pkcs1v15::{Signature, VerifyingKey};
use rsa::signature::Verifier;
use rsa::Pkcs1v15Encrypt;
use sha2::Sha256;
use thiserror::Error;

/// Failure kinds of the push pipeline. All of them are terminal for the
/// single push event; the event is dropped, never retried.
#[derive(Debug, Error)]
pub enum PushError {
    /// `subject` or `signature` was not valid base64.
    #[error("malformed base64 in push payload: {0}")]
    Decode(#[from] base64::DecodeError),

    /// The device private key or server public key is absent or unreadable.
    #[error("push key unavailable: {0}")]
    KeyUnavailable(String),

    /// The signature does not match the encrypted subject.
    #[error("push signature verification failed")]
    VerificationFailed,

    /// The subject could not be decrypted with the device private key.
    #[error("push subject decryption failed")]
    Decryption,

    /// The decrypted subject was not a well-formed push message.
    #[error("decrypted push payload is malformed: {0}")]
    MalformedPayload(#[from] serde_json::Error),
}

/// Verify-then-decrypt pipeline for inbound push payloads.
pub struct PushDecryptor<K: KeyStore> {
    keys: K,
}

impl<K: KeyStore> PushDecryptor<K> {
    pub fn new(keys: K) -> Self {
        Self { keys }
    }

    /// Turns an inbound payload into a verified plaintext notification.
    ///
    /// Steps run in a strict order: base64 decode, key load, signature
    /// verification, decryption, parse. A failed verification aborts the
    /// pipeline before any decryption is attempted.
    pub fn decrypt(
        &self,
        payload: &EncryptedNotification,
    ) -> Result<DecryptedNotification, PushError> {
        let subject = BASE64.decode(&payload.subject)?;
        let signature = BASE64.decode(&payload.signature)?;

        let private_key = self.keys.load_private_key()?;
        let server_public_key = self.keys.load_server_public_key()?;

        let verifying_key = VerifyingKey::<Sha256>::new(server_public_key);
        let signature = Signature::try_from(signature.as_slice()).map_err(|_| {
            warn!("push signature has invalid encoding, dropping event");
            PushError::VerificationFailed
        })?;
        verifying_key.verify(&subject, &signature).map_err(|_| {
            warn!("push signature verification failed, dropping event");
            PushError::VerificationFailed
        })?;

        let plaintext = private_key
            .decrypt(Pkcs1v15Encrypt, &subject)
            .map_err(|_| {
                warn!("push subject decryption failed, dropping event");
                PushError::Decryption
            })?;

        let message: DecryptedNotification = serde_json::from_slice(&plaintext)?;
        debug!(
            "decrypted push message from app {} (type {})",
            message.app, message.notification_type
        );
        Ok(message)
    }
}
