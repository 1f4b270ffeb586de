use base64::Engine as _;
use log::{debug, error, info};
use metrics::{counter, histogram};
use std::sync::Arc;
use std::time::Instant;

use crate::crypto::{compute_hmac, generate_nonce, verify_hmac, Aes256GcmAead};
use crate::crypto::{GCM_NONCE_SIZE, GCM_TAG_SIZE, HMAC_SIZE};
use crate::envelope::{DataCategory, EnvelopeMetadata, FieldPayload, ENVELOPE_BASE64};
use crate::error::{Error, Result};
use crate::key::{DerivedKeys, KeyRing};
use crate::policy::EncryptionPolicy;
use crate::Aead;

/// Smallest decoded envelope: IV, empty ciphertext, tag and HMAC
pub const MIN_ENVELOPE_SIZE: usize = GCM_NONCE_SIZE + GCM_TAG_SIZE + HMAC_SIZE;

/// Authenticated encryption of single string values
///
/// Stateless after construction and safe to share across threads.
#[derive(Debug, Clone)]
pub struct FieldCipher {
    /// Current and retired key epochs
    keys: Arc<KeyRing>,

    /// Rotation period and compliance tag
    policy: Arc<EncryptionPolicy>,

    /// AEAD implementation for the inner layer
    aead: Arc<dyn Aead>,
}

impl FieldCipher {
    /// Creates a field cipher backed by AES-256-GCM
    pub fn new(keys: Arc<KeyRing>, policy: Arc<EncryptionPolicy>) -> Self {
        Self::with_aead(keys, policy, Arc::new(Aes256GcmAead::new()))
    }

    /// Creates a field cipher with a caller-supplied AEAD implementation
    pub fn with_aead(
        keys: Arc<KeyRing>,
        policy: Arc<EncryptionPolicy>,
        aead: Arc<dyn Aead>,
    ) -> Self {
        info!(
            "FieldCipher initialized with key rotation every {} days ({} retired epochs)",
            policy.key_rotation_days,
            keys.retired_epochs()
        );
        Self { keys, policy, aead }
    }

    /// Returns the encryption policy
    pub fn policy(&self) -> &EncryptionPolicy {
        &self.policy
    }

    /// Encrypts one value and tags it with `category`
    ///
    /// An empty value short-circuits to an empty string.
    pub fn encrypt_field(&self, plaintext: &str, category: DataCategory) -> Result<String> {
        if plaintext.is_empty() {
            return Ok(String::new());
        }

        let start = Instant::now();
        counter!("pdcrypt.field.encrypt", 1);

        let result = self.seal_field(plaintext, category);
        if let Err(e) = &result {
            error!("Encryption error for category {}: {}", category, e);
        }

        histogram!("pdcrypt.field.encrypt.time", start.elapsed());
        result.map_err(|e| match e {
            Error::Encryption(_) => e,
            other => Error::Encryption(format!("Failed to encrypt {}: {}", category, other)),
        })
    }

    fn seal_field(&self, plaintext: &str, category: DataCategory) -> Result<String> {
        let keys = self.keys.current();
        let payload = FieldPayload {
            metadata: EnvelopeMetadata::new(
                category,
                self.policy.current_key_version(),
                self.policy.compliance.clone(),
            ),
            data: plaintext.to_string(),
        };
        let json = serde_json::to_vec(&payload)?;

        let iv = generate_nonce();
        let sealed = self.aead.seal(keys.encryption_key(), &iv, &json, &[])?;
        let mac = compute_hmac(keys.auth_key(), &[&iv[..], &sealed[..]])?;

        let mut combined = Vec::with_capacity(iv.len() + sealed.len() + mac.len());
        combined.extend_from_slice(&iv);
        combined.extend_from_slice(&sealed);
        combined.extend_from_slice(&mac);

        Ok(ENVELOPE_BASE64.encode(combined))
    }

    /// Decrypts an envelope and returns the value with its category
    ///
    /// An empty envelope yields `("", DataCategory::Other)`.
    pub fn decrypt_field(&self, envelope: &str) -> Result<(String, DataCategory)> {
        if envelope.is_empty() {
            return Ok((String::new(), DataCategory::Other));
        }
        let payload = self.open_field(envelope)?;
        Ok((payload.data, payload.metadata.category))
    }

    /// Decrypts an envelope and returns the full payload including its metadata
    pub fn open_field(&self, envelope: &str) -> Result<FieldPayload> {
        let start = Instant::now();
        counter!("pdcrypt.field.decrypt", 1);

        let result = self.unseal_field(envelope);
        match &result {
            Err(Error::Security(msg)) => {
                counter!("pdcrypt.field.security_failure", 1);
                error!("Field integrity failure: {}", msg);
            }
            Err(e) => error!("Decryption error: {}", e),
            Ok(payload) => debug!(
                "Decrypted field of category {} (key version {})",
                payload.metadata.category,
                payload
                    .metadata
                    .key_version
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| "unknown".into())
            ),
        }

        histogram!("pdcrypt.field.decrypt.time", start.elapsed());
        result
    }

    fn unseal_field(&self, envelope: &str) -> Result<FieldPayload> {
        let combined = ENVELOPE_BASE64
            .decode(envelope.trim())
            .map_err(|e| Error::Decryption(format!("Failed to decrypt data: invalid base64: {}", e)))?;

        if combined.len() < MIN_ENVELOPE_SIZE {
            return Err(Error::Decryption(format!(
                "Failed to decrypt data: envelope is {} bytes, minimum is {}",
                combined.len(),
                MIN_ENVELOPE_SIZE
            )));
        }

        let mac_start = combined.len() - HMAC_SIZE;
        let iv = &combined[..GCM_NONCE_SIZE];
        let sealed = &combined[GCM_NONCE_SIZE..mac_start];
        let stored_mac = &combined[mac_start..];

        // Verify before decrypting
        let keys = self.authenticate(iv, sealed, stored_mac)?;

        let json = self.aead.open(keys.encryption_key(), iv, sealed, &[])?;

        serde_json::from_slice::<FieldPayload>(&json)
            .map_err(|e| Error::Decryption(format!("Failed to decrypt data: {}", e)))
    }

    /// Finds the key epoch whose auth key produced `stored_mac`
    fn authenticate(&self, iv: &[u8], sealed: &[u8], stored_mac: &[u8]) -> Result<&DerivedKeys> {
        for keys in self.keys.candidates() {
            if verify_hmac(keys.auth_key(), &[iv, sealed], stored_mac)? {
                return Ok(keys);
            }
        }
        Err(Error::Security(
            "Data integrity check failed - possible tampering".into(),
        ))
    }
}
