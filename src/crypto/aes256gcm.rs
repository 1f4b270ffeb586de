use crate::crypto::aead::{GCM_MAX_DATA_SIZE, GCM_NONCE_SIZE, GCM_TAG_SIZE};
use crate::error::{Error, Result};
use crate::Aead;
use aes_gcm::{
    aead::{Aead as AeadTrait, KeyInit, Payload},
    Aes256Gcm, Nonce,
};

/// AES-256-GCM implementation of AEAD
#[derive(Default, Debug, Clone)]
pub struct Aes256GcmAead;

impl Aes256GcmAead {
    /// Creates a new instance of the AES-256-GCM AEAD implementation
    pub fn new() -> Self {
        Self
    }

    fn cipher(key: &[u8]) -> Result<Aes256Gcm> {
        Aes256Gcm::new_from_slice(key)
            .map_err(|_| Error::InvalidArgument(format!("invalid AES-256 key length {}", key.len())))
    }

    fn check_nonce(nonce: &[u8]) -> Result<()> {
        if nonce.len() != GCM_NONCE_SIZE {
            return Err(Error::InvalidArgument(format!(
                "GCM nonce must be {} bytes, got {}",
                GCM_NONCE_SIZE,
                nonce.len()
            )));
        }
        Ok(())
    }
}

impl Aead for Aes256GcmAead {
    fn seal(&self, key: &[u8], nonce: &[u8], plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
        if plaintext.len() as u64 > GCM_MAX_DATA_SIZE {
            return Err(Error::Encryption("Data too large for GCM".into()));
        }
        Self::check_nonce(nonce)?;

        let cipher = Self::cipher(key)?;
        cipher
            .encrypt(
                Nonce::from_slice(nonce),
                Payload {
                    msg: plaintext,
                    aad,
                },
            )
            .map_err(|e| Error::Encryption(format!("AES-GCM encryption failed: {}", e)))
    }

    fn open(&self, key: &[u8], nonce: &[u8], sealed: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
        if sealed.len() < GCM_TAG_SIZE {
            return Err(Error::Decryption(
                "Data length is too short for GCM (tag)".into(),
            ));
        }
        Self::check_nonce(nonce)?;

        let cipher = Self::cipher(key)?;
        cipher
            .decrypt(Nonce::from_slice(nonce), Payload { msg: sealed, aad })
            .map_err(|_| Error::Security("Data authentication failed".into()))
    }
}
