use log::{error, info};
use metrics::counter;
use std::sync::Arc;

use crate::crypto::{generate_nonce, Aes256GcmAead, GCM_NONCE_SIZE, GCM_TAG_SIZE};
use crate::envelope::{DataCategory, EnvelopeMetadata};
use crate::error::{Error, Result};
use crate::key::KeyRing;
use crate::policy::EncryptionPolicy;
use crate::Aead;

/// Size of the big-endian metadata length prefix
pub const METADATA_LEN_SIZE: usize = 4;

/// Smallest container: IV, length prefix, empty metadata and a bare tag
pub const MIN_CONTAINER_SIZE: usize = GCM_NONCE_SIZE + METADATA_LEN_SIZE + GCM_TAG_SIZE;

/// Authenticated encryption of binary file payloads
///
/// The container keeps its metadata in the clear and binds it to the
/// ciphertext as additional authenticated data, so a file's category and
/// timestamp can be read with [`FileCipher::read_metadata`] without the key.
#[derive(Debug, Clone)]
pub struct FileCipher {
    keys: Arc<KeyRing>,
    policy: Arc<EncryptionPolicy>,
    aead: Arc<dyn Aead>,
}

/// Borrowed view of a parsed container
struct ContainerParts<'a> {
    iv: &'a [u8],
    metadata_json: &'a [u8],
    sealed: &'a [u8],
}

impl FileCipher {
    /// Creates a file cipher backed by AES-256-GCM
    pub fn new(keys: Arc<KeyRing>, policy: Arc<EncryptionPolicy>) -> Self {
        Self::with_aead(keys, policy, Arc::new(Aes256GcmAead::new()))
    }

    /// Creates a file cipher with a caller-supplied AEAD implementation
    pub fn with_aead(
        keys: Arc<KeyRing>,
        policy: Arc<EncryptionPolicy>,
        aead: Arc<dyn Aead>,
    ) -> Self {
        Self { keys, policy, aead }
    }

    /// Encrypts `data` into a self-describing container
    pub fn encrypt_file(&self, data: &[u8], category: DataCategory) -> Result<Vec<u8>> {
        counter!("pdcrypt.file.encrypt", 1);

        self.seal_file(data, category).map_err(|e| {
            error!("File encryption error: {}", e);
            match e {
                Error::Encryption(_) => e,
                other => Error::Encryption(format!("Failed to encrypt file: {}", other)),
            }
        })
    }

    fn seal_file(&self, data: &[u8], category: DataCategory) -> Result<Vec<u8>> {
        let metadata = EnvelopeMetadata::new(
            category,
            self.policy.current_key_version(),
            self.policy.compliance.clone(),
        );
        let metadata_json = serde_json::to_vec(&metadata)?;
        let metadata_len = u32::try_from(metadata_json.len())
            .map_err(|_| Error::Encryption("metadata too large".into()))?;

        let iv = generate_nonce();
        let sealed = self.aead.seal(
            self.keys.current().encryption_key(),
            &iv,
            data,
            &metadata_json,
        )?;

        let mut container = Vec::with_capacity(
            GCM_NONCE_SIZE + METADATA_LEN_SIZE + metadata_json.len() + sealed.len(),
        );
        container.extend_from_slice(&iv);
        container.extend_from_slice(&metadata_len.to_be_bytes());
        container.extend_from_slice(&metadata_json);
        container.extend_from_slice(&sealed);

        info!(
            "File encrypted: {} bytes -> {} bytes ({})",
            data.len(),
            container.len(),
            category
        );
        Ok(container)
    }

    /// Decrypts a container, returning the payload and its metadata
    pub fn decrypt_file(&self, container: &[u8]) -> Result<(Vec<u8>, EnvelopeMetadata)> {
        counter!("pdcrypt.file.decrypt", 1);

        let result = self.unseal_file(container);
        if let Err(e) = &result {
            if e.is_security() {
                error!("File integrity failure - possible tampering: {}", e);
            } else {
                error!("File decryption error: {}", e);
            }
        }
        result
    }

    fn unseal_file(&self, container: &[u8]) -> Result<(Vec<u8>, EnvelopeMetadata)> {
        let parts = split_container(container)?;
        let metadata = parse_metadata(parts.metadata_json)?;

        let mut last_err = None;
        for keys in self.keys.candidates_for(metadata.key_version.as_ref()) {
            match self.aead.open(
                keys.encryption_key(),
                parts.iv,
                parts.sealed,
                parts.metadata_json,
            ) {
                Ok(data) => return Ok((data, metadata)),
                Err(e) if e.is_security() => last_err = Some(e),
                Err(e) => return Err(e),
            }
        }

        Err(last_err.unwrap_or_else(|| Error::Security("Data authentication failed".into())))
    }

    /// Reads the container metadata without decrypting the payload
    ///
    /// The metadata is not authenticated until the container is decrypted.
    pub fn read_metadata(container: &[u8]) -> Result<EnvelopeMetadata> {
        let parts = split_container(container)?;
        parse_metadata(parts.metadata_json)
    }
}

fn split_container(container: &[u8]) -> Result<ContainerParts<'_>> {
    if container.len() < MIN_CONTAINER_SIZE {
        return Err(Error::Decryption(format!(
            "file container is {} bytes, minimum is {}",
            container.len(),
            MIN_CONTAINER_SIZE
        )));
    }

    let (iv, rest) = container.split_at(GCM_NONCE_SIZE);
    let (len_bytes, rest) = rest.split_at(METADATA_LEN_SIZE);
    let mut len_buf = [0_u8; METADATA_LEN_SIZE];
    len_buf.copy_from_slice(len_bytes);
    let metadata_len = u32::from_be_bytes(len_buf) as usize;

    if rest.len() < GCM_TAG_SIZE || metadata_len > rest.len() - GCM_TAG_SIZE {
        return Err(Error::Decryption(format!(
            "file container metadata length {} exceeds available {} bytes",
            metadata_len,
            rest.len().saturating_sub(GCM_TAG_SIZE)
        )));
    }

    let (metadata_json, sealed) = rest.split_at(metadata_len);
    Ok(ContainerParts {
        iv,
        metadata_json,
        sealed,
    })
}

fn parse_metadata(json: &[u8]) -> Result<EnvelopeMetadata> {
    serde_json::from_slice(json)
        .map_err(|e| Error::Decryption(format!("invalid file metadata: {}", e)))
}
