use crate::envelope::{DataCategory, EnvelopeMetadata, FileCipher};
use crate::error::{Error, Result};
use crate::record::{
    data_hash, inspect_record, record_stats, EncryptionInfo, Record, RecordCodec,
    RecordEncryptionInfo, RecordExport, RecordStats, DATA_HASH_KEY,
};
use crate::validation::{validate_record, ValidationReport};
use crate::{FileStore, RecordStore};

use log::{debug, info, warn};
use serde_json::Value;
use std::sync::Arc;

/// Record and file storage facade over the record codec
///
/// Records go to the [`RecordStore`] as encrypted JSON text; files go to the
/// [`FileStore`] as encrypted containers. Plaintext never reaches either store.
///
/// A save is a read-modify-write against the record store with no locking of
/// its own. Callers serialize concurrent saves for the same user.
#[derive(Debug, Clone)]
pub struct Session {
    /// Record codec
    codec: Arc<RecordCodec>,

    /// File cipher
    file_cipher: Arc<FileCipher>,

    /// Encrypted record store
    records: Arc<dyn RecordStore>,

    /// Encrypted file store
    files: Arc<dyn FileStore>,
}

impl Session {
    /// Creates a new Session
    pub fn new(
        codec: Arc<RecordCodec>,
        file_cipher: Arc<FileCipher>,
        records: Arc<dyn RecordStore>,
        files: Arc<dyn FileStore>,
    ) -> Self {
        Self {
            codec,
            file_cipher,
            records,
            files,
        }
    }

    /// Creates a new SessionBuilder
    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }

    /// Returns the record codec
    pub fn codec(&self) -> &RecordCodec {
        &self.codec
    }

    /// Loads the stored record without decrypting it
    pub async fn load_encrypted(&self, user_id: &str) -> Result<Option<Record>> {
        match self.records.get(user_id).await? {
            Some(blob) => Ok(Some(serde_json::from_str(&blob)?)),
            None => Ok(None),
        }
    }

    /// Loads and decrypts a record
    ///
    /// Fields that fail to decrypt hold the decryption-error sentinel.
    pub async fn load(&self, user_id: &str) -> Result<Option<Record>> {
        Ok(self
            .load_encrypted(user_id)
            .await?
            .map(|encrypted| self.codec.auto_decrypt_record(&encrypted)))
    }

    /// Merges `update` over the stored record and writes it back encrypted
    ///
    /// Nothing is written if any field fails to encrypt, or if a stored
    /// sensitive field that `update` does not replace can no longer be
    /// decrypted. The hash of the merged plaintext is stamped under
    /// [`DATA_HASH_KEY`].
    pub async fn save(&self, user_id: &str, update: &Record) -> Result<()> {
        let (mut merged, failed) = match self.load_encrypted(user_id).await? {
            Some(stored) => self.codec.decrypt_record_with_failures(&stored),
            None => (Record::new(), Vec::new()),
        };

        for (field, value) in update {
            merged.insert(field.clone(), value.clone());
        }

        let unreadable: Vec<&String> = failed
            .iter()
            .filter(|field| !update.contains_key(*field))
            .collect();
        if !unreadable.is_empty() {
            warn!(
                "Refusing to save user {}: stored fields {:?} cannot be decrypted",
                user_id, unreadable
            );
            return Err(Error::Decryption(format!(
                "stored fields {:?} cannot be decrypted",
                unreadable
            )));
        }

        let hash = data_hash(&merged)?;
        let mut encrypted = self.codec.auto_encrypt_record(&merged)?;
        encrypted.insert(DATA_HASH_KEY.into(), Value::String(hash));
        let blob = serde_json::to_string(&encrypted)?;
        self.records.put(user_id, &blob).await?;

        info!("Saved encrypted record for user {}", user_id);
        Ok(())
    }

    /// Replaces one field of a stored record
    ///
    /// Returns false if the user has no stored record.
    pub async fn update_field(&self, user_id: &str, field: &str, value: Value) -> Result<bool> {
        if self.records.get(user_id).await?.is_none() {
            debug!("No record for user {}, field {} not updated", user_id, field);
            return Ok(false);
        }

        let mut update = Record::new();
        update.insert(field.to_string(), value);
        self.save(user_id, &update).await?;
        Ok(true)
    }

    /// Exports the decrypted record without its bookkeeping keys
    pub async fn export(&self, user_id: &str) -> Result<Option<RecordExport>> {
        Ok(self
            .load(user_id)
            .await?
            .map(|record| self.codec.export_record(user_id, &record)))
    }

    /// Reads the encryption bookkeeping of a stored record without decrypting it
    pub async fn encryption_info(&self, user_id: &str) -> Result<Option<RecordEncryptionInfo>> {
        Ok(self
            .load_encrypted(user_id)
            .await?
            .map(|encrypted| inspect_record(user_id, &encrypted)))
    }

    /// Summarizes which documents the stored record holds
    pub async fn stats(&self, user_id: &str) -> Result<Option<RecordStats>> {
        Ok(self
            .load(user_id)
            .await?
            .map(|record| record_stats(&record)))
    }

    /// Describes the codec configuration
    pub fn codec_info(&self) -> EncryptionInfo {
        self.codec.encryption_info()
    }

    /// Validates the decrypted record
    pub async fn validate(&self, user_id: &str) -> Result<Option<ValidationReport>> {
        Ok(self
            .load(user_id)
            .await?
            .map(|record| validate_record(&record)))
    }

    /// Hash of the decrypted record, for change tracking
    ///
    /// Matches the hash stamped at save time unless a field has since become
    /// unreadable.
    pub async fn data_hash(&self, user_id: &str) -> Result<Option<String>> {
        match self.load(user_id).await? {
            Some(record) => Ok(Some(data_hash(&record)?)),
            None => Ok(None),
        }
    }

    /// Encrypts the file at `src` into a container at `dst`
    pub async fn encrypt_file(&self, src: &str, dst: &str, category: DataCategory) -> Result<()> {
        let data = self.files.read_bytes(src).await?;
        let container = self.file_cipher.encrypt_file(&data, category)?;
        self.files.write_bytes(dst, &container).await?;

        info!("Encrypted file {} -> {} ({})", src, dst, category);
        Ok(())
    }

    /// Decrypts the container at `src`
    pub async fn decrypt_file(&self, src: &str) -> Result<(Vec<u8>, EnvelopeMetadata)> {
        let container = self.files.read_bytes(src).await?;
        self.file_cipher.decrypt_file(&container)
    }
}

/// Builder for Session
#[derive(Default)]
pub struct SessionBuilder {
    codec: Option<Arc<RecordCodec>>,
    file_cipher: Option<Arc<FileCipher>>,
    records: Option<Arc<dyn RecordStore>>,
    files: Option<Arc<dyn FileStore>>,
}

impl SessionBuilder {
    /// Creates a new SessionBuilder
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the record codec
    pub fn with_codec(mut self, codec: Arc<RecordCodec>) -> Self {
        self.codec = Some(codec);
        self
    }

    /// Sets the file cipher
    pub fn with_file_cipher(mut self, file_cipher: Arc<FileCipher>) -> Self {
        self.file_cipher = Some(file_cipher);
        self
    }

    /// Sets the record store
    pub fn with_record_store(mut self, records: Arc<dyn RecordStore>) -> Self {
        self.records = Some(records);
        self
    }

    /// Sets the file store
    pub fn with_file_store(mut self, files: Arc<dyn FileStore>) -> Self {
        self.files = Some(files);
        self
    }

    /// Builds the Session
    pub fn build(self) -> Result<Session> {
        let codec = self
            .codec
            .ok_or_else(|| Error::InvalidArgument("record codec is required".to_string()))?;
        let file_cipher = self
            .file_cipher
            .ok_or_else(|| Error::InvalidArgument("file cipher is required".to_string()))?;
        let records = self
            .records
            .ok_or_else(|| Error::InvalidArgument("record store is required".to_string()))?;
        let files = self
            .files
            .ok_or_else(|| Error::InvalidArgument("file store is required".to_string()))?;

        Ok(Session::new(codec, file_cipher, records, files))
    }
}
