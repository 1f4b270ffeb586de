//! # pdcrypt
//!
//! Field-level encryption of personal data at rest.
//!
//! `pdcrypt` protects the sensitive fields of a user record (full name,
//! passport and residence permit details, address, phone, document scans)
//! before they are written to storage. A single 32-byte master secret is
//! stretched into two sub-keys: one for AES-256-GCM and one for an outer
//! HMAC-SHA256 that is verified before any decryption is attempted.
//!
//! Every encrypted value is self-describing. A field envelope carries its
//! category, timestamp, key version and compliance tag inside the ciphertext;
//! a file container carries the same metadata in the clear, bound to the
//! ciphertext as additional authenticated data.
//!
//! Record encryption is all-or-nothing. Record decryption is field-isolated:
//! a damaged field comes back as `"[DECRYPTION_ERROR]"` and the rest of the
//! record is still returned.
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use pdcrypt::config::Config;
//! use pdcrypt::envelope::DataCategory;
//! use pdcrypt::key::MasterSecret;
//! use pdcrypt::policy::EncryptionPolicy;
//! use serde_json::json;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let secret: MasterSecret = "0123456789abcdef0123456789abcdef".parse()?;
//! let config = Config::new(secret, EncryptionPolicy::default())?;
//! let (fields, _files, records) = config.build();
//!
//! // One value
//! let envelope = fields.encrypt_field("Ivanov Ivan Ivanovich", DataCategory::Fio)?;
//! let (value, category) = fields.decrypt_field(&envelope)?;
//! assert_eq!(value, "Ivanov Ivan Ivanovich");
//! assert_eq!(category, DataCategory::Fio);
//!
//! // A whole record
//! let plain = json!({ "fio": "Ivanov Ivan", "phone": "+79991234567", "language": "ru" });
//! let plain = plain.as_object().cloned().unwrap_or_default();
//! let encrypted = records.auto_encrypt_record(&plain)?;
//! let decrypted = records.auto_decrypt_record(&encrypted);
//! assert_eq!(decrypted["phone"], "+79991234567");
//! # Ok(())
//! # }
//! ```
//!
//! ## Using a Session
//!
//! A [`session::Session`] stores encrypted records and files through the
//! [`RecordStore`] and [`FileStore`] traits:
//!
//! ```rust,no_run
//! use pdcrypt::config::Config;
//! use pdcrypt::envelope::DataCategory;
//! use pdcrypt::persistence::{FsFileStore, MemoryRecordStore};
//! use pdcrypt::session::Session;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # async fn session_example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::from_env()?;
//! let (_, files, records) = config.build();
//!
//! let session = Session::builder()
//!     .with_codec(records)
//!     .with_file_cipher(files)
//!     .with_record_store(Arc::new(MemoryRecordStore::new()))
//!     .with_file_store(Arc::new(FsFileStore::new("/var/lib/app/uploads")))
//!     .build()?;
//!
//! let update = json!({ "fio": "Petrov Petr", "passport_series": "4510" });
//! session.save("42", update.as_object().unwrap_or(&Default::default())).await?;
//! let record = session.load("42").await?;
//!
//! session
//!     .encrypt_file("42/passport.jpg", "42/passport.jpg.enc", DataCategory::DocumentPhoto)
//!     .await?;
//! let (scan, metadata) = session.decrypt_file("42/passport.jpg.enc").await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod crypto;
pub mod envelope;
pub mod error;
pub mod key;
pub mod persistence;
pub mod policy;
pub mod record;
pub mod session;
pub mod validation;

// Re-export key types
pub use crate::config::Config;
pub use crate::envelope::{DataCategory, EnvelopeMetadata, FieldCipher, FieldPayload, FileCipher};
pub use crate::error::{Error, Result};
pub use crate::key::{KeyRing, KeyVersion, MasterSecret};
pub use crate::policy::EncryptionPolicy;
pub use crate::record::{Record, RecordCodec};
pub use crate::session::{Session, SessionBuilder};

/// Size of AES-256 key in bytes
pub const AES256_KEY_SIZE: usize = 32;

use async_trait::async_trait;
use std::fmt;

/// AEAD (Authenticated Encryption with Associated Data) interface
pub trait Aead: Send + Sync + fmt::Debug {
    /// Encrypts `plaintext`, returning `ciphertext || tag`
    fn seal(&self, key: &[u8], nonce: &[u8], plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>>;

    /// Decrypts `ciphertext || tag`
    ///
    /// A tag mismatch is reported as [`Error::Security`].
    fn open(&self, key: &[u8], nonce: &[u8], sealed: &[u8], aad: &[u8]) -> Result<Vec<u8>>;
}

/// Storage for encrypted records, keyed by user id
#[async_trait]
pub trait RecordStore: Send + Sync + fmt::Debug {
    /// Loads the encrypted record JSON for a user
    async fn get(&self, user_id: &str) -> Result<Option<String>>;

    /// Stores the encrypted record JSON for a user, replacing any previous one
    async fn put(&self, user_id: &str, blob: &str) -> Result<()>;
}

/// Storage for encrypted file containers, keyed by path
#[async_trait]
pub trait FileStore: Send + Sync + fmt::Debug {
    /// Reads a whole file
    async fn read_bytes(&self, path: &str) -> Result<Vec<u8>>;

    /// Writes a whole file, replacing any previous content
    async fn write_bytes(&self, path: &str, data: &[u8]) -> Result<()>;
}
