//! Whole-record encryption
//!
//! A record is a flat JSON object of field name to value. Fields named in
//! [`SENSITIVE_FIELDS`] are replaced by their field envelopes; everything else
//! passes through untouched.
//!
//! Encryption is all-or-nothing: one failing field aborts the whole record.
//! Decryption is field-isolated: a field that fails to decrypt is replaced by
//! [`DECRYPTION_ERROR_SENTINEL`] and the rest of the record is still returned.
//!
//! Non-string sensitive values are encrypted as their JSON text, so `true`
//! comes back as the string `"true"` and `123456` as `"123456"`.

use log::{debug, error, info, warn};
use metrics::counter;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::sync::Arc;

use crate::envelope::{DataCategory, FieldCipher};
use crate::error::Result;
use crate::policy::timestamp_now;

/// Plaintext or encrypted record
pub type Record = Map<String, Value>;

/// Reserved key marking a record as encrypted
pub const ENCRYPTED_KEY: &str = "_encrypted";

/// Reserved key holding the key version at encryption time
pub const ENCRYPTION_VERSION_KEY: &str = "_encryption_version";

/// Reserved key holding the record encryption timestamp
pub const ENCRYPTED_AT_KEY: &str = "_encrypted_at";

/// Reserved key holding the [`data_hash`] of the plaintext record at save time
pub const DATA_HASH_KEY: &str = "_data_hash";

/// Value substituted for a field that could not be decrypted
pub const DECRYPTION_ERROR_SENTINEL: &str = "[DECRYPTION_ERROR]";

/// Name of the AEAD algorithm reported by [`RecordCodec::encryption_info`]
pub const ALGORITHM: &str = "AES-256-GCM";

/// Sensitive field names and the category each one is tagged with
pub const SENSITIVE_FIELDS: &[(&str, DataCategory)] = &[
    ("fio", DataCategory::Fio),
    ("passport_series", DataCategory::Passport),
    ("passport_number", DataCategory::Passport),
    ("passport_issue_date", DataCategory::Passport),
    ("passport_issued_by", DataCategory::Passport),
    ("passport_birth_date", DataCategory::Passport),
    ("passport_birth_place", DataCategory::Passport),
    ("address", DataCategory::Address),
    ("phone", DataCategory::Phone),
    ("vzh_number", DataCategory::Vzh),
    ("vzh_issue_date", DataCategory::Vzh),
    ("vzh_expiry_date", DataCategory::Vzh),
    ("patent_number", DataCategory::Patent),
    ("patent_issue_date", DataCategory::Patent),
    ("patent_expiry_date", DataCategory::Patent),
    ("document_scan_path", DataCategory::DocumentPhoto),
    ("email", DataCategory::Other),
    ("snils", DataCategory::Other),
    ("inn", DataCategory::Other),
    ("driver_license", DataCategory::Other),
];

/// Returns true if `field` is encrypted by the codec
pub fn is_sensitive(field: &str) -> bool {
    SENSITIVE_FIELDS.iter().any(|(name, _)| *name == field)
}

/// Returns the category for `field`, `Other` when unmapped
pub fn category_for(field: &str) -> DataCategory {
    SENSITIVE_FIELDS
        .iter()
        .find(|(name, _)| *name == field)
        .map(|(_, category)| *category)
        .unwrap_or_default()
}

/// Returns true for reserved bookkeeping keys
pub fn is_reserved(field: &str) -> bool {
    field.starts_with('_')
}

/// Static description of the encryption configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionInfo {
    pub algorithm: String,
    pub key_rotation_days: u32,
    pub current_key_version: String,
    pub encrypted_fields: Vec<String>,
    pub compliance: String,
}

/// Encryption bookkeeping read from an encrypted record without decrypting it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordEncryptionInfo {
    pub user_id: String,
    pub is_encrypted: bool,
    pub encryption_version: String,
    pub encrypted_at: String,
    pub fields_encrypted: usize,
    /// Hash stamped under [`DATA_HASH_KEY`], `"unknown"` if the record has none
    pub data_hash: String,
}

/// Which documents a decrypted record holds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordStats {
    /// Full name and phone are both present
    pub has_basic_data: bool,
    /// Passport series and number are both present
    pub has_passport: bool,
    pub has_vzh: bool,
    pub has_patent: bool,
    pub has_inn: bool,
    pub has_snils: bool,
    /// Number of the passport, residence permit, patent, INN and SNILS flags set
    pub documents_count: usize,
    pub last_updated: String,
}

/// Portable export of a decrypted record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordExport {
    pub exported_at: String,
    pub user_id: String,
    pub data: Record,
    pub format: String,
    pub compliance: String,
}

/// Maps plaintext records to and from their per-field encrypted form
#[derive(Debug, Clone)]
pub struct RecordCodec {
    field: Arc<FieldCipher>,
}

impl RecordCodec {
    /// Creates a record codec on top of a field cipher
    pub fn new(field: Arc<FieldCipher>) -> Self {
        info!(
            "RecordCodec initialized with {} sensitive fields",
            SENSITIVE_FIELDS.len()
        );
        Self { field }
    }

    /// Returns the underlying field cipher
    pub fn field_cipher(&self) -> &FieldCipher {
        &self.field
    }

    /// Encrypts every non-empty sensitive field and stamps the reserved keys
    ///
    /// Fails on the first field that cannot be encrypted; no partial record
    /// is ever returned.
    pub fn auto_encrypt_record(&self, record: &Record) -> Result<Record> {
        let mut encrypted = Record::new();

        for (field, value) in record {
            if is_sensitive(field) && is_truthy(value) {
                let category = category_for(field);
                let envelope = self
                    .field
                    .encrypt_field(&stringify(value), category)
                    .map_err(|e| {
                        error!("Failed to encrypt field {}: {}", field, e);
                        e
                    })?;
                debug!("Encrypted field {} as category {}", field, category);
                encrypted.insert(field.clone(), Value::String(envelope));
            } else {
                encrypted.insert(field.clone(), value.clone());
            }
        }

        encrypted.insert(ENCRYPTED_KEY.into(), Value::Bool(true));
        encrypted.insert(
            ENCRYPTION_VERSION_KEY.into(),
            Value::String(self.field.policy().current_key_version().to_string()),
        );
        encrypted.insert(ENCRYPTED_AT_KEY.into(), Value::String(timestamp_now()));

        Ok(encrypted)
    }

    /// Decrypts every sensitive string field, isolating per-field failures
    pub fn auto_decrypt_record(&self, record: &Record) -> Record {
        self.decrypt_record_with_failures(record).0
    }

    /// Like [`auto_decrypt_record`](Self::auto_decrypt_record), also naming the
    /// fields that were replaced by the sentinel
    ///
    /// An integrity failure ([`Error::is_security`](crate::Error::is_security))
    /// is logged as possible tampering and a
    /// [`Error::is_decryption`](crate::Error::is_decryption) failure as an
    /// unreadable field. Any other error is logged as unexpected. Every kind
    /// is isolated to its field.
    pub fn decrypt_record_with_failures(&self, record: &Record) -> (Record, Vec<String>) {
        let mut decrypted = Record::new();
        let mut failed = Vec::new();

        for (field, value) in record {
            let envelope = match value {
                Value::String(s) if is_sensitive(field) && !s.is_empty() => s,
                _ => {
                    decrypted.insert(field.clone(), value.clone());
                    continue;
                }
            };

            match self.field.decrypt_field(envelope) {
                Ok((plain, category)) => {
                    debug!("Decrypted field {} from category {}", field, category);
                    decrypted.insert(field.clone(), Value::String(plain));
                    continue;
                }
                Err(e) if e.is_security() => {
                    counter!("pdcrypt.record.integrity_error", 1);
                    error!("Integrity check failed for field {}: {}", field, e);
                }
                Err(e) if e.is_decryption() => {
                    counter!("pdcrypt.record.decrypt_error", 1);
                    error!("Failed to decrypt field {}: {}", field, e);
                }
                Err(e) => {
                    counter!("pdcrypt.record.decrypt_error", 1);
                    warn!("Unexpected error decrypting field {}: {}", field, e);
                }
            }

            decrypted.insert(
                field.clone(),
                Value::String(DECRYPTION_ERROR_SENTINEL.into()),
            );
            failed.push(field.clone());
        }

        (decrypted, failed)
    }

    /// Describes the active encryption configuration
    pub fn encryption_info(&self) -> EncryptionInfo {
        let policy = self.field.policy();
        EncryptionInfo {
            algorithm: ALGORITHM.into(),
            key_rotation_days: policy.key_rotation_days,
            current_key_version: policy.current_key_version().to_string(),
            encrypted_fields: SENSITIVE_FIELDS
                .iter()
                .map(|(name, _)| name.to_string())
                .collect(),
            compliance: policy.compliance.clone(),
        }
    }

    /// Builds an export of a decrypted record with reserved keys removed
    pub fn export_record(&self, user_id: &str, record: &Record) -> RecordExport {
        RecordExport {
            exported_at: timestamp_now(),
            user_id: user_id.into(),
            data: record
                .iter()
                .filter(|(k, _)| !is_reserved(k))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            format: "json".into(),
            compliance: self.field.policy().compliance.clone(),
        }
    }
}

/// Reads the reserved keys of an encrypted record
pub fn inspect_record(user_id: &str, record: &Record) -> RecordEncryptionInfo {
    let text = |key: &str| {
        record
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string()
    };

    RecordEncryptionInfo {
        user_id: user_id.into(),
        is_encrypted: record.contains_key(ENCRYPTED_KEY),
        encryption_version: text(ENCRYPTION_VERSION_KEY),
        encrypted_at: text(ENCRYPTED_AT_KEY),
        fields_encrypted: record.keys().filter(|k| !is_reserved(k)).count(),
        data_hash: text(DATA_HASH_KEY),
    }
}

/// Summarizes which documents a decrypted record holds
pub fn record_stats(record: &Record) -> RecordStats {
    let has = |field: &str| record.get(field).map_or(false, is_truthy);

    let has_passport = has("passport_series") && has("passport_number");
    let has_vzh = has("vzh_number");
    let has_patent = has("patent_number");
    let has_inn = has("inn");
    let has_snils = has("snils");

    RecordStats {
        has_basic_data: has("fio") && has("phone"),
        has_passport,
        has_vzh,
        has_patent,
        has_inn,
        has_snils,
        documents_count: [has_passport, has_vzh, has_patent, has_inn, has_snils]
            .iter()
            .filter(|&&flag| flag)
            .count(),
        last_updated: record
            .get(ENCRYPTED_AT_KEY)
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string(),
    }
}

/// Hex SHA-256 of the key-sorted JSON form of a record
///
/// Reserved keys are left out, so the hash of a decrypted record matches the
/// hash of the plaintext it was saved from.
pub fn data_hash(record: &Record) -> Result<String> {
    let data: Record = record
        .iter()
        .filter(|(k, _)| !is_reserved(k))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    let canonical = serde_json::to_vec(&canonicalize(&Value::Object(data)))?;
    Ok(hex::encode(Sha256::digest(&canonical)))
}

fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.clone(), canonicalize(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

/// Emptiness test used to skip blank fields
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
