//! Envelope formats for the pdcrypt library
//!
//! Two self-describing formats share one metadata block:
//!
//! - field envelope: `base64url(IV[12] || ciphertext || tag[16] || HMAC[32])`, where the
//!   ciphertext decrypts to `{"metadata": {...}, "data": "<value>"}`
//! - file container: `IV[12] || len[4, BE] || metadata JSON || ciphertext || tag[16]`, where
//!   the metadata is authenticated as AAD but stays readable

pub mod field;
pub mod file;

use base64::alphabet;
use base64::engine::general_purpose::PAD;
use base64::engine::{DecodePaddingMode, GeneralPurpose};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::key::KeyVersion;

pub use field::FieldCipher;
pub use file::FileCipher;

/// URL-safe base64 that writes padding and accepts input with or without it
pub(crate) const ENVELOPE_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    PAD.with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Category of personal data carried by a field or file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataCategory {
    Passport,
    Fio,
    Address,
    Phone,
    Vzh,
    Patent,
    DocumentPhoto,
    #[default]
    Other,
}

impl DataCategory {
    /// All categories in declaration order
    pub const ALL: [DataCategory; 8] = [
        DataCategory::Passport,
        DataCategory::Fio,
        DataCategory::Address,
        DataCategory::Phone,
        DataCategory::Vzh,
        DataCategory::Patent,
        DataCategory::DocumentPhoto,
        DataCategory::Other,
    ];

    /// Returns the wire name of the category
    pub fn as_str(&self) -> &'static str {
        match self {
            DataCategory::Passport => "passport",
            DataCategory::Fio => "fio",
            DataCategory::Address => "address",
            DataCategory::Phone => "phone",
            DataCategory::Vzh => "vzh",
            DataCategory::Patent => "patent",
            DataCategory::DocumentPhoto => "document_photo",
            DataCategory::Other => "other",
        }
    }
}

impl fmt::Display for DataCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataCategory {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        DataCategory::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| Error::Decryption(format!("unknown data category: {:?}", s)))
    }
}

/// Metadata stamped into every field envelope and file container
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EnvelopeMetadata {
    #[serde(default)]
    pub category: DataCategory,
    #[serde(default)]
    pub encrypted_at: String,
    #[serde(default)]
    pub key_version: Option<KeyVersion>,
    #[serde(default)]
    pub compliance: String,
}

impl EnvelopeMetadata {
    /// Creates metadata for something being encrypted now
    pub fn new(
        category: DataCategory,
        key_version: KeyVersion,
        compliance: impl Into<String>,
    ) -> Self {
        Self {
            category,
            encrypted_at: crate::policy::timestamp_now(),
            key_version: Some(key_version),
            compliance: compliance.into(),
        }
    }
}

/// Plaintext carried inside a field envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldPayload {
    #[serde(default)]
    pub metadata: EnvelopeMetadata,
    pub data: String,
}
