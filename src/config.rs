//! Process-level configuration
//!
//! The master secret is supplied once at startup and handed to the ciphers
//! explicitly. Nothing here is global.

use std::env;
use std::sync::Arc;

use crate::envelope::{FieldCipher, FileCipher};
use crate::error::{Error, Result};
use crate::key::{KeyRing, MasterSecret};
use crate::policy::EncryptionPolicy;
use crate::record::RecordCodec;

/// Environment variable holding the 32-byte master secret
pub const MASTER_KEY_ENV: &str = "PDCRYPT_MASTER_KEY";

/// Environment variable holding the key rotation period in days
pub const KEY_ROTATION_DAYS_ENV: &str = "PDCRYPT_KEY_ROTATION_DAYS";

/// Configuration for the pdcrypt library
#[derive(Debug)]
pub struct Config {
    /// Master secret the sub-keys are derived from
    pub master_secret: MasterSecret,

    /// Encryption policy
    pub policy: EncryptionPolicy,
}

impl Config {
    /// Creates a new Config
    pub fn new(master_secret: MasterSecret, policy: EncryptionPolicy) -> Result<Self> {
        policy.validate()?;
        Ok(Self {
            master_secret,
            policy,
        })
    }

    /// Loads the configuration from `PDCRYPT_MASTER_KEY` and `PDCRYPT_KEY_ROTATION_DAYS`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Loads the configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = lookup(MASTER_KEY_ENV)
            .ok_or_else(|| Error::Configuration(format!("{} is not set", MASTER_KEY_ENV)))?;
        let master_secret = MasterSecret::new(secret.into_bytes())?;

        let mut policy = EncryptionPolicy::default();
        if let Some(days) = lookup(KEY_ROTATION_DAYS_ENV) {
            policy.key_rotation_days = days.trim().parse().map_err(|_| {
                Error::Configuration(format!(
                    "{} must be a positive integer, got {:?}",
                    KEY_ROTATION_DAYS_ENV, days
                ))
            })?;
        }

        Self::new(master_secret, policy)
    }

    /// Derives the key ring for this configuration
    pub fn key_ring(&self) -> KeyRing {
        KeyRing::new(&self.master_secret)
    }

    /// Builds the field cipher, file cipher and record codec sharing one key ring
    pub fn build(&self) -> (Arc<FieldCipher>, Arc<FileCipher>, Arc<RecordCodec>) {
        let keys = Arc::new(self.key_ring());
        let policy = Arc::new(self.policy.clone());

        let field = Arc::new(FieldCipher::new(keys.clone(), policy.clone()));
        let file = Arc::new(FileCipher::new(keys, policy));
        let codec = Arc::new(RecordCodec::new(field.clone()));
        (field, file, codec)
    }
}
