use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::key::KeyVersion;

/// Default values for EncryptionPolicy
pub const DEFAULT_KEY_ROTATION_DAYS: u32 = 90;
pub const DEFAULT_COMPLIANCE_TAG: &str = "152-FZ";

/// Start of the key-version calendar (2020-01-01T00:00:00Z)
pub const KEY_VERSION_EPOCH: i64 = 1_577_836_800;

const SECONDS_PER_DAY: i64 = 60 * 60 * 24;

/// Policy for field and file encryption
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptionPolicy {
    /// Length of one key-version bucket in days
    pub key_rotation_days: u32,

    /// Compliance tag stamped into every envelope
    pub compliance: String,
}

impl Default for EncryptionPolicy {
    fn default() -> Self {
        Self {
            key_rotation_days: DEFAULT_KEY_ROTATION_DAYS,
            compliance: DEFAULT_COMPLIANCE_TAG.to_string(),
        }
    }
}

impl EncryptionPolicy {
    /// Creates a new EncryptionPolicy with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the key rotation period
    ///
    /// This only changes how key versions are labelled; it never changes
    /// which key material is used.
    ///
    /// # Example
    /// ```
    /// use pdcrypt::policy::EncryptionPolicy;
    ///
    /// let policy = EncryptionPolicy::new().with_key_rotation_days(30);
    /// assert_eq!(policy.key_rotation_days, 30);
    /// ```
    pub fn with_key_rotation_days(mut self, days: u32) -> Self {
        self.key_rotation_days = days;
        self
    }

    /// Sets the compliance tag
    pub fn with_compliance(mut self, tag: impl Into<String>) -> Self {
        self.compliance = tag.into();
        self
    }

    /// Checks the policy for values that would make versioning meaningless
    pub fn validate(&self) -> Result<()> {
        if self.key_rotation_days == 0 {
            return Err(Error::Configuration(
                "key rotation period must be at least one day".into(),
            ));
        }
        Ok(())
    }

    /// Returns the key version for the current time
    pub fn current_key_version(&self) -> KeyVersion {
        key_version_at(Utc::now(), self.key_rotation_days)
    }
}

/// Returns the key version bucket that `at` falls into
///
/// The bucket number is `floor(days since 2020-01-01 / rotation_days)`.
/// Dates before the epoch produce negative buckets. A zero rotation period
/// is treated as one day.
pub fn key_version_at(at: DateTime<Utc>, rotation_days: u32) -> KeyVersion {
    let days = (at.timestamp() - KEY_VERSION_EPOCH).div_euclid(SECONDS_PER_DAY);
    let period = i64::from(rotation_days.max(1));
    KeyVersion::new(days.div_euclid(period))
}

/// Returns the current UTC time as an ISO-8601 string
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}
