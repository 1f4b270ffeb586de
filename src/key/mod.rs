//! Key material for the pdcrypt library
//!
//! A single 32-byte master secret is stretched with PBKDF2-HMAC-SHA256 into two
//! independent sub-keys: one for AES-256-GCM and one for the outer HMAC layer.
//!
//! The salts are fixed literals rather than per-install random values. The
//! derived keys must be reproducible across restarts without persisting any
//! salt, so the master secret alone has to carry all of the entropy. This is a
//! deliberate constraint of the storage format and not a recommendation.

use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use crate::error::{Error, Result};
use crate::AES256_KEY_SIZE;

/// Required length of the master secret in bytes
pub const MASTER_SECRET_SIZE: usize = 32;

/// PBKDF2 iteration count for both sub-keys
pub const PBKDF2_ITERATIONS: u32 = 100_000;

/// Salt for the data encryption sub-key
pub const ENCRYPTION_SALT: &[u8] = b"encryption_salt";

/// Salt for the authentication sub-key
pub const AUTHENTICATION_SALT: &[u8] = b"authentication_salt";

/// Externally supplied master secret
///
/// Exactly [`MASTER_SECRET_SIZE`] bytes. The bytes are wiped on drop and never
/// appear in `Debug` output.
pub struct MasterSecret {
    bytes: Vec<u8>,
}

impl MasterSecret {
    /// Creates a master secret, rejecting anything that is not exactly 32 bytes
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self> {
        let mut bytes = bytes.into();
        if bytes.len() != MASTER_SECRET_SIZE {
            let len = bytes.len();
            bytes.zeroize();
            return Err(Error::Configuration(format!(
                "master secret must be exactly {} bytes, got {}",
                MASTER_SECRET_SIZE, len
            )));
        }
        Ok(Self { bytes })
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl FromStr for MasterSecret {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s.as_bytes().to_vec())
    }
}

impl fmt::Debug for MasterSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MasterSecret")
            .field("bytes", &"<hidden>")
            .finish()
    }
}

impl Drop for MasterSecret {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

/// The pair of sub-keys derived from one master secret
pub struct DerivedKeys {
    encryption_key: [u8; AES256_KEY_SIZE],
    auth_key: [u8; AES256_KEY_SIZE],
}

impl DerivedKeys {
    pub(crate) fn encryption_key(&self) -> &[u8] {
        &self.encryption_key
    }

    pub(crate) fn auth_key(&self) -> &[u8] {
        &self.auth_key
    }
}

impl PartialEq for DerivedKeys {
    fn eq(&self, other: &Self) -> bool {
        let enc = self.encryption_key[..].ct_eq(&other.encryption_key[..]);
        let auth = self.auth_key[..].ct_eq(&other.auth_key[..]);
        (enc & auth).into()
    }
}

impl Eq for DerivedKeys {}

impl fmt::Debug for DerivedKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DerivedKeys")
            .field("encryption_key", &"<hidden>")
            .field("auth_key", &"<hidden>")
            .finish()
    }
}

impl Drop for DerivedKeys {
    fn drop(&mut self) {
        self.encryption_key.zeroize();
        self.auth_key.zeroize();
    }
}

/// Derives the encryption and authentication sub-keys from a master secret
///
/// Deterministic: the same secret always yields the same keys.
pub fn derive_keys(secret: &MasterSecret) -> DerivedKeys {
    let mut encryption_key = [0_u8; AES256_KEY_SIZE];
    pbkdf2::pbkdf2_hmac::<Sha256>(
        secret.as_bytes(),
        ENCRYPTION_SALT,
        PBKDF2_ITERATIONS,
        &mut encryption_key,
    );

    let mut auth_key = [0_u8; AES256_KEY_SIZE];
    pbkdf2::pbkdf2_hmac::<Sha256>(
        secret.as_bytes(),
        AUTHENTICATION_SALT,
        PBKDF2_ITERATIONS,
        &mut auth_key,
    );

    DerivedKeys {
        encryption_key,
        auth_key,
    }
}

/// Time-bucketed key version label, rendered as `v<N>`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct KeyVersion(i64);

impl KeyVersion {
    /// Creates a key version from its bucket number
    pub fn new(bucket: i64) -> Self {
        Self(bucket)
    }

    /// Returns the bucket number
    pub fn bucket(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for KeyVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl FromStr for KeyVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        s.strip_prefix('v')
            .and_then(|n| n.parse::<i64>().ok())
            .map(KeyVersion)
            .ok_or_else(|| Error::InvalidArgument(format!("invalid key version: {:?}", s)))
    }
}

impl From<KeyVersion> for String {
    fn from(version: KeyVersion) -> Self {
        version.to_string()
    }
}

impl TryFrom<String> for KeyVersion {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

/// Current derived keys plus any retired key epochs
///
/// With no retired epochs this behaves exactly like a single-key cipher.
/// Retired epochs are registered against the key-version labels they were
/// in service for, so ciphertext produced under an older master secret stays
/// readable after the secret is replaced.
pub struct KeyRing {
    current: Arc<DerivedKeys>,
    retired: Vec<Arc<DerivedKeys>>,
    by_version: HashMap<KeyVersion, Arc<DerivedKeys>>,
}

impl KeyRing {
    /// Creates a key ring with a single (current) epoch
    pub fn new(secret: &MasterSecret) -> Self {
        Self {
            current: Arc::new(derive_keys(secret)),
            retired: Vec::new(),
            by_version: HashMap::new(),
        }
    }

    /// Registers a retired master secret for the given key versions
    pub fn with_retired(
        mut self,
        secret: &MasterSecret,
        versions: impl IntoIterator<Item = KeyVersion>,
    ) -> Self {
        let keys = Arc::new(derive_keys(secret));
        for version in versions {
            self.by_version.insert(version, keys.clone());
        }
        self.retired.push(keys);
        self
    }

    /// Returns the number of retired epochs
    pub fn retired_epochs(&self) -> usize {
        self.retired.len()
    }

    pub(crate) fn current(&self) -> &DerivedKeys {
        &self.current
    }

    /// Current keys first, then retired epochs in registration order
    pub(crate) fn candidates(&self) -> impl Iterator<Item = &DerivedKeys> + '_ {
        std::iter::once(self.current.as_ref()).chain(self.retired.iter().map(Arc::as_ref))
    }

    /// Keys registered for `version`, falling back to the current epoch
    pub(crate) fn for_version(&self, version: Option<&KeyVersion>) -> &DerivedKeys {
        version
            .and_then(|v| self.by_version.get(v))
            .map(Arc::as_ref)
            .unwrap_or_else(|| self.current.as_ref())
    }

    /// All epochs, starting with the one registered for `version`
    ///
    /// A label can be shared by two epochs when the secret is replaced
    /// mid-period, so the labelled epoch is only the first guess.
    pub(crate) fn candidates_for(&self, version: Option<&KeyVersion>) -> Vec<&DerivedKeys> {
        let preferred = self.for_version(version);
        let mut keys = vec![preferred];
        keys.extend(self.candidates().filter(|k| !std::ptr::eq(*k, preferred)));
        keys
    }
}

impl fmt::Debug for KeyRing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyRing")
            .field("retired_epochs", &self.retired.len())
            .field("versions", &self.by_version.keys().collect::<Vec<_>>())
            .finish()
    }
}
