//! HMAC-SHA256 integrity layer

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

/// Length of an HMAC-SHA256 digest
pub const HMAC_SIZE: usize = 32;

/// Computes HMAC-SHA256 over the concatenation of `parts`
pub fn compute_hmac(key: &[u8], parts: &[&[u8]]) -> Result<[u8; HMAC_SIZE]> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| Error::InvalidArgument(format!("invalid HMAC key: {}", e)))?;
    for part in parts {
        mac.update(part);
    }
    let mut out = [0_u8; HMAC_SIZE];
    out.copy_from_slice(&mac.finalize().into_bytes());
    Ok(out)
}

/// Recomputes the HMAC over `parts` and compares it with `expected` in constant time
pub fn verify_hmac(key: &[u8], parts: &[&[u8]], expected: &[u8]) -> Result<bool> {
    let computed = compute_hmac(key, parts)?;
    Ok(computed[..].ct_eq(expected).into())
}
