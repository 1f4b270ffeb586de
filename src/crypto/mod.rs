//! Cryptographic primitives for the pdcrypt library

mod aead;
pub mod aes256gcm;
pub mod mac;

pub use aead::{fill_random, generate_nonce, GCM_NONCE_SIZE, GCM_TAG_SIZE};
pub use aes256gcm::Aes256GcmAead;
pub use mac::{compute_hmac, verify_hmac, HMAC_SIZE};
