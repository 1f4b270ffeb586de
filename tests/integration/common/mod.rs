#![allow(dead_code)]

// Module for common test utilities and fixtures used across integration tests

use pdcrypt::{
    crypto::Aes256GcmAead,
    persistence::{MemoryFileStore, MemoryRecordStore},
    Aead, FieldCipher, FileCipher, KeyRing, MasterSecret, Record, RecordCodec, Result,
    Session,
};
use pdcrypt::policy::EncryptionPolicy;
use serde_json::Value;
use std::sync::Arc;

// Constants for tests
pub const USER_ID: &str = "100500";
pub const STATIC_KEY: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";
pub const ROTATED_KEY: &str = "1f1e1d1c1b1a191817161514131211100f0e0d0c0b0a09080706050403020100";

// Marker that makes FailingAead refuse to seal
pub const POISON: &str = "__poison__";

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn secret(hex_key: &str) -> MasterSecret {
    let bytes = hex::decode(hex_key).expect("Invalid hex key");
    MasterSecret::new(bytes).expect("Invalid master secret")
}

pub fn key_ring() -> Arc<KeyRing> {
    Arc::new(KeyRing::new(&secret(STATIC_KEY)))
}

pub fn policy() -> Arc<EncryptionPolicy> {
    Arc::new(EncryptionPolicy::default())
}

pub fn field_cipher() -> Arc<FieldCipher> {
    Arc::new(FieldCipher::new(key_ring(), policy()))
}

pub fn file_cipher() -> Arc<FileCipher> {
    Arc::new(FileCipher::new(key_ring(), policy()))
}

pub fn codec() -> Arc<RecordCodec> {
    Arc::new(RecordCodec::new(field_cipher()))
}

pub fn session_with(codec: Arc<RecordCodec>, records: MemoryRecordStore) -> Session {
    Session::new(
        codec,
        file_cipher(),
        Arc::new(records),
        Arc::new(MemoryFileStore::new()),
    )
}

pub fn record(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {}", other),
    }
}

pub fn sample_record() -> Record {
    record(serde_json::json!({
        "fio": "Иванов Иван Иванович",
        "passport_series": "4510",
        "passport_number": "123456",
        "passport_issue_date": "15.06.2015",
        "passport_issued_by": "ОВД Тверского района г. Москвы",
        "address": "г. Москва, ул. Тверская, д. 1, кв. 1",
        "phone": "+79991234567",
        "email": "ivanov@example.ru",
        "language": "ru",
        "is_active": true
    }))
}

/// AES-256-GCM that refuses to seal any plaintext containing [`POISON`]
#[derive(Debug, Default)]
pub struct FailingAead {
    inner: Aes256GcmAead,
}

impl Aead for FailingAead {
    fn seal(&self, key: &[u8], nonce: &[u8], plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
        if plaintext
            .windows(POISON.len())
            .any(|w| w == POISON.as_bytes())
        {
            return Err(pdcrypt::Error::InvalidArgument("poisoned plaintext".into()));
        }
        self.inner.seal(key, nonce, plaintext, aad)
    }

    fn open(&self, key: &[u8], nonce: &[u8], sealed: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
        self.inner.open(key, nonce, sealed, aad)
    }
}

pub fn failing_codec() -> Arc<RecordCodec> {
    let field = FieldCipher::with_aead(key_ring(), policy(), Arc::new(FailingAead::default()));
    Arc::new(RecordCodec::new(Arc::new(field)))
}
