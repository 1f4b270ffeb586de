// Decrypting data written under a retired master secret

use crate::integration::common::{init_logging, secret, ROTATED_KEY, STATIC_KEY};
use pdcrypt::policy::EncryptionPolicy;
use pdcrypt::{DataCategory, FieldCipher, FileCipher, KeyRing, KeyVersion};
use std::sync::Arc;

fn policy() -> Arc<EncryptionPolicy> {
    Arc::new(EncryptionPolicy::default())
}

fn old_ring() -> Arc<KeyRing> {
    Arc::new(KeyRing::new(&secret(STATIC_KEY)))
}

fn rotated_ring(versions: Vec<KeyVersion>) -> Arc<KeyRing> {
    Arc::new(KeyRing::new(&secret(ROTATED_KEY)).with_retired(&secret(STATIC_KEY), versions))
}

#[test]
fn test_field_from_retired_epoch() {
    init_logging();
    let envelope = FieldCipher::new(old_ring(), policy())
        .encrypt_field("Иванов Иван", DataCategory::Fio)
        .expect("encrypt");

    let rotated = FieldCipher::new(rotated_ring(vec![]), policy());
    let (plain, category) = rotated.decrypt_field(&envelope).expect("decrypt");
    assert_eq!(plain, "Иванов Иван");
    assert_eq!(category, DataCategory::Fio);

    let fresh = rotated.encrypt_field("new", DataCategory::Other).expect("encrypt");
    assert!(FieldCipher::new(old_ring(), policy())
        .decrypt_field(&fresh)
        .expect_err("old ring cannot read new data")
        .is_security());
}

#[test]
fn test_field_without_retired_epoch_fails() {
    let envelope = FieldCipher::new(old_ring(), policy())
        .encrypt_field("x", DataCategory::Phone)
        .expect("encrypt");

    let replaced = FieldCipher::new(Arc::new(KeyRing::new(&secret(ROTATED_KEY))), policy());
    assert!(replaced
        .decrypt_field(&envelope)
        .expect_err("no retired epoch")
        .is_security());
}

#[test]
fn test_file_from_retired_epoch() {
    let version = policy().current_key_version();
    let container = FileCipher::new(old_ring(), policy())
        .encrypt_file(b"scan", DataCategory::DocumentPhoto)
        .expect("encrypt");

    // Registered under the label the container carries
    let rotated = FileCipher::new(rotated_ring(vec![version]), policy());
    let (plain, metadata) = rotated.decrypt_file(&container).expect("decrypt");
    assert_eq!(plain, b"scan");
    assert_eq!(metadata.key_version, Some(version));

    // Same label reused by the new secret in the same period
    let fresh = rotated
        .encrypt_file(b"new scan", DataCategory::DocumentPhoto)
        .expect("encrypt");
    assert_eq!(rotated.decrypt_file(&fresh).expect("decrypt").0, b"new scan");

    // Registered under an unrelated label
    let unlabelled = FileCipher::new(rotated_ring(vec![KeyVersion::new(1)]), policy());
    assert_eq!(unlabelled.decrypt_file(&container).expect("decrypt").0, b"scan");
}

#[test]
fn test_file_without_retired_epoch_fails() {
    let container = FileCipher::new(old_ring(), policy())
        .encrypt_file(b"scan", DataCategory::Passport)
        .expect("encrypt");

    let replaced = FileCipher::new(Arc::new(KeyRing::new(&secret(ROTATED_KEY))), policy());
    assert!(replaced
        .decrypt_file(&container)
        .expect_err("no retired epoch")
        .is_security());
}
