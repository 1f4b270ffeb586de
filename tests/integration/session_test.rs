// Session save/load/export against in-memory and filesystem stores

use crate::integration::common::{
    codec, failing_codec, file_cipher, init_logging, record, sample_record, session_with,
    POISON, USER_ID,
};
use pdcrypt::persistence::{FsFileStore, MemoryFileStore, MemoryRecordStore, RecordStoreFn};
use pdcrypt::record::{DECRYPTION_ERROR_SENTINEL, ENCRYPTED_KEY, ENCRYPTION_VERSION_KEY};
use pdcrypt::{DataCategory, FileStore, RecordStore, Session};
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[tokio::test]
async fn test_save_and_load() {
    init_logging();
    let records = MemoryRecordStore::new();
    let session = session_with(codec(), records.clone());

    session.save(USER_ID, &sample_record()).await.expect("save");

    let blob = records.get(USER_ID).await.expect("get").expect("stored");
    assert!(!blob.contains("Иванов"));
    assert!(blob.contains("\"language\":\"ru\""));

    let loaded = session.load(USER_ID).await.expect("load").expect("record");
    for (field, value) in &sample_record() {
        assert_eq!(&loaded[field], value);
    }
}

#[tokio::test]
async fn test_failed_save_writes_nothing() {
    let records = MemoryRecordStore::new();
    let good = session_with(codec(), records.clone());
    good.save(USER_ID, &sample_record()).await.expect("save");
    let before = records.get(USER_ID).await.expect("get");

    let bad = session_with(failing_codec(), records.clone());
    let err = bad
        .save(USER_ID, &record(json!({ "inn": POISON })))
        .await
        .expect_err("poisoned save");
    assert!(matches!(err, pdcrypt::Error::Encryption(_)));
    assert_eq!(records.get(USER_ID).await.expect("get"), before);

    assert!(bad
        .save("fresh", &record(json!({ "fio": POISON })))
        .await
        .is_err());
    assert!(records.get("fresh").await.expect("get").is_none());
}

#[tokio::test]
async fn test_export_and_encryption_info() {
    let session = session_with(codec(), MemoryRecordStore::new());
    session.save(USER_ID, &sample_record()).await.expect("save");

    let export = session.export(USER_ID).await.expect("export").expect("record");
    assert_eq!(export.user_id, USER_ID);
    assert_eq!(export.format, "json");
    assert_eq!(export.compliance, "152-FZ");
    assert!(!export.data.contains_key(ENCRYPTED_KEY));
    assert!(!export.data.contains_key(ENCRYPTION_VERSION_KEY));
    assert_eq!(export.data["passport_series"], "4510");

    let info = session
        .encryption_info(USER_ID)
        .await
        .expect("info")
        .expect("record");
    assert!(info.is_encrypted);
    assert_eq!(
        info.encryption_version,
        session.codec_info().current_key_version
    );

    assert_eq!(info.user_id, USER_ID);
    assert_eq!(
        Some(info.data_hash.clone()),
        session.data_hash(USER_ID).await.expect("hash")
    );

    let stats = session.stats(USER_ID).await.expect("stats").expect("record");
    assert!(stats.has_basic_data);
    assert!(stats.has_passport);
    assert_eq!(stats.last_updated, info.encrypted_at);

    let report = session.validate(USER_ID).await.expect("validate").expect("record");
    assert!(report.is_valid(), "{:?}", report.errors);

    let hash = session.data_hash(USER_ID).await.expect("hash").expect("record");
    session
        .update_field(USER_ID, "address", json!("г. Казань"))
        .await
        .expect("update");
    assert_ne!(
        session.data_hash(USER_ID).await.expect("hash").expect("record"),
        hash
    );
}

#[tokio::test]
async fn test_function_adapter_store() {
    let backing = Arc::new(Mutex::new(HashMap::<String, String>::new()));
    let store = {
        let for_get = backing.clone();
        let for_put = backing.clone();
        RecordStoreFn::new(
            move |id: &str| Ok(for_get.lock().expect("lock").get(id).cloned()),
            move |id: &str, blob: &str| {
                for_put.lock().expect("lock").insert(id.into(), blob.into());
                Ok(())
            },
        )
    };

    let session = Session::builder()
        .with_codec(codec())
        .with_file_cipher(file_cipher())
        .with_record_store(Arc::new(store))
        .with_file_store(Arc::new(MemoryFileStore::new()))
        .build()
        .expect("session");

    session
        .save(USER_ID, &record(json!({ "phone": "+79991234567" })))
        .await
        .expect("save");
    assert!(!backing.lock().expect("lock")[USER_ID].contains("79991234567"));
    assert_eq!(
        session.load(USER_ID).await.expect("load").expect("record")["phone"],
        "+79991234567"
    );
}

#[tokio::test]
async fn test_file_encryption_on_disk() {
    let dir = tempfile::tempdir().expect("tempdir");
    let files = FsFileStore::new(dir.path());
    files
        .write_bytes("uploads/passport.jpg", b"\xff\xd8\xff\xe0scan")
        .await
        .expect("write");

    let session = Session::builder()
        .with_codec(codec())
        .with_file_cipher(file_cipher())
        .with_record_store(Arc::new(MemoryRecordStore::new()))
        .with_file_store(Arc::new(files.clone()))
        .build()
        .expect("session");

    session
        .encrypt_file(
            "uploads/passport.jpg",
            "vault/passport.jpg.enc",
            DataCategory::DocumentPhoto,
        )
        .await
        .expect("encrypt");

    let on_disk = std::fs::read(dir.path().join("vault/passport.jpg.enc")).expect("read");
    assert!(!on_disk.windows(4).any(|w| w == b"scan"));

    let (plain, metadata) = session
        .decrypt_file("vault/passport.jpg.enc")
        .await
        .expect("decrypt");
    assert_eq!(plain, b"\xff\xd8\xff\xe0scan");
    assert_eq!(metadata.category, DataCategory::DocumentPhoto);

    assert!(session.decrypt_file("vault/missing.enc").await.is_err());
}

#[tokio::test]
async fn test_unreadable_field_blocks_only_untouched_sensitive_fields() {
    let records = MemoryRecordStore::new();
    let session = session_with(codec(), records.clone());

    session
        .save(
            USER_ID,
            &record(json!({ "note": DECRYPTION_ERROR_SENTINEL, "fio": "Иванов Иван" })),
        )
        .await
        .expect("sentinel text in a plain field is data");
    session
        .save("fresh", &record(json!({ "fio": DECRYPTION_ERROR_SENTINEL })))
        .await
        .expect("first save holds no stored fields");

    let mut stored = session
        .load_encrypted(USER_ID)
        .await
        .expect("load")
        .expect("record");
    stored.insert("fio".into(), json!("tampered"));
    let tampered = serde_json::to_string(&stored).expect("json");
    records.put(USER_ID, &tampered).await.expect("put");

    let err = session
        .save(USER_ID, &record(json!({ "language": "ru" })))
        .await
        .expect_err("unreadable fio must not be overwritten");
    assert!(err.is_decryption());
    assert_eq!(records.get(USER_ID).await.expect("get"), Some(tampered));

    session
        .save(USER_ID, &record(json!({ "fio": "Петров Петр" })))
        .await
        .expect("replacing the unreadable field");
    let loaded = session.load(USER_ID).await.expect("load").expect("record");
    assert_eq!(loaded["fio"], "Петров Петр");
    assert_eq!(loaded["note"], DECRYPTION_ERROR_SENTINEL);
}
