// Tests to verify concurrent use of shared ciphers and codecs

use crate::integration::common::{codec, field_cipher, file_cipher, record, session_with};
use pdcrypt::persistence::MemoryRecordStore;
use pdcrypt::DataCategory;
use serde_json::json;
use std::sync::Arc;
use std::thread;
use tokio::task;

const NUM_THREADS: usize = 8;
const OPERATIONS_PER_THREAD: usize = 25;

#[test]
fn test_field_cipher_across_threads() {
    let cipher = field_cipher();

    let handles: Vec<_> = (0..NUM_THREADS)
        .map(|i| {
            let cipher = Arc::clone(&cipher);
            thread::spawn(move || {
                for j in 0..OPERATIONS_PER_THREAD {
                    let value = format!("thread {} value {}", i, j);
                    let envelope = cipher
                        .encrypt_field(&value, DataCategory::Other)
                        .expect("encrypt");
                    let (plain, _) = cipher.decrypt_field(&envelope).expect("decrypt");
                    assert_eq!(plain, value);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("thread panicked");
    }
}

#[test]
fn test_envelopes_decrypt_on_other_threads() {
    let cipher = field_cipher();
    let files = file_cipher();

    let envelopes: Vec<String> = (0..NUM_THREADS)
        .map(|i| {
            cipher
                .encrypt_field(&format!("{}", i), DataCategory::Passport)
                .expect("encrypt")
        })
        .collect();
    let container = files
        .encrypt_file(b"shared", DataCategory::Vzh)
        .expect("encrypt");

    let handles: Vec<_> = envelopes
        .into_iter()
        .enumerate()
        .map(|(i, envelope)| {
            let cipher = Arc::clone(&cipher);
            let files = Arc::clone(&files);
            let container = container.clone();
            thread::spawn(move || {
                assert_eq!(cipher.decrypt_field(&envelope).expect("decrypt").0, i.to_string());
                assert_eq!(files.decrypt_file(&container).expect("decrypt").0, b"shared");
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("thread panicked");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_sessions_for_distinct_users() {
    let records = MemoryRecordStore::new();
    let session = Arc::new(session_with(codec(), records.clone()));

    let mut tasks = Vec::new();
    for i in 0..NUM_THREADS {
        let session = Arc::clone(&session);
        tasks.push(task::spawn(async move {
            let user = format!("user-{}", i);
            for j in 0..OPERATIONS_PER_THREAD {
                let phone = format!("+7999{:07}", i * 1000 + j);
                session
                    .save(&user, &record(json!({ "phone": phone, "step": j })))
                    .await
                    .expect("save");
                let loaded = session.load(&user).await.expect("load").expect("record");
                assert_eq!(loaded["phone"], phone.as_str());
                assert_eq!(loaded["step"], j);
            }
        }));
    }

    for t in tasks {
        t.await.expect("task panicked");
    }
    assert_eq!(records.len(), NUM_THREADS);
}
