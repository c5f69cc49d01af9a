// End-to-end session behaviour against the mock protocol engine
use blockstack_bridge::session::host_functions::{GET_FILE_RESULT, PUT_FILE_RESULT};
use blockstack_bridge::testing::constants::{TEST_PRIVATE_KEY, TEST_USERNAME};
use blockstack_bridge::testing::{capture, MockProtocolEngine, RecordingLauncher, RecordingNotifier, TestFixtures};
use blockstack_bridge::session::{PendingSummary, SESSION_RELEASED};
use blockstack_bridge::{
    BridgeError, CipherObject, EngineError, Content, CryptoOptions, GetFileOptions, Outcome, Profile, PutFileOptions,
};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

const WAIT: Duration = Duration::from_secs(5);

async fn received<T>(receiver: oneshot::Receiver<Outcome<T>>) -> Outcome<T> {
    tokio::time::timeout(WAIT, receiver)
        .await
        .expect("callback was not invoked in time")
        .expect("callback was dropped without being invoked")
}

#[tokio::test]
async fn test_put_then_get_returns_stored_text() {
    let (session, _handle) = TestFixtures::ready_session().await;

    let (callback, stored) = capture();
    session
        .put_file("try.txt", "Hello", &PutFileOptions::new(false), callback)
        .unwrap();
    assert!(received(stored).await.has_value());

    let (callback, read) = capture();
    session
        .get_file("try.txt", &GetFileOptions::new(false), callback)
        .unwrap();
    assert_eq!(received(read).await.into_value(), Some(Content::from("Hello")));
}

#[tokio::test]
async fn test_duplicate_profile_lookup_answers_only_latest_caller() {
    let (session, handle) = TestFixtures::ready_session().await;
    handle.set_deferred(true);

    let first_calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&first_calls);
    session
        .lookup_profile(TEST_USERNAME, None, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
    let (callback, second) = capture();
    session.lookup_profile(TEST_USERNAME, None, callback).unwrap();

    handle.wait_for_deferred(2, WAIT);
    handle.flush_host_calls();

    let profile = received(second).await.into_value().unwrap();
    assert_eq!(profile.name(), Some("Alice"));
    assert_eq!(first_calls.load(Ordering::SeqCst), 0);
    assert_eq!(session.pending_summary().profile_lookups, 0);
}

#[tokio::test]
async fn test_is_user_signed_in_follows_script_state() {
    let (session, handle) = TestFixtures::ready_session().await;
    assert!(!session.is_user_signed_in().await.unwrap());

    handle.set_signed_in(Some(TestFixtures::user_json()));
    assert!(session.is_user_signed_in().await.unwrap());

    let user = session.load_user_data().await.unwrap().unwrap();
    assert_eq!(user.app_private_key(), Some(TEST_PRIVATE_KEY));
    let profile = user.profile().unwrap();
    assert_eq!(profile.avatar_url(), Some("https://example.com/alice.png"));
    assert_eq!(session.cached_user_data(), Some(user));
}

#[tokio::test]
async fn test_operations_before_ready_fail_without_script_interaction() {
    let (session, handle) = TestFixtures::unready_session();
    assert!(!session.is_loaded());

    let result = session.get_file("x", &GetFileOptions::default(), |_| {});
    assert!(matches!(result, Err(BridgeError::NotInitialized)));
    let result = session.put_file("x", "y", &PutFileOptions::default(), |_| {});
    assert!(matches!(result, Err(BridgeError::NotInitialized)));
    let result = session.encrypt_content("x", &CryptoOptions::default()).await;
    assert!(matches!(result, Err(BridgeError::NotInitialized)));
    let cipher = CipherObject::new(json!({"cipherText": "00", "wasString": true}));
    let result = session.decrypt_content(cipher, &CryptoOptions::default()).await;
    assert!(matches!(result, Err(BridgeError::NotInitialized)));

    let profile = Profile::new(TestFixtures::profile_json());
    let result = session.validate_proofs(&profile, "1Owner", Some(TEST_USERNAME), |_| {});
    assert!(matches!(result, Err(BridgeError::NotInitialized)));
    let result = session.get_app_bucket_url("https://hub.blockstack.org", TEST_PRIVATE_KEY, |_| {});
    assert!(matches!(result, Err(BridgeError::NotInitialized)));
    let result = session.get_user_app_file_url("x", TEST_USERNAME, "https://app.example.com", |_| {});
    assert!(matches!(result, Err(BridgeError::NotInitialized)));

    assert!(handle.evaluated_expressions().is_empty());
    assert_eq!(session.pending_summary(), PendingSummary::default());
}

#[tokio::test]
async fn test_ready_signal_enables_operations() {
    let (session, handle) = TestFixtures::unready_session();
    assert!(matches!(session.is_user_signed_in().await, Err(BridgeError::NotInitialized)));

    handle.finish_page("https://example.com/unrelated.html");
    assert!(!session.is_loaded());

    handle.finish_page(&handle.bootstrap_url().unwrap());
    assert!(session.is_loaded());
    assert!(!session.is_user_signed_in().await.unwrap());
}

#[tokio::test]
async fn test_encrypt_decrypt_round_trips() {
    let (session, _handle) = TestFixtures::ready_session().await;
    let options = CryptoOptions::default();

    let cipher = session
        .encrypt_content("it's \"quoted\"\nand multi-line", &options)
        .await
        .unwrap()
        .into_value()
        .unwrap();
    let plain = session.decrypt_content(cipher.clone(), &options).await.unwrap();
    assert_eq!(
        plain.into_value(),
        Some(Content::from("it's \"quoted\"\nand multi-line"))
    );

    let image = vec![0x89_u8, b'P', b'N', b'G', 0, 255];
    let cipher = session
        .encrypt_content(image.clone(), &options)
        .await
        .unwrap()
        .into_value()
        .unwrap();
    let plain = session.decrypt_content(cipher, &options).await.unwrap();
    assert_eq!(plain.into_value(), Some(Content::Bytes(image)));
}

#[tokio::test]
async fn test_duplicate_resolution_is_a_no_op() {
    let (session, handle) = TestFixtures::ready_session().await;
    handle.set_deferred(true);

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    session
        .put_file("notes.txt", "draft", &PutFileOptions::new(false), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
    let queued = handle.wait_for_deferred(1, WAIT);
    let token = queued[0].1[1].clone();

    handle.invoke_host_function(PUT_FILE_RESULT, &[json!("https://hub/notes.txt"), token.clone()]);
    handle.invoke_host_function(PUT_FILE_RESULT, &[json!("https://hub/notes.txt"), token]);

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(session.pending_summary().file_writes, 0);
}

#[tokio::test]
async fn test_unknown_token_is_ignored() {
    let (session, handle) = TestFixtures::ready_session().await;

    handle.invoke_host_function(
        GET_FILE_RESULT,
        &[json!("orphan"), json!("00000000-0000-4000-8000-000000000000"), json!(false)],
    );
    assert_eq!(session.pending_summary().file_reads, 0);
}

#[tokio::test]
async fn test_callback_may_start_another_operation() {
    let (session, handle) = TestFixtures::ready_session().await;
    handle.store_file("first.txt", Content::from("1"));
    let session = Arc::new(session);

    let (callback, follow_up) = capture();
    let inner = Arc::clone(&session);
    session
        .get_file("first.txt", &GetFileOptions::new(false), move |outcome| {
            let text = outcome.into_value().and_then(|c| c.as_text().map(String::from));
            let payload = format!("{}+1", text.unwrap_or_default());
            inner
                .put_file("second.txt", payload, &PutFileOptions::new(false), callback)
                .unwrap();
        })
        .unwrap();

    assert!(received(follow_up).await.has_value());
    assert_eq!(handle.stored_file("second.txt"), Some(Content::from("1+1")));
}

#[tokio::test]
async fn test_engine_failure_surfaces_as_error() {
    let (session, handle) = TestFixtures::ready_session().await;
    handle.fail_evaluations("script crashed");

    let result = session.make_auth_response(TEST_PRIVATE_KEY).await;
    assert!(matches!(result, Err(BridgeError::Engine(_))));
}

#[tokio::test]
async fn test_engine_failure_answers_every_waiting_caller() {
    let (session, handle) = TestFixtures::ready_session().await;
    handle.fail_evaluations("script crashed");

    let (callback, read) = capture();
    session.get_file("a.txt", &GetFileOptions::new(false), callback).unwrap();
    let (callback, stored) = capture();
    session
        .put_file("b.txt", "B", &PutFileOptions::new(false), callback)
        .unwrap();
    let (callback, profile) = capture();
    session.lookup_profile(TEST_USERNAME, None, callback).unwrap();
    let (callback, signed_in) = capture();
    session.handle_pending_sign_in("token", callback).unwrap();
    let (callback, bucket) = capture();
    session
        .get_app_bucket_url("https://hub.blockstack.org", TEST_PRIVATE_KEY, callback)
        .unwrap();

    assert!(received(read).await.error().is_some_and(|e| e.contains("script crashed")));
    assert!(received(stored).await.error().is_some_and(|e| e.contains("script crashed")));
    assert!(received(profile).await.is_error());
    assert!(received(signed_in).await.is_error());
    assert!(received(bucket).await.is_error());
    assert_eq!(session.pending_summary(), PendingSummary::default());
}

#[tokio::test]
async fn test_dropping_session_fails_waiting_callbacks() {
    let (session, handle) = TestFixtures::ready_session().await;
    handle.set_deferred(true);

    let (callback, stored) = capture();
    session
        .put_file("notes.txt", "draft", &PutFileOptions::new(false), callback)
        .unwrap();
    let (callback, profile) = capture();
    session.lookup_profile(TEST_USERNAME, None, callback).unwrap();
    handle.wait_for_deferred(2, WAIT);

    drop(session);
    assert_eq!(received(stored).await.error(), Some(SESSION_RELEASED));
    assert_eq!(received(profile).await.error(), Some(SESSION_RELEASED));
}

#[tokio::test]
async fn test_engine_start_failure_reaches_host() {
    let (failed_tx, failed_rx) = oneshot::channel();
    let session = TestFixtures::session_builder(
        Arc::new(RecordingLauncher::new(true)),
        Arc::new(RecordingNotifier::default()),
    )
    .on_start_failure(move |e| {
        let _ = failed_tx.send(e);
    })
    .start(
        || Err::<MockProtocolEngine, _>(EngineError::new("engine unavailable")),
        || {},
    )
    .unwrap();

    let error = tokio::time::timeout(WAIT, failed_rx).await.unwrap().unwrap();
    assert!(matches!(error, BridgeError::Engine(_)));
    assert!(error.to_string().contains("engine unavailable"));
    assert!(!session.is_loaded());
}

#[tokio::test]
async fn test_all_host_functions_are_registered() {
    let (_session, handle) = TestFixtures::ready_session().await;
    let mut expected: Vec<String> = blockstack_bridge::session::host_functions::names()
        .map(String::from)
        .collect();
    expected.sort();
    assert_eq!(handle.registered_host_functions(), expected);
}
