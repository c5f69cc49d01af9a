//! Test fixtures providing pre-built test objects
//!
//! Sessions built here run on a [`MockProtocolEngine`] and redirect through a
//! [`RecordingLauncher`], so no test ever opens a real browser.

use crate::models::{AppConfig, Scope};
use crate::redirect::{ExternalLauncher, ExternalRedirectHandler, Notifier};
use crate::session::{BlockstackSession, SessionBuilder};
use crate::testing::constants::{
    TEST_APP_DOMAIN, TEST_BOOTSTRAP_URL, TEST_BUCKET_ADDRESS, TEST_HOSTED_BROWSER_URL,
    TEST_PRIVATE_KEY, TEST_USERNAME,
};
use crate::testing::mock::{MockProtocolEngine, MockScriptHandle, RecordingLauncher, RecordingNotifier};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

/// Session plus the collaborators a test may want to inspect
pub struct SessionHarness {
    pub session: BlockstackSession,
    pub handle: MockScriptHandle,
    pub launcher: Arc<RecordingLauncher>,
    pub notifier: Arc<RecordingNotifier>,
}

/// Central fixture provider for all test data
pub struct TestFixtures;

impl TestFixtures {
    /// App configuration requesting storage and email scopes
    ///
    /// # Panics
    ///
    /// Panics if the test domain constant is not a valid URL.
    #[must_use]
    pub fn app_config() -> AppConfig {
        AppConfig::from_domain(TEST_APP_DOMAIN, [Scope::StoreWrite, Scope::Email]).unwrap()
    }

    /// Profile the mock engine serves for [`TEST_USERNAME`]
    #[must_use]
    pub fn profile_json() -> Value {
        json!({
            "@type": "Person",
            "@context": "http://schema.org",
            "name": "Alice",
            "description": "Testing decentralized apps",
            "image": [{"@type": "ImageObject", "name": "avatar", "contentUrl": "https://example.com/alice.png"}],
        })
    }

    /// User record as produced by a completed sign-in
    #[must_use]
    pub fn user_json() -> Value {
        json!({
            "username": TEST_USERNAME,
            "decentralizedID": format!("did:btc-addr:{TEST_BUCKET_ADDRESS}"),
            "appPrivateKey": TEST_PRIVATE_KEY,
            "hubUrl": "https://hub.blockstack.org",
            "profile": Self::profile_json(),
        })
    }

    /// Builder wired to the mock bootstrap URL and the given redirect collaborators
    ///
    /// # Panics
    ///
    /// Panics if the hosted browser constant is not a valid URL.
    #[must_use]
    pub fn session_builder(launcher: Arc<RecordingLauncher>, notifier: Arc<RecordingNotifier>) -> SessionBuilder {
        let redirect = ExternalRedirectHandler::new(
            TEST_HOSTED_BROWSER_URL,
            launcher as Arc<dyn ExternalLauncher>,
            notifier as Arc<dyn Notifier>,
        )
        .unwrap();
        SessionBuilder::new(Self::app_config())
            .bootstrap_url(TEST_BOOTSTRAP_URL)
            .navigation_interceptor(Arc::new(redirect))
    }

    /// Session whose ready signal has been received
    ///
    /// # Panics
    ///
    /// Panics if the mock runtime does not become ready within five seconds.
    pub async fn harness() -> SessionHarness {
        let launcher = Arc::new(RecordingLauncher::new(true));
        let notifier = Arc::new(RecordingNotifier::default());
        let (engine, handle) = MockProtocolEngine::new();
        let (ready_tx, ready_rx) = oneshot::channel();

        let session = Self::session_builder(Arc::clone(&launcher), Arc::clone(&notifier))
            .start(move || Ok(engine), move || {
                let _ = ready_tx.send(());
            })
            .unwrap();
        tokio::time::timeout(Duration::from_secs(5), ready_rx)
            .await
            .expect("mock runtime did not become ready")
            .unwrap();

        SessionHarness {
            session,
            handle,
            launcher,
            notifier,
        }
    }

    /// Ready session and its engine handle
    pub async fn ready_session() -> (BlockstackSession, MockScriptHandle) {
        let harness = Self::harness().await;
        (harness.session, harness.handle)
    }

    /// Session whose runtime never signals readiness
    ///
    /// # Panics
    ///
    /// Panics if the mock runtime thread cannot be started.
    #[must_use]
    pub fn unready_session() -> (BlockstackSession, MockScriptHandle) {
        let (engine, handle) = MockProtocolEngine::new();
        let engine = engine.without_auto_ready();
        let session = Self::session_builder(
            Arc::new(RecordingLauncher::new(true)),
            Arc::new(RecordingNotifier::default()),
        )
        .start(move || Ok(engine), || {})
        .unwrap();
        handle.wait_until_loading(Duration::from_secs(5));
        (session, handle)
    }
}
