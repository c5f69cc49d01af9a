//! Session facade
//!
//! `BlockstackSession` is the host-facing API. Every operation checks that the
//! runtime has signalled readiness, builds a script call, and either interprets
//! the direct result (`async` operations returning an [`Outcome`]) or parks a
//! callback until the script pushes the answer through a host function.
//!
//! ## Organization
//!
//! 1. **State** - Shared state mutated by host functions
//! 2. **Construction** - `SessionBuilder`
//! 3. **Authentication** - Sign-in, user data, sign-out
//! 4. **Profiles** - Name lookups and proof validation
//! 5. **Storage URLs** - Bucket and file URLs
//!
//! File storage lives in `storage.rs`, encryption in `encryption.rs`.

use crate::error::{BridgeError, EngineError};
use crate::models::{AppConfig, Content, Profile, UserData};
use crate::outcome::Outcome;
use crate::redirect::ExternalRedirectHandler;
use crate::runtime::script_call::{non_null, unquote};
use crate::runtime::{NavigationInterceptor, RuntimeAdapter, ScriptCall, ScriptEngine};
use crate::session::host_functions;
use crate::session::pending::{Callback, CorrelationTable, CorrelationToken, PendingSlot};
use crate::settings::{BridgeSettings, DEFAULT_BOOTSTRAP_URL, DEFAULT_NAME_LOOKUP_URL};
use crate::utils::logging::LoggingHelper;
use log::debug;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

// =============================================================================
// 1. State
// =============================================================================

/// Failure delivered to callbacks still waiting when the session goes away
pub const SESSION_RELEASED: &str = "session released";

/// State shared between the facade and the host functions
///
/// Tables are individually shared so a failed submission can resolve its own
/// entry from the runtime thread.
pub(crate) struct SessionState {
    loaded: AtomicBool,
    user_data: Mutex<Option<UserData>>,
    pub(crate) sign_in: Arc<PendingSlot<UserData>>,
    pub(crate) lookup_profile: Arc<CorrelationTable<String, Profile>>,
    pub(crate) get_file: Arc<CorrelationTable<CorrelationToken, Content>>,
    pub(crate) put_file: Arc<CorrelationTable<CorrelationToken, String>>,
    pub(crate) validate_proofs: Arc<PendingSlot<Value>>,
    pub(crate) app_bucket_url: Arc<PendingSlot<String>>,
    pub(crate) user_app_file_url: Arc<PendingSlot<String>>,
}

impl SessionState {
    fn new() -> Self {
        Self {
            loaded: AtomicBool::new(false),
            user_data: Mutex::new(None),
            sign_in: Arc::new(PendingSlot::new("signIn")),
            lookup_profile: Arc::new(CorrelationTable::new("lookupProfile")),
            get_file: Arc::new(CorrelationTable::new("getFile")),
            put_file: Arc::new(CorrelationTable::new("putFile")),
            validate_proofs: Arc::new(PendingSlot::new("validateProofs")),
            app_bucket_url: Arc::new(PendingSlot::new("getAppBucketUrl")),
            user_app_file_url: Arc::new(PendingSlot::new("getUserAppFileUrl")),
        }
    }

    fn mark_loaded(&self) {
        self.loaded.store(true, Ordering::SeqCst);
    }

    fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }

    pub(crate) fn cache_user(&self, user: Option<UserData>) {
        *self.user_data.lock().unwrap_or_else(PoisonError::into_inner) = user;
    }

    fn cached_user(&self) -> Option<UserData> {
        self.user_data
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Answer every waiting callback with `reason`; returns how many ran
    fn fail_pending(&self, reason: &str) -> usize {
        let slots = [
            self.sign_in.fail(reason),
            self.validate_proofs.fail(reason),
            self.app_bucket_url.fail(reason),
            self.user_app_file_url.fail(reason),
        ];
        slots.into_iter().filter(|failed| *failed).count()
            + self.lookup_profile.fail_all(reason)
            + self.get_file.fail_all(reason)
            + self.put_file.fail_all(reason)
    }
}

/// Number of requests still waiting for the script to answer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PendingSummary {
    pub sign_in: bool,
    pub profile_lookups: usize,
    pub file_reads: usize,
    pub file_writes: usize,
}

// =============================================================================
// 2. Construction
// =============================================================================

/// Configures and starts a [`BlockstackSession`]
pub struct SessionBuilder {
    config: AppConfig,
    name_lookup_url: String,
    bootstrap_url: String,
    interceptor: Option<Arc<dyn NavigationInterceptor>>,
    on_start_failure: Option<Box<dyn FnOnce(BridgeError) + Send + 'static>>,
}

impl SessionBuilder {
    #[must_use]
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            name_lookup_url: DEFAULT_NAME_LOOKUP_URL.to_string(),
            bootstrap_url: DEFAULT_BOOTSTRAP_URL.to_string(),
            interceptor: None,
            on_start_failure: None,
        }
    }

    /// Builder populated from loaded settings, including the redirect handler
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::Configuration` if the app domain or hosted
    /// browser URL in the settings is invalid.
    pub fn from_settings(settings: &BridgeSettings) -> Result<Self, BridgeError> {
        let redirect = ExternalRedirectHandler::from_settings(settings)?;
        Ok(Self::new(settings.app_config()?)
            .name_lookup_url(&settings.network.name_lookup_url)
            .bootstrap_url(&settings.runtime.bootstrap_url)
            .navigation_interceptor(Arc::new(redirect)))
    }

    /// Name lookup service used when completing a pending sign-in
    #[must_use]
    pub fn name_lookup_url(mut self, url: &str) -> Self {
        self.name_lookup_url = url.to_string();
        self
    }

    /// Resource whose load completion marks the runtime as ready
    #[must_use]
    pub fn bootstrap_url(mut self, url: &str) -> Self {
        self.bootstrap_url = url.to_string();
        self
    }

    #[must_use]
    pub fn navigation_interceptor(mut self, interceptor: Arc<dyn NavigationInterceptor>) -> Self {
        self.interceptor = Some(interceptor);
        self
    }

    /// Runs instead of the ready callback if the engine cannot start
    #[must_use]
    pub fn on_start_failure(mut self, callback: impl FnOnce(BridgeError) + Send + 'static) -> Self {
        self.on_start_failure = Some(Box::new(callback));
        self
    }

    /// Start the runtime; `on_loaded` runs once the session is ready to use
    ///
    /// # Errors
    ///
    /// Returns an error if the hosted browser default is invalid or the
    /// runtime thread cannot be started.
    pub fn start<E, F>(
        self,
        factory: F,
        on_loaded: impl FnOnce() + Send + 'static,
    ) -> Result<BlockstackSession, BridgeError>
    where
        E: ScriptEngine + 'static,
        F: FnOnce() -> Result<E, EngineError> + Send + 'static,
    {
        let interceptor: Arc<dyn NavigationInterceptor> = match self.interceptor {
            Some(interceptor) => interceptor,
            None => Arc::new(ExternalRedirectHandler::system_default()?),
        };

        let state = Arc::new(SessionState::new());
        let mut runtime = RuntimeAdapter::builder(self.bootstrap_url);
        host_functions::register_all(&mut runtime, &state)?;

        let mut runtime = runtime.navigation_interceptor(interceptor);
        if let Some(on_start_failure) = self.on_start_failure {
            runtime = runtime.on_startup_failure(move |e| on_start_failure(BridgeError::Engine(e)));
        }

        let ready_state = Arc::clone(&state);
        let runtime = runtime.initialize(factory, move || {
            ready_state.mark_loaded();
            on_loaded();
        })?;

        Ok(BlockstackSession {
            config: self.config,
            name_lookup_url: self.name_lookup_url,
            runtime,
            state,
        })
    }
}

/// Host-facing session over one embedded protocol runtime
pub struct BlockstackSession {
    config: AppConfig,
    name_lookup_url: String,
    runtime: RuntimeAdapter,
    pub(crate) state: Arc<SessionState>,
}

impl BlockstackSession {
    #[must_use]
    pub fn builder(config: AppConfig) -> SessionBuilder {
        SessionBuilder::new(config)
    }

    /// Whether the ready signal has been received
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.state.is_loaded()
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    #[must_use]
    pub fn name_lookup_url(&self) -> &str {
        &self.name_lookup_url
    }

    /// User record cached by the last sign-in or `load_user_data` call
    #[must_use]
    pub fn cached_user_data(&self) -> Option<UserData> {
        self.state.cached_user()
    }

    #[must_use]
    pub fn pending_summary(&self) -> PendingSummary {
        PendingSummary {
            sign_in: self.state.sign_in.is_pending(),
            profile_lookups: self.state.lookup_profile.len(),
            file_reads: self.state.get_file.len(),
            file_writes: self.state.put_file.len(),
        }
    }

    /// Stop the runtime and drop the engine
    ///
    /// Callbacks still waiting for an answer receive a [`SESSION_RELEASED`]
    /// failure. Dropping the session has the same effect.
    pub fn release(self) {
        drop(self);
    }

    pub(crate) fn ensure_loaded(&self) -> Result<(), BridgeError> {
        if self.is_loaded() {
            Ok(())
        } else {
            Err(BridgeError::NotInitialized)
        }
    }

    pub(crate) async fn evaluate(&self, call: &ScriptCall) -> Result<Option<String>, BridgeError> {
        LoggingHelper::log_script_call(call.function());
        self.runtime.evaluate(call.to_expression()).await
    }

    pub(crate) fn submit(
        &self,
        call: &ScriptCall,
        on_failure: impl FnOnce(BridgeError) + Send + 'static,
    ) -> Result<(), BridgeError> {
        LoggingHelper::log_script_call(call.function());
        self.runtime.submit(call.to_expression(), on_failure)
    }

    /// Submit a call whose answer arrives in `slot`
    ///
    /// An engine failure answers the slot with a failure. If the call cannot
    /// be queued at all, the registration is undone and the error returned.
    fn submit_with_slot<T: 'static>(
        &self,
        slot: &Arc<PendingSlot<T>>,
        callback: Callback<T>,
        call: &ScriptCall,
    ) -> Result<(), BridgeError> {
        slot.register(callback);
        let pending = Arc::clone(slot);
        self.submit(call, move |e| {
            pending.resolve(Outcome::failure(e.to_string()));
        })
        .inspect_err(|_| {
            slot.discard();
        })
    }

    // =========================================================================
    // 3. Authentication
    // =========================================================================

    /// Create an auth response token signed with `private_key`
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::NotInitialized` before the ready signal and
    /// runtime errors if the evaluation could not run.
    pub async fn make_auth_response(&self, private_key: &str) -> Result<Outcome<String>, BridgeError> {
        self.ensure_loaded()?;
        let call = ScriptCall::new("makeAuthResponse").string(private_key);
        let result = self.evaluate(&call).await?;
        Ok(match non_null(result) {
            Some(token) => Outcome::success(unquote(&token)),
            None => Outcome::failure("no auth response"),
        })
    }

    /// Complete a sign-in from the auth response delivered to the app's redirect URI
    ///
    /// Only the most recent pending sign-in is answered.
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::NotInitialized` before the ready signal and
    /// `BridgeError::RuntimeClosed` after shutdown.
    pub fn handle_pending_sign_in(
        &self,
        auth_response: &str,
        callback: impl FnOnce(Outcome<UserData>) + Send + 'static,
    ) -> Result<(), BridgeError> {
        self.ensure_loaded()?;
        debug!("handlePendingSignIn");
        let call = ScriptCall::new("handlePendingSignIn")
            .string(&self.name_lookup_url)
            .string(auth_response);
        self.submit_with_slot(&self.state.sign_in, Box::new(callback), &call)
    }

    /// Build an auth request from the app configuration and start the sign-in flow
    ///
    /// The script answers by navigating, which the redirect handler turns into
    /// an external browser launch.
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::NotInitialized` before the ready signal and
    /// `BridgeError::RuntimeClosed` after shutdown.
    pub fn redirect_user_to_sign_in(&self) -> Result<(), BridgeError> {
        self.ensure_loaded()?;
        debug!("redirectUserToSignIn");
        let call = ScriptCall::new("redirectToSignIn")
            .string(self.config.app_domain_str())
            .string(self.config.redirect_uri.as_str())
            .string(self.config.manifest_uri.as_str())
            .raw_json(self.config.scopes_json());
        // Nothing waits on the redirect; the runtime logs the failure
        self.submit(&call, |_| {})
    }

    /// Load the signed-in user's record and cache it
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::NotInitialized` before the ready signal and
    /// `BridgeError::Parse` if the record is not JSON.
    pub async fn load_user_data(&self) -> Result<Option<UserData>, BridgeError> {
        self.ensure_loaded()?;
        let result = self.evaluate(&ScriptCall::new("loadUserData")).await?;
        let Some(text) = non_null(result) else {
            return Ok(None);
        };
        let user = UserData::from_json_str(&text)?;
        self.state.cache_user(Some(user.clone()));
        Ok(Some(user))
    }

    /// Check if a user is currently signed in
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::NotInitialized` before the ready signal.
    pub async fn is_user_signed_in(&self) -> Result<bool, BridgeError> {
        self.ensure_loaded()?;
        let result = self.evaluate(&ScriptCall::new("isUserSignedIn")).await?;
        Ok(result.as_deref().map(str::trim) == Some("true"))
    }

    /// Sign the user out and forget the cached user record
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::NotInitialized` before the ready signal.
    pub async fn sign_user_out(&self) -> Result<Outcome<()>, BridgeError> {
        self.ensure_loaded()?;
        self.evaluate(&ScriptCall::new("signUserOut")).await?;
        self.state.cache_user(None);
        Ok(Outcome::empty())
    }

    // =========================================================================
    // 4. Profiles
    // =========================================================================

    /// Look up the public profile of a registered name
    ///
    /// Lookups are keyed by username: a second lookup for the same name
    /// before the first resolves replaces the first caller's callback.
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::NotInitialized` before the ready signal and
    /// `BridgeError::RuntimeClosed` after shutdown.
    pub fn lookup_profile(
        &self,
        username: &str,
        zone_file_lookup_url: Option<&str>,
        callback: impl FnOnce(Outcome<Profile>) + Send + 'static,
    ) -> Result<(), BridgeError> {
        self.ensure_loaded()?;
        let mut call = ScriptCall::new("lookupProfile").string(username);
        if let Some(url) = zone_file_lookup_url {
            call = call.string(url);
        }

        let lookups = &self.state.lookup_profile;
        lookups.register(username.to_string(), Box::new(callback));
        let pending = Arc::clone(lookups);
        let key = username.to_string();
        self.submit(&call, move |e| {
            pending.resolve(&key, Outcome::failure(e.to_string()));
        })
        .inspect_err(|_| {
            lookups.discard(&username.to_string());
        })
    }

    /// Validate the social proofs of a profile against its owner address
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::NotInitialized` before the ready signal and
    /// `BridgeError::RuntimeClosed` after shutdown.
    pub fn validate_proofs(
        &self,
        profile: &Profile,
        owner_address: &str,
        name: Option<&str>,
        callback: impl FnOnce(Outcome<Value>) + Send + 'static,
    ) -> Result<(), BridgeError> {
        self.ensure_loaded()?;
        let mut call = ScriptCall::new("validateProofs")
            .string(&profile.json().to_string())
            .string(owner_address);
        if let Some(name) = name {
            call = call.string(name);
        }
        self.submit_with_slot(&self.state.validate_proofs, Box::new(callback), &call)
    }

    // =========================================================================
    // 5. Storage URLs
    // =========================================================================

    /// Resolve the URL of the app's storage bucket on a hub
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::NotInitialized` before the ready signal and
    /// `BridgeError::RuntimeClosed` after shutdown.
    pub fn get_app_bucket_url(
        &self,
        gaia_hub_url: &str,
        app_private_key: &str,
        callback: impl FnOnce(Outcome<String>) + Send + 'static,
    ) -> Result<(), BridgeError> {
        self.ensure_loaded()?;
        let call = ScriptCall::new("getAppBucketUrl")
            .string(gaia_hub_url)
            .string(app_private_key);
        self.submit_with_slot(&self.state.app_bucket_url, Box::new(callback), &call)
    }

    /// Resolve the public URL of another user's file for an app origin
    ///
    /// The callback receives an empty outcome if the file has no URL.
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::NotInitialized` before the ready signal and
    /// `BridgeError::RuntimeClosed` after shutdown.
    pub fn get_user_app_file_url(
        &self,
        path: &str,
        username: &str,
        app_origin: &str,
        callback: impl FnOnce(Outcome<String>) + Send + 'static,
    ) -> Result<(), BridgeError> {
        self.ensure_loaded()?;
        let call = ScriptCall::new("getUserAppFileUrl")
            .string(path)
            .string(username)
            .string(app_origin);
        self.submit_with_slot(&self.state.user_app_file_url, Box::new(callback), &call)
    }
}

impl Drop for BlockstackSession {
    fn drop(&mut self) {
        self.runtime.shutdown();
        let failed = self.state.fail_pending(SESSION_RELEASED);
        LoggingHelper::log_session_released(failed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures::TestFixtures;
    use crate::testing::{capture, constants::TEST_USERNAME};
    use std::time::Duration;

    #[tokio::test]
    async fn test_operations_fail_before_ready_without_evaluating() {
        let (session, handle) = TestFixtures::unready_session();

        assert!(matches!(
            session.make_auth_response("key").await,
            Err(BridgeError::NotInitialized)
        ));
        assert!(matches!(session.is_user_signed_in().await, Err(BridgeError::NotInitialized)));
        assert!(matches!(session.load_user_data().await, Err(BridgeError::NotInitialized)));
        assert!(matches!(session.sign_user_out().await, Err(BridgeError::NotInitialized)));
        assert!(matches!(
            session.redirect_user_to_sign_in(),
            Err(BridgeError::NotInitialized)
        ));
        assert!(matches!(
            session.handle_pending_sign_in("token", |_| {}),
            Err(BridgeError::NotInitialized)
        ));
        assert!(matches!(
            session.lookup_profile(TEST_USERNAME, None, |_| {}),
            Err(BridgeError::NotInitialized)
        ));
        let profile = Profile::new(serde_json::json!({"name": "Alice"}));
        assert!(matches!(
            session.validate_proofs(&profile, "1Owner", None, |_| {}),
            Err(BridgeError::NotInitialized)
        ));
        assert!(matches!(
            session.get_app_bucket_url("https://hub.blockstack.org", "a1b2c3", |_| {}),
            Err(BridgeError::NotInitialized)
        ));
        assert!(matches!(
            session.get_user_app_file_url("a.txt", TEST_USERNAME, "https://app.example.com", |_| {}),
            Err(BridgeError::NotInitialized)
        ));
        let cipher = crate::models::CipherObject::new(serde_json::json!({"wasString": true}));
        assert!(matches!(
            session.decrypt_content(cipher, &crate::models::CryptoOptions::default()).await,
            Err(BridgeError::NotInitialized)
        ));

        assert!(handle.evaluated_expressions().is_empty());
        assert_eq!(session.pending_summary(), PendingSummary::default());
    }

    #[tokio::test]
    async fn test_make_auth_response() {
        let (session, _handle) = TestFixtures::ready_session().await;

        let outcome = session.make_auth_response("a1b2c3").await.unwrap();
        assert!(outcome.value().is_some_and(|token| token.starts_with("eyJ")));

        let outcome = session.make_auth_response("").await.unwrap();
        assert_eq!(outcome.error(), Some("no auth response"));
    }

    #[tokio::test]
    async fn test_sign_in_caches_user_and_sign_out_clears_it() {
        let (session, _handle) = TestFixtures::ready_session().await;
        let token = session.make_auth_response("a1b2c3").await.unwrap().into_value().unwrap();

        let (callback, received) = capture();
        session.handle_pending_sign_in(&token, callback).unwrap();
        let outcome = tokio::time::timeout(Duration::from_secs(5), received)
            .await
            .unwrap()
            .unwrap();

        let user = outcome.into_value().unwrap();
        assert_eq!(user.username(), Some(TEST_USERNAME));
        assert_eq!(session.cached_user_data(), Some(user));
        assert!(session.is_user_signed_in().await.unwrap());

        let signed_out = session.sign_user_out().await.unwrap();
        assert!(!signed_out.has_value() && !signed_out.is_error());
        assert!(session.cached_user_data().is_none());
        assert!(!session.is_user_signed_in().await.unwrap());
        assert!(session.load_user_data().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sign_in_failure_is_delivered() {
        let (session, _handle) = TestFixtures::ready_session().await;

        let (callback, received) = capture();
        session.handle_pending_sign_in("garbage", callback).unwrap();
        let outcome = tokio::time::timeout(Duration::from_secs(5), received)
            .await
            .unwrap()
            .unwrap();

        assert!(outcome.is_error());
        assert!(!session.pending_summary().sign_in);
    }

    #[tokio::test]
    async fn test_sign_in_expression_carries_name_lookup_url() {
        let (session, handle) = TestFixtures::ready_session().await;
        session.handle_pending_sign_in("tok", |_| {}).unwrap();
        handle.wait_for_expressions(1, Duration::from_secs(5));

        let expressions = handle.evaluated_expressions();
        assert_eq!(
            expressions.last().map(String::as_str),
            Some("handlePendingSignIn('https://core.blockstack.org/v1/names/', 'tok')")
        );
    }

    #[tokio::test]
    async fn test_redirect_expression_uses_config() {
        let (session, handle) = TestFixtures::ready_session().await;
        session.redirect_user_to_sign_in().unwrap();
        handle.wait_for_expressions(1, Duration::from_secs(5));

        let expected = format!(
            "redirectToSignIn('{}', '{}/redirect', '{}/manifest.json', [\"store_write\",\"email\"])",
            crate::testing::constants::TEST_APP_DOMAIN,
            crate::testing::constants::TEST_APP_DOMAIN,
            crate::testing::constants::TEST_APP_DOMAIN,
        );
        assert_eq!(handle.evaluated_expressions().last(), Some(&expected));
    }

    #[tokio::test]
    async fn test_lookup_profile_success_and_failure() {
        let (session, _handle) = TestFixtures::ready_session().await;

        let (callback, received) = capture();
        session.lookup_profile(TEST_USERNAME, None, callback).unwrap();
        let profile = tokio::time::timeout(Duration::from_secs(5), received)
            .await
            .unwrap()
            .unwrap()
            .into_value()
            .unwrap();
        assert_eq!(profile.name(), Some("Alice"));

        let (callback, received) = capture();
        session
            .lookup_profile("nobody.id", Some("https://core.blockstack.org/v1/names"), callback)
            .unwrap();
        let outcome = tokio::time::timeout(Duration::from_secs(5), received)
            .await
            .unwrap()
            .unwrap();
        assert!(outcome.is_error());
        assert_eq!(session.pending_summary().profile_lookups, 0);
    }

    #[tokio::test]
    async fn test_app_bucket_and_user_file_urls() {
        let (session, _handle) = TestFixtures::ready_session().await;

        let (callback, received) = capture();
        session
            .get_app_bucket_url("https://hub.blockstack.org", "a1b2c3", callback)
            .unwrap();
        let url = tokio::time::timeout(Duration::from_secs(5), received)
            .await
            .unwrap()
            .unwrap()
            .into_value()
            .unwrap();
        assert!(url.starts_with("https://gaia.blockstack.org/hub/"));

        let (callback, received) = capture();
        session
            .get_user_app_file_url("missing.txt", TEST_USERNAME, "https://app.example.com", callback)
            .unwrap();
        let outcome = tokio::time::timeout(Duration::from_secs(5), received)
            .await
            .unwrap()
            .unwrap();
        assert!(!outcome.has_value() && !outcome.is_error());
    }

    #[tokio::test]
    async fn test_engine_failure_answers_pending_slot() {
        let (session, handle) = TestFixtures::ready_session().await;
        handle.fail_evaluations("TypeError: blockstack is undefined");

        let (callback, received) = capture();
        session
            .get_user_app_file_url("a.txt", TEST_USERNAME, "https://app.example.com", callback)
            .unwrap();
        let outcome = tokio::time::timeout(Duration::from_secs(5), received)
            .await
            .unwrap()
            .unwrap();
        assert!(outcome.error().is_some_and(|e| e.contains("blockstack is undefined")));

        // The redirect has no caller to answer; the session stays usable
        session.redirect_user_to_sign_in().unwrap();
        assert!(session.is_user_signed_in().await.is_err());
        assert_eq!(session.pending_summary(), PendingSummary::default());
    }

    #[tokio::test]
    async fn test_release_fails_pending_sign_in() {
        let (session, handle) = TestFixtures::ready_session().await;
        handle.set_deferred(true);

        let (callback, received) = capture();
        session.handle_pending_sign_in("garbage", callback).unwrap();
        handle.wait_for_deferred(1, Duration::from_secs(5));

        session.release();
        let outcome = tokio::time::timeout(Duration::from_secs(5), received)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(outcome.error(), Some(SESSION_RELEASED));
    }

    #[tokio::test]
    async fn test_validate_proofs() {
        let (session, _handle) = TestFixtures::ready_session().await;
        let profile = Profile::new(serde_json::json!({"@type": "Person", "name": "Alice"}));

        let (callback, received) = capture();
        session
            .validate_proofs(&profile, "1Owner", Some(TEST_USERNAME), callback)
            .unwrap();
        let proofs = tokio::time::timeout(Duration::from_secs(5), received)
            .await
            .unwrap()
            .unwrap()
            .into_value()
            .unwrap();
        assert!(proofs.is_array());
    }
}
