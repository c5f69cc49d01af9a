//! Mock objects and fake implementations for testing
//!
//! `MockProtocolEngine` is an in-process [`ScriptEngine`] that parses the
//! outbound call expressions and emulates the protocol script: sign-in,
//! profiles, in-memory storage and a reversible fake cipher. Promise results
//! are pushed back through the registered host functions, either immediately
//! or, in deferred mode, when the test flushes them.

use crate::error::EngineError;
use crate::models::Content;
use crate::redirect::{ExternalLauncher, Notifier};
use crate::runtime::{HostFunction, NavigationInterceptor, PageFinished, ScriptEngine};
use crate::session::host_functions::{
    GET_APP_BUCKET_URL_RESULT, GET_FILE_FAILURE, GET_FILE_RESULT, GET_USER_APP_FILE_URL_RESULT,
    LOOKUP_PROFILE_FAILURE, LOOKUP_PROFILE_RESULT, NO_URL, PUT_FILE_RESULT, SIGN_IN_FAILURE,
    SIGN_IN_SUCCESS, VALIDATE_PROOFS_RESULT,
};
use crate::testing::constants::{TEST_BUCKET_ADDRESS, TEST_USERNAME};
use crate::testing::fixtures::TestFixtures;
use crate::testing::script_parser::{parse_call, ParsedCall};
use async_trait::async_trait;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine as _;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use url::Url;

/// Host function call produced by the emulated script
pub type HostCall = (String, Vec<Value>);

const FAKE_JWT_HEADER: &str = "eyJ0eXAiOiJKV1QiLCJhbGciOiJFUzI1NksifQ";
const CIPHER_MASK: u8 = 0x5a;

#[derive(Default)]
struct MockState {
    auto_ready: bool,
    loading: bool,
    bootstrap_url: Option<String>,
    page_finished: Option<PageFinished>,
    host_functions: HashMap<String, HostFunction>,
    interceptor: Option<Arc<dyn NavigationInterceptor>>,
    expressions: Vec<String>,
    navigations: Vec<(String, bool)>,
    deferred: bool,
    queued: Vec<HostCall>,
    files: HashMap<String, Content>,
    profiles: HashMap<String, Value>,
    signed_in: Option<Value>,
    evaluation_failure: Option<String>,
}

struct Shared {
    state: Mutex<MockState>,
    changed: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update<R>(&self, f: impl FnOnce(&mut MockState) -> R) -> R {
        let result = f(&mut self.lock());
        self.changed.notify_all();
        result
    }

    /// Block until `ready` holds or `timeout` passes
    fn wait_until<R>(&self, timeout: Duration, mut ready: impl FnMut(&MockState) -> Option<R>) -> R {
        let deadline = Instant::now() + timeout;
        let mut state = self.lock();
        loop {
            if let Some(result) = ready(&state) {
                return result;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            assert!(!remaining.is_zero(), "timed out waiting for the mock engine");
            state = self
                .changed
                .wait_timeout(state, remaining)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    fn invoke(&self, name: &str, args: &[Value]) {
        let function = self.lock().host_functions.get(name).cloned();
        match function {
            Some(function) => function(args),
            None => log::warn!("Mock engine has no host function {name}"),
        }
    }
}

/// In-memory protocol engine
pub struct MockProtocolEngine {
    shared: Arc<Shared>,
}

/// Test-side handle onto a running [`MockProtocolEngine`]
#[derive(Clone)]
pub struct MockScriptHandle {
    shared: Arc<Shared>,
}

impl MockProtocolEngine {
    /// Engine that reports its bootstrap resource as loaded immediately
    #[must_use]
    pub fn new() -> (Self, MockScriptHandle) {
        let mut state = MockState {
            auto_ready: true,
            ..MockState::default()
        };
        state
            .profiles
            .insert(TEST_USERNAME.to_string(), TestFixtures::profile_json());
        let shared = Arc::new(Shared {
            state: Mutex::new(state),
            changed: Condvar::new(),
        });
        (
            Self {
                shared: Arc::clone(&shared),
            },
            MockScriptHandle { shared },
        )
    }

    /// Leave the load-completion signal to [`MockScriptHandle::finish_page`]
    #[must_use]
    pub fn without_auto_ready(self) -> Self {
        self.shared.update(|state| state.auto_ready = false);
        self
    }
}

#[async_trait(?Send)]
impl ScriptEngine for MockProtocolEngine {
    fn register_host_function(&mut self, name: &str, function: HostFunction) {
        self.shared.update(|state| {
            state.host_functions.insert(name.to_string(), function);
        });
    }

    fn set_navigation_interceptor(&mut self, interceptor: Arc<dyn NavigationInterceptor>) {
        self.shared.update(|state| state.interceptor = Some(interceptor));
    }

    fn load(&mut self, url: &str, on_page_finished: PageFinished) -> Result<(), EngineError> {
        let auto_ready = self.shared.update(|state| {
            state.loading = true;
            state.bootstrap_url = Some(url.to_string());
            state.page_finished = Some(Arc::clone(&on_page_finished));
            state.auto_ready
        });
        if auto_ready {
            on_page_finished(url);
        }
        Ok(())
    }

    async fn evaluate(&mut self, expression: &str) -> Result<Option<String>, EngineError> {
        let (result, effects) = self.shared.update(|state| {
            state.expressions.push(expression.to_string());
            if let Some(message) = &state.evaluation_failure {
                return (Err(EngineError::new(message.clone())), Effects::default());
            }
            let mut effects = Effects::default();
            let result = parse_call(expression)
                .map_err(|e| EngineError::new(format!("SyntaxError: {e:#}")))
                .and_then(|call| state.dispatch(&call, &mut effects));
            if state.deferred {
                state.queued.append(&mut effects.host_calls);
            }
            (result, effects)
        });

        for (name, args) in effects.host_calls {
            self.shared.invoke(&name, &args);
        }
        for target in effects.navigations {
            self.navigate(&target);
        }
        result
    }
}

impl MockProtocolEngine {
    fn navigate(&self, target: &str) {
        let interceptor = self.shared.lock().interceptor.clone();
        let overridden = interceptor.is_some_and(|interceptor| interceptor.should_override(target));
        self.shared
            .update(|state| state.navigations.push((target.to_string(), overridden)));
    }
}

/// Side effects of one emulated script call
#[derive(Default)]
struct Effects {
    host_calls: Vec<HostCall>,
    navigations: Vec<String>,
}

impl Effects {
    fn push(&mut self, name: &str, args: Vec<Value>) {
        self.host_calls.push((name.to_string(), args));
    }
}

fn arg<'a>(call: &'a ParsedCall, index: usize) -> Result<&'a str, EngineError> {
    call.string(index).ok_or_else(|| {
        EngineError::new(format!("TypeError: {} expects a string argument {index}", call.function))
    })
}

fn json_text(value: &Value) -> Option<String> {
    Some(value.to_string())
}

fn fake_jwt(payload: &Value) -> String {
    format!(
        "{FAKE_JWT_HEADER}.{}.c2lnbmF0dXJl",
        URL_SAFE_NO_PAD.encode(payload.to_string())
    )
}

fn jwt_payload(token: &str) -> Option<Value> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
    serde_json::from_slice(&bytes).ok()
}

fn mask(bytes: &[u8]) -> Vec<u8> {
    bytes.iter().map(|byte| byte ^ CIPHER_MASK).collect()
}

fn file_url(path: &str) -> String {
    format!("https://gaia.blockstack.org/hub/{TEST_BUCKET_ADDRESS}/{path}")
}

impl MockState {
    fn dispatch(&mut self, call: &ParsedCall, effects: &mut Effects) -> Result<Option<String>, EngineError> {
        match call.function.as_str() {
            "makeAuthResponse" => {
                let key = arg(call, 0)?;
                if key.is_empty() {
                    return Ok(Some("null".to_string()));
                }
                let token = fake_jwt(&json!({"username": TEST_USERNAME, "appPrivateKey": key}));
                Ok(json_text(&Value::String(token)))
            }
            "redirectToSignIn" => {
                let request = json!({
                    "domain_name": arg(call, 0)?,
                    "redirect_uri": arg(call, 1)?,
                    "manifest_uri": arg(call, 2)?,
                    "scopes": call.args.get(3).cloned().unwrap_or(Value::Null),
                });
                effects.navigations.push(format!("blockstack:{}", fake_jwt(&request)));
                Ok(None)
            }
            "handlePendingSignIn" => {
                let token = arg(call, 1)?;
                match jwt_payload(token) {
                    Some(payload) => {
                        let username = payload["username"].as_str().unwrap_or(TEST_USERNAME).to_string();
                        let user = json!({
                            "username": username,
                            "decentralizedID": format!("did:btc-addr:{TEST_BUCKET_ADDRESS}"),
                            "appPrivateKey": payload["appPrivateKey"],
                            "hubUrl": "https://hub.blockstack.org",
                            "profile": self.profiles.get(&username).cloned().unwrap_or(Value::Null),
                        });
                        self.signed_in = Some(user.clone());
                        effects.push(SIGN_IN_SUCCESS, vec![Value::String(user.to_string())]);
                    }
                    None => effects.push(SIGN_IN_FAILURE, vec![json!("Invalid auth response")]),
                }
                Ok(None)
            }
            "loadUserData" => Ok(Some(
                self.signed_in
                    .as_ref()
                    .map_or_else(|| "null".to_string(), Value::to_string),
            )),
            "isUserSignedIn" => Ok(Some(self.signed_in.is_some().to_string())),
            "signUserOut" => {
                self.signed_in = None;
                Ok(Some("null".to_string()))
            }
            "lookupProfile" => {
                let username = arg(call, 0)?;
                match self.profiles.get(username) {
                    Some(profile) => effects.push(
                        LOOKUP_PROFILE_RESULT,
                        vec![json!(username), Value::String(profile.to_string())],
                    ),
                    None => effects.push(
                        LOOKUP_PROFILE_FAILURE,
                        vec![json!(username), json!(format!("Name {username} not found"))],
                    ),
                }
                Ok(None)
            }
            "validateProofs" => {
                arg(call, 1)?;
                effects.push(VALIDATE_PROOFS_RESULT, vec![json!("[]")]);
                Ok(None)
            }
            "getFile" => {
                let path = arg(call, 0)?;
                let token = arg(call, 2)?;
                match self.files.get(path) {
                    Some(content) => {
                        let (payload, is_binary) = content.to_transport();
                        effects.push(GET_FILE_RESULT, vec![json!(payload), json!(token), json!(is_binary)]);
                    }
                    None => effects.push(
                        GET_FILE_FAILURE,
                        vec![json!(format!("Error: {path} not found")), json!(token)],
                    ),
                }
                Ok(None)
            }
            "putFile" => {
                let path = arg(call, 0)?.to_string();
                let payload = arg(call, 1)?;
                let token = arg(call, 3)?;
                let is_binary = call.boolean(4).unwrap_or(false);
                let content = Content::from_transport(payload, is_binary)
                    .map_err(|e| EngineError::new(format!("InvalidCharacterError: {e}")))?;
                effects.push(PUT_FILE_RESULT, vec![json!(file_url(&path)), json!(token)]);
                self.files.insert(path, content);
                Ok(None)
            }
            "encryptContent" => {
                let payload = arg(call, 0)?;
                let is_binary = call.boolean(2).unwrap_or(false);
                let plain = Content::from_transport(payload, is_binary)
                    .map_err(|e| EngineError::new(format!("InvalidCharacterError: {e}")))?;
                let bytes = match &plain {
                    Content::Text(text) => text.as_bytes().to_vec(),
                    Content::Bytes(bytes) => bytes.clone(),
                };
                let cipher = json!({
                    "iv": "00112233445566778899aabbccddeeff",
                    "ephemeralPK": "02a1b2c3d4e5f60718293a4b5c6d7e8f90a1b2c3d4e5f60718293a4b5c6d7e8f90",
                    "cipherText": STANDARD.encode(mask(&bytes)),
                    "mac": "ffeeddccbbaa99887766554433221100",
                    "wasString": !is_binary,
                });
                Ok(json_text(&cipher))
            }
            "decryptContent" => {
                let payload = arg(call, 0)?;
                let is_binary = call.boolean(2).unwrap_or(false);
                Ok(Some(decrypt(payload, is_binary).unwrap_or_else(|| "null".to_string())))
            }
            "getAppBucketUrl" => {
                arg(call, 1)?;
                effects.push(
                    GET_APP_BUCKET_URL_RESULT,
                    vec![json!(format!("https://gaia.blockstack.org/hub/{TEST_BUCKET_ADDRESS}/"))],
                );
                Ok(None)
            }
            "getUserAppFileUrl" => {
                let path = arg(call, 0)?;
                let url = if self.files.contains_key(path) {
                    file_url(path)
                } else {
                    NO_URL.to_string()
                };
                effects.push(GET_USER_APP_FILE_URL_RESULT, vec![json!(url)]);
                Ok(None)
            }
            other => Err(EngineError::new(format!("ReferenceError: {other} is not defined"))),
        }
    }
}

/// Reverse the fake cipher; `None` mirrors the script returning null
fn decrypt(payload: &str, is_binary: bool) -> Option<String> {
    let text = if is_binary {
        String::from_utf8(STANDARD.decode(payload).ok()?).ok()?
    } else {
        payload.to_string()
    };
    let cipher: Value = serde_json::from_str(&text).ok()?;
    let plain = mask(&STANDARD.decode(cipher["cipherText"].as_str()?).ok()?);
    let result = if cipher["wasString"].as_bool()? {
        String::from_utf8(plain).ok()?
    } else {
        STANDARD.encode(plain)
    };
    json_text(&Value::String(result))
}

impl MockScriptHandle {
    /// Block until the engine has started loading its bootstrap resource
    pub fn wait_until_loading(&self, timeout: Duration) {
        self.shared
            .wait_until(timeout, |state| state.loading.then_some(()));
    }

    /// Block until at least `count` expressions have been evaluated
    pub fn wait_for_expressions(&self, count: usize, timeout: Duration) -> Vec<String> {
        self.shared.wait_until(timeout, |state| {
            (state.expressions.len() >= count).then(|| state.expressions.clone())
        })
    }

    /// Block until at least `count` host calls are queued in deferred mode
    pub fn wait_for_deferred(&self, count: usize, timeout: Duration) -> Vec<HostCall> {
        self.shared.wait_until(timeout, |state| {
            (state.queued.len() >= count).then(|| state.queued.clone())
        })
    }

    /// Fire a load-completion signal for `url`
    pub fn finish_page(&self, url: &str) {
        let callback = self.shared.lock().page_finished.clone();
        if let Some(callback) = callback {
            callback(url);
        }
    }

    #[must_use]
    pub fn bootstrap_url(&self) -> Option<String> {
        self.shared.lock().bootstrap_url.clone()
    }

    #[must_use]
    pub fn evaluated_expressions(&self) -> Vec<String> {
        self.shared.lock().expressions.clone()
    }

    /// Navigation targets the script attempted, with the interceptor's verdict
    #[must_use]
    pub fn navigations(&self) -> Vec<(String, bool)> {
        self.shared.lock().navigations.clone()
    }

    #[must_use]
    pub fn registered_host_functions(&self) -> Vec<String> {
        let mut names: Vec<String> = self.shared.lock().host_functions.keys().cloned().collect();
        names.sort();
        names
    }

    /// Queue host calls instead of delivering them during evaluation
    pub fn set_deferred(&self, deferred: bool) {
        self.shared.update(|state| state.deferred = deferred);
    }

    /// Deliver queued host calls in the order they were produced
    pub fn flush_host_calls(&self) {
        let queued = self.shared.update(|state| std::mem::take(&mut state.queued));
        for (name, args) in queued {
            self.shared.invoke(&name, &args);
        }
    }

    /// Deliver queued host calls newest first
    pub fn flush_host_calls_reversed(&self) {
        let queued = self.shared.update(|state| std::mem::take(&mut state.queued));
        for (name, args) in queued.into_iter().rev() {
            self.shared.invoke(&name, &args);
        }
    }

    /// Call a registered host function as the script would
    pub fn invoke_host_function(&self, name: &str, args: &[Value]) {
        self.shared.invoke(name, args);
    }

    pub fn store_file(&self, path: &str, content: Content) {
        self.shared.update(|state| {
            state.files.insert(path.to_string(), content);
        });
    }

    #[must_use]
    pub fn stored_file(&self, path: &str) -> Option<Content> {
        self.shared.lock().files.get(path).cloned()
    }

    pub fn add_profile(&self, username: &str, profile: Value) {
        self.shared.update(|state| {
            state.profiles.insert(username.to_string(), profile);
        });
    }

    pub fn set_signed_in(&self, user: Option<Value>) {
        self.shared.update(|state| state.signed_in = user);
    }

    /// Make every following evaluation fail with `message`
    pub fn fail_evaluations(&self, message: &str) {
        self.shared
            .update(|state| state.evaluation_failure = Some(message.to_string()));
    }
}

/// Launcher that records URLs instead of opening them
#[derive(Debug, Default)]
pub struct RecordingLauncher {
    available: bool,
    launched: Mutex<Vec<String>>,
}

impl RecordingLauncher {
    #[must_use]
    pub fn new(available: bool) -> Self {
        Self {
            available,
            launched: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn launched(&self) -> Vec<String> {
        self.launched
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ExternalLauncher for RecordingLauncher {
    fn is_available(&self) -> bool {
        self.available
    }

    fn launch(&self, url: &Url) -> anyhow::Result<()> {
        self.launched
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(url.to_string());
        Ok(())
    }
}

/// Notifier that records messages
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, message: &str) {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fake_cipher_reverses() {
        let mut effects = Effects::default();
        let mut state = MockState::default();
        let call = parse_call("encryptContent('secret', {}, false)").unwrap();
        let cipher = state.dispatch(&call, &mut effects).unwrap().unwrap();

        let plain = decrypt(&cipher, false).unwrap();
        assert_eq!(plain, "\"secret\"");
        assert!(effects.host_calls.is_empty());
    }

    #[test]
    fn test_unknown_function_is_a_reference_error() {
        let mut state = MockState::default();
        let call = parse_call("noSuchFunction()").unwrap();
        let err = state.dispatch(&call, &mut Effects::default()).unwrap_err();
        assert!(err.to_string().contains("not defined"));
    }

    #[test]
    fn test_auth_response_carries_key() {
        let token = fake_jwt(&json!({"appPrivateKey": "k"}));
        assert_eq!(jwt_payload(&token).unwrap()["appPrivateKey"], "k");
        assert!(jwt_payload("garbage").is_none());
    }
}
