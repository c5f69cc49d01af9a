//! Host functions the script calls to deliver asynchronous results
//!
//! Every handler resolves at most one pending callback. Results that arrive
//! with unusable payloads still resolve their callback, with a failure
//! outcome; results that arrive without a key to route them by are logged
//! and dropped.

use crate::error::BridgeError;
use crate::models::{Content, Profile, UserData};
use crate::outcome::Outcome;
use crate::runtime::{HostFunction, RuntimeAdapterBuilder};
use crate::session::manager::SessionState;
use crate::session::pending::CorrelationToken;
use crate::utils::logging::LoggingHelper;
use serde_json::Value;
use std::sync::Arc;

pub const SIGN_IN_SUCCESS: &str = "signInSuccess";
pub const SIGN_IN_FAILURE: &str = "signInFailure";
pub const LOOKUP_PROFILE_RESULT: &str = "lookupProfileResult";
pub const LOOKUP_PROFILE_FAILURE: &str = "lookupProfileFailure";
pub const GET_FILE_RESULT: &str = "getFileResult";
pub const GET_FILE_FAILURE: &str = "getFileFailure";
pub const PUT_FILE_RESULT: &str = "putFileResult";
pub const PUT_FILE_FAILURE: &str = "putFileFailure";
pub const VALIDATE_PROOFS_RESULT: &str = "validateProofsResult";
pub const VALIDATE_PROOFS_FAILURE: &str = "validateProofsFailure";
pub const GET_APP_BUCKET_URL_RESULT: &str = "getAppBucketUrlResult";
pub const GET_APP_BUCKET_URL_FAILURE: &str = "getAppBucketUrlFailure";
pub const GET_USER_APP_FILE_URL_RESULT: &str = "getUserAppFileUrlResult";
pub const GET_USER_APP_FILE_URL_FAILURE: &str = "getUserAppFileUrlFailure";

/// Placeholder the script sends when a user file has no public URL
pub const NO_URL: &str = "NO_URL";

type Handler = fn(&SessionState, &HostArgs<'_>);

const HANDLERS: &[(&str, Handler)] = &[
    (SIGN_IN_SUCCESS, sign_in_success),
    (SIGN_IN_FAILURE, sign_in_failure),
    (LOOKUP_PROFILE_RESULT, lookup_profile_result),
    (LOOKUP_PROFILE_FAILURE, lookup_profile_failure),
    (GET_FILE_RESULT, get_file_result),
    (GET_FILE_FAILURE, get_file_failure),
    (PUT_FILE_RESULT, put_file_result),
    (PUT_FILE_FAILURE, put_file_failure),
    (VALIDATE_PROOFS_RESULT, validate_proofs_result),
    (VALIDATE_PROOFS_FAILURE, validate_proofs_failure),
    (GET_APP_BUCKET_URL_RESULT, app_bucket_url_result),
    (GET_APP_BUCKET_URL_FAILURE, app_bucket_url_failure),
    (GET_USER_APP_FILE_URL_RESULT, user_app_file_url_result),
    (GET_USER_APP_FILE_URL_FAILURE, user_app_file_url_failure),
];

/// Names of all host functions a session exposes
pub fn names() -> impl Iterator<Item = &'static str> {
    HANDLERS.iter().map(|(name, _)| *name)
}

/// Register every session host function on the runtime builder
pub(crate) fn register_all(
    builder: &mut RuntimeAdapterBuilder,
    state: &Arc<SessionState>,
) -> Result<(), BridgeError> {
    for &(name, handler) in HANDLERS {
        let state = Arc::clone(state);
        let function: HostFunction = Arc::new(move |args: &[Value]| {
            LoggingHelper::log_host_call(name);
            handler(&state, &HostArgs { name, args });
        });
        builder.register_host_function(name, function)?;
    }
    Ok(())
}

/// Positional arguments of one host function call
struct HostArgs<'a> {
    name: &'static str,
    args: &'a [Value],
}

impl HostArgs<'_> {
    fn string(&self, index: usize) -> Option<&str> {
        self.args.get(index).and_then(Value::as_str)
    }

    /// Boolean argument; script engines may stringify booleans
    fn boolean(&self, index: usize) -> Option<bool> {
        match self.args.get(index)? {
            Value::Bool(flag) => Some(*flag),
            Value::String(text) => text.parse().ok(),
            _ => None,
        }
    }

    fn token(&self, index: usize) -> Option<CorrelationToken> {
        let token = self.string(index).and_then(CorrelationToken::parse);
        if token.is_none() {
            LoggingHelper::log_malformed_host_call(self.name, "missing or invalid correlation token");
        }
        token
    }

    fn username(&self, index: usize) -> Option<String> {
        let username = self.string(index).map(str::to_string);
        if username.is_none() {
            LoggingHelper::log_malformed_host_call(self.name, "missing username");
        }
        username
    }

    fn missing(&self, index: usize) -> String {
        format!("{} called without argument {}", self.name, index)
    }

    /// Failure message argument, falling back to a generic description
    fn error(&self, index: usize) -> String {
        self.string(index)
            .map_or_else(|| format!("{} reported an unknown error", self.name), str::to_string)
    }

    /// Parse a JSON argument, turning every problem into a failure outcome
    fn parse<T>(&self, index: usize, build: impl FnOnce(&str) -> Result<T, BridgeError>) -> Outcome<T> {
        match self.string(index) {
            Some(text) => build(text).into(),
            None => Outcome::failure(self.missing(index)),
        }
    }
}

fn sign_in_success(state: &SessionState, args: &HostArgs<'_>) {
    let outcome = args.parse(0, UserData::from_json_str);
    if let Some(user) = outcome.value() {
        state.cache_user(Some(user.clone()));
    }
    state.sign_in.resolve(outcome);
}

fn sign_in_failure(state: &SessionState, args: &HostArgs<'_>) {
    state.sign_in.resolve(Outcome::failure(args.error(0)));
}

fn lookup_profile_result(state: &SessionState, args: &HostArgs<'_>) {
    if let Some(username) = args.username(0) {
        let outcome = args.parse(1, Profile::from_json_str);
        state.lookup_profile.resolve(&username, outcome);
    }
}

fn lookup_profile_failure(state: &SessionState, args: &HostArgs<'_>) {
    if let Some(username) = args.username(0) {
        state
            .lookup_profile
            .resolve(&username, Outcome::failure(args.error(1)));
    }
}

fn get_file_result(state: &SessionState, args: &HostArgs<'_>) {
    let Some(token) = args.token(1) else {
        return;
    };
    let is_binary = args.boolean(2).unwrap_or(false);
    let outcome = args.parse(0, |payload| Content::from_transport(payload, is_binary));
    state.get_file.resolve(&token, outcome);
}

fn get_file_failure(state: &SessionState, args: &HostArgs<'_>) {
    if let Some(token) = args.token(1) {
        state.get_file.resolve(&token, Outcome::failure(args.error(0)));
    }
}

fn put_file_result(state: &SessionState, args: &HostArgs<'_>) {
    let Some(token) = args.token(1) else {
        return;
    };
    let outcome = match args.string(0) {
        Some(url) => Outcome::success(url.to_string()),
        None => Outcome::failure(args.missing(0)),
    };
    state.put_file.resolve(&token, outcome);
}

fn put_file_failure(state: &SessionState, args: &HostArgs<'_>) {
    if let Some(token) = args.token(1) {
        state.put_file.resolve(&token, Outcome::failure(args.error(0)));
    }
}

fn validate_proofs_result(state: &SessionState, args: &HostArgs<'_>) {
    let outcome = args.parse(0, |text| Ok(serde_json::from_str::<Value>(text)?));
    state.validate_proofs.resolve(outcome);
}

fn validate_proofs_failure(state: &SessionState, args: &HostArgs<'_>) {
    state.validate_proofs.resolve(Outcome::failure(args.error(0)));
}

fn app_bucket_url_result(state: &SessionState, args: &HostArgs<'_>) {
    let outcome = match args.string(0) {
        Some(url) => Outcome::success(url.to_string()),
        None => Outcome::failure(args.missing(0)),
    };
    state.app_bucket_url.resolve(outcome);
}

fn app_bucket_url_failure(state: &SessionState, args: &HostArgs<'_>) {
    state.app_bucket_url.resolve(Outcome::failure(args.error(0)));
}

fn user_app_file_url_result(state: &SessionState, args: &HostArgs<'_>) {
    let outcome = match args.string(0) {
        Some(NO_URL) => Outcome::empty(),
        Some(url) => Outcome::success(url.to_string()),
        None => Outcome::failure(args.missing(0)),
    };
    state.user_app_file_url.resolve(outcome);
}

fn user_app_file_url_failure(state: &SessionState, args: &HostArgs<'_>) {
    state.user_app_file_url.resolve(Outcome::failure(args.error(0)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::capture;
    use crate::testing::fixtures::TestFixtures;
    use serde_json::json;
    use std::collections::HashSet;
    use std::time::Duration;

    #[test]
    fn test_host_function_names_are_unique() {
        let unique: HashSet<&str> = names().collect();
        assert_eq!(unique.len(), HANDLERS.len());
    }

    #[tokio::test]
    async fn test_duplicate_file_result_is_ignored() {
        let (session, handle) = TestFixtures::ready_session().await;
        handle.store_file("a.txt", Content::from("A"));
        handle.set_deferred(true);

        let (callback, read) = capture();
        session
            .get_file("a.txt", &crate::models::GetFileOptions::new(false), callback)
            .unwrap();
        let calls = handle.wait_for_deferred(1, Duration::from_secs(5));
        let token = calls[0].1[1].clone();

        handle.invoke_host_function(GET_FILE_RESULT, &[json!("first"), token.clone(), json!(false)]);
        handle.invoke_host_function(GET_FILE_RESULT, &[json!("second"), token, json!(false)]);

        let outcome = tokio::time::timeout(Duration::from_secs(5), read).await.unwrap().unwrap();
        assert_eq!(outcome.into_value(), Some(Content::from("first")));
        assert_eq!(session.pending_summary().file_reads, 0);
    }

    #[tokio::test]
    async fn test_malformed_base64_resolves_with_failure() {
        let (session, handle) = TestFixtures::ready_session().await;
        handle.store_file("a.bin", Content::from(vec![1_u8, 2]));
        handle.set_deferred(true);

        let (callback, read) = capture();
        session
            .get_file("a.bin", &crate::models::GetFileOptions::new(false), callback)
            .unwrap();
        let calls = handle.wait_for_deferred(1, Duration::from_secs(5));
        let token = calls[0].1[1].clone();

        handle.invoke_host_function(GET_FILE_RESULT, &[json!("***"), token, json!(true)]);
        let outcome = tokio::time::timeout(Duration::from_secs(5), read).await.unwrap().unwrap();
        assert!(outcome.is_error());
        assert_eq!(session.pending_summary().file_reads, 0);
    }

    #[tokio::test]
    async fn test_malformed_user_data_resolves_with_failure() {
        let (session, handle) = TestFixtures::ready_session().await;
        handle.set_deferred(true);

        let (callback, received) = capture();
        session.handle_pending_sign_in("token", callback).unwrap();
        handle.wait_for_deferred(1, Duration::from_secs(5));

        handle.invoke_host_function(SIGN_IN_SUCCESS, &[json!("{not json")]);
        let outcome = tokio::time::timeout(Duration::from_secs(5), received).await.unwrap().unwrap();
        assert!(outcome.is_error());
        assert!(session.cached_user_data().is_none());
    }

    #[tokio::test]
    async fn test_result_without_token_is_dropped() {
        let (session, handle) = TestFixtures::ready_session().await;
        handle.store_file("a.txt", Content::from("A"));
        handle.set_deferred(true);

        session
            .get_file("a.txt", &crate::models::GetFileOptions::new(false), |_| {})
            .unwrap();
        handle.wait_for_deferred(1, Duration::from_secs(5));

        handle.invoke_host_function(GET_FILE_RESULT, &[json!("A")]);
        assert_eq!(session.pending_summary().file_reads, 1);
    }

    #[tokio::test]
    async fn test_stringified_binary_flag() {
        let (session, handle) = TestFixtures::ready_session().await;
        handle.store_file("a.bin", Content::from(vec![7_u8]));
        handle.set_deferred(true);

        let (callback, read) = capture();
        session
            .get_file("a.bin", &crate::models::GetFileOptions::new(false), callback)
            .unwrap();
        let calls = handle.wait_for_deferred(1, Duration::from_secs(5));
        let token = calls[0].1[1].clone();

        handle.invoke_host_function(GET_FILE_RESULT, &[json!("Bw=="), token, json!("true")]);
        let outcome = tokio::time::timeout(Duration::from_secs(5), read).await.unwrap().unwrap();
        assert_eq!(outcome.into_value(), Some(Content::Bytes(vec![7])));
    }
}
