//! Seam between the bridge and a concrete script execution engine
//!
//! Any engine that can evaluate an expression, expose host functions to the
//! running script and report page loads can back a session: an embedded
//! webview, a JavaScript interpreter, or the mock engine used in tests.

use crate::error::EngineError;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Host-side function the running script may call; receives the call arguments
///
/// Host functions may be invoked from any thread.
pub type HostFunction = Arc<dyn Fn(&[Value]) + Send + Sync>;

/// Load-completion signal; receives the identity of the resource that finished loading
pub type PageFinished = Arc<dyn Fn(&str) + Send + Sync>;

/// Decides what happens when the running script tries to navigate away
pub trait NavigationInterceptor: Send + Sync {
    /// Return `true` to cancel the engine's own navigation to `target`
    fn should_override(&self, target: &str) -> bool;
}

/// Embedded script execution engine
///
/// Engines are created and driven on the runtime thread only, so
/// implementations need not be `Send`.
#[async_trait(?Send)]
pub trait ScriptEngine {
    /// Expose `function` to the script under `name`
    fn register_host_function(&mut self, name: &str, function: HostFunction);

    /// Install the policy consulted before every navigation attempt
    fn set_navigation_interceptor(&mut self, interceptor: Arc<dyn NavigationInterceptor>);

    /// Start loading the bootstrap resource
    ///
    /// The engine reports every resource that finishes loading through
    /// `on_page_finished`, not only the bootstrap resource.
    ///
    /// # Errors
    ///
    /// Returns an error if loading cannot be started.
    fn load(&mut self, url: &str, on_page_finished: PageFinished) -> Result<(), EngineError>;

    /// Evaluate an expression and return the JSON rendering of its value
    ///
    /// # Errors
    ///
    /// Returns an error if the engine could not run the expression.
    async fn evaluate(&mut self, expression: &str) -> Result<Option<String>, EngineError>;
}
