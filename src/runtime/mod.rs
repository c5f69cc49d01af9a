//! Embedded scripting runtime
//!
//! # Modules
//!
//! - [`engine`] - The `ScriptEngine` seam and host-function types
//! - [`adapter`] - Single-threaded owner of the engine instance
//! - [`script_call`] - Outbound expression building and result decoding

pub mod adapter;
pub mod engine;
pub mod script_call;

pub use adapter::{RuntimeAdapter, RuntimeAdapterBuilder};
pub use engine::{HostFunction, NavigationInterceptor, PageFinished, ScriptEngine};
pub use script_call::ScriptCall;

/// Glue script loaded next to the protocol library by concrete engines
///
/// It defines the functions the session calls and forwards promise results to
/// the host functions through the global `host` object.
pub const GLUE_SCRIPT: &str = include_str!("../../assets/bridge.js");

/// Name of the global object carrying the host functions inside the script
pub const HOST_OBJECT_NAME: &str = "host";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::host_functions;

    #[test]
    fn test_glue_script_forwards_every_host_function() {
        for name in host_functions::names() {
            assert!(
                GLUE_SCRIPT.contains(&format!("{HOST_OBJECT_NAME}.{name}(")),
                "glue script never calls {name}"
            );
        }
    }

    #[test]
    fn test_glue_script_defines_session_calls() {
        for function in [
            "makeAuthResponse",
            "redirectToSignIn",
            "handlePendingSignIn",
            "loadUserData",
            "isUserSignedIn",
            "signUserOut",
            "lookupProfile",
            "validateProofs",
            "getFile",
            "putFile",
            "encryptContent",
            "decryptContent",
            "getAppBucketUrl",
            "getUserAppFileUrl",
        ] {
            assert!(GLUE_SCRIPT.contains(&format!("function {function}(")));
        }
    }
}
