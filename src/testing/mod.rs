//! Testing utilities for the bridge
//!
//! Available to unit tests and, with the `testing` feature, to integration
//! tests.
//!
//! ## Organization
//!
//! - [`fixtures`] - Ready-made sessions and settings
//! - [`mock`] - In-memory protocol engine plus recording redirect collaborators
//! - [`script_parser`] - Parser for the outbound call expressions
//!
//! ## Usage
//!
//! ```rust,ignore
//! use blockstack_bridge::testing::{capture, fixtures::TestFixtures};
//!
//! let (session, handle) = TestFixtures::ready_session().await;
//! let (callback, received) = capture();
//! session.lookup_profile("alice.id", None, callback)?;
//! let profile = received.await?.into_value();
//! ```

pub mod fixtures;
pub mod mock;
pub mod script_parser;

pub use fixtures::TestFixtures;
pub use mock::{MockProtocolEngine, MockScriptHandle, RecordingLauncher, RecordingNotifier};

use crate::outcome::Outcome;
use crate::session::pending::Callback;
use tokio::sync::oneshot;

/// Turn a callback parameter into a receiver the test can await
#[must_use]
pub fn capture<T: Send + 'static>() -> (Callback<T>, oneshot::Receiver<Outcome<T>>) {
    let (sender, receiver) = oneshot::channel();
    let callback: Callback<T> = Box::new(move |outcome| {
        let _ = sender.send(outcome);
    });
    (callback, receiver)
}

/// Common test constants
pub mod constants {
    /// App domain used by the fixture configuration
    pub const TEST_APP_DOMAIN: &str = "https://flamboyant-darwin-d11c17.netlify.com";

    /// Name the mock engine knows a profile for
    pub const TEST_USERNAME: &str = "alice.id";

    /// Bootstrap resource the mock engine reports as loaded
    pub const TEST_BOOTSTRAP_URL: &str = "file:///android_res/raw/webview.html";

    /// Hosted browser used by the fixture redirect handler
    pub const TEST_HOSTED_BROWSER_URL: &str = "https://browser.blockstack.org";

    /// Storage address the mock engine places files under
    pub const TEST_BUCKET_ADDRESS: &str = "1Ep9xL4dYMfyBBLjUqDkDoNdRVPW5b1sTD";

    /// Public key accepted by the mock cipher
    pub const TEST_PUBLIC_KEY: &str =
        "024634ee2e3d4a6f3a8e2b5b7f2d3d14d0d6e2e4d4c6a9f1b0c3e1f2a4b5c6d7e8";

    /// Private key used in sign-in fixtures
    pub const TEST_PRIVATE_KEY: &str =
        "a5c61c6ca7b3e7e55edee68566aeab22e4da26baa285c7bd10e8d2218aa3b229";
}
