// Centralized logging for the recurring bridge events
use log::{debug, info, warn};

pub struct LoggingHelper;

impl LoggingHelper {
    /// Log an outbound script call by function name only
    ///
    /// Arguments are never logged: they may contain private keys or file content.
    pub fn log_script_call(function: &str) {
        debug!("→ script call {}()", function);
    }

    /// Log a push from the script into a host function
    pub fn log_host_call(name: &str) {
        debug!("← host function {}", name);
    }

    /// Log a host function invoked with arguments it cannot use
    pub fn log_malformed_host_call(name: &str, reason: &str) {
        warn!("Ignoring malformed {} call: {}", name, reason);
    }

    /// Log a resolution that found no waiting callback
    pub fn log_stale_resolution(table: &str, key: &str) {
        debug!("No pending {} callback for {}, dropping result", table, key);
    }

    /// Log a pending callback being overwritten before it resolved
    pub fn log_callback_replaced(table: &str, key: &str) {
        warn!(
            "Pending {} callback for {} replaced by a newer request; the earlier caller will not be answered",
            table, key
        );
    }

    /// Log the runtime becoming ready
    pub fn log_runtime_ready(url: &str) {
        info!("✅ Script runtime ready ({})", url);
    }

    /// Log a navigation attempt caught by the redirect handler
    pub fn log_navigation_intercepted(target: &str) {
        debug!("Navigation detected in sign-in runtime: {}", target);
    }

    /// Log the hand-off to an external browser
    pub fn log_external_launch(url: &str) {
        info!("🔄 Opening sign-in in external browser: {}", url);
    }

    /// Log that no external browser mechanism is available
    pub fn log_external_unavailable() {
        warn!("❌ No external browser available for sign-in");
    }

    /// Log a navigation target without a usable auth request
    pub fn log_invalid_auth_request(target: &str) {
        warn!("Navigation target carries no valid auth request: {}", target);
    }

    /// Log session teardown
    pub fn log_session_released(failed_callbacks: usize) {
        if failed_callbacks == 0 {
            info!("Blockstack session released");
        } else {
            warn!(
                "Blockstack session released with {} pending request(s); their callbacks received a failure",
                failed_callbacks
            );
        }
    }
}
