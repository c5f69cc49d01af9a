use anyhow::{Context, Result};
use log::warn;
use std::process::{Command, Stdio};
use std::thread;
use url::Url;

/// Platform mechanism for opening a URL outside the embedded runtime
pub trait ExternalLauncher: Send + Sync {
    /// Whether a URL can be launched at all on this platform
    fn is_available(&self) -> bool;

    /// Open `url` externally
    ///
    /// # Errors
    ///
    /// Returns an error if the platform refused to open the URL.
    fn launch(&self, url: &Url) -> Result<()>;
}

/// Surfaces short user-visible notices
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);
}

const NO_ARGS: [&str; 0] = [];

/// Opens URLs with the desktop's default browser
///
/// The opener is spawned and reaped on a background thread, so a browser that
/// stays in the foreground never holds up the caller.
#[derive(Debug, Clone)]
pub struct SystemBrowserLauncher {
    program: String,
    args: Vec<String>,
}

impl Default for SystemBrowserLauncher {
    fn default() -> Self {
        if cfg!(target_os = "windows") {
            // The empty argument after `start` is the window title
            Self::with_program("cmd", ["/C", "start", ""])
        } else if cfg!(target_os = "macos") {
            Self::with_program("open", NO_ARGS)
        } else {
            Self::with_program("xdg-open", NO_ARGS)
        }
    }
}

impl SystemBrowserLauncher {
    /// Launcher running `program args... <url>`
    #[must_use]
    pub fn with_program<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

impl ExternalLauncher for SystemBrowserLauncher {
    fn is_available(&self) -> bool {
        which::which(&self.program).is_ok()
    }

    fn launch(&self, url: &Url) -> Result<()> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(url.as_str())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("failed to run {}", self.program))?;

        let program = self.program.clone();
        thread::Builder::new()
            .name("browser-opener".to_string())
            .spawn(move || match child.wait() {
                Ok(status) if !status.success() => warn!("{program} exited with {status}"),
                Ok(_) => {}
                Err(e) => warn!("Failed to wait for {program}: {e}"),
            })
            .context("failed to spawn browser opener thread")?;
        Ok(())
    }
}

/// Surfaces notices as warning log lines
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: &str) {
        warn!("{message}");
    }
}
