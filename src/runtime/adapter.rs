//! Scripting runtime adapter
//!
//! The adapter owns exactly one engine instance on a dedicated thread. The
//! engine never leaves that thread: evaluations are posted to it as commands
//! and answered over oneshot channels, so callers on any thread can await a
//! result without blocking. Host functions are registered once, before the
//! bootstrap resource is loaded, and readiness flips exactly once when the
//! bootstrap resource reports that it finished loading.
//!
//! Submitted expressions have no reply channel, so each carries a failure
//! handler that the runtime thread calls if the engine rejects it.

use crate::error::{BridgeError, EngineError};
use crate::runtime::engine::{HostFunction, NavigationInterceptor, PageFinished, ScriptEngine};
use crate::utils::logging::LoggingHelper;
use log::{debug, error, warn};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use tokio::sync::{mpsc, oneshot};

type EvaluationReply = oneshot::Sender<Result<Option<String>, BridgeError>>;
type ReadyCallback = Box<dyn FnOnce() + Send + 'static>;
type FailureHandler = Box<dyn FnOnce(BridgeError) + Send + 'static>;
type StartupFailure = Box<dyn FnOnce(EngineError) + Send + 'static>;

enum Reply {
    Wait(EvaluationReply),
    OnFailure(FailureHandler),
}

enum RuntimeCommand {
    Evaluate { expression: String, reply: Reply },
    Shutdown,
}

/// Tracks the one-way NotLoaded -> Loaded transition
struct Readiness {
    sentinel: String,
    loaded: AtomicBool,
    on_ready: Mutex<Option<ReadyCallback>>,
}

impl Readiness {
    fn new(sentinel: String, on_ready: ReadyCallback) -> Self {
        Self {
            sentinel,
            loaded: AtomicBool::new(false),
            on_ready: Mutex::new(Some(on_ready)),
        }
    }

    fn page_finished(&self, url: &str) {
        if url != self.sentinel {
            debug!("Ignoring load completion of {url}");
            return;
        }
        if self.loaded.swap(true, Ordering::SeqCst) {
            return;
        }
        LoggingHelper::log_runtime_ready(url);
        let callback = self
            .on_ready
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(callback) = callback {
            callback();
        }
    }

    fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }
}

/// Collects host functions and the navigation policy before the engine starts
pub struct RuntimeAdapterBuilder {
    bootstrap_url: String,
    host_functions: Vec<(String, HostFunction)>,
    names: HashSet<String>,
    interceptor: Option<Arc<dyn NavigationInterceptor>>,
    startup_failure: Option<StartupFailure>,
}

impl RuntimeAdapterBuilder {
    /// Start a builder whose readiness is tied to `bootstrap_url`
    #[must_use]
    pub fn new(bootstrap_url: impl Into<String>) -> Self {
        Self {
            bootstrap_url: bootstrap_url.into(),
            host_functions: Vec::new(),
            names: HashSet::new(),
            interceptor: None,
            startup_failure: None,
        }
    }

    /// Expose a host function to the script
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::DuplicateHostFunction` if `name` is already registered.
    pub fn register_host_function(
        &mut self,
        name: &str,
        function: HostFunction,
    ) -> Result<(), BridgeError> {
        if !self.names.insert(name.to_string()) {
            return Err(BridgeError::DuplicateHostFunction(name.to_string()));
        }
        self.host_functions.push((name.to_string(), function));
        Ok(())
    }

    #[must_use]
    pub fn navigation_interceptor(mut self, interceptor: Arc<dyn NavigationInterceptor>) -> Self {
        self.interceptor = Some(interceptor);
        self
    }

    /// Called instead of `on_ready` if the engine cannot be created or cannot
    /// load the bootstrap resource
    #[must_use]
    pub fn on_startup_failure(mut self, callback: impl FnOnce(EngineError) + Send + 'static) -> Self {
        self.startup_failure = Some(Box::new(callback));
        self
    }

    /// Create the engine on the runtime thread and load the bootstrap resource
    ///
    /// `on_ready` runs once, on whichever thread the engine reports the
    /// bootstrap load from.
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::Engine` if the runtime thread cannot be spawned.
    pub fn initialize<E, F>(
        self,
        factory: F,
        on_ready: impl FnOnce() + Send + 'static,
    ) -> Result<RuntimeAdapter, BridgeError>
    where
        E: ScriptEngine + 'static,
        F: FnOnce() -> Result<E, EngineError> + Send + 'static,
    {
        let readiness = Arc::new(Readiness::new(self.bootstrap_url.clone(), Box::new(on_ready)));
        let (commands, receiver) = mpsc::unbounded_channel();

        let worker = RuntimeWorker {
            bootstrap_url: self.bootstrap_url,
            host_functions: self.host_functions,
            interceptor: self.interceptor,
            startup_failure: self.startup_failure,
            readiness: Arc::clone(&readiness),
            commands: receiver,
        };

        thread::Builder::new()
            .name("script-runtime".to_string())
            .spawn(move || worker.run(factory))
            .map_err(|e| EngineError::new(format!("failed to spawn script runtime thread: {e}")))?;

        Ok(RuntimeAdapter {
            commands,
            readiness,
        })
    }
}

struct RuntimeWorker {
    bootstrap_url: String,
    host_functions: Vec<(String, HostFunction)>,
    interceptor: Option<Arc<dyn NavigationInterceptor>>,
    startup_failure: Option<StartupFailure>,
    readiness: Arc<Readiness>,
    commands: mpsc::UnboundedReceiver<RuntimeCommand>,
}

impl RuntimeWorker {
    fn fail_startup(&mut self, error: EngineError) {
        error!("Script runtime failed to start: {error}");
        if let Some(callback) = self.startup_failure.take() {
            callback(error);
        }
    }

    fn run<E, F>(mut self, factory: F)
    where
        E: ScriptEngine + 'static,
        F: FnOnce() -> Result<E, EngineError>,
    {
        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
        {
            Ok(runtime) => runtime,
            Err(e) => {
                self.fail_startup(EngineError::new(format!("failed to build executor: {e}")));
                return;
            }
        };

        runtime.block_on(self.serve(factory));
    }

    async fn serve<E, F>(mut self, factory: F)
    where
        E: ScriptEngine + 'static,
        F: FnOnce() -> Result<E, EngineError>,
    {
        let mut engine = match factory() {
            Ok(engine) => engine,
            Err(e) => {
                self.fail_startup(e);
                return;
            }
        };

        for (name, function) in self.host_functions.drain(..) {
            engine.register_host_function(&name, function);
        }
        if let Some(interceptor) = self.interceptor.take() {
            engine.set_navigation_interceptor(interceptor);
        }

        let readiness = Arc::clone(&self.readiness);
        let on_page_finished: PageFinished = Arc::new(move |url: &str| readiness.page_finished(url));
        if let Err(e) = engine.load(&self.bootstrap_url, on_page_finished) {
            let message = format!("failed to load {}: {e}", self.bootstrap_url);
            self.fail_startup(EngineError::new(message));
            return;
        }
        self.startup_failure = None;

        while let Some(command) = self.commands.recv().await {
            match command {
                RuntimeCommand::Evaluate { expression, reply } => {
                    let result = engine.evaluate(&expression).await.map_err(BridgeError::from);
                    match reply {
                        Reply::Wait(reply) => {
                            // The caller may have stopped waiting; nothing to do then
                            let _ = reply.send(result);
                        }
                        Reply::OnFailure(on_failure) => {
                            if let Err(e) = result {
                                warn!("Submitted evaluation failed: {e}");
                                on_failure(e);
                            }
                        }
                    }
                }
                RuntimeCommand::Shutdown => break,
            }
        }

        debug!("Script runtime stopped");
    }
}

/// Handle to the runtime thread; dropping it shuts the runtime down
pub struct RuntimeAdapter {
    commands: mpsc::UnboundedSender<RuntimeCommand>,
    readiness: Arc<Readiness>,
}

impl RuntimeAdapter {
    #[must_use]
    pub fn builder(bootstrap_url: impl Into<String>) -> RuntimeAdapterBuilder {
        RuntimeAdapterBuilder::new(bootstrap_url)
    }

    /// Whether the bootstrap resource has finished loading
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.readiness.is_loaded()
    }

    fn ensure_ready(&self) -> Result<(), BridgeError> {
        if self.is_ready() {
            Ok(())
        } else {
            Err(BridgeError::NotReady)
        }
    }

    /// Evaluate an expression and wait for its textual result
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::NotReady` before the ready signal,
    /// `BridgeError::RuntimeClosed` after shutdown and `BridgeError::Engine`
    /// if the engine failed to evaluate.
    pub async fn evaluate(&self, expression: impl Into<String>) -> Result<Option<String>, BridgeError> {
        self.ensure_ready()?;
        let (reply, response) = oneshot::channel();
        self.commands
            .send(RuntimeCommand::Evaluate {
                expression: expression.into(),
                reply: Reply::Wait(reply),
            })
            .map_err(|_| BridgeError::RuntimeClosed)?;
        response.await.map_err(|_| BridgeError::RuntimeClosed)?
    }

    /// Queue an expression whose direct result is irrelevant
    ///
    /// `on_failure` runs on the runtime thread if the engine fails to evaluate
    /// the expression. It is dropped uncalled if this returns an error.
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::NotReady` before the ready signal and
    /// `BridgeError::RuntimeClosed` after shutdown.
    pub fn submit(
        &self,
        expression: impl Into<String>,
        on_failure: impl FnOnce(BridgeError) + Send + 'static,
    ) -> Result<(), BridgeError> {
        self.ensure_ready()?;
        self.commands
            .send(RuntimeCommand::Evaluate {
                expression: expression.into(),
                reply: Reply::OnFailure(Box::new(on_failure)),
            })
            .map_err(|_| BridgeError::RuntimeClosed)
    }

    /// Ask the runtime thread to stop after the command it is running
    pub fn shutdown(&self) {
        if self.commands.send(RuntimeCommand::Shutdown).is_ok() {
            debug!("Script runtime shutdown requested");
        }
    }
}

impl Drop for RuntimeAdapter {
    fn drop(&mut self) {
        self.shutdown();
    }
}
