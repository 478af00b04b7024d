//! Interrupt handling for build runs
//!
//! Signal listeners never touch build state directly. They publish a
//! [`ShutdownSignal`] on a broadcast channel, and the orchestrator's listener
//! task reacts to it outside of any signal context.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::signal;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::error::Result;

/// Process exit code used when a repeated interrupt aborts the run
pub const FORCED_EXIT_CODE: i32 = 130;

/// Shutdown reasons
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// User initiated shutdown (Ctrl-C)
    UserRequest,
    /// External shutdown request
    External,
}

impl std::fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShutdownReason::UserRequest => write!(f, "user request"),
            ShutdownReason::External => write!(f, "external request"),
        }
    }
}

/// Shutdown signal containing reason and optional message
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    pub reason: ShutdownReason,
    pub message: Option<String>,
}

impl ShutdownSignal {
    pub fn user_request() -> Self {
        Self {
            reason: ShutdownReason::UserRequest,
            message: Some("Shutdown requested by user (Ctrl-C)".to_string()),
        }
    }

    pub fn external(message: Option<String>) -> Self {
        Self { reason: ShutdownReason::External, message }
    }
}

/// What a signal listener does with an incoming interrupt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptAction {
    /// First interrupt: stop scheduling and kill running containers
    Shutdown,
    /// Shutdown was already underway: leave immediately
    Abort,
}

/// Tracks whether shutdown was requested and fans the request out
#[derive(Debug)]
pub struct ShutdownManager {
    /// Shutdown signal flag
    shutdown_signal: Arc<AtomicBool>,
    /// Shutdown broadcast sender
    shutdown_sender: broadcast::Sender<ShutdownSignal>,
}

impl Default for ShutdownManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownManager {
    /// Create a new shutdown manager
    pub fn new() -> Self {
        let (shutdown_sender, _) = broadcast::channel(16);
        Self { shutdown_signal: Arc::new(AtomicBool::new(false)), shutdown_sender }
    }

    /// Get a receiver for shutdown broadcasts
    pub fn shutdown_receiver(&self) -> broadcast::Receiver<ShutdownSignal> {
        self.shutdown_sender.subscribe()
    }

    /// Check if shutdown was requested
    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown_signal.load(Ordering::Acquire)
    }

    /// Request shutdown with a specific reason
    pub fn request_shutdown(&self, signal: ShutdownSignal) {
        info!("Shutdown requested: {}", signal.reason);
        if let Some(message) = &signal.message {
            info!("Shutdown message: {}", message);
        }

        self.shutdown_signal.store(true, Ordering::Release);

        // No receivers just means no run is in progress
        let _ = self.shutdown_sender.send(signal);
    }

    /// Escalate an interrupt: the first one requests shutdown, any later
    /// one asks the caller to abort
    pub fn handle_interrupt(&self, signal: ShutdownSignal) -> InterruptAction {
        if self.is_shutdown_requested() {
            return InterruptAction::Abort;
        }
        self.request_shutdown(signal);
        InterruptAction::Shutdown
    }
}

/// Install SIGINT (and on Unix SIGTERM/SIGQUIT) listeners that request
/// shutdown on the given manager
pub async fn setup_signal_handlers(shutdown_manager: Arc<ShutdownManager>) -> Result<()> {
    debug!("Setting up signal handlers");

    let shutdown_manager_ctrl_c = Arc::clone(&shutdown_manager);
    tokio::spawn(async move {
        loop {
            if let Err(e) = signal::ctrl_c().await {
                warn!("Failed to listen for Ctrl-C: {}", e);
                break;
            }
            warn!("Caught interrupt (SIGINT)");
            let action = shutdown_manager_ctrl_c.handle_interrupt(ShutdownSignal::user_request());
            abort_if_repeated(action);
        }
    });

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal as unix_signal, SignalKind};

        for (kind, name) in [(SignalKind::terminate(), "SIGTERM"), (SignalKind::quit(), "SIGQUIT")]
        {
            let mut stream = unix_signal(kind)?;
            let shutdown_manager = Arc::clone(&shutdown_manager);
            tokio::spawn(async move {
                while stream.recv().await.is_some() {
                    warn!("Caught interrupt ({})", name);
                    let message = format!("{name} received");
                    let action =
                        shutdown_manager.handle_interrupt(ShutdownSignal::external(Some(message)));
                    abort_if_repeated(action);
                }
            });
        }
    }

    debug!("Signal handlers setup complete");
    Ok(())
}

fn abort_if_repeated(action: InterruptAction) {
    if action == InterruptAction::Abort {
        error!("Interrupted again, aborting without cleanup");
        std::process::exit(FORCED_EXIT_CODE);
    }
}
