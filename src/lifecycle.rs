//! Lifecycle controller: starts the background activities around a clock
//! driver and tears them down within a bounded time.

use std::{sync::Arc, time::Duration};

use tokio::{sync::watch, task::JoinHandle, time::Instant};
use tracing::{debug, error, info, warn};

use crate::{
    engine::{ClockDriver, CommandDispatcher},
    error::{EngineError, ShutdownError},
    services::CommandSource,
    state::{Phase, StatusSnapshot},
    tasks::{command_task, display_task, ticker_task, InputExit},
};

/// Time allowed for the ticker, command and display tasks to finish, and
/// separately for the session writer to drain
pub const SHUTDOWN_GRACE: Duration = Duration::from_millis(900);

pub struct Lifecycle {
    engine: Arc<ClockDriver>,
    shutdown_tx: watch::Sender<bool>,
    ticker: Option<JoinHandle<()>>,
    input: Option<JoinHandle<InputExit>>,
    display: Option<JoinHandle<()>>,
    writer: Option<JoinHandle<()>>,
}

impl Lifecycle {
    /// Spawn the ticker and command tasks for `engine`
    pub fn launch<S: CommandSource>(engine: Arc<ClockDriver>, source: S, tick_interval: Duration) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let ticker = tokio::spawn(ticker_task(
            Arc::clone(&engine),
            tick_interval,
            shutdown_rx.clone(),
        ));
        let input = tokio::spawn(command_task(
            CommandDispatcher::new(Arc::clone(&engine)),
            source,
            shutdown_rx,
        ));

        Self {
            engine,
            shutdown_tx,
            ticker: Some(ticker),
            input: Some(input),
            display: None,
            writer: None,
        }
    }

    /// Render engine events on stdout
    pub fn with_display(mut self) -> Self {
        let events = self.engine.subscribe();
        self.display = Some(tokio::spawn(display_task(events, self.shutdown_tx.subscribe())));
        self
    }

    /// Join the session writer during shutdown once the recorder is closed
    pub fn with_writer(mut self, writer: JoinHandle<()>) -> Self {
        self.writer = Some(writer);
        self
    }

    /// Begin the cycle with a work session of the given length
    pub fn start_cycle(&self, initial_work_duration_seconds: u64) -> Result<StatusSnapshot, EngineError> {
        self.engine.start(initial_work_duration_seconds, Phase::Work)
    }

    /// Wait for the command loop to end on its own (quit, end of input, failure).
    ///
    /// Cancel-safe; pends forever once the loop has already been reaped.
    pub async fn wait_for_input(&mut self) -> InputExit {
        let Some(handle) = self.input.as_mut() else {
            return std::future::pending().await;
        };
        let exit = match handle.await {
            Ok(exit) => exit,
            Err(e) => InputExit::Panicked(e.to_string()),
        };
        self.input = None;
        exit
    }

    /// Stop the cycle and join every background activity.
    ///
    /// Activities that do not finish in time are aborted; the returned errors
    /// have already been logged.
    pub async fn shutdown(mut self) -> Vec<ShutdownError> {
        info!("Shutting down session timer");

        match self.engine.stop(false) {
            Ok(Some(record)) => info!("Recorded unfinished {} session ({}s)", record.phase, record.duration_seconds),
            Ok(None) => debug!("No session running at shutdown"),
            Err(e) => error!("Failed to stop clock during shutdown: {}", e),
        }
        self.shutdown_tx.send_replace(true);

        let mut errors = Vec::new();
        let deadline = Instant::now() + SHUTDOWN_GRACE;

        if let Some(handle) = self.ticker.take() {
            errors.extend(join_within("ticker", handle, deadline).await.err());
        }
        if let Some(handle) = self.input.take() {
            match join_within("command reader", handle, deadline).await {
                Ok(Some(exit)) => debug!("Command reader exited: {}", exit),
                Ok(None) => {}
                Err(e) => errors.push(e),
            }
        }
        if let Some(handle) = self.display.take() {
            errors.extend(join_within("display", handle, deadline).await.err());
        }

        // The writer exits once the last recorder handle is gone
        if let Err(e) = self.engine.close_recorder() {
            error!("Failed to close session recorder: {}", e);
        }
        if let Some(handle) = self.writer.take() {
            let deadline = Instant::now() + SHUTDOWN_GRACE;
            errors.extend(join_within("session writer", handle, deadline).await.err());
        }

        for e in &errors {
            warn!("Shutdown: {}", e);
        }
        info!("Shutdown complete");
        errors
    }
}

impl Drop for Lifecycle {
    fn drop(&mut self) {
        self.shutdown_tx.send_replace(true);
    }
}

/// Await `handle` until `deadline`, aborting it on timeout.
///
/// `Ok(None)` means the task was cancelled before producing a value.
async fn join_within<T>(
    activity: &'static str,
    handle: JoinHandle<T>,
    deadline: Instant,
) -> Result<Option<T>, ShutdownError> {
    let abort = handle.abort_handle();
    match tokio::time::timeout_at(deadline, handle).await {
        Ok(Ok(value)) => {
            debug!("{} stopped", activity);
            Ok(Some(value))
        }
        Ok(Err(e)) if e.is_cancelled() => Ok(None),
        Ok(Err(e)) => Err(ShutdownError::Panicked {
            activity,
            message: e.to_string(),
        }),
        Err(_) => {
            abort.abort();
            Err(ShutdownError::TimedOut {
                activity,
                millis: SHUTDOWN_GRACE.as_millis() as u64,
            })
        }
    }
}
