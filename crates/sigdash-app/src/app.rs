//! Application wiring and the terminal front end.

use crate::command::{Command, HELP};
use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::render;
use sigdash_api::{DynSignalApi, HttpSignalApi};
use sigdash_core::{DynClock, PushEvent, PushStatus, SystemClock};
use sigdash_sync::{DisplayState, SyncHandle, SyncOrchestrator};
use sigdash_ws::ConnectionManager;
use std::io::BufRead;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Buffer between the push transport and the sync loop.
const PUSH_BUFFER: usize = 1000;

/// How long `Session::stop` waits for background tasks.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Main application.
pub struct Application {
    config: AppConfig,
}

impl Application {
    /// Create a new application instance.
    pub fn new(config: AppConfig) -> AppResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Start the push subscription and the sync loop.
    ///
    /// Must be called inside a tokio runtime.
    pub fn start(&self) -> AppResult<Session> {
        self.start_with_api(None)
    }

    /// Like `start`, with an injected REST client.
    pub fn start_with_api(&self, api: Option<DynSignalApi>) -> AppResult<Session> {
        let shutdown = CancellationToken::new();

        let api: DynSignalApi = match api {
            Some(api) => api,
            None => Arc::new(HttpSignalApi::with_paths(
                &self.config.base_url,
                &self.config.snapshot_path,
                &self.config.toggle_path,
                self.config.request_timeout(),
            )?),
        };

        let (push_tx, push_rx) = mpsc::channel::<PushEvent>(PUSH_BUFFER);
        let connection = Arc::new(ConnectionManager::with_shutdown(
            self.config.connection_config(),
            push_tx,
            shutdown.clone(),
        ));

        info!(
            base_url = %self.config.base_url,
            ws_url = %self.config.ws_url,
            "Starting session"
        );

        let connection_clone = connection.clone();
        let push_task = tokio::spawn(async move {
            if let Err(e) = connection_clone.connect().await {
                error!(error = %e, "Push subscription gave up");
            }
        });

        let clock: DynClock = Arc::new(SystemClock);
        let (orchestrator, handle) = SyncOrchestrator::new(
            self.config.sync.clone(),
            api,
            clock,
            push_rx,
            shutdown.clone(),
        );
        let sync_task = tokio::spawn(orchestrator.run());

        Ok(Session {
            handle,
            shutdown,
            connection,
            sync_task,
            push_task,
        })
    }

    /// Run the interactive session until `quit` or Ctrl-C.
    pub async fn run(self) -> AppResult<()> {
        let session = self.start()?;

        let renderer = tokio::spawn(render_loop(
            session.handle.subscribe(),
            session.shutdown.clone(),
        ));
        let lines = spawn_stdin_reader()?;
        let input = tokio::spawn(command_loop(lines, session.handle.clone()));

        println!("{HELP}");

        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                match result {
                    Ok(()) => info!("Ctrl-C received, shutting down"),
                    Err(e) => warn!(error = %e, "Failed to listen for Ctrl-C, shutting down"),
                }
            }
            () = session.shutdown.cancelled() => {
                info!("Quit requested, shutting down");
            }
        }

        session.stop().await;
        input.abort();
        if let Err(e) = renderer.await {
            debug!(error = %e, "Renderer task ended abnormally");
        }

        info!("Session ended");
        Ok(())
    }
}

/// A running session.
pub struct Session {
    handle: SyncHandle,
    shutdown: CancellationToken,
    connection: Arc<ConnectionManager>,
    sync_task: JoinHandle<()>,
    push_task: JoinHandle<()>,
}

impl Session {
    pub fn handle(&self) -> &SyncHandle {
        &self.handle
    }

    /// Latest published display state.
    pub fn state(&self) -> DisplayState {
        self.handle.current()
    }

    /// Transport-side push status (may lead the published state).
    pub fn push_status(&self) -> PushStatus {
        self.connection.state()
    }

    /// Cancel everything and wait for the background tasks.
    pub async fn stop(self) {
        self.shutdown.cancel();

        for (name, task) in [("sync", self.sync_task), ("push", self.push_task)] {
            match tokio::time::timeout(SHUTDOWN_GRACE, task).await {
                Ok(Ok(())) => debug!(task = name, "Task stopped"),
                Ok(Err(e)) => warn!(task = name, error = %e, "Task panicked or was aborted"),
                Err(_) => warn!(task = name, "Task did not stop in time"),
            }
        }
    }
}

async fn render_loop(mut state_rx: watch::Receiver<DisplayState>, shutdown: CancellationToken) {
    loop {
        tokio::select! {
            () = shutdown.cancelled() => break,
            changed = state_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = state_rx.borrow_and_update().clone();
                let mut out = std::io::stdout().lock();
                if let Err(e) = render::render(&state, &mut out) {
                    warn!(error = %e, "Failed to render display state");
                }
            }
        }
    }
}

async fn command_loop(mut lines: mpsc::Receiver<String>, handle: SyncHandle) {
    while let Some(line) = lines.recv().await {
        if line.trim().is_empty() {
            continue;
        }

        let result = match line.parse::<Command>() {
            Ok(Command::Toggle) => handle.request_toggle().await,
            Ok(Command::Refresh) => handle.poll_now().await,
            Ok(Command::Quit) => {
                handle.shutdown();
                return;
            }
            Ok(Command::Help) => {
                println!("{HELP}");
                Ok(())
            }
            Err(e) => {
                println!("{e}");
                Ok(())
            }
        };

        if let Err(e) = result {
            warn!(error = %e, "Command dropped");
            return;
        }
    }
    debug!("Stdin closed");
}

/// Read stdin on a plain thread so a pending read never holds up runtime
/// shutdown.
fn spawn_stdin_reader() -> AppResult<mpsc::Receiver<String>> {
    let (tx, rx) = mpsc::channel(16);
    std::thread::Builder::new()
        .name("sigdash-stdin".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.blocking_send(line).is_err() {
                    break;
                }
            }
        })
        .map_err(AppError::Io)?;
    Ok(rx)
}
