//! Session watcher
//!
//! Drives an [`IdleTimer`] on a tokio task. The task sleeps until the
//! timer's next deadline, wakes early for commands, and reports every state
//! change on an event channel. When the session ends for any reason, the
//! session keys are removed from the local store before `LoggedOut` is
//! sent.

use bizdesk_core::session::{IdleTimer, IdleTimerConfig, SessionEvent};
use bizdesk_core::store::{KeyValueStore, clear_session};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};

use crate::auth::TokenRefresher;

/// Input to a running watcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    /// User input (key press, pointer movement, command issued)
    Activity,
    /// Answer to the stay-signed-in prompt
    StayLoggedIn,
    Logout,
}

/// Handle to a spawned watcher
#[derive(Debug)]
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
    events: mpsc::Receiver<SessionEvent>,
    task: JoinHandle<()>,
}

impl SessionHandle {
    /// Sends a command; returns false once the watcher has stopped
    pub async fn send(&self, command: SessionCommand) -> bool {
        self.commands.send(command).await.is_ok()
    }

    /// A sender that can be handed to input sources
    pub fn commands(&self) -> mpsc::Sender<SessionCommand> {
        self.commands.clone()
    }

    /// Next state change; `None` once the watcher has stopped
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        self.events.recv().await
    }

    /// Waits for the watcher task to finish
    pub async fn join(self) {
        if let Err(e) = self.task.await {
            tracing::error!("Session watcher task failed: {}", e);
        }
    }
}

/// Idle watcher for a signed-in session
pub struct SessionWatcher<R, S> {
    timer: IdleTimer,
    refresher: R,
    store: S,
}

impl<R, S> SessionWatcher<R, S>
where
    R: TokenRefresher + 'static,
    S: KeyValueStore + 'static,
{
    /// Create a watcher whose idle period starts now
    pub fn new(config: IdleTimerConfig, refresher: R, store: S) -> Self {
        Self {
            timer: IdleTimer::new(config, now()),
            refresher,
            store,
        }
    }

    /// Start watching on a background task
    pub fn spawn(self) -> SessionHandle {
        let (command_tx, command_rx) = mpsc::channel(32);
        let (event_tx, event_rx) = mpsc::channel(8);

        tracing::debug!(
            "Session watcher started (idle threshold {:?})",
            self.timer.config().idle_threshold()
        );
        let task = tokio::spawn(self.run(command_rx, event_tx));

        SessionHandle {
            commands: command_tx,
            events: event_rx,
            task,
        }
    }

    async fn run(
        mut self,
        mut commands: mpsc::Receiver<SessionCommand>,
        events: mpsc::Sender<SessionEvent>,
    ) {
        loop {
            let deadline = self.timer.next_deadline();
            let wake = async {
                match deadline {
                    Some(at) => sleep_until(Instant::from_std(at)).await,
                    None => std::future::pending().await,
                }
            };

            tokio::select! {
                command = commands.recv() => {
                    let event = match command {
                        Some(SessionCommand::Activity) => {
                            self.timer.record_input(now());
                            None
                        }
                        Some(SessionCommand::StayLoggedIn) => self.stay_logged_in().await,
                        Some(SessionCommand::Logout) => Some(self.timer.logout()),
                        None => {
                            tracing::debug!("Session handle dropped, stopping watcher");
                            return;
                        }
                    };
                    if let Some(event) = event {
                        if self.emit(event, &events).await {
                            return;
                        }
                    }
                }
                _ = wake => {
                    if let Some(event) = self.timer.poll(now()) {
                        if self.emit(event, &events).await {
                            return;
                        }
                    }
                }
            }
        }
    }

    async fn stay_logged_in(&mut self) -> Option<SessionEvent> {
        if let Err(e) = self.timer.acknowledge() {
            tracing::debug!("Ignoring stay-signed-in request: {}", e);
            return None;
        }

        match self.refresher.refresh_session().await {
            Ok(()) => self.timer.refresh_succeeded(now()).ok(),
            Err(e) => {
                tracing::warn!("Could not extend session: {}", e);
                Some(self.timer.refresh_failed())
            }
        }
    }

    /// Reports `event`; returns true when the watcher should stop
    async fn emit(&self, event: SessionEvent, events: &mpsc::Sender<SessionEvent>) -> bool {
        let finished = matches!(event, SessionEvent::LoggedOut(_));
        if let SessionEvent::LoggedOut(reason) = event {
            tracing::info!("Session ended: {}", reason);
            if let Err(e) = clear_session(&self.store) {
                tracing::error!("Failed to clear session state: {}", e);
            }
        }

        if events.send(event).await.is_err() {
            tracing::debug!("No listener for session event {:?}", event);
        }
        finished
    }
}

/// Tokio's clock, so paused-time tests drive the timer too
fn now() -> std::time::Instant {
    Instant::now().into_std()
}
