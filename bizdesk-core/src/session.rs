//! Idle session timer
//!
//! Access tokens expire after a fixed lifetime. A user who stays idle for
//! `token_lifetime - prompt_before_expiry` is asked whether to stay signed
//! in; without an answer within `prompt_before_expiry` the session ends.
//!
//! ```text
//! Active --idle threshold--> PromptShown --prompt window--> LoggedOut(Timeout)
//!   ^                             |
//!   +---- refresh_succeeded ------+ acknowledge
//!                                 +---- refresh_failed ---> LoggedOut(RefreshFailed)
//! ```
//!
//! [`IdleTimer`] holds no clock and spawns nothing. Callers pass `now` into
//! every method and decide how to wait for [`IdleTimer::next_deadline`].

use std::fmt;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Default access token lifetime
pub const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(15 * 60);

/// Default warning window before the token expires
pub const DEFAULT_PROMPT_BEFORE_EXPIRY: Duration = Duration::from_secs(60);

/// Longest token lifetime the timer will track; longer settings are cut
/// down to it so deadline arithmetic cannot overflow
pub const MAX_TOKEN_LIFETIME: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Timer settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdleTimerConfig {
    pub token_lifetime: Duration,
    pub prompt_before_expiry: Duration,
}

impl IdleTimerConfig {
    /// Idle time after which the stay-signed-in prompt appears
    pub fn idle_threshold(&self) -> Duration {
        self.token_lifetime.saturating_sub(self.prompt_before_expiry)
    }

    /// Both durations capped at [`MAX_TOKEN_LIFETIME`], the prompt window
    /// never longer than the lifetime
    pub fn clamped(self) -> Self {
        let token_lifetime = self.token_lifetime.min(MAX_TOKEN_LIFETIME);
        Self {
            token_lifetime,
            prompt_before_expiry: self.prompt_before_expiry.min(token_lifetime),
        }
    }
}

impl Default for IdleTimerConfig {
    fn default() -> Self {
        Self {
            token_lifetime: DEFAULT_TOKEN_LIFETIME,
            prompt_before_expiry: DEFAULT_PROMPT_BEFORE_EXPIRY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutReason {
    /// The prompt went unanswered
    Timeout,
    /// The user asked to stay signed in but the token could not be refreshed
    RefreshFailed,
    /// Explicit sign-out
    Manual,
}

impl fmt::Display for LogoutReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogoutReason::Timeout => "session timed out",
            LogoutReason::RefreshFailed => "token refresh failed",
            LogoutReason::Manual => "signed out",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Active,
    /// Waiting for the user to confirm; `deadline` ends the session
    PromptShown { deadline: Instant },
    LoggedOut(LogoutReason),
}

impl SessionState {
    pub fn label(&self) -> &'static str {
        match self {
            SessionState::Active => "active",
            SessionState::PromptShown { .. } => "prompt_shown",
            SessionState::LoggedOut(_) => "logged_out",
        }
    }
}

/// Emitted on every state change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    PromptShown,
    /// The token was refreshed and the idle period restarted
    Extended,
    LoggedOut(LogoutReason),
}

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("No stay-signed-in prompt is showing (session is {0})")]
    NoPrompt(&'static str),

    #[error("Session has ended")]
    LoggedOut,
}

/// Idle tracking state machine
#[derive(Debug, Clone)]
pub struct IdleTimer {
    config: IdleTimerConfig,
    state: SessionState,
    last_input: Instant,
    /// Set between `acknowledge` and the refresh outcome
    refreshing: bool,
}

impl IdleTimer {
    pub fn new(config: IdleTimerConfig, now: Instant) -> Self {
        let clamped = config.clamped();
        if clamped != config {
            tracing::warn!(
                "Token lifetime capped at {:?} for idle tracking",
                clamped.token_lifetime
            );
        }
        Self {
            config: clamped,
            state: SessionState::Active,
            last_input: now,
            refreshing: false,
        }
    }

    pub fn config(&self) -> &IdleTimerConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_logged_out(&self) -> bool {
        matches!(self.state, SessionState::LoggedOut(_))
    }

    /// Notes user input
    ///
    /// Input only restarts the idle period while active. Once the prompt is
    /// up, the user has to answer it.
    pub fn record_input(&mut self, now: Instant) {
        if self.state == SessionState::Active {
            self.last_input = now;
        }
    }

    /// Advances the timer to `now`, returning the state change if one
    /// happened
    ///
    /// The prompt deadline is anchored at the moment the idle threshold was
    /// crossed, not at the time of the poll, so a late poll does not extend
    /// the prompt window.
    pub fn poll(&mut self, now: Instant) -> Option<SessionEvent> {
        match self.state {
            SessionState::Active => {
                let crossed_at = self.last_input + self.config.idle_threshold();
                if now < crossed_at {
                    return None;
                }
                let deadline = crossed_at + self.config.prompt_before_expiry;
                if now >= deadline {
                    self.state = SessionState::LoggedOut(LogoutReason::Timeout);
                    return Some(SessionEvent::LoggedOut(LogoutReason::Timeout));
                }
                self.state = SessionState::PromptShown { deadline };
                Some(SessionEvent::PromptShown)
            }
            SessionState::PromptShown { deadline } if !self.refreshing && now >= deadline => {
                self.state = SessionState::LoggedOut(LogoutReason::Timeout);
                Some(SessionEvent::LoggedOut(LogoutReason::Timeout))
            }
            _ => None,
        }
    }

    /// When `poll` next needs to run, if ever
    pub fn next_deadline(&self) -> Option<Instant> {
        match self.state {
            SessionState::Active => Some(self.last_input + self.config.idle_threshold()),
            SessionState::PromptShown { deadline } if !self.refreshing => Some(deadline),
            _ => None,
        }
    }

    /// The user chose to stay signed in
    ///
    /// Holds the prompt deadline until the caller reports the refresh
    /// outcome.
    pub fn acknowledge(&mut self) -> Result<(), SessionError> {
        match self.state {
            SessionState::PromptShown { .. } => {
                self.refreshing = true;
                Ok(())
            }
            SessionState::LoggedOut(_) => Err(SessionError::LoggedOut),
            other => Err(SessionError::NoPrompt(other.label())),
        }
    }

    pub fn refresh_succeeded(&mut self, now: Instant) -> Result<SessionEvent, SessionError> {
        if self.is_logged_out() {
            return Err(SessionError::LoggedOut);
        }
        self.state = SessionState::Active;
        self.last_input = now;
        self.refreshing = false;
        Ok(SessionEvent::Extended)
    }

    pub fn refresh_failed(&mut self) -> SessionEvent {
        self.end(LogoutReason::RefreshFailed)
    }

    pub fn logout(&mut self) -> SessionEvent {
        self.end(LogoutReason::Manual)
    }

    fn end(&mut self, reason: LogoutReason) -> SessionEvent {
        self.refreshing = false;
        if let SessionState::LoggedOut(previous) = self.state {
            return SessionEvent::LoggedOut(previous);
        }
        self.state = SessionState::LoggedOut(reason);
        SessionEvent::LoggedOut(reason)
    }
}
