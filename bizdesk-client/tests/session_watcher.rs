//! Session watcher timing, on tokio's paused clock

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bizdesk_client::{ClientError, Result, SessionCommand, SessionWatcher, TokenRefresher};
use bizdesk_core::session::{IdleTimerConfig, LogoutReason, SessionEvent};
use bizdesk_core::store::{KeyValueStore, MemoryStore, keys};
use tokio::time::Instant;

#[derive(Default)]
struct FakeRefresher {
    fail: AtomicBool,
    calls: AtomicUsize,
}

#[async_trait]
impl TokenRefresher for FakeRefresher {
    async fn refresh_session(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            Err(ClientError::SessionInvalid("refresh token rejected".into()))
        } else {
            Ok(())
        }
    }
}

fn config() -> IdleTimerConfig {
    IdleTimerConfig {
        token_lifetime: Duration::from_secs(900),
        prompt_before_expiry: Duration::from_secs(60),
    }
}

fn signed_in_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store
        .set(keys::AUTH_TOKENS, r#"{"access":"a1","refresh":"r1"}"#.to_string())
        .unwrap();
    store.set(keys::PIPELINES, "[]".to_string()).unwrap();
    store
}

#[tokio::test(start_paused = true)]
async fn idle_session_prompts_then_times_out() {
    let store = signed_in_store();
    let refresher = Arc::new(FakeRefresher::default());
    let start = Instant::now();
    let mut handle = SessionWatcher::new(config(), refresher, Arc::clone(&store)).spawn();

    assert_eq!(handle.next_event().await, Some(SessionEvent::PromptShown));
    assert_eq!(start.elapsed().as_secs(), 840);

    assert_eq!(
        handle.next_event().await,
        Some(SessionEvent::LoggedOut(LogoutReason::Timeout))
    );
    assert_eq!(start.elapsed().as_secs(), 900);

    assert_eq!(store.get(keys::AUTH_TOKENS).unwrap(), None);
    assert!(store.get(keys::PIPELINES).unwrap().is_some());
    assert_eq!(handle.next_event().await, None);
}

#[tokio::test(start_paused = true)]
async fn activity_postpones_the_prompt() {
    let store = signed_in_store();
    let start = Instant::now();
    let mut handle =
        SessionWatcher::new(config(), Arc::new(FakeRefresher::default()), store).spawn();

    tokio::time::advance(Duration::from_secs(500)).await;
    assert!(handle.send(SessionCommand::Activity).await);

    assert_eq!(handle.next_event().await, Some(SessionEvent::PromptShown));
    assert_eq!(start.elapsed().as_secs(), 1340);
}

#[tokio::test(start_paused = true)]
async fn staying_logged_in_refreshes_and_restarts() {
    let refresher = Arc::new(FakeRefresher::default());
    let start = Instant::now();
    let mut handle =
        SessionWatcher::new(config(), Arc::clone(&refresher), signed_in_store()).spawn();

    assert_eq!(handle.next_event().await, Some(SessionEvent::PromptShown));
    assert!(handle.send(SessionCommand::StayLoggedIn).await);
    assert_eq!(handle.next_event().await, Some(SessionEvent::Extended));
    assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);

    assert_eq!(handle.next_event().await, Some(SessionEvent::PromptShown));
    assert_eq!(start.elapsed().as_secs(), 1680);
}

#[tokio::test(start_paused = true)]
async fn failed_refresh_logs_out() {
    let store = signed_in_store();
    let refresher = Arc::new(FakeRefresher::default());
    refresher.fail.store(true, Ordering::SeqCst);
    let mut handle =
        SessionWatcher::new(config(), refresher, Arc::clone(&store)).spawn();

    assert_eq!(handle.next_event().await, Some(SessionEvent::PromptShown));
    handle.send(SessionCommand::StayLoggedIn).await;

    assert_eq!(
        handle.next_event().await,
        Some(SessionEvent::LoggedOut(LogoutReason::RefreshFailed))
    );
    assert_eq!(store.get(keys::AUTH_TOKENS).unwrap(), None);
}

#[tokio::test(start_paused = true)]
async fn stay_logged_in_without_prompt_is_ignored() {
    let refresher = Arc::new(FakeRefresher::default());
    let mut handle =
        SessionWatcher::new(config(), Arc::clone(&refresher), signed_in_store()).spawn();

    handle.send(SessionCommand::StayLoggedIn).await;

    assert_eq!(handle.next_event().await, Some(SessionEvent::PromptShown));
    assert_eq!(refresher.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn manual_logout_clears_session_and_stops() {
    let store = signed_in_store();
    let mut handle =
        SessionWatcher::new(config(), Arc::new(FakeRefresher::default()), Arc::clone(&store))
            .spawn();

    let commands = handle.commands();
    handle.send(SessionCommand::Logout).await;

    assert_eq!(
        handle.next_event().await,
        Some(SessionEvent::LoggedOut(LogoutReason::Manual))
    );
    assert_eq!(store.get(keys::AUTH_TOKENS).unwrap(), None);

    handle.join().await;
    assert!(commands.send(SessionCommand::Activity).await.is_err());
}
