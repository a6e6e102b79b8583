// Integration tests for the session lifecycle manager: state
// transitions, the elapsed-time counter, daily-total accounting, and
// recovery after a process restart.

use anyhow::Result;
use hoonote::model::{SessionMode, SessionStatus};
use hoonote::session::{ManagerState, SessionManager};
use hoonote::store::LocalStore;
use std::sync::Arc;
use tempfile::TempDir;

async fn setup(dir: &TempDir) -> Result<(Arc<LocalStore>, SessionManager)> {
    let store = Arc::new(LocalStore::open(dir.path()).await?);
    let manager = SessionManager::initialize(store.clone()).await?;
    Ok((store, manager))
}

#[tokio::test]
async fn test_initial_state_is_idle() -> Result<()> {
    let dir = TempDir::new()?;
    let (_store, manager) = setup(&dir).await?;

    assert_eq!(manager.state(), ManagerState::Idle);
    assert!(manager.current_session().is_none());
    assert_eq!(manager.elapsed_seconds(), 0);

    Ok(())
}

#[tokio::test]
async fn test_start_enters_recording() -> Result<()> {
    let dir = TempDir::new()?;
    let (_store, mut manager) = setup(&dir).await?;

    let session = manager.start_session(1500, SessionMode::Pomodoro).await?;
    assert_eq!(manager.state(), ManagerState::Recording);
    assert_eq!(session.duration_sec, 1500);
    assert_eq!(
        manager.current_session().map(|s| s.id.as_str()),
        Some(session.id.as_str())
    );

    Ok(())
}

#[tokio::test]
async fn test_second_start_fails_loudly() -> Result<()> {
    let dir = TempDir::new()?;
    let (store, mut manager) = setup(&dir).await?;

    let first = manager.start_session(1500, SessionMode::Standard).await?;
    let second = manager.start_session(600, SessionMode::Custom).await;
    assert!(second.is_err(), "Concurrent start must fail, not replace");

    // The stored active session is the original one.
    let current = store.get_current_session().await?.expect("active");
    assert_eq!(current.id, first.id);

    Ok(())
}

#[tokio::test]
async fn test_tick_counts_only_while_recording() -> Result<()> {
    let dir = TempDir::new()?;
    let (_store, mut manager) = setup(&dir).await?;

    // Ticks in idle are dropped.
    manager.tick();
    assert_eq!(manager.elapsed_seconds(), 0);

    manager.start_session(1500, SessionMode::Pomodoro).await?;
    for _ in 0..10 {
        manager.tick();
    }
    assert_eq!(manager.elapsed_seconds(), 10);

    // The planned duration is untouched by ticking.
    assert_eq!(
        manager.current_session().map(|s| s.duration_sec),
        Some(1500)
    );

    manager.end_session(None, None).await?;
    manager.tick();
    assert_eq!(
        manager.elapsed_seconds(),
        10,
        "Stray timer callbacks after end are ignored"
    );

    Ok(())
}

#[tokio::test]
async fn test_end_folds_elapsed_into_daily_total() -> Result<()> {
    let dir = TempDir::new()?;
    let (store, mut manager) = setup(&dir).await?;

    manager.start_session(1500, SessionMode::Standard).await?;
    for _ in 0..42 {
        manager.tick();
    }

    let ended = manager
        .end_session(Some("done".to_string()), None)
        .await?
        .expect("session ends");

    assert_eq!(ended.status, SessionStatus::Completed);
    assert_eq!(manager.state(), ManagerState::Reviewing);
    assert!(manager.current_session().is_none());

    assert_eq!(manager.daily_total().total_seconds, 42);
    assert_eq!(manager.daily_total().session_count, 1);
    assert_eq!(store.get_daily_total().await?.total_seconds, 42);

    Ok(())
}

#[tokio::test]
async fn test_cancel_discards_without_counting() -> Result<()> {
    let dir = TempDir::new()?;
    let (store, mut manager) = setup(&dir).await?;

    manager.start_session(1500, SessionMode::Standard).await?;
    for _ in 0..30 {
        manager.tick();
    }

    manager.cancel_session().await?;
    assert_eq!(manager.state(), ManagerState::Idle);
    assert_eq!(manager.elapsed_seconds(), 0);

    // Nothing persisted, nothing counted.
    assert!(store.get_current_session().await?.is_none());
    assert!(store.get_all_sessions().await?.is_empty());
    assert_eq!(store.get_daily_total().await?.total_seconds, 0);

    // Cancel from idle is a no-op.
    manager.cancel_session().await?;

    Ok(())
}

#[tokio::test]
async fn test_end_without_active_session_returns_none() -> Result<()> {
    let dir = TempDir::new()?;
    let (_store, mut manager) = setup(&dir).await?;

    let result = manager.end_session(None, None).await?;
    assert!(result.is_none());
    assert_eq!(manager.state(), ManagerState::Idle);

    Ok(())
}

#[tokio::test]
async fn test_end_with_vanished_session_resets_counter() -> Result<()> {
    let dir = TempDir::new()?;
    let (store, mut manager) = setup(&dir).await?;

    let session = manager.start_session(600, SessionMode::Standard).await?;
    for _ in 0..5 {
        manager.tick();
    }

    // Another actor discarded the session behind the manager's back.
    store.delete_session(&session.id).await?;

    let result = manager.end_session(None, None).await?;
    assert!(result.is_none());
    assert_eq!(manager.state(), ManagerState::Idle);
    assert_eq!(manager.elapsed_seconds(), 0, "Stale counter is cleared");
    assert_eq!(store.get_daily_total().await?.total_seconds, 0);

    Ok(())
}

#[tokio::test]
async fn test_restart_recovers_active_session() -> Result<()> {
    let dir = TempDir::new()?;
    let store = Arc::new(LocalStore::open(dir.path()).await?);

    let session = {
        let mut manager = SessionManager::initialize(store.clone()).await?;
        manager.start_session(1500, SessionMode::Deepwork).await?
        // Manager dropped here: simulates the process dying mid-session.
    };

    let recovered = SessionManager::initialize(store.clone()).await?;
    assert_eq!(recovered.state(), ManagerState::Recording);
    assert_eq!(
        recovered.current_session().map(|s| s.id.as_str()),
        Some(session.id.as_str())
    );
    // Elapsed is recomputed from wall time, so it is small but valid.
    assert!(recovered.elapsed_seconds() < 5);

    Ok(())
}

#[tokio::test]
async fn test_reviewing_allows_next_start() -> Result<()> {
    let dir = TempDir::new()?;
    let (_store, mut manager) = setup(&dir).await?;

    manager.start_session(600, SessionMode::Standard).await?;
    manager.end_session(None, None).await?;
    assert_eq!(manager.state(), ManagerState::Reviewing);

    // A new session can start straight from reviewing; the elapsed
    // counter restarts from zero.
    manager.start_session(900, SessionMode::Custom).await?;
    assert_eq!(manager.state(), ManagerState::Recording);
    assert_eq!(manager.elapsed_seconds(), 0);

    Ok(())
}

#[tokio::test]
async fn test_daily_total_accumulates_across_sessions() -> Result<()> {
    let dir = TempDir::new()?;
    let (_store, mut manager) = setup(&dir).await?;

    manager.start_session(600, SessionMode::Standard).await?;
    for _ in 0..20 {
        manager.tick();
    }
    manager.end_session(None, None).await?;

    manager.start_session(600, SessionMode::Standard).await?;
    for _ in 0..15 {
        manager.tick();
    }
    manager.end_session(None, None).await?;

    assert_eq!(manager.daily_total().total_seconds, 35);
    assert_eq!(manager.daily_total().session_count, 2);

    Ok(())
}

#[tokio::test]
async fn test_update_settings_persists() -> Result<()> {
    let dir = TempDir::new()?;
    let (store, mut manager) = setup(&dir).await?;

    let mut settings = manager.settings().clone();
    settings.default_duration = 2700;
    settings.auto_sync = false;
    manager.update_settings(settings).await?;

    assert_eq!(manager.settings().default_duration, 2700);
    let stored = store.get_settings().await?;
    assert_eq!(stored.default_duration, 2700);
    assert!(!stored.auto_sync);

    Ok(())
}
