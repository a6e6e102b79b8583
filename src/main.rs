use anyhow::Result;
use hoonote::{Config, LocalStore};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cfg = Config::load("config/hoonote").unwrap_or_else(|_| {
        info!("No config file found, using development defaults");
        Config::development()
    });

    info!("hoonote v0.1.0");
    info!("Store: {}", cfg.storage.data_path);
    info!("Recordings: {}", cfg.audio.recordings_path);
    info!("Sync endpoint: {}", cfg.sync.base_url);

    let store = LocalStore::open(&cfg.storage.data_path).await?;

    let pending = store.get_pending_sessions().await?.len();
    let total = store.get_daily_total().await?;
    let jobs = store.pending_transcriptions().await?.len();

    info!("Pending sessions: {}", pending);
    info!("Pending transcription jobs: {}", jobs);
    info!(
        "Today ({}): {}s over {} session(s)",
        total.date, total.total_seconds, total.session_count
    );

    Ok(())
}
