pub mod api;
pub mod audio;
pub mod config;
pub mod model;
pub mod pipeline;
pub mod session;
pub mod store;
pub mod sync;

pub use api::{ApiClient, SessionApi, TokenProvider};
pub use audio::{AudioFile, AudioRecorder, CAPTURE_SAMPLE_RATE, MODEL_SAMPLE_RATE};
pub use config::Config;
pub use model::{
    DailyTotal, HooSettings, LogEntry, NewLogEntry, Session, SessionMode, SessionStatus,
    SyncReport, SyncResult, UserSettings,
};
pub use pipeline::{InitOutcome, PipelineConfig, RecordingPipeline, Transcription, TranscriptionQueue};
pub use session::{ManagerState, SessionManager};
pub use store::{LocalStore, DAILY_LIMIT_SECONDS};
pub use sync::SyncEngine;
