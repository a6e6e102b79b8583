mod store;

pub use store::{LocalStore, TranscriptionJob, DAILY_LIMIT_SECONDS};
