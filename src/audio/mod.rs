pub mod file;
pub mod recorder;
pub mod resample;

pub use file::AudioFile;
pub use recorder::{AudioRecorder, CAPTURE_SAMPLE_RATE};
pub use resample::{resample_mono, write_wav_mono16, MODEL_SAMPLE_RATE};
