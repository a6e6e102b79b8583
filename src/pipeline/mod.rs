mod engine;
pub mod hallucination;
mod pipeline;
mod queue;

pub use engine::{RawTranscription, SegmentSpan, WhisperEngine};
pub use pipeline::{InitOutcome, PipelineConfig, RecordingPipeline, Transcription};
pub use queue::TranscriptionQueue;
