use anyhow::Result;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub storage: StorageConfig,
    pub audio: AudioConfig,
    pub transcription: TranscriptionConfig,
    pub sync: SyncConfig,
}

#[derive(Debug, Deserialize)]
pub struct StorageConfig {
    pub data_path: String,
}

#[derive(Debug, Deserialize)]
pub struct AudioConfig {
    pub recordings_path: String,
}

#[derive(Debug, Deserialize)]
pub struct TranscriptionConfig {
    pub model_path: String,
    pub language: String,
}

#[derive(Debug, Deserialize)]
pub struct SyncConfig {
    pub base_url: String,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Defaults rooted in the platform data directory; used when no config
    /// file is present.
    pub fn development() -> Self {
        let base = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("hoonote");

        Self {
            storage: StorageConfig {
                data_path: base.join("store").display().to_string(),
            },
            audio: AudioConfig {
                recordings_path: base.join("recordings").display().to_string(),
            },
            transcription: TranscriptionConfig {
                model_path: base.join("models/ggml-small-q5_1.bin").display().to_string(),
                language: "ja".to_string(),
            },
            sync: SyncConfig {
                base_url: "http://localhost:3000/api".to_string(),
            },
        }
    }
}
