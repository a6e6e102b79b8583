use anyhow::{bail, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{error, info, warn};

/// Capture rate for artifacts. Deliberately above the transcription model's
/// 16kHz so the recording doubles as a voice-memo-quality artifact; the
/// pipeline resamples down before inference.
pub const CAPTURE_SAMPLE_RATE: u32 = 48_000;

type SharedWriter = Arc<Mutex<Option<hound::WavWriter<BufWriter<File>>>>>;

struct ActiveRecording {
    path: PathBuf,
    stop: Arc<AtomicBool>,
    handle: JoinHandle<Result<()>>,
}

/// Owns the microphone capture device.
///
/// Writes 48kHz mono 16-bit WAV files named by start timestamp. Only one
/// recording may be open at a time: a second `start` fails fast instead of
/// corrupting the first artifact. `stop` when idle is a no-op returning
/// `None`.
pub struct AudioRecorder {
    recordings_dir: PathBuf,
    active: Mutex<Option<ActiveRecording>>,
}

impl AudioRecorder {
    pub fn new(recordings_dir: impl Into<PathBuf>) -> Result<Self> {
        let recordings_dir = recordings_dir.into();
        std::fs::create_dir_all(&recordings_dir)
            .context("Failed to create recordings directory")?;

        Ok(Self {
            recordings_dir,
            active: Mutex::new(None),
        })
    }

    /// Whether a default capture device is present. A missing device is the
    /// closest portable proxy for "microphone permission denied".
    pub fn probe_device() -> bool {
        cpal::default_host().default_input_device().is_some()
    }

    pub fn is_recording(&self) -> bool {
        self.active.lock().map(|a| a.is_some()).unwrap_or(false)
    }

    /// Open the capture device and start writing a timestamped WAV file.
    /// Errors on device-open failure or when a recording is already open.
    pub fn start(&self) -> Result<PathBuf> {
        let mut active = self
            .active
            .lock()
            .map_err(|_| anyhow::anyhow!("Recorder state poisoned"))?;
        if active.is_some() {
            bail!("A recording is already in progress");
        }

        let path = self.recordings_dir.join(format!(
            "rec-{}.wav",
            chrono::Local::now().format("%Y%m%d-%H%M%S")
        ));

        let stop = Arc::new(AtomicBool::new(false));
        let (ready_tx, ready_rx) = mpsc::channel::<Result<()>>();

        let thread_path = path.clone();
        let thread_stop = Arc::clone(&stop);

        // cpal streams are not Send, so the stream lives on its own thread
        // for the duration of the recording.
        let handle = std::thread::spawn(move || {
            capture_thread(thread_path, thread_stop, ready_tx)
        });

        // Wait for the stream to open (or fail) before reporting success.
        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let _ = handle.join();
                return Err(e.context("Failed to open capture device"));
            }
            Err(_) => {
                let _ = handle.join();
                bail!("Capture thread exited before opening the device");
            }
        }

        info!("Recording started: {}", path.display());

        *active = Some(ActiveRecording {
            path: path.clone(),
            stop,
            handle,
        });

        Ok(path)
    }

    /// Close the device and return the artifact path. Idempotent: `None`
    /// when no recording was active.
    pub fn stop(&self) -> Result<Option<PathBuf>> {
        let recording = {
            let mut active = self
                .active
                .lock()
                .map_err(|_| anyhow::anyhow!("Recorder state poisoned"))?;
            active.take()
        };

        let Some(recording) = recording else {
            return Ok(None);
        };

        recording.stop.store(true, Ordering::SeqCst);
        match recording.handle.join() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e.context("Capture thread failed")),
            Err(_) => bail!("Capture thread panicked"),
        }

        info!("Recording stopped: {}", recording.path.display());

        Ok(Some(recording.path))
    }
}

fn capture_thread(
    path: PathBuf,
    stop: Arc<AtomicBool>,
    ready_tx: mpsc::Sender<Result<()>>,
) -> Result<()> {
    let setup = open_stream(&path);

    let (stream, writer) = match setup {
        Ok(pair) => {
            let _ = ready_tx.send(Ok(()));
            pair
        }
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return Ok(());
        }
    };

    while !stop.load(Ordering::SeqCst) {
        std::thread::sleep(Duration::from_millis(50));
    }

    drop(stream);

    let mut guard = writer
        .lock()
        .map_err(|_| anyhow::anyhow!("WAV writer poisoned"))?;
    if let Some(w) = guard.take() {
        w.finalize().context("Failed to finalize WAV file")?;
    }

    Ok(())
}

fn open_stream(path: &PathBuf) -> Result<(cpal::Stream, SharedWriter)> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .context("No input device available (microphone missing or permission denied)")?;

    let sample_format = device
        .default_input_config()
        .context("Failed to query input device configuration")?
        .sample_format();

    let stream_config = cpal::StreamConfig {
        channels: 1,
        sample_rate: cpal::SampleRate(CAPTURE_SAMPLE_RATE),
        buffer_size: cpal::BufferSize::Default,
    };

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: CAPTURE_SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let writer: SharedWriter = Arc::new(Mutex::new(Some(
        hound::WavWriter::create(path, spec)
            .with_context(|| format!("Failed to create WAV file: {}", path.display()))?,
    )));

    let err_fn = |e| error!("Audio stream error: {}", e);

    let stream = match sample_format {
        cpal::SampleFormat::I16 => {
            let writer = Arc::clone(&writer);
            device.build_input_stream(
                &stream_config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    write_samples(&writer, data.iter().copied());
                },
                err_fn,
                None,
            )?
        }
        cpal::SampleFormat::F32 => {
            let writer = Arc::clone(&writer);
            device.build_input_stream(
                &stream_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    write_samples(
                        &writer,
                        data.iter().map(|&s| (s.clamp(-1.0, 1.0) * 32767.0) as i16),
                    );
                },
                err_fn,
                None,
            )?
        }
        cpal::SampleFormat::U16 => {
            let writer = Arc::clone(&writer);
            device.build_input_stream(
                &stream_config,
                move |data: &[u16], _: &cpal::InputCallbackInfo| {
                    write_samples(&writer, data.iter().map(|&s| (s as i32 - 32768) as i16));
                },
                err_fn,
                None,
            )?
        }
        other => bail!("Unsupported input sample format: {:?}", other),
    };

    stream.play().context("Failed to start capture stream")?;

    Ok((stream, writer))
}

fn write_samples(writer: &SharedWriter, samples: impl Iterator<Item = i16>) {
    let Ok(mut guard) = writer.lock() else {
        return;
    };
    if let Some(w) = guard.as_mut() {
        for s in samples {
            if let Err(e) = w.write_sample(s) {
                warn!("Failed to write sample: {}", e);
                break;
            }
        }
    }
}
