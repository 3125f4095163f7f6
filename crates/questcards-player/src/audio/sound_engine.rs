//! Sound engine — narration playback via rodio
//!
//! Plays the MPEG audio returned by the TTS provider. One narration sink
//! at a time; `play` resolves once the sink has drained, `stop` cuts it
//! off or fades it out.
//!
//! rodio's `OutputStream` is not `Send`, so it lives on a small keep-alive
//! thread and only the (thread-safe) handle is kept here.

use std::io::Cursor;
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};

use questcards_engine::narration::{AudioOutput, NarrationError};

/// How often a playing sink is checked for completion
const DRAIN_POLL: Duration = Duration::from_millis(50);
/// Volume steps used for a fade-out
const FADE_STEPS: u32 = 20;

pub struct SoundEngine {
    /// Handle for creating new sinks (None = no audio device)
    handle: Option<OutputStreamHandle>,
    /// Narration currently playing
    current: Mutex<Option<Arc<Sink>>>,
    /// Dropping this releases the output stream thread
    _keepalive: Option<mpsc::Sender<()>>,
}

impl SoundEngine {
    /// Open the default output device. Without one, every `play` is
    /// rejected and narration falls back to the local voice.
    pub fn new() -> Self {
        let (ready_tx, ready_rx) = mpsc::channel();
        let (keepalive_tx, keepalive_rx) = mpsc::channel::<()>();
        let spawned = std::thread::Builder::new()
            .name("audio-output".to_string())
            .spawn(move || match OutputStream::try_default() {
                Ok((stream, handle)) => {
                    let _ = ready_tx.send(Some(handle));
                    // Blocks until the engine is dropped
                    let _ = keepalive_rx.recv();
                    drop(stream);
                }
                Err(e) => {
                    tracing::warn!("Failed to initialize audio: {}", e);
                    let _ = ready_tx.send(None);
                }
            });

        let handle = match spawned {
            Ok(_) => ready_rx.recv().ok().flatten(),
            Err(e) => {
                tracing::warn!("Failed to start audio thread: {}", e);
                None
            }
        };
        if handle.is_some() {
            tracing::info!("Audio output initialized");
        }
        Self {
            handle,
            current: Mutex::new(None),
            _keepalive: Some(keepalive_tx),
        }
    }

    /// No output device (`--mute`)
    pub fn silent() -> Self {
        Self {
            handle: None,
            current: Mutex::new(None),
            _keepalive: None,
        }
    }

    fn start(&self, audio: Vec<u8>) -> Result<Arc<Sink>, NarrationError> {
        let handle = self
            .handle
            .as_ref()
            .ok_or_else(|| NarrationError::Playback("no audio device".to_string()))?;
        let source = Decoder::new(Cursor::new(audio))
            .map_err(|e| NarrationError::Playback(format!("undecodable audio: {}", e)))?;
        let sink = Sink::try_new(handle)
            .map_err(|e| NarrationError::Playback(format!("no sink: {}", e)))?;
        sink.append(source);
        let sink = Arc::new(sink);
        if let Some(previous) = self.current.lock().replace(sink.clone()) {
            previous.stop();
        }
        Ok(sink)
    }
}

impl AudioOutput for SoundEngine {
    async fn play(&self, audio: Vec<u8>) -> Result<(), NarrationError> {
        let sink = self.start(audio)?;
        while !sink.empty() {
            tokio::time::sleep(DRAIN_POLL).await;
        }
        Ok(())
    }

    fn stop(&self, fade: Option<Duration>) {
        let Some(sink) = self.current.lock().take() else {
            return;
        };
        match fade {
            Some(fade) if !fade.is_zero() => {
                let start = sink.volume();
                let step = fade / FADE_STEPS;
                let spawned = std::thread::Builder::new()
                    .name("audio-fade".to_string())
                    .spawn({
                        let sink = sink.clone();
                        move || {
                            for volume in fade_volumes(start) {
                                sink.set_volume(volume);
                                std::thread::sleep(step);
                            }
                            sink.stop();
                        }
                    });
                if spawned.is_err() {
                    sink.stop();
                }
            }
            _ => sink.stop(),
        }
    }
}

/// Descending volume levels for a fade-out starting at `start`
fn fade_volumes(start: f32) -> impl Iterator<Item = f32> {
    (0..FADE_STEPS).rev().map(move |i| start * i as f32 / FADE_STEPS as f32)
}
