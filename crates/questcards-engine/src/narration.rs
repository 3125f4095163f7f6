//! Narration queue — one voice at a time
//!
//! `speak_lines` cancels whatever is playing, then speaks its lines in
//! order as a single task. For each line the remote provider is asked for
//! audio (bounded by a timeout) and the audio is played; any failure along
//! the way (not configured, HTTP error, timeout, playback rejected) falls
//! back to the local voice for that line. Failures are logged, never
//! surfaced.
//!
//! The returned `Utterance` resolves when every line has been spoken, or
//! with `Cancelled` if a newer narration or a reset cut it short.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NarrationError {
    #[error("narration provider not configured")]
    NotConfigured,
    #[error("provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("provider request failed: {0}")]
    Transport(String),
    #[error("audio playback failed: {0}")]
    Playback(String),
}

/// Remote text-to-speech (`POST /tts {text}` → audio/mpeg)
pub trait NarrationProvider: Send + Sync + 'static {
    fn synthesize(&self, text: &str) -> impl Future<Output = Result<Vec<u8>, NarrationError>> + Send;
}

/// Plays provider audio; `play` resolves when playback ends
pub trait AudioOutput: Send + Sync + 'static {
    fn play(&self, audio: Vec<u8>) -> impl Future<Output = Result<(), NarrationError>> + Send;
    /// Stop current playback, optionally fading out
    fn stop(&self, fade: Option<Duration>);
}

/// Local speech synthesis fallback
pub trait LocalVoice: Send + Sync + 'static {
    fn say(&self, text: &str) -> impl Future<Output = ()> + Send;
    fn stop(&self);
}

/// Which path actually spoke a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Voice {
    Remote,
    Local,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechOutcome {
    /// All lines spoken; one entry per line
    Spoken(Vec<Voice>),
    Cancelled,
}

/// Completion signal for one `speak`/`speak_lines` call
#[derive(Debug)]
pub struct Utterance {
    rx: oneshot::Receiver<Vec<Voice>>,
}

impl Utterance {
    pub async fn finished(self) -> SpeechOutcome {
        match self.rx.await {
            Ok(voices) => SpeechOutcome::Spoken(voices),
            Err(_) => SpeechOutcome::Cancelled,
        }
    }

    /// Non-blocking `finished`: `None` while lines are still being spoken
    pub fn try_finished(&mut self) -> Option<SpeechOutcome> {
        match self.rx.try_recv() {
            Ok(voices) => Some(SpeechOutcome::Spoken(voices)),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(SpeechOutcome::Cancelled),
        }
    }
}

pub struct NarrationQueue<P, O, V> {
    provider: Arc<P>,
    output: Arc<O>,
    voice: Arc<V>,
    fetch_timeout: Duration,
    current: Option<JoinHandle<()>>,
}

impl<P, O, V> NarrationQueue<P, O, V>
where
    P: NarrationProvider,
    O: AudioOutput,
    V: LocalVoice,
{
    pub fn new(provider: P, output: O, voice: V, fetch_timeout: Duration) -> Self {
        Self {
            provider: Arc::new(provider),
            output: Arc::new(output),
            voice: Arc::new(voice),
            fetch_timeout,
            current: None,
        }
    }

    pub fn speak(&mut self, text: impl Into<String>) -> Utterance {
        self.speak_lines(vec![text.into()])
    }

    /// Speak `lines` in order, after cancelling any narration in flight
    pub fn speak_lines(&mut self, lines: Vec<String>) -> Utterance {
        if self.is_speaking() {
            self.cancel(None);
        }
        let (tx, rx) = oneshot::channel();
        let provider = self.provider.clone();
        let output = self.output.clone();
        let voice = self.voice.clone();
        let timeout = self.fetch_timeout;
        tracing::debug!("Narrating {} line(s)", lines.len());
        self.current = Some(tokio::spawn(async move {
            let mut voices = Vec::with_capacity(lines.len());
            for line in &lines {
                voices.push(speak_line(&*provider, &*output, &*voice, line, timeout).await);
            }
            let _ = tx.send(voices);
        }));
        Utterance { rx }
    }

    pub fn is_speaking(&self) -> bool {
        self.current.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Stop narration now (`None`) or with a fade
    pub fn cancel(&mut self, fade: Option<Duration>) {
        if let Some(task) = self.current.take() {
            task.abort();
        }
        self.output.stop(fade);
        self.voice.stop();
    }
}

impl<P, O, V> Drop for NarrationQueue<P, O, V> {
    fn drop(&mut self) {
        if let Some(task) = self.current.take() {
            task.abort();
        }
    }
}

async fn speak_line<P, O, V>(provider: &P, output: &O, voice: &V, text: &str, timeout: Duration) -> Voice
where
    P: NarrationProvider,
    O: AudioOutput,
    V: LocalVoice,
{
    match tokio::time::timeout(timeout, provider.synthesize(text)).await {
        Ok(Ok(audio)) => match output.play(audio).await {
            Ok(()) => return Voice::Remote,
            Err(err) => tracing::warn!("Narration playback failed, using local voice: {}", err),
        },
        Ok(Err(NarrationError::NotConfigured)) => {
            tracing::debug!("Narration provider not configured, using local voice")
        }
        Ok(Err(err)) => tracing::warn!("Narration provider failed, using local voice: {}", err),
        Err(_) => tracing::warn!(
            "Narration provider timed out after {:?}, using local voice",
            timeout
        ),
    }
    voice.say(text).await;
    Voice::Local
}
