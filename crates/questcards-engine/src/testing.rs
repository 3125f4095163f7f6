//! Test doubles shared by the engine's unit tests

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Notify;

use crate::capture::{CaptureDevice, CaptureError, CodeDecoder, Decoded, FacingMode, Frame, FrameStream};
use crate::codes::character_code;
use crate::narration::{AudioOutput, LocalVoice, NarrationError, NarrationProvider};
use crate::session::{Game, Request};
use crate::Character;

/// Let spawned tasks run to their next await point
pub async fn settle() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}

/// One player on the Game screen with the tile scan already requested
pub fn scanning_game() -> (Game, Vec<Request>) {
    let mut game = Game::from_seed(7);
    game.start_game().unwrap();
    game.continue_intro().unwrap();
    game.choose_player_count(1).unwrap();
    game.accept_code(&character_code(Character::Goblin)).unwrap();
    let reqs = game.end_turn().unwrap();
    (game, reqs)
}

/// Character selection for `players`, nobody picked yet
pub fn character_select_game(players: usize) -> (Game, Vec<Request>) {
    let mut game = Game::from_seed(7);
    game.start_game().unwrap();
    game.continue_intro().unwrap();
    let reqs = game.choose_player_count(players).unwrap();
    (game, reqs)
}

// ---------------------------------------------------------------------------
// Camera
// ---------------------------------------------------------------------------

#[derive(Default)]
struct CameraState {
    frames: Mutex<VecDeque<String>>,
    facings: Mutex<Vec<FacingMode>>,
    opens: AtomicUsize,
    stops: AtomicUsize,
    failure: Option<CaptureError>,
}

/// Camera whose "frames" are code strings, served FIFO across sessions
#[derive(Clone, Default)]
pub struct FakeCamera {
    state: Arc<CameraState>,
}

impl FakeCamera {
    pub fn with_frames(frames: &[&str]) -> Self {
        let camera = Self::default();
        camera.push_frames(frames);
        camera
    }

    pub fn failing(err: CaptureError) -> Self {
        Self {
            state: Arc::new(CameraState {
                failure: Some(err),
                ..CameraState::default()
            }),
        }
    }

    pub fn push_frames(&self, frames: &[&str]) {
        let mut queue = self.state.frames.lock().unwrap();
        queue.extend(frames.iter().map(|f| f.to_string()));
    }

    pub fn opens(&self) -> usize {
        self.state.opens.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.state.stops.load(Ordering::SeqCst)
    }

    pub fn remaining_frames(&self) -> usize {
        self.state.frames.lock().unwrap().len()
    }

    pub fn facings(&self) -> Vec<FacingMode> {
        self.state.facings.lock().unwrap().clone()
    }
}

pub struct FakeStream {
    state: Arc<CameraState>,
}

impl FrameStream for FakeStream {
    fn grab(&mut self) -> Option<Frame> {
        let text = self.state.frames.lock().unwrap().pop_front()?;
        Some(Frame {
            data: text.into_bytes(),
            width: 1,
            height: 1,
        })
    }

    fn stop(&mut self) {
        self.state.stops.fetch_add(1, Ordering::SeqCst);
    }
}

impl CaptureDevice for FakeCamera {
    type Stream = FakeStream;

    async fn open(&self, facing: FacingMode) -> Result<FakeStream, CaptureError> {
        self.state.facings.lock().unwrap().push(facing);
        if let Some(err) = &self.state.failure {
            return Err(err.clone());
        }
        self.state.opens.fetch_add(1, Ordering::SeqCst);
        Ok(FakeStream {
            state: self.state.clone(),
        })
    }
}

/// Frames are UTF-8 code text; empty frames hold no code
pub struct TextDecoder;

impl CodeDecoder for TextDecoder {
    fn decode(&self, frame: &[u8], _width: u32, _height: u32) -> Option<Decoded> {
        if frame.is_empty() {
            return None;
        }
        std::str::from_utf8(frame).ok().map(|s| Decoded { data: s.to_string() })
    }
}

// ---------------------------------------------------------------------------
// Narration
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub enum ProviderMode {
    /// Echo the text back as "audio"
    Audio,
    Fail(NarrationError),
    /// Never answer
    Hang,
}

#[derive(Clone)]
pub struct FakeProvider {
    mode: ProviderMode,
    calls: Arc<Mutex<Vec<String>>>,
}

impl FakeProvider {
    pub fn new(mode: ProviderMode) -> Self {
        Self {
            mode,
            calls: Arc::default(),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl NarrationProvider for FakeProvider {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, NarrationError> {
        self.calls.lock().unwrap().push(text.to_string());
        match &self.mode {
            ProviderMode::Audio => Ok(text.as_bytes().to_vec()),
            ProviderMode::Fail(err) => Err(err.clone()),
            ProviderMode::Hang => std::future::pending().await,
        }
    }
}

#[derive(Default)]
struct OutputState {
    played: Mutex<Vec<Vec<u8>>>,
    stops: Mutex<Vec<Option<Duration>>>,
    reject: bool,
    hold: bool,
    release: Notify,
}

/// Audio sink. `holding` keeps every playback running until `release`.
#[derive(Clone, Default)]
pub struct FakeOutput {
    state: Arc<OutputState>,
}

impl FakeOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting() -> Self {
        Self {
            state: Arc::new(OutputState {
                reject: true,
                ..OutputState::default()
            }),
        }
    }

    pub fn holding() -> Self {
        Self {
            state: Arc::new(OutputState {
                hold: true,
                ..OutputState::default()
            }),
        }
    }

    /// Let the next held playback finish
    pub fn release(&self) {
        self.state.release.notify_one();
    }

    pub fn played(&self) -> Vec<Vec<u8>> {
        self.state.played.lock().unwrap().clone()
    }

    pub fn stops(&self) -> Vec<Option<Duration>> {
        self.state.stops.lock().unwrap().clone()
    }
}

impl AudioOutput for FakeOutput {
    async fn play(&self, audio: Vec<u8>) -> Result<(), NarrationError> {
        if self.state.reject {
            return Err(NarrationError::Playback("autoplay blocked".to_string()));
        }
        self.state.played.lock().unwrap().push(audio);
        if self.state.hold {
            self.state.release.notified().await;
        }
        Ok(())
    }

    fn stop(&self, fade: Option<Duration>) {
        self.state.stops.lock().unwrap().push(fade);
    }
}

#[derive(Clone, Default)]
pub struct FakeVoice {
    said: Arc<Mutex<Vec<String>>>,
    stops: Arc<AtomicUsize>,
}

impl FakeVoice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn said(&self) -> Vec<String> {
        self.said.lock().unwrap().clone()
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

impl LocalVoice for FakeVoice {
    async fn say(&self, text: &str) {
        self.said.lock().unwrap().push(text.to_string());
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}
