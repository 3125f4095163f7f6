//! Scan dispatcher — the per-frame decode loop
//!
//! Owns the single capture session. The runtime calls `poll` once per
//! display frame; each poll does bounded work (one frame grab, one decode
//! attempt) and never blocks:
//!
//!   Idle ──start(job)──▶ Opening ──stream ready──▶ Streaming ──code──▶ Idle
//!
//! Every poll re-reads the controller: if the session epoch or scan mode no
//! longer matches the job, the camera is released and the job dropped, so
//! nothing decoded for an old phase is ever delivered. Accepted codes stop
//! the camera *before* they are handed back.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::capture::{CaptureDevice, CaptureError, CaptureSession, CodeDecoder, FacingMode};
use crate::session::{Game, ScanMode};

/// One request for camera time, tagged with the session it belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanJob {
    pub mode: ScanMode,
    pub facing: FacingMode,
    pub epoch: u64,
}

/// A code delivered by the dispatcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanHit {
    pub code: String,
    pub job: ScanJob,
}

/// Result of one poll
#[derive(Debug, PartialEq, Eq)]
pub enum ScanPoll {
    /// No job
    Idle,
    /// Camera opening, or no (new) code in this frame
    Waiting,
    /// Camera could not be opened; the job is dropped
    CameraError(CaptureError),
    Hit(ScanHit),
}

type OpenResult<S> = Result<CaptureSession<S>, CaptureError>;

enum State<S: crate::capture::FrameStream> {
    Idle,
    Opening {
        job: ScanJob,
        rx: oneshot::Receiver<OpenResult<S>>,
        task: JoinHandle<()>,
    },
    Streaming {
        job: ScanJob,
        session: CaptureSession<S>,
    },
}

pub struct ScanDispatcher<D: CaptureDevice, K: CodeDecoder> {
    device: Arc<D>,
    decoder: K,
    state: State<D::Stream>,
    /// How long the last delivered code is held back after a restart
    hold: Duration,
    recent: Option<(String, Instant)>,
}

impl<D: CaptureDevice, K: CodeDecoder> ScanDispatcher<D, K> {
    pub fn new(device: D, decoder: K, hold: Duration) -> Self {
        Self {
            device: Arc::new(device),
            decoder,
            state: State::Idle,
            hold,
            recent: None,
        }
    }

    /// Job currently owning the camera (opening or streaming)
    pub fn job(&self) -> Option<ScanJob> {
        match &self.state {
            State::Idle => None,
            State::Opening { job, .. } | State::Streaming { job, .. } => Some(*job),
        }
    }

    /// Stop whatever holds the camera, then request a stream for `job`.
    /// Opening runs as its own task so a pending permission prompt never
    /// blocks the loop.
    pub fn start(&mut self, job: ScanJob) {
        self.stop();
        let (tx, rx) = oneshot::channel();
        let device = self.device.clone();
        let task = tokio::spawn(async move {
            let result = device
                .open(job.facing)
                .await
                .map(|stream| CaptureSession::new(stream, job.facing));
            // Receiver gone: the session is dropped here and releases the camera
            let _ = tx.send(result);
        });
        tracing::debug!("Opening camera for {:?} (epoch {})", job.mode, job.epoch);
        self.state = State::Opening { job, rx, task };
    }

    /// Release the camera and forget the job. Safe to call at any time.
    pub fn stop(&mut self) {
        match std::mem::replace(&mut self.state, State::Idle) {
            State::Idle => {}
            State::Opening { task, .. } => task.abort(),
            State::Streaming { mut session, .. } => session.stop(),
        }
    }

    fn is_held(&self, code: &str) -> bool {
        match &self.recent {
            Some((recent, at)) => recent == code && at.elapsed() < self.hold,
            None => false,
        }
    }

    /// One tick of the decode loop
    pub fn poll(&mut self, game: &Game) -> ScanPoll {
        let Some(job) = self.job() else {
            return ScanPoll::Idle;
        };
        if game.epoch() != job.epoch || game.scan_mode() != Some(job.mode) {
            tracing::debug!("Dropping stale {:?} scan (epoch {} vs {})", job.mode, job.epoch, game.epoch());
            self.stop();
            return ScanPoll::Idle;
        }

        if let State::Opening { rx, .. } = &mut self.state {
            match rx.try_recv() {
                Ok(Ok(session)) => {
                    tracing::info!("Camera ready ({:?})", job.facing);
                    self.state = State::Streaming { job, session };
                }
                Ok(Err(err)) => {
                    tracing::warn!("Camera unavailable: {}", err);
                    self.state = State::Idle;
                    return ScanPoll::CameraError(err);
                }
                Err(TryRecvError::Empty) => return ScanPoll::Waiting,
                Err(TryRecvError::Closed) => {
                    self.state = State::Idle;
                    return ScanPoll::CameraError(CaptureError::Stream(
                        "camera request was dropped".to_string(),
                    ));
                }
            }
        }

        let State::Streaming { session, .. } = &mut self.state else {
            return ScanPoll::Idle;
        };
        let Some(frame) = session.grab() else {
            return ScanPoll::Waiting;
        };
        let Some(decoded) = self.decoder.decode(&frame.data, frame.width, frame.height) else {
            return ScanPoll::Waiting;
        };
        let code = decoded.data.trim();
        if code.is_empty() {
            return ScanPoll::Waiting;
        }
        if game.should_ignore(code) {
            tracing::trace!("Already scanned '{}', still looking", code);
            return ScanPoll::Waiting;
        }
        if self.is_held(code) {
            tracing::trace!("Holding back '{}' after restart", code);
            return ScanPoll::Waiting;
        }

        let code = code.to_string();
        self.stop();
        self.recent = Some((code.clone(), Instant::now()));
        tracing::info!("Scanned '{}'", code);
        ScanPoll::Hit(ScanHit { code, job })
    }
}

impl<D: CaptureDevice, K: CodeDecoder> Drop for ScanDispatcher<D, K> {
    fn drop(&mut self) {
        self.stop();
    }
}
