//! Camera capture collaborators
//!
//! The engine never talks to camera hardware directly. A `CaptureDevice`
//! opens a `FrameStream` for a facing mode (an async request that may wait
//! on a permission prompt or fail), the stream hands out frames, and a
//! `CodeDecoder` turns a frame into a code string when one is visible.
//!
//! `CaptureSession` owns an open stream and releases the hardware when it
//! is stopped or dropped, so a session can never be left running.

use std::future::Future;

use serde::Serialize;

/// Which camera to open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FacingMode {
    /// Back camera, pointed at the table
    Environment,
    /// Front camera, pointed at the players
    User,
}

/// One grabbed video frame (RGBA or luma, decoder's choice)
#[derive(Debug, Clone)]
pub struct Frame {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Decoder output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub data: String,
}

/// Why the camera could not be used. Always recoverable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CaptureError {
    #[error("camera permission denied")]
    PermissionDenied,
    #[error("no camera found")]
    NoDevice,
    #[error("camera needs a secure context")]
    InsecureContext,
    #[error("camera stream failed: {0}")]
    Stream(String),
}

/// QR decoding black box: `decode(frame, width, height) → {data} | none`
pub trait CodeDecoder: Send + Sync + 'static {
    fn decode(&self, frame: &[u8], width: u32, height: u32) -> Option<Decoded>;
}

/// An open video stream
pub trait FrameStream: Send + 'static {
    /// Latest frame, or None if no new frame is ready. Must not block.
    fn grab(&mut self) -> Option<Frame>;
    /// Release the camera
    fn stop(&mut self);
}

/// Something that can open camera streams
pub trait CaptureDevice: Send + Sync + 'static {
    type Stream: FrameStream;

    fn open(
        &self,
        facing: FacingMode,
    ) -> impl Future<Output = Result<Self::Stream, CaptureError>> + Send;
}

/// An owned, running capture. Stopping is idempotent; drop stops too.
pub struct CaptureSession<S: FrameStream> {
    stream: S,
    facing: FacingMode,
    stopped: bool,
}

impl<S: FrameStream> CaptureSession<S> {
    pub fn new(stream: S, facing: FacingMode) -> Self {
        tracing::debug!("Capture session started ({:?})", facing);
        Self {
            stream,
            facing,
            stopped: false,
        }
    }

    pub fn grab(&mut self) -> Option<Frame> {
        if self.stopped {
            return None;
        }
        self.stream.grab()
    }

    pub fn stop(&mut self) {
        if !self.stopped {
            self.stopped = true;
            self.stream.stop();
            tracing::debug!("Capture session stopped ({:?})", self.facing);
        }
    }
}

impl<S: FrameStream> Drop for CaptureSession<S> {
    fn drop(&mut self) {
        self.stop();
    }
}
