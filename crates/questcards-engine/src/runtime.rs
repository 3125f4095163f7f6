//! Runtime — the cooperative driver
//!
//! Owns the `Game` controller, the scan dispatcher and the narration queue.
//! UI actions come in through `dispatch`; `tick` runs one scan-dispatcher
//! poll per display frame. Every `Request` a transition returns is executed
//! here, in order, and the resulting state is published on a watch channel
//! for whoever renders it. A scan that has to wait for narration is parked
//! until its utterance resolves and dropped if the session moved on.
//!
//! Everything runs on one task: transitions never interleave, and a reset
//! is always seen by the very next poll.

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;

use crate::boss::BossPart;
use crate::capture::{CaptureDevice, CodeDecoder};
use crate::narration::{AudioOutput, LocalVoice, NarrationProvider, NarrationQueue, SpeechOutcome, Utterance};
use crate::scanner::{ScanDispatcher, ScanJob, ScanPoll};
use crate::session::{Game, GameError, Request, Snapshot};

/// User-initiated inputs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    StartGame,
    Continue,
    ChoosePlayers(usize),
    EndTurn,
    Hit(BossPart),
    RetryScan,
    Reset,
}

#[derive(Debug, Clone, Copy)]
pub struct RuntimeConfig {
    /// Scan poll interval (one display frame)
    pub tick: Duration,
    /// Fade applied when narration is silenced
    pub fade: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(16),
            fade: Duration::from_millis(400),
        }
    }
}

/// Camera start waiting on the narration in front of it
struct DeferredScan {
    job: ScanJob,
    utterance: Utterance,
}

pub struct Runtime<D, K, P, O, V>
where
    D: CaptureDevice,
    K: CodeDecoder,
{
    game: Game,
    scanner: ScanDispatcher<D, K>,
    narration: NarrationQueue<P, O, V>,
    config: RuntimeConfig,
    state: watch::Sender<Snapshot>,
    deferred: Option<DeferredScan>,
}

impl<D, K, P, O, V> Runtime<D, K, P, O, V>
where
    D: CaptureDevice,
    K: CodeDecoder,
    P: NarrationProvider,
    O: AudioOutput,
    V: LocalVoice,
{
    pub fn new(
        game: Game,
        scanner: ScanDispatcher<D, K>,
        narration: NarrationQueue<P, O, V>,
        config: RuntimeConfig,
    ) -> Self {
        let (state, _) = watch::channel(game.snapshot());
        Self {
            game,
            scanner,
            narration,
            config,
            state,
            deferred: None,
        }
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    /// Latest published state
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.state.subscribe()
    }

    fn publish(&self) {
        self.state.send_replace(self.game.snapshot());
    }

    /// Apply one user action. Actions that do not fit the current screen
    /// or phase are refused without side effects.
    pub fn dispatch(&mut self, action: Action) -> Result<(), GameError> {
        tracing::debug!("Action: {:?}", action);
        let requests = match action {
            Action::StartGame => self.game.start_game()?,
            Action::Continue => self.game.continue_intro()?,
            Action::ChoosePlayers(count) => self.game.choose_player_count(count)?,
            Action::EndTurn => self.game.end_turn()?,
            Action::Hit(part) => self.game.hit_boss(part)?.1,
            Action::RetryScan => self.game.retry_scan()?,
            Action::Reset => self.game.reset(),
        };
        self.execute(requests);
        self.publish();
        Ok(())
    }

    /// One scan poll. Returns true when the game state changed.
    pub fn tick(&mut self) -> bool {
        self.start_deferred_scan();
        match self.scanner.poll(&self.game) {
            ScanPoll::Idle | ScanPoll::Waiting => false,
            ScanPoll::CameraError(err) => {
                self.game.camera_failed(&err.to_string());
                self.publish();
                true
            }
            ScanPoll::Hit(hit) => {
                match self.game.accept_code(&hit.code) {
                    Ok(requests) => self.execute(requests),
                    Err(err) => tracing::warn!("Scanned code '{}' refused: {}", hit.code, err),
                }
                self.publish();
                true
            }
        }
    }

    /// Open the camera for a parked job once its narration is over
    fn start_deferred_scan(&mut self) {
        let Some(deferred) = self.deferred.as_mut() else {
            return;
        };
        let Some(outcome) = deferred.utterance.try_finished() else {
            return;
        };
        let job = deferred.job;
        self.deferred = None;
        if job.epoch != self.game.epoch() || self.game.scan_mode() != Some(job.mode) {
            tracing::debug!("Dropping deferred {:?} scan (epoch {} vs {})", job.mode, job.epoch, self.game.epoch());
            return;
        }
        if outcome == SpeechOutcome::Cancelled {
            tracing::debug!("Narration cut short, opening camera anyway");
        }
        self.scanner.start(job);
    }

    fn execute(&mut self, requests: Vec<Request>) {
        let mut spoken = None;
        for request in requests {
            match request {
                Request::Narrate(lines) => {
                    // Only a following deferred scan waits; the next narration cuts in
                    spoken = Some(self.narration.speak_lines(lines));
                }
                Request::StartScan(job) => {
                    self.deferred = None;
                    self.scanner.start(job);
                }
                Request::StartScanAfterNarration(job) => match spoken.take() {
                    Some(utterance) => {
                        self.scanner.stop();
                        self.deferred = Some(DeferredScan { job, utterance });
                    }
                    None => self.scanner.start(job),
                },
                Request::StopScan => {
                    self.deferred = None;
                    self.scanner.stop();
                }
                Request::SilenceNarration { fade } => {
                    self.narration.cancel(fade.then_some(self.config.fade));
                }
            }
        }
    }

    /// Release the camera and silence narration
    pub fn shutdown(&mut self) {
        self.deferred = None;
        self.scanner.stop();
        self.narration.cancel(None);
    }

    /// Drive the game until the action channel closes
    pub async fn run(mut self, mut actions: mpsc::Receiver<Action>) -> Snapshot {
        let mut ticker = tokio::time::interval(self.config.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        self.publish();

        loop {
            tokio::select! {
                action = actions.recv() => match action {
                    Some(action) => {
                        if let Err(err) = self.dispatch(action) {
                            tracing::warn!("Action {:?} refused: {}", action, err);
                        }
                    }
                    None => break,
                },
                _ = ticker.tick() => {
                    self.tick();
                }
            }
        }

        tracing::info!("Action channel closed, shutting down");
        self.shutdown();
        self.game.snapshot()
    }
}
