//! Console front end
//!
//! A USB QR reader in keyboard mode types each scanned card as one line
//! (`Tile-012`, `Character-003`, …). Those lines go to the `CardReader`,
//! which stands in for the camera: it only accepts cards while the engine
//! has a capture open. Everything else typed on stdin is a command.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, watch};

use questcards_engine::boss::BossPart;
use questcards_engine::capture::{
    CaptureDevice, CaptureError, CodeDecoder, Decoded, FacingMode, Frame, FrameStream,
};
use questcards_engine::runtime::Action;
use questcards_engine::session::{RoundPhase, Screen, Snapshot};

pub const HELP: &str = "\
Commands:
  start | continue | players <1-4> | end | hit <head|body|shield>
  retry | reset | status | help | quit
Scanned cards (Tile-NNN, Character-NNN) are read as they arrive;
type `scan <code>` to enter any other code by hand.";

// ---------------------------------------------------------------------------
// Card reader (camera stand-in)
// ---------------------------------------------------------------------------

#[derive(Default)]
struct ReaderState {
    open: AtomicBool,
    pending: Mutex<VecDeque<String>>,
}

#[derive(Clone, Default)]
pub struct CardReader {
    state: Arc<ReaderState>,
}

impl CardReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a scanned card. Dropped when no capture is open.
    pub fn push(&self, code: &str) -> bool {
        if !self.state.open.load(Ordering::SeqCst) {
            tracing::info!("Card '{}' ignored, nothing to scan right now", code);
            return false;
        }
        self.state.pending.lock().push_back(code.to_string());
        true
    }
}

pub struct CardStream {
    state: Arc<ReaderState>,
}

impl FrameStream for CardStream {
    fn grab(&mut self) -> Option<Frame> {
        let code = self.state.pending.lock().pop_front()?;
        let width = code.len() as u32;
        Some(Frame {
            data: code.into_bytes(),
            width,
            height: 1,
        })
    }

    fn stop(&mut self) {
        self.state.open.store(false, Ordering::SeqCst);
        self.state.pending.lock().clear();
    }
}

impl CaptureDevice for CardReader {
    type Stream = CardStream;

    async fn open(&self, facing: FacingMode) -> Result<CardStream, CaptureError> {
        match facing {
            FacingMode::User => println!("  [reader] Hold your character card to the reader"),
            FacingMode::Environment => println!("  [reader] Scan the tile you landed on"),
        }
        self.state.pending.lock().clear();
        self.state.open.store(true, Ordering::SeqCst);
        Ok(CardStream {
            state: self.state.clone(),
        })
    }
}

/// Reader frames carry the typed text as-is
pub struct CardDecoder;

impl CodeDecoder for CardDecoder {
    fn decode(&self, frame: &[u8], _width: u32, _height: u32) -> Option<Decoded> {
        let text = std::str::from_utf8(frame).ok()?;
        if text.trim().is_empty() {
            return None;
        }
        Some(Decoded {
            data: text.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Action(Action),
    Card(String),
    Status,
    Help,
    Quit,
}

pub fn parse_line(line: &str) -> Option<Input> {
    let line = line.trim();
    if line.starts_with("Tile-") || line.starts_with("Character-") {
        return Some(Input::Card(line.to_string()));
    }
    let mut words = line.split_whitespace();
    let command = words.next()?.to_ascii_lowercase();
    let arg = words.next();
    let input = match command.as_str() {
        "start" => Input::Action(Action::StartGame),
        "continue" | "c" => Input::Action(Action::Continue),
        "players" | "p" => Input::Action(Action::ChoosePlayers(arg?.parse().ok()?)),
        "end" | "e" => Input::Action(Action::EndTurn),
        "hit" | "h" => Input::Action(Action::Hit(BossPart::parse(arg?)?)),
        "retry" => Input::Action(Action::RetryScan),
        "reset" => Input::Action(Action::Reset),
        "scan" => Input::Card(arg?.to_string()),
        "status" | "s" => Input::Status,
        "help" | "?" => Input::Help,
        "quit" | "q" | "exit" => Input::Quit,
        _ => return None,
    };
    Some(input)
}

/// Read stdin until `quit` or EOF. Dropping `actions` ends the game loop.
pub async fn read_input(
    actions: mpsc::Sender<Action>,
    reader: CardReader,
    state: watch::Receiver<Snapshot>,
) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!("stdin: {}", e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match parse_line(&line) {
            Some(Input::Action(action)) => {
                if actions.send(action).await.is_err() {
                    break;
                }
            }
            Some(Input::Card(code)) => {
                reader.push(&code);
            }
            Some(Input::Status) => {
                let snapshot = state.borrow().clone();
                match serde_json::to_string_pretty(&snapshot) {
                    Ok(json) => println!("{}", json),
                    Err(e) => tracing::warn!("Snapshot not serialisable: {}", e),
                }
            }
            Some(Input::Help) => println!("{}", HELP),
            Some(Input::Quit) => break,
            None => println!("Unknown command '{}'. Type `help`.", line.trim()),
        }
    }
    tracing::debug!("Input closed");
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Human-readable summary of the table state
pub fn describe(s: &Snapshot) -> String {
    let mut out = match s.screen {
        Screen::Main => "QuestCards. Type `start` to begin.".to_string(),
        Screen::Intro => "The tale begins... type `continue` when ready.".to_string(),
        Screen::PlayerCount => "How many adventurers? `players <1-4>`".to_string(),
        Screen::CharacterSelect => match s.awaiting_character {
            Some(i) => format!("Player {} of {}: scan your character card", i + 1, s.player_count),
            None => "Character selection".to_string(),
        },
        Screen::Game => {
            let turn = match s.round_phase {
                RoundPhase::PlayerTurn => format!("Player {}'s turn, `end` when done", s.current_player + 1),
                RoundPhase::ScanQr => format!("Player {}: scan your tile", s.current_player + 1),
            };
            format!("Act {} | Round {} | {}", s.act, s.rounds_completed + 1, turn)
        }
        Screen::Boss if s.victory => "VICTORY! The boss has fallen.".to_string(),
        Screen::Boss => match &s.boss {
            Some(b) => format!(
                "BOSS | head {} | body {} | shield {} | `hit <part>`",
                b.head, b.body, b.shield
            ),
            None => "BOSS".to_string(),
        },
    };

    if matches!(s.screen, Screen::Game | Screen::Boss) {
        for (i, p) in s.players.iter().enumerate() {
            out.push_str(&format!("\n  P{} {:<8} hp {}", i + 1, p.character.display_name(), p.hp));
            if !p.items.is_empty() {
                out.push_str(&format!("  [{}]", p.items.join(", ")));
            }
        }
    }
    if let Some(message) = &s.message {
        out.push_str(&format!("\n  {}", message));
    }
    if let Some(feedback) = &s.feedback {
        out.push_str(&format!("\n  {}", feedback));
    }
    out
}
