//! Session state machine — players, turns, rounds, acts, pending scans
//!
//! `Game` is the single controller: every transition is a method on it and
//! returns the side effects it wants performed as `Request`s (narrate, start
//! or stop the camera, silence narration). The runtime executes them; the
//! state machine itself never touches hardware or audio.
//!
//! Screen flow:
//!   Main → Intro → PlayerCount → CharacterSelect → Game → Boss
//!
//! Turn loop (Game screen):
//!   PlayerTurn(i) —end_turn→ ScanQr(pending = i) —resolve_scan→ PlayerTurn(i+1 mod n)
//!
//! Every session carries an epoch; reset starts a new one so late camera
//! results from the previous session can be recognised and dropped.

use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use serde::Serialize;

use questcards_common::Character;

use crate::boss::{BossHit, BossPart, BossState, BOSS_ENTRANCE};
use crate::capture::FacingMode;
use crate::characters::{self, CharacterPick, CharacterSelect};
use crate::codes::ScanCode;
use crate::scanner::ScanJob;
use crate::shard::ShardSchedule;
use crate::tile_event;

/// Hearts every player starts with
pub const STARTING_HP: u32 = 5;
/// Completed rounds after which Act 2 begins
pub const ACT_TWO_ROUNDS: u32 = 7;
pub const MAX_PLAYERS: usize = 4;

pub const INTRO_LINES: [&str; 3] = [
    "Long ago, the Crystal of the realm was shattered, and its shards were scattered across the land.",
    "Now the Warden of Shards stirs in the deep, and only a band of unlikely heroes can stop it.",
    "Gather your courage, adventurers. Your quest begins now.",
];
pub const QUEST_BEGINS: &str =
    "Your party is complete. Player 1, the quest is yours. Move, then press End Turn and show me the tile you landed on.";

// ---------------------------------------------------------------------------
// State types
// ---------------------------------------------------------------------------

/// Which screen (and which subsystems) is active
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Screen {
    Main,
    Intro,
    PlayerCount,
    CharacterSelect,
    Game,
    Boss,
}

/// Coarse narrative phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Act {
    One,
    Two,
    Three,
}

impl Act {
    /// Act 3 on the boss screen, Act 2 after seven full rounds, else Act 1
    pub fn derive(screen: Screen, rounds_completed: u32) -> Act {
        if screen == Screen::Boss {
            Act::Three
        } else if rounds_completed >= ACT_TWO_ROUNDS {
            Act::Two
        } else {
            Act::One
        }
    }

    pub fn number(&self) -> u8 {
        match self {
            Act::One => 1,
            Act::Two => 2,
            Act::Three => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RoundPhase {
    /// Waiting for "End Turn"
    PlayerTurn,
    /// Camera active, waiting for a tile card
    ScanQr,
}

/// What the camera is currently looking for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ScanMode {
    Tiles,
    Characters,
}

impl ScanMode {
    /// Tiles lie on the table (back camera); players hold character cards
    /// up to the screen (front camera)
    pub fn facing(&self) -> FacingMode {
        match self {
            ScanMode::Tiles => FacingMode::Environment,
            ScanMode::Characters => FacingMode::User,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Player {
    pub character: Character,
    pub hp: u32,
    /// Append-only
    pub items: Vec<String>,
}

impl Player {
    pub fn new(character: Character) -> Self {
        Self {
            character,
            hp: STARTING_HP,
            items: Vec::new(),
        }
    }
}

/// Side effects requested by a transition, executed in order by the runtime
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Speak these lines one after another (cancels narration in flight)
    Narrate(Vec<String>),
    /// Stop-then-start the camera for this job
    StartScan(ScanJob),
    /// Start the camera once the preceding `Narrate` has been spoken.
    /// Dropped if the session moved on in the meantime.
    StartScanAfterNarration(ScanJob),
    StopScan,
    SilenceNarration { fade: bool },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("action needs the {expected:?} screen, current screen is {actual:?}")]
    WrongScreen { expected: Screen, actual: Screen },
    #[error("action needs the {expected:?} phase, current phase is {actual:?}")]
    WrongPhase { expected: RoundPhase, actual: RoundPhase },
    #[error("player count must be 1-4, got {0}")]
    PlayerCount(usize),
    #[error("no scan is active")]
    NotScanning,
}

/// The root aggregate. Rebuilt wholesale on reset.
#[derive(Debug, Clone)]
pub struct Session {
    pub screen: Screen,
    pub player_count: usize,
    pub current_player_index: usize,
    pub players: Vec<Player>,
    pub rounds_completed: u32,
    pub round_phase: RoundPhase,
    pub pending_scan_target: Option<usize>,
    pub scanned_codes: HashSet<String>,
    pub shard_schedule: ShardSchedule,
    pub boss: Option<BossState>,
    pub character_select: Option<CharacterSelect>,
    /// Last event / display message (cleared by End Turn)
    pub message: Option<String>,
    /// Character-selection feedback ("taken", "unknown card")
    pub feedback: Option<String>,
    pub epoch: u64,
}

impl Session {
    fn new(epoch: u64) -> Self {
        Self {
            screen: Screen::Main,
            player_count: 0,
            current_player_index: 0,
            players: Vec::new(),
            rounds_completed: 0,
            round_phase: RoundPhase::PlayerTurn,
            pending_scan_target: None,
            scanned_codes: HashSet::new(),
            shard_schedule: ShardSchedule::empty(),
            boss: None,
            character_select: None,
            message: None,
            feedback: None,
            epoch,
        }
    }

    pub fn act(&self) -> Act {
        Act::derive(self.screen, self.rounds_completed)
    }
}

/// Read-only view of the session for UIs
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub screen: Screen,
    pub act: u8,
    pub round_phase: RoundPhase,
    pub player_count: usize,
    pub current_player: usize,
    pub rounds_completed: u32,
    pub players: Vec<Player>,
    pub awaiting_character: Option<usize>,
    pub boss: Option<BossState>,
    pub victory: bool,
    pub message: Option<String>,
    pub feedback: Option<String>,
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

pub struct Game {
    session: Session,
    rng: Box<dyn RngCore + Send>,
}

impl Game {
    pub fn new<R: RngCore + Send + 'static>(rng: R) -> Self {
        Self {
            session: Session::new(1),
            rng: Box::new(rng),
        }
    }

    pub fn from_seed(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }

    /// Replace the random source (seeded replays, tests)
    pub fn set_rng<R: RngCore + Send + 'static>(&mut self, rng: R) {
        self.rng = Box::new(rng);
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn screen(&self) -> Screen {
        self.session.screen
    }

    pub fn act(&self) -> Act {
        self.session.act()
    }

    pub fn epoch(&self) -> u64 {
        self.session.epoch
    }

    /// What the camera should be looking for right now, if anything
    pub fn scan_mode(&self) -> Option<ScanMode> {
        match (self.session.screen, self.session.round_phase) {
            (Screen::CharacterSelect, _) => Some(ScanMode::Characters),
            (Screen::Game, RoundPhase::ScanQr) => Some(ScanMode::Tiles),
            _ => None,
        }
    }

    /// Whether the scanner should drop this code without delivering it.
    /// Tile codes are deduplicated for the whole session; character codes
    /// always reach the selection flow, which turns away claimed cards.
    pub fn should_ignore(&self, code: &str) -> bool {
        match self.scan_mode() {
            Some(ScanMode::Tiles) => self.session.scanned_codes.contains(code),
            Some(ScanMode::Characters) => false,
            None => true,
        }
    }

    pub fn is_victory(&self) -> bool {
        self.session.screen == Screen::Boss
            && self.session.boss.as_ref().is_some_and(BossState::is_defeated)
    }

    fn scan_job(&self, mode: ScanMode) -> ScanJob {
        ScanJob {
            mode,
            facing: mode.facing(),
            epoch: self.session.epoch,
        }
    }

    fn expect_screen(&self, expected: Screen) -> Result<(), GameError> {
        if self.session.screen == expected {
            Ok(())
        } else {
            Err(GameError::WrongScreen {
                expected,
                actual: self.session.screen,
            })
        }
    }

    // ─── Screen flow ─────────────────────────────────────────────────────

    /// Main → Intro, speaks the intro
    pub fn start_game(&mut self) -> Result<Vec<Request>, GameError> {
        self.expect_screen(Screen::Main)?;
        self.session.screen = Screen::Intro;
        tracing::info!("Screen: Intro");
        Ok(vec![Request::Narrate(
            INTRO_LINES.iter().map(|s| s.to_string()).collect(),
        )])
    }

    /// Intro → PlayerCount
    pub fn continue_intro(&mut self) -> Result<Vec<Request>, GameError> {
        self.expect_screen(Screen::Intro)?;
        self.session.screen = Screen::PlayerCount;
        tracing::info!("Screen: PlayerCount");
        Ok(vec![Request::SilenceNarration { fade: true }])
    }

    /// PlayerCount → CharacterSelect, camera on for player 1
    pub fn choose_player_count(&mut self, count: usize) -> Result<Vec<Request>, GameError> {
        self.expect_screen(Screen::PlayerCount)?;
        if !(1..=MAX_PLAYERS).contains(&count) {
            return Err(GameError::PlayerCount(count));
        }
        self.session.player_count = count;
        self.session.character_select = Some(CharacterSelect::new(count));
        self.session.screen = Screen::CharacterSelect;
        tracing::info!("Screen: CharacterSelect ({} players)", count);
        Ok(vec![
            Request::Narrate(vec![characters::first_prompt()]),
            Request::StartScan(self.scan_job(ScanMode::Characters)),
        ])
    }

    // ─── Codes from the scanner ──────────────────────────────────────────

    /// Route a freshly decoded code to the active flow
    pub fn accept_code(&mut self, code: &str) -> Result<Vec<Request>, GameError> {
        match self.scan_mode() {
            Some(ScanMode::Tiles) => self.resolve_scan(code),
            Some(ScanMode::Characters) => self.on_character_code(code),
            None => Err(GameError::NotScanning),
        }
    }

    pub fn on_character_code(&mut self, code: &str) -> Result<Vec<Request>, GameError> {
        self.expect_screen(Screen::CharacterSelect)?;
        let Some(select) = self.session.character_select.as_mut() else {
            return Err(GameError::NotScanning);
        };
        match select.on_character_code(code) {
            CharacterPick::Assigned {
                character, next, ..
            } => {
                self.session.scanned_codes.insert(code.to_string());
                self.session.feedback = None;
                let taunt = characters::taunt(character).to_string();
                match next {
                    Some(next) => Ok(vec![
                        Request::Narrate(vec![taunt, characters::next_prompt(next)]),
                        Request::StartScanAfterNarration(self.scan_job(ScanMode::Characters)),
                    ]),
                    None => {
                        self.enter_game();
                        Ok(vec![Request::Narrate(vec![taunt, QUEST_BEGINS.to_string()])])
                    }
                }
            }
            CharacterPick::Taken(character) => {
                let feedback = characters::taken_message(character);
                self.session.feedback = Some(feedback.clone());
                Ok(vec![
                    Request::Narrate(vec![feedback]),
                    Request::StartScan(self.scan_job(ScanMode::Characters)),
                ])
            }
            CharacterPick::Unknown => {
                tracing::debug!("Ignoring non-character code '{}' during selection", code);
                self.session.feedback = Some(characters::UNKNOWN_CARD.to_string());
                Ok(vec![
                    Request::Narrate(vec![characters::UNKNOWN_CARD.to_string()]),
                    Request::StartScan(self.scan_job(ScanMode::Characters)),
                ])
            }
        }
    }

    /// CharacterSelect → Game: players created, schedule rolled, player 1 up
    fn enter_game(&mut self) {
        let assigned = self
            .session
            .character_select
            .take()
            .map(|s| s.assigned().to_vec())
            .unwrap_or_default();
        self.session.players = assigned.into_iter().map(Player::new).collect();
        self.session.player_count = self.session.players.len();
        self.session.current_player_index = 0;
        self.session.rounds_completed = 0;
        self.session.round_phase = RoundPhase::PlayerTurn;
        self.session.pending_scan_target = None;
        self.session.feedback = None;
        self.session.message = None;
        self.session.shard_schedule = ShardSchedule::generate(&mut self.rng);
        self.session.screen = Screen::Game;
        tracing::info!("Screen: Game ({} players)", self.session.player_count);
    }

    // ─── Turn loop ───────────────────────────────────────────────────────

    /// PlayerTurn → ScanQr for the current player
    pub fn end_turn(&mut self) -> Result<Vec<Request>, GameError> {
        self.expect_screen(Screen::Game)?;
        if self.session.round_phase != RoundPhase::PlayerTurn {
            return Err(GameError::WrongPhase {
                expected: RoundPhase::PlayerTurn,
                actual: self.session.round_phase,
            });
        }
        self.session.pending_scan_target = Some(self.session.current_player_index);
        self.session.round_phase = RoundPhase::ScanQr;
        self.session.message = None;
        tracing::info!("Player {} ended turn, scanning tile", self.session.current_player_index + 1);
        Ok(vec![Request::StartScan(self.scan_job(ScanMode::Tiles))])
    }

    /// Apply a scanned tile code. Codes already seen this session are
    /// ignored (no state change, no requests).
    pub fn resolve_scan(&mut self, code: &str) -> Result<Vec<Request>, GameError> {
        self.expect_screen(Screen::Game)?;
        if self.session.round_phase != RoundPhase::ScanQr {
            return Err(GameError::WrongPhase {
                expected: RoundPhase::ScanQr,
                actual: self.session.round_phase,
            });
        }
        if !self.session.scanned_codes.insert(code.to_string()) {
            tracing::debug!("Duplicate code '{}' ignored", code);
            return Ok(Vec::new());
        }

        match ScanCode::parse(code) {
            ScanCode::BossTile => Ok(self.enter_boss()),
            ScanCode::EventTile(tile) => Ok(self.resolve_event_tile(tile)),
            ScanCode::Character(_) | ScanCode::Other => {
                tracing::info!("Unrecognised tile code '{}', no event", code);
                self.session.message = Some(code.to_string());
                self.session.pending_scan_target = None;
                self.session.round_phase = RoundPhase::PlayerTurn;
                Ok(Vec::new())
            }
        }
    }

    fn resolve_event_tile(&mut self, tile: u8) -> Vec<Request> {
        let target = self
            .session
            .pending_scan_target
            .unwrap_or(self.session.current_player_index);
        let act = self.session.act();
        let event = tile_event::resolve(tile, act, target, &mut self.rng);
        if let Some(player) = self.session.players.get_mut(target) {
            event.delta.apply(player);
        }

        let upcoming_round = self.session.rounds_completed + 1;
        let mut narration = event.message;
        if let Some(shard) = self.session.shard_schedule.maybe_reveal(upcoming_round) {
            narration.push(' ');
            narration.push_str(&shard);
        }

        self.advance_turn();
        self.session.pending_scan_target = None;
        self.session.round_phase = RoundPhase::PlayerTurn;
        self.session.message = Some(narration.clone());
        vec![Request::Narrate(vec![narration])]
    }

    fn advance_turn(&mut self) {
        let count = self.session.player_count.max(1);
        let before = self.session.act();
        self.session.current_player_index += 1;
        if self.session.current_player_index >= count {
            self.session.current_player_index = 0;
            self.session.rounds_completed += 1;
            tracing::info!("Round {} complete", self.session.rounds_completed);
        }
        let after = self.session.act();
        if after != before {
            tracing::info!("Act {} begins", after.number());
        }
    }

    fn enter_boss(&mut self) -> Vec<Request> {
        self.session.screen = Screen::Boss;
        self.session.boss = Some(BossState::new());
        self.session.pending_scan_target = None;
        self.session.round_phase = RoundPhase::PlayerTurn;
        self.session.message = Some(BOSS_ENTRANCE.to_string());
        tracing::info!("Screen: Boss (after {} rounds)", self.session.rounds_completed);
        vec![Request::Narrate(vec![BOSS_ENTRANCE.to_string()])]
    }

    // ─── Boss ────────────────────────────────────────────────────────────

    pub fn hit_boss(&mut self, part: BossPart) -> Result<(BossHit, Vec<Request>), GameError> {
        self.expect_screen(Screen::Boss)?;
        let boss = self.session.boss.get_or_insert_with(BossState::new);
        let hit = boss.hit(part);
        if hit == BossHit::Defeated {
            tracing::info!("Boss defeated");
        }
        let requests = hit
            .narration()
            .map(|line| vec![Request::Narrate(vec![line.to_string()])])
            .unwrap_or_default();
        Ok((hit, requests))
    }

    // ─── Camera trouble / reset ──────────────────────────────────────────

    /// Restart the camera for the active scan (after a camera error)
    pub fn retry_scan(&self) -> Result<Vec<Request>, GameError> {
        let mode = self.scan_mode().ok_or(GameError::NotScanning)?;
        Ok(vec![Request::StartScan(self.scan_job(mode))])
    }

    /// Surface a camera failure; the phase stays as it is
    pub fn camera_failed(&mut self, reason: &str) {
        let text = format!("Camera unavailable: {}", reason);
        match self.session.screen {
            Screen::CharacterSelect => self.session.feedback = Some(text),
            _ => self.session.message = Some(text),
        }
    }

    /// Back to Main with a fresh session. Idempotent.
    pub fn reset(&mut self) -> Vec<Request> {
        let epoch = self.session.epoch + 1;
        self.session = Session::new(epoch);
        tracing::info!("Session reset (epoch {})", epoch);
        vec![Request::StopScan, Request::SilenceNarration { fade: true }]
    }

    pub fn snapshot(&self) -> Snapshot {
        let s = &self.session;
        Snapshot {
            screen: s.screen,
            act: s.act().number(),
            round_phase: s.round_phase,
            player_count: s.player_count,
            current_player: s.current_player_index,
            rounds_completed: s.rounds_completed,
            players: s.players.clone(),
            awaiting_character: s.character_select.as_ref().and_then(CharacterSelect::awaiting),
            boss: s.boss.clone(),
            victory: self.is_victory(),
            message: s.message.clone(),
            feedback: s.feedback.clone(),
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boss::BOSS_DEFEATED;
    use crate::tile_event::tests::{ITEM_ROLL, NEUTRAL_ROLL, TRAP_ROLL};
    use crate::tile_event::TRAP_MESSAGE;
    use rand::rngs::mock::StepRng;

    /// Drive a fresh game to the Game screen with `n` players
    fn game_with_players(n: usize) -> Game {
        let mut game = Game::from_seed(42);
        game.start_game().unwrap();
        game.continue_intro().unwrap();
        game.choose_player_count(n).unwrap();
        for c in Character::all().into_iter().take(n) {
            game.accept_code(&crate::codes::character_code(c)).unwrap();
        }
        assert_eq!(game.screen(), Screen::Game);
        game
    }

    fn narrations(reqs: &[Request]) -> Vec<String> {
        reqs.iter()
            .filter_map(|r| match r {
                Request::Narrate(lines) => Some(lines.clone()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    fn take_turn(game: &mut Game, code: &str) -> Vec<Request> {
        game.end_turn().unwrap();
        game.resolve_scan(code).unwrap()
    }

    #[test]
    fn screen_flow_to_character_select() {
        let mut game = Game::from_seed(1);
        assert_eq!(game.screen(), Screen::Main);
        assert_eq!(narrations(&game.start_game().unwrap()).len(), INTRO_LINES.len());
        assert!(game.start_game().is_err());
        game.continue_intro().unwrap();
        assert_eq!(game.choose_player_count(0), Err(GameError::PlayerCount(0)));
        assert_eq!(game.choose_player_count(5), Err(GameError::PlayerCount(5)));
        let reqs = game.choose_player_count(2).unwrap();
        assert!(reqs.iter().any(|r| matches!(
            r,
            Request::StartScan(ScanJob { mode: ScanMode::Characters, facing: FacingMode::User, .. })
        )));
        assert_eq!(game.scan_mode(), Some(ScanMode::Characters));
    }

    #[test]
    fn character_selection_builds_players() {
        let game = game_with_players(3);
        let s = game.session();
        assert_eq!(s.players.len(), 3);
        assert_eq!(s.players[0].character, Character::Goblin);
        assert_eq!(s.players[2].character, Character::Cyclops);
        assert!(s.players.iter().all(|p| p.hp == STARTING_HP && p.items.is_empty()));
        assert_eq!(s.current_player_index, 0);
        assert_eq!(s.round_phase, RoundPhase::PlayerTurn);
        assert_eq!(s.shard_schedule.reveals().len(), 4);
        assert_eq!(game.act(), Act::One);
    }

    #[test]
    fn taken_character_is_not_consumed() {
        let mut game = Game::from_seed(1);
        game.start_game().unwrap();
        game.continue_intro().unwrap();
        game.choose_player_count(2).unwrap();

        let reqs = game.accept_code("Character-001").unwrap();
        assert_eq!(narrations(&reqs).len(), 2, "taunt + next prompt");
        assert!(matches!(reqs.last(), Some(Request::StartScanAfterNarration(_))));

        let reqs = game.accept_code("Character-001").unwrap();
        assert!(narrations(&reqs)[0].contains("already been claimed"));
        assert!(reqs.iter().any(|r| matches!(r, Request::StartScan(_))));
        assert!(!game.should_ignore("Character-001"));
        assert_eq!(game.screen(), Screen::CharacterSelect);
        assert!(game.session().feedback.is_some());

        game.accept_code("Character-002").unwrap();
        assert_eq!(game.screen(), Screen::Game);
        assert!(game.session().feedback.is_none());
    }

    #[test]
    fn end_turn_only_in_player_turn() {
        let mut game = game_with_players(2);
        let reqs = game.end_turn().unwrap();
        assert_eq!(
            reqs,
            vec![Request::StartScan(ScanJob {
                mode: ScanMode::Tiles,
                facing: FacingMode::Environment,
                epoch: game.epoch()
            })]
        );
        assert_eq!(game.session().pending_scan_target, Some(0));
        assert!(matches!(game.end_turn(), Err(GameError::WrongPhase { .. })));
    }

    #[test]
    fn resolve_scan_requires_scan_phase() {
        let mut game = game_with_players(1);
        assert!(matches!(game.resolve_scan("Tile-001"), Err(GameError::WrongPhase { .. })));
        // Nothing recorded by the rejected call
        assert!(!game.session().scanned_codes.contains("Tile-001"));
    }

    #[test]
    fn full_round_wraps_and_counts() {
        for n in 1..=4 {
            let mut game = game_with_players(n);
            for i in 0..n {
                assert_eq!(game.session().current_player_index, i);
                take_turn(&mut game, &format!("Tile-{:03}", i + 1));
            }
            assert_eq!(game.session().rounds_completed, 1, "n={n}");
            assert_eq!(game.session().current_player_index, 0);
        }
    }

    #[test]
    fn duplicate_code_applies_once() {
        let mut game = game_with_players(1);
        game.set_rng(StepRng::new(TRAP_ROLL, 0));
        take_turn(&mut game, "Tile-005");
        assert_eq!(game.session().players[0].hp, 4);

        game.end_turn().unwrap();
        assert!(game.should_ignore("Tile-005"));
        let reqs = game.resolve_scan("Tile-005").unwrap();
        assert!(reqs.is_empty());
        assert_eq!(game.session().players[0].hp, 4);
        // Still waiting for a fresh tile
        assert_eq!(game.session().round_phase, RoundPhase::ScanQr);
        assert_eq!(game.session().rounds_completed, 1);
    }

    #[test]
    fn hp_floor_across_many_traps() {
        let mut game = game_with_players(1);
        game.set_rng(StepRng::new(TRAP_ROLL, 0));
        for tile in 1..=12 {
            take_turn(&mut game, &format!("Tile-{:03}", tile));
        }
        assert_eq!(game.session().players[0].hp, 0);
    }

    #[test]
    fn item_goes_to_pending_target() {
        let mut game = game_with_players(2);
        game.set_rng(StepRng::new(ITEM_ROLL, 0));
        take_turn(&mut game, "Tile-010");
        take_turn(&mut game, "Tile-011");
        assert_eq!(game.session().players[0].items, vec!["Zone 1 Treasure"]);
        assert_eq!(game.session().players[1].items, vec!["Zone 1 Treasure"]);
    }

    #[test]
    fn unknown_tile_is_display_only() {
        let mut game = game_with_players(2);
        game.end_turn().unwrap();
        let reqs = game.resolve_scan("Tile-077").unwrap();
        assert!(reqs.is_empty());
        let s = game.session();
        assert_eq!(s.message.as_deref(), Some("Tile-077"));
        assert_eq!(s.round_phase, RoundPhase::PlayerTurn);
        assert_eq!(s.current_player_index, 0);
        assert_eq!(s.pending_scan_target, None);
        assert!(s.players.iter().all(|p| p.hp == STARTING_HP && p.items.is_empty()));
        // Consumed: the same card is ignored from now on
        game.end_turn().unwrap();
        assert!(game.should_ignore("Tile-077"));
    }

    #[test]
    fn act_two_after_seven_rounds() {
        let mut game = game_with_players(2);
        game.set_rng(StepRng::new(NEUTRAL_ROLL, 0));
        let mut tile = 1;
        for _ in 0..ACT_TWO_ROUNDS {
            for _ in 0..2 {
                assert_eq!(game.act(), Act::One);
                take_turn(&mut game, &format!("Tile-{:03}", tile));
                tile += 1;
            }
        }
        assert_eq!(game.session().rounds_completed, 7);
        assert_eq!(game.act(), Act::Two);

        // Zone 2 loot from now on
        game.set_rng(StepRng::new(ITEM_ROLL, 0));
        take_turn(&mut game, "Tile-020");
        assert_eq!(game.session().players[0].items, vec!["Zone 2 Treasure"]);
    }

    #[test]
    fn shard_reveal_joins_event_narration() {
        let mut game = game_with_players(1);
        game.set_rng(StepRng::new(NEUTRAL_ROLL, 0));
        let first = game.session().shard_schedule.reveals()[0].clone();
        let mut joined = None;
        for tile in 1..=5 {
            let upcoming = game.session().rounds_completed + 1;
            let lines = narrations(&take_turn(&mut game, &format!("Tile-{:03}", tile)));
            assert_eq!(lines.len(), 1, "one combined narration per scan");
            if upcoming == first.round {
                joined = Some(lines[0].clone());
            }
        }
        let joined = joined.unwrap();
        assert!(joined.starts_with("Player 1"));
        assert!(joined.contains(first.zone));
        assert_eq!(game.session().shard_schedule.cursor(), 4);
    }

    #[test]
    fn example_trap_then_boss() {
        let mut game = game_with_players(2);
        game.set_rng(StepRng::new(TRAP_ROLL, 0));

        game.end_turn().unwrap();
        let reqs = game.resolve_scan("Tile-005").unwrap();
        assert!(narrations(&reqs)[0].starts_with(TRAP_MESSAGE));
        let s = game.session();
        assert_eq!(s.players[0].hp, 4);
        assert_eq!(s.round_phase, RoundPhase::PlayerTurn);
        assert_eq!(s.current_player_index, 1);

        game.end_turn().unwrap();
        let reqs = game.resolve_scan("Tile-030").unwrap();
        assert_eq!(narrations(&reqs), vec![BOSS_ENTRANCE.to_string()]);
        assert_eq!(game.screen(), Screen::Boss);
        assert_eq!(game.act(), Act::Three);
        assert!(game.end_turn().is_err());
        assert_eq!(game.scan_mode(), None);
    }

    #[test]
    fn boss_tile_from_round_zero() {
        let mut game = game_with_players(4);
        take_turn(&mut game, "Tile-030");
        assert_eq!(game.screen(), Screen::Boss);
        assert_eq!(game.session().rounds_completed, 0);
        assert_eq!(game.session().boss, Some(BossState::new()));
    }

    #[test]
    fn boss_fight_to_victory() {
        let mut game = game_with_players(1);
        take_turn(&mut game, "Tile-030");
        let mut defeated_lines = 0;
        for part in [BossPart::Head, BossPart::Body, BossPart::Shield] {
            for _ in 0..5 {
                let (_, reqs) = game.hit_boss(part).unwrap();
                defeated_lines += narrations(&reqs).iter().filter(|l| *l == BOSS_DEFEATED).count();
            }
        }
        assert_eq!(defeated_lines, 1);
        assert!(game.is_victory());
        let (hit, reqs) = game.hit_boss(BossPart::Head).unwrap();
        assert_eq!(hit, BossHit::Ignored);
        assert!(reqs.is_empty());
    }

    #[test]
    fn reset_is_idempotent_and_bumps_epoch() {
        let mut game = game_with_players(2);
        game.end_turn().unwrap();
        let epoch = game.epoch();
        let reqs = game.reset();
        assert_eq!(reqs, vec![Request::StopScan, Request::SilenceNarration { fade: true }]);
        assert_eq!(game.screen(), Screen::Main);
        assert_eq!(game.epoch(), epoch + 1);
        assert!(game.session().players.is_empty());
        assert!(game.session().scanned_codes.is_empty());
        assert_eq!(game.scan_mode(), None);
        game.reset();
        assert_eq!(game.screen(), Screen::Main);
        assert_eq!(game.epoch(), epoch + 2);
    }

    #[test]
    fn camera_failure_keeps_phase() {
        let mut game = game_with_players(1);
        game.end_turn().unwrap();
        game.camera_failed("permission denied");
        assert_eq!(game.session().round_phase, RoundPhase::ScanQr);
        assert!(game.session().message.as_deref().unwrap().contains("permission denied"));
        assert!(matches!(game.retry_scan().unwrap()[0], Request::StartScan(_)));
    }

    #[test]
    fn snapshot_serializes() {
        let game = game_with_players(2);
        let json = serde_json::to_value(game.snapshot()).unwrap();
        assert_eq!(json["screen"], "Game");
        assert_eq!(json["act"], 1);
        assert_eq!(json["players"][1]["character"], "Troll");
        assert_eq!(json["players"][0]["hp"], 5);
    }

    #[test]
    fn snapshot_keeps_shard_schedule_hidden() {
        let game = game_with_players(2);
        assert_eq!(game.session().shard_schedule.reveals().len(), 4);
        let text = serde_json::to_string(&game.snapshot()).unwrap();
        assert!(!text.contains("shard"), "{}", text);
        assert!(crate::shard::ZONES.iter().all(|zone| !text.contains(zone)));
    }
}
