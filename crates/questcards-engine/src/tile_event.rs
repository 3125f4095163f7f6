//! Tile events — what happens when a player lands on an event tile
//!
//! One uniform roll in [0, 1) picks the outcome against per-act weights:
//!   roll < item            → Item  (treasure labelled with the current zone)
//!   roll < item + trap     → Trap  (lose one heart, floored at 0)
//!   otherwise              → Neutral
//!
//! Act 1 favours loot; from Act 2 on traps get more likely. Act 3 uses the
//! Act 2 table.

use rand::Rng;
use serde::Serialize;

use crate::session::{Act, Player};

pub const TRAP_MESSAGE: &str =
    "Click... the ground gives way beneath you! A hidden snare bites deep. You lose one heart.";
pub const ITEM_MESSAGE: &str =
    "Something glints between the stones. You pry it loose: a treasure for your pack!";

/// Outcome category of a tile event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Outcome {
    Item,
    Trap,
    Neutral,
}

/// Outcome probabilities for one act (neutral takes the remainder)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EventWeights {
    pub item: f64,
    pub trap: f64,
}

impl EventWeights {
    pub fn for_act(act: Act) -> Self {
        match act {
            Act::One => Self { item: 0.22, trap: 0.18 },
            Act::Two | Act::Three => Self { item: 0.18, trap: 0.22 },
        }
    }

    pub fn neutral(&self) -> f64 {
        1.0 - self.item - self.trap
    }

    /// Classify a roll in [0, 1)
    pub fn pick(&self, roll: f64) -> Outcome {
        if roll < self.item {
            Outcome::Item
        } else if roll < self.item + self.trap {
            Outcome::Trap
        } else {
            Outcome::Neutral
        }
    }
}

/// Change applied to the target player
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerDelta {
    LoseHeart,
    GainItem(String),
    Nothing,
}

impl PlayerDelta {
    pub fn apply(&self, player: &mut Player) {
        match self {
            PlayerDelta::LoseHeart => player.hp = player.hp.saturating_sub(1),
            PlayerDelta::GainItem(label) => player.items.push(label.clone()),
            PlayerDelta::Nothing => {}
        }
    }
}

/// A resolved tile event
#[derive(Debug, Clone, PartialEq)]
pub struct TileEvent {
    pub tile: u8,
    pub outcome: Outcome,
    pub delta: PlayerDelta,
    /// Player-facing narration line
    pub message: String,
}

/// Loot zone for an act: 1 in Act 1, 2 afterwards
pub fn zone_for(act: Act) -> u8 {
    act.number().min(2)
}

/// Label of the treasure found in a zone
pub fn treasure_label(zone: u8) -> String {
    format!("Zone {} Treasure", zone)
}

/// Neutral line, addressed to the (1-based) player number
pub fn neutral_message(player_index: usize) -> String {
    format!(
        "Player {}, the path is quiet. Nothing stirs... for now.",
        player_index + 1
    )
}

/// Resolve a tile event. `tile` must be an event tile (1-29).
pub fn resolve<R: Rng + ?Sized>(tile: u8, act: Act, player_index: usize, rng: &mut R) -> TileEvent {
    debug_assert!((1..=crate::codes::LAST_EVENT_TILE).contains(&tile));
    let roll: f64 = rng.gen();
    let outcome = EventWeights::for_act(act).pick(roll);
    let (delta, message) = match outcome {
        Outcome::Trap => (PlayerDelta::LoseHeart, TRAP_MESSAGE.to_string()),
        Outcome::Item => (
            PlayerDelta::GainItem(treasure_label(zone_for(act))),
            ITEM_MESSAGE.to_string(),
        ),
        Outcome::Neutral => (PlayerDelta::Nothing, neutral_message(player_index)),
    };
    tracing::debug!(
        "Tile {} (act {}, player {}): roll {:.3} → {:?}",
        tile,
        act.number(),
        player_index + 1,
        roll,
        outcome
    );
    TileEvent {
        tile,
        outcome,
        delta,
        message,
    }
}
