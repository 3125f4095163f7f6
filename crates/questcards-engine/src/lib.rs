//! QuestCards engine — the game kernel behind the table companion
//!
//! Architecture:
//!   session      — turn/round/act state machine (the single controller)
//!   tile_event   — weighted trap/item/neutral outcomes for board tiles
//!   shard        — per-game shard reveal schedule
//!   boss         — head/body/shield boss encounter
//!   characters   — sequential character-card selection
//!   capture      — camera + decoder collaborator traits
//!   scanner      — per-frame decode loop, dedupe, stale-job guard
//!   narration    — serialized text-to-speech with local fallback
//!   runtime      — cooperative driver wiring all of the above

pub mod boss;
pub mod capture;
pub mod characters;
pub mod codes;
pub mod narration;
pub mod runtime;
pub mod scanner;
pub mod session;
pub mod shard;
pub mod tile_event;

#[cfg(test)]
pub(crate) mod testing;

pub use questcards_common::Character;
