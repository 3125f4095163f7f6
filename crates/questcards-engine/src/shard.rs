//! Shard side-quest schedule
//!
//! At game start four shards are hidden: four distinct rounds out of 1-5
//! (ascending) are paired positionally with a shuffled list of the four
//! zones. After every completed tile scan the session asks whether the
//! *upcoming* round has a reveal; the cursor only moves on an exact match.

use rand::seq::SliceRandom;
use rand::Rng;

/// The four shard zones
pub const ZONES: [&str; 4] = [
    "Whispering Woods",
    "Sunken Crypt",
    "Ember Peaks",
    "Frozen Mire",
];

/// Ordinal names, by schedule position
pub const ORDER_NAMES: [&str; 4] = ["First", "Second", "Third", "Fourth"];

/// Rounds a shard may appear in
pub const SHARD_ROUNDS: u32 = 5;

/// One scheduled shard appearance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardReveal {
    pub round: u32,
    pub zone: &'static str,
    pub order_name: &'static str,
}

impl ShardReveal {
    pub fn message(&self) -> String {
        format!(
            "A strange light pulses on the horizon. The {} Shard has appeared in the {}!",
            self.order_name, self.zone
        )
    }
}

/// The generated schedule plus its cursor
#[derive(Debug, Clone, Default)]
pub struct ShardSchedule {
    reveals: Vec<ShardReveal>,
    cursor: usize,
}

impl ShardSchedule {
    /// Schedule with no reveals (before a game starts)
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut rounds: Vec<u32> = rand::seq::index::sample(rng, SHARD_ROUNDS as usize, ZONES.len())
            .into_iter()
            .map(|i| i as u32 + 1)
            .collect();
        rounds.sort_unstable();

        let mut zones = ZONES;
        zones.shuffle(rng);

        let reveals = rounds
            .into_iter()
            .zip(zones)
            .zip(ORDER_NAMES)
            .map(|((round, zone), order_name)| ShardReveal {
                round,
                zone,
                order_name,
            })
            .collect::<Vec<_>>();

        tracing::debug!(
            "Shard schedule: {:?}",
            reveals.iter().map(|r| (r.round, r.zone)).collect::<Vec<_>>()
        );

        Self { reveals, cursor: 0 }
    }

    /// Reveal message if the next scheduled shard belongs to `round`.
    /// Advances the cursor only on a match.
    pub fn maybe_reveal(&mut self, round: u32) -> Option<String> {
        let next = self.reveals.get(self.cursor)?;
        if next.round != round {
            return None;
        }
        let message = next.message();
        tracing::info!("{} Shard revealed in round {} ({})", next.order_name, round, next.zone);
        self.cursor += 1;
        Some(message)
    }

    pub fn reveals(&self) -> &[ShardReveal] {
        &self.reveals
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }
}
