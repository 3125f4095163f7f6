//! Boss encounter (Act 3)
//!
//! Three independent counters (head, body, shield) start at 5. Each hit
//! takes one point off a part, never below 0. Destroying a part speaks
//! its line, except when that hit brings the last part down: then only
//! the defeat line plays and the encounter is won. Once won, hits are
//! ignored.

use serde::Serialize;

pub const BOSS_PART_HP: u32 = 5;

pub const BOSS_ENTRANCE: &str =
    "The ground trembles. The Warden of Shards rises from the dark, armoured and furious. Strike its head, its body and its shield!";
pub const BOSS_DEFEATED: &str =
    "With a final, thunderous crack the Warden collapses into dust. The realm is saved. Victory!";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BossPart {
    Head,
    Body,
    Shield,
}

impl BossPart {
    pub fn all() -> [BossPart; 3] {
        [BossPart::Head, BossPart::Body, BossPart::Shield]
    }

    pub fn name(&self) -> &'static str {
        match self {
            BossPart::Head => "head",
            BossPart::Body => "body",
            BossPart::Shield => "shield",
        }
    }

    /// Line spoken when this part reaches zero
    pub fn destroyed_line(&self) -> &'static str {
        match self {
            BossPart::Head => "The Warden's head reels back, its crown of horns shattered!",
            BossPart::Body => "Its hulking body buckles and staggers under your blows!",
            BossPart::Shield => "The great shield splinters and falls away!",
        }
    }

    pub fn parse(name: &str) -> Option<BossPart> {
        match name.to_ascii_lowercase().as_str() {
            "head" => Some(BossPart::Head),
            "body" => Some(BossPart::Body),
            "shield" => Some(BossPart::Shield),
            _ => None,
        }
    }
}

/// Result of a single hit, used for narration and the damage flash
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BossHit {
    /// Part lost a point and is still standing
    Damaged { part: BossPart, remaining: u32 },
    /// Part reached zero, others still up
    PartDestroyed(BossPart),
    /// Last standing part reached zero
    Defeated,
    /// Part already at zero, or the boss is already beaten
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BossState {
    pub head: u32,
    pub body: u32,
    pub shield: u32,
}

impl Default for BossState {
    fn default() -> Self {
        Self::new()
    }
}

impl BossState {
    pub fn new() -> Self {
        Self {
            head: BOSS_PART_HP,
            body: BOSS_PART_HP,
            shield: BOSS_PART_HP,
        }
    }

    pub fn hp(&self, part: BossPart) -> u32 {
        match part {
            BossPart::Head => self.head,
            BossPart::Body => self.body,
            BossPart::Shield => self.shield,
        }
    }

    fn hp_mut(&mut self, part: BossPart) -> &mut u32 {
        match part {
            BossPart::Head => &mut self.head,
            BossPart::Body => &mut self.body,
            BossPart::Shield => &mut self.shield,
        }
    }

    pub fn is_defeated(&self) -> bool {
        self.head == 0 && self.body == 0 && self.shield == 0
    }

    pub fn hit(&mut self, part: BossPart) -> BossHit {
        if self.is_defeated() {
            return BossHit::Ignored;
        }
        let hp = self.hp_mut(part);
        if *hp == 0 {
            return BossHit::Ignored;
        }
        *hp -= 1;
        let remaining = *hp;
        if remaining > 0 {
            BossHit::Damaged { part, remaining }
        } else if self.is_defeated() {
            BossHit::Defeated
        } else {
            BossHit::PartDestroyed(part)
        }
    }
}

impl BossHit {
    /// Narration for this hit, if any
    pub fn narration(&self) -> Option<&'static str> {
        match self {
            BossHit::PartDestroyed(part) => Some(part.destroyed_line()),
            BossHit::Defeated => Some(BOSS_DEFEATED),
            BossHit::Damaged { .. } | BossHit::Ignored => None,
        }
    }
}
