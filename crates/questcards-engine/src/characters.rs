//! Character selection — each player scans one character card, in order
//!
//! A card already claimed by an earlier player is turned away with a
//! feedback line; the player keeps scanning. The rejected code is NOT
//! consumed, so it can be shown again later (the scanner only holds it
//! back briefly so a card still in view does not spam the rejection).

use questcards_common::Character;

use crate::codes::ScanCode;

pub const UNKNOWN_CARD: &str = "That is no hero I recognise. Show me a character card.";

/// Character-specific taunt, spoken when the card is claimed
pub fn taunt(character: Character) -> &'static str {
    match character {
        Character::Goblin => "A goblin! Quick fingers, quicker feet. Try not to steal from your friends.",
        Character::Troll => "A troll! Big, slow, and hungry. The bridges of this land tremble already.",
        Character::Cyclops => "A cyclops! One eye, one purpose. Let us hope it is pointed the right way.",
        Character::Witch => "A witch! Mind the cauldron, and mind your tongue around her.",
    }
}

/// Prompt for the next player to scan
pub fn next_prompt(player_index: usize) -> String {
    format!(
        "Next scoundrel! Player {}, show me your character card.",
        player_index + 1
    )
}

/// First prompt of the selection
pub fn first_prompt() -> String {
    "Player 1, show me your character card.".to_string()
}

pub fn taken_message(character: Character) -> String {
    format!(
        "The {} has already been claimed. Choose another hero.",
        character.display_name()
    )
}

/// Result of offering a code to the selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CharacterPick {
    /// Assigned to `player`; `next` is the following player still to scan
    Assigned {
        player: usize,
        character: Character,
        next: Option<usize>,
    },
    /// Card belongs to an earlier player
    Taken(Character),
    /// Not a character card
    Unknown,
}

/// Sequential `AwaitingScan(i)` state
#[derive(Debug, Clone)]
pub struct CharacterSelect {
    player_count: usize,
    assigned: Vec<Character>,
}

impl CharacterSelect {
    pub fn new(player_count: usize) -> Self {
        Self {
            player_count,
            assigned: Vec::with_capacity(player_count),
        }
    }

    /// Player whose card is awaited, None once everyone has a character
    pub fn awaiting(&self) -> Option<usize> {
        let i = self.assigned.len();
        (i < self.player_count).then_some(i)
    }

    pub fn assigned(&self) -> &[Character] {
        &self.assigned
    }

    pub fn on_character_code(&mut self, code: &str) -> CharacterPick {
        let Some(player) = self.awaiting() else {
            return CharacterPick::Unknown;
        };
        let ScanCode::Character(character) = ScanCode::parse(code) else {
            return CharacterPick::Unknown;
        };
        if self.assigned.contains(&character) {
            tracing::debug!("{} already taken, player {} keeps scanning", character.display_name(), player + 1);
            return CharacterPick::Taken(character);
        }
        self.assigned.push(character);
        tracing::info!("Player {} is the {}", player + 1, character.display_name());
        CharacterPick::Assigned {
            player,
            character,
            next: self.awaiting(),
        }
    }
}
