//! Card code parsing
//!
//! Physical cards carry QR codes in two families:
//!   `Tile-NNN`      — board tiles; 001-029 are event tiles, 030 is the boss
//!   `Character-NNN` — character cards 001-004
//!
//! Anything else (other numbers, malformed text) parses as `Other`.

use questcards_common::Character;

/// Highest ordinary event tile
pub const LAST_EVENT_TILE: u8 = 29;
/// Tile that starts the boss encounter
pub const BOSS_TILE: u32 = 30;

/// A decoded card code, classified
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanCode {
    /// `Tile-001` .. `Tile-029`
    EventTile(u8),
    /// `Tile-030`
    BossTile,
    /// `Character-001` .. `Character-004`
    Character(Character),
    /// Unknown family, out-of-range number or malformed
    Other,
}

impl ScanCode {
    pub fn parse(code: &str) -> ScanCode {
        if let Some(n) = numbered(code, "Tile-") {
            return match n {
                n if (1..=LAST_EVENT_TILE as u32).contains(&n) => ScanCode::EventTile(n as u8),
                BOSS_TILE => ScanCode::BossTile,
                _ => ScanCode::Other,
            };
        }
        if let Some(n) = numbered(code, "Character-") {
            return Character::from_card_number(n)
                .map(ScanCode::Character)
                .unwrap_or(ScanCode::Other);
        }
        ScanCode::Other
    }
}

/// Parse `<prefix><digits>`; digits only, no sign, no whitespace
fn numbered(code: &str, prefix: &str) -> Option<u32> {
    let digits = code.strip_prefix(prefix)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Canonical code string for a character card
pub fn character_code(character: Character) -> String {
    format!("Character-{:03}", character.card_number())
}

/// Canonical code string for a tile
pub fn tile_code(tile: u32) -> String {
    format!("Tile-{:03}", tile)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_tiles() {
        assert_eq!(ScanCode::parse("Tile-001"), ScanCode::EventTile(1));
        assert_eq!(ScanCode::parse("Tile-005"), ScanCode::EventTile(5));
        assert_eq!(ScanCode::parse("Tile-029"), ScanCode::EventTile(29));
        // Padding is not significant
        assert_eq!(ScanCode::parse("Tile-7"), ScanCode::EventTile(7));
    }

    #[test]
    fn boss_tile() {
        assert_eq!(ScanCode::parse("Tile-030"), ScanCode::BossTile);
        assert_eq!(ScanCode::parse(&tile_code(BOSS_TILE)), ScanCode::BossTile);
    }

    #[test]
    fn out_of_range_and_malformed() {
        for code in ["Tile-000", "Tile-031", "Tile-999", "Tile-", "Tile-1a", "Tile--05", "tile-005", " Tile-005", "hello"] {
            assert_eq!(ScanCode::parse(code), ScanCode::Other, "{code}");
        }
    }

    #[test]
    fn character_cards() {
        assert_eq!(ScanCode::parse("Character-001"), ScanCode::Character(Character::Goblin));
        assert_eq!(ScanCode::parse("Character-004"), ScanCode::Character(Character::Witch));
        assert_eq!(ScanCode::parse("Character-005"), ScanCode::Other);
        for c in Character::all() {
            assert_eq!(ScanCode::parse(&character_code(c)), ScanCode::Character(c));
        }
    }

    #[test]
    fn huge_numbers_do_not_panic() {
        assert_eq!(ScanCode::parse("Tile-99999999999999999999"), ScanCode::Other);
    }
}
