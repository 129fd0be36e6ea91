// Static pick/ban order tables.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One of the two teams in a draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Blue,
    Red,
}

impl Side {
    pub fn opponent(self) -> Side {
        match self {
            Side::Blue => Side::Red,
            Side::Red => Side::Blue,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Side::Blue => "blue",
            Side::Red => "red",
        }
    }

    /// Parse `"blue"` / `"red"` (case-insensitive).
    pub fn parse(s: &str) -> Option<Side> {
        match s.trim().to_ascii_lowercase().as_str() {
            "blue" => Some(Side::Blue),
            "red" => Some(Side::Red),
            _ => None,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotKind {
    Ban,
    Pick,
}

impl SlotKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SlotKind::Ban => "ban",
            SlotKind::Pick => "pick",
        }
    }
}

impl fmt::Display for SlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lane assignment for pick slots; pick index `i` is `Role::ALL[i]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Top,
    Jungle,
    Mid,
    Bot,
    Support,
}

impl Role {
    pub const ALL: [Role; 5] = [Role::Top, Role::Jungle, Role::Mid, Role::Bot, Role::Support];

    pub fn for_pick_index(index: usize) -> Option<Role> {
        Role::ALL.get(index).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Top => "Top",
            Role::Jungle => "Jungle",
            Role::Mid => "Mid",
            Role::Bot => "Bot",
            Role::Support => "Support",
        }
    }
}

/// A single atomic draft action: `side` fills its `kind` slot at `index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Turn {
    pub side: Side,
    pub kind: SlotKind,
    pub index: usize,
}

impl Turn {
    pub const fn new(side: Side, kind: SlotKind, index: usize) -> Self {
        Turn { side, kind, index }
    }

    pub fn matches(&self, side: Side, kind: SlotKind, index: usize) -> bool {
        self.side == side && self.kind == kind && self.index == index
    }
}

impl fmt::Display for Turn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.side, self.kind, self.index + 1)
    }
}

/// Which pick/ban order a draft follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftMode {
    Competitive,
    SoloQueue,
}

impl DraftMode {
    pub fn parse(s: &str) -> Option<DraftMode> {
        match s.trim().to_ascii_lowercase().as_str() {
            "competitive" => Some(DraftMode::Competitive),
            "solo_queue" | "soloqueue" => Some(DraftMode::SoloQueue),
            _ => None,
        }
    }
}

/// Number of turns in a standard 5v5 draft.
pub const SEQUENCE_LEN: usize = 20;

/// Slots per side for each kind.
pub const SLOTS_PER_SIDE: usize = 5;

const fn ban(side: Side, index: usize) -> Turn {
    Turn::new(side, SlotKind::Ban, index)
}

const fn pick(side: Side, index: usize) -> Turn {
    Turn::new(side, SlotKind::Pick, index)
}

use Side::{Blue as B, Red as R};

/// Tournament order: alternating bans, 1-2-2-1 picks, then a second
/// ban phase opened by red and a 1-2-1 pick phase.
pub static COMPETITIVE_SEQUENCE: [Turn; SEQUENCE_LEN] = [
    ban(B, 0), ban(R, 0), ban(B, 1), ban(R, 1), ban(B, 2), ban(R, 2),
    pick(B, 0), pick(R, 0), pick(R, 1), pick(B, 1), pick(B, 2), pick(R, 2),
    ban(R, 3), ban(B, 3), ban(R, 4), ban(B, 4),
    pick(R, 3), pick(B, 3), pick(B, 4), pick(R, 4),
];

/// Ranked order: each side submits its first three bans as a block, then
/// the same pick snake and closing phases as tournament play.
pub static SOLO_QUEUE_SEQUENCE: [Turn; SEQUENCE_LEN] = [
    ban(B, 0), ban(B, 1), ban(B, 2), ban(R, 0), ban(R, 1), ban(R, 2),
    pick(B, 0), pick(R, 0), pick(R, 1), pick(B, 1), pick(B, 2), pick(R, 2),
    ban(R, 3), ban(B, 3), ban(R, 4), ban(B, 4),
    pick(R, 3), pick(B, 3), pick(B, 4), pick(R, 4),
];

/// The fixed turn order for `mode`.
pub fn sequence_for(mode: DraftMode) -> &'static [Turn] {
    match mode {
        DraftMode::Competitive => &COMPETITIVE_SEQUENCE,
        DraftMode::SoloQueue => &SOLO_QUEUE_SEQUENCE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    const MODES: [DraftMode; 2] = [DraftMode::Competitive, DraftMode::SoloQueue];

    fn count(seq: &[Turn], side: Side, kind: SlotKind) -> usize {
        seq.iter().filter(|t| t.side == side && t.kind == kind).count()
    }

    #[test]
    fn every_mode_has_five_bans_and_picks_per_side() {
        for mode in MODES {
            let seq = sequence_for(mode);
            assert_eq!(seq.len(), 20, "{mode:?}");
            for side in [Side::Blue, Side::Red] {
                assert_eq!(count(seq, side, SlotKind::Ban), 5, "{mode:?} {side}");
                assert_eq!(count(seq, side, SlotKind::Pick), 5, "{mode:?} {side}");
            }
        }
    }

    #[test]
    fn slot_indices_are_filled_in_declaration_order() {
        for mode in MODES {
            for side in [Side::Blue, Side::Red] {
                for kind in [SlotKind::Ban, SlotKind::Pick] {
                    let indices: Vec<usize> = sequence_for(mode)
                        .iter()
                        .filter(|t| t.side == side && t.kind == kind)
                        .map(|t| t.index)
                        .collect();
                    assert_eq!(indices, vec![0, 1, 2, 3, 4], "{mode:?} {side} {kind}");
                }
            }
        }
    }

    #[test]
    fn no_turn_repeats() {
        for mode in MODES {
            let unique: HashSet<Turn> = sequence_for(mode).iter().copied().collect();
            assert_eq!(unique.len(), SEQUENCE_LEN);
        }
    }

    #[test]
    fn bans_come_in_two_phases() {
        for mode in MODES {
            let kinds: Vec<SlotKind> = sequence_for(mode).iter().map(|t| t.kind).collect();
            assert!(kinds[0..6].iter().all(|k| *k == SlotKind::Ban));
            assert!(kinds[6..12].iter().all(|k| *k == SlotKind::Pick));
            assert!(kinds[12..16].iter().all(|k| *k == SlotKind::Ban));
            assert!(kinds[16..20].iter().all(|k| *k == SlotKind::Pick));
        }
    }

    #[test]
    fn modes_differ_only_in_first_ban_phase() {
        assert_ne!(COMPETITIVE_SEQUENCE[0..6], SOLO_QUEUE_SEQUENCE[0..6]);
        assert_eq!(COMPETITIVE_SEQUENCE[6..], SOLO_QUEUE_SEQUENCE[6..]);
    }

    #[test]
    fn roles_follow_pick_index() {
        assert_eq!(Role::for_pick_index(0), Some(Role::Top));
        assert_eq!(Role::for_pick_index(4), Some(Role::Support));
        assert_eq!(Role::for_pick_index(5), None);
    }

    #[test]
    fn parse_side_and_mode() {
        assert_eq!(Side::parse(" Blue "), Some(Side::Blue));
        assert_eq!(Side::parse("purple"), None);
        assert_eq!(Side::Blue.opponent(), Side::Red);
        assert_eq!(DraftMode::parse("solo_queue"), Some(DraftMode::SoloQueue));
        assert_eq!(DraftMode::parse("Competitive"), Some(DraftMode::Competitive));
        assert_eq!(DraftMode::parse("blind"), None);
    }

    #[test]
    fn turn_display_is_one_based() {
        let t = Turn::new(Side::Red, SlotKind::Pick, 2);
        assert_eq!(t.to_string(), "red pick 3");
    }
}
