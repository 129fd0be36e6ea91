// Draft state: both sides' pick and ban slots.
//
// All transitions are pure: they borrow the current state and return a new
// one, leaving the original untouched so callers can keep it as history.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::champion::ChampionRef;
use crate::sequence::{Side, SlotKind, Turn, SLOTS_PER_SIDE};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DraftError {
    #[error("{side} {kind} slot {index} already holds {occupant}")]
    SlotOccupied {
        side: Side,
        kind: SlotKind,
        index: usize,
        occupant: String,
    },

    #[error("{champion} is already picked or banned")]
    ChampionAlreadyUsed { champion: String },

    #[error("no {kind} slot {index} exists")]
    InvalidSlot { kind: SlotKind, index: usize },

    #[error("cannot swap pick slots {first} and {second}")]
    InvalidSwap { first: usize, second: usize },

    #[error("{attempted} is out of turn")]
    IllegalTurnAction {
        attempted: Turn,
        expected: Option<Turn>,
    },

    #[error("the draft has not started")]
    DraftNotStarted,

    #[error("the draft is already complete")]
    DraftComplete,

    #[error("nothing to undo")]
    NothingToUndo,

    #[error("saved board does not match cursor {cursor}")]
    InconsistentSnapshot { cursor: isize },
}

/// A single pick or ban position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftSlot {
    pub index: usize,
    pub occupant: Option<ChampionRef>,
}

impl DraftSlot {
    pub fn empty(index: usize) -> Self {
        DraftSlot {
            index,
            occupant: None,
        }
    }

    pub fn is_filled(&self) -> bool {
        self.occupant.is_some()
    }
}

/// One side's slots. Both arrays have a fixed length of five.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamState {
    pub picks: [DraftSlot; SLOTS_PER_SIDE],
    pub bans: [DraftSlot; SLOTS_PER_SIDE],
}

impl TeamState {
    pub fn empty() -> Self {
        TeamState {
            picks: std::array::from_fn(DraftSlot::empty),
            bans: std::array::from_fn(DraftSlot::empty),
        }
    }

    pub fn slots(&self, kind: SlotKind) -> &[DraftSlot; SLOTS_PER_SIDE] {
        match kind {
            SlotKind::Pick => &self.picks,
            SlotKind::Ban => &self.bans,
        }
    }

    fn slots_mut(&mut self, kind: SlotKind) -> &mut [DraftSlot; SLOTS_PER_SIDE] {
        match kind {
            SlotKind::Pick => &mut self.picks,
            SlotKind::Ban => &mut self.bans,
        }
    }

    /// Occupants of the pick slots, in slot order.
    pub fn picked(&self) -> impl Iterator<Item = &ChampionRef> {
        self.picks.iter().filter_map(|s| s.occupant.as_ref())
    }

    pub fn banned(&self) -> impl Iterator<Item = &ChampionRef> {
        self.bans.iter().filter_map(|s| s.occupant.as_ref())
    }
}

impl Default for TeamState {
    fn default() -> Self {
        Self::empty()
    }
}

/// The full draft board.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DraftState {
    pub blue: TeamState,
    pub red: TeamState,
}

impl DraftState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn team(&self, side: Side) -> &TeamState {
        match side {
            Side::Blue => &self.blue,
            Side::Red => &self.red,
        }
    }

    fn team_mut(&mut self, side: Side) -> &mut TeamState {
        match side {
            Side::Blue => &mut self.blue,
            Side::Red => &mut self.red,
        }
    }

    pub fn slot(&self, side: Side, kind: SlotKind, index: usize) -> Option<&DraftSlot> {
        self.team(side).slots(kind).get(index)
    }

    /// Every occupant on the board, blue first.
    pub fn occupants(&self) -> impl Iterator<Item = &ChampionRef> {
        [&self.blue, &self.red]
            .into_iter()
            .flat_map(|t| t.picks.iter().chain(t.bans.iter()))
            .filter_map(|s| s.occupant.as_ref())
    }

    pub fn occupied_count(&self) -> usize {
        self.occupants().count()
    }

    pub fn is_champion_used(&self, champion_id: &str) -> bool {
        self.occupants().any(|c| c.id == champion_id)
    }

    /// `catalog` minus every champion already on the board. Catalog order is
    /// preserved.
    pub fn available_champions(&self, catalog: &[ChampionRef]) -> Vec<ChampionRef> {
        let used: HashSet<&str> = self.occupants().map(|c| c.id.as_str()).collect();
        catalog
            .iter()
            .filter(|c| !used.contains(c.id.as_str()))
            .cloned()
            .collect()
    }

    /// Place `champion` into one slot.
    ///
    /// Re-assigning the same champion to the slot it already holds returns an
    /// unchanged copy.
    pub fn assign(
        &self,
        side: Side,
        kind: SlotKind,
        index: usize,
        champion: &ChampionRef,
    ) -> Result<DraftState, DraftError> {
        let slot = self
            .slot(side, kind, index)
            .ok_or(DraftError::InvalidSlot { kind, index })?;

        match &slot.occupant {
            Some(existing) if existing.id == champion.id => return Ok(self.clone()),
            Some(existing) => {
                return Err(DraftError::SlotOccupied {
                    side,
                    kind,
                    index,
                    occupant: existing.name.clone(),
                })
            }
            None => {}
        }

        if self.is_champion_used(&champion.id) {
            return Err(DraftError::ChampionAlreadyUsed {
                champion: champion.name.clone(),
            });
        }

        let mut next = self.clone();
        next.team_mut(side).slots_mut(kind)[index].occupant = Some(champion.clone());
        Ok(next)
    }

    /// Exchange the occupants of two pick slots on one side. An empty slot is
    /// allowed, which turns the swap into a move.
    pub fn swap(&self, side: Side, first: usize, second: usize) -> Result<DraftState, DraftError> {
        if first == second || first >= SLOTS_PER_SIDE || second >= SLOTS_PER_SIDE {
            return Err(DraftError::InvalidSwap { first, second });
        }

        let mut next = self.clone();
        let picks = &mut next.team_mut(side).picks;
        let a = picks[first].occupant.take();
        let b = picks[second].occupant.take();
        picks[first].occupant = b;
        picks[second].occupant = a;
        Ok(next)
    }

    /// Stable text fingerprint of the board, used in cache keys.
    pub fn fingerprint(&self) -> String {
        let side = |t: &TeamState| {
            let ids = |slots: &[DraftSlot]| {
                slots
                    .iter()
                    .map(|s| s.occupant.as_ref().map_or("-", |c| c.id.as_str()))
                    .collect::<Vec<_>>()
                    .join(",")
            };
            format!("{}/{}", ids(&t.bans), ids(&t.picks))
        };
        format!("b[{}]r[{}]", side(&self.blue), side(&self.red))
    }
}
