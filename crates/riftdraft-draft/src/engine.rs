// Turn engine: walks the sequence table and gates assignments.
//
// The cursor starts at -1 (not started), moves forward by exactly one per
// accepted assignment and stops at the sequence length (complete). Only an
// explicit undo or reset on `DraftSession` moves it backwards.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::champion::ChampionRef;
use crate::sequence::{sequence_for, DraftMode, Side, SlotKind, Turn};
use crate::state::{DraftError, DraftState};

/// Cursor value before the draft starts.
pub const NOT_STARTED: isize = -1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnEngine {
    mode: DraftMode,
    sequence: &'static [Turn],
    cursor: isize,
}

impl TurnEngine {
    pub fn new(mode: DraftMode) -> Self {
        TurnEngine {
            mode,
            sequence: sequence_for(mode),
            cursor: NOT_STARTED,
        }
    }

    pub fn mode(&self) -> DraftMode {
        self.mode
    }

    pub fn sequence(&self) -> &'static [Turn] {
        self.sequence
    }

    pub fn cursor(&self) -> isize {
        self.cursor
    }

    fn len(&self) -> isize {
        self.sequence.len() as isize
    }

    pub fn is_started(&self) -> bool {
        self.cursor > NOT_STARTED
    }

    pub fn is_complete(&self) -> bool {
        self.cursor >= self.len()
    }

    /// The turn expected now, or `None` before the start and after the end.
    pub fn current_turn(&self) -> Option<Turn> {
        if self.cursor < 0 {
            return None;
        }
        self.sequence.get(self.cursor as usize).copied()
    }

    /// Validate an incoming action without touching any state.
    pub fn check(&self, side: Side, kind: SlotKind, index: usize) -> Result<Turn, DraftError> {
        if !self.is_started() {
            return Err(DraftError::DraftNotStarted);
        }
        match self.current_turn() {
            None => Err(DraftError::DraftComplete),
            Some(turn) if turn.matches(side, kind, index) => Ok(turn),
            Some(turn) => Err(DraftError::IllegalTurnAction {
                attempted: Turn::new(side, kind, index),
                expected: Some(turn),
            }),
        }
    }

    /// Cheap boolean form of `check`, for deciding whether a slot is clickable.
    pub fn is_legal(&self, side: Side, kind: SlotKind, index: usize) -> bool {
        self.check(side, kind, index).is_ok()
    }

    /// Move to the next turn. From the not-started state this is the start
    /// action. Advancing a finished draft is refused rather than clamped.
    pub fn advance(&mut self) -> Result<(), DraftError> {
        if self.is_complete() {
            warn!(cursor = self.cursor, "advance called on a completed draft");
            return Err(DraftError::DraftComplete);
        }
        self.cursor += 1;
        debug!(cursor = self.cursor, "turn advanced");
        Ok(())
    }

    /// Move from not started to the first turn.
    pub fn start(&mut self) -> Result<(), DraftError> {
        if self.is_started() {
            return Ok(());
        }
        self.advance()
    }

    fn rewind_to(&mut self, cursor: isize) {
        self.cursor = cursor.clamp(NOT_STARTED, self.len());
    }
}

/// What the history stack records for undo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub state: DraftState,
    pub cursor: isize,
}

/// A drafting session: board, turn engine and undo history, with one side
/// controlled by the local user.
#[derive(Debug, Clone)]
pub struct DraftSession {
    state: DraftState,
    engine: TurnEngine,
    user_side: Side,
    history: Vec<Snapshot>,
}

impl DraftSession {
    pub fn new(mode: DraftMode, user_side: Side) -> Self {
        DraftSession {
            state: DraftState::new(),
            engine: TurnEngine::new(mode),
            user_side,
            history: Vec::new(),
        }
    }

    /// Rebuild a session from a saved board and cursor. History starts empty.
    ///
    /// The board must hold exactly the slots of the turns before the cursor.
    pub fn restore(
        mode: DraftMode,
        user_side: Side,
        snapshot: Snapshot,
    ) -> Result<Self, DraftError> {
        let mut engine = TurnEngine::new(mode);
        let cursor = snapshot.cursor;
        if !(NOT_STARTED..=engine.len()).contains(&cursor) {
            warn!(cursor, "snapshot cursor out of range");
            return Err(DraftError::InconsistentSnapshot { cursor });
        }
        let done = &engine.sequence()[..cursor.max(0) as usize];
        let filled = |t: &Turn| {
            snapshot
                .state
                .slot(t.side, t.kind, t.index)
                .is_some_and(|s| s.is_filled())
        };
        if !done.iter().all(filled) || snapshot.state.occupied_count() != done.len() {
            warn!(cursor, "snapshot board does not match its cursor");
            return Err(DraftError::InconsistentSnapshot { cursor });
        }

        engine.rewind_to(cursor);
        Ok(DraftSession {
            state: snapshot.state,
            engine,
            user_side,
            history: Vec::new(),
        })
    }

    pub fn state(&self) -> &DraftState {
        &self.state
    }

    pub fn engine(&self) -> &TurnEngine {
        &self.engine
    }

    pub fn mode(&self) -> DraftMode {
        self.engine.mode()
    }

    pub fn user_side(&self) -> Side {
        self.user_side
    }

    pub fn current_turn(&self) -> Option<Turn> {
        self.engine.current_turn()
    }

    /// The side expected to act now.
    pub fn acting_side(&self) -> Option<Side> {
        self.current_turn().map(|t| t.side)
    }

    pub fn is_complete(&self) -> bool {
        self.engine.is_complete()
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            state: self.state.clone(),
            cursor: self.engine.cursor(),
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.history.is_empty()
    }

    pub fn start(&mut self) -> Result<(), DraftError> {
        self.engine.start()?;
        info!(mode = ?self.engine.mode(), "draft started");
        Ok(())
    }

    /// Turn-gated assignment: validates the turn, places the champion and
    /// advances. Nothing changes on error.
    pub fn apply(
        &mut self,
        side: Side,
        kind: SlotKind,
        index: usize,
        champion: &ChampionRef,
    ) -> Result<Turn, DraftError> {
        let turn = self.engine.check(side, kind, index)?;
        let next = self.state.assign(side, kind, index, champion)?;

        let snapshot = self.snapshot();
        self.history.push(snapshot);
        self.state = next;
        self.engine.advance()?;
        debug!(%turn, champion = %champion.name, "turn applied");
        Ok(turn)
    }

    /// Rearrange two of the user's own completed picks. Not turn-gated and
    /// does not move the cursor.
    pub fn swap(&mut self, side: Side, first: usize, second: usize) -> Result<(), DraftError> {
        if side != self.user_side {
            return Err(DraftError::InvalidSwap { first, second });
        }
        let picks = &self.state.team(side).picks;
        let completed = |i: usize| picks.get(i).is_some_and(|s| s.is_filled());
        if !completed(first) || !completed(second) {
            return Err(DraftError::InvalidSwap { first, second });
        }

        let next = self.state.swap(side, first, second)?;
        let snapshot = self.snapshot();
        self.history.push(snapshot);
        self.state = next;
        Ok(())
    }

    /// Restore the snapshot taken before the most recent apply or swap.
    pub fn undo(&mut self) -> Result<(), DraftError> {
        let previous = self.history.pop().ok_or(DraftError::NothingToUndo)?;
        self.state = previous.state;
        self.engine.rewind_to(previous.cursor);
        debug!(cursor = self.engine.cursor(), "undo");
        Ok(())
    }

    /// Back to an empty, not-started draft.
    pub fn reset(&mut self) {
        self.state = DraftState::new();
        self.engine = TurnEngine::new(self.engine.mode());
        self.history.clear();
        info!("draft reset");
    }
}
