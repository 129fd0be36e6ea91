// Draft domain: sequence table, board state, turn engine and grades.

pub mod champion;
pub mod engine;
pub mod grade;
pub mod sequence;
pub mod state;

pub use champion::{ChampionCatalog, ChampionRef};
pub use engine::{DraftSession, Snapshot, TurnEngine, NOT_STARTED};
pub use grade::{compare_grades, Grade, Verdict};
pub use sequence::{sequence_for, DraftMode, Role, Side, SlotKind, Turn};
pub use state::{DraftError, DraftSlot, DraftState, TeamState};
