// Draft assistant features built on the draft engine and the AI request
// layer: bot opponent, live analysis, arena, saved drafts and daily tips.

pub mod analysis;
pub mod arena;
pub mod context;
pub mod insights;
pub mod library;
pub mod opponent;
pub mod prompt;

pub use analysis::{AnalysisEvent, AnalysisTrigger, DraftAnalysis, Suggestion};
pub use arena::{ArenaError, ArenaScore, ArenaSession, PendingBotTurn};
pub use context::AppContext;
pub use insights::{daily_insight, DailyInsight};
pub use library::{DraftLibrary, LibraryError, SavedDraft};
pub use opponent::{BotDecision, BotError, OpponentPolicy, Persona, FAILSAFE_REASONING};
