// Arena: the user drafts one side against the bot opponent, then the AI
// grades both compositions.
//
// Bot turns run as spawned tasks. A finished bot task only reaches the board
// through `apply_bot_move`, which re-checks the task's ticket immediately
// before mutating. An undo, swap, reset or newer bot turn in the meantime
// makes the result stale and it is dropped.

use std::sync::Arc;

use riftdraft_draft::{
    compare_grades, ChampionCatalog, ChampionRef, DraftError, DraftMode, DraftSession, Grade,
    Side, Turn, Verdict,
};
use riftdraft_llm::{AiError, GenerateRequest, RequestManager, RequestSlot, Ticket, Validate};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::opponent::{BotDecision, BotError, OpponentPolicy};
use crate::prompt;

#[derive(Debug, Error)]
pub enum ArenaError {
    #[error(transparent)]
    Draft(#[from] DraftError),

    #[error("it is not the user's turn")]
    NotUserTurn,

    #[error("it is not the bot's turn")]
    NotBotTurn,

    #[error("the draft must be complete before it can be scored")]
    DraftIncomplete,

    #[error(transparent)]
    Bot(#[from] BotError),

    #[error(transparent)]
    Ai(#[from] AiError),

    #[error("bot task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// A bot turn running in the background.
pub struct PendingBotTurn {
    pub ticket: Ticket,
    pub turn: Turn,
    pub handle: JoinHandle<Result<BotDecision, BotError>>,
}

/// What the AI returns when scoring a finished draft.
#[derive(Debug, Clone, Deserialize)]
struct ScoreReply {
    blue_grade: Grade,
    red_grade: Grade,
    commentary: String,
}

impl Validate for ScoreReply {
    fn validate(&self) -> Result<(), String> {
        if self.commentary.trim().is_empty() {
            return Err("commentary must not be empty".into());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArenaScore {
    pub blue: Grade,
    pub red: Grade,
    pub verdict: Verdict,
    pub commentary: String,
}

impl ArenaScore {
    pub fn user_won(&self, user_side: Side) -> bool {
        self.verdict == Verdict::Winner(user_side)
    }
}

pub struct ArenaSession {
    session: DraftSession,
    catalog: Arc<ChampionCatalog>,
    opponent: Arc<OpponentPolicy>,
    requests: RequestManager,
    bot_slot: RequestSlot,
    score_slot: RequestSlot,
    last_bot_decision: Option<BotDecision>,
}

impl ArenaSession {
    pub fn new(
        mode: DraftMode,
        user_side: Side,
        catalog: Arc<ChampionCatalog>,
        opponent: Arc<OpponentPolicy>,
        requests: RequestManager,
    ) -> Self {
        Self {
            session: DraftSession::new(mode, user_side),
            catalog,
            opponent,
            requests,
            bot_slot: RequestSlot::new("bot-turn"),
            score_slot: RequestSlot::new("score"),
            last_bot_decision: None,
        }
    }

    pub fn session(&self) -> &DraftSession {
        &self.session
    }

    pub fn user_side(&self) -> Side {
        self.session.user_side()
    }

    pub fn bot_side(&self) -> Side {
        self.session.user_side().opponent()
    }

    /// The most recent bot move, for showing its reasoning.
    pub fn last_bot_decision(&self) -> Option<&BotDecision> {
        self.last_bot_decision.as_ref()
    }

    pub fn is_bot_turn(&self) -> bool {
        self.session.acting_side() == Some(self.bot_side())
    }

    pub fn is_user_turn(&self) -> bool {
        self.session.acting_side() == Some(self.user_side())
    }

    pub fn available(&self) -> Vec<ChampionRef> {
        self.session.state().available_champions(self.catalog.all())
    }

    pub fn start(&mut self) -> Result<(), ArenaError> {
        self.session.start()?;
        Ok(())
    }

    fn turn_in_progress(&self) -> Result<Turn, ArenaError> {
        match self.session.current_turn() {
            Some(turn) => Ok(turn),
            None if !self.session.engine().is_started() => Err(DraftError::DraftNotStarted.into()),
            None => Err(DraftError::DraftComplete.into()),
        }
    }

    /// Fill the user's current turn with `champion`.
    pub fn user_move(&mut self, champion: &ChampionRef) -> Result<Turn, ArenaError> {
        let turn = self.turn_in_progress()?;
        if turn.side != self.user_side() {
            return Err(ArenaError::NotUserTurn);
        }
        Ok(self.session.apply(turn.side, turn.kind, turn.index, champion)?)
    }

    /// Start the bot's current turn in the background, cancelling any bot
    /// turn already in flight.
    pub fn spawn_bot_turn(&mut self) -> Result<PendingBotTurn, ArenaError> {
        let turn = self.turn_in_progress()?;
        if turn.side != self.bot_side() {
            return Err(ArenaError::NotBotTurn);
        }

        let ticket = self.bot_slot.replace();
        let state = self.session.state().clone();
        let available = self.available();
        let opponent = Arc::clone(&self.opponent);
        let task_ticket = ticket.clone();

        let handle = tokio::spawn(async move {
            opponent
                .choose(&state, turn, &available, task_ticket.token())
                .await
        });

        debug!(%turn, generation = ticket.generation(), "bot turn spawned");
        Ok(PendingBotTurn {
            ticket,
            turn,
            handle,
        })
    }

    /// Apply a finished bot move. Returns `Ok(false)` when the move is stale
    /// and was discarded.
    pub fn apply_bot_move(
        &mut self,
        ticket: &Ticket,
        turn: Turn,
        decision: BotDecision,
    ) -> Result<bool, ArenaError> {
        if !self.bot_slot.is_current(ticket) || self.session.current_turn() != Some(turn) {
            debug!(%turn, generation = ticket.generation(), "discarding stale bot move");
            return Ok(false);
        }
        self.session
            .apply(turn.side, turn.kind, turn.index, &decision.champion)?;
        self.bot_slot.finish(ticket);
        if decision.fallback {
            info!(%turn, champion = %decision.champion.name, "bot fell back to a random choice");
        }
        self.last_bot_decision = Some(decision);
        Ok(true)
    }

    /// Run the bot's turn to completion. Returns `None` if it was cancelled.
    pub async fn play_bot_turn(&mut self) -> Result<Option<BotDecision>, ArenaError> {
        let pending = self.spawn_bot_turn()?;
        let decision = match pending.handle.await? {
            Ok(decision) => decision,
            Err(BotError::Aborted) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if self.apply_bot_move(&pending.ticket, pending.turn, decision.clone())? {
            Ok(Some(decision))
        } else {
            Ok(None)
        }
    }

    /// Let the bot act until it is the user's turn or the draft is complete.
    pub async fn play_bot_turns(&mut self) -> Result<usize, ArenaError> {
        let mut moves = 0;
        while self.is_bot_turn() {
            match self.play_bot_turn().await? {
                Some(_) => moves += 1,
                None => break,
            }
        }
        Ok(moves)
    }

    /// Cancel any in-flight bot turn and undo the most recent move.
    pub fn undo(&mut self) -> Result<(), ArenaError> {
        self.bot_slot.cancel();
        self.session.undo()?;
        Ok(())
    }

    /// Rearrange two of the user's completed picks. Allowed at any point;
    /// a bot turn in flight is cancelled since its board is now out of date.
    pub fn swap(&mut self, first: usize, second: usize) -> Result<(), ArenaError> {
        self.session.swap(self.user_side(), first, second)?;
        if self.bot_slot.is_in_flight() {
            debug!(first, second, "swap cancelled the bot turn in flight");
        }
        self.bot_slot.cancel();
        Ok(())
    }

    pub fn reset(&mut self) {
        self.bot_slot.cancel();
        self.score_slot.cancel();
        self.last_bot_decision = None;
        self.session.reset();
    }

    /// Ask the AI to grade both sides of the completed draft.
    pub async fn score(&mut self) -> Result<ArenaScore, ArenaError> {
        if !self.session.is_complete() {
            return Err(ArenaError::DraftIncomplete);
        }

        let ticket = self.score_slot.replace();
        let request = GenerateRequest::new(prompt::score_prompt(self.session.state()))
            .with_system(prompt::system_prompt())
            .with_schema(prompt::score_schema());

        let reply: ScoreReply = self
            .requests
            .send_json_validated(&request, ticket.token())
            .await
            .inspect_err(|e| {
                if !e.is_aborted() {
                    warn!(error = %e, "draft scoring failed");
                }
            })?;
        self.score_slot.finish(&ticket);

        let verdict = compare_grades(reply.blue_grade, reply.red_grade);
        info!(blue = %reply.blue_grade, red = %reply.red_grade, ?verdict, "draft scored");
        Ok(ArenaScore {
            blue: reply.blue_grade,
            red: reply.red_grade,
            verdict,
            commentary: reply.commentary,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use async_trait::async_trait;
    use riftdraft_llm::{AiClient, CallError, RetryPolicy};

    use crate::opponent::{Persona, FAILSAFE_REASONING};

    /// Always fails, after an optional delay.
    struct Down {
        delay: Duration,
    }

    #[async_trait]
    impl AiClient for Down {
        async fn generate(&self, _request: &GenerateRequest) -> Result<String, CallError> {
            tokio::time::sleep(self.delay).await;
            Err(CallError::Unauthorized)
        }
    }

    fn arena(delay: Duration, user_side: Side) -> ArenaSession {
        let requests = RequestManager::new(Arc::new(Down { delay }), RetryPolicy::none());
        let opponent = Arc::new(OpponentPolicy::new(requests.clone(), Persona::Balanced));
        let catalog = Arc::new(ChampionCatalog::from_names([
            "Ahri", "Ashe", "Braum", "Darius", "Ekko", "Ezreal", "Garen", "Jinx", "Karma", "Lux",
            "Nami", "Ornn", "Sejuani", "Sylas", "Thresh", "Viego", "Vi", "Zed", "Zyra", "Yone",
            "Yasuo", "Leona",
        ]));
        ArenaSession::new(DraftMode::Competitive, user_side, catalog, opponent, requests)
    }

    #[tokio::test]
    async fn user_cannot_play_the_bot_turn() {
        let mut arena = arena(Duration::ZERO, Side::Red);
        arena.start().unwrap();

        let ahri = ChampionRef::new("Ahri", "Ahri");
        assert!(matches!(arena.user_move(&ahri), Err(ArenaError::NotUserTurn)));
        assert!(arena.is_bot_turn());
    }

    #[tokio::test]
    async fn bot_falls_back_when_the_service_is_down() {
        let mut arena = arena(Duration::ZERO, Side::Red);
        arena.start().unwrap();

        let decision = arena.play_bot_turn().await.unwrap().unwrap();
        assert!(decision.fallback);
        assert_eq!(decision.reasoning, FAILSAFE_REASONING);
        assert_eq!(arena.session().engine().cursor(), 1);
        assert!(arena.is_user_turn());
    }

    #[tokio::test(start_paused = true)]
    async fn undo_during_bot_turn_discards_its_result() {
        let mut arena = arena(Duration::from_millis(300), Side::Blue);
        arena.start().unwrap();
        let ahri = ChampionRef::new("Ahri", "Ahri");
        arena.user_move(&ahri).unwrap();

        let pending = arena.spawn_bot_turn().unwrap();
        arena.undo().unwrap();

        // The cancelled task resolves to Aborted; even a forged decision
        // for the stale ticket must not be applied.
        assert!(matches!(pending.handle.await.unwrap(), Err(BotError::Aborted)));
        let forged = BotDecision {
            champion: ChampionRef::new("Zed", "Zed"),
            reasoning: String::new(),
            fallback: false,
        };
        assert!(!arena.apply_bot_move(&pending.ticket, pending.turn, forged).unwrap());
        assert_eq!(arena.session().engine().cursor(), 0);
        assert_eq!(arena.session().state().occupied_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn newer_bot_turn_supersedes_older() {
        let mut arena = arena(Duration::from_millis(300), Side::Blue);
        arena.start().unwrap();
        arena.user_move(&ChampionRef::new("Ahri", "Ahri")).unwrap();

        let first = arena.spawn_bot_turn().unwrap();
        let second = arena.spawn_bot_turn().unwrap();

        assert!(matches!(first.handle.await.unwrap(), Err(BotError::Aborted)));
        let decision = second.handle.await.unwrap().unwrap();
        assert!(arena.apply_bot_move(&second.ticket, second.turn, decision).unwrap());
        assert_eq!(arena.session().engine().cursor(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn swapping_own_picks_cancels_the_bot_turn() {
        let mut arena = arena(Duration::from_millis(300), Side::Blue);
        arena.start().unwrap();
        // Up to red's third pick, with blue holding picks 0 to 2.
        while arena.session().engine().cursor() < 11 {
            if arena.is_user_turn() {
                let pick = arena.available()[0].clone();
                arena.user_move(&pick).unwrap();
            } else {
                arena.play_bot_turns().await.unwrap();
            }
        }
        let before = arena.session().state().team(Side::Blue).picks.clone();

        let pending = arena.spawn_bot_turn().unwrap();
        arena.swap(0, 2).unwrap();
        assert!(matches!(pending.handle.await.unwrap(), Err(BotError::Aborted)));

        let after = &arena.session().state().team(Side::Blue).picks;
        assert_eq!(after[0].occupant, before[2].occupant);
        assert_eq!(after[2].occupant, before[0].occupant);
        assert_eq!(arena.session().engine().cursor(), 11);
        assert!(arena.is_bot_turn());

        // Empty slots cannot be swapped.
        assert!(matches!(
            arena.swap(0, 3),
            Err(ArenaError::Draft(DraftError::InvalidSwap { .. }))
        ));
        assert_eq!(arena.play_bot_turn().await.unwrap().map(|d| d.fallback), Some(true));
    }

    #[tokio::test]
    async fn scoring_requires_a_complete_draft() {
        let mut arena = arena(Duration::ZERO, Side::Blue);
        arena.start().unwrap();
        assert!(matches!(arena.score().await, Err(ArenaError::DraftIncomplete)));
    }

    #[test]
    fn user_won_follows_the_verdict() {
        let score = ArenaScore {
            blue: Grade::A,
            red: Grade::AMinus,
            verdict: compare_grades(Grade::A, Grade::AMinus),
            commentary: String::new(),
        };
        assert!(score.user_won(Side::Blue));
        assert!(!score.user_won(Side::Red));
    }
}
