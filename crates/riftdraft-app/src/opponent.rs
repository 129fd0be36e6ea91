// Bot opponent: asks the AI for a move and falls back to a random legal
// champion whenever that does not produce one.
//
// A failure here is never surfaced as an error. The draft must always be
// able to proceed, so every non-cancellation outcome resolves to a
// `BotDecision`. Cancellation is the only exception: an aborted request has
// no outcome at all.

use rand::seq::SliceRandom;
use riftdraft_draft::champion::find_by_name;
use riftdraft_draft::{ChampionRef, DraftState, Turn};
use riftdraft_llm::{AiError, GenerateRequest, RequestManager, Validate};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::prompt;

/// Reasoning attached to every randomly chosen fallback move.
pub const FAILSAFE_REASONING: &str =
    "The opponent had trouble deciding and picked at random.";

// ---------------------------------------------------------------------------
// Persona
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Persona {
    Balanced,
    Aggressive,
    MetaChaser,
    Counterpicker,
    OneTrick,
}

impl Persona {
    pub const ALL: [Persona; 5] = [
        Persona::Balanced,
        Persona::Aggressive,
        Persona::MetaChaser,
        Persona::Counterpicker,
        Persona::OneTrick,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Persona::Balanced => "balanced",
            Persona::Aggressive => "aggressive",
            Persona::MetaChaser => "meta_chaser",
            Persona::Counterpicker => "counterpicker",
            Persona::OneTrick => "one_trick",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Persona::Balanced => {
                "a disciplined drafter who values team synergy and covers every role"
            }
            Persona::Aggressive => {
                "an early-game bully who prioritises lane pressure, dives and snowballing"
            }
            Persona::MetaChaser => {
                "a ladder grinder who first-picks and bans whatever is strongest this patch"
            }
            Persona::Counterpicker => {
                "a patient drafter who waits to see the enemy picks and answers them directly"
            }
            Persona::OneTrick => {
                "a comfort-pick player who sticks to a small pool of signature champions"
            }
        }
    }

    /// Whether the persona benefits from a precomputed top-tier list.
    pub fn wants_top_tier(self) -> bool {
        matches!(self, Persona::MetaChaser)
    }

    pub fn parse(s: &str) -> Option<Persona> {
        let wanted = s.trim().to_ascii_lowercase();
        Persona::ALL.into_iter().find(|p| p.as_str() == wanted)
    }
}

// ---------------------------------------------------------------------------
// Decisions
// ---------------------------------------------------------------------------

/// What the AI is asked to return.
#[derive(Debug, Clone, Deserialize)]
struct BotReply {
    champion: String,
    #[serde(default)]
    reasoning: String,
}

impl Validate for BotReply {
    fn validate(&self) -> Result<(), String> {
        if self.champion.trim().is_empty() {
            return Err("champion must not be empty".into());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotDecision {
    pub champion: ChampionRef,
    pub reasoning: String,
    /// True when the move was chosen at random after a failure.
    pub fallback: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BotError {
    #[error("bot turn aborted")]
    Aborted,

    #[error("no legal champion is left to choose")]
    NoLegalChampion,
}

/// Uniform random choice among `available`.
pub fn random_choice(available: &[ChampionRef]) -> Option<BotDecision> {
    let champion = available.choose(&mut rand::thread_rng())?.clone();
    Some(BotDecision {
        champion,
        reasoning: FAILSAFE_REASONING.to_string(),
        fallback: true,
    })
}

// ---------------------------------------------------------------------------
// OpponentPolicy
// ---------------------------------------------------------------------------

pub struct OpponentPolicy {
    requests: RequestManager,
    persona: Persona,
    top_tier: Vec<String>,
    max_output_tokens: u32,
}

impl OpponentPolicy {
    pub fn new(requests: RequestManager, persona: Persona) -> Self {
        Self {
            requests,
            persona,
            top_tier: Vec::new(),
            max_output_tokens: 512,
        }
    }

    pub fn with_top_tier(mut self, names: Vec<String>) -> Self {
        self.top_tier = names;
        self
    }

    pub fn with_max_output_tokens(mut self, n: u32) -> Self {
        self.max_output_tokens = n;
        self
    }

    pub fn persona(&self) -> Persona {
        self.persona
    }

    /// Choose a champion for `turn` from `available`.
    pub async fn choose(
        &self,
        state: &DraftState,
        turn: Turn,
        available: &[ChampionRef],
        cancel: &CancellationToken,
    ) -> Result<BotDecision, BotError> {
        if available.is_empty() {
            return Err(BotError::NoLegalChampion);
        }

        let request = GenerateRequest::new(prompt::bot_turn_prompt(
            state,
            turn,
            self.persona,
            available,
            &self.top_tier,
        ))
        .with_system(prompt::system_prompt())
        .with_schema(prompt::bot_turn_schema())
        .with_max_output_tokens(self.max_output_tokens);

        let reply = match self.requests.send_json_validated::<BotReply>(&request, cancel).await {
            Ok(reply) => reply,
            Err(AiError::Aborted) => {
                debug!(%turn, "bot turn aborted");
                return Err(BotError::Aborted);
            }
            Err(e) => {
                warn!(%turn, error = %e, "bot request failed; choosing at random");
                return self.fallback(available, cancel);
            }
        };

        match find_by_name(available, &reply.champion) {
            Some(champion) => {
                info!(%turn, champion = %champion.name, persona = self.persona.as_str(), "bot chose");
                Ok(BotDecision {
                    champion: champion.clone(),
                    reasoning: reply.reasoning,
                    fallback: false,
                })
            }
            None => {
                warn!(%turn, suggested = %reply.champion, "bot suggested an unavailable champion; choosing at random");
                self.fallback(available, cancel)
            }
        }
    }

    fn fallback(
        &self,
        available: &[ChampionRef],
        cancel: &CancellationToken,
    ) -> Result<BotDecision, BotError> {
        if cancel.is_cancelled() {
            return Err(BotError::Aborted);
        }
        random_choice(available).ok_or(BotError::NoLegalChampion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;
    use riftdraft_draft::{Side, SlotKind};
    use riftdraft_llm::{AiClient, CallError, RetryPolicy};

    struct Scripted(Result<String, CallError>);

    #[async_trait]
    impl AiClient for Scripted {
        async fn generate(&self, _request: &GenerateRequest) -> Result<String, CallError> {
            self.0.clone()
        }
    }

    fn policy(outcome: Result<String, CallError>) -> OpponentPolicy {
        let requests = RequestManager::new(Arc::new(Scripted(outcome)), RetryPolicy::none());
        OpponentPolicy::new(requests, Persona::Balanced)
    }

    fn pool() -> Vec<ChampionRef> {
        ["Ahri", "Garen", "Lux"]
            .into_iter()
            .map(|n| ChampionRef::new(n, n))
            .collect()
    }

    fn turn() -> Turn {
        Turn::new(Side::Red, SlotKind::Pick, 0)
    }

    #[tokio::test]
    async fn failing_service_falls_back_to_a_random_available_champion() {
        let policy = policy(Err(CallError::ServiceUnavailable(503)));
        let available = pool();

        for _ in 0..20 {
            let decision = policy
                .choose(&DraftState::new(), turn(), &available, &CancellationToken::new())
                .await
                .unwrap();
            assert!(available.contains(&decision.champion));
            assert_eq!(decision.reasoning, FAILSAFE_REASONING);
            assert!(decision.fallback);
        }
    }

    #[tokio::test]
    async fn reply_is_matched_case_insensitively() {
        let policy = policy(Ok(r#"{"champion":"lux","reasoning":"Long range poke."}"#.into()));
        let decision = policy
            .choose(&DraftState::new(), turn(), &pool(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(decision.champion.name, "Lux");
        assert_eq!(decision.reasoning, "Long range poke.");
        assert!(!decision.fallback);
    }

    #[tokio::test]
    async fn unavailable_suggestion_falls_back() {
        let policy = policy(Ok(r#"{"champion":"Zed","reasoning":"Assassin."}"#.into()));
        let decision = policy
            .choose(&DraftState::new(), turn(), &pool(), &CancellationToken::new())
            .await
            .unwrap();

        assert!(decision.fallback);
        assert_ne!(decision.champion.name, "Zed");
    }

    #[tokio::test]
    async fn malformed_reply_falls_back() {
        let policy = policy(Ok("I'd go with Garen, honestly.".into()));
        let decision = policy
            .choose(&DraftState::new(), turn(), &pool(), &CancellationToken::new())
            .await
            .unwrap();
        assert!(decision.fallback);
    }

    #[tokio::test]
    async fn cancellation_is_not_a_failure() {
        let policy = policy(Err(CallError::RateLimited));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = policy.choose(&DraftState::new(), turn(), &pool(), &cancel).await;
        assert_eq!(result, Err(BotError::Aborted));
    }

    #[tokio::test]
    async fn empty_pool_is_reported() {
        let policy = policy(Err(CallError::RateLimited));
        let result = policy
            .choose(&DraftState::new(), turn(), &[], &CancellationToken::new())
            .await;
        assert_eq!(result, Err(BotError::NoLegalChampion));
    }

    #[test]
    fn persona_labels_parse_back() {
        for p in Persona::ALL {
            assert_eq!(Persona::parse(p.as_str()), Some(p));
        }
        assert_eq!(Persona::parse(" Aggressive "), Some(Persona::Aggressive));
        assert!(Persona::MetaChaser.wants_top_tier());
    }
}
