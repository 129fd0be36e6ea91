// Live draft analysis, re-requested whenever the board changes.
//
// The caller publishes every board change through `on_state_changed`. Each
// call cancels whatever analysis is pending or in flight, waits out the
// debounce window and then asks the AI (through the response cache) for a
// fresh analysis. Results arrive as `AnalysisEvent`s on a channel; the
// consumer passes each one through `accept`, which drops anything produced
// by a superseded or cancelled request.

use std::sync::Arc;
use std::time::Duration;

use riftdraft_core::cache::ResponseCache;
use riftdraft_draft::{DraftState, Grade, Side, Turn};
use riftdraft_llm::{debounce, CacheKey, GenerateRequest, RequestManager, RequestSlot, Ticket, Validate};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::prompt;

const MAX_SUGGESTIONS: usize = 5;
const EVENT_CHANNEL_CAPACITY: usize = 16;

// ---------------------------------------------------------------------------
// Analysis payload
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub champion: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftAnalysis {
    pub blue_grade: Grade,
    pub red_grade: Grade,
    pub summary: String,
    #[serde(default)]
    pub suggestions: Vec<Suggestion>,
}

impl Validate for DraftAnalysis {
    fn validate(&self) -> Result<(), String> {
        if self.summary.trim().is_empty() {
            return Err("summary must not be empty".into());
        }
        if self.suggestions.len() > MAX_SUGGESTIONS {
            return Err(format!(
                "at most {MAX_SUGGESTIONS} suggestions allowed, got {}",
                self.suggestions.len()
            ));
        }
        if self.suggestions.iter().any(|s| s.champion.trim().is_empty()) {
            return Err("suggestion with an empty champion name".into());
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisEvent {
    Ready {
        generation: u64,
        analysis: DraftAnalysis,
    },
    /// The request failed; `message` is safe to show to the user.
    Failed { generation: u64, message: String },
}

impl AnalysisEvent {
    pub fn generation(&self) -> u64 {
        match self {
            AnalysisEvent::Ready { generation, .. } | AnalysisEvent::Failed { generation, .. } => {
                *generation
            }
        }
    }
}

/// Cache key for an analysis of `state` from `user_side`'s point of view,
/// with `next_turn` as the action the suggestions are for.
pub fn analysis_cache_key(
    state: &DraftState,
    user_side: Side,
    next_turn: Option<Turn>,
    data_version: &str,
) -> CacheKey {
    let next = match next_turn {
        Some(turn) => format!("{}-{}-{}", turn.side, turn.kind, turn.index),
        None => "complete".to_string(),
    };
    CacheKey::new(
        format!("analysis:{}:{}:{}", user_side, next, state.fingerprint()),
        data_version,
    )
}

// ---------------------------------------------------------------------------
// AnalysisTrigger
// ---------------------------------------------------------------------------

pub struct AnalysisTrigger {
    requests: RequestManager,
    cache: Arc<ResponseCache>,
    data_version: String,
    debounce_window: Duration,
    max_output_tokens: u32,
    slot: RequestSlot,
    /// Ticket of the most recent request; `None` after `cancel`.
    current: Option<Ticket>,
    task: Option<JoinHandle<()>>,
    tx: mpsc::Sender<AnalysisEvent>,
}

impl AnalysisTrigger {
    pub fn new(
        requests: RequestManager,
        cache: Arc<ResponseCache>,
        data_version: impl Into<String>,
        debounce_window: Duration,
    ) -> (Self, mpsc::Receiver<AnalysisEvent>) {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let trigger = Self {
            requests,
            cache,
            data_version: data_version.into(),
            debounce_window,
            max_output_tokens: 1024,
            slot: RequestSlot::new("analysis"),
            current: None,
            task: None,
            tx,
        };
        (trigger, rx)
    }

    pub fn with_max_output_tokens(mut self, n: u32) -> Self {
        self.max_output_tokens = n;
        self
    }

    /// Generation of the most recently issued request.
    pub fn generation(&self) -> u64 {
        self.slot.generation()
    }

    /// Publish a board change. Returns the generation of the request it
    /// schedules.
    pub fn on_state_changed(
        &mut self,
        state: &DraftState,
        user_side: Side,
        next_turn: Option<Turn>,
    ) -> u64 {
        if let Some(handle) = self.task.take() {
            handle.abort();
        }
        let ticket = self.slot.replace();
        let generation = ticket.generation();
        self.current = Some(ticket.clone());

        let key = analysis_cache_key(state, user_side, next_turn, &self.data_version);
        let request = GenerateRequest::new(prompt::analysis_prompt(state, user_side, next_turn))
            .with_system(prompt::system_prompt())
            .with_schema(prompt::analysis_schema())
            .with_max_output_tokens(self.max_output_tokens);

        let requests = self.requests.clone();
        let cache = Arc::clone(&self.cache);
        let window = self.debounce_window;
        let tx = self.tx.clone();

        self.task = Some(tokio::spawn(async move {
            if !debounce(window, &ticket).await {
                debug!(generation, "analysis superseded during debounce");
                return;
            }

            let result = requests
                .send_cached::<DraftAnalysis>(&cache, &key, &request, ticket.token())
                .await;

            let event = match result {
                Ok(analysis) => AnalysisEvent::Ready {
                    generation,
                    analysis,
                },
                Err(e) if e.is_aborted() => return,
                Err(e) => {
                    warn!(generation, error = %e, "draft analysis failed");
                    AnalysisEvent::Failed {
                        generation,
                        message: e.user_message().unwrap_or_default().to_string(),
                    }
                }
            };

            if !ticket.is_live() {
                return;
            }
            let _ = tx.send(event).await;
        }));

        info!(generation, "analysis scheduled");
        generation
    }

    /// Cancel any pending or in-flight analysis. Events already queued for
    /// it will be rejected by `accept`.
    pub fn cancel(&mut self) {
        self.slot.cancel();
        self.current = None;
        if let Some(handle) = self.task.take() {
            handle.abort();
        }
    }

    /// Pass an event through if it belongs to the live request.
    pub fn accept(&mut self, event: AnalysisEvent) -> Option<AnalysisEvent> {
        let live = self
            .current
            .as_ref()
            .is_some_and(|t| t.generation() == event.generation() && self.slot.is_current(t));
        if !live {
            debug!(
                event_generation = event.generation(),
                current_generation = self.slot.generation(),
                "dropping stale analysis event"
            );
            return None;
        }
        if let Some(ticket) = self.current.as_ref() {
            self.slot.finish(ticket);
        }
        Some(event)
    }
}

impl Drop for AnalysisTrigger {
    fn drop(&mut self) {
        self.cancel();
    }
}
