// Application wiring: everything the UI layer needs, built once from config.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use riftdraft_core::cache::ResponseCache;
use riftdraft_core::config::Config;
use riftdraft_core::db::Database;
use riftdraft_core::store::KeyValueStore;
use riftdraft_draft::{ChampionCatalog, DraftMode, Side};
use riftdraft_llm::{AiClient, AiError, LlmClient, RequestManager, RetryPolicy};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::analysis::{AnalysisEvent, AnalysisTrigger};
use crate::arena::ArenaSession;
use crate::insights::{daily_insight, DailyInsight};
use crate::library::DraftLibrary;
use crate::opponent::{OpponentPolicy, Persona};

/// Shared services. Cheap to clone; all heavy parts are behind `Arc`.
#[derive(Clone)]
pub struct AppContext {
    config: Config,
    store: Arc<dyn KeyValueStore>,
    cache: Arc<ResponseCache>,
    requests: RequestManager,
    ai_enabled: bool,
}

impl AppContext {
    /// Open the database and build the AI client described by `config`.
    pub fn from_config(config: Config) -> Result<Self> {
        let db_path = config.resolved_db_path();
        let db = Database::open(&db_path)
            .with_context(|| format!("failed to open database at {}", db_path.display()))?;
        let client = LlmClient::from_config(&config);
        let ai_enabled = client.is_active();

        let ctx = Self::with_parts(config, Arc::new(db), Arc::new(client));
        info!(
            db = %db_path.display(),
            ai_enabled,
            model = %ctx.config.ai.model,
            "application context ready"
        );
        Ok(Self { ai_enabled, ..ctx })
    }

    /// Assemble a context from already-built parts.
    pub fn with_parts(
        config: Config,
        store: Arc<dyn KeyValueStore>,
        client: Arc<dyn AiClient>,
    ) -> Self {
        let cache = Arc::new(ResponseCache::new(
            Arc::clone(&store),
            Duration::from_secs(config.cache.ttl_secs),
        ));
        let requests = RequestManager::new(client, RetryPolicy::from_config(&config.retry));
        Self {
            config,
            store,
            cache,
            requests,
            ai_enabled: true,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn requests(&self) -> &RequestManager {
        &self.requests
    }

    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    /// False when no API key is configured and every AI call will fail fast.
    pub fn ai_enabled(&self) -> bool {
        self.ai_enabled
    }

    pub fn draft_mode(&self) -> DraftMode {
        DraftMode::parse(&self.config.draft.mode).unwrap_or(DraftMode::Competitive)
    }

    pub fn user_side(&self) -> Side {
        Side::parse(&self.config.draft.user_side).unwrap_or(Side::Blue)
    }

    pub fn library(&self) -> DraftLibrary {
        DraftLibrary::new(Arc::clone(&self.store))
    }

    pub fn opponent(&self, persona: Persona, top_tier: Vec<String>) -> OpponentPolicy {
        OpponentPolicy::new(self.requests.clone(), persona)
            .with_top_tier(top_tier)
            .with_max_output_tokens(self.config.ai.max_output_tokens)
    }

    pub fn analysis_trigger(&self) -> (AnalysisTrigger, mpsc::Receiver<AnalysisEvent>) {
        let (trigger, rx) = AnalysisTrigger::new(
            self.requests.clone(),
            Arc::clone(&self.cache),
            self.config.cache.data_version.clone(),
            self.config.ai.analysis_debounce(),
        );
        (
            trigger.with_max_output_tokens(self.config.ai.max_output_tokens),
            rx,
        )
    }

    /// A new arena against a bot with `persona`, using the configured mode
    /// and side.
    pub fn arena(&self, catalog: Arc<ChampionCatalog>, persona: Persona) -> ArenaSession {
        ArenaSession::new(
            self.draft_mode(),
            self.user_side(),
            catalog,
            Arc::new(self.opponent(persona, Vec::new())),
            self.requests.clone(),
        )
    }

    pub async fn daily_insight(
        &self,
        date: NaiveDate,
        cancel: &CancellationToken,
    ) -> Result<DailyInsight, AiError> {
        daily_insight(
            &self.requests,
            &self.cache,
            &self.config.cache.data_version,
            date,
            cancel,
        )
        .await
    }
}
