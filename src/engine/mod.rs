//! Projection Blending & Adjustment Engine.
//!
//! Stateless per-request orchestration: normalize notes, check the cache,
//! fetch roster and per-player inputs, assemble baselines, run the single
//! roster-wide interpreter call (with its one validation retry), compose
//! final lines, and upsert the cache. Collaborators are injected at
//! construction; nothing here is process-global.

pub mod baseline;
pub mod blend;
pub mod compose;
pub mod fallback;
pub mod normalize;

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::{EngineConfig, FailurePolicy};
use crate::domain::{
    AdjustmentDelta, BaselinePacket, ContextNotes, ModelEstimates, PlayerFeatures,
    PlayerProjection, ProjectionResponse, RosterEntry,
};
use crate::error::{PregameError, Result};
use crate::interpreter::{parse_and_validate, prompt, TextGenerator};
use crate::store::{CacheKey, FeatureStore, ModelStore, ProjectionCache};

/// One projection request
#[derive(Debug, Clone)]
pub struct ProjectionRequest {
    pub game_id: String,
    pub model_version: String,
    pub notes: String,
}

/// Everything the engine has assembled for one player before the
/// interpreter call
#[derive(Debug, Clone)]
pub struct PlayerContext {
    pub roster: RosterEntry,
    pub features: PlayerFeatures,
    pub estimates: ModelEstimates,
    pub baseline: BaselinePacket,
}

/// The engine, constructed from injected collaborators
pub struct ProjectionEngine {
    features: Arc<dyn FeatureStore>,
    models: Arc<dyn ModelStore>,
    cache: Arc<dyn ProjectionCache>,
    generator: Arc<dyn TextGenerator>,
    config: EngineConfig,
    failure_policy: FailurePolicy,
}

impl ProjectionEngine {
    pub fn new(
        features: Arc<dyn FeatureStore>,
        models: Arc<dyn ModelStore>,
        cache: Arc<dyn ProjectionCache>,
        generator: Arc<dyn TextGenerator>,
        config: EngineConfig,
        failure_policy: FailurePolicy,
    ) -> Self {
        Self {
            features,
            models,
            cache,
            generator,
            config,
            failure_policy,
        }
    }

    /// Cache lookup without computing anything
    pub async fn cached(&self, request: &ProjectionRequest) -> Result<Option<ProjectionResponse>> {
        let key = Self::cache_key(&Self::validate_request(request)?, request);
        self.cache.get(&key).await
    }

    /// Run one projection request end to end
    pub async fn run(&self, request: &ProjectionRequest) -> Result<ProjectionResponse> {
        let notes = Self::validate_request(request)?;
        let key = Self::cache_key(&notes, request);
        let request_id = Uuid::new_v4();

        // Read-before-compute: a hit skips every external call
        if let Some(hit) = self.cache.get(&key).await? {
            info!(
                game_id = %request.game_id,
                model_version = %request.model_version,
                "cache hit, returning stored payload"
            );
            return Ok(hit);
        }

        let roster = self.features.active_roster(&request.game_id).await?;
        if roster.is_empty() {
            return Err(PregameError::UpstreamData(format!(
                "no active roster for game {}",
                request.game_id
            )));
        }

        if !self.models.model_registered(&request.model_version).await? {
            // registry rows can lag the prediction upload; per-stat lookups
            // below still resolve whatever exists
            warn!(
                model_version = %request.model_version,
                "model version not found in registry"
            );
        }

        // Per-player lookups are independent and issued concurrently once
        // the roster (the id set gating them) has resolved
        let lookups = roster.iter().map(|entry| {
            let features = Arc::clone(&self.features);
            let models = Arc::clone(&self.models);
            let game_id = request.game_id.clone();
            let model_version = request.model_version.clone();
            let player_id = entry.player_id;
            async move {
                tokio::try_join!(
                    features.player_features(&game_id, player_id),
                    models.model_estimates(&game_id, player_id, &model_version),
                )
            }
        });
        let resolved = futures::future::try_join_all(lookups).await?;

        let players: Vec<PlayerContext> = roster
            .into_iter()
            .zip(resolved)
            .map(|(entry, (features, estimates))| {
                let packet = baseline::assemble_baseline(
                    &features,
                    &estimates,
                    &notes,
                    self.config.default_minutes,
                );
                PlayerContext {
                    roster: entry,
                    features,
                    estimates,
                    baseline: packet,
                }
            })
            .collect();

        let adjustments = match self.interpret(request_id, request, &players, &notes).await {
            Ok(adjustments) => adjustments,
            Err(e) if e.is_interpreter_failure() => match self.failure_policy {
                FailurePolicy::Fallback => {
                    warn!(
                        %request_id,
                        game_id = %request.game_id,
                        error = %e,
                        "interpreter unavailable, degrading to baseline-only adjustments"
                    );
                    fallback::baseline_adjustments(&players)
                }
                FailurePolicy::Strict => return Err(e),
            },
            Err(e) => return Err(e),
        };

        let response = Self::compose_response(request, &players, &adjustments, &notes);

        // Write-after-compute: a failure above leaves no stale entry. Two
        // identical racing requests both upsert; last write wins and both
        // payloads are equivalent.
        self.cache.put(&key, &response).await?;

        info!(
            %request_id,
            game_id = %request.game_id,
            players = response.players.len(),
            "projection computed and cached"
        );
        Ok(response)
    }

    fn validate_request(request: &ProjectionRequest) -> Result<ContextNotes> {
        if request.game_id.trim().is_empty() {
            return Err(PregameError::InvalidRequest("game_id is required".to_string()));
        }
        if request.model_version.trim().is_empty() {
            return Err(PregameError::InvalidRequest(
                "model_version is required".to_string(),
            ));
        }
        Ok(ContextNotes::new(request.notes.clone()))
    }

    fn cache_key(notes: &ContextNotes, request: &ProjectionRequest) -> CacheKey {
        CacheKey {
            game_id: request.game_id.trim().to_string(),
            model_version: request.model_version.trim().to_string(),
            notes_hash: notes.content_hash(),
        }
    }

    /// Single roster-wide interpreter call with one validation retry. The
    /// retry prompt carries the full prior response plus the specific
    /// validation error. Transport failures are not retried; the timeout
    /// budget is already spent.
    async fn interpret(
        &self,
        request_id: Uuid,
        request: &ProjectionRequest,
        players: &[PlayerContext],
        notes: &ContextNotes,
    ) -> Result<Vec<AdjustmentDelta>> {
        let roster: Vec<_> = players.iter().map(|p| p.roster.clone()).collect();
        let system = prompt::system_prompt();
        let user =
            prompt::build_user_prompt(&request.game_id, &request.model_version, players, notes);

        let raw = self.generator.generate(&system, &user).await?;
        match parse_and_validate(&raw, &request.game_id, &request.model_version, &roster) {
            Ok(adjustments) => {
                debug!(%request_id, "interpreter response accepted on first attempt");
                Ok(adjustments)
            }
            Err(failure) => {
                warn!(
                    %request_id,
                    game_id = %request.game_id,
                    error = %failure,
                    "interpreter response rejected, retrying once"
                );
                let retry_user = prompt::build_retry_prompt(&user, &raw, &failure.message);
                let raw = self.generator.generate(&system, &retry_user).await?;
                parse_and_validate(&raw, &request.game_id, &request.model_version, &roster)
                    .map_err(|failure| {
                        PregameError::InterpreterValidation(format!(
                            "retry also rejected: {failure}"
                        ))
                    })
            }
        }
    }

    fn compose_response(
        request: &ProjectionRequest,
        players: &[PlayerContext],
        adjustments: &[AdjustmentDelta],
        notes: &ContextNotes,
    ) -> ProjectionResponse {
        let players = players
            .iter()
            .map(|ctx| {
                let adjustment = adjustments
                    .iter()
                    .find(|a| a.player_id == ctx.roster.player_id)
                    .cloned()
                    .unwrap_or_else(|| AdjustmentDelta::zero(ctx.roster.player_id));
                let (final_line, explanations) = compose::compose_final(ctx, &adjustment, notes);
                PlayerProjection {
                    player_id: ctx.roster.player_id,
                    player_name: ctx.roster.player_name.clone(),
                    team_abbr: ctx.roster.team_abbr.clone(),
                    baseline: ctx.baseline.clone(),
                    llm_adjustments: adjustment.clamped(),
                    final_line,
                    explanations,
                }
            })
            .collect();

        ProjectionResponse {
            game_id: request.game_id.trim().to_string(),
            model_version: request.model_version.trim().to_string(),
            generated_at: Utc::now(),
            players,
        }
    }
}
