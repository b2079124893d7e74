//! PostgreSQL store adapter.
//!
//! Feature and model rows come back as JSON objects and cross the numeric
//! normalization boundary here, so loosely-typed columns (numeric strings,
//! 0/1 booleans) never leak into the blend math. All multi-row reads carry
//! a deterministic ORDER BY.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;
use tracing::{debug, info, instrument};

use crate::domain::{
    FormSample, ModelEstimate, ModelEstimates, PlayerFeatures, ProjectionResponse, RosterEntry,
    ScheduleContext, StatKind, StoredBaselines,
};
use crate::engine::normalize::{field_boolean, field_i64, field_number, field_string};
use crate::error::{PregameError, Result};
use crate::store::{CacheKey, FeatureStore, ModelStore, ProjectionCache};

/// PostgreSQL storage adapter
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a new PostgreSQL store
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        info!("Connected to PostgreSQL");
        Ok(Self { pool })
    }

    /// Create a store from an existing connection pool
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run migrations for the engine-owned cache table
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations completed");
        Ok(())
    }

    /// Get the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Cheap connectivity probe
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Shared with the in-memory store so fixtures cross the same boundary
pub(crate) fn parse_feature_row(row: &serde_json::Value, player_id: i64) -> PlayerFeatures {
    let sample = |stat: &str| {
        FormSample::new(
            field_number(row, &format!("{stat}_season_avg")),
            field_number(row, &format!("{stat}_l10")),
            field_number(row, &format!("{stat}_l5")),
        )
    };

    PlayerFeatures {
        player_id,
        season_games: None,
        minutes: sample("min"),
        pts: sample("pts"),
        reb: sample("reb"),
        ast: sample("ast"),
        pra: sample("pra"),
        schedule: ScheduleContext {
            days_rest: field_i64(row, "days_rest").map(|d| d as i32),
            is_back_to_back: field_boolean(row, "is_back_to_back").unwrap_or(false),
            is_3_in_4: field_boolean(row, "is_3_in_4").unwrap_or(false),
            is_4_in_6: field_boolean(row, "is_4_in_6").unwrap_or(false),
            is_home: field_boolean(row, "is_home"),
            opponent_team_id: field_i64(row, "opponent_team_id"),
        },
        baselines: StoredBaselines {
            pts: field_number(row, "pts_baseline"),
            reb: field_number(row, "reb_baseline"),
            ast: field_number(row, "ast_baseline"),
            pra: field_number(row, "pra_baseline"),
            min: field_number(row, "min_baseline"),
        },
    }
}

#[async_trait]
impl FeatureStore for PostgresStore {
    #[instrument(skip(self))]
    async fn active_roster(&self, game_id: &str) -> Result<Vec<RosterEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT player_id, player_name, team_abbr
            FROM player_game_features
            WHERE game_id = $1
            ORDER BY player_id ASC
            "#,
        )
        .bind(game_id)
        .fetch_all(&self.pool)
        .await?;

        let roster = rows
            .iter()
            .map(|r| RosterEntry {
                player_id: r.get("player_id"),
                player_name: r
                    .get::<Option<String>, _>("player_name")
                    .unwrap_or_default(),
                team_abbr: r.get::<Option<String>, _>("team_abbr").unwrap_or_default(),
            })
            .collect::<Vec<_>>();

        debug!(game_id, players = roster.len(), "fetched active roster");
        Ok(roster)
    }

    #[instrument(skip(self))]
    async fn player_features(&self, game_id: &str, player_id: i64) -> Result<PlayerFeatures> {
        let row = sqlx::query(
            r#"
            SELECT row_to_json(t) AS row
            FROM (
                SELECT *
                FROM player_game_features
                WHERE game_id = $1 AND player_id = $2
            ) t
            "#,
        )
        .bind(game_id)
        .bind(player_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| {
            PregameError::UpstreamData(format!(
                "no feature row for game {game_id} player {player_id}"
            ))
        })?;

        let json: serde_json::Value = row.get("row");
        let mut features = parse_feature_row(&json, player_id);

        // season sample size for the thin-sample confidence penalty
        let season: Option<String> = json
            .get("season")
            .and_then(|v| v.as_str())
            .map(str::to_string);
        if let Some(season) = season {
            let count = sqlx::query(
                r#"
                SELECT count(*) AS games
                FROM player_game_features
                WHERE player_id = $1 AND season = $2 AND game_id <> $3
                "#,
            )
            .bind(player_id)
            .bind(&season)
            .bind(game_id)
            .fetch_one(&self.pool)
            .await?;
            features.season_games = Some(count.get::<i64, _>("games").max(0) as u32);
        }

        Ok(features)
    }
}

#[async_trait]
impl ModelStore for PostgresStore {
    #[instrument(skip(self))]
    async fn model_estimates(
        &self,
        game_id: &str,
        player_id: i64,
        model_version: &str,
    ) -> Result<ModelEstimates> {
        let rows = sqlx::query(
            r#"
            SELECT row_to_json(t) AS row
            FROM (
                SELECT stat_type, projected_mean, projected_std
                FROM ml_predictions
                WHERE game_id = $1 AND player_id = $2 AND model_version = $3
                ORDER BY stat_type ASC
            ) t
            "#,
        )
        .bind(game_id)
        .bind(player_id)
        .bind(model_version)
        .fetch_all(&self.pool)
        .await?;

        let mut estimates = ModelEstimates::default();
        for row in &rows {
            let json: serde_json::Value = row.get("row");
            let Some(stat) = field_string(&json, "stat_type")
                .as_deref()
                .and_then(StatKind::from_str_loose)
            else {
                continue;
            };
            // a prediction row without a mean is no prediction
            let Some(mean) = field_number(&json, "projected_mean") else {
                continue;
            };
            let std = field_number(&json, "projected_std").unwrap_or(0.0);
            estimates.set(stat, ModelEstimate { mean, std });
        }
        Ok(estimates)
    }

    async fn model_registered(&self, model_version: &str) -> Result<bool> {
        let row = sqlx::query(
            "SELECT 1 AS one FROM ml_model_registry WHERE model_version = $1 LIMIT 1",
        )
        .bind(model_version)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.is_some())
    }
}

#[async_trait]
impl ProjectionCache for PostgresStore {
    #[instrument(skip(self))]
    async fn get(&self, key: &CacheKey) -> Result<Option<ProjectionResponse>> {
        let row = sqlx::query(
            r#"
            SELECT payload
            FROM projection_cache
            WHERE game_id = $1 AND model_version = $2 AND notes_hash = $3
            "#,
        )
        .bind(&key.game_id)
        .bind(&key.model_version)
        .bind(&key.notes_hash)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(r) => {
                let payload: serde_json::Value = r.get("payload");
                Ok(Some(serde_json::from_value(payload)?))
            }
            None => Ok(None),
        }
    }

    #[instrument(skip(self, payload))]
    async fn put(&self, key: &CacheKey, payload: &ProjectionResponse) -> Result<()> {
        let json = serde_json::to_value(payload)?;
        sqlx::query(
            r#"
            INSERT INTO projection_cache (game_id, model_version, notes_hash, payload)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (game_id, model_version, notes_hash) DO UPDATE SET
                payload = EXCLUDED.payload,
                updated_at = now()
            "#,
        )
        .bind(&key.game_id)
        .bind(&key.model_version)
        .bind(&key.notes_hash)
        .bind(json)
        .execute(&self.pool)
        .await?;

        debug!(game_id = %key.game_id, "cached projection payload");
        Ok(())
    }
}
