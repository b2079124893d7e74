//! In-memory store used by tests and fixture-backed CLI runs.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::{
    ModelEstimate, ModelEstimates, PlayerFeatures, ProjectionResponse, RosterEntry, StatKind,
};
use crate::engine::normalize::{field_i64, field_number, field_string};
use crate::error::{PregameError, Result};
use crate::store::{CacheKey, FeatureStore, ModelStore, ProjectionCache};

#[derive(Default)]
pub struct MemoryStore {
    roster: RwLock<HashMap<String, Vec<RosterEntry>>>,
    features: RwLock<HashMap<(String, i64), PlayerFeatures>>,
    estimates: RwLock<HashMap<(String, i64, String), ModelEstimates>>,
    registry: RwLock<HashSet<String>>,
    cache: RwLock<HashMap<CacheKey, ProjectionResponse>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_roster(&self, game_id: &str, entries: Vec<RosterEntry>) {
        self.roster
            .write()
            .unwrap()
            .insert(game_id.to_string(), entries);
    }

    pub fn insert_features(&self, game_id: &str, features: PlayerFeatures) {
        self.features
            .write()
            .unwrap()
            .insert((game_id.to_string(), features.player_id), features);
    }

    pub fn insert_estimates(
        &self,
        game_id: &str,
        player_id: i64,
        model_version: &str,
        estimates: ModelEstimates,
    ) {
        self.estimates.write().unwrap().insert(
            (game_id.to_string(), player_id, model_version.to_string()),
            estimates,
        );
    }

    pub fn register_model(&self, model_version: &str) {
        self.registry
            .write()
            .unwrap()
            .insert(model_version.to_string());
    }

    pub fn cache_len(&self) -> usize {
        self.cache.read().unwrap().len()
    }

    /// Seed one game from a JSON fixture:
    /// `{"roster": [...], "features": {"<player_id>": {...loose row...}},
    ///   "estimates": {"<player_id>": {"PTS": {"mean": .., "std": ..}}}}`
    /// Feature rows go through the same normalization boundary as Postgres
    /// rows, so fixtures may carry numeric strings and 0/1 booleans.
    pub fn seed_fixture(&self, game_id: &str, model_version: &str, fixture: &Value) -> Result<()> {
        let roster = fixture
            .get("roster")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                PregameError::InvalidRequest("fixture missing roster array".to_string())
            })?;

        let mut entries = Vec::with_capacity(roster.len());
        for row in roster {
            let player_id = field_i64(row, "player_id").ok_or_else(|| {
                PregameError::InvalidRequest("fixture roster entry missing player_id".to_string())
            })?;
            entries.push(RosterEntry {
                player_id,
                player_name: field_string(row, "player_name").unwrap_or_default(),
                team_abbr: field_string(row, "team_abbr").unwrap_or_default(),
            });
        }

        if let Some(features) = fixture.get("features").and_then(Value::as_object) {
            for (id, row) in features {
                let player_id: i64 = id.parse().map_err(|_| {
                    PregameError::InvalidRequest(format!("fixture feature key {id} not a player id"))
                })?;
                let mut parsed = super::postgres::parse_feature_row(row, player_id);
                parsed.season_games = field_i64(row, "season_games").map(|g| g.max(0) as u32);
                self.insert_features(game_id, parsed);
            }
        }

        if let Some(estimates) = fixture.get("estimates").and_then(Value::as_object) {
            for (id, stats) in estimates {
                let player_id: i64 = id.parse().map_err(|_| {
                    PregameError::InvalidRequest(format!(
                        "fixture estimate key {id} not a player id"
                    ))
                })?;
                let mut parsed = ModelEstimates::default();
                if let Some(stats) = stats.as_object() {
                    for (stat_name, est) in stats {
                        let Some(stat) = StatKind::from_str_loose(stat_name) else {
                            continue;
                        };
                        let Some(mean) = field_number(est, "mean") else {
                            continue;
                        };
                        let std = field_number(est, "std").unwrap_or(0.0);
                        parsed.set(stat, ModelEstimate { mean, std });
                    }
                }
                self.insert_estimates(game_id, player_id, model_version, parsed);
            }
        }

        self.insert_roster(game_id, entries);
        self.register_model(model_version);
        Ok(())
    }
}

#[async_trait]
impl FeatureStore for MemoryStore {
    async fn active_roster(&self, game_id: &str) -> Result<Vec<RosterEntry>> {
        Ok(self
            .roster
            .read()
            .unwrap()
            .get(game_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn player_features(&self, game_id: &str, player_id: i64) -> Result<PlayerFeatures> {
        self.features
            .read()
            .unwrap()
            .get(&(game_id.to_string(), player_id))
            .cloned()
            .ok_or_else(|| {
                PregameError::UpstreamData(format!(
                    "no feature row for game {game_id} player {player_id}"
                ))
            })
    }
}

#[async_trait]
impl ModelStore for MemoryStore {
    async fn model_estimates(
        &self,
        game_id: &str,
        player_id: i64,
        model_version: &str,
    ) -> Result<ModelEstimates> {
        Ok(self
            .estimates
            .read()
            .unwrap()
            .get(&(game_id.to_string(), player_id, model_version.to_string()))
            .copied()
            .unwrap_or_default())
    }

    async fn model_registered(&self, model_version: &str) -> Result<bool> {
        Ok(self.registry.read().unwrap().contains(model_version))
    }
}

#[async_trait]
impl ProjectionCache for MemoryStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<ProjectionResponse>> {
        Ok(self.cache.read().unwrap().get(key).cloned())
    }

    async fn put(&self, key: &CacheKey, payload: &ProjectionResponse) -> Result<()> {
        self.cache
            .write()
            .unwrap()
            .insert(key.clone(), payload.clone());
        Ok(())
    }
}
