//! Store seams: feature/roster reads, model estimates, and the result cache.
//!
//! The engine only sees these traits and receives concrete stores at
//! construction time; there is no process-wide store singleton.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::domain::{ModelEstimates, PlayerFeatures, ProjectionResponse, RosterEntry};
use crate::error::Result;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

/// Cache key: the triple that fully determines a computed payload
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub game_id: String,
    pub model_version: String,
    pub notes_hash: String,
}

/// Read-only roster and pregame-feature lookups
#[async_trait]
pub trait FeatureStore: Send + Sync {
    /// Active roster for a game. The player-id set gates every subsequent
    /// per-player query.
    async fn active_roster(&self, game_id: &str) -> Result<Vec<RosterEntry>>;

    /// Rolling-form observations, schedule flags, and stored baselines for
    /// one player in one game. A missing feature row is an upstream data
    /// error, not an empty default.
    async fn player_features(&self, game_id: &str, player_id: i64) -> Result<PlayerFeatures>;
}

/// Versioned model-output lookups
#[async_trait]
pub trait ModelStore: Send + Sync {
    /// Per-stat mean/std for one (game, player, model_version). Absent
    /// stats stay absent.
    async fn model_estimates(
        &self,
        game_id: &str,
        player_id: i64,
        model_version: &str,
    ) -> Result<ModelEstimates>;

    /// Whether the model version exists in the registry
    async fn model_registered(&self, model_version: &str) -> Result<bool>;
}

/// Write-once-per-key (upsert) result cache. Entries are never invalidated
/// here; callers vary `model_version` to cut over.
#[async_trait]
pub trait ProjectionCache: Send + Sync {
    async fn get(&self, key: &CacheKey) -> Result<Option<ProjectionResponse>>;

    async fn put(&self, key: &CacheKey, payload: &ProjectionResponse) -> Result<()>;
}
