//! Projection packet shapes: baseline, adjustment, and final line.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Declared delta bounds. The composer re-clamps to these even when the
// interpreter already respected them.
pub const MINUTES_DELTA_RANGE: (i32, i32) = (-6, 6);
pub const PTS_DELTA_RANGE: (f64, f64) = (-8.0, 8.0);
pub const REB_DELTA_RANGE: (f64, f64) = (-4.0, 4.0);
pub const AST_DELTA_RANGE: (f64, f64) = (-4.0, 4.0);

pub const MINUTES_RANGE: (f64, f64) = (0.0, 42.0);
pub const CONFIDENCE_RANGE: (f64, f64) = (0.2, 0.95);

/// Minimum reason strings an adjustment must carry
pub const MIN_REASONS: usize = 3;

/// Tag marking an adjustment produced by the deterministic fallback
pub const TAG_BASELINE_ONLY: &str = "baseline_only";

/// Recency spread per stat, `max(1.0, |l10 - season|)` when both windows
/// exist. Not part of the blend means; carried into the interpreter prompt
/// and explanations as an uncertainty signal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BaselineSpread {
    pub pts: f64,
    pub reb: f64,
    pub ast: f64,
}

/// Pre-adjustment projected stat line for one player
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaselinePacket {
    pub minutes_base: f64,
    pub pts_blend: Option<f64>,
    pub reb_blend: Option<f64>,
    pub ast_blend: Option<f64>,
    /// Always the sum of the three stat blends (missing components
    /// contribute nothing); never independently estimated
    pub pra_blend: Option<f64>,
    pub confidence: f64,
    pub spread: BaselineSpread,
}

/// Bounded numeric adjustment for one player, from the interpreter or the
/// deterministic fallback. The two are identical in shape; only `tags`
/// distinguishes them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdjustmentDelta {
    pub player_id: i64,
    pub minutes_delta: i32,
    pub pts_delta: f64,
    pub reb_delta: f64,
    pub ast_delta: f64,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub reasons: Vec<String>,
    #[serde(default)]
    pub confidence_override: Option<f64>,
}

impl AdjustmentDelta {
    /// Zero-delta adjustment for a player
    pub fn zero(player_id: i64) -> Self {
        Self {
            player_id,
            minutes_delta: 0,
            pts_delta: 0.0,
            reb_delta: 0.0,
            ast_delta: 0.0,
            tags: Vec::new(),
            reasons: Vec::new(),
            confidence_override: None,
        }
    }

    /// Re-clamp every delta to its declared range
    pub fn clamped(mut self) -> Self {
        self.minutes_delta = self
            .minutes_delta
            .clamp(MINUTES_DELTA_RANGE.0, MINUTES_DELTA_RANGE.1);
        self.pts_delta = self.pts_delta.clamp(PTS_DELTA_RANGE.0, PTS_DELTA_RANGE.1);
        self.reb_delta = self.reb_delta.clamp(REB_DELTA_RANGE.0, REB_DELTA_RANGE.1);
        self.ast_delta = self.ast_delta.clamp(AST_DELTA_RANGE.0, AST_DELTA_RANGE.1);
        self
    }

    pub fn is_baseline_only(&self) -> bool {
        self.tags.iter().any(|t| t == TAG_BASELINE_ONLY)
    }
}

/// Composed final stat line. `pra` is recomputed from the components on
/// construction and is exact by definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalLine {
    pub minutes: f64,
    pub pts: f64,
    pub reb: f64,
    pub ast: f64,
    pub pra: f64,
    pub confidence: f64,
}

/// Coarse confidence tier the interpreter reports on projection blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfidenceTier {
    High,
    Medium,
    Low,
}

impl ConfidenceTier {
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Some(ConfidenceTier::High),
            "medium" | "med" => Some(ConfidenceTier::Medium),
            "low" => Some(ConfidenceTier::Low),
            _ => None,
        }
    }
}

/// One player's full projection record in the response payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerProjection {
    pub player_id: i64,
    pub player_name: String,
    pub team_abbr: String,
    pub baseline: BaselinePacket,
    pub llm_adjustments: AdjustmentDelta,
    #[serde(rename = "final")]
    pub final_line: FinalLine,
    pub explanations: Vec<String>,
}

/// Full response payload, also the cached value. Created once per cache
/// key and never mutated; a new notes string produces a new entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectionResponse {
    pub game_id: String,
    pub model_version: String,
    pub generated_at: DateTime<Utc>,
    pub players: Vec<PlayerProjection>,
}
