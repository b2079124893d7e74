//! Typed records for roster, rolling-form, and model inputs.
//!
//! These are the shapes the store adapters produce after the numeric
//! normalization boundary. Absent observations stay absent (`Option`),
//! never zero-filled, so downstream blend math can tell "zero" from
//! "unknown".

use serde::{Deserialize, Serialize};

/// Stat categories the engine projects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatKind {
    Pts,
    Reb,
    Ast,
    Pra,
    Min,
}

impl StatKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatKind::Pts => "PTS",
            StatKind::Reb => "REB",
            StatKind::Ast => "AST",
            StatKind::Pra => "PRA",
            StatKind::Min => "MIN",
        }
    }

    /// Lenient parse used when reading store rows
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PTS" => Some(StatKind::Pts),
            "REB" => Some(StatKind::Reb),
            "AST" => Some(StatKind::Ast),
            "PRA" => Some(StatKind::Pra),
            "MIN" | "MINUTES" => Some(StatKind::Min),
            _ => None,
        }
    }
}

impl std::fmt::Display for StatKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One active-roster player for a game
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterEntry {
    pub player_id: i64,
    pub player_name: String,
    pub team_abbr: String,
}

/// Rolling-window observations for a single stat. Any window the store
/// reports as absent stays `None`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct FormSample {
    pub l5: Option<f64>,
    pub l10: Option<f64>,
    pub season: Option<f64>,
}

impl FormSample {
    pub fn new(season: Option<f64>, l10: Option<f64>, l5: Option<f64>) -> Self {
        Self { l5, l10, season }
    }

    pub fn is_empty(&self) -> bool {
        self.l5.is_none() && self.l10.is_none() && self.season.is_none()
    }
}

/// Pregame schedule flags attached to the feature row
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ScheduleContext {
    pub days_rest: Option<i32>,
    pub is_back_to_back: bool,
    pub is_3_in_4: bool,
    pub is_4_in_6: bool,
    pub is_home: Option<bool>,
    pub opponent_team_id: Option<i64>,
}

/// Stored per-player baseline figures, the last fallback before `None`
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct StoredBaselines {
    pub pts: Option<f64>,
    pub reb: Option<f64>,
    pub ast: Option<f64>,
    pub pra: Option<f64>,
    pub min: Option<f64>,
}

/// Everything the feature store knows about a player going into a game
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlayerFeatures {
    pub player_id: i64,
    /// Games played this season before this one; drives the thin-sample
    /// confidence penalty
    pub season_games: Option<u32>,
    pub minutes: FormSample,
    pub pts: FormSample,
    pub reb: FormSample,
    pub ast: FormSample,
    pub pra: FormSample,
    pub schedule: ScheduleContext,
    pub baselines: StoredBaselines,
}

impl PlayerFeatures {
    pub fn form(&self, stat: StatKind) -> &FormSample {
        match stat {
            StatKind::Pts => &self.pts,
            StatKind::Reb => &self.reb,
            StatKind::Ast => &self.ast,
            StatKind::Pra => &self.pra,
            StatKind::Min => &self.minutes,
        }
    }

    pub fn stored_baseline(&self, stat: StatKind) -> Option<f64> {
        match stat {
            StatKind::Pts => self.baselines.pts,
            StatKind::Reb => self.baselines.reb,
            StatKind::Ast => self.baselines.ast,
            StatKind::Pra => self.baselines.pra,
            StatKind::Min => self.baselines.min,
        }
    }
}

/// Mean/std pair from a named, versioned model
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ModelEstimate {
    pub mean: f64,
    pub std: f64,
}

/// Per-stat model estimates for one (game, player, model_version).
/// Presence is independent per stat.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ModelEstimates {
    pub pts: Option<ModelEstimate>,
    pub reb: Option<ModelEstimate>,
    pub ast: Option<ModelEstimate>,
    pub pra: Option<ModelEstimate>,
}

impl ModelEstimates {
    pub fn get(&self, stat: StatKind) -> Option<ModelEstimate> {
        match stat {
            StatKind::Pts => self.pts,
            StatKind::Reb => self.reb,
            StatKind::Ast => self.ast,
            StatKind::Pra => self.pra,
            StatKind::Min => None,
        }
    }

    pub fn set(&mut self, stat: StatKind, estimate: ModelEstimate) {
        match stat {
            StatKind::Pts => self.pts = Some(estimate),
            StatKind::Reb => self.reb = Some(estimate),
            StatKind::Ast => self.ast = Some(estimate),
            StatKind::Pra => self.pra = Some(estimate),
            StatKind::Min => {}
        }
    }
}
