//! Interpreter response parsing and schema validation.
//!
//! Validation runs before acceptance and produces specific failure messages;
//! the retry prompt embeds them so the second attempt can self-correct.

use serde::Deserialize;

use crate::domain::{AdjustmentDelta, ConfidenceTier, RosterEntry, MIN_REASONS, MINUTES_RANGE};

/// A structural rejection of an interpreter response. The message names the
/// exact check that failed.
#[derive(Debug, Clone)]
pub struct ValidationFailure {
    pub message: String,
}

impl ValidationFailure {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ValidationFailure {}

#[derive(Debug, Deserialize)]
struct ResponseJson {
    #[serde(default)]
    game_id: String,
    #[serde(default)]
    model_version: String,
    #[serde(default)]
    adjustments: Vec<AdjustmentJson>,
    #[serde(default)]
    projections: Vec<ProjectionJson>,
}

#[derive(Debug, Deserialize)]
struct AdjustmentJson {
    player_id: Option<i64>,
    minutes_delta: Option<f64>,
    pts_delta: Option<f64>,
    reb_delta: Option<f64>,
    ast_delta: Option<f64>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    reasons: Vec<String>,
    #[serde(default)]
    confidence_override: Option<f64>,
}

/// Optional per-player projection block some responses carry alongside the
/// adjustments; validated when present, never used as the final line.
#[derive(Debug, Deserialize)]
struct ProjectionJson {
    player_id: Option<i64>,
    minutes: Option<f64>,
    pts: Option<f64>,
    reb: Option<f64>,
    ast: Option<f64>,
    pra: Option<f64>,
    #[serde(default)]
    confidence: String,
}

/// Strip markdown fences and surrounding prose from a model response,
/// leaving the JSON object
pub fn extract_json_block(raw: &str) -> String {
    let trimmed = raw.trim();

    if let Some(start) = trimmed.find("```json") {
        let after_fence = &trimmed[start + 7..];
        if let Some(end) = after_fence.find("```") {
            return after_fence[..end].trim().to_string();
        }
    }
    if let Some(start) = trimmed.find("```") {
        let after_fence = &trimmed[start + 3..];
        if let Some(end) = after_fence.find("```") {
            let block = after_fence[..end].trim();
            if block.starts_with('{') {
                return block.to_string();
            }
        }
    }
    // Fall back to the outermost brace pair
    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if end > start {
            return trimmed[start..=end].to_string();
        }
    }
    trimmed.to_string()
}

const PRA_TOLERANCE: f64 = 1.01;

/// Parse and validate an interpreter response against the request. Returns
/// one accepted adjustment per roster player, in roster order. Extra
/// entries are ignored; any drop, absent delta, or inconsistent projection
/// block rejects the whole response.
pub fn parse_and_validate(
    raw: &str,
    game_id: &str,
    model_version: &str,
    roster: &[RosterEntry],
) -> Result<Vec<AdjustmentDelta>, ValidationFailure> {
    let json_str = extract_json_block(raw);
    let parsed: ResponseJson = serde_json::from_str(&json_str)
        .map_err(|e| ValidationFailure::new(format!("response is not valid JSON: {e}")))?;

    if parsed.game_id != game_id {
        return Err(ValidationFailure::new(format!(
            "game_id mismatch: expected {:?}, got {:?}",
            game_id, parsed.game_id
        )));
    }
    if parsed.model_version != model_version {
        return Err(ValidationFailure::new(format!(
            "model_version mismatch: expected {:?}, got {:?}",
            model_version, parsed.model_version
        )));
    }

    let mut accepted = Vec::with_capacity(roster.len());
    for entry in roster {
        let id = entry.player_id;
        let adj = parsed
            .adjustments
            .iter()
            .find(|a| a.player_id == Some(id))
            .ok_or_else(|| {
                ValidationFailure::new(format!("missing adjustment entry for player {id}"))
            })?;

        let minutes_delta = adj
            .minutes_delta
            .ok_or_else(|| ValidationFailure::new(format!("player {id}: minutes_delta missing")))?;
        let pts_delta = adj
            .pts_delta
            .ok_or_else(|| ValidationFailure::new(format!("player {id}: pts_delta missing")))?;
        let reb_delta = adj
            .reb_delta
            .ok_or_else(|| ValidationFailure::new(format!("player {id}: reb_delta missing")))?;
        let ast_delta = adj
            .ast_delta
            .ok_or_else(|| ValidationFailure::new(format!("player {id}: ast_delta missing")))?;

        if !minutes_delta.is_finite()
            || !pts_delta.is_finite()
            || !reb_delta.is_finite()
            || !ast_delta.is_finite()
        {
            return Err(ValidationFailure::new(format!(
                "player {id}: non-finite delta value"
            )));
        }

        if adj.reasons.len() < MIN_REASONS {
            return Err(ValidationFailure::new(format!(
                "player {id}: needs at least {MIN_REASONS} reasons, got {}",
                adj.reasons.len()
            )));
        }

        accepted.push(AdjustmentDelta {
            player_id: id,
            minutes_delta: minutes_delta.round() as i32,
            pts_delta,
            reb_delta,
            ast_delta,
            tags: adj.tags.clone(),
            reasons: adj.reasons.clone(),
            confidence_override: adj.confidence_override,
        });
    }

    validate_projection_blocks(&parsed.projections, roster)?;

    Ok(accepted)
}

fn validate_projection_blocks(
    projections: &[ProjectionJson],
    roster: &[RosterEntry],
) -> Result<(), ValidationFailure> {
    for proj in projections {
        let Some(id) = proj.player_id else {
            return Err(ValidationFailure::new(
                "projection block without player_id",
            ));
        };
        // blocks for players outside the request are ignored
        if !roster.iter().any(|r| r.player_id == id) {
            continue;
        }

        let minutes = proj
            .minutes
            .ok_or_else(|| ValidationFailure::new(format!("projection {id}: minutes missing")))?;
        if !(MINUTES_RANGE.0..=MINUTES_RANGE.1).contains(&minutes) {
            return Err(ValidationFailure::new(format!(
                "projection {id}: minutes {minutes} outside [0, 42]"
            )));
        }

        let pts = proj.pts.unwrap_or(-1.0);
        let reb = proj.reb.unwrap_or(-1.0);
        let ast = proj.ast.unwrap_or(-1.0);
        let pra = proj.pra.unwrap_or(-1.0);
        if pts < 0.0 || reb < 0.0 || ast < 0.0 || pra < 0.0 {
            return Err(ValidationFailure::new(format!(
                "projection {id}: negative or missing stat value"
            )));
        }
        if (pts + reb + ast - pra).abs() > PRA_TOLERANCE {
            return Err(ValidationFailure::new(format!(
                "projection {id}: pra {pra} inconsistent with pts+reb+ast {}",
                pts + reb + ast
            )));
        }
        if ConfidenceTier::from_str_loose(&proj.confidence).is_none() {
            return Err(ValidationFailure::new(format!(
                "projection {id}: confidence {:?} not one of High/Medium/Low",
                proj.confidence
            )));
        }
    }
    Ok(())
}
