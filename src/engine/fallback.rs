//! Deterministic fallback adjustments: zero deltas, templated reasons.
//!
//! Produced when the interpreter path fails under the fallback policy.
//! Identical in shape to interpreter-sourced adjustments so the composer
//! cannot tell them apart; only the `baseline_only` tag reveals the degrade.

use crate::domain::{AdjustmentDelta, TAG_BASELINE_ONLY};
use crate::engine::PlayerContext;

/// One zero-delta adjustment per player. Reasons cite the player's own
/// baseline numbers, never fabricated figures.
pub fn baseline_adjustments(players: &[PlayerContext]) -> Vec<AdjustmentDelta> {
    players
        .iter()
        .map(|ctx| {
            let scoring_reason = match ctx.baseline.pts_blend {
                Some(pts) => format!(
                    "Scoring stays at the blended {:.1} points from recent and season form.",
                    pts
                ),
                None => "No scoring baseline available from form, model, or stored figures."
                    .to_string(),
            };
            AdjustmentDelta {
                player_id: ctx.roster.player_id,
                minutes_delta: 0,
                pts_delta: 0.0,
                reb_delta: 0.0,
                ast_delta: 0.0,
                tags: vec![TAG_BASELINE_ONLY.to_string()],
                reasons: vec![
                    format!(
                        "No contextual interpretation applied; projection holds the {:.1} minute form baseline.",
                        ctx.baseline.minutes_base
                    ),
                    scoring_reason,
                    "Rebounds and assists follow the unadjusted form blend.".to_string(),
                ],
                confidence_override: None,
            }
        })
        .collect()
}
