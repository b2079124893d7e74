//! Baseline assembly: one pre-adjustment packet per roster player.

use tracing::debug;

use crate::domain::{
    BaselinePacket, BaselineSpread, ContextNotes, FormSample, ModelEstimates, PlayerFeatures,
    StatKind,
};
use crate::engine::blend::{blend_minutes, blend_sample, blend_with_ml};

pub const BASE_CONFIDENCE: f64 = 0.75;
pub const THIN_SEASON_GAMES: u32 = 5;
const PENALTY_THIN_SAMPLE: f64 = 0.15;
const PENALTY_MISSING_STAT: f64 = 0.10;
const PENALTY_RESTRICTION_NOTES: f64 = 0.10;
const CONFIDENCE_FLOOR: f64 = 0.2;
const CONFIDENCE_CEIL: f64 = 0.9;

// Spread fallbacks when the L10/season pair is incomplete
const DEFAULT_SPREAD_PTS: f64 = 5.0;
const DEFAULT_SPREAD_OTHER: f64 = 2.5;

/// Recency spread for one stat: how far the last-10 window sits from the
/// season average, floored at 1.0. Falls back to a per-stat default when
/// either window is missing.
pub fn baseline_spread(sample: &FormSample, stat: StatKind) -> f64 {
    match (sample.l10, sample.season) {
        (Some(l10), Some(season)) => (l10 - season).abs().max(1.0),
        _ => match stat {
            StatKind::Pts => DEFAULT_SPREAD_PTS,
            _ => DEFAULT_SPREAD_OTHER,
        },
    }
}

/// Resolve one stat's pre-mix form value: blended windows, then the model
/// mean, then the stored baseline figure, in that priority order.
fn resolve_form(
    features: &PlayerFeatures,
    estimates: &ModelEstimates,
    stat: StatKind,
) -> Option<f64> {
    blend_sample(features.form(stat))
        .or_else(|| estimates.get(stat).map(|e| e.mean))
        .or_else(|| features.stored_baseline(stat))
}

/// Assemble the baseline packet for one player. Pure per-player computation;
/// no player's baseline depends on another's.
pub fn assemble_baseline(
    features: &PlayerFeatures,
    estimates: &ModelEstimates,
    notes: &ContextNotes,
    default_minutes: f64,
) -> BaselinePacket {
    let minutes_base = blend_minutes(&features.minutes).unwrap_or(default_minutes);

    let pts_blend = blend_with_ml(
        resolve_form(features, estimates, StatKind::Pts),
        estimates.get(StatKind::Pts).map(|e| e.mean),
    );
    let reb_blend = blend_with_ml(
        resolve_form(features, estimates, StatKind::Reb),
        estimates.get(StatKind::Reb).map(|e| e.mean),
    );
    let ast_blend = blend_with_ml(
        resolve_form(features, estimates, StatKind::Ast),
        estimates.get(StatKind::Ast).map(|e| e.mean),
    );

    // PRA is the sum of the component blends, never independently blended.
    // Missing components contribute nothing; all-missing propagates None.
    let pra_blend = if pts_blend.is_none() && reb_blend.is_none() && ast_blend.is_none() {
        None
    } else {
        Some(
            pts_blend.unwrap_or(0.0) + reb_blend.unwrap_or(0.0) + ast_blend.unwrap_or(0.0),
        )
    };

    let mut confidence = BASE_CONFIDENCE;
    if features.season_games.unwrap_or(0) < THIN_SEASON_GAMES {
        confidence -= PENALTY_THIN_SAMPLE;
    }
    if pts_blend.is_none() || reb_blend.is_none() || ast_blend.is_none() {
        confidence -= PENALTY_MISSING_STAT;
    }
    if notes.mentions_restriction() {
        confidence -= PENALTY_RESTRICTION_NOTES;
    }
    let confidence = confidence.clamp(CONFIDENCE_FLOOR, CONFIDENCE_CEIL);

    debug!(
        player_id = features.player_id,
        minutes_base,
        confidence,
        "assembled baseline"
    );

    BaselinePacket {
        minutes_base,
        pts_blend,
        reb_blend,
        ast_blend,
        pra_blend,
        confidence,
        spread: BaselineSpread {
            pts: baseline_spread(&features.pts, StatKind::Pts),
            reb: baseline_spread(&features.reb, StatKind::Reb),
            ast: baseline_spread(&features.ast, StatKind::Ast),
        },
    }
}
