//! Final composition: apply validated deltas, enforce bounds, apply hard
//! text-derived overrides, and re-derive PRA.
//!
//! This is the last line of defense against out-of-range or inconsistent
//! output; re-clamping and PRA re-derivation run even when the upstream
//! values already look valid.

use tracing::debug;

use crate::domain::{AdjustmentDelta, ContextNotes, FinalLine, CONFIDENCE_RANGE, MINUTES_RANGE};
use crate::engine::PlayerContext;

/// Compose one player's final line from their baseline and an accepted (or
/// fallback) adjustment. Returns the line plus the explanation strings for
/// the response payload.
pub fn compose_final(
    ctx: &PlayerContext,
    adjustment: &AdjustmentDelta,
    notes: &ContextNotes,
) -> (FinalLine, Vec<String>) {
    let adj = adjustment.clone().clamped();
    let baseline = &ctx.baseline;
    let name = &ctx.roster.player_name;

    let mut minutes =
        (baseline.minutes_base + f64::from(adj.minutes_delta)).round().clamp(MINUTES_RANGE.0, MINUTES_RANGE.1);
    let mut pts = (baseline.pts_blend.unwrap_or(0.0) + adj.pts_delta).max(0.0);
    let mut reb = (baseline.reb_blend.unwrap_or(0.0) + adj.reb_delta).max(0.0);
    let mut ast = (baseline.ast_blend.unwrap_or(0.0) + adj.ast_delta).max(0.0);

    let mut explanations = adj.reasons.clone();

    // Hard overrides run after delta application: minutes limit first, an
    // explicit out ruling second (and it wins).
    if let Some(limit) = notes.minutes_limit_for(name) {
        let cap = f64::from(limit).clamp(MINUTES_RANGE.0, MINUTES_RANGE.1);
        if minutes > cap {
            debug!(player_id = ctx.roster.player_id, limit, "minutes limit override");
            minutes = cap;
        }
        explanations.push(format!("Minutes capped at {limit} per context notes."));
    }
    if notes.declares_out(name) {
        debug!(player_id = ctx.roster.player_id, "out override, zeroing line");
        minutes = 0.0;
        pts = 0.0;
        reb = 0.0;
        ast = 0.0;
        explanations.push("Listed out in context notes; full line zeroed.".to_string());
    }

    // PRA is always re-derived, never taken from the interpreter
    let pra = pts + reb + ast;

    let confidence = adj
        .confidence_override
        .map(|c| c.clamp(CONFIDENCE_RANGE.0, CONFIDENCE_RANGE.1))
        .unwrap_or(baseline.confidence);

    if pts > 0.0 {
        explanations.push(format!(
            "Points range roughly {:.0}-{:.0} on recent spread.",
            (pts - baseline.spread.pts).max(0.0),
            pts + baseline.spread.pts
        ));
    }

    (
        FinalLine {
            minutes,
            pts,
            reb,
            ast,
            pra,
            confidence,
        },
        explanations,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        BaselinePacket, BaselineSpread, ModelEstimates, PlayerFeatures, RosterEntry,
    };

    const EPS: f64 = 1e-9;

    fn context(name: &str) -> PlayerContext {
        PlayerContext {
            roster: RosterEntry {
                player_id: 203999,
                player_name: name.to_string(),
                team_abbr: "DEN".to_string(),
            },
            features: PlayerFeatures {
                player_id: 203999,
                ..Default::default()
            },
            estimates: ModelEstimates::default(),
            baseline: BaselinePacket {
                minutes_base: 34.0,
                pts_blend: Some(25.0),
                reb_blend: Some(6.0),
                ast_blend: Some(4.0),
                pra_blend: Some(35.0),
                confidence: 0.75,
                spread: BaselineSpread { pts: 3.0, reb: 1.5, ast: 1.0 },
            },
        }
    }

    fn adjustment(minutes: i32, pts: f64, reb: f64, ast: f64) -> AdjustmentDelta {
        AdjustmentDelta {
            player_id: 203999,
            minutes_delta: minutes,
            pts_delta: pts,
            reb_delta: reb,
            ast_delta: ast,
            tags: Vec::new(),
            reasons: vec![
                "a".to_string(),
                "b".to_string(),
                "c".to_string(),
            ],
            confidence_override: None,
        }
    }

    #[test]
    fn test_deltas_applied_and_pra_recomputed() {
        let ctx = context("Jordan Smith");
        let notes = ContextNotes::new("");
        let (line, _) = compose_final(&ctx, &adjustment(2, 3.0, -1.0, 0.5), &notes);

        assert_eq!(line.minutes, 36.0);
        assert!((line.pts - 28.0).abs() < EPS);
        assert!((line.reb - 5.0).abs() < EPS);
        assert!((line.ast - 4.5).abs() < EPS);
        assert!((line.pra - (line.pts + line.reb + line.ast)).abs() < EPS);
    }

    #[test]
    fn test_out_of_range_deltas_reclamped() {
        let ctx = context("Jordan Smith");
        let notes = ContextNotes::new("");
        // interpreter bounds cannot be trusted: +20 minutes, -30 points
        let (line, _) = compose_final(&ctx, &adjustment(20, -30.0, 0.0, 0.0), &notes);

        assert_eq!(line.minutes, 40.0); // 34 + clamped 6
        assert!((line.pts - 17.0).abs() < EPS); // 25 - clamped 8
    }

    #[test]
    fn test_negative_results_floor_at_zero() {
        let mut ctx = context("Jordan Smith");
        ctx.baseline.pts_blend = Some(3.0);
        ctx.baseline.minutes_base = 2.0;
        let notes = ContextNotes::new("");
        let (line, _) = compose_final(&ctx, &adjustment(-6, -8.0, -4.0, -4.0), &notes);

        assert_eq!(line.minutes, 0.0);
        assert_eq!(line.pts, 0.0);
        assert_eq!(line.reb, 2.0);
        assert_eq!(line.ast, 0.0);
        assert!((line.pra - 2.0).abs() < EPS);
    }

    #[test]
    fn test_out_override_zeroes_line_regardless_of_deltas() {
        let ctx = context("Jordan Smith");
        let notes = ContextNotes::new("Jordan Smith is out tonight");
        let (line, explanations) = compose_final(&ctx, &adjustment(6, 8.0, 4.0, 4.0), &notes);

        assert_eq!(line.minutes, 0.0);
        assert_eq!(line.pts, 0.0);
        assert_eq!(line.reb, 0.0);
        assert_eq!(line.ast, 0.0);
        assert_eq!(line.pra, 0.0);
        assert!(explanations.iter().any(|e| e.contains("zeroed")));
    }

    #[test]
    fn test_out_override_ignores_other_players() {
        let ctx = context("Marcus Lee");
        let notes = ContextNotes::new("Jordan Smith is out tonight");
        let (line, _) = compose_final(&ctx, &adjustment(0, 0.0, 0.0, 0.0), &notes);

        assert!(line.minutes > 0.0);
        assert!(line.pts > 0.0);
    }

    #[test]
    fn test_minutes_limit_clamps_down_only() {
        let ctx = context("Jordan Smith");
        let notes = ContextNotes::new("minutes limit 18 for Jordan Smith");
        let (line, _) = compose_final(&ctx, &adjustment(0, 0.0, 0.0, 0.0), &notes);
        assert_eq!(line.minutes, 18.0);

        // already below the limit: not raised, not lowered further
        let mut low = context("Jordan Smith");
        low.baseline.minutes_base = 12.0;
        let (line, _) = compose_final(&low, &adjustment(0, 0.0, 0.0, 0.0), &notes);
        assert_eq!(line.minutes, 12.0);
    }

    #[test]
    fn test_out_wins_over_minutes_limit() {
        let ctx = context("Jordan Smith");
        let notes =
            ContextNotes::new("minutes limit 18 for Jordan Smith, now ruled out entirely");
        let (line, _) = compose_final(&ctx, &adjustment(0, 0.0, 0.0, 0.0), &notes);
        assert_eq!(line.minutes, 0.0);
        assert_eq!(line.pra, 0.0);
    }

    #[test]
    fn test_confidence_override_clamped() {
        let ctx = context("Jordan Smith");
        let notes = ContextNotes::new("");

        let mut adj = adjustment(0, 0.0, 0.0, 0.0);
        adj.confidence_override = Some(0.99);
        let (line, _) = compose_final(&ctx, &adj, &notes);
        assert!((line.confidence - 0.95).abs() < EPS);

        adj.confidence_override = Some(0.05);
        let (line, _) = compose_final(&ctx, &adj, &notes);
        assert!((line.confidence - 0.2).abs() < EPS);

        adj.confidence_override = None;
        let (line, _) = compose_final(&ctx, &adj, &notes);
        assert!((line.confidence - 0.75).abs() < EPS);
    }

    #[test]
    fn test_missing_blends_contribute_zero() {
        let mut ctx = context("Jordan Smith");
        ctx.baseline.pts_blend = None;
        ctx.baseline.ast_blend = None;
        let notes = ContextNotes::new("");
        let (line, _) = compose_final(&ctx, &adjustment(0, 2.0, 0.0, 0.0), &notes);

        assert!((line.pts - 2.0).abs() < EPS);
        assert!((line.reb - 6.0).abs() < EPS);
        assert_eq!(line.ast, 0.0);
        assert!((line.pra - 8.0).abs() < EPS);
    }

    #[test]
    fn test_explanations_carry_reasons_and_range() {
        let ctx = context("Jordan Smith");
        let notes = ContextNotes::new("");
        let (_, explanations) = compose_final(&ctx, &adjustment(0, 0.0, 0.0, 0.0), &notes);

        assert!(explanations.len() >= 4);
        assert!(explanations.iter().any(|e| e.contains("range")));
    }
}
