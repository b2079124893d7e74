//! Prompt builders for the adjustment interpretation call.
//!
//! The output schema and its hard numeric bounds are stated directly in the
//! instruction; the validator in `parse` enforces the same contract on the
//! way back.

use crate::domain::ContextNotes;
use crate::engine::PlayerContext;

/// System instruction: role, schema, and hard bounds
pub fn system_prompt() -> String {
    r#"You are an NBA minutes and stat-line analyst. Given pre-game baseline projections and free-text context notes, propose small bounded adjustments per player.

Rules:
- minutes_delta: integer in [-6, 6]
- pts_delta: number in [-8, 8]
- reb_delta: number in [-4, 4]
- ast_delta: number in [-4, 4]
- reasons: at least 3 short strings per player, grounded in the notes or the numbers provided
- confidence_override: number in [0.2, 0.95], or null to keep the baseline confidence
- One adjustment entry for EVERY player id listed. No omissions.
- Echo game_id and model_version exactly as given.

Respond ONLY in JSON:
{
  "game_id": "<echo>",
  "model_version": "<echo>",
  "adjustments": [
    {
      "player_id": 0,
      "minutes_delta": 0,
      "pts_delta": 0.0,
      "reb_delta": 0.0,
      "ast_delta": 0.0,
      "tags": ["..."],
      "reasons": ["...", "...", "..."],
      "confidence_override": null
    }
  ]
}"#
    .to_string()
}

fn fmt_opt(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.1}", v),
        None => "n/a".to_string(),
    }
}

/// Assemble the user payload: game metadata, one block per player with
/// baseline blends and supporting recency numbers, then the raw notes.
pub fn build_user_prompt(
    game_id: &str,
    model_version: &str,
    players: &[PlayerContext],
    notes: &ContextNotes,
) -> String {
    let mut prompt = format!(
        "GAME: {game_id}\nMODEL VERSION: {model_version}\nPLAYERS ({count}):\n",
        count = players.len()
    );

    for ctx in players {
        let b = &ctx.baseline;
        let f = &ctx.features;
        prompt.push_str(&format!(
            r#"- player_id {id} | {name} ({team})
  baseline: minutes {minutes:.1}, pts {pts}, reb {reb}, ast {ast}, pra {pra}, confidence {conf:.2}
  recent: pts l5 {pts_l5} / l10 {pts_l10} / season {pts_season}, minutes l10 {min_l10} / season {min_season}
  spread: pts {spread_pts:.1}, reb {spread_reb:.1}, ast {spread_ast:.1}
  schedule: rest {rest}, b2b {b2b}
"#,
            id = ctx.roster.player_id,
            name = ctx.roster.player_name,
            team = ctx.roster.team_abbr,
            minutes = b.minutes_base,
            pts = fmt_opt(b.pts_blend),
            reb = fmt_opt(b.reb_blend),
            ast = fmt_opt(b.ast_blend),
            pra = fmt_opt(b.pra_blend),
            conf = b.confidence,
            pts_l5 = fmt_opt(f.pts.l5),
            pts_l10 = fmt_opt(f.pts.l10),
            pts_season = fmt_opt(f.pts.season),
            min_l10 = fmt_opt(f.minutes.l10),
            min_season = fmt_opt(f.minutes.season),
            spread_pts = b.spread.pts,
            spread_reb = b.spread.reb,
            spread_ast = b.spread.ast,
            rest = f
                .schedule
                .days_rest
                .map(|d| d.to_string())
                .unwrap_or_else(|| "n/a".to_string()),
            b2b = f.schedule.is_back_to_back,
        ));
    }

    if notes.is_empty() {
        prompt.push_str("\nCONTEXT NOTES: none provided.\n");
    } else {
        prompt.push_str(&format!("\nCONTEXT NOTES:\n{}\n", notes.raw()));
    }

    prompt.push_str(
        "\nReturn one adjustment per player id above, inside the declared bounds, JSON only.",
    );
    prompt
}

/// Retry prompt: the original payload plus the rejected response and the
/// specific validation error, so the second attempt can self-correct.
pub fn build_retry_prompt(base_user: &str, prior_raw: &str, error: &str) -> String {
    format!(
        "{base_user}\n\nYOUR PREVIOUS RESPONSE WAS REJECTED.\nResponse:\n{prior_raw}\n\nValidation error: {error}\nReturn corrected JSON only, same schema, all players included."
    )
}
