//! Form blending: rolling-window weighted averages and the form/model mix.

use crate::domain::{FormSample, MINUTES_RANGE};

// Window weights for the season/L10/L5 blend
pub const W_SEASON: f64 = 0.55;
pub const W_L10: f64 = 0.30;
pub const W_L5: f64 = 0.15;

// Form-majority mix: recent observable form outweighs the model 7:3
pub const W_FORM: f64 = 0.7;
pub const W_ML: f64 = 0.3;

// Minutes projection weights (L10-heavy)
pub const W_MIN_L10: f64 = 0.6;
pub const W_MIN_SEASON: f64 = 0.4;

/// Weighted season/L10/L5 blend with an explicit fallback chain: a missing
/// shorter-window slot takes the next-longer window's value (and a missing
/// season slot borrows the longest window available). Returns `None` only
/// when all three observations are absent. This is slot substitution, not
/// zero-fill: a player with only a season average gets exactly that average.
pub fn blend_form(season: Option<f64>, l10: Option<f64>, l5: Option<f64>) -> Option<f64> {
    if season.is_none() && l10.is_none() && l5.is_none() {
        return None;
    }
    let season_slot = season.or(l10).or(l5)?;
    let l10_slot = l10.or(season).or(l5)?;
    let l5_slot = l5.or(Some(l10_slot))?;
    Some(W_SEASON * season_slot + W_L10 * l10_slot + W_L5 * l5_slot)
}

/// Blend a sample's windows
pub fn blend_sample(sample: &FormSample) -> Option<f64> {
    blend_form(sample.season, sample.l10, sample.l5)
}

/// Mix a form estimate with a model mean when both exist; a lone value
/// passes through unchanged.
pub fn blend_with_ml(form: Option<f64>, ml_mean: Option<f64>) -> Option<f64> {
    match (form, ml_mean) {
        (Some(f), Some(m)) => Some(W_FORM * f + W_ML * m),
        (Some(f), None) => Some(f),
        (None, Some(m)) => Some(m),
        (None, None) => None,
    }
}

/// Projected minutes from L10/season figures, clamped to the playable
/// range. A missing figure borrows the other slot. `None` when neither
/// window exists (the caller substitutes the configured default).
pub fn blend_minutes(minutes: &FormSample) -> Option<f64> {
    let l10_slot = minutes.l10.or(minutes.season);
    let season_slot = minutes.season.or(minutes.l10);
    match (l10_slot, season_slot) {
        (Some(l10), Some(season)) => {
            Some((W_MIN_L10 * l10 + W_MIN_SEASON * season).clamp(MINUTES_RANGE.0, MINUTES_RANGE.1))
        }
        _ => None,
    }
}
