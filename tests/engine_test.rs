//! End-to-end engine tests over in-memory stores and a scripted generator.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;

use pregame::config::EngineConfig;
use pregame::domain::{FormSample, PlayerFeatures, RosterEntry};
use pregame::{
    FailurePolicy, FeatureStore, MemoryStore, ModelStore, PregameError, ProjectionCache,
    ProjectionEngine, ProjectionRequest, TextGenerator,
};

const GAME: &str = "0022500001";
const MODEL: &str = "xgb_v3";

/// Replays a queue of canned outcomes and counts calls
struct ScriptedGenerator {
    responses: Mutex<VecDeque<Result<String, String>>>,
    calls: AtomicUsize,
}

impl ScriptedGenerator {
    fn new(responses: Vec<Result<String, String>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, _system: &str, _user: &str) -> pregame::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.responses.lock().unwrap().pop_front() {
            Some(Ok(raw)) => Ok(raw),
            Some(Err(message)) => Err(PregameError::Interpreter(message)),
            None => Err(PregameError::Interpreter("script exhausted".to_string())),
        }
    }
}

fn features(player_id: i64) -> PlayerFeatures {
    PlayerFeatures {
        player_id,
        season_games: Some(40),
        minutes: FormSample::new(Some(32.0), Some(34.0), Some(33.0)),
        pts: FormSample::new(Some(24.0), Some(26.0), Some(28.0)),
        reb: FormSample::new(Some(7.0), Some(8.0), Some(6.0)),
        ast: FormSample::new(Some(5.0), Some(4.0), Some(6.0)),
        pra: FormSample::new(Some(36.0), Some(38.0), Some(40.0)),
        ..Default::default()
    }
}

fn seeded_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store.insert_roster(
        GAME,
        vec![
            RosterEntry {
                player_id: 1,
                player_name: "Jordan Smith".to_string(),
                team_abbr: "DEN".to_string(),
            },
            RosterEntry {
                player_id: 2,
                player_name: "Marcus Lee".to_string(),
                team_abbr: "DEN".to_string(),
            },
        ],
    );
    store.insert_features(GAME, features(1));
    store.insert_features(GAME, features(2));
    store.register_model(MODEL);
    store
}

fn engine(
    store: Arc<MemoryStore>,
    generator: Arc<ScriptedGenerator>,
    policy: FailurePolicy,
) -> ProjectionEngine {
    ProjectionEngine::new(
        store.clone() as Arc<dyn FeatureStore>,
        store.clone() as Arc<dyn ModelStore>,
        store as Arc<dyn ProjectionCache>,
        generator,
        EngineConfig::default(),
        policy,
    )
}

fn request(notes: &str) -> ProjectionRequest {
    ProjectionRequest {
        game_id: GAME.to_string(),
        model_version: MODEL.to_string(),
        notes: notes.to_string(),
    }
}

fn adjustment_json(player_id: i64, minutes: i64, pts: f64) -> serde_json::Value {
    json!({
        "player_id": player_id,
        "minutes_delta": minutes,
        "pts_delta": pts,
        "reb_delta": 0.5,
        "ast_delta": -0.5,
        "tags": ["context"],
        "reasons": ["pace expectation", "matchup quality", "recent rotation trend"],
        "confidence_override": null
    })
}

fn valid_response() -> String {
    json!({
        "game_id": GAME,
        "model_version": MODEL,
        "adjustments": [adjustment_json(1, 2, 3.0), adjustment_json(2, -1, -2.0)]
    })
    .to_string()
}

fn mismatched_response() -> String {
    json!({
        "game_id": "wrong-game",
        "model_version": MODEL,
        "adjustments": [adjustment_json(1, 0, 0.0), adjustment_json(2, 0, 0.0)]
    })
    .to_string()
}

fn assert_invariants(response: &pregame::domain::ProjectionResponse) {
    for player in &response.players {
        let line = &player.final_line;
        assert_eq!(line.pra, line.pts + line.reb + line.ast, "pra must be exact");
        assert!((0.0..=42.0).contains(&line.minutes));
        assert!(line.pts >= 0.0 && line.reb >= 0.0 && line.ast >= 0.0 && line.pra >= 0.0);
        assert!((0.2..=0.95).contains(&line.confidence));
    }
}

#[tokio::test]
async fn test_full_flow_applies_adjustments_and_keeps_invariants() {
    let store = seeded_store();
    let generator = Arc::new(ScriptedGenerator::new(vec![Ok(valid_response())]));
    let engine = engine(store, generator.clone(), FailurePolicy::Fallback);

    let response = engine.run(&request("expect a fast pace")).await.unwrap();

    assert_eq!(response.game_id, GAME);
    assert_eq!(response.players.len(), 2);
    assert_invariants(&response);
    assert_eq!(generator.calls(), 1);

    let smith = &response.players[0];
    assert_eq!(smith.llm_adjustments.minutes_delta, 2);
    assert!(!smith.llm_adjustments.is_baseline_only());
    // minutes_base 0.6*34 + 0.4*32 = 33.2, +2, rounded
    assert_eq!(smith.final_line.minutes, 35.0);
}

#[tokio::test]
async fn test_idempotence_cache_hit_skips_generator() {
    let store = seeded_store();
    let generator = Arc::new(ScriptedGenerator::new(vec![Ok(valid_response())]));
    let engine = engine(store.clone(), generator.clone(), FailurePolicy::Fallback);

    let req = request("same notes both times");
    let first = engine.run(&req).await.unwrap();
    let second = engine.run(&req).await.unwrap();

    // byte-identical payloads, one external call total, one cache entry
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
    assert_eq!(generator.calls(), 1);
    assert_eq!(store.cache_len(), 1);
}

#[tokio::test]
async fn test_notes_rewording_is_a_new_cache_entry() {
    let store = seeded_store();
    let generator = Arc::new(ScriptedGenerator::new(vec![
        Ok(valid_response()),
        Ok(valid_response()),
    ]));
    let engine = engine(store.clone(), generator.clone(), FailurePolicy::Fallback);

    engine.run(&request("fast pace expected")).await.unwrap();
    engine.run(&request("expecting a fast pace")).await.unwrap();

    assert_eq!(generator.calls(), 2);
    assert_eq!(store.cache_len(), 2);
}

#[tokio::test]
async fn test_notes_normalization_shares_cache_entry() {
    let store = seeded_store();
    let generator = Arc::new(ScriptedGenerator::new(vec![Ok(valid_response())]));
    let engine = engine(store.clone(), generator.clone(), FailurePolicy::Fallback);

    engine.run(&request("Fast   Pace tonight")).await.unwrap();
    engine.run(&request("  fast pace TONIGHT ")).await.unwrap();

    assert_eq!(generator.calls(), 1);
    assert_eq!(store.cache_len(), 1);
}

#[tokio::test]
async fn test_out_override_zeroes_named_player_only() {
    let store = seeded_store();
    // interpreter even proposes a minutes bump for the player who is out
    let generator = Arc::new(ScriptedGenerator::new(vec![Ok(valid_response())]));
    let engine = engine(store, generator, FailurePolicy::Fallback);

    let response = engine
        .run(&request("Jordan Smith is out tonight"))
        .await
        .unwrap();
    assert_invariants(&response);

    let smith = &response.players[0];
    assert_eq!(smith.final_line.minutes, 0.0);
    assert_eq!(smith.final_line.pts, 0.0);
    assert_eq!(smith.final_line.reb, 0.0);
    assert_eq!(smith.final_line.ast, 0.0);
    assert_eq!(smith.final_line.pra, 0.0);

    let lee = &response.players[1];
    assert!(lee.final_line.minutes > 0.0);
    assert!(lee.final_line.pts > 0.0);
}

#[tokio::test]
async fn test_minutes_limit_override_clamps_exactly() {
    let store = seeded_store();
    let generator = Arc::new(ScriptedGenerator::new(vec![Ok(valid_response())]));
    let engine = engine(store, generator, FailurePolicy::Fallback);

    let response = engine
        .run(&request("minutes limit 18 for Jordan Smith"))
        .await
        .unwrap();
    assert_invariants(&response);

    // pre-override minutes would be 35; clamped to exactly 18, not lower
    assert_eq!(response.players[0].final_line.minutes, 18.0);
    // unrelated player keeps their computed minutes
    assert_eq!(response.players[1].final_line.minutes, 32.0);
}

#[tokio::test]
async fn test_transport_failure_falls_back_to_baseline_only() {
    let store = seeded_store();
    let generator = Arc::new(ScriptedGenerator::new(vec![Err("timeout".to_string())]));
    let engine = engine(store, generator.clone(), FailurePolicy::Fallback);

    let response = engine.run(&request("")).await.unwrap();
    assert_invariants(&response);
    // transport failures are not retried
    assert_eq!(generator.calls(), 1);

    for player in &response.players {
        assert!(player.llm_adjustments.is_baseline_only());
        assert!(player.llm_adjustments.reasons.len() >= 3);
        assert_eq!(player.llm_adjustments.minutes_delta, 0);
        // fallback keeps the baseline line intact
        assert_eq!(player.final_line.minutes, player.baseline.minutes_base.round());
    }
}

#[tokio::test]
async fn test_validation_failure_retries_once_then_succeeds() {
    let store = seeded_store();
    let generator = Arc::new(ScriptedGenerator::new(vec![
        Ok(mismatched_response()),
        Ok(valid_response()),
    ]));
    let engine = engine(store, generator.clone(), FailurePolicy::Fallback);

    let response = engine.run(&request("")).await.unwrap();
    assert_eq!(generator.calls(), 2);
    // the retry was accepted, not degraded
    assert!(!response.players[0].llm_adjustments.is_baseline_only());
}

#[tokio::test]
async fn test_fallback_policy_degrades_after_failed_retry() {
    let store = seeded_store();
    let generator = Arc::new(ScriptedGenerator::new(vec![
        Ok(mismatched_response()),
        Ok(mismatched_response()),
    ]));
    let engine = engine(store, generator.clone(), FailurePolicy::Fallback);

    let response = engine.run(&request("")).await.unwrap();
    assert_eq!(generator.calls(), 2);
    assert_invariants(&response);
    assert!(response
        .players
        .iter()
        .all(|p| p.llm_adjustments.is_baseline_only()));
}

#[tokio::test]
async fn test_strict_policy_fails_after_failed_retry() {
    let store = seeded_store();
    let generator = Arc::new(ScriptedGenerator::new(vec![
        Ok(mismatched_response()),
        Ok(mismatched_response()),
    ]));
    let engine = engine(store.clone(), generator.clone(), FailurePolicy::Strict);

    let err = engine.run(&request("")).await.unwrap_err();
    assert_eq!(generator.calls(), 2);
    match err {
        PregameError::InterpreterValidation(message) => {
            assert!(message.contains("game_id mismatch"));
        }
        other => panic!("expected InterpreterValidation, got {other}"),
    }
    // a failed request writes nothing
    assert_eq!(store.cache_len(), 0);
}

#[tokio::test]
async fn test_strict_policy_surfaces_transport_failure_without_retry() {
    let store = seeded_store();
    let generator = Arc::new(ScriptedGenerator::new(vec![Err("503".to_string())]));
    let engine = engine(store, generator.clone(), FailurePolicy::Strict);

    let err = engine.run(&request("")).await.unwrap_err();
    assert_eq!(generator.calls(), 1);
    assert!(matches!(err, PregameError::Interpreter(_)));
}

#[tokio::test]
async fn test_invalid_request_rejected_before_any_call() {
    let store = seeded_store();
    let generator = Arc::new(ScriptedGenerator::new(vec![Ok(valid_response())]));
    let engine = engine(store, generator.clone(), FailurePolicy::Fallback);

    let mut req = request("");
    req.game_id = "  ".to_string();
    let err = engine.run(&req).await.unwrap_err();
    assert!(matches!(err, PregameError::InvalidRequest(_)));
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn test_empty_roster_is_upstream_error() {
    let store = Arc::new(MemoryStore::new());
    let generator = Arc::new(ScriptedGenerator::new(vec![Ok(valid_response())]));
    let engine = engine(store, generator.clone(), FailurePolicy::Fallback);

    let err = engine.run(&request("")).await.unwrap_err();
    assert!(matches!(err, PregameError::UpstreamData(_)));
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn test_cached_lookup_never_computes() {
    let store = seeded_store();
    let generator = Arc::new(ScriptedGenerator::new(vec![Ok(valid_response())]));
    let engine = engine(store, generator.clone(), FailurePolicy::Fallback);

    let req = request("");
    assert!(engine.cached(&req).await.unwrap().is_none());
    assert_eq!(generator.calls(), 0);

    engine.run(&req).await.unwrap();
    let cached = engine.cached(&req).await.unwrap().unwrap();
    assert_eq!(cached.players.len(), 2);
    assert_eq!(generator.calls(), 1);
}
