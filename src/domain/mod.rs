pub mod notes;
pub mod projection;
pub mod stat;

pub use notes::ContextNotes;
pub use projection::{
    AdjustmentDelta, BaselinePacket, BaselineSpread, ConfidenceTier, FinalLine, PlayerProjection,
    ProjectionResponse, AST_DELTA_RANGE, CONFIDENCE_RANGE, MINUTES_DELTA_RANGE, MINUTES_RANGE,
    MIN_REASONS, PTS_DELTA_RANGE, REB_DELTA_RANGE, TAG_BASELINE_ONLY,
};
pub use stat::{
    FormSample, ModelEstimate, ModelEstimates, PlayerFeatures, RosterEntry, ScheduleContext,
    StatKind, StoredBaselines,
};
