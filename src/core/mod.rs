// Core engine exports
pub mod calibration;
pub mod feedback;
pub mod ledger;
pub mod mapping;
pub mod orchestrator;
pub mod weights;

pub use calibration::{CalibrationEngine, CalibrationOutcome, CardSet, PersonaCard, CALIBRATION_ROUNDS, TOTAL_ROUNDS};
pub use feedback::FeedbackRelay;
pub use ledger::RequestLedger;
pub use mapping::{build_profile_payload, from_scorer_weights, to_scorer_weights, PayloadDefaults, FIELD_MAP};
pub use orchestrator::{merge_ranked, MatchOrchestrator, MatchRound, PoolEntry};
pub use weights::{apply_weight_update, update_weights, ClampPolicy, Dimension, WeightUpdate, WeightVector};
