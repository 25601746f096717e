//! Dorm Match - roommate matching service for dormitory residents
//!
//! Residents fill in a lifestyle survey, calibrate how much each habit matters
//! to them through three forced-choice card rounds, and receive candidates
//! ranked by an external compatibility scorer. Accepted roommate requests
//! close the search for both sides.

pub mod config;
pub mod core;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use core::{CalibrationEngine, ClampPolicy, FeedbackRelay, MatchOrchestrator, RequestLedger, WeightVector};
pub use error::{ErrorKind, MatchError};
pub use services::{MemoryRepository, PostgresRepository, ProfileRepository, Scorer, ScorerClient};
