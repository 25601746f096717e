use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::core::weights::WeightVector;
use crate::models::{
    MatchRequest, NewMatchRequest, Profile, ProfileRecord, RequestStatus, SurveySubmission,
    WeightRecord,
};

/// Errors raised by a profile store
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),

    #[error("Invalid row: {0}")]
    InvalidRow(String),
}

/// Result of the conditional request insert
#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome {
    Inserted(MatchRequest),
    /// An active request for the same unordered pair already exists
    Existing(MatchRequest),
}

/// Narrow read/write contract over the profile, lifestyle, weight and request tables
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Profile joined with its lifestyle and weight rows
    async fn get_profile(&self, user_id: Uuid) -> Result<Option<ProfileRecord>, RepositoryError>;

    /// Seeking profiles of the requester's gender, excluding the requester, in stable fetch order
    async fn find_candidates(&self, requester: &Profile) -> Result<Vec<ProfileRecord>, RepositoryError>;

    /// Overwrite profile and lifestyle, reset weights to `weights` and the calibration round to 0
    async fn save_survey(
        &self,
        submission: &SurveySubmission,
        weights: &WeightVector,
    ) -> Result<WeightRecord, RepositoryError>;

    async fn get_weights(&self, user_id: Uuid) -> Result<Option<WeightRecord>, RepositoryError>;

    /// Write the weight row if its version still equals `expected_version`
    /// (`None` meaning no row exists yet). Returns `None` when another writer got there first.
    async fn store_weights(
        &self,
        user_id: Uuid,
        expected_version: Option<i64>,
        weights: &WeightVector,
        calibration_round: u8,
    ) -> Result<Option<WeightRecord>, RepositoryError>;

    /// Insert a pending request unless an active one exists for the pair, in either direction
    async fn insert_request_if_absent(&self, request: &NewMatchRequest) -> Result<InsertOutcome, RepositoryError>;

    async fn get_request(&self, request_id: i64) -> Result<Option<MatchRequest>, RepositoryError>;

    /// Move a pending request addressed to `receiver_id` to `status`.
    /// Accepting also marks both profiles as matched. Returns `None` if the
    /// request was no longer pending.
    async fn transition_request(
        &self,
        request_id: i64,
        receiver_id: Uuid,
        status: RequestStatus,
    ) -> Result<Option<MatchRequest>, RepositoryError>;

    /// Non-rejected requests addressed to `receiver_id`, newest first
    async fn incoming_requests(&self, receiver_id: Uuid) -> Result<Vec<MatchRequest>, RepositoryError>;

    async fn health_check(&self) -> Result<bool, RepositoryError>;
}
