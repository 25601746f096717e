use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::core::weights::WeightVector;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "gender", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

/// Matching status of a profile. Profiles are never deleted, only moved between states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "profile_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ProfileStatus {
    Seeking,
    Matched,
    Paused,
}

/// User profile as stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub nickname: String,
    pub gender: Gender,
    pub status: ProfileStatus,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// Survey answers, each scalar normalized to [0.0, 1.0]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LifestyleAttributes {
    pub sleep_time: f64,
    pub wake_time: f64,
    pub clean_cycle: f64,
    pub hvac: f64,
    pub sound_sensitivity: f64,
    pub outing: f64,
    pub smoke: bool,
    #[serde(default)]
    pub sleep_habit: bool,
}

/// Persisted weight row: the vector, the calibration round and its write version
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightRecord {
    pub weights: WeightVector,
    pub calibration_round: u8,
    pub version: i64,
}

/// A profile joined with its lifestyle and weight rows, as the store returns it
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileRecord {
    pub profile: Profile,
    pub lifestyle: Option<LifestyleAttributes>,
    pub weights: Option<WeightRecord>,
}

/// Everything written by one survey submission
#[derive(Debug, Clone)]
pub struct SurveySubmission {
    pub user_id: Uuid,
    pub nickname: String,
    pub gender: Gender,
    pub lifestyle: LifestyleAttributes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "request_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Accepted,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Accepted => "accepted",
            RequestStatus::Rejected => "rejected",
        }
    }

    /// Pending and accepted requests block a new request between the same pair
    pub fn is_active(&self) -> bool {
        matches!(self, RequestStatus::Pending | RequestStatus::Accepted)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Roommate request handshake between two profiles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRequest {
    pub id: i64,
    #[serde(rename = "senderId")]
    pub sender_id: Uuid,
    #[serde(rename = "receiverId")]
    pub receiver_id: Uuid,
    pub status: RequestStatus,
    pub message: String,
    pub contact: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl MatchRequest {
    /// True when both requests concern the same unordered pair of users
    pub fn involves_pair(&self, a: Uuid, b: Uuid) -> bool {
        (self.sender_id == a && self.receiver_id == b)
            || (self.sender_id == b && self.receiver_id == a)
    }
}

#[derive(Debug, Clone)]
pub struct NewMatchRequest {
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub message: String,
    pub contact: String,
}

/// Candidate returned by a match round: persisted fields plus the scorer's verdict
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCandidate {
    pub id: Uuid,
    pub nickname: String,
    pub gender: Gender,
    pub lifestyle: LifestyleAttributes,
    pub score: f64,
    pub risks: Vec<String>,
}
