use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::calibration::PersonaCard;
use crate::core::weights::WeightVector;
use crate::models::domain::{
    Gender, LifestyleAttributes, MatchRequest, ProfileRecord, RankedCandidate, RequestStatus,
};

/// Response for the match endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindMatchesResponse {
    pub matches: Vec<RankedCandidate>,
    pub total_results: usize,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurveyResponse {
    pub success: bool,
    pub weights: WeightVector,
}

/// Cards offered for the user's current round; empty once calibration is complete
#[derive(Debug, Clone, Serialize)]
pub struct CardsResponse {
    pub round: u8,
    pub total_rounds: u8,
    pub complete: bool,
    pub cards: Vec<PersonaCard>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationResponse {
    pub round: u8,
    pub complete: bool,
    pub weights: WeightVector,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackResponse {
    pub success: bool,
    pub weights: WeightVector,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendRequestResponse {
    pub success: bool,
    pub request: MatchRequest,
}

/// Sender details shown next to an incoming request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SenderSummary {
    pub nickname: String,
    pub gender: Gender,
    /// Absent until the sender has completed the survey
    pub lifestyle: Option<LifestyleAttributes>,
}

impl From<&ProfileRecord> for SenderSummary {
    fn from(record: &ProfileRecord) -> Self {
        Self {
            nickname: record.profile.nickname.clone(),
            gender: record.profile.gender,
            lifestyle: record.lifestyle,
        }
    }
}

/// Request as the receiver sees it. The contact is withheld until the request is accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomingRequest {
    pub id: i64,
    #[serde(rename = "senderId")]
    pub sender_id: Uuid,
    pub sender: Option<SenderSummary>,
    pub status: RequestStatus,
    pub message: String,
    pub contact: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl IncomingRequest {
    pub fn new(request: MatchRequest, sender: Option<SenderSummary>) -> Self {
        let contact = (request.status == RequestStatus::Accepted).then_some(request.contact);
        Self {
            id: request.id,
            sender_id: request.sender_id,
            sender,
            status: request.status,
            message: request.message,
            contact,
            created_at: request.created_at,
        }
    }
}
