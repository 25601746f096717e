use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::Gender;

/// Survey submission (first survey or a full re-survey)
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SurveyRequest {
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: Uuid,
    #[validate(length(min = 1, max = 32))]
    pub nickname: String,
    pub gender: Gender,
    pub smoke: bool,
    #[serde(default, alias = "sleep_habit", rename = "sleepHabit")]
    pub sleep_habit: bool,
    #[validate(range(min = 0.0, max = 1.0))]
    #[serde(alias = "sleep_time", rename = "sleepTime")]
    pub sleep_time: f64,
    #[validate(range(min = 0.0, max = 1.0))]
    #[serde(alias = "wake_time", rename = "wakeTime")]
    pub wake_time: f64,
    #[validate(range(min = 0.0, max = 1.0))]
    #[serde(alias = "clean_cycle", rename = "cleanCycle")]
    pub clean_cycle: f64,
    #[validate(range(min = 0.0, max = 1.0))]
    #[serde(default = "neutral")]
    pub hvac: f64,
    #[validate(range(min = 0.0, max = 1.0))]
    #[serde(alias = "sound_sensitivity", rename = "soundSensitivity")]
    pub sound_sensitivity: f64,
    #[validate(range(min = 0.0, max = 1.0))]
    pub outing: f64,
}

fn neutral() -> f64 {
    0.5
}

/// One forced-choice calibration answer
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CalibrationRequest {
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: Uuid,
    /// Round the client is answering, zero-based
    pub round: u8,
    #[serde(alias = "card_id", rename = "cardId")]
    pub card_id: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct FeedbackRequest {
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: Uuid,
    #[validate(length(min = 1, max = 2000))]
    #[serde(alias = "feedback_text", rename = "feedbackText")]
    pub feedback_text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindMatchesRequest {
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: Uuid,
}

/// Roommate request from sender to receiver
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SendRequestRequest {
    #[serde(alias = "sender_id", rename = "senderId")]
    pub sender_id: Uuid,
    #[serde(alias = "receiver_id", rename = "receiverId")]
    pub receiver_id: Uuid,
    #[serde(default)]
    #[validate(length(max = 500))]
    pub message: String,
    #[validate(length(min = 1, max = 100))]
    #[serde(alias = "contact_info", rename = "contactInfo")]
    pub contact_info: String,
}

/// Accept or reject, issued by the receiver
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RespondRequest {
    #[serde(alias = "receiver_id", rename = "receiverId")]
    pub receiver_id: Uuid,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserQuery {
    #[serde(rename = "userId")]
    pub user_id: Uuid,
}
