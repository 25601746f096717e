//! Wire types of the external scorer service.
//!
//! Weights travel under the scorer's `w_*` names; translation to and from the
//! stored `pref_*` names lives in [`crate::core::mapping`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::models::Gender;

/// Weight vector keyed by scorer field name (`w_sleep`, `w_hvac`, ...)
pub type WeightMap = BTreeMap<String, f64>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SleepHabit {
    Yes,
    No,
}

/// Profile as the scorer expects it: identity, lifestyle values and current weights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfilePayload {
    pub id: Uuid,
    pub nickname: String,
    pub gender: Gender,
    pub smoke: bool,
    pub sleep_habit: SleepHabit,
    pub sleep_time_val: f64,
    pub wake_time_val: f64,
    pub clean_cycle_val: f64,
    pub hvac_val: f64,
    pub alarm_val: f64,
    pub outing_val: f64,
    #[serde(flatten)]
    pub weights: WeightMap,
    pub block_smoke: bool,
    pub block_sleep_habit: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchScoreRequest {
    pub user_profile: ProfilePayload,
    pub candidates: Vec<ProfilePayload>,
}

/// One scored candidate. The scorer identifies candidates by id, nickname, or both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredResult {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub nickname: Option<String>,
    pub score: f64,
    #[serde(default)]
    pub risks: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchScoreResponse {
    pub results: Vec<ScoredResult>,
    #[serde(default)]
    pub updated_weights: Option<WeightMap>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackScoreRequest {
    pub user_profile: ProfilePayload,
    pub target_profile: ProfilePayload,
    pub score: f64,
    pub label: u8,
    pub review_text: String,
    pub eta: f64,
}
