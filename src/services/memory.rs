use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::core::weights::WeightVector;
use crate::models::{
    LifestyleAttributes, MatchRequest, NewMatchRequest, Profile, ProfileRecord,
    ProfileStatus, RequestStatus, SurveySubmission, WeightRecord,
};
use crate::services::repository::{InsertOutcome, ProfileRepository, RepositoryError};

#[derive(Default)]
struct MemoryState {
    // insertion order doubles as candidate fetch order
    profiles: Vec<Profile>,
    lifestyles: HashMap<Uuid, LifestyleAttributes>,
    weights: HashMap<Uuid, WeightRecord>,
    requests: Vec<MatchRequest>,
    next_request_id: i64,
}

impl MemoryState {
    fn record(&self, profile: &Profile) -> ProfileRecord {
        ProfileRecord {
            profile: profile.clone(),
            lifestyle: self.lifestyles.get(&profile.id).copied(),
            weights: self.weights.get(&profile.id).copied(),
        }
    }

    fn set_status(&mut self, user_id: Uuid, status: ProfileStatus) {
        if let Some(profile) = self.profiles.iter_mut().find(|p| p.id == user_id) {
            profile.status = status;
        }
    }
}

/// Process-local store used when no database is configured, and by tests.
///
/// Every operation runs under one lock, so the conditional writes are atomic
/// the same way the SQL statements are.
#[derive(Default)]
pub struct MemoryRepository {
    state: Mutex<MemoryState>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a profile without touching its weights
    pub async fn insert_profile(&self, profile: Profile, lifestyle: Option<LifestyleAttributes>) {
        let mut state = self.state.lock().await;
        let id = profile.id;
        match state.profiles.iter_mut().find(|p| p.id == id) {
            Some(existing) => *existing = profile,
            None => state.profiles.push(profile),
        }
        match lifestyle {
            Some(life) => {
                state.lifestyles.insert(id, life);
            }
            None => {
                state.lifestyles.remove(&id);
            }
        }
    }

    pub async fn request_count(&self) -> usize {
        self.state.lock().await.requests.len()
    }
}

#[async_trait]
impl ProfileRepository for MemoryRepository {
    async fn get_profile(&self, user_id: Uuid) -> Result<Option<ProfileRecord>, RepositoryError> {
        let state = self.state.lock().await;
        Ok(state
            .profiles
            .iter()
            .find(|p| p.id == user_id)
            .map(|p| state.record(p)))
    }

    async fn find_candidates(&self, requester: &Profile) -> Result<Vec<ProfileRecord>, RepositoryError> {
        let state = self.state.lock().await;
        Ok(state
            .profiles
            .iter()
            .filter(|p| {
                p.id != requester.id
                    && p.gender == requester.gender
                    && p.status == ProfileStatus::Seeking
            })
            .map(|p| state.record(p))
            .collect())
    }

    async fn save_survey(
        &self,
        submission: &SurveySubmission,
        weights: &WeightVector,
    ) -> Result<WeightRecord, RepositoryError> {
        let mut state = self.state.lock().await;
        let id = submission.user_id;

        match state.profiles.iter_mut().find(|p| p.id == id) {
            Some(profile) => {
                profile.nickname = submission.nickname.clone();
                profile.gender = submission.gender;
                profile.status = ProfileStatus::Seeking;
            }
            None => state.profiles.push(Profile {
                id,
                nickname: submission.nickname.clone(),
                gender: submission.gender,
                status: ProfileStatus::Seeking,
                created_at: Utc::now(),
            }),
        }
        state.lifestyles.insert(id, submission.lifestyle);

        let version = state.weights.get(&id).map(|r| r.version + 1).unwrap_or(1);
        let record = WeightRecord {
            weights: *weights,
            calibration_round: 0,
            version,
        };
        state.weights.insert(id, record);

        Ok(record)
    }

    async fn get_weights(&self, user_id: Uuid) -> Result<Option<WeightRecord>, RepositoryError> {
        Ok(self.state.lock().await.weights.get(&user_id).copied())
    }

    async fn store_weights(
        &self,
        user_id: Uuid,
        expected_version: Option<i64>,
        weights: &WeightVector,
        calibration_round: u8,
    ) -> Result<Option<WeightRecord>, RepositoryError> {
        let mut state = self.state.lock().await;

        if !state.profiles.iter().any(|p| p.id == user_id) {
            return Err(RepositoryError::InvalidRow(format!("no profile {} for weight row", user_id)));
        }

        let current_version = state.weights.get(&user_id).map(|r| r.version);
        if current_version != expected_version {
            return Ok(None);
        }

        let record = WeightRecord {
            weights: *weights,
            calibration_round,
            version: current_version.unwrap_or(0) + 1,
        };
        state.weights.insert(user_id, record);

        Ok(Some(record))
    }

    async fn insert_request_if_absent(&self, request: &NewMatchRequest) -> Result<InsertOutcome, RepositoryError> {
        let mut state = self.state.lock().await;

        if let Some(existing) = state
            .requests
            .iter()
            .find(|r| r.status.is_active() && r.involves_pair(request.sender_id, request.receiver_id))
        {
            return Ok(InsertOutcome::Existing(existing.clone()));
        }

        state.next_request_id += 1;
        let inserted = MatchRequest {
            id: state.next_request_id,
            sender_id: request.sender_id,
            receiver_id: request.receiver_id,
            status: RequestStatus::Pending,
            message: request.message.clone(),
            contact: request.contact.clone(),
            created_at: Utc::now(),
        };
        state.requests.push(inserted.clone());

        Ok(InsertOutcome::Inserted(inserted))
    }

    async fn get_request(&self, request_id: i64) -> Result<Option<MatchRequest>, RepositoryError> {
        let state = self.state.lock().await;
        Ok(state.requests.iter().find(|r| r.id == request_id).cloned())
    }

    async fn transition_request(
        &self,
        request_id: i64,
        receiver_id: Uuid,
        status: RequestStatus,
    ) -> Result<Option<MatchRequest>, RepositoryError> {
        let mut state = self.state.lock().await;

        let Some(request) = state.requests.iter_mut().find(|r| {
            r.id == request_id && r.receiver_id == receiver_id && r.status == RequestStatus::Pending
        }) else {
            return Ok(None);
        };
        request.status = status;
        let updated = request.clone();

        if status == RequestStatus::Accepted {
            state.set_status(updated.sender_id, ProfileStatus::Matched);
            state.set_status(updated.receiver_id, ProfileStatus::Matched);
        }

        Ok(Some(updated))
    }

    async fn incoming_requests(&self, receiver_id: Uuid) -> Result<Vec<MatchRequest>, RepositoryError> {
        let state = self.state.lock().await;
        let mut requests: Vec<MatchRequest> = state
            .requests
            .iter()
            .filter(|r| r.receiver_id == receiver_id && r.status != RequestStatus::Rejected)
            .cloned()
            .collect();
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(requests)
    }

    async fn health_check(&self) -> Result<bool, RepositoryError> {
        Ok(true)
    }
}
