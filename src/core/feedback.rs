use std::sync::Arc;
use uuid::Uuid;

use crate::core::mapping::{build_profile_payload, from_scorer_weights, PayloadDefaults};
use crate::core::weights::{update_weights, ClampPolicy, WeightPlan, WeightUpdate, WeightVector};
use crate::error::MatchError;
use crate::models::FeedbackScoreRequest;
use crate::services::{ProfileRepository, Scorer};

/// Score attached to free-text feedback, which carries no rating of its own
const NEUTRAL_SCORE: f64 = 0.5;
const NEUTRAL_LABEL: u8 = 0;

/// Relays free-text feedback to the scorer and stores the weights it sends back
#[derive(Clone)]
pub struct FeedbackRelay {
    repo: Arc<dyn ProfileRepository>,
    scorer: Arc<dyn Scorer>,
    policy: ClampPolicy,
    defaults: PayloadDefaults,
    eta: f64,
}

impl FeedbackRelay {
    pub fn new(
        repo: Arc<dyn ProfileRepository>,
        scorer: Arc<dyn Scorer>,
        policy: ClampPolicy,
        eta: f64,
    ) -> Self {
        Self {
            repo,
            scorer,
            policy,
            defaults: PayloadDefaults::default(),
            eta,
        }
    }

    /// Submit feedback for `user_id` and persist the scorer's replacement weights.
    ///
    /// The user's own profile is sent as both `user_profile` and
    /// `target_profile`: the feedback is about the user's preferences, not
    /// about a particular roommate. Nothing is written unless the scorer answers.
    pub async fn submit(&self, user_id: Uuid, feedback_text: &str) -> Result<WeightVector, MatchError> {
        let feedback_text = feedback_text.trim();
        if feedback_text.is_empty() {
            return Err(MatchError::ValidationFailed("feedback text must not be empty".into()));
        }

        let record = self
            .repo
            .get_profile(user_id)
            .await?
            .ok_or_else(|| MatchError::NotFound(format!("profile {} not found", user_id)))?;

        tracing::info!("Feedback received from {} ({} chars)", user_id, feedback_text.chars().count());

        let payload = build_profile_payload(&record, &self.defaults);
        let request = FeedbackScoreRequest {
            user_profile: payload.clone(),
            target_profile: payload,
            score: NEUTRAL_SCORE,
            label: NEUTRAL_LABEL,
            review_text: feedback_text.to_string(),
            eta: self.eta,
        };

        let returned = self.scorer.submit_feedback(&request).await.map_err(|e| {
            tracing::error!("Scorer feedback call failed for {}: {}", user_id, e);
            MatchError::from(e)
        })?;

        let stored = update_weights(self.repo.as_ref(), user_id, &self.policy, |current, round| {
            Ok(WeightPlan::Apply {
                update: WeightUpdate::Replace(from_scorer_weights(&returned, current)),
                round,
            })
        })
        .await?;

        tracing::info!("Feedback weights stored for {}: {:?}", user_id, stored.weights);

        Ok(stored.weights)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        Gender, MatchScoreRequest, MatchScoreResponse, Profile, ProfileStatus, WeightMap,
    };
    use crate::services::{MemoryRepository, ScorerError};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct RecordingScorer {
        reply: Option<WeightMap>,
        seen: Mutex<Vec<FeedbackScoreRequest>>,
    }

    #[async_trait]
    impl Scorer for RecordingScorer {
        async fn score_matches(&self, _request: &MatchScoreRequest) -> Result<MatchScoreResponse, ScorerError> {
            Err(ScorerError::InvalidResponse("not used".into()))
        }

        async fn submit_feedback(&self, request: &FeedbackScoreRequest) -> Result<WeightMap, ScorerError> {
            self.seen.lock().unwrap().push(request.clone());
            self.reply.clone().ok_or(ScorerError::ApiError {
                status: 500,
                body: "boom".into(),
            })
        }
    }

    async fn setup(reply: Option<WeightMap>) -> (FeedbackRelay, Arc<MemoryRepository>, Arc<RecordingScorer>, Uuid) {
        let repo = Arc::new(MemoryRepository::new());
        let user_id = Uuid::new_v4();
        repo.insert_profile(
            Profile {
                id: user_id,
                nickname: "minji".to_string(),
                gender: Gender::Female,
                status: ProfileStatus::Seeking,
                created_at: chrono::Utc::now(),
            },
            None,
        )
        .await;
        let scorer = Arc::new(RecordingScorer { reply, seen: Mutex::new(Vec::new()) });
        let relay = FeedbackRelay::new(repo.clone(), scorer.clone(), ClampPolicy::default(), 0.05);
        (relay, repo, scorer, user_id)
    }

    #[tokio::test]
    async fn test_feedback_replaces_and_clamps_weights() {
        let mut reply = WeightMap::new();
        reply.insert("w_sleep".to_string(), 1.4);
        reply.insert("w_noise".to_string(), 5.0);
        reply.insert("w_outing".to_string(), -1.0);

        let (relay, repo, scorer, user_id) = setup(Some(reply)).await;
        let weights = relay.submit(user_id, "my roommate snored all night").await.unwrap();

        assert_eq!(weights.schedule, 1.4);
        assert_eq!(weights.noise, 2.0);
        assert_eq!(weights.drink, 0.1);
        assert_eq!(weights.smoke, 1.0);

        let stored = repo.get_weights(user_id).await.unwrap().unwrap();
        assert_eq!(stored.weights, weights);

        let seen = scorer.seen.lock().unwrap();
        assert_eq!(seen[0].user_profile, seen[0].target_profile);
        assert_eq!(seen[0].score, 0.5);
        assert_eq!(seen[0].label, 0);
        assert_eq!(seen[0].eta, 0.05);
    }

    #[tokio::test]
    async fn test_scorer_failure_writes_nothing() {
        let (relay, repo, _scorer, user_id) = setup(None).await;

        let err = relay.submit(user_id, "too cold").await.unwrap_err();

        assert!(matches!(err, MatchError::UpstreamUnavailable(_)));
        assert!(repo.get_weights(user_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_blank_feedback_rejected_before_scorer() {
        let (relay, _repo, scorer, user_id) = setup(Some(WeightMap::new())).await;

        let err = relay.submit(user_id, "   ").await.unwrap_err();

        assert!(matches!(err, MatchError::ValidationFailed(_)));
        assert!(scorer.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_user_not_found() {
        let (relay, _repo, _scorer, _) = setup(Some(WeightMap::new())).await;

        let err = relay.submit(Uuid::new_v4(), "hello").await.unwrap_err();
        assert!(matches!(err, MatchError::NotFound(_)));
    }
}
