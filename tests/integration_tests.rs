// Integration tests for Dorm Match, run against the in-memory store

use async_trait::async_trait;
use dorm_match::core::calibration::default_importance;
use dorm_match::core::{CalibrationEngine, ClampPolicy, FeedbackRelay, MatchOrchestrator, RequestLedger, WeightVector};
use dorm_match::error::{ErrorKind, MatchError};
use dorm_match::models::{
    FeedbackScoreRequest, Gender, LifestyleAttributes, MatchRequest, MatchScoreRequest,
    MatchScoreResponse, NewMatchRequest, Profile, ProfileRecord, ProfileStatus, RequestStatus, ScoredResult,
    SurveySubmission, WeightMap, WeightRecord,
};
use dorm_match::services::{
    InsertOutcome, MemoryRepository, ProfileRepository, RepositoryError, Scorer, ScorerClient, ScorerError,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

/// Scorer double: scores candidates from a table keyed by nickname
struct FakeScorer {
    scores: Vec<(&'static str, f64)>,
    updated_weights: Option<WeightMap>,
    seen: Mutex<Vec<MatchScoreRequest>>,
}

impl FakeScorer {
    fn new(scores: Vec<(&'static str, f64)>) -> Self {
        Self {
            scores,
            updated_weights: None,
            seen: Mutex::new(Vec::new()),
        }
    }

    fn with_updated_weights(mut self, weights: WeightMap) -> Self {
        self.updated_weights = Some(weights);
        self
    }
}

#[async_trait]
impl Scorer for FakeScorer {
    async fn score_matches(&self, request: &MatchScoreRequest) -> Result<MatchScoreResponse, ScorerError> {
        self.seen.lock().unwrap().push(request.clone());
        let results = request
            .candidates
            .iter()
            .filter_map(|c| {
                self.scores
                    .iter()
                    .find(|(name, _)| *name == c.nickname)
                    .map(|(_, score)| ScoredResult {
                        id: None,
                        nickname: Some(c.nickname.clone()),
                        score: *score,
                        risks: vec![format!("{} snores", c.nickname)],
                    })
            })
            .collect();
        Ok(MatchScoreResponse {
            results,
            updated_weights: self.updated_weights.clone(),
        })
    }

    async fn submit_feedback(&self, _request: &FeedbackScoreRequest) -> Result<WeightMap, ScorerError> {
        Err(ScorerError::InvalidResponse("feedback not scripted".into()))
    }
}

/// Store whose weight writes always fail
struct ReadOnlyWeights(MemoryRepository);

#[async_trait]
impl ProfileRepository for ReadOnlyWeights {
    async fn get_profile(&self, user_id: Uuid) -> Result<Option<ProfileRecord>, RepositoryError> {
        self.0.get_profile(user_id).await
    }

    async fn find_candidates(&self, requester: &Profile) -> Result<Vec<ProfileRecord>, RepositoryError> {
        self.0.find_candidates(requester).await
    }

    async fn save_survey(
        &self,
        submission: &SurveySubmission,
        weights: &WeightVector,
    ) -> Result<WeightRecord, RepositoryError> {
        self.0.save_survey(submission, weights).await
    }

    async fn get_weights(&self, user_id: Uuid) -> Result<Option<WeightRecord>, RepositoryError> {
        self.0.get_weights(user_id).await
    }

    async fn store_weights(
        &self,
        _user_id: Uuid,
        _expected_version: Option<i64>,
        _weights: &WeightVector,
        _calibration_round: u8,
    ) -> Result<Option<WeightRecord>, RepositoryError> {
        Err(RepositoryError::InvalidRow("weights table is read-only".into()))
    }

    async fn insert_request_if_absent(&self, request: &NewMatchRequest) -> Result<InsertOutcome, RepositoryError> {
        self.0.insert_request_if_absent(request).await
    }

    async fn get_request(&self, request_id: i64) -> Result<Option<MatchRequest>, RepositoryError> {
        self.0.get_request(request_id).await
    }

    async fn transition_request(
        &self,
        request_id: i64,
        receiver_id: Uuid,
        status: RequestStatus,
    ) -> Result<Option<MatchRequest>, RepositoryError> {
        self.0.transition_request(request_id, receiver_id, status).await
    }

    async fn incoming_requests(&self, receiver_id: Uuid) -> Result<Vec<MatchRequest>, RepositoryError> {
        self.0.incoming_requests(receiver_id).await
    }

    async fn health_check(&self) -> Result<bool, RepositoryError> {
        self.0.health_check().await
    }
}

fn lifestyle(sleep_time: f64) -> LifestyleAttributes {
    LifestyleAttributes {
        sleep_time,
        wake_time: 0.3,
        clean_cycle: 0.7,
        hvac: 0.5,
        sound_sensitivity: 0.6,
        outing: 0.1,
        smoke: false,
        sleep_habit: true,
    }
}

async fn add_profile(repo: &MemoryRepository, nickname: &str, lifestyle: Option<LifestyleAttributes>) -> Uuid {
    let id = Uuid::new_v4();
    repo.insert_profile(
        Profile {
            id,
            nickname: nickname.to_string(),
            gender: Gender::Female,
            status: ProfileStatus::Seeking,
            created_at: chrono::Utc::now(),
        },
        lifestyle,
    )
    .await;
    id
}

async fn survey(engine: &CalibrationEngine, nickname: &str) -> Uuid {
    let user_id = Uuid::new_v4();
    engine
        .submit_survey(SurveySubmission {
            user_id,
            nickname: nickname.to_string(),
            gender: Gender::Female,
            lifestyle: lifestyle(0.8),
        })
        .await
        .unwrap();
    user_id
}

#[tokio::test]
async fn test_integration_calibration_moves_weights_by_importance() {
    let repo = Arc::new(MemoryRepository::new());
    let engine = CalibrationEngine::new(repo.clone(), default_importance(), ClampPolicy::default());
    let user_id = survey(&engine, "minji").await;

    // card 3 shows habit, temp, clean and drink
    let outcome = engine.submit(user_id, 0, 3).await.unwrap();

    assert_eq!(outcome.round, 1);
    assert!(!outcome.complete);
    assert_eq!(outcome.weights.schedule, 1.0);
    assert!((outcome.weights.cleanliness - 1.044).abs() < 1e-9);
    assert!((outcome.weights.habit - 1.034).abs() < 1e-9);
    assert!((outcome.weights.temp - 1.04).abs() < 1e-9);
    assert!((outcome.weights.drink - 1.01).abs() < 1e-9);

    let stored = repo.get_weights(user_id).await.unwrap().unwrap();
    assert_eq!(stored.weights, outcome.weights);
    assert_eq!(stored.calibration_round, 1);
}

#[tokio::test]
async fn test_integration_calibration_terminates_after_three_rounds() {
    let repo = Arc::new(MemoryRepository::new());
    let engine = CalibrationEngine::new(repo.clone(), default_importance(), ClampPolicy::default());
    let user_id = survey(&engine, "minji").await;

    engine.submit(user_id, 0, 2).await.unwrap();
    engine.submit(user_id, 1, 4).await.unwrap();
    let last = engine.submit(user_id, 2, 8).await.unwrap();
    assert!(last.complete);
    assert_eq!(last.round, 3);

    // further submissions change nothing
    let again = engine.submit(user_id, 3, 1).await.unwrap();
    assert!(again.complete);
    assert_eq!(again.weights, last.weights);
    assert!(engine.cards_for(user_id).await.unwrap().cards.is_empty());

    // a new survey starts calibration over
    engine
        .submit_survey(SurveySubmission {
            user_id,
            nickname: "minji".to_string(),
            gender: Gender::Female,
            lifestyle: lifestyle(0.2),
        })
        .await
        .unwrap();
    let cards = engine.cards_for(user_id).await.unwrap();
    assert_eq!(cards.round, 0);
    assert_eq!(repo.get_weights(user_id).await.unwrap().unwrap().weights, WeightVector::default());
}

#[tokio::test]
async fn test_integration_concurrent_calibration_applies_once() {
    let repo = Arc::new(MemoryRepository::new());
    let engine = CalibrationEngine::new(repo.clone(), default_importance(), ClampPolicy::default());
    let user_id = survey(&engine, "minji").await;

    let first = tokio::spawn({
        let engine = engine.clone();
        async move { engine.submit(user_id, 0, 1).await }
    });
    let second = tokio::spawn({
        let engine = engine.clone();
        async move { engine.submit(user_id, 0, 2).await }
    });

    let results = [first.await.unwrap(), second.await.unwrap()];
    let applied = results.iter().filter(|r| r.is_ok()).count();
    let conflicts = results
        .iter()
        .filter(|r| matches!(r, Err(e) if e.kind() == ErrorKind::Conflict))
        .count();

    assert_eq!(applied, 1);
    assert_eq!(conflicts, 1);
    assert_eq!(repo.get_weights(user_id).await.unwrap().unwrap().calibration_round, 1);
}

#[tokio::test]
async fn test_integration_match_round_skips_incomplete_candidates() {
    let repo = Arc::new(MemoryRepository::new());
    let user_id = add_profile(&repo, "me", Some(lifestyle(0.5))).await;
    add_profile(&repo, "x", Some(lifestyle(0.1))).await;
    add_profile(&repo, "half-done", None).await;
    add_profile(&repo, "z", Some(lifestyle(0.9))).await;

    let scorer = Arc::new(FakeScorer::new(vec![("x", 61.0), ("z", 88.5)]));
    let orchestrator = MatchOrchestrator::new(repo.clone(), scorer.clone(), ClampPolicy::default());

    let round = orchestrator.find_matches(user_id).await.unwrap();

    let seen = scorer.seen.lock().unwrap();
    assert_eq!(seen[0].candidates.len(), 2);
    assert_eq!(seen[0].user_profile.nickname, "me");

    let names: Vec<&str> = round.matches.iter().map(|m| m.nickname.as_str()).collect();
    assert_eq!(names, vec!["z", "x"]);
    assert_eq!(round.matches[0].lifestyle, lifestyle(0.9));
    assert_eq!(round.matches[0].risks, vec!["z snores"]);
}

#[tokio::test]
async fn test_integration_match_round_stores_clamped_refinement() {
    let repo = Arc::new(MemoryRepository::new());
    let user_id = add_profile(&repo, "me", Some(lifestyle(0.5))).await;
    add_profile(&repo, "x", Some(lifestyle(0.1))).await;

    let mut refined = WeightMap::new();
    refined.insert("w_clean_cycle".to_string(), 1.6);
    refined.insert("w_smoke".to_string(), 9.0);
    let scorer = Arc::new(FakeScorer::new(vec![("x", 70.0)]).with_updated_weights(refined));
    let orchestrator = MatchOrchestrator::new(repo.clone(), scorer, ClampPolicy::default());

    orchestrator.find_matches(user_id).await.unwrap();

    let stored = repo.get_weights(user_id).await.unwrap().unwrap();
    assert_eq!(stored.weights.cleanliness, 1.6);
    assert_eq!(stored.weights.smoke, 2.0);
    assert_eq!(stored.weights.noise, 1.0);
    assert_eq!(stored.calibration_round, 0);
}

#[tokio::test]
async fn test_integration_failed_weight_write_still_returns_ranking() {
    let inner = MemoryRepository::new();
    let user_id = add_profile(&inner, "me", Some(lifestyle(0.5))).await;
    add_profile(&inner, "x", Some(lifestyle(0.1))).await;
    let repo = Arc::new(ReadOnlyWeights(inner));

    let mut refined = WeightMap::new();
    refined.insert("w_noise".to_string(), 1.5);
    let scorer = Arc::new(FakeScorer::new(vec![("x", 42.0)]).with_updated_weights(refined));
    let orchestrator = MatchOrchestrator::new(repo.clone(), scorer, ClampPolicy::default());

    let round = orchestrator.find_matches(user_id).await.unwrap();

    assert_eq!(round.matches.len(), 1);
    assert_eq!(round.matches[0].score, 42.0);
    assert!(repo.get_weights(user_id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_integration_scorer_timeout_leaves_weights_untouched() {
    // Accepts connections but never answers
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    let repo = Arc::new(MemoryRepository::new());
    let engine = CalibrationEngine::new(repo.clone(), default_importance(), ClampPolicy::default());
    let user_id = survey(&engine, "minji").await;
    add_profile(&repo, "x", Some(lifestyle(0.1))).await;
    let before = repo.get_weights(user_id).await.unwrap();

    let scorer = Arc::new(ScorerClient::new(format!("http://{}", addr), Duration::from_millis(200)).unwrap());
    let orchestrator = MatchOrchestrator::new(repo.clone(), scorer.clone(), ClampPolicy::default());
    let relay = FeedbackRelay::new(repo.clone(), scorer, ClampPolicy::default(), 0.05);

    let err = orchestrator.find_matches(user_id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UpstreamUnavailable);

    let err = relay.submit(user_id, "too warm at night").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UpstreamUnavailable);

    assert_eq!(repo.get_weights(user_id).await.unwrap(), before);
    server.abort();
}

#[tokio::test]
async fn test_integration_reverse_request_while_pending_conflicts() {
    let repo = Arc::new(MemoryRepository::new());
    let a = add_profile(&repo, "a", None).await;
    let b = add_profile(&repo, "b", None).await;
    let ledger = RequestLedger::new(repo.clone());

    ledger.send(a, b, "hello", "kakao:a").await.unwrap();
    let err = ledger.send(b, a, "hello back", "kakao:b").await.unwrap_err();

    assert!(matches!(err, MatchError::DuplicateRequest { existing: RequestStatus::Pending }));
    assert_eq!(repo.request_count().await, 1);
}

#[tokio::test]
async fn test_integration_accept_takes_both_out_of_the_pool() {
    let repo = Arc::new(MemoryRepository::new());
    let a = add_profile(&repo, "a", Some(lifestyle(0.5))).await;
    let b = add_profile(&repo, "b", Some(lifestyle(0.5))).await;
    let c = add_profile(&repo, "c", Some(lifestyle(0.5))).await;
    let ledger = RequestLedger::new(repo.clone());

    let request = ledger.send(a, b, "", "kakao:a").await.unwrap();
    ledger.accept(request.id, b).await.unwrap();

    for id in [a, b] {
        let record = repo.get_profile(id).await.unwrap().unwrap();
        assert_eq!(record.profile.status, ProfileStatus::Matched);
    }

    let requester = repo.get_profile(c).await.unwrap().unwrap();
    let candidates = repo.find_candidates(&requester.profile).await.unwrap();
    assert!(candidates.is_empty());
}

#[tokio::test]
async fn test_integration_concurrent_sends_store_one_request() {
    let repo = Arc::new(MemoryRepository::new());
    let a = add_profile(&repo, "a", None).await;
    let b = add_profile(&repo, "b", None).await;
    let ledger = RequestLedger::new(repo.clone());

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let ledger = ledger.clone();
            let (sender, receiver) = if i % 2 == 0 { (a, b) } else { (b, a) };
            tokio::spawn(async move { ledger.send(sender, receiver, "hi", "@contact").await })
        })
        .collect();

    let mut stored = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            stored += 1;
        }
    }

    assert_eq!(stored, 1);
    assert_eq!(repo.request_count().await, 1);
}
