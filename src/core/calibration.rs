use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::core::weights::{update_weights, ClampPolicy, WeightPlan, WeightUpdate, WeightVector};
use crate::error::MatchError;
use crate::models::{SurveySubmission, WeightRecord};
use crate::services::ProfileRepository;

/// Display labels printed on a persona card
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CardTags {
    pub sleep: &'static str,
    pub smoke: &'static str,
    pub habit: &'static str,
    pub temp: &'static str,
    pub clean: &'static str,
    pub drink: &'static str,
    pub noise: &'static str,
}

/// 1 when the persona shows the trait strongly, 0 when absent or neutral
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CardAttributes {
    pub sleep: u8,
    pub smoke: u8,
    pub habit: u8,
    pub temp: u8,
    pub clean: u8,
    pub noise: u8,
    pub drink: u8,
}

impl CardAttributes {
    fn as_vector(&self) -> WeightVector {
        WeightVector {
            schedule: f64::from(self.sleep),
            smoke: f64::from(self.smoke),
            habit: f64::from(self.habit),
            temp: f64::from(self.temp),
            cleanliness: f64::from(self.clean),
            noise: f64::from(self.noise),
            drink: f64::from(self.drink),
        }
    }
}

/// A forced-choice card the user picks during calibration
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PersonaCard {
    pub id: u32,
    pub tags: CardTags,
    pub attributes: CardAttributes,
}

const fn card(id: u32, tags: CardTags, a: [u8; 7]) -> PersonaCard {
    PersonaCard {
        id,
        tags,
        attributes: CardAttributes {
            sleep: a[0],
            smoke: a[1],
            habit: a[2],
            temp: a[3],
            clean: a[4],
            noise: a[5],
            drink: a[6],
        },
    }
}

const fn tags(
    sleep: &'static str,
    smoke: &'static str,
    habit: &'static str,
    temp: &'static str,
    clean: &'static str,
    drink: &'static str,
    noise: &'static str,
) -> CardTags {
    CardTags { sleep, smoke, habit, temp, clean, drink, noise }
}

// Attribute order: sleep, smoke, habit, temp, clean, noise, drink
pub const CALIBRATION_ROUNDS: [[PersonaCard; 3]; 3] = [
    [
        card(1, tags("regular", "non-smoker", "quiet sleeper", "moderate", "tidy", "light drinker", "sensitive"), [0, 0, 0, 0, 1, 1, 0]),
        card(2, tags("night owl", "smoker", "restless sleeper", "full AC", "free spirit", "heavy drinker", "easygoing"), [1, 1, 1, 1, 0, 0, 1]),
        card(3, tags("regular", "non-smoker", "restless sleeper", "no AC", "tidy", "heavy drinker", "easygoing"), [0, 0, 1, 1, 1, 0, 1]),
    ],
    [
        card(4, tags("night owl", "non-smoker", "quiet sleeper", "full AC", "tidy", "heavy drinker", "easygoing"), [1, 0, 0, 1, 1, 0, 1]),
        card(5, tags("regular", "smoker", "quiet sleeper", "full AC", "tidy", "heavy drinker", "easygoing"), [0, 1, 0, 1, 1, 0, 1]),
        card(6, tags("night owl", "non-smoker", "restless sleeper", "no AC", "free spirit", "light drinker", "sensitive"), [1, 0, 1, 1, 0, 1, 0]),
    ],
    [
        card(7, tags("regular", "non-smoker", "quiet sleeper", "full AC", "free spirit", "light drinker", "easygoing"), [0, 0, 0, 1, 0, 0, 0]),
        card(8, tags("night owl", "smoker", "quiet sleeper", "moderate", "tidy", "heavy drinker", "sensitive"), [1, 1, 0, 0, 1, 1, 1]),
        card(9, tags("regular", "non-smoker", "restless sleeper", "no AC", "tidy", "light drinker", "easygoing"), [0, 0, 1, 1, 1, 0, 0]),
    ],
];

/// Number of calibration rounds; reaching it ends calibration
pub const TOTAL_ROUNDS: u8 = CALIBRATION_ROUNDS.len() as u8;

/// Importance constants shared by every user
pub fn default_importance() -> WeightVector {
    WeightVector {
        schedule: 0.07,
        smoke: 0.05,
        habit: 0.034,
        temp: 0.04,
        cleanliness: 0.044,
        noise: 0.052,
        drink: 0.01,
    }
}

pub fn find_card(round: u8, card_id: u32) -> Option<&'static PersonaCard> {
    CALIBRATION_ROUNDS
        .get(round as usize)
        .and_then(|cards| cards.iter().find(|c| c.id == card_id))
}

/// Weight change produced by picking `card`
pub fn card_delta(card: &PersonaCard, importance: &WeightVector) -> WeightVector {
    let attributes = card.attributes.as_vector();
    let mut delta = WeightVector::splat(0.0);
    for (dimension, attribute) in attributes.iter() {
        *delta.get_mut(dimension) = attribute * importance.get(dimension);
    }
    delta
}

/// Cards offered for the user's current round
#[derive(Debug, Clone)]
pub struct CardSet {
    pub round: u8,
    pub complete: bool,
    pub cards: Vec<PersonaCard>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationOutcome {
    pub round: u8,
    pub complete: bool,
    pub weights: WeightVector,
}

/// Applies forced-choice card picks to a user's weights, one round at a time
#[derive(Clone)]
pub struct CalibrationEngine {
    repo: Arc<dyn ProfileRepository>,
    importance: WeightVector,
    policy: ClampPolicy,
}

impl CalibrationEngine {
    pub fn new(repo: Arc<dyn ProfileRepository>, importance: WeightVector, policy: ClampPolicy) -> Self {
        Self { repo, importance, policy }
    }

    /// Store a survey and reset the user's weights and calibration round
    pub async fn submit_survey(&self, submission: SurveySubmission) -> Result<WeightRecord, MatchError> {
        if submission.nickname.trim().is_empty() {
            return Err(MatchError::ValidationFailed("nickname must not be empty".into()));
        }

        let record = self
            .repo
            .save_survey(&submission, &WeightVector::default())
            .await?;

        tracing::info!("Survey stored for {}, calibration reset", submission.user_id);

        Ok(record)
    }

    pub async fn cards_for(&self, user_id: Uuid) -> Result<CardSet, MatchError> {
        self.require_profile(user_id).await?;

        let round = self
            .repo
            .get_weights(user_id)
            .await?
            .map(|r| r.calibration_round)
            .unwrap_or(0);

        let cards = CALIBRATION_ROUNDS
            .get(round as usize)
            .map(|set| set.to_vec())
            .unwrap_or_default();

        Ok(CardSet {
            round,
            complete: round >= TOTAL_ROUNDS,
            cards,
        })
    }

    /// Apply the card picked for `round`.
    ///
    /// A round can be answered once. Answering a round other than the stored
    /// one is a conflict; once all rounds are done the call is a no-op that
    /// reports completion.
    pub async fn submit(&self, user_id: Uuid, round: u8, card_id: u32) -> Result<CalibrationOutcome, MatchError> {
        self.require_profile(user_id).await?;

        let importance = self.importance;
        let record = update_weights(self.repo.as_ref(), user_id, &self.policy, |_, stored_round| {
            // completion wins over any stale round or card the client sends
            if stored_round >= TOTAL_ROUNDS {
                return Ok(WeightPlan::Keep);
            }
            if stored_round != round {
                return Err(MatchError::Conflict(format!(
                    "round {} cannot be answered, current round is {}",
                    round, stored_round
                )));
            }
            let card = find_card(round, card_id).ok_or_else(|| {
                MatchError::ValidationFailed(format!("card {} is not offered in round {}", card_id, round))
            })?;
            Ok(WeightPlan::Apply {
                update: WeightUpdate::Additive(card_delta(card, &importance)),
                round: stored_round + 1,
            })
        })
        .await?;

        let complete = record.calibration_round >= TOTAL_ROUNDS;
        if complete {
            tracing::info!("Calibration complete for {}", user_id);
        } else {
            tracing::debug!("Calibration round {} stored for {}", record.calibration_round, user_id);
        }

        Ok(CalibrationOutcome {
            round: record.calibration_round,
            complete,
            weights: record.weights,
        })
    }

    async fn require_profile(&self, user_id: Uuid) -> Result<(), MatchError> {
        match self.repo.get_profile(user_id).await? {
            Some(_) => Ok(()),
            None => Err(MatchError::NotFound(format!("profile {} not found", user_id))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Gender, Profile, ProfileStatus};
    use crate::services::MemoryRepository;

    async fn engine_with_user() -> (CalibrationEngine, Arc<MemoryRepository>, Uuid) {
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
        let engine = CalibrationEngine::new(repo.clone(), default_importance(), ClampPolicy::default());
        (engine, repo, user_id)
    }

    #[test]
    fn test_card_ids_unique_per_deck() {
        let mut ids: Vec<u32> = CALIBRATION_ROUNDS.iter().flatten().map(|c| c.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 9);
    }

    #[test]
    fn test_card_delta_uses_importance() {
        let delta = card_delta(find_card(0, 1).unwrap(), &default_importance());

        assert_eq!(delta.cleanliness, 0.044);
        assert_eq!(delta.noise, 0.052);
        assert_eq!(delta.schedule, 0.0);
        assert_eq!(delta.drink, 0.0);
    }

    #[test]
    fn test_card_must_belong_to_round() {
        assert!(find_card(0, 1).is_some());
        assert!(find_card(0, 4).is_none());
        assert!(find_card(3, 7).is_none());
    }

    #[tokio::test]
    async fn test_rounds_advance_by_one_and_stop() {
        let (engine, _repo, user_id) = engine_with_user().await;

        let first = engine.submit(user_id, 0, 2).await.unwrap();
        assert_eq!(first.round, 1);
        assert!(!first.complete);

        engine.submit(user_id, 1, 4).await.unwrap();
        let last = engine.submit(user_id, 2, 8).await.unwrap();
        assert_eq!(last.round, 3);
        assert!(last.complete);

        let after = engine.submit(user_id, 3, 1).await.unwrap();
        assert_eq!(after.round, 3);
        assert!(after.complete);
        assert_eq!(after.weights, last.weights);
    }

    #[tokio::test]
    async fn test_same_round_twice_conflicts() {
        let (engine, _repo, user_id) = engine_with_user().await;

        let first = engine.submit(user_id, 0, 1).await.unwrap();
        let err = engine.submit(user_id, 0, 3).await.unwrap_err();

        assert!(matches!(err, MatchError::Conflict(_)));
        let cards = engine.cards_for(user_id).await.unwrap();
        assert_eq!(cards.round, first.round);
    }

    #[tokio::test]
    async fn test_unknown_card_is_rejected() {
        let (engine, _repo, user_id) = engine_with_user().await;

        let err = engine.submit(user_id, 0, 9).await.unwrap_err();
        assert!(matches!(err, MatchError::ValidationFailed(_)));
    }

    #[tokio::test]
    async fn test_stale_pick_after_completion_reports_complete() {
        let (engine, _repo, user_id) = engine_with_user().await;
        for (round, card_id) in [(0, 2), (1, 4), (2, 8)] {
            engine.submit(user_id, round, card_id).await.unwrap();
        }

        // round 0 with a round 2 card
        let outcome = engine.submit(user_id, 0, 7).await.unwrap();

        assert!(outcome.complete);
        assert_eq!(outcome.round, 3);
    }

    #[tokio::test]
    async fn test_missing_profile_is_not_found() {
        let (engine, _repo, _) = engine_with_user().await;

        let err = engine.submit(Uuid::new_v4(), 0, 1).await.unwrap_err();
        assert!(matches!(err, MatchError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_cards_for_reports_completion() {
        let (engine, _repo, user_id) = engine_with_user().await;

        let cards = engine.cards_for(user_id).await.unwrap();
        assert_eq!(cards.round, 0);
        assert_eq!(cards.cards.len(), 3);

        for (round, card_id) in [(0, 1), (1, 5), (2, 9)] {
            engine.submit(user_id, round, card_id).await.unwrap();
        }

        let done = engine.cards_for(user_id).await.unwrap();
        assert!(done.complete);
        assert!(done.cards.is_empty());
    }
}
