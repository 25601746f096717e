use std::sync::Arc;
use uuid::Uuid;

use crate::core::mapping::{build_profile_payload, from_scorer_weights, PayloadDefaults};
use crate::core::weights::{update_weights, ClampPolicy, WeightPlan, WeightUpdate};
use crate::error::MatchError;
use crate::models::{
    LifestyleAttributes, MatchScoreRequest, Profile, ProfileRecord, RankedCandidate, ScoredResult,
    WeightMap,
};
use crate::services::{ProfileRepository, Scorer};

/// Outcome of a match round
#[derive(Debug)]
pub struct MatchRound {
    pub matches: Vec<RankedCandidate>,
    /// Candidates sent to the scorer
    pub pool_size: usize,
}

/// Candidate that can be scored: a profile with completed lifestyle data
#[derive(Debug, Clone)]
pub struct PoolEntry {
    pub record: ProfileRecord,
    pub lifestyle: LifestyleAttributes,
}

/// Drop candidates without lifestyle data, keeping fetch order
pub fn scorable_pool(records: Vec<ProfileRecord>) -> Vec<PoolEntry> {
    records
        .into_iter()
        .filter_map(|record| match record.lifestyle {
            Some(lifestyle) => Some(PoolEntry { record, lifestyle }),
            None => {
                tracing::debug!("Skipping candidate {} without lifestyle data", record.profile.id);
                None
            }
        })
        .collect()
}

fn id_matches(result: &ScoredResult, profile: &Profile) -> bool {
    result
        .id
        .as_deref()
        .is_some_and(|id| id.eq_ignore_ascii_case(&profile.id.to_string()))
}

fn nickname_matches(result: &ScoredResult, profile: &Profile) -> bool {
    result.nickname.as_deref() == Some(profile.nickname.as_str())
}

/// Attach scorer verdicts to the persisted candidates and rank them.
///
/// Each result claims at most one pool member and each pool member takes at
/// most one result: ids are resolved first, then the remaining results claim
/// the first unclaimed member with the same nickname, in result order.
/// Profile and lifestyle fields always come from `pool`; the scorer only
/// contributes score and risks. Pool members the scorer did not score are
/// left out. Equal scores keep pool order.
pub fn merge_ranked(pool: &[PoolEntry], results: &[ScoredResult]) -> Vec<RankedCandidate> {
    let mut claimed: Vec<Option<&ScoredResult>> = vec![None; pool.len()];
    let mut pending = Vec::with_capacity(results.len());

    for result in results {
        let slot = (0..pool.len()).find(|&i| claimed[i].is_none() && id_matches(result, &pool[i].record.profile));
        match slot {
            Some(i) => claimed[i] = Some(result),
            None => pending.push(result),
        }
    }

    let mut unmatched = 0;
    for result in pending {
        let slot = (0..pool.len())
            .find(|&i| claimed[i].is_none() && nickname_matches(result, &pool[i].record.profile));
        match slot {
            Some(i) => claimed[i] = Some(result),
            None => unmatched += 1,
        }
    }

    let mut ranked: Vec<RankedCandidate> = pool
        .iter()
        .zip(claimed)
        .filter_map(|(entry, result)| {
            let result = result?;
            let profile = &entry.record.profile;
            Some(RankedCandidate {
                id: profile.id,
                nickname: profile.nickname.clone(),
                gender: profile.gender,
                lifestyle: entry.lifestyle,
                score: result.score,
                risks: result.risks.clone(),
            })
        })
        .collect();

    if unmatched > 0 {
        tracing::warn!("Scorer returned {} results matching no pool candidate", unmatched);
    }

    // stable: ties keep pool order
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked
}

/// Runs a match round against the external scorer
#[derive(Clone)]
pub struct MatchOrchestrator {
    repo: Arc<dyn ProfileRepository>,
    scorer: Arc<dyn Scorer>,
    policy: ClampPolicy,
    defaults: PayloadDefaults,
}

impl MatchOrchestrator {
    pub fn new(repo: Arc<dyn ProfileRepository>, scorer: Arc<dyn Scorer>, policy: ClampPolicy) -> Self {
        Self {
            repo,
            scorer,
            policy,
            defaults: PayloadDefaults::default(),
        }
    }

    /// Rank same-gender seeking candidates for `user_id`
    ///
    /// # Pipeline
    /// 1. Load requester and candidate pool
    /// 2. Drop candidates without lifestyle data
    /// 3. Score through the external scorer (fatal on failure)
    /// 4. Store any weight refinement the scorer proposes (best effort)
    /// 5. Merge verdicts onto persisted profiles and rank
    pub async fn find_matches(&self, user_id: Uuid) -> Result<MatchRound, MatchError> {
        let requester = self
            .repo
            .get_profile(user_id)
            .await?
            .ok_or_else(|| MatchError::NotFound(format!("profile {} not found", user_id)))?;

        let fetched = self.repo.find_candidates(&requester.profile).await?;
        let fetched_count = fetched.len();
        let pool = scorable_pool(fetched);

        tracing::info!(
            "Scoring {} candidates for {} ({} fetched)",
            pool.len(),
            user_id,
            fetched_count
        );

        let request = MatchScoreRequest {
            user_profile: build_profile_payload(&requester, &self.defaults),
            candidates: pool
                .iter()
                .map(|entry| build_profile_payload(&entry.record, &self.defaults))
                .collect(),
        };

        let response = self.scorer.score_matches(&request).await.map_err(|e| {
            tracing::error!("Scorer match call failed for {}: {}", user_id, e);
            MatchError::from(e)
        })?;

        if let Some(updated) = &response.updated_weights {
            self.store_refinement(user_id, updated).await;
        }

        let matches = merge_ranked(&pool, &response.results);

        tracing::info!("Returning {} ranked candidates for {}", matches.len(), user_id);

        Ok(MatchRound {
            matches,
            pool_size: pool.len(),
        })
    }

    /// Weight learning is best effort: failures are logged, never returned
    async fn store_refinement(&self, user_id: Uuid, updated: &WeightMap) {
        let result = update_weights(self.repo.as_ref(), user_id, &self.policy, |current, round| {
            Ok(WeightPlan::Apply {
                update: WeightUpdate::Replace(from_scorer_weights(updated, current)),
                round,
            })
        })
        .await;

        match result {
            Ok(record) => tracing::debug!("Stored scorer weight refinement for {}: {:?}", user_id, record.weights),
            Err(e) => tracing::warn!("Failed to store weight refinement for {}: {}", user_id, e),
        }
    }
}
