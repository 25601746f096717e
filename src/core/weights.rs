//! Per-user preference weights and the single path through which they change.
//!
//! Calibration, feedback and match rounds all mutate the same vector. Each of
//! them goes through [`apply_weight_update`] so the clamp is applied in one
//! place, and through [`update_weights`] so concurrent writers are detected by
//! the row version instead of silently overwriting each other.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::MatchError;
use crate::models::WeightRecord;
use crate::services::ProfileRepository;

/// Number of re-reads before a contended weight write gives up
pub const MAX_WRITE_ATTEMPTS: usize = 3;

/// Lifestyle dimension a weight applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Dimension {
    Schedule,
    Smoke,
    Habit,
    Temp,
    Cleanliness,
    Noise,
    Drink,
}

impl Dimension {
    pub const ALL: [Dimension; 7] = [
        Dimension::Schedule,
        Dimension::Smoke,
        Dimension::Habit,
        Dimension::Temp,
        Dimension::Cleanliness,
        Dimension::Noise,
        Dimension::Drink,
    ];
}

/// Seven non-negative importance weights, one per [`Dimension`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightVector {
    pub schedule: f64,
    pub smoke: f64,
    pub habit: f64,
    pub temp: f64,
    pub cleanliness: f64,
    pub noise: f64,
    pub drink: f64,
}

impl WeightVector {
    /// Vector with every component set to `value`
    pub fn splat(value: f64) -> Self {
        Self {
            schedule: value,
            smoke: value,
            habit: value,
            temp: value,
            cleanliness: value,
            noise: value,
            drink: value,
        }
    }

    pub fn get(&self, dimension: Dimension) -> f64 {
        match dimension {
            Dimension::Schedule => self.schedule,
            Dimension::Smoke => self.smoke,
            Dimension::Habit => self.habit,
            Dimension::Temp => self.temp,
            Dimension::Cleanliness => self.cleanliness,
            Dimension::Noise => self.noise,
            Dimension::Drink => self.drink,
        }
    }

    pub fn get_mut(&mut self, dimension: Dimension) -> &mut f64 {
        match dimension {
            Dimension::Schedule => &mut self.schedule,
            Dimension::Smoke => &mut self.smoke,
            Dimension::Habit => &mut self.habit,
            Dimension::Temp => &mut self.temp,
            Dimension::Cleanliness => &mut self.cleanliness,
            Dimension::Noise => &mut self.noise,
            Dimension::Drink => &mut self.drink,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Dimension, f64)> + '_ {
        Dimension::ALL.iter().map(move |&d| (d, self.get(d)))
    }
}

impl Default for WeightVector {
    /// Neutral weights: every dimension matters equally
    fn default() -> Self {
        Self::splat(1.0)
    }
}

/// Closed range every weight component is held to
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClampPolicy {
    min: f64,
    max: f64,
}

impl ClampPolicy {
    /// Returns `None` unless `0 <= min <= max` and both bounds are finite
    pub fn new(min: f64, max: f64) -> Option<Self> {
        if min.is_finite() && max.is_finite() && min >= 0.0 && min <= max {
            Some(Self { min, max })
        } else {
            None
        }
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    fn clamp_component(&self, value: f64) -> f64 {
        if value.is_nan() {
            self.min
        } else {
            value.clamp(self.min, self.max)
        }
    }
}

impl Default for ClampPolicy {
    fn default() -> Self {
        Self { min: 0.1, max: 2.0 }
    }
}

/// Clamp each component into the policy range. NaN falls to the minimum.
pub fn clamp(vector: &WeightVector, policy: &ClampPolicy) -> WeightVector {
    let mut out = *vector;
    for dimension in Dimension::ALL {
        let slot = out.get_mut(dimension);
        *slot = policy.clamp_component(*slot);
    }
    out
}

/// How a writer wants to change the vector
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WeightUpdate {
    /// Add component-wise to the current vector
    Additive(WeightVector),
    /// Discard the current vector
    Replace(WeightVector),
}

/// Apply an update and clamp the result
pub fn apply_weight_update(
    current: &WeightVector,
    update: &WeightUpdate,
    policy: &ClampPolicy,
) -> WeightVector {
    let raw = match update {
        WeightUpdate::Additive(delta) => {
            let mut next = *current;
            for dimension in Dimension::ALL {
                *next.get_mut(dimension) += delta.get(dimension);
            }
            next
        }
        WeightUpdate::Replace(replacement) => *replacement,
    };
    clamp(&raw, policy)
}

/// Decision taken by a writer after seeing the current row
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WeightPlan {
    /// Write `update`, storing `round` as the new calibration round
    Apply { update: WeightUpdate, round: u8 },
    /// Leave the row as it is
    Keep,
}

/// Optimistic read-modify-write of a user's weight row.
///
/// `plan` receives the current vector (defaults when no row exists) and the
/// stored calibration round. If another writer bumps the row version between
/// the read and the write, the row is re-read and `plan` runs again, up to
/// [`MAX_WRITE_ATTEMPTS`] times.
pub async fn update_weights<F>(
    repo: &dyn ProfileRepository,
    user_id: Uuid,
    policy: &ClampPolicy,
    mut plan: F,
) -> Result<WeightRecord, MatchError>
where
    F: FnMut(&WeightVector, u8) -> Result<WeightPlan, MatchError>,
{
    for attempt in 1..=MAX_WRITE_ATTEMPTS {
        let stored = repo.get_weights(user_id).await?;
        let (current, round, expected_version) = match &stored {
            Some(record) => (record.weights, record.calibration_round, Some(record.version)),
            None => (WeightVector::default(), 0, None),
        };

        match plan(&current, round)? {
            WeightPlan::Keep => {
                return Ok(stored.unwrap_or(WeightRecord {
                    weights: current,
                    calibration_round: round,
                    version: 0,
                }));
            }
            WeightPlan::Apply { update, round: next_round } => {
                let next = apply_weight_update(&current, &update, policy);
                match repo
                    .store_weights(user_id, expected_version, &next, next_round)
                    .await?
                {
                    Some(record) => return Ok(record),
                    None => {
                        tracing::debug!(
                            "Weight row for {} changed concurrently (attempt {}/{})",
                            user_id,
                            attempt,
                            MAX_WRITE_ATTEMPTS
                        );
                    }
                }
            }
        }
    }

    tracing::warn!("Giving up weight update for {} after {} attempts", user_id, MAX_WRITE_ATTEMPTS);
    Err(MatchError::Conflict(format!(
        "weights for user {} are being updated concurrently",
        user_id
    )))
}
