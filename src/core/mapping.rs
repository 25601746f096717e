//! Translation between stored profiles and the scorer's payload format.
//!
//! Storage names weight columns `pref_*`, the scorer names the same weights
//! `w_*`. [`FIELD_MAP`] is the only place the pairing is written down.

use crate::core::weights::{Dimension, WeightVector};
use crate::models::{LifestyleAttributes, ProfilePayload, ProfileRecord, SleepHabit, WeightMap};

/// One weight dimension with its storage column and scorer key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldMapping {
    pub dimension: Dimension,
    pub pref_column: &'static str,
    pub scorer_key: &'static str,
}

pub const FIELD_MAP: [FieldMapping; 7] = [
    FieldMapping { dimension: Dimension::Schedule, pref_column: "pref_schedule", scorer_key: "w_sleep" },
    FieldMapping { dimension: Dimension::Smoke, pref_column: "pref_smoke", scorer_key: "w_smoke" },
    FieldMapping { dimension: Dimension::Habit, pref_column: "pref_habit", scorer_key: "w_sleep_habit" },
    FieldMapping { dimension: Dimension::Temp, pref_column: "pref_temp", scorer_key: "w_hvac" },
    FieldMapping { dimension: Dimension::Cleanliness, pref_column: "pref_cleanliness", scorer_key: "w_clean_cycle" },
    FieldMapping { dimension: Dimension::Noise, pref_column: "pref_noise", scorer_key: "w_noise" },
    FieldMapping { dimension: Dimension::Drink, pref_column: "pref_drink", scorer_key: "w_outing" },
];

pub fn mapping_for(dimension: Dimension) -> &'static FieldMapping {
    FIELD_MAP
        .iter()
        .find(|m| m.dimension == dimension)
        .unwrap_or_else(|| unreachable!("FIELD_MAP covers every dimension"))
}

pub fn scorer_key(dimension: Dimension) -> &'static str {
    mapping_for(dimension).scorer_key
}

pub fn pref_column(dimension: Dimension) -> &'static str {
    mapping_for(dimension).pref_column
}

/// Stored weights → scorer `w_*` map
pub fn to_scorer_weights(weights: &WeightVector) -> WeightMap {
    FIELD_MAP
        .iter()
        .map(|m| (m.scorer_key.to_string(), weights.get(m.dimension)))
        .collect()
}

/// Scorer `w_*` map → stored weights.
///
/// Keys the scorer left out keep their value from `fallback`; unknown keys are ignored.
pub fn from_scorer_weights(map: &WeightMap, fallback: &WeightVector) -> WeightVector {
    let mut out = *fallback;
    for m in FIELD_MAP.iter() {
        if let Some(value) = map.get(m.scorer_key) {
            *out.get_mut(m.dimension) = *value;
        }
    }
    out
}

/// Values used for any field a stored profile does not have
#[derive(Debug, Clone)]
pub struct PayloadDefaults {
    pub nickname: &'static str,
    pub lifestyle: LifestyleAttributes,
    pub weights: WeightVector,
}

impl Default for PayloadDefaults {
    fn default() -> Self {
        Self {
            nickname: "unknown",
            lifestyle: LifestyleAttributes {
                sleep_time: 0.5,
                wake_time: 0.5,
                clean_cycle: 0.5,
                hvac: 0.5,
                sound_sensitivity: 0.5,
                outing: 0.5,
                smoke: false,
                sleep_habit: false,
            },
            weights: WeightVector::default(),
        }
    }
}

/// Build the scorer payload for a stored profile, filling gaps from `defaults`
pub fn build_profile_payload(record: &ProfileRecord, defaults: &PayloadDefaults) -> ProfilePayload {
    let profile = &record.profile;
    let life = record.lifestyle.unwrap_or(defaults.lifestyle);
    let weights = record
        .weights
        .map(|w| w.weights)
        .unwrap_or(defaults.weights);

    let nickname = if profile.nickname.trim().is_empty() {
        defaults.nickname.to_string()
    } else {
        profile.nickname.clone()
    };

    ProfilePayload {
        id: profile.id,
        nickname,
        gender: profile.gender,
        smoke: life.smoke,
        sleep_habit: if life.sleep_habit { SleepHabit::Yes } else { SleepHabit::No },
        sleep_time_val: life.sleep_time,
        wake_time_val: life.wake_time,
        clean_cycle_val: life.clean_cycle,
        hvac_val: life.hvac,
        alarm_val: life.sound_sensitivity,
        outing_val: life.outing,
        weights: to_scorer_weights(&weights),
        block_smoke: false,
        block_sleep_habit: false,
    }
}
