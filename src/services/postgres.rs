use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use std::time::Duration;
use uuid::Uuid;

use crate::core::mapping::pref_column;
use crate::core::weights::{Dimension, WeightVector};
use crate::models::{
    LifestyleAttributes, MatchRequest, NewMatchRequest, Profile, ProfileRecord, RequestStatus,
    SurveySubmission, WeightRecord,
};
use crate::services::repository::{InsertOutcome, ProfileRepository, RepositoryError};

const PROFILE_SELECT: &str = r#"
    SELECT
        p.id, p.nickname, p.gender, p.status, p.created_at,
        l.user_id AS lifestyle_user_id,
        l.sleep_time_val, l.wake_time_val, l.clean_cycle_val, l.hvac_val,
        l.sound_sensitivity_val, l.outing_val, l.smoke, l.sleep_habit,
        w.user_id AS persona_user_id,
        w.pref_schedule, w.pref_smoke, w.pref_habit, w.pref_temp,
        w.pref_cleanliness, w.pref_noise, w.pref_drink,
        w.calibration_step, w.version
    FROM profiles p
    LEFT JOIN user_lifestyles l ON l.user_id = p.id
    LEFT JOIN user_personas w ON w.user_id = p.id
"#;

const REQUEST_COLUMNS: &str =
    "id, sender_id, receiver_id, status, message, contact_info, created_at";

const WEIGHT_COLUMNS: &str = "pref_schedule, pref_smoke, pref_habit, pref_temp, \
     pref_cleanliness, pref_noise, pref_drink, calibration_step, version";

/// PostgreSQL-backed profile store
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Create a new repository from a connection string and run pending migrations
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout: Duration,
        idle_timeout: Duration,
    ) -> Result<Self, RepositoryError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(acquire_timeout)
            .idle_timeout(idle_timeout)
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    pub async fn from_settings(
        url: &str,
        max_connections: Option<u32>,
        min_connections: Option<u32>,
        acquire_timeout_secs: Option<u64>,
        idle_timeout_secs: Option<u64>,
    ) -> Result<Self, RepositoryError> {
        tracing::info!("Connecting to PostgreSQL");

        Self::new(
            url,
            max_connections.unwrap_or(10),
            min_connections.unwrap_or(1),
            Duration::from_secs(acquire_timeout_secs.unwrap_or(5)),
            Duration::from_secs(idle_timeout_secs.unwrap_or(600)),
        )
        .await
    }
}

fn weights_from_row(row: &PgRow) -> Result<WeightRecord, RepositoryError> {
    let mut weights = WeightVector::default();
    for dimension in Dimension::ALL {
        *weights.get_mut(dimension) = row.try_get::<f64, _>(pref_column(dimension))?;
    }

    let step: i16 = row.try_get("calibration_step")?;
    let calibration_round = u8::try_from(step)
        .map_err(|_| RepositoryError::InvalidRow(format!("calibration_step out of range: {}", step)))?;

    Ok(WeightRecord {
        weights,
        calibration_round,
        version: row.try_get("version")?,
    })
}

fn record_from_row(row: &PgRow) -> Result<ProfileRecord, RepositoryError> {
    let profile = Profile {
        id: row.try_get("id")?,
        nickname: row.try_get("nickname")?,
        gender: row.try_get("gender")?,
        status: row.try_get("status")?,
        created_at: row.try_get("created_at")?,
    };

    let lifestyle_user: Option<Uuid> = row.try_get("lifestyle_user_id")?;
    let lifestyle = match lifestyle_user {
        Some(_) => Some(LifestyleAttributes {
            sleep_time: row.try_get("sleep_time_val")?,
            wake_time: row.try_get("wake_time_val")?,
            clean_cycle: row.try_get("clean_cycle_val")?,
            hvac: row.try_get("hvac_val")?,
            sound_sensitivity: row.try_get("sound_sensitivity_val")?,
            outing: row.try_get("outing_val")?,
            smoke: row.try_get("smoke")?,
            sleep_habit: row.try_get("sleep_habit")?,
        }),
        None => None,
    };

    let persona_user: Option<Uuid> = row.try_get("persona_user_id")?;
    let weights = match persona_user {
        Some(_) => Some(weights_from_row(row)?),
        None => None,
    };

    Ok(ProfileRecord { profile, lifestyle, weights })
}

fn request_from_row(row: &PgRow) -> Result<MatchRequest, RepositoryError> {
    Ok(MatchRequest {
        id: row.try_get("id")?,
        sender_id: row.try_get("sender_id")?,
        receiver_id: row.try_get("receiver_id")?,
        status: row.try_get("status")?,
        message: row.try_get("message")?,
        contact: row.try_get("contact_info")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl ProfileRepository for PostgresRepository {
    async fn get_profile(&self, user_id: Uuid) -> Result<Option<ProfileRecord>, RepositoryError> {
        let query = format!("{} WHERE p.id = $1", PROFILE_SELECT);

        let row = sqlx::query(&query)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(record_from_row).transpose()
    }

    async fn find_candidates(&self, requester: &Profile) -> Result<Vec<ProfileRecord>, RepositoryError> {
        let query = format!(
            "{} WHERE p.id <> $1 AND p.gender = $2 AND p.status = 'seeking' ORDER BY p.created_at, p.id",
            PROFILE_SELECT
        );

        let rows = sqlx::query(&query)
            .bind(requester.id)
            .bind(requester.gender)
            .fetch_all(&self.pool)
            .await?;

        tracing::debug!("Fetched {} seeking profiles for {}", rows.len(), requester.id);

        rows.iter().map(record_from_row).collect()
    }

    async fn save_survey(
        &self,
        submission: &SurveySubmission,
        weights: &WeightVector,
    ) -> Result<WeightRecord, RepositoryError> {
        let life = &submission.lifestyle;
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO profiles (id, nickname, gender, status)
            VALUES ($1, $2, $3, 'seeking')
            ON CONFLICT (id) DO UPDATE SET
                nickname = EXCLUDED.nickname,
                gender = EXCLUDED.gender,
                status = 'seeking'
            "#,
        )
        .bind(submission.user_id)
        .bind(&submission.nickname)
        .bind(submission.gender)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO user_lifestyles (
                user_id, sleep_time_val, wake_time_val, clean_cycle_val, hvac_val,
                sound_sensitivity_val, outing_val, smoke, sleep_habit, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, NOW())
            ON CONFLICT (user_id) DO UPDATE SET
                sleep_time_val = EXCLUDED.sleep_time_val,
                wake_time_val = EXCLUDED.wake_time_val,
                clean_cycle_val = EXCLUDED.clean_cycle_val,
                hvac_val = EXCLUDED.hvac_val,
                sound_sensitivity_val = EXCLUDED.sound_sensitivity_val,
                outing_val = EXCLUDED.outing_val,
                smoke = EXCLUDED.smoke,
                sleep_habit = EXCLUDED.sleep_habit,
                updated_at = NOW()
            "#,
        )
        .bind(submission.user_id)
        .bind(life.sleep_time)
        .bind(life.wake_time)
        .bind(life.clean_cycle)
        .bind(life.hvac)
        .bind(life.sound_sensitivity)
        .bind(life.outing)
        .bind(life.smoke)
        .bind(life.sleep_habit)
        .execute(&mut *tx)
        .await?;

        let query = format!(
            r#"
            INSERT INTO user_personas (
                user_id, pref_schedule, pref_smoke, pref_habit, pref_temp,
                pref_cleanliness, pref_noise, pref_drink, calibration_step, version, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 0, 1, NOW())
            ON CONFLICT (user_id) DO UPDATE SET
                pref_schedule = EXCLUDED.pref_schedule,
                pref_smoke = EXCLUDED.pref_smoke,
                pref_habit = EXCLUDED.pref_habit,
                pref_temp = EXCLUDED.pref_temp,
                pref_cleanliness = EXCLUDED.pref_cleanliness,
                pref_noise = EXCLUDED.pref_noise,
                pref_drink = EXCLUDED.pref_drink,
                calibration_step = 0,
                version = user_personas.version + 1,
                updated_at = NOW()
            RETURNING {}
            "#,
            WEIGHT_COLUMNS
        );

        let row = sqlx::query(&query)
            .bind(submission.user_id)
            .bind(weights.schedule)
            .bind(weights.smoke)
            .bind(weights.habit)
            .bind(weights.temp)
            .bind(weights.cleanliness)
            .bind(weights.noise)
            .bind(weights.drink)
            .fetch_one(&mut *tx)
            .await?;

        let record = weights_from_row(&row)?;
        tx.commit().await?;

        Ok(record)
    }

    async fn get_weights(&self, user_id: Uuid) -> Result<Option<WeightRecord>, RepositoryError> {
        let query = format!("SELECT {} FROM user_personas WHERE user_id = $1", WEIGHT_COLUMNS);

        let row = sqlx::query(&query)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(weights_from_row).transpose()
    }

    async fn store_weights(
        &self,
        user_id: Uuid,
        expected_version: Option<i64>,
        weights: &WeightVector,
        calibration_round: u8,
    ) -> Result<Option<WeightRecord>, RepositoryError> {
        // A missing row may only be created once; an existing row only moves
        // forward from the version the caller read.
        let query = match expected_version {
            None => format!(
                r#"
                INSERT INTO user_personas (
                    user_id, pref_schedule, pref_smoke, pref_habit, pref_temp,
                    pref_cleanliness, pref_noise, pref_drink, calibration_step, version, updated_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 1, NOW())
                ON CONFLICT (user_id) DO NOTHING
                RETURNING {}
                "#,
                WEIGHT_COLUMNS
            ),
            Some(_) => format!(
                r#"
                UPDATE user_personas SET
                    pref_schedule = $2,
                    pref_smoke = $3,
                    pref_habit = $4,
                    pref_temp = $5,
                    pref_cleanliness = $6,
                    pref_noise = $7,
                    pref_drink = $8,
                    calibration_step = $9,
                    version = version + 1,
                    updated_at = NOW()
                WHERE user_id = $1 AND version = $10
                RETURNING {}
                "#,
                WEIGHT_COLUMNS
            ),
        };

        let mut q = sqlx::query(&query)
            .bind(user_id)
            .bind(weights.schedule)
            .bind(weights.smoke)
            .bind(weights.habit)
            .bind(weights.temp)
            .bind(weights.cleanliness)
            .bind(weights.noise)
            .bind(weights.drink)
            .bind(i16::from(calibration_round));
        if let Some(version) = expected_version {
            q = q.bind(version);
        }

        let row = q.fetch_optional(&self.pool).await?;

        row.as_ref().map(weights_from_row).transpose()
    }

    async fn insert_request_if_absent(&self, request: &NewMatchRequest) -> Result<InsertOutcome, RepositoryError> {
        let insert = format!(
            r#"
            INSERT INTO matches (sender_id, receiver_id, status, message, contact_info)
            VALUES ($1, $2, 'pending', $3, $4)
            ON CONFLICT DO NOTHING
            RETURNING {}
            "#,
            REQUEST_COLUMNS
        );
        let existing = format!(
            r#"
            SELECT {}
            FROM matches
            WHERE status IN ('pending', 'accepted')
              AND ((sender_id = $1 AND receiver_id = $2) OR (sender_id = $2 AND receiver_id = $1))
            LIMIT 1
            "#,
            REQUEST_COLUMNS
        );

        // The blocking row can be rejected between the insert and the lookup;
        // one more insert attempt covers that window.
        for _ in 0..2 {
            let inserted = sqlx::query(&insert)
                .bind(request.sender_id)
                .bind(request.receiver_id)
                .bind(&request.message)
                .bind(&request.contact)
                .fetch_optional(&self.pool)
                .await?;

            if let Some(row) = inserted {
                return Ok(InsertOutcome::Inserted(request_from_row(&row)?));
            }

            let blocking = sqlx::query(&existing)
                .bind(request.sender_id)
                .bind(request.receiver_id)
                .fetch_optional(&self.pool)
                .await?;

            if let Some(row) = blocking {
                return Ok(InsertOutcome::Existing(request_from_row(&row)?));
            }
        }

        Err(RepositoryError::InvalidRow(format!(
            "request {} -> {} neither inserted nor blocked",
            request.sender_id, request.receiver_id
        )))
    }

    async fn get_request(&self, request_id: i64) -> Result<Option<MatchRequest>, RepositoryError> {
        let query = format!("SELECT {} FROM matches WHERE id = $1", REQUEST_COLUMNS);

        let row = sqlx::query(&query)
            .bind(request_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(request_from_row).transpose()
    }

    async fn transition_request(
        &self,
        request_id: i64,
        receiver_id: Uuid,
        status: RequestStatus,
    ) -> Result<Option<MatchRequest>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let query = format!(
            r#"
            UPDATE matches SET status = $3
            WHERE id = $1 AND receiver_id = $2 AND status = 'pending'
            RETURNING {}
            "#,
            REQUEST_COLUMNS
        );

        let row = sqlx::query(&query)
            .bind(request_id)
            .bind(receiver_id)
            .bind(status)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(row) = row else {
            tx.rollback().await?;
            return Ok(None);
        };
        let updated = request_from_row(&row)?;

        if status == RequestStatus::Accepted {
            sqlx::query("UPDATE profiles SET status = 'matched' WHERE id = $1 OR id = $2")
                .bind(updated.sender_id)
                .bind(updated.receiver_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        Ok(Some(updated))
    }

    async fn incoming_requests(&self, receiver_id: Uuid) -> Result<Vec<MatchRequest>, RepositoryError> {
        let query = format!(
            r#"
            SELECT {}
            FROM matches
            WHERE receiver_id = $1 AND status <> 'rejected'
            ORDER BY created_at DESC, id DESC
            "#,
            REQUEST_COLUMNS
        );

        let rows = sqlx::query(&query)
            .bind(receiver_id)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(request_from_row).collect()
    }

    /// Health check for the database connection
    async fn health_check(&self) -> Result<bool, RepositoryError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }
}
