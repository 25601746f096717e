use actix_web::{web, HttpResponse, Responder};
use validator::Validate;

use crate::error::MatchError;
use crate::models::{
    CalibrationRequest, CalibrationResponse, CardsResponse, FeedbackRequest, FeedbackResponse,
    HealthResponse, LifestyleAttributes, SurveyRequest, SurveyResponse, SurveySubmission, UserQuery,
};
use crate::core::TOTAL_ROUNDS;
use crate::routes::AppState;

/// Configure survey, calibration and feedback routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/survey", web::post().to(submit_survey))
        .route("/calibration/cards", web::get().to(calibration_cards))
        .route("/calibration", web::post().to(submit_calibration))
        .route("/feedback", web::post().to(submit_feedback));
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let store_healthy = match state.repo.health_check().await {
        Ok(healthy) => healthy,
        Err(e) => {
            tracing::warn!("Store health check failed: {}", e);
            false
        }
    };

    let status = if store_healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Survey endpoint
///
/// POST /api/v1/survey
///
/// Stores the answers and resets weights and calibration to their initial state.
async fn submit_survey(
    state: web::Data<AppState>,
    req: web::Json<SurveyRequest>,
) -> Result<HttpResponse, MatchError> {
    if let Err(errors) = req.validate() {
        tracing::info!("Validation failed for survey of {}: {}", req.user_id, errors);
        return Err(errors.into());
    }

    let req = req.into_inner();
    let submission = SurveySubmission {
        user_id: req.user_id,
        nickname: req.nickname.trim().to_string(),
        gender: req.gender,
        lifestyle: LifestyleAttributes {
            sleep_time: req.sleep_time,
            wake_time: req.wake_time,
            clean_cycle: req.clean_cycle,
            hvac: req.hvac,
            sound_sensitivity: req.sound_sensitivity,
            outing: req.outing,
            smoke: req.smoke,
            sleep_habit: req.sleep_habit,
        },
    };

    let record = state.calibration.submit_survey(submission).await?;

    Ok(HttpResponse::Ok().json(SurveyResponse {
        success: true,
        weights: record.weights,
    }))
}

/// GET /api/v1/calibration/cards?userId=
async fn calibration_cards(
    state: web::Data<AppState>,
    query: web::Query<UserQuery>,
) -> Result<HttpResponse, MatchError> {
    let set = state.calibration.cards_for(query.user_id).await?;

    Ok(HttpResponse::Ok().json(CardsResponse {
        round: set.round,
        total_rounds: TOTAL_ROUNDS,
        complete: set.complete,
        cards: set.cards,
    }))
}

/// Calibration endpoint
///
/// POST /api/v1/calibration
///
/// Request body:
/// ```json
/// {
///   "userId": "uuid",
///   "round": 0,
///   "cardId": 2
/// }
/// ```
async fn submit_calibration(
    state: web::Data<AppState>,
    req: web::Json<CalibrationRequest>,
) -> Result<HttpResponse, MatchError> {
    req.validate()?;

    tracing::info!("Calibration pick from {}: round {}, card {}", req.user_id, req.round, req.card_id);

    let outcome = state
        .calibration
        .submit(req.user_id, req.round, req.card_id)
        .await?;

    Ok(HttpResponse::Ok().json(CalibrationResponse {
        round: outcome.round,
        complete: outcome.complete,
        weights: outcome.weights,
    }))
}

async fn submit_feedback(
    state: web::Data<AppState>,
    req: web::Json<FeedbackRequest>,
) -> Result<HttpResponse, MatchError> {
    req.validate()?;

    let weights = state.feedback.submit(req.user_id, &req.feedback_text).await?;

    Ok(HttpResponse::Ok().json(FeedbackResponse {
        success: true,
        weights,
    }))
}
