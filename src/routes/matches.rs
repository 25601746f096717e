use actix_web::{web, HttpResponse};

use crate::error::MatchError;
use crate::models::{FindMatchesRequest, FindMatchesResponse};
use crate::routes::AppState;

/// Configure match routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/matches", web::post().to(find_matches));
}

/// Find matches endpoint
///
/// POST /api/v1/matches
///
/// Request body:
/// ```json
/// {
///   "userId": "uuid"
/// }
/// ```
async fn find_matches(
    state: web::Data<AppState>,
    req: web::Json<FindMatchesRequest>,
) -> Result<HttpResponse, MatchError> {
    let user_id = req.user_id;
    tracing::info!("Finding matches for user: {}", user_id);

    let round = state.orchestrator.find_matches(user_id).await?;

    let response = FindMatchesResponse {
        total_results: round.matches.len(),
        matches: round.matches,
    };

    tracing::info!(
        "Returning {} matches for user {} (from {} candidates)",
        response.total_results,
        user_id,
        round.pool_size
    );

    Ok(HttpResponse::Ok().json(response))
}
