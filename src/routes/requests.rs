use actix_web::{web, HttpResponse};
use validator::Validate;

use crate::error::MatchError;
use crate::models::{RespondRequest, SendRequestRequest, SendRequestResponse, UserQuery};
use crate::routes::AppState;

/// Configure roommate request routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/requests", web::post().to(send_request))
        .route("/requests/incoming", web::get().to(incoming_requests))
        .route("/requests/{id}/accept", web::post().to(accept_request))
        .route("/requests/{id}/reject", web::post().to(reject_request));
}

/// Send request endpoint
///
/// POST /api/v1/requests
///
/// Request body:
/// ```json
/// {
///   "senderId": "uuid",
///   "receiverId": "uuid",
///   "message": "string",
///   "contactInfo": "string"
/// }
/// ```
async fn send_request(
    state: web::Data<AppState>,
    req: web::Json<SendRequestRequest>,
) -> Result<HttpResponse, MatchError> {
    if let Err(errors) = req.validate() {
        tracing::info!("Validation failed for request {} -> {}: {}", req.sender_id, req.receiver_id, errors);
        return Err(errors.into());
    }

    let request = state
        .ledger
        .send(req.sender_id, req.receiver_id, &req.message, &req.contact_info)
        .await?;

    Ok(HttpResponse::Created().json(SendRequestResponse {
        success: true,
        request,
    }))
}

async fn accept_request(
    state: web::Data<AppState>,
    path: web::Path<i64>,
    req: web::Json<RespondRequest>,
) -> Result<HttpResponse, MatchError> {
    let request = state.ledger.accept(path.into_inner(), req.receiver_id).await?;
    Ok(HttpResponse::Ok().json(request))
}

async fn reject_request(
    state: web::Data<AppState>,
    path: web::Path<i64>,
    req: web::Json<RespondRequest>,
) -> Result<HttpResponse, MatchError> {
    let request = state.ledger.reject(path.into_inner(), req.receiver_id).await?;
    Ok(HttpResponse::Ok().json(request))
}

/// GET /api/v1/requests/incoming?userId=
async fn incoming_requests(
    state: web::Data<AppState>,
    query: web::Query<UserQuery>,
) -> Result<HttpResponse, MatchError> {
    let requests = state.ledger.incoming(query.user_id).await?;
    Ok(HttpResponse::Ok().json(requests))
}
