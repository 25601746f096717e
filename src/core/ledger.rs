use std::sync::Arc;
use uuid::Uuid;

use crate::error::MatchError;
use crate::models::{IncomingRequest, MatchRequest, NewMatchRequest, RequestStatus, SenderSummary};
use crate::services::{InsertOutcome, ProfileRepository};

/// Records roommate-request handshakes.
///
/// State machine: `pending -> accepted` or `pending -> rejected`; both are terminal.
#[derive(Clone)]
pub struct RequestLedger {
    repo: Arc<dyn ProfileRepository>,
}

impl RequestLedger {
    pub fn new(repo: Arc<dyn ProfileRepository>) -> Self {
        Self { repo }
    }

    /// Send a request from `sender_id` to `receiver_id`.
    ///
    /// Fails with a conflict carrying the existing status when a pending or
    /// accepted request already links the two users in either direction.
    pub async fn send(
        &self,
        sender_id: Uuid,
        receiver_id: Uuid,
        message: &str,
        contact: &str,
    ) -> Result<MatchRequest, MatchError> {
        let contact = contact.trim();
        if contact.is_empty() {
            return Err(MatchError::ValidationFailed("contact must not be empty".into()));
        }
        if sender_id == receiver_id {
            return Err(MatchError::ValidationFailed("cannot send a request to yourself".into()));
        }

        for user_id in [sender_id, receiver_id] {
            if self.repo.get_profile(user_id).await?.is_none() {
                return Err(MatchError::NotFound(format!("profile {} not found", user_id)));
            }
        }

        let request = NewMatchRequest {
            sender_id,
            receiver_id,
            message: message.trim().to_string(),
            contact: contact.to_string(),
        };

        match self.repo.insert_request_if_absent(&request).await? {
            InsertOutcome::Inserted(stored) => {
                tracing::info!("Request {} sent: {} -> {}", stored.id, sender_id, receiver_id);
                Ok(stored)
            }
            InsertOutcome::Existing(existing) => {
                tracing::info!(
                    "Duplicate request {} -> {} blocked by request {} ({})",
                    sender_id,
                    receiver_id,
                    existing.id,
                    existing.status
                );
                Err(MatchError::DuplicateRequest { existing: existing.status })
            }
        }
    }

    pub async fn accept(&self, request_id: i64, receiver_id: Uuid) -> Result<MatchRequest, MatchError> {
        self.respond(request_id, receiver_id, RequestStatus::Accepted).await
    }

    pub async fn reject(&self, request_id: i64, receiver_id: Uuid) -> Result<MatchRequest, MatchError> {
        self.respond(request_id, receiver_id, RequestStatus::Rejected).await
    }

    /// Requests waiting on or accepted by `receiver_id`, newest first, with
    /// the sender's nickname, gender and lifestyle attached
    pub async fn incoming(&self, receiver_id: Uuid) -> Result<Vec<IncomingRequest>, MatchError> {
        let requests = self.repo.incoming_requests(receiver_id).await?;

        let mut incoming = Vec::with_capacity(requests.len());
        for request in requests {
            let sender = self.repo.get_profile(request.sender_id).await?;
            if sender.is_none() {
                tracing::warn!("Request {} names unknown sender {}", request.id, request.sender_id);
            }
            incoming.push(IncomingRequest::new(request, sender.as_ref().map(SenderSummary::from)));
        }

        Ok(incoming)
    }

    async fn respond(
        &self,
        request_id: i64,
        receiver_id: Uuid,
        status: RequestStatus,
    ) -> Result<MatchRequest, MatchError> {
        let not_found = || MatchError::NotFound(format!("no request {} addressed to {}", request_id, receiver_id));

        let current = self.repo.get_request(request_id).await?.ok_or_else(not_found)?;
        if current.receiver_id != receiver_id {
            return Err(not_found());
        }
        if current.status != RequestStatus::Pending {
            return Err(MatchError::RequestClosed { current: current.status });
        }

        match self.repo.transition_request(request_id, receiver_id, status).await? {
            Some(updated) => {
                tracing::info!("Request {} {}", request_id, updated.status);
                Ok(updated)
            }
            None => {
                // Answered concurrently between the read and the update
                let latest = self.repo.get_request(request_id).await?.ok_or_else(not_found)?;
                Err(MatchError::RequestClosed { current: latest.status })
            }
        }
    }
}
