use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    db::models::{Ticket, TicketStatus, Urgency},
    error::{AppError, Result},
    middleware::auth::AuthUser,
    AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_tickets).post(create_ticket))
        .route("/summary", get(summary))
}

#[derive(Debug, Deserialize)]
pub struct CreateTicketRequest {
    pub title: String,
    pub category: String,
    pub urgency: Urgency,
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    pub q: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TicketListResponse {
    pub tickets: Vec<Ticket>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketSummary {
    pub total: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub resolved: usize,
}

async fn create_ticket(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<CreateTicketRequest>,
) -> Result<Json<Ticket>> {
    if body.title.trim().is_empty() {
        return Err(AppError::Validation("Title is required".to_string()));
    }
    if body.category.trim().is_empty() {
        return Err(AppError::Validation("Category is required".to_string()));
    }
    if body.description.trim().is_empty() {
        return Err(AppError::Validation("Description is required".to_string()));
    }

    let now = Utc::now();
    let ticket = Ticket {
        id: Uuid::new_v4().to_string(),
        title: body.title,
        category: body.category,
        urgency: body.urgency,
        description: body.description,
        status: TicketStatus::Pending,
        created_at: now,
        updated_at: now,
        user_id: user.id.clone(),
        assigned_to: None,
        assigned_engineer: None,
        work_notes: vec![],
    };

    let mut tickets = state.store.tickets(&user.id).await?;
    tickets.push(ticket.clone());
    state.store.save_tickets(&user.id, &tickets).await?;

    tracing::info!(user = %user.email, ticket = %ticket.id, "ticket created");

    Ok(Json(ticket))
}

/// The caller's own tickets, filtered in memory: exact status match
/// (absent or `all` means no filter) and a case-insensitive search term
/// over title and description.
async fn list_tickets(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<TicketListResponse>> {
    let mut tickets = state.store.tickets(&user.id).await?;

    if let Some(status) = query.status.as_deref().filter(|s| *s != "all") {
        let status = TicketStatus::parse(status)
            .ok_or_else(|| AppError::Validation(format!("Unknown status '{status}'")))?;
        tickets.retain(|t| t.status == status);
    }
    if let Some(term) = query.q.as_deref().filter(|q| !q.trim().is_empty()) {
        tickets.retain(|t| t.matches(term));
    }

    Ok(Json(TicketListResponse { tickets }))
}

async fn summary(State(state): State<AppState>, user: AuthUser) -> Result<Json<TicketSummary>> {
    let tickets = state.store.tickets(&user.id).await?;

    let count = |statuses: &[TicketStatus]| {
        tickets
            .iter()
            .filter(|t| statuses.contains(&t.status))
            .count()
    };

    Ok(Json(TicketSummary {
        total: tickets.len(),
        pending: count(&[TicketStatus::Pending]),
        in_progress: count(&[TicketStatus::Assigned, TicketStatus::InProgress]),
        resolved: count(&[TicketStatus::Resolved, TicketStatus::Closed]),
    }))
}
