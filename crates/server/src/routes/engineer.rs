use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    db::models::{Ticket, TicketStatus, TicketWithOwner, WorkNote},
    error::{AppError, Result},
    middleware::auth::AuthUser,
    AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/tickets", get(list_assigned))
        .route("/tickets/:id/status", post(update_status))
        .route("/tickets/:id/notes", post(add_work_note))
        .route("/summary", get(summary))
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: TicketStatus,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddWorkNoteRequest {
    pub note: String,
}

#[derive(Debug, Serialize)]
pub struct AssignedTicketsResponse {
    pub tickets: Vec<TicketWithOwner>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineerSummary {
    pub total: usize,
    pub assigned: usize,
    pub in_progress: usize,
    pub resolved: usize,
}

async fn assigned_tickets(state: &AppState, engineer_id: &str) -> Result<Vec<TicketWithOwner>> {
    let mut tickets: Vec<TicketWithOwner> = state
        .store
        .all_tickets()
        .await?
        .into_iter()
        .filter(|t| t.ticket.assigned_to.as_deref() == Some(engineer_id))
        .collect();

    // Urgent work first, then by how actionable the ticket is.
    tickets.sort_by(|a, b| {
        b.ticket
            .urgency
            .rank()
            .cmp(&a.ticket.urgency.rank())
            .then(b.ticket.status.work_order().cmp(&a.ticket.status.work_order()))
    });

    Ok(tickets)
}

async fn list_assigned(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<AssignedTicketsResponse>> {
    let tickets = assigned_tickets(&state, &user.id).await?;
    Ok(Json(AssignedTicketsResponse { tickets }))
}

async fn summary(State(state): State<AppState>, user: AuthUser) -> Result<Json<EngineerSummary>> {
    let tickets = assigned_tickets(&state, &user.id).await?;

    let count = |status: TicketStatus| tickets.iter().filter(|t| t.ticket.status == status).count();

    Ok(Json(EngineerSummary {
        total: tickets.len(),
        assigned: count(TicketStatus::Assigned),
        in_progress: count(TicketStatus::InProgress),
        resolved: count(TicketStatus::Resolved),
    }))
}

fn work_note(engineer: &AuthUser, note: &str, status: TicketStatus) -> WorkNote {
    WorkNote {
        id: Uuid::new_v4().to_string(),
        note: note.to_string(),
        timestamp: Utc::now(),
        engineer_name: engineer.name.clone(),
        status,
    }
}

async fn update_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(body): Json<UpdateStatusRequest>,
) -> Result<Json<Ticket>> {
    let mut slot = state
        .store
        .find_ticket(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("Ticket not found".to_string()))?;

    let ticket = &mut slot.tickets[slot.index];
    if ticket.assigned_to.as_deref() != Some(user.id.as_str()) {
        return Err(AppError::Forbidden(
            "This ticket is not assigned to you".to_string(),
        ));
    }
    if !ticket.status.can_transition_to(body.status) {
        return Err(AppError::Validation(format!(
            "Cannot move a {} ticket to {}",
            ticket.status, body.status
        )));
    }

    ticket.status = body.status;
    ticket.updated_at = Utc::now();
    if let Some(note) = body.note.as_deref().filter(|n| !n.trim().is_empty()) {
        ticket.work_notes.push(work_note(&user, note, body.status));
    }

    let updated = ticket.clone();
    state.store.save_tickets(&slot.owner_id, &slot.tickets).await?;

    tracing::info!(engineer = %user.email, ticket = %id, status = %updated.status, "ticket status updated");

    Ok(Json(updated))
}

async fn add_work_note(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(body): Json<AddWorkNoteRequest>,
) -> Result<Json<Ticket>> {
    if body.note.trim().is_empty() {
        return Err(AppError::Validation("Note is required".to_string()));
    }

    let mut slot = state
        .store
        .find_ticket(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("Ticket not found".to_string()))?;

    let ticket = &mut slot.tickets[slot.index];
    if ticket.assigned_to.as_deref() != Some(user.id.as_str()) {
        return Err(AppError::Forbidden(
            "This ticket is not assigned to you".to_string(),
        ));
    }

    // Notes carry the status the ticket had when the note was written.
    let status = ticket.status;
    ticket.work_notes.push(work_note(&user, body.note.trim(), status));
    ticket.updated_at = Utc::now();

    let updated = ticket.clone();
    state.store.save_tickets(&slot.owner_id, &slot.tickets).await?;

    Ok(Json(updated))
}
