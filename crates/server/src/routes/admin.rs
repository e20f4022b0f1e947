use std::collections::BTreeMap;

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    db::models::{Role, Ticket, TicketStatus, TicketWithOwner, UserRecord},
    error::{AppError, Result},
    middleware::auth::AuthUser,
    routes::auth::hash_password,
    services::store::tickets_key,
    AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/tickets", get(list_all_tickets))
        .route("/tickets/:id/assign", post(assign_ticket))
        .route("/tickets/:id/unassign", post(unassign_ticket))
        .route("/users", get(list_users).post(add_user))
        .route("/users/:id", axum::routing::delete(delete_user))
        .route("/reports", get(reports))
}

#[derive(Debug, Serialize)]
pub struct AllTicketsResponse {
    pub tickets: Vec<TicketWithOwner>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignRequest {
    pub engineer_id: String,
}

#[derive(Debug, Deserialize)]
pub struct AddUserRequest {
    pub name: String,
    pub email: String,
    pub role: Role,
    pub password: String,
}

/// User as exposed to the admin portal; the stored password hash stays out
/// of responses.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employee_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&UserRecord> for UserResponse {
    fn from(user: &UserRecord) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            status: user.status.clone(),
            employee_id: user.employee_id.clone(),
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub users: Vec<UserResponse>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineerWorkload {
    pub name: String,
    pub email: String,
    pub ticket_count: usize,
}

/// One slice of the ticket distribution: a raw count plus its share of the
/// total, 0 when there are no tickets at all.
#[derive(Debug, Serialize)]
pub struct DistributionSlice {
    pub count: usize,
    pub percent: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportResponse {
    pub total_users: usize,
    pub total_engineers: usize,
    pub total_tickets: usize,
    pub pending_tickets: usize,
    pub assigned_tickets: usize,
    pub resolved_tickets: usize,
    /// Percentage of tickets resolved or closed; 0 when there are none.
    pub resolution_rate: u32,
    pub tickets_by_category: BTreeMap<String, DistributionSlice>,
    pub tickets_by_urgency: BTreeMap<String, DistributionSlice>,
    pub engineer_workload: Vec<EngineerWorkload>,
}

async fn list_all_tickets(State(state): State<AppState>) -> Result<Json<AllTicketsResponse>> {
    let tickets = state.store.all_tickets().await?;
    Ok(Json(AllTicketsResponse { tickets }))
}

async fn assign_ticket(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(body): Json<AssignRequest>,
) -> Result<Json<Ticket>> {
    // The target must be an existing engineer account.
    let users = state.store.users().await?;
    let engineer = users
        .iter()
        .find(|u| u.id == body.engineer_id && u.role == Role::Engineer)
        .ok_or_else(|| AppError::NotFound("Engineer not found".to_string()))?;
    let engineer_name = engineer.name.clone();

    let mut slot = state
        .store
        .find_ticket(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("Ticket not found".to_string()))?;

    let ticket = &mut slot.tickets[slot.index];
    if !ticket.status.can_transition_to(TicketStatus::Assigned) {
        return Err(AppError::Validation(format!(
            "Only pending tickets can be assigned (ticket is {})",
            ticket.status
        )));
    }

    ticket.status = TicketStatus::Assigned;
    ticket.assigned_to = Some(body.engineer_id.clone());
    ticket.assigned_engineer = Some(engineer_name.clone());
    ticket.updated_at = Utc::now();

    let updated = ticket.clone();
    state.store.save_tickets(&slot.owner_id, &slot.tickets).await?;

    tracing::info!(admin = %user.email, ticket = %id, engineer = %engineer_name, "ticket assigned");

    Ok(Json(updated))
}

/// The reverse edge assigned -> pending: put the ticket back in the pool.
async fn unassign_ticket(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Ticket>> {
    let mut slot = state
        .store
        .find_ticket(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("Ticket not found".to_string()))?;

    let ticket = &mut slot.tickets[slot.index];
    if !ticket.status.can_transition_to(TicketStatus::Pending) {
        return Err(AppError::Validation(format!(
            "Only assigned tickets can be unassigned (ticket is {})",
            ticket.status
        )));
    }

    ticket.status = TicketStatus::Pending;
    ticket.assigned_to = None;
    ticket.assigned_engineer = None;
    ticket.updated_at = Utc::now();

    let updated = ticket.clone();
    state.store.save_tickets(&slot.owner_id, &slot.tickets).await?;

    tracing::info!(admin = %user.email, ticket = %id, "ticket unassigned");

    Ok(Json(updated))
}

async fn list_users(State(state): State<AppState>) -> Result<Json<UserListResponse>> {
    let users = state.store.users().await?;
    let users = users.iter().map(UserResponse::from).collect();
    Ok(Json(UserListResponse { users }))
}

async fn add_user(
    State(state): State<AppState>,
    Json(body): Json<AddUserRequest>,
) -> Result<Json<UserResponse>> {
    if body.name.trim().is_empty() {
        return Err(AppError::Validation("Name is required".to_string()));
    }
    if body.email.is_empty() || !body.email.contains('@') {
        return Err(AppError::Validation("Invalid email address".to_string()));
    }
    if body.password.len() < 6 {
        return Err(AppError::Validation(
            "Password must be at least 6 characters".to_string(),
        ));
    }

    let mut users = state.store.users().await?;
    if users.iter().any(|u| u.email == body.email) {
        return Err(AppError::Validation(
            "A user with this email already exists".to_string(),
        ));
    }

    let user = UserRecord {
        id: Uuid::new_v4().to_string(),
        name: body.name,
        email: body.email,
        password_hash: hash_password(&body.password)?,
        role: body.role,
        status: "active".to_string(),
        employee_id: None,
        created_at: Utc::now(),
    };

    let response = UserResponse::from(&user);
    users.push(user);
    state.store.save_users(&users).await?;

    Ok(Json(response))
}

async fn delete_user(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<()>> {
    if id == user.id {
        return Err(AppError::Validation(
            "Cannot delete your own account".to_string(),
        ));
    }

    let mut users = state.store.users().await?;
    let before = users.len();
    users.retain(|u| u.id != id);
    if users.len() == before {
        return Err(AppError::NotFound("User not found".to_string()));
    }
    state.store.save_users(&users).await?;

    // Every view scans off `allUsers`, so the ticket array would be
    // unreachable; drop it with the user.
    state.store.delete(&tickets_key(&id)).await?;

    Ok(Json(()))
}

async fn reports(State(state): State<AppState>) -> Result<Json<ReportResponse>> {
    let users = state.store.users().await?;
    let tickets = state.store.all_tickets().await?;

    let total = tickets.len();
    let count = |statuses: &[TicketStatus]| {
        tickets
            .iter()
            .filter(|t| statuses.contains(&t.ticket.status))
            .count()
    };
    let resolved = count(&[TicketStatus::Resolved, TicketStatus::Closed]);

    let mut by_category: BTreeMap<String, usize> = BTreeMap::new();
    let mut by_urgency: BTreeMap<String, usize> = BTreeMap::new();
    let mut per_engineer: BTreeMap<&str, usize> = BTreeMap::new();
    for t in &tickets {
        *by_category.entry(t.ticket.category.clone()).or_default() += 1;
        *by_urgency.entry(t.ticket.urgency.to_string()).or_default() += 1;
        if let Some(engineer_id) = t.ticket.assigned_to.as_deref() {
            *per_engineer.entry(engineer_id).or_default() += 1;
        }
    }

    let percent = |count: usize| {
        if total > 0 {
            (count * 100 / total) as u32
        } else {
            0
        }
    };
    let distribution = |counts: BTreeMap<String, usize>| {
        counts
            .into_iter()
            .map(|(key, count)| {
                (
                    key,
                    DistributionSlice {
                        count,
                        percent: percent(count),
                    },
                )
            })
            .collect::<BTreeMap<_, _>>()
    };

    let engineers: Vec<&UserRecord> = users.iter().filter(|u| u.role == Role::Engineer).collect();
    let engineer_workload = engineers
        .iter()
        .map(|e| EngineerWorkload {
            name: e.name.clone(),
            email: e.email.clone(),
            ticket_count: per_engineer.get(e.id.as_str()).copied().unwrap_or(0),
        })
        .collect();

    Ok(Json(ReportResponse {
        total_users: users.iter().filter(|u| u.role == Role::User).count(),
        total_engineers: engineers.len(),
        total_tickets: total,
        pending_tickets: count(&[TicketStatus::Pending]),
        assigned_tickets: count(&[TicketStatus::Assigned, TicketStatus::InProgress]),
        resolved_tickets: resolved,
        resolution_rate: percent(resolved),
        tickets_by_category: distribution(by_category),
        tickets_by_urgency: distribution(by_urgency),
        engineer_workload,
    }))
}
