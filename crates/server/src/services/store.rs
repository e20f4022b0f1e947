//! String-keyed JSON record store.
//!
//! The persisted layout is one whole JSON document per key: `allUsers` holds
//! the user array, `tickets_<userId>` one ticket array per owning user, and
//! `session_<sid>` a current-user snapshot per live session. Reads of a
//! missing key yield the default; writes replace the whole value, last write
//! wins. There is no atomicity across keys.

use serde::{de::DeserializeOwned, Serialize};
use sqlx::SqlitePool;

use crate::db::models::{Ticket, TicketWithOwner, UserRecord};
use crate::error::Result;

pub const USERS_KEY: &str = "allUsers";

pub fn tickets_key(user_id: &str) -> String {
    format!("tickets_{user_id}")
}

pub fn session_key(sid: &str) -> String {
    format!("session_{sid}")
}

/// A located ticket: the owner's full array plus the position of the ticket
/// in it. Mutations edit `tickets[index]` and save the whole array back.
pub struct TicketSlot {
    pub owner_id: String,
    pub tickets: Vec<Ticket>,
    pub index: usize,
}

#[derive(Clone)]
pub struct RecordStore {
    pool: SqlitePool,
}

impl RecordStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM records WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some((raw,)) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub async fn read_or_default<T: DeserializeOwned + Default>(&self, key: &str) -> Result<T> {
        Ok(self.read(key).await?.unwrap_or_default())
    }

    pub async fn write<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        sqlx::query(
            "INSERT INTO records (key, value) VALUES (?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(&raw)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn delete(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM records WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn users(&self) -> Result<Vec<UserRecord>> {
        self.read_or_default(USERS_KEY).await
    }

    pub async fn save_users(&self, users: &[UserRecord]) -> Result<()> {
        self.write(USERS_KEY, &users).await
    }

    pub async fn tickets(&self, user_id: &str) -> Result<Vec<Ticket>> {
        self.read_or_default(&tickets_key(user_id)).await
    }

    pub async fn save_tickets(&self, user_id: &str, tickets: &[Ticket]) -> Result<()> {
        self.write(&tickets_key(user_id), &tickets).await
    }

    /// Locate a ticket by id across every user's array.
    pub async fn find_ticket(&self, ticket_id: &str) -> Result<Option<TicketSlot>> {
        let users = self.users().await?;
        for user in users {
            let tickets = self.tickets(&user.id).await?;
            if let Some(index) = tickets.iter().position(|t| t.id == ticket_id) {
                return Ok(Some(TicketSlot {
                    owner_id: user.id,
                    tickets,
                    index,
                }));
            }
        }
        Ok(None)
    }

    /// Scan every user's ticket array, annotating each ticket with its owner.
    /// Recomputed in full on every call, as the admin and engineer views do.
    pub async fn all_tickets(&self) -> Result<Vec<TicketWithOwner>> {
        let users = self.users().await?;
        let mut all = Vec::new();
        for user in &users {
            let tickets = self.tickets(&user.id).await?;
            all.extend(tickets.into_iter().map(|ticket| TicketWithOwner {
                ticket,
                user_name: user.name.clone(),
                user_email: user.email.clone(),
            }));
        }
        Ok(all)
    }
}
