//! Demo account bootstrap, mirroring the portal's first-run fixtures.
//! Only runs when `SEED_DEMO_USERS` is set and no `allUsers` record exists.

use chrono::Utc;

use crate::db::models::{Role, UserRecord};
use crate::error::Result;
use crate::routes::auth::hash_password;
use crate::services::store::{RecordStore, USERS_KEY};

const DEMO_PASSWORD: &str = "password123";

pub async fn seed_demo_users(store: &RecordStore) -> Result<()> {
    let existing: Option<Vec<UserRecord>> = store.read(USERS_KEY).await?;
    if existing.is_some() {
        return Ok(());
    }

    let accounts = [
        ("user1", "John Doe", "user1@peterpan.com", Role::User, None),
        ("user2", "Jane Smith", "user2@peterpan.com", Role::User, None),
        (
            "eng1",
            "Mike Johnson",
            "eng1@peterpan.com",
            Role::Engineer,
            Some("EMP-001"),
        ),
        (
            "eng2",
            "Sarah Wilson",
            "eng2@peterpan.com",
            Role::Engineer,
            Some("EMP-002"),
        ),
        ("admin1", "Admin User", "admin@peterpan.com", Role::Admin, None),
    ];

    let now = Utc::now();
    let mut users = Vec::with_capacity(accounts.len());
    for (id, name, email, role, employee_id) in accounts {
        users.push(UserRecord {
            id: id.to_string(),
            name: name.to_string(),
            email: email.to_string(),
            password_hash: hash_password(DEMO_PASSWORD)?,
            role,
            status: "active".to_string(),
            employee_id: employee_id.map(str::to_string),
            created_at: now,
        });
    }

    store.save_users(&users).await?;
    tracing::info!("seeded {} demo accounts", users.len());

    Ok(())
}
