use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};

use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};

use crate::db;
use crate::models::{Group, Participant, ParticipantRecord};

static MANAGERS: AtomicUsize = AtomicUsize::new(0);

/// Fresh in-memory database with the real migrations applied.
///
/// One connection only: every connection to `:memory:` is its own database.
pub(crate) async fn memory_pool() -> SqlitePool {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .expect("memory url")
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .expect("open in-memory sqlite");
    db::run_migrations(&pool).await.expect("migrations");
    pool
}

/// A participant that only exists in memory.
pub(crate) fn participant(id: i64, name: &str) -> Participant {
    Participant {
        id,
        name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase()),
        wish_list: Vec::new(),
    }
}

/// Create a manager, a group, and one participant per name.
pub(crate) async fn seed_group(
    pool: &SqlitePool,
    names: &[&str],
) -> (Group, Vec<ParticipantRecord>) {
    let n = MANAGERS.fetch_add(1, Ordering::Relaxed);
    let manager = db::create_manager(pool, &format!("boss{n}@example.com"), &format!("token-{n}"))
        .await
        .expect("manager");
    let group = db::create_group(pool, "Office party", &format!("INVITE{n:02}"), manager.id)
        .await
        .expect("group");

    let mut people = Vec::with_capacity(names.len());
    for name in names {
        let email = format!("{}@example.com", name.to_lowercase());
        people.push(
            db::add_participant(pool, group.id, name, &email)
                .await
                .expect("participant"),
        );
    }
    (group, people)
}
