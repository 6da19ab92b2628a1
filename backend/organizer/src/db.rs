//! Database layer — migrations and every query the service runs.

use std::collections::HashMap;
use std::str::FromStr;

use chrono::Utc;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use tracing::info;

use crate::errors::{is_unique_violation, Result, SantaError};
use crate::models::{
    AppManager, Assignment, AssignmentRecord, DeliveryStatus, GiftWish, Group, GroupId,
    GroupSummary, Participant, ParticipantId, ParticipantRecord, RunId, RunRecord, RunStatus,
};

/// Establish a SQLite connection pool and run pending migrations.
pub async fn init_pool(database_url: &str) -> Result<SqlitePool> {
    let url = if database_url.starts_with("sqlite:") {
        database_url.to_string()
    } else {
        format!("sqlite:{database_url}")
    };

    // Make sure the file is created if it doesn't exist yet.
    let options = SqliteConnectOptions::from_str(&url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;
    Ok(pool)
}

pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("Database migrations applied successfully");
    Ok(())
}

fn now() -> i64 {
    Utc::now().timestamp()
}

// ─────────────────────────────────────────────────────────
// App managers
// ─────────────────────────────────────────────────────────

pub async fn create_manager(pool: &SqlitePool, email: &str, token: &str) -> Result<AppManager> {
    sqlx::query_as::<_, AppManager>(
        r#"
        INSERT INTO app_managers (email, token, created_at)
        VALUES (?1, ?2, ?3)
        RETURNING id, email, token
        "#,
    )
    .bind(email)
    .bind(token)
    .bind(now())
    .fetch_one(pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            SantaError::Conflict(format!("a manager already exists for {email}"))
        } else {
            e.into()
        }
    })
}

pub async fn get_manager_by_token(pool: &SqlitePool, token: &str) -> Result<Option<AppManager>> {
    let row = sqlx::query_as::<_, AppManager>(
        "SELECT id, email, token FROM app_managers WHERE token = ?1",
    )
    .bind(token)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

// ─────────────────────────────────────────────────────────
// Groups
// ─────────────────────────────────────────────────────────

pub async fn create_group(
    pool: &SqlitePool,
    name: &str,
    invite_code: &str,
    manager_id: i64,
) -> Result<Group> {
    sqlx::query_as::<_, Group>(
        r#"
        INSERT INTO santa_groups (name, invite_code, manager_id, created_at)
        VALUES (?1, ?2, ?3, ?4)
        RETURNING id, name, invite_code, manager_id, created_at
        "#,
    )
    .bind(name)
    .bind(invite_code)
    .bind(manager_id)
    .bind(now())
    .fetch_one(pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            SantaError::Conflict(format!("invite code {invite_code} is taken"))
        } else {
            e.into()
        }
    })
}

pub async fn get_group(pool: &SqlitePool, group_id: GroupId) -> Result<Option<Group>> {
    let row = sqlx::query_as::<_, Group>(
        "SELECT id, name, invite_code, manager_id, created_at FROM santa_groups WHERE id = ?1",
    )
    .bind(group_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn get_group_by_invite(pool: &SqlitePool, invite_code: &str) -> Result<Option<Group>> {
    let row = sqlx::query_as::<_, Group>(
        r#"
        SELECT id, name, invite_code, manager_id, created_at
        FROM   santa_groups
        WHERE  invite_code = ?1
        "#,
    )
    .bind(invite_code)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn list_groups_for_manager(
    pool: &SqlitePool,
    manager_id: i64,
) -> Result<Vec<GroupSummary>> {
    let rows = sqlx::query_as::<_, GroupSummary>(
        r#"
        SELECT g.id, g.name, g.invite_code, g.created_at,
               (SELECT COUNT(*) FROM participants p WHERE p.group_id = g.id) AS participant_count
        FROM   santa_groups g
        WHERE  g.manager_id = ?1
        ORDER  BY g.created_at DESC, g.id DESC
        "#,
    )
    .bind(manager_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Returns `false` when no such group exists.
pub async fn rename_group(pool: &SqlitePool, group_id: GroupId, name: &str) -> Result<bool> {
    let affected = sqlx::query("UPDATE santa_groups SET name = ?1 WHERE id = ?2")
        .bind(name)
        .bind(group_id)
        .execute(pool)
        .await?
        .rows_affected();
    Ok(affected > 0)
}

/// Deletes the group together with its participants, gifts and runs.
pub async fn delete_group(pool: &SqlitePool, group_id: GroupId) -> Result<bool> {
    let affected = sqlx::query("DELETE FROM santa_groups WHERE id = ?1")
        .bind(group_id)
        .execute(pool)
        .await?
        .rows_affected();
    Ok(affected > 0)
}

// ─────────────────────────────────────────────────────────
// Participants
// ─────────────────────────────────────────────────────────

pub async fn add_participant(
    pool: &SqlitePool,
    group_id: GroupId,
    name: &str,
    email: &str,
) -> Result<ParticipantRecord> {
    sqlx::query_as::<_, ParticipantRecord>(
        r#"
        INSERT INTO participants (group_id, name, email, created_at)
        VALUES (?1, ?2, ?3, ?4)
        RETURNING id, group_id, name, email, created_at
        "#,
    )
    .bind(group_id)
    .bind(name)
    .bind(email)
    .bind(now())
    .fetch_one(pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            SantaError::Conflict(format!("{email} is already a member of this group"))
        } else {
            e.into()
        }
    })
}

pub async fn get_participant(
    pool: &SqlitePool,
    participant_id: ParticipantId,
) -> Result<Option<ParticipantRecord>> {
    let row = sqlx::query_as::<_, ParticipantRecord>(
        "SELECT id, group_id, name, email, created_at FROM participants WHERE id = ?1",
    )
    .bind(participant_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Remove a participant and, by cascade, their wish list and any past
/// assignments that name them.
///
/// Refused while the group has a draw in progress: returns `Ok(false)` both
/// then and when no such participant is in the group.
pub async fn delete_participant(
    pool: &SqlitePool,
    group_id: GroupId,
    participant_id: ParticipantId,
) -> Result<bool> {
    let affected = sqlx::query(
        r#"
        DELETE FROM participants
        WHERE  id = ?1 AND group_id = ?2
          AND  NOT EXISTS (SELECT 1 FROM runs WHERE group_id = ?2 AND status = ?3)
        "#,
    )
    .bind(participant_id)
    .bind(group_id)
    .bind(RunStatus::InProgress.as_str())
    .execute(pool)
    .await?
    .rows_affected();
    Ok(affected > 0)
}

/// Full snapshot of a group's participants with their wish lists, ordered by
/// join order.
pub async fn list_participants(pool: &SqlitePool, group_id: GroupId) -> Result<Vec<Participant>> {
    let people = sqlx::query_as::<_, ParticipantRecord>(
        r#"
        SELECT id, group_id, name, email, created_at
        FROM   participants
        WHERE  group_id = ?1
        ORDER  BY id ASC
        "#,
    )
    .bind(group_id)
    .fetch_all(pool)
    .await?;

    let gifts: Vec<(ParticipantId, i64, String, Option<String>, bool)> = sqlx::query_as(
        r#"
        SELECT g.participant_id, g.id, g.name, g.link, g.bought
        FROM   gifts g
        JOIN   participants p ON p.id = g.participant_id
        WHERE  p.group_id = ?1
        ORDER  BY g.id ASC
        "#,
    )
    .bind(group_id)
    .fetch_all(pool)
    .await?;

    let mut wishes: HashMap<ParticipantId, Vec<GiftWish>> = HashMap::new();
    for (owner, id, name, link, bought) in gifts {
        wishes.entry(owner).or_default().push(GiftWish {
            id,
            name,
            link,
            bought,
        });
    }

    Ok(people
        .into_iter()
        .map(|p| Participant {
            wish_list: wishes.remove(&p.id).unwrap_or_default(),
            id: p.id,
            name: p.name,
            email: p.email,
        })
        .collect())
}

/// A single participant with their current wish list.
pub async fn get_participant_with_gifts(
    pool: &SqlitePool,
    participant_id: ParticipantId,
) -> Result<Option<Participant>> {
    let Some(p) = get_participant(pool, participant_id).await? else {
        return Ok(None);
    };
    let wish_list = list_gifts(pool, participant_id).await?;
    Ok(Some(Participant {
        id: p.id,
        name: p.name,
        email: p.email,
        wish_list,
    }))
}

// ─────────────────────────────────────────────────────────
// Gifts
// ─────────────────────────────────────────────────────────

pub async fn list_gifts(pool: &SqlitePool, participant_id: ParticipantId) -> Result<Vec<GiftWish>> {
    let rows = sqlx::query_as::<_, GiftWish>(
        r#"
        SELECT id, name, link, bought
        FROM   gifts
        WHERE  participant_id = ?1
        ORDER  BY id ASC
        "#,
    )
    .bind(participant_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn create_gift(
    pool: &SqlitePool,
    participant_id: ParticipantId,
    name: &str,
    link: Option<&str>,
) -> Result<GiftWish> {
    let gift = sqlx::query_as::<_, GiftWish>(
        r#"
        INSERT INTO gifts (participant_id, name, link, bought, created_at)
        VALUES (?1, ?2, ?3, 0, ?4)
        RETURNING id, name, link, bought
        "#,
    )
    .bind(participant_id)
    .bind(name)
    .bind(link)
    .bind(now())
    .fetch_one(pool)
    .await?;
    Ok(gift)
}

/// Update the name and/or link of a gift; `None` leaves a field untouched.
pub async fn update_gift(
    pool: &SqlitePool,
    gift_id: i64,
    name: Option<&str>,
    link: Option<&str>,
) -> Result<Option<GiftWish>> {
    let row = sqlx::query_as::<_, GiftWish>(
        r#"
        UPDATE gifts
        SET    name = COALESCE(?1, name),
               link = COALESCE(?2, link)
        WHERE  id = ?3
        RETURNING id, name, link, bought
        "#,
    )
    .bind(name)
    .bind(link)
    .bind(gift_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn mark_gift_bought(pool: &SqlitePool, gift_id: i64) -> Result<Option<GiftWish>> {
    let row = sqlx::query_as::<_, GiftWish>(
        "UPDATE gifts SET bought = 1 WHERE id = ?1 RETURNING id, name, link, bought",
    )
    .bind(gift_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn delete_gift(pool: &SqlitePool, gift_id: i64) -> Result<bool> {
    let affected = sqlx::query("DELETE FROM gifts WHERE id = ?1")
        .bind(gift_id)
        .execute(pool)
        .await?
        .rows_affected();
    Ok(affected > 0)
}

// ─────────────────────────────────────────────────────────
// Runs
// ─────────────────────────────────────────────────────────

/// Record a freshly triggered run in `pending` state.
pub async fn create_run(pool: &SqlitePool, group_id: GroupId, triggered_by: &str) -> Result<RunId> {
    let (id,): (RunId,) = sqlx::query_as(
        r#"
        INSERT INTO runs (group_id, status, triggered_by, started_at)
        VALUES (?1, ?2, ?3, ?4)
        RETURNING id
        "#,
    )
    .bind(group_id)
    .bind(RunStatus::Pending.as_str())
    .bind(triggered_by)
    .bind(now())
    .fetch_one(pool)
    .await?;
    Ok(id)
}

/// Move a pending run to `in_progress`.
///
/// This single UPDATE is the per-group guard: the partial unique index on
/// `runs(group_id) WHERE status = 'in_progress'` rejects it while another
/// run for the same group is in flight, in which case `Ok(false)` is returned.
pub async fn try_start_run(pool: &SqlitePool, run_id: RunId) -> Result<bool> {
    let result = sqlx::query("UPDATE runs SET status = ?1 WHERE id = ?2 AND status = ?3")
        .bind(RunStatus::InProgress.as_str())
        .bind(run_id)
        .bind(RunStatus::Pending.as_str())
        .execute(pool)
        .await;

    match result {
        Ok(done) => Ok(done.rows_affected() == 1),
        Err(e) if is_unique_violation(&e) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

pub async fn fail_run(pool: &SqlitePool, run_id: RunId, reason: &str) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE runs
        SET    status = ?1, failure_reason = ?2, completed_at = ?3
        WHERE  id = ?4
        "#,
    )
    .bind(RunStatus::Failed.as_str())
    .bind(reason)
    .bind(now())
    .bind(run_id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn complete_run(
    pool: &SqlitePool,
    run_id: RunId,
    delivered: usize,
    failed: usize,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE runs
        SET    status = ?1, delivered = ?2, failed = ?3, completed_at = ?4
        WHERE  id = ?5
        "#,
    )
    .bind(RunStatus::Completed.as_str())
    .bind(delivered as i64)
    .bind(failed as i64)
    .bind(now())
    .bind(run_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Reset a run's counters from its assignments' delivery status. Anything
/// not recorded as delivered counts as failed.
pub async fn recount_deliveries(pool: &SqlitePool, run_id: RunId) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE runs
        SET    delivered = (SELECT COUNT(*) FROM assignments
                            WHERE run_id = ?1 AND delivery_status = ?2),
               failed    = (SELECT COUNT(*) FROM assignments
                            WHERE run_id = ?1 AND delivery_status <> ?2)
        WHERE  id = ?1
        "#,
    )
    .bind(run_id)
    .bind(DeliveryStatus::Delivered.as_str())
    .execute(pool)
    .await?;
    Ok(())
}

/// Mark runs a previous process left in flight as failed so their groups can
/// be drawn again. Returns how many were released.
pub async fn fail_interrupted_runs(pool: &SqlitePool) -> Result<u64> {
    let affected = sqlx::query(
        r#"
        UPDATE runs
        SET    status = ?1, failure_reason = 'interrupted', completed_at = ?2
        WHERE  status IN (?3, ?4)
        "#,
    )
    .bind(RunStatus::Failed.as_str())
    .bind(now())
    .bind(RunStatus::Pending.as_str())
    .bind(RunStatus::InProgress.as_str())
    .execute(pool)
    .await?
    .rows_affected();
    Ok(affected)
}

pub async fn get_run(pool: &SqlitePool, run_id: RunId) -> Result<Option<RunRecord>> {
    let row = sqlx::query_as::<_, RunRecord>(
        r#"
        SELECT id, group_id, status, failure_reason, delivered, failed,
               triggered_by, started_at, completed_at
        FROM   runs
        WHERE  id = ?1
        "#,
    )
    .bind(run_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Run history for a group, newest first.
pub async fn list_runs_for_group(pool: &SqlitePool, group_id: GroupId) -> Result<Vec<RunRecord>> {
    let rows = sqlx::query_as::<_, RunRecord>(
        r#"
        SELECT id, group_id, status, failure_reason, delivered, failed,
               triggered_by, started_at, completed_at
        FROM   runs
        WHERE  group_id = ?1
        ORDER  BY id DESC
        "#,
    )
    .bind(group_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

// ─────────────────────────────────────────────────────────
// Assignments
// ─────────────────────────────────────────────────────────

/// Persist a run's assignments in one transaction. Returns the row ids in
/// the same order as `assignments`.
pub async fn insert_assignments(
    pool: &SqlitePool,
    run_id: RunId,
    assignments: &[Assignment],
) -> Result<Vec<i64>> {
    let mut tx = pool.begin().await?;
    let mut ids = Vec::with_capacity(assignments.len());
    for a in assignments {
        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO assignments (run_id, giver_id, receiver_id, delivery_status)
            VALUES (?1, ?2, ?3, ?4)
            RETURNING id
            "#,
        )
        .bind(run_id)
        .bind(a.giver.id)
        .bind(a.receiver.id)
        .bind(DeliveryStatus::Pending.as_str())
        .fetch_one(&mut *tx)
        .await?;
        ids.push(id);
    }
    tx.commit().await?;
    Ok(ids)
}

pub async fn set_delivery(
    pool: &SqlitePool,
    assignment_id: i64,
    status: DeliveryStatus,
    error: Option<&str>,
) -> Result<()> {
    sqlx::query("UPDATE assignments SET delivery_status = ?1, delivery_error = ?2 WHERE id = ?3")
        .bind(status.as_str())
        .bind(error)
        .bind(assignment_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn list_assignments(pool: &SqlitePool, run_id: RunId) -> Result<Vec<AssignmentRecord>> {
    let rows = sqlx::query_as::<_, AssignmentRecord>(
        r#"
        SELECT a.id, a.run_id,
               a.giver_id, g.name AS giver_name, g.email AS giver_email,
               a.receiver_id, r.name AS receiver_name,
               a.delivery_status, a.delivery_error
        FROM   assignments a
        JOIN   participants g ON g.id = a.giver_id
        JOIN   participants r ON r.id = a.receiver_id
        WHERE  a.run_id = ?1
        ORDER  BY a.id ASC
        "#,
    )
    .bind(run_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

// ─────────────────────────────────────────────────────────
// Unit tests
// ─────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{memory_pool, seed_group};

    #[tokio::test]
    async fn participants_come_back_with_their_gifts() {
        let pool = memory_pool().await;
        let (group, people) = seed_group(&pool, &["Ann", "Bob"]).await;
        create_gift(&pool, people[1].id, "Socks", None).await.unwrap();
        create_gift(&pool, people[0].id, "Book", Some("https://example.com/book"))
            .await
            .unwrap();
        create_gift(&pool, people[1].id, "Scarf", None).await.unwrap();

        let listed = list_participants(&pool, group.id).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].name, "Ann");
        assert_eq!(listed[0].wish_list.len(), 1);
        assert_eq!(
            listed[0].wish_list[0].link.as_deref(),
            Some("https://example.com/book")
        );
        let bob: Vec<&str> = listed[1].wish_list.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(bob, vec!["Socks", "Scarf"]);
    }

    #[tokio::test]
    async fn email_is_unique_within_a_group() {
        let pool = memory_pool().await;
        let (group, _) = seed_group(&pool, &["Ann"]).await;
        let err = add_participant(&pool, group.id, "Ann again", "ann@example.com")
            .await
            .unwrap_err();
        assert!(matches!(err, SantaError::Conflict(_)));
    }

    #[tokio::test]
    async fn duplicate_manager_email_conflicts() {
        let pool = memory_pool().await;
        create_manager(&pool, "boss@example.com", "t1").await.unwrap();
        let err = create_manager(&pool, "boss@example.com", "t2")
            .await
            .unwrap_err();
        assert!(matches!(err, SantaError::Conflict(_)));
    }

    #[tokio::test]
    async fn gift_updates() {
        let pool = memory_pool().await;
        let (_, people) = seed_group(&pool, &["Ann"]).await;
        let gift = create_gift(&pool, people[0].id, "Mug", None).await.unwrap();
        assert!(!gift.bought);

        let renamed = update_gift(&pool, gift.id, Some("Big mug"), None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(renamed.name, "Big mug");
        assert_eq!(renamed.link, None);

        let bought = mark_gift_bought(&pool, gift.id).await.unwrap().unwrap();
        assert!(bought.bought);

        assert!(delete_gift(&pool, gift.id).await.unwrap());
        assert!(!delete_gift(&pool, gift.id).await.unwrap());
        assert!(mark_gift_bought(&pool, gift.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn only_one_run_in_progress_per_group() {
        let pool = memory_pool().await;
        let (group, _) = seed_group(&pool, &["Ann", "Bob"]).await;
        let (other, _) = seed_group(&pool, &["Cid", "Dee"]).await;

        let first = create_run(&pool, group.id, "boss@example.com").await.unwrap();
        let second = create_run(&pool, group.id, "boss@example.com").await.unwrap();
        let elsewhere = create_run(&pool, other.id, "boss@example.com").await.unwrap();

        assert!(try_start_run(&pool, first).await.unwrap());
        assert!(!try_start_run(&pool, second).await.unwrap());
        assert!(try_start_run(&pool, elsewhere).await.unwrap());

        complete_run(&pool, first, 2, 0).await.unwrap();
        assert!(try_start_run(&pool, second).await.unwrap());
    }

    #[tokio::test]
    async fn interrupted_runs_release_the_guard() {
        let pool = memory_pool().await;
        let (group, _) = seed_group(&pool, &["Ann", "Bob"]).await;
        let stuck = create_run(&pool, group.id, "boss@example.com").await.unwrap();
        assert!(try_start_run(&pool, stuck).await.unwrap());

        assert_eq!(fail_interrupted_runs(&pool).await.unwrap(), 1);
        let run = get_run(&pool, stuck).await.unwrap().unwrap();
        assert_eq!(run.status(), Some(RunStatus::Failed));
        assert_eq!(run.failure_reason.as_deref(), Some("interrupted"));

        let next = create_run(&pool, group.id, "boss@example.com").await.unwrap();
        assert!(try_start_run(&pool, next).await.unwrap());
    }

    #[tokio::test]
    async fn deleting_a_group_cascades() {
        let pool = memory_pool().await;
        let (group, people) = seed_group(&pool, &["Ann", "Bob"]).await;
        let gift = create_gift(&pool, people[0].id, "Mug", None).await.unwrap();
        let run = create_run(&pool, group.id, "boss@example.com").await.unwrap();

        assert!(delete_group(&pool, group.id).await.unwrap());
        assert!(get_participant(&pool, people[0].id).await.unwrap().is_none());
        assert!(mark_gift_bought(&pool, gift.id).await.unwrap().is_none());
        assert!(get_run(&pool, run).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn group_summaries_count_participants() {
        let pool = memory_pool().await;
        let (group, _) = seed_group(&pool, &["Ann", "Bob", "Cid"]).await;
        let groups = list_groups_for_manager(&pool, group.manager_id).await.unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].participant_count, 3);
    }

    #[tokio::test]
    async fn participant_removal_waits_for_the_draw() {
        let pool = memory_pool().await;
        let (group, people) = seed_group(&pool, &["Ann", "Bob", "Cid"]).await;
        let (other, _) = seed_group(&pool, &["Dee"]).await;
        let gift = create_gift(&pool, people[2].id, "Mug", None).await.unwrap();

        let run = create_run(&pool, group.id, "boss@example.com").await.unwrap();
        assert!(try_start_run(&pool, run).await.unwrap());
        assert!(!delete_participant(&pool, group.id, people[2].id).await.unwrap());
        assert!(get_participant(&pool, people[2].id).await.unwrap().is_some());

        complete_run(&pool, run, 0, 0).await.unwrap();
        assert!(!delete_participant(&pool, other.id, people[2].id).await.unwrap());
        assert!(delete_participant(&pool, group.id, people[2].id).await.unwrap());
        assert!(get_participant(&pool, people[2].id).await.unwrap().is_none());
        assert!(mark_gift_bought(&pool, gift.id).await.unwrap().is_none());
        assert_eq!(list_participants(&pool, group.id).await.unwrap().len(), 2);
    }
}
