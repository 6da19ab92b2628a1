//! Axum REST API handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::auth;
use crate::coordinator::{Coordinator, ResendReport, RunFailure, RunResult};
use crate::db;
use crate::errors::{Result, SantaError};
use crate::models::{
    AppManager, AssignmentRecord, GiftWish, Group, GroupId, GroupSummary, Participant,
    ParticipantId, ParticipantRecord, RunId, RunRecord,
};
use crate::notify::{render_invite_email, EmailDispatcher, Mailer};
use crate::store::SqliteParticipantStore;
use crate::validation;

/// Attempts at finding an unused invite code before giving up.
const INVITE_CODE_ATTEMPTS: usize = 5;

pub type SantaCoordinator = Coordinator<SqliteParticipantStore, EmailDispatcher>;

pub struct ApiState {
    pub pool: SqlitePool,
    pub coordinator: Arc<SantaCoordinator>,
    pub mailer: Mailer,
}

// ─────────────────────────────────────────────────────────
// Request / response shapes
// ─────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Deserialize)]
pub struct CreateManagerRequest {
    pub email: String,
}

#[derive(Serialize)]
pub struct ManagerCreatedResponse {
    pub id: i64,
    pub email: String,
    /// Only ever returned here; keep it safe.
    pub token: String,
}

#[derive(Deserialize)]
pub struct VerifyTokenRequest {
    pub token: String,
}

#[derive(Serialize)]
pub struct VerifyTokenResponse {
    pub valid: bool,
    pub email: String,
}

#[derive(Deserialize)]
pub struct GroupNameRequest {
    pub name: String,
}

#[derive(Serialize)]
pub struct GroupsResponse {
    pub count: usize,
    pub groups: Vec<GroupSummary>,
}

#[derive(Serialize)]
pub struct GroupDetailsResponse {
    pub group: Group,
    pub participants: Vec<Participant>,
}

#[derive(Deserialize)]
pub struct InviteRequest {
    pub invite_code: String,
}

#[derive(Serialize)]
pub struct InviteResponse {
    pub group_id: GroupId,
    pub group_name: String,
}

#[derive(Deserialize)]
pub struct JoinRequest {
    pub invite_code: String,
    pub name: String,
    pub email: String,
}

#[derive(Deserialize)]
pub struct AddParticipantRequest {
    pub name: String,
    pub email: String,
}

#[derive(Deserialize)]
pub struct CreateGiftRequest {
    pub name: String,
    pub link: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateGiftRequest {
    pub name: Option<String>,
    pub link: Option<String>,
}

#[derive(Serialize)]
pub struct GiftsResponse {
    pub participant_id: ParticipantId,
    pub count: usize,
    pub gifts: Vec<GiftWish>,
}

#[derive(Serialize)]
pub struct RunsResponse {
    pub group_id: GroupId,
    pub count: usize,
    pub runs: Vec<RunRecord>,
}

#[derive(Serialize)]
pub struct RunDetailsResponse {
    pub run: RunRecord,
    pub assignments: Vec<AssignmentRecord>,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

// ─────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────

/// The group, if it exists and belongs to `manager`. Other managers' groups
/// are reported as missing.
async fn owned_group(pool: &SqlitePool, manager: &AppManager, group_id: GroupId) -> Result<Group> {
    match db::get_group(pool, group_id).await? {
        Some(group) if group.manager_id == manager.id => Ok(group),
        _ => Err(SantaError::NotFound(format!("Group {group_id}"))),
    }
}

async fn owned_run(pool: &SqlitePool, manager: &AppManager, run_id: RunId) -> Result<RunRecord> {
    let run = db::get_run(pool, run_id)
        .await?
        .ok_or_else(|| SantaError::NotFound(format!("Run {run_id}")))?;
    owned_group(pool, manager, run.group_id)
        .await
        .map_err(|_| SantaError::NotFound(format!("Run {run_id}")))?;
    Ok(run)
}

async fn existing_participant(
    pool: &SqlitePool,
    participant_id: ParticipantId,
) -> Result<ParticipantRecord> {
    db::get_participant(pool, participant_id)
        .await?
        .ok_or_else(|| SantaError::NotFound(format!("Participant {participant_id}")))
}

fn message(text: impl Into<String>) -> Json<MessageResponse> {
    Json(MessageResponse {
        message: text.into(),
    })
}

// ─────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────

/// `GET /health`
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `POST /managers`
///
/// Creates an organizer account and returns its bearer token.
pub async fn create_manager(
    State(state): State<Arc<ApiState>>,
    Json(req): Json<CreateManagerRequest>,
) -> Result<(StatusCode, Json<ManagerCreatedResponse>)> {
    let email = validation::email(&req.email)?;
    let manager = db::create_manager(&state.pool, &email, &auth::generate_token()).await?;
    info!("Manager {} created", manager.email);
    Ok((
        StatusCode::CREATED,
        Json(ManagerCreatedResponse {
            id: manager.id,
            email: manager.email,
            token: manager.token,
        }),
    ))
}

/// `POST /managers/verify`
pub async fn verify_manager(
    State(state): State<Arc<ApiState>>,
    Json(req): Json<VerifyTokenRequest>,
) -> Result<Json<VerifyTokenResponse>> {
    let manager = db::get_manager_by_token(&state.pool, req.token.trim())
        .await?
        .ok_or(SantaError::Unauthorized)?;
    Ok(Json(VerifyTokenResponse {
        valid: true,
        email: manager.email,
    }))
}

/// `POST /groups`
///
/// Creates a group owned by the caller and emails them its invite code.
pub async fn create_group(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Json(req): Json<GroupNameRequest>,
) -> Result<(StatusCode, Json<Group>)> {
    let manager = auth::authenticate(&state.pool, &headers).await?;
    let name = validation::non_blank(&req.name, "group name")?;

    let mut attempt = 0;
    let group = loop {
        attempt += 1;
        let code = auth::generate_invite_code();
        match db::create_group(&state.pool, &name, &code, manager.id).await {
            Ok(group) => break group,
            Err(SantaError::Conflict(_)) if attempt < INVITE_CODE_ATTEMPTS => continue,
            Err(e) => return Err(e),
        }
    };
    info!("Group {} '{}' created by {}", group.id, group.name, manager.email);

    let mailer = state.mailer.clone();
    let invite = render_invite_email(
        &manager.email,
        &manager.token,
        &group.name,
        &group.invite_code,
    );
    tokio::spawn(async move {
        if let Err(e) = mailer.send(&invite).await {
            warn!("Could not email invite code to {}: {e}", invite.to_email);
        }
    });

    Ok((StatusCode::CREATED, Json(group)))
}

/// `GET /groups`
pub async fn list_groups(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
) -> Result<Json<GroupsResponse>> {
    let manager = auth::authenticate(&state.pool, &headers).await?;
    let groups = db::list_groups_for_manager(&state.pool, manager.id).await?;
    Ok(Json(GroupsResponse {
        count: groups.len(),
        groups,
    }))
}

/// `GET /groups/:id`
///
/// The group with every participant and their wish list.
pub async fn get_group(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path(group_id): Path<GroupId>,
) -> Result<Json<GroupDetailsResponse>> {
    let manager = auth::authenticate(&state.pool, &headers).await?;
    let group = owned_group(&state.pool, &manager, group_id).await?;
    let participants = db::list_participants(&state.pool, group.id).await?;
    Ok(Json(GroupDetailsResponse {
        group,
        participants,
    }))
}

/// `PUT /groups/:id`
pub async fn rename_group(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path(group_id): Path<GroupId>,
    Json(req): Json<GroupNameRequest>,
) -> Result<Json<Group>> {
    let manager = auth::authenticate(&state.pool, &headers).await?;
    let mut group = owned_group(&state.pool, &manager, group_id).await?;
    let name = validation::non_blank(&req.name, "group name")?;
    db::rename_group(&state.pool, group.id, &name).await?;
    group.name = name;
    Ok(Json(group))
}

/// `DELETE /groups/:id`
pub async fn delete_group(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path(group_id): Path<GroupId>,
) -> Result<Json<MessageResponse>> {
    let manager = auth::authenticate(&state.pool, &headers).await?;
    let group = owned_group(&state.pool, &manager, group_id).await?;
    db::delete_group(&state.pool, group.id).await?;
    info!("Group {} deleted by {}", group.id, manager.email);
    Ok(message("Group deleted"))
}

/// `POST /groups/:id/participants`
///
/// Adds someone to the group directly, without an invite code.
pub async fn add_participant(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path(group_id): Path<GroupId>,
    Json(req): Json<AddParticipantRequest>,
) -> Result<(StatusCode, Json<ParticipantRecord>)> {
    let manager = auth::authenticate(&state.pool, &headers).await?;
    let group = owned_group(&state.pool, &manager, group_id).await?;
    let name = validation::non_blank(&req.name, "name")?;
    let email = validation::email(&req.email)?;

    let participant = db::add_participant(&state.pool, group.id, &name, &email).await?;
    info!("{} added to group {} by {}", participant.email, group.id, manager.email);
    Ok((StatusCode::CREATED, Json(participant)))
}

/// `DELETE /groups/:id/participants/:participant_id`
///
/// Removes a participant and their wish list. Not allowed while a draw for
/// the group is running.
pub async fn remove_participant(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path((group_id, participant_id)): Path<(GroupId, ParticipantId)>,
) -> Result<Json<MessageResponse>> {
    let manager = auth::authenticate(&state.pool, &headers).await?;
    let group = owned_group(&state.pool, &manager, group_id).await?;
    let participant = db::get_participant(&state.pool, participant_id)
        .await?
        .filter(|p| p.group_id == group.id)
        .ok_or_else(|| SantaError::NotFound(format!("Participant {participant_id}")))?;

    if !db::delete_participant(&state.pool, group.id, participant.id).await? {
        return Err(SantaError::Conflict(format!(
            "group {} has a draw in progress",
            group.id
        )));
    }
    info!(
        "{} removed from group {} by {}",
        participant.email, group.id, manager.email
    );
    Ok(message("Participant removed"))
}

/// `POST /invites/validate`
pub async fn validate_invite(
    State(state): State<Arc<ApiState>>,
    Json(req): Json<InviteRequest>,
) -> Result<Json<InviteResponse>> {
    let group = db::get_group_by_invite(&state.pool, req.invite_code.trim())
        .await?
        .ok_or_else(|| SantaError::NotFound("Group".to_string()))?;
    Ok(Json(InviteResponse {
        group_id: group.id,
        group_name: group.name,
    }))
}

/// `POST /invites/join`
pub async fn join_group(
    State(state): State<Arc<ApiState>>,
    Json(req): Json<JoinRequest>,
) -> Result<(StatusCode, Json<ParticipantRecord>)> {
    let name = validation::non_blank(&req.name, "name")?;
    let email = validation::email(&req.email)?;
    let group = db::get_group_by_invite(&state.pool, req.invite_code.trim())
        .await?
        .ok_or_else(|| SantaError::NotFound("Group".to_string()))?;

    let participant = db::add_participant(&state.pool, group.id, &name, &email).await?;
    info!("{} joined group {}", participant.email, group.id);
    Ok((StatusCode::CREATED, Json(participant)))
}

/// `GET /participants/:id/gifts`
pub async fn list_gifts(
    State(state): State<Arc<ApiState>>,
    Path(participant_id): Path<ParticipantId>,
) -> Result<Json<GiftsResponse>> {
    let participant = existing_participant(&state.pool, participant_id).await?;
    let gifts = db::list_gifts(&state.pool, participant.id).await?;
    Ok(Json(GiftsResponse {
        participant_id: participant.id,
        count: gifts.len(),
        gifts,
    }))
}

/// `POST /participants/:id/gifts`
pub async fn create_gift(
    State(state): State<Arc<ApiState>>,
    Path(participant_id): Path<ParticipantId>,
    Json(req): Json<CreateGiftRequest>,
) -> Result<(StatusCode, Json<GiftWish>)> {
    let participant = existing_participant(&state.pool, participant_id).await?;
    let name = validation::non_blank(&req.name, "gift name")?;
    let link = validation::optional_link(req.link.as_deref())?;
    let gift = db::create_gift(&state.pool, participant.id, &name, link.as_deref()).await?;
    Ok((StatusCode::CREATED, Json(gift)))
}

/// `PATCH /gifts/:id`
pub async fn update_gift(
    State(state): State<Arc<ApiState>>,
    Path(gift_id): Path<i64>,
    Json(req): Json<UpdateGiftRequest>,
) -> Result<Json<GiftWish>> {
    let name = req
        .name
        .as_deref()
        .map(|n| validation::non_blank(n, "gift name"))
        .transpose()?;
    let link = validation::optional_link(req.link.as_deref())?;
    db::update_gift(&state.pool, gift_id, name.as_deref(), link.as_deref())
        .await?
        .map(Json)
        .ok_or_else(|| SantaError::NotFound(format!("Gift {gift_id}")))
}

/// `POST /gifts/:id/buy`
pub async fn buy_gift(
    State(state): State<Arc<ApiState>>,
    Path(gift_id): Path<i64>,
) -> Result<Json<GiftWish>> {
    db::mark_gift_bought(&state.pool, gift_id)
        .await?
        .map(Json)
        .ok_or_else(|| SantaError::NotFound(format!("Gift {gift_id}")))
}

/// `DELETE /gifts/:id`
pub async fn delete_gift(
    State(state): State<Arc<ApiState>>,
    Path(gift_id): Path<i64>,
) -> Result<Json<MessageResponse>> {
    if db::delete_gift(&state.pool, gift_id).await? {
        Ok(message("Gift deleted"))
    } else {
        Err(SantaError::NotFound(format!("Gift {gift_id}")))
    }
}

/// `POST /groups/:id/organize`
///
/// Runs the draw and emails every giver. A draw that could not run at all
/// is reported with a non-2xx status; a draw that ran is 200 even if some
/// emails failed, with the failures counted in the body.
pub async fn organize(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path(group_id): Path<GroupId>,
) -> Result<(StatusCode, Json<RunResult>)> {
    let manager = auth::authenticate(&state.pool, &headers).await?;
    let group = owned_group(&state.pool, &manager, group_id).await?;

    let result = state.coordinator.organize(group.id, &manager.email).await?;
    let status = match &result {
        RunResult::Completed { .. } => StatusCode::OK,
        RunResult::Failed { reason, .. } => match reason {
            RunFailure::AlreadyInProgress => StatusCode::CONFLICT,
            RunFailure::InsufficientParticipants => StatusCode::UNPROCESSABLE_ENTITY,
            RunFailure::GeneratorError | RunFailure::StorageError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        },
    };
    Ok((status, Json(result)))
}

/// `GET /groups/:id/runs`
pub async fn list_runs(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path(group_id): Path<GroupId>,
) -> Result<Json<RunsResponse>> {
    let manager = auth::authenticate(&state.pool, &headers).await?;
    let group = owned_group(&state.pool, &manager, group_id).await?;
    let runs = db::list_runs_for_group(&state.pool, group.id).await?;
    Ok(Json(RunsResponse {
        group_id: group.id,
        count: runs.len(),
        runs,
    }))
}

/// `GET /runs/:id`
///
/// Who drew whom and whether each email got through. Manager-only.
pub async fn get_run(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path(run_id): Path<RunId>,
) -> Result<Json<RunDetailsResponse>> {
    let manager = auth::authenticate(&state.pool, &headers).await?;
    let run = owned_run(&state.pool, &manager, run_id).await?;
    let assignments = db::list_assignments(&state.pool, run.id).await?;
    Ok(Json(RunDetailsResponse { run, assignments }))
}

/// `POST /runs/:id/resend`
pub async fn resend_run(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path(run_id): Path<RunId>,
) -> Result<Json<ResendReport>> {
    let manager = auth::authenticate(&state.pool, &headers).await?;
    let run = owned_run(&state.pool, &manager, run_id).await?;
    let report = state.coordinator.resend_failed(run.id).await?;
    Ok(Json(report))
}

// ─────────────────────────────────────────────────────────
// Unit tests
// ─────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use axum::http::{header::AUTHORIZATION, HeaderValue};
    use reqwest::Client;

    use super::*;
    use crate::config::{Config, DrawMode};
    use crate::test_utils::memory_pool;

    async fn state() -> Arc<ApiState> {
        let pool = memory_pool().await;
        // Nothing listens here, so every email fails fast.
        let config = Config {
            database_url: "sqlite::memory:".to_string(),
            api_port: 0,
            email_api_url: "http://127.0.0.1:9/v3/mail/send".to_string(),
            email_api_key: "test-key".to_string(),
            from_email: "santa@example.com".to_string(),
            from_name: "Secret Santa".to_string(),
            email_timeout_secs: 2,
            draw_mode: DrawMode::Cycle,
        };
        let mailer = Mailer::new(Client::new(), &config);
        let coordinator = Arc::new(Coordinator::new(
            pool.clone(),
            SqliteParticipantStore::new(pool.clone()),
            EmailDispatcher::new(mailer.clone()),
            config.draw_mode,
        ));
        Arc::new(ApiState {
            pool,
            coordinator,
            mailer,
        })
    }

    async fn manager(state: &Arc<ApiState>, email: &str) -> HeaderMap {
        let (_, Json(created)) = create_manager(
            State(state.clone()),
            Json(CreateManagerRequest {
                email: email.to_string(),
            }),
        )
        .await
        .unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", created.token)).unwrap(),
        );
        headers
    }

    async fn group(state: &Arc<ApiState>, headers: &HeaderMap) -> Group {
        let (status, Json(group)) = create_group(
            State(state.clone()),
            headers.clone(),
            Json(GroupNameRequest {
                name: "  Office party ".to_string(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        group
    }

    async fn join(state: &Arc<ApiState>, code: &str, name: &str) -> Result<ParticipantRecord> {
        join_group(
            State(state.clone()),
            Json(JoinRequest {
                invite_code: code.to_string(),
                name: name.to_string(),
                email: format!("{}@example.com", name.to_lowercase()),
            }),
        )
        .await
        .map(|(_, Json(p))| p)
    }

    #[tokio::test]
    async fn join_with_invite_code() {
        let state = state().await;
        let boss = manager(&state, "boss@example.com").await;
        let group = group(&state, &boss).await;
        assert_eq!(group.name, "Office party");

        let Json(invite) = validate_invite(
            State(state.clone()),
            Json(InviteRequest {
                invite_code: group.invite_code.clone(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(invite.group_id, group.id);

        let ann = join(&state, &group.invite_code, "Ann").await.unwrap();
        assert_eq!(ann.group_id, group.id);
        assert!(matches!(
            join(&state, &group.invite_code, "Ann").await,
            Err(SantaError::Conflict(_))
        ));
        assert!(matches!(
            join(&state, "nope", "Bob").await,
            Err(SantaError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn groups_are_private_to_their_manager() {
        let state = state().await;
        let boss = manager(&state, "boss@example.com").await;
        let rival = manager(&state, "rival@example.com").await;
        let group = group(&state, &boss).await;

        let denied = get_group(State(state.clone()), rival.clone(), Path(group.id)).await;
        assert!(matches!(denied, Err(SantaError::NotFound(_))));
        let denied = organize(State(state.clone()), rival, Path(group.id)).await;
        assert!(matches!(denied, Err(SantaError::NotFound(_))));

        let anonymous = list_groups(State(state.clone()), HeaderMap::new()).await;
        assert!(matches!(anonymous, Err(SantaError::Unauthorized)));

        let Json(mine) = list_groups(State(state.clone()), boss).await.unwrap();
        assert_eq!(mine.count, 1);
    }

    #[tokio::test]
    async fn gift_lifecycle() {
        let state = state().await;
        let boss = manager(&state, "boss@example.com").await;
        let group = group(&state, &boss).await;
        let ann = join(&state, &group.invite_code, "Ann").await.unwrap();

        let (_, Json(gift)) = create_gift(
            State(state.clone()),
            Path(ann.id),
            Json(CreateGiftRequest {
                name: "Book".to_string(),
                link: Some("https://example.com/book".to_string()),
            }),
        )
        .await
        .unwrap();

        let bad_link = create_gift(
            State(state.clone()),
            Path(ann.id),
            Json(CreateGiftRequest {
                name: "Pen".to_string(),
                link: Some("ftp://pens".to_string()),
            }),
        )
        .await;
        assert!(matches!(bad_link, Err(SantaError::Validation(_))));

        let Json(renamed) = update_gift(
            State(state.clone()),
            Path(gift.id),
            Json(UpdateGiftRequest {
                name: Some("Cookbook".to_string()),
                link: None,
            }),
        )
        .await
        .unwrap();
        assert_eq!(renamed.name, "Cookbook");
        assert_eq!(renamed.link.as_deref(), Some("https://example.com/book"));

        let Json(bought) = buy_gift(State(state.clone()), Path(gift.id)).await.unwrap();
        assert!(bought.bought);

        let Json(listed) = list_gifts(State(state.clone()), Path(ann.id)).await.unwrap();
        assert_eq!(listed.count, 1);

        let Json(deleted) = delete_gift(State(state.clone()), Path(gift.id)).await.unwrap();
        assert_eq!(deleted.message, "Gift deleted");
        assert!(matches!(
            delete_gift(State(state.clone()), Path(gift.id)).await,
            Err(SantaError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn organize_reports_too_few_participants() {
        let state = state().await;
        let boss = manager(&state, "boss@example.com").await;
        let group = group(&state, &boss).await;
        join(&state, &group.invite_code, "Ann").await.unwrap();

        let (status, Json(result)) = organize(State(state.clone()), boss, Path(group.id))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(matches!(
            result,
            RunResult::Failed {
                reason: RunFailure::InsufficientParticipants,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn organize_completes_even_when_email_is_down() {
        let state = state().await;
        let boss = manager(&state, "boss@example.com").await;
        let group = group(&state, &boss).await;
        for name in ["Ann", "Bob", "Cid"] {
            join(&state, &group.invite_code, name).await.unwrap();
        }

        let (status, Json(result)) = organize(State(state.clone()), boss.clone(), Path(group.id))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::OK);
        let RunResult::Completed {
            run_id,
            delivered,
            failed,
        } = result
        else {
            panic!("expected completed run, got {result:?}");
        };
        assert_eq!((delivered, failed), (0, 3));

        let Json(details) = get_run(State(state.clone()), boss, Path(run_id))
            .await
            .unwrap();
        assert_eq!(details.assignments.len(), 3);
        assert!(details
            .assignments
            .iter()
            .all(|a| a.delivery_status == "failed" && a.giver_id != a.receiver_id));
    }

    #[tokio::test]
    async fn manager_adds_and_removes_participants() {
        let state = state().await;
        let boss = manager(&state, "boss@example.com").await;
        let rival = manager(&state, "rival@example.com").await;
        let group = group(&state, &boss).await;
        let ann = join(&state, &group.invite_code, "Ann").await.unwrap();

        let (status, Json(bob)) = add_participant(
            State(state.clone()),
            boss.clone(),
            Path(group.id),
            Json(AddParticipantRequest {
                name: " Bob ".to_string(),
                email: "Bob@Example.com".to_string(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!((bob.name.as_str(), bob.email.as_str()), ("Bob", "bob@example.com"));

        let taken = add_participant(
            State(state.clone()),
            boss.clone(),
            Path(group.id),
            Json(AddParticipantRequest {
                name: "Ann".to_string(),
                email: "ann@example.com".to_string(),
            }),
        )
        .await;
        assert!(matches!(taken, Err(SantaError::Conflict(_))));

        let denied =
            remove_participant(State(state.clone()), rival, Path((group.id, ann.id))).await;
        assert!(matches!(denied, Err(SantaError::NotFound(_))));

        let Json(removed) =
            remove_participant(State(state.clone()), boss.clone(), Path((group.id, ann.id)))
                .await
                .unwrap();
        assert_eq!(removed.message, "Participant removed");
        let again =
            remove_participant(State(state.clone()), boss.clone(), Path((group.id, ann.id))).await;
        assert!(matches!(again, Err(SantaError::NotFound(_))));

        let Json(details) = get_group(State(state.clone()), boss, Path(group.id))
            .await
            .unwrap();
        let names: Vec<&str> = details.participants.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Bob"]);
    }

    #[tokio::test]
    async fn participants_stay_put_during_a_draw() {
        let state = state().await;
        let boss = manager(&state, "boss@example.com").await;
        let group = group(&state, &boss).await;
        let ann = join(&state, &group.invite_code, "Ann").await.unwrap();

        let run = db::create_run(&state.pool, group.id, "boss@example.com")
            .await
            .unwrap();
        assert!(db::try_start_run(&state.pool, run).await.unwrap());

        let busy =
            remove_participant(State(state.clone()), boss.clone(), Path((group.id, ann.id))).await;
        assert!(matches!(busy, Err(SantaError::Conflict(_))));

        db::fail_run(&state.pool, run, "interrupted").await.unwrap();
        assert!(
            remove_participant(State(state.clone()), boss, Path((group.id, ann.id)))
                .await
                .is_ok()
        );
    }
}
