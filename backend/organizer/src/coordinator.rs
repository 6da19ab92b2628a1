//! Run coordinator — owns the lifecycle of a Secret Santa draw.
//!
//! A run moves `pending → in_progress → completed | failed`. Only one run
//! per group may be `in_progress`; the guard lives in the database (see
//! [`db::try_start_run`]). Problems found before the first notification
//! fail the run. Once notifications start going out the run always
//! completes, and undeliverable messages are only counted.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{error, info, warn};

use crate::config::DrawMode;
use crate::db;
use crate::draw::{self, DrawError};
use crate::errors::{Result, SantaError};
use crate::models::{Assignment, DeliveryStatus, GroupId, RunId, RunStatus};
use crate::notify::{DeliveryOutcome, NotificationDispatcher};
use crate::store::ParticipantStore;

/// Why a run ended without sending anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunFailure {
    InsufficientParticipants,
    AlreadyInProgress,
    GeneratorError,
    /// Participants could not be read or the draw could not be saved.
    StorageError,
}

impl RunFailure {
    /// Identifier stored in `runs.failure_reason`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InsufficientParticipants => "insufficient_participants",
            Self::AlreadyInProgress => "already_in_progress",
            Self::GeneratorError => "generator_error",
            Self::StorageError => "storage_error",
        }
    }
}

/// What `organize` reports back to the administrator.
///
/// `Completed` means the draw happened and every notification was attempted;
/// `failed` counts the ones that did not get through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunResult {
    Completed {
        run_id: RunId,
        delivered: usize,
        failed: usize,
    },
    Failed {
        run_id: RunId,
        reason: RunFailure,
        #[serde(skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
    },
}

/// Outcome of re-sending a run's failed notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResendReport {
    pub delivered: usize,
    pub failed: usize,
}

pub struct Coordinator<S, D> {
    pool: SqlitePool,
    store: S,
    dispatcher: D,
    mode: DrawMode,
}

impl<S, D> Coordinator<S, D>
where
    S: ParticipantStore + 'static,
    D: NotificationDispatcher + 'static,
{
    pub fn new(pool: SqlitePool, store: S, dispatcher: D, mode: DrawMode) -> Self {
        Self {
            pool,
            store,
            dispatcher,
            mode,
        }
    }

    /// Run a fresh draw for `group_id` and notify every giver.
    ///
    /// `caller` is recorded on the run; authorisation happens before this is
    /// called. Every call is an independent draw, including after a
    /// completed one.
    ///
    /// The draw runs on its own task, so dropping the returned future (a
    /// client hanging up, say) does not abandon a run halfway through
    /// dispatch with the group still locked.
    pub async fn organize(self: &Arc<Self>, group_id: GroupId, caller: &str) -> Result<RunResult> {
        let coordinator = Arc::clone(self);
        let caller = caller.to_string();
        tokio::spawn(async move { coordinator.run_draw(group_id, &caller).await }).await?
    }

    async fn run_draw(&self, group_id: GroupId, caller: &str) -> Result<RunResult> {
        let run_id = db::create_run(&self.pool, group_id, caller).await?;

        if !db::try_start_run(&self.pool, run_id).await? {
            warn!("Run {run_id} rejected: group {group_id} already has a draw in progress");
            return self
                .fail(run_id, RunFailure::AlreadyInProgress, None)
                .await;
        }
        info!("Run {run_id} started for group {group_id} by {caller}");

        let participants = match self.store.list_participants(group_id).await {
            Ok(p) => p,
            Err(e) => {
                error!("Run {run_id}: could not load participants: {e}");
                return self
                    .fail(run_id, RunFailure::StorageError, Some(e.to_string()))
                    .await;
            }
        };
        info!("Run {run_id}: drawing among {} participants", participants.len());

        let mode = self.mode;
        let drawn = panic::catch_unwind(AssertUnwindSafe(|| match mode {
            DrawMode::Cycle => draw::generate(&participants),
            DrawMode::Uniform => draw::generate_with(&participants, mode, &mut rand::thread_rng()),
        }))
        .unwrap_or_else(|payload| Err(DrawError::Generator(panic_message(payload.as_ref()))));

        let assignments = match drawn {
            Ok(a) => a,
            Err(e @ DrawError::InsufficientParticipants { .. }) => {
                warn!("Run {run_id}: {e}");
                return self
                    .fail(
                        run_id,
                        RunFailure::InsufficientParticipants,
                        Some(e.to_string()),
                    )
                    .await;
            }
            Err(e @ DrawError::Generator(_)) => {
                error!("Run {run_id}: {e}");
                return self
                    .fail(run_id, RunFailure::GeneratorError, Some(e.to_string()))
                    .await;
            }
        };

        let ids = match db::insert_assignments(&self.pool, run_id, &assignments).await {
            Ok(ids) => ids,
            Err(e) => {
                error!("Run {run_id}: could not save assignments: {e}");
                return self
                    .fail(run_id, RunFailure::StorageError, Some(e.to_string()))
                    .await;
            }
        };

        let (delivered, failed) = self.dispatch_all(run_id, &assignments, &ids).await;

        if let Err(e) = db::complete_run(&self.pool, run_id, delivered, failed).await {
            error!("Run {run_id}: could not mark completed: {e}");
            self.release(run_id).await;
            return Err(e);
        }
        info!("Run {run_id} completed: {delivered} delivered, {failed} failed");

        Ok(RunResult::Completed {
            run_id,
            delivered,
            failed,
        })
    }

    /// Send every assignment once, in order, recording each outcome.
    async fn dispatch_all(
        &self,
        run_id: RunId,
        assignments: &[Assignment],
        ids: &[i64],
    ) -> (usize, usize) {
        let mut delivered = 0;
        let mut failed = 0;

        for (assignment, &id) in assignments.iter().zip(ids) {
            let outcome = self
                .dispatcher
                .send(assignment, &assignment.receiver.wish_list)
                .await;
            if self.record_outcome(run_id, id, assignment, outcome).await {
                delivered += 1;
            } else {
                failed += 1;
            }
        }
        (delivered, failed)
    }

    /// Persist one delivery outcome; returns whether it was delivered.
    async fn record_outcome(
        &self,
        run_id: RunId,
        assignment_id: i64,
        assignment: &Assignment,
        outcome: DeliveryOutcome,
    ) -> bool {
        let (status, reason) = match &outcome {
            DeliveryOutcome::Delivered => (DeliveryStatus::Delivered, None),
            DeliveryOutcome::DeliveryFailed(reason) => {
                warn!(
                    "Run {run_id}: notification to {} failed: {reason}",
                    assignment.giver.email
                );
                (DeliveryStatus::Failed, Some(reason.as_str()))
            }
        };

        // The message is already out (or not); a bookkeeping error must not
        // stop the remaining deliveries.
        if let Err(e) = db::set_delivery(&self.pool, assignment_id, status, reason).await {
            error!("Run {run_id}: could not record delivery for assignment {assignment_id}: {e}");
        }
        outcome.is_delivered()
    }

    /// Re-send the notifications of a completed run that did not get
    /// through, using each receiver's current wish list. Assignments whose
    /// outcome was never recorded count as not delivered.
    pub async fn resend_failed(&self, run_id: RunId) -> Result<ResendReport> {
        let run = db::get_run(&self.pool, run_id)
            .await?
            .ok_or_else(|| SantaError::NotFound(format!("Run {run_id}")))?;
        if run.status() != Some(RunStatus::Completed) {
            return Err(SantaError::Conflict(format!(
                "run {run_id} is {}, only completed runs can be re-sent",
                run.status
            )));
        }

        let pending: Vec<_> = db::list_assignments(&self.pool, run_id)
            .await?
            .into_iter()
            .filter(|a| a.delivery_status != DeliveryStatus::Delivered.as_str())
            .collect();

        let mut report = ResendReport {
            delivered: 0,
            failed: 0,
        };
        for record in pending {
            let giver = db::get_participant_with_gifts(&self.pool, record.giver_id).await?;
            let receiver = db::get_participant_with_gifts(&self.pool, record.receiver_id).await?;
            let (Some(giver), Some(receiver)) = (giver, receiver) else {
                warn!("Run {run_id}: assignment {} lost a participant", record.id);
                report.failed += 1;
                continue;
            };

            let assignment = Assignment { giver, receiver };
            let outcome = self
                .dispatcher
                .send(&assignment, &assignment.receiver.wish_list)
                .await;
            if self
                .record_outcome(run_id, record.id, &assignment, outcome)
                .await
            {
                report.delivered += 1;
            } else {
                report.failed += 1;
            }
        }

        db::recount_deliveries(&self.pool, run_id).await?;
        info!(
            "Run {run_id} re-send: {} delivered, {} still failing",
            report.delivered, report.failed
        );
        Ok(report)
    }

    async fn fail(
        &self,
        run_id: RunId,
        reason: RunFailure,
        detail: Option<String>,
    ) -> Result<RunResult> {
        if let Err(e) = db::fail_run(&self.pool, run_id, reason.as_str()).await {
            error!("Run {run_id}: could not mark failed: {e}");
            self.release(run_id).await;
            return Err(e);
        }
        Ok(RunResult::Failed {
            run_id,
            reason,
            detail,
        })
    }

    /// Last attempt at taking a run out of `in_progress` after its terminal
    /// update failed. If this fails too, startup recovery frees the group.
    async fn release(&self, run_id: RunId) {
        if let Err(e) = db::fail_run(&self.pool, run_id, RunFailure::StorageError.as_str()).await {
            error!("Run {run_id}: still in progress, group stays locked until restart: {e}");
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_string()
    }
}

// ─────────────────────────────────────────────────────────
// Unit tests
// ─────────────────────────────────────────────────────────
