//! Domain records shared by the store, the draw and the HTTP layer.

use serde::{Deserialize, Serialize};

pub type GroupId = i64;
pub type ParticipantId = i64;
pub type RunId = i64;

/// One entry on a participant's wish list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct GiftWish {
    pub id: i64,
    pub name: String,
    pub link: Option<String>,
    pub bought: bool,
}

/// A member of a group, with their wish list loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
    pub email: String,
    pub wish_list: Vec<GiftWish>,
}

/// A participant row without the wish list.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ParticipantRecord {
    pub id: ParticipantId,
    pub group_id: GroupId,
    pub name: String,
    pub email: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub invite_code: String,
    pub manager_id: i64,
    pub created_at: i64,
}

/// Group listing row for a manager's dashboard.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct GroupSummary {
    pub id: GroupId,
    pub name: String,
    pub invite_code: String,
    pub participant_count: i64,
    pub created_at: i64,
}

/// An organizer account. The token is the manager's only credential and is
/// never serialised back out except once, at creation.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AppManager {
    pub id: i64,
    pub email: String,
    pub token: String,
}

/// Who buys for whom in one draw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub giver: Participant,
    pub receiver: Participant,
}

/// Lifecycle of a draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl RunStatus {
    /// Identifier stored in the `runs.status` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Delivery state of a single assignment's notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryStatus {
    Pending,
    Delivered,
    Failed,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Delivered => "delivered",
            Self::Failed => "failed",
        }
    }
}

/// A run row as stored in / read from the database.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RunRecord {
    pub id: RunId,
    pub group_id: GroupId,
    pub status: String,
    pub failure_reason: Option<String>,
    pub delivered: i64,
    pub failed: i64,
    pub triggered_by: String,
    pub started_at: i64,
    pub completed_at: Option<i64>,
}

impl RunRecord {
    pub fn status(&self) -> Option<RunStatus> {
        RunStatus::from_db(&self.status)
    }
}

/// A persisted assignment joined with both participants' names.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AssignmentRecord {
    pub id: i64,
    pub run_id: RunId,
    pub giver_id: ParticipantId,
    pub giver_name: String,
    pub giver_email: String,
    pub receiver_id: ParticipantId,
    pub receiver_name: String,
    pub delivery_status: String,
    pub delivery_error: Option<String>,
}
