//! Where the coordinator reads a group's participants from.

use std::future::Future;

use sqlx::SqlitePool;

use crate::db;
use crate::errors::Result;
use crate::models::{GroupId, Participant};

/// Read access to group membership.
///
/// Implementations return a full snapshot, with every participant's wish
/// list populated, in a stable order.
pub trait ParticipantStore: Send + Sync {
    fn list_participants(
        &self,
        group_id: GroupId,
    ) -> impl Future<Output = Result<Vec<Participant>>> + Send;
}

/// [`ParticipantStore`] backed by the service's own SQLite database.
#[derive(Clone)]
pub struct SqliteParticipantStore {
    pool: SqlitePool,
}

impl SqliteParticipantStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl ParticipantStore for SqliteParticipantStore {
    async fn list_participants(&self, group_id: GroupId) -> Result<Vec<Participant>> {
        db::list_participants(&self.pool, group_id).await
    }
}
