use opsync_core::{
    aggregate::Portal,
    ids::*,
};

use crate::error::StorageError;

/// Top-level row of an operation, without its dependents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationRecord {
    pub id: OperationId,
    pub name: String,
    pub owner: AgentId,
    pub color: String,
    pub team: Option<TeamId>,
}

/// A stored link. Endpoints are portal ids within the same operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRecord {
    pub id: LinkId,
    pub from_portal: PortalId,
    pub to_portal: PortalId,
    pub description: String,
    pub assigned_to: Option<AgentId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerRecord {
    pub id: MarkerId,
    pub portal: PortalId,
    pub kind: MarkerType,
    pub comment: String,
}

/// Reads against either the live store or an open unit of work. Collections
/// come back in insertion order.
pub trait OperationReader {
    fn get_operation(&self, id: &OperationId) -> Result<Option<OperationRecord>, StorageError>;

    fn owner_of(&self, id: &OperationId) -> Result<Option<AgentId>, StorageError> {
        Ok(self.get_operation(id)?.map(|record| record.owner))
    }

    fn get_portals(&self, id: &OperationId) -> Result<Vec<Portal>, StorageError>;

    fn get_portal(
        &self,
        id: &OperationId,
        portal_id: &PortalId,
    ) -> Result<Option<Portal>, StorageError>;

    fn get_links(&self, id: &OperationId) -> Result<Vec<LinkRecord>, StorageError>;

    fn get_markers(&self, id: &OperationId) -> Result<Vec<MarkerRecord>, StorageError>;
}

/// Row-level writes. Only reachable through a [`UnitOfWork`].
pub trait OperationWriter: OperationReader {
    /// Remove the operation and every dependent row. Returns whether a
    /// metadata row existed; finding nothing is not an error.
    fn delete_operation(&self, id: &OperationId) -> Result<bool, StorageError>;

    fn insert_operation(&self, record: &OperationRecord) -> Result<(), StorageError>;

    /// Insert-or-ignore keyed by (operation, portal id). Returns `true` when a
    /// new row was written, `false` when the portal was already present.
    fn upsert_portal(&self, id: &OperationId, portal: &Portal) -> Result<bool, StorageError>;

    fn insert_link(&self, id: &OperationId, link: &LinkRecord) -> Result<(), StorageError>;

    fn insert_marker(&self, id: &OperationId, marker: &MarkerRecord) -> Result<(), StorageError>;
}

/// A scoped transaction. `commit` publishes every write made through it;
/// dropping it without committing rolls all of them back.
pub trait UnitOfWork: OperationWriter {
    /// False once the underlying transaction is gone, in which case every
    /// further write fails with [`StorageError::RolledBack`].
    fn is_active(&self) -> bool;

    fn commit(self) -> Result<(), StorageError>;
}

pub trait Storage: OperationReader {
    type Work<'a>: UnitOfWork
    where
        Self: 'a;

    /// Open a write unit of work. Holds the store's write lock for its whole
    /// lifetime, so two replaces never interleave.
    fn begin_write(&mut self) -> Result<Self::Work<'_>, StorageError>;

    /// Open a read snapshot: every query through it sees the same committed
    /// state.
    fn begin_read(&mut self) -> Result<Self::Work<'_>, StorageError>;
}
