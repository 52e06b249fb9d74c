use std::fmt;

use opsync_core::{AgentId, Link, Marker, Operation, OperationId};
use opsync_storage::{
    LinkRecord, MarkerRecord, OperationReader, OperationRecord, OperationWriter, Storage,
    StorageError, UnitOfWork,
};

use crate::auth;
use crate::config::ItemFailurePolicy;
use crate::error::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Marker,
    Link,
    Portal,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Marker => "marker",
            Self::Link => "link",
            Self::Portal => "portal",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedItem {
    pub kind: ItemKind,
    pub id: String,
    pub reason: String,
}

/// Outcome of a successful replace. `skipped` lists every item that was
/// dropped under [`ItemFailurePolicy::SkipAndLog`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub operation_id: OperationId,
    /// No earlier version existed; the requester is now the owner.
    pub created: bool,
    pub markers: usize,
    pub links: usize,
    pub portals: usize,
    pub skipped: Vec<SkippedItem>,
}

impl SyncReport {
    fn new(operation_id: OperationId, created: bool) -> Self {
        Self {
            operation_id,
            created,
            markers: 0,
            links: 0,
            portals: 0,
            skipped: Vec::new(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Decode a client payload and replace the stored operation with it.
/// A malformed payload is rejected before the store is touched.
pub fn sync_operation<S: Storage>(
    storage: &mut S,
    raw: &[u8],
    requester: &AgentId,
    policy: ItemFailurePolicy,
) -> Result<SyncReport, EngineError> {
    let op = Operation::from_json(raw)?;
    replace_operation(storage, &op, requester, policy)
}

/// Full replace of one operation inside a single write unit of work.
///
/// The prior owner is read inside the same transaction, before the delete.
/// Any fatal error (ownership, delete, metadata row, or an item under
/// [`ItemFailurePolicy::AllOrNothing`]) drops the unit of work and leaves the
/// previous version exactly as it was.
pub fn replace_operation<S: Storage>(
    storage: &mut S,
    op: &Operation,
    requester: &AgentId,
    policy: ItemFailurePolicy,
) -> Result<SyncReport, EngineError> {
    let work = storage.begin_write()?;

    let existing_owner = work.owner_of(&op.id)?;
    if let Err(err) = auth::check_write(&op.id, existing_owner.as_ref(), requester) {
        tracing::warn!(operation = %op.id, requester = %requester, "refusing overwrite by non-owner");
        return Err(err.into());
    }

    tracing::debug!(
        operation = %op.id,
        owner = %requester,
        markers = op.markers.len(),
        links = op.links.len(),
        portals = op.portals.len(),
        "replacing operation"
    );

    let existed = work.delete_operation(&op.id)?;
    work.insert_operation(&OperationRecord {
        id: op.id.clone(),
        name: op.name.clone(),
        owner: requester.clone(),
        color: op.color.clone(),
        team: op.team.clone(),
    })?;

    let mut report = SyncReport::new(op.id.clone(), !existed);

    for marker in &op.markers {
        let result = write_marker(&work, &op.id, marker);
        if settle(&mut report, policy, ItemKind::Marker, marker.id.as_str(), result)? {
            report.markers += 1;
        } else {
            ensure_active(&work)?;
        }
    }

    for link in &op.links {
        let result = write_link(&work, &op.id, link);
        if settle(&mut report, policy, ItemKind::Link, link.id.as_str(), result)? {
            report.links += 1;
        } else {
            ensure_active(&work)?;
        }
    }

    // Portals nothing else points at.
    for portal in &op.portals {
        let result = work.upsert_portal(&op.id, portal).map(|_| ());
        if !settle(&mut report, policy, ItemKind::Portal, portal.id.as_str(), result)? {
            ensure_active(&work)?;
        }
    }

    // The operation was emptied above, so every portal row is from this sync.
    report.portals = work.get_portals(&op.id)?.len();
    work.commit()?;

    tracing::info!(
        operation = %op.id,
        owner = %requester,
        created = report.created,
        markers = report.markers,
        links = report.links,
        portals = report.portals,
        skipped = report.skipped.len(),
        "operation stored"
    );
    Ok(report)
}

/// Remove an operation the requester owns. Removing something that does not
/// exist succeeds and reports `false`.
pub fn delete_operation<S: Storage>(
    storage: &mut S,
    id: &OperationId,
    requester: &AgentId,
) -> Result<bool, EngineError> {
    let work = storage.begin_write()?;
    let existing_owner = work.owner_of(id)?;
    if let Err(err) = auth::check_write(id, existing_owner.as_ref(), requester) {
        tracing::warn!(operation = %id, requester = %requester, "refusing delete by non-owner");
        return Err(err.into());
    }
    let removed = work.delete_operation(id)?;
    work.commit()?;
    tracing::info!(operation = %id, removed, "operation deleted");
    Ok(removed)
}

// Referenced portals go in first so a marker or link row never points at a
// portal that is not there. If the portal fails the whole item is skipped.

fn write_marker<W: OperationWriter>(
    work: &W,
    id: &OperationId,
    marker: &Marker,
) -> Result<(), StorageError> {
    work.upsert_portal(id, &marker.portal)?;
    work.insert_marker(
        id,
        &MarkerRecord {
            id: marker.id.clone(),
            portal: marker.portal.id.clone(),
            kind: marker.kind.clone(),
            comment: marker.comment.clone(),
        },
    )
}

fn write_link<W: OperationWriter>(
    work: &W,
    id: &OperationId,
    link: &Link,
) -> Result<(), StorageError> {
    work.upsert_portal(id, &link.from)?;
    work.upsert_portal(id, &link.to)?;
    work.insert_link(
        id,
        &LinkRecord {
            id: link.id.clone(),
            from_portal: link.from.id.clone(),
            to_portal: link.to.id.clone(),
            description: link.description.clone(),
            assigned_to: link.assigned_to.clone(),
        },
    )
}

/// Apply the item failure policy. `Ok(true)` means the item was written.
///
/// Only a constraint violation is specific to one item. Anything else the
/// database reports (disk full, I/O, lock timeout) aborts the replace under
/// either policy.
fn settle(
    report: &mut SyncReport,
    policy: ItemFailurePolicy,
    kind: ItemKind,
    id: &str,
    result: Result<(), StorageError>,
) -> Result<bool, EngineError> {
    let source = match result {
        Ok(()) => return Ok(true),
        Err(source @ StorageError::ConstraintViolation(_)) => source,
        Err(fatal) => return Err(fatal.into()),
    };
    match policy {
        ItemFailurePolicy::SkipAndLog => {
            tracing::warn!(
                operation = %report.operation_id,
                kind = %kind,
                id,
                error = %source,
                "skipping item"
            );
            report.skipped.push(SkippedItem {
                kind,
                id: id.to_string(),
                reason: source.to_string(),
            });
            Ok(false)
        }
        ItemFailurePolicy::AllOrNothing => Err(EngineError::ItemRejected {
            kind,
            id: id.to_string(),
            source,
        }),
    }
}

fn ensure_active<W: UnitOfWork>(work: &W) -> Result<(), EngineError> {
    if work.is_active() {
        Ok(())
    } else {
        Err(StorageError::RolledBack.into())
    }
}
