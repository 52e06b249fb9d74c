use std::collections::HashMap;

use opsync_core::{AgentId, Link, Marker, Operation, OperationId, Portal, PortalId};
use opsync_storage::{OperationReader, Storage};

use crate::auth;
use crate::error::EngineError;
use crate::teams::TeamMembership;

/// Load a fully hydrated operation for `requester`.
///
/// Everything is read from one snapshot. Read eligibility is decided from the
/// metadata row alone; an unauthorized caller learns that the operation
/// exists but never sees its portals, links or markers.
pub fn populate_operation<S, T>(
    storage: &mut S,
    teams: &T,
    id: &OperationId,
    requester: &AgentId,
) -> Result<Operation, EngineError>
where
    S: Storage,
    T: TeamMembership + ?Sized,
{
    let snapshot = storage.begin_read()?;

    let record = snapshot
        .get_operation(id)?
        .ok_or_else(|| EngineError::OperationNotFound(id.clone()))?;
    if let Err(err) = auth::check_read(&record, requester, teams) {
        tracing::warn!(operation = %id, requester = %requester, error = %err, "refusing read");
        return Err(err);
    }

    let portals = snapshot.get_portals(id)?;
    let cache: HashMap<&PortalId, &Portal> = portals.iter().map(|p| (&p.id, p)).collect();
    let lookup = |portal: &PortalId| -> Result<Portal, EngineError> {
        cache
            .get(portal)
            .map(|p| (*p).clone())
            .ok_or_else(|| EngineError::DanglingPortal {
                operation: id.clone(),
                portal: portal.clone(),
            })
    };

    let links = snapshot
        .get_links(id)?
        .into_iter()
        .map(|link| {
            Ok(Link {
                from: lookup(&link.from_portal)?,
                to: lookup(&link.to_portal)?,
                id: link.id,
                description: link.description,
                assigned_to: link.assigned_to,
            })
        })
        .collect::<Result<Vec<_>, EngineError>>()?;

    let markers = snapshot
        .get_markers(id)?
        .into_iter()
        .map(|marker| {
            Ok(Marker {
                portal: lookup(&marker.portal)?,
                id: marker.id,
                kind: marker.kind,
                comment: marker.comment,
            })
        })
        .collect::<Result<Vec<_>, EngineError>>()?;

    Ok(Operation {
        id: record.id,
        name: record.name,
        creator: record.owner,
        color: record.color,
        team: record.team,
        portals,
        links,
        markers,
    })
}
