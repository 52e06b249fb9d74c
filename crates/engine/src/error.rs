use opsync_core::{CoreError, OperationId, PortalId};
use opsync_storage::StorageError;
use thiserror::Error;

use crate::auth::AuthorizationError;
use crate::replace::ItemKind;
use crate::teams::MembershipError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid payload: {0}")]
    Validation(#[from] CoreError),

    #[error(transparent)]
    Unauthorized(#[from] AuthorizationError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("operation not found: {0}")]
    OperationNotFound(OperationId),

    #[error("operation {operation} references missing portal {portal}")]
    DanglingPortal {
        operation: OperationId,
        portal: PortalId,
    },

    #[error("{kind} {id} rejected: {source}")]
    ItemRejected {
        kind: ItemKind,
        id: String,
        source: StorageError,
    },

    #[error("team membership lookup failed: {0}")]
    Membership(#[from] MembershipError),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
