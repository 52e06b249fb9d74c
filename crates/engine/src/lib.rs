pub mod auth;
pub mod config;
pub mod error;
pub mod populate;
pub mod replace;
pub mod teams;

pub use auth::{AuthorizationError, check_read, check_write};
pub use config::{EngineConfig, ItemFailurePolicy};
pub use error::EngineError;
pub use populate::populate_operation;
pub use replace::{
    ItemKind, SkippedItem, SyncReport, delete_operation, replace_operation, sync_operation,
};
pub use teams::{AgentRecord, MembershipError, StaticTeams, TeamMembership};

use opsync_core::{AgentId, Operation, OperationId};
use opsync_storage::Storage;

/// Owns a storage handle, a team directory and the config, and routes each
/// call to the matching free function with those passed explicitly.
pub struct Engine<S, T> {
    storage: S,
    teams: T,
    config: EngineConfig,
}

impl<S: Storage, T: TeamMembership> Engine<S, T> {
    pub fn new(storage: S, teams: T, config: EngineConfig) -> Self {
        Self {
            storage,
            teams,
            config,
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    pub fn teams(&self) -> &T {
        &self.teams
    }

    pub fn teams_mut(&mut self) -> &mut T {
        &mut self.teams
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Ingest a raw client payload on behalf of `requester`.
    pub fn sync(&mut self, raw: &[u8], requester: &AgentId) -> Result<SyncReport, EngineError> {
        sync_operation(
            &mut self.storage,
            raw,
            requester,
            self.config.item_failure_policy,
        )
    }

    /// Replace with an already decoded aggregate.
    pub fn replace(
        &mut self,
        op: &Operation,
        requester: &AgentId,
    ) -> Result<SyncReport, EngineError> {
        replace_operation(
            &mut self.storage,
            op,
            requester,
            self.config.item_failure_policy,
        )
    }

    pub fn populate(
        &mut self,
        id: &OperationId,
        requester: &AgentId,
    ) -> Result<Operation, EngineError> {
        populate_operation(&mut self.storage, &self.teams, id, requester)
    }

    pub fn delete(&mut self, id: &OperationId, requester: &AgentId) -> Result<bool, EngineError> {
        delete_operation(&mut self.storage, id, requester)
    }
}
