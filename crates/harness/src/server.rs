use std::path::Path;

use serde_json::Value;

use opsync_core::{AgentId, MemberRef, Operation, OperationId, TeamId};
use opsync_engine::{AgentRecord, Engine, EngineConfig, EngineError, StaticTeams, SyncReport};
use opsync_storage::{SqliteStorage, StorageError};

/// An engine over a real SQLite store plus an in-process team directory.
pub struct TestServer {
    engine: Engine<SqliteStorage, StaticTeams>,
}

impl TestServer {
    pub fn new() -> Result<Self, StorageError> {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Result<Self, StorageError> {
        let storage = SqliteStorage::open_in_memory()?;
        Ok(Self::from_storage(storage, config))
    }

    pub fn open(path: impl AsRef<Path>, config: EngineConfig) -> Result<Self, StorageError> {
        let storage = SqliteStorage::open(path)?;
        Ok(Self::from_storage(storage, config))
    }

    fn from_storage(storage: SqliteStorage, config: EngineConfig) -> Self {
        Self {
            engine: Engine::new(storage, StaticTeams::new(), config),
        }
    }

    pub fn storage(&self) -> &SqliteStorage {
        self.engine.storage()
    }

    pub fn sync(&mut self, payload: &Value, agent: &str) -> Result<SyncReport, EngineError> {
        let raw = payload.to_string().into_bytes();
        self.engine.sync(&raw, &AgentId::from(agent))
    }

    pub fn sync_raw(&mut self, raw: &[u8], agent: &str) -> Result<SyncReport, EngineError> {
        self.engine.sync(raw, &AgentId::from(agent))
    }

    pub fn replace(&mut self, op: &Operation, agent: &str) -> Result<SyncReport, EngineError> {
        self.engine.replace(op, &AgentId::from(agent))
    }

    pub fn populate(&mut self, op: &str, agent: &str) -> Result<Operation, EngineError> {
        self.engine
            .populate(&OperationId::from(op), &AgentId::from(agent))
    }

    pub fn delete(&mut self, op: &str, agent: &str) -> Result<bool, EngineError> {
        self.engine
            .delete(&OperationId::from(op), &AgentId::from(agent))
    }

    pub fn add_agent(&mut self, id: &str, name: &str) {
        self.engine
            .teams_mut()
            .register_agent(AgentRecord::new(AgentId::from(id), name));
    }

    /// Add a registered agent to a team, looked up by display name.
    pub fn join_team(&mut self, team: &str, agent_name: &str) -> Result<AgentId, EngineError> {
        let member = MemberRef::Name(agent_name.to_string());
        Ok(self
            .engine
            .teams_mut()
            .add_member(TeamId::from(team), &member)?)
    }

    /// Rows in every table that belong to `op`, metadata row included.
    pub fn stored_rows(&self, op: &str) -> Result<usize, StorageError> {
        let conn = self.storage().conn();
        let mut total = 0usize;
        for sql in [
            "SELECT COUNT(*) FROM operation WHERE id = ?1",
            "SELECT COUNT(*) FROM portal WHERE operation_id = ?1",
            "SELECT COUNT(*) FROM link WHERE operation_id = ?1",
            "SELECT COUNT(*) FROM marker WHERE operation_id = ?1",
        ] {
            let count: i64 = conn.query_row(sql, [op], |row| row.get(0))?;
            total += count as usize;
        }
        Ok(total)
    }
}
