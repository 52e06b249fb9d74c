use std::path::Path;

use rusqlite::{Connection, OptionalExtension, Transaction, TransactionBehavior, params};

use opsync_core::{aggregate::Portal, ids::*};

use crate::error::StorageError;
use crate::traits::{
    LinkRecord, MarkerRecord, OperationReader, OperationRecord, OperationWriter, Storage,
    UnitOfWork,
};

pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        crate::schema::init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        crate::schema::init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}

/// An open SQLite transaction. Rolls back on drop unless committed.
pub struct SqliteUnitOfWork<'a> {
    tx: Transaction<'a>,
}

impl Storage for SqliteStorage {
    type Work<'a> = SqliteUnitOfWork<'a>;

    fn begin_write(&mut self) -> Result<SqliteUnitOfWork<'_>, StorageError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        Ok(SqliteUnitOfWork { tx })
    }

    fn begin_read(&mut self) -> Result<SqliteUnitOfWork<'_>, StorageError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Deferred)?;
        Ok(SqliteUnitOfWork { tx })
    }
}

impl SqliteUnitOfWork<'_> {
    // A statement-level error can end the transaction behind our back; after
    // that SQLite would run each write in autocommit mode.
    fn ensure_active(&self) -> Result<(), StorageError> {
        if self.tx.is_autocommit() {
            return Err(StorageError::RolledBack);
        }
        Ok(())
    }
}

impl UnitOfWork for SqliteUnitOfWork<'_> {
    fn is_active(&self) -> bool {
        !self.tx.is_autocommit()
    }

    fn commit(self) -> Result<(), StorageError> {
        self.tx.commit()?;
        Ok(())
    }
}

impl OperationReader for SqliteStorage {
    fn get_operation(&self, id: &OperationId) -> Result<Option<OperationRecord>, StorageError> {
        read_operation(&self.conn, id)
    }

    fn get_portals(&self, id: &OperationId) -> Result<Vec<Portal>, StorageError> {
        read_portals(&self.conn, id)
    }

    fn get_portal(
        &self,
        id: &OperationId,
        portal_id: &PortalId,
    ) -> Result<Option<Portal>, StorageError> {
        read_portal(&self.conn, id, portal_id)
    }

    fn get_links(&self, id: &OperationId) -> Result<Vec<LinkRecord>, StorageError> {
        read_links(&self.conn, id)
    }

    fn get_markers(&self, id: &OperationId) -> Result<Vec<MarkerRecord>, StorageError> {
        read_markers(&self.conn, id)
    }
}

impl OperationReader for SqliteUnitOfWork<'_> {
    fn get_operation(&self, id: &OperationId) -> Result<Option<OperationRecord>, StorageError> {
        read_operation(&self.tx, id)
    }

    fn get_portals(&self, id: &OperationId) -> Result<Vec<Portal>, StorageError> {
        read_portals(&self.tx, id)
    }

    fn get_portal(
        &self,
        id: &OperationId,
        portal_id: &PortalId,
    ) -> Result<Option<Portal>, StorageError> {
        read_portal(&self.tx, id, portal_id)
    }

    fn get_links(&self, id: &OperationId) -> Result<Vec<LinkRecord>, StorageError> {
        read_links(&self.tx, id)
    }

    fn get_markers(&self, id: &OperationId) -> Result<Vec<MarkerRecord>, StorageError> {
        read_markers(&self.tx, id)
    }
}

impl OperationWriter for SqliteUnitOfWork<'_> {
    fn delete_operation(&self, id: &OperationId) -> Result<bool, StorageError> {
        self.ensure_active()?;
        // Dependents first, by hand; the FK cascade is only a backstop.
        self.tx
            .execute("DELETE FROM marker WHERE operation_id = ?1", params![id.as_str()])?;
        self.tx
            .execute("DELETE FROM link WHERE operation_id = ?1", params![id.as_str()])?;
        self.tx
            .execute("DELETE FROM portal WHERE operation_id = ?1", params![id.as_str()])?;
        let removed = self
            .tx
            .execute("DELETE FROM operation WHERE id = ?1", params![id.as_str()])?;
        Ok(removed > 0)
    }

    fn insert_operation(&self, record: &OperationRecord) -> Result<(), StorageError> {
        self.ensure_active()?;
        self.tx
            .execute(
                "INSERT INTO operation (id, name, owner, color, team_id) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    record.id.as_str(),
                    record.name,
                    record.owner.as_str(),
                    record.color,
                    record.team.as_ref().map(|t| t.as_str()),
                ],
            )
            .map_err(|e| StorageError::from_write(e, || format!("operation {}", record.id)))?;
        Ok(())
    }

    fn upsert_portal(&self, id: &OperationId, portal: &Portal) -> Result<bool, StorageError> {
        self.ensure_active()?;
        let inserted = self
            .tx
            .execute(
                "INSERT OR IGNORE INTO portal (id, operation_id, name, lat, lon, comment) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    portal.id.as_str(),
                    id.as_str(),
                    portal.name,
                    portal.lat,
                    portal.lon,
                    portal.comment,
                ],
            )
            .map_err(|e| StorageError::from_write(e, || format!("portal {}", portal.id)))?;
        Ok(inserted > 0)
    }

    fn insert_link(&self, id: &OperationId, link: &LinkRecord) -> Result<(), StorageError> {
        self.ensure_active()?;
        self.tx
            .execute(
                "INSERT INTO link (id, operation_id, from_portal_id, to_portal_id, description, assigned_to) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    link.id.as_str(),
                    id.as_str(),
                    link.from_portal.as_str(),
                    link.to_portal.as_str(),
                    link.description,
                    link.assigned_to.as_ref().map(|a| a.as_str()),
                ],
            )
            .map_err(|e| StorageError::from_write(e, || format!("link {}", link.id)))?;
        Ok(())
    }

    fn insert_marker(&self, id: &OperationId, marker: &MarkerRecord) -> Result<(), StorageError> {
        self.ensure_active()?;
        self.tx
            .execute(
                "INSERT INTO marker (id, operation_id, portal_id, marker_type, comment) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    marker.id.as_str(),
                    id.as_str(),
                    marker.portal.as_str(),
                    marker.kind.as_str(),
                    marker.comment,
                ],
            )
            .map_err(|e| StorageError::from_write(e, || format!("marker {}", marker.id)))?;
        Ok(())
    }
}

fn read_operation(
    conn: &Connection,
    id: &OperationId,
) -> Result<Option<OperationRecord>, StorageError> {
    let record = conn
        .query_row(
            "SELECT id, name, owner, color, team_id FROM operation WHERE id = ?1",
            params![id.as_str()],
            |row| {
                Ok(OperationRecord {
                    id: OperationId::new(row.get::<_, String>(0)?),
                    name: row.get(1)?,
                    owner: AgentId::new(row.get::<_, String>(2)?),
                    color: row.get(3)?,
                    team: row.get::<_, Option<String>>(4)?.map(TeamId::from),
                })
            },
        )
        .optional()?;
    Ok(record)
}

fn portal_from_row(row: &rusqlite::Row) -> rusqlite::Result<Portal> {
    Ok(Portal {
        id: PortalId::new(row.get::<_, String>(0)?),
        name: row.get(1)?,
        lat: row.get(2)?,
        lon: row.get(3)?,
        comment: row.get(4)?,
    })
}

fn read_portals(conn: &Connection, id: &OperationId) -> Result<Vec<Portal>, StorageError> {
    let mut stmt = conn.prepare(
        "SELECT id, name, lat, lon, comment FROM portal WHERE operation_id = ?1 ORDER BY rowid",
    )?;
    let portals = stmt
        .query_map(params![id.as_str()], portal_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(portals)
}

fn read_portal(
    conn: &Connection,
    id: &OperationId,
    portal_id: &PortalId,
) -> Result<Option<Portal>, StorageError> {
    let portal = conn
        .query_row(
            "SELECT id, name, lat, lon, comment FROM portal WHERE operation_id = ?1 AND id = ?2",
            params![id.as_str(), portal_id.as_str()],
            portal_from_row,
        )
        .optional()?;
    Ok(portal)
}

fn read_links(conn: &Connection, id: &OperationId) -> Result<Vec<LinkRecord>, StorageError> {
    let mut stmt = conn.prepare(
        "SELECT id, from_portal_id, to_portal_id, description, assigned_to FROM link WHERE operation_id = ?1 ORDER BY rowid",
    )?;
    let links = stmt
        .query_map(params![id.as_str()], |row| {
            Ok(LinkRecord {
                id: LinkId::new(row.get::<_, String>(0)?),
                from_portal: PortalId::new(row.get::<_, String>(1)?),
                to_portal: PortalId::new(row.get::<_, String>(2)?),
                description: row.get(3)?,
                assigned_to: row.get::<_, Option<String>>(4)?.map(AgentId::from),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(links)
}

fn read_markers(conn: &Connection, id: &OperationId) -> Result<Vec<MarkerRecord>, StorageError> {
    let mut stmt = conn.prepare(
        "SELECT id, portal_id, marker_type, comment FROM marker WHERE operation_id = ?1 ORDER BY rowid",
    )?;
    let markers = stmt
        .query_map(params![id.as_str()], |row| {
            Ok(MarkerRecord {
                id: MarkerId::new(row.get::<_, String>(0)?),
                portal: PortalId::new(row.get::<_, String>(1)?),
                kind: MarkerType::new(row.get::<_, String>(2)?),
                comment: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(markers)
}
