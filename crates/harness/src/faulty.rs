use opsync_core::{Portal, ids::*};
use opsync_storage::{
    LinkRecord, MarkerRecord, OperationReader, OperationRecord, OperationWriter, SqliteStorage,
    SqliteUnitOfWork, Storage, StorageError, UnitOfWork,
};

/// A write that should fail on its way to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    Delete,
    InsertOperation,
    UpsertPortal(PortalId),
    InsertLink(LinkId),
    InsertMarker(MarkerId),
}

/// SQLite storage that fails chosen writes. Reads and every write without a
/// matching fault go straight through.
pub struct FaultyStorage {
    inner: SqliteStorage,
    faults: Vec<Fault>,
}

impl FaultyStorage {
    pub fn new(inner: SqliteStorage) -> Self {
        Self {
            inner,
            faults: Vec::new(),
        }
    }

    pub fn inject(&mut self, fault: Fault) {
        self.faults.push(fault);
    }

    pub fn clear(&mut self) {
        self.faults.clear();
    }
}

pub struct FaultyWork<'a> {
    inner: SqliteUnitOfWork<'a>,
    faults: &'a [Fault],
}

impl FaultyWork<'_> {
    fn check(&self, fault: Fault) -> Result<(), StorageError> {
        if self.faults.contains(&fault) {
            return Err(StorageError::ConstraintViolation(format!(
                "injected fault {fault:?}"
            )));
        }
        Ok(())
    }
}

impl Storage for FaultyStorage {
    type Work<'a> = FaultyWork<'a>;

    fn begin_write(&mut self) -> Result<FaultyWork<'_>, StorageError> {
        let faults = &self.faults;
        let inner = self.inner.begin_write()?;
        Ok(FaultyWork { inner, faults })
    }

    fn begin_read(&mut self) -> Result<FaultyWork<'_>, StorageError> {
        let faults = &self.faults;
        let inner = self.inner.begin_read()?;
        Ok(FaultyWork { inner, faults })
    }
}

impl UnitOfWork for FaultyWork<'_> {
    fn is_active(&self) -> bool {
        self.inner.is_active()
    }

    fn commit(self) -> Result<(), StorageError> {
        self.inner.commit()
    }
}

impl OperationReader for FaultyStorage {
    fn get_operation(&self, id: &OperationId) -> Result<Option<OperationRecord>, StorageError> {
        self.inner.get_operation(id)
    }

    fn get_portals(&self, id: &OperationId) -> Result<Vec<Portal>, StorageError> {
        self.inner.get_portals(id)
    }

    fn get_portal(
        &self,
        id: &OperationId,
        portal_id: &PortalId,
    ) -> Result<Option<Portal>, StorageError> {
        self.inner.get_portal(id, portal_id)
    }

    fn get_links(&self, id: &OperationId) -> Result<Vec<LinkRecord>, StorageError> {
        self.inner.get_links(id)
    }

    fn get_markers(&self, id: &OperationId) -> Result<Vec<MarkerRecord>, StorageError> {
        self.inner.get_markers(id)
    }
}

impl OperationReader for FaultyWork<'_> {
    fn get_operation(&self, id: &OperationId) -> Result<Option<OperationRecord>, StorageError> {
        self.inner.get_operation(id)
    }

    fn get_portals(&self, id: &OperationId) -> Result<Vec<Portal>, StorageError> {
        self.inner.get_portals(id)
    }

    fn get_portal(
        &self,
        id: &OperationId,
        portal_id: &PortalId,
    ) -> Result<Option<Portal>, StorageError> {
        self.inner.get_portal(id, portal_id)
    }

    fn get_links(&self, id: &OperationId) -> Result<Vec<LinkRecord>, StorageError> {
        self.inner.get_links(id)
    }

    fn get_markers(&self, id: &OperationId) -> Result<Vec<MarkerRecord>, StorageError> {
        self.inner.get_markers(id)
    }
}

impl OperationWriter for FaultyWork<'_> {
    fn delete_operation(&self, id: &OperationId) -> Result<bool, StorageError> {
        self.check(Fault::Delete)?;
        self.inner.delete_operation(id)
    }

    fn insert_operation(&self, record: &OperationRecord) -> Result<(), StorageError> {
        self.check(Fault::InsertOperation)?;
        self.inner.insert_operation(record)
    }

    fn upsert_portal(&self, id: &OperationId, portal: &Portal) -> Result<bool, StorageError> {
        self.check(Fault::UpsertPortal(portal.id.clone()))?;
        self.inner.upsert_portal(id, portal)
    }

    fn insert_link(&self, id: &OperationId, link: &LinkRecord) -> Result<(), StorageError> {
        self.check(Fault::InsertLink(link.id.clone()))?;
        self.inner.insert_link(id, link)
    }

    fn insert_marker(&self, id: &OperationId, marker: &MarkerRecord) -> Result<(), StorageError> {
        self.check(Fault::InsertMarker(marker.id.clone()))?;
        self.inner.insert_marker(id, marker)
    }
}
