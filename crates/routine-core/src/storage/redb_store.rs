//! # redb-backed Record Store
//!
//! A disk-backed record store using the redb embedded database, providing:
//! - ACID transactions (one write transaction per store operation)
//! - Crash safety (copy-on-write B-trees)
//! - MVCC (concurrent readers, single writer)
//!
//! Records are postcard-encoded. Edge tables use composite keys so that the
//! key itself enforces one row per position and range scans come back in
//! position order:
//! - group steps: `(group_id, step_order)`
//! - system items: `(system code, item_order)`

use super::{IdSequence, RecordRead, RecordStore, RecordWrite};
use crate::{
    Group, GroupId, GroupStep, ItemRef, RoutineError, Step, StepId, SystemItem, SystemName,
};
use redb::{
    Database, ReadTransaction, ReadableDatabase, ReadableTable, ReadableTableMetadata,
    TableDefinition, WriteTransaction,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;

/// Table for steps: StepId(u64) -> serialized Step bytes
const STEPS: TableDefinition<u64, &[u8]> = TableDefinition::new("steps");

/// Table for groups: GroupId(u64) -> serialized Group bytes
const GROUPS: TableDefinition<u64, &[u8]> = TableDefinition::new("groups");

/// Table for group steps: (group_id, step_order) -> serialized GroupStep bytes
const GROUP_STEPS: TableDefinition<(u64, u32), &[u8]> = TableDefinition::new("group_steps");

/// Table for system items: (system code, item_order) -> serialized SystemItem bytes
const SYSTEM_ITEMS: TableDefinition<(u64, u32), &[u8]> = TableDefinition::new("system_items");

/// Table for metadata: key string -> value u64 (id sequences)
const METADATA: TableDefinition<&str, u64> = TableDefinition::new("metadata");

// =============================================================================
// ENCODING HELPERS
// =============================================================================

fn io_err(e: impl std::fmt::Display) -> RoutineError {
    RoutineError::IoError(e.to_string())
}

fn encode<T: Serialize>(record: &T) -> Result<Vec<u8>, RoutineError> {
    postcard::to_allocvec(record).map_err(|e| RoutineError::SerializationError(e.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, RoutineError> {
    postcard::from_bytes(bytes).map_err(|e| RoutineError::SerializationError(e.to_string()))
}

fn system_key(system: SystemName) -> u64 {
    u64::from(system.code())
}

fn get_record<T, Tab>(table: &Tab, key: u64) -> Result<Option<T>, RoutineError>
where
    T: DeserializeOwned,
    Tab: ReadableTable<u64, &'static [u8]>,
{
    match table.get(key).map_err(io_err)? {
        Some(guard) => decode(guard.value()).map(Some),
        None => Ok(None),
    }
}

fn scan_all<K, T, Tab>(table: &Tab) -> Result<Vec<T>, RoutineError>
where
    K: redb::Key + 'static,
    T: DeserializeOwned,
    Tab: ReadableTable<K, &'static [u8]>,
{
    let mut records = Vec::new();
    for entry in table.iter().map_err(io_err)? {
        let (_, value) = entry.map_err(io_err)?;
        records.push(decode(value.value())?);
    }
    Ok(records)
}

/// Scan every row whose key starts with `scope`, in position order.
fn scan_scope<T, Tab>(table: &Tab, scope: u64) -> Result<Vec<T>, RoutineError>
where
    T: DeserializeOwned,
    Tab: ReadableTable<(u64, u32), &'static [u8]>,
{
    let mut records = Vec::new();
    for entry in table
        .range((scope, 0u32)..=(scope, u32::MAX))
        .map_err(io_err)?
    {
        let (_, value) = entry.map_err(io_err)?;
        records.push(decode(value.value())?);
    }
    Ok(records)
}

/// Keys of every row in `scope`.
fn scope_keys<Tab>(table: &Tab, scope: u64) -> Result<Vec<(u64, u32)>, RoutineError>
where
    Tab: ReadableTable<(u64, u32), &'static [u8]>,
{
    let mut keys = Vec::new();
    for entry in table
        .range((scope, 0u32)..=(scope, u32::MAX))
        .map_err(io_err)?
    {
        let (key, _) = entry.map_err(io_err)?;
        keys.push(key.value());
    }
    Ok(keys)
}

/// Keys of every row whose decoded record satisfies `matches`.
fn matching_keys<T, Tab>(
    table: &Tab,
    matches: impl Fn(&T) -> bool,
) -> Result<Vec<(u64, u32)>, RoutineError>
where
    T: DeserializeOwned,
    Tab: ReadableTable<(u64, u32), &'static [u8]>,
{
    let mut keys = Vec::new();
    for entry in table.iter().map_err(io_err)? {
        let (key, value) = entry.map_err(io_err)?;
        let record: T = decode(value.value())?;
        if matches(&record) {
            keys.push(key.value());
        }
    }
    Ok(keys)
}

fn count<Tab: ReadableTableMetadata>(table: &Tab) -> Result<usize, RoutineError> {
    Ok(table.len().map_err(io_err)? as usize)
}

// =============================================================================
// STORE
// =============================================================================

/// A disk-backed record store using redb.
pub struct RedbStore {
    db: Database,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore").finish_non_exhaustive()
    }
}

impl RedbStore {
    /// Open or create a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RoutineError> {
        let db = Database::create(path.as_ref()).map_err(io_err)?;

        // Initialize tables if they don't exist
        {
            let write_txn = db.begin_write().map_err(io_err)?;
            let _ = write_txn.open_table(STEPS).map_err(io_err)?;
            let _ = write_txn.open_table(GROUPS).map_err(io_err)?;
            let _ = write_txn.open_table(GROUP_STEPS).map_err(io_err)?;
            let _ = write_txn.open_table(SYSTEM_ITEMS).map_err(io_err)?;
            let _ = write_txn.open_table(METADATA).map_err(io_err)?;
            write_txn.commit().map_err(io_err)?;
        }

        Ok(Self { db })
    }

    /// Compact the database file.
    pub fn compact(&mut self) -> Result<(), RoutineError> {
        self.db.compact().map_err(io_err)?;
        Ok(())
    }
}

impl RecordStore for RedbStore {
    fn read<T, F>(&self, op: F) -> Result<T, RoutineError>
    where
        F: FnOnce(&dyn RecordRead) -> Result<T, RoutineError>,
    {
        let txn = self.db.begin_read().map_err(io_err)?;
        op(&RedbRead { txn })
    }

    fn write<T, F>(&mut self, op: F) -> Result<T, RoutineError>
    where
        F: FnOnce(&mut dyn RecordWrite) -> Result<T, RoutineError>,
    {
        let txn = self.db.begin_write().map_err(io_err)?;
        let outcome = {
            let mut view = RedbWrite { txn: &txn };
            op(&mut view)
        };
        match outcome {
            Ok(value) => {
                txn.commit().map_err(io_err)?;
                Ok(value)
            }
            Err(e) => {
                txn.abort().map_err(io_err)?;
                Err(e)
            }
        }
    }
}

// =============================================================================
// READ VIEW
// =============================================================================

struct RedbRead {
    txn: ReadTransaction,
}

impl RecordRead for RedbRead {
    fn step(&self, id: StepId) -> Result<Option<Step>, RoutineError> {
        let table = self.txn.open_table(STEPS).map_err(io_err)?;
        get_record(&table, id.0)
    }

    fn steps(&self) -> Result<Vec<Step>, RoutineError> {
        let table = self.txn.open_table(STEPS).map_err(io_err)?;
        scan_all(&table)
    }

    fn group(&self, id: GroupId) -> Result<Option<Group>, RoutineError> {
        let table = self.txn.open_table(GROUPS).map_err(io_err)?;
        get_record(&table, id.0)
    }

    fn groups(&self) -> Result<Vec<Group>, RoutineError> {
        let table = self.txn.open_table(GROUPS).map_err(io_err)?;
        scan_all(&table)
    }

    fn group_steps(&self, group: GroupId) -> Result<Vec<GroupStep>, RoutineError> {
        let table = self.txn.open_table(GROUP_STEPS).map_err(io_err)?;
        scan_scope(&table, group.0)
    }

    fn system_items(&self, system: SystemName) -> Result<Vec<SystemItem>, RoutineError> {
        let table = self.txn.open_table(SYSTEM_ITEMS).map_err(io_err)?;
        scan_scope(&table, system_key(system))
    }

    fn step_count(&self) -> Result<usize, RoutineError> {
        let table = self.txn.open_table(STEPS).map_err(io_err)?;
        count(&table)
    }

    fn group_count(&self) -> Result<usize, RoutineError> {
        let table = self.txn.open_table(GROUPS).map_err(io_err)?;
        count(&table)
    }
}

// =============================================================================
// WRITE VIEW
// =============================================================================

/// Tables are opened per call and dropped before the next one, so a single
/// table is never held open twice within the transaction.
struct RedbWrite<'txn> {
    txn: &'txn WriteTransaction,
}

impl RedbWrite<'_> {
    fn remove_keys(
        &self,
        definition: TableDefinition<'static, (u64, u32), &'static [u8]>,
        keys: &[(u64, u32)],
    ) -> Result<usize, RoutineError> {
        let mut table = self.txn.open_table(definition).map_err(io_err)?;
        for key in keys {
            table.remove(*key).map_err(io_err)?;
        }
        Ok(keys.len())
    }
}

impl RecordRead for RedbWrite<'_> {
    fn step(&self, id: StepId) -> Result<Option<Step>, RoutineError> {
        let table = self.txn.open_table(STEPS).map_err(io_err)?;
        get_record(&table, id.0)
    }

    fn steps(&self) -> Result<Vec<Step>, RoutineError> {
        let table = self.txn.open_table(STEPS).map_err(io_err)?;
        scan_all(&table)
    }

    fn group(&self, id: GroupId) -> Result<Option<Group>, RoutineError> {
        let table = self.txn.open_table(GROUPS).map_err(io_err)?;
        get_record(&table, id.0)
    }

    fn groups(&self) -> Result<Vec<Group>, RoutineError> {
        let table = self.txn.open_table(GROUPS).map_err(io_err)?;
        scan_all(&table)
    }

    fn group_steps(&self, group: GroupId) -> Result<Vec<GroupStep>, RoutineError> {
        let table = self.txn.open_table(GROUP_STEPS).map_err(io_err)?;
        scan_scope(&table, group.0)
    }

    fn system_items(&self, system: SystemName) -> Result<Vec<SystemItem>, RoutineError> {
        let table = self.txn.open_table(SYSTEM_ITEMS).map_err(io_err)?;
        scan_scope(&table, system_key(system))
    }

    fn step_count(&self) -> Result<usize, RoutineError> {
        let table = self.txn.open_table(STEPS).map_err(io_err)?;
        count(&table)
    }

    fn group_count(&self) -> Result<usize, RoutineError> {
        let table = self.txn.open_table(GROUPS).map_err(io_err)?;
        count(&table)
    }
}

impl RecordWrite for RedbWrite<'_> {
    fn allocate_id(&mut self, sequence: IdSequence) -> Result<u64, RoutineError> {
        let mut table = self.txn.open_table(METADATA).map_err(io_err)?;
        let last = table
            .get(sequence.key())
            .map_err(io_err)?
            .map(|v| v.value())
            .unwrap_or(0);
        let next = last.saturating_add(1);
        table.insert(sequence.key(), next).map_err(io_err)?;
        Ok(next)
    }

    fn put_step(&mut self, step: &Step) -> Result<(), RoutineError> {
        let bytes = encode(step)?;
        let mut table = self.txn.open_table(STEPS).map_err(io_err)?;
        table.insert(step.id.0, bytes.as_slice()).map_err(io_err)?;
        Ok(())
    }

    fn remove_step(&mut self, id: StepId) -> Result<bool, RoutineError> {
        let mut table = self.txn.open_table(STEPS).map_err(io_err)?;
        let existed = table.remove(id.0).map_err(io_err)?.is_some();
        Ok(existed)
    }

    fn put_group(&mut self, group: &Group) -> Result<(), RoutineError> {
        let bytes = encode(group)?;
        let mut table = self.txn.open_table(GROUPS).map_err(io_err)?;
        table.insert(group.id.0, bytes.as_slice()).map_err(io_err)?;
        Ok(())
    }

    fn remove_group(&mut self, id: GroupId) -> Result<bool, RoutineError> {
        let mut table = self.txn.open_table(GROUPS).map_err(io_err)?;
        let existed = table.remove(id.0).map_err(io_err)?.is_some();
        Ok(existed)
    }

    fn insert_group_step(&mut self, row: &GroupStep) -> Result<(), RoutineError> {
        let key = (row.group_id.0, row.step_order);
        let bytes = encode(row)?;
        let mut table = self.txn.open_table(GROUP_STEPS).map_err(io_err)?;
        if table.get(key).map_err(io_err)?.is_some() {
            return Err(RoutineError::ConstraintViolation(format!(
                "group {} already has a step at position {}",
                row.group_id, row.step_order
            )));
        }
        table.insert(key, bytes.as_slice()).map_err(io_err)?;
        Ok(())
    }

    fn clear_group_steps(&mut self, group: GroupId) -> Result<usize, RoutineError> {
        let keys = {
            let table = self.txn.open_table(GROUP_STEPS).map_err(io_err)?;
            scope_keys(&table, group.0)?
        };
        self.remove_keys(GROUP_STEPS, &keys)
    }

    fn remove_group_steps_for(&mut self, step: StepId) -> Result<usize, RoutineError> {
        let keys = {
            let table = self.txn.open_table(GROUP_STEPS).map_err(io_err)?;
            matching_keys(&table, |row: &GroupStep| row.step_id == step)?
        };
        self.remove_keys(GROUP_STEPS, &keys)
    }

    fn insert_system_item(&mut self, row: &SystemItem) -> Result<(), RoutineError> {
        let key = (system_key(row.system), row.item_order);
        let bytes = encode(row)?;
        let mut table = self.txn.open_table(SYSTEM_ITEMS).map_err(io_err)?;
        if table.get(key).map_err(io_err)?.is_some() {
            return Err(RoutineError::ConstraintViolation(format!(
                "system {} already has an item at position {}",
                row.system, row.item_order
            )));
        }
        table.insert(key, bytes.as_slice()).map_err(io_err)?;
        Ok(())
    }

    fn clear_system_items(&mut self, system: SystemName) -> Result<usize, RoutineError> {
        let keys = {
            let table = self.txn.open_table(SYSTEM_ITEMS).map_err(io_err)?;
            scope_keys(&table, system_key(system))?
        };
        self.remove_keys(SYSTEM_ITEMS, &keys)
    }

    fn remove_system_items_for(&mut self, item: ItemRef) -> Result<usize, RoutineError> {
        let keys = {
            let table = self.txn.open_table(SYSTEM_ITEMS).map_err(io_err)?;
            matching_keys(&table, |row: &SystemItem| row.item == item)?
        };
        self.remove_keys(SYSTEM_ITEMS, &keys)
    }
}

// =============================================================================
// TESTS
// =============================================================================
