//! # Session Module
//!
//! The public entry point to a routine store.
//!
//! ## Storage Backends
//!
//! Session supports two storage backends:
//! - `InMemory`: a [`MemoryStore`] (fast, volatile unless saved with the
//!   `formats` module)
//! - `Persistent`: a [`RedbStore`] for disk-backed ACID storage
//!
//! Every mutating method runs as a single write transaction on either backend.

use crate::storage::{MemoryStore, RecordRead, RecordStore, RecordWrite, RedbStore};
use crate::{
    AssemblyReport, Dashboard, Deleted, Group, GroupDetail, GroupDraft, GroupId, ItemRef,
    ResolvedSystem, RoutineError, Step, StepDraft, StepId, SystemName, assembly, composition,
    entities,
};
use std::path::Path;

/// Storage backend for a Session.
#[derive(Debug)]
pub enum StorageBackend {
    /// In-memory tables (fast, volatile).
    InMemory(MemoryStore),
    /// Disk-backed tables using redb (ACID, persistent).
    Persistent(RedbStore),
}

impl Default for StorageBackend {
    fn default() -> Self {
        Self::InMemory(MemoryStore::new())
    }
}

/// A handle on one routine store.
#[derive(Debug, Default)]
pub struct Session {
    backend: StorageBackend,
}

impl Session {
    /// Create a new empty session with in-memory storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session over existing in-memory tables.
    #[must_use]
    pub fn with_store(store: MemoryStore) -> Self {
        Self {
            backend: StorageBackend::InMemory(store),
        }
    }

    /// Open or create a redb database at the given path.
    pub fn with_redb(path: impl AsRef<Path>) -> Result<Self, RoutineError> {
        Ok(Self::with_redb_store(RedbStore::open(path)?))
    }

    #[must_use]
    pub fn with_redb_store(store: RedbStore) -> Self {
        Self {
            backend: StorageBackend::Persistent(store),
        }
    }

    /// Check if using persistent storage.
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        matches!(self.backend, StorageBackend::Persistent(_))
    }

    /// The in-memory tables, or `None` for a persistent backend.
    #[must_use]
    pub fn memory_store(&self) -> Option<&MemoryStore> {
        match &self.backend {
            StorageBackend::InMemory(store) => Some(store),
            StorageBackend::Persistent(_) => None,
        }
    }

    /// Reclaim unused space in a redb database file.
    ///
    /// Returns `false` for in-memory tables, which have nothing to compact.
    pub fn compact(&mut self) -> Result<bool, RoutineError> {
        match &mut self.backend {
            StorageBackend::InMemory(_) => Ok(false),
            StorageBackend::Persistent(store) => {
                store.compact()?;
                Ok(true)
            }
        }
    }

    fn read<T>(
        &self,
        op: impl FnOnce(&dyn RecordRead) -> Result<T, RoutineError>,
    ) -> Result<T, RoutineError> {
        match &self.backend {
            StorageBackend::InMemory(store) => store.read(op),
            StorageBackend::Persistent(store) => store.read(op),
        }
    }

    fn write<T>(
        &mut self,
        op: impl FnOnce(&mut dyn RecordWrite) -> Result<T, RoutineError>,
    ) -> Result<T, RoutineError> {
        match &mut self.backend {
            StorageBackend::InMemory(store) => store.write(op),
            StorageBackend::Persistent(store) => store.write(op),
        }
    }

    // =========================================================================
    // STEPS
    // =========================================================================

    pub fn create_step(&mut self, draft: StepDraft) -> Result<Step, RoutineError> {
        self.write(|t| entities::create_step(t, draft))
    }

    pub fn update_step(&mut self, id: StepId, draft: StepDraft) -> Result<Step, RoutineError> {
        self.write(|t| entities::update_step(t, id, draft))
    }

    /// Delete a step and every group and system slot that references it.
    pub fn delete_step(&mut self, id: StepId) -> Result<Deleted, RoutineError> {
        self.write(|t| entities::delete_step(t, id))
    }

    pub fn get_step(&self, id: StepId) -> Result<Step, RoutineError> {
        self.read(|t| entities::get_step(t, id))
    }

    /// All steps ordered by name.
    pub fn list_steps(&self) -> Result<Vec<Step>, RoutineError> {
        self.read(|t| entities::list_steps(t))
    }

    // =========================================================================
    // GROUPS
    // =========================================================================

    pub fn create_group(&mut self, draft: GroupDraft) -> Result<Group, RoutineError> {
        self.write(|t| entities::create_group(t, draft))
    }

    /// Create a group with an initial step sequence in one transaction.
    pub fn create_group_with_steps(
        &mut self,
        draft: GroupDraft,
        steps: &[StepId],
    ) -> Result<GroupDetail, RoutineError> {
        self.write(|t| entities::create_group_with_steps(t, draft, steps))
    }

    pub fn update_group(&mut self, id: GroupId, draft: GroupDraft) -> Result<Group, RoutineError> {
        self.write(|t| entities::update_group(t, id, draft))
    }

    /// Update a group's fields and its step sequence in one transaction.
    pub fn update_group_with_steps(
        &mut self,
        id: GroupId,
        draft: GroupDraft,
        steps: &[StepId],
    ) -> Result<GroupDetail, RoutineError> {
        self.write(|t| entities::update_group_with_steps(t, id, draft, steps))
    }

    /// Delete a group, its step edges and the system slots referencing it.
    pub fn delete_group(&mut self, id: GroupId) -> Result<Deleted, RoutineError> {
        self.write(|t| entities::delete_group(t, id))
    }

    pub fn get_group(&self, id: GroupId) -> Result<Group, RoutineError> {
        self.read(|t| entities::get_group(t, id))
    }

    /// All groups ordered by name.
    pub fn list_groups(&self) -> Result<Vec<Group>, RoutineError> {
        self.read(|t| entities::list_groups(t))
    }

    // =========================================================================
    // COMPOSITION
    // =========================================================================

    /// Replace a group's step sequence. Returns the number of steps stored.
    pub fn set_group_steps(
        &mut self,
        id: GroupId,
        steps: &[StepId],
    ) -> Result<usize, RoutineError> {
        self.write(|t| composition::set_group_steps(t, id, steps))
    }

    /// The group's steps in position order.
    pub fn group_steps(&self, id: GroupId) -> Result<Vec<Step>, RoutineError> {
        self.read(|t| {
            entities::get_group(t, id)?;
            composition::group_steps_resolved(t, id)
        })
    }

    pub fn group_total_time(&self, id: GroupId) -> Result<u64, RoutineError> {
        self.read(|t| composition::group_total_time(t, id))
    }

    /// A group with its resolved steps and total time.
    pub fn group_with_steps(&self, id: GroupId) -> Result<GroupDetail, RoutineError> {
        self.read(|t| composition::group_detail(t, id))
    }

    // =========================================================================
    // SYSTEMS
    // =========================================================================

    /// Replace a system's items. Missing targets are skipped and reported.
    pub fn set_system_items(
        &mut self,
        system: SystemName,
        items: &[ItemRef],
    ) -> Result<AssemblyReport, RoutineError> {
        self.write(|t| assembly::set_system_items(t, system, items))
    }

    /// Resolved items of a system, in order.
    pub fn system_items(&self, system: SystemName) -> Result<ResolvedSystem, RoutineError> {
        self.read(|t| assembly::resolve_system(t, system))
    }

    pub fn system_total_time(&self, system: SystemName) -> Result<u64, RoutineError> {
        self.read(|t| assembly::system_total_time(t, system))
    }

    /// The fixed list of systems.
    #[must_use]
    pub fn system_names(&self) -> &'static [SystemName] {
        assembly::system_names()
    }

    pub fn dashboard(&self) -> Result<Dashboard, RoutineError> {
        self.read(|t| assembly::dashboard(t))
    }
}

// =============================================================================
// TESTS
// =============================================================================
