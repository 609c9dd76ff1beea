//! # Record Storage
//!
//! The four relations (steps, groups, group steps, system items) behind a
//! transactional interface.
//!
//! - [`RecordRead`]: lookups and ordered scans
//! - [`RecordWrite`]: inserts and deletes, only reachable inside a transaction
//! - [`RecordStore`]: runs a closure in a read or write transaction; a write
//!   commits when the closure returns `Ok` and rolls back on `Err`
//!
//! Two backends implement it: [`MemoryStore`] (in-memory `BTreeMap` tables)
//! and [`RedbStore`] (disk-backed, ACID).
//!
//! The storage layer enforces key uniqueness only. Name uniqueness, reference
//! checks and cascades are applied by the integrity engine on top.

mod memory;
mod redb_store;

pub use memory::MemoryStore;
pub use redb_store::RedbStore;

use crate::{
    Group, GroupId, GroupStep, ItemRef, RoutineError, Step, StepId, SystemItem, SystemName,
};

/// Id sequences, one per relation.
///
/// Ids start at 1 and are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdSequence {
    Step,
    Group,
    GroupStep,
    SystemItem,
}

impl IdSequence {
    /// Metadata key under which the last issued id is kept.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Step => "last_step_id",
            Self::Group => "last_group_id",
            Self::GroupStep => "last_group_step_id",
            Self::SystemItem => "last_system_item_id",
        }
    }
}

/// Read access to the record tables.
///
/// All scans return records in deterministic order.
pub trait RecordRead {
    fn step(&self, id: StepId) -> Result<Option<Step>, RoutineError>;

    /// All steps, ordered by id.
    fn steps(&self) -> Result<Vec<Step>, RoutineError>;

    fn group(&self, id: GroupId) -> Result<Option<Group>, RoutineError>;

    /// All groups, ordered by id.
    fn groups(&self) -> Result<Vec<Group>, RoutineError>;

    /// One group's edges, ordered by `step_order`.
    fn group_steps(&self, group: GroupId) -> Result<Vec<GroupStep>, RoutineError>;

    /// One system's slots, ordered by `item_order`.
    fn system_items(&self, system: SystemName) -> Result<Vec<SystemItem>, RoutineError>;

    fn step_count(&self) -> Result<usize, RoutineError>;

    fn group_count(&self) -> Result<usize, RoutineError>;
}

/// Write access to the record tables.
pub trait RecordWrite: RecordRead {
    /// Issue the next id from a sequence.
    fn allocate_id(&mut self, sequence: IdSequence) -> Result<u64, RoutineError>;

    /// Insert or overwrite a step.
    fn put_step(&mut self, step: &Step) -> Result<(), RoutineError>;

    /// Remove a step record. Returns whether it existed.
    fn remove_step(&mut self, id: StepId) -> Result<bool, RoutineError>;

    /// Insert or overwrite a group.
    fn put_group(&mut self, group: &Group) -> Result<(), RoutineError>;

    /// Remove a group record. Returns whether it existed.
    fn remove_group(&mut self, id: GroupId) -> Result<bool, RoutineError>;

    /// Insert a group edge. Fails with `ConstraintViolation` if the
    /// `(group_id, step_order)` position is taken.
    fn insert_group_step(&mut self, row: &GroupStep) -> Result<(), RoutineError>;

    /// Remove all edges of one group. Returns how many were removed.
    fn clear_group_steps(&mut self, group: GroupId) -> Result<usize, RoutineError>;

    /// Remove every edge, in any group, that points at `step`.
    fn remove_group_steps_for(&mut self, step: StepId) -> Result<usize, RoutineError>;

    /// Insert a system slot. Fails with `ConstraintViolation` if the
    /// `(system, item_order)` position is taken.
    fn insert_system_item(&mut self, row: &SystemItem) -> Result<(), RoutineError>;

    /// Remove all slots of one system. Returns how many were removed.
    fn clear_system_items(&mut self, system: SystemName) -> Result<usize, RoutineError>;

    /// Remove every slot, in any system, that references `item`.
    fn remove_system_items_for(&mut self, item: ItemRef) -> Result<usize, RoutineError>;
}

/// A transactional record store.
pub trait RecordStore {
    /// Run `op` against a consistent read view.
    fn read<T, F>(&self, op: F) -> Result<T, RoutineError>
    where
        F: FnOnce(&dyn RecordRead) -> Result<T, RoutineError>;

    /// Run `op` in a write transaction.
    ///
    /// Either every change made by `op` is applied, or (when `op` or the
    /// commit fails) none is.
    fn write<T, F>(&mut self, op: F) -> Result<T, RoutineError>
    where
        F: FnOnce(&mut dyn RecordWrite) -> Result<T, RoutineError>;
}
