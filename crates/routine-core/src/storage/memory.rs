//! # In-Memory Record Store
//!
//! `BTreeMap` tables keyed the same way as the redb tables, so scans come
//! back in the same order on both backends.
//!
//! Transactions are copy-on-write: a write runs against a clone and the
//! clone replaces the live tables only if the closure succeeds.

use super::{IdSequence, RecordRead, RecordStore, RecordWrite};
use crate::{
    Group, GroupId, GroupStep, ItemRef, RoutineError, Step, StepId, SystemItem, SystemName,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// In-memory tables for all four relations plus id sequences.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryStore {
    steps: BTreeMap<StepId, Step>,
    groups: BTreeMap<GroupId, Group>,
    /// Keyed by `(group_id, step_order)`.
    group_steps: BTreeMap<(GroupId, u32), GroupStep>,
    /// Keyed by `(system, item_order)`.
    system_items: BTreeMap<(SystemName, u32), SystemItem>,
    /// Last issued id per sequence.
    sequences: BTreeMap<String, u64>,
}

impl MemoryStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordRead for MemoryStore {
    fn step(&self, id: StepId) -> Result<Option<Step>, RoutineError> {
        Ok(self.steps.get(&id).cloned())
    }

    fn steps(&self) -> Result<Vec<Step>, RoutineError> {
        Ok(self.steps.values().cloned().collect())
    }

    fn group(&self, id: GroupId) -> Result<Option<Group>, RoutineError> {
        Ok(self.groups.get(&id).cloned())
    }

    fn groups(&self) -> Result<Vec<Group>, RoutineError> {
        Ok(self.groups.values().cloned().collect())
    }

    fn group_steps(&self, group: GroupId) -> Result<Vec<GroupStep>, RoutineError> {
        Ok(self
            .group_steps
            .range((group, 0)..=(group, u32::MAX))
            .map(|(_, row)| *row)
            .collect())
    }

    fn system_items(&self, system: SystemName) -> Result<Vec<SystemItem>, RoutineError> {
        Ok(self
            .system_items
            .range((system, 0)..=(system, u32::MAX))
            .map(|(_, row)| *row)
            .collect())
    }

    fn step_count(&self) -> Result<usize, RoutineError> {
        Ok(self.steps.len())
    }

    fn group_count(&self) -> Result<usize, RoutineError> {
        Ok(self.groups.len())
    }
}

impl RecordWrite for MemoryStore {
    fn allocate_id(&mut self, sequence: IdSequence) -> Result<u64, RoutineError> {
        let last = self.sequences.entry(sequence.key().to_string()).or_insert(0);
        *last = last.saturating_add(1);
        Ok(*last)
    }

    fn put_step(&mut self, step: &Step) -> Result<(), RoutineError> {
        self.steps.insert(step.id, step.clone());
        Ok(())
    }

    fn remove_step(&mut self, id: StepId) -> Result<bool, RoutineError> {
        Ok(self.steps.remove(&id).is_some())
    }

    fn put_group(&mut self, group: &Group) -> Result<(), RoutineError> {
        self.groups.insert(group.id, group.clone());
        Ok(())
    }

    fn remove_group(&mut self, id: GroupId) -> Result<bool, RoutineError> {
        Ok(self.groups.remove(&id).is_some())
    }

    fn insert_group_step(&mut self, row: &GroupStep) -> Result<(), RoutineError> {
        let key = (row.group_id, row.step_order);
        if self.group_steps.contains_key(&key) {
            return Err(RoutineError::ConstraintViolation(format!(
                "group {} already has a step at position {}",
                row.group_id, row.step_order
            )));
        }
        self.group_steps.insert(key, *row);
        Ok(())
    }

    fn clear_group_steps(&mut self, group: GroupId) -> Result<usize, RoutineError> {
        let before = self.group_steps.len();
        self.group_steps.retain(|(owner, _), _| *owner != group);
        Ok(before - self.group_steps.len())
    }

    fn remove_group_steps_for(&mut self, step: StepId) -> Result<usize, RoutineError> {
        let before = self.group_steps.len();
        self.group_steps.retain(|_, row| row.step_id != step);
        Ok(before - self.group_steps.len())
    }

    fn insert_system_item(&mut self, row: &SystemItem) -> Result<(), RoutineError> {
        let key = (row.system, row.item_order);
        if self.system_items.contains_key(&key) {
            return Err(RoutineError::ConstraintViolation(format!(
                "system {} already has an item at position {}",
                row.system, row.item_order
            )));
        }
        self.system_items.insert(key, *row);
        Ok(())
    }

    fn clear_system_items(&mut self, system: SystemName) -> Result<usize, RoutineError> {
        let before = self.system_items.len();
        self.system_items.retain(|(owner, _), _| *owner != system);
        Ok(before - self.system_items.len())
    }

    fn remove_system_items_for(&mut self, item: ItemRef) -> Result<usize, RoutineError> {
        let before = self.system_items.len();
        self.system_items.retain(|_, row| row.item != item);
        Ok(before - self.system_items.len())
    }
}

impl RecordStore for MemoryStore {
    fn read<T, F>(&self, op: F) -> Result<T, RoutineError>
    where
        F: FnOnce(&dyn RecordRead) -> Result<T, RoutineError>,
    {
        op(self)
    }

    fn write<T, F>(&mut self, op: F) -> Result<T, RoutineError>
    where
        F: FnOnce(&mut dyn RecordWrite) -> Result<T, RoutineError>,
    {
        let mut working = self.clone();
        let out = op(&mut working)?;
        *self = working;
        Ok(out)
    }
}
