//! # Composition Model
//!
//! Groups own an ordered sequence of steps, stored as `GroupStep` edges.
//!
//! The sequence is only ever written whole: `set_group_steps` deletes the
//! group's edges and inserts one edge per input position. Unlike system
//! assembly this is all-or-nothing: one unknown or repeated step rejects the
//! entire write.

use crate::integrity::{check_entry_count, position};
use crate::storage::{IdSequence, RecordRead, RecordWrite};
use crate::{GroupDetail, GroupId, GroupStep, RoutineError, Step, StepId};
use std::collections::BTreeSet;

/// Replace a group's step sequence.
///
/// Positions are assigned from input order starting at 0. Returns the number
/// of edges written.
///
/// # Errors
///
/// - `GroupNotFound` if the group does not exist
/// - `StepNotFound` for the first unknown step id
/// - `DuplicateStepInGroup` for the first repeated step id
pub fn set_group_steps<W: RecordWrite + ?Sized>(
    tables: &mut W,
    group: GroupId,
    steps: &[StepId],
) -> Result<usize, RoutineError> {
    if tables.group(group)?.is_none() {
        return Err(RoutineError::GroupNotFound(group));
    }
    check_entry_count(steps.len())?;

    // Validate everything before the first delete.
    let mut seen = BTreeSet::new();
    for &step in steps {
        if tables.step(step)?.is_none() {
            return Err(RoutineError::StepNotFound(step));
        }
        if !seen.insert(step) {
            return Err(RoutineError::DuplicateStepInGroup { group, step });
        }
    }

    tables.clear_group_steps(group)?;
    for (index, &step) in steps.iter().enumerate() {
        let row = GroupStep {
            id: tables.allocate_id(IdSequence::GroupStep)?,
            group_id: group,
            step_id: step,
            step_order: position(index)?,
        };
        tables.insert_group_step(&row)?;
    }
    Ok(steps.len())
}

/// The group's steps in position order.
///
/// Edges whose step has vanished are skipped; cascades make that unreachable
/// for writes made through this crate.
pub fn group_steps_resolved<R: RecordRead + ?Sized>(
    tables: &R,
    group: GroupId,
) -> Result<Vec<Step>, RoutineError> {
    let mut steps = Vec::new();
    for row in tables.group_steps(group)? {
        if let Some(step) = tables.step(row.step_id)? {
            steps.push(step);
        }
    }
    Ok(steps)
}

/// Sum of step estimates for a group known to exist. Unset estimates count 0.
pub fn steps_total_time<R: RecordRead + ?Sized>(
    tables: &R,
    group: GroupId,
) -> Result<u64, RoutineError> {
    Ok(group_steps_resolved(tables, group)?
        .iter()
        .map(Step::time)
        .fold(0u64, u64::saturating_add))
}

/// Total estimated minutes of a group, computed from its current steps.
pub fn group_total_time<R: RecordRead + ?Sized>(
    tables: &R,
    group: GroupId,
) -> Result<u64, RoutineError> {
    if tables.group(group)?.is_none() {
        return Err(RoutineError::GroupNotFound(group));
    }
    steps_total_time(tables, group)
}

/// A group with its ordered steps and total time.
pub fn group_detail<R: RecordRead + ?Sized>(
    tables: &R,
    group: GroupId,
) -> Result<GroupDetail, RoutineError> {
    let record = tables
        .group(group)?
        .ok_or(RoutineError::GroupNotFound(group))?;
    let steps = group_steps_resolved(tables, group)?;
    let total_time = steps.iter().map(Step::time).fold(0u64, u64::saturating_add);
    Ok(GroupDetail {
        group: record,
        steps,
        total_time,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStore, RecordStore};
    use crate::{GroupDraft, StepDraft};

    fn seed(store: &mut MemoryStore, times: &[Option<u32>]) -> (GroupId, Vec<StepId>) {
        store
            .write(|t| {
                let group = GroupId(t.allocate_id(IdSequence::Group)?);
                t.put_group(&GroupDraft::new("Morning").into_group(group))?;
                let mut ids = Vec::new();
                for (i, time) in times.iter().enumerate() {
                    let id = StepId(t.allocate_id(IdSequence::Step)?);
                    let mut draft = StepDraft::new(format!("step {i}"));
                    draft.estimated_time = *time;
                    t.put_step(&draft.into_step(id))?;
                    ids.push(id);
                }
                Ok((group, ids))
            })
            .unwrap()
    }

    #[test]
    fn order_follows_input() {
        let mut store = MemoryStore::new();
        let (group, ids) = seed(&mut store, &[Some(5), Some(10), None]);
        let order = vec![ids[2], ids[0], ids[1]];

        store
            .write(|t| set_group_steps(t, group, &order))
            .unwrap();

        let rows = store.group_steps(group).unwrap();
        let read_back: Vec<StepId> = rows.iter().map(|r| r.step_id).collect();
        let positions: Vec<u32> = rows.iter().map(|r| r.step_order).collect();
        assert_eq!(read_back, order);
        assert_eq!(positions, vec![0, 1, 2]);
    }

    #[test]
    fn total_time_treats_unset_as_zero() {
        let mut store = MemoryStore::new();
        let (group, ids) = seed(&mut store, &[Some(5), None, Some(7)]);
        store.write(|t| set_group_steps(t, group, &ids)).unwrap();

        assert_eq!(group_total_time(&store, group).unwrap(), 12);
    }

    #[test]
    fn unknown_step_rejects_whole_write() {
        let mut store = MemoryStore::new();
        let (group, ids) = seed(&mut store, &[Some(1), Some(2)]);
        store
            .write(|t| set_group_steps(t, group, &ids[..1]))
            .unwrap();

        let result = store.write(|t| set_group_steps(t, group, &[ids[1], StepId(99)]));
        assert!(matches!(result, Err(RoutineError::StepNotFound(StepId(99)))));

        // Previous sequence intact
        let rows = store.group_steps(group).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].step_id, ids[0]);
    }

    #[test]
    fn repeated_step_is_a_conflict() {
        let mut store = MemoryStore::new();
        let (group, ids) = seed(&mut store, &[Some(1)]);

        let result = store.write(|t| set_group_steps(t, group, &[ids[0], ids[0]]));
        assert!(matches!(
            result,
            Err(RoutineError::DuplicateStepInGroup { .. })
        ));
        assert!(store.group_steps(group).unwrap().is_empty());
    }

    #[test]
    fn unknown_group_is_not_found() {
        let mut store = MemoryStore::new();
        let result = store.write(|t| set_group_steps(t, GroupId(4), &[]));
        assert!(matches!(result, Err(RoutineError::GroupNotFound(GroupId(4)))));
        assert!(matches!(
            group_total_time(&store, GroupId(4)),
            Err(RoutineError::GroupNotFound(_))
        ));
    }

    #[test]
    fn empty_list_clears_group() {
        let mut store = MemoryStore::new();
        let (group, ids) = seed(&mut store, &[Some(3), Some(4)]);
        store.write(|t| set_group_steps(t, group, &ids)).unwrap();
        store.write(|t| set_group_steps(t, group, &[])).unwrap();

        let detail = group_detail(&store, group).unwrap();
        assert!(detail.steps.is_empty());
        assert_eq!(detail.total_time, 0);
    }
}
