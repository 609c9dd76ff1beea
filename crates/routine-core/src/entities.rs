//! # Entity Store
//!
//! Create, update, delete and list for steps and groups.
//!
//! Deletes cascade through the integrity engine before the record itself is
//! removed, all within the caller's transaction.

use crate::composition::{group_detail, set_group_steps};
use crate::integrity::{
    cascade_group, cascade_step, ensure_unique_group_name, ensure_unique_step_name,
    validate_group_draft, validate_step_draft,
};
use crate::storage::{IdSequence, RecordRead, RecordWrite};
use crate::{
    Deleted, EntityKind, Group, GroupDetail, GroupDraft, GroupId, RoutineError, Step, StepDraft,
    StepId,
};

// =============================================================================
// STEPS
// =============================================================================

/// Create a step from a draft.
pub fn create_step<W: RecordWrite + ?Sized>(
    tables: &mut W,
    draft: StepDraft,
) -> Result<Step, RoutineError> {
    let draft = validate_step_draft(draft)?;
    ensure_unique_step_name(tables, &draft.name, None)?;

    let id = StepId(tables.allocate_id(IdSequence::Step)?);
    let step = draft.into_step(id);
    tables.put_step(&step)?;
    Ok(step)
}

/// Replace a step's editable fields. Its id and group/system memberships
/// are unchanged.
pub fn update_step<W: RecordWrite + ?Sized>(
    tables: &mut W,
    id: StepId,
    draft: StepDraft,
) -> Result<Step, RoutineError> {
    if tables.step(id)?.is_none() {
        return Err(RoutineError::StepNotFound(id));
    }
    let draft = validate_step_draft(draft)?;
    ensure_unique_step_name(tables, &draft.name, Some(id))?;

    let step = draft.into_step(id);
    tables.put_step(&step)?;
    Ok(step)
}

/// Delete a step along with every group and system slot that references it.
pub fn delete_step<W: RecordWrite + ?Sized>(
    tables: &mut W,
    id: StepId,
) -> Result<Deleted, RoutineError> {
    let step = tables.step(id)?.ok_or(RoutineError::StepNotFound(id))?;
    let cascade = cascade_step(tables, id)?;
    tables.remove_step(id)?;
    Ok(Deleted {
        kind: EntityKind::Step,
        id: id.0,
        name: step.name,
        group_steps_removed: cascade.group_steps,
        system_items_removed: cascade.system_items,
    })
}

pub fn get_step<R: RecordRead + ?Sized>(tables: &R, id: StepId) -> Result<Step, RoutineError> {
    tables.step(id)?.ok_or(RoutineError::StepNotFound(id))
}

/// All steps ordered by name (ties broken by id).
pub fn list_steps<R: RecordRead + ?Sized>(tables: &R) -> Result<Vec<Step>, RoutineError> {
    let mut steps = tables.steps()?;
    steps.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
    Ok(steps)
}

// =============================================================================
// GROUPS
// =============================================================================

/// Create an empty group from a draft.
pub fn create_group<W: RecordWrite + ?Sized>(
    tables: &mut W,
    draft: GroupDraft,
) -> Result<Group, RoutineError> {
    let draft = validate_group_draft(draft)?;
    ensure_unique_group_name(tables, &draft.name, None)?;

    let id = GroupId(tables.allocate_id(IdSequence::Group)?);
    let group = draft.into_group(id);
    tables.put_group(&group)?;
    Ok(group)
}

/// Create a group and give it its initial step sequence as one write.
pub fn create_group_with_steps<W: RecordWrite + ?Sized>(
    tables: &mut W,
    draft: GroupDraft,
    steps: &[StepId],
) -> Result<GroupDetail, RoutineError> {
    let group = create_group(tables, draft)?;
    set_group_steps(tables, group.id, steps)?;
    group_detail(tables, group.id)
}

/// Replace a group's editable fields, leaving its step sequence alone.
pub fn update_group<W: RecordWrite + ?Sized>(
    tables: &mut W,
    id: GroupId,
    draft: GroupDraft,
) -> Result<Group, RoutineError> {
    if tables.group(id)?.is_none() {
        return Err(RoutineError::GroupNotFound(id));
    }
    let draft = validate_group_draft(draft)?;
    ensure_unique_group_name(tables, &draft.name, Some(id))?;

    let group = draft.into_group(id);
    tables.put_group(&group)?;
    Ok(group)
}

/// Update a group's fields and replace its step sequence as one write.
///
/// Fails without changes if either part fails.
pub fn update_group_with_steps<W: RecordWrite + ?Sized>(
    tables: &mut W,
    id: GroupId,
    draft: GroupDraft,
    steps: &[StepId],
) -> Result<GroupDetail, RoutineError> {
    update_group(tables, id, draft)?;
    set_group_steps(tables, id, steps)?;
    group_detail(tables, id)
}

/// Delete a group, its step edges, and every system slot that references it.
/// The steps themselves are kept.
pub fn delete_group<W: RecordWrite + ?Sized>(
    tables: &mut W,
    id: GroupId,
) -> Result<Deleted, RoutineError> {
    let group = tables.group(id)?.ok_or(RoutineError::GroupNotFound(id))?;
    let cascade = cascade_group(tables, id)?;
    tables.remove_group(id)?;
    Ok(Deleted {
        kind: EntityKind::Group,
        id: id.0,
        name: group.name,
        group_steps_removed: cascade.group_steps,
        system_items_removed: cascade.system_items,
    })
}

pub fn get_group<R: RecordRead + ?Sized>(tables: &R, id: GroupId) -> Result<Group, RoutineError> {
    tables.group(id)?.ok_or(RoutineError::GroupNotFound(id))
}

/// All groups ordered by name (ties broken by id).
pub fn list_groups<R: RecordRead + ?Sized>(tables: &R) -> Result<Vec<Group>, RoutineError> {
    let mut groups = tables.groups()?;
    groups.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
    Ok(groups)
}
