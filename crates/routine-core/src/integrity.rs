//! # Integrity Engine
//!
//! Rules shared by the entity store, the composition model and the assembly
//! model. Every function here runs inside the caller's transaction, so a
//! failed check aborts the whole operation.
//!
//! - Field validation (non-empty names, length limits)
//! - Name uniqueness per entity kind (exact, case-sensitive)
//! - Cascading removal of edges that reference a deleted step or group
//! - Polymorphic resolution of `ItemRef` against the step or group table

use crate::composition::steps_total_time;
use crate::primitives::{
    MAX_DESCRIPTION_LENGTH, MAX_ICON_LENGTH, MAX_NAME_LENGTH, MAX_ORDERED_ENTRIES,
    MAX_TAGS_LENGTH,
};
use crate::storage::{RecordRead, RecordWrite};
use crate::{
    EntityKind, GroupDraft, GroupId, ItemRef, ResolvedItem, RoutineError, StepDraft, StepId,
};

// =============================================================================
// FIELD VALIDATION
// =============================================================================

fn check_length(field: &'static str, value: Option<&str>, max: usize) -> Result<(), RoutineError> {
    match value {
        Some(text) if text.chars().count() > max => Err(RoutineError::FieldTooLong { field, max }),
        _ => Ok(()),
    }
}

/// Blank optional text is stored as absent.
fn clean_optional(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}

fn clean_name(kind: EntityKind, name: &str) -> Result<String, RoutineError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(RoutineError::EmptyName { kind });
    }
    check_length("name", Some(name), MAX_NAME_LENGTH)?;
    Ok(name.to_string())
}

/// Validate and normalize a step draft.
///
/// The name is trimmed; blank description, icon and tags become absent (a
/// missing icon later falls back to the default).
pub fn validate_step_draft(draft: StepDraft) -> Result<StepDraft, RoutineError> {
    let name = clean_name(EntityKind::Step, &draft.name)?;
    let description = clean_optional(draft.description);
    let icon = clean_optional(draft.icon).map(|icon| icon.trim().to_string());
    let tags = clean_optional(draft.tags);

    check_length("description", description.as_deref(), MAX_DESCRIPTION_LENGTH)?;
    check_length("icon", icon.as_deref(), MAX_ICON_LENGTH)?;
    check_length("tags", tags.as_deref(), MAX_TAGS_LENGTH)?;

    Ok(StepDraft {
        name,
        description,
        estimated_time: draft.estimated_time,
        icon,
        tags,
    })
}

/// Validate and normalize a group draft.
pub fn validate_group_draft(draft: GroupDraft) -> Result<GroupDraft, RoutineError> {
    let name = clean_name(EntityKind::Group, &draft.name)?;
    let description = clean_optional(draft.description);
    let icon = clean_optional(draft.icon).map(|icon| icon.trim().to_string());
    let tags = clean_optional(draft.tags);

    check_length("description", description.as_deref(), MAX_DESCRIPTION_LENGTH)?;
    check_length("icon", icon.as_deref(), MAX_ICON_LENGTH)?;
    check_length("tags", tags.as_deref(), MAX_TAGS_LENGTH)?;

    Ok(GroupDraft {
        name,
        description,
        icon,
        tags,
    })
}

/// Reject replace-all writes longer than the store accepts.
pub fn check_entry_count(len: usize) -> Result<(), RoutineError> {
    if len > MAX_ORDERED_ENTRIES {
        return Err(RoutineError::TooManyEntries {
            len,
            max: MAX_ORDERED_ENTRIES,
        });
    }
    Ok(())
}

/// Position of the `index`-th entry of a validated list.
pub(crate) fn position(index: usize) -> Result<u32, RoutineError> {
    u32::try_from(index).map_err(|_| RoutineError::TooManyEntries {
        len: index,
        max: MAX_ORDERED_ENTRIES,
    })
}

// =============================================================================
// UNIQUENESS
// =============================================================================

/// Fail if another step (other than `except`) already uses `name`.
pub fn ensure_unique_step_name<R: RecordRead + ?Sized>(
    tables: &R,
    name: &str,
    except: Option<StepId>,
) -> Result<(), RoutineError> {
    let taken = tables
        .steps()?
        .iter()
        .any(|step| step.name == name && Some(step.id) != except);
    if taken {
        return Err(RoutineError::DuplicateName {
            kind: EntityKind::Step,
            name: name.to_string(),
        });
    }
    Ok(())
}

/// Fail if another group (other than `except`) already uses `name`.
pub fn ensure_unique_group_name<R: RecordRead + ?Sized>(
    tables: &R,
    name: &str,
    except: Option<GroupId>,
) -> Result<(), RoutineError> {
    let taken = tables
        .groups()?
        .iter()
        .any(|group| group.name == name && Some(group.id) != except);
    if taken {
        return Err(RoutineError::DuplicateName {
            kind: EntityKind::Group,
            name: name.to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// CASCADES
// =============================================================================

/// Counts of dependent rows removed by a cascade.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CascadeCounts {
    pub group_steps: usize,
    pub system_items: usize,
}

/// Remove every edge that references a step: its slots in all groups and
/// all systems. The step record itself is left to the caller.
pub fn cascade_step<W: RecordWrite + ?Sized>(
    tables: &mut W,
    id: StepId,
) -> Result<CascadeCounts, RoutineError> {
    let group_steps = tables.remove_group_steps_for(id)?;
    let system_items = tables.remove_system_items_for(ItemRef::Step(id))?;
    Ok(CascadeCounts {
        group_steps,
        system_items,
    })
}

/// Remove a group's own step edges and every system slot referencing it.
pub fn cascade_group<W: RecordWrite + ?Sized>(
    tables: &mut W,
    id: GroupId,
) -> Result<CascadeCounts, RoutineError> {
    let group_steps = tables.clear_group_steps(id)?;
    let system_items = tables.remove_system_items_for(ItemRef::Group(id))?;
    Ok(CascadeCounts {
        group_steps,
        system_items,
    })
}

// =============================================================================
// POLYMORPHIC RESOLUTION
// =============================================================================

/// Check that a reference points at an existing record.
pub fn item_exists<R: RecordRead + ?Sized>(
    tables: &R,
    item: ItemRef,
) -> Result<bool, RoutineError> {
    match item {
        ItemRef::Step(id) => Ok(tables.step(id)?.is_some()),
        ItemRef::Group(id) => Ok(tables.group(id)?.is_some()),
    }
}

/// Resolve a reference to its current name, icon and time.
///
/// Returns `None` when the target no longer exists.
pub fn resolve_item<R: RecordRead + ?Sized>(
    tables: &R,
    item: ItemRef,
) -> Result<Option<ResolvedItem>, RoutineError> {
    match item {
        ItemRef::Step(id) => Ok(tables.step(id)?.map(|step| ResolvedItem {
            kind: EntityKind::Step,
            id: id.0,
            time: step.time(),
            name: step.name,
            icon: step.icon,
        })),
        ItemRef::Group(id) => {
            let Some(group) = tables.group(id)? else {
                return Ok(None);
            };
            let time = steps_total_time(tables, id)?;
            Ok(Some(ResolvedItem {
                kind: EntityKind::Group,
                id: id.0,
                name: group.name,
                icon: group.icon,
                time,
            }))
        }
    }
}
