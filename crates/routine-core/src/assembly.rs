//! # System Assembly Model
//!
//! Each system holds an ordered list of slots referencing steps or groups.
//!
//! Writes are replace-all and tolerant: references whose target does not
//! exist are skipped and reported, and the remaining entries are stored with
//! contiguous positions starting at 0. Reads are tolerant too: slots whose
//! target has since been deleted are left out and reported.

use crate::composition::steps_total_time;
use crate::integrity::{check_entry_count, item_exists, position, resolve_item};
use crate::storage::{IdSequence, RecordRead, RecordWrite};
use crate::{
    AssemblyReport, Dashboard, ItemRef, ResolvedSystem, RoutineError, SkippedRef, SystemItem,
    SystemName, SystemSummary,
};

/// The fixed systems, in display order.
#[must_use]
pub fn system_names() -> &'static [SystemName] {
    &SystemName::ALL
}

/// Replace a system's slots with `items`, skipping unresolvable references.
pub fn set_system_items<W: RecordWrite + ?Sized>(
    tables: &mut W,
    system: SystemName,
    items: &[ItemRef],
) -> Result<AssemblyReport, RoutineError> {
    check_entry_count(items.len())?;
    tables.clear_system_items(system)?;

    let mut stored = 0usize;
    let mut skipped = Vec::new();
    for (index, &item) in items.iter().enumerate() {
        if !item_exists(tables, item)? {
            skipped.push(SkippedRef {
                position: position(index)?,
                item,
            });
            continue;
        }
        let row = SystemItem {
            id: tables.allocate_id(IdSequence::SystemItem)?,
            system,
            item,
            item_order: position(stored)?,
        };
        tables.insert_system_item(&row)?;
        stored += 1;
    }

    Ok(AssemblyReport {
        system,
        stored,
        skipped,
    })
}

/// A system's slots resolved in order, orphans left out and reported.
pub fn resolve_system<R: RecordRead + ?Sized>(
    tables: &R,
    system: SystemName,
) -> Result<ResolvedSystem, RoutineError> {
    let mut items = Vec::new();
    let mut skipped = Vec::new();
    for row in tables.system_items(system)? {
        match resolve_item(tables, row.item)? {
            Some(resolved) => items.push(resolved),
            None => skipped.push(SkippedRef {
                position: row.item_order,
                item: row.item,
            }),
        }
    }
    let total_time = items
        .iter()
        .map(|item| item.time)
        .fold(0u64, u64::saturating_add);
    Ok(ResolvedSystem {
        system,
        items,
        skipped,
        total_time,
    })
}

/// Total minutes of a system: step estimates plus group totals, computed
/// from current data. Orphaned slots contribute nothing.
pub fn system_total_time<R: RecordRead + ?Sized>(
    tables: &R,
    system: SystemName,
) -> Result<u64, RoutineError> {
    let mut total = 0u64;
    for row in tables.system_items(system)? {
        let time = match row.item {
            ItemRef::Step(id) => tables.step(id)?.map_or(0, |step| step.time()),
            ItemRef::Group(id) => match tables.group(id)? {
                Some(_) => steps_total_time(tables, id)?,
                None => 0,
            },
        };
        total = total.saturating_add(time);
    }
    Ok(total)
}

/// Per-system slot counts and totals, plus library sizes.
pub fn dashboard<R: RecordRead + ?Sized>(tables: &R) -> Result<Dashboard, RoutineError> {
    let mut systems = Vec::with_capacity(SystemName::ALL.len());
    for &system in system_names() {
        systems.push(SystemSummary {
            system,
            item_count: tables.system_items(system)?.len(),
            total_time: system_total_time(tables, system)?,
        });
    }
    Ok(Dashboard {
        systems,
        step_count: tables.step_count()?,
        group_count: tables.group_count()?,
    })
}
