//! # CLI Command Implementations
//!
//! Each command opens the configured store, runs one core operation, saves
//! (file backend only) and prints the result as text or JSON.

use crate::config::{Backend, Settings};
use crate::error::AppError;
use routine_core::{
    GroupDraft, GroupId, ItemRef, ResolvedSystem, Session, Step, StepDraft, StepId, SystemName,
    assembly, formats::MAX_PERSISTENCE_PAYLOAD_SIZE, store_from_bytes, store_to_bytes,
};
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

use super::{GroupFields, StepFields};

// =============================================================================
// OUTPUT HELPERS
// =============================================================================

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).unwrap_or_default()
    );
}

fn optional(text: Option<&str>) -> &str {
    text.unwrap_or("-")
}

fn tags(list: &[&str]) -> String {
    if list.is_empty() {
        "-".to_string()
    } else {
        list.join(", ")
    }
}

fn minutes(total: u64) -> String {
    format!("{} min", total)
}

fn step_draft(fields: StepFields) -> StepDraft {
    StepDraft {
        name: fields.name,
        description: fields.description,
        estimated_time: fields.estimated_time,
        icon: fields.icon,
        tags: fields.tags,
    }
}

fn group_draft(fields: GroupFields) -> GroupDraft {
    GroupDraft {
        name: fields.name,
        description: fields.description,
        icon: fields.icon,
        tags: fields.tags,
    }
}

fn step_ids(ids: &[u64]) -> Vec<StepId> {
    ids.iter().copied().map(StepId).collect()
}

fn print_step_line(step: &Step) {
    let time = step
        .estimated_time
        .map_or_else(|| "-".to_string(), |m| minutes(u64::from(m)));
    println!(
        "  {:>4}  {} {:<30} {:>8}  {}",
        step.id,
        step.icon,
        step.name,
        time,
        tags(&step.tag_list())
    );
}

fn print_resolved_system(resolved: &ResolvedSystem) {
    println!("{} ({})", resolved.system, minutes(resolved.total_time));
    println!("{}", "=".repeat(resolved.system.as_str().len() + 12));
    if resolved.items.is_empty() {
        println!("  (empty)");
    }
    for (position, item) in resolved.items.iter().enumerate() {
        println!(
            "  {:>3}. {} {:<30} {:>8}  [{}]",
            position + 1,
            item.icon,
            item.name,
            minutes(item.time),
            item.item_ref()
        );
    }
    for skipped in &resolved.skipped {
        println!("  ! {}", skipped);
    }
}

// =============================================================================
// INIT COMMAND
// =============================================================================

/// Initialize new database.
pub fn cmd_init(settings: &Settings, force: bool) -> Result<(), AppError> {
    let db_path = &settings.database;
    if db_path.exists() {
        if !force {
            return Err(AppError::DatabaseExists(db_path.clone()));
        }
        std::fs::remove_file(db_path).map_err(AppError::io("Cannot remove database", db_path))?;
        tracing::warn!(database = %db_path.display(), "existing database removed");
    }

    match settings.backend {
        Backend::Redb => {
            let _session = Session::with_redb(db_path)?;
        }
        Backend::File => save_session(&Session::new(), db_path)?,
    }
    tracing::info!(database = %db_path.display(), backend = %settings.backend, "initialized");
    println!(
        "Initialized new {} database at {}",
        settings.backend,
        db_path.display()
    );
    Ok(())
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Show the dashboard.
pub fn cmd_status(settings: &Settings, json_mode: bool) -> Result<(), AppError> {
    let session = load_or_create_session(settings)?;
    let dashboard = session.dashboard()?;

    if json_mode {
        print_json(&dashboard);
        return Ok(());
    }

    println!("Routine Status");
    println!("==============");
    println!("Database: {}", settings.database.display());
    println!("Backend:  {}", settings.backend);
    println!();
    for summary in &dashboard.systems {
        println!(
            "  {:<10} {:>3} items  {:>9}",
            summary.system,
            summary.item_count,
            minutes(summary.total_time)
        );
    }
    println!();
    println!("Steps:  {}", dashboard.step_count);
    println!("Groups: {}", dashboard.group_count);
    Ok(())
}

// =============================================================================
// STEP COMMANDS
// =============================================================================

pub fn cmd_steps_list(settings: &Settings, json_mode: bool) -> Result<(), AppError> {
    let session = load_or_create_session(settings)?;
    let steps = session.list_steps()?;

    if json_mode {
        print_json(&steps);
        return Ok(());
    }
    if steps.is_empty() {
        println!("No steps yet. Add one with `routine steps add <name>`.");
        return Ok(());
    }
    println!("Steps");
    println!("=====");
    for step in &steps {
        print_step_line(step);
    }
    Ok(())
}

pub fn cmd_steps_add(
    settings: &Settings,
    json_mode: bool,
    fields: StepFields,
) -> Result<(), AppError> {
    let mut session = load_or_create_session(settings)?;
    let step = session.create_step(step_draft(fields))?;
    save_session(&session, &settings.database)?;
    tracing::info!(id = step.id.0, name = %step.name, "step created");

    if json_mode {
        print_json(&step);
    } else {
        println!("Step \"{}\" created with id {}.", step.name, step.id);
    }
    Ok(())
}

pub fn cmd_steps_edit(
    settings: &Settings,
    json_mode: bool,
    id: u64,
    fields: StepFields,
) -> Result<(), AppError> {
    let mut session = load_or_create_session(settings)?;
    let step = session.update_step(StepId(id), step_draft(fields))?;
    save_session(&session, &settings.database)?;
    tracing::info!(id, name = %step.name, "step updated");

    if json_mode {
        print_json(&step);
    } else {
        println!("Step \"{}\" updated.", step.name);
    }
    Ok(())
}

pub fn cmd_steps_rm(settings: &Settings, json_mode: bool, id: u64) -> Result<(), AppError> {
    let mut session = load_or_create_session(settings)?;
    let deleted = session.delete_step(StepId(id))?;
    save_session(&session, &settings.database)?;
    tracing::info!(
        id,
        group_steps = deleted.group_steps_removed,
        system_items = deleted.system_items_removed,
        "step deleted"
    );

    if json_mode {
        print_json(&deleted);
    } else {
        println!(
            "Step \"{}\" deleted (removed from {} group positions and {} system items).",
            deleted.name, deleted.group_steps_removed, deleted.system_items_removed
        );
    }
    Ok(())
}

// =============================================================================
// GROUP COMMANDS
// =============================================================================

pub fn cmd_groups_list(settings: &Settings, json_mode: bool) -> Result<(), AppError> {
    let session = load_or_create_session(settings)?;
    let groups = session.list_groups()?;

    let mut rows = Vec::with_capacity(groups.len());
    for group in groups {
        let total_time = session.group_total_time(group.id)?;
        rows.push((group, total_time));
    }

    if json_mode {
        let output: Vec<_> = rows
            .iter()
            .map(|(group, total_time)| {
                serde_json::json!({
                    "id": group.id,
                    "name": group.name,
                    "description": group.description,
                    "icon": group.icon,
                    "tags": group.tags,
                    "total_time": total_time
                })
            })
            .collect();
        print_json(&output);
        return Ok(());
    }
    if rows.is_empty() {
        println!("No groups yet. Add one with `routine groups add <name>`.");
        return Ok(());
    }
    println!("Groups");
    println!("======");
    for (group, total_time) in &rows {
        println!(
            "  {:>4}  {} {:<30} {:>8}  {}",
            group.id,
            group.icon,
            group.name,
            minutes(*total_time),
            tags(&group.tag_list())
        );
    }
    Ok(())
}

pub fn cmd_groups_add(
    settings: &Settings,
    json_mode: bool,
    fields: GroupFields,
    steps: &[u64],
) -> Result<(), AppError> {
    let mut session = load_or_create_session(settings)?;
    let detail = session.create_group_with_steps(group_draft(fields), &step_ids(steps))?;
    save_session(&session, &settings.database)?;
    tracing::info!(
        id = detail.group.id.0,
        name = %detail.group.name,
        steps = detail.steps.len(),
        "group created"
    );

    if json_mode {
        print_json(&detail);
    } else {
        println!(
            "Group \"{}\" created with id {} ({} steps, {}).",
            detail.group.name,
            detail.group.id,
            detail.steps.len(),
            minutes(detail.total_time)
        );
    }
    Ok(())
}

pub fn cmd_groups_edit(
    settings: &Settings,
    json_mode: bool,
    id: u64,
    fields: GroupFields,
    steps: Option<&[u64]>,
) -> Result<(), AppError> {
    let mut session = load_or_create_session(settings)?;
    let id = GroupId(id);
    let detail = match steps {
        Some(steps) => session.update_group_with_steps(id, group_draft(fields), &step_ids(steps))?,
        None => {
            session.update_group(id, group_draft(fields))?;
            session.group_with_steps(id)?
        }
    };
    save_session(&session, &settings.database)?;
    tracing::info!(id = id.0, name = %detail.group.name, "group updated");

    if json_mode {
        print_json(&detail);
    } else {
        println!("Group \"{}\" updated.", detail.group.name);
    }
    Ok(())
}

pub fn cmd_groups_show(settings: &Settings, json_mode: bool, id: u64) -> Result<(), AppError> {
    let session = load_or_create_session(settings)?;
    let detail = session.group_with_steps(GroupId(id))?;

    if json_mode {
        print_json(&detail);
        return Ok(());
    }
    let group = &detail.group;
    println!("{} {} ({})", group.icon, group.name, minutes(detail.total_time));
    println!("Description: {}", optional(group.description.as_deref()));
    println!("Tags:        {}", tags(&group.tag_list()));
    println!();
    if detail.steps.is_empty() {
        println!("  (no steps)");
    }
    for step in &detail.steps {
        print_step_line(step);
    }
    Ok(())
}

pub fn cmd_groups_rm(settings: &Settings, json_mode: bool, id: u64) -> Result<(), AppError> {
    let mut session = load_or_create_session(settings)?;
    let deleted = session.delete_group(GroupId(id))?;
    save_session(&session, &settings.database)?;
    tracing::info!(
        id,
        group_steps = deleted.group_steps_removed,
        system_items = deleted.system_items_removed,
        "group deleted"
    );

    if json_mode {
        print_json(&deleted);
    } else {
        println!(
            "Group \"{}\" deleted (removed from {} system items).",
            deleted.name, deleted.system_items_removed
        );
    }
    Ok(())
}

// =============================================================================
// SYSTEM COMMANDS
// =============================================================================

pub fn cmd_system_list(json_mode: bool) -> Result<(), AppError> {
    let names = assembly::system_names();
    if json_mode {
        print_json(&names);
        return Ok(());
    }
    for name in names {
        println!("{}", name);
    }
    Ok(())
}

pub fn cmd_system_show(
    settings: &Settings,
    json_mode: bool,
    name: &str,
) -> Result<(), AppError> {
    let system: SystemName = name.parse()?;
    let session = load_or_create_session(settings)?;
    let resolved = session.system_items(system)?;
    for skipped in &resolved.skipped {
        tracing::warn!(system = %system, "{}", skipped);
    }

    if json_mode {
        print_json(&resolved);
    } else {
        print_resolved_system(&resolved);
    }
    Ok(())
}

/// Replace a system's items.
///
/// The name and every item identifier are parsed before the store is opened,
/// so a bad argument writes nothing.
pub fn cmd_system_set(
    settings: &Settings,
    json_mode: bool,
    name: &str,
    items: &[String],
) -> Result<(), AppError> {
    let system: SystemName = name.parse()?;
    let refs = items
        .iter()
        .map(|item| item.parse::<ItemRef>())
        .collect::<Result<Vec<_>, _>>()?;

    let mut session = load_or_create_session(settings)?;
    let report = session.set_system_items(system, &refs)?;
    save_session(&session, &settings.database)?;

    for skipped in &report.skipped {
        tracing::warn!(system = %system, "{}", skipped);
    }
    tracing::info!(
        system = %system,
        stored = report.stored,
        skipped = report.skipped.len(),
        "system updated"
    );

    if json_mode {
        print_json(&report);
    } else {
        println!(
            "System \"{}\" updated: {} items stored, {} skipped.",
            system,
            report.stored,
            report.skipped.len()
        );
    }
    Ok(())
}

// =============================================================================
// COMPACT COMMAND
// =============================================================================

/// Reclaim unused space: redb compacts in place, the file backend rewrites
/// its snapshot.
pub fn cmd_compact(settings: &Settings, json_mode: bool) -> Result<(), AppError> {
    let mut session = load_or_create_session(settings)?;
    session.compact()?;
    save_session(&session, &settings.database)?;
    let bytes = std::fs::metadata(&settings.database)
        .map_err(AppError::io("Cannot read database", &settings.database))?
        .len();
    tracing::info!(database = %settings.database.display(), bytes, "database compacted");

    if json_mode {
        print_json(&serde_json::json!({
            "database": settings.database.display().to_string(),
            "backend": settings.backend.as_str(),
            "bytes": bytes
        }));
    } else {
        println!("Compacted {} ({} bytes).", settings.database.display(), bytes);
    }
    Ok(())
}

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Load or create a session for the configured backend.
pub fn load_or_create_session(settings: &Settings) -> Result<Session, AppError> {
    let db_path = &settings.database;
    match settings.backend {
        Backend::Redb => Session::with_redb(db_path).map_err(AppError::from),
        Backend::File => {
            if !db_path.exists() {
                return Ok(Session::new());
            }
            let metadata =
                std::fs::metadata(db_path).map_err(AppError::io("Cannot read database", db_path))?;
            if metadata.len() > MAX_PERSISTENCE_PAYLOAD_SIZE as u64 {
                return Err(AppError::DatabaseTooLarge {
                    size: metadata.len(),
                    max: MAX_PERSISTENCE_PAYLOAD_SIZE as u64,
                });
            }
            let data =
                std::fs::read(db_path).map_err(AppError::io("Cannot read database", db_path))?;
            Ok(Session::with_store(store_from_bytes(&data)?))
        }
    }
}

/// Save a session to a database path.
///
/// A redb session is already durable; an in-memory one is written out as a
/// snapshot. The snapshot goes to a temporary file next to `db_path` that is
/// then renamed over it, so the previous snapshot stays intact until the new
/// one is complete.
pub fn save_session(session: &Session, db_path: &Path) -> Result<(), AppError> {
    let Some(store) = session.memory_store() else {
        return Ok(());
    };
    let data = store_to_bytes(store)?;

    let dir = match db_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file =
        NamedTempFile::new_in(dir).map_err(AppError::io("Cannot create snapshot in", dir))?;
    file.write_all(&data)
        .map_err(AppError::io("Cannot write snapshot", file.path()))?;
    file.as_file()
        .sync_all()
        .map_err(AppError::io("Cannot write snapshot", file.path()))?;
    file.persist(db_path)
        .map_err(|e| AppError::io("Cannot replace database", db_path)(e.error))?;

    tracing::debug!(database = %db_path.display(), bytes = data.len(), "snapshot written");
    Ok(())
}
