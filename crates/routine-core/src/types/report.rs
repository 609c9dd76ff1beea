//! Read-side views and write reports returned by the store.

use super::{EntityKind, Group, ItemRef, Step, SystemName};
use serde::Serialize;
use std::fmt;

/// A system slot resolved against its current target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedItem {
    #[serde(rename = "type")]
    pub kind: EntityKind,
    pub id: u64,
    pub name: String,
    pub icon: String,
    /// Minutes: a step's estimate, or a group's current total.
    pub time: u64,
}

impl ResolvedItem {
    /// The reference this item was resolved from.
    #[must_use]
    pub fn item_ref(&self) -> ItemRef {
        match self.kind {
            EntityKind::Step => ItemRef::Step(super::StepId(self.id)),
            EntityKind::Group => ItemRef::Group(super::GroupId(self.id)),
        }
    }
}

/// A reference-resolution warning: a system entry that was left out because
/// its target does not exist.
///
/// Non-fatal. Writes skip the entry and carry on; reads omit it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SkippedRef {
    /// Position in the submitted list (writes) or stored order (reads).
    pub position: u32,
    pub item: ItemRef,
}

impl fmt::Display for SkippedRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "skipped {} at position {}: target does not exist",
            self.item, self.position
        )
    }
}

/// Outcome of replacing a system's items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssemblyReport {
    pub system: SystemName,
    pub stored: usize,
    pub skipped: Vec<SkippedRef>,
}

/// A system's items in order, with orphaned entries left out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedSystem {
    pub system: SystemName,
    pub items: Vec<ResolvedItem>,
    pub skipped: Vec<SkippedRef>,
    pub total_time: u64,
}

/// A group with its steps in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupDetail {
    pub group: Group,
    pub steps: Vec<Step>,
    pub total_time: u64,
}

/// What a cascading delete removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Deleted {
    pub kind: EntityKind,
    pub id: u64,
    pub name: String,
    pub group_steps_removed: usize,
    pub system_items_removed: usize,
}

/// Per-system line of the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SystemSummary {
    pub system: SystemName,
    /// Stored slots, including any whose target has since gone.
    pub item_count: usize,
    pub total_time: u64,
}

/// Overview of every system plus library sizes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dashboard {
    pub systems: Vec<SystemSummary>,
    pub step_count: usize,
    pub group_count: usize,
}
