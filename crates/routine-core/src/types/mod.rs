//! # Core Type Definitions
//!
//! This module contains all record types for the Routine store:
//! - Identifiers (`StepId`, `GroupId`)
//! - Entity records (`Step`, `Group`) and their input drafts
//! - Edge records (`GroupStep`, `SystemItem`)
//! - The fixed system list (`SystemName`) and polymorphic references (`ItemRef`)
//! - Error types (`RoutineError`)
//!
//! Read-side reports (resolved items, totals, cascade counts) live in
//! [`report`].

mod report;

pub use report::*;

use crate::primitives::{DEFAULT_GROUP_ICON, DEFAULT_STEP_ICON};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Unique identifier for a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StepId(pub u64);

/// Unique identifier for a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupId(pub u64);

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The two kinds of named entity a system can reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Step,
    Group,
}

impl EntityKind {
    /// The persisted type tag (`"step"` or `"group"`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Step => "step",
            Self::Group => "group",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// ENTITY RECORDS
// =============================================================================

/// An atomic task with an optional estimated duration in minutes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub id: StepId,
    pub name: String,
    pub description: Option<String>,
    pub estimated_time: Option<u32>,
    pub icon: String,
    pub tags: Option<String>,
}

impl Step {
    /// Estimated minutes, with an unset estimate counting as zero.
    #[must_use]
    pub fn time(&self) -> u64 {
        self.estimated_time.map_or(0, u64::from)
    }

    /// Tags split on commas, trimmed, empties dropped.
    #[must_use]
    pub fn tag_list(&self) -> Vec<&str> {
        split_tags(self.tags.as_deref())
    }
}

/// A named, ordered collection of steps.
///
/// The step sequence itself is stored as [`GroupStep`] edges, not on the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub description: Option<String>,
    pub icon: String,
    pub tags: Option<String>,
}

impl Group {
    /// Tags split on commas, trimmed, empties dropped.
    #[must_use]
    pub fn tag_list(&self) -> Vec<&str> {
        split_tags(self.tags.as_deref())
    }
}

fn split_tags(tags: Option<&str>) -> Vec<&str> {
    tags.map(|t| {
        t.split(',')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .collect()
    })
    .unwrap_or_default()
}

// =============================================================================
// DRAFTS (create / update input)
// =============================================================================

/// The editable fields of a step, used for both create and update.
///
/// Update is a full replacement of these fields, matching the edit form the
/// records are managed through.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDraft {
    pub name: String,
    pub description: Option<String>,
    pub estimated_time: Option<u32>,
    pub icon: Option<String>,
    pub tags: Option<String>,
}

impl StepDraft {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn estimated_time(mut self, minutes: u32) -> Self {
        self.estimated_time = Some(minutes);
        self
    }

    #[must_use]
    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    #[must_use]
    pub fn tags(mut self, tags: impl Into<String>) -> Self {
        self.tags = Some(tags.into());
        self
    }

    /// Build the record this draft describes, applying the default icon.
    pub(crate) fn into_step(self, id: StepId) -> Step {
        Step {
            id,
            name: self.name,
            description: self.description,
            estimated_time: self.estimated_time,
            icon: self.icon.unwrap_or_else(|| DEFAULT_STEP_ICON.to_string()),
            tags: self.tags,
        }
    }
}

/// The editable fields of a group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupDraft {
    pub name: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub tags: Option<String>,
}

impl GroupDraft {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    #[must_use]
    pub fn tags(mut self, tags: impl Into<String>) -> Self {
        self.tags = Some(tags.into());
        self
    }

    pub(crate) fn into_group(self, id: GroupId) -> Group {
        Group {
            id,
            name: self.name,
            description: self.description,
            icon: self.icon.unwrap_or_else(|| DEFAULT_GROUP_ICON.to_string()),
            tags: self.tags,
        }
    }
}

// =============================================================================
// SYSTEMS
// =============================================================================

/// One of the fixed recurring schedules.
///
/// The set is closed: it is compiled in and never configurable at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SystemName {
    Daily,
    Saturday,
    Sunday,
    Weekly,
    Monthly,
}

impl SystemName {
    /// Every system, in display order.
    pub const ALL: [Self; 5] = [
        Self::Daily,
        Self::Saturday,
        Self::Sunday,
        Self::Weekly,
        Self::Monthly,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "Daily",
            Self::Saturday => "Saturday",
            Self::Sunday => "Sunday",
            Self::Weekly => "Weekly",
            Self::Monthly => "Monthly",
        }
    }

    /// Stable one-byte code used as the leading part of storage keys.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Daily => 0,
            Self::Saturday => 1,
            Self::Sunday => 2,
            Self::Weekly => 3,
            Self::Monthly => 4,
        }
    }
}

impl fmt::Display for SystemName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SystemName {
    type Err = RoutineError;

    /// Exact, case-sensitive match against the fixed list.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|system| system.as_str() == s)
            .ok_or_else(|| RoutineError::InvalidSystemName(s.to_string()))
    }
}

// =============================================================================
// POLYMORPHIC REFERENCE
// =============================================================================

/// A reference from a system slot to either a step or a group.
///
/// Textual form is `"<type>-<id>"`, e.g. `step-5` or `group-2`. Serialized
/// in that form too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum ItemRef {
    Step(StepId),
    Group(GroupId),
}

impl ItemRef {
    #[must_use]
    pub const fn kind(self) -> EntityKind {
        match self {
            Self::Step(_) => EntityKind::Step,
            Self::Group(_) => EntityKind::Group,
        }
    }

    /// The referenced id without its type tag.
    #[must_use]
    pub const fn raw_id(self) -> u64 {
        match self {
            Self::Step(id) => id.0,
            Self::Group(id) => id.0,
        }
    }
}

impl From<StepId> for ItemRef {
    fn from(id: StepId) -> Self {
        Self::Step(id)
    }
}

impl From<GroupId> for ItemRef {
    fn from(id: GroupId) -> Self {
        Self::Group(id)
    }
}

impl fmt::Display for ItemRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.kind(), self.raw_id())
    }
}

impl FromStr for ItemRef {
    type Err = RoutineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || RoutineError::InvalidItemRef(s.to_string());
        let (kind, id) = s.trim().split_once('-').ok_or_else(invalid)?;
        let id: u64 = id.parse().map_err(|_| invalid())?;
        match kind {
            "step" => Ok(Self::Step(StepId(id))),
            "group" => Ok(Self::Group(GroupId(id))),
            _ => Err(invalid()),
        }
    }
}

impl From<ItemRef> for String {
    fn from(item: ItemRef) -> Self {
        item.to_string()
    }
}

impl TryFrom<String> for ItemRef {
    type Error = RoutineError;

    fn try_from(text: String) -> Result<Self, Self::Error> {
        text.parse()
    }
}

// =============================================================================
// EDGE RECORDS
// =============================================================================

/// Composition edge: one position in a group's step sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupStep {
    pub id: u64,
    pub group_id: GroupId,
    pub step_id: StepId,
    pub step_order: u32,
}

/// Assembly edge: one position in a system's item sequence.
///
/// `item` is not a foreign key. Its target may disappear between writes and
/// reads must tolerate that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemItem {
    pub id: u64,
    pub system: SystemName,
    pub item: ItemRef,
    pub item_order: u32,
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the Routine store.
///
/// Every variant leaves the store exactly as it was before the failed call.
/// Skipped system references are not errors; see [`SkippedRef`].
#[derive(Debug, Error)]
pub enum RoutineError {
    /// A required name was blank.
    #[error("{kind} name is required")]
    EmptyName { kind: EntityKind },

    /// Another record of the same kind already uses this name.
    #[error("{kind} \"{name}\" already exists")]
    DuplicateName { kind: EntityKind, name: String },

    #[error("Step not found: {0}")]
    StepNotFound(StepId),

    #[error("Group not found: {0}")]
    GroupNotFound(GroupId),

    /// The name is not one of the fixed systems.
    #[error("Invalid system name: \"{0}\"")]
    InvalidSystemName(String),

    /// The same step was listed twice for one group.
    #[error("Step {step} appears more than once in group {group}")]
    DuplicateStepInGroup { group: GroupId, step: StepId },

    /// A text field exceeded its maximum length (in characters).
    #[error("{field} exceeds {max} characters")]
    FieldTooLong { field: &'static str, max: usize },

    /// An ordered list was longer than the store accepts in one write.
    #[error("Too many entries: {len} (maximum {max})")]
    TooManyEntries { len: usize, max: usize },

    /// A `type-id` item identifier could not be parsed.
    #[error("Invalid item reference: \"{0}\"")]
    InvalidItemRef(String),

    /// A unique storage key was already taken.
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// An I/O or storage engine error occurred.
    #[error("I/O error: {0}")]
    IoError(String),
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_name_parse_is_exact() {
        assert_eq!("Daily".parse::<SystemName>().ok(), Some(SystemName::Daily));
        assert!(matches!(
            "daily".parse::<SystemName>(),
            Err(RoutineError::InvalidSystemName(_))
        ));
        assert!("Invalid".parse::<SystemName>().is_err());
    }

    #[test]
    fn system_names_in_display_order() {
        let names: Vec<_> = SystemName::ALL.iter().map(|s| s.as_str()).collect();
        assert_eq!(names, ["Daily", "Saturday", "Sunday", "Weekly", "Monthly"]);
    }

    #[test]
    fn system_codes_are_distinct() {
        let mut codes: Vec<u8> = SystemName::ALL.iter().map(|s| s.code()).collect();
        codes.dedup();
        assert_eq!(codes.len(), SystemName::ALL.len());
    }

    #[test]
    fn item_ref_text_form() {
        let step: ItemRef = "step-5".parse().expect("parse");
        assert_eq!(step, ItemRef::Step(StepId(5)));
        assert_eq!(step.to_string(), "step-5");

        let group: ItemRef = "group-12".parse().expect("parse");
        assert_eq!(group, ItemRef::Group(GroupId(12)));
        assert_eq!(group.kind(), EntityKind::Group);
    }

    #[test]
    fn item_ref_serializes_as_text() {
        let skipped = SkippedRef {
            position: 1,
            item: ItemRef::Group(GroupId(99)),
        };
        let json = serde_json::to_value(skipped).expect("serialize");
        assert_eq!(json, serde_json::json!({ "position": 1, "item": "group-99" }));

        let bytes = postcard::to_allocvec(&ItemRef::Step(StepId(7))).expect("encode");
        let back: ItemRef = postcard::from_bytes(&bytes).expect("decode");
        assert_eq!(back, ItemRef::Step(StepId(7)));
    }

    #[test]
    fn item_ref_rejects_malformed() {
        for bad in ["step", "step-", "task-1", "group-x", "-3", ""] {
            assert!(
                matches!(bad.parse::<ItemRef>(), Err(RoutineError::InvalidItemRef(_))),
                "{bad} should not parse"
            );
        }
    }

    #[test]
    fn draft_applies_default_icon() {
        let step = StepDraft::new("Stretch").into_step(StepId(1));
        assert_eq!(step.icon, DEFAULT_STEP_ICON);

        let group = GroupDraft::new("Morning").icon("🌅").into_group(GroupId(1));
        assert_eq!(group.icon, "🌅");
    }

    #[test]
    fn step_time_treats_unset_as_zero() {
        let mut step = StepDraft::new("Read").into_step(StepId(1));
        assert_eq!(step.time(), 0);
        step.estimated_time = Some(15);
        assert_eq!(step.time(), 15);
    }

    #[test]
    fn tag_list_splits_and_trims() {
        let step = StepDraft::new("Run")
            .tags("health, outdoor,,  cardio ")
            .into_step(StepId(1));
        assert_eq!(step.tag_list(), vec!["health", "outdoor", "cardio"]);
    }
}
