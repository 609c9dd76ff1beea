//! # routine-core
//!
//! The record model for Routine: reusable steps, groups that order them, and
//! a fixed set of recurring systems that arrange steps and groups.
//!
//! ## Layout
//!
//! - `entities`: step and group CRUD with cascading deletes
//! - `composition`: a group's ordered step sequence and its total time
//! - `assembly`: a system's ordered, mixed step/group sequence
//! - `integrity`: validation, uniqueness, cascades and reference resolution
//! - `storage`: transactional tables (in-memory and redb)
//! - `formats`: the single-file snapshot encoding
//! - `session`: the public handle over a storage backend
//!
//! ## Architectural Constraints
//!
//! - Every mutating operation is one transaction: all of it applies or none
//! - Totals are computed on demand, never stored
//! - No async, no network, no logging dependency

// =============================================================================
// MODULES
// =============================================================================

pub mod assembly;
pub mod composition;
pub mod entities;
pub mod formats;
pub mod integrity;
pub mod primitives;
pub mod session;
pub mod storage;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    AssemblyReport, Dashboard, Deleted, EntityKind, Group, GroupDetail, GroupDraft, GroupId,
    GroupStep, ItemRef, ResolvedItem, ResolvedSystem, RoutineError, SkippedRef, Step, StepDraft,
    StepId, SystemItem, SystemName, SystemSummary,
};

// =============================================================================
// RE-EXPORTS: Storage and Session
// =============================================================================

pub use session::{Session, StorageBackend};
pub use storage::{MemoryStore, RecordRead, RecordStore, RecordWrite, RedbStore};

// =============================================================================
// RE-EXPORTS: Formats (from formats module)
// =============================================================================

pub use formats::{PersistenceHeader, store_from_bytes, store_to_bytes};
