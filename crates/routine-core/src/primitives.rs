//! # Fixed Primitives
//!
//! Compile-time constants for the Routine store: default icons, field
//! limits and the on-disk format header.

/// Icon given to a step created without one.
pub const DEFAULT_STEP_ICON: &str = "➡️";

/// Icon given to a group created without one.
pub const DEFAULT_GROUP_ICON: &str = "📦";

/// Magic bytes for the file-backend format header.
///
/// - File Header = Magic Bytes ("RTNE") + Version (u8) before payload.
pub const MAGIC_BYTES: &[u8; 4] = b"RTNE";

/// Current serialization format version.
///
/// Increment this when making breaking changes to the serialization format.
pub const FORMAT_VERSION: u8 = 1;

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum length of a step or group name, in characters.
pub const MAX_NAME_LENGTH: usize = 100;

/// Maximum length of a description, in characters.
pub const MAX_DESCRIPTION_LENGTH: usize = 255;

/// Maximum length of an icon, in characters.
pub const MAX_ICON_LENGTH: usize = 50;

/// Maximum length of the comma-separated tag string, in characters.
pub const MAX_TAGS_LENGTH: usize = 200;

/// Maximum number of entries in one replace-all write.
///
/// Positions are stored as `u32`; this keeps a single write bounded well
/// below that.
pub const MAX_ORDERED_ENTRIES: usize = 10_000;
