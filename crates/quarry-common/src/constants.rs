//! System-wide constants for QuarryDB.

// =============================================================================
// Page Geometry
// =============================================================================

/// Page size in bytes (4 KB).
///
/// Every page frame, on-disk block, and page-format view is exactly this
/// large. Matches the typical OS page size and SSD block size.
pub const PAGE_SIZE: usize = 4 * 1024;

// =============================================================================
// Buffer Pool Defaults
// =============================================================================

/// Default number of frames per buffer pool instance.
pub const DEFAULT_POOL_SIZE: usize = 1024;

/// Default number of buffer pool instances (shards).
///
/// Each instance owns a disjoint residue class of page ids and its own
/// latch; more instances means less latch contention.
pub const DEFAULT_POOL_INSTANCES: usize = 4;

/// Minimum number of frames a pool instance is allowed to have.
pub const MIN_POOL_SIZE: usize = 1;
