//! Core types for QuarryDB.

mod ids;

pub use ids::PageId;
