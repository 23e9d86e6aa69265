//! # quarry-common
//!
//! Common types and constants for QuarryDB.
//!
//! This crate provides the foundational types shared across QuarryDB
//! components:
//!
//! - **Types**: core identifiers (`PageId`)
//! - **Constants**: page geometry and pool-sizing defaults
//!
//! ## Example
//!
//! ```rust
//! use quarry_common::types::PageId;
//! use quarry_common::constants::PAGE_SIZE;
//!
//! let page_id = PageId::new(42);
//! assert!(page_id.is_valid());
//! assert!(PAGE_SIZE.is_power_of_two());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod constants;
pub mod types;

// Re-export commonly used items at the crate root
pub use constants::*;
pub use types::PageId;
