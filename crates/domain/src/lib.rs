//! # TicketSync Domain
//!
//! Business domain types for the ticket sync subsystem.
//!
//! This crate contains:
//! - Source configuration and the per-provider credential union
//! - The unified issue/project/user model
//! - Sync outcomes and scheduler status snapshots
//! - The domain error type and `Result` alias
//! - Application configuration structures
//!
//! ## Architecture
//! - No dependencies on other TicketSync crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;
pub mod utils;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
