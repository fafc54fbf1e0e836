//! # TicketSync Infrastructure
//!
//! Infrastructure implementations of the core ticket sync ports.
//!
//! This crate contains:
//! - SQLCipher-backed source config store and issue cache
//! - Credential encryption and keychain key management
//! - Jira, GitHub and GitLab HTTP clients with response mappers
//! - The per-source background sync scheduler
//! - Config loading, logging setup and refresh metrics
//!
//! ## Architecture
//! - Implements traits defined in `ticketsync-core`
//! - Depends on `ticketsync-common` and `ticketsync-core`
//! - Contains all "impure" code (I/O, network, keychain)

pub mod bootstrap;
pub mod config;
pub mod database;
pub mod errors;
pub mod http;
pub mod integrations;
pub mod key_manager;
pub mod observability;
pub mod scheduling;
pub mod security;

// Re-export commonly used items
pub use bootstrap::TicketSyncRuntime;
pub use database::*;
pub use errors::InfraError;
pub use http::*;
pub use integrations::tickets::ProviderRegistry;
pub use key_manager::*;
pub use observability::init_tracing;
pub use scheduling::{TicketSyncScheduler, TicketSyncSchedulerConfig};
pub use security::AesCredentialCipher;
