//! # TicketSync Core
//!
//! Business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - Port interfaces for provider clients, the config store, the issue cache
//!   and the credential cipher
//! - The ticket repository (refresh, fallback search, live queries)
//!
//! ## Architecture Principles
//! - Only depends on `ticketsync-domain`
//! - No database, HTTP, or platform code
//! - All external dependencies via traits

pub mod tickets;

pub use tickets::ports::{
    CredentialCipher, IssueCache, SourceConfigStore, TicketProviderClient, TicketProviderFactory,
};
pub use tickets::{IssueQuery, IssueSubscription, SourceLocks, TicketRepository};
