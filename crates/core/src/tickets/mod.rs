//! Ticket sync operations
//!
//! This module provides the ports for provider clients and local stores,
//! plus the repository that orchestrates them.

pub mod ports;
pub mod repository;
pub mod single_flight;
pub mod subscription;

pub use ports::{
    CredentialCipher, IssueCache, SourceConfigStore, TicketProviderClient, TicketProviderFactory,
};
pub use repository::TicketRepository;
pub use single_flight::SourceLocks;
pub use subscription::{IssueQuery, IssueSubscription};
