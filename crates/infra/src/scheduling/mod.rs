//! Background scheduling for ticket sync.

pub mod error;
pub mod ticket_sync_scheduler;

pub use error::{SchedulerError, SchedulerResult};
pub use ticket_sync_scheduler::{TicketSyncScheduler, TicketSyncSchedulerConfig};
