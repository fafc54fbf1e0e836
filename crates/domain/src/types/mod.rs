//! Domain types and models

pub mod issue;
pub mod source;
pub mod sync;

pub use issue::{IssueStatus, TicketIssue, TicketProject, TicketUser};
pub use source::{ProviderKind, SourceCredentials, TicketSourceConfig};
pub use sync::{JobPhase, RefreshSummary, SourceRefreshResult, SyncJobStatus, SyncOutcome};
