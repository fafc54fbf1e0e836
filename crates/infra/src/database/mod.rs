//! Database implementations

pub mod issue_cache_store;
pub mod manager;
pub mod source_config_store;

pub use issue_cache_store::SqlCipherIssueCache;
pub use manager::DbManager;
pub use source_config_store::SqlCipherSourceConfigStore;
