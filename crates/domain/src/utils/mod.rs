//! Pure helpers shared across the ticket model.

pub mod display_format;
pub mod issue_key;

pub use display_format::render_display_format;
pub use issue_key::{is_jira_key, parse_hash_key, split_key, HashKey};
