//! Domain-level constants shared by the stores, providers and scheduler.

// Sync interval bounds (minutes)
pub const MIN_SYNC_INTERVAL_MINUTES: u32 = 1;
pub const MAX_SYNC_INTERVAL_MINUTES: u32 = 1440;
pub const DEFAULT_SYNC_INTERVAL_MINUTES: u32 = 15;

// Provider fetch limits
pub const DEFAULT_REFRESH_MAX_RESULTS: u32 = 100;
pub const DEFAULT_SEARCH_MAX_RESULTS: u32 = 50;
pub const MAX_RESULTS_CEILING: u32 = 100;

// Issue presentation
pub const DEFAULT_ISSUE_TYPE: &str = "Issue";
pub const DEFAULT_DISPLAY_FORMAT: &str = "{key} {summary}";

// Jira query used when the search box is empty
pub const JIRA_RECENT_JQL: &str = "updated >= -30d ORDER BY updated DESC";

// Canonical public hosts
pub const GITHUB_API_BASE: &str = "https://api.github.com";
pub const GITHUB_WEB_BASE: &str = "https://github.com";
pub const GITLAB_DEFAULT_BASE: &str = "https://gitlab.com";
pub const JIRA_CLOUD_HOST_SUFFIX: &str = ".atlassian.net";
