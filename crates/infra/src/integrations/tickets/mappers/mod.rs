//! Provider JSON → unified model.
//!
//! Mappers never fail on field content: bad timestamps become the Unix
//! epoch and missing optional fields take their defaults.

pub mod github;
pub mod gitlab;
pub mod jira;

use chrono::{DateTime, Utc};

/// Parse a tracker timestamp; unparsable input maps to the Unix epoch.
///
/// Accepts Jira's `2024-01-15T10:30:00.000+0000` as well as RFC 3339.
pub(crate) fn parse_timestamp(raw: Option<&str>) -> DateTime<Utc> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return DateTime::<Utc>::UNIX_EPOCH;
    };

    DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z")
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// `incident` → `Incident`, `test_case` → `Test Case`.
pub(crate) fn title_case(raw: &str) -> String {
    raw.split(['_', ' ', '-'])
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Last `/`-separated segment of a repository or project path.
pub(crate) fn last_segment(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}
