//! Parsing helpers for tracker issue keys.
//!
//! Jira keys look like `PROJ-123`; GitHub and GitLab use `#123`, optionally
//! qualified with a repository or project path (`api#12`, `acme/api#12`).

/// Split a key into its prefix and trailing number.
///
/// `"PROJ-10"` becomes `("PROJ", 10)`, `"#12"` becomes `("", 12)`. Keys
/// without a numeric suffix get number `0`. The prefix is upper-cased so
/// ordering is stable across providers that differ only in case.
pub fn split_key(key: &str) -> (String, i64) {
    let key = key.trim();
    let digits_start = key
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map_or(key.len(), |(i, _)| i);

    let number = key[digits_start..].parse::<i64>().unwrap_or(0);
    let prefix = key[..digits_start].trim_end_matches(['-', '#', '_']).to_uppercase();
    (prefix, number)
}

/// `true` for Jira-style keys: a letter, then letters/digits/underscores,
/// a dash and a number.
pub fn is_jira_key(candidate: &str) -> bool {
    let Some((project, number)) = candidate.trim().rsplit_once('-') else {
        return false;
    };
    let mut chars = project.chars();
    let starts_with_letter = chars.next().is_some_and(|c| c.is_ascii_alphabetic());
    starts_with_letter
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !number.is_empty()
        && number.chars().all(|c| c.is_ascii_digit())
}

/// Parsed `[scope]#number` reference used by the Git-hosted trackers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashKey {
    /// Repository (`api`, `acme/api`) or project path, when given.
    pub scope: Option<String>,
    pub number: u64,
}

/// Parse `#12`, `12`, `api#12` or `acme/api#12`.
pub fn parse_hash_key(key: &str) -> Option<HashKey> {
    let key = key.trim();
    let (scope, number) = match key.rsplit_once('#') {
        Some((scope, number)) => {
            let scope = scope.trim();
            ((!scope.is_empty()).then(|| scope.to_string()), number)
        }
        None => (None, key),
    };
    let number = number.trim().parse::<u64>().ok()?;
    Some(HashKey { scope, number })
}
