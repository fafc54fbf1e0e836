//! Issue display-format templates.
//!
//! Sources carry a template such as `"{key}: {summary}"` that controls how an
//! issue is rendered when attached to a time entry. Supported placeholders:
//! `{key}`, `{summary}`, `{project}`, `{project_name}`, `{status}`, `{type}`,
//! `{assignee}`. Unknown placeholders are left untouched.

use crate::types::TicketIssue;

/// Render `issue` through `template`.
pub fn render_display_format(template: &str, issue: &TicketIssue) -> String {
    let status = issue.status.to_string();
    let replacements: [(&str, &str); 7] = [
        ("{key}", &issue.key),
        ("{summary}", &issue.summary),
        ("{project}", &issue.project_key),
        ("{project_name}", &issue.project_name),
        ("{status}", &status),
        ("{type}", &issue.issue_type),
        ("{assignee}", issue.assignee.as_deref().unwrap_or("")),
    ];

    let mut rendered = template.to_string();
    for (placeholder, value) in replacements {
        if rendered.contains(placeholder) {
            rendered = rendered.replace(placeholder, value);
        }
    }
    rendered.trim().to_string()
}
