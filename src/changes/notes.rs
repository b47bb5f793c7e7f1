//! Markdown release notes.

use super::{Change, ChangeSet, short_sha};
use crate::config::RepoRef;

const MARKDOWN_SPECIAL: &[char] = &['*', '#', '/', '(', ')', '[', ']', '<', '>', '_'];

/// Backslash-escape characters that carry markdown meaning
pub fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        if MARKDOWN_SPECIAL.contains(&ch) {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Render the changelog body for `changes`; empty when there are none
pub fn render_release_notes(repo: &RepoRef, changes: &ChangeSet) -> String {
    let (Some(first), Some(last)) = (changes.first(), changes.last()) else {
        return String::new();
    };

    let compare_url = repo.compare_url(
        &format!("{}^", first.short_id()),
        last.short_id(),
    );
    let mut notes = format!("### [Changes]({}):\n", compare_url);

    for change in changes.changes() {
        let sha = short_sha(&change.commit_id);
        notes.push_str(&format!("- [`{}`]({}) {}", sha, repo.commit_url(sha), escape_markdown(&change.summary)));
        if let Some(authors) = credit_line(change) {
            notes.push_str(" by ");
            notes.push_str(&escape_markdown(&authors));
        }
        notes.push('\n');
    }

    if changes.truncated() > 0 {
        notes.push_str(&format!("... and {} more\n", changes.truncated()));
    }

    notes
}

/// `@a`, `@a & @b`, `@a, @b & @c`
fn credit_line(change: &Change) -> Option<String> {
    let handles: Vec<String> = std::iter::once(change.author.as_str())
        .chain(change.co_authors.iter().map(String::as_str))
        .filter(|name| !name.is_empty())
        .map(|name| format!("@{}", name))
        .collect();

    match handles.as_slice() {
        [] => None,
        [only] => Some(only.clone()),
        [init @ .., last] => Some(format!("{} & {}", init.join(", "), last)),
    }
}
