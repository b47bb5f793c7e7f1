//! Parsing of raw action inputs.
//!
//! Inputs arrive as plain strings (command line or `INPUT_*` environment
//! variables). They are interpreted here once and never looked at again.

use crate::artifacts::ArtifactDescriptor;
use crate::error::{ConfigError, Result};
use std::path::{Path, PathBuf};

/// Split a multi-value input on newlines, or on commas when it is a single line.
///
/// Entries are trimmed and empty entries dropped.
pub fn parse_multi_input(input: &str) -> Vec<String> {
    let parts: Vec<&str> = if input.contains('\n') {
        input.split('\n').collect()
    } else {
        input.split(',').collect()
    };

    parts
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse the `files` input into artifact descriptors.
///
/// Each entry is either `label:path` or a bare `path`. A bare path is labeled
/// with its lowercase file stem. Only the first colon separates the label, so
/// paths may contain colons themselves.
pub fn parse_file_entries(input: &str) -> Vec<ArtifactDescriptor> {
    parse_multi_input(input)
        .into_iter()
        .map(|entry| match entry.split_once(':') {
            Some((label, path)) => {
                log::info!("Using label {} for file path {}", label, path);
                ArtifactDescriptor::new(label, PathBuf::from(path))
            }
            None => {
                let label = Path::new(&entry)
                    .file_stem()
                    .map(|s| s.to_string_lossy().to_lowercase())
                    .unwrap_or_else(|| entry.to_lowercase());
                ArtifactDescriptor::new(label, PathBuf::from(entry))
            }
        })
        .collect()
}

/// Parse a YAML 1.2 core-schema boolean the way workflow inputs are written.
pub fn parse_bool_input(name: &str, value: &str) -> Result<bool> {
    match value.trim() {
        "true" | "True" | "TRUE" => Ok(true),
        "false" | "False" | "FALSE" => Ok(false),
        other => Err(ConfigError::InvalidInput {
            name: name.to_string(),
            value: other.to_string(),
            reason: "expected one of true, True, TRUE, false, False, FALSE".to_string(),
        }
        .into()),
    }
}

/// Whether a string consists solely of ASCII digits.
pub fn is_pos_integer(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
}

/// Parse an optional positive limit; anything that is not a positive integer means "no limit".
pub fn parse_limit(value: &str) -> Option<usize> {
    let value = value.trim();
    if !is_pos_integer(value) {
        return None;
    }
    value.parse::<usize>().ok().filter(|n| *n > 0)
}

/// Inputs that use `none` to mean "not set".
pub fn parse_optional(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() || value == "none" {
        None
    } else {
        Some(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multi_input_prefers_newlines() {
        assert_eq!(
            parse_multi_input("a.jar, b\n c.zip \n\n"),
            vec!["a.jar, b".to_string(), "c.zip".to_string()]
        );
    }

    #[test]
    fn test_multi_input_commas() {
        assert_eq!(
            parse_multi_input(" a , ,b,"),
            vec!["a".to_string(), "b".to_string()]
        );
    }

    #[test]
    fn test_file_entries_labels() {
        let files = parse_file_entries("build/libs/Mod-1.0.jar\nsources:C:/out/src.zip");

        assert_eq!(files.len(), 2);
        assert_eq!(files[0].label, "mod-1.0");
        assert_eq!(files[0].path, PathBuf::from("build/libs/Mod-1.0.jar"));
        assert_eq!(files[1].label, "sources");
        assert_eq!(files[1].path, PathBuf::from("C:/out/src.zip"));
    }

    #[test]
    fn test_bool_input() {
        assert!(parse_bool_input("draftRelease", "True").unwrap());
        assert!(!parse_bool_input("draftRelease", "false").unwrap());
        assert!(parse_bool_input("draftRelease", "yes").is_err());
    }

    #[test]
    fn test_pos_integer() {
        assert!(is_pos_integer("0"));
        assert!(is_pos_integer("41"));
        assert!(!is_pos_integer(""));
        assert!(!is_pos_integer("-1"));
        assert!(!is_pos_integer("4.1"));
        assert!(!is_pos_integer("v41"));
    }

    #[test]
    fn test_limit() {
        assert_eq!(parse_limit("10"), Some(10));
        assert_eq!(parse_limit("0"), None);
        assert_eq!(parse_limit(""), None);
        assert_eq!(parse_limit("ten"), None);
    }

    #[test]
    fn test_optional() {
        assert_eq!(parse_optional("none"), None);
        assert_eq!(parse_optional(""), None);
        assert_eq!(parse_optional("Announcements"), Some("Announcements".to_string()));
    }
}
