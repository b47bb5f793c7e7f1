//! Step outputs in the `$GITHUB_OUTPUT` file format.

use crate::error::{CliError, Result};
use std::io::Write;
use std::path::Path;

/// Ordered `name=value` pairs exposed to later workflow steps
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepOutputs {
    entries: Vec<(String, String)>,
}

impl StepOutputs {
    /// Empty output set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an output
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Value of an output
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Outputs in insertion order
    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    /// Render in the output file format; multi-line values use a heredoc delimiter
    pub fn render(&self) -> String {
        let mut rendered = String::new();
        for (name, value) in &self.entries {
            if value.contains('\n') {
                let delimiter = heredoc_delimiter(value);
                rendered.push_str(&format!("{}<<{}\n{}\n{}\n", name, delimiter, value, delimiter));
            } else {
                rendered.push_str(&format!("{}={}\n", name, value));
            }
        }
        rendered
    }

    /// Append to the output file, or print to stdout when no file is given
    pub fn write(&self, path: Option<&Path>) -> Result<()> {
        let rendered = self.render();
        let Some(path) = path else {
            print!("{}", rendered);
            return Ok(());
        };

        let failed = |e: std::io::Error| CliError::OutputFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        };
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(failed)?;
        file.write_all(rendered.as_bytes()).map_err(failed)?;

        log::debug!("Wrote {} outputs to {}", self.entries.len(), path.display());
        Ok(())
    }
}

/// `ghadelimiter_<uuid>`, regenerated until no line of `value` equals it
fn heredoc_delimiter(value: &str) -> String {
    loop {
        let delimiter = format!("ghadelimiter_{}", uuid::Uuid::new_v4());
        if !value.lines().any(|line| line == delimiter) {
            return delimiter;
        }
    }
}
