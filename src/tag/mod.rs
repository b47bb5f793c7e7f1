//! Release tag resolution.
//!
//! Computes the release identifier for a run from the tag policy and the base
//! recorded by the previous release on the same branch.

use crate::config::Setting;
use crate::config::inputs::is_pos_integer;
use serde::{Deserialize, Serialize};

/// Base assigned to the first release on a branch
pub const FIRST_BASE: &str = "1";

/// How the release tag is derived
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagPolicy {
    /// Tag base, or derive it from the previous release
    pub base: Setting<String>,
    /// Tag prefix, or use the branch name
    pub prefix: Setting<String>,
    /// Text between prefix and base
    pub separator: String,
    /// Whether numeric bases advance by one
    pub increment: bool,
}

impl Default for TagPolicy {
    fn default() -> Self {
        Self {
            base: Setting::Auto,
            prefix: Setting::Auto,
            separator: "-".to_string(),
            increment: true,
        }
    }
}

/// Release identifier for this run; immutable once resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTag {
    base: String,
    prefix: String,
    separator: String,
}

impl ResolvedTag {
    /// Tag base (build number or literal)
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Tag prefix
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Separator between prefix and base
    pub fn separator(&self) -> &str {
        &self.separator
    }

    /// Full tag name: prefix + separator + base
    pub fn name(&self) -> String {
        format!("{}{}{}", self.prefix, self.separator, self.base)
    }

    /// Base as a number when it is numeric, otherwise as text
    pub fn build_number(&self) -> BuildNumber {
        BuildNumber::from_base(&self.base)
    }
}

impl std::fmt::Display for ResolvedTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}{}", self.prefix, self.separator, self.base)
    }
}

/// Build number as serialized in release metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BuildNumber {
    /// Numeric base
    Number(u64),
    /// Non-numeric base
    Text(String),
}

impl BuildNumber {
    /// Classify a tag base
    pub fn from_base(base: &str) -> Self {
        parse_numeric(base)
            .map(BuildNumber::Number)
            .unwrap_or_else(|| BuildNumber::Text(base.to_string()))
    }
}

/// Resolves tag policies for one branch
#[derive(Debug, Clone)]
pub struct TagResolver {
    branch: String,
    run_counter: Option<u64>,
}

impl TagResolver {
    /// Create a resolver for `branch`
    pub fn new(branch: impl Into<String>) -> Self {
        Self {
            branch: branch.into(),
            run_counter: None,
        }
    }

    /// Supply the pipeline's monotonic run counter, used when the recorded base is not numeric
    pub fn with_run_counter(mut self, run_counter: Option<u64>) -> Self {
        self.run_counter = run_counter;
        self
    }

    /// Resolve the tag for this run.
    ///
    /// Never fails: malformed numbers are treated as text.
    pub fn resolve(&self, policy: &TagPolicy, prior_base: Option<&str>) -> ResolvedTag {
        let prefix = policy.prefix.clone().resolve_with(|| self.branch.clone());
        let separator = policy.separator.clone();

        let base = match &policy.base {
            Setting::Literal(literal) => match parse_numeric(literal) {
                Some(n) if policy.increment => advance(n, 1).unwrap_or_else(|| literal.clone()),
                _ => literal.clone(),
            },
            Setting::Auto => self.resolve_auto(prior_base, policy.increment),
        };

        log::info!(
            "Using release tag {}{}{} with increment: {}",
            prefix,
            separator,
            base,
            policy.increment
        );

        ResolvedTag {
            base,
            prefix,
            separator,
        }
    }

    fn resolve_auto(&self, prior_base: Option<&str>, increment: bool) -> String {
        let Some(prior) = prior_base else {
            return FIRST_BASE.to_string();
        };

        if let Some(n) = parse_numeric(prior)
            && let Some(next) = advance(n, u64::from(increment))
        {
            return next;
        }

        match self.run_counter {
            Some(counter) => {
                log::warn!(
                    "Recorded tag base '{}' on branch {} is not numeric, using run counter {}",
                    prior,
                    self.branch,
                    counter
                );
                counter.to_string()
            }
            None => {
                log::warn!(
                    "Recorded tag base '{}' on branch {} is not numeric and no run counter is available, starting at {}",
                    prior,
                    self.branch,
                    FIRST_BASE
                );
                FIRST_BASE.to_string()
            }
        }
    }
}

fn parse_numeric(value: &str) -> Option<u64> {
    if is_pos_integer(value) {
        value.parse().ok()
    } else {
        None
    }
}

fn advance(n: u64, by: u64) -> Option<String> {
    n.checked_add(by).map(|v| v.to_string())
}
