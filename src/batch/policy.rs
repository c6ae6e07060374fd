//! What a batch does when an item fails.

use serde::{Deserialize, Serialize};

/// How a batch reacts to an infected or unscannable item.
///
/// Connection failures always end the batch, whatever the policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchPolicy {
    /// Stop at the first infected or unscannable item.
    #[default]
    FailFast,
    /// Scan every item and report all findings.
    Accumulate,
}

impl BatchPolicy {
    /// Maps the boolean `failfast` setting onto a policy.
    pub fn from_fail_fast(fail_fast: bool) -> Self {
        if fail_fast {
            Self::FailFast
        } else {
            Self::Accumulate
        }
    }

    /// Returns `true` for [`BatchPolicy::FailFast`].
    pub fn is_fail_fast(&self) -> bool {
        matches!(self, Self::FailFast)
    }
}

/// Controls what an aborted batch reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportOptions {
    /// List the items scanned before the batch was cut short.
    ///
    /// When `false`, an aborted batch reports only its headline.
    #[serde(default = "default_include_partial")]
    pub include_partial_results: bool,
}

fn default_include_partial() -> bool {
    true
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            include_partial_results: true,
        }
    }
}

impl ReportOptions {
    /// Sets whether partial results are listed.
    pub fn with_partial_results(mut self, include: bool) -> Self {
        self.include_partial_results = include;
        self
    }
}
