//! Explicit policy for dropping the leading entry of a row sequence.

use serde::{Deserialize, Serialize};

/// Whether the first candidate of a sequence is left out.
///
/// The observed system always dropped the first relationship and the first
/// telemetry update. That behaviour is kept as the default but named here so
/// callers can opt out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowSkipPolicy {
    #[default]
    SkipFirst,
    KeepAll,
}

impl RowSkipPolicy {
    /// Number of leading candidates dropped.
    pub fn skipped(self) -> usize {
        match self {
            RowSkipPolicy::SkipFirst => 1,
            RowSkipPolicy::KeepAll => 0,
        }
    }

    /// Apply the policy to a candidate sequence.
    pub fn apply<I: IntoIterator>(self, candidates: I) -> std::iter::Skip<I::IntoIter> {
        candidates.into_iter().skip(self.skipped())
    }
}
