//! Aggregated apply outcomes

/// Worst thing that happened during an operation, in escalation order.
/// Merging keeps the maximum, and the process exit code reflects it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Outcome {
    #[default]
    Success,
    SuccessWithWarnings,
    StatementError,
    UnsafeBlocked,
    WorkspaceFatal,
    ConfigError,
}

impl Outcome {
    /// Process exit code for this outcome. Configuration errors use the
    /// conventional EX_CONFIG; in dry-run mode, plain differences exit 1
    /// so scripts can detect drift.
    pub fn exit_code(&self, dry_run: bool, differences: bool) -> i32 {
        match self {
            Outcome::ConfigError => 78,
            Outcome::WorkspaceFatal => 4,
            Outcome::UnsafeBlocked => 3,
            Outcome::StatementError => 2,
            Outcome::Success | Outcome::SuccessWithWarnings => {
                if dry_run && differences {
                    1
                } else {
                    0
                }
            }
        }
    }
}

/// Per-target result, merged additively across targets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyResult {
    /// Whether any difference was found (including unsupported ones)
    pub differences: bool,
    /// Statements skipped due to gates or earlier failures
    pub skip_count: usize,
    /// Diffs that could not be generated faithfully
    pub unsupported_count: usize,
    /// Worst outcome observed
    pub worst_outcome: Outcome,
}

impl ApplyResult {
    pub fn merge(self, other: ApplyResult) -> ApplyResult {
        ApplyResult {
            differences: self.differences || other.differences,
            skip_count: self.skip_count.saturating_add(other.skip_count),
            unsupported_count: self
                .unsupported_count
                .saturating_add(other.unsupported_count),
            worst_outcome: self.worst_outcome.max(other.worst_outcome),
        }
    }

    pub fn with_outcome(mut self, outcome: Outcome) -> ApplyResult {
        self.worst_outcome = self.worst_outcome.max(outcome);
        self
    }
}

#[cfg(test)]
mod tests;
