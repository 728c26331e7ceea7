use code_runner::ExecutionResult;
use util::execution_config::ComparisonOptions;

/// OutputComparator is a strategy trait for comparing observable behavior.
///
/// Implementations see two non-faulted results for the same invocation (faults are
/// mismatches before a comparator is consulted) and must apply `options` to both
/// sides identically.
pub trait OutputComparator: Send + Sync {
    /// True when `actual` is indistinguishable from `expected` under `options`.
    fn compare(
        &self,
        expected: &ExecutionResult,
        actual: &ExecutionResult,
        options: &ComparisonOptions,
    ) -> bool;
}
