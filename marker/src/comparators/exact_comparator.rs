//! A comparator that demands identical behavior.
//!
//! Return values must be equal (same type, same value) and printed lines must match one
//! for one, in order. Extra or missing lines are a mismatch.

use crate::comparators::observable_match;
use crate::traits::comparator::OutputComparator;
use code_runner::ExecutionResult;
use util::execution_config::ComparisonOptions;

#[derive(Debug, Clone, Copy, Default)]
pub struct ExactComparator;

impl OutputComparator for ExactComparator {
    fn compare(
        &self,
        expected: &ExecutionResult,
        actual: &ExecutionResult,
        options: &ComparisonOptions,
    ) -> bool {
        observable_match(expected, actual, options, &|s: &str| s.to_string())
    }
}
