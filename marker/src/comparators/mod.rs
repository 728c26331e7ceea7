//! # Comparators
//!
//! Strategies for deciding whether a submission's execution result matches the
//! reference's result for the same invocation.
//!
//! Both comparators honour [`ComparisonOptions`]: `ignore_io` skips printed output,
//! `ignore_return` skips the return value. They differ only in how strings are treated.
//!
//! The available comparators are:
//! - [`exact_comparator`]: values and printed lines must be identical.
//! - [`normalized_comparator`]: strings are trimmed and case-folded on both sides first.

pub mod exact_comparator;
pub mod normalized_comparator;

pub use exact_comparator::ExactComparator;
pub use normalized_comparator::NormalizedComparator;

use code_runner::{ExecutionResult, Value};
use util::execution_config::ComparisonOptions;

/// Compares the observable parts of two results after passing every string through `clean`.
pub(crate) fn observable_match(
    expected: &ExecutionResult,
    actual: &ExecutionResult,
    options: &ComparisonOptions,
    clean: &impl Fn(&str) -> String,
) -> bool {
    if !options.ignore_return {
        let lhs = expected.return_value.as_ref().map(|v| v.map_strings(clean));
        let rhs = actual.return_value.as_ref().map(|v| v.map_strings(clean));
        if !values_equal(lhs.as_ref(), rhs.as_ref()) {
            return false;
        }
    }
    if !options.ignore_io {
        if expected.stdout.len() != actual.stdout.len() {
            return false;
        }
        return expected
            .stdout
            .iter()
            .zip(&actual.stdout)
            .all(|(e, a)| clean(e) == clean(a));
    }
    true
}

/// A missing return value and an explicit `None` are the same observation.
fn values_equal(lhs: Option<&Value>, rhs: Option<&Value>) -> bool {
    let lhs = lhs.unwrap_or(&Value::None);
    let rhs = rhs.unwrap_or(&Value::None);
    lhs == rhs
}
