//! A comparator that forgives superficial string differences.
//!
//! Every string on both sides (returned values, nested container elements and printed
//! lines) is trimmed and lower-cased before comparison. Selected when
//! `clean_strings` is enabled.

use crate::comparators::observable_match;
use crate::traits::comparator::OutputComparator;
use code_runner::ExecutionResult;
use util::execution_config::ComparisonOptions;

#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizedComparator;

pub(crate) fn clean(s: &str) -> String {
    s.trim().to_lowercase()
}

impl OutputComparator for NormalizedComparator {
    fn compare(
        &self,
        expected: &ExecutionResult,
        actual: &ExecutionResult,
        options: &ComparisonOptions,
    ) -> bool {
        observable_match(expected, actual, options, &clean)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use code_runner::Value;

    #[test]
    fn case_and_padding_are_ignored() {
        let a = ExecutionResult {
            return_value: Some(Value::List(vec![Value::Str("Yes".into())])),
            stdout: vec!["  Done".into()],
            ..Default::default()
        };
        let b = ExecutionResult {
            return_value: Some(Value::List(vec![Value::Str(" yes".into())])),
            stdout: vec!["done ".into()],
            ..Default::default()
        };
        assert!(NormalizedComparator.compare(&a, &b, &ComparisonOptions::default()));
    }

    #[test]
    fn content_still_matters() {
        let a = ExecutionResult {
            return_value: Some(Value::Str("yes".into())),
            ..Default::default()
        };
        let b = ExecutionResult {
            return_value: Some(Value::Str("no".into())),
            ..Default::default()
        };
        assert!(!NormalizedComparator.compare(&a, &b, &ComparisonOptions::default()));
    }
}
