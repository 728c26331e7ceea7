//! Session outcome types.
//!
//! A [`SessionResult`] is built exactly once at the end of a feedback request through
//! one of its constructors and never modified afterwards.

use crate::traits::feedback::FeedbackItem;
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// How a feedback request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// The submission already behaves like a reference; nothing to repair.
    Correct,
    /// A passing repair was found.
    Repaired,
    /// No passing repair exists within the candidate space, or it exceeds the cost ceiling.
    Unrepairable,
    /// The request could not be analysed (no references, no entry function, internal failure).
    Error,
    /// The synthesis budget ran out before a usable answer was produced.
    Timeout,
}

impl SessionStatus {
    /// True for outcomes that come with a usable answer.
    pub fn is_success(self) -> bool {
        matches!(self, SessionStatus::Correct | SessionStatus::Repaired)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionStatus::Correct => "Correct",
            SessionStatus::Repaired => "Repaired",
            SessionStatus::Unrepairable => "Unrepairable",
            SessionStatus::Error => "Error",
            SessionStatus::Timeout => "Timeout",
        };
        f.write_str(s)
    }
}

/// Final outcome of one feedback request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionResult {
    pub status: SessionStatus,
    /// Repair cost. `None` when no cost applies (errors, timeouts).
    pub cost: Option<u32>,
    pub feedback: Vec<FeedbackItem>,
    /// Human-readable detail for every non-success outcome.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Identity of the reference the submission was compared against.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(rename = "elapsed_ms", serialize_with = "serialize_millis")]
    pub elapsed: Duration,
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

impl SessionResult {
    pub fn correct(reference: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            status: SessionStatus::Correct,
            cost: Some(0),
            feedback: Vec::new(),
            error: None,
            reference: Some(reference.into()),
            elapsed,
        }
    }

    pub fn repaired(
        cost: u32,
        feedback: Vec<FeedbackItem>,
        reference: impl Into<String>,
        elapsed: Duration,
    ) -> Self {
        Self {
            status: SessionStatus::Repaired,
            cost: Some(cost),
            feedback,
            error: None,
            reference: Some(reference.into()),
            elapsed,
        }
    }

    /// `feedback` describes the closest attempt, when there was one worth showing.
    pub fn unrepairable(
        detail: impl Into<String>,
        cost: Option<u32>,
        feedback: Vec<FeedbackItem>,
        reference: Option<String>,
        elapsed: Duration,
    ) -> Self {
        Self {
            status: SessionStatus::Unrepairable,
            cost,
            feedback,
            error: Some(detail.into()),
            reference,
            elapsed,
        }
    }

    pub fn error(detail: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            status: SessionStatus::Error,
            cost: None,
            feedback: Vec::new(),
            error: Some(detail.into()),
            reference: None,
            elapsed,
        }
    }

    /// The repair budget ran out before a usable repair was found.
    pub fn timeout(reference: Option<String>, budget: Duration, elapsed: Duration) -> Self {
        Self {
            status: SessionStatus::Timeout,
            cost: None,
            feedback: Vec::new(),
            error: Some(format!(
                "repair budget of {:.1}s exhausted",
                budget.as_secs_f64()
            )),
            reference,
            elapsed,
        }
    }

    /// One-line summary: the status, plus the detail for non-success outcomes.
    pub fn status_line(&self) -> String {
        match (&self.status, &self.error) {
            (SessionStatus::Repaired, _) => format!("Repaired (cost {})", self.cost.unwrap_or(0)),
            (status, Some(detail)) if !status.is_success() => format!("{status}: {detail}"),
            (status, _) => status.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_fill_the_expected_fields() {
        let t = SessionResult::timeout(None, Duration::from_secs(2), Duration::from_millis(5));
        assert_eq!(t.status, SessionStatus::Timeout);
        assert!(t.cost.is_none());
        assert!(t.feedback.is_empty());
        assert_eq!(t.status_line(), "Timeout: repair budget of 2.0s exhausted");

        let c = SessionResult::correct("c1.py", Duration::ZERO);
        assert_eq!(c.cost, Some(0));
        assert!(c.status.is_success());

        let e = SessionResult::error("No reference programs available for python", Duration::ZERO);
        assert_eq!(e.status_line(), "Error: No reference programs available for python");
    }

    #[test]
    fn serializes_elapsed_as_millis() {
        let r = SessionResult::repaired(3, Vec::new(), "c1.py", Duration::from_millis(1500));
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["status"], "repaired");
        assert_eq!(v["elapsed_ms"], 1500);
        assert_eq!(v["cost"], 3);
        assert!(v.get("error").is_none());
    }
}
