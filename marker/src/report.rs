//! # Feedback Report Module
//!
//! Serializable output of a feedback request for downstream collaborators (graders,
//! web front-ends, the CLI's `--json` mode).
//!
//! ## Overview
//!
//! - [`FeedbackReport`]: everything known about one analysed submission: status, cost,
//!   feedback items, the reference it was compared against and timing.
//! - [`FeedbackReportResponse`]: an envelope adding top-level `success` and `message`.
//!
//! ## JSON Output Example
//!
//! ```json
//! {
//!   "success": true,
//!   "message": "Repaired (cost 11)",
//!   "data": {
//!     "submission": "attempt.py",
//!     "language": "python",
//!     "status": "repaired",
//!     "cost": 11,
//!     "reference": "c1.py",
//!     "elapsed_ms": 42,
//!     "generated_at": "2025-09-01T10:00:00+00:00",
//!     "feedback": [
//!       { "message": "...", "cost": 6, "normalized_cost": 0.55, "location": { "line": 11, "column": 5 } }
//!     ]
//!   }
//! }
//! ```

use crate::traits::feedback::FeedbackItem;
use crate::types::{SessionResult, SessionStatus};
use chrono::Utc;
use serde::Serialize;
use util::languages::Language;

#[derive(Debug, Clone, Serialize)]
pub struct FeedbackReport {
    /// Identity of the analysed submission.
    pub submission: String,
    pub language: Language,
    pub status: SessionStatus,
    pub cost: Option<u32>,
    pub feedback: Vec<FeedbackItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    pub elapsed_ms: u64,
    /// RFC 3339 timestamp of report creation.
    pub generated_at: String,
}

impl FeedbackReport {
    pub fn new(submission: impl Into<String>, language: Language, result: SessionResult) -> Self {
        Self {
            submission: submission.into(),
            language,
            status: result.status,
            cost: result.cost,
            feedback: result.feedback,
            error: result.error,
            reference: result.reference,
            elapsed_ms: result.elapsed.as_millis() as u64,
            generated_at: Utc::now().to_rfc3339(),
        }
    }

    fn summary(&self) -> String {
        match (self.status, &self.error) {
            (SessionStatus::Correct, _) => "Submission is already correct.".to_string(),
            (SessionStatus::Repaired, _) => format!("Repaired (cost {})", self.cost.unwrap_or(0)),
            (status, Some(detail)) => format!("{status}: {detail}"),
            (status, None) => status.to_string(),
        }
    }
}

/// The response envelope for feedback results.
///
/// - `success`: true when the submission is correct or a repair was found.
/// - `message`: a one-line summary of the outcome.
/// - `data`: the [`FeedbackReport`].
#[derive(Debug, Serialize)]
pub struct FeedbackReportResponse {
    success: bool,
    message: String,
    data: FeedbackReport,
}

impl FeedbackReportResponse {
    pub fn success(&self) -> bool {
        self.success
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn data(&self) -> &FeedbackReport {
        &self.data
    }
}

impl From<FeedbackReport> for FeedbackReportResponse {
    fn from(report: FeedbackReport) -> Self {
        FeedbackReportResponse {
            success: report.status.is_success(),
            message: report.summary(),
            data: report,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use program_model::Location;
    use serde_json::Value;
    use std::time::Duration;

    #[test]
    fn repaired_response_serialization() {
        let result = SessionResult::repaired(
            11,
            vec![FeedbackItem {
                message: "Add the assignment `cond3 = score >= 7000` before line 11.".to_string(),
                cost: 6,
                normalized_cost: 0.55,
                location: Location::new(11, 5),
            }],
            "c1.py",
            Duration::from_millis(42),
        );
        let response: FeedbackReportResponse =
            FeedbackReport::new("attempt.py", Language::Python, result).into();
        let value: Value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["message"], "Repaired (cost 11)");
        assert_eq!(value["data"]["submission"], "attempt.py");
        assert_eq!(value["data"]["language"], "python");
        assert_eq!(value["data"]["status"], "repaired");
        assert_eq!(value["data"]["cost"], 11);
        assert_eq!(value["data"]["reference"], "c1.py");
        assert_eq!(value["data"]["elapsed_ms"], 42);
        assert_eq!(value["data"]["feedback"][0]["cost"], 6);
        assert_eq!(value["data"]["feedback"][0]["normalized_cost"], 0.55);
        assert_eq!(value["data"]["feedback"][0]["location"]["line"], 11);
        assert!(value["data"].get("error").is_none());
    }

    #[test]
    fn error_response_carries_detail() {
        let result = SessionResult::error("No reference programs available for python", Duration::ZERO);
        let response: FeedbackReportResponse =
            FeedbackReport::new("a.py", Language::Python, result).into();
        assert!(!response.success());
        assert_eq!(
            response.message(),
            "Error: No reference programs available for python"
        );
        let value: Value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["data"]["cost"], Value::Null);
        assert!(value["data"]["feedback"].as_array().unwrap().is_empty());
    }

    #[test]
    fn timeout_response() {
        let response: FeedbackReportResponse = FeedbackReport::new(
            "slow.py",
            Language::Python,
            SessionResult::timeout(
                Some("c1.py".to_string()),
                Duration::from_secs(1),
                Duration::from_secs(1),
            ),
        )
        .into();
        assert!(!response.success());
        assert_eq!(response.message(), "Timeout: repair budget of 1.0s exhausted");
        assert_eq!(response.data().status, SessionStatus::Timeout);
    }

    #[test]
    fn generated_at_is_rfc3339() {
        let report = FeedbackReport::new(
            "x.py",
            Language::Python,
            SessionResult::correct("c1.py", Duration::ZERO),
        );
        assert!(chrono::DateTime::parse_from_rfc3339(&report.generated_at).is_ok());
    }
}
