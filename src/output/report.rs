// JSON report: a serializable view of an AnalysisReport.
//
// Branch errors become strings next to an absent result, so a consumer can
// tell "failed" from "empty" without parsing log output.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::AnalysisError;
use crate::pipeline::analyze::{AnalysisReport, TopicReport};
use crate::summarize::summarizer::SummaryResult;

#[derive(Debug, Serialize)]
pub struct BranchError {
    pub kind: &'static str,
    pub message: String,
}

impl From<&AnalysisError> for BranchError {
    fn from(err: &AnalysisError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct JsonReport<'a> {
    pub generated_at: DateTime<Utc>,
    pub num_topics: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<&'a SummaryResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary_error: Option<BranchError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topics: Option<&'a TopicReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topics_error: Option<BranchError>,
}

impl<'a> JsonReport<'a> {
    pub fn new(report: &'a AnalysisReport, num_topics: usize) -> Self {
        Self {
            generated_at: Utc::now(),
            num_topics,
            summary: report.summary.as_ref().ok(),
            summary_error: report.summary.as_ref().err().map(BranchError::from),
            topics: report.topics.as_ref().ok(),
            topics_error: report.topics.as_ref().err().map(BranchError::from),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
