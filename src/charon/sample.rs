use std::fmt;

use serde::{Deserialize, Serialize};

/// Analysis lifecycle of a sample
///
/// Only `TO_ANALYZE` samples are launched. Values Charon sends that aren't listed here are kept
/// verbatim so they can be reported.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AnalysisStatus {
    ToAnalyze,
    UnderAnalysis,
    Analyzed,
    Failed,
    Other(String),
}

impl AnalysisStatus {
    pub fn as_str(&self) -> &str {
        match self {
            AnalysisStatus::ToAnalyze => "TO_ANALYZE",
            AnalysisStatus::UnderAnalysis => "UNDER_ANALYSIS",
            AnalysisStatus::Analyzed => "ANALYZED",
            AnalysisStatus::Failed => "FAILED",
            AnalysisStatus::Other(status) => status,
        }
    }
}

impl From<String> for AnalysisStatus {
    fn from(status: String) -> AnalysisStatus {
        match status.as_str() {
            "TO_ANALYZE" => AnalysisStatus::ToAnalyze,
            "UNDER_ANALYSIS" => AnalysisStatus::UnderAnalysis,
            "ANALYZED" => AnalysisStatus::Analyzed,
            "FAILED" => AnalysisStatus::Failed,
            _ => AnalysisStatus::Other(status),
        }
    }
}

impl From<AnalysisStatus> for String {
    fn from(status: AnalysisStatus) -> String {
        match status {
            AnalysisStatus::Other(status) => status,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A sample entry from `GET /api/v1/samples/<project>`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Sample {
    #[serde(rename = "sampleid")]
    pub id: String,
    /// Charon leaves this unset for samples that were never queued
    #[serde(default)]
    pub analysis_status: Option<AnalysisStatus>,
}

impl Sample {
    pub fn new(id: impl Into<String>, analysis_status: AnalysisStatus) -> Sample {
        Sample { id: id.into(), analysis_status: Some(analysis_status) }
    }

    pub fn is_eligible(&self) -> bool {
        self.analysis_status == Some(AnalysisStatus::ToAnalyze)
    }
}

/// Body of the project samples endpoint
#[derive(Debug, Deserialize)]
pub(crate) struct SampleList {
    #[serde(default)]
    pub(crate) samples: Vec<Sample>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_project_samples_shape() {
        let json = r#"
        {
          "samples": [
            { "sampleid": "P0001_101", "analysis_status": "TO_ANALYZE", "status": "STALE" },
            { "sampleid": "P0001_102", "analysis_status": "ANALYZED" },
            { "sampleid": "P0001_103", "analysis_status": null },
            { "sampleid": "P0001_104", "analysis_status": "ON_HOLD" }
          ]
        }"#;
        let parsed: SampleList = serde_json::from_str(json).unwrap();

        assert_eq!(parsed.samples.len(), 4);
        assert!(parsed.samples[0].is_eligible());
        assert_eq!(parsed.samples[1].analysis_status, Some(AnalysisStatus::Analyzed));
        assert_eq!(parsed.samples[2].analysis_status, None);
        assert!(!parsed.samples[2].is_eligible());
        assert_eq!(parsed.samples[3].analysis_status, Some(AnalysisStatus::Other("ON_HOLD".to_string())));
    }

    #[test]
    fn missing_sample_list_is_empty() {
        let parsed: SampleList = serde_json::from_str("{}").unwrap();
        assert!(parsed.samples.is_empty());
    }

    #[test]
    fn status_serialises_to_charon_spelling() {
        let json = serde_json::to_string(&AnalysisStatus::UnderAnalysis).unwrap();
        assert_eq!(json, "\"UNDER_ANALYSIS\"");
        assert_eq!(AnalysisStatus::from("ANALYSED".to_string()).to_string(), "ANALYSED");
    }
}
