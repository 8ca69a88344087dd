use std::time::Duration;

use log::{debug, info};
use serde_json::json;
use thiserror::Error;
use url::Url;

use crate::charon::sample::{AnalysisStatus, Sample, SampleList};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const READ_TIMEOUT: Duration = Duration::from_secs(30);
const WRITE_TIMEOUT: Duration = Duration::from_secs(30);

static TOKEN_HEADER: &str = "X-Charon-API-token";

/// Failures talking to the tracking service, split by cause
#[derive(Debug, Error)]
pub enum TrackingError {
    #[error("can't reach charon at {url}: {message}")]
    Connection { url: String, message: String },
    #[error("charon has no record at {url}")]
    NotFound { url: String },
    #[error("charon answered {code} for {url}: {body}")]
    Status { url: String, code: u16, body: String },
    #[error("unexpected response from charon at {url}: {message}")]
    Malformed { url: String, message: String },
    #[error("can't build a charon url from {base}")]
    InvalidUrl { base: String },
}

/// Query and update sample analysis status
///
/// The orchestrator only talks to the tracking service through this trait.
pub trait TrackingService {
    fn project_samples(&self, project_id: &str) -> Result<Vec<Sample>, TrackingError>;

    fn update_status(&self, project_id: &str, sample_id: &str, status: &AnalysisStatus) -> Result<(), TrackingError>;
}

/// HTTP client for the Charon REST API
pub struct CharonSession {
    base: Url,
    token: String,
    agent: ureq::Agent,
}

impl CharonSession {
    pub fn new(base: Url, token: impl Into<String>) -> Result<CharonSession, TrackingError> {
        if base.cannot_be_a_base() {
            return Err(TrackingError::InvalidUrl { base: base.to_string() });
        }
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(CONNECT_TIMEOUT)
            .timeout_read(READ_TIMEOUT)
            .timeout_write(WRITE_TIMEOUT)
            .build();
        Ok(CharonSession { base, token: token.into(), agent })
    }

    /// `<base>/api/v1/<segments...>`, each segment percent-encoded
    fn endpoint(&self, segments: &[&str]) -> Result<Url, TrackingError> {
        let mut url = self.base.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| TrackingError::InvalidUrl { base: self.base.to_string() })?;
            path.pop_if_empty().extend(["api", "v1"]).extend(segments);
        }
        Ok(url)
    }
}

impl TrackingService for CharonSession {
    fn project_samples(&self, project_id: &str) -> Result<Vec<Sample>, TrackingError> {
        let url = self.endpoint(&["samples", project_id])?;
        debug!("GET {url}");
        let response = self
            .agent
            .get(url.as_str())
            .set(TOKEN_HEADER, &self.token)
            .call()
            .map_err(|err| map_error(&url, err))?;
        let list: SampleList = response
            .into_json()
            .map_err(|err| TrackingError::Malformed { url: url.to_string(), message: err.to_string() })?;
        info!("Charon lists {} samples for project {}", list.samples.len(), project_id);
        Ok(list.samples)
    }

    fn update_status(&self, project_id: &str, sample_id: &str, status: &AnalysisStatus) -> Result<(), TrackingError> {
        let url = self.endpoint(&["sample", project_id, sample_id])?;
        debug!("PUT {url} analysis_status={status}");
        self.agent
            .put(url.as_str())
            .set(TOKEN_HEADER, &self.token)
            .send_json(json!({ "analysis_status": status.as_str() }))
            .map_err(|err| map_error(&url, err))?;
        Ok(())
    }
}

fn map_error(url: &Url, err: ureq::Error) -> TrackingError {
    let url = url.to_string();
    match err {
        ureq::Error::Status(404, _) => TrackingError::NotFound { url },
        ureq::Error::Status(code, response) => {
            let body = response.into_string().unwrap_or_default();
            TrackingError::Status { url, code, body }
        }
        ureq::Error::Transport(transport) => TrackingError::Connection { url, message: transport.to_string() },
    }
}
