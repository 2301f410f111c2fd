use crate::metrics_defs::SEER_REQUEST_DURATION;
use crate::models::{GroupId, OrganizationId, ProjectId};
use crate::repos::RepoDefinition;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use serde::Serialize;
use serde_json::Value;
use shared::histogram;
use std::time::{Duration, Instant};
use url::Url;

const AUTOFIX_PATH: &str = "v0/automation/autofix";

#[derive(thiserror::Error, Debug)]
pub enum SeerError {
    #[error("seer request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("invalid seer URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("could not encode autofix request: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Body of `POST /v0/automation/autofix`.
#[derive(Debug, Serialize)]
pub struct AutofixRequest<'a> {
    pub organization_id: OrganizationId,
    pub project_id: ProjectId,
    pub repos: &'a [RepoDefinition],
    pub issue: IssueDetails<'a>,
    pub additional_context: &'a str,
}

#[derive(Debug, Serialize)]
pub struct IssueDetails<'a> {
    pub id: GroupId,
    pub title: &'a str,
    pub events: Vec<IssueEvent<'a>>,
}

#[derive(Debug, Serialize)]
pub struct IssueEvent<'a> {
    pub entries: &'a [Value],
}

#[derive(Clone)]
pub struct SeerClient {
    client: reqwest::Client,
    autofix_url: Url,
}

impl SeerClient {
    pub fn new(base_url: &Url, request_timeout: Duration) -> Result<Self, SeerError> {
        let autofix_url = Url::parse(&format!(
            "{}/{}",
            base_url.as_str().trim_end_matches('/'),
            AUTOFIX_PATH
        ))?;

        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;

        Ok(SeerClient {
            client,
            autofix_url,
        })
    }

    pub fn autofix_url(&self) -> &Url {
        &self.autofix_url
    }

    /// Hands an issue to Seer. Any non-2xx answer is an error; nothing is retried.
    pub async fn start_autofix(&self, request: &AutofixRequest<'_>) -> Result<(), SeerError> {
        let body = serde_json::to_vec(request)?;
        let started = Instant::now();

        let result = self
            .client
            .post(self.autofix_url.clone())
            .header(
                CONTENT_TYPE,
                HeaderValue::from_static("application/json;charset=utf-8"),
            )
            .body(body)
            .send()
            .await
            .and_then(|response| response.error_for_status());

        let outcome = if result.is_ok() { "success" } else { "failure" };
        histogram!(SEER_REQUEST_DURATION, "outcome" => outcome)
            .record(started.elapsed().as_secs_f64());

        result?;
        Ok(())
    }
}
