use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

use crate::auth::Token;
use crate::error::{Result, TestLensError};

pub const API_VERSION: &str = "7.0";

pub struct AzureDevOpsClient {
    pub client: Client,
    pub api_url: Url,
    pub token: Option<Token>,
}

/// Envelope used by every Azure DevOps list endpoint.
#[derive(Debug, Deserialize)]
pub struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
}

/// Timestamp format accepted by the date filters of the REST API.
pub fn format_time(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}

impl AzureDevOpsClient {
    pub fn new(base_url: &str, organization: &str, token: Option<Token>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("testlens/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TestLensError::Config(format!("Failed to create HTTP client: {e}")))?;

        let mut base = Url::parse(base_url)
            .map_err(|e| TestLensError::Config(format!("Invalid base URL: {e}")))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let api_url = base
            .join(&format!("{}/", urlencoding::encode(organization)))
            .map_err(|e| TestLensError::Config(format!("Invalid organization URL: {e}")))?;

        Ok(Self {
            client,
            api_url,
            token,
        })
    }

    pub fn auth_request(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => token.authorize(request),
            None => request,
        }
    }

    pub fn organization_url(&self, path: &str) -> Result<Url> {
        self.api_url
            .join(path)
            .map_err(|e| TestLensError::Config(format!("Invalid organization URL: {e}")))
    }

    pub fn project_url(&self, project: &str, path: &str) -> Result<Url> {
        self.api_url
            .join(&format!("{}/", urlencoding::encode(project)))
            .and_then(|url| url.join(path))
            .map_err(|e| TestLensError::Config(format!("Invalid project URL: {e}")))
    }

    /// Sends an authenticated request and decodes the JSON body.
    ///
    /// Any non-2xx status becomes [`TestLensError::Transport`].
    pub async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let request = self.auth_request(request.query(&[("api-version", API_VERSION)]));

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TestLensError::Transport {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        Ok(response.json::<T>().await?)
    }
}
