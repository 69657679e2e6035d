use chrono::{DateTime, Utc};
use log::debug;
use serde::Deserialize;

use super::core::{format_time, AzureDevOpsClient, ListResponse};
use crate::error::Result;

pub const DEFAULT_BUILD_LIMIT: u32 = 200;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DefinitionRef {
    pub id: u64,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildRecord {
    pub id: u64,
    #[serde(default)]
    pub build_number: String,
    pub status: Option<String>,
    pub result: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub finish_time: Option<DateTime<Utc>>,
    pub definition: DefinitionRef,
}

impl BuildRecord {
    /// Finish time, or start time for builds that have not finished.
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.finish_time.or(self.start_time)
    }
}

/// Artifact URI used to scope test runs to a build.
pub fn build_uri(build_id: u64) -> String {
    format!("vstfs:///Build/Build/{build_id}")
}

impl AzureDevOpsClient {
    pub async fn list_builds(
        &self,
        project: &str,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        limit: Option<u32>,
    ) -> Result<Vec<BuildRecord>> {
        let url = self.project_url(project, "_apis/build/builds")?;

        let mut request = self
            .client
            .get(url)
            .query(&[("$top", limit.unwrap_or(DEFAULT_BUILD_LIMIT))]);
        if let Some(from) = from {
            request = request.query(&[("minTime", format_time(from))]);
        }
        if let Some(to) = to {
            request = request.query(&[("maxTime", format_time(to))]);
        }

        let response: ListResponse<BuildRecord> = self.send_json(request).await?;
        debug!("Fetched {} builds for {project}", response.value.len());
        Ok(response.value)
    }
}
