use chrono::{DateTime, Utc};
use log::debug;
use serde::Deserialize;

use super::builds::build_uri;
use super::core::{format_time, AzureDevOpsClient, ListResponse};
use crate::error::Result;
use crate::report::Counters;

/// Largest page the test results endpoint returns.
pub const RESULTS_PAGE_SIZE: usize = 1000;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestRunRecord {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub total_tests: u32,
    #[serde(default)]
    pub passed_tests: u32,
    pub failed_tests: Option<u32>,
    #[serde(default)]
    pub unanalyzed_tests: u32,
    #[serde(default)]
    pub not_applicable_tests: u32,
    pub is_automated: Option<bool>,
    pub completed_date: Option<DateTime<Utc>>,
}

impl TestRunRecord {
    /// Older API versions only report failures as unanalyzed tests.
    pub fn failed(&self) -> u32 {
        self.failed_tests.unwrap_or(self.unanalyzed_tests)
    }

    pub fn counters(&self) -> Counters {
        Counters::new(
            self.total_tests,
            self.passed_tests,
            self.failed(),
            self.not_applicable_tests,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum Outcome {
    Passed,
    Failed,
    NotExecuted,
    Blocked,
    #[default]
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TestCaseRef {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResultRecord {
    #[serde(default)]
    pub outcome: Outcome,
    pub automated_test_name: Option<String>,
    pub test_case: Option<TestCaseRef>,
    pub error_message: Option<String>,
}

impl AzureDevOpsClient {
    pub async fn list_test_runs_for_build(
        &self,
        project: &str,
        build_id: u64,
    ) -> Result<Vec<TestRunRecord>> {
        let url = self.project_url(project, "_apis/test/runs")?;
        let uri = build_uri(build_id);
        let request = self.client.get(url).query(&[
            ("buildUri", uri.as_str()),
            ("includeRunDetails", "true"),
        ]);

        let response: ListResponse<TestRunRecord> = self.send_json(request).await?;
        debug!(
            "Fetched {} test runs for build {build_id}",
            response.value.len()
        );
        Ok(response.value)
    }

    /// Test runs last updated inside the window, regardless of build.
    pub async fn list_test_runs_for_project(
        &self,
        project: &str,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<TestRunRecord>> {
        let url = self.project_url(project, "_apis/test/runs")?;

        let mut request = self.client.get(url);
        if let Some(from) = from {
            request = request.query(&[("minLastUpdatedDate", format_time(from))]);
        }
        if let Some(to) = to {
            request = request.query(&[("maxLastUpdatedDate", format_time(to))]);
        }

        let response: ListResponse<TestRunRecord> = self.send_json(request).await?;
        debug!(
            "Fetched {} test runs for {project}",
            response.value.len()
        );
        Ok(response.value)
    }

    pub async fn list_test_results(
        &self,
        project: &str,
        run_id: u64,
    ) -> Result<Vec<TestResultRecord>> {
        let url = self.project_url(project, &format!("_apis/test/Runs/{run_id}/results"))?;

        let mut results: Vec<TestResultRecord> = Vec::new();
        loop {
            let request = self.client.get(url.clone()).query(&[
                ("$top", RESULTS_PAGE_SIZE),
                ("$skip", results.len()),
            ]);
            let page: ListResponse<TestResultRecord> = self.send_json(request).await?;

            let fetched = page.value.len();
            results.extend(page.value);
            if fetched < RESULTS_PAGE_SIZE {
                break;
            }
        }

        debug!("Fetched {} test results for run {run_id}", results.len());
        Ok(results)
    }
}
