//! Entry point used by the CLI to assemble everything a dashboard shows.

use chrono::{DateTime, NaiveDate, Utc};
use futures::{stream, StreamExt};
use log::{info, warn};
use serde::Serialize;

use crate::error::{Result, TestLensError};
use crate::providers::azure::{AzureDevOpsProvider, Strategy};
use crate::providers::synthetic::{trend_series, SyntheticProvider};
use crate::providers::{CollectScope, ProjectReport, Provider};
use crate::report::{compare_projects, Defect, Project, ProjectDelta, TrendPoint};
use crate::settings::{DataSourceMode, Settings};

/// Projects collected at the same time against the remote API.
pub const PROJECT_CONCURRENCY: usize = 4;
pub const DEFAULT_TREND_DAYS: u32 = 14;

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardRequest {
    pub environment: String,
    pub date: NaiveDate,
    pub mode: DataSourceMode,
    /// Replaces the enabled projects from the settings when not empty.
    pub projects: Vec<String>,
    pub compare_date: Option<NaiveDate>,
    pub trend_days: u32,
    pub defect_states: Option<Vec<String>>,
    pub build_limit: Option<u32>,
}

impl DashboardRequest {
    pub fn new(environment: impl Into<String>, date: NaiveDate, mode: DataSourceMode) -> Self {
        Self {
            environment: environment.into(),
            date,
            mode,
            projects: Vec::new(),
            compare_date: None,
            trend_days: DEFAULT_TREND_DAYS,
            defect_states: None,
            build_limit: None,
        }
    }

    fn scope(&self) -> CollectScope {
        CollectScope {
            date: self.date,
            environment: self.environment.clone(),
            defect_states: self.defect_states.clone(),
            build_limit: self.build_limit,
        }
    }

    fn project_names(&self, settings: &Settings) -> Vec<String> {
        if self.projects.is_empty() {
            settings.enabled_projects()
        } else {
            self.projects.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comparison {
    pub baseline_date: NaiveDate,
    pub projects: Vec<ProjectDelta>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    /// Name of the provider that produced `projects`.
    pub source: String,
    pub requested_mode: DataSourceMode,
    pub environment: String,
    pub date: NaiveDate,
    pub collected_at: DateTime<Utc>,
    pub projects: Vec<Project>,
    pub defects: Vec<Defect>,
    pub trend: Vec<TrendPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparison: Option<Comparison>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Collects every enabled project with the source chosen by `request.mode`.
///
/// Never fails: configuration problems fall back to synthetic data and
/// per-project failures drop the project. Both end up in
/// [`Dashboard::error`].
pub async fn load_dashboard(settings: &Settings, request: &DashboardRequest) -> Dashboard {
    let mut errors = Vec::new();

    let (provider, projects) = match select_provider(settings, request) {
        Ok(selection) => selection,
        Err(e) => {
            warn!("{e}, falling back to synthetic data");
            errors.push(e.to_string());
            synthetic_selection(settings, request)
        }
    };

    info!(
        "Collecting {} projects from {} for {} on {}",
        projects.len(),
        provider.name(),
        request.environment,
        request.date
    );

    let scope = request.scope();
    let (reports, failures) = collect_all(provider.as_ref(), &projects, &scope).await;
    errors.extend(failures);

    let comparison = match request.compare_date {
        Some(baseline_date) => {
            let baseline_scope = scope.on(baseline_date);
            let (baseline, failures) =
                collect_all(provider.as_ref(), &projects, &baseline_scope).await;
            errors.extend(failures.into_iter().map(|f| format!("{f} (on {baseline_date})")));

            let current: Vec<Project> = reports.iter().map(|r| r.project.clone()).collect();
            let baseline: Vec<Project> = baseline.into_iter().map(|r| r.project).collect();
            Some(Comparison {
                baseline_date,
                projects: compare_projects(&current, &baseline),
            })
        }
        None => None,
    };

    let (projects, defects) = reports.into_iter().fold(
        (Vec::new(), Vec::new()),
        |(mut projects, mut defects), report| {
            projects.push(report.project);
            defects.extend(report.defects);
            (projects, defects)
        },
    );

    Dashboard {
        source: provider.name().to_string(),
        requested_mode: request.mode,
        environment: request.environment.clone(),
        date: request.date,
        collected_at: Utc::now(),
        projects,
        defects,
        trend: trend_series(&request.environment, request.date, request.trend_days),
        comparison,
        error: (!errors.is_empty()).then(|| errors.join("; ")),
    }
}

type Selection = (Box<dyn Provider>, Vec<String>);

fn select_provider(settings: &Settings, request: &DashboardRequest) -> Result<Selection> {
    let strategy = match request.mode {
        DataSourceMode::Demo => return Ok(synthetic_selection(settings, request)),
        DataSourceMode::Pipelines => Strategy::Pipelines,
        DataSourceMode::Testplans => Strategy::TestPlans,
    };

    let provider = AzureDevOpsProvider::new(&settings.azure, strategy)?;

    let projects = request.project_names(settings);
    if projects.is_empty() {
        return Err(TestLensError::Config(
            "No Azure DevOps projects are enabled".to_string(),
        ));
    }

    Ok((Box::new(provider), projects))
}

fn synthetic_selection(settings: &Settings, request: &DashboardRequest) -> Selection {
    let mut projects = request.project_names(settings);
    if projects.is_empty() {
        projects = SyntheticProvider::default_projects();
    }

    (Box::new(SyntheticProvider::new()), projects)
}

/// Collects projects concurrently, keeping request order. Failed projects
/// are logged and returned as messages.
async fn collect_all(
    provider: &dyn Provider,
    projects: &[String],
    scope: &CollectScope,
) -> (Vec<ProjectReport>, Vec<String>) {
    let results: Vec<(&String, Result<ProjectReport>)> = stream::iter(projects)
        .map(|project| async move { (project, provider.collect_project(project, scope).await) })
        .buffered(PROJECT_CONCURRENCY)
        .collect()
        .await;

    let mut reports = Vec::with_capacity(results.len());
    let mut failures = Vec::new();
    for (project, result) in results {
        match result {
            Ok(report) => reports.push(report),
            Err(e) => {
                warn!("Failed to collect project {project}: {e}");
                failures.push(format!("{project}: {e}"));
            }
        }
    }

    (reports, failures)
}
