use std::cmp::Reverse;

use indexmap::IndexMap;
use log::{debug, info, warn};

use super::core::{day_bounds, AzureDevOpsProvider};
use crate::error::Result;
use crate::providers::azure::classify::{self, ClassifiedResult};
use crate::providers::azure::client::BuildRecord;
use crate::providers::{CollectScope, ProjectReport};
use crate::report::{Counters, Module, Project, RunSnapshot};

/// Test telemetry of one build.
#[derive(Debug)]
struct BuildSummary {
    build: BuildRecord,
    counters: Counters,
    results: Vec<ClassifiedResult>,
}

impl AzureDevOpsProvider {
    pub async fn collect_pipeline_report(
        &self,
        project: &str,
        scope: &CollectScope,
    ) -> Result<ProjectReport> {
        info!("Collecting pipeline test data for project: {project}");

        let (from, to) = day_bounds(scope.date);
        let builds = self
            .client
            .list_builds(project, Some(from), Some(to), scope.build_limit)
            .await?;

        info!("Found {} builds for {project} on {}", builds.len(), scope.date);

        // One build at a time; a failing build is skipped.
        let mut summaries = Vec::with_capacity(builds.len());
        for build in builds {
            let build_id = build.id;
            match self.summarize_build(project, build).await {
                Ok(Some(summary)) => summaries.push(summary),
                Ok(None) => debug!("Build {build_id} produced no test runs, skipping"),
                Err(e) => warn!("Skipping build {build_id} of {project}: {e}"),
            }
        }

        if summaries.is_empty() {
            warn!("No builds with test data for {project} on {}", scope.date);
        }

        let report = build_project(project, &scope.environment, summaries);

        let fetched = self
            .client
            .query_defects(project, scope.defect_states.as_deref())
            .await;
        let defects = self.defects_from(project, &scope.environment, fetched);

        Ok(ProjectReport {
            project: report,
            defects,
        })
    }

    async fn summarize_build(
        &self,
        project: &str,
        build: BuildRecord,
    ) -> Result<Option<BuildSummary>> {
        let runs = self
            .client
            .list_test_runs_for_build(project, build.id)
            .await?;
        if runs.is_empty() {
            return Ok(None);
        }

        let counters = runs
            .iter()
            .fold(Counters::default(), |acc, run| acc.add(&run.counters()));

        let mut results = Vec::new();
        for run in &runs {
            let records = self.client.list_test_results(project, run.id).await?;
            results.extend(records.iter().map(classify::classify));
        }

        Ok(Some(BuildSummary {
            build,
            counters,
            results,
        }))
    }
}

fn build_project(name: &str, environment: &str, summaries: Vec<BuildSummary>) -> Project {
    if summaries.is_empty() {
        return Project::empty(name, environment);
    }

    let run_count = u32::try_from(summaries.len()).unwrap_or(u32::MAX);
    let release_version = summaries
        .iter()
        .max_by_key(|s| s.build.completed_at())
        .map(|s| s.build.build_number.clone())
        .filter(|number| !number.is_empty());

    let mut by_definition: IndexMap<u64, Vec<BuildSummary>> = IndexMap::new();
    for summary in summaries {
        by_definition
            .entry(summary.build.definition.id)
            .or_default()
            .push(summary);
    }

    let modules = by_definition
        .into_values()
        .filter_map(pipeline_module)
        .collect();

    let mut project = Project::from_modules(name, environment, modules);
    project.run_count = run_count;
    project.release_version = release_version;
    project
}

/// Folds all builds of one pipeline definition into a module.
///
/// Counters cover every build of the day. `latest_run` is the newest build
/// alone and `previous_run` the builds before it.
fn pipeline_module(mut builds: Vec<BuildSummary>) -> Option<Module> {
    builds.sort_by_key(|s| Reverse(s.build.completed_at()));

    let (latest, earlier) = builds.split_first()?;
    let definition = &latest.build.definition;
    let mut module = Module::new(format!("pipeline-{}", definition.id), definition.name.clone());

    module.counters = builds.iter().map(|s| &s.counters).sum();

    let (automated, manual) = classify::breakdowns(builds.iter().flat_map(|s| s.results.iter()));
    module.automated = automated;
    module.manual = manual;

    module.last_run_time = latest.build.completed_at();
    module.latest_run = Some(RunSnapshot {
        counters: latest.counters,
        timestamp: latest.build.completed_at(),
    });
    module.previous_run = earlier.first().map(|most_recent| RunSnapshot {
        counters: earlier.iter().map(|s| &s.counters).sum(),
        timestamp: most_recent.build.completed_at(),
    });

    Some(module)
}
