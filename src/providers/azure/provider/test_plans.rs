use std::collections::HashSet;

use indexmap::IndexMap;
use log::{debug, info};

use super::core::{day_bounds, AzureDevOpsProvider};
use crate::error::Result;
use crate::providers::azure::client::TestRunRecord;
use crate::providers::{slugify, CollectScope, ProjectReport};
use crate::report::{Breakdown, Defect, Module, Project};

const UNASSIGNED_MODULE: &str = "Unassigned";

impl AzureDevOpsProvider {
    pub async fn collect_test_plan_report(
        &self,
        project: &str,
        scope: &CollectScope,
    ) -> Result<ProjectReport> {
        info!("Collecting test plan data for project: {project}");

        let (from, to) = day_bounds(scope.date);
        let (areas, runs, fetched_defects) = tokio::join!(
            self.client.list_area_paths(project),
            self.client
                .list_test_runs_for_project(project, Some(from), Some(to)),
            self.client
                .query_defects(project, scope.defect_states.as_deref()),
        );

        let areas = areas?;
        let runs = runs?;
        let defects = self.defects_from(project, &scope.environment, fetched_defects);

        info!(
            "Folding {} test runs into {} area paths for {project}",
            runs.len(),
            areas.len()
        );

        let report = build_project(project, &scope.environment, &areas, &runs, &defects);

        Ok(ProjectReport {
            project: report,
            defects,
        })
    }
}

/// Module keys are lowercased names so matching ignores case.
fn build_project(
    name: &str,
    environment: &str,
    areas: &[String],
    runs: &[TestRunRecord],
    defects: &[Defect],
) -> Project {
    let mut modules: IndexMap<String, Module> = IndexMap::new();
    let mut taken_ids = HashSet::new();
    for area in areas.iter().filter(|a| !a.trim().is_empty()) {
        let key = area.to_lowercase();
        if modules.contains_key(&key) {
            continue;
        }
        let id = unique_id(format!("area-{}", slugify(area)), &mut taken_ids);
        modules.insert(key, Module::new(id, area.clone()));
    }

    for run in runs {
        let key = module_key_for_run(&modules, run);
        let module = modules.entry(key).or_insert_with(|| {
            let id = unique_id("area-unassigned".to_string(), &mut taken_ids);
            Module::new(id, UNASSIGNED_MODULE)
        });
        fold_run(module, run);
    }

    for defect in defects {
        match modules.get_mut(&defect.area_tail().to_lowercase()) {
            Some(module) => module.linked_defects.push(defect.id.clone()),
            None => debug!(
                "Defect {} ({}) matches no area path module",
                defect.id, defect.area_path
            ),
        }
    }

    let mut project = Project::from_modules(name, environment, modules.into_values().collect());
    project.run_count = u32::try_from(runs.len()).unwrap_or(u32::MAX);
    project
}

/// Appends `-2`, `-3`, ... until `base` is not taken yet.
fn unique_id(base: String, taken: &mut HashSet<String>) -> String {
    let mut id = base.clone();
    let mut suffix = 2;
    while !taken.insert(id.clone()) {
        id = format!("{base}-{suffix}");
        suffix += 1;
    }
    id
}

/// Lowercase alphanumeric words of `value`.
fn words(value: &str) -> Vec<String> {
    value
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(String::from)
        .collect()
}

/// The module whose name appears as whole words in the run name, else the
/// unassigned bucket.
///
/// More words win, then an exact spelling match ("C#" over "C++" for
/// "C# unit tests"), then the longer name.
fn module_key_for_run(modules: &IndexMap<String, Module>, run: &TestRunRecord) -> String {
    let run_name = run.name.to_lowercase();
    let run_words = words(&run.name);

    modules
        .keys()
        .filter_map(|key| {
            let key_words = words(key);
            let found = !key_words.is_empty()
                && run_words
                    .windows(key_words.len())
                    .any(|window| window == key_words.as_slice());
            found.then(|| (key_words.len(), run_name.contains(key.as_str()), key.len(), key))
        })
        .max()
        .map(|(.., key)| key.clone())
        .unwrap_or_else(|| UNASSIGNED_MODULE.to_lowercase())
}

fn fold_run(module: &mut Module, run: &TestRunRecord) {
    let counters = run.counters();
    module.counters = module.counters.add(&counters);

    let breakdown = Breakdown::new(
        counters.total_tests,
        counters.passed,
        counters.failed,
        counters.skipped,
    );
    if run.is_automated.unwrap_or(false) {
        module.automated = module.automated.add(&breakdown);
    } else {
        module.manual = module.manual.add(&breakdown);
    }

    if run.completed_date > module.last_run_time {
        module.last_run_time = run.completed_date;
    }
}
