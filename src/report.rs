//! Normalized reporting model handed to the dashboard.
//!
//! Every type serializes with camelCase keys so the JSON output can be read
//! by the front end without any reshaping.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Percentage of executed tests that passed, rounded to one decimal place.
///
/// Returns `0.0` when nothing was executed.
pub fn pass_rate(passed: u32, failed: u32) -> f64 {
    let executed = passed + failed;
    if executed == 0 {
        return 0.0;
    }

    round_one_decimal(f64::from(passed) / f64::from(executed) * 100.0)
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Counters {
    pub total_tests: u32,
    pub executed: u32,
    pub passed: u32,
    pub failed: u32,
    pub skipped: u32,
    pub pass_rate: f64,
}

impl Counters {
    pub fn new(total_tests: u32, passed: u32, failed: u32, skipped: u32) -> Self {
        Self {
            total_tests,
            executed: passed + failed,
            passed,
            failed,
            skipped,
            pass_rate: pass_rate(passed, failed),
        }
    }

    #[must_use]
    pub fn add(&self, other: &Self) -> Self {
        Self::new(
            self.total_tests + other.total_tests,
            self.passed + other.passed,
            self.failed + other.failed,
            self.skipped + other.skipped,
        )
    }

    pub fn delta(&self, baseline: &Self) -> CounterDelta {
        CounterDelta {
            total_tests: i64::from(self.total_tests) - i64::from(baseline.total_tests),
            executed: i64::from(self.executed) - i64::from(baseline.executed),
            passed: i64::from(self.passed) - i64::from(baseline.passed),
            failed: i64::from(self.failed) - i64::from(baseline.failed),
            skipped: i64::from(self.skipped) - i64::from(baseline.skipped),
            pass_rate: round_one_decimal(self.pass_rate - baseline.pass_rate),
        }
    }
}

impl<'a> std::iter::Sum<&'a Counters> for Counters {
    fn sum<I: Iterator<Item = &'a Counters>>(iter: I) -> Self {
        iter.fold(Self::default(), |acc, c| acc.add(c))
    }
}

/// Counters for one execution category (automated or manual).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Breakdown {
    pub total: u32,
    pub passed: u32,
    pub failed: u32,
    pub skipped: u32,
    pub pass_rate: f64,
}

impl Breakdown {
    pub fn new(total: u32, passed: u32, failed: u32, skipped: u32) -> Self {
        Self {
            total,
            passed,
            failed,
            skipped,
            pass_rate: pass_rate(passed, failed),
        }
    }

    #[must_use]
    pub fn add(&self, other: &Self) -> Self {
        Self::new(
            self.total + other.total,
            self.passed + other.passed,
            self.failed + other.failed,
            self.skipped + other.skipped,
        )
    }
}

impl<'a> std::iter::Sum<&'a Breakdown> for Breakdown {
    fn sum<I: Iterator<Item = &'a Breakdown>>(iter: I) -> Self {
        iter.fold(Self::default(), |acc, b| acc.add(b))
    }
}

/// Counters of one or more executions, kept for run-over-run comparison.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSnapshot {
    #[serde(flatten)]
    pub counters: Counters,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    pub module_id: String,
    pub module_name: String,
    #[serde(flatten)]
    pub counters: Counters,
    pub automated: Breakdown,
    pub manual: Breakdown,
    pub linked_defects: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run_time: Option<DateTime<Utc>>,
    /// The most recent execution on its own.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_run: Option<RunSnapshot>,
    /// Executions before `latest_run`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_run: Option<RunSnapshot>,
}

impl Module {
    pub fn new(module_id: impl Into<String>, module_name: impl Into<String>) -> Self {
        Self {
            module_id: module_id.into(),
            module_name: module_name.into(),
            counters: Counters::default(),
            automated: Breakdown::default(),
            manual: Breakdown::default(),
            linked_defects: Vec::new(),
            last_run_time: None,
            latest_run: None,
            previous_run: None,
        }
    }

    /// Latest execution minus the ones before it.
    pub fn run_delta(&self) -> Option<CounterDelta> {
        run_delta(self.latest_run.as_ref(), self.previous_run.as_ref())
    }
}

fn run_delta(
    latest: Option<&RunSnapshot>,
    previous: Option<&RunSnapshot>,
) -> Option<CounterDelta> {
    Some(latest?.counters.delta(&previous?.counters))
}

fn sum_snapshots<'a>(
    snapshots: impl IntoIterator<Item = &'a RunSnapshot>,
) -> Option<RunSnapshot> {
    let snapshots: Vec<&RunSnapshot> = snapshots.into_iter().collect();
    (!snapshots.is_empty()).then(|| RunSnapshot {
        counters: snapshots.iter().map(|s| &s.counters).sum(),
        timestamp: snapshots.iter().filter_map(|s| s.timestamp).max(),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub name: String,
    pub environment: String,
    #[serde(flatten)]
    pub counters: Counters,
    pub modules: Vec<Module>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_version: Option<String>,
    pub run_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_run: Option<RunSnapshot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_run: Option<RunSnapshot>,
}

impl Project {
    /// Builds a project whose counters are the exact sum of its modules.
    ///
    /// Run snapshots only cover modules that have both a latest and a
    /// previous run, so the two sides compare the same modules.
    pub fn from_modules(
        name: impl Into<String>,
        environment: impl Into<String>,
        modules: Vec<Module>,
    ) -> Self {
        let counters = modules.iter().map(|m| &m.counters).sum();
        let last_run_time = modules.iter().filter_map(|m| m.last_run_time).max();

        let comparable: Vec<(&RunSnapshot, &RunSnapshot)> = modules
            .iter()
            .filter_map(|m| Some((m.latest_run.as_ref()?, m.previous_run.as_ref()?)))
            .collect();
        let latest_run = sum_snapshots(comparable.iter().map(|(latest, _)| *latest));
        let previous_run = sum_snapshots(comparable.iter().map(|(_, previous)| *previous));

        Self {
            name: name.into(),
            environment: environment.into(),
            counters,
            modules,
            release_version: None,
            run_count: 0,
            last_run_time,
            latest_run,
            previous_run,
        }
    }

    pub fn empty(name: impl Into<String>, environment: impl Into<String>) -> Self {
        Self::from_modules(name, environment, Vec::new())
    }

    pub fn run_delta(&self) -> Option<CounterDelta> {
        run_delta(self.latest_run.as_ref(), self.previous_run.as_ref())
    }

    pub fn satisfies_sum_invariant(&self) -> bool {
        let sum: Counters = self.modules.iter().map(|m| &m.counters).sum();
        sum.total_tests == self.counters.total_tests
            && sum.executed == self.counters.executed
            && sum.passed == self.counters.passed
            && sum.failed == self.counters.failed
            && sum.skipped == self.counters.skipped
    }

    pub fn module_named(&self, name: &str) -> Option<&Module> {
        self.modules.iter().find(|m| m.module_name == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Major,
    Minor,
    Trivial,
}

impl Severity {
    /// Maps Azure DevOps severity values such as `"2 - High"`.
    pub fn from_azure(value: &str) -> Self {
        let label = value
            .split_once('-')
            .map_or(value, |(_, label)| label)
            .trim()
            .to_lowercase();

        match label.as_str() {
            "critical" => Self::Critical,
            "high" | "major" => Self::Major,
            "low" | "trivial" => Self::Trivial,
            _ => Self::Minor,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DefectStatus {
    Open,
    InProgress,
    Resolved,
    Closed,
}

impl DefectStatus {
    pub fn from_azure(state: &str) -> Self {
        match state.trim().to_lowercase().as_str() {
            "in progress" | "committed" | "approved" => Self::InProgress,
            "resolved" => Self::Resolved,
            "closed" | "done" | "removed" => Self::Closed,
            _ => Self::Open,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Defect {
    pub id: String,
    pub title: String,
    pub severity: Severity,
    pub status: DefectStatus,
    pub assignee: String,
    pub created_date: DateTime<Utc>,
    pub environment: String,
    pub area_path: String,
    pub linked_test_ids: Vec<String>,
    pub url: String,
}

impl Defect {
    /// Last `\`-separated component of the area path.
    pub fn area_tail(&self) -> &str {
        self.area_path
            .rsplit('\\')
            .next()
            .unwrap_or(&self.area_path)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub total_tests: u32,
    pub passed: u32,
    pub failed: u32,
    pub pass_rate: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterDelta {
    pub total_tests: i64,
    pub executed: i64,
    pub passed: i64,
    pub failed: i64,
    pub skipped: i64,
    pub pass_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDelta {
    pub name: String,
    #[serde(flatten)]
    pub delta: CounterDelta,
}

/// Date-over-date deltas for every project present in both lists.
pub fn compare_projects(current: &[Project], baseline: &[Project]) -> Vec<ProjectDelta> {
    current
        .iter()
        .filter_map(|project| {
            let previous = baseline.iter().find(|b| b.name == project.name)?;
            Some(ProjectDelta {
                name: project.name.clone(),
                delta: project.counters.delta(&previous.counters),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module_with(id: &str, total: u32, passed: u32, failed: u32, skipped: u32) -> Module {
        let mut module = Module::new(id, id);
        module.counters = Counters::new(total, passed, failed, skipped);
        module
    }

    #[test]
    fn test_pass_rate_formula() {
        assert!((pass_rate(80, 20) - 80.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_pass_rate_zero_guard() {
        let rate = pass_rate(0, 0);

        assert!(rate.is_finite());
        assert!(rate.abs() < f64::EPSILON);
    }

    #[test]
    fn test_pass_rate_rounds_to_one_decimal() {
        assert!((pass_rate(2, 1) - 66.7).abs() < f64::EPSILON);
        assert!((pass_rate(1, 2) - 33.3).abs() < f64::EPSILON);
    }

    #[test]
    fn test_counters_executed_ignores_skipped() {
        let counters = Counters::new(110, 80, 20, 10);

        assert_eq!(counters.executed, 100);
        assert!((counters.pass_rate - 80.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_breakdown_with_nothing_executed_has_zero_rate() {
        let breakdown = Breakdown::new(5, 0, 0, 5);

        assert!(breakdown.pass_rate.abs() < f64::EPSILON);
    }

    #[test]
    fn test_project_counters_are_sum_of_modules() {
        let project = Project::from_modules(
            "Payments Platform",
            "QA",
            vec![
                module_with("a", 100, 80, 15, 5),
                module_with("b", 40, 30, 10, 0),
                module_with("c", 0, 0, 0, 0),
            ],
        );

        assert_eq!(project.counters.total_tests, 140);
        assert_eq!(project.counters.passed, 110);
        assert_eq!(project.counters.failed, 25);
        assert_eq!(project.counters.skipped, 5);
        assert_eq!(project.counters.executed, 135);
        assert!(project.satisfies_sum_invariant());
    }

    #[test]
    fn test_sum_invariant_detects_drift() {
        let mut project = Project::from_modules("P", "QA", vec![module_with("a", 10, 5, 5, 0)]);
        project.counters.passed += 1;

        assert!(!project.satisfies_sum_invariant());
    }

    #[test]
    fn test_empty_project_is_all_zero() {
        let project = Project::empty("P", "Prod");

        assert_eq!(project.counters, Counters::default());
        assert!(project.modules.is_empty());
        assert!(project.previous_run.is_none());
        assert!(project.satisfies_sum_invariant());
    }

    fn snapshot(total: u32, passed: u32, failed: u32) -> Option<RunSnapshot> {
        Some(RunSnapshot {
            counters: Counters::new(total, passed, failed, 0),
            timestamp: None,
        })
    }

    #[test]
    fn test_project_run_snapshots_sum_module_snapshots() {
        let mut a = module_with("a", 20, 14, 6, 0);
        a.latest_run = snapshot(10, 8, 2);
        a.previous_run = snapshot(10, 6, 4);
        let mut b = module_with("b", 20, 19, 1, 0);
        b.latest_run = snapshot(10, 10, 0);
        b.previous_run = snapshot(10, 9, 1);

        let project = Project::from_modules("P", "QA", vec![a, b]);
        let latest = project.latest_run.unwrap();
        let previous = project.previous_run.unwrap();

        assert_eq!(latest.counters.passed, 18);
        assert_eq!(previous.counters.passed, 15);
        assert_eq!(previous.counters.failed, 5);
        assert!((previous.counters.pass_rate - 75.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_run_delta_is_latest_minus_previous() {
        let mut module = module_with("a", 20, 14, 6, 0);
        module.latest_run = snapshot(10, 8, 2);
        module.previous_run = snapshot(10, 6, 4);

        let delta = module.run_delta().unwrap();

        assert_eq!(delta.total_tests, 0);
        assert_eq!(delta.passed, 2);
        assert_eq!(delta.failed, -2);
        assert!((delta.pass_rate - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_project_snapshots_skip_modules_without_both_runs() {
        let mut compared = module_with("a", 20, 14, 6, 0);
        compared.latest_run = snapshot(10, 8, 2);
        compared.previous_run = snapshot(10, 6, 4);
        let mut single = module_with("b", 5, 5, 0, 0);
        single.latest_run = snapshot(5, 5, 0);

        let project = Project::from_modules("P", "QA", vec![compared, single]);

        assert_eq!(project.latest_run.unwrap().counters.total_tests, 10);
        assert_eq!(project.run_delta().unwrap().passed, 2);
        assert!(Project::empty("P", "QA").run_delta().is_none());
    }

    #[test]
    fn test_severity_from_azure() {
        assert_eq!(Severity::from_azure("1 - Critical"), Severity::Critical);
        assert_eq!(Severity::from_azure("2 - High"), Severity::Major);
        assert_eq!(Severity::from_azure("3 - Medium"), Severity::Minor);
        assert_eq!(Severity::from_azure("4 - Low"), Severity::Trivial);
        assert_eq!(Severity::from_azure(""), Severity::Minor);
    }

    #[test]
    fn test_status_from_azure() {
        assert_eq!(DefectStatus::from_azure("New"), DefectStatus::Open);
        assert_eq!(DefectStatus::from_azure("Active"), DefectStatus::Open);
        assert_eq!(
            DefectStatus::from_azure("In Progress"),
            DefectStatus::InProgress
        );
        assert_eq!(DefectStatus::from_azure("Resolved"), DefectStatus::Resolved);
        assert_eq!(DefectStatus::from_azure("Closed"), DefectStatus::Closed);
    }

    #[test]
    fn test_compare_projects_matches_by_name() {
        let current = vec![
            Project::from_modules("A", "QA", vec![module_with("m", 100, 90, 10, 0)]),
            Project::from_modules("B", "QA", vec![module_with("m", 10, 5, 5, 0)]),
        ];
        let baseline = vec![Project::from_modules(
            "A",
            "QA",
            vec![module_with("m", 90, 72, 18, 0)],
        )];

        let deltas = compare_projects(&current, &baseline);

        assert_eq!(deltas.len(), 1);
        assert_eq!(deltas[0].name, "A");
        assert_eq!(deltas[0].delta.total_tests, 10);
        assert_eq!(deltas[0].delta.passed, 18);
        assert_eq!(deltas[0].delta.failed, -8);
        assert!((deltas[0].delta.pass_rate - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_module_serializes_flat_camel_case() {
        let module = module_with("pipeline-7", 10, 8, 2, 0);
        let json = serde_json::to_value(&module).unwrap();

        assert_eq!(json["moduleId"], "pipeline-7");
        assert_eq!(json["totalTests"], 10);
        assert_eq!(json["passRate"], 80.0);
        assert_eq!(json["linkedDefects"], serde_json::json!([]));
        assert!(json.get("lastRunTime").is_none());
    }

    #[test]
    fn test_defect_status_serializes_kebab_case() {
        let json = serde_json::to_value(DefectStatus::InProgress).unwrap();

        assert_eq!(json, "in-progress");
    }
}
