//! Offline data source producing the same report shape as the Azure
//! strategies.
//!
//! Base values come from an RNG seeded by project, environment and date, so a
//! given day always has the same shape. Pass counts additionally receive a
//! small jitter from the thread RNG to mimic live telemetry.

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use log::debug;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::error::Result;
use crate::providers::azure::url_utils::{work_item_url, LinkConfig};
use crate::providers::{slugify, CollectScope, ProjectReport, Provider};
use crate::report::{
    pass_rate, Breakdown, Counters, Defect, DefectStatus, Module, Project, RunSnapshot, Severity,
    TrendPoint,
};
use crate::settings::DEFAULT_BASE_URL;

pub const DEFAULT_PROJECTS: [&str; 3] = ["Payments Platform", "Customer Portal", "Mobile App"];

/// Maximum relative change applied to pass counts.
pub const JITTER: f64 = 0.05;

const DEMO_ORGANIZATION: &str = "demo";

const MODULE_CATALOG: [&str; 10] = [
    "Authentication",
    "Checkout",
    "Payments",
    "Search",
    "User Profile",
    "Notifications",
    "Reporting",
    "Order History",
    "Inventory",
    "Admin Console",
];

const ASSIGNEES: [&str; 5] = [
    "Alex Morgan",
    "Sam Rivera",
    "Jordan Lee",
    "Taylor Kim",
    "Unassigned",
];

const DEFECT_TITLES: [&str; 6] = [
    "Timeout while saving changes",
    "Validation message not shown",
    "Incorrect totals after refresh",
    "Session expires unexpectedly",
    "Layout breaks on small screens",
    "Duplicate entries after retry",
];

#[derive(Debug, Clone, Copy)]
pub struct SyntheticProvider {
    jitter: bool,
}

impl Default for SyntheticProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntheticProvider {
    pub fn new() -> Self {
        Self { jitter: true }
    }

    /// A generator whose output depends only on its inputs.
    pub fn deterministic() -> Self {
        Self { jitter: false }
    }

    pub fn default_projects() -> Vec<String> {
        DEFAULT_PROJECTS.iter().map(ToString::to_string).collect()
    }

    pub fn generate_project(
        &self,
        project: &str,
        environment: &str,
        date: NaiveDate,
    ) -> ProjectReport {
        let mut rng = StdRng::seed_from_u64(seed(&[project, environment, &date.to_string()]));
        let base_ratio = environment_ratio(environment);

        let mut catalog = MODULE_CATALOG.to_vec();
        catalog.shuffle(&mut rng);
        let module_count = rng.random_range(4..=6);

        let last_run = run_time(&mut rng, date);
        let mut modules: Vec<Module> = catalog
            .into_iter()
            .take(module_count)
            .map(|name| self.generate_module(&mut rng, name, base_ratio, last_run))
            .collect();

        let defects = generate_defects(&mut rng, project, environment, &mut modules, last_run);

        let mut report = Project::from_modules(project, environment, modules);
        report.release_version = Some(format!(
            "{}.{}.{}",
            rng.random_range(1..=3),
            rng.random_range(0..=12),
            rng.random_range(0..=30)
        ));
        report.run_count = rng.random_range(1..=6);

        debug!(
            "Generated {} modules and {} defects for {project} ({environment})",
            report.modules.len(),
            defects.len()
        );

        ProjectReport {
            project: report,
            defects,
        }
    }

    fn generate_module(
        &self,
        rng: &mut StdRng,
        name: &str,
        base_ratio: f64,
        last_run: Option<DateTime<Utc>>,
    ) -> Module {
        let ratio = (base_ratio + rng.random_range(-0.06..0.04)).clamp(0.0, 1.0);

        let automated = self.generate_breakdown(rng, 40..=160, ratio);
        let manual = self.generate_breakdown(rng, 5..=40, ratio);

        let mut module = Module::new(format!("mod-{}", slugify(name)), name);
        module.counters = Counters::new(
            automated.total + manual.total,
            automated.passed + manual.passed,
            automated.failed + manual.failed,
            automated.skipped + manual.skipped,
        );
        module.automated = automated;
        module.manual = manual;
        module.last_run_time = last_run;
        module.latest_run = Some(RunSnapshot {
            counters: module.counters,
            timestamp: last_run,
        });
        module.previous_run = Some(previous_snapshot(rng, &module.counters, last_run));
        module
    }

    fn generate_breakdown(
        &self,
        rng: &mut StdRng,
        size: std::ops::RangeInclusive<u32>,
        ratio: f64,
    ) -> Breakdown {
        let total = rng.random_range(size);
        let skipped = rng.random_range(0..=total / 20);
        let executed = total - skipped;
        let mut passed = scale(executed, ratio);

        if self.jitter {
            passed = jitter(passed, executed);
        }

        Breakdown::new(total, passed, executed - passed, skipped)
    }
}

#[async_trait]
impl Provider for SyntheticProvider {
    fn name(&self) -> &'static str {
        "synthetic"
    }

    async fn collect_project(&self, project: &str, scope: &CollectScope) -> Result<ProjectReport> {
        Ok(self.generate_project(project, &scope.environment, scope.date))
    }
}

/// Daily totals for the `days` calendar days ending at `end`, oldest first.
pub fn trend_series(environment: &str, end: NaiveDate, days: u32) -> Vec<TrendPoint> {
    let base_ratio = environment_ratio(environment);

    (0..i64::from(days))
        .rev()
        .map(|offset| {
            let date = end - Duration::days(offset);
            let mut rng = StdRng::seed_from_u64(seed(&["trend", environment, &date.to_string()]));

            let total_tests = rng.random_range(900..=1200);
            let executed = total_tests - rng.random_range(0..=total_tests / 20);
            let ratio = (base_ratio + rng.random_range(-0.04..0.03)).clamp(0.0, 1.0);
            let passed = scale(executed, ratio);
            let failed = executed - passed;

            TrendPoint {
                date,
                total_tests,
                passed,
                failed,
                pass_rate: pass_rate(passed, failed),
            }
        })
        .collect()
}

/// Base share of executed tests that pass in a given environment.
fn environment_ratio(environment: &str) -> f64 {
    match environment.trim().to_lowercase().as_str() {
        "prod" | "production" => 0.95,
        "uat" => 0.90,
        "stage" | "staging" => 0.88,
        "qa" => 0.82,
        _ => 0.86,
    }
}

/// FNV-1a over the parts, separated so ("ab", "c") and ("a", "bc") differ.
fn seed(parts: &[&str]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0100_0000_01b3;

    parts.iter().fold(OFFSET, |hash, part| {
        part.bytes()
            .chain(std::iter::once(0))
            .fold(hash, |h, b| (h ^ u64::from(b)).wrapping_mul(PRIME))
    })
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn scale(value: u32, ratio: f64) -> u32 {
    ((f64::from(value) * ratio).round() as u32).min(value)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn jitter(passed: u32, executed: u32) -> u32 {
    let factor = 1.0 + rand::rng().random_range(-JITTER..=JITTER);
    ((f64::from(passed) * factor).round() as u32).min(executed)
}

fn run_time(rng: &mut StdRng, date: NaiveDate) -> Option<DateTime<Utc>> {
    date.and_hms_opt(rng.random_range(6..=20), rng.random_range(0..60), 0)
        .map(|naive| naive.and_utc())
}

fn previous_snapshot(
    rng: &mut StdRng,
    counters: &Counters,
    last_run: Option<DateTime<Utc>>,
) -> RunSnapshot {
    let executed = counters.executed;
    let shift = rng.random_range(-0.04..0.04);
    let ratio = f64::from(counters.passed) / f64::from(executed.max(1));
    let passed = scale(executed, (ratio - shift).clamp(0.0, 1.0));

    RunSnapshot {
        counters: Counters::new(counters.total_tests, passed, executed - passed, counters.skipped),
        timestamp: last_run.map(|t| t - Duration::days(1)),
    }
}

fn generate_defects(
    rng: &mut StdRng,
    project: &str,
    environment: &str,
    modules: &mut [Module],
    last_run: Option<DateTime<Utc>>,
) -> Vec<Defect> {
    if modules.is_empty() {
        return Vec::new();
    }

    let links = LinkConfig::new(DEFAULT_BASE_URL, DEMO_ORGANIZATION);
    let first_id: u64 = rng.random_range(1000..9000);
    let count = rng.random_range(2..=6);
    let created_base = last_run.unwrap_or_default();

    (0..count)
        .map(|offset| {
            let id = first_id + offset;
            let index = rng.random_range(0..modules.len());
            let module = &mut modules[index];
            module.linked_defects.push(id.to_string());

            Defect {
                id: id.to_string(),
                title: format!(
                    "{}: {}",
                    module.module_name,
                    DEFECT_TITLES[rng.random_range(0..DEFECT_TITLES.len())]
                ),
                severity: [
                    Severity::Critical,
                    Severity::Major,
                    Severity::Minor,
                    Severity::Trivial,
                ][rng.random_range(0..4)],
                status: [
                    DefectStatus::Open,
                    DefectStatus::InProgress,
                    DefectStatus::Resolved,
                    DefectStatus::Closed,
                ][rng.random_range(0..4)],
                assignee: ASSIGNEES[rng.random_range(0..ASSIGNEES.len())].to_string(),
                created_date: created_base - Duration::days(rng.random_range(0..30)),
                environment: environment.to_string(),
                area_path: format!("{project}\\{}", module.module_name),
                linked_test_ids: vec![format!("TC-{}", rng.random_range(1000..10000))],
                url: work_item_url(&links, project, id),
            }
        })
        .collect()
}
