use async_trait::async_trait;
use chrono::{DateTime, Duration, Local, NaiveDate, NaiveTime, TimeZone, Utc};
use log::warn;

use crate::error::Result;
use crate::providers::azure::client::{AzureDevOpsClient, WorkItemRecord};
use crate::providers::azure::url_utils::{work_item_url, LinkConfig};
use crate::providers::{CollectScope, Provider, ProjectReport};
use crate::report::{Defect, DefectStatus, Severity};
use crate::settings::AzureSettings;

/// How modules are derived from remote data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// One module per pipeline definition.
    Pipelines,
    /// One module per area path.
    TestPlans,
}

pub struct AzureDevOpsProvider {
    pub client: AzureDevOpsClient,
    pub links: LinkConfig,
    pub strategy: Strategy,
}

impl AzureDevOpsProvider {
    pub fn new(settings: &AzureSettings, strategy: Strategy) -> Result<Self> {
        settings.ensure_configured()?;

        let client = AzureDevOpsClient::new(
            &settings.base_url,
            &settings.organization,
            Some(settings.token()),
        )?;

        Ok(Self {
            client,
            links: LinkConfig::from(settings),
            strategy,
        })
    }

    pub(super) fn to_defect(
        &self,
        project: &str,
        environment: &str,
        record: WorkItemRecord,
    ) -> Defect {
        let fields = record.fields;

        Defect {
            id: record.id.to_string(),
            title: fields.title,
            severity: fields
                .severity
                .as_deref()
                .map_or(Severity::Minor, Severity::from_azure),
            status: DefectStatus::from_azure(&fields.state),
            assignee: fields
                .assigned_to
                .map(|a| a.display_name().to_string())
                .unwrap_or_else(|| "Unassigned".to_string()),
            created_date: fields.created_date.unwrap_or_default(),
            environment: environment.to_string(),
            area_path: fields.area_path,
            linked_test_ids: Vec::new(),
            url: work_item_url(&self.links, project, record.id),
        }
    }

    /// Converts fetched work items, treating a failed fetch as "no defects".
    pub(super) fn defects_from(
        &self,
        project: &str,
        environment: &str,
        fetched: Result<Vec<WorkItemRecord>>,
    ) -> Vec<Defect> {
        match fetched {
            Ok(records) => records
                .into_iter()
                .map(|record| self.to_defect(project, environment, record))
                .collect(),
            Err(e) => {
                warn!("Failed to fetch defects for {project}: {e}");
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl Provider for AzureDevOpsProvider {
    fn name(&self) -> &'static str {
        match self.strategy {
            Strategy::Pipelines => "Azure DevOps pipelines",
            Strategy::TestPlans => "Azure DevOps test plans",
        }
    }

    async fn collect_project(&self, project: &str, scope: &CollectScope) -> Result<ProjectReport> {
        match self.strategy {
            Strategy::Pipelines => self.collect_pipeline_report(project, scope).await,
            Strategy::TestPlans => self.collect_test_plan_report(project, scope).await,
        }
    }
}

/// First and last instant of `date` as a calendar day in the local time zone.
pub fn day_bounds(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    day_bounds_in(date, &Local)
}

pub fn day_bounds_in<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = date.and_time(NaiveTime::MIN);
    let end = start + Duration::days(1) - Duration::milliseconds(1);

    let to_utc = |naive: chrono::NaiveDateTime| {
        tz.from_local_datetime(&naive)
            .earliest()
            .map_or_else(|| naive.and_utc(), |dt| dt.with_timezone(&Utc))
    };

    (to_utc(start), to_utc(end))
}
