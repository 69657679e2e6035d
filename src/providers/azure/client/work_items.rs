use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::core::{AzureDevOpsClient, ListResponse};
use crate::error::Result;

/// Maximum number of ids the batch endpoint accepts in one request.
pub const WORK_ITEM_BATCH_LIMIT: usize = 200;

const DEFECT_FIELDS: [&str; 6] = [
    "System.Title",
    "System.State",
    "System.AssignedTo",
    "Microsoft.VSTS.Common.Severity",
    "System.CreatedDate",
    "System.AreaPath",
];

#[derive(Debug, Serialize)]
struct WiqlQuery {
    query: String,
}

#[derive(Debug, Deserialize)]
struct WorkItemRef {
    id: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WiqlResponse {
    #[serde(default)]
    work_items: Vec<WorkItemRef>,
}

/// `System.AssignedTo` is an identity object on current API versions and a
/// plain display string on older ones.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum AssignedTo {
    Identity {
        #[serde(rename = "displayName")]
        display_name: String,
    },
    Name(String),
}

impl AssignedTo {
    pub fn display_name(&self) -> &str {
        match self {
            Self::Identity { display_name } | Self::Name(display_name) => display_name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WorkItemFields {
    #[serde(rename = "System.Title", default)]
    pub title: String,
    #[serde(rename = "System.State", default)]
    pub state: String,
    #[serde(rename = "System.AssignedTo")]
    pub assigned_to: Option<AssignedTo>,
    #[serde(rename = "Microsoft.VSTS.Common.Severity")]
    pub severity: Option<String>,
    #[serde(rename = "System.CreatedDate")]
    pub created_date: Option<DateTime<Utc>>,
    #[serde(rename = "System.AreaPath", default)]
    pub area_path: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WorkItemRecord {
    pub id: u64,
    pub fields: WorkItemFields,
}

fn escape_wiql(value: &str) -> String {
    value.replace('\'', "''")
}

pub fn build_defect_query(states: Option<&[String]>) -> String {
    let mut query = String::from(
        "SELECT [System.Id] FROM WorkItems \
         WHERE [System.TeamProject] = @project \
         AND [System.WorkItemType] = 'Bug'",
    );

    if let Some(states) = states.filter(|s| !s.is_empty()) {
        let list = states
            .iter()
            .map(|s| format!("'{}'", escape_wiql(s)))
            .collect::<Vec<_>>()
            .join(", ");
        query.push_str(&format!(" AND [System.State] IN ({list})"));
    }

    query.push_str(" ORDER BY [System.CreatedDate] DESC");
    query
}

impl AzureDevOpsClient {
    /// Runs a WIQL query for bugs, then fetches the matching work items.
    ///
    /// Only the first [`WORK_ITEM_BATCH_LIMIT`] matches (newest first) are
    /// fetched.
    pub async fn query_defects(
        &self,
        project: &str,
        states: Option<&[String]>,
    ) -> Result<Vec<WorkItemRecord>> {
        let url = self.project_url(project, "_apis/wit/wiql")?;
        let body = WiqlQuery {
            query: build_defect_query(states),
        };
        let response: WiqlResponse = self.send_json(self.client.post(url).json(&body)).await?;

        let mut ids: Vec<u64> = response.work_items.into_iter().map(|w| w.id).collect();
        if ids.is_empty() {
            debug!("No defects found for {project}");
            return Ok(Vec::new());
        }

        if ids.len() > WORK_ITEM_BATCH_LIMIT {
            warn!(
                "{} defects match in {project}, fetching only the newest {WORK_ITEM_BATCH_LIMIT}",
                ids.len()
            );
            ids.truncate(WORK_ITEM_BATCH_LIMIT);
        }

        let ids_param = ids
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let url = self.project_url(project, "_apis/wit/workitems")?;
        let request = self.client.get(url).query(&[
            ("ids", ids_param.as_str()),
            ("fields", DEFECT_FIELDS.join(",").as_str()),
        ]);

        let response: ListResponse<WorkItemRecord> = self.send_json(request).await?;
        debug!("Fetched {} defects for {project}", response.value.len());
        Ok(response.value)
    }
}
