use log::debug;
use serde::{Deserialize, Serialize};

use super::core::{AzureDevOpsClient, ListResponse};
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRef {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct ClassificationNode {
    name: String,
    #[serde(default)]
    children: Vec<ClassificationNode>,
}

const AREA_DEPTH: u32 = 10;

impl AzureDevOpsClient {
    pub async fn list_projects(&self) -> Result<Vec<ProjectRef>> {
        let url = self.organization_url("_apis/projects")?;
        let response: ListResponse<ProjectRef> = self.send_json(self.client.get(url)).await?;

        debug!("Fetched {} projects", response.value.len());
        Ok(response.value)
    }

    /// Area paths of a project as a flat list of node names.
    ///
    /// The root node is the project itself and is only returned when it has
    /// no children.
    pub async fn list_area_paths(&self, project: &str) -> Result<Vec<String>> {
        let url = self.project_url(project, "_apis/wit/classificationnodes/areas")?;
        let request = self.client.get(url).query(&[("$depth", AREA_DEPTH)]);
        let root: ClassificationNode = self.send_json(request).await?;

        let areas = flatten_areas(root);
        debug!("Fetched {} area paths for {project}", areas.len());
        Ok(areas)
    }
}

fn flatten_areas(root: ClassificationNode) -> Vec<String> {
    if root.children.is_empty() {
        return vec![root.name];
    }

    let mut names = Vec::new();
    let mut pending: Vec<ClassificationNode> = root.children.into_iter().rev().collect();
    while let Some(node) = pending.pop() {
        names.push(node.name);
        pending.extend(node.children.into_iter().rev());
    }
    names
}
