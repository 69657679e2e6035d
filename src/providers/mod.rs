pub mod azure;
pub mod synthetic;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::Result;
use crate::report::{Defect, Project};

/// What to collect for a single project.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectScope {
    pub date: NaiveDate,
    pub environment: String,
    pub defect_states: Option<Vec<String>>,
    pub build_limit: Option<u32>,
}

impl CollectScope {
    pub fn new(date: NaiveDate, environment: impl Into<String>) -> Self {
        Self {
            date,
            environment: environment.into(),
            defect_states: None,
            build_limit: None,
        }
    }

    #[must_use]
    pub fn on(&self, date: NaiveDate) -> Self {
        Self {
            date,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectReport {
    pub project: Project,
    pub defects: Vec<Defect>,
}

#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn collect_project(&self, project: &str, scope: &CollectScope)
        -> Result<ProjectReport>;
}

/// Lowercase, dash-separated identifier fragment.
pub fn slugify(value: &str) -> String {
    value
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("User Profile"), "user-profile");
        assert_eq!(slugify("  API / Contract tests "), "api-contract-tests");
        assert_eq!(slugify(""), "");
    }

    #[test]
    fn test_scope_on_other_date_keeps_filters() {
        let mut scope = CollectScope::new(NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(), "QA");
        scope.defect_states = Some(vec!["Active".to_string()]);

        let other = scope.on(NaiveDate::from_ymd_opt(2026, 10, 12).unwrap());

        assert_eq!(other.environment, "QA");
        assert_eq!(other.defect_states, scope.defect_states);
        assert_eq!(other.date, NaiveDate::from_ymd_opt(2026, 10, 12).unwrap());
    }
}
