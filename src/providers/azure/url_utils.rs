use crate::settings::AzureSettings;

/// Where web links into Azure DevOps point to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkConfig {
    pub base_url: String,
    pub organization: String,
}

impl LinkConfig {
    pub fn new(base_url: impl Into<String>, organization: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            organization: organization.into(),
        }
    }
}

impl From<&AzureSettings> for LinkConfig {
    fn from(settings: &AzureSettings) -> Self {
        Self::new(settings.base_url.clone(), settings.organization.clone())
    }
}

pub fn work_item_url(config: &LinkConfig, project: &str, id: u64) -> String {
    format!(
        "{}/{}/{}/_workitems/edit/{id}",
        config.base_url.trim_end_matches('/'),
        urlencoding::encode(&config.organization),
        urlencoding::encode(project)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_work_item_url() {
        let config = LinkConfig::new("https://dev.azure.com", "contoso");

        assert_eq!(
            work_item_url(&config, "Shop", 4711),
            "https://dev.azure.com/contoso/Shop/_workitems/edit/4711"
        );
    }

    #[test]
    fn test_work_item_url_trims_slash_and_encodes_project() {
        let config = LinkConfig::new("https://dev.azure.com/", "contoso");

        assert_eq!(
            work_item_url(&config, "Customer Portal", 9),
            "https://dev.azure.com/contoso/Customer%20Portal/_workitems/edit/9"
        );
    }

    #[test]
    fn test_links_follow_the_given_organization() {
        let first = LinkConfig::new("https://dev.azure.com", "contoso");
        let second = LinkConfig::new("https://dev.azure.com", "fabrikam");

        assert_ne!(
            work_item_url(&first, "Shop", 1),
            work_item_url(&second, "Shop", 1)
        );
    }
}
