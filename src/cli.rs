use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use log::info;
use serde::Serialize;
use std::path::PathBuf;

use testlens::dashboard::{load_dashboard, DashboardRequest, DEFAULT_TREND_DAYS};
use testlens::providers::azure::client::AzureDevOpsClient;
use testlens::settings::{DataSourceMode, Settings, DEFAULT_SETTINGS_FILE};

#[derive(Parser)]
#[command(name = "testlens")]
#[command(author, version, about = "Test and defect insights for Azure DevOps", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Settings file path
    #[arg(short, long, global = true, default_value = DEFAULT_SETTINGS_FILE)]
    settings: PathBuf,

    /// Output file path (defaults to stdout)
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Pretty print JSON output
    #[arg(short, long, global = true, default_value_t = false)]
    pretty: bool,

    /// Azure DevOps organization (overrides the settings file)
    #[arg(long, global = true, env = "AZURE_DEVOPS_ORG")]
    organization: Option<String>,

    /// Azure DevOps personal access token (overrides the settings file)
    #[arg(long, global = true, env = "AZURE_DEVOPS_PAT", hide_env_values = true)]
    token: Option<String>,

    /// Azure DevOps base URL (overrides the settings file)
    #[arg(long, global = true)]
    base_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Collect test and defect data for a dashboard
    Collect {
        /// Data source (defaults to the settings file)
        #[arg(short, long, value_enum)]
        mode: Option<DataSourceMode>,

        /// Day to report on, YYYY-MM-DD (defaults to today)
        #[arg(short, long)]
        date: Option<NaiveDate>,

        /// Environment tag, e.g. QA or Prod (defaults to the settings file)
        #[arg(short, long)]
        environment: Option<String>,

        /// Project to collect, repeatable (defaults to enabled projects)
        #[arg(short = 'P', long = "project")]
        projects: Vec<String>,

        /// Also collect this day and report the differences
        #[arg(long)]
        compare_date: Option<NaiveDate>,

        /// Number of days in the trend series
        #[arg(long, default_value_t = DEFAULT_TREND_DAYS)]
        trend_days: u32,

        /// Defect state to include, repeatable (defaults to every state)
        #[arg(long = "state")]
        states: Vec<String>,

        /// Maximum number of builds per project (pipelines mode)
        #[arg(long)]
        build_limit: Option<u32>,
    },
    /// List the projects of the Azure DevOps organization
    Projects,
    /// Rewrite the settings file in the current format
    MigrateSettings,
}

impl Cli {
    pub async fn execute(&self) -> Result<()> {
        let mut settings = Settings::load(&self.settings)
            .with_context(|| format!("Failed to load settings from {}", self.settings.display()))?;

        match &self.command {
            Commands::Collect {
                mode,
                date,
                environment,
                projects,
                compare_date,
                trend_days,
                states,
                build_limit,
            } => {
                self.apply_overrides(&mut settings);

                let mut request = DashboardRequest::new(
                    environment
                        .clone()
                        .unwrap_or_else(|| settings.default_environment.clone()),
                    date.unwrap_or_else(|| Local::now().date_naive()),
                    mode.unwrap_or(settings.data_source),
                );
                request.projects.clone_from(projects);
                request.compare_date = *compare_date;
                request.trend_days = *trend_days;
                request.defect_states = (!states.is_empty()).then(|| states.clone());
                request.build_limit = *build_limit;

                info!(
                    "Collecting {} data for {} on {}",
                    request.mode, request.environment, request.date
                );

                let dashboard = load_dashboard(&settings, &request).await;
                self.write_output(&dashboard)
            }
            Commands::Projects => {
                self.apply_overrides(&mut settings);
                settings.azure.ensure_configured()?;

                let client = AzureDevOpsClient::new(
                    &settings.azure.base_url,
                    &settings.azure.organization,
                    Some(settings.azure.token()),
                )?;
                let projects = client.list_projects().await?;
                info!("Found {} projects", projects.len());

                self.write_output(&projects)
            }
            Commands::MigrateSettings => {
                settings.save(&self.settings)?;
                Ok(())
            }
        }
    }

    fn apply_overrides(&self, settings: &mut Settings) {
        if let Some(organization) = &self.organization {
            settings.azure.organization.clone_from(organization);
        }
        if let Some(token) = &self.token {
            settings.azure.personal_access_token.clone_from(token);
        }
        if let Some(base_url) = &self.base_url {
            settings.azure.base_url.clone_from(base_url);
        }
    }

    fn write_output<T: Serialize>(&self, value: &T) -> Result<()> {
        let json_output = if self.pretty {
            serde_json::to_string_pretty(value)?
        } else {
            serde_json::to_string(value)?
        };

        if let Some(output_path) = &self.output {
            std::fs::write(output_path, json_output)?;
            info!("Output written to: {}", output_path.display());
        } else {
            println!("{json_output}");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_collect_flags() {
        let cli = Cli::try_parse_from([
            "testlens",
            "collect",
            "--mode",
            "testplans",
            "--date",
            "2026-10-19",
            "-P",
            "Shop",
            "-P",
            "Portal",
            "--state",
            "Active",
            "--pretty",
        ])
        .unwrap();

        assert!(cli.pretty);
        match cli.command {
            Commands::Collect {
                mode,
                date,
                projects,
                states,
                trend_days,
                ..
            } => {
                assert_eq!(mode, Some(DataSourceMode::Testplans));
                assert_eq!(date, NaiveDate::from_ymd_opt(2026, 10, 19));
                assert_eq!(projects, vec!["Shop", "Portal"]);
                assert_eq!(states, vec!["Active"]);
                assert_eq!(trend_days, DEFAULT_TREND_DAYS);
            }
            _ => panic!("expected collect"),
        }
    }

    #[test]
    fn test_state_help_matches_unfiltered_default() {
        let mut command = <Cli as clap::CommandFactory>::command();
        let collect = command.find_subcommand_mut("collect").unwrap();

        let help = collect.render_long_help().to_string();

        assert!(help.contains("defaults to every state"));
        assert!(!help.contains("open states"));
    }

    #[test]
    fn test_rejects_malformed_date() {
        let result = Cli::try_parse_from(["testlens", "collect", "--date", "19.10.2026"]);

        assert!(result.is_err());
    }

    #[test]
    fn test_overrides_replace_file_values() {
        let cli = Cli::try_parse_from([
            "testlens",
            "projects",
            "--organization",
            "fabrikam",
            "--token",
            "secret",
            "--base-url",
            "https://ado.example.com",
        ])
        .unwrap();
        let mut settings = Settings::default();

        cli.apply_overrides(&mut settings);

        assert_eq!(settings.azure.organization, "fabrikam");
        assert_eq!(settings.azure.personal_access_token, "secret");
        assert_eq!(settings.azure.base_url, "https://ado.example.com");
    }
}
