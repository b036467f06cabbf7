//! Scan command implementation.

use crate::badge::RenderSettings;
use crate::commands::eval::load_rules;
use crate::config::Config;
use crate::format::Formatter;
use crate::rules::BadgeRule;
use crate::scan::{ScanController, ScanSession};
use crate::storefront::page;
use crate::storefront::{StorefrontClient, StorefrontSource};
use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::{info, warn};

/// Scans a storefront page and reports the badges it would carry.
pub struct ScanCommand {
    config: Config,
    html_out: Option<PathBuf>,
    rules_file: Option<PathBuf>,
}

impl ScanCommand {
    /// Creates a new scan command.
    pub fn new(config: Config) -> Self {
        Self { config, html_out: None, rules_file: None }
    }

    /// Writes the annotated page to `path` after the scan.
    pub fn html_out(mut self, path: Option<PathBuf>) -> Self {
        self.html_out = path;
        self
    }

    /// Loads rules from a local file instead of the rule endpoint.
    pub fn rules_file(mut self, path: Option<PathBuf>) -> Self {
        self.rules_file = path;
        self
    }

    /// Executes the scan and returns formatted output.
    pub async fn execute(&self, url: &str) -> Result<String> {
        let store_url =
            page::origin(url).with_context(|| format!("Not an absolute URL: {}", url))?;
        let client = StorefrontClient::new(&self.config, store_url)
            .context("Failed to create HTTP client")?;

        self.execute_with_client(&client, url).await
    }

    /// Executes the scan with a provided source (for testing).
    pub async fn execute_with_client(
        &self,
        client: &impl StorefrontSource,
        url: &str,
    ) -> Result<String> {
        info!("Scanning: {}", url);

        let html = client.page(url).await.with_context(|| format!("Failed to fetch {}", url))?;
        let rules = self.fetch_rules(client).await?;

        let mut session = ScanSession::new(rules, RenderSettings::from_config(&self.config))
            .with_debug(self.config.debug);
        if !session.has_rules() {
            warn!("No usable badge rules; the page will be scanned without badges");
        }

        let report = ScanController::new(client, &self.config).run(&mut session, url, html).await;

        if let Some(path) = &self.html_out {
            std::fs::write(path, &report.annotated_html)
                .with_context(|| format!("Failed to write annotated HTML: {}", path.display()))?;
            info!("Wrote annotated page to {}", path.display());
        }

        let formatter = Formatter::new(self.config.format);
        Ok(formatter.format_report(&report))
    }

    /// A rules file must load. A failing endpoint only leaves the scan without rules.
    async fn fetch_rules(&self, client: &impl StorefrontSource) -> Result<Vec<BadgeRule>> {
        if let Some(path) = &self.rules_file {
            return load_rules(path);
        }

        match client.rules().await {
            Ok(rules) => Ok(rules),
            Err(e) => {
                warn!("Could not load badge rules: {}", e);
                Ok(Vec::new())
            }
        }
    }
}
