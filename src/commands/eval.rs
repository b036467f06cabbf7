//! Offline evaluation of badge rules against a product file.

use crate::badge::{render_text, Position, TemplateData};
use crate::config::Config;
use crate::format::Formatter;
use crate::rules::schedule::parse_rule_date;
use crate::rules::{parse_rules, BadgeRule, CompiledRule, EvalContext};
use crate::storefront::models::{PageType, Product};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info};

/// Outcome of one rule for one product.
#[derive(Debug, Clone, Serialize)]
pub struct RuleVerdict {
    pub rule_id: String,
    pub rule_name: String,
    pub admitted: bool,
    /// Rendered label, for admitted rules
    pub text: Option<String>,
    pub position: u8,
    /// Description of the first predicate that failed
    pub rejected_by: Option<String>,
}

/// Evaluates rules from a file against a product from a file.
pub struct EvalCommand {
    config: Config,
}

impl EvalCommand {
    /// Creates a new eval command.
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Prints the badges the product would receive.
    pub fn execute(
        &self,
        rules_path: &Path,
        product_path: &Path,
        page_type: PageType,
        at: Option<&str>,
    ) -> Result<String> {
        let verdicts = self.run(rules_path, product_path, page_type, at)?;
        let admitted: Vec<_> = verdicts.into_iter().filter(|v| v.admitted).collect();

        info!("{} badges admitted", admitted.len());
        Ok(Formatter::new(self.config.format).format_verdicts(&admitted))
    }

    /// Prints every rule with its verdict and, for rejections, the failing predicate.
    pub fn explain(
        &self,
        rules_path: &Path,
        product_path: &Path,
        page_type: PageType,
        at: Option<&str>,
    ) -> Result<String> {
        let verdicts = self.run(rules_path, product_path, page_type, at)?;
        Ok(Formatter::new(self.config.format).format_verdicts(&verdicts))
    }

    fn run(
        &self,
        rules_path: &Path,
        product_path: &Path,
        page_type: PageType,
        at: Option<&str>,
    ) -> Result<Vec<RuleVerdict>> {
        let rules = load_rules(rules_path)?;
        let product = load_product(product_path)?;
        let now = match at {
            Some(value) => parse_rule_date(value).context("Invalid --at date")?,
            None => Utc::now(),
        };

        debug!("Evaluating {} rules for product {} on {} page", rules.len(), product.id, page_type);
        Ok(self.verdicts(rules, &product, page_type, now))
    }

    /// Evaluates `rules` in session order (priority first, stable).
    pub fn verdicts(
        &self,
        mut rules: Vec<BadgeRule>,
        product: &Product,
        page_type: PageType,
        now: DateTime<Utc>,
    ) -> Vec<RuleVerdict> {
        rules.sort_by(|a, b| b.priority.cmp(&a.priority));

        let tags = product.normalized_tags();
        let ctx = EvalContext { product, tags: &tags, page_type, now };
        let data = TemplateData::from_product(product, &self.config.currency);

        rules
            .into_iter()
            .map(|rule| {
                let position = Position::or_default(rule.position).cell();
                let rejected_by = match rule.validate() {
                    Err(e) => Some(e.to_string()),
                    Ok(()) => CompiledRule::new(rule.clone()).chain.first_rejection(&ctx),
                };
                let admitted = rejected_by.is_none();

                RuleVerdict {
                    rule_id: rule.id.clone(),
                    rule_name: rule.label().to_string(),
                    admitted,
                    text: admitted.then(|| render_text(&rule.text, &data)),
                    position,
                    rejected_by,
                }
            })
            .collect()
    }
}

/// Loads rules from `{"badges": [...]}` or a bare array.
pub fn load_rules(path: &Path) -> Result<Vec<BadgeRule>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read rules file: {}", path.display()))?;

    parse_rules(&content).with_context(|| format!("Failed to parse rules file: {}", path.display()))
}

/// Loads a product from storefront JSON, bare or wrapped as `{"product": {...}}`.
pub fn load_product(path: &Path) -> Result<Product> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read product file: {}", path.display()))?;

    let mut value: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse product file: {}", path.display()))?;
    if let Some(inner) = value.get_mut("product").filter(|p| p.is_object()).map(|p| p.take()) {
        value = inner;
    }

    serde_json::from_value(value)
        .with_context(|| format!("Failed to parse product file: {}", path.display()))
}
