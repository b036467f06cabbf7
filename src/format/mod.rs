//! Output formatting for scan reports and rule verdicts (table, JSON, markdown, CSV).

use crate::commands::eval::RuleVerdict;
use crate::config::OutputFormat;
use crate::scan::{AppliedBadge, ScanReport};

/// Formats command results for output.
pub struct Formatter {
    format: OutputFormat,
}

impl Formatter {
    /// Creates a new formatter.
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats a finished scan.
    pub fn format_report(&self, report: &ScanReport) -> String {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(report).unwrap_or_else(|_| "{}".to_string())
            }
            OutputFormat::Table => self.table_report(report),
            OutputFormat::Markdown => self.markdown_report(report),
            OutputFormat::Csv => self.csv_badges(&report.badges),
        }
    }

    /// Formats per-rule verdicts from an offline evaluation.
    pub fn format_verdicts(&self, verdicts: &[RuleVerdict]) -> String {
        if verdicts.is_empty() {
            return match self.format {
                OutputFormat::Json => "[]".to_string(),
                OutputFormat::Csv => self.csv_verdict_header(),
                _ => "No badge rules loaded.".to_string(),
            };
        }

        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(verdicts).unwrap_or_else(|_| "[]".to_string())
            }
            OutputFormat::Table => self.table_verdicts(verdicts),
            OutputFormat::Markdown => self.markdown_verdicts(verdicts),
            OutputFormat::Csv => self.csv_verdicts(verdicts),
        }
    }

    // Table formatting

    fn table_report(&self, report: &ScanReport) -> String {
        let mut lines = Vec::new();

        lines.push(format!("URL:       {}", report.url));
        lines.push(format!("Page type: {}", report.page_type));
        if let Some(source) = report.product_source {
            lines.push(format!("Product:   via {}", source));
        }
        lines.push(format!(
            "Passes:    {} (stopped: {})",
            report.stats.passes,
            stop_label(report)
        ));
        lines.push(format!(
            "Found:     {} links, {} containers, {} fetch failures",
            report.stats.links_seen, report.stats.containers_resolved, report.stats.fetch_failures
        ));
        lines.push(String::new());

        if report.badges.is_empty() {
            lines.push("No badges applied.".to_string());
            return lines.join("\n");
        }

        lines.push(self.table_badges(&report.badges));
        lines.join("\n")
    }

    fn table_badges(&self, badges: &[AppliedBadge]) -> String {
        let product_width = 30;
        let badge_width = 16;
        let text_width = 20;
        let pos_width = 3;

        let mut lines = Vec::new();

        lines.push(format!(
            "{:<product_width$}  {:<badge_width$}  {:<text_width$}  {:>pos_width$}  {}",
            "Product", "Badge", "Text", "Pos", "Element"
        ));
        lines.push(format!(
            "{:-<product_width$}  {:-<badge_width$}  {:-<text_width$}  {:-<pos_width$}  {:-<20}",
            "", "", "", "", ""
        ));

        for badge in badges {
            let position = if badge.stack_index > 0 {
                format!("{}+{}", badge.position, badge.stack_index)
            } else {
                badge.position.to_string()
            };

            lines.push(format!(
                "{:<product_width$}  {:<badge_width$}  {:<text_width$}  {:>pos_width$}  {}",
                truncate(product_name(badge), product_width),
                truncate(&badge.rule_name, badge_width),
                truncate(&badge.text, text_width),
                position,
                badge.element_id
            ));
        }

        lines.push(String::new());
        lines.push(format!("Total: {} badges", badges.len()));

        lines.join("\n")
    }

    fn table_verdicts(&self, verdicts: &[RuleVerdict]) -> String {
        let id_width = 8;
        let name_width = 20;
        let result_width = 6;

        let mut lines = Vec::new();

        lines.push(format!(
            "{:<id_width$}  {:<name_width$}  {:<result_width$}  {}",
            "Rule", "Name", "Result", "Detail"
        ));
        lines.push(format!(
            "{:-<id_width$}  {:-<name_width$}  {:-<result_width$}  {:-<30}",
            "", "", "", ""
        ));

        for verdict in verdicts {
            lines.push(format!(
                "{:<id_width$}  {:<name_width$}  {:<result_width$}  {}",
                truncate(&verdict.rule_id, id_width),
                truncate(&verdict.rule_name, name_width),
                if verdict.admitted { "admit" } else { "reject" },
                verdict_detail(verdict)
            ));
        }

        let admitted = verdicts.iter().filter(|v| v.admitted).count();
        lines.push(String::new());
        lines.push(format!("Admitted: {} of {} rules", admitted, verdicts.len()));

        lines.join("\n")
    }

    // Markdown formatting

    fn markdown_report(&self, report: &ScanReport) -> String {
        let mut lines = Vec::new();

        lines.push(format!("## Badges for {}", report.url));
        lines.push(String::new());
        lines.push(format!("- **Page type:** {}", report.page_type));
        lines.push(format!("- **Passes:** {} ({})", report.stats.passes, stop_label(report)));
        lines.push(format!(
            "- **Containers:** {} of {} links",
            report.stats.containers_resolved, report.stats.links_seen
        ));
        lines.push(String::new());

        if report.badges.is_empty() {
            lines.push("*No badges applied*".to_string());
            return lines.join("\n");
        }

        lines.push("| Product | Badge | Text | Position | Element |".to_string());
        lines.push("|---------|-------|------|----------|---------|".to_string());

        for badge in &report.badges {
            lines.push(format!(
                "| {} | {} | {} | {} | `{}` |",
                markdown_escape(product_name(badge)),
                markdown_escape(&badge.rule_name),
                markdown_escape(&badge.text),
                badge.position,
                badge.element_id
            ));
        }

        lines.push(String::new());
        lines.push(format!("*{} badges applied*", report.badges.len()));

        lines.join("\n")
    }

    fn markdown_verdicts(&self, verdicts: &[RuleVerdict]) -> String {
        let mut lines = Vec::new();

        lines.push("| Rule | Name | Result | Detail |".to_string());
        lines.push("|------|------|--------|--------|".to_string());

        for verdict in verdicts {
            lines.push(format!(
                "| {} | {} | {} | {} |",
                verdict.rule_id,
                markdown_escape(&verdict.rule_name),
                if verdict.admitted { "✓" } else { "✗" },
                markdown_escape(&verdict_detail(verdict))
            ));
        }

        lines.join("\n")
    }

    // CSV formatting

    fn csv_badge_header(&self) -> String {
        "container,product_id,handle,title,rule_id,rule_name,text,position,stack_index,element_id"
            .to_string()
    }

    fn csv_badges(&self, badges: &[AppliedBadge]) -> String {
        let mut lines = Vec::new();
        lines.push(self.csv_badge_header());

        for badge in badges {
            lines.push(format!(
                "{},{},{},{},{},{},{},{},{},{}",
                Self::csv_escape(&badge.container),
                Self::csv_escape(&badge.product_id),
                Self::csv_escape(&badge.product_handle),
                Self::csv_escape(&badge.product_title),
                Self::csv_escape(&badge.rule_id),
                Self::csv_escape(&badge.rule_name),
                Self::csv_escape(&badge.text),
                badge.position,
                badge.stack_index,
                Self::csv_escape(&badge.element_id)
            ));
        }

        lines.join("\n")
    }

    fn csv_verdict_header(&self) -> String {
        "rule_id,rule_name,admitted,text,position,rejected_by".to_string()
    }

    fn csv_verdicts(&self, verdicts: &[RuleVerdict]) -> String {
        let mut lines = Vec::new();
        lines.push(self.csv_verdict_header());

        for verdict in verdicts {
            lines.push(format!(
                "{},{},{},{},{},{}",
                Self::csv_escape(&verdict.rule_id),
                Self::csv_escape(&verdict.rule_name),
                verdict.admitted,
                verdict.text.as_deref().map(Self::csv_escape).unwrap_or_default(),
                verdict.position,
                verdict.rejected_by.as_deref().map(Self::csv_escape).unwrap_or_default()
            ));
        }

        lines.join("\n")
    }

    fn csv_escape(s: &str) -> String {
        if s.contains(',') || s.contains('"') || s.contains('\n') {
            format!("\"{}\"", s.replace('"', "\"\""))
        } else {
            s.to_string()
        }
    }
}

fn product_name(badge: &AppliedBadge) -> &str {
    if !badge.product_title.is_empty() {
        &badge.product_title
    } else if !badge.product_handle.is_empty() {
        &badge.product_handle
    } else {
        &badge.product_id
    }
}

fn stop_label(report: &ScanReport) -> String {
    serde_json::to_value(report.stop_reason)
        .ok()
        .and_then(|v| v.as_str().map(|s| s.replace('_', " ")))
        .unwrap_or_default()
}

fn verdict_detail(verdict: &RuleVerdict) -> String {
    match (&verdict.text, &verdict.rejected_by) {
        (Some(text), _) if verdict.admitted => format!("\"{}\" at {}", text, verdict.position),
        (_, Some(reason)) => reason.clone(),
        _ => String::new(),
    }
}

/// Truncates to `width` characters, marking the cut with `...`.
fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let kept: String = text.chars().take(width.saturating_sub(3)).collect();
    format!("{}...", kept)
}

fn markdown_escape(text: &str) -> String {
    text.replace('|', "\\|")
}
