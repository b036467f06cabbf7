//! Badge element construction: id, label, classes and inline style.

pub mod placement;
pub mod style;
pub mod template;

use crate::config::Config;
use crate::rules::BadgeRule;
use crate::storefront::models::Product;
use serde::Serialize;

pub use placement::{Placement, Position};
pub use template::{render_text, TemplateData};

/// Rendering knobs shared by every badge in a session.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSettings {
    pub id_prefix: String,
    pub class_prefix: String,
    pub z_index: i32,
    pub stack_spacing_px: u32,
    /// ISO 4217 code used for the `{currency}` token
    pub currency: String,
}

impl RenderSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            id_prefix: config.id_prefix.clone(),
            class_prefix: config.class_prefix.clone(),
            z_index: config.z_index,
            stack_spacing_px: config.stack_spacing_px,
            currency: config.currency.clone(),
        }
    }
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Deterministic element id: `{prefix}-{productId}-{badgeId}`.
pub fn element_id(prefix: &str, product_id: &str, badge_id: &str) -> String {
    format!("{}-{}-{}", prefix, product_id, badge_id)
}

/// A rendered badge `<div>`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BadgeElement {
    pub id: String,
    pub rule_id: String,
    pub product_id: String,
    pub text: String,
    pub classes: Vec<String>,
    pub style: String,
    pub position: u8,
    pub stack_index: usize,
}

impl BadgeElement {
    /// Builds the element for an admitted rule.
    pub fn build(
        rule: &BadgeRule,
        product: &Product,
        placement: Placement,
        settings: &RenderSettings,
    ) -> Self {
        let data = TemplateData::from_product(product, &settings.currency);

        Self {
            id: element_id(&settings.id_prefix, &product.id, &rule.id),
            rule_id: rule.id.clone(),
            product_id: product.id.clone(),
            text: render_text(&rule.text, &data),
            classes: style::badge_classes(&settings.class_prefix, rule, &placement),
            style: style::inline_style(
                rule,
                &placement,
                settings.z_index,
                settings.stack_spacing_px,
            ),
            position: placement.position.cell(),
            stack_index: placement.stack_index,
        }
    }

    /// Serializes the element as an HTML fragment.
    pub fn to_html(&self) -> String {
        format!(
            r#"<div id="{}" class="{}" style="{}" data-badge-id="{}">{}</div>"#,
            escape_html(&self.id),
            escape_html(&self.classes.join(" ")),
            escape_html(&self.style),
            escape_html(&self.rule_id),
            escape_html(&self.text)
        )
    }
}

/// Escapes text for use in HTML content and double-quoted attributes.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
