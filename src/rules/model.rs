//! Badge rule records as served by the badge configuration endpoint.

use crate::error::BadgeError;
use crate::rules::schedule::parse_rule_date;
use crate::storefront::models::ids;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// A server-configured badge: eligibility predicates plus a visual template.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgeRule {
    #[serde(deserialize_with = "ids::one")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Inactive rules never match
    #[serde(default)]
    pub active: bool,
    /// Higher priority rules are evaluated and stacked first
    #[serde(default)]
    pub priority: i32,

    #[serde(default)]
    pub shape: Shape,
    #[serde(default)]
    pub animation: Animation,
    /// Grid cell 1..=9 (1 top-left, 5 centre, 9 bottom-right)
    #[serde(default = "default_position")]
    pub position: u8,
    /// Label template, e.g. `"-{discount}%"`
    #[serde(default, alias = "label")]
    pub text: String,
    #[serde(default = "default_background_color")]
    pub background_color: String,
    #[serde(default = "default_text_color")]
    pub text_color: String,
    #[serde(default)]
    pub border_color: Option<String>,
    #[serde(default = "default_font_size")]
    pub font_size: u16,
    #[serde(default = "default_padding")]
    pub padding: String,
    #[serde(default)]
    pub border_radius: Option<u16>,

    /// "all" or a page type name; absent means all pages
    #[serde(default)]
    pub page_type: Option<String>,
    #[serde(default, deserialize_with = "ids::list")]
    pub included_products: Vec<String>,
    #[serde(default, deserialize_with = "ids::list")]
    pub excluded_products: Vec<String>,
    #[serde(default, deserialize_with = "ids::list")]
    pub included_collections: Vec<String>,
    #[serde(default, deserialize_with = "ids::list")]
    pub excluded_collections: Vec<String>,
    #[serde(default)]
    pub included_tags: Vec<String>,
    #[serde(default)]
    pub excluded_tags: Vec<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub inventory_min: Option<i64>,
    #[serde(default)]
    pub inventory_max: Option<i64>,
    /// Major currency units
    #[serde(default)]
    pub price_min: Option<f64>,
    /// Major currency units
    #[serde(default)]
    pub price_max: Option<f64>,
    #[serde(default)]
    pub min_discount_percent: Option<u32>,
}

fn default_position() -> u8 {
    1
}

fn default_background_color() -> String {
    "#e53935".to_string()
}

fn default_text_color() -> String {
    "#ffffff".to_string()
}

fn default_font_size() -> u16 {
    12
}

fn default_padding() -> String {
    "4px 8px".to_string()
}

impl BadgeRule {
    /// Creates an active rule with default styling and no constraints.
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            active: true,
            priority: 0,
            shape: Shape::default(),
            animation: Animation::default(),
            position: default_position(),
            text: text.into(),
            background_color: default_background_color(),
            text_color: default_text_color(),
            border_color: None,
            font_size: default_font_size(),
            padding: default_padding(),
            border_radius: None,
            page_type: None,
            included_products: Vec::new(),
            excluded_products: Vec::new(),
            included_collections: Vec::new(),
            excluded_collections: Vec::new(),
            included_tags: Vec::new(),
            excluded_tags: Vec::new(),
            start_date: None,
            end_date: None,
            inventory_min: None,
            inventory_max: None,
            price_min: None,
            price_max: None,
            min_discount_percent: None,
        }
    }

    /// Display name for logs and reports.
    pub fn label(&self) -> &str {
        self.name.as_deref().filter(|n| !n.is_empty()).unwrap_or(&self.text)
    }

    /// Checks the rule for settings that can never be satisfied or rendered.
    pub fn validate(&self) -> Result<(), BadgeError> {
        let invalid = |reason: String| BadgeError::InvalidRule { id: self.id.clone(), reason };

        if !(1..=9).contains(&self.position) {
            return Err(invalid(format!("position {} out of range 1-9", self.position)));
        }

        if let (Some(min), Some(max)) = (self.price_min, self.price_max) {
            if min > max {
                return Err(invalid(format!("priceMin {} exceeds priceMax {}", min, max)));
            }
        }

        if let (Some(min), Some(max)) = (self.inventory_min, self.inventory_max) {
            if min > max {
                return Err(invalid(format!("inventoryMin {} exceeds inventoryMax {}", min, max)));
            }
        }

        if let Some(percent) = self.min_discount_percent {
            if percent > 100 {
                return Err(invalid(format!("minDiscountPercent {} above 100", percent)));
            }
        }

        for date in [&self.start_date, &self.end_date].into_iter().flatten() {
            if let Err(e) = parse_rule_date(date) {
                return Err(invalid(e.to_string()));
            }
        }

        // These land verbatim in the inline style attribute
        let colors = [
            ("backgroundColor", Some(&self.background_color)),
            ("textColor", Some(&self.text_color)),
            ("borderColor", self.border_color.as_ref()),
        ];
        for (field, value) in colors {
            if let Some(value) = value.filter(|v| !is_css_color(v)) {
                return Err(invalid(format!("{} {:?} is not a colour", field, value)));
            }
        }

        if !is_css_length_list(&self.padding) {
            return Err(invalid(format!("padding {:?} is not a list of lengths", self.padding)));
        }

        Ok(())
    }
}

/// Hex colours, colour keywords and `rgb()`/`hsl()` functions.
fn is_css_color(value: &str) -> bool {
    let value = value.trim();

    if let Some(hex) = value.strip_prefix('#') {
        return matches!(hex.len(), 3 | 4 | 6 | 8) && hex.chars().all(|c| c.is_ascii_hexdigit());
    }

    if let Some(open) = value.find('(') {
        let Some(args) = value[open + 1..].strip_suffix(')') else {
            return false;
        };
        return matches!(value[..open].to_ascii_lowercase().as_str(), "rgb" | "rgba" | "hsl" | "hsla")
            && args.chars().all(|c| c.is_ascii_alphanumeric() || " .,%/-".contains(c));
    }

    !value.is_empty() && value.chars().all(|c| c.is_ascii_alphabetic())
}

/// One to four lengths such as `4px 8px` or `0.25em`.
fn is_css_length_list(value: &str) -> bool {
    let parts: Vec<&str> = value.split_whitespace().collect();
    (1..=4).contains(&parts.len()) && parts.iter().all(|part| is_css_length(part))
}

fn is_css_length(token: &str) -> bool {
    let number_end =
        token.find(|c: char| !(c.is_ascii_digit() || c == '.')).unwrap_or(token.len());
    number_end > 0 && matches!(&token[number_end..], "" | "px" | "em" | "rem" | "%")
}

/// Response body of the badge configuration endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RuleResponse {
    #[serde(default)]
    pub badges: Vec<serde_json::Value>,
}

impl RuleResponse {
    /// Deserializes each badge on its own, skipping malformed ones.
    pub fn into_rules(self) -> Vec<BadgeRule> {
        self.badges
            .into_iter()
            .enumerate()
            .filter_map(|(idx, raw)| match serde_json::from_value::<BadgeRule>(raw) {
                Ok(rule) => Some(rule),
                Err(e) => {
                    warn!("Skipping malformed badge #{}: {}", idx, e);
                    None
                }
            })
            .collect()
    }
}

/// Parses a rule document: either `{"badges": [...]}` or a bare array.
pub fn parse_rules(body: &str) -> Result<Vec<BadgeRule>, BadgeError> {
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| BadgeError::json("badge rules", e))?;

    let response = match value {
        serde_json::Value::Array(badges) => RuleResponse { badges },
        other => serde_json::from_value(other).map_err(|e| BadgeError::json("badge rules", e))?,
    };

    Ok(response.into_rules())
}

/// Badge outline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shape {
    Rounded,
    Pill,
    Circle,
    Ribbon,
    Star,
    Tag,
    /// Also stands in for shapes this crate does not know.
    #[default]
    #[serde(other)]
    Rectangle,
}

impl Shape {
    pub fn all() -> &'static [Shape] {
        &[
            Shape::Rectangle,
            Shape::Rounded,
            Shape::Pill,
            Shape::Circle,
            Shape::Ribbon,
            Shape::Star,
            Shape::Tag,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Shape::Rectangle => "rectangle",
            Shape::Rounded => "rounded",
            Shape::Pill => "pill",
            Shape::Circle => "circle",
            Shape::Ribbon => "ribbon",
            Shape::Star => "star",
            Shape::Tag => "tag",
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Badge animation class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Animation {
    Pulse,
    Bounce,
    Shake,
    Glow,
    #[default]
    #[serde(other)]
    None,
}

impl Animation {
    pub fn all() -> &'static [Animation] {
        &[Animation::None, Animation::Pulse, Animation::Bounce, Animation::Shake, Animation::Glow]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Animation::None => "none",
            Animation::Pulse => "pulse",
            Animation::Bounce => "bounce",
            Animation::Shake => "shake",
            Animation::Glow => "glow",
        }
    }
}

impl fmt::Display for Animation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
