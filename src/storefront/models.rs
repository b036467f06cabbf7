//! Data models for storefront products and page categories.
//!
//! Storefront JSON is loosely typed. Ids show up as numbers in
//! `/products/{handle}.js` and as strings in theme-embedded JSON. Tags are a
//! list in some payloads and a comma-joined string in others. Prices are
//! integer minor units from the storefront endpoint, but decimal strings
//! (`"30.00"`) in some embedded payloads. Everything is normalised at the
//! serde boundary so the evaluator only ever sees one shape.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// A storefront product as seen by the badge evaluator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Product {
    /// Platform product id, normalised to a string
    #[serde(deserialize_with = "ids::one")]
    pub id: String,
    /// URL slug
    #[serde(default)]
    pub handle: String,
    /// Display title
    #[serde(default)]
    pub title: String,
    /// Price in minor units (cents)
    #[serde(default, deserialize_with = "money::minor_units")]
    pub price: Option<i64>,
    /// Comparison ("was") price in minor units
    #[serde(default, deserialize_with = "money::minor_units")]
    pub compare_at_price: Option<i64>,
    /// Product tags as delivered by the storefront
    #[serde(default)]
    pub tags: Tags,
    /// Aggregate inventory when the payload carries one at the root
    #[serde(default)]
    pub inventory_quantity: Option<i64>,
    /// Purchasable variants
    #[serde(default)]
    pub variants: Vec<Variant>,
    /// Collection ids; `None` when the payload has no collection data at all
    #[serde(default, deserialize_with = "ids::optional_list")]
    pub collections: Option<Vec<String>>,
    #[serde(default)]
    pub vendor: Option<String>,
    #[serde(default, alias = "type")]
    pub product_type: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub featured_image: Option<String>,
}

impl Product {
    /// Returns the price in minor units, falling back to the first variant, then 0.
    pub fn price_minor(&self) -> i64 {
        self.price.or_else(|| self.variants.first().and_then(|v| v.price)).unwrap_or(0)
    }

    /// Returns the comparison price in minor units.
    ///
    /// A payload with a root price owns its comparison price too: a null root
    /// `compare_at_price` means "none" even if a variant carries one. Only
    /// payloads without root pricing fall back to the first variant.
    pub fn compare_at_minor(&self) -> Option<i64> {
        if self.price.is_some() {
            return self.compare_at_price;
        }
        self.compare_at_price.or_else(|| self.variants.first().and_then(|v| v.compare_at_price))
    }

    /// Copies the first variant's pricing to the root when the root has none.
    pub fn hoist_variant_pricing(&mut self) {
        if self.price.is_some() {
            return;
        }
        if let Some(variant) = self.variants.first() {
            self.price = variant.price;
            if self.compare_at_price.is_none() {
                self.compare_at_price = variant.compare_at_price;
            }
        }
    }

    /// Returns the price in major units (minor / 100).
    pub fn price_major(&self) -> f64 {
        self.price_minor() as f64 / 100.0
    }

    /// Total inventory: the root quantity if present, else the sum of variant
    /// quantities (missing ones count as 0), else 0.
    pub fn total_inventory(&self) -> i64 {
        if let Some(quantity) = self.inventory_quantity {
            return quantity;
        }
        self.variants.iter().map(|v| v.inventory_quantity.unwrap_or(0)).sum()
    }

    /// Returns the discount percentage, or `None` without a comparison price.
    pub fn discount_percent(&self) -> Option<u32> {
        self.compare_at_minor()
            .map(|compare| crate::rules::discount::calculate_discount(self.price_minor(), compare))
    }

    /// Returns the discount amount in minor units, or `None` without a comparison price.
    pub fn discount_amount_minor(&self) -> Option<i64> {
        self.compare_at_minor().map(|compare| (compare - self.price_minor()).max(0))
    }

    /// Lower-cased, trimmed, de-duplicated tag set.
    pub fn normalized_tags(&self) -> HashSet<String> {
        self.tags.normalized()
    }

    /// Returns true when the payload carried collection membership data.
    pub fn has_collection_data(&self) -> bool {
        self.collections.is_some()
    }
}

/// A purchasable variant of a [`Product`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Variant {
    #[serde(default, deserialize_with = "ids::optional")]
    pub id: Option<String>,
    #[serde(default, alias = "name")]
    pub title: String,
    #[serde(default, deserialize_with = "money::minor_units")]
    pub price: Option<i64>,
    #[serde(default, deserialize_with = "money::minor_units")]
    pub compare_at_price: Option<i64>,
    #[serde(default)]
    pub inventory_quantity: Option<i64>,
    #[serde(default)]
    pub available: Option<bool>,
}

/// Product tags, accepted either as a list or a comma-joined string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawTags")]
pub struct Tags(pub Vec<String>);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTags {
    List(Vec<String>),
    Joined(String),
    Null,
}

impl From<RawTags> for Tags {
    fn from(raw: RawTags) -> Self {
        match raw {
            RawTags::List(list) => Tags(list),
            RawTags::Joined(joined) => Tags::from_joined(&joined),
            RawTags::Null => Tags::default(),
        }
    }
}

impl Tags {
    /// Splits a comma-joined tag string, dropping empty entries.
    pub fn from_joined(joined: &str) -> Self {
        Tags(
            joined
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(String::from)
                .collect(),
        )
    }

    /// Returns the lower-cased tag set.
    pub fn normalized(&self) -> HashSet<String> {
        self.0
            .iter()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for Tags {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Tags(iter.into_iter().map(Into::into).collect())
    }
}

/// Storefront page categories a badge rule can be scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageType {
    Home,
    Product,
    Collection,
    Search,
    Cart,
    #[default]
    Other,
}

impl PageType {
    /// Returns the wire name rules use for this page type.
    pub fn as_str(&self) -> &'static str {
        match self {
            PageType::Home => "home",
            PageType::Product => "product",
            PageType::Collection => "collection",
            PageType::Search => "search",
            PageType::Cart => "cart",
            PageType::Other => "other",
        }
    }

    /// Returns all page types.
    pub fn all() -> &'static [PageType] {
        &[
            PageType::Home,
            PageType::Product,
            PageType::Collection,
            PageType::Search,
            PageType::Cart,
            PageType::Other,
        ]
    }
}

impl fmt::Display for PageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "home" | "index" => Ok(PageType::Home),
            "product" => Ok(PageType::Product),
            "collection" => Ok(PageType::Collection),
            "search" | "searchresults" => Ok(PageType::Search),
            "cart" => Ok(PageType::Cart),
            "other" => Ok(PageType::Other),
            _ => Err(format!(
                "Unknown page type: {}. Use: home, product, collection, search, cart, other",
                s
            )),
        }
    }
}

/// Deserializers for ids that arrive as numbers or strings.
pub(crate) mod ids {
    use super::*;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Int(i64),
        Float(f64),
        Text(String),
    }

    impl From<RawId> for String {
        fn from(raw: RawId) -> Self {
            match raw {
                RawId::Int(n) => n.to_string(),
                RawId::Float(f) => format!("{}", f as i64),
                RawId::Text(s) => s.trim().to_string(),
            }
        }
    }

    pub fn one<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        RawId::deserialize(d).map(String::from)
    }

    pub fn optional<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(Option::<RawId>::deserialize(d)?.map(String::from))
    }

    pub fn list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
        Ok(Option::<Vec<RawId>>::deserialize(d)?
            .unwrap_or_default()
            .into_iter()
            .map(String::from)
            .collect())
    }

    pub fn optional_list<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Option<Vec<String>>, D::Error> {
        Ok(Option::<Vec<RawId>>::deserialize(d)?
            .map(|list| list.into_iter().map(String::from).collect()))
    }
}

/// Deserializer for prices: integers are minor units, strings are decimal major units.
pub(crate) mod money {
    use super::*;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawMoney {
        Int(i64),
        Float(f64),
        Text(String),
    }

    pub fn minor_units<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
        Ok(Option::<RawMoney>::deserialize(d)?.and_then(|raw| match raw {
            RawMoney::Int(n) => Some(n),
            RawMoney::Float(f) => Some(f.round() as i64),
            RawMoney::Text(s) => parse_major(&s),
        }))
    }

    /// Parses a decimal major-unit string such as `"30.00"` into minor units.
    pub fn parse_major(text: &str) -> Option<i64> {
        let cleaned: String =
            text.chars().filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-').collect();
        if cleaned.is_empty() {
            return None;
        }
        cleaned.parse::<f64>().ok().map(|major| (major * 100.0).round() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_product() -> Product {
        Product {
            id: "101".to_string(),
            handle: "linen-shirt".to_string(),
            title: "Linen Shirt".to_string(),
            price: Some(7500),
            compare_at_price: Some(10000),
            tags: Tags(vec!["Sale".to_string(), "Summer ".to_string()]),
            ..Default::default()
        }
    }

    #[test]
    fn test_deserialize_storefront_js() {
        let json = r#"{
            "id": 6789012345678,
            "title": "Linen Shirt",
            "handle": "linen-shirt",
            "price": 7500,
            "compare_at_price": 10000,
            "tags": ["Sale", "Summer"],
            "type": "Shirts",
            "variants": [
                {"id": 1, "title": "S", "price": 7500, "inventory_quantity": 3, "available": true},
                {"id": 2, "title": "M", "price": 7500, "inventory_quantity": null}
            ]
        }"#;

        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.id, "6789012345678");
        assert_eq!(product.price, Some(7500));
        assert_eq!(product.compare_at_price, Some(10000));
        assert_eq!(product.product_type.as_deref(), Some("Shirts"));
        assert_eq!(product.variants.len(), 2);
        assert_eq!(product.variants[0].id.as_deref(), Some("1"));
        assert!(product.collections.is_none());
    }

    #[test]
    fn test_deserialize_comma_joined_tags() {
        let json = r#"{"id": "55", "tags": "Sale, New Arrival,,summer"}"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.tags.0, vec!["Sale", "New Arrival", "summer"]);
    }

    #[test]
    fn test_deserialize_null_tags() {
        let product: Product = serde_json::from_str(r#"{"id": 9, "tags": null}"#).unwrap();
        assert!(product.tags.is_empty());
    }

    #[test]
    fn test_deserialize_decimal_string_prices() {
        let json = r#"{"id": 1, "price": "30.00", "compare_at_price": null}"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.price, Some(3000));
        assert!(product.compare_at_price.is_none());
    }

    #[test]
    fn test_deserialize_collections_mixed_ids() {
        let json = r#"{"id": 1, "collections": [123, "456"]}"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.collections, Some(vec!["123".to_string(), "456".to_string()]));
        assert!(product.has_collection_data());
    }

    #[test]
    fn test_normalized_tags() {
        let tags = make_product().normalized_tags();
        assert!(tags.contains("sale"));
        assert!(tags.contains("summer"));
        assert_eq!(tags.len(), 2);
    }

    #[test]
    fn test_total_inventory_from_variants() {
        let product = Product {
            id: "1".into(),
            variants: vec![
                Variant { inventory_quantity: Some(3), ..Default::default() },
                Variant { inventory_quantity: None, ..Default::default() },
                Variant { inventory_quantity: Some(2), ..Default::default() },
            ],
            ..Default::default()
        };
        assert_eq!(product.total_inventory(), 5);
    }

    #[test]
    fn test_total_inventory_prefers_root() {
        let product = Product {
            id: "1".into(),
            inventory_quantity: Some(12),
            variants: vec![Variant { inventory_quantity: Some(3), ..Default::default() }],
            ..Default::default()
        };
        assert_eq!(product.total_inventory(), 12);
    }

    #[test]
    fn test_total_inventory_defaults_to_zero() {
        let product = Product { id: "1".into(), ..Default::default() };
        assert_eq!(product.total_inventory(), 0);
    }

    #[test]
    fn test_price_falls_back_to_first_variant() {
        let product = Product {
            id: "1".into(),
            variants: vec![Variant {
                price: Some(1999),
                compare_at_price: Some(2999),
                ..Default::default()
            }],
            ..Default::default()
        };
        assert_eq!(product.price_minor(), 1999);
        assert_eq!(product.compare_at_minor(), Some(2999));
        assert!((product.price_major() - 19.99).abs() < f64::EPSILON);
    }

    #[test]
    fn test_null_root_compare_at_ignores_variant() {
        let product: Product = serde_json::from_str(
            r#"{"id": 1, "price": 3000, "compare_at_price": null,
                "variants": [{"price": 3000, "compare_at_price": 3000}]}"#,
        )
        .unwrap();
        assert_eq!(product.compare_at_minor(), None);
        assert_eq!(product.discount_percent(), None);
        assert_eq!(product.discount_amount_minor(), None);
    }

    #[test]
    fn test_hoist_variant_pricing() {
        let mut product = Product {
            id: "1".into(),
            variants: vec![Variant {
                price: Some(1999),
                compare_at_price: Some(2999),
                ..Default::default()
            }],
            ..Default::default()
        };
        product.hoist_variant_pricing();
        assert_eq!(product.price, Some(1999));
        assert_eq!(product.compare_at_price, Some(2999));

        let mut priced = Product { id: "2".into(), price: Some(500), ..product.clone() };
        priced.compare_at_price = None;
        priced.hoist_variant_pricing();
        assert_eq!(priced.compare_at_price, None);
    }

    #[test]
    fn test_discount_helpers() {
        let product = make_product();
        assert_eq!(product.discount_percent(), Some(25));
        assert_eq!(product.discount_amount_minor(), Some(2500));

        let mut product = make_product();
        product.compare_at_price = None;
        assert!(product.discount_percent().is_none());
        assert!(product.discount_amount_minor().is_none());
    }

    #[test]
    fn test_page_type_parsing() {
        assert_eq!("product".parse::<PageType>().unwrap(), PageType::Product);
        assert_eq!("Collection".parse::<PageType>().unwrap(), PageType::Collection);
        assert_eq!("index".parse::<PageType>().unwrap(), PageType::Home);
        assert_eq!("searchresults".parse::<PageType>().unwrap(), PageType::Search);
        assert!("blog".parse::<PageType>().unwrap_err().contains("Unknown page type"));
    }

    #[test]
    fn test_page_type_display_roundtrip() {
        for page_type in PageType::all() {
            assert_eq!(page_type.to_string().parse::<PageType>().unwrap(), *page_type);
        }
    }

    #[test]
    fn test_parse_major() {
        assert_eq!(money::parse_major("30.00"), Some(3000));
        assert_eq!(money::parse_major("$19.99"), Some(1999));
        assert_eq!(money::parse_major(""), None);
    }
}
