//! Extraction of the current product from a product detail page.
//!
//! Themes expose product data in different places. Each place is a named
//! [`ProductSource`]; [`extract_product`] tries them in order and the first
//! one that yields a product wins.

use crate::storefront::models::{money, Product, Variant};
use crate::storefront::page::handle_from_url;
use crate::storefront::selectors::detail;
use scraper::Html;
use serde_json::Value;
use tracing::{debug, trace};

/// A strategy for reading the current product out of a page.
pub trait ProductSource: Send + Sync {
    /// Short name used in logs and reports.
    fn name(&self) -> &'static str;

    fn extract(&self, document: &Html) -> Option<Product>;
}

/// Storefront analytics globals: `var meta = {"product": {...}}`.
pub struct ShopAnalyticsMeta;

impl ProductSource for ShopAnalyticsMeta {
    fn name(&self) -> &'static str {
        "analytics-meta"
    }

    fn extract(&self, document: &Html) -> Option<Product> {
        let meta = document.select(&detail::SCRIPT).find_map(|script| {
            let text = script.text().collect::<String>();
            json_value_after(&text, "var meta =")
                .or_else(|| json_value_after(&text, "ShopifyAnalytics.meta ="))
        })?;

        let raw = meta.get("product")?;
        let mut product: Product = match serde_json::from_value(raw.clone()) {
            Ok(product) => product,
            Err(e) => {
                debug!("Analytics meta product did not parse: {}", e);
                return None;
            }
        };

        // Analytics payloads price only their variants
        product.hoist_variant_pricing();

        // Analytics payloads carry neither handle nor title.
        if product.handle.is_empty() {
            product.handle = canonical_handle(document).unwrap_or_default();
        }
        if product.title.is_empty() {
            if let Some(variant) = raw.pointer("/variants/0/name").and_then(Value::as_str) {
                product.title =
                    variant.split(" - ").next().unwrap_or(variant).trim().to_string();
            }
        }

        Some(product)
    }
}

/// Theme-embedded product JSON (`<script data-product-json>`, `#ProductJson-*`).
pub struct ProductJsonScript;

impl ProductSource for ProductJsonScript {
    fn name(&self) -> &'static str {
        "product-json"
    }

    fn extract(&self, document: &Html) -> Option<Product> {
        document.select(&detail::PRODUCT_JSON).find_map(|script| {
            let text = script.text().collect::<String>();
            // Some themes wrap the payload as {"product": {...}, "options": ...}
            let value: Value = serde_json::from_str(text.trim()).ok()?;
            let raw = value.get("product").filter(|p| p.is_object()).unwrap_or(&value);

            match serde_json::from_value::<Product>(raw.clone()) {
                Ok(product) => Some(product),
                Err(e) => {
                    debug!("Product JSON script did not parse: {}", e);
                    None
                }
            }
        })
    }
}

/// schema.org structured data (`@type: Product`).
pub struct JsonLdProduct;

impl ProductSource for JsonLdProduct {
    fn name(&self) -> &'static str {
        "json-ld"
    }

    fn extract(&self, document: &Html) -> Option<Product> {
        document.select(&detail::JSON_LD).find_map(|script| {
            let text = script.text().collect::<String>();
            let value: Value = serde_json::from_str(text.trim()).ok()?;
            find_ld_product(&value).and_then(product_from_ld)
        })
    }
}

/// The default extraction order.
pub fn default_sources() -> Vec<Box<dyn ProductSource>> {
    vec![Box::new(ShopAnalyticsMeta), Box::new(ProductJsonScript), Box::new(JsonLdProduct)]
}

/// Tries each source in order, returning the first product and the name of the source.
pub fn extract_product(
    document: &Html,
    sources: &[Box<dyn ProductSource>],
) -> Option<(&'static str, Product)> {
    for source in sources {
        match source.extract(document) {
            Some(product) if !product.id.is_empty() => {
                debug!("Extracted product {} via {}", product.id, source.name());
                return Some((source.name(), product));
            }
            _ => trace!("No product via {}", source.name()),
        }
    }
    None
}

/// Reads the active currency from `Shopify.currency = {"active": "EUR", ...}`.
pub fn detect_currency(document: &Html) -> Option<String> {
    document.select(&detail::SCRIPT).find_map(|script| {
        let text = script.text().collect::<String>();
        let currency = json_value_after(&text, "Shopify.currency =")?;
        currency.get("active")?.as_str().map(str::to_uppercase)
    })
}

/// Parses the JSON object that follows `marker` in a script body.
///
/// Inline scripts are not JSON, so this scans for the balanced `{...}` after
/// the marker (respecting string literals) and parses only that slice.
pub fn json_value_after(text: &str, marker: &str) -> Option<Value> {
    let start = text.find(marker)? + marker.len();
    let open = start + text[start..].find('{')?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[open..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    let end = open + offset + 1;
                    return serde_json::from_str(&text[open..end]).ok();
                }
            }
            _ => {}
        }
    }

    None
}

fn canonical_handle(document: &Html) -> Option<String> {
    let href = document.select(&detail::CANONICAL).next()?.value().attr("href")?;
    handle_from_url(href)
}

/// Finds a `Product` node in a JSON-LD document, looking through arrays and `@graph`.
fn find_ld_product(value: &Value) -> Option<&Value> {
    match value {
        Value::Array(items) => items.iter().find_map(find_ld_product),
        Value::Object(map) => {
            if is_ld_type(map.get("@type"), "Product") {
                return Some(value);
            }
            map.get("@graph").and_then(find_ld_product)
        }
        _ => None,
    }
}

fn is_ld_type(node_type: Option<&Value>, wanted: &str) -> bool {
    match node_type {
        Some(Value::String(s)) => s == wanted,
        Some(Value::Array(types)) => types.iter().any(|t| t.as_str() == Some(wanted)),
        _ => false,
    }
}

fn ld_string(node: &Value, key: &str) -> Option<String> {
    match node.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Structured data prices are decimal major units, as strings or numbers.
fn ld_price(offer: &Value, key: &str) -> Option<i64> {
    match offer.get(key)? {
        Value::String(s) => money::parse_major(s),
        Value::Number(n) => n.as_f64().map(|major| (major * 100.0).round() as i64),
        _ => None,
    }
}

fn product_from_ld(node: &Value) -> Option<Product> {
    let url = ld_string(node, "url").or_else(|| ld_string(node, "@id"));
    let handle = url.as_deref().and_then(handle_from_url).unwrap_or_default();
    let id = ld_string(node, "productID")
        .or_else(|| ld_string(node, "sku"))
        .or_else(|| (!handle.is_empty()).then(|| handle.clone()))?;

    let offers: Vec<&Value> = match node.get("offers") {
        Some(Value::Array(list)) => list.iter().collect(),
        Some(offer @ Value::Object(_)) => vec![offer],
        _ => Vec::new(),
    };

    let variants: Vec<Variant> = offers
        .iter()
        .map(|offer| Variant {
            id: ld_string(offer, "sku"),
            title: ld_string(offer, "name").unwrap_or_default(),
            price: ld_price(offer, "price").or_else(|| ld_price(offer, "lowPrice")),
            available: offer
                .get("availability")
                .and_then(Value::as_str)
                .map(|a| a.ends_with("InStock")),
            ..Default::default()
        })
        .collect();

    let featured_image = match node.get("image") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Array(list)) => list.first().and_then(Value::as_str).map(String::from),
        Some(image @ Value::Object(_)) => ld_string(image, "url"),
        _ => None,
    };

    Some(Product {
        id,
        handle,
        title: ld_string(node, "name").unwrap_or_default(),
        price: variants.first().and_then(|v| v.price),
        vendor: node
            .get("brand")
            .and_then(|b| ld_string(b, "name").or_else(|| b.as_str().map(String::from))),
        url,
        featured_image,
        variants,
        ..Default::default()
    })
}
