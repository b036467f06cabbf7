//! Badge label templating.
//!
//! Supported tokens: `{discount}` / `{discount_percent}`, `{discount_amount}`,
//! `{stock}` / `{inventory}`, `{currency}`, `{price}` and `{title}`. A token
//! whose data is missing stays in the text verbatim.

use crate::storefront::models::Product;

/// Values available to a label template.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplateData {
    pub discount_percent: Option<u32>,
    /// Major units
    pub discount_amount: Option<f64>,
    pub stock: Option<i64>,
    pub currency_symbol: Option<String>,
    /// Major units
    pub price: Option<f64>,
    pub title: Option<String>,
}

impl TemplateData {
    /// Collects template values from a product and the page currency code.
    pub fn from_product(product: &Product, currency: &str) -> Self {
        Self {
            discount_percent: product.discount_percent(),
            discount_amount: product.discount_amount_minor().map(|m| m as f64 / 100.0),
            stock: Some(product.total_inventory()),
            currency_symbol: currency_symbol(currency).map(String::from),
            price: product
                .price
                .or_else(|| product.variants.first().and_then(|v| v.price))
                .map(|m| m as f64 / 100.0),
            title: Some(product.title.clone()).filter(|t| !t.is_empty()),
        }
    }
}

/// Substitutes every token whose data is present.
pub fn render_text(template: &str, data: &TemplateData) -> String {
    let mut text = template.to_string();

    if let Some(percent) = data.discount_percent {
        let percent = percent.to_string();
        text = text.replace("{discount_percent}", &percent).replace("{discount}", &percent);
    }

    if let Some(amount) = data.discount_amount {
        text = text.replace("{discount_amount}", &format!("{:.2}", amount));
    }

    if let Some(stock) = data.stock {
        let stock = stock.to_string();
        text = text.replace("{stock}", &stock).replace("{inventory}", &stock);
    }

    if let Some(symbol) = &data.currency_symbol {
        text = text.replace("{currency}", symbol);
    }

    if let Some(price) = data.price {
        text = text.replace("{price}", &format!("{:.2}", price));
    }

    if let Some(title) = &data.title {
        text = text.replace("{title}", title);
    }

    text
}

/// Returns the display symbol for an ISO 4217 code.
pub fn currency_symbol(code: &str) -> Option<&'static str> {
    match code.trim().to_uppercase().as_str() {
        "USD" | "CAD" | "AUD" | "NZD" | "MXN" | "SGD" | "HKD" => Some("$"),
        "EUR" => Some("€"),
        "GBP" => Some("£"),
        "JPY" | "CNY" => Some("¥"),
        "INR" => Some("₹"),
        "KRW" => Some("₩"),
        "BRL" => Some("R$"),
        "CHF" => Some("CHF"),
        "SEK" | "NOK" | "DKK" => Some("kr"),
        "PLN" => Some("zł"),
        "ZAR" => Some("R"),
        _ => None,
    }
}
