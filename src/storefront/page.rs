//! Page-type detection and product URL helpers.

use crate::storefront::extract::json_value_after;
use crate::storefront::models::PageType;
use crate::storefront::selectors::{detail, page};
use scraper::Html;
use tracing::trace;

/// Detects the page type from storefront globals, theme body classes, then the URL path.
pub fn detect_page_type(document: &Html, url: &str) -> PageType {
    if let Some(page_type) = from_analytics_meta(document) {
        trace!("Page type from analytics meta: {}", page_type);
        return page_type;
    }

    if let Some(page_type) = from_body_class(document) {
        trace!("Page type from body class: {}", page_type);
        return page_type;
    }

    from_path(url)
}

/// `var meta = {"page": {"pageType": "..."}}`
fn from_analytics_meta(document: &Html) -> Option<PageType> {
    document.select(&detail::SCRIPT).find_map(|script| {
        let text = script.text().collect::<String>();
        let meta = json_value_after(&text, "var meta =")?;
        meta.get("page")?.get("pageType")?.as_str()?.parse().ok()
    })
}

/// Theme templates stamp `template-product`, `template-collection`, ... on `<body>`.
fn from_body_class(document: &Html) -> Option<PageType> {
    let body = document.select(&page::BODY).next()?;
    body.value().classes().find_map(|class| {
        class.strip_prefix("template-").and_then(|name| {
            // `template-product-alternate` and friends
            let base = name.split(['-', '.']).next().unwrap_or(name);
            base.parse().ok()
        })
    })
}

/// Classifies a storefront URL path.
pub fn from_path(url: &str) -> PageType {
    let path = url_path(url);

    if path.contains("/products/") {
        PageType::Product
    } else if path.starts_with("/collections") {
        PageType::Collection
    } else if path.starts_with("/search") {
        PageType::Search
    } else if path.starts_with("/cart") {
        PageType::Cart
    } else if path.is_empty() || path == "/" {
        PageType::Home
    } else {
        PageType::Other
    }
}

/// Extracts the product handle from a product URL or path.
///
/// Handles `/products/{handle}`, `/collections/{c}/products/{handle}`, locale
/// prefixes, query strings, fragments and the `.js`/`.json` suffixes. The
/// handle comes back percent-decoded.
pub fn handle_from_url(href: &str) -> Option<String> {
    let path = url_path(href);
    let (_, rest) = path.split_once("/products/")?;
    let handle = rest.split('/').next()?.trim_end_matches(".json").trim_end_matches(".js");

    if handle.is_empty() {
        return None;
    }

    match urlencoding::decode(handle) {
        Ok(decoded) => Some(decoded.into_owned()),
        Err(e) => {
            trace!("Keeping undecodable handle {}: {}", handle, e);
            Some(handle.to_string())
        }
    }
}

/// Returns the path component of an absolute or relative URL, without query or fragment.
pub fn url_path(url: &str) -> &str {
    let without_scheme = match url.split_once("://") {
        Some((_, rest)) => rest.find('/').map_or("", |idx| &rest[idx..]),
        None => url,
    };
    let end = without_scheme.find(['?', '#']).unwrap_or(without_scheme.len());
    &without_scheme[..end]
}

/// Returns `scheme://host[:port]` of an absolute URL.
pub fn origin(url: &str) -> Option<&str> {
    let scheme_end = url.find("://")? + 3;
    let host_end = url[scheme_end..].find(['/', '?', '#']).map_or(url.len(), |i| scheme_end + i);
    if host_end == scheme_end {
        return None;
    }
    Some(&url[..host_end])
}

/// Returns the host (no port) of an absolute URL.
pub fn host(url: &str) -> Option<&str> {
    let origin = origin(url)?;
    let host = &origin[origin.find("://")? + 3..];
    Some(host.split(':').next().unwrap_or(host))
}
