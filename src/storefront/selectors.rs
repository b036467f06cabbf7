//! CSS selectors for storefront theme markup.
//!
//! Themes disagree about how product cards are built, so card and media
//! lookups are ordered lists: the first selector with a match wins. Update
//! the lists here when a theme is not picked up, and add a fixture test.

use scraper::Selector;
use std::sync::LazyLock;

fn parse_all(selectors: &[&str]) -> Vec<Selector> {
    selectors.iter().map(|s| Selector::parse(s).unwrap()).collect()
}

/// Selectors for listing pages (collections, search, home).
pub mod listing {
    use super::*;

    /// Anchors pointing at a product page.
    pub static PRODUCT_LINK: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("a[href*='/products/']").unwrap());

    /// Product card containers, highest priority first.
    pub static CARD_PRIORITY: LazyLock<Vec<Selector>> = LazyLock::new(|| {
        parse_all(&[
            ".card-wrapper",
            ".product-card",
            ".product-item",
            ".grid-product",
            ".product-grid-item",
            ".grid-view-item",
            ".product-card-wrapper",
            "li.grid__item",
            ".grid__item",
            "li.product",
            "[data-product-id]",
            ".card",
        ])
    });

    /// Images, used by the bounded ancestor walk fallback.
    pub static IMAGE: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("img, picture").unwrap());
}

/// Selectors for product detail pages.
pub mod detail {
    use super::*;

    /// Main product media wrapper, highest priority first.
    pub static MEDIA_PRIORITY: LazyLock<Vec<Selector>> = LazyLock::new(|| {
        parse_all(&[
            ".product__media-wrapper",
            ".product__media",
            ".product-single__media",
            ".product-single__photo",
            ".product__main-photos",
            ".product-gallery",
            ".product__image",
            "#ProductPhoto",
            ".product-image-main",
        ])
    });

    /// Theme-embedded product JSON.
    pub static PRODUCT_JSON: LazyLock<Selector> = LazyLock::new(|| {
        Selector::parse(
            "script[data-product-json], \
             script[id^='ProductJson'], \
             script[type='application/json'][data-product]",
        )
        .unwrap()
    });

    /// Structured data blocks.
    pub static JSON_LD: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("script[type='application/ld+json']").unwrap());

    /// Every inline script, scanned for storefront globals.
    pub static SCRIPT: LazyLock<Selector> = LazyLock::new(|| Selector::parse("script").unwrap());

    /// Canonical URL, used to recover a handle.
    pub static CANONICAL: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("link[rel='canonical']").unwrap());
}

/// Selectors used to detect the page type.
pub mod page {
    use super::*;

    pub static BODY: LazyLock<Selector> = LazyLock::new(|| Selector::parse("body").unwrap());
}
