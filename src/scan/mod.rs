//! Page scanning: discover product containers, fetch their products once and
//! apply every admitted badge.

pub mod annotate;
pub mod controller;
pub mod dom;
pub mod session;

use crate::error::BadgeError;
use crate::storefront::client::StorefrontSource;
use crate::storefront::extract::{default_sources, detect_currency, extract_product};
use crate::storefront::models::{PageType, Product};
use crate::storefront::page::{detect_page_type, handle_from_url};
use chrono::Utc;
use futures::stream::{FuturesUnordered, StreamExt};
use scraper::Html;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info, warn};

pub use controller::{ScanController, ScanReport};
pub use dom::{HtmlDom, PageDom};
pub use session::{AppliedBadge, ScanSession, ScanStats};

/// Page-level facts gathered once per parsed document.
#[derive(Debug, Clone, Default)]
pub struct PageContext {
    pub page_type: PageType,
    /// The product a detail page is about
    pub current_product: Option<Product>,
    /// Name of the extraction strategy that found `current_product`
    pub product_source: Option<&'static str>,
    pub currency: Option<String>,
}

impl PageContext {
    pub fn from_document(document: &Html, url: &str) -> Self {
        let page_type = detect_page_type(document, url);
        let currency = detect_currency(document);

        let (product_source, current_product) = if page_type == PageType::Product {
            match extract_product(document, &default_sources()) {
                Some((source, product)) => (Some(source), Some(product)),
                None => {
                    debug!("No product data found on detail page {}", url);
                    (None, None)
                }
            }
        } else {
            (None, None)
        };

        Self { page_type, current_product, product_source, currency }
    }
}

/// What one pass found.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PassOutcome {
    /// False when the pass was refused by the re-entrancy guard
    pub ran: bool,
    pub new_links: usize,
    pub new_containers: usize,
    pub badges_applied: usize,
    pub fetch_failures: usize,
}

impl PassOutcome {
    /// True if the pass turned up any link or container not seen before.
    pub fn discovered_anything(&self) -> bool {
        self.new_links > 0 || self.new_containers > 0
    }
}

/// A container claimed during link discovery, waiting for its product.
struct PendingContainer {
    key: String,
    label: String,
    handle: String,
}

/// `{name}#{n}`, where `n` counts the earlier uses of `name` in this document.
fn occurrence_key(counts: &mut HashMap<String, usize>, name: &str) -> String {
    let seen = counts.entry(name.to_string()).or_insert(0);
    let key = format!("{}#{}", name, seen);
    *seen += 1;
    key
}

/// Finds the card that hosts a product link.
///
/// Card selectors are tried in priority order, each as a closest-ancestor
/// lookup. Without a card, walks up at most `max_depth` ancestors for the
/// first one that contains an image.
pub fn resolve_container<D: PageDom>(
    dom: &D,
    link: D::Node,
    max_depth: usize,
) -> Result<D::Node, BadgeError> {
    let mut best: Option<(usize, D::Node)> = None;
    let mut current = Some(link);
    while let Some(node) = current {
        if let Some(rank) = dom.matches_card(node) {
            if best.map_or(true, |(best_rank, _)| rank < best_rank) {
                best = Some((rank, node));
            }
            if rank == 0 {
                break;
            }
        }
        current = dom.parent(node);
    }

    if let Some((_, card)) = best {
        return Ok(card);
    }

    let mut current = dom.parent(link);
    for _ in 0..max_depth {
        let Some(node) = current else { break };
        if dom.contains_image(node) {
            return Ok(node);
        }
        current = dom.parent(node);
    }

    Err(BadgeError::MissingTarget {
        what: dom.href(link).unwrap_or_else(|| dom.node_label(link)),
    })
}

/// Runs one scan pass over a parsed page.
///
/// New product links are resolved to containers; each container not seen
/// before has its product fetched (concurrently) and badges applied as the
/// fetches complete. On detail pages the page's own product is applied to the
/// main media container. Failures skip the unit they belong to.
///
/// Links and containers are identified by product handle and occurrence
/// (`linen-shirt#0`), not by their position in the markup, so cards inserted
/// between passes do not shift the identity of cards already badged. Every
/// pass re-anchors those identities to the current document's nodes.
pub async fn scan_pass<D, S>(
    session: &mut ScanSession,
    dom: &D,
    page: &PageContext,
    source: &S,
    ancestor_depth: usize,
) -> PassOutcome
where
    D: PageDom,
    S: StorefrontSource + ?Sized,
{
    if !session.begin_pass() {
        debug!("Scan pass already running, skipping");
        return PassOutcome::default();
    }

    let before = session.stats();
    let now = Utc::now();
    let mut pending = Vec::new();
    let mut anchors = HashMap::new();
    let mut link_counts = HashMap::new();
    let mut container_counts = HashMap::new();

    if let Some(product) = &page.current_product {
        match dom.detail_media() {
            Some(media) => {
                let key = format!("media:{}", product.id);
                anchors.insert(dom.node_key(media), key.clone());
                if session.claim_container(&key) {
                    session.apply_badges(&key, &dom.node_label(media), product, page.page_type, now);
                }
            }
            None => session.log_skip(&format!("product {}", product.id), "no media container"),
        }
    }

    for link in dom.product_links() {
        let href = dom.href(link);
        let handle = href.as_deref().and_then(handle_from_url);
        let name = handle.clone().or(href).unwrap_or_else(|| dom.node_label(link));
        let is_new = session.mark_link(&occurrence_key(&mut link_counts, &name));

        let Some(handle) = handle else {
            if is_new {
                session.log_skip(&dom.node_label(link), "no product handle in href");
            }
            continue;
        };

        let container = match resolve_container(dom, link, ancestor_depth) {
            Ok(container) => container,
            Err(e) => {
                if is_new {
                    session.log_skip(&format!("product {}", handle), &e.to_string());
                }
                continue;
            }
        };

        // A card keeps the identity of the first product link inside it
        let key = anchors
            .entry(dom.node_key(container))
            .or_insert_with(|| occurrence_key(&mut container_counts, &handle))
            .clone();

        if !is_new || !session.claim_container(&key) {
            continue;
        }

        pending.push(PendingContainer { key, label: dom.node_label(container), handle });
    }

    if !pending.is_empty() {
        debug!("Fetching {} products", pending.len());
    }

    let mut fetches: FuturesUnordered<_> = pending
        .into_iter()
        .map(|container| async move {
            let result = source.product(&container.handle).await;
            (container, result)
        })
        .collect();

    while let Some((container, result)) = fetches.next().await {
        match result {
            Ok(product) => {
                session.apply_badges(&container.key, &container.label, &product, page.page_type, now);
            }
            Err(e) => {
                warn!("Failed to load product {}: {}", container.handle, e);
                session.record_fetch_failure();
            }
        }
    }

    session.set_anchors(anchors);
    session.end_pass();

    let after = session.stats();
    let outcome = PassOutcome {
        ran: true,
        new_links: after.links_seen - before.links_seen,
        new_containers: after.containers_resolved - before.containers_resolved,
        badges_applied: after.badges_applied - before.badges_applied,
        fetch_failures: after.fetch_failures - before.fetch_failures,
    };

    info!(
        "Pass {}: {} new links, {} containers, {} badges",
        after.passes, outcome.new_links, outcome.new_containers, outcome.badges_applied
    );
    outcome
}
