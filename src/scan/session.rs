//! Per-page scan state: loaded rules, dedup sets, the overlay and counters.

use crate::badge::{BadgeElement, Placement, Position, RenderSettings};
use crate::overlay::Overlay;
use crate::rules::{BadgeRule, CompiledRule, EvalContext};
use crate::storefront::models::{PageType, Product};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::{debug, trace, warn};

/// Running totals for one page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    pub passes: u32,
    pub links_seen: usize,
    pub containers_resolved: usize,
    pub badges_applied: usize,
    pub fetch_failures: usize,
}

/// One badge that landed on a container, for reporting.
#[derive(Debug, Clone, Serialize)]
pub struct AppliedBadge {
    pub container: String,
    pub product_id: String,
    pub product_handle: String,
    pub product_title: String,
    pub rule_id: String,
    pub rule_name: String,
    pub element_id: String,
    pub text: String,
    pub position: u8,
    pub stack_index: usize,
}

/// Scan context owned by the page-lifetime controller.
pub struct ScanSession {
    rules: Vec<CompiledRule>,
    settings: RenderSettings,
    overlay: Overlay,
    processed_links: HashSet<String>,
    processed_containers: HashSet<String>,
    /// Node key in the last scanned document to the container anchored there
    anchors: HashMap<String, String>,
    applied: Vec<AppliedBadge>,
    stats: ScanStats,
    processing: bool,
    debug: bool,
}

impl ScanSession {
    /// Creates a session from fetched rules. Invalid rules are dropped with a
    /// warning; the rest are ordered by priority (highest first, stable).
    pub fn new(rules: Vec<BadgeRule>, settings: RenderSettings) -> Self {
        let mut valid: Vec<BadgeRule> = rules
            .into_iter()
            .filter(|rule| match rule.validate() {
                Ok(()) => true,
                Err(e) => {
                    warn!("Skipping badge: {}", e);
                    false
                }
            })
            .collect();
        valid.sort_by(|a, b| b.priority.cmp(&a.priority));

        debug!("Session loaded {} badge rules", valid.len());

        Self {
            rules: valid.into_iter().map(CompiledRule::new).collect(),
            overlay: Overlay::new(settings.class_prefix.clone()),
            settings,
            processed_links: HashSet::new(),
            processed_containers: HashSet::new(),
            anchors: HashMap::new(),
            applied: Vec::new(),
            stats: ScanStats::default(),
            processing: false,
            debug: false,
        }
    }

    /// Raises per-product skip logs from trace to debug.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn rules(&self) -> impl Iterator<Item = &BadgeRule> {
        self.rules.iter().map(|c| &c.rule)
    }

    pub fn has_rules(&self) -> bool {
        !self.rules.is_empty()
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// Switches the `{currency}` token to the page's announced currency.
    pub fn set_currency(&mut self, currency: impl Into<String>) {
        self.settings.currency = currency.into();
    }

    pub fn overlay(&self) -> &Overlay {
        &self.overlay
    }

    /// Where each container sits in the last scanned document, by node key.
    pub fn anchors(&self) -> &HashMap<String, String> {
        &self.anchors
    }

    /// Replaces the anchors with those of a freshly scanned document.
    pub fn set_anchors(&mut self, anchors: HashMap<String, String>) {
        self.anchors = anchors;
    }

    pub fn applied(&self) -> &[AppliedBadge] {
        &self.applied
    }

    pub fn stats(&self) -> ScanStats {
        self.stats
    }

    pub fn is_processing(&self) -> bool {
        self.processing
    }

    /// Starts a pass. Returns false if one is already running.
    pub fn begin_pass(&mut self) -> bool {
        if self.processing {
            return false;
        }
        self.processing = true;
        self.stats.passes += 1;
        true
    }

    pub fn end_pass(&mut self) {
        self.processing = false;
    }

    /// Marks a link processed. Returns false if it already was.
    pub fn mark_link(&mut self, key: &str) -> bool {
        if !self.processed_links.insert(key.to_string()) {
            return false;
        }
        self.stats.links_seen += 1;
        true
    }

    /// Claims a container for badge application. Returns false if already claimed.
    pub fn claim_container(&mut self, key: &str) -> bool {
        if !self.processed_containers.insert(key.to_string()) {
            return false;
        }
        self.stats.containers_resolved += 1;
        true
    }

    pub fn record_fetch_failure(&mut self) {
        self.stats.fetch_failures += 1;
    }

    /// Logs why a unit of work was skipped, at debug level in debug mode.
    pub fn log_skip(&self, what: &str, reason: &str) {
        if self.debug {
            debug!("Skipping {}: {}", what, reason);
        } else {
            trace!("Skipping {}: {}", what, reason);
        }
    }

    /// Evaluates every rule against `product` and appends admitted badges to
    /// the container. Returns the number of badges added.
    pub fn apply_badges(
        &mut self,
        container_key: &str,
        label: &str,
        product: &Product,
        page_type: PageType,
        now: DateTime<Utc>,
    ) -> usize {
        if self.rules.is_empty() {
            return 0;
        }

        self.overlay.ensure_style();
        self.overlay.prepare(container_key, label, product);

        let tags = product.normalized_tags();
        let ctx = EvalContext { product, tags: &tags, page_type, now };
        let mut added = 0;

        for compiled in &self.rules {
            let rule = &compiled.rule;

            if let Some(reason) = compiled.chain.first_rejection(&ctx) {
                self.log_skip(&format!("badge {} for product {}", rule.id, product.id), &reason);
                continue;
            }

            let position = Position::or_default(rule.position);
            let stack_index =
                self.overlay.container(container_key).map_or(0, |c| c.count_at(position.cell()));
            let element =
                BadgeElement::build(rule, product, Placement::new(position, stack_index), &self.settings);

            let record = AppliedBadge {
                container: container_key.to_string(),
                product_id: product.id.clone(),
                product_handle: product.handle.clone(),
                product_title: product.title.clone(),
                rule_id: rule.id.clone(),
                rule_name: rule.label().to_string(),
                element_id: element.id.clone(),
                text: element.text.clone(),
                position: element.position,
                stack_index,
            };

            if self.overlay.apply(container_key, element) {
                self.applied.push(record);
                added += 1;
            } else {
                trace!("Badge {} already applied", record.element_id);
            }
        }

        self.stats.badges_applied += added;
        added
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    fn make_product(id: &str) -> Product {
        Product {
            id: id.into(),
            handle: format!("product-{}", id),
            title: "Linen Shirt".into(),
            price: Some(7500),
            compare_at_price: Some(10000),
            tags: ["Sale"].into_iter().collect(),
            ..Default::default()
        }
    }

    fn make_rule(id: &str, priority: i32, position: u8) -> BadgeRule {
        let mut rule = BadgeRule::new(id, format!("R{}", id));
        rule.priority = priority;
        rule.position = position;
        rule
    }

    #[test]
    fn test_rules_sorted_by_priority_stable() {
        let session = ScanSession::new(
            vec![make_rule("a", 0, 1), make_rule("b", 5, 1), make_rule("c", 0, 1), make_rule("d", 5, 1)],
            RenderSettings::default(),
        );
        let ids: Vec<_> = session.rules().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "d", "a", "c"]);
    }

    #[test]
    fn test_invalid_rules_dropped() {
        let mut bad = make_rule("bad", 0, 12);
        bad.text = "never".into();
        let session =
            ScanSession::new(vec![bad, make_rule("ok", 0, 1)], RenderSettings::default());
        let ids: Vec<_> = session.rules().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["ok"]);
    }

    #[test]
    fn test_reentrancy_guard() {
        let mut session = ScanSession::new(vec![], RenderSettings::default());
        assert!(session.begin_pass());
        assert!(session.is_processing());
        assert!(!session.begin_pass());
        session.end_pass();
        assert!(session.begin_pass());
        assert_eq!(session.stats().passes, 2);
    }

    #[test]
    fn test_link_and_container_dedup() {
        let mut session = ScanSession::new(vec![], RenderSettings::default());
        assert!(session.mark_link("linen-shirt#0"));
        assert!(!session.mark_link("linen-shirt#0"));
        assert!(session.claim_container("linen-shirt#0"));
        assert!(!session.claim_container("linen-shirt#0"));

        let stats = session.stats();
        assert_eq!(stats.links_seen, 1);
        assert_eq!(stats.containers_resolved, 1);
    }

    #[test]
    fn test_apply_badges_stacks_by_position() {
        let mut session = ScanSession::new(
            vec![make_rule("1", 0, 3), make_rule("2", 0, 3), make_rule("3", 0, 9)],
            RenderSettings::default(),
        );
        let product = make_product("101");

        let added = session.apply_badges("c1", "div.card", &product, PageType::Collection, now());
        assert_eq!(added, 3);

        let stacks: Vec<_> =
            session.applied().iter().map(|a| (a.rule_id.as_str(), a.position, a.stack_index)).collect();
        assert_eq!(stacks, vec![("1", 3, 0), ("2", 3, 1), ("3", 9, 0)]);
        assert_eq!(session.stats().badges_applied, 3);
        assert!(session.overlay().stylesheet().is_some());
    }

    #[test]
    fn test_apply_badges_idempotent() {
        let mut session = ScanSession::new(vec![make_rule("1", 0, 1)], RenderSettings::default());
        let product = make_product("101");

        assert_eq!(session.apply_badges("c1", "div.card", &product, PageType::Home, now()), 1);
        assert_eq!(session.apply_badges("c1", "div.card", &product, PageType::Home, now()), 0);
        assert_eq!(session.overlay().badge_count(), 1);
        assert_eq!(session.applied().len(), 1);
    }

    #[test]
    fn test_apply_badges_respects_rules() {
        let mut sale = make_rule("sale", 0, 1);
        sale.included_tags = vec!["sale".into()];
        let mut product_only = make_rule("pdp", 0, 1);
        product_only.page_type = Some("product".into());
        let mut discount = make_rule("deal", 0, 2);
        discount.min_discount_percent = Some(30);

        let mut session =
            ScanSession::new(vec![sale, product_only, discount], RenderSettings::default());
        session.apply_badges("c1", "div.card", &make_product("101"), PageType::Collection, now());

        let ids: Vec<_> = session.applied().iter().map(|a| a.rule_id.as_str()).collect();
        assert_eq!(ids, vec!["sale"]);
    }

    #[test]
    fn test_no_rules_leaves_overlay_untouched() {
        let mut session = ScanSession::new(vec![], RenderSettings::default());
        assert_eq!(session.apply_badges("c1", "div", &make_product("1"), PageType::Home, now()), 0);
        assert!(session.overlay().stylesheet().is_none());
        assert!(session.overlay().containers().is_empty());
    }

    #[test]
    fn test_currency_override_renders_symbol() {
        let mut rule = make_rule("1", 0, 1);
        rule.text = "{currency}{discount_amount} off".into();
        let mut session = ScanSession::new(vec![rule], RenderSettings::default());
        session.set_currency("EUR");

        session.apply_badges("c1", "div", &make_product("101"), PageType::Home, now());
        assert_eq!(session.applied()[0].text, "€25.00 off");
    }
}
