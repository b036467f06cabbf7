//! Badge eligibility: a fixed-order chain of predicates built from a rule.
//!
//! Predicate classes run in this order and the chain stops at the first
//! rejection: active flag, page type, product allow/deny lists, collection
//! allow/deny lists, tag allow/deny lists, date window, inventory range, price
//! range, discount threshold. Unset constraints add no predicate.

pub mod discount;
pub mod inventory;
pub mod membership;
pub mod model;
pub mod page;
pub mod price;
pub mod schedule;
pub mod tags;

use crate::storefront::models::{PageType, Product};
use chrono::{DateTime, Utc};
use std::collections::HashSet;

pub use discount::{calculate_discount, DiscountPredicate};
pub use inventory::InventoryPredicate;
pub use membership::{CollectionPredicate, ProductListPredicate};
pub use model::{parse_rules, Animation, BadgeRule, RuleResponse, Shape};
pub use page::{ActivePredicate, PageTypePredicate};
pub use price::PricePredicate;
pub use schedule::SchedulePredicate;
pub use tags::TagPredicate;

/// Everything a predicate may look at for one (rule, product) evaluation.
pub struct EvalContext<'a> {
    pub product: &'a Product,
    /// Lower-cased product tags
    pub tags: &'a HashSet<String>,
    pub page_type: PageType,
    pub now: DateTime<Utc>,
}

/// A single eligibility check.
pub trait Predicate: Send + Sync {
    /// Returns true if the product passes this predicate.
    fn matches(&self, ctx: &EvalContext<'_>) -> bool;

    /// Returns a description of this predicate.
    fn description(&self) -> String;
}

/// A chain of predicates that must all pass, evaluated in insertion order.
pub struct PredicateChain {
    predicates: Vec<Box<dyn Predicate>>,
}

impl PredicateChain {
    /// Creates an empty chain.
    pub fn new() -> Self {
        Self { predicates: Vec::new() }
    }

    /// Builds the chain for a rule in the fixed evaluation order.
    pub fn for_rule(rule: &BadgeRule) -> Self {
        PredicateChainBuilder::new()
            .active(rule.active)
            .page_type(rule.page_type.as_deref())
            .products(&rule.included_products, &rule.excluded_products)
            .collections(&rule.included_collections, &rule.excluded_collections)
            .tags(&rule.included_tags, &rule.excluded_tags)
            .schedule(rule.start_date.as_deref(), rule.end_date.as_deref())
            .inventory_range(rule.inventory_min, rule.inventory_max)
            .price_range(rule.price_min, rule.price_max)
            .min_discount(rule.min_discount_percent)
            .build()
    }

    /// Adds a predicate to the end of the chain.
    pub fn add(&mut self, predicate: impl Predicate + 'static) -> &mut Self {
        self.predicates.push(Box::new(predicate));
        self
    }

    /// Checks if the context passes every predicate.
    pub fn matches(&self, ctx: &EvalContext<'_>) -> bool {
        self.predicates.iter().all(|p| p.matches(ctx))
    }

    /// Returns the description of the first rejecting predicate, if any.
    pub fn first_rejection(&self, ctx: &EvalContext<'_>) -> Option<String> {
        self.predicates.iter().find(|p| !p.matches(ctx)).map(|p| p.description())
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    /// Returns descriptions of all predicates in evaluation order.
    pub fn descriptions(&self) -> Vec<String> {
        self.predicates.iter().map(|p| p.description()).collect()
    }
}

impl Default for PredicateChain {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder that only adds predicates for constraints that are actually set.
pub struct PredicateChainBuilder {
    chain: PredicateChain,
}

impl PredicateChainBuilder {
    pub fn new() -> Self {
        Self { chain: PredicateChain::new() }
    }

    /// Always added: an inactive rule must reject even if callers forgot to pre-filter.
    pub fn active(mut self, active: bool) -> Self {
        self.chain.add(ActivePredicate::new(active));
        self
    }

    pub fn page_type(mut self, page_type: Option<&str>) -> Self {
        if let Some(page_type) = page_type {
            if !page_type.is_empty() && page_type != page::ALL_PAGES {
                self.chain.add(PageTypePredicate::new(page_type));
            }
        }
        self
    }

    pub fn products(mut self, included: &[String], excluded: &[String]) -> Self {
        if !included.is_empty() {
            self.chain.add(ProductListPredicate::included(included.to_vec()));
        }
        if !excluded.is_empty() {
            self.chain.add(ProductListPredicate::excluded(excluded.to_vec()));
        }
        self
    }

    pub fn collections(mut self, included: &[String], excluded: &[String]) -> Self {
        if !included.is_empty() {
            self.chain.add(CollectionPredicate::included(included.to_vec()));
        }
        if !excluded.is_empty() {
            self.chain.add(CollectionPredicate::excluded(excluded.to_vec()));
        }
        self
    }

    pub fn tags(mut self, included: &[String], excluded: &[String]) -> Self {
        if !included.is_empty() {
            self.chain.add(TagPredicate::included(included));
        }
        if !excluded.is_empty() {
            self.chain.add(TagPredicate::excluded(excluded));
        }
        self
    }

    pub fn schedule(mut self, start: Option<&str>, end: Option<&str>) -> Self {
        if start.is_some() || end.is_some() {
            self.chain.add(SchedulePredicate::from_rule_dates(start, end));
        }
        self
    }

    pub fn inventory_range(mut self, min: Option<i64>, max: Option<i64>) -> Self {
        if min.is_some() || max.is_some() {
            self.chain.add(InventoryPredicate::new(min, max));
        }
        self
    }

    pub fn price_range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        if min.is_some() || max.is_some() {
            self.chain.add(PricePredicate::new(min, max));
        }
        self
    }

    pub fn min_discount(mut self, percent: Option<u32>) -> Self {
        if let Some(percent) = percent {
            self.chain.add(DiscountPredicate::new(percent));
        }
        self
    }

    pub fn build(self) -> PredicateChain {
        self.chain
    }
}

impl Default for PredicateChainBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Decides whether `rule` admits `product` at instant `now`.
///
/// Total for well-typed input: malformed dates are non-binding here (rule
/// validation reports them before a session ever evaluates the rule).
pub fn is_eligible_at(
    rule: &BadgeRule,
    product: &Product,
    normalized_tags: &HashSet<String>,
    page_type: PageType,
    now: DateTime<Utc>,
) -> bool {
    let ctx = EvalContext { product, tags: normalized_tags, page_type, now };
    PredicateChain::for_rule(rule).matches(&ctx)
}

/// [`is_eligible_at`] against the current wall clock.
pub fn is_eligible(
    rule: &BadgeRule,
    product: &Product,
    normalized_tags: &HashSet<String>,
    page_type: PageType,
) -> bool {
    is_eligible_at(rule, product, normalized_tags, page_type, Utc::now())
}

/// A rule paired with its prebuilt predicate chain.
pub struct CompiledRule {
    pub rule: BadgeRule,
    pub chain: PredicateChain,
}

impl CompiledRule {
    pub fn new(rule: BadgeRule) -> Self {
        let chain = PredicateChain::for_rule(&rule);
        Self { rule, chain }
    }

    pub fn matches(&self, ctx: &EvalContext<'_>) -> bool {
        self.chain.matches(ctx)
    }
}
