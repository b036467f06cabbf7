//! Active-flag and page-type predicates.

use super::{EvalContext, Predicate};

/// Page-type value that disables page scoping.
pub const ALL_PAGES: &str = "all";

/// Rejects everything when the rule is inactive.
pub struct ActivePredicate {
    active: bool,
}

impl ActivePredicate {
    pub fn new(active: bool) -> Self {
        Self { active }
    }
}

impl Predicate for ActivePredicate {
    fn matches(&self, _ctx: &EvalContext<'_>) -> bool {
        self.active
    }

    fn description(&self) -> String {
        if self.active {
            "Active".to_string()
        } else {
            "Active: rule is disabled".to_string()
        }
    }
}

/// Restricts a rule to one page type. Comparison is exact and case-sensitive.
pub struct PageTypePredicate {
    page_type: String,
}

impl PageTypePredicate {
    pub fn new(page_type: impl Into<String>) -> Self {
        Self { page_type: page_type.into() }
    }
}

impl Predicate for PageTypePredicate {
    fn matches(&self, ctx: &EvalContext<'_>) -> bool {
        self.page_type == ctx.page_type.as_str()
    }

    fn description(&self) -> String {
        format!("Page type: {}", self.page_type)
    }
}
