//! Product id and collection allow/deny lists.

use super::{EvalContext, Predicate};

/// Allow-list or deny-list on the product id.
pub struct ProductListPredicate {
    ids: Vec<String>,
    exclude: bool,
}

impl ProductListPredicate {
    /// Product id must appear in `ids`.
    pub fn included(ids: Vec<String>) -> Self {
        Self { ids, exclude: false }
    }

    /// Product id must not appear in `ids`.
    pub fn excluded(ids: Vec<String>) -> Self {
        Self { ids, exclude: true }
    }
}

impl Predicate for ProductListPredicate {
    fn matches(&self, ctx: &EvalContext<'_>) -> bool {
        let listed = self.ids.iter().any(|id| *id == ctx.product.id);
        listed != self.exclude
    }

    fn description(&self) -> String {
        if self.exclude {
            format!("Excluded products: {}", self.ids.join(", "))
        } else {
            format!("Included products: {}", self.ids.join(", "))
        }
    }
}

/// Allow-list or deny-list on collection membership.
///
/// Products whose payload carries no collection data pass either way: the
/// membership cannot be verified, so it does not block.
pub struct CollectionPredicate {
    ids: Vec<String>,
    exclude: bool,
}

impl CollectionPredicate {
    pub fn included(ids: Vec<String>) -> Self {
        Self { ids, exclude: false }
    }

    pub fn excluded(ids: Vec<String>) -> Self {
        Self { ids, exclude: true }
    }
}

impl Predicate for CollectionPredicate {
    fn matches(&self, ctx: &EvalContext<'_>) -> bool {
        let Some(collections) = &ctx.product.collections else {
            return true;
        };

        let member = collections.iter().any(|c| self.ids.contains(c));
        member != self.exclude
    }

    fn description(&self) -> String {
        if self.exclude {
            format!("Excluded collections: {}", self.ids.join(", "))
        } else {
            format!("Included collections: {}", self.ids.join(", "))
        }
    }
}
