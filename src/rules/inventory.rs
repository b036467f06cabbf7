//! Inventory range predicate.

use super::{EvalContext, Predicate};

/// Filters products by total inventory (root quantity, else the variant sum, else 0).
pub struct InventoryPredicate {
    min: Option<i64>,
    max: Option<i64>,
}

impl InventoryPredicate {
    pub fn new(min: Option<i64>, max: Option<i64>) -> Self {
        Self { min, max }
    }

    pub fn min(quantity: i64) -> Self {
        Self { min: Some(quantity), max: None }
    }

    pub fn max(quantity: i64) -> Self {
        Self { min: None, max: Some(quantity) }
    }
}

impl Predicate for InventoryPredicate {
    fn matches(&self, ctx: &EvalContext<'_>) -> bool {
        let total = ctx.product.total_inventory();

        if let Some(min) = self.min {
            if total < min {
                return false;
            }
        }

        if let Some(max) = self.max {
            if total > max {
                return false;
            }
        }

        true
    }

    fn description(&self) -> String {
        match (self.min, self.max) {
            (Some(min), Some(max)) => format!("Inventory: {} - {}", min, max),
            (Some(min), None) => format!("Inventory: >= {}", min),
            (None, Some(max)) => format!("Inventory: <= {}", max),
            (None, None) => "Inventory: any".to_string(),
        }
    }
}
