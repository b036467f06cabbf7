//! Price range predicate.

use super::{EvalContext, Predicate};

/// Filters products by price range in major units.
pub struct PricePredicate {
    min: Option<f64>,
    max: Option<f64>,
}

impl PricePredicate {
    /// Creates a new price predicate with optional min/max bounds.
    pub fn new(min: Option<f64>, max: Option<f64>) -> Self {
        Self { min, max }
    }

    /// Creates a predicate with only minimum price.
    pub fn min(price: f64) -> Self {
        Self { min: Some(price), max: None }
    }

    /// Creates a predicate with only maximum price.
    pub fn max(price: f64) -> Self {
        Self { min: None, max: Some(price) }
    }

    /// Creates a predicate with both min and max.
    pub fn range(min: f64, max: f64) -> Self {
        Self { min: Some(min), max: Some(max) }
    }
}

impl Predicate for PricePredicate {
    fn matches(&self, ctx: &EvalContext<'_>) -> bool {
        // Missing prices are 0, never "unknown and therefore passing"
        let price = ctx.product.price_major();

        if let Some(min) = self.min {
            if price < min {
                return false;
            }
        }

        if let Some(max) = self.max {
            if price > max {
                return false;
            }
        }

        true
    }

    fn description(&self) -> String {
        match (self.min, self.max) {
            (Some(min), Some(max)) => format!("Price: {:.2} - {:.2}", min, max),
            (Some(min), None) => format!("Price: >= {:.2}", min),
            (None, Some(max)) => format!("Price: <= {:.2}", max),
            (None, None) => "Price: any".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storefront::models::{PageType, Product};
    use chrono::Utc;
    use std::collections::HashSet;

    fn make_product(price: Option<i64>) -> Product {
        Product { id: "1".into(), price, ..Default::default() }
    }

    fn check(predicate: &PricePredicate, product: &Product) -> bool {
        let tags = HashSet::new();
        predicate.matches(&EvalContext { product, tags: &tags, page_type: PageType::Home, now: Utc::now() })
    }

    #[test]
    fn test_price_range() {
        let predicate = PricePredicate::range(20.0, 50.0);

        assert!(!check(&predicate, &make_product(Some(500))));
        assert!(check(&predicate, &make_product(Some(2000))));
        assert!(check(&predicate, &make_product(Some(3000))));
        assert!(check(&predicate, &make_product(Some(5000))));
        assert!(!check(&predicate, &make_product(Some(6000))));
    }

    #[test]
    fn test_missing_price_counts_as_zero() {
        assert!(!check(&PricePredicate::min(0.01), &make_product(None)));
        assert!(check(&PricePredicate::max(10.0), &make_product(None)));
    }

    #[test]
    fn test_min_only() {
        let predicate = PricePredicate::min(20.0);
        assert!(!check(&predicate, &make_product(Some(1000))));
        assert!(check(&predicate, &make_product(Some(2000))));
        assert!(check(&predicate, &make_product(Some(100_000))));
    }

    #[test]
    fn test_max_only() {
        let predicate = PricePredicate::max(50.0);
        assert!(check(&predicate, &make_product(Some(1000))));
        assert!(check(&predicate, &make_product(Some(5000))));
        assert!(!check(&predicate, &make_product(Some(10_000))));
    }

    #[test]
    fn test_boundary_values() {
        let predicate = PricePredicate::range(10.0, 50.0);
        assert!(!check(&predicate, &make_product(Some(999))));
        assert!(!check(&predicate, &make_product(Some(5001))));
    }

    #[test]
    fn test_descriptions() {
        assert_eq!(PricePredicate::range(10.0, 50.0).description(), "Price: 10.00 - 50.00");
        assert_eq!(PricePredicate::min(20.0).description(), "Price: >= 20.00");
        assert_eq!(PricePredicate::max(50.0).description(), "Price: <= 50.00");
        assert_eq!(PricePredicate::new(None, None).description(), "Price: any");
    }
}
