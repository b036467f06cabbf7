//! Minimum-discount predicate.

use super::{EvalContext, Predicate};

/// Whole-number discount percentage of `price` against `compare_at` (both minor units).
///
/// Returns 0 unless the comparison price is strictly above the price.
pub fn calculate_discount(price: i64, compare_at: i64) -> u32 {
    if compare_at <= price || compare_at <= 0 {
        return 0;
    }
    let percent = (compare_at - price) as f64 / compare_at as f64 * 100.0;
    percent.round().clamp(0.0, 100.0) as u32
}

/// Requires a comparison price and a discount of at least `min_percent`.
pub struct DiscountPredicate {
    min_percent: u32,
}

impl DiscountPredicate {
    pub fn new(min_percent: u32) -> Self {
        Self { min_percent }
    }
}

impl Predicate for DiscountPredicate {
    fn matches(&self, ctx: &EvalContext<'_>) -> bool {
        // No comparison price disqualifies even a 0% threshold
        match ctx.product.discount_percent() {
            Some(percent) => percent >= self.min_percent,
            None => false,
        }
    }

    fn description(&self) -> String {
        format!("Discount: >= {}%", self.min_percent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storefront::models::{PageType, Product, Variant};
    use chrono::Utc;
    use std::collections::HashSet;

    fn make_product(price: i64, compare_at: Option<i64>) -> Product {
        Product { id: "1".into(), price: Some(price), compare_at_price: compare_at, ..Default::default() }
    }

    fn check(predicate: &DiscountPredicate, product: &Product) -> bool {
        let tags = HashSet::new();
        predicate.matches(&EvalContext { product, tags: &tags, page_type: PageType::Home, now: Utc::now() })
    }

    #[test]
    fn test_calculate_discount() {
        assert_eq!(calculate_discount(7500, 10000), 25);
        assert_eq!(calculate_discount(10000, 10000), 0);
        assert_eq!(calculate_discount(12000, 10000), 0);
        assert_eq!(calculate_discount(0, 10000), 100);
    }

    #[test]
    fn test_calculate_discount_rounds() {
        // 33.33% rounds down, 66.67% rounds up
        assert_eq!(calculate_discount(2000, 3000), 33);
        assert_eq!(calculate_discount(1000, 3000), 67);
        // 12.5% rounds half away from zero
        assert_eq!(calculate_discount(8750, 10000), 13);
    }

    #[test]
    fn test_calculate_discount_zero_compare() {
        assert_eq!(calculate_discount(0, 0), 0);
    }

    #[test]
    fn test_threshold() {
        let predicate = DiscountPredicate::new(20);
        assert!(check(&predicate, &make_product(7500, Some(10000))));
        assert!(check(&predicate, &make_product(8000, Some(10000))));
        assert!(!check(&predicate, &make_product(8100, Some(10000))));
    }

    #[test]
    fn test_missing_compare_at_never_passes() {
        assert!(!check(&DiscountPredicate::new(0), &make_product(7500, None)));
        assert!(!check(&DiscountPredicate::new(25), &make_product(7500, None)));
    }

    #[test]
    fn test_variant_compare_at_does_not_stand_in_for_root() {
        let mut product = make_product(3000, None);
        product.variants = vec![Variant {
            price: Some(3000),
            compare_at_price: Some(3000),
            ..Default::default()
        }];
        assert!(!check(&DiscountPredicate::new(0), &product));
    }

    #[test]
    fn test_zero_threshold_with_compare_at() {
        // compare-at present but not above price: 0% still satisfies a 0% threshold
        assert!(check(&DiscountPredicate::new(0), &make_product(7500, Some(7500))));
    }

    #[test]
    fn test_description() {
        assert_eq!(DiscountPredicate::new(15).description(), "Discount: >= 15%");
    }
}
