//! Case-insensitive tag allow/deny lists.

use super::{EvalContext, Predicate};

/// Filters products by tag intersection.
pub struct TagPredicate {
    /// Lower-cased rule tags
    tags: Vec<String>,
    exclude: bool,
}

impl TagPredicate {
    fn new(tags: &[String], exclude: bool) -> Self {
        Self {
            tags: tags
                .iter()
                .map(|t| t.trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect(),
            exclude,
        }
    }

    /// At least one of `tags` must be on the product.
    pub fn included(tags: &[String]) -> Self {
        Self::new(tags, false)
    }

    /// None of `tags` may be on the product.
    pub fn excluded(tags: &[String]) -> Self {
        Self::new(tags, true)
    }
}

impl Predicate for TagPredicate {
    fn matches(&self, ctx: &EvalContext<'_>) -> bool {
        let intersects = self.tags.iter().any(|t| ctx.tags.contains(t));
        intersects != self.exclude
    }

    fn description(&self) -> String {
        if self.exclude {
            format!("Excluded tags: {}", self.tags.join(", "))
        } else {
            format!("Included tags: {}", self.tags.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storefront::models::{PageType, Product, Tags};
    use chrono::Utc;

    fn make_product(tags: &[&str]) -> Product {
        Product { id: "1".into(), tags: tags.iter().copied().collect::<Tags>(), ..Default::default() }
    }

    fn check(predicate: &TagPredicate, product: &Product) -> bool {
        let tags = product.normalized_tags();
        predicate.matches(&EvalContext {
            product,
            tags: &tags,
            page_type: PageType::Collection,
            now: Utc::now(),
        })
    }

    fn tags(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_included_case_insensitive() {
        let predicate = TagPredicate::included(&tags(&["Sale"]));
        assert!(check(&predicate, &make_product(&["sale"])));
        assert!(check(&predicate, &make_product(&["SALE", "new"])));
        assert!(!check(&predicate, &make_product(&["new"])));
        assert!(!check(&predicate, &make_product(&[])));
    }

    #[test]
    fn test_included_any_of() {
        let predicate = TagPredicate::included(&tags(&["summer", "winter"]));
        assert!(check(&predicate, &make_product(&["Winter"])));
    }

    #[test]
    fn test_excluded_case_insensitive() {
        let predicate = TagPredicate::excluded(&tags(&["Final-Sale"]));
        assert!(!check(&predicate, &make_product(&["final-sale", "summer"])));
        assert!(check(&predicate, &make_product(&["summer"])));
        assert!(check(&predicate, &make_product(&[])));
    }

    #[test]
    fn test_whole_tag_match_only() {
        let predicate = TagPredicate::included(&tags(&["sale"]));
        assert!(!check(&predicate, &make_product(&["wholesale"])));
    }

    #[test]
    fn test_rule_tags_trimmed() {
        let predicate = TagPredicate::included(&tags(&["  New  "]));
        assert!(check(&predicate, &make_product(&["new"])));
    }

    #[test]
    fn test_description() {
        assert_eq!(TagPredicate::included(&tags(&["Sale"])).description(), "Included tags: sale");
        assert_eq!(
            TagPredicate::excluded(&tags(&["A", "b"])).description(),
            "Excluded tags: a, b"
        );
    }
}
