//! The rendered badge overlay: one stylesheet plus badges grouped by container.
//!
//! Badge element ids are unique across the overlay, so applying the same
//! (product, badge) pair twice is a no-op.

use crate::badge::{escape_html, style, BadgeElement};
use crate::storefront::models::Product;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// A product container that has been prepared to host badges.
#[derive(Debug, Clone, Serialize)]
pub struct PreparedContainer {
    /// Stable key of the container node within the page
    pub key: String,
    /// Short human-readable description of the node, e.g. `div.product-card`
    pub label: String,
    pub product_id: String,
    pub product_handle: String,
    pub product_title: String,
    pub badges: Vec<BadgeElement>,
}

impl PreparedContainer {
    /// Number of badges already anchored at `cell`.
    pub fn count_at(&self, cell: u8) -> usize {
        self.badges.iter().filter(|b| b.position == cell).count()
    }
}

/// Accumulated overlay for one page.
#[derive(Debug, Default)]
pub struct Overlay {
    class_prefix: String,
    stylesheet: Option<String>,
    containers: Vec<PreparedContainer>,
    index: HashMap<String, usize>,
    applied_ids: HashSet<String>,
}

impl Overlay {
    pub fn new(class_prefix: impl Into<String>) -> Self {
        Self { class_prefix: class_prefix.into(), ..Default::default() }
    }

    /// Injects the shared stylesheet. Returns false if it was already present.
    pub fn ensure_style(&mut self) -> bool {
        if self.stylesheet.is_some() {
            return false;
        }
        self.stylesheet = Some(style::stylesheet(&self.class_prefix));
        true
    }

    pub fn class_prefix(&self) -> &str {
        &self.class_prefix
    }

    pub fn stylesheet(&self) -> Option<&str> {
        self.stylesheet.as_deref()
    }

    /// Returns the prepared container for `key`, creating it on first use.
    pub fn prepare(
        &mut self,
        key: &str,
        label: &str,
        product: &Product,
    ) -> &mut PreparedContainer {
        let idx = match self.index.get(key) {
            Some(idx) => *idx,
            None => {
                self.containers.push(PreparedContainer {
                    key: key.to_string(),
                    label: label.to_string(),
                    product_id: product.id.clone(),
                    product_handle: product.handle.clone(),
                    product_title: product.title.clone(),
                    badges: Vec::new(),
                });
                let idx = self.containers.len() - 1;
                self.index.insert(key.to_string(), idx);
                idx
            }
        };
        &mut self.containers[idx]
    }

    pub fn container(&self, key: &str) -> Option<&PreparedContainer> {
        self.index.get(key).map(|idx| &self.containers[*idx])
    }

    /// Returns true if an element with this id has been applied anywhere.
    pub fn is_applied(&self, element_id: &str) -> bool {
        self.applied_ids.contains(element_id)
    }

    /// Appends a badge to a prepared container. Returns false on id collision.
    pub fn apply(&mut self, container_key: &str, element: BadgeElement) -> bool {
        let Some(idx) = self.index.get(container_key).copied() else {
            return false;
        };
        if !self.applied_ids.insert(element.id.clone()) {
            return false;
        }
        self.containers[idx].badges.push(element);
        true
    }

    pub fn containers(&self) -> &[PreparedContainer] {
        &self.containers
    }

    pub fn badge_count(&self) -> usize {
        self.applied_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.applied_ids.is_empty()
    }

    /// Renders the overlay as a standalone HTML document.
    pub fn to_html(&self, title: &str) -> String {
        let mut html = String::new();
        html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
        html.push_str(&format!("<title>{}</title>\n", escape_html(title)));
        if let Some(css) = &self.stylesheet {
            html.push_str(&format!(
                "<style id=\"{}-styles\">\n{}</style>\n",
                escape_html(&self.class_prefix),
                css
            ));
        }
        html.push_str("</head>\n<body>\n");

        for container in self.containers.iter().filter(|c| !c.badges.is_empty()) {
            html.push_str(&format!(
                "<div class=\"{p}-container\" data-container=\"{key}\" data-product-id=\"{id}\" \
                 style=\"position:relative;overflow:visible\">\n",
                p = escape_html(&self.class_prefix),
                key = escape_html(&container.key),
                id = escape_html(&container.product_id)
            ));
            html.push_str(&format!(
                "<p>{} <small>{}</small></p>\n",
                escape_html(&container.product_title),
                escape_html(&container.label)
            ));
            for badge in &container.badges {
                html.push_str(&badge.to_html());
                html.push('\n');
            }
            html.push_str("</div>\n");
        }

        html.push_str("</body>\n</html>\n");
        html
    }
}
