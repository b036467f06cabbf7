//! DOM adapter: the tree queries the scanner needs, behind a trait.
//!
//! [`HtmlDom`] flattens a parsed document into an arena so nodes are plain
//! indices. Node keys are structural paths (`0/1/3`): child positions among
//! element siblings from the root. They address nodes within one document
//! and shift when markup is inserted ahead of a node.

use crate::storefront::selectors::{detail, listing};
use scraper::{ElementRef, Html};
use std::fmt::Debug;
use std::hash::Hash;

/// Read-only view of a page for product discovery.
pub trait PageDom {
    type Node: Copy + Eq + Hash + Debug;

    /// Product links in document order.
    fn product_links(&self) -> Vec<Self::Node>;

    fn href(&self, node: Self::Node) -> Option<String>;

    /// Priority rank (0 = best) of the first card selector the node matches.
    fn matches_card(&self, node: Self::Node) -> Option<usize>;

    fn parent(&self, node: Self::Node) -> Option<Self::Node>;

    /// True if the node has an image among its descendants.
    fn contains_image(&self, node: Self::Node) -> bool;

    /// Short description such as `div.card-wrapper`.
    fn node_label(&self, node: Self::Node) -> String;

    /// Position of the node, identical across re-parses of the same markup.
    fn node_key(&self, node: Self::Node) -> String;

    /// Main product media wrapper on a detail page.
    fn detail_media(&self) -> Option<Self::Node>;
}

/// [`PageDom`] over a parsed `scraper` document.
pub struct HtmlDom<'a> {
    elements: Vec<ElementRef<'a>>,
    parents: Vec<Option<usize>>,
    keys: Vec<String>,
}

impl<'a> HtmlDom<'a> {
    pub fn new(document: &'a Html) -> Self {
        let mut dom = Self { elements: Vec::new(), parents: Vec::new(), keys: Vec::new() };
        dom.walk(document.root_element(), None, "0".to_string());
        dom
    }

    fn walk(&mut self, element: ElementRef<'a>, parent: Option<usize>, key: String) {
        let idx = self.elements.len();
        self.elements.push(element);
        self.parents.push(parent);
        self.keys.push(key);

        for (position, child) in element.children().filter_map(ElementRef::wrap).enumerate() {
            let child_key = format!("{}/{}", self.keys[idx], position);
            self.walk(child, Some(idx), child_key);
        }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn element(&self, node: usize) -> Option<ElementRef<'a>> {
        self.elements.get(node).copied()
    }
}

impl PageDom for HtmlDom<'_> {
    type Node = usize;

    fn product_links(&self) -> Vec<usize> {
        (0..self.elements.len())
            .filter(|idx| listing::PRODUCT_LINK.matches(&self.elements[*idx]))
            .collect()
    }

    fn href(&self, node: usize) -> Option<String> {
        self.element(node)?.value().attr("href").map(String::from)
    }

    fn matches_card(&self, node: usize) -> Option<usize> {
        let element = self.element(node)?;
        listing::CARD_PRIORITY.iter().position(|selector| selector.matches(&element))
    }

    fn parent(&self, node: usize) -> Option<usize> {
        self.parents.get(node).copied().flatten()
    }

    fn contains_image(&self, node: usize) -> bool {
        self.element(node).is_some_and(|e| e.select(&listing::IMAGE).next().is_some())
    }

    fn node_label(&self, node: usize) -> String {
        let Some(element) = self.element(node) else {
            return String::new();
        };
        let value = element.value();
        let mut label = value.name().to_string();
        if let Some(id) = value.id() {
            label.push('#');
            label.push_str(id);
        }
        for class in value.classes() {
            label.push('.');
            label.push_str(class);
        }
        label
    }

    fn node_key(&self, node: usize) -> String {
        self.keys.get(node).cloned().unwrap_or_default()
    }

    fn detail_media(&self) -> Option<usize> {
        detail::MEDIA_PRIORITY
            .iter()
            .find_map(|selector| self.elements.iter().position(|e| selector.matches(e)))
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"<html><body>
        <ul class="grid">
          <li class="grid__item">
            <div class="card-wrapper product-card">
              <a href="/products/linen-shirt"><img src="shirt.jpg"></a>
              <a href="/products/linen-shirt" class="title">Linen Shirt</a>
            </div>
          </li>
          <li class="grid__item" id="hat">
            <a href="/collections/summer/products/straw-hat">Straw Hat</a>
          </li>
        </ul>
        <a href="/pages/about">About</a>
    </body></html>"#;

    #[test]
    fn test_product_links() {
        let document = Html::parse_document(LISTING);
        let dom = HtmlDom::new(&document);

        let hrefs: Vec<_> = dom.product_links().into_iter().filter_map(|n| dom.href(n)).collect();
        assert_eq!(
            hrefs,
            vec!["/products/linen-shirt", "/products/linen-shirt", "/collections/summer/products/straw-hat"]
        );
    }

    #[test]
    fn test_matches_card_rank() {
        let document = Html::parse_document(LISTING);
        let dom = HtmlDom::new(&document);

        let link = dom.product_links()[0];
        let wrapper = dom.parent(link).unwrap();
        assert_eq!(dom.node_label(wrapper), "div.card-wrapper.product-card");
        // .card-wrapper outranks .product-card
        assert_eq!(dom.matches_card(wrapper), Some(0));

        let item = dom.parent(wrapper).unwrap();
        assert_eq!(dom.node_label(item), "li.grid__item");
        assert!(dom.matches_card(item).unwrap() > 0);
        assert_eq!(dom.matches_card(link), None);
    }

    #[test]
    fn test_contains_image_and_labels() {
        let document = Html::parse_document(LISTING);
        let dom = HtmlDom::new(&document);

        let hat_link = dom.product_links()[2];
        let item = dom.parent(hat_link).unwrap();
        assert_eq!(dom.node_label(item), "li#hat.grid__item");
        assert!(!dom.contains_image(item));
        assert!(dom.contains_image(dom.parent(item).unwrap()));
    }

    #[test]
    fn test_node_keys_are_stable() {
        let first = Html::parse_document(LISTING);
        let second = Html::parse_document(LISTING);
        let a = HtmlDom::new(&first);
        let b = HtmlDom::new(&second);

        let keys_a: Vec<_> = a.product_links().into_iter().map(|n| a.node_key(n)).collect();
        let keys_b: Vec<_> = b.product_links().into_iter().map(|n| b.node_key(n)).collect();
        assert_eq!(keys_a, keys_b);
        assert_eq!(a.node_key(0), "0");
        assert!(keys_a.iter().all(|k| k.starts_with("0/")));
        assert_ne!(keys_a[0], keys_a[1]);
    }

    #[test]
    fn test_detail_media() {
        let document = Html::parse_document(
            r#"<html><body><div class="product">
                <div class="product__media-wrapper"><img src="a.jpg"></div>
            </div></body></html>"#,
        );
        let dom = HtmlDom::new(&document);

        let media = dom.detail_media().unwrap();
        assert_eq!(dom.node_label(media), "div.product__media-wrapper");
        assert!(HtmlDom::new(&Html::parse_document(LISTING)).detail_media().is_none());
    }
}
