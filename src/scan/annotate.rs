//! Re-serializes a scanned page with the overlay injected.
//!
//! Elements are addressed by the same structural keys [`super::HtmlDom`]
//! hands out, so the walk here must enumerate element children exactly the
//! way the DOM adapter does. The anchors map those keys to overlay containers.

use crate::badge::escape_html;
use crate::overlay::Overlay;
use scraper::{ElementRef, Html, Node};
use std::collections::HashMap;

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Returns the page as HTML with the stylesheet in `<head>` and each badge
/// appended inside the element its container is anchored to.
pub fn annotate_document(
    document: &Html,
    overlay: &Overlay,
    anchors: &HashMap<String, String>,
) -> String {
    let mut out = String::from("<!DOCTYPE html>\n");
    write_element(&mut out, document.root_element(), "0", overlay, anchors);
    out.push('\n');
    out
}

fn write_element(
    out: &mut String,
    element: ElementRef<'_>,
    key: &str,
    overlay: &Overlay,
    anchors: &HashMap<String, String>,
) {
    let value = element.value();
    let name = value.name();
    let container = anchors
        .get(key)
        .and_then(|id| overlay.container(id))
        .filter(|c| !c.badges.is_empty());
    let container_class = format!("{}-container", overlay.class_prefix());

    out.push('<');
    out.push_str(name);

    let mut has_class = false;
    for (attr, attr_value) in value.attrs() {
        let attr_value = if attr == "class" && container.is_some() {
            has_class = true;
            format!("{} {}", attr_value, container_class)
        } else {
            attr_value.to_string()
        };
        out.push_str(&format!(" {}=\"{}\"", attr, escape_html(&attr_value)));
    }
    if container.is_some() && !has_class {
        out.push_str(&format!(" class=\"{}\"", escape_html(&container_class)));
    }
    out.push('>');

    if VOID_ELEMENTS.contains(&name) {
        return;
    }

    let raw_text = RAW_TEXT_ELEMENTS.contains(&name);
    let mut position = 0;

    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                if raw_text {
                    out.push_str(text);
                } else {
                    out.push_str(&escape_text(text));
                }
            }
            Node::Comment(comment) => {
                out.push_str("<!--");
                out.push_str(comment);
                out.push_str("-->");
            }
            Node::Element(_) => {
                if let Some(child_element) = ElementRef::wrap(child) {
                    let child_key = format!("{}/{}", key, position);
                    write_element(out, child_element, &child_key, overlay, anchors);
                    position += 1;
                }
            }
            _ => {}
        }
    }

    if name == "head" {
        if let Some(css) = overlay.stylesheet() {
            out.push_str(&format!(
                "<style id=\"{}-styles\">\n{}</style>",
                escape_html(overlay.class_prefix()),
                css
            ));
        }
    }

    if let Some(container) = container {
        for badge in &container.badges {
            out.push_str(&badge.to_html());
        }
    }

    out.push_str("</");
    out.push_str(name);
    out.push('>');
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::badge::{BadgeElement, Placement, Position, RenderSettings};
    use crate::rules::BadgeRule;
    use crate::scan::dom::{HtmlDom, PageDom};
    use crate::storefront::models::Product;

    const PAGE: &str = r#"<html><head><title>Shop &amp; Co</title></head><body>
        <div class="card-wrapper"><a href="/products/hat"><img src="hat.jpg"></a></div>
        <div><a href="/products/cap">Cap</a></div>
        <script>if (a < b) { go(); }</script>
    </body></html>"#;

    fn anchored(node_key: &str) -> HashMap<String, String> {
        HashMap::from([(node_key.to_string(), "hat#0".to_string())])
    }

    fn make_overlay() -> Overlay {
        let product = Product { id: "101".into(), ..Default::default() };
        let element = BadgeElement::build(
            &BadgeRule::new("7", "SALE"),
            &product,
            Placement::new(Position::default(), 0),
            &RenderSettings::default(),
        );

        let mut overlay = Overlay::new("sb-badge");
        overlay.ensure_style();
        overlay.prepare("hat#0", "div.card-wrapper", &product);
        overlay.apply("hat#0", element);
        overlay
    }

    #[test]
    fn test_badge_lands_in_matching_container() {
        let document = Html::parse_document(PAGE);
        let dom = HtmlDom::new(&document);
        let link = dom.product_links()[0];
        let card = dom.parent(link).unwrap();

        let html = annotate_document(&document, &make_overlay(), &anchored(&dom.node_key(card)));

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains(r#"<div class="card-wrapper sb-badge-container">"#));
        let badge_at = html.find(r#"id="sb-badge-101-7""#).unwrap();
        let card_at = html.find("card-wrapper").unwrap();
        let cap_at = html.find("/products/cap").unwrap();
        assert!(card_at < badge_at && badge_at < cap_at);
        assert_eq!(html.matches("sb-badge-101-7").count(), 1);
    }

    #[test]
    fn test_stylesheet_in_head_and_text_preserved() {
        let document = Html::parse_document(PAGE);
        let html = annotate_document(&document, &make_overlay(), &anchored("0/1/0"));

        let style_at = html.find(r#"<style id="sb-badge-styles">"#).unwrap();
        assert!(style_at < html.find("</head>").unwrap());
        assert!(html.contains("<title>Shop &amp; Co</title>"));
        assert!(html.contains("if (a < b) { go(); }"));
        assert!(html.contains(r#"<img src="hat.jpg">"#));
        assert!(!html.contains("</img>"));
    }

    #[test]
    fn test_container_without_class_attribute() {
        let document = Html::parse_document(PAGE);
        let dom = HtmlDom::new(&document);
        let cap_link = dom.product_links()[1];
        let plain_div = dom.parent(cap_link).unwrap();

        let html = annotate_document(&document, &make_overlay(), &anchored(&dom.node_key(plain_div)));
        assert!(html.contains(r#"<div class="sb-badge-container"><a href="/products/cap">"#));
    }

    #[test]
    fn test_unanchored_container_is_not_rendered() {
        let document = Html::parse_document(PAGE);
        let html = annotate_document(&document, &make_overlay(), &HashMap::new());
        assert!(html.contains(r#"<style id="sb-badge-styles">"#));
        assert!(!html.contains("sb-badge-101-7"));
        assert!(!html.contains("sb-badge-container\""));
    }

    #[test]
    fn test_empty_overlay_roundtrips_markup() {
        let document = Html::parse_document(PAGE);
        let html = annotate_document(&document, &Overlay::new("sb-badge"), &HashMap::new());
        assert!(!html.contains("sb-badge"));
        assert!(html.contains(r#"<a href="/products/hat">"#));
    }
}
