//! Badge class names, the shared stylesheet and per-badge inline style.

use super::placement::Placement;
use crate::rules::{Animation, BadgeRule, Shape};

/// Distance in pixels between a badge and the container edge it is anchored to.
pub const EDGE_INSET_PX: u32 = 10;

/// Class list for a badge element.
pub fn badge_classes(prefix: &str, rule: &BadgeRule, placement: &Placement) -> Vec<String> {
    let mut classes = vec![
        prefix.to_string(),
        format!("{}--{}", prefix, rule.shape),
        format!("{}--pos-{}", prefix, placement.position.cell()),
    ];
    if rule.animation != Animation::None {
        classes.push(format!("{}--anim-{}", prefix, rule.animation));
    }
    classes
}

/// Inline declarations carrying the rule's colours, sizing, z-index and placement.
pub fn inline_style(rule: &BadgeRule, placement: &Placement, z_index: i32, spacing_px: u32) -> String {
    let mut declarations = vec![
        placement.css(EDGE_INSET_PX, spacing_px),
        format!("background-color:{}", rule.background_color),
        format!("color:{}", rule.text_color),
        format!("font-size:{}px", rule.font_size),
        format!("padding:{}", rule.padding),
        format!("z-index:{}", z_index),
    ];

    if let Some(border) = &rule.border_color {
        declarations.push(format!("border:1px solid {}", border));
    }

    if let Some(radius) = rule.border_radius {
        declarations.push(format!("border-radius:{}px", radius));
    }

    declarations.join(";")
}

/// The shared stylesheet. Injected once per overlay.
pub fn stylesheet(prefix: &str) -> String {
    let mut css = String::new();

    css.push_str(&format!(
        ".{p}-container{{position:relative !important;overflow:visible !important}}\n\
         .{p}{{position:absolute;display:inline-block;line-height:1.2;font-weight:700;\
         white-space:nowrap;pointer-events:none;box-sizing:border-box}}\n",
        p = prefix
    ));

    for shape in Shape::all() {
        let body = match shape {
            Shape::Rectangle => "border-radius:0",
            Shape::Rounded => "border-radius:4px",
            Shape::Pill => "border-radius:999px",
            Shape::Circle => {
                "border-radius:50%;min-width:3em;min-height:3em;display:flex;\
                 align-items:center;justify-content:center"
            }
            Shape::Ribbon => "border-radius:0;clip-path:polygon(0 0,100% 0,90% 50%,100% 100%,0 100%)",
            Shape::Star => {
                "clip-path:polygon(50% 0,61% 35%,98% 35%,68% 57%,79% 91%,50% 70%,\
                 21% 91%,32% 57%,2% 35%,39% 35%);min-width:4em;min-height:4em;text-align:center"
            }
            Shape::Tag => "border-radius:0 4px 4px 0;clip-path:polygon(10% 0,100% 0,100% 100%,10% 100%,0 50%)",
        };
        css.push_str(&format!(".{}--{}{{{}}}\n", prefix, shape, body));
    }

    for animation in Animation::all().iter().filter(|a| **a != Animation::None) {
        css.push_str(&format!(
            ".{p}--anim-{a}{{animation:{p}-{a} 2s ease-in-out infinite}}\n",
            p = prefix,
            a = animation
        ));
    }

    css
}
