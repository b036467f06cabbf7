//! shelf-badges - Storefront badge rule evaluator and page scanner
//!
//! Decides which promotional badges a product qualifies for and places them
//! on the product containers of a storefront page.

pub mod badge;
pub mod commands;
pub mod config;
pub mod error;
pub mod format;
pub mod overlay;
pub mod rules;
pub mod scan;
pub mod storefront;

pub use badge::{BadgeElement, Placement, Position, RenderSettings};
pub use config::Config;
pub use error::BadgeError;
pub use rules::{is_eligible, is_eligible_at, BadgeRule};
pub use scan::{ScanController, ScanReport, ScanSession};
pub use storefront::models::{PageType, Product};
