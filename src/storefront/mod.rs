//! Storefront data access: product models, page parsing and the HTTP client.

pub mod client;
pub mod extract;
pub mod models;
pub mod page;
pub mod selectors;

pub use client::{StorefrontClient, StorefrontSource};
pub use extract::{default_sources, extract_product, ProductSource};
pub use models::{PageType, Product, Tags, Variant};
