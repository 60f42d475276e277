//! Data models for the product catalog.
//!
//! - `Product`, `ProductPage`: records as the remote API returns them
//! - `Pagination`: listing metadata
//! - `ProductDraft`, `ProductField`: typed editing state for the modal form

pub mod draft;
pub mod pagination;
pub mod product;

pub use draft::{DraftError, ProductDraft, ProductField};
pub use pagination::Pagination;
pub use product::{Product, ProductPage};
