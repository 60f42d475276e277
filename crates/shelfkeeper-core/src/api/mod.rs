//! REST API client module for the remote product catalog.
//!
//! This module provides the `CatalogApi` seam and its reqwest-backed
//! `ApiClient` implementation.
//!
//! The API authenticates with an opaque token sent verbatim in the
//! `Authorization` header, obtained from the admin signin endpoint.

pub mod client;
pub mod error;

pub use client::{ApiClient, ApiSettings, CatalogApi, Credentials, SigninGrant};
pub use error::{ApiError, ApiResult};
