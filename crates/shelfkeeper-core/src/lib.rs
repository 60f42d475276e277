//! Core library for shelfkeeper.
//!
//! Everything the console needs apart from the terminal itself lives here:
//!
//! - `api`: typed client for the remote catalog REST API
//! - `auth`: session persistence, login/logout and expiry handling
//! - `models`: products, pagination and the editable product draft
//! - `repository`: authenticated product CRUD
//! - `view`: UI-facing state machine that ties the pieces together
//! - `config`: configuration file and environment overrides

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod repository;
pub mod view;

#[cfg(test)]
pub(crate) mod test_support;
