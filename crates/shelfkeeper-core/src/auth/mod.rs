//! Authentication module for managing the operator session.
//!
//! This module provides:
//! - `LocalStorage`: durable client-local key-value store
//! - `SessionStore`: token + expiry persistence with a cookie mirror
//! - `AuthController`: login, logout, session checks and expiry timer
//!
//! Sessions are persisted to disk and expire after a fixed TTL.

pub mod controller;
pub mod session;
pub mod storage;

pub use controller::{AuthController, AuthEvent, AuthStatus};
pub use session::{Clock, Session, SessionStore, SystemClock};
pub use storage::LocalStorage;
