//! Utility functions for display formatting.

pub mod format;

pub use format::{format_price, pad_to_width, truncate_string};
