//! Utilities for model_sync
//!
//! This module provides utility functions used across the library.

pub mod logging;
pub mod naming;

pub use naming::{quote_literal, validate_default_value, validate_identifier};
