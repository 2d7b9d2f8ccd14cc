//! Utility functions for code generation and URL processing.
//!
//! - [`code_generator`] - Short code generation and validation
//! - [`url_normalizer`] - Input URL cleaning and validation

pub mod code_generator;
pub mod url_normalizer;
