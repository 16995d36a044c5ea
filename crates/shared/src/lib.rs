//! Shared utilities and common types for the meeting scheduler backend.
//!
//! This crate provides common functionality used across all other crates:
//! - Event scope and identifier validation
//! - Page/limit pagination math
//! - Meeting code generation

pub mod codes;
pub mod pagination;
pub mod validation;
