//! Domain layer for the meeting scheduler backend.
//!
//! This crate contains:
//! - Domain models (event scope, profiles, meetings, QnA answers)
//! - Store ports and their in-memory implementations
//! - Business logic services (directory cache, availability, lifecycle, drafts)
//! - The scheduling error taxonomy

pub mod error;
pub mod models;
pub mod ports;
pub mod services;

pub use error::{SchedulingError, StoreError};
