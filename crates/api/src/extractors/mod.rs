//! Custom Axum extractors.

pub mod caller;

pub use caller::{Caller, EventContext, ICE_IDS_HEADER, USER_ID_HEADER, USER_ROLES_HEADER};
