//! Data-access layer for the task manager.
//!
//! Three thin API surfaces over one shared [`Backend`](taskline_backend::Backend)
//! handle:
//!
//! - [`AuthApi`] — login, registration, profile reads and updates
//! - [`TaskApi`] — task CRUD with soft deletion and audit history
//! - [`AdminApi`] — system statistics, audit trail, user listing, bulk writes
//!
//! This layer owns input validation, the session-required checks, and the
//! join between auth identities and profile rows. It holds no state of its
//! own; all three surfaces are cheap clones around the backend handle.

#![deny(unsafe_code)]

pub mod admin;
pub mod auth_api;
pub mod errors;
pub mod tasks;

pub use admin::{AdminApi, UserActivity};
pub use auth_api::AuthApi;
pub use errors::DataError;
pub use tasks::TaskApi;
