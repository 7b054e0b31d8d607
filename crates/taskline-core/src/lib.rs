//! # taskline-core
//!
//! Foundation types, branded IDs, pagination, and errors for the taskline SDK.
//!
//! This crate provides the shared vocabulary that all other taskline crates
//! depend on:
//!
//! - **Branded IDs**: `UserId`, `TaskId`, `AuditLogId` as newtypes for type safety
//! - **Entities**: `User`, `Task`, `AuditLog`, `SystemStats` with serde wire shapes
//! - **Pagination**: `PageRequest` (1-based) and the `Page<T>` response envelope
//! - **Params**: explicit partial-update structs (`TaskPatch`, `ProfilePatch`, ...)
//!   validated before dispatch
//! - **Errors**: `ValidationError` via `thiserror`

#![deny(unsafe_code)]

pub mod errors;
pub mod ids;
pub mod logging;
pub mod page;
pub mod params;
pub mod types;

pub use errors::ValidationError;
pub use ids::{AuditLogId, TaskId, UserId};
pub use page::{Page, PageRequest};
pub use params::{Credentials, NewTask, ProfilePatch, Registration, TaskFilter, TaskPatch};
pub use types::{AuditLog, SystemStats, Task, TaskPriority, TaskStatus, User, UserRole};
