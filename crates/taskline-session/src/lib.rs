//! Authentication state store for the task manager.
//!
//! [`SessionStore`] tracks who is signed in. All mutations flow through one
//! ordered queue so concurrent operations resolve deterministically;
//! observers watch [`AuthSnapshot`] values and listen for [`Notice`]s.
//! Sessions can be persisted to disk and restored on the next start.

#![deny(unsafe_code)]

pub mod errors;
pub mod notice;
pub mod persist;
pub mod store;

pub use errors::StoreError;
pub use notice::{Notice, NoticeKind};
pub use store::{AuthSnapshot, SessionStore};
