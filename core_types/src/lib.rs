//! # Core Types
//!
//! This crate defines the fundamental types shared by the vOS scheduler
//! crates.
//!
//! ## Key Types
//!
//! - [`TaskId`]: Unique, monotonically issued task identifier
//! - [`TaskIdGenerator`]: Process-wide identifier source
//! - [`TaskPriority`]: LOW / MEDIUM / HIGH
//! - [`TaskState`]: READY / RUNNING / WAITING and the legal transitions between them

pub mod ids;
pub mod task;

pub use ids::{TaskId, TaskIdGenerator};
pub use task::{TaskPriority, TaskState};
