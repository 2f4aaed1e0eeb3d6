#![forbid(unsafe_code)]
//! galley-core library.
//!
//! The manuscript lifecycle state machine: submission, peer review,
//! editorial decisions, payment gating, the copy-editing sub-workflow and
//! publication, persisted through a [`store::ManuscriptStore`] with an
//! append-only, hash-chained timeline.
//!
//! # Conventions
//!
//! - **Errors**: library operations return [`error::WorkflowError`]; config
//!   and store bootstrap use `anyhow::Result`.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

pub mod actor;
pub mod clock;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod guard;
pub mod model;
pub mod notify;
pub mod payment;
pub mod store;
pub mod timeline;
pub mod workflow;

#[cfg(test)]
mod testing;

pub use actor::{Account, Actor, Role, RoleSet};
pub use engine::{Engine, Target};
pub use error::{ErrorCode, ErrorKind, WorkflowError};
