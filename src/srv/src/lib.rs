//! # skillz
//!
//! Backend for the skills-management application: a user directory and a
//! skill catalog over a relational store, plus the permission predicate the
//! web client evaluates locally.
//!
//! Transport is not this crate's concern: an external web layer calls the
//! repositories with already-validated inputs and serializes whatever they
//! return.

#![deny(
    clippy::undocumented_unsafe_blocks,
    clippy::missing_safety_doc,
    reason = "multi-person projects should document dangers"
)]
#![warn(missing_docs)]
#![cfg_attr(
    not(any(test, debug_assertions)),
    deny(
        clippy::missing_panics_doc,
        clippy::panic,
        clippy::unimplemented,
        clippy::unwrap_used,
        reason = "prefer errors over panicking"
    )
)]
#![cfg_attr(
    not(any(test, debug_assertions)),
    forbid(clippy::todo, reason = "production code should not use `todo`")
)]

pub mod catalog;
pub mod config;
pub mod credential;
pub mod data;
pub mod directory;
pub mod error;
pub mod permissions;
pub mod store;

pub use catalog::SkillCatalog;
pub use config::Config;
pub use directory::UserDirectory;
pub use error::StoreError;
pub use store::Store;
