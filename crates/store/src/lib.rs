//! SQLite persistence for ffsgate.
//!
//! This crate owns every record the application keeps locally. The remote
//! Powergate service holds the actual data; these tables only remember which
//! profiles exist, which files were pushed through which profile, and what
//! happened along the way.
//!
//! # Architecture
//! The store holds three record kinds:
//! - **FFS profiles** ([`Ffs`]): a backend-issued identifier and auth token,
//!   plus a flag marking the single default profile.
//! - **Stored files** ([`StoredFile`]): one row per successful upload, keyed
//!   by the CID the backend assigned. Owned by a profile; deleting the profile
//!   deletes its files.
//! - **Log entries** ([`LogEntry`]): the append-only audit trail shown to the
//!   user. Written alongside the records they describe, in the same
//!   transaction whenever there is one.

mod db;
pub mod error;
mod models;
mod repo;

pub use crate::db::Database;
pub use crate::models::{Ffs, LogEntry, NewFfs, NewFile, StoredFile};
pub use crate::repo::Repository;
