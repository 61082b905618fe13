//! Typed record model for the reporting dashboard.
//!
//! # Responsibility
//! - Define the five record kinds owned by the record store.
//! - Reject malformed values at the boundary via `validate()`.
//! - Bundle filtered record sets into in-memory snapshots.
//!
//! # Invariants
//! - Every record is identified by a stable UUID that is never nil.
//! - Time entries and expenses are append-only ledgers.
//! - Snapshots are plain values; computing over them never mutates storage.

pub mod allocation;
pub mod date;
pub mod employee;
pub mod ledger;
pub mod project;
pub mod snapshot;
pub mod validation;
