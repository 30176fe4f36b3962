//! Contact domain model.
//!
//! # Responsibility
//! - Define the canonical contact record used by CSV, services and storage.
//!
//! # Invariants
//! - Deletion is represented by a soft-delete flag, never by hard delete.

pub mod contact;
