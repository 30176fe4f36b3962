//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the contact store contract consumed by services.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Repository writes enforce `Contact::validate()` before persistence.
//! - Repository APIs return semantic errors (`NotFound`, `DuplicateEmail`) in
//!   addition to DB transport errors.

pub mod contact_repo;
