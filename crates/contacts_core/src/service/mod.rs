//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Keep CLI and other front ends decoupled from storage details.

pub mod contact_service;
pub mod csv_service;
