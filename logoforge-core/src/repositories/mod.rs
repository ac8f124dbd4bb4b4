//! # Repositories
//!
//! Shared, deduplicated data that documents refer to by ID rather than owning outright.

pub mod assets;
