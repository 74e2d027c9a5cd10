//! Database collaborators for the Spurt storage layer
//!
//! The storage layer never owns relational records. This crate implements the
//! hooks it calls into, backed by Postgres through sqlx.

pub mod image_references;

pub use image_references::PgImageReferences;
