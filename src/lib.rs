//! Ephemeral containerized test environments seeded from SQL schemas.
//!
//! The pipeline runs leaf to root:
//! - [`schema`] parses CREATE TABLE DDL and orders tables along foreign keys
//! - [`synth`] synthesizes per-column values
//! - [`generator`] produces a referentially consistent dataset and INSERTs
//! - [`container`] checks the runtime and provisions database and
//!   application containers

pub mod config;
pub mod container;
pub mod error;
pub mod generator;
pub mod input;
pub mod schema;
pub mod synth;

pub use error::{Error, Result, RuntimeError};
