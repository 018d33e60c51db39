//! Core types and trait definitions for the forma schema store.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! Storage backends implement [`store::SchemaStore`]; the structured-output
//! capability is reached through [`cast::Caster`].

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod builtin;
pub mod cast;
pub mod error;
pub mod generation;
pub mod ids;
pub mod schema;
pub mod store;

pub use error::{Classify, Error, ErrorKind, Result};
