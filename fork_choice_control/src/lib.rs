//! Supporting code for the fork choice store.
//!
//! This crate handles the following concerns:
//! - Sharing the store between a single writer and any number of concurrent readers.
//! - Rolling back mutations that fail partway through.
//! - Logging the outcome of each mutation.
//! - Testing, including fixtures in the format of fork choice tests from `consensus-spec-tests`.

pub use crate::controller::Controller;

mod controller;
mod mutator;
mod queries;

#[cfg(test)]
mod helpers;
