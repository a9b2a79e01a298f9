//! services/functions/src/lib.rs
//!
//! Library crate for the `functions` service: the server-side half of the
//! app, hosting the operations that need credentials the client bundle must
//! never carry.

pub mod adapters;
pub mod config;
pub mod error;
pub mod web;
