//! Client code for the Spasi.bg offline cache worker.
//!
//! This crate provides the HTTP fetch client that backs the worker's
//! network capability.

pub mod fetch;

pub use fetch::{FetchClient, FetchConfig, UrlError};
