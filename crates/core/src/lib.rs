//! Core of the Spasi.bg offline cache worker.
//!
//! This crate provides:
//! - The cache controller (install, activate, fetch, push, notification click)
//! - Worker lifecycle, event dispatch and registration
//! - Cache storage with SQLite and in-memory backends
//! - Host capability traits (network, clients, notifications)
//! - Unified error types and configuration

pub mod cache;
pub mod classify;
pub mod clients;
pub mod config;
pub mod controller;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod lifetime;
pub mod network;
pub mod notify;
pub mod runtime;

#[cfg(test)]
mod testing;

pub use cache::{CacheDb, CacheStorage, MemoryCacheStorage};
pub use config::{AppConfig, WorkerConfig};
pub use controller::{CacheController, Capabilities};
pub use error::Error;
pub use http::{Request, RequestKey, RequestMode, Response};
pub use runtime::{Event, Registration, WorkerRuntime};
