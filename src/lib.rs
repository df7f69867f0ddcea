//! Geiger counter firmware library.
//!
//! Exposes the pure-logic modules for integration testing and the host-side
//! count-rate estimator.  All ESP-IDF-specific code is guarded by the
//! `espidf` feature within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod control;
pub mod diagnostics;
pub mod error;
pub mod host;
pub mod pulse;
pub mod report;
pub mod scheduler;
pub mod shared;
pub mod window;

pub mod adapters;
pub mod drivers;

#[cfg(feature = "espidf")]
pub mod pins;
