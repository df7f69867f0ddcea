//! Host-side helpers for reading the instrument over its serial link.

pub mod cpm;
