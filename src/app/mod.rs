//! Application core: pure domain logic, zero I/O.
//!
//! This module contains the rules of the instrument: the host command
//! table, the reply lines, and the main-loop iteration that ties HV
//! regulation, counting and the indicator together.  All interaction with
//! hardware happens through **port traits** defined in [`ports`], keeping
//! this layer fully testable without real peripherals.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
