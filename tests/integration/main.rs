//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that runs the real main loop against
//! the simulated board.  All tests run on the host with no real hardware
//! required.

mod command_tests;
mod counting_tests;
mod mock_hw;
mod regulation_tests;
