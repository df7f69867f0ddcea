//! High-voltage supply control: the bounded PWM duty and the comparator
//! feedback loop that drives it.

pub mod duty;
pub mod regulator;
