//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements                       | Connects to                 |
//! |------------|----------------------------------|-----------------------------|
//! | `hardware` | Comparator, Transport,           | ESP32-S3 GPIO, LEDC,        |
//! |            | SleepControl, SetDutyCycle,      | esp_timer, USB serial       |
//! |            | OutputPin                        |                             |
//! | `sim`      | all of the above                 | deterministic host model    |

#[cfg(feature = "espidf")]
pub mod hardware;
pub mod sim;
