//! Testing utilities and mock implementations
//!
//! This module provides mock implementations of the application-facing seams
//! so facade behavior can be tested without an MQTT broker.

pub mod mocks;

pub use mocks::*;
