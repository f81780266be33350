//! Mock filesystem implementations for testing.
//!
//! This module provides `MockFs` and pre-built scenarios for exercising the
//! counter and detail readers without access to a Linux `/proc` or `/sys`.

mod filesystem;
mod scenarios;

pub use filesystem::MockFs;
