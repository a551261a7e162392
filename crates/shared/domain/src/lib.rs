//! # Domain Models
//!
//! Plain data shared across the Sluice crates. Only `serde`: no I/O, no validation logic.
//! Turning these values into live objects is the kernel's job.

pub mod config;
