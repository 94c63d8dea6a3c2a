//! # Session OTP Utilities
//!
//! Shared utilities for one-time passcodes:
//! - uniform 6-digit code generation behind a seedable `CodeSource`
//! - candidate canonicalization
//! - constant-time comparison

mod compare;
mod generator;

pub use compare::{canonicalize, constant_time_eq};
pub use generator::{CodeSource, FixedCodeSource, OtpGenerator, CODE_LENGTH, CODE_MAX, CODE_MIN};
