//! Testing utilities and mock implementations
//!
//! Scriptable stages and targets for exercising chains without real
//! interceptor implementations.

pub mod mocks;

pub use mocks::*;
