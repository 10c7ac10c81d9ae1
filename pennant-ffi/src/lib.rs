//! Pennant C FFI Layer
//!
//! C-compatible bindings for the Pennant flag evaluation engine. Requests
//! and responses are JSON strings; see `include/pennant_engine.h`.
//!
//! ## Safety
//!
//! The FFI layer maintains these safety guarantees:
//! - Null handles and null strings are rejected, never dereferenced
//! - Every returned string must be freed with `destroy_string`, exactly once
//! - Caller-owned strings are only borrowed for the duration of a call
//! - No panic crosses the FFI boundary
//!
//! Handle liveness is the caller's responsibility: a destroyed handle must
//! not be used again, and `destroy_engine` must not race other calls on the
//! same handle.

use std::os::raw::c_char;

pub mod bridge;
mod engine;
mod error;
pub mod handle;
pub mod string;

pub use engine::*;
pub use error::{take_last_error, BridgeError};
pub use handle::EngineHandle;
pub use string::EngineString;

// Version information
pub const PENNANT_VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();

/// Get the library version string (static, never freed)
#[no_mangle]
pub extern "C" fn pennant_version() -> *const c_char {
    PENNANT_VERSION.as_ptr() as *const c_char
}
