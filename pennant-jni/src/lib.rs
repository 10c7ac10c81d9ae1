//! Pennant JVM Bindings
//!
//! Translates between JVM strings and handles and the Pennant C ABI. The
//! translation core (`Adapter`) is written against the `ForeignRuntime`
//! trait and a `NativeAbi` function table; the `jni` feature adds the
//! `NativeEngine` native methods on top of it.
//!
//! Every response the engine allocates is copied into a runtime string and
//! handed to `destroy_string` before the adapter returns. Handles travel as
//! `long`; the Java side must destroy each one exactly once and never while
//! another call on it is in flight.

pub mod abi;
pub mod adapter;
pub mod error;
#[cfg(feature = "jni")]
pub mod java;
pub mod response;
pub mod runtime;

pub use abi::NativeAbi;
pub use adapter::{Adapter, Evaluation, Query};
pub use error::{AdapterError, AdapterResult};
pub use response::ResponseGuard;
pub use runtime::ForeignRuntime;
