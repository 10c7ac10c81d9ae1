//! Pennant Engine
//!
//! Wraps the evaluator with everything a host needs around it: options
//! parsing, snapshot sources with background refresh, opt-in logging and the
//! JSON payload codec used at the C ABI.

pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod payload;
pub mod poller;
pub mod source;

pub use config::{EngineOpts, ErrorStrategy, SourceKind};
pub use engine::{Engine, DEFAULT_NAMESPACE};
pub use error::{EngineError, EngineResult};

/// String-in, string-out view of an engine
///
/// Every method returns a complete response envelope, including for
/// malformed input. This is the only interface the C ABI layer consumes.
pub trait PayloadEngine: Send + Sync {
    fn evaluate_boolean(&self, request: &str) -> String;

    fn evaluate_variant(&self, request: &str) -> String;

    fn evaluate_batch(&self, request: &str) -> String;

    fn list_flags(&self) -> String;

    /// Current flag document
    fn snapshot(&self) -> String;
}
