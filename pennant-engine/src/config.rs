//! Engine options
//!
//! Options arrive as a JSON object at construction time. Unknown members are
//! ignored so hosts can pass a superset of what this engine understands.

use std::path::PathBuf;
use std::time::Duration;

use pennant_evaluation::Document;
use serde::Deserialize;

use crate::error::{EngineError, EngineResult};

/// Where the engine gets its flag document from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Inline `snapshot` member, loaded once
    #[default]
    Local,
    /// Document file at `path`, re-read every `update_interval`
    File,
}

/// What to do when a refresh fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorStrategy {
    /// Surface the failure from every operation until a refresh succeeds
    #[default]
    Fail,
    /// Keep serving the last good snapshot
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineOpts {
    pub source: SourceKind,

    pub snapshot: Option<Document>,

    pub path: Option<PathBuf>,

    /// Refresh period in seconds, `0` disables refresh
    pub update_interval: u64,

    pub error_strategy: ErrorStrategy,

    /// Tracing filter directive, e.g. `"pennant_engine=debug"`
    pub log_level: Option<String>,
}

impl Default for EngineOpts {
    fn default() -> Self {
        Self {
            source: SourceKind::Local,
            snapshot: None,
            path: None,
            update_interval: 120,
            error_strategy: ErrorStrategy::Fail,
            log_level: None,
        }
    }
}

impl EngineOpts {
    /// Parse and validate an options payload
    pub fn from_json(json: &str) -> EngineResult<Self> {
        let opts: Self = serde_json::from_str(json)
            .map_err(|e| EngineError::InvalidOptions(e.to_string()))?;
        opts.validate()?;
        Ok(opts)
    }

    pub fn validate(&self) -> EngineResult<()> {
        match self.source {
            SourceKind::File if self.path.is_none() => Err(EngineError::InvalidOptions(
                "file source requires a path".to_string(),
            )),
            _ => Ok(()),
        }
    }

    /// Refresh period, `None` when the source is never re-read
    pub fn refresh_interval(&self) -> Option<Duration> {
        match self.source {
            SourceKind::File if self.update_interval > 0 => {
                Some(Duration::from_secs(self.update_interval))
            }
            _ => None,
        }
    }
}
