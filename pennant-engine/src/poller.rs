//! Background snapshot refresh
//!
//! One named thread per engine. The thread waits on a channel with a timeout
//! equal to the refresh interval; dropping the `Poller` closes the channel,
//! which wakes the thread immediately, and then joins it.

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use parking_lot::RwLock;
use pennant_evaluation::{Evaluator, Snapshot};
use tracing::{debug, error, warn};

use crate::config::ErrorStrategy;
use crate::error::{EngineError, EngineResult};
use crate::source::Fetcher;

pub struct Poller {
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Poller {
    pub fn spawn(
        mut fetcher: Box<dyn Fetcher>,
        evaluator: Arc<RwLock<Evaluator>>,
        interval: Duration,
        strategy: ErrorStrategy,
    ) -> EngineResult<Self> {
        let (stop, stopped) = mpsc::channel::<()>();

        let handle = std::thread::Builder::new()
            .name("pennant-refresh".to_string())
            .spawn(move || loop {
                match stopped.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        refresh(fetcher.as_mut(), &evaluator, strategy);
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })
            .map_err(|e| EngineError::Spawn(e.to_string()))?;

        debug!(interval_secs = interval.as_secs(), "Snapshot refresh started");

        Ok(Self {
            stop: Some(stop),
            handle: Some(handle),
        })
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        drop(self.stop.take());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("Snapshot refresh thread panicked");
            }
        }
    }
}

/// Fetch once and apply the result to the evaluator
pub fn refresh(fetcher: &mut dyn Fetcher, evaluator: &RwLock<Evaluator>, strategy: ErrorStrategy) {
    let namespace = evaluator.read().namespace().to_string();

    let result = fetcher.fetch().and_then(|document| match document {
        Some(document) => Ok(Some(Snapshot::build(&namespace, document)?)),
        None => Ok(None),
    });

    match result {
        Ok(Some(snapshot)) => {
            debug!(
                namespace = %namespace,
                flags = snapshot.flag_count(),
                "Snapshot refreshed"
            );
            evaluator.write().replace_snapshot(snapshot);
        }
        Ok(None) => {}
        Err(err) => {
            // Re-read the source in full next time, even if its bytes are unchanged
            fetcher.reset();
            match strategy {
                ErrorStrategy::Fail => {
                    error!(namespace = %namespace, error = %err, "Snapshot refresh failed");
                    evaluator.write().set_error(err.into_evaluation());
                }
                ErrorStrategy::Fallback => {
                    warn!(
                        namespace = %namespace,
                        error = %err,
                        "Snapshot refresh failed, serving last good snapshot"
                    );
                }
            }
        }
    }
}
