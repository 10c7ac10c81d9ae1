//! Error types for the C ABI layer

use std::cell::RefCell;

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum BridgeError {
    #[error("error engine null pointer")]
    NullHandle,

    #[error("{0} must not be null")]
    NullArgument(&'static str),

    #[error("{0} is not valid UTF-8")]
    InvalidUtf8(&'static str),

    #[error("engine construction failed: {0}")]
    Construction(String),

    #[error("engine panicked during {0}")]
    Panic(&'static str),
}

// Thread-local storage for the last construction failure
thread_local! {
    static LAST_ERROR: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Record the message returned by the next `take_last_error` on this thread
pub fn set_last_error(err: &BridgeError) {
    LAST_ERROR.with(|last| *last.borrow_mut() = Some(err.to_string()));
}

/// Take the last construction failure recorded on this thread
pub fn take_last_error() -> Option<String> {
    LAST_ERROR.with(|last| last.borrow_mut().take())
}

pub fn clear_last_error() {
    LAST_ERROR.with(|last| *last.borrow_mut() = None);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_error_is_taken_once() {
        set_last_error(&BridgeError::Construction("bad options".into()));
        assert_eq!(
            take_last_error().as_deref(),
            Some("engine construction failed: bad options")
        );
        assert_eq!(take_last_error(), None);
    }

    #[test]
    fn test_last_error_is_per_thread() {
        set_last_error(&BridgeError::NullArgument("options"));
        let other = std::thread::spawn(take_last_error).join().unwrap();
        assert_eq!(other, None);
        assert_eq!(take_last_error().as_deref(), Some("options must not be null"));
    }
}
