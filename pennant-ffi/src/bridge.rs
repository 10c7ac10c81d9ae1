//! Engine-agnostic plumbing behind the exported functions
//!
//! Everything here is generic over `PayloadEngine` so the ownership and
//! unwinding rules can be exercised with test engines.

use std::ffi::c_void;
use std::os::raw::c_char;
use std::panic::{catch_unwind, AssertUnwindSafe};

use pennant_engine::payload;
use pennant_engine::PayloadEngine;
use tracing::{error, trace};

use crate::error::{clear_last_error, set_last_error, BridgeError};
use crate::handle::EngineHandle;
use crate::string::{borrow_str, EngineString};

/// Build an engine and leak it as an opaque handle; null on failure
pub fn create<E, F>(build: F) -> *mut c_void
where
    E: PayloadEngine,
    F: FnOnce() -> Result<E, BridgeError>,
{
    clear_last_error();

    let err = match catch_unwind(AssertUnwindSafe(build)) {
        Ok(Ok(engine)) => return EngineHandle::new(engine).into_raw(),
        Ok(Err(err)) => err,
        Err(_) => BridgeError::Panic("initialization"),
    };

    error!(error = %err, "Engine construction failed");
    set_last_error(&err);
    std::ptr::null_mut()
}

/// Run a request-taking operation and return an owned response
///
/// # Safety
/// `engine` must be null or a live handle of kind `E`; `request` must be null
/// or a valid null-terminated string.
pub unsafe fn evaluate<E, F>(
    engine: *mut c_void,
    request: *const c_char,
    op: &'static str,
    call: F,
) -> *mut c_char
where
    E: PayloadEngine,
    F: FnOnce(&E, &str) -> String,
{
    let response = catch_unwind(AssertUnwindSafe(|| {
        let handle = EngineHandle::<E>::from_raw(engine).ok_or(BridgeError::NullHandle)?;
        let request = borrow_str(request, "request")?;
        Ok::<_, BridgeError>(call(handle.engine(), request))
    }));

    respond(op, response)
}

/// Run a query operation and return an owned response
///
/// # Safety
/// `engine` must be null or a live handle of kind `E`.
pub unsafe fn query<E, F>(engine: *mut c_void, op: &'static str, call: F) -> *mut c_char
where
    E: PayloadEngine,
    F: FnOnce(&E) -> String,
{
    let response = catch_unwind(AssertUnwindSafe(|| {
        let handle = EngineHandle::<E>::from_raw(engine).ok_or(BridgeError::NullHandle)?;
        Ok::<_, BridgeError>(call(handle.engine()))
    }));

    respond(op, response)
}

fn respond(
    op: &'static str,
    response: std::thread::Result<Result<String, BridgeError>>,
) -> *mut c_char {
    let json = match response {
        Ok(Ok(json)) => json,
        Ok(Err(err)) => {
            trace!(op, error = %err, "Rejected call");
            payload::failure(err)
        }
        Err(_) => {
            error!(op, "Engine panicked");
            payload::failure(BridgeError::Panic(op))
        }
    };
    EngineString::new(json).into_raw()
}

/// Drop the engine behind a handle; null is a no-op
///
/// # Safety
/// `engine` must be null or a live handle of kind `E` that no other call is
/// using, and must not be used again.
pub unsafe fn destroy<E: PayloadEngine>(engine: *mut c_void) {
    if let Some(handle) = EngineHandle::<E>::from_raw(engine) {
        if catch_unwind(AssertUnwindSafe(|| handle.destroy())).is_err() {
            error!("Engine panicked while being destroyed");
        }
    }
}

/// Free a response string; null is a no-op
///
/// # Safety
/// `ptr` must be null or a string returned by this library that has not
/// been freed yet.
pub unsafe fn free_string(ptr: *mut c_char) {
    drop(EngineString::from_raw(ptr));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::{CStr, CString};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Echo {
        drops: Arc<AtomicUsize>,
    }

    impl PayloadEngine for Echo {
        fn evaluate_boolean(&self, request: &str) -> String {
            format!("boolean:{request}")
        }
        fn evaluate_variant(&self, request: &str) -> String {
            if request == "explode" {
                panic!("variant exploded");
            }
            format!("variant:{request}")
        }
        fn evaluate_batch(&self, request: &str) -> String {
            format!("batch:{request}")
        }
        fn list_flags(&self) -> String {
            "[]".to_string()
        }
        fn snapshot(&self) -> String {
            "{}".to_string()
        }
    }

    impl Drop for Echo {
        fn drop(&mut self) {
            self.drops.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn take(ptr: *mut c_char) -> String {
        assert!(!ptr.is_null());
        let s = unsafe { CStr::from_ptr(ptr) }.to_str().unwrap().to_string();
        unsafe { free_string(ptr) };
        s
    }

    fn failure_message(ptr: *mut c_char) -> String {
        let v: serde_json::Value = serde_json::from_str(&take(ptr)).unwrap();
        assert_eq!(v["status"], "failure");
        v["error_message"].as_str().unwrap().to_string()
    }

    fn echo() -> (*mut c_void, Arc<AtomicUsize>) {
        let drops = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&drops);
        let handle = create(move || Ok(Echo { drops: counter }));
        assert!(!handle.is_null());
        (handle, drops)
    }

    #[test]
    fn test_passes_payloads_through() {
        let (handle, drops) = echo();
        let req = CString::new("{\"flag_key\":\"a\"}").unwrap();

        let out = unsafe {
            evaluate::<Echo, _>(handle, req.as_ptr(), "evaluate_boolean", |e, r| {
                e.evaluate_boolean(r)
            })
        };
        assert_eq!(take(out), "boolean:{\"flag_key\":\"a\"}");

        let out = unsafe { query::<Echo, _>(handle, "list_flags", |e| e.list_flags()) };
        assert_eq!(take(out), "[]");

        unsafe { destroy::<Echo>(handle) };
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_null_inputs_give_failure_envelopes() {
        let (handle, _drops) = echo();

        let out = unsafe {
            evaluate::<Echo, _>(std::ptr::null_mut(), c"{}".as_ptr(), "evaluate_boolean", |e, r| {
                e.evaluate_boolean(r)
            })
        };
        assert_eq!(failure_message(out), "error engine null pointer");

        let out = unsafe {
            evaluate::<Echo, _>(handle, std::ptr::null(), "evaluate_batch", |e, r| {
                e.evaluate_batch(r)
            })
        };
        assert_eq!(failure_message(out), "request must not be null");

        let out = unsafe { query::<Echo, _>(std::ptr::null_mut(), "get_snapshot", |e| e.snapshot()) };
        assert_eq!(failure_message(out), "error engine null pointer");

        unsafe { destroy::<Echo>(handle) };
    }

    #[test]
    fn test_panic_does_not_unwind_across() {
        let (handle, _drops) = echo();
        let out = unsafe {
            evaluate::<Echo, _>(handle, c"explode".as_ptr(), "evaluate_variant", |e, r| {
                e.evaluate_variant(r)
            })
        };
        assert_eq!(failure_message(out), "engine panicked during evaluate_variant");
        unsafe { destroy::<Echo>(handle) };
    }

    #[test]
    fn test_failed_and_panicking_construction() {
        let handle = create::<Echo, _>(|| Err(BridgeError::Construction("no source".into())));
        assert!(handle.is_null());
        assert_eq!(
            crate::error::take_last_error().as_deref(),
            Some("engine construction failed: no source")
        );

        let handle = create::<Echo, _>(|| panic!("boom"));
        assert!(handle.is_null());
        assert_eq!(
            crate::error::take_last_error().as_deref(),
            Some("engine panicked during initialization")
        );
    }

    #[test]
    fn test_null_destroys_are_no_ops() {
        unsafe {
            destroy::<Echo>(std::ptr::null_mut());
            free_string(std::ptr::null_mut());
        }
    }
}
