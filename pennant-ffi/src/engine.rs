//! Exported engine functions
//!
//! The namespace is bound once, at `initialize_engine`. Request payloads
//! carry no namespace; a `namespace_key` member in a request is ignored.

use std::ffi::c_void;
use std::os::raw::c_char;

use pennant_engine::{Engine, PayloadEngine};
use tracing::info;

use crate::bridge;
use crate::error::{take_last_error, BridgeError};
use crate::string::{borrow_str, EngineString};

/// Create an engine
///
/// Returns null when construction fails; `engine_last_error` then describes
/// why.
///
/// # Safety
/// - `namespace` must be null or a valid null-terminated string
/// - `options` must be a valid null-terminated string
/// - neither pointer is retained past the call
#[no_mangle]
pub unsafe extern "C" fn initialize_engine(
    namespace: *const c_char,
    options: *const c_char,
) -> *mut c_void {
    bridge::create(|| {
        let namespace = if namespace.is_null() {
            None
        } else {
            Some(borrow_str(namespace, "namespace")?)
        };
        let options = borrow_str(options, "options")?;

        let engine = Engine::from_json(namespace, options)
            .map_err(|e| BridgeError::Construction(e.to_string()))?;
        info!(namespace = engine.namespace(), "Engine handle created");
        Ok(engine)
    })
}

/// Evaluate a boolean flag
///
/// # Safety
/// - `engine` must be a live handle from `initialize_engine`, or null
/// - `request` must be a valid null-terminated string, or null
/// - the result must be freed with `destroy_string`
#[no_mangle]
pub unsafe extern "C" fn evaluate_boolean(
    engine: *mut c_void,
    request: *const c_char,
) -> *mut c_char {
    bridge::evaluate(engine, request, "evaluate_boolean", Engine::evaluate_boolean)
}

/// Evaluate a variant flag
///
/// # Safety
/// Same contract as `evaluate_boolean`.
#[no_mangle]
pub unsafe extern "C" fn evaluate_variant(
    engine: *mut c_void,
    request: *const c_char,
) -> *mut c_char {
    bridge::evaluate(engine, request, "evaluate_variant", Engine::evaluate_variant)
}

/// Evaluate several flags; `request` is a JSON array of requests
///
/// # Safety
/// Same contract as `evaluate_boolean`.
#[no_mangle]
pub unsafe extern "C" fn evaluate_batch(
    engine: *mut c_void,
    request: *const c_char,
) -> *mut c_char {
    bridge::evaluate(engine, request, "evaluate_batch", Engine::evaluate_batch)
}

/// List the flags of the engine's namespace
///
/// # Safety
/// - `engine` must be a live handle from `initialize_engine`, or null
/// - the result must be freed with `destroy_string`
#[no_mangle]
pub unsafe extern "C" fn list_flags(engine: *mut c_void) -> *mut c_char {
    bridge::query(engine, "list_flags", |e: &Engine| PayloadEngine::list_flags(e))
}

/// Current flag document
///
/// # Safety
/// Same contract as `list_flags`.
#[no_mangle]
pub unsafe extern "C" fn get_snapshot(engine: *mut c_void) -> *mut c_char {
    bridge::query(engine, "get_snapshot", Engine::snapshot)
}

/// Destroy an engine; null is a no-op
///
/// # Safety
/// - `engine` must be null or a live handle from `initialize_engine`
/// - no other call may be using `engine`, and it must not be used again
#[no_mangle]
pub unsafe extern "C" fn destroy_engine(engine: *mut c_void) {
    bridge::destroy::<Engine>(engine)
}

/// Free a string returned by this library; null is a no-op
///
/// # Safety
/// - `ptr` must be null or a string returned by this library
/// - each string must be freed exactly once
#[no_mangle]
pub unsafe extern "C" fn destroy_string(ptr: *mut c_char) {
    bridge::free_string(ptr)
}

/// Message of the last failed `initialize_engine` on this thread
///
/// Returns null when there is none. The message is cleared by this call;
/// the result must be freed with `destroy_string`.
#[no_mangle]
pub extern "C" fn engine_last_error() -> *mut c_char {
    match take_last_error() {
        Some(message) => EngineString::new(message).into_raw(),
        None => std::ptr::null_mut(),
    }
}
