//! Function table for the C ABI

use std::ffi::c_void;
use std::os::raw::c_char;

pub type InitializeFn = unsafe extern "C" fn(*const c_char, *const c_char) -> *mut c_void;
pub type EvaluateFn = unsafe extern "C" fn(*mut c_void, *const c_char) -> *mut c_char;
pub type QueryFn = unsafe extern "C" fn(*mut c_void) -> *mut c_char;
pub type DestroyEngineFn = unsafe extern "C" fn(*mut c_void);
pub type DestroyStringFn = unsafe extern "C" fn(*mut c_char);
pub type LastErrorFn = extern "C" fn() -> *mut c_char;

/// The exported engine functions, as called by the adapter
#[derive(Debug, Clone, Copy)]
pub struct NativeAbi {
    pub initialize_engine: InitializeFn,
    pub evaluate_boolean: EvaluateFn,
    pub evaluate_variant: EvaluateFn,
    pub evaluate_batch: EvaluateFn,
    pub list_flags: QueryFn,
    pub get_snapshot: QueryFn,
    pub destroy_engine: DestroyEngineFn,
    pub destroy_string: DestroyStringFn,
    pub engine_last_error: LastErrorFn,
}

impl NativeAbi {
    /// The functions of the linked `pennant-ffi`
    pub const fn linked() -> Self {
        Self {
            initialize_engine: pennant_ffi::initialize_engine,
            evaluate_boolean: pennant_ffi::evaluate_boolean,
            evaluate_variant: pennant_ffi::evaluate_variant,
            evaluate_batch: pennant_ffi::evaluate_batch,
            list_flags: pennant_ffi::list_flags,
            get_snapshot: pennant_ffi::get_snapshot,
            destroy_engine: pennant_ffi::destroy_engine,
            destroy_string: pennant_ffi::destroy_string,
            engine_last_error: pennant_ffi::engine_last_error,
        }
    }
}
