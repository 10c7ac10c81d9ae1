//! Foreign runtime seam
//!
//! The adapter never touches a runtime's string type directly. It borrows
//! input strings through `with_borrowed`, which must release them before it
//! returns, and builds output strings with `new_string`.

use std::ffi::CStr;
use std::os::raw::c_char;

use crate::error::AdapterResult;

pub trait ForeignRuntime {
    /// Runtime string handed to native code
    type Str;

    /// Runtime string handed back to the caller
    type Out;

    fn is_null(&self, s: &Self::Str) -> bool;

    /// Call `f` with a null-terminated UTF-8 view of `s`
    ///
    /// A null runtime string is passed as a null pointer. The view is
    /// released before this returns, whatever `f` does.
    fn with_borrowed<T, F>(&mut self, s: &Self::Str, f: F) -> AdapterResult<T>
    where
        F: FnOnce(&mut Self, *const c_char) -> T;

    /// Copy a native string into a runtime string
    fn new_string(&mut self, s: &CStr) -> AdapterResult<Self::Out>;
}
