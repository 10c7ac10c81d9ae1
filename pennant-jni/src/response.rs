//! Engine-owned response strings on the adapter side

use std::ffi::CStr;
use std::os::raw::c_char;

use crate::abi::NativeAbi;

/// Frees an engine response through the ABI when dropped
pub struct ResponseGuard<'a> {
    abi: &'a NativeAbi,
    ptr: *mut c_char,
}

impl<'a> ResponseGuard<'a> {
    /// Take ownership of a pointer returned by one of `abi`'s functions
    pub fn new(abi: &'a NativeAbi, ptr: *mut c_char) -> Self {
        Self { abi, ptr }
    }

    pub fn as_c_str(&self) -> Option<&CStr> {
        if self.ptr.is_null() {
            return None;
        }
        // SAFETY: non-null responses are null-terminated and live until drop
        Some(unsafe { CStr::from_ptr(self.ptr) })
    }
}

impl Drop for ResponseGuard<'_> {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            // SAFETY: the pointer came from this ABI and is freed only here
            unsafe { (self.abi.destroy_string)(self.ptr) };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::ffi::CString;

    thread_local! {
        static FREED: Cell<usize> = const { Cell::new(0) };
    }

    unsafe extern "C" fn counting_destroy_string(ptr: *mut c_char) {
        drop(CString::from_raw(ptr));
        FREED.with(|f| f.set(f.get() + 1));
    }

    fn abi() -> NativeAbi {
        NativeAbi {
            destroy_string: counting_destroy_string,
            ..NativeAbi::linked()
        }
    }

    #[test]
    fn test_frees_once_on_drop() {
        let abi = abi();
        let ptr = CString::new("{\"status\":\"success\"}").unwrap().into_raw();
        {
            let guard = ResponseGuard::new(&abi, ptr);
            assert_eq!(guard.as_c_str().unwrap().to_bytes(), b"{\"status\":\"success\"}");
        }
        assert_eq!(FREED.with(Cell::get), 1);
    }

    #[test]
    fn test_null_is_not_freed() {
        let abi = abi();
        let guard = ResponseGuard::new(&abi, std::ptr::null_mut());
        assert!(guard.as_c_str().is_none());
        drop(guard);
        assert_eq!(FREED.with(Cell::get), 0);
    }
}
