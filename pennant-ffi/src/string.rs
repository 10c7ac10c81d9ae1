//! Boundary strings
//!
//! Strings the engine returns are `EngineString`s: allocated here, handed to
//! the caller by `into_raw`, and freed only by `destroy_string`. Strings the
//! caller passes in are borrowed for the duration of one call.

use std::ffi::{CStr, CString};
use std::os::raw::c_char;

use crate::error::BridgeError;

/// Owned, null-terminated response buffer
#[derive(Debug)]
pub struct EngineString(CString);

impl EngineString {
    pub fn new(s: String) -> Self {
        match CString::new(s) {
            Ok(c) => Self(c),
            // Interior NULs are dropped
            Err(err) => {
                let mut bytes = err.into_vec();
                bytes.retain(|b| *b != 0);
                Self(CString::new(bytes).unwrap_or_default())
            }
        }
    }

    pub fn as_c_str(&self) -> &CStr {
        &self.0
    }

    /// Transfer ownership to the caller
    pub fn into_raw(self) -> *mut c_char {
        self.0.into_raw()
    }

    /// Take back a string handed out by `into_raw`
    ///
    /// # Safety
    /// `ptr` must be null or come from `into_raw` and not have been reclaimed.
    pub unsafe fn from_raw(ptr: *mut c_char) -> Option<Self> {
        if ptr.is_null() {
            return None;
        }
        Some(Self(CString::from_raw(ptr)))
    }
}

/// Borrow a caller-owned C string as UTF-8 for the duration of a call
///
/// # Safety
/// `ptr` must be null or point to a null-terminated string that stays valid
/// for `'a`.
pub unsafe fn borrow_str<'a>(ptr: *const c_char, what: &'static str) -> Result<&'a str, BridgeError> {
    if ptr.is_null() {
        return Err(BridgeError::NullArgument(what));
    }
    CStr::from_ptr(ptr)
        .to_str()
        .map_err(|_| BridgeError::InvalidUtf8(what))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_raw_and_back() {
        let s = EngineString::new(r#"{"status":"success"}"#.to_string());
        let raw = s.into_raw();
        let back = unsafe { EngineString::from_raw(raw) }.unwrap();
        assert_eq!(back.as_c_str().to_str().unwrap(), r#"{"status":"success"}"#);
        assert!(unsafe { EngineString::from_raw(std::ptr::null_mut()) }.is_none());
    }

    #[test]
    fn test_interior_nul_is_stripped() {
        let s = EngineString::new("a\0b".to_string());
        assert_eq!(s.as_c_str().to_bytes(), b"ab");
    }

    #[test]
    fn test_borrow_str() {
        let owned = CString::new("production").unwrap();
        assert_eq!(unsafe { borrow_str(owned.as_ptr(), "namespace") }, Ok("production"));
        assert_eq!(
            unsafe { borrow_str(std::ptr::null(), "request") },
            Err(BridgeError::NullArgument("request"))
        );

        let bad = CString::new(vec![0xff, 0xfe]).unwrap();
        assert_eq!(
            unsafe { borrow_str(bad.as_ptr(), "request") },
            Err(BridgeError::InvalidUtf8("request"))
        );
    }
}
