//! Opaque engine handles
//!
//! A handle is the address of a boxed engine. Hosts see it only as
//! `void *`; on this side it is typed by the engine it points to.

use std::ffi::c_void;
use std::marker::PhantomData;
use std::ptr::NonNull;

/// Owning pointer to a heap-allocated engine of kind `E`
#[repr(transparent)]
pub struct EngineHandle<E> {
    ptr: NonNull<c_void>,
    _kind: PhantomData<Box<E>>,
}

impl<E> EngineHandle<E> {
    /// Move `engine` to the heap and take ownership of it
    pub(crate) fn new(engine: E) -> Self {
        let ptr = NonNull::from(Box::leak(Box::new(engine))).cast::<c_void>();
        Self {
            ptr,
            _kind: PhantomData,
        }
    }

    /// Re-materialise a handle from an address handed out by `into_raw`
    ///
    /// Returns `None` for null.
    ///
    /// # Safety
    /// A non-null `ptr` must come from `into_raw` on an `EngineHandle<E>`
    /// of the same `E` and must not have been destroyed.
    pub unsafe fn from_raw(ptr: *mut c_void) -> Option<Self> {
        NonNull::new(ptr).map(|ptr| Self {
            ptr,
            _kind: PhantomData,
        })
    }

    /// Give up ownership; the address stays valid until `destroy`
    pub fn into_raw(self) -> *mut c_void {
        self.ptr.as_ptr()
    }

    pub fn engine(&self) -> &E {
        // SAFETY: `ptr` came from `Box::leak` of an `E` and is live per `from_raw`
        unsafe { self.ptr.cast::<E>().as_ref() }
    }

    /// Drop the engine and free its allocation
    pub fn destroy(self) {
        // SAFETY: ownership of the box is reclaimed exactly once, here
        drop(unsafe { Box::from_raw(self.ptr.cast::<E>().as_ptr()) });
    }
}
