//! Runtime-agnostic adapter core
//!
//! Each operation borrows its inputs for exactly the duration of the native
//! call, copies the response into a runtime string and frees the native
//! response before returning. The adapter holds no state beyond its function
//! table.

use std::ffi::c_void;

use tracing::{debug, warn};

use crate::abi::NativeAbi;
use crate::error::{AdapterError, AdapterResult};
use crate::response::ResponseGuard;
use crate::runtime::ForeignRuntime;

/// Request-taking operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Evaluation {
    Boolean,
    Variant,
    Batch,
}

/// Handle-only operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Query {
    ListFlags,
    Snapshot,
}

#[derive(Debug, Clone, Copy)]
pub struct Adapter {
    abi: NativeAbi,
}

impl Adapter {
    pub const fn new(abi: NativeAbi) -> Self {
        Self { abi }
    }

    pub const fn linked() -> Self {
        Self::new(NativeAbi::linked())
    }

    /// Create an engine and return its handle as a runtime integer
    pub fn initialize<R: ForeignRuntime>(
        &self,
        rt: &mut R,
        namespace: &R::Str,
        options: &R::Str,
    ) -> AdapterResult<i64> {
        if rt.is_null(options) {
            return Err(AdapterError::NullArgument("options"));
        }

        let init = self.abi.initialize_engine;
        let raw = rt.with_borrowed(namespace, |rt, namespace| {
            rt.with_borrowed(options, |_, options| unsafe { init(namespace, options) })
        })??;

        if raw.is_null() {
            let message = self.last_error();
            warn!(error = %message, "Engine construction failed");
            return Err(AdapterError::Construction(message));
        }

        debug!("Engine handle created");
        Ok(raw as usize as i64)
    }

    pub fn evaluate<R: ForeignRuntime>(
        &self,
        rt: &mut R,
        handle: i64,
        kind: Evaluation,
        request: &R::Str,
    ) -> AdapterResult<R::Out> {
        let call = match kind {
            Evaluation::Boolean => self.abi.evaluate_boolean,
            Evaluation::Variant => self.abi.evaluate_variant,
            Evaluation::Batch => self.abi.evaluate_batch,
        };
        let engine = to_engine(handle);

        let raw = rt.with_borrowed(request, |_, request| unsafe { call(engine, request) })?;

        self.copy_response(rt, ResponseGuard::new(&self.abi, raw))
    }

    pub fn query<R: ForeignRuntime>(
        &self,
        rt: &mut R,
        handle: i64,
        kind: Query,
    ) -> AdapterResult<R::Out> {
        let call = match kind {
            Query::ListFlags => self.abi.list_flags,
            Query::Snapshot => self.abi.get_snapshot,
        };
        let engine = to_engine(handle);

        let raw = unsafe { call(engine) };
        self.copy_response(rt, ResponseGuard::new(&self.abi, raw))
    }

    /// Destroy an engine; `0` is a no-op
    ///
    /// The caller guarantees at most one destroy per handle and no
    /// concurrent use of the handle.
    pub fn destroy(&self, handle: i64) {
        if handle == 0 {
            return;
        }
        unsafe { (self.abi.destroy_engine)(to_engine(handle)) };
        debug!("Engine handle destroyed");
    }

    fn copy_response<R: ForeignRuntime>(
        &self,
        rt: &mut R,
        response: ResponseGuard<'_>,
    ) -> AdapterResult<R::Out> {
        let text = response.as_c_str().ok_or(AdapterError::NullResponse)?;
        rt.new_string(text)
    }

    fn last_error(&self) -> String {
        let message = ResponseGuard::new(&self.abi, (self.abi.engine_last_error)());
        message
            .as_c_str()
            .map(|c| c.to_string_lossy().into_owned())
            .unwrap_or_else(|| "engine construction failed".to_string())
    }
}

fn to_engine(handle: i64) -> *mut c_void {
    handle as usize as *mut c_void
}
