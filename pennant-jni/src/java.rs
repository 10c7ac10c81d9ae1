//! JNI exports for `io.pennant.client.NativeEngine`
//!
//! ```java
//! final class NativeEngine {
//!     static native long initializeEngine(String namespace, String options);
//!     static native String evaluateBoolean(long engine, String request);
//!     static native String evaluateVariant(long engine, String request);
//!     static native String evaluateBatch(long engine, String request);
//!     static native String listFlags(long engine);
//!     static native String getSnapshot(long engine);
//!     static native void destroyEngine(long engine);
//! }
//! ```
//!
//! Failures raise `IllegalStateException` unless an exception is already
//! pending. Responses are freed natively before these functions return.

use std::borrow::Cow;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::panic::{catch_unwind, AssertUnwindSafe};

use jni::objects::{JClass, JString};
use jni::sys::{jlong, jstring};
use jni::JNIEnv;
use tracing::error;

use crate::adapter::{Adapter, Evaluation, Query};
use crate::error::{AdapterError, AdapterResult};
use crate::runtime::ForeignRuntime;

static ADAPTER: Adapter = Adapter::linked();

const EXCEPTION_CLASS: &str = "java/lang/IllegalStateException";

/// `ForeignRuntime` over a JNI environment
pub struct JniRuntime<'a, 'local> {
    env: &'a mut JNIEnv<'local>,
}

impl<'a, 'local> JniRuntime<'a, 'local> {
    pub fn new(env: &'a mut JNIEnv<'local>) -> Self {
        Self { env }
    }
}

impl<'local> ForeignRuntime for JniRuntime<'_, 'local> {
    type Str = JString<'local>;
    type Out = JString<'local>;

    fn is_null(&self, s: &JString<'local>) -> bool {
        s.is_null()
    }

    fn with_borrowed<T, F>(&mut self, s: &JString<'local>, f: F) -> AdapterResult<T>
    where
        F: FnOnce(&mut Self, *const c_char) -> T,
    {
        if s.is_null() {
            return Ok(f(self, std::ptr::null()));
        }

        // Released when `chars` drops, after the native call
        let chars = self
            .env
            .get_string(s)
            .map_err(|e| AdapterError::Runtime(e.to_string()))?;

        // JNI hands out modified UTF-8; the ABI expects standard UTF-8
        let utf8 = {
            let text: Cow<str> = (&chars).into();
            CString::new(text.as_bytes())
                .map_err(|_| AdapterError::Runtime("string contains NUL".to_string()))?
        };

        let out = f(self, utf8.as_ptr());
        drop(utf8);
        drop(chars);
        Ok(out)
    }

    fn new_string(&mut self, s: &CStr) -> AdapterResult<JString<'local>> {
        let text = s
            .to_str()
            .map_err(|e| AdapterError::Runtime(e.to_string()))?;
        self.env
            .new_string(text)
            .map_err(|e| AdapterError::Runtime(e.to_string()))
    }
}

/// Run `f`, turning errors and panics into a Java exception plus `fallback`
fn run<'local, T>(
    env: &mut JNIEnv<'local>,
    fallback: T,
    f: impl FnOnce(&mut JniRuntime<'_, 'local>) -> AdapterResult<T>,
) -> T {
    let result = catch_unwind(AssertUnwindSafe(|| f(&mut JniRuntime::new(env))))
        .unwrap_or(Err(AdapterError::Panic));

    match result {
        Ok(value) => value,
        Err(err) => {
            throw(env, &err);
            fallback
        }
    }
}

fn throw(env: &mut JNIEnv<'_>, err: &AdapterError) {
    if env.exception_check().unwrap_or(false) {
        return;
    }
    if let Err(e) = env.throw_new(EXCEPTION_CLASS, err.to_string()) {
        error!(error = %e, original = %err, "Failed to raise Java exception");
    }
}

fn evaluate<'local>(
    mut env: JNIEnv<'local>,
    engine: jlong,
    kind: Evaluation,
    request: JString<'local>,
) -> jstring {
    run(&mut env, std::ptr::null_mut(), |rt| {
        ADAPTER
            .evaluate(rt, engine, kind, &request)
            .map(JString::into_raw)
    })
}

fn query<'local>(mut env: JNIEnv<'local>, engine: jlong, kind: Query) -> jstring {
    run(&mut env, std::ptr::null_mut(), |rt| {
        ADAPTER.query(rt, engine, kind).map(JString::into_raw)
    })
}

#[no_mangle]
pub extern "system" fn Java_io_pennant_client_NativeEngine_initializeEngine<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    namespace: JString<'local>,
    options: JString<'local>,
) -> jlong {
    run(&mut env, 0, |rt| ADAPTER.initialize(rt, &namespace, &options))
}

#[no_mangle]
pub extern "system" fn Java_io_pennant_client_NativeEngine_evaluateBoolean<'local>(
    env: JNIEnv<'local>,
    _class: JClass<'local>,
    engine: jlong,
    request: JString<'local>,
) -> jstring {
    evaluate(env, engine, Evaluation::Boolean, request)
}

#[no_mangle]
pub extern "system" fn Java_io_pennant_client_NativeEngine_evaluateVariant<'local>(
    env: JNIEnv<'local>,
    _class: JClass<'local>,
    engine: jlong,
    request: JString<'local>,
) -> jstring {
    evaluate(env, engine, Evaluation::Variant, request)
}

#[no_mangle]
pub extern "system" fn Java_io_pennant_client_NativeEngine_evaluateBatch<'local>(
    env: JNIEnv<'local>,
    _class: JClass<'local>,
    engine: jlong,
    request: JString<'local>,
) -> jstring {
    evaluate(env, engine, Evaluation::Batch, request)
}

#[no_mangle]
pub extern "system" fn Java_io_pennant_client_NativeEngine_listFlags<'local>(
    env: JNIEnv<'local>,
    _class: JClass<'local>,
    engine: jlong,
) -> jstring {
    query(env, engine, Query::ListFlags)
}

#[no_mangle]
pub extern "system" fn Java_io_pennant_client_NativeEngine_getSnapshot<'local>(
    env: JNIEnv<'local>,
    _class: JClass<'local>,
    engine: jlong,
) -> jstring {
    query(env, engine, Query::Snapshot)
}

#[no_mangle]
pub extern "system" fn Java_io_pennant_client_NativeEngine_destroyEngine<'local>(
    _env: JNIEnv<'local>,
    _class: JClass<'local>,
    engine: jlong,
) {
    ADAPTER.destroy(engine)
}
