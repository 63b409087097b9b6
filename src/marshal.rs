//! Moving data and ownership across the engine boundary.
//!
//! Engine objects are wrapped in [`Native`] as soon as a call returns them,
//! so they are released exactly once on every path out of the caller.
//! Fields are copied into host-owned values before the wrapper is dropped.

use std::ffi::{CStr, CString};
use std::ptr::{self, NonNull};
use std::slice;

use libc::{c_char, size_t};
use log::warn;
use zeroize::{Zeroize, Zeroizing};

use crate::errors::{Result, SigningSnafu};
use crate::ffi::{
    openpgp_error, openpgp_import_result, openpgp_mechanism, openpgp_signature,
    openpgp_verification_result, EngineApi,
};
use crate::types::Passphrase;

/// An engine object that is released through the engine.
pub(crate) trait NativeObject {
    /// # Safety
    ///
    /// `ptr` must have been returned by `api` and not been released yet.
    unsafe fn release(api: &EngineApi, ptr: *mut Self);
}

impl NativeObject for openpgp_error {
    unsafe fn release(api: &EngineApi, ptr: *mut Self) {
        unsafe { (api.error_free)(ptr) }
    }
}

impl NativeObject for openpgp_signature {
    unsafe fn release(api: &EngineApi, ptr: *mut Self) {
        unsafe { (api.signature_free)(ptr) }
    }
}

impl NativeObject for openpgp_verification_result {
    unsafe fn release(api: &EngineApi, ptr: *mut Self) {
        unsafe { (api.verification_result_free)(ptr) }
    }
}

impl NativeObject for openpgp_import_result {
    unsafe fn release(api: &EngineApi, ptr: *mut Self) {
        unsafe { (api.import_result_free)(ptr) }
    }
}

impl NativeObject for openpgp_mechanism {
    unsafe fn release(api: &EngineApi, ptr: *mut Self) {
        match api.mechanism_free {
            Some(free) => unsafe { free(ptr) },
            None => warn!("engine cannot release mechanisms, leaking {:p}", ptr),
        }
    }
}

/// Exclusive owner of an engine object.
pub(crate) struct Native<'e, T: NativeObject> {
    ptr: NonNull<T>,
    api: &'e EngineApi,
}

// SAFETY: a `Native` is the only reference to its object, and engine objects
// are not tied to the thread that created them.
unsafe impl<T: NativeObject> Send for Native<'_, T> {}

impl<'e, T: NativeObject> Native<'e, T> {
    /// # Safety
    ///
    /// `ptr` must be an object returned by `api` that nothing else releases.
    pub(crate) unsafe fn from_raw(api: &'e EngineApi, ptr: NonNull<T>) -> Self {
        Native { ptr, api }
    }

    pub(crate) fn as_ptr(&self) -> *mut T {
        self.ptr.as_ptr()
    }
}

impl<T: NativeObject> Drop for Native<'_, T> {
    fn drop(&mut self) {
        // SAFETY: we own the object and drop runs once.
        unsafe { T::release(self.api, self.ptr.as_ptr()) }
    }
}

impl Native<'_, openpgp_error> {
    fn message(&self) -> String {
        // SAFETY: the object is live while `self` is.
        let message = unsafe { copy_string((*self.ptr.as_ptr()).message) };
        message.unwrap_or_else(|| "unknown engine error".to_string())
    }
}

/// Runs an engine call that reports failure through an error slot.
///
/// Returns the non-null primary result, or the message of the engine's error
/// object, which is released before returning. The slot is only read when the
/// call failed.
///
/// # Safety
///
/// `f` must pass the slot to an entry point of `api`.
pub(crate) unsafe fn call<T, F>(api: &EngineApi, f: F) -> std::result::Result<NonNull<T>, String>
where
    F: FnOnce(*mut *mut openpgp_error) -> *mut T,
{
    let mut err: *mut openpgp_error = ptr::null_mut();
    let result = f(&mut err as *mut *mut openpgp_error);
    match NonNull::new(result) {
        Some(result) => Ok(result),
        None => match NonNull::new(err) {
            // SAFETY: the engine hands ownership of the error to the caller.
            Some(err) => Err(unsafe { Native::from_raw(api, err) }.message()),
            None => Err("engine call failed without an error".to_string()),
        },
    }
}

/// Like [`call`], taking ownership of the returned object.
///
/// # Safety
///
/// As for [`call`]; the result must be an owned object of type `T`.
pub(crate) unsafe fn call_owned<'e, T, F>(
    api: &'e EngineApi,
    f: F,
) -> std::result::Result<Native<'e, T>, String>
where
    T: NativeObject,
    F: FnOnce(*mut *mut openpgp_error) -> *mut T,
{
    let ptr = unsafe { call(api, f)? };
    Ok(unsafe { Native::from_raw(api, ptr) })
}

/// Address to hand to the engine for `bytes`. Empty input is passed as null.
pub(crate) fn base(bytes: &[u8]) -> *const u8 {
    if bytes.is_empty() {
        ptr::null()
    } else {
        bytes.as_ptr()
    }
}

/// Copies a buffer borrowed from an engine object.
///
/// # Safety
///
/// Unless null, `data` must point to `len` readable bytes.
pub(crate) unsafe fn copy_bytes(data: *const u8, len: size_t) -> Vec<u8> {
    if data.is_null() || len == 0 {
        return Vec::new();
    }
    unsafe { slice::from_raw_parts(data, len) }.to_vec()
}

/// Copies a NUL-terminated string borrowed from an engine object, replacing
/// invalid UTF-8.
///
/// # Safety
///
/// Unless null, `s` must point to a NUL-terminated string.
pub(crate) unsafe fn copy_string(s: *const c_char) -> Option<String> {
    if s.is_null() {
        return None;
    }
    Some(unsafe { CStr::from_ptr(s) }.to_string_lossy().into_owned())
}

/// Copies an identity string borrowed from an engine object.
///
/// Identities are opaque, so a null pointer or invalid UTF-8 is an error
/// rather than something to repair.
///
/// # Safety
///
/// As for [`copy_string`].
pub(crate) unsafe fn copy_identity(s: *const c_char) -> std::result::Result<String, String> {
    if s.is_null() {
        return Err("engine returned no string".to_string());
    }
    unsafe { CStr::from_ptr(s) }
        .to_str()
        .map(str::to_string)
        .map_err(|e| format!("engine returned invalid UTF-8: {e}"))
}

pub(crate) fn to_cstring(s: impl Into<Vec<u8>>) -> Result<CString> {
    Ok(CString::new(s)?)
}

/// Marshals an optional passphrase. Absent is null, which the engine
/// distinguishes from the empty string.
///
/// The copy is wiped on drop. Its buffer is sized for the terminator so
/// `CString::new` never reallocates and leaves a stale copy behind.
pub(crate) fn passphrase_cstring(
    passphrase: Option<&Passphrase>,
) -> Result<Option<Zeroizing<CString>>> {
    let Some(passphrase) = passphrase else {
        return Ok(None);
    };

    let secret = passphrase.as_str().as_bytes();
    let mut bytes = Vec::with_capacity(secret.len() + 1);
    bytes.extend_from_slice(secret);
    match CString::new(bytes) {
        Ok(c_passphrase) => Ok(Some(Zeroizing::new(c_passphrase))),
        Err(err) => {
            err.into_vec().zeroize();
            SigningSnafu {
                message: "passphrase contains a NUL byte",
            }
            .fail()
        }
    }
}

pub(crate) fn opt_ptr(s: Option<&CString>) -> *const c_char {
    s.map_or(ptr::null(), |s| s.as_ptr())
}
