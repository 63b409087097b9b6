//! The C ABI exported by the engine module.
//!
//! Every entry point that can fail takes a `*mut *mut openpgp_error` slot as
//! its last argument and returns a null pointer on failure, in which case the
//! slot holds an error object that has to be released with
//! `openpgp_error_free`. Objects returned on success are owned by the caller
//! and released through their matching `*_free` function. Pointers returned
//! by getters borrow from the object they were read from.

#![allow(non_camel_case_types)]

use libc::{c_char, c_int, size_t};

/// Engine-side keyring context.
#[repr(C)]
pub struct openpgp_mechanism {
    _private: [u8; 0],
}

/// Produced by `openpgp_sign`.
#[repr(C)]
pub struct openpgp_signature {
    _private: [u8; 0],
}

/// Produced by `openpgp_verify`.
#[repr(C)]
pub struct openpgp_verification_result {
    _private: [u8; 0],
}

/// Produced by `openpgp_import_keys`.
#[repr(C)]
pub struct openpgp_import_result {
    _private: [u8; 0],
}

/// Error object materialized by a failing call.
#[repr(C)]
#[derive(Debug)]
pub struct openpgp_error {
    pub kind: c_int,
    pub message: *const c_char,
}

pub type mechanism_new_from_directory_fn = unsafe extern "C" fn(
    dir: *const c_char,
    err: *mut *mut openpgp_error,
) -> *mut openpgp_mechanism;

pub type mechanism_new_ephemeral_fn =
    unsafe extern "C" fn(err: *mut *mut openpgp_error) -> *mut openpgp_mechanism;

pub type mechanism_free_fn = unsafe extern "C" fn(mechanism: *mut openpgp_mechanism);

pub type sign_fn = unsafe extern "C" fn(
    mechanism: *mut openpgp_mechanism,
    key_handle: *const c_char,
    password: *const c_char,
    data: *const u8,
    data_len: size_t,
    err: *mut *mut openpgp_error,
) -> *mut openpgp_signature;

pub type signature_free_fn = unsafe extern "C" fn(signature: *mut openpgp_signature);

pub type signature_get_data_fn =
    unsafe extern "C" fn(signature: *const openpgp_signature, data_len: *mut size_t) -> *const u8;

pub type verify_fn = unsafe extern "C" fn(
    mechanism: *mut openpgp_mechanism,
    signature: *const u8,
    signature_len: size_t,
    err: *mut *mut openpgp_error,
) -> *mut openpgp_verification_result;

pub type verification_result_free_fn =
    unsafe extern "C" fn(result: *mut openpgp_verification_result);

pub type verification_result_get_content_fn = unsafe extern "C" fn(
    result: *const openpgp_verification_result,
    content_len: *mut size_t,
) -> *const u8;

pub type verification_result_get_signer_fn =
    unsafe extern "C" fn(result: *const openpgp_verification_result) -> *const c_char;

pub type import_keys_fn = unsafe extern "C" fn(
    mechanism: *mut openpgp_mechanism,
    blob: *const u8,
    blob_len: size_t,
    err: *mut *mut openpgp_error,
) -> *mut openpgp_import_result;

pub type import_result_free_fn = unsafe extern "C" fn(result: *mut openpgp_import_result);

pub type import_result_get_count_fn =
    unsafe extern "C" fn(result: *const openpgp_import_result) -> size_t;

pub type import_result_get_content_fn = unsafe extern "C" fn(
    result: *const openpgp_import_result,
    index: size_t,
    err: *mut *mut openpgp_error,
) -> *const c_char;

pub type error_free_fn = unsafe extern "C" fn(err: *mut openpgp_error);

/// Function table of an engine.
///
/// Filled from the symbols of a loaded module by [`Engine::load`], or directly
/// by [`Engine::from_api`] for an engine linked into the process.
///
/// [`Engine::load`]: crate::Engine::load
/// [`Engine::from_api`]: crate::Engine::from_api
#[derive(Debug, Clone, Copy)]
pub struct EngineApi {
    pub mechanism_new_from_directory: mechanism_new_from_directory_fn,
    pub mechanism_new_ephemeral: mechanism_new_ephemeral_fn,
    /// Engines without an explicit teardown leave this unset, and mechanism
    /// handles are leaked.
    pub mechanism_free: Option<mechanism_free_fn>,
    pub sign: sign_fn,
    pub signature_free: signature_free_fn,
    pub signature_get_data: signature_get_data_fn,
    pub verify: verify_fn,
    pub verification_result_free: verification_result_free_fn,
    pub verification_result_get_content: verification_result_get_content_fn,
    pub verification_result_get_signer: verification_result_get_signer_fn,
    pub import_keys: import_keys_fn,
    pub import_result_free: import_result_free_fn,
    pub import_result_get_count: import_result_get_count_fn,
    pub import_result_get_content: import_result_get_content_fn,
    pub error_free: error_free_fn,
}

pub const MECHANISM_NEW_FROM_DIRECTORY: &str = "openpgp_mechanism_new_from_directory";
pub const MECHANISM_NEW_EPHEMERAL: &str = "openpgp_mechanism_new_ephemeral";
pub const MECHANISM_FREE: &str = "openpgp_mechanism_free";
pub const SIGN: &str = "openpgp_sign";
pub const SIGNATURE_FREE: &str = "openpgp_signature_free";
pub const SIGNATURE_GET_DATA: &str = "openpgp_signature_get_data";
pub const VERIFY: &str = "openpgp_verify";
pub const VERIFICATION_RESULT_FREE: &str = "openpgp_verification_result_free";
pub const VERIFICATION_RESULT_GET_CONTENT: &str = "openpgp_verification_result_get_content";
pub const VERIFICATION_RESULT_GET_SIGNER: &str = "openpgp_verification_result_get_signer";
pub const IMPORT_KEYS: &str = "openpgp_import_keys";
pub const IMPORT_RESULT_FREE: &str = "openpgp_import_result_free";
pub const IMPORT_RESULT_GET_COUNT: &str = "openpgp_import_result_get_count";
pub const IMPORT_RESULT_GET_CONTENT: &str = "openpgp_import_result_get_content";
pub const ERROR_FREE: &str = "openpgp_error_free";
