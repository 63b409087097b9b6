use std::path::Path;
use std::sync::{Mutex, PoisonError};

use libc::{c_char, size_t};
use log::debug;

use crate::errors::{
    ClosedSnafu, FieldExtractionSnafu, ImportSnafu, MechanismInitSnafu, Result, SigningSnafu,
    UnsupportedSnafu, VerificationSnafu,
};
use crate::ffi::{openpgp_import_result, openpgp_mechanism};
use crate::loader::Engine;
use crate::marshal::{
    base, call, call_owned, copy_bytes, copy_identity, opt_ptr, passphrase_cstring, to_cstring,
    Native,
};
use crate::types::{Passphrase, Verification};

/// Capabilities and lifecycle shared by signing mechanisms.
pub trait SigningMechanism {
    /// Returns `Ok` if the mechanism can create signatures at all.
    fn supports_signing(&self) -> Result<()> {
        Ok(())
    }

    /// Signs `input` with the secret key identified by `key_identity`.
    fn sign(&self, input: &[u8], key_identity: &str) -> Result<Vec<u8>>;

    /// Verifies a signature and returns the content it carries together with
    /// the identity of the signer.
    fn verify(&self, unverified_signature: &[u8]) -> Result<Verification>;

    /// Extracts content and a short key identifier from a signature without
    /// verifying it.
    ///
    /// Handing out unauthenticated content needs its own trust design, so by
    /// default this always fails.
    fn untrusted_signature_contents(
        &self,
        _untrusted_signature: &[u8],
    ) -> Result<(Vec<u8>, String)> {
        UnsupportedSnafu {
            operation: "reading untrusted signature contents",
        }
        .fail()
    }

    /// Releases the resources held by the mechanism.
    fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// A signing mechanism bound to one keyring of the engine.
///
/// Calls into the engine are serialized per mechanism. The keyring handle is
/// released by [`close`](SigningMechanism::close) or when the mechanism is
/// dropped.
pub struct Mechanism<'e> {
    engine: &'e Engine,
    handle: Mutex<Option<Native<'e, openpgp_mechanism>>>,
}

impl std::fmt::Debug for Mechanism<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let open = self
            .handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some();
        f.debug_struct("Mechanism").field("open", &open).finish()
    }
}

impl<'e> Mechanism<'e> {
    /// Opens the keyring stored in `dir`, creating it if the engine finds
    /// none there.
    pub fn from_directory(engine: &'e Engine, dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        debug!("opening keyring at {}", dir.display());

        let c_dir = to_cstring(dir.as_os_str().as_encoded_bytes())?;
        let api = engine.api();
        let handle = unsafe {
            call_owned(api, |err| {
                (api.mechanism_new_from_directory)(c_dir.as_ptr(), err)
            })
        }
        .map_err(|message| MechanismInitSnafu { message }.build())?;

        Ok(Mechanism::with_handle(engine, handle))
    }

    /// Creates a keyring that only lives in memory and imports `certs` into
    /// it.
    ///
    /// Returns the mechanism together with the identities of all imported
    /// keys, in import order. Fails on the first cert that does not import.
    pub fn ephemeral<C>(engine: &'e Engine, certs: &[C]) -> Result<(Self, Vec<String>)>
    where
        C: AsRef<[u8]>,
    {
        let api = engine.api();
        let handle =
            unsafe { call_owned(api, |err| (api.mechanism_new_ephemeral)(err)) }
                .map_err(|message| MechanismInitSnafu { message }.build())?;
        debug!("created ephemeral keyring");

        let mechanism = Mechanism::with_handle(engine, handle);
        let mut key_identities = Vec::new();
        for cert in certs {
            key_identities.extend(mechanism.import_keys(cert.as_ref())?);
        }

        Ok((mechanism, key_identities))
    }

    fn with_handle(engine: &'e Engine, handle: Native<'e, openpgp_mechanism>) -> Self {
        Mechanism {
            engine,
            handle: Mutex::new(Some(handle)),
        }
    }

    /// Runs `f` with exclusive access to the keyring handle.
    fn locked<R>(&self, f: impl FnOnce(*mut openpgp_mechanism) -> Result<R>) -> Result<R> {
        let guard = self.handle.lock().unwrap_or_else(PoisonError::into_inner);
        match guard.as_ref() {
            Some(handle) => f(handle.as_ptr()),
            None => ClosedSnafu.fail(),
        }
    }

    /// Signs `input` with the key identified by `key_identity`, unlocking it
    /// with `passphrase`.
    ///
    /// The passphrase is handed to the engine even when it is empty; use
    /// [`sign`](SigningMechanism::sign) for keys that need none.
    pub fn sign_with_passphrase(
        &self,
        input: &[u8],
        key_identity: &str,
        passphrase: &Passphrase,
    ) -> Result<Vec<u8>> {
        self.sign_inner(input, key_identity, Some(passphrase))
    }

    fn sign_inner(
        &self,
        input: &[u8],
        key_identity: &str,
        passphrase: Option<&Passphrase>,
    ) -> Result<Vec<u8>> {
        let c_key_identity = to_cstring(key_identity)?;
        let c_passphrase = passphrase_cstring(passphrase)?;
        let api = self.engine.api();

        let signature = self.locked(|handle| {
            let signature = unsafe {
                call_owned(api, |err| {
                    (api.sign)(
                        handle,
                        c_key_identity.as_ptr(),
                        opt_ptr(c_passphrase.as_deref()),
                        base(input),
                        input.len(),
                        err,
                    )
                })
            }
            .map_err(|message| SigningSnafu { message }.build())?;

            let mut len: size_t = 0;
            let data = unsafe { (api.signature_get_data)(signature.as_ptr(), &mut len) };
            Ok(unsafe { copy_bytes(data, len) })
        })?;

        debug!("signed {} bytes with {}", input.len(), key_identity);
        Ok(signature)
    }

    /// Imports all keys and certificates in `blob` into the keyring.
    ///
    /// Returns their identities in the order the engine reports them.
    pub fn import_keys(&self, blob: &[u8]) -> Result<Vec<String>> {
        let api = self.engine.api();

        let key_identities = self.locked(|handle| {
            let result = unsafe {
                call_owned(api, |err| (api.import_keys)(handle, base(blob), blob.len(), err))
            }
            .map_err(|message| ImportSnafu { message }.build())?;

            read_import_result(self.engine, &result)
        })?;

        debug!("imported {} keys", key_identities.len());
        Ok(key_identities)
    }

    /// The engine this mechanism was created with.
    pub fn engine(&self) -> &'e Engine {
        self.engine
    }
}

fn read_import_result(
    engine: &Engine,
    result: &Native<'_, openpgp_import_result>,
) -> Result<Vec<String>> {
    let api = engine.api();
    let count = unsafe { (api.import_result_get_count)(result.as_ptr()) };

    (0..count)
        .map(|index| {
            let field = || format!("key identity #{index}");
            let key_identity = unsafe {
                call(api, |err| {
                    (api.import_result_get_content)(result.as_ptr(), index, err) as *mut c_char
                })
            }
            .map_err(|message| {
                FieldExtractionSnafu {
                    field: field(),
                    message,
                }
                .build()
            })?;

            unsafe { copy_identity(key_identity.as_ptr()) }.map_err(|message| {
                FieldExtractionSnafu {
                    field: field(),
                    message,
                }
                .build()
            })
        })
        .collect()
}

impl SigningMechanism for Mechanism<'_> {
    fn sign(&self, input: &[u8], key_identity: &str) -> Result<Vec<u8>> {
        self.sign_inner(input, key_identity, None)
    }

    fn verify(&self, unverified_signature: &[u8]) -> Result<Verification> {
        let api = self.engine.api();

        let verification = self.locked(|handle| {
            let result = unsafe {
                call_owned(api, |err| {
                    (api.verify)(
                        handle,
                        base(unverified_signature),
                        unverified_signature.len(),
                        err,
                    )
                })
            }
            .map_err(|message| VerificationSnafu { message }.build())?;

            let mut len: size_t = 0;
            let content = unsafe {
                let data = (api.verification_result_get_content)(result.as_ptr(), &mut len);
                copy_bytes(data, len)
            };
            let signer = unsafe {
                copy_identity((api.verification_result_get_signer)(result.as_ptr()))
            }
            .map_err(|message| {
                FieldExtractionSnafu {
                    field: "signer",
                    message,
                }
                .build()
            })?;

            Ok(Verification { content, signer })
        })?;

        debug!("verified signature by {}", verification.signer);
        Ok(verification)
    }

    fn close(&self) -> Result<()> {
        let handle = self
            .handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if handle.is_some() {
            debug!("releasing keyring");
        }
        drop(handle);
        Ok(())
    }
}
