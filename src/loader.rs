use std::path::Path;

use libloading::Library;
use log::debug;
use once_cell::sync::OnceCell;
use snafu::ResultExt;

use crate::config::EngineConfig;
use crate::errors::{EngineLoadSnafu, MissingSymbolSnafu, Result};
use crate::ffi::{self, EngineApi};

/// A loaded engine.
///
/// Holding an `Engine` proves the engine is ready for use: every mechanism
/// constructor takes one. Obtain it from [`init`], [`init_with`] or an
/// [`EngineLoader`].
#[derive(Debug)]
pub struct Engine {
    api: EngineApi,
    // Keeps the resolved symbols in `api` valid.
    _library: Option<Library>,
}

impl Engine {
    /// Opens the module named by `config` and resolves the engine entry points.
    ///
    /// On Unix the module is opened with `RTLD_NOW | RTLD_GLOBAL`, so every
    /// symbol is bound immediately and a broken module fails here rather than
    /// on first use.
    pub fn load(config: &EngineConfig) -> Result<Self> {
        let path = config.library();
        let library_name = path.display().to_string();
        debug!("loading engine from {}", library_name);

        // SAFETY: running the module's initializers is the point of loading
        // it; the module is trusted to be a conforming engine.
        let library = unsafe { open(path) }.context(EngineLoadSnafu {
            library: library_name.clone(),
        })?;
        // SAFETY: the symbol types are the engine ABI declared in `ffi`.
        let api = unsafe { resolve(&library, &library_name)? };

        debug!("engine {} loaded", library_name);
        Ok(Engine {
            api,
            _library: Some(library),
        })
    }

    /// Wraps an engine that is linked into the process.
    pub fn from_api(api: EngineApi) -> Self {
        Engine {
            api,
            _library: None,
        }
    }

    pub fn api(&self) -> &EngineApi {
        &self.api
    }
}

#[cfg(unix)]
unsafe fn open(path: &Path) -> std::result::Result<Library, libloading::Error> {
    use libloading::os::unix;

    let library = unsafe { unix::Library::open(Some(path), unix::RTLD_NOW | unix::RTLD_GLOBAL)? };
    Ok(library.into())
}

#[cfg(not(unix))]
unsafe fn open(path: &Path) -> std::result::Result<Library, libloading::Error> {
    unsafe { Library::new(path) }
}

unsafe fn symbol<T: Copy>(library: &Library, library_name: &str, name: &'static str) -> Result<T> {
    let symbol = unsafe { library.get::<T>(name.as_bytes()) }.context(MissingSymbolSnafu {
        symbol: name,
        library: library_name,
    })?;
    Ok(*symbol)
}

unsafe fn resolve(library: &Library, name: &str) -> Result<EngineApi> {
    let lookup = unsafe { library.get::<ffi::mechanism_free_fn>(ffi::MECHANISM_FREE.as_bytes()) };
    let mechanism_free = match lookup {
        Ok(symbol) => Some(*symbol),
        Err(err) => {
            debug!("{} has no {}: {}", name, ffi::MECHANISM_FREE, err);
            None
        }
    };

    unsafe {
        Ok(EngineApi {
            mechanism_new_from_directory: symbol(library, name, ffi::MECHANISM_NEW_FROM_DIRECTORY)?,
            mechanism_new_ephemeral: symbol(library, name, ffi::MECHANISM_NEW_EPHEMERAL)?,
            mechanism_free,
            sign: symbol(library, name, ffi::SIGN)?,
            signature_free: symbol(library, name, ffi::SIGNATURE_FREE)?,
            signature_get_data: symbol(library, name, ffi::SIGNATURE_GET_DATA)?,
            verify: symbol(library, name, ffi::VERIFY)?,
            verification_result_free: symbol(library, name, ffi::VERIFICATION_RESULT_FREE)?,
            verification_result_get_content: symbol(
                library,
                name,
                ffi::VERIFICATION_RESULT_GET_CONTENT,
            )?,
            verification_result_get_signer: symbol(
                library,
                name,
                ffi::VERIFICATION_RESULT_GET_SIGNER,
            )?,
            import_keys: symbol(library, name, ffi::IMPORT_KEYS)?,
            import_result_free: symbol(library, name, ffi::IMPORT_RESULT_FREE)?,
            import_result_get_count: symbol(library, name, ffi::IMPORT_RESULT_GET_COUNT)?,
            import_result_get_content: symbol(library, name, ffi::IMPORT_RESULT_GET_CONTENT)?,
            error_free: symbol(library, name, ffi::ERROR_FREE)?,
        })
    }
}

/// One-time initialization guard around an [`Engine`].
///
/// The first successful initialization wins; later calls return the same
/// engine without running their initializer. Concurrent callers block until
/// the running attempt has finished. A failed attempt leaves the loader empty,
/// so a later call may try again.
#[derive(Debug, Default)]
pub struct EngineLoader {
    engine: OnceCell<Engine>,
}

impl EngineLoader {
    pub const fn new() -> Self {
        EngineLoader {
            engine: OnceCell::new(),
        }
    }

    pub fn get_or_try_init<F>(&self, f: F) -> Result<&Engine>
    where
        F: FnOnce() -> Result<Engine>,
    {
        if let Some(engine) = self.engine.get() {
            debug!("engine already loaded");
            return Ok(engine);
        }
        self.engine.get_or_try_init(f)
    }

    /// Returns the engine if it has been initialized.
    pub fn get(&self) -> Option<&Engine> {
        self.engine.get()
    }
}

static ENGINE: EngineLoader = EngineLoader::new();

/// Loads the process-wide engine as configured by the environment.
///
/// See [`EngineConfig::from_env`].
pub fn init() -> Result<&'static Engine> {
    if let Some(engine) = ENGINE.get() {
        return Ok(engine);
    }
    init_with(&EngineConfig::from_env()?)
}

/// Loads the process-wide engine from `config`.
///
/// The engine is loaded at most once per process; once it is, `config` is
/// ignored by later calls.
pub fn init_with(config: &EngineConfig) -> Result<&'static Engine> {
    ENGINE.get_or_try_init(|| Engine::load(config))
}
