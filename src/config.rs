use std::env;
use std::path::{Path, PathBuf};

use derive_builder::Builder;

use crate::errors::{Error, Result};

/// Name of the engine module loaded when nothing else is configured.
pub const DEFAULT_LIBRARY: &str = "libpodman_sequoia.so";

/// Environment variable overriding the engine module to load.
pub const ENGINE_ENV: &str = "PGP_MECHANISM_ENGINE";

/// Where to find the engine module.
///
/// ```
/// use pgp_mechanism::EngineConfigBuilder;
///
/// let config = EngineConfigBuilder::default()
///     .library("/usr/lib64/libpodman_sequoia.so")
///     .build()
///     .unwrap();
/// assert_eq!(config.library().to_str(), Some("/usr/lib64/libpodman_sequoia.so"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Builder)]
#[builder(build_fn(error = "Error"))]
pub struct EngineConfig {
    /// File name or path of the shared module, resolved the way the platform
    /// loader resolves it.
    #[builder(setter(into), default = "PathBuf::from(DEFAULT_LIBRARY)")]
    library: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            library: PathBuf::from(DEFAULT_LIBRARY),
        }
    }
}

impl EngineConfig {
    /// Reads the configuration from the environment, falling back to
    /// [`DEFAULT_LIBRARY`] when [`ENGINE_ENV`] is unset or empty.
    pub fn from_env() -> Result<Self> {
        let mut builder = EngineConfigBuilder::default();
        if let Some(library) = env::var_os(ENGINE_ENV).filter(|v| !v.is_empty()) {
            builder.library(library);
        }
        builder.build()
    }

    pub fn library(&self) -> &Path {
        &self.library
    }
}
