//! # pgp-mechanism
//!
//! OpenPGP signing and verification through an external engine.
//!
//! The engine is a shared module exporting the C ABI described in [`ffi`].
//! It is loaded once per process by [`init`]; the returned [`Engine`] is then
//! used to construct [`Mechanism`]s, each bound to one keyring of the engine:
//! either a keyring persisted in a directory, or an ephemeral one seeded from
//! certificates held in memory.
//!
//! ```no_run
//! use pgp_mechanism::{Mechanism, SigningMechanism};
//!
//! # fn main() -> pgp_mechanism::errors::Result<()> {
//! let engine = pgp_mechanism::init()?;
//! let mechanism = Mechanism::from_directory(engine, "/home/user/.local/share/sequoia")?;
//!
//! let signature = mechanism.sign(b"Hello, world!", "0123456789ABCDEF0123456789ABCDEF01234567")?;
//! let verification = mechanism.verify(&signature)?;
//! assert_eq!(verification.content, b"Hello, world!");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod errors;
pub mod ffi;
pub mod loader;
mod marshal;
pub mod mechanism;
pub mod types;

pub use self::config::{EngineConfig, EngineConfigBuilder};
pub use self::errors::{Error, Result};
pub use self::ffi::EngineApi;
pub use self::loader::{init, init_with, Engine, EngineLoader};
pub use self::mechanism::{Mechanism, SigningMechanism};
pub use self::types::{Passphrase, Verification};
