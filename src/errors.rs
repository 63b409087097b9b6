use snafu::Snafu;

pub type Result<T, E = Error> = ::std::result::Result<T, E>;

/// Error types
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("unable to load {library}: {source}"))]
    EngineLoad {
        library: String,
        source: libloading::Error,
    },
    #[snafu(display("{library} does not export {symbol}: {source}"))]
    MissingSymbol {
        symbol: &'static str,
        library: String,
        source: libloading::Error,
    },
    #[snafu(display("invalid engine configuration: {message}"))]
    Config { message: String },
    #[snafu(display("unable to initialize a mechanism: {message}"))]
    MechanismInit { message: String },
    #[snafu(display("unable to sign: {message}"))]
    Signing { message: String },
    #[snafu(display("unable to verify: {message}"))]
    Verification { message: String },
    #[snafu(display("unable to import keys: {message}"))]
    Import { message: String },
    /// The operation is deliberately absent for this mechanism family.
    #[snafu(display("{operation} is not supported"))]
    Unsupported { operation: &'static str },
    /// The engine call succeeded, but reading one of the result's fields did not.
    #[snafu(display("unable to read {field}: {message}"))]
    FieldExtraction { field: String, message: String },
    #[snafu(display("mechanism has been closed"))]
    Closed,
    #[snafu(transparent)]
    InteriorNul { source: std::ffi::NulError },
}

impl Error {
    /// Returns `true` if the engine module could not be loaded.
    ///
    /// Load failures depend on the environment and are worth retrying once it
    /// has been fixed, unlike failures reported by the engine for a single
    /// operation.
    pub fn is_load_failure(&self) -> bool {
        matches!(self, Self::EngineLoad { .. } | Self::MissingSymbol { .. })
    }
}

impl From<derive_builder::UninitializedFieldError> for Error {
    fn from(err: derive_builder::UninitializedFieldError) -> Error {
        Error::Config {
            message: err.to_string(),
        }
    }
}
