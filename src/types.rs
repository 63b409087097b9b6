use zeroize::Zeroizing;

/// Passphrase unlocking a protected secret key.
///
/// The contents are wiped when dropped and never shown by `Debug`.
#[derive(Clone, derive_more::Debug)]
pub struct Passphrase(#[debug("***")] Zeroizing<String>);

impl Passphrase {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Passphrase {
    fn from(value: String) -> Self {
        Self(Zeroizing::new(value))
    }
}

impl From<&str> for Passphrase {
    fn from(value: &str) -> Self {
        Self(Zeroizing::new(value.to_string()))
    }
}

/// Outcome of a successful verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    /// The signed content, recovered from the signature.
    pub content: Vec<u8>,
    /// Key identity (fingerprint) of the signer.
    pub signer: String,
}
