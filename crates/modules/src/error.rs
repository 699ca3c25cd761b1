use alloy_primitives::Address;
use sessionkit_primitives::InvalidRecordError;

/// Failures surfaced by the signing components.
///
/// All of these are local, synchronous validation failures; none is worth
/// retrying, so no retry machinery exists here.
#[derive(Debug, thiserror::Error)]
pub enum ModuleError {
    /// A session record was malformed at creation time.
    #[error("invalid session record: {0}")]
    InvalidRecord(#[from] InvalidRecordError),

    /// Session key data does not match what the registered policy module expects.
    #[error("session key data rejected by policy {name} at {module}")]
    PolicyRejected { module: Address, name: &'static str },

    /// No matching, non-revoked session record exists.
    #[error("session not found")]
    SessionNotFound,

    /// A lookup supplied neither a session id nor the full
    /// `(session_public_key, session_validation_module)` pair.
    #[error("search parameters are ambiguous or missing")]
    AmbiguousOrMissingSearchParam,

    /// No private key material is registered for the given signer.
    #[error("no key material for signer {0}")]
    SignerUnavailable(Address),

    /// A batched signing call mixed sessions owned by different session keys.
    #[error("batched sessions do not share one session key signer")]
    InconsistentSigner,

    /// The module legitimately cannot perform this operation.
    #[error("unimplemented capability: {0}")]
    UnimplementedCapability(&'static str),

    /// The underlying ECDSA signer failed.
    #[error(transparent)]
    Signer(#[from] alloy_signer::Error),

    /// A store snapshot could not be decoded.
    #[error("malformed store snapshot: {0}")]
    Snapshot(String),
}

/// Result type alias for module operations.
pub type Result<T> = std::result::Result<T, ModuleError>;
