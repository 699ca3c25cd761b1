//! Session records: the unit of delegated signing authority.
//!
//! A session grants a delegated key bounded, revocable authority over an
//! account, governed by a validity window and a validation module that
//! interprets the session key data on-chain.

use crate::wire;
use alloy_primitives::{Address, B256, Bytes};
use serde::{Deserialize, Serialize};

/// Largest value the on-chain `uint48` validity bounds can carry.
pub const MAX_VALIDITY_TIMESTAMP: u64 = (1 << 48) - 1;

/// Validity window for a session or a per-chain operation, in unix seconds.
///
/// A bound of `0` means "unbounded" on that side, matching the verifying
/// contract's interpretation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidityWindow {
    /// Timestamp after which the authorization is no longer valid (0 = never).
    pub valid_until: u64,
    /// Timestamp before which the authorization is not yet valid (0 = always).
    pub valid_after: u64,
}

impl ValidityWindow {
    /// Window that never expires and is immediately valid.
    pub const UNBOUNDED: Self = Self { valid_until: 0, valid_after: 0 };

    /// Create a window with explicit bounds.
    pub const fn new(valid_until: u64, valid_after: u64) -> Self {
        Self { valid_until, valid_after }
    }

    /// Returns true if both bounds are unset.
    pub const fn is_unbounded(&self) -> bool {
        self.valid_until == 0 && self.valid_after == 0
    }

    /// Returns true if both bounds fit the wire format's `uint48`.
    pub const fn fits_u48(&self) -> bool {
        self.valid_until <= MAX_VALIDITY_TIMESTAMP && self.valid_after <= MAX_VALIDITY_TIMESTAMP
    }
}

/// Local lifecycle state of a session record.
///
/// Bookkeeping only: status never participates in the leaf commitment, so
/// revising it cannot invalidate proofs already issued for the session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    /// Created locally, root update not yet confirmed on-chain.
    Pending,
    /// Root update confirmed, session usable.
    Active,
    /// Explicitly revoked.
    Inactive,
    /// Validity window elapsed.
    Expired,
}

/// Why a [`SessionRecord`] was rejected at creation time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum InvalidRecordError {
    #[error("session validation module is unset")]
    MissingValidationModule,
    #[error("session key data is empty")]
    EmptyKeyData,
    #[error("validity bound exceeds 48 bits")]
    WindowOverflow,
}

/// One leaf of the per-account commitment tree.
///
/// The committed portion is `(valid_until, valid_after, session_validation_module,
/// session_key_data)`; `session_id`, `status` and `session_public_key` are
/// local bookkeeping and never affect the leaf hash.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    /// Validity window committed into the leaf.
    #[serde(flatten)]
    pub window: ValidityWindow,

    /// Address of the module that interprets `session_key_data` on verification.
    pub session_validation_module: Address,

    /// Opaque, module-specific policy payload (e.g. encoded spending limits).
    pub session_key_data: Bytes,

    /// Address of the delegated signer bound to this session.
    pub session_public_key: Address,

    /// Stable identifier assigned at creation, for lookup independent of key
    /// material.
    pub session_id: Option<String>,

    /// Local lifecycle state.
    pub status: SessionStatus,
}

impl SessionRecord {
    /// Create a record for a new session, starting out [`SessionStatus::Pending`].
    pub fn new(
        window: ValidityWindow,
        session_validation_module: Address,
        session_key_data: Bytes,
        session_public_key: Address,
    ) -> Self {
        Self {
            window,
            session_validation_module,
            session_key_data,
            session_public_key,
            session_id: None,
            status: SessionStatus::Pending,
        }
    }

    /// Check the committed fields are well-formed for leaf encoding.
    pub fn validate(&self) -> Result<(), InvalidRecordError> {
        if self.session_validation_module == Address::ZERO {
            return Err(InvalidRecordError::MissingValidationModule);
        }
        if self.session_key_data.is_empty() {
            return Err(InvalidRecordError::EmptyKeyData);
        }
        if !self.window.fits_u48() {
            return Err(InvalidRecordError::WindowOverflow);
        }
        Ok(())
    }

    /// Returns true if the record can be found again through the store: it
    /// carries a `session_id`, or the full `(session_public_key, module)` pair.
    pub fn is_addressable(&self) -> bool {
        self.session_id.is_some()
            || (self.session_public_key != Address::ZERO
                && self.session_validation_module != Address::ZERO)
    }

    /// Returns true unless the session has been explicitly revoked.
    pub const fn is_signable(&self) -> bool {
        !matches!(self.status, SessionStatus::Inactive)
    }

    /// The leaf hash this record commits to the tree.
    pub fn leaf(&self) -> B256 {
        wire::session_leaf(self.window, self.session_validation_module, &self.session_key_data)
    }
}
