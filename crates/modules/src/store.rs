//! Durable CRUD over session records and signer key material.
//!
//! One store instance covers one account namespace. Records are addressable
//! by `session_id` or by the `(session_public_key, session_validation_module)`
//! pair; signer key material lives in its own registry keyed by address, so a
//! signer can exist before any session binds to it or be shared across
//! sessions.

use crate::error::{ModuleError, Result};
use alloy_primitives::{Address, B256};
use alloy_signer_local::PrivateKeySigner;
use serde::{Deserialize, Serialize};
use sessionkit_primitives::{SessionRecord, SessionStatus};
use std::collections::HashMap;
use tracing::debug;

/// Search parameters for record lookup.
///
/// A search resolves unambiguously when it carries a `session_id`, or the full
/// `(session_public_key, session_validation_module)` pair; anything less fails
/// with [`ModuleError::AmbiguousOrMissingSearchParam`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionSearch {
    /// Stable identifier assigned at creation.
    pub session_id: Option<String>,
    /// Delegated signer address.
    pub session_public_key: Option<Address>,
    /// Validation module the session was created for.
    pub session_validation_module: Option<Address>,
    /// Optional status filter applied on top of the identity match.
    pub status: Option<SessionStatus>,
}

impl SessionSearch {
    /// Look up by session id.
    pub fn by_id(session_id: impl Into<String>) -> Self {
        Self { session_id: Some(session_id.into()), ..Self::default() }
    }

    /// Look up by the `(session_public_key, session_validation_module)` pair.
    pub fn by_key(session_public_key: Address, session_validation_module: Address) -> Self {
        Self {
            session_public_key: Some(session_public_key),
            session_validation_module: Some(session_validation_module),
            ..Self::default()
        }
    }

    /// Restrict the match to records in `status`.
    pub fn with_status(mut self, status: SessionStatus) -> Self {
        self.status = Some(status);
        self
    }

    fn validate(&self) -> Result<()> {
        let has_pair = self.session_public_key.is_some() && self.session_validation_module.is_some();
        if self.session_id.is_some() || has_pair {
            Ok(())
        } else {
            Err(ModuleError::AmbiguousOrMissingSearchParam)
        }
    }

    fn matches(&self, record: &SessionRecord) -> bool {
        if let Some(id) = &self.session_id {
            if record.session_id.as_deref() != Some(id.as_str()) {
                return false;
            }
        } else {
            if Some(record.session_public_key) != self.session_public_key {
                return false;
            }
            if Some(record.session_validation_module) != self.session_validation_module {
                return false;
            }
        }
        self.status.is_none_or(|status| record.status == status)
    }
}

/// Serializable image of a store, used to rebuild state from persisted,
/// confirmed data instead of trusting in-memory mutation optimistically.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSnapshot {
    /// Records in insertion order. Order is significant: it is the leaf order
    /// of the commitment tree.
    pub records: Vec<SessionRecord>,
    /// Signer secrets keyed by signer address.
    pub signers: HashMap<Address, B256>,
}

/// In-memory session and signer store for one account.
#[derive(Debug, Default)]
pub struct SessionStore {
    records: Vec<SessionRecord>,
    signers: HashMap<Address, PrivateKeySigner>,
}

impl SessionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records in insertion order.
    pub fn sessions(&self) -> &[SessionRecord] {
        &self.records
    }

    /// Append a record, assigning a fresh `session_id` when none is present.
    ///
    /// Returns the record's id. Fails with
    /// [`ModuleError::AmbiguousOrMissingSearchParam`] if the record could
    /// never be found again (no id and no full key pair).
    pub fn add_session(&mut self, mut record: SessionRecord) -> Result<String> {
        if !record.is_addressable() {
            return Err(ModuleError::AmbiguousOrMissingSearchParam);
        }
        let id = match &record.session_id {
            Some(id) => id.clone(),
            None => {
                let id = B256::random().to_string();
                record.session_id = Some(id.clone());
                id
            }
        };
        self.records.push(record);
        Ok(id)
    }

    /// First record matching `search`.
    pub fn get_session(&self, search: &SessionSearch) -> Result<&SessionRecord> {
        search.validate()?;
        self.records
            .iter()
            .find(|r| search.matches(r))
            .ok_or(ModuleError::SessionNotFound)
    }

    /// All records matching `search`.
    pub fn get_sessions(&self, search: &SessionSearch) -> Result<Vec<&SessionRecord>> {
        search.validate()?;
        Ok(self.records.iter().filter(|r| search.matches(r)).collect())
    }

    /// Update the status of the first record matching `search`.
    pub fn update_session_status(
        &mut self,
        search: &SessionSearch,
        status: SessionStatus,
    ) -> Result<()> {
        search.validate()?;
        let record = self
            .records
            .iter_mut()
            .find(|r| search.matches(r))
            .ok_or(ModuleError::SessionNotFound)?;
        record.status = status;
        Ok(())
    }

    /// Transition every `Pending` record to `Active`, returning how many
    /// changed. Called once the root update has been confirmed on-chain.
    pub fn activate_pending_sessions(&mut self) -> usize {
        let mut changed = 0;
        for record in &mut self.records {
            if record.status == SessionStatus::Pending {
                record.status = SessionStatus::Active;
                changed += 1;
            }
        }
        changed
    }

    /// Drop every `Pending` record in one pass, returning how many were
    /// removed. Used when an account holder abandons an in-flight batch.
    pub fn clear_pending_sessions(&mut self) -> usize {
        let before = self.records.len();
        self.records.retain(|r| r.status != SessionStatus::Pending);
        let removed = before - self.records.len();
        if removed > 0 {
            debug!(removed, "cleared pending sessions");
        }
        removed
    }

    /// Register signer key material, generating a fresh keypair when none is
    /// supplied. Returns the signer address.
    pub fn add_signer(&mut self, signer: Option<PrivateKeySigner>) -> Address {
        let signer = signer.unwrap_or_else(PrivateKeySigner::random);
        let address = signer.address();
        self.signers.insert(address, signer);
        address
    }

    /// Key material for `address`, if registered.
    pub fn signer(&self, address: Address) -> Result<&PrivateKeySigner> {
        self.signers.get(&address).ok_or(ModuleError::SignerUnavailable(address))
    }

    /// Export the store for persistence.
    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            records: self.records.clone(),
            signers: self.signers.iter().map(|(addr, s)| (*addr, s.to_bytes())).collect(),
        }
    }

    /// Rebuild a store from a persisted snapshot.
    pub fn from_snapshot(snapshot: StoreSnapshot) -> Result<Self> {
        let mut signers = HashMap::with_capacity(snapshot.signers.len());
        for (address, secret) in snapshot.signers {
            let signer = PrivateKeySigner::from_bytes(&secret)
                .map_err(|e| ModuleError::Snapshot(e.to_string()))?;
            if signer.address() != address {
                return Err(ModuleError::Snapshot(format!(
                    "secret does not match signer address {address}"
                )));
            }
            signers.insert(address, signer);
        }
        Ok(Self { records: snapshot.records, signers })
    }
}
