//! Single source of truth for one account's session commitment tree.
//!
//! The manager owns the tree and the session store for the lifetime of the
//! account. Session creation mutates the tree and returns the root-update
//! instruction as one unit; signing only reads the tree, and inclusion proofs
//! are regenerated from the live tree on every call, never cached. A proof
//! against an outdated root is a correctness bug, not an efficiency concern.

use crate::{
    error::{ModuleError, Result},
    policy::{AuthorizationModule, PolicyTable},
    store::{SessionSearch, SessionStore, StoreSnapshot},
};
use alloy_primitives::{Address, B256, Bytes};
use alloy_signer::SignerSync;
use sessionkit_primitives::{MerkleTree, SessionRecord, SessionStatus, wire};
use tracing::{debug, info};

/// Session key manager for one account.
pub struct SessionKeyManager {
    module_address: Address,
    store: SessionStore,
    tree: MerkleTree,
    policies: PolicyTable,
}

impl SessionKeyManager {
    /// Create a manager with an empty store and tree.
    pub fn new(module_address: Address) -> Self {
        Self {
            module_address,
            store: SessionStore::new(),
            tree: MerkleTree::new(),
            policies: PolicyTable::new(),
        }
    }

    /// Attach a policy table; registered modules get their key data checked
    /// at session creation.
    pub fn with_policies(mut self, policies: PolicyTable) -> Self {
        self.policies = policies;
        self
    }

    /// Rebuild a manager strictly from persisted, confirmed state. The tree
    /// is recomputed from the snapshot's record order, which is the leaf
    /// order originally committed.
    pub fn from_snapshot(module_address: Address, snapshot: StoreSnapshot) -> Result<Self> {
        let store = SessionStore::from_snapshot(snapshot)?;
        let tree = MerkleTree::from_leaves(store.sessions().iter().map(SessionRecord::leaf).collect());
        Ok(Self { module_address, store, tree, policies: PolicyTable::new() })
    }

    /// The validation module this manager produces signatures for.
    pub fn module_address(&self) -> Address {
        self.module_address
    }

    /// Current commitment root. This is the root the verifying contract must
    /// hold after the last emitted root update is applied.
    pub fn root(&self) -> B256 {
        self.tree.root()
    }

    /// Read access to the underlying store.
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Mutable access to the underlying store, for status bookkeeping.
    ///
    /// Record insertion must go through [`Self::create_session_data`] so the
    /// tree and the store never diverge.
    pub fn store_mut(&mut self) -> &mut SessionStore {
        &mut self.store
    }

    /// Append sessions to the commitment tree and return the root-update
    /// calldata the caller must submit on-chain.
    ///
    /// Every record is validated before anything mutates, so a failed call
    /// leaves tree and store untouched. The in-memory tree advances as soon
    /// as this returns; discarding the returned instruction desynchronizes
    /// local state from the contract, and the recovery path is rebuilding
    /// from a confirmed [`StoreSnapshot`] via [`Self::from_snapshot`].
    pub fn create_session_data(&mut self, records: Vec<SessionRecord>) -> Result<Bytes> {
        for record in &records {
            record.validate()?;
            if !record.is_addressable() {
                return Err(ModuleError::AmbiguousOrMissingSearchParam);
            }
            if let Some(entry) = self.policies.get(record.session_validation_module) {
                if !(entry.check)(&record.session_key_data) {
                    return Err(ModuleError::PolicyRejected {
                        module: record.session_validation_module,
                        name: entry.name,
                    });
                }
            }
        }

        let added = records.len();
        for mut record in records {
            record.status = SessionStatus::Pending;
            let leaf = record.leaf();
            self.store.add_session(record)?;
            self.tree.append(leaf);
        }

        let root = self.tree.root();
        info!(added, root = %root, "committed sessions to tree");
        Ok(wire::root_update_calldata(root))
    }

    /// Mark all pending sessions active once the root update has been
    /// confirmed on-chain (signaled externally).
    pub fn confirm_pending_sessions(&mut self) -> usize {
        self.store.activate_pending_sessions()
    }

    /// Sign `operation_hash` on behalf of the session matching `search`.
    ///
    /// The record is resolved by `session_id` if supplied, otherwise by the
    /// `(session_public_key, session_validation_module)` pair; revoked
    /// records never match. The inclusion proof is regenerated from the live
    /// tree, and the blob is
    /// `abi.encode(uint48, uint48, address, bytes, bytes32[], bytes)`.
    pub fn sign_operation(&self, operation_hash: B256, search: &SessionSearch) -> Result<Bytes> {
        let record = self.store.get_session(search)?;
        if !record.is_signable() {
            return Err(ModuleError::SessionNotFound);
        }

        let signer = self.store.signer(record.session_public_key)?;
        let proof = self
            .tree
            .position_of(record.leaf())
            .and_then(|index| self.tree.proof(index))
            .ok_or(ModuleError::SessionNotFound)?;

        let signature = signer.sign_hash_sync(&operation_hash)?;
        debug!(
            session = record.session_id.as_deref().unwrap_or("<none>"),
            signer = %record.session_public_key,
            proof_len = proof.len(),
            "signed operation with session key"
        );

        Ok(wire::encode_session_signature(
            record.window,
            record.session_validation_module,
            record.session_key_data.clone(),
            proof,
            Bytes::from(signature.as_bytes().to_vec()),
        ))
    }

    /// Resolve a record and its current inclusion proof. Used by the batched
    /// router, which packs several sessions behind one signature.
    pub(crate) fn record_with_proof(
        &self,
        search: &SessionSearch,
    ) -> Result<(&SessionRecord, Vec<B256>)> {
        let record = self.store.get_session(search)?;
        if !record.is_signable() {
            return Err(ModuleError::SessionNotFound);
        }
        let proof = self
            .tree
            .position_of(record.leaf())
            .and_then(|index| self.tree.proof(index))
            .ok_or(ModuleError::SessionNotFound)?;
        Ok((record, proof))
    }
}

impl AuthorizationModule for SessionKeyManager {
    fn module_address(&self) -> Address {
        self.module_address
    }

    fn sign_message(&self, _message: &[u8]) -> Result<Bytes> {
        // Session keys sign operation hashes under a session policy; the
        // manager itself has no message-signing identity.
        Err(ModuleError::UnimplementedCapability(
            "session key manager cannot sign arbitrary messages",
        ))
    }
}
