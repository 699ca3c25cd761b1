//! One signature over several session permissions at once.
//!
//! A batched operation can touch N permissioned actions, each covered by its
//! own session record. Rather than collecting N session signatures, the
//! router signs `keccak256(operationHash ‖ routerAddress)` once with the one
//! session key all referenced sessions share, and packs the per-session
//! tuples plus that shared signature into a single blob. Index `i` across the
//! parallel arrays must describe the same session; the verifying contract
//! depends on that alignment.

use crate::{
    error::{ModuleError, Result},
    policy::AuthorizationModule,
    session_key_manager::SessionKeyManager,
    store::SessionSearch,
};
use alloy_primitives::{Address, B256, Bytes};
use alloy_signer::SignerSync;
use sessionkit_primitives::{SessionStatus, ValidityWindow, wire};
use tracing::debug;

/// Router module that composes several sessions behind one signature.
///
/// Holds no session state of its own: records and proofs come from the
/// delegate [`SessionKeyManager`] passed into each call.
#[derive(Clone, Copy, Debug)]
pub struct BatchedSessionRouter {
    router_address: Address,
}

impl BatchedSessionRouter {
    /// Create a router for the on-chain router module at `router_address`.
    pub const fn new(router_address: Address) -> Self {
        Self { router_address }
    }

    /// The on-chain router module address.
    pub const fn router_address(&self) -> Address {
        self.router_address
    }

    /// Sign `operation_hash` against every session referenced in `refs`.
    ///
    /// All referenced sessions must resolve to the same session key signer;
    /// one presented signature must not silently span keys it does not
    /// represent. Returns
    /// `abi.encode(address, uint48[], uint48[], address[], bytes[], bytes32[][], bytes)`
    /// with arrays ordered exactly as `refs`.
    pub fn sign_batch(
        &self,
        manager: &SessionKeyManager,
        operation_hash: B256,
        refs: &[SessionSearch],
    ) -> Result<Bytes> {
        let mut windows: Vec<ValidityWindow> = Vec::with_capacity(refs.len());
        let mut modules: Vec<Address> = Vec::with_capacity(refs.len());
        let mut key_datas: Vec<Bytes> = Vec::with_capacity(refs.len());
        let mut proofs: Vec<Vec<B256>> = Vec::with_capacity(refs.len());
        let mut common_signer: Option<Address> = None;

        for search in refs {
            let (record, proof) = manager.record_with_proof(search)?;
            match common_signer {
                None => common_signer = Some(record.session_public_key),
                Some(signer) if signer != record.session_public_key => {
                    return Err(ModuleError::InconsistentSigner);
                }
                Some(_) => {}
            }
            windows.push(record.window);
            modules.push(record.session_validation_module);
            key_datas.push(record.session_key_data.clone());
            proofs.push(proof);
        }

        // An empty batch resolves no session and therefore no signer.
        let signer_address = common_signer.ok_or(ModuleError::SessionNotFound)?;
        let signer = manager.store().signer(signer_address)?;

        let message = wire::batch_message_hash(operation_hash, self.router_address);
        let signature = signer.sign_hash_sync(&message)?;
        debug!(
            sessions = refs.len(),
            signer = %signer_address,
            router = %self.router_address,
            "signed batched operation"
        );

        Ok(wire::encode_batch_signature(
            self.router_address,
            &windows,
            modules,
            key_datas,
            proofs,
            Bytes::from(signature.as_bytes().to_vec()),
        ))
    }

    /// Pass-through status update on the delegate manager's store.
    pub fn update_session_status(
        &self,
        manager: &mut SessionKeyManager,
        search: &SessionSearch,
        status: SessionStatus,
    ) -> Result<()> {
        manager.store_mut().update_session_status(search, status)
    }

    /// Pass-through pending cleanup on the delegate manager's store.
    pub fn clear_pending_sessions(&self, manager: &mut SessionKeyManager) -> usize {
        manager.store_mut().clear_pending_sessions()
    }
}

impl AuthorizationModule for BatchedSessionRouter {
    fn module_address(&self) -> Address {
        self.router_address
    }

    fn sign_message(&self, _message: &[u8]) -> Result<Bytes> {
        // The router only ever countersigns through its delegate sessions.
        Err(ModuleError::UnimplementedCapability(
            "batched session router has no message-signing identity",
        ))
    }
}
