//! Sign once, authorize on K chains.
//!
//! The aggregator takes per-chain operations belonging to one user intent,
//! commits their hashes into an ephemeral Merkle tree, and signs only the
//! root with the account owner key. Each chain's verifier then checks a small
//! inclusion proof against that one signature instead of requiring K owner
//! signatures. The tree lives only for the duration of one call.

use crate::{
    error::Result,
    policy::AuthorizationModule,
};
use alloy_primitives::{Address, B256, Bytes};
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;
use sessionkit_primitives::{InvalidRecordError, MerkleTree, ValidityWindow, wire};
use tracing::debug;

/// One operation hash bound to one chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChainOperation {
    /// Chain the operation will be submitted on.
    pub chain_id: u64,
    /// Hash of the operation as the target chain's entry point computes it.
    pub operation_hash: B256,
    /// Caller-chosen validity window, unbounded by default.
    pub window: ValidityWindow,
}

impl ChainOperation {
    /// Operation with an unbounded validity window.
    pub const fn new(chain_id: u64, operation_hash: B256) -> Self {
        Self { chain_id, operation_hash, window: ValidityWindow::UNBOUNDED }
    }

    /// Restrict the operation to `window`.
    pub const fn with_window(mut self, window: ValidityWindow) -> Self {
        self.window = window;
        self
    }
}

/// An operation with its per-chain authorization attached.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedChainOperation {
    pub chain_id: u64,
    pub operation_hash: B256,
    /// Replacement for the operation's signature field:
    /// `abi.encode(bytes moduleSignature, address moduleAddress)` wrapping
    /// `abi.encode(uint48, uint48, bytes32 root, bytes32[] proof, bytes rootSig)`.
    pub signature: Bytes,
}

/// Aggregates per-chain operations under a single owner signature.
///
/// Stands directly on the account's master signer; it has no session state
/// and no dependency on the session key manager.
#[derive(Clone, Debug)]
pub struct MultiChainAggregator {
    module_address: Address,
    owner: PrivateKeySigner,
}

impl MultiChainAggregator {
    /// Create an aggregator for the multi-chain validation module at
    /// `module_address`, signing with the account owner key.
    pub const fn new(module_address: Address, owner: PrivateKeySigner) -> Self {
        Self { module_address, owner }
    }

    /// Address of the account owner key.
    pub fn owner_address(&self) -> Address {
        self.owner.address()
    }

    /// Produce one per-chain proof + signature pair for every input.
    ///
    /// All outputs carry byte-identical root signatures; only the proof and
    /// the embedded validity window vary per item. An empty input is a no-op
    /// and returns an empty vector.
    pub fn sign_across_chains(
        &self,
        operations: &[ChainOperation],
    ) -> Result<Vec<SignedChainOperation>> {
        if operations.is_empty() {
            return Ok(Vec::new());
        }

        for op in operations {
            if !op.window.fits_u48() {
                return Err(InvalidRecordError::WindowOverflow.into());
            }
        }

        let leaves: Vec<B256> = operations
            .iter()
            .map(|op| wire::multichain_leaf(op.window, op.operation_hash))
            .collect();
        let tree = MerkleTree::from_leaves(leaves);
        let root = tree.root();

        let signature = self.owner.sign_hash_sync(&root)?;
        let root_signature = Bytes::from(signature.as_bytes().to_vec());
        debug!(
            operations = operations.len(),
            root = %root,
            owner = %self.owner.address(),
            "signed multi-chain root"
        );

        let signed = operations
            .iter()
            .enumerate()
            .map(|(index, op)| {
                // Leaf `index` was inserted above; the proof always exists.
                let proof = tree.proof(index).expect("leaf index in range");
                let module_signature = wire::encode_multichain_signature(
                    op.window,
                    root,
                    proof,
                    root_signature.clone(),
                );
                SignedChainOperation {
                    chain_id: op.chain_id,
                    operation_hash: op.operation_hash,
                    signature: wire::wrap_module_signature(module_signature, self.module_address),
                }
            })
            .collect();

        Ok(signed)
    }
}

impl AuthorizationModule for MultiChainAggregator {
    fn module_address(&self) -> Address {
        self.module_address
    }

    /// The aggregator stands on the owner key, so it can sign arbitrary
    /// messages (EIP-191) unlike the session-backed modules.
    fn sign_message(&self, message: &[u8]) -> Result<Bytes> {
        let signature = self.owner.sign_message_sync(message)?;
        Ok(Bytes::from(signature.as_bytes().to_vec()))
    }
}
