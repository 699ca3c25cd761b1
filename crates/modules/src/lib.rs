//! Signing components of the sessionkit delegated-authorization engine.
//!
//! Four components, leaves first: the [`SessionStore`] persists records and
//! key material; the [`SessionKeyManager`] owns one account's commitment tree
//! and signs with individual session keys; the [`BatchedSessionRouter`]
//! composes several sessions behind one signature; the
//! [`MultiChainAggregator`] authorizes one intent across many chains with a
//! single owner signature.
//!
//! Every signer-facing entry point returns an opaque byte blob that callers
//! attach to the operation before submission; submission itself is out of
//! scope here.

pub mod batched_router;
pub mod error;
pub mod multichain;
pub mod policy;
pub mod session_key_manager;
pub mod store;

pub use batched_router::BatchedSessionRouter;
pub use error::{ModuleError, Result};
pub use multichain::{ChainOperation, MultiChainAggregator, SignedChainOperation};
pub use policy::{
    AuthorizationModule, EcdsaOwnershipPolicy, Erc20TransferPolicy, PolicyEntry, PolicyTable,
    SessionPolicy,
};
pub use session_key_manager::SessionKeyManager;
pub use store::{SessionSearch, SessionStore, StoreSnapshot};

pub use sessionkit_primitives::{
    InvalidRecordError, MerkleTree, SessionRecord, SessionStatus, ValidityWindow, verify_proof,
    wire,
};
