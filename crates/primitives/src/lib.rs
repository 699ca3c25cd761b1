//! Data and codec layer for the sessionkit delegated-authorization engine.
//!
//! This crate holds what the verifying contracts see: session records and
//! their leaf commitments, the keccak Merkle tree those leaves live in, and
//! the ABI wire encodings of the signature blobs. It carries no key material
//! and performs no I/O; the signing components live in `sessionkit-modules`.

pub mod merkle;
pub mod session;
pub mod wire;

pub use merkle::{MerkleTree, verify_proof};
pub use session::{
    InvalidRecordError, MAX_VALIDITY_TIMESTAMP, SessionRecord, SessionStatus, ValidityWindow,
};
