//! Session validation policies and the shared module capabilities.
//!
//! Each on-chain validation module interprets a session's key data against a
//! policy (who may sign, what they may spend). Client-side, a policy is a
//! small encoder strategy selected by configuration: a [`SessionPolicy`]
//! produces the key data for a record, and a [`PolicyTable`] maps module
//! addresses to statically registered key-data checks so malformed payloads
//! are caught before they are committed to the tree.

use crate::error::Result;
use alloy_primitives::{Address, Bytes, U256};
use sessionkit_primitives::{SessionRecord, ValidityWindow};
use std::collections::HashMap;

/// Encoder strategy for one validation module's session key data.
pub trait SessionPolicy {
    /// Address of the on-chain module that interprets this policy.
    fn module_address(&self) -> Address;

    /// The delegated signer this policy authorizes.
    fn session_public_key(&self) -> Address;

    /// Encode the module-specific key data payload.
    fn encode_key_data(&self) -> Bytes;

    /// Build a session record for this policy under `window`.
    fn build_record(&self, window: ValidityWindow) -> SessionRecord {
        SessionRecord::new(
            window,
            self.module_address(),
            self.encode_key_data(),
            self.session_public_key(),
        )
    }
}

/// Plain key-ownership policy: key data is the packed 20-byte session key
/// address, and the module accepts any operation signed by that key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EcdsaOwnershipPolicy {
    pub module_address: Address,
    pub session_key: Address,
}

impl SessionPolicy for EcdsaOwnershipPolicy {
    fn module_address(&self) -> Address {
        self.module_address
    }

    fn session_public_key(&self) -> Address {
        self.session_key
    }

    fn encode_key_data(&self) -> Bytes {
        Bytes::copy_from_slice(self.session_key.as_slice())
    }
}

/// ERC-20 transfer policy: the session key may move at most `max_amount` of
/// `token` to `receiver`. Key data layout (packed):
/// `sessionKey ‖ token ‖ receiver ‖ maxAmount(32)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Erc20TransferPolicy {
    pub module_address: Address,
    pub session_key: Address,
    pub token: Address,
    pub receiver: Address,
    pub max_amount: U256,
}

impl SessionPolicy for Erc20TransferPolicy {
    fn module_address(&self) -> Address {
        self.module_address
    }

    fn session_public_key(&self) -> Address {
        self.session_key
    }

    fn encode_key_data(&self) -> Bytes {
        let mut buf = Vec::with_capacity(20 + 20 + 20 + 32);
        buf.extend_from_slice(self.session_key.as_slice());
        buf.extend_from_slice(self.token.as_slice());
        buf.extend_from_slice(self.receiver.as_slice());
        buf.extend_from_slice(&self.max_amount.to_be_bytes::<32>());
        buf.into()
    }
}

/// Shape check for a module's key data payload.
pub type KeyDataCheck = fn(&[u8]) -> bool;

/// One registered policy module.
#[derive(Clone, Copy, Debug)]
pub struct PolicyEntry {
    pub name: &'static str,
    pub check: KeyDataCheck,
}

/// Registry of known validation modules, keyed by module address.
///
/// Replaces verification-time dynamic dispatch on the module address with a
/// table lookup of statically registered entries. Modules absent from the
/// table are passed through unchecked: key data is opaque by design, and the
/// table only guards the payloads this client claims to understand.
#[derive(Clone, Debug, Default)]
pub struct PolicyTable {
    entries: HashMap<Address, PolicyEntry>,
}

impl PolicyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module's key-data check under its address.
    pub fn register(&mut self, module: Address, name: &'static str, check: KeyDataCheck) {
        self.entries.insert(module, PolicyEntry { name, check });
    }

    /// The registered entry for `module`, if any.
    pub fn get(&self, module: Address) -> Option<&PolicyEntry> {
        self.entries.get(&module)
    }

    /// Apply the registered check to `key_data`. `None` when the module is
    /// unknown to this table.
    pub fn check_key_data(&self, module: Address, key_data: &[u8]) -> Option<bool> {
        self.entries.get(&module).map(|entry| (entry.check)(key_data))
    }
}

/// Key-data check for [`EcdsaOwnershipPolicy`] payloads.
pub fn ecdsa_key_data_check(data: &[u8]) -> bool {
    data.len() == 20
}

/// Key-data check for [`Erc20TransferPolicy`] payloads.
pub fn erc20_key_data_check(data: &[u8]) -> bool {
    data.len() == 92
}

/// Capability shared by every signer-facing module.
///
/// Modules compose this with their own operation encoding instead of
/// inheriting from one another: the manager and router only sign operation
/// hashes through their dedicated entry points, while the multi-chain
/// aggregator also carries an independent message-signing identity.
pub trait AuthorizationModule {
    /// On-chain address of the validation module.
    fn module_address(&self) -> Address;

    /// Sign an arbitrary message with the module's own identity.
    ///
    /// Fails with [`crate::ModuleError::UnimplementedCapability`] for modules
    /// that have no identity of their own.
    fn sign_message(&self, message: &[u8]) -> Result<Bytes>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ecdsa_policy_encodes_packed_address() {
        let policy = EcdsaOwnershipPolicy {
            module_address: Address::repeat_byte(1),
            session_key: Address::repeat_byte(2),
        };
        let data = policy.encode_key_data();
        assert_eq!(data.as_ref(), Address::repeat_byte(2).as_slice());
        assert!(ecdsa_key_data_check(&data));
    }

    #[test]
    fn erc20_policy_encodes_packed_tuple() {
        let policy = Erc20TransferPolicy {
            module_address: Address::repeat_byte(1),
            session_key: Address::repeat_byte(2),
            token: Address::repeat_byte(3),
            receiver: Address::repeat_byte(4),
            max_amount: U256::from(1_000u64),
        };
        let data = policy.encode_key_data();
        assert_eq!(data.len(), 92);
        assert_eq!(&data[..20], Address::repeat_byte(2).as_slice());
        assert_eq!(&data[20..40], Address::repeat_byte(3).as_slice());
        assert_eq!(&data[40..60], Address::repeat_byte(4).as_slice());
        assert_eq!(&data[60..], &U256::from(1_000u64).to_be_bytes::<32>());
        assert!(erc20_key_data_check(&data));
    }

    #[test]
    fn build_record_carries_policy_fields() {
        let policy = EcdsaOwnershipPolicy {
            module_address: Address::repeat_byte(1),
            session_key: Address::repeat_byte(2),
        };
        let record = policy.build_record(ValidityWindow::new(100, 50));
        assert_eq!(record.session_validation_module, policy.module_address);
        assert_eq!(record.session_public_key, policy.session_key);
        assert_eq!(record.window, ValidityWindow::new(100, 50));
    }

    #[test]
    fn table_checks_registered_modules_only() {
        let module = Address::repeat_byte(1);
        let mut table = PolicyTable::new();
        table.register(module, "ecdsa-ownership", ecdsa_key_data_check);

        assert_eq!(table.check_key_data(module, &[0u8; 20]), Some(true));
        assert_eq!(table.check_key_data(module, &[0u8; 19]), Some(false));
        assert_eq!(table.check_key_data(Address::repeat_byte(9), &[]), None);
        assert_eq!(table.get(module).map(|e| e.name), Some("ecdsa-ownership"));
    }
}
