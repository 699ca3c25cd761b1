//! Wire encodings fixed by the verifying on-chain contracts.
//!
//! Every byte layout here must be reproduced exactly: the leaf packings, the
//! root-update calldata, and the three ABI-encoded signature blobs the
//! validation modules decode during verification.

use crate::session::ValidityWindow;
use alloy_primitives::{Address, B256, Bytes, aliases::U48, keccak256};
use alloy_sol_types::{SolCall, SolValue, sol};

sol! {
    /// Root-setting entry point on the session key manager validation module.
    function setMerkleRoot(bytes32 newRoot);
}

/// Convert a pre-validated bound into its wire integer.
///
/// Callers check [`ValidityWindow::fits_u48`] first; out-of-range values are a
/// programming error.
fn u48(value: u64) -> U48 {
    U48::from(value)
}

/// Append the 6-byte big-endian `uint48` encoding of `value`.
fn pack_u48(buf: &mut Vec<u8>, value: u64) {
    buf.extend_from_slice(&value.to_be_bytes()[2..]);
}

/// Session leaf: `keccak256(validUntil ‖ validAfter ‖ module ‖ sessionKeyData)`
/// with 6-byte validity bounds and a 20-byte module address.
pub fn session_leaf(window: ValidityWindow, module: Address, key_data: &[u8]) -> B256 {
    let mut buf = Vec::with_capacity(6 + 6 + 20 + key_data.len());
    pack_u48(&mut buf, window.valid_until);
    pack_u48(&mut buf, window.valid_after);
    buf.extend_from_slice(module.as_slice());
    buf.extend_from_slice(key_data);
    keccak256(&buf)
}

/// Multi-chain leaf: `keccak256(validUntil ‖ validAfter ‖ operationHash)`.
pub fn multichain_leaf(window: ValidityWindow, operation_hash: B256) -> B256 {
    let mut buf = Vec::with_capacity(6 + 6 + 32);
    pack_u48(&mut buf, window.valid_until);
    pack_u48(&mut buf, window.valid_after);
    buf.extend_from_slice(operation_hash.as_slice());
    keccak256(&buf)
}

/// Calldata for the root-update instruction: `setMerkleRoot(bytes32)`.
pub fn root_update_calldata(root: B256) -> Bytes {
    setMerkleRootCall { newRoot: root }.abi_encode().into()
}

/// Hash a batched operation with the router it is presented through:
/// `keccak256(operationHash ‖ routerAddress)`.
pub fn batch_message_hash(operation_hash: B256, router: Address) -> B256 {
    let mut buf = Vec::with_capacity(32 + 20);
    buf.extend_from_slice(operation_hash.as_slice());
    buf.extend_from_slice(router.as_slice());
    keccak256(&buf)
}

/// Single-session signature blob:
/// `abi.encode(uint48, uint48, address, bytes, bytes32[], bytes)`.
pub fn encode_session_signature(
    window: ValidityWindow,
    module: Address,
    key_data: Bytes,
    proof: Vec<B256>,
    signature: Bytes,
) -> Bytes {
    (u48(window.valid_until), u48(window.valid_after), module, key_data, proof, signature)
        .abi_encode_params()
        .into()
}

/// Batched-session signature blob:
/// `abi.encode(address, uint48[], uint48[], address[], bytes[], bytes32[][], bytes)`.
///
/// Index `i` across all parallel arrays must describe the same session; the
/// verifying contract relies on that positional alignment.
pub fn encode_batch_signature(
    router: Address,
    windows: &[ValidityWindow],
    modules: Vec<Address>,
    key_datas: Vec<Bytes>,
    proofs: Vec<Vec<B256>>,
    signature: Bytes,
) -> Bytes {
    let valid_untils: Vec<U48> = windows.iter().map(|w| u48(w.valid_until)).collect();
    let valid_afters: Vec<U48> = windows.iter().map(|w| u48(w.valid_after)).collect();
    (router, valid_untils, valid_afters, modules, key_datas, proofs, signature)
        .abi_encode_params()
        .into()
}

/// Per-chain multi-chain signature blob:
/// `abi.encode(uint48, uint48, bytes32, bytes32[], bytes)`.
pub fn encode_multichain_signature(
    window: ValidityWindow,
    root: B256,
    proof: Vec<B256>,
    root_signature: Bytes,
) -> Bytes {
    (u48(window.valid_until), u48(window.valid_after), root, proof, root_signature)
        .abi_encode_params()
        .into()
}

/// Wrap a module signature with the module that should verify it:
/// `abi.encode(bytes moduleSignature, address moduleAddress)`.
pub fn wrap_module_signature(module_signature: Bytes, module: Address) -> Bytes {
    (module_signature, module).abi_encode_params().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_update_calldata_layout() {
        let root = B256::repeat_byte(0x42);
        let calldata = root_update_calldata(root);

        // 4-byte selector + one 32-byte word
        assert_eq!(calldata.len(), 36);
        assert_eq!(&calldata[..4], &keccak256(b"setMerkleRoot(bytes32)")[..4]);
        assert_eq!(&calldata[4..], root.as_slice());
    }

    #[test]
    fn session_leaf_layout() {
        let window = ValidityWindow::new(0x0102030405, 0x06);
        let module = Address::repeat_byte(0xAB);
        let key_data = [0xCD, 0xEF];

        let mut expected = vec![0x00, 0x01, 0x02, 0x03, 0x04, 0x05];
        expected.extend_from_slice(&[0, 0, 0, 0, 0, 0x06]);
        expected.extend_from_slice(module.as_slice());
        expected.extend_from_slice(&key_data);

        assert_eq!(session_leaf(window, module, &key_data), keccak256(&expected));
    }

    #[test]
    fn multichain_leaf_layout() {
        let window = ValidityWindow::UNBOUNDED;
        let hash = B256::repeat_byte(0x77);

        let mut expected = vec![0u8; 12];
        expected.extend_from_slice(hash.as_slice());

        assert_eq!(multichain_leaf(window, hash), keccak256(&expected));
    }

    #[test]
    fn batch_message_hash_layout() {
        let op = B256::repeat_byte(0x01);
        let router = Address::repeat_byte(0x02);

        let mut expected = op.to_vec();
        expected.extend_from_slice(router.as_slice());
        assert_eq!(batch_message_hash(op, router), keccak256(&expected));
    }

    #[test]
    fn session_signature_roundtrip() {
        let window = ValidityWindow::new(100, 50);
        let module = Address::repeat_byte(0x11);
        let key_data = Bytes::from(vec![0xAA; 20]);
        let proof = vec![B256::repeat_byte(1), B256::repeat_byte(2)];
        let signature = Bytes::from(vec![0xBB; 65]);

        let blob = encode_session_signature(
            window,
            module,
            key_data.clone(),
            proof.clone(),
            signature.clone(),
        );

        let (until, after, dec_module, dec_data, dec_proof, dec_sig) =
            <(U48, U48, Address, Bytes, Vec<B256>, Bytes)>::abi_decode_params(&blob).unwrap();
        assert_eq!(until, U48::from(100u64));
        assert_eq!(after, U48::from(50u64));
        assert_eq!(dec_module, module);
        assert_eq!(dec_data, key_data);
        assert_eq!(dec_proof, proof);
        assert_eq!(dec_sig, signature);
    }

    #[test]
    fn module_signature_wrapper_roundtrip() {
        let inner = Bytes::from(vec![0x01, 0x02, 0x03]);
        let module = Address::repeat_byte(0x55);

        let wrapped = wrap_module_signature(inner.clone(), module);
        let (dec_inner, dec_module) = <(Bytes, Address)>::abi_decode_params(&wrapped).unwrap();
        assert_eq!(dec_inner, inner);
        assert_eq!(dec_module, module);
    }
}
