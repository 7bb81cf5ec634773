use ethereum_types::{Address, H256};
use keccak_hash::keccak;
use rlp::RlpStream;

/// The hash value of an account empty EVM code.
/// 0xc5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470
pub const EMPTY_CODE_HASH: H256 = H256([
    197, 210, 70, 1, 134, 247, 35, 60, 146, 126, 125, 178, 220, 199, 3, 192, 229, 0, 182, 83, 202,
    130, 39, 59, 123, 250, 216, 4, 93, 133, 164, 112,
]);

/// Highest address of the contiguous precompile range, for the selected
/// chain.
#[cfg(feature = "eth_mainnet")]
const LAST_PRECOMPILE: u64 = 0x0a;
#[cfg(not(feature = "eth_mainnet"))]
// Remove KZG Peval for non-Eth mainnet networks
const LAST_PRECOMPILE: u64 = 0x09;

/// P256Verify, only available on Polygon PoS.
const P256_VERIFY: u64 = 0x100;

#[macro_export]
/// A convenience macro to check the feature flags activating chain specific
/// behaviors. Only one of these flags may be activated at a time.
macro_rules! check_chain_features {
    () => {
        #[cfg(any(
            all(feature = "cdk_erigon", feature = "polygon_pos"),
            all(feature = "cdk_erigon", feature = "eth_mainnet"),
            all(feature = "polygon_pos", feature = "eth_mainnet"),
            not(any(
                feature = "cdk_erigon",
                feature = "eth_mainnet",
                feature = "polygon_pos"
            ))
        ))]
        compile_error!("One and only one of the feature chains `cdk_erigon`, `polygon_pos` or `eth_mainnet` must be selected");
    };
}

check_chain_features!();

/// Addresses of precompiled Ethereum contracts.
pub fn is_precompile(addr: Address) -> bool {
    let Some(low) = low_u64(addr) else {
        return false;
    };

    (1..=LAST_PRECOMPILE).contains(&low) || (cfg!(feature = "polygon_pos") && low == P256_VERIFY)
}

/// Returns the address as an integer if it fits in 64 bits.
fn low_u64(addr: Address) -> Option<u64> {
    addr.as_bytes()[..12]
        .iter()
        .all(|b| *b == 0)
        .then(|| addr.to_low_u64_be())
}

/// Address of a contract created by `sender` at `nonce`, i.e. the last 20
/// bytes of `keccak(rlp([sender, nonce]))`.
pub fn contract_address(sender: Address, nonce: u64) -> Address {
    let mut stream = RlpStream::new_list(2);
    stream.append(&sender);
    stream.append(&nonce);
    Address::from_slice(&keccak(stream.out()).as_bytes()[12..])
}

/// Address of a contract created with `CREATE2` (EIP-1014), i.e. the last 20
/// bytes of `keccak(0xff ++ sender ++ salt ++ keccak(init_code))`.
pub fn create2_address(sender: Address, salt: H256, init_code: &[u8]) -> Address {
    let mut preimage = Vec::with_capacity(85);
    preimage.push(0xff);
    preimage.extend_from_slice(sender.as_bytes());
    preimage.extend_from_slice(salt.as_bytes());
    preimage.extend_from_slice(keccak(init_code).as_bytes());
    Address::from_slice(&keccak(preimage).as_bytes()[12..])
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;

    #[test]
    fn test_empty_code_hash() {
        assert_eq!(EMPTY_CODE_HASH, keccak([]));
    }

    #[test]
    fn precompile_range() {
        assert!(!is_precompile(Address::zero()));
        assert!(is_precompile(Address::from_low_u64_be(1)));
        assert!(is_precompile(Address::from_low_u64_be(9)));
        assert!(!is_precompile(Address::from_low_u64_be(0x0b)));
        assert!(!is_precompile(Address::from(hex!(
            "0100000000000000000000000000000000000001"
        ))));
    }

    #[test]
    fn low_u64_needs_a_zero_prefix() {
        assert_eq!(low_u64(Address::from_low_u64_be(0x0100)), Some(0x0100));
        assert_eq!(low_u64(Address::from_low_u64_be(u64::MAX)), Some(u64::MAX));
        assert_eq!(
            low_u64(Address::from(hex!("0000000000000000000000010000000000000005"))),
            None
        );
    }

    #[test]
    fn creation_address_matches_known_deployment() {
        // First contract deployed by this account on mainnet.
        let sender = Address::from(hex!("6ac7ea33f8831ea9dcc53393aaa88b25a785dbf0"));
        assert_eq!(
            contract_address(sender, 0),
            Address::from(hex!("cd234a471b72ba2f1ccf0a70fcaba648a5eecd8d"))
        );
        assert_eq!(
            contract_address(sender, 1),
            Address::from(hex!("343c43a37d37dff08ae8c4a11544c718abb4fcf8"))
        );
    }

    #[test]
    fn create2_address_eip1014_example() {
        assert_eq!(
            create2_address(Address::zero(), H256::zero(), &[0x00]),
            Address::from(hex!("4d1a2e2bb4f88f0250f26ffff098b0b30b26bf38"))
        );
        assert_eq!(
            create2_address(
                Address::from(hex!("deadbeef00000000000000000000000000000000")),
                H256::zero(),
                &[0x00]
            ),
            Address::from(hex!("b928f69bb1d91cd65274e3c79d8986362984fda3"))
        );
    }
}
