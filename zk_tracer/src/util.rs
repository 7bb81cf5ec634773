use ethereum_types::{Address, H256, U256};

/// Widens an address to a 256-bit word.
pub(crate) fn address_to_u256(address: Address) -> U256 {
    U256::from_big_endian(address.as_bytes())
}

/// Keeps the 20 low-order bytes of a stack word.
pub(crate) fn u256_to_address(word: U256) -> Address {
    let mut bytes = [0u8; 32];
    word.to_big_endian(&mut bytes);
    Address::from_slice(&bytes[12..])
}

pub(crate) fn h256_to_u256(hash: H256) -> U256 {
    U256::from_big_endian(hash.as_bytes())
}

pub(crate) fn u256_to_h256(word: U256) -> H256 {
    let mut bytes = [0u8; 32];
    word.to_big_endian(&mut bytes);
    H256(bytes)
}

/// Saturating conversion of a stack word to a `usize`.
pub(crate) fn u256_to_usize_saturating(word: U256) -> usize {
    if word > U256::from(usize::MAX) {
        usize::MAX
    } else {
        word.as_usize()
    }
}

/// (De)serializes byte buffers as `0x`-prefixed hexadecimal strings.
pub(crate) mod hex_bytes {
    use bytes::Bytes;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub(crate) fn serialize<S: Serializer>(bytes: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
    }

    pub(crate) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Bytes, D::Error> {
        let s = String::deserialize(deserializer)?;
        let stripped = s.strip_prefix("0x").unwrap_or(&s);
        hex::decode(stripped).map(Bytes::from).map_err(D::Error::custom)
    }
}
