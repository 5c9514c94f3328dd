//! Contract call encoding — hand-built ABI layout for the handful of
//! functions the token and vault expose.
//!
//! Mirrors the on-chain ABI exactly: 4-byte keccak selector, 32-byte head
//! words for static arguments, offset/length/padded-data tail for dynamic
//! `bytes`.

use std::fmt;

use sha3::{Digest, Keccak256};

use crate::error::VaultError;

const WORD: usize = 32;

// ---------------------------------------------------------------------------
// Address / Handle newtypes
// ---------------------------------------------------------------------------

/// A 20-byte account or contract address.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Address(pub [u8; 20]);

impl Address {
    pub fn from_hex(input: &str) -> Result<Self, VaultError> {
        let stripped = input.strip_prefix("0x").unwrap_or(input);
        let bytes = hex::decode(stripped).map_err(|e| VaultError::Abi(e.to_string()))?;
        let arr: [u8; 20] = bytes
            .try_into()
            .map_err(|_| VaultError::Abi("address must be 20 bytes".into()))?;
        Ok(Self(arr))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// An opaque 32-byte reference to a ciphertext held on-chain.
///
/// The all-zero handle is the contracts' "no value" sentinel and decodes to
/// cleartext zero without a gateway round trip.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Handle(pub [u8; 32]);

impl Handle {
    pub const ZERO: Handle = Handle([0u8; 32]);

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    pub fn from_hex(input: &str) -> Result<Self, VaultError> {
        let stripped = input.strip_prefix("0x").unwrap_or(input);
        let bytes = hex::decode(stripped).map_err(|e| VaultError::Abi(e.to_string()))?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| VaultError::Abi("handle must be 32 bytes".into()))?;
        Ok(Self(arr))
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

// ---------------------------------------------------------------------------
// Calldata encoding
// ---------------------------------------------------------------------------

/// One encoded argument. Static kinds occupy a single head word; `Bytes` is
/// dynamic and spills into the tail.
pub enum Arg<'a> {
    Address(Address),
    Uint(u128),
    Word([u8; 32]),
    Bytes(&'a [u8]),
}

/// First four bytes of `keccak256(signature)`.
pub fn selector(signature: &str) -> [u8; 4] {
    let digest = Keccak256::digest(signature.as_bytes());
    let mut out = [0u8; 4];
    out.copy_from_slice(&digest[..4]);
    out
}

/// Build complete calldata: selector followed by the ABI-encoded arguments.
pub fn encode_call(signature: &str, args: &[Arg<'_>]) -> Vec<u8> {
    let head_len = WORD * args.len();
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for arg in args {
        match arg {
            Arg::Address(addr) => {
                let mut word = [0u8; WORD];
                word[12..].copy_from_slice(&addr.0);
                head.extend_from_slice(&word);
            }
            Arg::Uint(value) => head.extend_from_slice(&uint_word(*value)),
            Arg::Word(word) => head.extend_from_slice(word),
            Arg::Bytes(bytes) => {
                // Head holds the offset of the tail entry, measured from the
                // start of the argument block.
                head.extend_from_slice(&uint_word((head_len + tail.len()) as u128));
                tail.extend_from_slice(&uint_word(bytes.len() as u128));
                tail.extend_from_slice(bytes);
                let pad = (WORD - bytes.len() % WORD) % WORD;
                tail.extend_from_slice(&vec![0u8; pad]);
            }
        }
    }

    let mut out = selector(signature).to_vec();
    out.extend_from_slice(&head);
    out.extend_from_slice(&tail);
    out
}

fn uint_word(value: u128) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[16..].copy_from_slice(&value.to_be_bytes());
    word
}

// ---------------------------------------------------------------------------
// Return-data decoding
// ---------------------------------------------------------------------------

/// The `getStake(address)` return tuple.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StakeView {
    pub handle: Handle,
    pub unlock_time: u64,
    pub active: bool,
}

fn word_at(data: &[u8], index: usize) -> Result<[u8; WORD], VaultError> {
    let start = index * WORD;
    let slice = data
        .get(start..start + WORD)
        .ok_or_else(|| VaultError::Abi(format!("return data too short for word {index}")))?;
    let mut word = [0u8; WORD];
    word.copy_from_slice(slice);
    Ok(word)
}

fn word_to_u64(word: &[u8; WORD]) -> Result<u64, VaultError> {
    if word[..24].iter().any(|b| *b != 0) {
        return Err(VaultError::Abi("uint value exceeds 64 bits".into()));
    }
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&word[24..]);
    Ok(u64::from_be_bytes(buf))
}

pub fn decode_bool(data: &[u8]) -> Result<bool, VaultError> {
    let word = word_at(data, 0)?;
    Ok(word[WORD - 1] != 0)
}

pub fn decode_handle(data: &[u8]) -> Result<Handle, VaultError> {
    Ok(Handle(word_at(data, 0)?))
}

pub fn decode_stake(data: &[u8]) -> Result<StakeView, VaultError> {
    let handle = Handle(word_at(data, 0)?);
    let unlock_time = word_to_u64(&word_at(data, 1)?)?;
    let active = word_at(data, 2)?[WORD - 1] != 0;
    Ok(StakeView {
        handle,
        unlock_time,
        active,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_selector() {
        // claim() has a well-known selector
        assert_eq!(selector("claim()"), [0x4e, 0x71, 0xd9, 0x2d]);
    }

    #[test]
    fn test_encode_static_args() {
        let addr = Address::from_hex("0x71c360074eE725E17cD9b35f2dbC43C12F8A62ff").unwrap();
        let data = encode_call(
            "setOperator(address,uint48)",
            &[Arg::Address(addr), Arg::Uint(1_700_000_000)],
        );
        assert_eq!(data.len(), 4 + 64);
        assert_eq!(&data[..4], &selector("setOperator(address,uint48)"));
        // address right-aligned in the first word
        assert_eq!(&data[4..16], &[0u8; 12]);
        assert_eq!(&data[16..36], &addr.0);
        // uint right-aligned in the second word
        let mut until = [0u8; 32];
        until[16..].copy_from_slice(&1_700_000_000u128.to_be_bytes());
        assert_eq!(&data[36..68], &until);
    }

    #[test]
    fn test_encode_dynamic_bytes() {
        let handle = Handle([0x11; 32]);
        let proof = [0xaa_u8; 40];
        let data = encode_call(
            "stake(bytes32,bytes,uint256)",
            &[Arg::Word(handle.0), Arg::Bytes(&proof), Arg::Uint(3600)],
        );
        let args = &data[4..];
        // head: handle word, offset word, duration word
        assert_eq!(&args[..32], &handle.0);
        let mut offset = [0u8; 32];
        offset[31] = 0x60;
        assert_eq!(&args[32..64], &offset);
        // tail: length word then data padded to a word boundary
        let mut len_word = [0u8; 32];
        len_word[31] = 40;
        assert_eq!(&args[96..128], &len_word);
        assert_eq!(&args[128..168], &proof);
        assert_eq!(&args[168..192], &[0u8; 24]);
        assert_eq!(args.len(), 96 + 32 + 64);
    }

    #[test]
    fn test_decode_stake() {
        let mut data = Vec::new();
        data.extend_from_slice(&[0x22; 32]);
        let mut unlock = [0u8; 32];
        unlock[24..].copy_from_slice(&1_756_000_000u64.to_be_bytes());
        data.extend_from_slice(&unlock);
        let mut active = [0u8; 32];
        active[31] = 1;
        data.extend_from_slice(&active);

        let stake = decode_stake(&data).unwrap();
        assert_eq!(stake.handle, Handle([0x22; 32]));
        assert_eq!(stake.unlock_time, 1_756_000_000);
        assert!(stake.active);
    }

    #[test]
    fn test_decode_bool_and_short_data() {
        let mut word = [0u8; 32];
        assert!(!decode_bool(&word).unwrap());
        word[31] = 1;
        assert!(decode_bool(&word).unwrap());
        assert!(decode_bool(&word[..16]).is_err());
    }

    #[test]
    fn test_zero_handle() {
        assert!(Handle::ZERO.is_zero());
        let handle = Handle::from_hex(&format!("0x{}", "00".repeat(32))).unwrap();
        assert!(handle.is_zero());
        assert!(!Handle([0x01; 32]).is_zero());
    }

    #[test]
    fn test_address_roundtrip() {
        let addr = Address::from_hex("0xA0022c54aa796070ccF0Cc708e1dcEE62371cd54").unwrap();
        assert_eq!(
            addr.to_string(),
            "0xa0022c54aa796070ccf0cc708e1dcee62371cd54"
        );
        assert!(Address::from_hex("0x1234").is_err());
    }
}
