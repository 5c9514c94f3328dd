//! Deployment constants and endpoint configuration.

use crate::abi::Address;

pub const TOKEN_DECIMALS: u32 = 6;

pub const TOKEN_ADDRESS: &str = "0xA0022c54aa796070ccF0Cc708e1dcEE62371cd54";
pub const VAULT_ADDRESS: &str = "0x71c360074eE725E17cD9b35f2dbC43C12F8A62ff";

/// Gateway contract the user-decrypt EIP-712 domain is bound to.
pub const DECRYPTION_VERIFIER: &str = "0xc9bAE2154e1B0cda3dc5007b6C34BcB439b2BbD8";

/// Sepolia.
pub const CHAIN_ID: u64 = 11_155_111;

const DEFAULT_RPC_URL: &str = "https://ethereum-sepolia-rpc.publicnode.com";
const DEFAULT_RELAYER_URL: &str = "https://relayer.testnet.zama.cloud";

pub fn rpc_url() -> String {
    std::env::var("HOMORA_RPC_URL").unwrap_or_else(|_| DEFAULT_RPC_URL.to_string())
}

pub fn relayer_url() -> String {
    std::env::var("HOMORA_RELAYER_URL").unwrap_or_else(|_| DEFAULT_RELAYER_URL.to_string())
}

pub fn token_address() -> Address {
    Address::from_hex(TOKEN_ADDRESS).expect("token address constant is valid hex")
}

pub fn vault_address() -> Address {
    Address::from_hex(VAULT_ADDRESS).expect("vault address constant is valid hex")
}

pub fn decryption_verifier() -> Address {
    Address::from_hex(DECRYPTION_VERIFIER).expect("verifier address constant is valid hex")
}
