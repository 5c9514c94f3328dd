//! Error type shared by the RPC, relayer, and orchestration layers.

use std::fmt;

#[derive(Debug, Clone)]
pub enum VaultError {
    Http(String),
    Rpc(String),
    Json(String),
    Abi(String),
    Relayer(String),
    Reverted,
    Timeout,
    Wallet(String),
    Io(String),
}

impl fmt::Display for VaultError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(msg) => write!(f, "HTTP error: {msg}"),
            Self::Rpc(msg) => write!(f, "RPC error: {msg}"),
            Self::Json(msg) => write!(f, "JSON parse error: {msg}"),
            Self::Abi(msg) => write!(f, "ABI error: {msg}"),
            Self::Relayer(msg) => write!(f, "Relayer error: {msg}"),
            Self::Reverted => write!(f, "Transaction reverted"),
            Self::Timeout => write!(f, "Timed out waiting for confirmation"),
            Self::Wallet(msg) => write!(f, "Wallet error: {msg}"),
            Self::Io(msg) => write!(f, "I/O error: {msg}"),
        }
    }
}

impl std::error::Error for VaultError {}
