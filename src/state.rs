//! Shared view state for the vault UI.

use crate::abi::Address;

/// Wallet connection state, driven by the header button.
#[derive(Clone, Debug, PartialEq)]
pub enum WalletStatus {
    Disconnected,
    Connecting,
    Connected(Address),
    Error(String),
}

impl WalletStatus {
    pub fn account(&self) -> Option<Address> {
        match self {
            Self::Connected(account) => Some(*account),
            _ => None,
        }
    }
}

/// Everything the UI renders, recomputed by the orchestrator's refresh
/// routine and published as whole values — observers never see a partially
/// updated snapshot.
///
/// `balance` and `stake_amount` are `None` while encrypted (or when
/// decryption is not currently possible); the boolean flags come straight
/// from the chain reads.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ViewState {
    pub balance: Option<u64>,
    pub stake_amount: Option<u64>,
    pub stake_unlock_time: Option<u64>,
    pub stake_active: bool,
    pub withdrawable: bool,
    pub has_claimed: Option<bool>,
    pub is_operator: Option<bool>,

    /// Transient, user-visible status line.
    pub status: Option<String>,

    // In-flight flags, one per operation.
    pub refreshing: bool,
    pub claiming: bool,
    pub approving: bool,
    pub staking: bool,
    pub withdrawing: bool,
}
