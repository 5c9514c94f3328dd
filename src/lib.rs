pub mod abi;
pub mod components;
pub mod config;
pub mod error;
pub mod eth;
pub mod orchestrator;
pub mod relayer;
pub mod state;
pub mod units;

use std::sync::Arc;

use eth::{EthRpcClient, RpcChain, RpcSigner, SharedEthClient};
use orchestrator::VaultOrchestrator;
use relayer::{RelayerClient, RelayerFhe};

pub type AppOrchestrator = VaultOrchestrator<RpcChain, RpcSigner, RelayerFhe>;
pub type SharedOrchestrator = Arc<AppOrchestrator>;

/// Wire the production clients together: JSON-RPC for reads and signing,
/// the Zama relayer for encryption and disclosure.
pub fn build_orchestrator(eth: SharedEthClient) -> AppOrchestrator {
    let relayer = Arc::new(RelayerClient::new(
        &config::relayer_url(),
        config::CHAIN_ID,
        config::decryption_verifier(),
    ));
    VaultOrchestrator::new(
        RpcChain::new(eth.clone()),
        RpcSigner::new(eth),
        RelayerFhe::new(relayer),
        config::token_address(),
        config::vault_address(),
        config::TOKEN_DECIMALS,
    )
}

pub fn build_eth_client() -> SharedEthClient {
    Arc::new(EthRpcClient::new(&config::rpc_url()))
}
