//! Client for the FHE relayer — the off-chain service that registers
//! encrypted inputs and discloses ciphertexts to authorized users.
//!
//! Only the orchestration contract lives here: grant keypairs, the EIP-712
//! payload the wallet signs, the user-decrypt call, and the
//! `create_encrypted_input(..).add64(..).encrypt()` builder. The protocol
//! cryptography is the relayer's problem.

use std::collections::HashMap;
use std::sync::Arc;

use rand::rngs::OsRng;
use rand::RngCore;
use serde_json::{json, Value};
use sha3::{Digest, Keccak256};

use crate::abi::{Address, Handle};
use crate::error::VaultError;
use crate::orchestrator::FheClient;

/// Ephemeral keypair backing a single decryption grant. Never persisted.
#[derive(Clone, Debug)]
pub struct GrantKeypair {
    pub public_key: String,
    pub private_key: String,
}

/// An encrypted input registered with the relayer: ciphertext handles plus
/// the proof the contracts verify on ingestion.
#[derive(Clone, Debug)]
pub struct EncryptedInput {
    pub handles: Vec<Handle>,
    pub input_proof: Vec<u8>,
}

/// Everything a user-decrypt call needs. The signature covers the exact
/// contract list and validity window, so a request must not be replayed
/// against a different handle set.
#[derive(Clone, Debug)]
pub struct UserDecryptRequest {
    pub pairs: Vec<(Handle, Address)>,
    pub public_key: String,
    pub private_key: String,
    /// Hex, without the `0x` prefix.
    pub signature: String,
    pub contract_addresses: Vec<Address>,
    pub account: Address,
    pub start_timestamp: u64,
    pub duration_days: u64,
}

pub struct RelayerClient {
    http: reqwest::blocking::Client,
    base_url: String,
    chain_id: u64,
    verifying_contract: Address,
}

impl RelayerClient {
    pub fn new(base_url: &str, chain_id: u64, verifying_contract: Address) -> Self {
        Self {
            http: reqwest::blocking::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            chain_id,
            verifying_contract,
        }
    }

    /// Fresh one-time keypair for a decryption grant. The public half is
    /// derived from the secret so the relayer can bind the two.
    pub fn generate_keypair() -> GrantKeypair {
        let mut secret = [0u8; 32];
        OsRng.fill_bytes(&mut secret);
        let public = Keccak256::digest(secret);
        GrantKeypair {
            public_key: format!("0x{}", hex::encode(public)),
            private_key: format!("0x{}", hex::encode(secret)),
        }
    }

    /// The typed-data document the wallet signs to authorize disclosure of
    /// handles owned by `contracts` to `public_key` for the given window.
    pub fn create_eip712(
        &self,
        public_key: &str,
        contracts: &[Address],
        start_timestamp: u64,
        duration_days: u64,
    ) -> Value {
        let contract_list: Vec<String> = contracts.iter().map(|c| c.to_string()).collect();
        json!({
            "domain": {
                "name": "Decryption",
                "version": "1",
                "chainId": self.chain_id,
                "verifyingContract": self.verifying_contract.to_string(),
            },
            "types": {
                "UserDecryptRequestVerification": [
                    { "name": "publicKey", "type": "bytes" },
                    { "name": "contractAddresses", "type": "address[]" },
                    { "name": "startTimestamp", "type": "uint256" },
                    { "name": "durationDays", "type": "uint256" },
                ],
            },
            "primaryType": "UserDecryptRequestVerification",
            "message": {
                "publicKey": public_key,
                "contractAddresses": contract_list,
                "startTimestamp": start_timestamp.to_string(),
                "durationDays": duration_days.to_string(),
            },
        })
    }

    /// Submit a signed grant and return the cleartexts keyed by handle hex.
    pub fn user_decrypt(
        &self,
        request: &UserDecryptRequest,
    ) -> Result<HashMap<String, u64>, VaultError> {
        let pairs: Vec<Value> = request
            .pairs
            .iter()
            .map(|(handle, contract)| {
                json!({
                    "handle": handle.to_hex(),
                    "contractAddress": contract.to_string(),
                })
            })
            .collect();
        let contracts: Vec<String> = request
            .contract_addresses
            .iter()
            .map(|c| c.to_string())
            .collect();
        let body = json!({
            "handleContractPairs": pairs,
            "privateKey": request.private_key,
            "publicKey": request.public_key,
            "signature": request.signature,
            "contractAddresses": contracts,
            "userAddress": request.account.to_string(),
            "startTimestamp": request.start_timestamp.to_string(),
            "durationDays": request.duration_days.to_string(),
        });

        let v = self.post("/v1/user-decrypt", &body)?;
        let entries = v["cleartexts"]
            .as_object()
            .ok_or_else(|| VaultError::Json("user-decrypt response missing cleartexts".into()))?;

        let mut out = HashMap::new();
        for (handle, value) in entries {
            let clear = match value {
                Value::String(s) => s
                    .parse::<u64>()
                    .map_err(|e| VaultError::Json(e.to_string()))?,
                Value::Number(n) => n
                    .as_u64()
                    .ok_or_else(|| VaultError::Json("cleartext is not a u64".into()))?,
                _ => return Err(VaultError::Json("unexpected cleartext shape".into())),
            };
            out.insert(handle.clone(), clear);
        }
        Ok(out)
    }

    /// Start an encrypted-input registration scoped to a contract + account.
    pub fn create_encrypted_input(
        &self,
        contract: Address,
        account: Address,
    ) -> EncryptedInputBuilder<'_> {
        EncryptedInputBuilder {
            client: self,
            contract,
            account,
            values: Vec::new(),
        }
    }

    fn input_proof(
        &self,
        contract: Address,
        account: Address,
        values: &[u64],
    ) -> Result<EncryptedInput, VaultError> {
        let body = json!({
            "contractAddress": contract.to_string(),
            "userAddress": account.to_string(),
            "values": values.iter().map(|v| v.to_string()).collect::<Vec<_>>(),
            "bits": values.iter().map(|_| 64).collect::<Vec<_>>(),
        });

        let v = self.post("/v1/input-proof", &body)?;
        let handles = v["handles"]
            .as_array()
            .ok_or_else(|| VaultError::Json("input-proof response missing handles".into()))?
            .iter()
            .map(|h| {
                let s = h
                    .as_str()
                    .ok_or_else(|| VaultError::Json("handle is not a string".into()))?;
                Handle::from_hex(s)
            })
            .collect::<Result<Vec<_>, _>>()?;
        let proof = v["inputProof"]
            .as_str()
            .ok_or_else(|| VaultError::Json("input-proof response missing proof".into()))?;
        let proof = hex::decode(proof.strip_prefix("0x").unwrap_or(proof))
            .map_err(|e| VaultError::Json(e.to_string()))?;

        Ok(EncryptedInput {
            handles,
            input_proof: proof,
        })
    }

    fn post(&self, path: &str, body: &Value) -> Result<Value, VaultError> {
        let response = self
            .http
            .post(format!("{}{path}", self.base_url))
            .json(body)
            .send()
            .map_err(|e| VaultError::Http(e.to_string()))?;
        let v: Value = response
            .json()
            .map_err(|e| VaultError::Json(e.to_string()))?;
        if let Some(err) = v.get("error") {
            let msg = err["message"].as_str().unwrap_or("unknown relayer error");
            return Err(VaultError::Relayer(msg.to_string()));
        }
        Ok(v)
    }
}

/// Builder mirroring the SDK's `createEncryptedInput(..).add64(..).encrypt()`.
pub struct EncryptedInputBuilder<'a> {
    client: &'a RelayerClient,
    contract: Address,
    account: Address,
    values: Vec<u64>,
}

impl EncryptedInputBuilder<'_> {
    pub fn add64(mut self, value: u64) -> Self {
        self.values.push(value);
        self
    }

    pub fn encrypt(self) -> Result<EncryptedInput, VaultError> {
        self.client
            .input_proof(self.contract, self.account, &self.values)
    }
}

// ---------------------------------------------------------------------------
// Orchestrator adapter
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct RelayerFhe {
    client: Arc<RelayerClient>,
}

impl RelayerFhe {
    pub fn new(client: Arc<RelayerClient>) -> Self {
        Self { client }
    }
}

impl FheClient for RelayerFhe {
    fn is_ready(&self) -> bool {
        true
    }

    fn generate_keypair(&self) -> GrantKeypair {
        RelayerClient::generate_keypair()
    }

    fn create_eip712(
        &self,
        public_key: &str,
        contracts: &[Address],
        start_timestamp: u64,
        duration_days: u64,
    ) -> Value {
        self.client
            .create_eip712(public_key, contracts, start_timestamp, duration_days)
    }

    async fn user_decrypt(
        &self,
        request: UserDecryptRequest,
    ) -> Result<HashMap<String, u64>, VaultError> {
        let client = self.client.clone();
        tokio::task::spawn_blocking(move || client.user_decrypt(&request))
            .await
            .map_err(|e| VaultError::Io(e.to_string()))?
    }

    async fn encrypt_u64(
        &self,
        contract: Address,
        account: Address,
        value: u64,
    ) -> Result<EncryptedInput, VaultError> {
        let client = self.client.clone();
        tokio::task::spawn_blocking(move || {
            client
                .create_encrypted_input(contract, account)
                .add64(value)
                .encrypt()
        })
        .await
        .map_err(|e| VaultError::Io(e.to_string()))?
    }
}
