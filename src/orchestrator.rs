//! Vault state orchestration: fetch on-chain state, decrypt what the
//! connected account is entitled to see, and drive the four vault actions.
//!
//! The orchestrator composes three collaborators — a read-only chain client,
//! a transaction signer, and the FHE relayer — behind small traits so the
//! whole workflow is testable against in-memory fakes. View state is
//! published over a `watch` channel as whole values only: a refresh either
//! lands completely or leaves the previous snapshot untouched (plus a status
//! line).

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::Value;
use tokio::sync::watch;

use crate::abi::{self, Address, Arg, Handle, StakeView};
use crate::error::VaultError;
use crate::relayer::{EncryptedInput, GrantKeypair, UserDecryptRequest};
use crate::state::ViewState;
use crate::units;

/// Validity window of a decryption grant. Freshly signed per decrypt; grants
/// are never cached or reused across handle sets.
const GRANT_DURATION_DAYS: u64 = 7;

const MSG_LOAD_FAILED: &str = "Failed to load onchain data. Check your connection and retry.";

/// Read-only contract access.
#[allow(async_fn_in_trait)]
pub trait ChainReader {
    async fn call(&self, to: Address, data: Vec<u8>) -> Result<Vec<u8>, VaultError>;
}

/// Wallet-backed signing and transaction submission.
#[allow(async_fn_in_trait)]
pub trait TxSigner {
    fn is_available(&self) -> bool;
    async fn sign_typed_data(
        &self,
        account: Address,
        typed_data: &Value,
    ) -> Result<String, VaultError>;
    async fn send_transaction(
        &self,
        from: Address,
        to: Address,
        data: Vec<u8>,
    ) -> Result<String, VaultError>;
    async fn wait(&self, tx_hash: &str) -> Result<(), VaultError>;
}

/// The encryption-SDK surface the workflow needs.
#[allow(async_fn_in_trait)]
pub trait FheClient {
    fn is_ready(&self) -> bool;
    fn generate_keypair(&self) -> GrantKeypair;
    fn create_eip712(
        &self,
        public_key: &str,
        contracts: &[Address],
        start_timestamp: u64,
        duration_days: u64,
    ) -> Value;
    async fn user_decrypt(
        &self,
        request: UserDecryptRequest,
    ) -> Result<HashMap<String, u64>, VaultError>;
    async fn encrypt_u64(
        &self,
        contract: Address,
        account: Address,
        value: u64,
    ) -> Result<EncryptedInput, VaultError>;
}

pub struct VaultOrchestrator<C, S, F> {
    chain: C,
    signer: S,
    fhe: F,
    token: Address,
    vault: Address,
    decimals: u32,
    account: Mutex<Option<Address>>,
    state: watch::Sender<ViewState>,
}

impl<C, S, F> VaultOrchestrator<C, S, F>
where
    C: ChainReader,
    S: TxSigner,
    F: FheClient,
{
    pub fn new(chain: C, signer: S, fhe: F, token: Address, vault: Address, decimals: u32) -> Self {
        let (state, _) = watch::channel(ViewState::default());
        Self {
            chain,
            signer,
            fhe,
            token,
            vault,
            decimals,
            account: Mutex::new(None),
            state,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> ViewState {
        self.state.borrow().clone()
    }

    pub fn account(&self) -> Option<Address> {
        *self.account.lock().unwrap()
    }

    /// Connect or disconnect the account. Connecting triggers a refresh;
    /// disconnecting drops every derived field.
    pub async fn set_account(&self, account: Option<Address>) {
        *self.account.lock().unwrap() = account;
        match account {
            Some(_) => self.refresh().await,
            None => {
                self.state.send_replace(ViewState::default());
            }
        }
    }

    /// Clone-modify-replace; every publish is a whole `ViewState`.
    fn publish(&self, apply: impl FnOnce(&mut ViewState)) {
        let mut next = self.state.borrow().clone();
        apply(&mut next);
        self.state.send_replace(next);
    }

    fn set_status(&self, message: &str) {
        self.publish(|vs| vs.status = Some(message.to_string()));
    }

    fn can_decrypt(&self) -> bool {
        self.fhe.is_ready() && self.signer.is_available() && self.account().is_some()
    }

    // -----------------------------------------------------------------------
    // Decrypt-authorization flow
    // -----------------------------------------------------------------------

    /// Decrypt one handle owned by `contract` for the connected account.
    ///
    /// `None` means "still encrypted": either a collaborator is missing or
    /// the relayer returned nothing for the handle. The zero handle is the
    /// contracts' empty sentinel and short-circuits to cleartext zero with no
    /// signature and no relayer round trip. Each call signs a fresh
    /// single-pair grant — the signature covers the exact contract list and
    /// window, so grants are never shared between handles.
    pub async fn decrypt_handle(
        &self,
        handle: Handle,
        contract: Address,
    ) -> Result<Option<u64>, VaultError> {
        if !self.fhe.is_ready() || !self.signer.is_available() {
            return Ok(None);
        }
        let Some(account) = self.account() else {
            return Ok(None);
        };
        if handle.is_zero() {
            return Ok(Some(0));
        }

        let keypair = self.fhe.generate_keypair();
        let contracts = vec![contract];
        let start_timestamp = unix_now();
        let typed_data = self.fhe.create_eip712(
            &keypair.public_key,
            &contracts,
            start_timestamp,
            GRANT_DURATION_DAYS,
        );

        let signature = self.signer.sign_typed_data(account, &typed_data).await?;
        let signature = signature
            .strip_prefix("0x")
            .unwrap_or(&signature)
            .to_string();

        let request = UserDecryptRequest {
            pairs: vec![(handle, contract)],
            public_key: keypair.public_key,
            private_key: keypair.private_key,
            signature,
            contract_addresses: contracts,
            account,
            start_timestamp,
            duration_days: GRANT_DURATION_DAYS,
        };
        let results = self.fhe.user_decrypt(request).await?;
        Ok(results.get(&handle.to_hex()).copied())
    }

    // -----------------------------------------------------------------------
    // State refresh
    // -----------------------------------------------------------------------

    /// Repopulate the view from chain + decryption. All five reads (and both
    /// decrypts) must settle before anything is applied; on failure the
    /// previous snapshot stays, with only a status line added.
    pub async fn refresh(&self) {
        let Some(account) = self.account() else {
            return;
        };

        self.publish(|vs| {
            vs.refreshing = true;
            vs.status = None;
        });

        match self.load_view(account).await {
            Ok(next) => {
                self.state.send_replace(next);
            }
            Err(e) => {
                log::error!("failed to refresh vault state: {e}");
                self.publish(|vs| {
                    vs.status = Some(MSG_LOAD_FAILED.to_string());
                    vs.refreshing = false;
                });
            }
        }
    }

    async fn load_view(&self, account: Address) -> Result<ViewState, VaultError> {
        let (balance_handle, stake, claimed, operator, withdrawable) = tokio::try_join!(
            self.balance_handle(account),
            self.stake_view(account),
            self.read_has_claimed(account),
            self.read_is_operator(account),
            self.read_withdrawable(account),
        )?;

        let mut next = self.snapshot();
        next.stake_unlock_time = Some(stake.unlock_time);
        next.stake_active = stake.active;
        next.has_claimed = Some(claimed);
        next.is_operator = Some(operator);
        next.withdrawable = withdrawable;

        if self.can_decrypt() {
            // A failed decrypt leaves its field encrypted; it neither aborts
            // the sibling decrypt nor the refresh.
            let (balance, stake_amount) = tokio::join!(
                self.decrypt_handle(balance_handle, self.token),
                self.decrypt_handle(stake.handle, self.vault),
            );
            next.balance = match balance {
                Ok(value) => value,
                Err(e) => {
                    log::warn!("balance decryption failed: {e}");
                    None
                }
            };
            next.stake_amount = match stake_amount {
                Ok(value) => value,
                Err(e) => {
                    log::warn!("stake decryption failed: {e}");
                    None
                }
            };
        } else {
            // Not eligible: unknown, not stale.
            next.balance = None;
            next.stake_amount = None;
        }

        next.refreshing = false;
        Ok(next)
    }

    /// Encrypted-balance handle for `account` on the token contract.
    pub async fn balance_handle(&self, account: Address) -> Result<Handle, VaultError> {
        let data = abi::encode_call("confidentialBalanceOf(address)", &[Arg::Address(account)]);
        abi::decode_handle(&self.chain.call(self.token, data).await?)
    }

    /// Current stake tuple for `account` on the vault contract.
    pub async fn stake_view(&self, account: Address) -> Result<StakeView, VaultError> {
        let data = abi::encode_call("getStake(address)", &[Arg::Address(account)]);
        abi::decode_stake(&self.chain.call(self.vault, data).await?)
    }

    async fn read_has_claimed(&self, account: Address) -> Result<bool, VaultError> {
        let data = abi::encode_call("hasClaimed(address)", &[Arg::Address(account)]);
        abi::decode_bool(&self.chain.call(self.token, data).await?)
    }

    async fn read_is_operator(&self, account: Address) -> Result<bool, VaultError> {
        let data = abi::encode_call(
            "isOperator(address,address)",
            &[Arg::Address(account), Arg::Address(self.vault)],
        );
        abi::decode_bool(&self.chain.call(self.token, data).await?)
    }

    async fn read_withdrawable(&self, account: Address) -> Result<bool, VaultError> {
        let data = abi::encode_call("isWithdrawable(address)", &[Arg::Address(account)]);
        abi::decode_bool(&self.chain.call(self.vault, data).await?)
    }

    // -----------------------------------------------------------------------
    // Mutating actions
    // -----------------------------------------------------------------------

    async fn submit(&self, to: Address, data: Vec<u8>) -> Result<(), VaultError> {
        let account = self
            .account()
            .ok_or_else(|| VaultError::Wallet("no connected account".into()))?;
        let tx_hash = self.signer.send_transaction(account, to, data).await?;
        self.signer.wait(&tx_hash).await
    }

    /// Claim the faucet amount. The contract enforces one claim per account;
    /// the local flag check just avoids a pointless transaction.
    pub async fn claim(&self) {
        if !self.signer.is_available() {
            self.set_status("Connect your wallet to claim tokens.");
            return;
        }
        if self.snapshot().has_claimed == Some(true) {
            self.set_status("Tokens already claimed for this account.");
            return;
        }

        self.publish(|vs| {
            vs.claiming = true;
            vs.status = None;
        });

        let data = abi::encode_call("claim()", &[]);
        match self.submit(self.token, data).await {
            Ok(()) => {
                self.set_status("Tokens claimed successfully.");
                self.refresh().await;
            }
            Err(e) => {
                log::error!("claim failed: {e}");
                self.set_status("Claim failed. Check wallet permissions and try again.");
            }
        }
        self.publish(|vs| vs.claiming = false);
    }

    /// Grant the vault operator access until now + `days_input` days.
    pub async fn authorize_operator(&self, days_input: &str) {
        if !self.signer.is_available() {
            self.set_status("Connect your wallet to authorize the vault.");
            return;
        }
        let days: f64 = match days_input.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                self.set_status("Enter a valid number of days for the operator window.");
                return;
            }
        };
        if !days.is_finite() || days <= 0.0 {
            self.set_status("Enter a valid number of days for the operator window.");
            return;
        }

        self.publish(|vs| {
            vs.approving = true;
            vs.status = None;
        });

        let until = unix_now() + (days * 86_400.0).floor() as u64;
        let data = abi::encode_call(
            "setOperator(address,uint48)",
            &[Arg::Address(self.vault), Arg::Uint(u128::from(until))],
        );
        match self.submit(self.token, data).await {
            Ok(()) => {
                self.set_status("Vault authorization updated.");
                self.refresh().await;
            }
            Err(e) => {
                log::error!("operator update failed: {e}");
                self.set_status("Failed to authorize the vault. Try again.");
            }
        }
        self.publish(|vs| vs.approving = false);
    }

    /// Encrypt the amount and place a stake locked for `hours_input` hours.
    pub async fn stake(&self, amount_input: &str, hours_input: &str) {
        if !self.fhe.is_ready() || !self.signer.is_available() || self.account().is_none() {
            self.set_status("Connect your wallet and wait for encryption to initialize.");
            return;
        }
        let view = self.snapshot();
        if view.is_operator != Some(true) {
            self.set_status("Authorize the vault before staking.");
            return;
        }
        if amount_input.trim().is_empty() {
            self.set_status("Enter a stake amount.");
            return;
        }
        let hours: f64 = match hours_input.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                self.set_status("Enter a valid lock duration.");
                return;
            }
        };
        if !hours.is_finite() || hours <= 0.0 {
            self.set_status("Enter a valid lock duration.");
            return;
        }
        let amount = match units::parse_units(amount_input, self.decimals) {
            Some(value) => value,
            None => {
                self.set_status("Enter a valid stake amount.");
                return;
            }
        };
        if amount == 0 {
            self.set_status("Stake amount must be greater than zero.");
            return;
        }
        if view.stake_active {
            self.set_status("A stake is already active. Withdraw it first.");
            return;
        }

        let duration = (hours * 3600.0).floor() as u64;
        self.stake_checked(amount, duration).await;
    }

    /// Stake in base units with the lock duration in seconds. Same guards as
    /// the text-input path, minus the string parsing.
    pub async fn stake_units(&self, amount: u64, duration_secs: u64) {
        if !self.fhe.is_ready() || !self.signer.is_available() || self.account().is_none() {
            self.set_status("Connect your wallet and wait for encryption to initialize.");
            return;
        }
        let view = self.snapshot();
        if view.is_operator != Some(true) {
            self.set_status("Authorize the vault before staking.");
            return;
        }
        if amount == 0 {
            self.set_status("Stake amount must be greater than zero.");
            return;
        }
        if duration_secs == 0 {
            self.set_status("Enter a valid lock duration.");
            return;
        }
        if view.stake_active {
            self.set_status("A stake is already active. Withdraw it first.");
            return;
        }
        self.stake_checked(amount, duration_secs).await;
    }

    async fn stake_checked(&self, amount: u64, duration_secs: u64) {
        self.publish(|vs| {
            vs.staking = true;
            vs.status = None;
        });

        match self.submit_stake(amount, duration_secs).await {
            Ok(()) => {
                self.set_status("Stake placed. Your amount remains encrypted on-chain.");
                self.refresh().await;
            }
            Err(e) => {
                log::error!("stake failed: {e}");
                self.set_status("Stake failed. Ensure you have balance and operator access.");
            }
        }
        self.publish(|vs| vs.staking = false);
    }

    async fn submit_stake(&self, amount: u64, duration: u64) -> Result<(), VaultError> {
        let account = self
            .account()
            .ok_or_else(|| VaultError::Wallet("no connected account".into()))?;
        let encrypted = self.fhe.encrypt_u64(self.token, account, amount).await?;
        let handle = encrypted
            .handles
            .first()
            .ok_or_else(|| VaultError::Relayer("no input handle returned".into()))?;
        let data = abi::encode_call(
            "stake(bytes32,bytes,uint256)",
            &[
                Arg::Word(handle.0),
                Arg::Bytes(&encrypted.input_proof),
                Arg::Uint(u128::from(duration)),
            ],
        );
        self.submit(self.vault, data).await
    }

    /// Withdraw the stake once the lock has expired.
    pub async fn withdraw(&self) {
        if !self.signer.is_available() {
            self.set_status("Connect your wallet to withdraw.");
            return;
        }
        if !self.snapshot().withdrawable {
            self.set_status("Stake is still locked.");
            return;
        }

        self.publish(|vs| {
            vs.withdrawing = true;
            vs.status = None;
        });

        let data = abi::encode_call("withdraw()", &[]);
        match self.submit(self.vault, data).await {
            Ok(()) => {
                self.set_status("Withdrawal confirmed.");
                self.refresh().await;
            }
            Err(e) => {
                log::error!("withdraw failed: {e}");
                self.set_status("Withdraw failed. Confirm the lock time has passed.");
            }
        }
        self.publish(|vs| vs.withdrawing = false);
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
    use std::sync::{Arc, Mutex};

    const CLAIM_AMOUNT: u64 = 1_000_000_000;
    const DECIMALS: u32 = 6;

    fn addr(byte: u8) -> Address {
        Address([byte; 20])
    }

    fn token() -> Address {
        addr(0xaa)
    }

    fn vault() -> Address {
        addr(0xbb)
    }

    fn alice() -> Address {
        addr(0x01)
    }

    /// In-memory stand-in for the deployed contracts. Handles are synthetic
    /// identifiers mapped to cleartexts; the zero handle stands for an empty
    /// balance or stake, as on-chain.
    #[derive(Default)]
    struct World {
        now: u64,
        claimed: bool,
        balance: u64,
        stake: Option<(u64, u64)>, // (amount, unlock_time)
        operator_until: u64,
        handles: HashMap<Handle, u64>,
        inputs: HashMap<Handle, u64>,
        next_id: u64,
        fail_selector: Option<[u8; 4]>,
    }

    impl World {
        fn handle_for(&mut self, value: u64) -> Handle {
            if value == 0 {
                return Handle::ZERO;
            }
            self.next_id += 1;
            let mut bytes = [0u8; 32];
            bytes[0] = 0xc1;
            bytes[24..].copy_from_slice(&self.next_id.to_be_bytes());
            let handle = Handle(bytes);
            self.handles.insert(handle, value);
            handle
        }

        fn input_handle(&mut self, value: u64) -> Handle {
            self.next_id += 1;
            let mut bytes = [0u8; 32];
            bytes[0] = 0xee;
            bytes[24..].copy_from_slice(&self.next_id.to_be_bytes());
            let handle = Handle(bytes);
            self.inputs.insert(handle, value);
            handle
        }
    }

    fn bool_word(value: bool) -> Vec<u8> {
        let mut word = [0u8; 32];
        word[31] = u8::from(value);
        word.to_vec()
    }

    fn uint_word_vec(value: u64) -> Vec<u8> {
        let mut word = [0u8; 32];
        word[24..].copy_from_slice(&value.to_be_bytes());
        word.to_vec()
    }

    struct FakeChain {
        world: Arc<Mutex<World>>,
    }

    impl ChainReader for FakeChain {
        async fn call(&self, _to: Address, data: Vec<u8>) -> Result<Vec<u8>, VaultError> {
            let mut world = self.world.lock().unwrap();
            let sel: [u8; 4] = data[..4].try_into().unwrap();
            if world.fail_selector == Some(sel) {
                return Err(VaultError::Rpc("read failed".into()));
            }

            if sel == abi::selector("confidentialBalanceOf(address)") {
                let balance = world.balance;
                Ok(world.handle_for(balance).0.to_vec())
            } else if sel == abi::selector("getStake(address)") {
                let (amount, unlock) = world.stake.unwrap_or((0, 0));
                let active = world.stake.is_some();
                let mut out = world.handle_for(amount).0.to_vec();
                out.extend_from_slice(&uint_word_vec(unlock));
                out.extend_from_slice(&bool_word(active));
                Ok(out)
            } else if sel == abi::selector("hasClaimed(address)") {
                Ok(bool_word(world.claimed))
            } else if sel == abi::selector("isOperator(address,address)") {
                Ok(bool_word(world.operator_until > world.now))
            } else if sel == abi::selector("isWithdrawable(address)") {
                let withdrawable = world
                    .stake
                    .map(|(_, unlock)| world.now >= unlock)
                    .unwrap_or(false);
                Ok(bool_word(withdrawable))
            } else {
                Err(VaultError::Rpc("unexpected call".into()))
            }
        }
    }

    /// Fake wallet that also executes the contract semantics on submission.
    struct FakeSigner {
        world: Arc<Mutex<World>>,
        available: AtomicBool,
        typed_data_signatures: AtomicU64,
        transactions: Mutex<Vec<[u8; 4]>>,
    }

    impl FakeSigner {
        fn new(world: Arc<Mutex<World>>) -> Self {
            Self {
                world,
                available: AtomicBool::new(true),
                typed_data_signatures: AtomicU64::new(0),
                transactions: Mutex::new(Vec::new()),
            }
        }

        fn tx_count(&self) -> usize {
            self.transactions.lock().unwrap().len()
        }
    }

    impl TxSigner for &FakeSigner {
        fn is_available(&self) -> bool {
            self.available.load(Ordering::SeqCst)
        }

        async fn sign_typed_data(
            &self,
            _account: Address,
            _typed_data: &Value,
        ) -> Result<String, VaultError> {
            self.typed_data_signatures.fetch_add(1, Ordering::SeqCst);
            Ok(format!("0x{}", "ab".repeat(65)))
        }

        async fn send_transaction(
            &self,
            _from: Address,
            _to: Address,
            data: Vec<u8>,
        ) -> Result<String, VaultError> {
            let sel: [u8; 4] = data[..4].try_into().unwrap();
            let mut world = self.world.lock().unwrap();

            if sel == abi::selector("claim()") {
                if world.claimed {
                    return Err(VaultError::Reverted);
                }
                world.claimed = true;
                world.balance += CLAIM_AMOUNT;
            } else if sel == abi::selector("setOperator(address,uint48)") {
                let mut until = [0u8; 8];
                until.copy_from_slice(&data[4 + 32 + 24..4 + 64]);
                world.operator_until = u64::from_be_bytes(until);
            } else if sel == abi::selector("stake(bytes32,bytes,uint256)") {
                let mut handle = [0u8; 32];
                handle.copy_from_slice(&data[4..36]);
                let mut duration = [0u8; 8];
                duration.copy_from_slice(&data[4 + 64 + 24..4 + 96]);
                let duration = u64::from_be_bytes(duration);
                let amount = *self_input(&world, Handle(handle))?;
                if world.operator_until <= world.now
                    || world.stake.is_some()
                    || amount > world.balance
                    || duration == 0
                {
                    return Err(VaultError::Reverted);
                }
                world.balance -= amount;
                let unlock = world.now + duration;
                world.stake = Some((amount, unlock));
            } else if sel == abi::selector("withdraw()") {
                let Some((amount, unlock)) = world.stake else {
                    return Err(VaultError::Reverted);
                };
                if world.now < unlock {
                    return Err(VaultError::Reverted);
                }
                world.balance += amount;
                world.stake = None;
            } else {
                return Err(VaultError::Rpc("unexpected transaction".into()));
            }

            drop(world);
            let mut txs = self.transactions.lock().unwrap();
            txs.push(sel);
            Ok(format!("0xtx{}", txs.len()))
        }

        async fn wait(&self, _tx_hash: &str) -> Result<(), VaultError> {
            Ok(())
        }
    }

    fn self_input(world: &World, handle: Handle) -> Result<&u64, VaultError> {
        world.inputs.get(&handle).ok_or(VaultError::Reverted)
    }

    struct FakeFhe {
        world: Arc<Mutex<World>>,
        ready: AtomicBool,
        fail_decrypt: AtomicBool,
        keypairs: Mutex<Vec<String>>,
        decrypt_calls: AtomicU64,
    }

    impl FakeFhe {
        fn new(world: Arc<Mutex<World>>) -> Self {
            Self {
                world,
                ready: AtomicBool::new(true),
                fail_decrypt: AtomicBool::new(false),
                keypairs: Mutex::new(Vec::new()),
                decrypt_calls: AtomicU64::new(0),
            }
        }
    }

    impl FheClient for &FakeFhe {
        fn is_ready(&self) -> bool {
            self.ready.load(Ordering::SeqCst)
        }

        fn generate_keypair(&self) -> GrantKeypair {
            let mut keypairs = self.keypairs.lock().unwrap();
            let public_key = format!("0xpk{:02}", keypairs.len());
            keypairs.push(public_key.clone());
            GrantKeypair {
                private_key: format!("0xsk{:02}", keypairs.len() - 1),
                public_key,
            }
        }

        fn create_eip712(
            &self,
            public_key: &str,
            contracts: &[Address],
            start_timestamp: u64,
            duration_days: u64,
        ) -> Value {
            serde_json::json!({
                "primaryType": "UserDecryptRequestVerification",
                "message": {
                    "publicKey": public_key,
                    "contractAddresses": contracts.iter().map(|c| c.to_string()).collect::<Vec<_>>(),
                    "startTimestamp": start_timestamp.to_string(),
                    "durationDays": duration_days.to_string(),
                },
            })
        }

        async fn user_decrypt(
            &self,
            request: UserDecryptRequest,
        ) -> Result<HashMap<String, u64>, VaultError> {
            self.decrypt_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_decrypt.load(Ordering::SeqCst) {
                return Err(VaultError::Relayer("gateway unavailable".into()));
            }
            let world = self.world.lock().unwrap();
            let mut out = HashMap::new();
            for (handle, _) in &request.pairs {
                if let Some(value) = world.handles.get(handle) {
                    out.insert(handle.to_hex(), *value);
                }
            }
            Ok(out)
        }

        async fn encrypt_u64(
            &self,
            _contract: Address,
            _account: Address,
            value: u64,
        ) -> Result<EncryptedInput, VaultError> {
            let handle = self.world.lock().unwrap().input_handle(value);
            Ok(EncryptedInput {
                handles: vec![handle],
                input_proof: vec![0xaa; 40],
            })
        }
    }

    struct Fixture {
        world: Arc<Mutex<World>>,
        signer: FakeSigner,
        fhe: FakeFhe,
    }

    impl Fixture {
        fn new() -> Self {
            let world = Arc::new(Mutex::new(World {
                now: 1_000,
                ..World::default()
            }));
            Self {
                signer: FakeSigner::new(world.clone()),
                fhe: FakeFhe::new(world.clone()),
                world,
            }
        }

        fn orchestrator(
            &self,
        ) -> VaultOrchestrator<FakeChain, &'_ FakeSigner, &'_ FakeFhe> {
            VaultOrchestrator::new(
                FakeChain {
                    world: self.world.clone(),
                },
                &self.signer,
                &self.fhe,
                token(),
                vault(),
                DECIMALS,
            )
        }
    }

    #[tokio::test]
    async fn test_zero_handle_decrypts_without_signing() {
        let fx = Fixture::new();
        let orch = fx.orchestrator();
        orch.set_account(Some(alice())).await;

        let view = orch.snapshot();
        // empty balance and no stake: both handles are the zero sentinel
        assert_eq!(view.balance, Some(0));
        assert_eq!(view.stake_amount, Some(0));
        assert_eq!(fx.signer.typed_data_signatures.load(Ordering::SeqCst), 0);
        assert_eq!(fx.fhe.decrypt_calls.load(Ordering::SeqCst), 0);
        assert!(fx.fhe.keypairs.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_each_handle_gets_its_own_grant() {
        let fx = Fixture::new();
        {
            let mut world = fx.world.lock().unwrap();
            world.balance = 5_000_000;
            world.stake = Some((7_000_000, 10_000));
        }
        let orch = fx.orchestrator();
        orch.set_account(Some(alice())).await;

        let view = orch.snapshot();
        assert_eq!(view.balance, Some(5_000_000));
        assert_eq!(view.stake_amount, Some(7_000_000));
        assert!(view.stake_active);
        assert_eq!(view.stake_unlock_time, Some(10_000));

        // one keypair and one signature per handle, never shared
        assert_eq!(fx.signer.typed_data_signatures.load(Ordering::SeqCst), 2);
        assert_eq!(fx.fhe.decrypt_calls.load(Ordering::SeqCst), 2);
        let keypairs = fx.fhe.keypairs.lock().unwrap();
        assert_eq!(keypairs.len(), 2);
        assert_ne!(keypairs[0], keypairs[1]);
    }

    #[tokio::test]
    async fn test_refresh_is_all_or_nothing() {
        let fx = Fixture::new();
        fx.world.lock().unwrap().balance = 5_000_000;
        let orch = fx.orchestrator();
        orch.set_account(Some(alice())).await;
        let before = orch.snapshot();
        assert_eq!(before.balance, Some(5_000_000));
        assert!(before.status.is_none());

        {
            let mut world = fx.world.lock().unwrap();
            world.fail_selector = Some(abi::selector("isWithdrawable(address)"));
            // these changes must not leak into the view
            world.claimed = true;
            world.balance = 9_999_999;
        }
        orch.refresh().await;

        let after = orch.snapshot();
        assert_eq!(
            after.status.as_deref(),
            Some("Failed to load onchain data. Check your connection and retry.")
        );
        assert!(!after.refreshing);
        let mut scrubbed = after.clone();
        scrubbed.status = None;
        assert_eq!(scrubbed, before);
    }

    #[tokio::test]
    async fn test_decrypt_failure_does_not_abort_refresh() {
        let fx = Fixture::new();
        {
            let mut world = fx.world.lock().unwrap();
            world.balance = 5_000_000;
            world.claimed = true;
        }
        fx.fhe.fail_decrypt.store(true, Ordering::SeqCst);
        let orch = fx.orchestrator();
        orch.set_account(Some(alice())).await;

        let view = orch.snapshot();
        // reads land, amounts stay encrypted, no failure status
        assert_eq!(view.balance, None);
        assert_eq!(view.has_claimed, Some(true));
        assert!(view.status.is_none());
        assert!(!view.refreshing);
    }

    #[tokio::test]
    async fn test_ineligible_decryption_clears_amounts() {
        let fx = Fixture::new();
        {
            let mut world = fx.world.lock().unwrap();
            world.balance = 5_000_000;
            world.claimed = true;
        }
        fx.fhe.ready.store(false, Ordering::SeqCst);
        let orch = fx.orchestrator();
        orch.set_account(Some(alice())).await;

        let view = orch.snapshot();
        assert_eq!(view.balance, None);
        assert_eq!(view.stake_amount, None);
        // plaintext reads still land
        assert_eq!(view.has_claimed, Some(true));
        assert_eq!(fx.signer.typed_data_signatures.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_claim_is_a_noop_when_already_claimed() {
        let fx = Fixture::new();
        fx.world.lock().unwrap().claimed = true;
        let orch = fx.orchestrator();
        orch.set_account(Some(alice())).await;
        assert_eq!(orch.snapshot().has_claimed, Some(true));

        orch.claim().await;

        assert_eq!(fx.signer.tx_count(), 0);
        assert_eq!(orch.snapshot().has_claimed, Some(true));
    }

    #[tokio::test]
    async fn test_claim_updates_balance() {
        let fx = Fixture::new();
        let orch = fx.orchestrator();
        orch.set_account(Some(alice())).await;

        orch.claim().await;

        assert_eq!(fx.signer.tx_count(), 1);
        let view = orch.snapshot();
        assert_eq!(view.has_claimed, Some(true));
        assert_eq!(view.balance, Some(CLAIM_AMOUNT));
        assert!(!view.claiming);
    }

    #[tokio::test]
    async fn test_withdraw_is_a_noop_while_locked() {
        let fx = Fixture::new();
        fx.world.lock().unwrap().stake = Some((5_000_000, 999_999));
        let orch = fx.orchestrator();
        orch.set_account(Some(alice())).await;
        assert!(!orch.snapshot().withdrawable);

        orch.withdraw().await;

        assert_eq!(fx.signer.tx_count(), 0);
        assert_eq!(orch.snapshot().status.as_deref(), Some("Stake is still locked."));
    }

    #[tokio::test]
    async fn test_stake_input_validation() {
        let fx = Fixture::new();
        {
            let mut world = fx.world.lock().unwrap();
            world.claimed = true;
            world.balance = CLAIM_AMOUNT;
            world.operator_until = 100_000;
        }
        let orch = fx.orchestrator();
        orch.set_account(Some(alice())).await;

        orch.stake("0", "24").await;
        assert_eq!(fx.signer.tx_count(), 0);
        assert_eq!(
            orch.snapshot().status.as_deref(),
            Some("Stake amount must be greater than zero.")
        );

        orch.stake("-1", "24").await;
        assert_eq!(fx.signer.tx_count(), 0);
        assert_eq!(
            orch.snapshot().status.as_deref(),
            Some("Enter a valid stake amount.")
        );

        orch.stake("100", "0").await;
        assert_eq!(fx.signer.tx_count(), 0);
        assert_eq!(
            orch.snapshot().status.as_deref(),
            Some("Enter a valid lock duration.")
        );

        orch.stake("250.5", "24").await;
        assert_eq!(fx.signer.tx_count(), 1);
        // 250.5 tokens at 6 decimals
        let world = fx.world.lock().unwrap();
        assert_eq!(world.stake.unwrap().0, 250_500_000);
        assert!(world.inputs.values().any(|v| *v == 250_500_000));
    }

    #[tokio::test]
    async fn test_stake_units_path() {
        let fx = Fixture::new();
        {
            let mut world = fx.world.lock().unwrap();
            world.claimed = true;
            world.balance = CLAIM_AMOUNT;
            world.operator_until = 100_000;
        }
        let orch = fx.orchestrator();
        orch.set_account(Some(alice())).await;

        orch.stake_units(0, 3600).await;
        assert_eq!(fx.signer.tx_count(), 0);
        assert_eq!(
            orch.snapshot().status.as_deref(),
            Some("Stake amount must be greater than zero.")
        );

        orch.stake_units(250_500_000, 3600).await;
        assert_eq!(fx.signer.tx_count(), 1);
        assert_eq!(fx.world.lock().unwrap().stake.unwrap(), (250_500_000, 1_000 + 3_600));
    }

    #[tokio::test]
    async fn test_stake_requires_operator() {
        let fx = Fixture::new();
        {
            let mut world = fx.world.lock().unwrap();
            world.claimed = true;
            world.balance = CLAIM_AMOUNT;
        }
        let orch = fx.orchestrator();
        orch.set_account(Some(alice())).await;

        orch.stake("100", "24").await;

        assert_eq!(fx.signer.tx_count(), 0);
        assert_eq!(
            orch.snapshot().status.as_deref(),
            Some("Authorize the vault before staking.")
        );
    }

    #[tokio::test]
    async fn test_disconnect_clears_view() {
        let fx = Fixture::new();
        fx.world.lock().unwrap().balance = 5_000_000;
        let orch = fx.orchestrator();
        orch.set_account(Some(alice())).await;
        assert_eq!(orch.snapshot().balance, Some(5_000_000));

        orch.set_account(None).await;
        assert_eq!(orch.snapshot(), ViewState::default());
    }

    #[tokio::test]
    async fn test_full_stake_lifecycle() {
        let fx = Fixture::new();
        let orch = fx.orchestrator();
        orch.set_account(Some(alice())).await;

        orch.claim().await;
        assert_eq!(orch.snapshot().balance, Some(CLAIM_AMOUNT));

        orch.authorize_operator("365").await;
        assert_eq!(orch.snapshot().is_operator, Some(true));

        orch.stake("400", "1").await;
        let view = orch.snapshot();
        assert!(view.stake_active);
        assert_eq!(view.stake_amount, Some(400_000_000));
        assert_eq!(view.balance, Some(CLAIM_AMOUNT - 400_000_000));
        assert_eq!(view.stake_unlock_time, Some(1_000 + 3_600));
        assert!(!view.withdrawable);

        // lock still running: the withdraw gate holds and nothing is sent
        let txs_before = fx.signer.tx_count();
        orch.withdraw().await;
        assert_eq!(fx.signer.tx_count(), txs_before);
        assert!(orch.snapshot().stake_active);

        // past the unlock time the stake comes back in full
        fx.world.lock().unwrap().now = 1_000 + 3_601;
        orch.refresh().await;
        assert!(orch.snapshot().withdrawable);

        orch.withdraw().await;
        let view = orch.snapshot();
        assert!(!view.stake_active);
        assert_eq!(view.stake_amount, Some(0));
        assert_eq!(view.balance, Some(CLAIM_AMOUNT));
        assert!(!view.withdrawing);
    }

    #[tokio::test]
    async fn test_watch_publishes_whole_snapshots() {
        let fx = Fixture::new();
        let orch = fx.orchestrator();
        let mut rx = orch.subscribe();

        orch.set_account(Some(alice())).await;
        assert!(rx.has_changed().unwrap());
        let view = rx.borrow_and_update().clone();
        assert_eq!(view, orch.snapshot());
        assert!(!view.refreshing);
    }
}
