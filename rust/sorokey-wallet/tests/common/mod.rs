//! In-memory collaborators for wallet scenarios.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use sorokey_credentials::webauthn::SoftwareAuthenticator;
use sorokey_wallet::{
    CoSigner, Keypair, SendResult, SendStatus, SimulationResult, SmartWallet, SorobanRpc,
    TransactionInfo, TransactionStatus, WalletConfig, WalletError, authorization_payload,
};
use sorokey_xdr::{
    LedgerFootprint, ScVal, SorobanAuthorizationEntry, SorobanResources, SorobanTransactionData,
    Transaction, TransactionEnvelope, network_id,
};

pub const TX_HASH: &str = "5d3c5f1e0a4b6c7d8e9f00112233445566778899aabbccddeeff001122334455";

pub type TestWallet = SmartWallet<FakeRpc, FakeCoSigner, SoftwareAuthenticator>;

/// The fee account whose key the co-signer holds.
pub fn fee_account() -> Keypair {
    Keypair::from_seed(&[7; 32])
}

pub fn config() -> WalletConfig {
    WalletConfig::new(fee_account().address())
        .with_relying_party("wallet.example.com", "Stellar Demo Wallet")
        .with_poll(3, Duration::ZERO)
}

pub fn wallet(rpc: FakeRpc, authenticator: SoftwareAuthenticator) -> TestWallet {
    SmartWallet::new(config(), rpc, FakeCoSigner::default(), authenticator)
        .expect("test configuration is valid")
}

/// A successful simulation with the given resource fee and footprint.
pub fn simulation(
    resource_fee: i64,
    auth: Vec<SorobanAuthorizationEntry>,
    footprint: LedgerFootprint,
) -> SimulationResult {
    SimulationResult {
        auth,
        min_resource_fee: resource_fee.to_string(),
        transaction_data: Some(SorobanTransactionData {
            archived_entries: None,
            resources: SorobanResources {
                footprint,
                instructions: resource_fee as u32 * 10,
                disk_read_bytes: 0,
                write_bytes: 0,
            },
            resource_fee,
        }),
        latest_ledger: 1000,
        return_value: None,
        error: None,
    }
}

pub fn transaction_info(status: TransactionStatus, return_value: Option<ScVal>) -> TransactionInfo {
    TransactionInfo {
        hash: TX_HASH.into(),
        status,
        ledger: (status == TransactionStatus::Success).then_some(1001),
        return_value,
        result_xdr: None,
    }
}

/// A Soroban RPC server that replays queued responses and records requests.
pub struct FakeRpc {
    latest_ledger: u32,
    sequence: i64,
    simulations: Mutex<VecDeque<SimulationResult>>,
    send_status: SendStatus,
    error_result_xdr: Option<String>,
    statuses: Mutex<VecDeque<TransactionInfo>>,
    pub simulated: Mutex<Vec<Transaction>>,
    pub sent: Mutex<Vec<TransactionEnvelope>>,
    pub lookups: Mutex<u32>,
}

impl Default for FakeRpc {
    fn default() -> Self {
        Self {
            latest_ledger: 1000,
            sequence: 41,
            simulations: Mutex::new(VecDeque::new()),
            send_status: SendStatus::Pending,
            error_result_xdr: None,
            statuses: Mutex::new(VecDeque::new()),
            simulated: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
            lookups: Mutex::new(0),
        }
    }
}

impl FakeRpc {
    pub fn with_latest_ledger(mut self, ledger: u32) -> Self {
        self.latest_ledger = ledger;
        self
    }

    pub fn with_simulation(self, simulation: SimulationResult) -> Self {
        self.simulations.lock().unwrap().push_back(simulation);
        self
    }

    pub fn with_send_status(mut self, status: SendStatus, error_result_xdr: Option<&str>) -> Self {
        self.send_status = status;
        self.error_result_xdr = error_result_xdr.map(String::from);
        self
    }

    /// Queue a `getTransaction` answer. The last one repeats.
    pub fn with_transaction(self, info: TransactionInfo) -> Self {
        self.statuses.lock().unwrap().push_back(info);
        self
    }

    pub fn simulated(&self) -> Vec<Transaction> {
        self.simulated.lock().unwrap().clone()
    }

    pub fn sent(&self) -> Vec<TransactionEnvelope> {
        self.sent.lock().unwrap().clone()
    }

    pub fn lookups(&self) -> u32 {
        *self.lookups.lock().unwrap()
    }
}

#[async_trait]
impl SorobanRpc for FakeRpc {
    async fn simulate_transaction(
        &self,
        transaction: &Transaction,
    ) -> Result<SimulationResult, WalletError> {
        self.simulated.lock().unwrap().push(transaction.clone());
        let simulation = self.simulations.lock().unwrap().pop_front();
        simulation.ok_or_else(|| WalletError::Rpc("no simulation queued".into()))
    }

    async fn send_transaction(
        &self,
        envelope: &TransactionEnvelope,
    ) -> Result<SendResult, WalletError> {
        self.sent.lock().unwrap().push(envelope.clone());
        Ok(SendResult {
            hash: TX_HASH.into(),
            status: self.send_status,
            error_result_xdr: self.error_result_xdr.clone(),
        })
    }

    async fn get_transaction(&self, _hash: &str) -> Result<TransactionInfo, WalletError> {
        *self.lookups.lock().unwrap() += 1;
        let mut statuses = self.statuses.lock().unwrap();
        let info = if statuses.len() > 1 {
            statuses.pop_front()
        } else {
            statuses.front().cloned()
        };
        info.ok_or_else(|| WalletError::Rpc("no transaction queued".into()))
    }

    async fn get_latest_ledger(&self) -> Result<u32, WalletError> {
        Ok(self.latest_ledger)
    }

    async fn get_account_sequence(&self, address: &str) -> Result<i64, WalletError> {
        if address != fee_account().address() {
            return Err(WalletError::Rpc(format!("account {address} not found")));
        }
        Ok(self.sequence)
    }
}

/// A co-signer holding the fee account key in memory.
pub struct FakeCoSigner {
    keypair: Keypair,
    client_domain: Keypair,
    pub entries: Mutex<Vec<(SorobanAuthorizationEntry, u32)>>,
}

impl Default for FakeCoSigner {
    fn default() -> Self {
        Self {
            keypair: fee_account(),
            client_domain: client_domain_account(),
            entries: Mutex::new(Vec::new()),
        }
    }
}

/// The wallet's SEP-45 client domain account.
pub fn client_domain_account() -> Keypair {
    Keypair::from_seed(&[11; 32])
}

/// The signature value a classic account puts on an entry.
pub fn classic_signature(keypair: &Keypair, payload: &[u8]) -> ScVal {
    let entry = ScVal::symbol_map([
        ("public_key", ScVal::Bytes(keypair.public_key().to_vec())),
        ("signature", ScVal::Bytes(keypair.sign(payload).to_vec())),
    ])
    .unwrap();
    ScVal::Vec(Some(vec![entry]))
}

/// Sign `entry` as `keypair`, valid until `expiration`.
pub fn sign_classic(
    entry: &SorobanAuthorizationEntry,
    keypair: &Keypair,
    passphrase: &str,
    expiration: u32,
) -> SorobanAuthorizationEntry {
    let mut signed = entry.clone();
    let credentials = signed.address_credentials_mut().unwrap();
    credentials.signature_expiration_ledger = expiration;
    let payload = authorization_payload(
        &network_id(passphrase),
        credentials.nonce,
        expiration,
        &entry.root_invocation,
    )
    .unwrap();
    credentials.signature = classic_signature(keypair, &payload);
    signed
}

#[async_trait]
impl CoSigner for FakeCoSigner {
    async fn sign_transaction(
        &self,
        envelope: &TransactionEnvelope,
        network_passphrase: &str,
    ) -> Result<TransactionEnvelope, WalletError> {
        let mut signed = envelope.clone();
        self.keypair
            .sign_envelope(&mut signed, &network_id(network_passphrase))?;
        Ok(signed)
    }

    async fn sign_authorization_entry(
        &self,
        entry: &SorobanAuthorizationEntry,
        valid_until_ledger: u32,
        network_passphrase: &str,
    ) -> Result<SorobanAuthorizationEntry, WalletError> {
        self.entries
            .lock()
            .unwrap()
            .push((entry.clone(), valid_until_ledger));
        Ok(sign_classic(
            entry,
            &self.client_domain,
            network_passphrase,
            valid_until_ledger,
        ))
    }
}
